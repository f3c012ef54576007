//! Error types for the canticle application layer.

use canticle_search::LyricsError;

/// Top-level error type for configuration, credentials and search wiring.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration file could not be parsed, serialized or validated.
    #[error("config error: {0}")]
    Config(String),

    /// Platform credential store failure.
    #[error("credential error: {0}")]
    Credential(String),

    /// Error surfaced by the search engine.
    #[error(transparent)]
    Search(#[from] LyricsError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<AppError> for LyricsError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Search(inner) => inner,
            AppError::Credential(msg) => LyricsError::Credential(msg),
            AppError::Config(msg) => LyricsError::Config(msg),
            AppError::Io(e) => LyricsError::Config(e.to_string()),
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_errors_pass_through() {
        let err: AppError = LyricsError::UnknownProvider("azlyrics".into()).into();
        assert_eq!(err.to_string(), "unknown provider: azlyrics");
    }

    #[test]
    fn credential_errors_map_into_search_errors() {
        let err: LyricsError = AppError::Credential("locked".into()).into();
        assert_eq!(err, LyricsError::Credential("locked".into()));
    }
}
