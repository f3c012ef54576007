//! `canticle` command-line tool.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use canticle::credentials::KeyringCredentialStore;
use canticle::{AppConfig, build_engine};
use canticle_search::{LyricPayload, LyricsEngine, SearchOptions};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Canticle: federated worship lyrics and hymn search.
#[derive(Parser)]
#[command(name = "canticle", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search every enabled provider and print ranked results as JSON.
    Search {
        /// Free-text query, e.g. "oceans by hillsong united".
        query: String,

        /// Maximum number of results.
        #[arg(short, long)]
        limit: Option<usize>,

        /// Ignore cached results.
        #[arg(long)]
        no_cache: bool,

        /// Print a snapshot each time a provider settles, one JSON object per line.
        #[arg(long)]
        stream: bool,
    },

    /// Fetch full lyrics for a payload returned by `search`.
    Lyrics {
        /// Provider id, e.g. "lrclib".
        provider: String,

        /// The candidate's `payload` JSON.
        payload: String,

        /// Print the lyric content as JSON instead of plain text.
        #[arg(long)]
        json: bool,
    },

    /// List registered providers and whether they are ready to use.
    Providers,

    /// Manage provider API keys.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store an API key. An empty value clears it.
    Set {
        provider: String,
        #[arg(env = "CANTICLE_API_KEY", hide_env_values = true)]
        value: String,
    },
    /// Remove a stored API key.
    Remove { provider: String },
    /// Show whether a key is stored.
    Status { provider: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("canticle=info,canticle_search=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("failed to load config")?;
    let engine = build_engine(&config, Arc::new(KeyringCredentialStore::new()))?;

    match cli.command {
        Command::Search {
            query,
            limit,
            no_cache,
            stream,
        } => run_search(&engine, &query, limit, no_cache, stream).await,
        Command::Lyrics {
            provider,
            payload,
            json,
        } => run_lyrics(&engine, &provider, &payload, json).await,
        Command::Providers => list_providers(&engine).await,
        Command::Key { action } => run_key(&engine, action).await,
    }
}

async fn run_search(
    engine: &LyricsEngine,
    query: &str,
    limit: Option<usize>,
    no_cache: bool,
    stream: bool,
) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling search");
            cancel_clone.cancel();
        }
    });

    let options = SearchOptions {
        limit,
        skip_cache: no_cache,
        cancel: Some(cancel),
    };

    if stream {
        let snapshots = engine.search_stream(query, options);
        futures::pin_mut!(snapshots);
        while let Some(snapshot) = snapshots.next().await {
            println!("{}", serde_json::to_string(&snapshot)?);
        }
    } else {
        let payload = engine.search(query, options).await;
        let failed = payload.meta.failed_providers();
        if failed > 0 {
            info!(failed, "some providers reported errors");
        }
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }
    Ok(())
}

/// Parse payload JSON, filling in the `provider` tag from the command line
/// when it is missing.
fn parse_payload(provider: &str, raw: &str) -> anyhow::Result<LyricPayload> {
    let mut value: serde_json::Value =
        serde_json::from_str(raw).context("payload is not valid JSON")?;
    if let Some(object) = value.as_object_mut() {
        object
            .entry("provider")
            .or_insert_with(|| serde_json::Value::String(provider.to_owned()));
    }
    serde_json::from_value(value).context("payload does not match any provider")
}

async fn run_lyrics(
    engine: &LyricsEngine,
    provider: &str,
    raw_payload: &str,
    json: bool,
) -> anyhow::Result<()> {
    let payload = parse_payload(provider, raw_payload)?;
    let content = engine
        .fetch_lyrics_by_provider(provider, payload, None)
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&content)?);
        return Ok(());
    }

    if content.artist.is_empty() {
        println!("{}\n", content.title);
    } else {
        println!("{} - {}\n", content.title, content.artist);
    }
    println!("{}", content.lyrics);
    if let Some(copyright) = &content.copyright {
        println!("\n{copyright}");
    }
    if let Some(url) = &content.source_url {
        println!("\nSource: {url}");
    }
    Ok(())
}

async fn list_providers(engine: &LyricsEngine) -> anyhow::Result<()> {
    for status in engine.list_provider_definitions().await {
        let definition = &status.definition;
        let key = if definition.requires_key {
            "key required"
        } else {
            "no key"
        };
        let ready = if status.configured { "ready" } else { "not configured" };
        println!(
            "{:<12} {:<14} {:<13} {}",
            definition.id, definition.display_name, key, ready
        );
    }
    Ok(())
}

async fn run_key(engine: &LyricsEngine, action: KeyAction) -> anyhow::Result<()> {
    match action {
        KeyAction::Set { provider, value } => {
            engine.save_provider_key(&provider, &value).await?;
            if value.trim().is_empty() {
                println!("Cleared API key for {provider}");
            } else {
                println!("Saved API key for {provider}");
            }
        }
        KeyAction::Remove { provider } => {
            engine.remove_provider_key(&provider).await?;
            println!("Removed API key for {provider}");
        }
        KeyAction::Status { provider } => {
            let state = engine.provider_key_state(&provider).await?;
            println!("{}", serde_json::to_string(&state)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_search_flags() {
        let cli = Cli::try_parse_from([
            "canticle", "search", "amazing grace", "--limit", "5", "--no-cache", "--stream",
        ])
        .expect("parse");
        match cli.command {
            Command::Search {
                query,
                limit,
                no_cache,
                stream,
            } => {
                assert_eq!(query, "amazing grace");
                assert_eq!(limit, Some(5));
                assert!(no_cache);
                assert!(stream);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn cli_accepts_global_config_after_subcommand() {
        let cli = Cli::try_parse_from(["canticle", "providers", "--config", "/tmp/c.toml"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.toml")));
    }

    #[test]
    fn payload_tag_filled_from_provider_argument() {
        let payload = parse_payload("lrclib", r#"{"id": 42}"#).expect("parse");
        assert_eq!(payload, LyricPayload::Lrclib { id: 42 });
    }

    #[test]
    fn payload_with_tag_is_taken_as_is() {
        let payload = parse_payload(
            "hymnary",
            r#"{"provider": "hymnary", "url": "https://hymnary.org/text/x", "title": "X"}"#,
        )
        .expect("parse");
        assert_eq!(payload.provider_id(), "hymnary");
    }

    #[test]
    fn malformed_payload_rejected() {
        assert!(parse_payload("lrclib", "not json").is_err());
        assert!(parse_payload("lrclib", r#"{"url": 1}"#).is_err());
    }
}
