//! # canticle
//!
//! Application layer around [`canticle_search`]: TOML configuration,
//! keyring-backed provider keys, and engine construction for the
//! `canticle` command-line tool.

pub mod app;
pub mod canticle_dirs;
pub mod config;
pub mod credentials;
pub mod error;

pub use app::build_engine;
pub use config::AppConfig;
pub use error::{AppError, Result};
