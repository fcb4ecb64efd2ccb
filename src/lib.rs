//! # yadlfs - git-lfs custom transfer agent for Yandex.Disk
//!
//! git-lfs starts the agent and talks to it over stdin/stdout with one JSON
//! object per line. The agent uploads and downloads LFS objects against a
//! [`backend::Repository`] and reports progress back on the same channel.
//!
//! ## Running a session
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use yadlfs::{backend::YandexDisk, session, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load()?;
//!     let backend = YandexDisk::new(
//!         &config.yandex_disk_oauth_token,
//!         &config.yandex_disk_project_folder,
//!         &config.api_base_url,
//!     )?;
//!     let input = tokio::io::BufReader::new(tokio::io::stdin());
//!     session::run_session(
//!         input,
//!         tokio::io::stdout(),
//!         Arc::new(backend),
//!         session::SessionOptions::default(),
//!         CancellationToken::new(),
//!     )
//!     .await?;
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod config;
pub mod dial;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod session;
pub mod transfer;
pub mod utils;

// Re-export commonly used types and functions
pub use config::Config;
pub use error::{AgentError, BackendError, ConfigError, DialError, TransferError};
pub use protocol::Termination;
pub use session::{run_session, SessionOptions};

// vim: ts=4
