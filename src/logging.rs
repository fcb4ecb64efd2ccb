//! Logging prelude module for convenient access to tracing macros.
//!
//! The agent speaks its protocol on stdout, so every log line goes to stderr.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!(oid = %oid, "transfer started");
//! warn!("init received twice");
//! ```

pub use tracing::{debug, error, info, trace, warn};

/// Default filter used when neither `RUST_LOG` nor the config sets a level.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` wins over `level`, so a user can always turn on more output
/// without touching the config file:
///
/// ```bash
/// RUST_LOG=yadlfs=debug git lfs push origin main
/// RUST_LOG=yadlfs::transfer=trace git lfs pull
/// ```
pub fn init_tracing(level: &str) {
	let filter = tracing_subscriber::EnvFilter::try_from_default_env()
		.or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
		.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_LOG_LEVEL));

	// try_init: tests and embedders may have installed a subscriber already
	let _ = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.with_ansi(false)
		.try_init();
}

// vim: ts=4
