//! Configuration for yadlfs
//!
//! Values come from exactly one source, first match wins:
//! 1. `.yadlfs.yaml` in the working directory
//! 2. `.yadlfs.toml` in the working directory
//! 3. `.yadlfs.json` (JSON5) in the working directory
//! 4. Environment variables (`YANDEX_DISK_*`, `YADLFS_*`)
//!
//! CLI flags are applied on top by `main`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use crate::backend::yandex::DEFAULT_API_BASE_URL;
use crate::error::ConfigError;
use crate::logging::DEFAULT_LOG_LEVEL;
use crate::session::DEFAULT_OUTBOUND_CAPACITY;

pub const CONFIG_YAML: &str = ".yadlfs.yaml";
pub const CONFIG_TOML: &str = ".yadlfs.toml";
pub const CONFIG_JSON: &str = ".yadlfs.json";

/// Downloads land in `<staging dir>/<oid>` until git-lfs moves them
pub const DEFAULT_STAGING_DIR: &str = ".yadlfs";

pub const ENV_OAUTH_TOKEN: &str = "YANDEX_DISK_OAUTH_TOKEN";
pub const ENV_PROJECT_FOLDER: &str = "YANDEX_DISK_PROJECT_FOLDER";
pub const ENV_STAGING_DIR: &str = "YADLFS_STAGING_DIR";
pub const ENV_API_BASE_URL: &str = "YADLFS_API_BASE_URL";
pub const ENV_LOG: &str = "YADLFS_LOG";

// ============================================================================
// CONFIGURATION STRUCT
// ============================================================================

#[derive(Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// YANDEX.DISK
	// ========================================================================
	/// OAuth token sent as `Authorization: OAuth <token>`
	pub yandex_disk_oauth_token: String,

	/// Disk folder holding this project's objects
	pub yandex_disk_project_folder: String,

	/// REST API root
	pub api_base_url: String,

	// ========================================================================
	// AGENT
	// ========================================================================
	pub staging_dir: PathBuf,

	/// Bound of the outbound event queue
	pub outbound_queue_capacity: usize,

	/// Log filter used when `RUST_LOG` is not set
	pub log_level: String,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			yandex_disk_oauth_token: String::new(),
			yandex_disk_project_folder: String::new(),
			api_base_url: DEFAULT_API_BASE_URL.to_string(),
			staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
			outbound_queue_capacity: DEFAULT_OUTBOUND_CAPACITY,
			log_level: DEFAULT_LOG_LEVEL.to_string(),
		}
	}
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("yandex_disk_oauth_token", &"<redacted>")
			.field("yandex_disk_project_folder", &self.yandex_disk_project_folder)
			.field("api_base_url", &self.api_base_url)
			.field("staging_dir", &self.staging_dir)
			.field("outbound_queue_capacity", &self.outbound_queue_capacity)
			.field("log_level", &self.log_level)
			.finish()
	}
}

// ============================================================================
// LOADING
// ============================================================================

impl Config {
	/// Load from the current working directory and the process environment
	pub fn load() -> Result<Self, ConfigError> {
		let dir = std::env::current_dir()
			.map_err(|source| ConfigError::Io { path: PathBuf::from("."), source })?;
		Self::load_from(&dir, |key| std::env::var(key).ok())
	}

	/// Load from `dir`, falling back to variables resolved through `lookup`
	pub fn load_from<F>(dir: &Path, lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let yaml_path = dir.join(CONFIG_YAML);
		let toml_path = dir.join(CONFIG_TOML);
		let json_path = dir.join(CONFIG_JSON);

		let config = if let Some(text) = read_optional(&yaml_path)? {
			serde_yaml::from_str(&text)
				.map_err(|e| ConfigError::Parse { path: yaml_path, message: e.to_string() })?
		} else if let Some(text) = read_optional(&toml_path)? {
			toml::from_str(&text)
				.map_err(|e| ConfigError::Parse { path: toml_path, message: e.to_string() })?
		} else if let Some(text) = read_optional(&json_path)? {
			json5::from_str(&text)
				.map_err(|e| ConfigError::Parse { path: json_path, message: e.to_string() })?
		} else {
			Self::from_env_with(lookup)?
		};

		config.validate()?;
		Ok(config)
	}

	/// Build from environment variables resolved through `lookup`
	pub fn from_env_with<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let required = |key: &'static str| {
			lookup(key).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing { key })
		};

		let mut config = Config {
			yandex_disk_oauth_token: required(ENV_OAUTH_TOKEN)?,
			yandex_disk_project_folder: required(ENV_PROJECT_FOLDER)?,
			..Config::default()
		};
		if let Some(dir) = lookup(ENV_STAGING_DIR) {
			config.staging_dir = PathBuf::from(dir);
		}
		if let Some(url) = lookup(ENV_API_BASE_URL) {
			config.api_base_url = url;
		}
		if let Some(level) = lookup(ENV_LOG) {
			config.log_level = level;
		}
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.yandex_disk_oauth_token.trim().is_empty() {
			return Err(ConfigError::Missing { key: "yandexDiskOauthToken" });
		}
		if self.yandex_disk_project_folder.trim().is_empty() {
			return Err(ConfigError::Missing { key: "yandexDiskProjectFolder" });
		}
		if self.outbound_queue_capacity == 0 {
			return Err(ConfigError::Invalid {
				message: "outboundQueueCapacity must be at least 1".to_string(),
			});
		}
		if self.staging_dir.as_os_str().is_empty() {
			return Err(ConfigError::Invalid { message: "stagingDir must not be empty".to_string() });
		}
		Ok(())
	}
}

fn read_optional(path: &Path) -> Result<Option<String>, ConfigError> {
	match std::fs::read_to_string(path) {
		Ok(text) => Ok(Some(text)),
		Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
		Err(source) => Err(ConfigError::Io { path: path.to_path_buf(), source }),
	}
}


// vim: ts=4
