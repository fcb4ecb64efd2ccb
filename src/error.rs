//! Error types for yadlfs

use std::error::Error;
use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::protocol::error::ProtocolError;

/// Errors that end the agent process
#[derive(Debug)]
pub enum AgentError {
	/// Reading or routing a command failed; the session cannot continue
	Dispatch(ProtocolError),

	/// The output stream is gone; no further event can be reported
	Output(DialError),

	/// Configuration could not be loaded
	Config(ConfigError),

	/// The storage backend could not be set up
	Backend(BackendError),
}

impl fmt::Display for AgentError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AgentError::Dispatch(e) => write!(f, "dispatch failed: {}", e),
			AgentError::Output(e) => write!(f, "output failed: {}", e),
			AgentError::Config(e) => write!(f, "configuration error: {}", e),
			AgentError::Backend(e) => write!(f, "backend setup failed: {}", e),
		}
	}
}

impl Error for AgentError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			AgentError::Dispatch(e) => Some(e),
			AgentError::Output(e) => Some(e),
			AgentError::Config(e) => Some(e),
			AgentError::Backend(e) => Some(e),
		}
	}
}

impl From<ProtocolError> for AgentError {
	fn from(e: ProtocolError) -> Self {
		AgentError::Dispatch(e)
	}
}

impl From<DialError> for AgentError {
	fn from(e: DialError) -> Self {
		AgentError::Output(e)
	}
}

impl From<ConfigError> for AgentError {
	fn from(e: ConfigError) -> Self {
		AgentError::Config(e)
	}
}

impl From<BackendError> for AgentError {
	fn from(e: BackendError) -> Self {
		AgentError::Backend(e)
	}
}

/// Per-transfer failures
///
/// These never leave the transfer task: the controller turns them into a
/// `complete` event whose `error.message` is the `Display` text below.
#[derive(Debug)]
pub enum TransferError {
	/// Transfer received before `init`
	UnsupportedOperation,

	/// Upload source could not be opened
	OpenFile { path: PathBuf, source: io::Error },

	/// Backend rejected or failed the upload
	UploadFailed(BackendError),

	/// Download destination could not be created
	CreateFile { path: PathBuf, source: io::Error },

	/// Backend could not provide the object
	DownloadFailed(BackendError),

	/// Streaming the object to disk failed
	CopyData(io::Error),
}

impl fmt::Display for TransferError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TransferError::UnsupportedOperation => {
				write!(f, "unsupported operation: no init received")
			}
			TransferError::OpenFile { path, source } => {
				write!(f, "failed to open file: open {}: {}", path.display(), source)
			}
			TransferError::UploadFailed(e) => write!(f, "upload failed: {}", e),
			TransferError::CreateFile { path, source } => {
				write!(f, "failed to create file: open {}: {}", path.display(), source)
			}
			TransferError::DownloadFailed(e) => write!(f, "download failed: {}", e),
			TransferError::CopyData(e) => write!(f, "failed to copy data: {}", e),
		}
	}
}

impl Error for TransferError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			TransferError::UnsupportedOperation => None,
			TransferError::OpenFile { source, .. } => Some(source),
			TransferError::UploadFailed(e) => Some(e),
			TransferError::CreateFile { source, .. } => Some(source),
			TransferError::DownloadFailed(e) => Some(e),
			TransferError::CopyData(e) => Some(e),
		}
	}
}

/// Storage backend failures
#[derive(Debug)]
pub enum BackendError {
	/// Building or sending an HTTP request failed
	Request { context: &'static str, source: reqwest::Error },

	/// The server answered with an unexpected status
	Status { context: &'static str, status: u16, reason: String },

	/// The server answer could not be decoded
	Decode { context: &'static str, source: reqwest::Error },

	/// Local I/O error while talking to the backend
	Io(io::Error),

	/// The session was cancelled while the call was in flight
	Cancelled,

	/// Error reported by a backend that is not HTTP based
	Other(String),
}

impl fmt::Display for BackendError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			BackendError::Request { context, source } => write!(f, "{}: {}", context, source),
			BackendError::Status { context, status, reason } => {
				write!(f, "{}: {} {}", context, status, reason)
			}
			BackendError::Decode { context, source } => write!(f, "{}: {}", context, source),
			BackendError::Io(e) => write!(f, "{}", e),
			BackendError::Cancelled => write!(f, "operation cancelled"),
			BackendError::Other(message) => write!(f, "{}", message),
		}
	}
}

impl Error for BackendError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			BackendError::Request { source, .. } => Some(source),
			BackendError::Decode { source, .. } => Some(source),
			BackendError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for BackendError {
	fn from(e: io::Error) -> Self {
		BackendError::Io(e)
	}
}

impl From<String> for BackendError {
	fn from(message: String) -> Self {
		BackendError::Other(message)
	}
}

impl From<&str> for BackendError {
	fn from(message: &str) -> Self {
		BackendError::Other(message.to_string())
	}
}

/// Outbound writer failures; any of these is fatal to the session
#[derive(Debug)]
pub enum DialError {
	/// An event could not be serialized
	Encode(serde_json::Error),

	/// The output stream rejected a write or flush
	Write(io::Error),
}

impl fmt::Display for DialError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			DialError::Encode(e) => write!(f, "failed to encode event: {}", e),
			DialError::Write(e) => write!(f, "failed to write event: {}", e),
		}
	}
}

impl Error for DialError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			DialError::Encode(e) => Some(e),
			DialError::Write(e) => Some(e),
		}
	}
}

impl From<serde_json::Error> for DialError {
	fn from(e: serde_json::Error) -> Self {
		DialError::Encode(e)
	}
}

impl From<io::Error> for DialError {
	fn from(e: io::Error) -> Self {
		DialError::Write(e)
	}
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
	/// Config file exists but could not be read
	Io { path: PathBuf, source: io::Error },

	/// Config file could not be parsed
	Parse { path: PathBuf, message: String },

	/// A required value was not provided
	Missing { key: &'static str },

	/// A value was provided but is not usable
	Invalid { message: String },
}

impl fmt::Display for ConfigError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ConfigError::Io { path, source } => {
				write!(f, "failed to read {}: {}", path.display(), source)
			}
			ConfigError::Parse { path, message } => {
				write!(f, "failed to parse {}: {}", path.display(), message)
			}
			ConfigError::Missing { key } => write!(f, "required value {} is not set", key),
			ConfigError::Invalid { message } => write!(f, "invalid configuration: {}", message),
		}
	}
}

impl Error for ConfigError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_transfer_error_messages_have_stable_prefixes() {
		let err = TransferError::OpenFile {
			path: PathBuf::from("nonexistent_file.bin"),
			source: io::Error::from(io::ErrorKind::NotFound),
		};
		assert!(err.to_string().starts_with("failed to open file: open nonexistent_file.bin: "));

		let err = TransferError::DownloadFailed(BackendError::from("boom"));
		assert_eq!(err.to_string(), "download failed: boom");

		let err = TransferError::UnsupportedOperation;
		assert!(err.to_string().starts_with("unsupported operation"));
	}

	#[test]
	fn test_agent_error_marks_dispatch_failures() {
		let err = AgentError::from(ProtocolError::UnknownEvent("bogus".to_string()));
		assert_eq!(err.to_string(), "dispatch failed: unknown message type: bogus");
	}
}

// vim: ts=4
