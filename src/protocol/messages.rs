//! Inbound command messages
//!
//! git-lfs writes one JSON object per line. Every line carries an `event`
//! field naming its shape; the line is classified by that field first and
//! only then decoded in full, so the error tells which message was broken.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::error::ProtocolError;

/// Direction of every transfer in a session, fixed by `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	Upload,
	Download,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Upload => write!(f, "upload"),
			Operation::Download => write!(f, "download"),
		}
	}
}

/// Values accepted in the `event` field of an inbound line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventName {
	Init,
	Upload,
	Download,
	Terminate,
}

impl EventName {
	pub fn parse(name: &str) -> Option<Self> {
		match name {
			"init" => Some(EventName::Init),
			"upload" => Some(EventName::Upload),
			"download" => Some(EventName::Download),
			"terminate" => Some(EventName::Terminate),
			_ => None,
		}
	}

	/// Operation a transfer line claims to be, if it is a transfer line
	pub fn operation(self) -> Option<Operation> {
		match self {
			EventName::Upload => Some(Operation::Upload),
			EventName::Download => Some(Operation::Download),
			_ => None,
		}
	}
}

/// First message of a session
#[derive(Debug, Clone, Deserialize)]
pub struct Init {
	pub operation: Operation,

	/// Name of the git remote; informational only
	#[serde(default)]
	pub remote: Option<String>,

	/// Whether git-lfs runs transfers concurrently; informational only
	#[serde(default)]
	pub concurrent: bool,

	/// Requested number of in-flight transfers. Absent or below one means one.
	#[serde(default, rename = "concurrenttransfers", alias = "concurrentTransfers")]
	pub concurrent_transfers: i64,
}

/// One requested upload or download
#[derive(Debug, Clone, Deserialize)]
pub struct Transfer {
	/// Object id; names the backend object and keys every event of this transfer
	pub oid: String,

	#[serde(default)]
	pub size: u64,

	/// Local source file for uploads; git-lfs omits it for downloads
	#[serde(default)]
	pub path: Option<PathBuf>,
}

/// A classified and fully decoded inbound line
#[derive(Debug, Clone)]
pub enum Command {
	Init(Init),
	Transfer { event: EventName, transfer: Transfer },
	Terminate,
}

#[derive(Deserialize)]
struct Envelope {
	event: String,
}

impl Command {
	/// Decode a raw input line; bytes that are not UTF-8 fail like malformed JSON
	pub fn from_slice(line: &[u8]) -> Result<Self, ProtocolError> {
		let line = std::str::from_utf8(line).map_err(|e| ProtocolError::Decode {
			what: "command",
			source: serde::de::Error::custom(e),
		})?;
		Self::parse(line.trim())
	}

	/// Classify a line by its `event` field and decode the matching message.
	pub fn parse(line: &str) -> Result<Self, ProtocolError> {
		let envelope: Envelope = serde_json::from_str(line)
			.map_err(|source| ProtocolError::Decode { what: "command", source })?;

		let event = EventName::parse(&envelope.event)
			.ok_or_else(|| ProtocolError::UnknownEvent(envelope.event.clone()))?;

		match event {
			EventName::Init => serde_json::from_str(line)
				.map(Command::Init)
				.map_err(|source| ProtocolError::Decode { what: "init", source }),
			EventName::Upload | EventName::Download => serde_json::from_str(line)
				.map(|transfer| Command::Transfer { event, transfer })
				.map_err(|source| ProtocolError::Decode { what: "transfer", source }),
			EventName::Terminate => Ok(Command::Terminate),
		}
	}
}


// vim: ts=4
