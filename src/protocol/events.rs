//! Outbound event messages
//!
//! Events form a closed set and go through [`Event::encode`], which writes the
//! `event` discriminator itself. Nothing built by a caller can put a different
//! value there.

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Literal acknowledgment of `init`
pub const CONFIRM_LITERAL: &[u8] = b"{ }";

/// `code` carried by every failed `complete`; no finer taxonomy is defined
pub const COMPLETE_ERROR_CODE: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompleteError {
	pub code: i64,
	pub message: String,
}

/// One line the agent writes back to git-lfs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
	/// Acknowledges `init`
	Confirm,

	Progress { oid: String, bytes_so_far: u64, bytes_since_last: u64 },

	/// Successful transfer; downloads name the staged file
	Complete { oid: String, path: Option<PathBuf> },

	/// Failed transfer
	Failed { oid: String, error: CompleteError },
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Wire<'a> {
	#[serde(rename_all = "camelCase")]
	Progress { oid: &'a str, bytes_so_far: u64, bytes_since_last: u64 },
	Complete {
		oid: &'a str,
		#[serde(skip_serializing_if = "Option::is_none")]
		path: Option<&'a Path>,
		#[serde(skip_serializing_if = "Option::is_none")]
		error: Option<&'a CompleteError>,
	},
}

impl Event {
	pub fn progress(oid: &str, bytes_so_far: u64, bytes_since_last: u64) -> Self {
		Event::Progress { oid: oid.to_string(), bytes_so_far, bytes_since_last }
	}

	/// Zero progress sent before the first byte of a transfer moves
	pub fn started(oid: &str) -> Self {
		Event::progress(oid, 0, 0)
	}

	pub fn failed(oid: &str, message: impl Into<String>) -> Self {
		Event::Failed {
			oid: oid.to_string(),
			error: CompleteError { code: COMPLETE_ERROR_CODE, message: message.into() },
		}
	}

	/// Object id this event reports on; `None` for `Confirm`
	pub fn oid(&self) -> Option<&str> {
		match self {
			Event::Confirm => None,
			Event::Progress { oid, .. } | Event::Complete { oid, .. } | Event::Failed { oid, .. } => {
				Some(oid.as_str())
			}
		}
	}

	/// Whether this is the final event of a transfer
	pub fn is_terminal(&self) -> bool {
		matches!(self, Event::Complete { .. } | Event::Failed { .. })
	}

	/// Serialize to a single JSON line, without the trailing newline.
	pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
		let wire = match self {
			Event::Confirm => return Ok(CONFIRM_LITERAL.to_vec()),
			Event::Progress { oid, bytes_so_far, bytes_since_last } => Wire::Progress {
				oid,
				bytes_so_far: *bytes_so_far,
				bytes_since_last: *bytes_since_last,
			},
			Event::Complete { oid, path } => {
				Wire::Complete { oid, path: path.as_deref(), error: None }
			}
			Event::Failed { oid, error } => Wire::Complete { oid, path: None, error: Some(error) },
		};
		serde_json::to_vec(&wire)
	}
}


// vim: ts=4
