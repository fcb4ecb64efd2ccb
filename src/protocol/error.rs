//! Protocol error types
//!
//! Everything in here is fatal to a session: a peer that sends a line we
//! cannot route has lost sync with us, and there is no way to report that
//! back through the event stream.

use std::fmt;
use std::io;

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// Line is not JSON, lacks an `event`, or does not match its message shape
	Decode { what: &'static str, source: serde_json::Error },

	/// `event` is not one of init/upload/download/terminate
	UnknownEvent(String),

	/// Waiting for a transfer slot was aborted by session cancellation
	SlotAcquisition,

	/// The outbound queue is closed; nothing more can be reported
	OutputClosed,

	/// The input stream could not be read
	Io(io::Error),
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Decode { what, source } => {
				write!(f, "failed to parse {} message: {}", what, source)
			}
			ProtocolError::UnknownEvent(event) => write!(f, "unknown message type: {}", event),
			ProtocolError::SlotAcquisition => {
				write!(f, "failed to acquire semaphore: session cancelled")
			}
			ProtocolError::OutputClosed => write!(f, "failed to enqueue event: output closed"),
			ProtocolError::Io(e) => write!(f, "failed to read command: {}", e),
		}
	}
}

impl std::error::Error for ProtocolError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ProtocolError::Decode { source, .. } => Some(source),
			ProtocolError::Io(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		ProtocolError::Io(e)
	}
}

// vim: ts=4
