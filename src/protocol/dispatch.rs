//! Inbound command loop
//!
//! Reads one line at a time and hands it to the controller. The loop is
//! strictly sequential: a transfer line blocks the next read only until the
//! transfer holds a slot.

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;

use super::error::ProtocolError;
use super::messages::Command;
use crate::error::AgentError;
use crate::logging::*;
use crate::transfer::Controller;

/// How the read loop ended when it ended cleanly
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
	/// Peer sent `terminate`
	Terminated,

	/// Input closed without `terminate`
	EndOfInput,

	/// Session was cancelled while waiting for input
	Cancelled,
}

pub struct Dispatcher<R> {
	input: R,
	controller: Controller,
	cancel: CancellationToken,
}

impl<R> Dispatcher<R>
where
	R: AsyncBufRead + Unpin,
{
	pub fn new(input: R, controller: Controller, cancel: CancellationToken) -> Self {
		Self { input, controller, cancel }
	}

	/// Process commands until `terminate`, end of input, cancellation or a fatal error
	pub async fn run(&mut self) -> Result<Termination, AgentError> {
		let mut line = Vec::new();

		loop {
			line.clear();
			let n = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => {
					debug!("[dispatch] cancelled while waiting for input");
					return Ok(Termination::Cancelled);
				}
				read = self.input.read_until(b'\n', &mut line) => read.map_err(ProtocolError::Io)?,
			};

			if n == 0 {
				debug!("[dispatch] end of input");
				return Ok(Termination::EndOfInput);
			}

			if line.iter().all(u8::is_ascii_whitespace) {
				continue;
			}
			trace!("[dispatch] <- {}", String::from_utf8_lossy(&line).trim_end());

			match Command::from_slice(&line)? {
				Command::Init(init) => self.controller.init(&init).await?,
				Command::Transfer { event, transfer } => {
					if let (Some(claimed), Some(mode)) = (event.operation(), self.controller.operation()) {
						if claimed != mode {
							warn!(
								"[dispatch] {} sent as {} in a {} session",
								transfer.oid, claimed, mode
							);
						}
					}
					self.controller.transfer(transfer).await?;
				}
				Command::Terminate => {
					info!("[dispatch] terminate received");
					return Ok(Termination::Terminated);
				}
			}
		}
	}

	pub fn controller(&self) -> &Controller {
		&self.controller
	}

	pub fn into_controller(self) -> Controller {
		self.controller
	}
}


// vim: ts=4
