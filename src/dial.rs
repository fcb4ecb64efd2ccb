//! Outbound event writer
//!
//! The dial is the only writer to the output stream. It drains the event
//! queue in arrival order and writes each event as one flushed line.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::DialError;
use crate::logging::*;
use crate::protocol::events::Event;

pub struct Dial<W> {
	output: W,
	queue: mpsc::Receiver<Event>,
	cancel: CancellationToken,
	written: u64,
}

impl<W> Dial<W>
where
	W: AsyncWrite + Unpin,
{
	pub fn new(output: W, queue: mpsc::Receiver<Event>, cancel: CancellationToken) -> Self {
		Self { output, queue, cancel, written: 0 }
	}

	/// Write events until the queue closes or the session is cancelled
	///
	/// Returns the number of events written. A failed write cancels the
	/// session before the error is returned.
	pub async fn run(mut self) -> Result<u64, DialError> {
		loop {
			let event = tokio::select! {
				biased;
				_ = self.cancel.cancelled() => {
					debug!("[dial] cancelled after {} events", self.written);
					return Ok(self.written);
				}
				next = self.queue.recv() => match next {
					Some(event) => event,
					None => {
						debug!("[dial] queue closed after {} events", self.written);
						return Ok(self.written);
					}
				},
			};

			let cancel = self.cancel.clone();
			let result = tokio::select! {
				biased;
				_ = cancel.cancelled() => return Ok(self.written),
				result = self.write_event(&event) => result,
			};

			if let Err(e) = result {
				error!("[dial] {}", e);
				self.cancel.cancel();
				return Err(e);
			}
			self.written += 1;
		}
	}

	async fn write_event(&mut self, event: &Event) -> Result<(), DialError> {
		let mut payload = event.encode()?;
		trace!("[dial] -> {}", String::from_utf8_lossy(&payload));
		payload.push(b'\n');
		self.output.write_all(&payload).await?;
		self.output.flush().await?;
		Ok(())
	}
}


// vim: ts=4
