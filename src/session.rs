//! One agent session over an input/output pair
//!
//! Wires the dispatcher, controller and dial together and owns shutdown
//! order: stop reading, settle the in-flight transfers, close the event
//! queue, then wait for the dial to write out what is left.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backend::Repository;
use crate::dial::Dial;
use crate::error::{AgentError, DialError};
use crate::logging::*;
use crate::protocol::{Dispatcher, ProtocolError, Termination};
use crate::transfer::Controller;

/// Default outbound queue size; one keeps producers in lockstep with the output
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1;

#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Where downloads are written as `<staging_dir>/<oid>`
	pub staging_dir: PathBuf,

	/// Bound of the outbound event queue
	pub outbound_capacity: usize,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			staging_dir: PathBuf::from(crate::config::DEFAULT_STAGING_DIR),
			outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
		}
	}
}

/// Run one session until `terminate`, end of input, cancellation or a fatal error
///
/// A clean end (`terminate` or end of input) waits for every in-flight
/// transfer and for the last event to be written. Fatal errors cancel the
/// session; a failing output takes precedence over whatever the read loop
/// reported, since it is usually the cause.
pub async fn run_session<R, W>(
	input: R,
	output: W,
	backend: Arc<dyn Repository>,
	options: SessionOptions,
	cancel: CancellationToken,
) -> Result<Termination, AgentError>
where
	R: AsyncBufRead + Unpin,
	W: AsyncWrite + Unpin + Send + 'static,
{
	let (events, queue) = mpsc::channel(options.outbound_capacity.max(1));
	let dial = tokio::spawn(Dial::new(output, queue, cancel.clone()).run());

	let controller = Controller::new(backend, options.staging_dir, events, cancel.clone());
	let mut dispatcher = Dispatcher::new(input, controller, cancel.clone());
	let outcome = dispatcher.run().await;
	let mut controller = dispatcher.into_controller();

	let outcome = match outcome {
		Ok(Termination::Cancelled) => {
			controller.abort();
			Ok(Termination::Cancelled)
		}
		Ok(termination) => {
			if controller.in_flight() > 0 {
				debug!("[session] waiting for {} in-flight transfers", controller.in_flight());
			}
			match controller.drain().await {
				Ok(()) => Ok(termination),
				Err(_) => Ok(Termination::Cancelled),
			}
		}
		// a signal while the dispatcher waited for a slot
		Err(AgentError::Dispatch(ProtocolError::SlotAcquisition)) if cancel.is_cancelled() => {
			controller.abort();
			Ok(Termination::Cancelled)
		}
		Err(e) => {
			cancel.cancel();
			controller.abort();
			Err(e)
		}
	};

	// last sender; the dial stops once the queue is empty
	drop(controller);

	let written = match dial.await {
		Ok(result) => result,
		Err(e) => Err(DialError::Write(io::Error::other(format!("dial task failed: {}", e)))),
	};

	match written {
		Ok(count) => {
			debug!("[session] {} events written", count);
			outcome
		}
		Err(e) => Err(AgentError::Output(e)),
	}
}

// vim: ts=4
