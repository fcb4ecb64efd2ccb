use tokio_util::sync::CancellationToken;

use crate::logging::*;

/// Cancel `token` on SIGTERM or SIGINT
///
/// Transfers and both session loops watch the token, so a signal ends the
/// session instead of killing the process mid-line.
#[cfg(unix)]
pub fn spawn_signal_handlers(token: CancellationToken) {
	tokio::spawn(async move {
		use tokio::signal;

		let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGTERM handler: {}. Process will not handle SIGTERM gracefully.", e);
				return;
			}
		};

		let mut sigint = match signal::unix::signal(signal::unix::SignalKind::interrupt()) {
			Ok(stream) => stream,
			Err(e) => {
				warn!("Failed to setup SIGINT handler: {}. Process will not handle SIGINT gracefully.", e);
				return;
			}
		};

		tokio::select! {
			_ = sigterm.recv() => debug!("Received SIGTERM, cancelling session"),
			_ = sigint.recv() => debug!("Received SIGINT, cancelling session"),
			_ = token.cancelled() => return,
		}
		token.cancel();
	});
}

#[cfg(not(unix))]
pub fn spawn_signal_handlers(token: CancellationToken) {
	tokio::spawn(async move {
		tokio::select! {
			result = tokio::signal::ctrl_c() => match result {
				Ok(()) => {
					debug!("Received Ctrl-C, cancelling session");
					token.cancel();
				}
				Err(e) => warn!("Failed to setup Ctrl-C handler: {}", e),
			},
			_ = token.cancelled() => {}
		}
	});
}


// vim: ts=4
