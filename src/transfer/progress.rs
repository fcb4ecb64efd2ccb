//! Byte-counting stream wrappers
//!
//! [`ProgressReader`] and [`ProgressWriter`] sit between a transfer and its
//! data source or sink. They never touch the bytes; after every underlying
//! call that moved `n > 0` bytes they hand `(total, n)` to an observer and
//! return the inner result as-is.
//!
//! An observer can hold the stream back: [`ProgressObserver::poll_ready`] is
//! polled before each underlying call, and [`ProgressReporter`] uses it to
//! reserve room on the outbound event queue. A slow output therefore slows
//! transfers down instead of piling up progress events in memory.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::sync::mpsc;
use tokio_util::sync::PollSender;

use crate::protocol::events::Event;

/// Receives byte counts from a progress wrapper
pub trait ProgressObserver: Send {
	/// Ready to accept the next observation
	fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<()> {
		Poll::Ready(())
	}

	/// Called after an underlying read or write moved `bytes_since_last > 0` bytes
	fn observe(&mut self, bytes_so_far: u64, bytes_since_last: u64);

	/// The wrapped call moved nothing; drop whatever `poll_ready` reserved
	fn release(&mut self) {}
}

/// Adapts a plain closure into an observer that never applies backpressure
pub struct Callback<F>(pub F);

impl<F> ProgressObserver for Callback<F>
where
	F: FnMut(u64, u64) + Send,
{
	fn observe(&mut self, bytes_so_far: u64, bytes_since_last: u64) {
		(self.0)(bytes_so_far, bytes_since_last)
	}
}

/// Turns observations into `progress` events for one transfer
pub struct ProgressReporter {
	oid: String,
	sender: PollSender<Event>,
}

impl ProgressReporter {
	pub fn new(oid: impl Into<String>, events: mpsc::Sender<Event>) -> Self {
		Self { oid: oid.into(), sender: PollSender::new(events) }
	}
}

impl ProgressObserver for ProgressReporter {
	fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<()> {
		// A closed queue means the dial is gone; keep the data moving and let
		// the transfer finish on its own.
		match self.sender.poll_reserve(cx) {
			Poll::Ready(_) => Poll::Ready(()),
			Poll::Pending => Poll::Pending,
		}
	}

	fn observe(&mut self, bytes_so_far: u64, bytes_since_last: u64) {
		let _ = self.sender.send_item(Event::progress(&self.oid, bytes_so_far, bytes_since_last));
	}

	fn release(&mut self) {
		self.sender.abort_send();
	}
}

/// Reader that reports every chunk it yields
pub struct ProgressReader<R, O> {
	inner: R,
	observer: O,
	total: u64,
}

impl<R, O> ProgressReader<R, O> {
	pub fn new(inner: R, observer: O) -> Self {
		Self { inner, observer, total: 0 }
	}

	/// Bytes read through this wrapper so far
	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn into_inner(self) -> R {
		self.inner
	}
}

impl<R, O> AsyncRead for ProgressReader<R, O>
where
	R: AsyncRead + Unpin,
	O: ProgressObserver + Unpin,
{
	fn poll_read(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &mut ReadBuf<'_>,
	) -> Poll<io::Result<()>> {
		let this = self.get_mut();
		if this.observer.poll_ready(cx).is_pending() {
			return Poll::Pending;
		}

		let before = buf.filled().len();
		let result = match Pin::new(&mut this.inner).poll_read(cx, buf) {
			Poll::Ready(result) => result,
			Poll::Pending => return Poll::Pending,
		};

		let n = (buf.filled().len() - before) as u64;
		if n > 0 {
			this.total += n;
			this.observer.observe(this.total, n);
		} else {
			this.observer.release();
		}
		Poll::Ready(result)
	}
}

/// Writer that reports every chunk it accepts
pub struct ProgressWriter<W, O> {
	inner: W,
	observer: O,
	total: u64,
}

impl<W, O> ProgressWriter<W, O> {
	pub fn new(inner: W, observer: O) -> Self {
		Self { inner, observer, total: 0 }
	}

	/// Bytes written through this wrapper so far
	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn into_inner(self) -> W {
		self.inner
	}
}

impl<W, O> AsyncWrite for ProgressWriter<W, O>
where
	W: AsyncWrite + Unpin,
	O: ProgressObserver + Unpin,
{
	fn poll_write(
		self: Pin<&mut Self>,
		cx: &mut Context<'_>,
		buf: &[u8],
	) -> Poll<io::Result<usize>> {
		let this = self.get_mut();
		if this.observer.poll_ready(cx).is_pending() {
			return Poll::Pending;
		}

		let result = match Pin::new(&mut this.inner).poll_write(cx, buf) {
			Poll::Ready(result) => result,
			Poll::Pending => return Poll::Pending,
		};

		match result {
			Ok(n) if n > 0 => {
				this.total += n as u64;
				this.observer.observe(this.total, n as u64);
			}
			_ => this.observer.release(),
		}
		Poll::Ready(result)
	}

	fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		Pin::new(&mut self.get_mut().inner).poll_flush(cx)
	}

	fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
		let this = self.get_mut();
		this.observer.release();
		Pin::new(&mut this.inner).poll_shutdown(cx)
	}
}


// vim: ts=4
