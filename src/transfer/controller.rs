//! Transfer controller
//!
//! Owns the session mode and the slot limiter. Every accepted transfer runs
//! as its own task holding one slot; the task reports through the outbound
//! event queue and always finishes with exactly one `complete`.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use tokio::fs as afs;
use tokio::io::{self, AsyncWriteExt};
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::progress::{ProgressReader, ProgressReporter, ProgressWriter};
use crate::backend::{BackendError, Repository};
use crate::error::TransferError;
use crate::logging::*;
use crate::protocol::error::ProtocolError;
use crate::protocol::events::Event;
use crate::protocol::messages::{Init, Operation, Transfer};

/// Slot count for a requested concurrency; zero or negative still allows one transfer
pub fn slot_capacity(requested: i64) -> usize {
	// the semaphore panics above its own permit limit
	usize::try_from(requested.max(1)).map_or(Semaphore::MAX_PERMITS, |n| n.min(Semaphore::MAX_PERMITS))
}

pub struct Controller {
	backend: Arc<dyn Repository>,
	staging_dir: PathBuf,
	events: mpsc::Sender<Event>,
	operation: Option<Operation>,
	slots: Arc<Semaphore>,
	capacity: usize,
	tasks: JoinSet<()>,
	cancel: CancellationToken,
}

impl Controller {
	pub fn new(
		backend: Arc<dyn Repository>,
		staging_dir: impl Into<PathBuf>,
		events: mpsc::Sender<Event>,
		cancel: CancellationToken,
	) -> Self {
		Self {
			backend,
			staging_dir: staging_dir.into(),
			events,
			operation: None,
			slots: Arc::new(Semaphore::new(1)),
			capacity: 1,
			tasks: JoinSet::new(),
			cancel,
		}
	}

	/// Mode set by the last `init`, if any
	pub fn operation(&self) -> Option<Operation> {
		self.operation
	}

	/// Slot count of the current limiter
	pub fn capacity(&self) -> usize {
		self.capacity
	}

	/// Transfers spawned and not yet reaped
	pub fn in_flight(&self) -> usize {
		self.tasks.len()
	}

	/// Apply an `init` message and acknowledge it
	///
	/// Transfers started under the previous limiter are waited for first, so
	/// no slot is ever held against a limiter that has been replaced.
	pub async fn init(&mut self, msg: &Init) -> Result<(), ProtocolError> {
		info!(
			"[init] operation={} concurrenttransfers={} remote={} concurrent={}",
			msg.operation,
			msg.concurrent_transfers,
			msg.remote.as_deref().unwrap_or("-"),
			msg.concurrent
		);

		if !self.tasks.is_empty() {
			debug!("[init] waiting for {} in-flight transfers before re-init", self.tasks.len());
		}
		self.drain().await?;

		self.capacity = slot_capacity(msg.concurrent_transfers);
		self.operation = Some(msg.operation);
		self.slots = Arc::new(Semaphore::new(self.capacity));

		self.events.send(Event::Confirm).await.map_err(|_| ProtocolError::OutputClosed)
	}

	/// Start one transfer once a slot is free
	///
	/// Blocks only until the slot is acquired; the transfer itself runs in the
	/// background. Cancellation while waiting starts nothing and sends nothing.
	pub async fn transfer(&mut self, msg: Transfer) -> Result<(), ProtocolError> {
		let permit = tokio::select! {
			biased;
			_ = self.cancel.cancelled() => return Err(ProtocolError::SlotAcquisition),
			permit = self.slots.clone().acquire_owned() => {
				permit.map_err(|_| ProtocolError::SlotAcquisition)?
			}
		};

		self.reap();

		let job = TransferJob {
			operation: self.operation,
			backend: self.backend.clone(),
			staging_dir: self.staging_dir.clone(),
			events: self.events.clone(),
			cancel: self.cancel.clone(),
			transfer: msg,
		};
		debug!("[transfer] {} started ({} bytes)", job.transfer.oid, job.transfer.size);
		self.tasks.spawn(job.run(permit));
		Ok(())
	}

	/// Wait for every in-flight transfer to finish
	pub async fn drain(&mut self) -> Result<(), ProtocolError> {
		loop {
			tokio::select! {
				biased;
				_ = self.cancel.cancelled() => {
					self.tasks.abort_all();
					return Err(ProtocolError::SlotAcquisition);
				}
				next = self.tasks.join_next() => match next {
					None => return Ok(()),
					Some(result) => log_task_exit(result),
				}
			}
		}
	}

	/// Abort every in-flight transfer
	pub fn abort(&mut self) {
		self.tasks.abort_all();
	}

	// Finished tasks stay in the set until joined
	fn reap(&mut self) {
		while let Some(result) = self.tasks.try_join_next() {
			log_task_exit(result);
		}
	}
}

fn log_task_exit(result: Result<(), tokio::task::JoinError>) {
	if let Err(e) = result {
		if e.is_panic() {
			error!("[transfer] task panicked: {}", e);
		}
	}
}

/// Everything one transfer needs, captured when it is accepted
struct TransferJob {
	operation: Option<Operation>,
	backend: Arc<dyn Repository>,
	staging_dir: PathBuf,
	events: mpsc::Sender<Event>,
	cancel: CancellationToken,
	transfer: Transfer,
}

impl TransferJob {
	async fn run(self, _permit: OwnedSemaphorePermit) {
		let result = match self.operation {
			Some(Operation::Upload) => self.upload().await.map(|()| None),
			Some(Operation::Download) => self.download().await.map(Some),
			None => Err(TransferError::UnsupportedOperation),
		};

		let oid = &self.transfer.oid;
		let event = match result {
			Ok(path) => {
				info!("[transfer] {} complete", oid);
				Event::Complete { oid: oid.clone(), path }
			}
			Err(e) => {
				warn!("[transfer] {} failed: {}", oid, e);
				Event::failed(oid, e.to_string())
			}
		};
		self.emit(event).await;
	}

	async fn upload(&self) -> Result<(), TransferError> {
		let oid = &self.transfer.oid;
		let path = self.transfer.path.clone().unwrap_or_default();
		let file = afs::File::open(&path)
			.await
			.map_err(|source| TransferError::OpenFile { path: path.clone(), source })?;

		self.emit(Event::started(oid)).await;
		let reader = ProgressReader::new(file, ProgressReporter::new(oid.as_str(), self.events.clone()));

		tokio::select! {
			_ = self.cancel.cancelled() => Err(TransferError::UploadFailed(BackendError::Cancelled)),
			result = self.backend.upload(oid, Box::new(reader), true) => {
				result.map_err(TransferError::UploadFailed)
			}
		}
	}

	async fn download(&self) -> Result<PathBuf, TransferError> {
		let oid = &self.transfer.oid;
		let path = self.staging_dir.join(oid);
		if !is_plain_name(oid) {
			return Err(TransferError::CreateFile {
				path,
				source: io::Error::new(io::ErrorKind::InvalidInput, "oid is not a plain file name"),
			});
		}

		afs::create_dir_all(&self.staging_dir)
			.await
			.map_err(|source| TransferError::CreateFile { path: self.staging_dir.clone(), source })?;
		let file = afs::OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.await
			.map_err(|source| TransferError::CreateFile { path: path.clone(), source })?;

		let mut source = tokio::select! {
			_ = self.cancel.cancelled() => Err(TransferError::DownloadFailed(BackendError::Cancelled)),
			result = self.backend.download(oid) => result.map_err(TransferError::DownloadFailed),
		}?;

		self.emit(Event::started(oid)).await;
		let mut writer = ProgressWriter::new(file, ProgressReporter::new(oid.as_str(), self.events.clone()));

		let copied = tokio::select! {
			_ = self.cancel.cancelled() => {
				Err(io::Error::new(io::ErrorKind::Interrupted, "operation cancelled"))
			}
			result = async {
				io::copy(&mut source, &mut writer).await?;
				writer.flush().await
			} => result,
		};
		// the writer may hold a queue reservation; give it back before `complete`
		drop(writer);
		copied.map_err(TransferError::CopyData)?;

		Ok(path)
	}

	async fn emit(&self, event: Event) {
		if self.events.send(event).await.is_err() {
			debug!("[transfer] {} output closed, event dropped", self.transfer.oid);
		}
	}
}

fn is_plain_name(oid: &str) -> bool {
	let mut components = Path::new(oid).components();
	matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
}


// vim: ts=4
