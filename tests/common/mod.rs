//! Shared fixtures for session tests: a scripted in-memory repository and a
//! harness that runs a full session over in-memory pipes.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Cursor;
use std::io;
use std::path::Path;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{
	AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadBuf,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use yadlfs::backend::{ByteSource, Repository};
use yadlfs::{run_session, AgentError, BackendError, SessionOptions, Termination};

/// How long a test waits for the next output line
pub const LINE_TIMEOUT: Duration = Duration::from_secs(5);

/// Message of the error a broken download stream ends with
pub const STREAM_RESET: &str = "connection reset by peer";

#[derive(Clone)]
enum Object {
	Whole(Vec<u8>),
	/// Yields the bytes, then fails the next read
	Broken(Vec<u8>),
	Missing(String),
}

/// Stream that fails every read
struct ResetStream;

impl AsyncRead for ResetStream {
	fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
		Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, STREAM_RESET)))
	}
}

/// Repository that keeps objects in memory
///
/// Uploads are read in `chunk_size` pieces so progress events land on
/// predictable offsets.
pub struct MockRepository {
	chunk_size: usize,
	delay: Duration,
	stalled: bool,
	objects: Mutex<HashMap<String, Object>>,
	uploads: Mutex<HashMap<String, Vec<u8>>>,
	active: AtomicUsize,
	peak: AtomicUsize,
}

impl MockRepository {
	pub fn new(chunk_size: usize) -> Self {
		Self {
			chunk_size,
			delay: Duration::ZERO,
			stalled: false,
			objects: Mutex::new(HashMap::new()),
			uploads: Mutex::new(HashMap::new()),
			active: AtomicUsize::new(0),
			peak: AtomicUsize::new(0),
		}
	}

	/// Hold every call for `delay` before touching data
	pub fn with_delay(mut self, delay: Duration) -> Self {
		self.delay = delay;
		self
	}

	/// Never answer a call; only cancellation gets a transfer out
	pub fn stalled(mut self) -> Self {
		self.stalled = true;
		self
	}

	pub fn serve(&self, name: &str, bytes: Vec<u8>) {
		self.objects.lock().unwrap().insert(name.to_string(), Object::Whole(bytes));
	}

	/// Serve `bytes` and then break the stream with [`STREAM_RESET`]
	pub fn serve_broken(&self, name: &str, bytes: Vec<u8>) {
		self.objects.lock().unwrap().insert(name.to_string(), Object::Broken(bytes));
	}

	pub fn fail(&self, name: &str, message: &str) {
		self.objects.lock().unwrap().insert(name.to_string(), Object::Missing(message.to_string()));
	}


	pub fn uploaded(&self, name: &str) -> Option<Vec<u8>> {
		self.uploads.lock().unwrap().get(name).cloned()
	}

	/// Highest number of calls that were in flight at once
	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}

	fn enter(&self) {
		let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(now, Ordering::SeqCst);
	}

	fn leave(&self) {
		self.active.fetch_sub(1, Ordering::SeqCst);
	}

	async fn hold(&self) {
		if self.stalled {
			std::future::pending::<()>().await;
		}
		tokio::time::sleep(self.delay).await;
	}
}

/// Keeps the active count right when a call is dropped mid-way
struct Active<'a>(&'a MockRepository);

impl<'a> Active<'a> {
	fn enter(repo: &'a MockRepository) -> Self {
		repo.enter();
		Self(repo)
	}
}

impl Drop for Active<'_> {
	fn drop(&mut self) {
		self.0.leave();
	}
}

#[async_trait]
impl Repository for MockRepository {
	async fn upload(&self, name: &str, mut source: ByteSource, _overwrite: bool) -> Result<(), BackendError> {
		let _active = Active::enter(self);
		self.hold().await;

		let mut data = Vec::new();
		let mut buf = vec![0u8; self.chunk_size];
		let result = loop {
			match source.read(&mut buf).await {
				Ok(0) => break Ok(()),
				Ok(n) => data.extend_from_slice(&buf[..n]),
				Err(e) => break Err(BackendError::from(e)),
			}
		};
		drop(source);

		if result.is_ok() {
			self.uploads.lock().unwrap().insert(name.to_string(), data);
		}
		result
	}

	async fn download(&self, name: &str) -> Result<ByteSource, BackendError> {
		let _active = Active::enter(self);
		self.hold().await;
		let object = self.objects.lock().unwrap().get(name).cloned();

		match object {
			Some(Object::Whole(bytes)) => Ok(Box::new(Cursor::new(bytes))),
			Some(Object::Broken(bytes)) => Ok(Box::new(Cursor::new(bytes).chain(ResetStream))),
			Some(Object::Missing(message)) => Err(BackendError::Other(message)),
			None => Err(BackendError::Other(format!("object {} not found", name))),
		}
	}
}

/// A running session driven through in-memory pipes
pub struct Agent {
	pub input: DuplexStream,
	pub output: Lines<BufReader<DuplexStream>>,
	pub session: JoinHandle<Result<Termination, AgentError>>,
	pub cancel: CancellationToken,
}

pub fn start(backend: Arc<MockRepository>, staging: &Path) -> Agent {
	start_with(backend, staging, 1, 64 * 1024)
}

/// Start a session with a given outbound queue size and output pipe buffer
pub fn start_with(
	backend: Arc<MockRepository>,
	staging: &Path,
	outbound_capacity: usize,
	output_buffer: usize,
) -> Agent {
	let (input, agent_input) = tokio::io::duplex(64 * 1024);
	let (agent_output, output) = tokio::io::duplex(output_buffer);
	let cancel = CancellationToken::new();
	let options = SessionOptions { staging_dir: staging.to_path_buf(), outbound_capacity };

	let session = tokio::spawn(run_session(
		BufReader::new(agent_input),
		agent_output,
		backend,
		options,
		cancel.clone(),
	));

	Agent { input, output: BufReader::new(output).lines(), session, cancel }
}

impl Agent {
	pub async fn send(&mut self, line: &str) {
		self.input.write_all(line.as_bytes()).await.unwrap();
		self.input.write_all(b"\n").await.unwrap();
	}

	/// Close the input the way git-lfs does when it exits without `terminate`
	pub async fn close_input(&mut self) {
		self.input.shutdown().await.unwrap();
	}

	pub async fn next_line(&mut self) -> String {
		tokio::time::timeout(LINE_TIMEOUT, self.output.next_line())
			.await
			.expect("timed out waiting for output")
			.unwrap()
			.expect("output closed")
	}

	pub async fn next_json(&mut self) -> serde_json::Value {
		let line = self.next_line().await;
		serde_json::from_str(&line).unwrap_or_else(|e| panic!("bad line {:?}: {}", line, e))
	}

	/// Read everything left on the output and wait for the session result
	pub async fn finish(mut self) -> (Result<Termination, AgentError>, Vec<String>) {
		let mut rest = Vec::new();
		loop {
			let next = tokio::time::timeout(LINE_TIMEOUT, self.output.next_line())
				.await
				.expect("timed out draining output");
			match next {
				Ok(Some(line)) => rest.push(line),
				Ok(None) | Err(_) => break,
			}
		}
		let result = tokio::time::timeout(LINE_TIMEOUT, self.session)
			.await
			.expect("session did not finish")
			.expect("session task panicked");
		(result, rest)
	}
}

pub fn init_line(operation: &str, concurrent_transfers: i64) -> String {
	format!(
		r#"{{ "event": "init", "operation": "{}", "remote": "origin", "concurrent": true, "concurrenttransfers": {} }}"#,
		operation, concurrent_transfers
	)
}

pub fn transfer_line(event: &str, oid: &str, size: u64, path: Option<&Path>) -> String {
	match path {
		Some(path) => format!(
			r#"{{ "event": "{}", "oid": "{}", "size": {}, "path": {} }}"#,
			event,
			oid,
			size,
			serde_json::to_string(&path.display().to_string()).unwrap()
		),
		None => format!(r#"{{ "event": "{}", "oid": "{}", "size": {} }}"#, event, oid, size),
	}
}

pub const TERMINATE: &str = r#"{ "event": "terminate" }"#;

pub fn progress(oid: &str, so_far: u64, since_last: u64) -> String {
	format!(
		r#"{{"event":"progress","oid":"{}","bytesSoFar":{},"bytesSinceLast":{}}}"#,
		oid, so_far, since_last
	)
}

// vim: ts=4
