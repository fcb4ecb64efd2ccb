//! Yandex.Disk REST backend
//!
//! Both directions take two requests: ask the API for a one-shot transfer
//! link (`{href, method}`), then move the bytes with that link. Objects live
//! at `<project folder>/<oid>` on the disk.

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::AUTHORIZATION;
use reqwest::{Body, Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::io;
use tokio_util::io::{ReaderStream, StreamReader};
use tracing::debug;

use super::{BackendError, ByteSource, Repository};

/// Public REST endpoint of Yandex.Disk
pub const DEFAULT_API_BASE_URL: &str = "https://cloud-api.yandex.net/v1/disk";

/// Transfer link returned by the `resources/upload` and `resources/download` endpoints
#[derive(Debug, Deserialize)]
struct Link {
	href: String,
	#[serde(default = "default_link_method")]
	method: String,
}

fn default_link_method() -> String {
	"GET".to_string()
}

/// Yandex.Disk client scoped to one project folder
#[derive(Clone)]
pub struct YandexDisk {
	client: Client,
	oauth_token: String,
	folder: String,
	base_url: String,
}

impl fmt::Debug for YandexDisk {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("YandexDisk")
			.field("folder", &self.folder)
			.field("base_url", &self.base_url)
			.finish_non_exhaustive()
	}
}

impl YandexDisk {
	pub fn new(
		oauth_token: impl Into<String>,
		folder: impl Into<String>,
		base_url: impl Into<String>,
	) -> Result<Self, BackendError> {
		let client = Client::builder()
			.user_agent(concat!("yadlfs/", env!("CARGO_PKG_VERSION")))
			.build()
			.map_err(|source| BackendError::Request { context: "failed to create client", source })?;

		Ok(Self {
			client,
			oauth_token: oauth_token.into(),
			folder: folder.into(),
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	/// Path of an object inside the project folder
	pub fn remote_path(&self, name: &str) -> String {
		let folder = self.folder.trim_end_matches('/');
		if folder.is_empty() {
			name.to_string()
		} else {
			format!("{}/{}", folder, name)
		}
	}

	fn auth_header(&self) -> String {
		format!("OAuth {}", self.oauth_token)
	}

	async fn request_link(
		&self,
		endpoint: &str,
		query: &[(&str, String)],
		context: &'static str,
		decode_context: &'static str,
	) -> Result<Link, BackendError> {
		let url = format!("{}/resources/{}", self.base_url, endpoint);
		let response = self
			.client
			.get(&url)
			.query(query)
			.header(AUTHORIZATION, self.auth_header())
			.send()
			.await
			.map_err(|source| BackendError::Request { context, source })?;

		let response = expect_status(response, &[StatusCode::OK], context)?;
		let link: Link = response
			.json()
			.await
			.map_err(|source| BackendError::Decode { context: decode_context, source })?;
		debug!("[yandex] {} link resolved, method {}", endpoint, link.method);
		Ok(link)
	}
}

fn parse_method(method: &str) -> Result<Method, BackendError> {
	Method::from_bytes(method.as_bytes()).map_err(|_| {
		BackendError::Other(format!("failed to create request: invalid method {:?}", method))
	})
}

fn expect_status(
	response: Response,
	accepted: &[StatusCode],
	context: &'static str,
) -> Result<Response, BackendError> {
	let status = response.status();
	if accepted.contains(&status) {
		Ok(response)
	} else {
		Err(BackendError::Status {
			context,
			status: status.as_u16(),
			reason: status.canonical_reason().unwrap_or("").to_string(),
		})
	}
}

#[async_trait]
impl Repository for YandexDisk {
	async fn upload(&self, name: &str, source: ByteSource, overwrite: bool) -> Result<(), BackendError> {
		let query = [("path", self.remote_path(name)), ("overwrite", overwrite.to_string())];
		let link = self
			.request_link(
				"upload",
				&query,
				"failed to request upload URL",
				"failed to decode upload URL response",
			)
			.await?;

		let body = Body::wrap_stream(ReaderStream::new(source));
		let response = self
			.client
			.request(parse_method(&link.method)?, &link.href)
			.body(body)
			.send()
			.await
			.map_err(|source| BackendError::Request { context: "failed to upload file", source })?;

		// 202 means the disk accepted the bytes and is still storing them
		expect_status(response, &[StatusCode::CREATED, StatusCode::ACCEPTED], "failed to upload file")?;
		Ok(())
	}

	async fn download(&self, name: &str) -> Result<ByteSource, BackendError> {
		let query = [("path", self.remote_path(name))];
		let link = self
			.request_link(
				"download",
				&query,
				"failed to request download URL",
				"failed to decode download URL response",
			)
			.await?;

		let response = self
			.client
			.request(parse_method(&link.method)?, &link.href)
			.header(AUTHORIZATION, self.auth_header())
			.send()
			.await
			.map_err(|source| BackendError::Request { context: "failed to download file", source })?;
		let response = expect_status(response, &[StatusCode::OK], "failed to download file")?;

		let stream = Box::pin(response.bytes_stream().map_err(io::Error::other));
		Ok(Box::new(StreamReader::new(stream)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_remote_path_joins_folder() {
		let disk = YandexDisk::new("token", "/lfs/project/", DEFAULT_API_BASE_URL).unwrap();
		assert_eq!(disk.remote_path("0a5070"), "/lfs/project/0a5070");

		let disk = YandexDisk::new("token", "", DEFAULT_API_BASE_URL).unwrap();
		assert_eq!(disk.remote_path("0a5070"), "0a5070");
	}

	#[test]
	fn test_debug_hides_token() {
		let disk = YandexDisk::new("secret-token", "/lfs", DEFAULT_API_BASE_URL).unwrap();
		assert!(!format!("{:?}", disk).contains("secret-token"));
	}

	#[test]
	fn test_link_method_defaults_to_get() {
		let link: Link = serde_json::from_str(r#"{"href":"https://example.invalid/x"}"#).unwrap();
		assert_eq!(link.method, "GET");
		assert_eq!(parse_method(&link.method).unwrap(), Method::GET);
		assert!(parse_method("NOT A METHOD").is_err());
	}

	#[tokio::test]
	async fn test_unreachable_api_is_request_error() {
		// port 9 on localhost is discard; nothing listens there in CI
		let disk = YandexDisk::new("token", "/lfs", "http://127.0.0.1:9").unwrap();
		match disk.download("0a5070").await {
			Err(BackendError::Request { context, .. }) => {
				assert_eq!(context, "failed to request download URL")
			}
			Err(other) => panic!("expected request error, got {}", other),
			Ok(_) => panic!("download from unreachable API should fail"),
		}
	}
}

// vim: ts=4
