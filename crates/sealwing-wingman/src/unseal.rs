// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Unsealing through the sidecar's `/secret/unseal` endpoint.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::CONTENT_TYPE;
use reqwest::{StatusCode, Url};
use sealwing_common_core::{http_client_builder, CancellationToken, SecretBytes};
use tracing::{debug, instrument};

use crate::endpoint::{join_endpoint, STATUS_ENDPOINT, UNSEAL_ENDPOINT};
use crate::error::{UnsealError, UnsealResult};
use crate::status::ReadinessPoller;

const REQUEST_PREFIX: &[u8] = br#"{"type":"blindfold","location":"string:///"#;
const REQUEST_SUFFIX: &[u8] = br#""}"#;

/// Builds the unseal request body around an already base64-encoded payload.
///
/// The payload is spliced in verbatim; base64 never needs JSON escaping.
pub fn unseal_request_body(sealed_base64: &[u8]) -> Vec<u8> {
	let mut body =
		Vec::with_capacity(REQUEST_PREFIX.len() + sealed_base64.len() + REQUEST_SUFFIX.len());
	body.extend_from_slice(REQUEST_PREFIX);
	body.extend_from_slice(sealed_base64);
	body.extend_from_slice(REQUEST_SUFFIX);
	body
}

/// Client for one wingman sidecar.
#[derive(Clone)]
pub struct UnsealClient {
	http_client: reqwest::Client,
	endpoint: String,
	unseal_url: Url,
	status_url: Url,
}

impl UnsealClient {
	/// `endpoint` is the sidecar base URL, e.g.
	/// [`DEFAULT_WINGMAN_URL`](crate::DEFAULT_WINGMAN_URL).
	pub fn new(endpoint: impl Into<String>) -> UnsealResult<Self> {
		let http_client = http_client_builder().build()?;
		Self::with_http_client(endpoint, http_client)
	}

	pub fn with_http_client(
		endpoint: impl Into<String>,
		http_client: reqwest::Client,
	) -> UnsealResult<Self> {
		let endpoint = endpoint.into();
		let unseal_url =
			join_endpoint(&endpoint, UNSEAL_ENDPOINT).map_err(UnsealError::InvalidEndpoint)?;
		let status_url =
			join_endpoint(&endpoint, STATUS_ENDPOINT).map_err(UnsealError::InvalidEndpoint)?;
		Ok(Self {
			http_client,
			endpoint,
			unseal_url,
			status_url,
		})
	}

	pub fn endpoint(&self) -> &str {
		&self.endpoint
	}

	/// A poller for the same sidecar, sharing this client's connection pool.
	pub fn readiness(&self) -> ReadinessPoller {
		ReadinessPoller::from_parts(self.http_client.clone(), self.status_url.clone())
	}

	/// Base64-encodes `sealed` and unseals it.
	pub async fn unseal(
		&self,
		sealed: &[u8],
		cancel: &CancellationToken,
	) -> UnsealResult<SecretBytes> {
		let encoded = STANDARD.encode(sealed);
		self.unseal_encoded(encoded.as_bytes(), cancel).await
	}

	/// Unseals a payload that is already base64 text, as produced by the
	/// sealing tool.
	#[instrument(skip_all, fields(endpoint = %self.unseal_url))]
	pub async fn unseal_encoded(
		&self,
		sealed_base64: &[u8],
		cancel: &CancellationToken,
	) -> UnsealResult<SecretBytes> {
		let request = async {
			let response = self
				.http_client
				.post(self.unseal_url.clone())
				.header(CONTENT_TYPE, "application/json")
				.body(unseal_request_body(sealed_base64))
				.send()
				.await?;
			let status = response.status();
			let body = response.bytes().await?;
			Ok::<_, reqwest::Error>((status, body))
		};
		let (status, body) = tokio::select! {
			result = request => result?,
			_ = cancel.cancelled() => return Err(UnsealError::Cancelled),
		};
		debug!(%status, "Unseal response received");

		match status {
			StatusCode::OK => {
				let plaintext = STANDARD
					.decode(&body)
					.map_err(|e| UnsealError::InvalidResponse(e.to_string()))?;
				Ok(SecretBytes::new(plaintext))
			}
			StatusCode::FORBIDDEN => Err(UnsealError::PolicyDenied),
			StatusCode::SERVICE_UNAVAILABLE => Err(UnsealError::NotReady(body_text(&body))),
			other => Err(UnsealError::UnexpectedStatus {
				status: other.as_u16(),
				body: body_text(&body),
			}),
		}
	}
}

impl std::fmt::Debug for UnsealClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("UnsealClient")
			.field("endpoint", &self.endpoint)
			.finish()
	}
}

/// Error bodies are carried whole; only invalid UTF-8 is replaced.
fn body_text(body: &[u8]) -> String {
	String::from_utf8_lossy(body).into_owned()
}
