// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Authenticated client for the secret management API.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use sealwing_common_core::{http_client_builder, sanitize_excerpt, CancellationToken, SecretString};
use tracing::{debug, instrument};

use crate::envelope::{PolicyDocumentEnvelope, PublicKeyEnvelope};
use crate::error::{XcError, XcResult};
use crate::types::{PolicyDocument, PublicKey};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest response body excerpt kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// How the client authenticates.
#[derive(Debug, Clone)]
pub enum Credentials {
	/// Sent as `Authorization: APIToken <token>`.
	Token(SecretString),
	/// PEM certificate and PEM private key used for mutual TLS.
	CertKeyPair { cert: PathBuf, key: PathBuf },
}

/// Configuration for [`XcClient`].
#[derive(Debug, Clone)]
pub struct XcClientConfig {
	/// Base API URL. Only scheme and authority are used; resource paths are
	/// absolute.
	pub endpoint: String,
	pub credentials: Option<Credentials>,
	/// Extra PEM CA certificate trusted alongside the system roots.
	pub ca_cert: Option<PathBuf>,
	/// Permit an `http://` endpoint. Only for tests and local proxies.
	pub allow_insecure: bool,
}

impl XcClientConfig {
	pub fn new(endpoint: impl Into<String>) -> Self {
		Self {
			endpoint: endpoint.into(),
			credentials: None,
			ca_cert: None,
			allow_insecure: false,
		}
	}

	pub fn with_token(mut self, token: SecretString) -> Self {
		self.credentials = Some(Credentials::Token(token));
		self
	}

	pub fn with_cert_key_pair(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
		self.credentials = Some(Credentials::CertKeyPair {
			cert: cert.into(),
			key: key.into(),
		});
		self
	}

	pub fn with_ca_cert(mut self, ca_cert: impl Into<PathBuf>) -> Self {
		self.ca_cert = Some(ca_cert.into());
		self
	}

	pub fn with_allow_insecure(mut self, allow_insecure: bool) -> Self {
		self.allow_insecure = allow_insecure;
		self
	}
}

/// Fetches sealing inputs from the secret management API.
pub struct XcClient {
	http_client: reqwest::Client,
	endpoint: Url,
}

impl XcClient {
	pub fn new(config: XcClientConfig) -> XcResult<Self> {
		let endpoint = parse_endpoint(&config.endpoint, config.allow_insecure)?;
		let credentials = config.credentials.ok_or(XcError::MissingAuthentication)?;

		let mut headers = HeaderMap::new();
		headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		let mut builder = http_client_builder()
			.connect_timeout(CONNECT_TIMEOUT)
			.min_tls_version(reqwest::tls::Version::TLS_1_2);

		match &credentials {
			Credentials::Token(token) => {
				let mut value = HeaderValue::from_str(&format!("APIToken {}", token.expose()))
					.map_err(|_| XcError::Configuration("API token contains invalid characters".into()))?;
				value.set_sensitive(true);
				headers.insert(AUTHORIZATION, value);
			}
			Credentials::CertKeyPair { cert, key } => {
				let mut pem = read_file(cert)?;
				pem.push(b'\n');
				pem.extend(read_file(key)?);
				let identity = reqwest::Identity::from_pem(&pem).map_err(|e| {
					XcError::Configuration(format!("failed to load client certificate: {e}"))
				})?;
				builder = builder.identity(identity);
			}
		}

		if let Some(ca_cert) = &config.ca_cert {
			let pem = read_file(ca_cert)?;
			let certificate = reqwest::Certificate::from_pem(&pem).map_err(|e| {
				XcError::Configuration(format!(
					"failed to process CA certificate {}: {e}",
					ca_cert.display()
				))
			})?;
			builder = builder.add_root_certificate(certificate);
		}

		let http_client = builder.default_headers(headers).build()?;

		Ok(Self {
			http_client,
			endpoint,
		})
	}

	/// Fetches the tenant's public key, optionally at a specific version.
	///
	/// Returns `Ok(None)` when the API reports 404.
	#[instrument(skip(self, cancel))]
	pub async fn get_public_key(
		&self,
		version: Option<i64>,
		cancel: &CancellationToken,
	) -> XcResult<Option<PublicKey>> {
		let mut url = self.api_url(&["api", "secret_management", "get_public_key"])?;
		if let Some(version) = version {
			url
				.query_pairs_mut()
				.append_pair("key_version", &version.to_string());
		}
		let Some(body) = self.envelope_call(url, cancel).await? else {
			return Ok(None);
		};
		let envelope: PublicKeyEnvelope =
			serde_json::from_slice(&body).map_err(|e| XcError::InvalidResponse(e.to_string()))?;
		Ok(Some(envelope.data))
	}

	/// Fetches a secret policy document by name and namespace.
	///
	/// Returns `Ok(None)` when the API reports 404.
	#[instrument(skip(self, cancel))]
	pub async fn get_policy_document(
		&self,
		name: &str,
		namespace: &str,
		cancel: &CancellationToken,
	) -> XcResult<Option<PolicyDocument>> {
		let url = self.api_url(&[
			"api",
			"secret_management",
			"namespaces",
			namespace,
			"secret_policys",
			name,
			"get_policy_document",
		])?;
		let Some(body) = self.envelope_call(url, cancel).await? else {
			return Ok(None);
		};
		let envelope: PolicyDocumentEnvelope =
			serde_json::from_slice(&body).map_err(|e| XcError::InvalidResponse(e.to_string()))?;
		Ok(Some(envelope.data))
	}

	fn api_url(&self, segments: &[&str]) -> XcResult<Url> {
		let mut url = self.endpoint.clone();
		url.set_query(None);
		url.set_fragment(None);
		url
			.path_segments_mut()
			.map_err(|_| XcError::InvalidEndpoint(self.endpoint.to_string()))?
			.clear()
			.extend(segments);
		Ok(url)
	}

	/// Issues a GET and classifies the status. 200 yields the raw body, 404
	/// yields `None`.
	async fn envelope_call(
		&self,
		url: Url,
		cancel: &CancellationToken,
	) -> XcResult<Option<Vec<u8>>> {
		debug!(url = %url, "Calling API");
		let request = async {
			let response = self.http_client.get(url).send().await?;
			let status = response.status();
			let body = response.bytes().await?;
			Ok::<_, reqwest::Error>((status, body))
		};
		let (status, body) = tokio::select! {
			result = request => result?,
			_ = cancel.cancelled() => return Err(XcError::Cancelled),
		};
		debug!(status = %status, "API response received");

		match status {
			StatusCode::OK => Ok(Some(body.to_vec())),
			StatusCode::NOT_FOUND => Ok(None),
			StatusCode::UNAUTHORIZED => Err(XcError::Unauthorized),
			StatusCode::FORBIDDEN => Err(XcError::Forbidden),
			other => Err(XcError::UnexpectedStatus {
				status: other.as_u16(),
				body: sanitize_excerpt(&String::from_utf8_lossy(&body), MAX_ERROR_BODY),
			}),
		}
	}
}

impl std::fmt::Debug for XcClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("XcClient")
			.field("endpoint", &self.endpoint.as_str())
			.finish()
	}
}

fn parse_endpoint(raw: &str, allow_insecure: bool) -> XcResult<Url> {
	let url = Url::parse(raw).map_err(|e| XcError::InvalidEndpoint(format!("{raw}: {e}")))?;
	match url.scheme() {
		"https" => {}
		"http" if allow_insecure => {}
		_ => {
			return Err(XcError::InvalidEndpoint(format!(
				"{raw}: scheme must be https"
			)))
		}
	}
	if url.host_str().map_or(true, str::is_empty) {
		return Err(XcError::InvalidEndpoint(format!("{raw}: host must be present")));
	}
	Ok(url)
}

fn read_file(path: &Path) -> XcResult<Vec<u8>> {
	std::fs::read(path).map_err(|source| XcError::CertificateFile {
		path: path.to_path_buf(),
		source,
	})
}
