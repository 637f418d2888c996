// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `sealwing unseal FILE...`
//!
//! Each FILE is a JSON object mapping an output path to a base64 sealed
//! value, for example:
//!
//! ```json
//! {
//!   "/var/lib/foo/bar.yaml": "... sealed ...",
//!   "/etc/foo.ini": "... sealed ..."
//! }
//! ```

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use sealwing_common_core::{deadline, CancellationToken};
use sealwing_wingman::{UnsealClient, DEFAULT_WINGMAN_URL};
use tracing::{debug, info, instrument};

/// Environment variable read when `--wingman-url` and
/// `SEALWING_WINGMAN_URL` are both absent.
const LEGACY_WINGMAN_URL_ENV: &str = "UNSEAL_WINGMAN_URL";

#[cfg(unix)]
const OUTPUT_MODE: u32 = 0o640;

#[derive(Args, Debug)]
pub struct UnsealArgs {
	/// JSON files mapping output paths to sealed values
	#[arg(required = true, value_name = "FILE")]
	pub files: Vec<PathBuf>,

	/// Base URL of the wingman sidecar [default: http://localhost:8070]
	#[arg(long, env = "SEALWING_WINGMAN_URL")]
	pub wingman_url: Option<String>,

	/// Seconds between readiness probes
	#[arg(long, env = "SEALWING_READY_INTERVAL_SECS", default_value_t = 10)]
	pub ready_interval_secs: u64,

	/// Give up waiting for the sidecar after this many seconds
	#[arg(long, env = "SEALWING_READY_TIMEOUT_SECS")]
	pub ready_timeout_secs: Option<u64>,
}

impl UnsealArgs {
	fn wingman_url(&self) -> String {
		self.wingman_url
			.clone()
			.or_else(|| std::env::var(LEGACY_WINGMAN_URL_ENV).ok())
			.filter(|url| !url.is_empty())
			.unwrap_or_else(|| DEFAULT_WINGMAN_URL.to_string())
	}
}

pub async fn run(args: UnsealArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
	let wingman_url = args.wingman_url();
	let client = UnsealClient::new(&wingman_url)
		.with_context(|| format!("invalid wingman URL {wingman_url:?}"))?;

	let ready_cancel = match args.ready_timeout_secs {
		Some(secs) => deadline(cancel, Duration::from_secs(secs)),
		None => cancel.child_token(),
	};
	client
		.readiness()
		.wait_for_ready(Duration::from_secs(args.ready_interval_secs), &ready_cancel)
		.await
		.context("wingman failed to reach ready status")?;
	ready_cancel.cancel();

	for file in &args.files {
		let written = process_file(&client, file, cancel).await?;
		info!(source = %file.display(), written, "Processed unseal specification");
	}
	Ok(())
}

/// Unseals every entry of one specification file. Returns the number of
/// files written.
#[instrument(skip(client, cancel), fields(source = %file.display()))]
pub async fn process_file(
	client: &UnsealClient,
	file: &Path,
	cancel: &CancellationToken,
) -> anyhow::Result<usize> {
	debug!("Reading unseal specification");
	let raw = tokio::fs::read(file)
		.await
		.with_context(|| format!("failed to read {}", file.display()))?;
	process_spec(client, &raw, cancel)
		.await
		.with_context(|| format!("failed to process {}", file.display()))
}

/// Stops at the first failing entry; files written before it are kept.
pub async fn process_spec(
	client: &UnsealClient,
	spec: &[u8],
	cancel: &CancellationToken,
) -> anyhow::Result<usize> {
	let spec: BTreeMap<PathBuf, String> =
		serde_json::from_slice(spec).context("failed to parse specification as JSON")?;

	for (path, sealed) in &spec {
		debug!(path = %path.display(), "Unsealing entry");
		let plaintext = client
			.unseal_encoded(sealed.as_bytes(), cancel)
			.await
			.with_context(|| format!("wingman unseal failed for {}", path.display()))?;
		write_secret(path, plaintext.expose())
			.with_context(|| format!("failed to write {}", path.display()))?;
		debug!(path = %path.display(), len = plaintext.len(), "Wrote unsealed file");
	}
	Ok(spec.len())
}

/// Creates or truncates `path` with mode 0640, resetting the mode of an
/// existing file too.
fn write_secret(path: &Path, contents: &[u8]) -> std::io::Result<()> {
	let mut options = std::fs::OpenOptions::new();
	options.write(true).create(true).truncate(true);
	#[cfg(unix)]
	{
		use std::os::unix::fs::OpenOptionsExt;
		options.mode(OUTPUT_MODE);
	}
	let mut file = options.open(path)?;
	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		file.set_permissions(std::fs::Permissions::from_mode(OUTPUT_MODE))?;
	}
	file.write_all(contents)?;
	file.sync_all()
}

#[cfg(test)]
mod tests {
	use super::*;
	use tempfile::TempDir;
	use wiremock::matchers::{body_string_contains, method, path};
	use wiremock::{Mock, MockServer, ResponseTemplate};

	async fn sidecar() -> (MockServer, UnsealClient) {
		let server = MockServer::start().await;
		// "c2ltcGxl" is base64("simple"); the sidecar answers base64("simple.json").
		Mock::given(method("POST"))
			.and(path("/secret/unseal"))
			.and(body_string_contains("string:///c2ltcGxl\""))
			.respond_with(ResponseTemplate::new(200).set_body_string("c2ltcGxlLmpzb24="))
			.mount(&server)
			.await;
		Mock::given(method("POST"))
			.and(path("/secret/unseal"))
			.and(body_string_contains("string:///ZGVuaWVk\""))
			.respond_with(ResponseTemplate::new(403))
			.mount(&server)
			.await;
		let client = UnsealClient::new(server.uri()).unwrap();
		(server, client)
	}

	fn spec(entries: &[(&Path, &str)]) -> Vec<u8> {
		let map: BTreeMap<String, String> = entries
			.iter()
			.map(|(p, v)| (p.display().to_string(), v.to_string()))
			.collect();
		serde_json::to_vec(&map).unwrap()
	}

	#[tokio::test]
	async fn writes_unsealed_files() {
		let (_server, client) = sidecar().await;
		let dir = TempDir::new().unwrap();
		let out = dir.path().join("simple.json");

		let written = process_spec(&client, &spec(&[(&out, "c2ltcGxl")]), &CancellationToken::new())
			.await
			.unwrap();
		assert_eq!(written, 1);
		assert_eq!(std::fs::read(&out).unwrap(), b"simple.json");
	}

	#[cfg(unix)]
	#[tokio::test]
	async fn output_files_are_group_readable_only() {
		use std::os::unix::fs::PermissionsExt;
		let (_server, client) = sidecar().await;
		let dir = TempDir::new().unwrap();
		let out = dir.path().join("existing");
		std::fs::write(&out, "stale").unwrap();
		std::fs::set_permissions(&out, std::fs::Permissions::from_mode(0o666)).unwrap();

		process_spec(&client, &spec(&[(&out, "c2ltcGxl")]), &CancellationToken::new())
			.await
			.unwrap();
		let mode = std::fs::metadata(&out).unwrap().permissions().mode();
		assert_eq!(mode & 0o777, 0o640);
		assert_eq!(std::fs::read(&out).unwrap(), b"simple.json");
	}

	#[tokio::test]
	async fn empty_input_is_a_parse_error() {
		let (_server, client) = sidecar().await;
		let err = process_spec(&client, b"", &CancellationToken::new())
			.await
			.unwrap_err();
		assert!(err.downcast_ref::<serde_json::Error>().is_some(), "{err:#}");
	}

	#[tokio::test]
	async fn first_failure_stops_processing() {
		let (_server, client) = sidecar().await;
		let dir = TempDir::new().unwrap();
		let denied = dir.path().join("a-denied");
		let later = dir.path().join("b-later");

		let err = process_spec(
			&client,
			&spec(&[(&denied, "ZGVuaWVk"), (&later, "c2ltcGxl")]),
			&CancellationToken::new(),
		)
		.await
		.unwrap_err();
		assert!(matches!(
			err.downcast_ref::<sealwing_wingman::UnsealError>(),
			Some(sealwing_wingman::UnsealError::PolicyDenied)
		));
		assert!(!denied.exists());
		assert!(!later.exists());
	}

	#[tokio::test]
	async fn missing_specification_file_is_reported() {
		let (_server, client) = sidecar().await;
		let err = process_file(
			&client,
			Path::new("/nonexistent/spec.json"),
			&CancellationToken::new(),
		)
		.await
		.unwrap_err();
		assert!(format!("{err:#}").contains("/nonexistent/spec.json"));
	}

	#[test]
	fn explicit_wingman_url_wins() {
		let args = UnsealArgs {
			files: vec![],
			wingman_url: Some("http://wingman.test:9000".into()),
			ready_interval_secs: 10,
			ready_timeout_secs: None,
		};
		assert_eq!(args.wingman_url(), "http://wingman.test:9000");
	}
}
