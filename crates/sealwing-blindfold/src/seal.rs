// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use sealwing_common_core::CancellationToken;
use sealwing_xc::{Envelope, PolicyDocument, PublicKey};
use tempfile::TempDir;
use tracing::{debug, instrument, warn};

use crate::error::{SealResult, StagingError};
use crate::locate::{locate_tool, DEFAULT_TOOL};
use crate::output::{HeaderPayloadParser, OutputParser};
use crate::runner::{IsolatedRunner, OutputCapture, OverridePolicy};
use crate::staging::{stage_plaintext, stage_resource, Plaintext};

/// Opaque output of the sealing tool, in practice base64 text.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SealedSecret(Vec<u8>);

impl SealedSecret {
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	pub fn into_bytes(self) -> Vec<u8> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for SealedSecret {
	fn from(bytes: Vec<u8>) -> Self {
		Self(bytes)
	}
}

impl std::fmt::Debug for SealedSecret {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "SealedSecret({} bytes)", self.0.len())
	}
}

/// Seals plaintext with the external tool.
///
/// Each call stages its inputs in a fresh directory and runs the tool under
/// its own decoy context, so one `Sealer` can serve concurrent calls.
#[derive(Debug, Clone)]
pub struct Sealer {
	tool: String,
	temp_root: Option<PathBuf>,
	runner: IsolatedRunner,
	parser: Arc<dyn OutputParser>,
}

impl Default for Sealer {
	fn default() -> Self {
		Self::new(DEFAULT_TOOL)
	}
}

impl Sealer {
	/// `tool` is a bare name searched on `PATH`, a path, or empty for
	/// [`DEFAULT_TOOL`].
	pub fn new(tool: impl Into<String>) -> Self {
		Self {
			tool: tool.into(),
			temp_root: None,
			runner: IsolatedRunner::new(),
			parser: Arc::new(HeaderPayloadParser),
		}
	}

	/// Parent directory for scratch directories and decoy files.
	pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
		let root = root.into();
		self.runner = self.runner.with_temp_root(root.clone());
		self.temp_root = Some(root);
		self
	}

	pub fn with_override_policy(mut self, policy: OverridePolicy) -> Self {
		self.runner = self.runner.with_override_policy(policy);
		self
	}

	pub fn with_output_parser(mut self, parser: Arc<dyn OutputParser>) -> Self {
		self.parser = parser;
		self
	}

	pub fn tool(&self) -> &str {
		&self.tool
	}

	#[instrument(skip_all, fields(tool = %self.tool, key_version = public_key.key_version))]
	pub async fn seal(
		&self,
		plaintext: Plaintext<'_>,
		public_key: &PublicKey,
		policy_document: &PolicyDocument,
		cancel: &CancellationToken,
	) -> SealResult<SealedSecret> {
		let executable = locate_tool(&self.tool)?;
		let scratch = self.scratch_dir()?;

		let result = self
			.seal_in(&executable, scratch.path(), plaintext, public_key, policy_document, cancel)
			.await;

		let scratch_path = scratch.path().to_path_buf();
		if let Err(e) = scratch.close() {
			warn!(path = %scratch_path.display(), error = %e, "Failed to remove scratch directory");
		}
		result
	}

	async fn seal_in(
		&self,
		executable: &Path,
		dir: &Path,
		plaintext: Plaintext<'_>,
		public_key: &PublicKey,
		policy_document: &PolicyDocument,
		cancel: &CancellationToken,
	) -> SealResult<SealedSecret> {
		let key_path = stage_resource(Envelope::PublicKey(public_key), dir)?;
		let policy_path = stage_resource(Envelope::PolicyDocument(policy_document), dir)?;
		let plaintext_path = stage_plaintext(plaintext, dir)?;

		let args: Vec<OsString> = vec![
			"request".into(),
			"secrets".into(),
			"encrypt".into(),
			plaintext_path.into_os_string(),
		];
		let overrides = BTreeMap::from([
			("--public-key".to_string(), key_path.into_os_string()),
			("--policy-document".to_string(), policy_path.into_os_string()),
		]);

		let output = self
			.runner
			.run(executable, &args, &overrides, OutputCapture::Separate, cancel)
			.await?;
		let sealed = SealedSecret(self.parser.parse(&output.stdout)?);
		debug!(len = sealed.len(), "Sealed");
		Ok(sealed)
	}

	fn scratch_dir(&self) -> Result<TempDir, StagingError> {
		let mut builder = tempfile::Builder::new();
		builder.prefix("sealwing-");
		let dir = match &self.temp_root {
			Some(root) => builder.tempdir_in(root),
			None => builder.tempdir(),
		};
		dir.map_err(|source| StagingError::Io {
			what: "scratch directory",
			path: self
				.temp_root
				.clone()
				.unwrap_or_else(std::env::temp_dir),
			source,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::SealError;

	#[test]
	fn sealed_secret_debug_is_redacted() {
		let sealed = SealedSecret::from(b"c2VhbGVk".to_vec());
		assert_eq!(format!("{sealed:?}"), "SealedSecret(8 bytes)");
	}

	#[test]
	fn default_sealer_uses_vesctl() {
		assert_eq!(Sealer::default().tool(), "vesctl");
	}

	#[test]
	fn unknown_tool_fails_before_staging() {
		let root = tempfile::TempDir::new().unwrap();
		let sealer = Sealer::new("sealwing-no-such-tool-0xfeed").with_temp_root(root.path());
		let key = PublicKey {
			key_version: 1,
			modulus_base64: String::new(),
			public_exponent_base64: String::new(),
			tenant: String::new(),
		};
		let policy = PolicyDocument {
			metadata: Default::default(),
			policy_id: String::new(),
			policy_info: Default::default(),
		};
		let err = tokio_test::block_on(sealer.seal(
			Plaintext::Bytes(b"x"),
			&key,
			&policy,
			&CancellationToken::new(),
		))
		.unwrap_err();
		assert!(matches!(err, SealError::ToolNotFound { .. }));
		assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
	}
}
