// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Writes sealing inputs into a caller-owned scratch directory.
//!
//! Files are created with owner-only permissions. Nothing here deletes
//! anything; the caller removes the whole directory when done.

use std::io::Write;
use std::path::{Path, PathBuf};

use sealwing_xc::Envelope;
use tracing::debug;

use crate::error::StagingError;

/// Plaintext handed to the sealing tool.
#[derive(Clone, Copy)]
pub enum Plaintext<'a> {
	/// Written to a scratch file before the tool runs.
	Bytes(&'a [u8]),
	/// Passed to the tool as-is. The tool is the one to reject a bad path.
	Path(&'a Path),
}

impl std::fmt::Debug for Plaintext<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Plaintext::Bytes(bytes) => write!(f, "Bytes({} bytes)", bytes.len()),
			Plaintext::Path(path) => f.debug_tuple("Path").field(path).finish(),
		}
	}
}

/// Serializes `envelope` as YAML into a new file in `dir`.
pub fn stage_resource(envelope: Envelope<'_>, dir: &Path) -> Result<PathBuf, StagingError> {
	let what = envelope.kind();
	let yaml = envelope
		.to_yaml()
		.map_err(|source| StagingError::Serialization { what, source })?;
	let path = write_scratch_file(dir, what, ".yaml", yaml.as_bytes())?;
	debug!(what, path = %path.display(), "Staged envelope");
	Ok(path)
}

/// Returns a path the tool can read the plaintext from.
pub fn stage_plaintext(plaintext: Plaintext<'_>, dir: &Path) -> Result<PathBuf, StagingError> {
	match plaintext {
		Plaintext::Path(path) => Ok(path.to_path_buf()),
		Plaintext::Bytes(bytes) => write_scratch_file(dir, "plaintext", "", bytes),
	}
}

fn write_scratch_file(
	dir: &Path,
	what: &'static str,
	suffix: &str,
	contents: &[u8],
) -> Result<PathBuf, StagingError> {
	let io_error = |path: &Path| {
		let path = path.to_path_buf();
		move |source| StagingError::Io { what, path, source }
	};

	let file = tempfile::Builder::new()
		.prefix("blindfold")
		.suffix(suffix)
		.tempfile_in(dir)
		.map_err(io_error(dir))?;
	let (mut file, path) = file
		.keep()
		.map_err(|e| StagingError::Io {
			what,
			path: dir.to_path_buf(),
			source: e.error,
		})?;
	file.write_all(contents).map_err(io_error(&path))?;
	file.sync_all().map_err(io_error(&path))?;
	Ok(path)
}
