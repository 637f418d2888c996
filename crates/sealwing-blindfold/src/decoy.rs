// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Decoy credentials handed to the sealing tool.
//!
//! Sealing is an offline operation, but the tool will happily pick up API
//! credentials from its flags or environment and talk to the network. Every
//! credential-bearing flag and variable it understands is pointed at an
//! empty file, an unresolvable URL, or a random token instead.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

/// Server URL under the reserved `.invalid` TLD (RFC 2606); never resolves.
pub const DECOY_SERVER_URL: &str = "https://f5xc.invalid/api";

/// Length of each random decoy token.
pub const DECOY_TOKEN_LEN: usize = 16;

const TOKEN_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_";

/// What a decoyed flag or variable is set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoy {
	/// Path of the per-invocation empty file.
	EmptyFile,
	/// [`DECOY_SERVER_URL`].
	UnreachableUrl,
	/// Fresh random token.
	RandomToken,
}

/// Credential flags of the sealing tool. Callers may not override these
/// under the default override policy.
pub const DECOY_PARAMETERS: [(&str, Decoy); 5] = [
	("--p12-bundle", Decoy::EmptyFile),
	("--cert", Decoy::EmptyFile),
	("--key", Decoy::EmptyFile),
	("--config", Decoy::EmptyFile),
	("--server-urls", Decoy::UnreachableUrl),
];

/// The complete environment of the sealing tool.
pub const DECOY_ENVIRONMENT: [(&str, Decoy); 6] = [
	("VES_P12_PASSWORD", Decoy::RandomToken),
	("VOLT_API_P12_FILE", Decoy::EmptyFile),
	("VOLT_API_CERT", Decoy::EmptyFile),
	("VOLT_API_KEY", Decoy::EmptyFile),
	("VOLT_API_URL", Decoy::UnreachableUrl),
	("VOLTERRA_TOKEN", Decoy::RandomToken),
];

/// Whether `key` names one of the decoyed credential flags.
pub fn is_protected(key: &str) -> bool {
	DECOY_PARAMETERS.iter().any(|(name, _)| *name == key)
}

/// Returns `len` characters drawn from `[a-zA-Z0-9_]`.
pub fn random_token(len: usize) -> String {
	(0..len)
		.map(|_| TOKEN_ALPHABET[fastrand::usize(..TOKEN_ALPHABET.len())] as char)
		.collect()
}

/// Decoy values for one tool invocation.
///
/// Owns the empty decoy file; the file is removed by [`close`](Self::close)
/// or, failing that, when the context is dropped.
#[derive(Debug)]
pub struct IsolatedExecutionContext {
	decoy_file: NamedTempFile,
	parameters: BTreeMap<String, OsString>,
	environment: Vec<(&'static str, OsString)>,
}

impl IsolatedExecutionContext {
	/// Creates the empty decoy file under `temp_root` (or the system temp
	/// dir) and resolves every decoy value.
	pub fn create(temp_root: Option<&Path>) -> io::Result<Self> {
		let mut builder = tempfile::Builder::new();
		builder.prefix("sealwing-decoy");
		let decoy_file = match temp_root {
			Some(root) => builder.tempfile_in(root)?,
			None => builder.tempfile()?,
		};

		let path = decoy_file.path().as_os_str().to_os_string();
		let resolve = |decoy: Decoy| -> OsString {
			match decoy {
				Decoy::EmptyFile => path.clone(),
				Decoy::UnreachableUrl => DECOY_SERVER_URL.into(),
				Decoy::RandomToken => random_token(DECOY_TOKEN_LEN).into(),
			}
		};

		let parameters = DECOY_PARAMETERS
			.iter()
			.map(|(name, decoy)| (name.to_string(), resolve(*decoy)))
			.collect();
		let environment = DECOY_ENVIRONMENT
			.iter()
			.map(|(name, decoy)| (*name, resolve(*decoy)))
			.collect();

		Ok(Self {
			decoy_file,
			parameters,
			environment,
		})
	}

	pub fn decoy_path(&self) -> &Path {
		self.decoy_file.path()
	}

	/// Baseline flags, keyed by flag name.
	pub fn parameters(&self) -> &BTreeMap<String, OsString> {
		&self.parameters
	}

	/// The full environment the child runs with.
	pub fn environment(&self) -> &[(&'static str, OsString)] {
		&self.environment
	}

	/// Removes the decoy file.
	pub fn close(self) -> io::Result<()> {
		self.decoy_file.close()
	}
}
