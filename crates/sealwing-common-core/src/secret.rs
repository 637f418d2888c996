// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Redacting wrappers for plaintext and credentials.
//!
//! Both wrappers zero their memory on drop and have no `Deref`; the inner
//! value is reached only through `expose()` so every access shows up in
//! review.

use std::fmt;
use zeroize::Zeroize;

/// Placeholder printed instead of any wrapped value.
pub const REDACTED: &str = "[REDACTED]";

/// Plaintext bytes that must not be logged.
///
/// `Debug` reports only the length, which is enough to diagnose an empty
/// or truncated secret without revealing it.
///
/// ```
/// use sealwing_common_core::SecretBytes;
///
/// let plaintext = SecretBytes::new(b"hunter2".to_vec());
/// assert_eq!(format!("{plaintext:?}"), "SecretBytes([REDACTED]; 7 bytes)");
/// assert_eq!(plaintext.expose(), b"hunter2");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SecretBytes {
	inner: Vec<u8>,
}

impl SecretBytes {
	pub fn new(inner: Vec<u8>) -> Self {
		Self { inner }
	}

	/// Borrow the plaintext.
	pub fn expose(&self) -> &[u8] {
		&self.inner
	}

	pub fn len(&self) -> usize {
		self.inner.len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}

	/// Copy the plaintext out; the wrapper still zeroes its own buffer on drop.
	pub fn to_vec(&self) -> Vec<u8> {
		self.inner.clone()
	}
}

impl From<Vec<u8>> for SecretBytes {
	fn from(inner: Vec<u8>) -> Self {
		Self::new(inner)
	}
}

impl From<&[u8]> for SecretBytes {
	fn from(inner: &[u8]) -> Self {
		Self::new(inner.to_vec())
	}
}

impl fmt::Debug for SecretBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretBytes({REDACTED}; {} bytes)", self.inner.len())
	}
}

impl fmt::Display for SecretBytes {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

/// A credential string such as an API token.
#[derive(Clone, PartialEq, Eq, Zeroize)]
#[zeroize(drop)]
pub struct SecretString {
	inner: String,
}

impl SecretString {
	pub fn new(inner: impl Into<String>) -> Self {
		Self {
			inner: inner.into(),
		}
	}

	pub fn expose(&self) -> &str {
		&self.inner
	}

	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl From<String> for SecretString {
	fn from(inner: String) -> Self {
		Self::new(inner)
	}
}

impl std::str::FromStr for SecretString {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(Self::new(s))
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("SecretString").field(&REDACTED).finish()
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}
