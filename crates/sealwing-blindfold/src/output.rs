// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::fmt::Debug;

use crate::error::OutputParseError;

/// Extracts the sealed payload from the sealing tool's stdout.
///
/// Only called after the tool exited successfully.
pub trait OutputParser: Send + Sync + Debug {
	fn parse(&self, stdout: &[u8]) -> Result<Vec<u8>, OutputParseError>;
}

/// The `vesctl` output convention: a human-readable header line followed by
/// the payload line.
///
/// Contract version 1: line 1 is discarded, line 2 is returned verbatim
/// minus a trailing `\r`, anything after line 2 is ignored. Output without
/// a second line yields an empty payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderPayloadParser;

impl HeaderPayloadParser {
	pub const CONTRACT_VERSION: u32 = 1;
}

impl OutputParser for HeaderPayloadParser {
	fn parse(&self, stdout: &[u8]) -> Result<Vec<u8>, OutputParseError> {
		let mut lines = stdout.split(|&b| b == b'\n');
		let _header = lines.next();
		let payload = lines.next().unwrap_or_default();
		let payload = payload.strip_suffix(b"\r").unwrap_or(payload);
		Ok(payload.to_vec())
	}
}
