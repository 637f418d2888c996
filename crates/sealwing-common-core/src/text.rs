// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

/// Strips control characters (other than space) from `text` and caps it at
/// `max_len` characters, appending `...` when truncated.
///
/// Used for response bodies and tool stderr that end up in error messages.
pub fn sanitize_excerpt(text: &str, max_len: usize) -> String {
	let mut chars = text.chars().filter(|c| !c.is_control() || *c == ' ');
	let sanitized: String = chars.by_ref().take(max_len).collect();
	if chars.next().is_some() {
		format!("{sanitized}...")
	} else {
		sanitized
	}
}
