// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use reqwest::Url;

/// Default sidecar address inside a workload.
pub const DEFAULT_WINGMAN_URL: &str = "http://localhost:8070";

pub const STATUS_ENDPOINT: &str = "/status";
pub const UNSEAL_ENDPOINT: &str = "/secret/unseal";

/// Appends `path` to the base endpoint, keeping any base path prefix.
pub(crate) fn join_endpoint(base: &str, path: &str) -> Result<Url, String> {
	let joined = format!("{}{}", base.trim_end_matches('/'), path);
	let url = Url::parse(&joined).map_err(|e| format!("{base}: {e}"))?;
	if !matches!(url.scheme(), "http" | "https") {
		return Err(format!("{base}: scheme must be http or https"));
	}
	if url.host_str().map_or(true, str::is_empty) {
		return Err(format!("{base}: host must be present"));
	}
	Ok(url)
}
