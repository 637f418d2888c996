// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared HTTP client builder with a consistent User-Agent header.

use reqwest::{Client, ClientBuilder};

/// Returns a client builder carrying the standard User-Agent.
///
/// Callers add their own TLS and timeout settings before building.
pub fn http_client_builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

/// Returns the User-Agent string, `sealwing/{version}`.
pub fn user_agent() -> String {
	format!("sealwing/{}", env!("CARGO_PKG_VERSION"))
}
