// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error types for the resource API client.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XcError {
	/// Endpoint URL could not be parsed, is not https, or has no host.
	#[error("invalid API endpoint URL: {0}")]
	InvalidEndpoint(String),

	/// Neither an API token nor a client certificate was configured.
	#[error("a client certificate or API token must be provided")]
	MissingAuthentication,

	/// A certificate or key file could not be read.
	#[error("failed to read {path}: {source}")]
	CertificateFile {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("configuration error: {0}")]
	Configuration(String),

	#[error("authentication is required")]
	Unauthorized,

	#[error("access to endpoint is denied")]
	Forbidden,

	#[error("endpoint returned an unexpected status code {status}: {body}")]
	UnexpectedStatus { status: u16, body: String },

	#[error("invalid response: {0}")]
	InvalidResponse(String),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("request was cancelled")]
	Cancelled,
}

pub type XcResult<T> = Result<T, XcError>;
