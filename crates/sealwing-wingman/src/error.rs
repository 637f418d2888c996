// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

/// Failures of a single unseal request.
#[derive(Debug, Error)]
pub enum UnsealError {
	#[error("invalid wingman endpoint: {0}")]
	InvalidEndpoint(String),

	/// The sidecar's policy does not allow this workload to unseal the secret.
	#[error("unseal denied by secret policy")]
	PolicyDenied,

	/// The sidecar answered 503.
	#[error("wingman is not ready: {0}")]
	NotReady(String),

	#[error("wingman returned unexpected status {status}: {body}")]
	UnexpectedStatus { status: u16, body: String },

	/// A 200 response whose body is not valid base64.
	#[error("invalid unseal response: {0}")]
	InvalidResponse(String),

	#[error("wingman request failed: {0}")]
	Transport(#[from] reqwest::Error),

	#[error("unseal request was cancelled")]
	Cancelled,
}

impl UnsealError {
	/// True when the request never produced an HTTP response.
	pub fn is_transport(&self) -> bool {
		matches!(self, UnsealError::Transport(_) | UnsealError::Cancelled)
	}
}

/// Failures while waiting for the sidecar.
#[derive(Debug, Error)]
pub enum ReadinessError {
	#[error("invalid wingman endpoint: {0}")]
	InvalidEndpoint(String),

	#[error("failed to build HTTP client: {0}")]
	Client(#[from] reqwest::Error),

	/// Cancelled or timed out before a ready probe.
	#[error("wingman did not become ready")]
	NotReady,
}

pub type UnsealResult<T> = Result<T, UnsealError>;
