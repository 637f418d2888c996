// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::{Duration, Instant};

use reqwest::{StatusCode, Url};
use sealwing_common_core::{http_client_builder, CancellationToken};
use tracing::{debug, info, instrument};

use crate::endpoint::{join_endpoint, STATUS_ENDPOINT};
use crate::error::ReadinessError;

/// Body the sidecar returns from `/status` once it can serve unseal requests.
pub const READY_BODY: &[u8] = b"READY";

/// Waits for the sidecar's status endpoint to report ready.
#[derive(Clone)]
pub struct ReadinessPoller {
	http_client: reqwest::Client,
	status_url: Url,
}

impl ReadinessPoller {
	pub fn new(endpoint: &str) -> Result<Self, ReadinessError> {
		let status_url =
			join_endpoint(endpoint, STATUS_ENDPOINT).map_err(ReadinessError::InvalidEndpoint)?;
		let http_client = http_client_builder().build()?;
		Ok(Self::from_parts(http_client, status_url))
	}

	pub(crate) fn from_parts(http_client: reqwest::Client, status_url: Url) -> Self {
		Self {
			http_client,
			status_url,
		}
	}

	/// Probes immediately, then every `interval`, until a probe reports ready
	/// or `cancel` fires. A probe still in flight is abandoned on cancel.
	///
	/// Failed and non-ready probes are only logged at debug level; the sole
	/// failure is [`ReadinessError::NotReady`] on cancellation.
	#[instrument(skip(self, cancel), fields(url = %self.status_url))]
	pub async fn wait_for_ready(
		&self,
		interval: Duration,
		cancel: &CancellationToken,
	) -> Result<(), ReadinessError> {
		info!("Waiting for wingman to become ready");
		let started = Instant::now();
		let mut attempts: u32 = 0;

		loop {
			attempts += 1;
			let ready = tokio::select! {
				ready = self.probe() => ready,
				_ = cancel.cancelled() => false,
			};
			if ready {
				info!(attempts, elapsed_ms = started.elapsed().as_millis() as u64, "Wingman is ready");
				return Ok(());
			}

			tokio::select! {
				_ = tokio::time::sleep(interval) => {}
				_ = cancel.cancelled() => {
					debug!(attempts, "Gave up waiting for wingman");
					return Err(ReadinessError::NotReady);
				}
			}
		}
	}

	/// One status request. True only for 200 with a body of exactly `READY`.
	pub async fn probe(&self) -> bool {
		let response = match self.http_client.get(self.status_url.clone()).send().await {
			Ok(response) => response,
			Err(e) => {
				debug!(error = %e, "Status probe failed");
				return false;
			}
		};
		let status = response.status();
		match response.bytes().await {
			Ok(body) if status == StatusCode::OK && body.as_ref() == READY_BODY => true,
			Ok(body) => {
				debug!(%status, len = body.len(), "Wingman not ready");
				false
			}
			Err(e) => {
				debug!(%status, error = %e, "Failed to read status body");
				false
			}
		}
	}
}

impl std::fmt::Debug for ReadinessPoller {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ReadinessPoller")
			.field("status_url", &self.status_url.as_str())
			.finish()
	}
}
