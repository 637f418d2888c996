// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::trace;

/// Returns a child of `parent` that is cancelled once `after` has elapsed.
///
/// Cancelling `parent` still cancels the returned token immediately, so a
/// signal handler and a timeout can share one token. Must be called from
/// within a tokio runtime; the timer task exits as soon as the token fires
/// for either reason.
pub fn deadline(parent: &CancellationToken, after: Duration) -> CancellationToken {
	let token = parent.child_token();
	let timer = token.clone();
	tokio::spawn(async move {
		tokio::select! {
			_ = tokio::time::sleep(after) => {
				trace!(?after, "deadline elapsed");
				timer.cancel();
			}
			_ = timer.cancelled() => {}
		}
	});
	token
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Instant;

	#[tokio::test]
	async fn fires_after_duration() {
		let root = CancellationToken::new();
		let started = Instant::now();
		let token = deadline(&root, Duration::from_millis(50));
		token.cancelled().await;
		assert!(started.elapsed() >= Duration::from_millis(50));
		assert!(!root.is_cancelled());
	}

	#[tokio::test]
	async fn parent_cancellation_propagates() {
		let root = CancellationToken::new();
		let token = deadline(&root, Duration::from_secs(3600));
		root.cancel();
		tokio::time::timeout(Duration::from_secs(1), token.cancelled())
			.await
			.expect("child token should be cancelled with its parent");
	}
}
