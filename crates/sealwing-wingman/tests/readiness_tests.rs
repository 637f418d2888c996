// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use sealwing_common_core::{deadline, CancellationToken};
use sealwing_wingman::{ReadinessError, ReadinessPoller, UnsealClient};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Reports `READY` once `after` has elapsed since creation.
struct ReadyAfter {
	since: Instant,
	after: Duration,
	probes: Arc<AtomicUsize>,
}

impl ReadyAfter {
	fn new(after: Duration) -> (Self, Arc<AtomicUsize>) {
		let probes = Arc::new(AtomicUsize::new(0));
		let responder = Self {
			since: Instant::now(),
			after,
			probes: probes.clone(),
		};
		(responder, probes)
	}
}

impl Respond for ReadyAfter {
	fn respond(&self, _request: &Request) -> ResponseTemplate {
		self.probes.fetch_add(1, Ordering::SeqCst);
		if self.since.elapsed() >= self.after {
			ResponseTemplate::new(200).set_body_string("READY")
		} else {
			ResponseTemplate::new(503).set_body_string("STARTING")
		}
	}
}

async fn status_server(responder: impl Respond + 'static) -> MockServer {
	let server = MockServer::start().await;
	Mock::given(method("GET"))
		.and(path("/status"))
		.respond_with(responder)
		.mount(&server)
		.await;
	server
}

#[tokio::test]
async fn ready_on_first_probe_returns_immediately() {
	let server = status_server(ResponseTemplate::new(200).set_body_string("READY")).await;
	let poller = ReadinessPoller::new(&server.uri()).unwrap();

	let started = Instant::now();
	poller
		.wait_for_ready(Duration::from_secs(30), &CancellationToken::new())
		.await
		.unwrap();
	assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn becomes_ready_after_delay() {
	let ready_at = Duration::from_millis(300);
	let (responder, probes) = ReadyAfter::new(ready_at);
	let server = status_server(responder).await;
	let poller = ReadinessPoller::new(&server.uri()).unwrap();

	let root = CancellationToken::new();
	let cancel = deadline(&root, Duration::from_secs(10));
	let started = Instant::now();
	poller
		.wait_for_ready(Duration::from_millis(50), &cancel)
		.await
		.unwrap();
	assert!(started.elapsed() >= ready_at);
	assert!(probes.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn times_out_at_the_deadline() {
	let (responder, _) = ReadyAfter::new(Duration::from_secs(3600));
	let server = status_server(responder).await;
	let poller = ReadinessPoller::new(&server.uri()).unwrap();

	let root = CancellationToken::new();
	let cancel = deadline(&root, Duration::from_millis(300));
	let started = Instant::now();
	let result = poller.wait_for_ready(Duration::from_millis(50), &cancel).await;
	let elapsed = started.elapsed();

	assert!(matches!(result, Err(ReadinessError::NotReady)));
	assert!(elapsed >= Duration::from_millis(300));
	assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
}

#[tokio::test]
async fn slow_probe_does_not_delay_timeout() {
	let server = status_server(
		ResponseTemplate::new(200)
			.set_body_string("READY")
			.set_delay(Duration::from_secs(30)),
	)
	.await;
	let poller = ReadinessPoller::new(&server.uri()).unwrap();

	let root = CancellationToken::new();
	let cancel = deadline(&root, Duration::from_millis(200));
	let started = Instant::now();
	let result = poller.wait_for_ready(Duration::from_secs(1), &cancel).await;

	assert!(matches!(result, Err(ReadinessError::NotReady)));
	assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn ready_body_must_match_exactly() {
	let server = status_server(ResponseTemplate::new(200).set_body_string("READY\n")).await;
	let poller = ReadinessPoller::new(&server.uri()).unwrap();
	assert!(!poller.probe().await);
}

#[tokio::test]
async fn unreachable_sidecar_is_retried_until_deadline() {
	let server = MockServer::start().await;
	let uri = server.uri();
	drop(server);

	let poller = ReadinessPoller::new(&uri).unwrap();
	let root = CancellationToken::new();
	let cancel = deadline(&root, Duration::from_millis(200));
	let result = poller.wait_for_ready(Duration::from_millis(20), &cancel).await;
	assert!(matches!(result, Err(ReadinessError::NotReady)));
}

#[tokio::test]
async fn unseal_client_shares_the_status_endpoint() {
	let server = status_server(ResponseTemplate::new(200).set_body_string("READY")).await;
	let client = UnsealClient::new(server.uri()).unwrap();
	assert!(client.readiness().probe().await);
}
