// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Client for the wingman sidecar that unseals blindfolded secrets.
//!
//! Poll [`ReadinessPoller::wait_for_ready`] until the sidecar reports
//! `READY`, then call [`UnsealClient::unseal_encoded`] with the sealing
//! tool's base64 output. Both take a [`CancellationToken`] and return
//! promptly once it fires.
//!
//! [`CancellationToken`]: sealwing_common_core::CancellationToken

mod endpoint;
mod error;
mod status;
mod unseal;

pub use endpoint::{DEFAULT_WINGMAN_URL, STATUS_ENDPOINT, UNSEAL_ENDPOINT};
pub use error::{ReadinessError, UnsealError, UnsealResult};
pub use status::{ReadinessPoller, READY_BODY};
pub use unseal::{unseal_request_body, UnsealClient};
