// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Shared building blocks for the sealwing crates.
//!
//! - [`SecretBytes`] and [`SecretString`] hold plaintext and credentials so
//!   they never reach logs through `Debug` or `Display`.
//! - [`deadline`] derives a [`CancellationToken`] that fires after a fixed
//!   duration, which is how every blocking operation in the workspace is
//!   bounded.
//! - [`http_client_builder`] pre-configures a reqwest client with the
//!   standard `sealwing/<version>` User-Agent.
//! - [`sanitize_excerpt`] trims untrusted text before it is embedded in an
//!   error message.

mod deadline;
mod http;
mod secret;
mod text;

pub use deadline::deadline;
pub use http::{http_client_builder, user_agent};
pub use secret::{SecretBytes, SecretString, REDACTED};
pub use text::sanitize_excerpt;
pub use tokio_util::sync::CancellationToken;
