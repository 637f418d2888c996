// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sealing inputs: the tenant public key and the secret policy document.
//!
//! The types here are plain data. [`XcClient`] fetches them from the secret
//! management API; [`Envelope`] wraps them in the `{data: ...}` form the
//! sealing tool reads from disk.
//!
//! # Example
//!
//! ```ignore
//! use sealwing_common_core::{CancellationToken, SecretString};
//! use sealwing_xc::{XcClient, XcClientConfig};
//!
//! let client = XcClient::new(
//!     XcClientConfig::new("https://tenant.console.example.com/api")
//!         .with_token(SecretString::new(token)),
//! )?;
//! let cancel = CancellationToken::new();
//! let key = client.get_public_key(None, &cancel).await?;
//! let policy = client
//!     .get_policy_document("ves-io-allow-volterra", "shared", &cancel)
//!     .await?;
//! ```

mod client;
mod envelope;
mod error;
mod types;

pub use client::{Credentials, XcClient, XcClientConfig};
pub use envelope::{parse_policy_document, parse_public_key, Envelope};
pub use error::{XcError, XcResult};
pub use types::{
	LabelSelectorType, MatcherType, Metadata, PolicyDocument, PolicyInfo, PolicyRule, PublicKey,
};
