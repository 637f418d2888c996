// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Offline sealing through the external `vesctl` tool.
//!
//! Sealing needs nothing but a public key and a policy document, yet the
//! tool reads API credentials from its flags, config file and environment.
//! [`IsolatedRunner`] launches it with a cleared environment and every
//! credential source pointed at a decoy, so no ambient identity can be used.
//!
//! [`Sealer::seal`] stages the inputs in a scratch directory, runs
//! `request secrets encrypt`, and extracts the payload through an
//! [`OutputParser`].

mod decoy;
mod error;
mod locate;
mod output;
mod runner;
mod seal;
mod staging;

pub use decoy::{
	is_protected, random_token, Decoy, IsolatedExecutionContext, DECOY_ENVIRONMENT,
	DECOY_PARAMETERS, DECOY_SERVER_URL, DECOY_TOKEN_LEN,
};
pub use error::{OutputParseError, RunError, SealError, SealResult, StagingError};
pub use locate::{locate_tool, DEFAULT_TOOL};
pub use output::{HeaderPayloadParser, OutputParser};
pub use runner::{IsolatedRunner, OutputCapture, OverridePolicy, ProcessOutput};
pub use seal::{SealedSecret, Sealer};
pub use staging::{stage_plaintext, stage_resource, Plaintext};
