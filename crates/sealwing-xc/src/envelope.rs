// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! The `{data: ...}` wrapper used by the API and the sealing tool.
//!
//! Only two resources are ever wrapped, so the outbound side is a two-variant
//! enum and the inbound side is two concrete structs.

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::{XcError, XcResult};
use crate::types::{PolicyDocument, PublicKey};

/// A resource wrapped for the sealing tool. Serializes as `{data: <resource>}`.
#[derive(Debug, Clone, Copy)]
pub enum Envelope<'a> {
	PublicKey(&'a PublicKey),
	PolicyDocument(&'a PolicyDocument),
}

impl Envelope<'_> {
	/// Short label for logs and error context.
	pub fn kind(&self) -> &'static str {
		match self {
			Envelope::PublicKey(_) => "public key",
			Envelope::PolicyDocument(_) => "policy document",
		}
	}

	/// Renders the envelope as the YAML document the sealing tool reads.
	pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
		serde_yaml::to_string(self)
	}
}

impl Serialize for Envelope<'_> {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		let mut map = serializer.serialize_map(Some(1))?;
		match self {
			Envelope::PublicKey(key) => map.serialize_entry("data", key)?,
			Envelope::PolicyDocument(doc) => map.serialize_entry("data", doc)?,
		}
		map.end()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct PublicKeyEnvelope {
	pub(crate) data: PublicKey,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PolicyDocumentEnvelope {
	pub(crate) data: PolicyDocument,
}

/// Reads a public key from JSON or YAML, wrapped in an envelope or bare.
pub fn parse_public_key(raw: &[u8]) -> XcResult<PublicKey> {
	if let Ok(envelope) = serde_yaml::from_slice::<PublicKeyEnvelope>(raw) {
		return Ok(envelope.data);
	}
	serde_yaml::from_slice(raw).map_err(|e| XcError::InvalidResponse(e.to_string()))
}

/// Reads a policy document from JSON or YAML, wrapped in an envelope or bare.
pub fn parse_policy_document(raw: &[u8]) -> XcResult<PolicyDocument> {
	if let Ok(envelope) = serde_yaml::from_slice::<PolicyDocumentEnvelope>(raw) {
		return Ok(envelope.data);
	}
	serde_yaml::from_slice(raw).map_err(|e| XcError::InvalidResponse(e.to_string()))
}
