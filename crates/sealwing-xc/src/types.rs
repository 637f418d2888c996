// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resource types consumed by the sealing tool.
//!
//! The remote API speaks snake_case JSON while the sealing tool reads
//! camelCase YAML. Every type serializes camelCase and accepts the
//! snake_case spelling as an alias, so a value fetched from the API can be
//! staged for the tool unchanged.

use serde::{Deserialize, Serialize};

/// Public half of the tenant's sealing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKey {
	#[serde(default, alias = "key_version")]
	pub key_version: i64,
	#[serde(alias = "modulus_base64")]
	pub modulus_base64: String,
	#[serde(alias = "public_exponent_base64")]
	pub public_exponent_base64: String,
	#[serde(default)]
	pub tenant: String,
}

/// Object metadata. Empty fields are omitted on output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub name: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub namespace: String,
	#[serde(default, skip_serializing_if = "String::is_empty")]
	pub tenant: String,
}

impl Metadata {
	pub fn is_empty(&self) -> bool {
		self.name.is_empty() && self.namespace.is_empty() && self.tenant.is_empty()
	}
}

/// Matches a value against exact strings or regular expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatcherType {
	#[serde(default, alias = "exact_values")]
	pub exact_values: Vec<String>,
	#[serde(default, alias = "regex_values")]
	pub regex_values: Vec<String>,
	#[serde(default)]
	pub transformers: Vec<String>,
}

/// Selects clients by label expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorType {
	#[serde(default)]
	pub expressions: Vec<String>,
}

/// One rule of a secret policy: an action plus an optional client matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
	pub action: String,
	#[serde(default, alias = "client_name", skip_serializing_if = "Option::is_none")]
	pub client_name: Option<String>,
	#[serde(
		default,
		alias = "client_name_matcher",
		skip_serializing_if = "Option::is_none"
	)]
	pub client_name_matcher: Option<MatcherType>,
	#[serde(
		default,
		alias = "client_selector",
		skip_serializing_if = "Option::is_none"
	)]
	pub client_selector: Option<LabelSelectorType>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyInfo {
	#[serde(rename = "algo", default)]
	pub algorithm: String,
	/// Evaluated in order.
	#[serde(default)]
	pub rules: Vec<PolicyRule>,
}

/// A secret policy document as bound into a sealed secret.
///
/// The API returns the metadata fields flattened next to `policy_id`; the
/// tool expects them nested under `metadata`. Both shapes deserialize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "PolicyDocumentWire")]
pub struct PolicyDocument {
	#[serde(skip_serializing_if = "Metadata::is_empty")]
	pub metadata: Metadata,
	pub policy_id: String,
	pub policy_info: PolicyInfo,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolicyDocumentWire {
	#[serde(default)]
	metadata: Option<Metadata>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	namespace: Option<String>,
	#[serde(default)]
	tenant: Option<String>,
	#[serde(default, alias = "policy_id")]
	policy_id: String,
	#[serde(default, alias = "policy_info")]
	policy_info: PolicyInfo,
}

impl From<PolicyDocumentWire> for PolicyDocument {
	fn from(wire: PolicyDocumentWire) -> Self {
		let mut metadata = wire.metadata.unwrap_or_default();
		if let Some(name) = wire.name {
			metadata.name = name;
		}
		if let Some(namespace) = wire.namespace {
			metadata.namespace = namespace;
		}
		if let Some(tenant) = wire.tenant {
			metadata.tenant = tenant;
		}
		Self {
			metadata,
			policy_id: wire.policy_id,
			policy_info: wire.policy_info,
		}
	}
}
