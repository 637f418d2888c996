// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `sealwing seal [INPUT]`

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use sealwing_blindfold::{Plaintext, Sealer, DEFAULT_TOOL};
use sealwing_common_core::{CancellationToken, SecretString};
use sealwing_xc::{
	parse_policy_document, parse_public_key, PolicyDocument, PublicKey, XcClient, XcClientConfig,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tracing::info;

#[derive(Args, Debug)]
pub struct SealArgs {
	/// Plaintext file to seal; stdin when omitted or `-`
	#[arg(value_name = "INPUT")]
	pub input: Option<PathBuf>,

	/// Write the sealed payload here instead of stdout
	#[arg(long, short)]
	pub output: Option<PathBuf>,

	/// Sealing tool name or path
	#[arg(long, env = "SEALWING_VESCTL", default_value = DEFAULT_TOOL)]
	pub tool: String,

	/// Public key file (JSON or YAML, bare or under `data`)
	#[arg(long, value_name = "PATH", requires = "policy_document_file")]
	pub public_key_file: Option<PathBuf>,

	/// Policy document file (JSON or YAML, bare or under `data`)
	#[arg(long, value_name = "PATH", requires = "public_key_file")]
	pub policy_document_file: Option<PathBuf>,

	/// Secret management API URL, used when no local files are given
	#[arg(long, env = "SEALWING_API_URL")]
	pub api_url: Option<String>,

	/// API token
	#[arg(long, env = "SEALWING_API_TOKEN", hide_env_values = true)]
	pub api_token: Option<SecretString>,

	/// PEM client certificate for the API
	#[arg(long, value_name = "PATH", requires = "api_key")]
	pub api_cert: Option<PathBuf>,

	/// PEM private key for the API
	#[arg(long, value_name = "PATH", requires = "api_cert")]
	pub api_key: Option<PathBuf>,

	/// Extra PEM CA certificate for the API
	#[arg(long, value_name = "PATH")]
	pub ca_cert: Option<PathBuf>,

	/// Public key version; latest when omitted
	#[arg(long)]
	pub key_version: Option<i64>,

	#[arg(long, default_value = "ves-io-allow-volterra")]
	pub policy_name: String,

	#[arg(long, default_value = "shared")]
	pub policy_namespace: String,
}

pub async fn run(args: SealArgs, cancel: &CancellationToken) -> anyhow::Result<()> {
	let (public_key, policy_document) = load_inputs(&args, cancel).await?;

	let stdin_bytes: Vec<u8>;
	let plaintext = match args.input.as_deref() {
		Some(path) if path != Path::new("-") => Plaintext::Path(path),
		_ => {
			stdin_bytes = read_stdin().await?;
			Plaintext::Bytes(&stdin_bytes)
		}
	};

	let sealed = Sealer::new(args.tool.as_str())
		.seal(plaintext, &public_key, &policy_document, cancel)
		.await
		.context("sealing failed")?;

	let mut payload = sealed.into_bytes();
	payload.push(b'\n');
	match &args.output {
		Some(path) => {
			tokio::fs::write(path, &payload)
				.await
				.with_context(|| format!("failed to write {}", path.display()))?;
			info!(path = %path.display(), "Wrote sealed secret");
		}
		None => {
			let mut stdout = tokio::io::stdout();
			stdout.write_all(&payload).await.context("failed to write stdout")?;
			stdout.flush().await.context("failed to write stdout")?;
		}
	}
	Ok(())
}

async fn load_inputs(
	args: &SealArgs,
	cancel: &CancellationToken,
) -> anyhow::Result<(PublicKey, PolicyDocument)> {
	if let (Some(key_file), Some(policy_file)) = (&args.public_key_file, &args.policy_document_file) {
		return load_local(key_file, policy_file).await;
	}

	let api_url = args
		.api_url
		.as_deref()
		.context("either --public-key-file and --policy-document-file, or --api-url is required")?;
	let mut config = XcClientConfig::new(api_url);
	if let Some(token) = &args.api_token {
		config = config.with_token(token.clone());
	} else if let (Some(cert), Some(key)) = (&args.api_cert, &args.api_key) {
		config = config.with_cert_key_pair(cert, key);
	}
	if let Some(ca_cert) = &args.ca_cert {
		config = config.with_ca_cert(ca_cert);
	}
	let client = XcClient::new(config).context("failed to configure API client")?;

	let public_key = client
		.get_public_key(args.key_version, cancel)
		.await
		.context("failed to fetch public key")?
		.context("public key not found")?;
	let policy_document = client
		.get_policy_document(&args.policy_name, &args.policy_namespace, cancel)
		.await
		.context("failed to fetch policy document")?
		.with_context(|| {
			format!(
				"policy document {}/{} not found",
				args.policy_namespace, args.policy_name
			)
		})?;
	Ok((public_key, policy_document))
}

async fn load_local(key_file: &Path, policy_file: &Path) -> anyhow::Result<(PublicKey, PolicyDocument)> {
	let raw = tokio::fs::read(key_file)
		.await
		.with_context(|| format!("failed to read {}", key_file.display()))?;
	let public_key = parse_public_key(&raw)
		.with_context(|| format!("failed to parse public key {}", key_file.display()))?;

	let raw = tokio::fs::read(policy_file)
		.await
		.with_context(|| format!("failed to read {}", policy_file.display()))?;
	let policy_document = parse_policy_document(&raw)
		.with_context(|| format!("failed to parse policy document {}", policy_file.display()))?;
	Ok((public_key, policy_document))
}

async fn read_stdin() -> anyhow::Result<Vec<u8>> {
	let mut buf = Vec::new();
	tokio::io::stdin()
		.read_to_end(&mut buf)
		.await
		.context("failed to read plaintext from stdin")?;
	Ok(buf)
}
