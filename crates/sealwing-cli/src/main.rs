// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! sealwing - seal secrets offline and unseal them through wingman.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use sealwing_common_core::CancellationToken;
use tracing::{error, info, warn};

mod logging;
mod seal;
mod unseal;

use logging::LogFormat;

#[derive(Parser, Debug)]
#[command(
	name = "sealwing",
	about = "Seal secrets with vesctl and unseal them through the wingman sidecar",
	version
)]
struct Cli {
	/// Log filter directive; RUST_LOG takes precedence
	#[arg(long, global = true, env = "SEALWING_LOG_LEVEL", default_value = "info")]
	log_level: String,

	#[arg(
		long,
		global = true,
		env = "SEALWING_LOG_FORMAT",
		value_enum,
		default_value_t = LogFormat::Json
	)]
	log_format: LogFormat,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Unseal the secrets listed in JSON files and write them to disk
	Unseal(unseal::UnsealArgs),
	/// Seal plaintext into a blindfolded secret
	Seal(seal::SealArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
	let cli = Cli::parse();

	if let Err(e) = logging::init_tracing(&cli.log_level, cli.log_format) {
		eprintln!("sealwing: {e:#}");
		return ExitCode::FAILURE;
	}

	let cancel = CancellationToken::new();
	tokio::spawn(cancel_on_shutdown_signal(cancel.clone()));

	let result = match cli.command {
		Command::Unseal(args) => unseal::run(args, &cancel).await,
		Command::Seal(args) => seal::run(args, &cancel).await,
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(e) => {
			error!(error = %format!("{e:#}"), "Command failed");
			ExitCode::FAILURE
		}
	}
}

async fn cancel_on_shutdown_signal(cancel: CancellationToken) {
	shutdown_signal().await;
	info!("Received shutdown signal");
	cancel.cancel();
}

#[cfg(unix)]
async fn shutdown_signal() {
	use tokio::signal::unix::{signal, SignalKind};

	let mut terminate = match signal(SignalKind::terminate()) {
		Ok(terminate) => terminate,
		Err(e) => {
			warn!(error = %e, "Failed to install SIGTERM handler");
			return ctrl_c().await;
		}
	};
	tokio::select! {
		_ = ctrl_c() => {}
		_ = terminate.recv() => {}
	}
}

#[cfg(not(unix))]
async fn shutdown_signal() {
	ctrl_c().await
}

async fn ctrl_c() {
	if let Err(e) = tokio::signal::ctrl_c().await {
		warn!(error = %e, "Failed to install SIGINT handler");
		std::future::pending::<()>().await;
	}
}
