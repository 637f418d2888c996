// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use anyhow::Context;
use clap::ValueEnum;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
	/// One JSON object per line.
	#[default]
	Json,
	Compact,
	Pretty,
}

/// Installs the global subscriber, writing to stderr.
///
/// `RUST_LOG` wins over `level` when set.
pub fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
	let filter = EnvFilter::try_from_default_env()
		.or_else(|_| EnvFilter::try_new(level))
		.with_context(|| format!("invalid log level {level:?}"))?;

	let registry = tracing_subscriber::registry().with(filter);
	let layer = fmt::layer().with_writer(std::io::stderr);
	match format {
		LogFormat::Json => registry.with(layer.json()).try_init(),
		LogFormat::Compact => registry.with(layer.compact()).try_init(),
		LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
	}
	.context("failed to install tracing subscriber")
}
