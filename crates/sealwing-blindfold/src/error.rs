// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::runner::ProcessOutput;

/// Failures of a single isolated tool invocation.
#[derive(Debug, Error)]
pub enum RunError {
	#[error("failed to prepare decoy credentials: {0}")]
	DecoySetup(#[source] io::Error),

	/// A caller override targeted one of the decoyed credential parameters.
	#[error("refusing to override protected parameter {0}")]
	ProtectedParameter(String),

	/// The tool could not be started at all.
	#[error("failed to launch {}: {source}", .executable.display())]
	Launch {
		executable: PathBuf,
		#[source]
		source: io::Error,
	},

	/// The tool ran and exited non-zero or was killed by a signal.
	#[error("{} failed with {status}: {stderr}", .executable.display())]
	Exited {
		executable: PathBuf,
		status: ExitStatus,
		/// Sanitized excerpt of stderr, empty under combined capture.
		stderr: String,
		output: ProcessOutput,
	},

	#[error("failed to collect output from {}: {source}", .executable.display())]
	Output {
		executable: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("execution of {} was cancelled", .executable.display())]
	Cancelled { executable: PathBuf },
}

impl RunError {
	/// True when the tool itself ran and rejected its input, as opposed to
	/// failing to run.
	pub fn is_tool_failure(&self) -> bool {
		matches!(self, RunError::Exited { .. })
	}
}

/// Failures while writing sealing inputs to disk.
#[derive(Debug, Error)]
pub enum StagingError {
	#[error("failed to stage {what} at {}: {source}", .path.display())]
	Io {
		what: &'static str,
		path: PathBuf,
		source: io::Error,
	},

	#[error("failed to serialize {what}: {source}")]
	Serialization {
		what: &'static str,
		source: serde_yaml::Error,
	},
}

/// Returned by an [`OutputParser`](crate::OutputParser) that cannot find a
/// payload in the tool's output.
#[derive(Debug, Error)]
#[error("unrecognized sealing tool output: {0}")]
pub struct OutputParseError(pub String);

#[derive(Debug, Error)]
pub enum SealError {
	#[error("sealing tool {name:?} was not found")]
	ToolNotFound { name: String },

	#[error(transparent)]
	Staging(#[from] StagingError),

	#[error(transparent)]
	Run(#[from] RunError),

	#[error(transparent)]
	Output(#[from] OutputParseError),
}

impl SealError {
	pub fn is_cancelled(&self) -> bool {
		matches!(self, SealError::Run(RunError::Cancelled { .. }))
	}

	/// True when the sealing tool ran and exited unsuccessfully.
	pub fn is_tool_failure(&self) -> bool {
		matches!(self, SealError::Run(e) if e.is_tool_failure())
	}
}

pub type SealResult<T> = Result<T, SealError>;
