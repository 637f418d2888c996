// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Runs the sealing tool inside an [`IsolatedExecutionContext`].
//!
//! The child gets a cleared environment holding only decoy credentials,
//! `/dev/null` for stdin, and every credential flag pointed at a decoy.
//! Cancellation kills the child and reaps it before returning.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use sealwing_common_core::{sanitize_excerpt, CancellationToken};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, instrument, warn};

use crate::decoy::{is_protected, IsolatedExecutionContext};
use crate::error::RunError;

const STDERR_EXCERPT_LEN: usize = 1024;
const READ_CHUNK: usize = 8 * 1024;
const SPAWN_ATTEMPTS: u32 = 5;
const SPAWN_BACKOFF: Duration = Duration::from_millis(20);

/// What happens when a caller override names a decoyed credential flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OverridePolicy {
	/// Fail with [`RunError::ProtectedParameter`] before anything runs.
	#[default]
	Reject,
	/// Let the override win, with a warning.
	Permissive,
}

/// How the child's output streams are collected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputCapture {
	/// Both streams land in [`ProcessOutput::stdout`] in arrival order.
	#[default]
	Combined,
	/// Streams are kept apart.
	Separate,
}

/// Bytes the child wrote.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
	pub stdout: Vec<u8>,
	pub stderr: Vec<u8>,
}

impl std::fmt::Debug for ProcessOutput {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ProcessOutput")
			.field("stdout_len", &self.stdout.len())
			.field("stderr_len", &self.stderr.len())
			.finish()
	}
}

/// Launches a tool with decoy credentials.
#[derive(Debug, Clone, Default)]
pub struct IsolatedRunner {
	override_policy: OverridePolicy,
	temp_root: Option<PathBuf>,
}

impl IsolatedRunner {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_override_policy(mut self, policy: OverridePolicy) -> Self {
		self.override_policy = policy;
		self
	}

	/// Directory the decoy file is created in. Defaults to the system temp dir.
	pub fn with_temp_root(mut self, root: impl Into<PathBuf>) -> Self {
		self.temp_root = Some(root.into());
		self
	}

	pub fn override_policy(&self) -> OverridePolicy {
		self.override_policy
	}

	/// Runs `executable` with `args`, followed by every decoy flag merged
	/// with `overrides`.
	///
	/// Flag pairs are appended in key order. A zero exit returns the captured
	/// output; anything else is [`RunError::Exited`] carrying the output and
	/// a stderr excerpt. Under [`OutputCapture::Combined`] the excerpt is
	/// empty, since stderr cannot be told apart from stdout.
	#[instrument(skip_all, fields(executable = %executable.display()))]
	pub async fn run(
		&self,
		executable: &Path,
		args: &[OsString],
		overrides: &BTreeMap<String, OsString>,
		capture: OutputCapture,
		cancel: &CancellationToken,
	) -> Result<ProcessOutput, RunError> {
		for key in overrides.keys().filter(|k| is_protected(k)) {
			match self.override_policy {
				OverridePolicy::Reject => return Err(RunError::ProtectedParameter(key.clone())),
				OverridePolicy::Permissive => {
					warn!(parameter = %key, "Caller override replaces decoy credential parameter")
				}
			}
		}

		let context = IsolatedExecutionContext::create(self.temp_root.as_deref())
			.map_err(RunError::DecoySetup)?;

		let result = execute(&context, executable, args, overrides, capture, cancel).await;

		if let Err(e) = context.close() {
			warn!(error = %e, "Failed to remove decoy file");
		}
		result
	}
}

async fn execute(
	context: &IsolatedExecutionContext,
	executable: &Path,
	args: &[OsString],
	overrides: &BTreeMap<String, OsString>,
	capture: OutputCapture,
	cancel: &CancellationToken,
) -> Result<ProcessOutput, RunError> {
	let cancelled = || RunError::Cancelled {
		executable: executable.to_path_buf(),
	};
	if cancel.is_cancelled() {
		return Err(cancelled());
	}

	let mut parameters = context.parameters().clone();
	parameters.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));

	let mut command = Command::new(executable);
	command
		.args(args)
		.args(parameters.iter().flat_map(|(k, v)| [OsString::from(k), v.clone()]))
		.env_clear()
		.envs(context.environment().iter().map(|(k, v)| (*k, v)))
		.stdin(Stdio::null())
		.stdout(Stdio::piped())
		.stderr(Stdio::piped())
		.kill_on_drop(true);

	debug!(
		args = args.len(),
		parameters = parameters.len(),
		"Launching isolated tool"
	);

	let mut child = spawn(&mut command, executable).await?;
	let stdout = child.stdout.take();
	let stderr = child.stderr.take();

	let finished = tokio::select! {
		res = async {
			let output = drain(stdout, stderr, capture).await?;
			let status = child.wait().await?;
			Ok::<_, io::Error>((status, output))
		} => Some(res),
		_ = cancel.cancelled() => None,
	};

	let (status, output) = match finished {
		Some(res) => res.map_err(|source| RunError::Output {
			executable: executable.to_path_buf(),
			source,
		})?,
		None => {
			warn!("Cancelled, killing tool");
			if let Err(e) = child.start_kill() {
				debug!(error = %e, "Tool already exited");
			}
			if let Err(e) = child.wait().await {
				warn!(error = %e, "Failed to reap cancelled tool");
			}
			return Err(cancelled());
		}
	};

	debug!(%status, stdout = output.stdout.len(), stderr = output.stderr.len(), "Tool exited");
	if status.success() {
		return Ok(output);
	}
	Err(exited(executable, status, output))
}

/// Retries a launch that hit `ETXTBSY`, which a freshly written executable
/// can report while another process briefly holds a write handle to it.
async fn spawn(command: &mut Command, executable: &Path) -> Result<Child, RunError> {
	let mut attempt = 1;
	loop {
		match command.spawn() {
			Ok(child) => return Ok(child),
			Err(e) if is_text_file_busy(&e) && attempt < SPAWN_ATTEMPTS => {
				debug!(attempt, "Executable busy, retrying launch");
				tokio::time::sleep(SPAWN_BACKOFF * attempt).await;
				attempt += 1;
			}
			Err(source) => {
				return Err(RunError::Launch {
					executable: executable.to_path_buf(),
					source,
				})
			}
		}
	}
}

#[cfg(unix)]
fn is_text_file_busy(e: &io::Error) -> bool {
	// ETXTBSY on Linux and the BSDs.
	e.raw_os_error() == Some(26)
}

#[cfg(not(unix))]
fn is_text_file_busy(_: &io::Error) -> bool {
	false
}

fn exited(executable: &Path, status: ExitStatus, output: ProcessOutput) -> RunError {
	let stderr = sanitize_excerpt(&String::from_utf8_lossy(&output.stderr), STDERR_EXCERPT_LEN);
	RunError::Exited {
		executable: executable.to_path_buf(),
		status,
		stderr,
		output,
	}
}

/// Reads both pipes to EOF concurrently so neither can fill up and stall
/// the child.
async fn drain(
	mut stdout: Option<ChildStdout>,
	mut stderr: Option<ChildStderr>,
	capture: OutputCapture,
) -> io::Result<ProcessOutput> {
	let mut output = ProcessOutput::default();
	let mut out_buf = vec![0u8; READ_CHUNK];
	let mut err_buf = vec![0u8; READ_CHUNK];

	loop {
		tokio::select! {
			n = read_some(&mut stdout, &mut out_buf), if stdout.is_some() => match n? {
				0 => stdout = None,
				n => output.stdout.extend_from_slice(&out_buf[..n]),
			},
			n = read_some(&mut stderr, &mut err_buf), if stderr.is_some() => match n? {
				0 => stderr = None,
				n => match capture {
					OutputCapture::Combined => output.stdout.extend_from_slice(&err_buf[..n]),
					OutputCapture::Separate => output.stderr.extend_from_slice(&err_buf[..n]),
				},
			},
			else => break,
		}
	}
	Ok(output)
}

async fn read_some<R: AsyncRead + Unpin>(reader: &mut Option<R>, buf: &mut [u8]) -> io::Result<usize> {
	match reader {
		Some(reader) => reader.read(buf).await,
		None => Ok(0),
	}
}

#[cfg(all(test, unix))]
mod tests {
	use super::*;
	use std::os::unix::fs::PermissionsExt;
	use std::time::{Duration, Instant};
	use tempfile::TempDir;

	fn script(dir: &Path, body: &str) -> PathBuf {
		use std::io::Write;

		let path = dir.join("tool.sh");
		let mut file = std::fs::File::create(&path).unwrap();
		file.write_all(format!("#!/bin/sh\n{body}\n").as_bytes()).unwrap();
		file.set_permissions(std::fs::Permissions::from_mode(0o755)).unwrap();
		file.sync_all().unwrap();
		drop(file);
		path
	}

	fn no_overrides() -> BTreeMap<String, OsString> {
		BTreeMap::new()
	}

	#[tokio::test]
	async fn separate_capture_keeps_streams_apart() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "printf out; printf err >&2");
		let output = IsolatedRunner::new()
			.with_temp_root(dir.path())
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap();
		assert_eq!(output.stdout, b"out");
		assert_eq!(output.stderr, b"err");
	}

	#[tokio::test]
	async fn combined_capture_merges_streams() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "printf out; printf err >&2");
		let output = IsolatedRunner::new()
			.run(&tool, &[], &no_overrides(), OutputCapture::Combined, &CancellationToken::new())
			.await
			.unwrap();
		let text = String::from_utf8(output.stdout).unwrap();
		assert!(text.contains("out") && text.contains("err"));
		assert!(output.stderr.is_empty());
	}

	#[tokio::test]
	async fn environment_is_only_decoys() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "export -p");
		let output = IsolatedRunner::new()
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap();
		let text = String::from_utf8(output.stdout).unwrap();
		assert!(text.contains("VOLT_API_URL"));
		assert!(text.contains("VOLTERRA_TOKEN"));
		assert!(!text.contains("CARGO_PKG_NAME"));
	}

	#[tokio::test]
	async fn arguments_come_first_then_sorted_flags() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), r#"for a in "$@"; do printf '%s\n' "$a"; done"#);
		let mut overrides = no_overrides();
		overrides.insert("--public-key".into(), "pk.yaml".into());
		let output = IsolatedRunner::new()
			.run(
				&tool,
				&["request".into(), "secrets".into()],
				&overrides,
				OutputCapture::Separate,
				&CancellationToken::new(),
			)
			.await
			.unwrap();
		let text = String::from_utf8(output.stdout).unwrap();
		let lines: Vec<&str> = text.lines().collect();
		assert_eq!(&lines[..2], ["request", "secrets"]);
		let flags: Vec<&str> = lines[2..].iter().step_by(2).copied().collect();
		assert_eq!(
			flags,
			[
				"--cert",
				"--config",
				"--key",
				"--p12-bundle",
				"--public-key",
				"--server-urls"
			]
		);
	}

	#[tokio::test]
	async fn protected_override_is_rejected_before_launch() {
		let dir = TempDir::new().unwrap();
		let marker = dir.path().join("ran");
		let tool = script(dir.path(), &format!("printf x > {}", marker.display()));
		let mut overrides = no_overrides();
		overrides.insert("--cert".into(), "/etc/real.pem".into());
		let err = IsolatedRunner::new()
			.run(&tool, &[], &overrides, OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap_err();
		assert!(matches!(err, RunError::ProtectedParameter(ref k) if k == "--cert"));
		assert!(!marker.exists());
	}

	#[tokio::test]
	async fn permissive_policy_lets_override_win() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), r#"for a in "$@"; do printf '%s\n' "$a"; done"#);
		let mut overrides = no_overrides();
		overrides.insert("--server-urls".into(), "https://example.test".into());
		let output = IsolatedRunner::new()
			.with_override_policy(OverridePolicy::Permissive)
			.run(&tool, &[], &overrides, OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap();
		let text = String::from_utf8(output.stdout).unwrap();
		assert!(text.contains("https://example.test"));
		assert!(!text.contains("f5xc.invalid"));
	}

	#[tokio::test]
	async fn non_zero_exit_carries_stderr_excerpt() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "printf 'bad key' >&2; exit 3");
		let err = IsolatedRunner::new()
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap_err();
		match err {
			RunError::Exited { status, stderr, .. } => {
				assert_eq!(status.code(), Some(3));
				assert_eq!(stderr, "bad key");
			}
			other => panic!("expected Exited, got {other:?}"),
		}
	}

	#[tokio::test]
	async fn combined_capture_keeps_output_out_of_the_error() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "printf 'header\\nc2VjcmV0\\n'; printf 'bad key' >&2; exit 2");
		let err = IsolatedRunner::new()
			.run(&tool, &[], &no_overrides(), OutputCapture::Combined, &CancellationToken::new())
			.await
			.unwrap_err();
		assert!(!err.to_string().contains("c2VjcmV0"));
		match err {
			RunError::Exited { stderr, output, .. } => {
				assert!(stderr.is_empty());
				assert!(String::from_utf8_lossy(&output.stdout).contains("c2VjcmV0"));
			}
			other => panic!("expected Exited, got {other:?}"),
		}
	}

	#[cfg(target_os = "linux")]
	#[tokio::test]
	async fn busy_executable_is_retried() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "printf ok");
		let writer = std::fs::OpenOptions::new().write(true).open(&tool).unwrap();
		let release = tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(30)).await;
			drop(writer);
		});

		let output = IsolatedRunner::new()
			.with_temp_root(dir.path())
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &CancellationToken::new())
			.await
			.unwrap();
		release.await.unwrap();
		assert_eq!(output.stdout, b"ok");
	}

	#[tokio::test]
	async fn missing_executable_is_a_launch_error() {
		let err = IsolatedRunner::new()
			.run(
				Path::new("/nonexistent/vesctl"),
				&[],
				&no_overrides(),
				OutputCapture::Separate,
				&CancellationToken::new(),
			)
			.await
			.unwrap_err();
		assert!(matches!(err, RunError::Launch { .. }));
		assert!(!err.is_tool_failure());
	}

	#[tokio::test]
	async fn cancellation_kills_the_child() {
		let dir = TempDir::new().unwrap();
		let tool = script(dir.path(), "while :; do :; done");
		let cancel = CancellationToken::new();
		let trigger = cancel.clone();
		tokio::spawn(async move {
			tokio::time::sleep(Duration::from_millis(100)).await;
			trigger.cancel();
		});

		let started = Instant::now();
		let err = IsolatedRunner::new()
			.with_temp_root(dir.path())
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(err, RunError::Cancelled { .. }));
		assert!(started.elapsed() < Duration::from_secs(5));
	}

	#[tokio::test]
	async fn already_cancelled_never_launches() {
		let dir = TempDir::new().unwrap();
		let marker = dir.path().join("ran");
		let tool = script(dir.path(), &format!("printf x > {}", marker.display()));
		let cancel = CancellationToken::new();
		cancel.cancel();
		let err = IsolatedRunner::new()
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &cancel)
			.await
			.unwrap_err();
		assert!(matches!(err, RunError::Cancelled { .. }));
		assert!(!marker.exists());
	}

	#[tokio::test]
	async fn decoy_file_is_removed_after_run() {
		let root = TempDir::new().unwrap();
		let bin = TempDir::new().unwrap();
		let tool = script(bin.path(), "exit 1");
		let _ = IsolatedRunner::new()
			.with_temp_root(root.path())
			.run(&tool, &[], &no_overrides(), OutputCapture::Separate, &CancellationToken::new())
			.await;
		assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
	}

	#[test]
	fn output_debug_shows_lengths_only() {
		let output = ProcessOutput {
			stdout: b"sealed".to_vec(),
			stderr: Vec::new(),
		};
		let debug = format!("{output:?}");
		assert!(!debug.contains("sealed"));
		assert!(debug.contains("stdout_len: 6"));
	}
}
