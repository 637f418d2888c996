// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{SealError, SealResult};

/// Name searched for when no tool name is configured.
pub const DEFAULT_TOOL: &str = "vesctl";

/// Resolves the sealing tool executable.
///
/// An empty `name` means [`DEFAULT_TOOL`]. A name with a path separator is
/// checked as given; a bare name is searched on `PATH`. Empty `PATH` entries
/// mean the current directory.
pub fn locate_tool(name: &str) -> SealResult<PathBuf> {
	let name = if name.is_empty() { DEFAULT_TOOL } else { name };
	debug!(name, "Looking for sealing tool");

	let not_found = || SealError::ToolNotFound {
		name: name.to_string(),
	};

	let candidate = Path::new(name);
	if candidate.components().count() > 1 || candidate.is_absolute() {
		return if is_executable(candidate) {
			Ok(candidate.to_path_buf())
		} else {
			Err(not_found())
		};
	}

	let search_path = std::env::var_os("PATH").ok_or_else(not_found)?;
	find_in(&search_path, name).ok_or_else(not_found)
}

fn find_in(search_path: &OsStr, name: &str) -> Option<PathBuf> {
	std::env::split_paths(search_path)
		.map(|dir| {
			if dir.as_os_str().is_empty() {
				PathBuf::from(".").join(name)
			} else {
				dir.join(name)
			}
		})
		.find(|path| is_executable(path))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
	use std::os::unix::fs::PermissionsExt;
	std::fs::metadata(path)
		.map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
		.unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
	path.is_file()
}
