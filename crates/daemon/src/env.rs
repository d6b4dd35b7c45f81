// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};

use crate::lifecycle::LifecycleError;

/// Mountable descriptor directory baked in at build time, overridable with
/// `GVFSD_MOUNTABLE_DIR`.
pub const DEFAULT_MOUNTABLE_DIR: &str = "/usr/share/gvfsd/mounts";

/// Resolve state directory: GVFSD_STATE_DIR > XDG_STATE_HOME/gvfsd > ~/.local/state/gvfsd
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("GVFSD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("gvfsd"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/gvfsd"))
}

/// Resolve the bus socket: GVFSD_SOCKET > $XDG_RUNTIME_DIR/gvfsd/bus.sock
/// > <state_dir>/bus.sock
pub fn socket_path(state_dir: &Path) -> PathBuf {
    if let Ok(path) = std::env::var("GVFSD_SOCKET") {
        return PathBuf::from(path);
    }
    if let Ok(runtime) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime.is_empty() {
            return PathBuf::from(runtime).join("gvfsd").join("bus.sock");
        }
    }
    state_dir.join("bus.sock")
}

/// Mountable descriptor directory.
pub fn mountable_dir() -> PathBuf {
    std::env::var("GVFSD_MOUNTABLE_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_MOUNTABLE_DIR))
}

/// Base directory for fuse mountpoints.
///
/// The runtime dir is used when it exists and is distinct from the cache
/// dir; otherwise the legacy home-relative location.
pub fn fuse_base_dir() -> PathBuf {
    let runtime = std::env::var("XDG_RUNTIME_DIR")
        .ok()
        .filter(|v| !v.is_empty())
        .map(PathBuf::from);
    let cache = cache_dir();

    match runtime {
        Some(runtime) if runtime != cache => runtime.join("gvfs"),
        _ => home_dir().join(".gvfs"),
    }
}

fn cache_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        if !xdg.is_empty() {
            return PathBuf::from(xdg);
        }
    }
    home_dir().join(".cache")
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/"))
}
