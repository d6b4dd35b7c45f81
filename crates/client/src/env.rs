// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the client crate.

use std::path::PathBuf;

/// Resolve the session bus socket:
/// GVFSD_SOCKET > $XDG_RUNTIME_DIR/gvfsd/bus.sock > $XDG_STATE_HOME/gvfsd/bus.sock
/// > ~/.local/state/gvfsd/bus.sock
pub fn session_socket_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("GVFSD_SOCKET") {
        return Some(PathBuf::from(path));
    }
    if let Ok(runtime) = std::env::var("XDG_RUNTIME_DIR") {
        if !runtime.is_empty() {
            return Some(PathBuf::from(runtime).join("gvfsd").join("bus.sock"));
        }
    }
    if let Ok(state) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(state).join("gvfsd").join("bus.sock"));
    }
    let home = std::env::var("HOME").ok()?;
    Some(PathBuf::from(home).join(".local/state/gvfsd").join("bus.sock"))
}
