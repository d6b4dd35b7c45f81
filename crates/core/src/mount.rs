// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire tuple for a registered mount.

use serde::{Deserialize, Serialize};

use crate::spec::MountSpecWire;

/// A registered mount as it appears on the wire.
///
/// Field order is part of the interface. `fuse_mountpoint` and
/// `default_location` are raw OS path bytes; `fuse_mountpoint` is empty
/// whenever fuse is unavailable or the mount is not user visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountInfo {
    pub peer_id: String,
    pub object_path: String,
    pub display_name: String,
    pub stable_name: String,
    pub x_content_types: String,
    pub icon: String,
    pub preferred_filename_encoding: String,
    pub user_visible: bool,
    pub fuse_mountpoint: Vec<u8>,
    pub mount_spec: MountSpecWire,
    pub default_location: Vec<u8>,
}

impl MountInfo {
    /// The fuse mountpoint as a path, when one is present.
    pub fn fuse_mountpoint_path(&self) -> Option<std::path::PathBuf> {
        use std::os::unix::ffi::OsStringExt;
        if self.fuse_mountpoint.is_empty() {
            None
        } else {
            Some(std::ffi::OsString::from_vec(self.fuse_mountpoint.clone()).into())
        }
    }
}

/// Arguments a helper supplies when registering a mount it now owns.
///
/// The broker adds the sender identity and computes the fuse mountpoint; the
/// rest of the mount tuple comes straight from here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountRegistration {
    pub obj_path: String,
    pub display_name: String,
    pub stable_name: String,
    pub x_content_types: String,
    pub icon: String,
    pub preferred_filename_encoding: String,
    pub user_visible: bool,
    pub mount_spec: MountSpecWire,
    pub default_location: Vec<u8>,
}

/// Whether `path` falls under `mountpoint`: equal, or a descendant separated
/// by `/`. Sibling directories sharing a name prefix do not match.
pub fn fuse_path_matches(mountpoint: &[u8], path: &[u8]) -> bool {
    if mountpoint.is_empty() {
        return false;
    }
    if path == mountpoint {
        return true;
    }
    path.starts_with(mountpoint) && path.get(mountpoint.len()) == Some(&b'/')
}

#[cfg(test)]
#[path = "mount_tests.rs"]
mod tests;
