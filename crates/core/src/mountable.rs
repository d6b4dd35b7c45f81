// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mountable descriptors: static records describing how to start a helper.

use serde::{Deserialize, Serialize};

/// A registered helper type, loaded from the mountable configuration
/// directory.
///
/// At least one of `exec` or `dbus_name` must be set for mounting to work;
/// a descriptor with neither fails mount attempts with a generic error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountableDescriptor {
    /// Unique identifier within the catalog.
    pub mount_type: String,
    /// Command line used to launch a helper process.
    pub exec: Option<String>,
    /// Well-known bus name already owned by a running helper.
    pub dbus_name: Option<String>,
    /// Whether this type may be mounted implicitly on lookup.
    pub automount: bool,
    /// URL-scheme label; defaults to the type when the config omits it.
    pub scheme: String,
    pub scheme_aliases: Vec<String>,
    /// 0 when unset.
    pub default_port: i32,
    pub hostname_is_inet: bool,
}

impl MountableDescriptor {
    /// The wire tuple advertised by `ListMountableInfo`.
    pub fn info(&self) -> MountableInfo {
        MountableInfo {
            mount_type: self.mount_type.clone(),
            scheme: self.scheme.clone(),
            scheme_aliases: self.scheme_aliases.clone(),
            default_port: self.default_port,
            hostname_is_inet: self.hostname_is_inet,
        }
    }
}

/// Wire tuple describing a mountable type. Field order is part of the
/// interface; empty scheme and aliases serialize as `""` and `[]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountableInfo {
    pub mount_type: String,
    pub scheme: String,
    pub scheme_aliases: Vec<String>,
    pub default_port: i32,
    pub hostname_is_inet: bool,
}

#[cfg(test)]
#[path = "mountable_tests.rs"]
mod tests;
