// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mountable catalog: helper types known to the broker.
//!
//! Descriptors live in keyfile-style `.mount` files with a `[Mount]`
//! section. One file may declare several types (a `;`-separated list); each
//! yields its own descriptor sharing the other keys. Unreadable files and
//! files without a `Type` key are skipped without error.

use std::path::{Path, PathBuf};

use configparser::ini::Ini;
use tracing::{debug, info};

use gvfsd_core::{MountSpec, MountableDescriptor};

/// Process-wide list of registered helper types.
pub struct Catalog {
    dir: PathBuf,
    mountables: Vec<MountableDescriptor>,
}

impl Catalog {
    /// An empty catalog bound to a descriptor directory.
    pub fn new(dir: impl Into<PathBuf>) -> Catalog {
        Catalog {
            dir: dir.into(),
            mountables: Vec::new(),
        }
    }

    /// Load the catalog from its directory.
    pub fn load(dir: impl Into<PathBuf>) -> Catalog {
        let mut catalog = Catalog::new(dir);
        catalog.reload();
        catalog
    }

    /// Replace the catalog contents with a fresh scan of the directory.
    ///
    /// In-flight mount operations keep their own descriptor clone and are
    /// unaffected.
    pub fn reload(&mut self) {
        self.mountables = read_mountable_dir(&self.dir);
        info!(
            dir = %self.dir.display(),
            count = self.mountables.len(),
            "mountable catalog loaded"
        );
    }

    pub fn find_by_type(&self, mount_type: &str) -> Option<&MountableDescriptor> {
        self.mountables
            .iter()
            .find(|m| m.mount_type == mount_type)
    }

    pub fn lookup_for_spec(&self, spec: &MountSpec) -> Option<&MountableDescriptor> {
        self.find_by_type(spec.spec_type())
    }

    pub fn enumerate(&self) -> &[MountableDescriptor] {
        &self.mountables
    }

    pub fn types(&self) -> Vec<String> {
        self.mountables
            .iter()
            .map(|m| m.mount_type.clone())
            .collect()
    }
}

fn read_mountable_dir(dir: &Path) -> Vec<MountableDescriptor> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!(dir = %dir.display(), "mountable dir not readable: {}", e);
            return Vec::new();
        }
    };

    let mut mountables = Vec::new();
    for entry in entries.flatten() {
        mountables.extend(read_mountable_file(&entry.path()));
    }
    mountables
}

/// Parse one descriptor file. Yields one descriptor per non-empty listed
/// type, zero when the file is unreadable or carries no `Type` key.
fn read_mountable_file(path: &Path) -> Vec<MountableDescriptor> {
    let mut ini = Ini::new();
    if ini.load(path).is_err() {
        return Vec::new();
    }

    let Some(types) = ini.get("Mount", "Type") else {
        return Vec::new();
    };

    let exec = ini.get("Mount", "Exec");
    let dbus_name = ini.get("Mount", "DBusName");
    let automount = ini
        .getboolcoerce("Mount", "AutoMount")
        .ok()
        .flatten()
        .unwrap_or(false);
    let scheme = ini.get("Mount", "Scheme");
    let scheme_aliases = split_list(ini.get("Mount", "SchemeAliases"));
    let default_port = ini
        .getint("Mount", "DefaultPort")
        .ok()
        .flatten()
        .unwrap_or(0) as i32;
    let hostname_is_inet = ini
        .getboolcoerce("Mount", "HostnameIsInetAddress")
        .ok()
        .flatten()
        .unwrap_or(false);

    split_list(Some(types))
        .into_iter()
        .map(|mount_type| MountableDescriptor {
            scheme: scheme.clone().unwrap_or_else(|| mount_type.clone()),
            mount_type,
            exec: exec.clone(),
            dbus_name: dbus_name.clone(),
            automount,
            scheme_aliases: scheme_aliases.clone(),
            default_port,
            hostname_is_inet,
        })
        .collect()
}

/// Split a `;`-separated keyfile list, dropping empty entries.
fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(';')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
