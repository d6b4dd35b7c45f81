// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mount specs: opaque keyed descriptions of mountable locations.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from parsing a wire-form mount spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("mount spec has no type")]
    MissingType,
}

/// Wire form of a mount spec: a byte path prefix plus sorted string items.
///
/// Items are kept in a sorted map so that decoding and re-encoding a spec
/// yields byte-identical output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountSpecWire {
    pub mount_prefix: Vec<u8>,
    pub items: BTreeMap<String, String>,
}

/// A validated mount spec.
///
/// The `type` item is mandatory and non-empty. Two specs match when their
/// items are equal and the candidate's mount prefix is a path-prefix of the
/// request's.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MountSpec {
    items: BTreeMap<String, String>,
    mount_prefix: Vec<u8>,
}

impl MountSpec {
    /// Create a spec with the given type and a root mount prefix.
    pub fn new(spec_type: impl Into<String>) -> Self {
        let mut items = BTreeMap::new();
        items.insert("type".to_string(), spec_type.into());
        MountSpec {
            items,
            mount_prefix: b"/".to_vec(),
        }
    }

    /// Builder-style item insertion.
    pub fn with_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.items.insert(key.into(), value.into());
        self
    }

    pub fn set_item(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.items.insert(key.into(), value.into());
    }

    pub fn set_mount_prefix(&mut self, prefix: impl Into<Vec<u8>>) {
        self.mount_prefix = prefix.into();
    }

    /// Validate a wire-form spec. Fails when the `type` item is missing or empty.
    pub fn from_wire(wire: MountSpecWire) -> Result<Self, SpecError> {
        match wire.items.get("type") {
            Some(t) if !t.is_empty() => Ok(MountSpec {
                items: wire.items,
                mount_prefix: wire.mount_prefix,
            }),
            _ => Err(SpecError::MissingType),
        }
    }

    pub fn to_wire(&self) -> MountSpecWire {
        MountSpecWire {
            mount_prefix: self.mount_prefix.clone(),
            items: self.items.clone(),
        }
    }

    /// The mandatory `type` item.
    pub fn spec_type(&self) -> &str {
        self.items.get("type").map(String::as_str).unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.items.get(key).map(String::as_str)
    }

    pub fn mount_prefix(&self) -> &[u8] {
        &self.mount_prefix
    }

    /// Whether this spec satisfies `request`: equal items, and this spec's
    /// mount prefix is a path-prefix of the request's.
    pub fn matches(&self, request: &MountSpec) -> bool {
        self.items == request.items && is_path_prefix(&self.mount_prefix, &request.mount_prefix)
    }
}

/// Path-prefix check on raw byte paths. `/a/b` is a prefix of `/a/b` and
/// `/a/b/c`, but not of `/a/bc`.
fn is_path_prefix(prefix: &[u8], path: &[u8]) -> bool {
    if prefix == path || prefix == b"/" {
        return true;
    }
    let prefix = prefix.strip_suffix(b"/").unwrap_or(prefix);
    path.starts_with(prefix) && path.get(prefix.len()) == Some(&b'/')
}

#[cfg(test)]
#[path = "spec_tests.rs"]
mod tests;
