// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bus message and payload types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gvfsd_core::{
    MountInfo, MountRegistration, MountSourceRef, MountSpecWire, MountableInfo, TrackerError,
};

/// One framed message on a bus connection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Message {
    /// First message from a fresh peer; the hub answers with `HelloReply`.
    Hello,

    /// Hub's greeting carrying the assigned unique peer name.
    HelloReply { peer_id: String },

    /// Claim a well-known name; acked with a `Reply` for the same serial.
    RequestName { serial: u64, name: String },

    /// A routed method call. The hub overwrites `sender` with the caller's
    /// assigned name; peers cannot spoof identity.
    Call {
        serial: u64,
        sender: String,
        destination: String,
        path: String,
        body: CallBody,
    },

    /// Response to a call, routed back to the caller.
    Reply {
        serial: u64,
        result: Result<ReplyBody, WireError>,
    },

    /// Broadcast to every connected peer. `sender` is hub-stamped.
    Signal {
        sender: String,
        path: String,
        body: SignalBody,
    },

    /// Subscribe to a `PeerVanished` notification for a peer. Watches are
    /// counted; each `UnwatchPeer` releases one.
    WatchPeer { peer_id: String },

    UnwatchPeer { peer_id: String },

    /// Delivered to watchers when the watched peer's connection closes.
    PeerVanished { peer_id: String },

    /// Clean goodbye; the hub tears the connection down as if it had closed.
    Disconnect,
}

/// Method payloads for routed calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "method")]
pub enum CallBody {
    // Mount tracker (broker-side object)
    RegisterMount(MountRegistration),
    UnregisterMount {
        obj_path: String,
    },
    RegisterFuse,
    LookupMount {
        mount_spec: MountSpecWire,
    },
    LookupMountByFusePath {
        fuse_path: String,
    },
    ListMounts,
    ListMountTypes,
    ListMountableInfo,
    MountLocation {
        mount_spec: MountSpecWire,
        mount_source: MountSourceRef,
    },

    // Mountable (helper-side object)
    Mount {
        mount_spec: MountSpecWire,
        automount: bool,
        mount_source: MountSourceRef,
    },

    // Spawner (one-shot handshake object)
    Spawned {
        succeeded: bool,
        error_message: String,
    },

    // Mount operation (client-side prompt object)
    AskPassword {
        message: String,
        default_user: String,
        default_domain: String,
        flags: u32,
    },
    AskQuestion {
        message: String,
        choices: Vec<String>,
    },
    ShowProcesses {
        message: String,
        choices: Vec<String>,
        pids: Vec<i32>,
    },
    Aborted,
}

/// Reply payloads for routed calls.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "reply")]
pub enum ReplyBody {
    Unit,
    Mount {
        mount: MountInfo,
    },
    Mounts {
        mounts: Vec<MountInfo>,
    },
    MountTypes {
        types: Vec<String>,
    },
    Mountables {
        mountables: Vec<MountableInfo>,
    },
    AskPassword {
        handled: bool,
        aborted: bool,
        password: String,
        username: String,
        domain: String,
        anonymous: bool,
        password_save: u32,
    },
    Choice {
        handled: bool,
        aborted: bool,
        choice: u32,
    },
}

/// Broadcast payloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "signal")]
pub enum SignalBody {
    Mounted { mount: MountInfo },
    Unmounted { mount: MountInfo },
}

/// Errors that cross the wire in a `Reply`.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum WireError {
    /// A tracker-level error, message preserved verbatim.
    #[error("{error}")]
    Tracker { error: TrackerError },

    #[error("no peer owns the name {name}")]
    ServiceUnknown { name: String },

    #[error("no object exported at {path}")]
    UnknownObject { path: String },

    #[error("the name {name} is already owned")]
    NameTaken { name: String },

    #[error("method not supported by this object")]
    UnknownMethod,

    #[error("call timed out")]
    Timeout,

    #[error("peer disconnected")]
    Disconnected,
}

impl From<TrackerError> for WireError {
    fn from(error: TrackerError) -> Self {
        WireError::Tracker { error }
    }
}

impl WireError {
    /// The tracker error inside, when this is a tracker-level failure.
    pub fn as_tracker(&self) -> Option<&TrackerError> {
        match self {
            WireError::Tracker { error } => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
