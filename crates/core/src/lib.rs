// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Core domain types for the session VFS mount broker.
//!
//! Mount specs, mount and mountable wire tuples, mount-source references,
//! interactive operation handles, and the tracker error taxonomy. No I/O
//! happens here; the bus and daemon crates build on these types.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod error;
mod mount;
mod mountable;
mod operation;
mod source;
mod spec;

pub use error::TrackerError;
pub use mount::{fuse_path_matches, MountInfo, MountRegistration};
pub use mountable::{MountableDescriptor, MountableInfo};
pub use operation::{
    MountOperation, OperationState, PromptEvent, PromptOperation, ReplyResult, ReplyWaiters,
};
pub use source::MountSourceRef;
pub use spec::{MountSpec, MountSpecWire, SpecError};

#[cfg(any(test, feature = "test-support"))]
pub use operation::{ScriptedOperation, ScriptedReply};

/// Well-known bus name owned by the broker.
pub const DAEMON_NAME: &str = "org.gtk.vfs.Daemon";

/// Object path of the mount tracker exported by the broker.
pub const MOUNT_TRACKER_PATH: &str = "/org/gtk/vfs/mounttracker";

/// Object path at which every helper exports its mountable object.
pub const MOUNTABLE_PATH: &str = "/org/gtk/vfs/mountable";

/// Prefix for per-spawn handshake objects; a process-wide counter is appended.
pub const SPAWNER_PATH_PREFIX: &str = "/org/gtk/gvfs/exec_spaw/";

/// Prefix for per-request mount-operation objects exported by clients.
pub const MOUNT_OP_PATH_PREFIX: &str = "/org/gtk/gvfs/mountop/";
