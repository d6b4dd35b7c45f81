// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed proxy for the broker's mount tracker.

use std::time::Duration;

use gvfsd_bus::{CallBody, Connection, ReplyBody, WireError, DEFAULT_CALL_TIMEOUT};
use gvfsd_core::{
    MountInfo, MountRegistration, MountSourceRef, MountSpec, MountableInfo, TrackerError,
    DAEMON_NAME, MOUNT_TRACKER_PATH,
};

/// MountLocation rides through helper spawning and interactive auth; give it
/// more headroom than the broker's own mount timeout.
const LOCATION_TIMEOUT: Duration = Duration::from_secs(35 * 60);

/// Client handle on the tracker facade.
#[derive(Clone)]
pub struct TrackerProxy {
    conn: Connection,
}

impl TrackerProxy {
    pub fn new(conn: Connection) -> TrackerProxy {
        TrackerProxy { conn }
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Announce a mount this peer now owns.
    pub async fn register_mount(&self, registration: MountRegistration) -> Result<(), WireError> {
        self.call(CallBody::RegisterMount(registration), DEFAULT_CALL_TIMEOUT)
            .await
            .map(|_| ())
    }

    /// Withdraw a mount this peer registered.
    pub async fn unregister_mount(&self, obj_path: &str) -> Result<(), WireError> {
        self.call(
            CallBody::UnregisterMount {
                obj_path: obj_path.to_string(),
            },
            DEFAULT_CALL_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    /// Latch fuse availability; called by the fuse glue once its tree is up.
    pub async fn register_fuse(&self) -> Result<(), WireError> {
        self.call(CallBody::RegisterFuse, DEFAULT_CALL_TIMEOUT)
            .await
            .map(|_| ())
    }

    pub async fn lookup_mount(&self, spec: &MountSpec) -> Result<MountInfo, WireError> {
        // Lookup may automount, which spawns a helper; allow for it.
        let reply = self
            .call(
                CallBody::LookupMount {
                    mount_spec: spec.to_wire(),
                },
                LOCATION_TIMEOUT,
            )
            .await?;
        expect_mount(reply)
    }

    pub async fn lookup_mount_by_fuse_path(&self, fuse_path: &str) -> Result<MountInfo, WireError> {
        let reply = self
            .call(
                CallBody::LookupMountByFusePath {
                    fuse_path: fuse_path.to_string(),
                },
                DEFAULT_CALL_TIMEOUT,
            )
            .await?;
        expect_mount(reply)
    }

    pub async fn list_mounts(&self) -> Result<Vec<MountInfo>, WireError> {
        match self.call(CallBody::ListMounts, DEFAULT_CALL_TIMEOUT).await? {
            ReplyBody::Mounts { mounts } => Ok(mounts),
            other => Err(protocol_violation(&other)),
        }
    }

    pub async fn list_mount_types(&self) -> Result<Vec<String>, WireError> {
        match self
            .call(CallBody::ListMountTypes, DEFAULT_CALL_TIMEOUT)
            .await?
        {
            ReplyBody::MountTypes { types } => Ok(types),
            other => Err(protocol_violation(&other)),
        }
    }

    pub async fn list_mountable_info(&self) -> Result<Vec<MountableInfo>, WireError> {
        match self
            .call(CallBody::ListMountableInfo, DEFAULT_CALL_TIMEOUT)
            .await?
        {
            ReplyBody::Mountables { mountables } => Ok(mountables),
            other => Err(protocol_violation(&other)),
        }
    }

    /// Ask the broker to mount a location, prompting through `source`.
    pub async fn mount_location(
        &self,
        spec: &MountSpec,
        source: MountSourceRef,
    ) -> Result<(), WireError> {
        self.call(
            CallBody::MountLocation {
                mount_spec: spec.to_wire(),
                mount_source: source,
            },
            LOCATION_TIMEOUT,
        )
        .await
        .map(|_| ())
    }

    async fn call(&self, body: CallBody, timeout: Duration) -> Result<ReplyBody, WireError> {
        self.conn
            .call(DAEMON_NAME, MOUNT_TRACKER_PATH, body, timeout)
            .await
    }
}

fn expect_mount(reply: ReplyBody) -> Result<MountInfo, WireError> {
    match reply {
        ReplyBody::Mount { mount } => Ok(mount),
        other => Err(protocol_violation(&other)),
    }
}

fn protocol_violation(reply: &ReplyBody) -> WireError {
    TrackerError::failed(format!("unexpected reply from tracker: {:?}", reply)).into()
}
