// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MountLocation through the exec-spawn handshake.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gvfsd_bus::{
    CallBody, Connection, IncomingCall, ObjectHandler, ReplyBody, WireError, DEFAULT_CALL_TIMEOUT,
};
use gvfsd_client::TrackerProxy;
use gvfsd_core::{
    MountRegistration, MountSourceRef, TrackerError, MOUNTABLE_PATH, SPAWNER_PATH_PREFIX,
};

use crate::prelude::*;

/// What the spawned helper process would do once up: answer the broker's
/// Mount call by registering the mount, then report success.
struct SpawnedHelper {
    conn: Connection,
}

#[async_trait]
impl ObjectHandler for SpawnedHelper {
    async fn handle_call(&self, call: IncomingCall) {
        let IncomingCall { body, token, .. } = call;
        match body {
            CallBody::Mount {
                mount_spec,
                mount_source,
                ..
            } => {
                assert!(mount_source.is_dummy());
                let result = TrackerProxy::new(self.conn.clone())
                    .register_mount(MountRegistration {
                        obj_path: "/m/spawned".to_string(),
                        display_name: "Spawned".to_string(),
                        stable_name: "spawned".to_string(),
                        x_content_types: String::new(),
                        icon: String::new(),
                        preferred_filename_encoding: "UTF-8".to_string(),
                        user_visible: false,
                        mount_spec,
                        default_location: Vec::new(),
                    })
                    .await;
                match result {
                    Ok(()) => token.send(Ok(ReplyBody::Unit)),
                    Err(e) => token.send(Err(e)),
                }
            }
            _ => token.send(Err(WireError::UnknownMethod)),
        }
    }
}

#[tokio::test]
async fn mount_location_spawns_and_handshakes() {
    let broker = start_broker(&[("smb.mount", "[Mount]\nType=smb\nExec=/bin/true\n")]).await;

    // Stand in for the launched helper process: connect as a peer, export
    // the mountable object, and complete the Spawned handshake against the
    // first allocated spawner path.
    let helper_conn = broker.connect().await;
    helper_conn.export(
        MOUNTABLE_PATH,
        Arc::new(SpawnedHelper {
            conn: helper_conn.clone(),
        }),
    );

    let daemon_id = broker.daemon_peer_id();
    let spawner_path = format!("{}0", SPAWNER_PATH_PREFIX);
    let handshake = tokio::spawn({
        let helper_conn = helper_conn.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            helper_conn
                .call(
                    &daemon_id,
                    &spawner_path,
                    CallBody::Spawned {
                        succeeded: true,
                        error_message: String::new(),
                    },
                    DEFAULT_CALL_TIMEOUT,
                )
                .await
        }
    });

    let client = broker.proxy().await;
    client
        .mount_location(&smb_spec("srv"), MountSourceRef::dummy())
        .await
        .expect("mount_location failed");
    handshake
        .await
        .expect("join failed")
        .expect("Spawned call failed");

    let mounts = client.list_mounts().await.expect("list failed");
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].object_path, "/m/spawned");
}

#[tokio::test]
async fn mount_location_reports_launch_failures() {
    let broker = start_broker(&[(
        "smb.mount",
        "[Mount]\nType=smb\nExec=/nonexistent/helper-binary\n",
    )])
    .await;
    let client = broker.proxy().await;

    let err = client
        .mount_location(&smb_spec("srv"), MountSourceRef::dummy())
        .await
        .expect_err("mount_location should fail");

    match tracker_error(err) {
        TrackerError::Failed(m) => assert!(m.starts_with("spawning failed:"), "{}", m),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn mount_location_without_exec_or_name_fails() {
    let broker = start_broker(&[("smb.mount", "[Mount]\nType=smb\nAutoMount=false\n")]).await;
    let client = broker.proxy().await;

    let err = client
        .mount_location(&smb_spec("srv"), MountSourceRef::dummy())
        .await
        .expect_err("mount_location should fail");
    assert_eq!(
        tracker_error(err),
        TrackerError::failed("No exec key defined for mountpoint")
    );
}
