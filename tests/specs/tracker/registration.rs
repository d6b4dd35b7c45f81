// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Register, list, and vanish behavior.

use gvfsd_bus::SignalBody;
use gvfsd_client::TrackerProxy;
use gvfsd_core::TrackerError;

use crate::prelude::*;

#[tokio::test]
async fn register_list_and_vanish() {
    let broker = start_broker(&[]).await;

    let helper_conn = broker.connect().await;
    let helper = TrackerProxy::new(helper_conn.clone());
    let observer = broker.proxy().await;
    let mut signals = observer.connection().subscribe_signals();

    helper
        .register_mount(smb_registration("/m/1", "disk-1", "srv"))
        .await
        .expect("register failed");

    // Fuse was never registered: the broadcast tuple hides the mountpoint.
    match next_signal(&mut signals).await {
        SignalBody::Mounted { mount } => {
            assert_eq!(mount.peer_id, helper_conn.peer_id());
            assert_eq!(mount.display_name, "Disk");
            assert!(mount.fuse_mountpoint.is_empty());
        }
        other => panic!("expected Mounted, got {:?}", other),
    }

    let mounts = observer.list_mounts().await.expect("list failed");
    assert_eq!(mounts.len(), 1);
    assert_eq!(mounts[0].object_path, "/m/1");

    // The owning peer goes away; its mounts go with it.
    helper_conn.close();
    match next_signal(&mut signals).await {
        SignalBody::Unmounted { mount } => assert_eq!(mount.object_path, "/m/1"),
        other => panic!("expected Unmounted, got {:?}", other),
    }
    assert!(observer.list_mounts().await.expect("list failed").is_empty());
}

#[tokio::test]
async fn duplicate_spec_registration_is_rejected() {
    let broker = start_broker(&[]).await;

    let first = broker.proxy().await;
    let second = broker.proxy().await;
    let mut signals = first.connection().subscribe_signals();

    first
        .register_mount(smb_registration("/m/1", "disk-1", "srv"))
        .await
        .expect("register failed");
    assert!(matches!(
        next_signal(&mut signals).await,
        SignalBody::Mounted { .. }
    ));

    let err = second
        .register_mount(smb_registration("/m/x", "disk-x", "srv"))
        .await
        .expect_err("collision should fail");
    assert_eq!(
        tracker_error(err),
        TrackerError::already_mounted("Mountpoint Already registered")
    );

    // Registry unchanged, no broadcast for the rejected attempt.
    assert_eq!(second.list_mounts().await.expect("list failed").len(), 1);
    assert!(
        tokio::time::timeout(std::time::Duration::from_millis(200), signals.recv())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn owner_unregisters_and_broadcasts() {
    let broker = start_broker(&[]).await;

    let helper = broker.proxy().await;
    let observer = broker.proxy().await;
    let mut signals = observer.connection().subscribe_signals();

    helper
        .register_mount(smb_registration("/m/1", "disk-1", "srv"))
        .await
        .expect("register failed");
    assert!(matches!(
        next_signal(&mut signals).await,
        SignalBody::Mounted { .. }
    ));

    helper
        .unregister_mount("/m/1")
        .await
        .expect("unregister failed");
    assert!(matches!(
        next_signal(&mut signals).await,
        SignalBody::Unmounted { .. }
    ));
    assert!(observer.list_mounts().await.expect("list failed").is_empty());
}
