// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lookup, automount policy, and fuse-path resolution.

use gvfsd_core::{MountSpec, TrackerError};

use crate::prelude::*;

#[tokio::test]
async fn lookup_finds_registered_mounts() {
    let broker = start_broker(&[]).await;
    let helper = broker.proxy().await;
    let client = broker.proxy().await;

    helper
        .register_mount(smb_registration("/m/1", "disk-1", "srv"))
        .await
        .expect("register failed");

    let mount = client
        .lookup_mount(&smb_spec("srv"))
        .await
        .expect("lookup failed");
    assert_eq!(mount.object_path, "/m/1");
}

#[tokio::test]
async fn lookup_of_unknown_type_is_not_supported() {
    let broker = start_broker(&[]).await;
    let client = broker.proxy().await;

    let err = client
        .lookup_mount(&MountSpec::new("nope"))
        .await
        .expect_err("lookup should fail");
    assert_eq!(
        tracker_error(err),
        TrackerError::not_supported("The specified location is not supported")
    );
}

#[tokio::test]
async fn lookup_does_not_automount_disabled_types() {
    let broker = start_broker(&[(
        "x.mount",
        "[Mount]\nType=x\nExec=/bin/true\nAutoMount=false\n",
    )])
    .await;
    let client = broker.proxy().await;

    let err = client
        .lookup_mount(&MountSpec::new("x"))
        .await
        .expect_err("lookup should fail");
    assert_eq!(
        tracker_error(err),
        TrackerError::not_mounted("The specified location is not mounted")
    );
}

#[tokio::test]
async fn fuse_path_lookup_after_register_fuse() {
    let broker = start_broker(&[]).await;
    let helper = broker.proxy().await;
    let fuse = broker.proxy().await;
    let client = broker.proxy().await;

    helper
        .register_mount(smb_registration("/m/1", "weird name@srv", "srv"))
        .await
        .expect("register failed");

    let inside = format!("{}/weird%20name%40srv/sub/file", FUSE_BASE);

    // Nothing resolves until the fuse bridge announces itself.
    let err = client
        .lookup_mount_by_fuse_path(&inside)
        .await
        .expect_err("lookup should fail before RegisterFuse");
    assert!(matches!(tracker_error(err), TrackerError::NotMounted(_)));

    fuse.register_fuse().await.expect("register_fuse failed");

    let mount = client
        .lookup_mount_by_fuse_path(&inside)
        .await
        .expect("lookup failed");
    assert_eq!(mount.stable_name, "weird name@srv");
    assert_eq!(
        mount.fuse_mountpoint,
        format!("{}/weird%20name%40srv", FUSE_BASE).into_bytes()
    );

    // Shared name prefix without a path boundary is a different directory.
    let sibling = format!("{}/weird%20name%40srvX", FUSE_BASE);
    let err = client
        .lookup_mount_by_fuse_path(&sibling)
        .await
        .expect_err("sibling should not match");
    assert!(matches!(tracker_error(err), TrackerError::NotMounted(_)));
}

#[tokio::test]
async fn list_mount_types_reflects_the_catalog() {
    let broker = start_broker(&[
        ("smb.mount", "[Mount]\nType=smb\nExec=/bin/true\n"),
        ("sftp.mount", "[Mount]\nType=sftp\nExec=/bin/true\nScheme=ssh\n"),
    ])
    .await;
    let client = broker.proxy().await;

    let mut types = client.list_mount_types().await.expect("list failed");
    types.sort();
    assert_eq!(types, vec!["sftp".to_string(), "smb".to_string()]);

    let mountables = client.list_mountable_info().await.expect("list failed");
    let sftp = mountables
        .iter()
        .find(|m| m.mount_type == "sftp")
        .expect("sftp missing");
    assert_eq!(sftp.scheme, "ssh");
    assert!(!sftp.hostname_is_inet);
}
