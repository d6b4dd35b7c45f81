// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn coordinator tests over an in-process bus.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gvfsd_bus::{Router, DEFAULT_CALL_TIMEOUT};

use super::*;

fn descriptor(exec: Option<&str>, dbus_name: Option<&str>) -> MountableDescriptor {
    MountableDescriptor {
        mount_type: "test".to_string(),
        exec: exec.map(String::from),
        dbus_name: dbus_name.map(String::from),
        automount: false,
        scheme: "test".to_string(),
        scheme_aliases: Vec::new(),
        default_port: 0,
        hostname_is_inet: false,
    }
}

fn spec() -> MountSpec {
    MountSpec::new("test").with_item("host", "srv")
}

/// Helper-side mountable object with a canned Mount result.
struct FakeMountable {
    result: Result<(), TrackerError>,
}

#[async_trait]
impl ObjectHandler for FakeMountable {
    async fn handle_call(&self, call: IncomingCall) {
        match call.body {
            CallBody::Mount { .. } => match &self.result {
                Ok(()) => call.token.send(Ok(ReplyBody::Unit)),
                Err(e) => call.token.send(Err(e.clone().into())),
            },
            _ => call.token.send(Err(WireError::UnknownMethod)),
        }
    }
}

#[tokio::test]
async fn missing_exec_and_name_fails() {
    let router = Router::new();
    let broker = router.attach_local();
    let coordinator = SpawnCoordinator::new(broker);

    let err = coordinator
        .mount(
            &descriptor(None, None),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect_err("mount should fail");

    assert_eq!(
        err.as_tracker(),
        Some(&TrackerError::failed("No exec key defined for mountpoint"))
    );
}

#[tokio::test]
async fn launch_failure_fails_the_operation() {
    let router = Router::new();
    let broker = router.attach_local();
    let coordinator = SpawnCoordinator::new(broker);

    let err = coordinator
        .mount(
            &descriptor(Some("/nonexistent/helper-binary"), None),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect_err("mount should fail");

    match err.as_tracker() {
        Some(TrackerError::Failed(m)) => assert!(m.starts_with("spawning failed:"), "{}", m),
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn named_helper_is_called_directly() {
    let router = Router::new();
    let broker = router.attach_local();
    let helper = router.attach_local();

    helper.request_name("org.test.Helper").await.unwrap();
    helper.export(MOUNTABLE_PATH, Arc::new(FakeMountable { result: Ok(()) }));

    let coordinator = SpawnCoordinator::new(broker);
    coordinator
        .mount(
            &descriptor(Some("/bin/true"), Some("org.test.Helper")),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect("mount failed");
}

#[tokio::test]
async fn helper_errors_are_forwarded_verbatim() {
    let router = Router::new();
    let broker = router.attach_local();
    let helper = router.attach_local();

    helper.request_name("org.test.Helper").await.unwrap();
    helper.export(
        MOUNTABLE_PATH,
        Arc::new(FakeMountable {
            result: Err(TrackerError::already_mounted("Location is already mounted")),
        }),
    );

    let coordinator = SpawnCoordinator::new(broker);
    let err = coordinator
        .mount(
            &descriptor(None, Some("org.test.Helper")),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect_err("mount should fail");

    assert_eq!(
        err.as_tracker(),
        Some(&TrackerError::already_mounted("Location is already mounted"))
    );
}

#[tokio::test]
async fn spawned_handshake_routes_mount_to_the_sender() {
    let router = Router::new();
    let broker = router.attach_local();
    let helper = router.attach_local();

    helper.export(MOUNTABLE_PATH, Arc::new(FakeMountable { result: Ok(()) }));

    // Stand in for the launched process: call Spawned on the first spawner
    // path once the coordinator has exported it.
    let broker_id = broker.peer_id().to_string();
    let handshake = tokio::spawn({
        let helper = helper.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            helper
                .call(
                    &broker_id,
                    &format!("{}0", SPAWNER_PATH_PREFIX),
                    CallBody::Spawned {
                        succeeded: true,
                        error_message: String::new(),
                    },
                    DEFAULT_CALL_TIMEOUT,
                )
                .await
        }
    });

    let coordinator = SpawnCoordinator::new(broker);
    coordinator
        .mount(
            &descriptor(Some("/bin/true"), None),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect("mount failed");

    handshake.await.unwrap().expect("Spawned call failed");
}

#[tokio::test]
async fn failed_handshake_reports_the_helper_error() {
    let router = Router::new();
    let broker = router.attach_local();
    let helper = router.attach_local();

    let broker_id = broker.peer_id().to_string();
    tokio::spawn({
        let helper = helper.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = helper
                .call(
                    &broker_id,
                    &format!("{}0", SPAWNER_PATH_PREFIX),
                    CallBody::Spawned {
                        succeeded: false,
                        error_message: "backend could not start".to_string(),
                    },
                    DEFAULT_CALL_TIMEOUT,
                )
                .await;
        }
    });

    let coordinator = SpawnCoordinator::new(broker);
    let err = coordinator
        .mount(
            &descriptor(Some("/bin/true"), None),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect_err("mount should fail");

    assert_eq!(
        err.as_tracker(),
        Some(&TrackerError::failed("backend could not start"))
    );
}

#[tokio::test]
async fn spawner_argv_carries_broker_name_and_path() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("argv");

    let router = Router::new();
    let broker = router.attach_local();
    let helper = router.attach_local();
    let broker_id = broker.peer_id().to_string();

    // The "helper" writes the two spawner tokens it was handed, then the
    // stand-in below completes the handshake with a failure to end the wait.
    let exec = format!("/bin/sh -c 'echo \"$0\" \"$1\" \"$2\" > {}'", out.display());

    tokio::spawn({
        let helper = helper.clone();
        let broker_id = broker_id.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            let _ = helper
                .call(
                    &broker_id,
                    &format!("{}0", SPAWNER_PATH_PREFIX),
                    CallBody::Spawned {
                        succeeded: false,
                        error_message: "done".to_string(),
                    },
                    DEFAULT_CALL_TIMEOUT,
                )
                .await;
        }
    });

    let coordinator = SpawnCoordinator::new(broker);
    let err = coordinator
        .mount(
            &descriptor(Some(&exec), None),
            &spec(),
            MountSourceRef::dummy(),
            false,
        )
        .await
        .expect_err("handshake reports failure");
    assert_eq!(err.as_tracker(), Some(&TrackerError::failed("done")));

    // The subprocess runs concurrently; give it a moment.
    let mut contents = String::new();
    for _ in 0..20 {
        if let Ok(text) = std::fs::read_to_string(&out) {
            contents = text;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(
        contents.trim(),
        format!("--spawner {} {}0", broker_id, SPAWNER_PATH_PREFIX)
    );
}
