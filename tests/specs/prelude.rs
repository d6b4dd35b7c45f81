// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test helpers for behavioral specifications.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::net::UnixListener;
use tokio::sync::mpsc;

use gvfsd_bus::{Connection, Router, SignalEvent};
use gvfsd_client::TrackerProxy;
use gvfsd_core::{MountRegistration, MountSpec, DAEMON_NAME};
use gvfsd_daemon::{Catalog, Tracker};

/// Fuse mountpoints in the specs are rooted here.
pub const FUSE_BASE: &str = "/run/user/1000/gvfs";

/// A broker running in-process with a real bus socket.
pub struct Broker {
    pub socket: PathBuf,
    daemon_conn: Connection,
    pub catalog: Arc<Mutex<Catalog>>,
    _tracker: Tracker,
    _dir: tempfile::TempDir,
}

impl Broker {
    /// The broker's own peer name, as a spawned helper would learn it from
    /// its `--spawner` arguments.
    pub fn daemon_peer_id(&self) -> String {
        self.daemon_conn.peer_id().to_string()
    }

    /// Connect a fresh peer over the socket.
    pub async fn connect(&self) -> Connection {
        Connection::connect(&self.socket).await.expect("connect failed")
    }

    /// A tracker proxy over a fresh peer connection.
    pub async fn proxy(&self) -> TrackerProxy {
        TrackerProxy::new(self.connect().await)
    }
}

/// Start a broker with the given mountable descriptor files.
pub async fn start_broker(mountables: &[(&str, &str)]) -> Broker {
    let dir = tempfile::tempdir().unwrap();
    let mountable_dir = dir.path().join("mounts");
    std::fs::create_dir_all(&mountable_dir).unwrap();
    for (name, contents) in mountables {
        std::fs::write(mountable_dir.join(name), contents).unwrap();
    }

    let socket = dir.path().join("bus.sock");
    let listener = UnixListener::bind(&socket).unwrap();

    let router = Router::new();
    let daemon_conn = router.attach_local();
    daemon_conn.request_name(DAEMON_NAME).await.unwrap();
    tokio::spawn(router.clone().serve(listener));

    let catalog = Arc::new(Mutex::new(Catalog::load(&mountable_dir)));
    let tracker = Tracker::new(
        daemon_conn.clone(),
        Arc::clone(&catalog),
        PathBuf::from(FUSE_BASE),
    );

    Broker {
        socket,
        daemon_conn,
        catalog,
        _tracker: tracker,
        _dir: dir,
    }
}

/// The S1-style registration: a user-visible smb mount.
pub fn smb_registration(obj_path: &str, stable_name: &str, host: &str) -> MountRegistration {
    MountRegistration {
        obj_path: obj_path.to_string(),
        display_name: "Disk".to_string(),
        stable_name: stable_name.to_string(),
        x_content_types: String::new(),
        icon: String::new(),
        preferred_filename_encoding: "UTF-8".to_string(),
        user_visible: true,
        mount_spec: smb_spec(host).to_wire(),
        default_location: b"/srv/share".to_vec(),
    }
}

pub fn smb_spec(host: &str) -> MountSpec {
    MountSpec::new("smb").with_item("host", host)
}

/// Unwrap a tracker-level error out of a wire error.
pub fn tracker_error(err: gvfsd_bus::WireError) -> gvfsd_core::TrackerError {
    match err {
        gvfsd_bus::WireError::Tracker { error } => error,
        other => panic!("expected tracker error, got {:?}", other),
    }
}

/// Wait for the next broadcast, with a deadline.
pub async fn next_signal(rx: &mut mpsc::UnboundedReceiver<SignalEvent>) -> gvfsd_bus::SignalBody {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("no signal within 5s")
        .expect("signal stream closed")
        .body
}
