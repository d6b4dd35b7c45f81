// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use fs2::FileExt;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::info;

use gvfsd_bus::{BusError, Connection, Router, WireError};
use gvfsd_core::DAEMON_NAME;

use crate::catalog::Catalog;
use crate::env;
use crate::tracker::Tracker;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/gvfsd)
    pub state_dir: PathBuf,
    /// Path to the bus socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Mountable descriptor directory
    pub mountable_dir: PathBuf,
    /// Base directory for fuse mountpoints
    pub fuse_base: PathBuf,
}

impl Config {
    /// Load configuration for the user-session daemon. One daemon serves
    /// the whole session.
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;

        Ok(Self {
            socket_path: env::socket_path(&state_dir),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            mountable_dir: env::mountable_dir(),
            fuse_base: env::fuse_base_dir(),
            state_dir,
        })
    }
}

/// Lifecycle errors.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine a state directory (HOME not set)")]
    NoStateDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not acquire daemon lock: {0}")]
    LockFailed(std::io::Error),

    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    #[error("could not claim the daemon bus name: {0}")]
    Name(WireError),
}

/// A started daemon: the running router, the broker's own connection, and
/// the tracker exported on it.
pub struct Daemon {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub router: Router,
    pub conn: Connection,
    pub catalog: Arc<Mutex<Catalog>>,
    pub tracker: Tracker,
}

impl Daemon {
    /// Remove the socket and pid files. Best-effort.
    pub fn shutdown(&self) {
        let _ = std::fs::remove_file(&self.config.socket_path);
        let _ = std::fs::remove_file(&self.config.lock_path);
    }
}

/// Bring the broker up: take the daemon lock, bind the socket, load the
/// catalog, attach the broker to its own bus, and export the tracker.
///
/// The returned listener must be handed to `Router::serve` as a task.
pub async fn startup(config: &Config) -> Result<(Daemon, UnixListener), LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut lock_file = File::create(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    writeln!(lock_file, "{}", std::process::id())?;

    // A previous daemon may have left its socket behind; the lock proves it
    // is gone.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)?;

    let catalog = Arc::new(Mutex::new(Catalog::load(&config.mountable_dir)));

    let router = Router::new();
    let conn = router.attach_local();
    conn.request_name(DAEMON_NAME)
        .await
        .map_err(LifecycleError::Name)?;

    let tracker = Tracker::new(conn.clone(), Arc::clone(&catalog), config.fuse_base.clone());

    info!(
        socket = %config.socket_path.display(),
        mountable_dir = %config.mountable_dir.display(),
        "broker initialized"
    );

    Ok((
        Daemon {
            config: config.clone(),
            lock_file,
            router,
            conn,
            catalog,
            tracker,
        },
        listener,
    ))
}
