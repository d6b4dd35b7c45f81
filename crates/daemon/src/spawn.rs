// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn coordinator: turns a mountable descriptor into a live helper and
//! forwards the Mount call to it.
//!
//! Descriptors with a `dbus_name` are called directly. Exec-only descriptors
//! go through a four-step handshake: allocate a spawner path, export a
//! one-shot Spawner object there, launch the helper with
//! `--spawner <broker-name> <path>` appended to its exec line, and wait for
//! its `Spawned` call. The sender of that call is the helper's bus name.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use gvfsd_bus::{CallBody, Connection, IncomingCall, ObjectHandler, ReplyBody, WireError};
use gvfsd_core::{
    MountSourceRef, MountSpec, MountableDescriptor, TrackerError, MOUNTABLE_PATH,
    SPAWNER_PATH_PREFIX,
};

/// Outbound Mount calls ride through interactive authentication.
pub const MOUNT_TIMEOUT_MSECS: u64 = 30 * 60 * 1000;

/// Bound on the wait for a spawned helper's handshake. A helper that
/// crashes before calling Spawned fails the operation here.
pub const SPAWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Launches helpers and issues Mount calls on their mountable objects.
///
/// Multiple mounts may be in flight at once; only the spawner-path counter
/// is shared between them.
pub struct SpawnCoordinator {
    conn: Connection,
    next_spawn_id: AtomicU64,
}

impl SpawnCoordinator {
    pub fn new(conn: Connection) -> SpawnCoordinator {
        SpawnCoordinator {
            conn,
            next_spawn_id: AtomicU64::new(0),
        }
    }

    /// Mount `spec` via the helper described by `mountable`, prompting
    /// through `source`. Helper-reported errors come back verbatim.
    pub async fn mount(
        &self,
        mountable: &MountableDescriptor,
        spec: &MountSpec,
        source: MountSourceRef,
        automount: bool,
    ) -> Result<(), WireError> {
        if let Some(name) = &mountable.dbus_name {
            return self.mount_with_name(name, spec, source, automount).await;
        }

        let Some(exec) = &mountable.exec else {
            return Err(TrackerError::failed("No exec key defined for mountpoint").into());
        };

        let argv = shell_words::split(exec)
            .map_err(|e| TrackerError::failed(format!("bad exec line {:?}: {}", exec, e)))?;
        let Some((program, args)) = argv.split_first() else {
            return Err(TrackerError::failed(format!("empty exec line {:?}", exec)).into());
        };

        let obj_path = format!(
            "{}{}",
            SPAWNER_PATH_PREFIX,
            self.next_spawn_id.fetch_add(1, Ordering::SeqCst)
        );
        let (notice_tx, notice_rx) = oneshot::channel();
        self.conn
            .export(obj_path.clone(), Arc::new(SpawnerObject::new(notice_tx)));

        let mut command = Command::new(program);
        command
            .args(args)
            .arg("--spawner")
            .arg(self.conn.peer_id())
            .arg(&obj_path);

        debug!(exec = %exec, spawner = %obj_path, "launching helper");
        match command.spawn() {
            Ok(child) => drop(child),
            Err(e) => {
                self.conn.unexport(&obj_path);
                return Err(TrackerError::failed(format!("spawning failed: {}", e)).into());
            }
        }

        let notice = tokio::time::timeout(SPAWN_TIMEOUT, notice_rx).await;
        self.conn.unexport(&obj_path);

        match notice {
            Ok(Ok(spawned)) => {
                if spawned.succeeded {
                    self.mount_with_name(&spawned.sender, spec, source, automount)
                        .await
                } else {
                    Err(TrackerError::failed(spawned.error_message).into())
                }
            }
            Ok(Err(_)) => Err(TrackerError::failed("spawner was torn down").into()),
            Err(_) => Err(TrackerError::failed(format!(
                "helper did not complete the spawn handshake within {}s",
                SPAWN_TIMEOUT.as_secs()
            ))
            .into()),
        }
    }

    /// Call Mount on an already-claimed bus name.
    async fn mount_with_name(
        &self,
        name: &str,
        spec: &MountSpec,
        source: MountSourceRef,
        automount: bool,
    ) -> Result<(), WireError> {
        debug!(helper = %name, "calling Mount on helper");
        let result = self
            .conn
            .call(
                name,
                MOUNTABLE_PATH,
                CallBody::Mount {
                    mount_spec: spec.to_wire(),
                    automount,
                    mount_source: source,
                },
                Duration::from_millis(MOUNT_TIMEOUT_MSECS),
            )
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                warn!(helper = %name, "Mount call failed: {}", e);
                Err(e)
            }
        }
    }
}

/// What the Spawned handshake delivered.
struct SpawnedNotice {
    sender: String,
    succeeded: bool,
    error_message: String,
}

/// One-shot handshake object. The first Spawned call wins; anything else is
/// rejected.
struct SpawnerObject {
    notice: Mutex<Option<oneshot::Sender<SpawnedNotice>>>,
}

impl SpawnerObject {
    fn new(tx: oneshot::Sender<SpawnedNotice>) -> SpawnerObject {
        SpawnerObject {
            notice: Mutex::new(Some(tx)),
        }
    }
}

#[async_trait]
impl ObjectHandler for SpawnerObject {
    async fn handle_call(&self, call: IncomingCall) {
        let IncomingCall {
            sender,
            body,
            token,
            ..
        } = call;
        match body {
            CallBody::Spawned {
                succeeded,
                error_message,
            } => {
                debug!(sender = %sender, succeeded, "Spawned handshake received");
                token.send(Ok(ReplyBody::Unit));
                if let Some(tx) = self.notice.lock().take() {
                    let _ = tx.send(SpawnedNotice {
                        sender,
                        succeeded,
                        error_message,
                    });
                }
            }
            _ => token.send(Err(WireError::UnknownMethod)),
        }
    }
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
