// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The prompt relay: exposes an operation handle as a bus object.
//!
//! Wrapping a handle exports a per-request object at
//! `/org/gtk/gvfs/mountop/<n>` on the caller's connection and returns the
//! `(peer, object path)` reference a helper needs to prompt against it. Each
//! inbound prompt subscribes to the handle's reply queue before emitting, so
//! concurrent prompts pair with their replies in order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use gvfsd_bus::{CallBody, Connection, IncomingCall, ObjectHandler, ReplyBody, WireError};
use gvfsd_core::{MountOperation, MountSourceRef, ReplyResult, MOUNT_OP_PATH_PREFIX};

static MOUNT_OP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A wrapped operation handle, exported on the bus for the lifetime of this
/// value. Dropping it unexports the object; late prompts get an
/// unknown-object reply.
pub struct MountOperationDbus {
    source: MountSourceRef,
    exported: Option<(Connection, String)>,
}

impl MountOperationDbus {
    /// Wrap `op` for use as a mount source. A `None` handle yields the dummy
    /// reference and exports nothing.
    pub fn wrap(op: Option<Arc<dyn MountOperation>>, conn: &Connection) -> MountOperationDbus {
        let Some(op) = op else {
            return MountOperationDbus {
                source: MountSourceRef::dummy(),
                exported: None,
            };
        };

        let obj_path = format!(
            "{}{}",
            MOUNT_OP_PATH_PREFIX,
            MOUNT_OP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        conn.export(obj_path.clone(), Arc::new(OperationObject { op }));
        debug!(path = %obj_path, "exported mount operation");

        MountOperationDbus {
            source: MountSourceRef::new(conn.peer_id(), obj_path.clone()),
            exported: Some((conn.clone(), obj_path)),
        }
    }

    /// The `(peer, object path)` reference helpers prompt against.
    pub fn source(&self) -> MountSourceRef {
        self.source.clone()
    }

    pub fn is_dummy(&self) -> bool {
        self.exported.is_none()
    }
}

impl Drop for MountOperationDbus {
    fn drop(&mut self) {
        if let Some((conn, path)) = self.exported.take() {
            conn.unexport(&path);
        }
    }
}

/// Bus object translating inbound prompts into handle events.
struct OperationObject {
    op: Arc<dyn MountOperation>,
}

#[async_trait]
impl ObjectHandler for OperationObject {
    async fn handle_call(&self, call: IncomingCall) {
        let IncomingCall { body, token, .. } = call;
        match body {
            CallBody::AskPassword {
                message,
                default_user,
                default_domain,
                flags,
            } => {
                let rx = self.op.subscribe_reply();
                self.op
                    .ask_password(&message, &default_user, &default_domain, flags);
                let op = Arc::clone(&self.op);
                tokio::spawn(async move {
                    let result = rx.await.unwrap_or(ReplyResult::Unhandled);
                    let state = op.state();
                    token.send(Ok(ReplyBody::AskPassword {
                        handled: result != ReplyResult::Unhandled,
                        aborted: result == ReplyResult::Aborted,
                        password: state.password,
                        username: state.username,
                        domain: state.domain,
                        anonymous: state.anonymous,
                        password_save: state.password_save,
                    }));
                });
            }

            CallBody::AskQuestion { message, choices } => {
                let rx = self.op.subscribe_reply();
                self.op.ask_question(&message, &choices);
                let op = Arc::clone(&self.op);
                tokio::spawn(async move {
                    let result = rx.await.unwrap_or(ReplyResult::Unhandled);
                    token.send(Ok(ReplyBody::Choice {
                        handled: result != ReplyResult::Unhandled,
                        aborted: result == ReplyResult::Aborted,
                        choice: op.state().choice,
                    }));
                });
            }

            CallBody::ShowProcesses {
                message,
                choices,
                pids,
            } => {
                let rx = self.op.subscribe_reply();
                self.op.show_processes(&message, &pids, &choices);
                let op = Arc::clone(&self.op);
                tokio::spawn(async move {
                    let result = rx.await.unwrap_or(ReplyResult::Unhandled);
                    token.send(Ok(ReplyBody::Choice {
                        handled: result != ReplyResult::Unhandled,
                        aborted: result == ReplyResult::Aborted,
                        choice: op.state().choice,
                    }));
                });
            }

            CallBody::Aborted => {
                // Resolve any in-flight prompt first so its bus reply goes
                // out, then tell the handle the helper gave up.
                self.op.abort_pending();
                self.op.aborted();
                token.send(Ok(ReplyBody::Unit));
            }

            _ => token.send(Err(WireError::UnknownMethod)),
        }
    }
}

#[cfg(test)]
#[path = "relay_tests.rs"]
mod tests;
