// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mount-source proxy: the helper-side view of a prompt relay.

use std::time::Duration;

use gvfsd_bus::{CallBody, Connection, ReplyBody, WireError};
use gvfsd_core::{MountSourceRef, TrackerError};

/// Prompts may sit in front of a user for a long time.
const PROMPT_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Response to an `ask_password` prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AskPasswordReply {
    pub handled: bool,
    pub aborted: bool,
    pub password: String,
    pub username: String,
    pub domain: String,
    pub anonymous: bool,
    pub password_save: u32,
}

/// Response to an `ask_question` or `show_processes` prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceReply {
    pub handled: bool,
    pub aborted: bool,
    pub choice: u32,
}

/// A helper's handle on the mount source it was given.
///
/// Prompts against a dummy reference resolve locally to unhandled replies
/// with zeroed fields; no bus traffic happens.
pub struct MountSource {
    conn: Connection,
    source: MountSourceRef,
}

impl MountSource {
    pub fn new(conn: Connection, source: MountSourceRef) -> MountSource {
        MountSource { conn, source }
    }

    pub fn is_dummy(&self) -> bool {
        self.source.is_dummy()
    }

    pub fn source_ref(&self) -> &MountSourceRef {
        &self.source
    }

    pub async fn ask_password(
        &self,
        message: &str,
        default_user: &str,
        default_domain: &str,
        flags: u32,
    ) -> Result<AskPasswordReply, WireError> {
        if self.source.is_dummy() {
            return Ok(AskPasswordReply::default());
        }
        let reply = self
            .call(CallBody::AskPassword {
                message: message.to_string(),
                default_user: default_user.to_string(),
                default_domain: default_domain.to_string(),
                flags,
            })
            .await?;
        match reply {
            ReplyBody::AskPassword {
                handled,
                aborted,
                password,
                username,
                domain,
                anonymous,
                password_save,
            } => Ok(AskPasswordReply {
                handled,
                aborted,
                password,
                username,
                domain,
                anonymous,
                password_save,
            }),
            other => Err(protocol_violation(&other)),
        }
    }

    pub async fn ask_question(
        &self,
        message: &str,
        choices: &[String],
    ) -> Result<ChoiceReply, WireError> {
        if self.source.is_dummy() {
            return Ok(ChoiceReply::default());
        }
        let reply = self
            .call(CallBody::AskQuestion {
                message: message.to_string(),
                choices: choices.to_vec(),
            })
            .await?;
        into_choice(reply)
    }

    pub async fn show_processes(
        &self,
        message: &str,
        pids: &[i32],
        choices: &[String],
    ) -> Result<ChoiceReply, WireError> {
        if self.source.is_dummy() {
            return Ok(ChoiceReply::default());
        }
        let reply = self
            .call(CallBody::ShowProcesses {
                message: message.to_string(),
                choices: choices.to_vec(),
                pids: pids.to_vec(),
            })
            .await?;
        into_choice(reply)
    }

    /// Tell the source the operation was aborted, resolving any in-flight
    /// prompts on its handle.
    pub async fn aborted(&self) -> Result<(), WireError> {
        if self.source.is_dummy() {
            return Ok(());
        }
        self.call(CallBody::Aborted).await.map(|_| ())
    }

    async fn call(&self, body: CallBody) -> Result<ReplyBody, WireError> {
        self.conn
            .call(
                &self.source.peer_id,
                &self.source.object_path,
                body,
                PROMPT_TIMEOUT,
            )
            .await
    }
}

fn into_choice(reply: ReplyBody) -> Result<ChoiceReply, WireError> {
    match reply {
        ReplyBody::Choice {
            handled,
            aborted,
            choice,
        } => Ok(ChoiceReply {
            handled,
            aborted,
            choice,
        }),
        other => Err(protocol_violation(&other)),
    }
}

fn protocol_violation(reply: &ReplyBody) -> WireError {
    TrackerError::failed(format!("unexpected reply from mount source: {:?}", reply)).into()
}

#[cfg(test)]
#[path = "source_tests.rs"]
mod tests;
