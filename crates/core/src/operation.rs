// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interactive operation handles.
//!
//! An operation handle carries the prompt-response state for one mount
//! attempt and emits a one-shot reply per prompt. The prompt relay exports
//! such a handle on the bus; the UI side (or a scripted double in tests)
//! fills in the state and resolves the reply.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};

/// Outcome of one prompt on an operation handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyResult {
    /// The handle filled in a response.
    Handled,
    /// The user aborted the operation.
    Aborted,
    /// Nothing handled the prompt.
    Unhandled,
}

/// Snapshot of the response fields on an operation handle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationState {
    pub password: String,
    pub username: String,
    pub domain: String,
    pub anonymous: bool,
    pub password_save: u32,
    pub choice: u32,
}

/// FIFO queue of one-shot reply subscriptions.
///
/// Each inbound prompt subscribes before it is emitted; each call to
/// [`resolve_next`](ReplyWaiters::resolve_next) completes the oldest pending
/// subscription, so the i-th reply pairs with the i-th prompt.
#[derive(Default)]
pub struct ReplyWaiters {
    waiters: Mutex<VecDeque<oneshot::Sender<ReplyResult>>>,
}

impl ReplyWaiters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a one-shot subscription for the next unpaired reply.
    pub fn subscribe(&self) -> oneshot::Receiver<ReplyResult> {
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().push_back(tx);
        rx
    }

    /// Resolve the oldest pending subscription. Returns false when none is
    /// pending.
    pub fn resolve_next(&self, result: ReplyResult) -> bool {
        let waiter = self.waiters.lock().pop_front();
        match waiter {
            Some(tx) => {
                let _ = tx.send(result);
                true
            }
            None => false,
        }
    }

    /// Resolve every pending subscription with the same result.
    pub fn resolve_all(&self, result: ReplyResult) {
        let drained: Vec<_> = self.waiters.lock().drain(..).collect();
        for tx in drained {
            let _ = tx.send(result);
        }
    }

    pub fn pending(&self) -> usize {
        self.waiters.lock().len()
    }
}

/// An interactive operation handle.
///
/// Prompt emission (`ask_password`, `ask_question`, `show_processes`,
/// `aborted`) must not block; responses arrive through the reply queue.
pub trait MountOperation: Send + Sync {
    /// Snapshot the current response fields.
    fn state(&self) -> OperationState;

    /// Subscribe to the next reply. Callers subscribe before emitting the
    /// prompt so replies pair with prompts in order.
    fn subscribe_reply(&self) -> oneshot::Receiver<ReplyResult>;

    /// Resolve the oldest outstanding prompt.
    fn reply(&self, result: ReplyResult);

    /// Resolve every outstanding prompt as unhandled. Used when the helper
    /// aborts the operation out from under pending prompts.
    fn abort_pending(&self);

    fn ask_password(&self, message: &str, default_user: &str, default_domain: &str, flags: u32);

    fn ask_question(&self, message: &str, choices: &[String]);

    fn show_processes(&self, message: &str, pids: &[i32], choices: &[String]);

    fn aborted(&self);
}

/// Prompt events emitted by a [`PromptOperation`] toward its UI side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
    AskPassword {
        message: String,
        default_user: String,
        default_domain: String,
        flags: u32,
    },
    AskQuestion {
        message: String,
        choices: Vec<String>,
    },
    ShowProcesses {
        message: String,
        pids: Vec<i32>,
        choices: Vec<String>,
    },
    Aborted,
}

/// Production operation handle: forwards prompts to a UI task over a channel
/// and lets that task fill in the state before resolving the reply.
pub struct PromptOperation {
    state: Mutex<OperationState>,
    waiters: ReplyWaiters,
    events: mpsc::UnboundedSender<PromptEvent>,
}

impl PromptOperation {
    /// Create a handle plus the receiving end of its prompt stream.
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<PromptEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Arc::new(PromptOperation {
                state: Mutex::new(OperationState::default()),
                waiters: ReplyWaiters::new(),
                events,
            }),
            rx,
        )
    }

    /// Update the response fields before resolving a reply.
    pub fn update_state(&self, update: impl FnOnce(&mut OperationState)) {
        update(&mut self.state.lock());
    }
}

impl MountOperation for PromptOperation {
    fn state(&self) -> OperationState {
        self.state.lock().clone()
    }

    fn subscribe_reply(&self) -> oneshot::Receiver<ReplyResult> {
        self.waiters.subscribe()
    }

    fn reply(&self, result: ReplyResult) {
        self.waiters.resolve_next(result);
    }

    fn abort_pending(&self) {
        self.waiters.resolve_all(ReplyResult::Unhandled);
    }

    fn ask_password(&self, message: &str, default_user: &str, default_domain: &str, flags: u32) {
        let _ = self.events.send(PromptEvent::AskPassword {
            message: message.to_string(),
            default_user: default_user.to_string(),
            default_domain: default_domain.to_string(),
            flags,
        });
    }

    fn ask_question(&self, message: &str, choices: &[String]) {
        let _ = self.events.send(PromptEvent::AskQuestion {
            message: message.to_string(),
            choices: choices.to_vec(),
        });
    }

    fn show_processes(&self, message: &str, pids: &[i32], choices: &[String]) {
        let _ = self.events.send(PromptEvent::ShowProcesses {
            message: message.to_string(),
            pids: pids.to_vec(),
            choices: choices.to_vec(),
        });
    }

    fn aborted(&self) {
        let _ = self.events.send(PromptEvent::Aborted);
    }
}

/// One scripted response for a [`ScriptedOperation`].
#[cfg(any(test, feature = "test-support"))]
#[derive(Debug, Clone)]
pub struct ScriptedReply {
    pub result: ReplyResult,
    pub state: OperationState,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedReply {
    pub fn handled(state: OperationState) -> Self {
        ScriptedReply {
            result: ReplyResult::Handled,
            state,
        }
    }

    pub fn aborted() -> Self {
        ScriptedReply {
            result: ReplyResult::Aborted,
            state: OperationState::default(),
        }
    }

    pub fn unhandled() -> Self {
        ScriptedReply {
            result: ReplyResult::Unhandled,
            state: OperationState::default(),
        }
    }
}

/// Test double: answers each prompt from a queue of scripted replies and
/// records the prompts it saw.
#[cfg(any(test, feature = "test-support"))]
pub struct ScriptedOperation {
    state: Mutex<OperationState>,
    waiters: ReplyWaiters,
    script: Mutex<VecDeque<ScriptedReply>>,
    seen: Mutex<Vec<PromptEvent>>,
}

#[cfg(any(test, feature = "test-support"))]
impl ScriptedOperation {
    pub fn new(script: impl IntoIterator<Item = ScriptedReply>) -> Arc<Self> {
        Arc::new(ScriptedOperation {
            state: Mutex::new(OperationState::default()),
            waiters: ReplyWaiters::new(),
            script: Mutex::new(script.into_iter().collect()),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Prompts received so far, in arrival order.
    pub fn seen(&self) -> Vec<PromptEvent> {
        self.seen.lock().clone()
    }

    fn answer(&self, event: PromptEvent) {
        self.seen.lock().push(event);
        if let Some(reply) = self.script.lock().pop_front() {
            *self.state.lock() = reply.state;
            self.waiters.resolve_next(reply.result);
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
impl MountOperation for ScriptedOperation {
    fn state(&self) -> OperationState {
        self.state.lock().clone()
    }

    fn subscribe_reply(&self) -> oneshot::Receiver<ReplyResult> {
        self.waiters.subscribe()
    }

    fn reply(&self, result: ReplyResult) {
        self.waiters.resolve_next(result);
    }

    fn abort_pending(&self) {
        self.waiters.resolve_all(ReplyResult::Unhandled);
    }

    fn ask_password(&self, message: &str, default_user: &str, default_domain: &str, flags: u32) {
        self.answer(PromptEvent::AskPassword {
            message: message.to_string(),
            default_user: default_user.to_string(),
            default_domain: default_domain.to_string(),
            flags,
        });
    }

    fn ask_question(&self, message: &str, choices: &[String]) {
        self.answer(PromptEvent::AskQuestion {
            message: message.to_string(),
            choices: choices.to_vec(),
        });
    }

    fn show_processes(&self, message: &str, pids: &[i32], choices: &[String]) {
        self.answer(PromptEvent::ShowProcesses {
            message: message.to_string(),
            pids: pids.to_vec(),
            choices: choices.to_vec(),
        });
    }

    fn aborted(&self) {
        self.seen.lock().push(PromptEvent::Aborted);
    }
}

#[cfg(test)]
#[path = "operation_tests.rs"]
mod tests;
