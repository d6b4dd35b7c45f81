// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session bus transport for the mount broker.
//!
//! A small message bus over a Unix socket: the broker process runs the
//! [`Router`] hub, every participant (broker included) holds a
//! [`Connection`]. The hub assigns unique peer names, stamps each routed call
//! with its sender, resolves well-known names, broadcasts signals, and
//! notifies watchers when a peer's connection closes.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod connection;
mod message;
pub mod protocol;
mod router;

pub use connection::{
    Connection, IncomingCall, ObjectHandler, ReplyToken, SignalEvent, WatchGuard,
};
pub use message::{CallBody, Message, ReplyBody, SignalBody, WireError};
pub use protocol::{BusError, ProtocolError, DEFAULT_CALL_TIMEOUT, MAX_MESSAGE_SIZE};
pub use router::Router;
