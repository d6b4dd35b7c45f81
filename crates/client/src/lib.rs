// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client and helper-side library for the mount broker.
//!
//! Typed proxies for the tracker facade, the per-request prompt relay that
//! exposes an interactive operation handle on the bus, and the mount-source
//! proxy helpers use to prompt against a relay.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod env;
mod relay;
mod source;
mod tracker;

pub use env::session_socket_path;
pub use relay::MountOperationDbus;
pub use source::{AskPasswordReply, ChoiceReply, MountSource};
pub use tracker::TrackerProxy;
