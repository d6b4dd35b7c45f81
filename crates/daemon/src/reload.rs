// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration reload on SIGUSR1.
//!
//! The tokio signal driver is the async-signal-safe self-pipe: the handler
//! writes a byte, the event loop reads it, and the reload itself runs here,
//! never in signal context.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::catalog::Catalog;

/// Install the SIGUSR1 handler and rerun the catalog loader on each delivery.
pub fn spawn_reload_task(catalog: Arc<Mutex<Catalog>>) -> std::io::Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("SIGUSR1 received, reloading mountable configuration");
            catalog.lock().reload();
        }
    });
    Ok(())
}
