// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bus hub.
//!
//! Runs in the broker process: accepts socket connections, assigns unique
//! peer names, routes calls and replies between peers, resolves well-known
//! names, broadcasts signals, and fires peer-vanished notifications when a
//! connection closes.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::connection::Connection;
use crate::message::{Message, WireError};
use crate::protocol::{self, ProtocolError, HELLO_TIMEOUT};

/// The message bus hub.
#[derive(Clone, Default)]
pub struct Router {
    inner: Arc<RouterInner>,
}

#[derive(Default)]
struct RouterInner {
    state: Mutex<RouterState>,
}

#[derive(Default)]
struct RouterState {
    /// Unique peer name -> outbound channel.
    peers: HashMap<String, mpsc::UnboundedSender<Message>>,
    /// Well-known name -> unique peer name.
    names: HashMap<String, String>,
    /// Watched peer -> watcher peer names, one entry per registration.
    watches: HashMap<String, Vec<String>>,
    /// (callee, hub serial) -> (caller, caller serial) for in-flight calls.
    pending: HashMap<(String, u64), (String, u64)>,
    next_peer: u64,
    next_serial: u64,
}

impl Router {
    pub fn new() -> Router {
        Router::default()
    }

    /// Attach the hosting process as a bus peer over in-process channels.
    pub fn attach_local(&self) -> Connection {
        let peer_id = self.inner.alloc_peer_id();
        let (to_router_tx, mut to_router_rx) = mpsc::unbounded_channel::<Message>();
        let (to_conn_tx, to_conn_rx) = mpsc::unbounded_channel::<Message>();

        self.inner.register_peer(&peer_id, to_conn_tx);

        let inner = Arc::clone(&self.inner);
        let pump_peer = peer_id.clone();
        tokio::spawn(async move {
            loop {
                match to_router_rx.recv().await {
                    Some(Message::Disconnect) | None => break,
                    Some(msg) => inner.handle_peer_message(&pump_peer, msg),
                }
            }
            inner.disconnect(&pump_peer);
        });

        Connection::attach(peer_id, to_router_tx, to_conn_rx)
    }

    /// Accept-loop over the bus socket. Runs until the listener fails
    /// unrecoverably; spawn it as a task.
    pub async fn serve(self, listener: UnixListener) {
        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    let inner = Arc::clone(&self.inner);
                    let peer_id = inner.alloc_peer_id();
                    tokio::spawn(async move {
                        handle_socket(inner, stream, peer_id).await;
                    });
                }
                Err(e) => {
                    error!("Accept error: {}", e);
                }
            }
        }
    }
}

/// Serve one socket peer: handshake, register, pump messages, tear down.
async fn handle_socket(inner: Arc<RouterInner>, stream: UnixStream, peer_id: String) {
    let (mut read_half, mut write_half) = stream.into_split();

    // The first message must be Hello.
    match tokio::time::timeout(HELLO_TIMEOUT, protocol::read_msg(&mut read_half)).await {
        Ok(Ok(Message::Hello)) => {}
        Ok(Ok(other)) => {
            warn!(peer = %peer_id, "peer opened with {:?} instead of Hello", other);
            return;
        }
        Ok(Err(_)) | Err(_) => return,
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
    inner.register_peer(&peer_id, tx);

    // Writer task: drain hub-bound traffic for this peer onto the socket.
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if protocol::write_msg(&mut write_half, &msg).await.is_err() {
                break;
            }
        }
    });

    inner.send_to(&peer_id, Message::HelloReply {
        peer_id: peer_id.clone(),
    });
    debug!(peer = %peer_id, "peer connected");

    loop {
        match protocol::read_msg(&mut read_half).await {
            Ok(Message::Disconnect) => break,
            Ok(msg) => inner.handle_peer_message(&peer_id, msg),
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                warn!(peer = %peer_id, "dropping peer after read error: {}", e);
                break;
            }
        }
    }

    inner.disconnect(&peer_id);
    debug!(peer = %peer_id, "peer disconnected");
    writer.abort();
}

impl RouterInner {
    fn alloc_peer_id(&self) -> String {
        let mut state = self.state.lock();
        let id = state.next_peer;
        state.next_peer += 1;
        format!(":1.{}", id)
    }

    fn register_peer(&self, peer_id: &str, tx: mpsc::UnboundedSender<Message>) {
        self.state.lock().peers.insert(peer_id.to_string(), tx);
    }

    fn send_to(&self, peer_id: &str, msg: Message) {
        let state = self.state.lock();
        if let Some(tx) = state.peers.get(peer_id) {
            let _ = tx.send(msg);
        }
    }

    /// Process one message from a registered peer.
    fn handle_peer_message(&self, from: &str, msg: Message) {
        let mut state = self.state.lock();
        match msg {
            Message::Call {
                serial,
                destination,
                path,
                body,
                ..
            } => {
                let target = state
                    .names
                    .get(&destination)
                    .cloned()
                    .unwrap_or_else(|| destination.clone());
                match state.peers.get(&target).cloned() {
                    Some(tx) => {
                        let hub_serial = state.next_serial;
                        state.next_serial += 1;
                        state
                            .pending
                            .insert((target.clone(), hub_serial), (from.to_string(), serial));
                        let _ = tx.send(Message::Call {
                            serial: hub_serial,
                            sender: from.to_string(),
                            destination: target,
                            path,
                            body,
                        });
                    }
                    None => {
                        if let Some(tx) = state.peers.get(from) {
                            let _ = tx.send(Message::Reply {
                                serial,
                                result: Err(WireError::ServiceUnknown { name: destination }),
                            });
                        }
                    }
                }
            }

            Message::Reply { serial, result } => {
                if let Some((caller, caller_serial)) =
                    state.pending.remove(&(from.to_string(), serial))
                {
                    if let Some(tx) = state.peers.get(&caller) {
                        let _ = tx.send(Message::Reply {
                            serial: caller_serial,
                            result,
                        });
                    }
                }
            }

            Message::Signal { path, body, .. } => {
                for tx in state.peers.values() {
                    let _ = tx.send(Message::Signal {
                        sender: from.to_string(),
                        path: path.clone(),
                        body: body.clone(),
                    });
                }
            }

            Message::RequestName { serial, name } => {
                let taken = state
                    .names
                    .get(&name)
                    .is_some_and(|owner| owner != from && state.peers.contains_key(owner));
                let result = if taken {
                    Err(WireError::NameTaken { name: name.clone() })
                } else {
                    state.names.insert(name, from.to_string());
                    Ok(crate::message::ReplyBody::Unit)
                };
                if let Some(tx) = state.peers.get(from) {
                    let _ = tx.send(Message::Reply { serial, result });
                }
            }

            Message::WatchPeer { peer_id } => {
                if state.peers.contains_key(&peer_id) {
                    state
                        .watches
                        .entry(peer_id)
                        .or_default()
                        .push(from.to_string());
                } else if let Some(tx) = state.peers.get(from) {
                    // The watched peer is already gone; fire immediately.
                    let _ = tx.send(Message::PeerVanished { peer_id });
                }
            }

            Message::UnwatchPeer { peer_id } => {
                if let Some(watchers) = state.watches.get_mut(&peer_id) {
                    if let Some(idx) = watchers.iter().position(|w| w == from) {
                        watchers.swap_remove(idx);
                    }
                }
            }

            // Handshake handled by the socket layer; the rest is hub-origin
            // traffic peers have no business sending.
            Message::Hello
            | Message::HelloReply { .. }
            | Message::PeerVanished { .. }
            | Message::Disconnect => {}
        }
    }

    /// Tear down a peer: release names, fail its callees' pending replies,
    /// fire vanish notifications. Idempotent.
    fn disconnect(&self, peer_id: &str) {
        let mut state = self.state.lock();
        if state.peers.remove(peer_id).is_none() {
            return;
        }

        state.names.retain(|_, owner| owner != peer_id);

        // Calls waiting on this peer fail; calls it made are discarded.
        let stale: Vec<_> = state
            .pending
            .keys()
            .filter(|(callee, _)| callee == peer_id)
            .cloned()
            .collect();
        for key in stale {
            if let Some((caller, caller_serial)) = state.pending.remove(&key) {
                if let Some(tx) = state.peers.get(&caller) {
                    let _ = tx.send(Message::Reply {
                        serial: caller_serial,
                        result: Err(WireError::Disconnected),
                    });
                }
            }
        }
        state.pending.retain(|_, (caller, _)| caller != peer_id);

        if let Some(watchers) = state.watches.remove(peer_id) {
            for watcher in watchers {
                if let Some(tx) = state.peers.get(&watcher) {
                    let _ = tx.send(Message::PeerVanished {
                        peer_id: peer_id.to_string(),
                    });
                }
            }
        }
        for watchers in state.watches.values_mut() {
            watchers.retain(|w| w != peer_id);
        }
    }
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
