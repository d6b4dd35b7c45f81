// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Peer-side bus connection.
//!
//! A `Connection` sends calls, exports handler objects, emits broadcast
//! signals, and watches peers for disappearance. Inbound calls for exported
//! objects are dispatched sequentially from a single task, so a handler that
//! needs to block (e.g. while waiting on a user prompt) must move its reply
//! token into a spawned task.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::net::UnixStream;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::message::{CallBody, Message, ReplyBody, SignalBody, WireError};
use crate::protocol::{self, BusError, ProtocolError, HELLO_TIMEOUT};

/// The reply slot for one inbound call. Consumed by sending exactly once.
pub struct ReplyToken {
    serial: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl ReplyToken {
    pub fn send(self, result: Result<ReplyBody, WireError>) {
        let _ = self.tx.send(Message::Reply {
            serial: self.serial,
            result,
        });
    }
}

/// One inbound call routed to an exported object.
pub struct IncomingCall {
    pub sender: String,
    pub path: String,
    pub body: CallBody,
    pub token: ReplyToken,
}

/// Handler for calls on an exported object path.
///
/// Calls arrive one at a time, in wire order. Handlers that suspend for long
/// periods must spawn the wait and return, or they stall every other object
/// on the connection.
#[async_trait]
pub trait ObjectHandler: Send + Sync {
    async fn handle_call(&self, call: IncomingCall);
}

/// A broadcast signal observed on the connection.
#[derive(Debug, Clone)]
pub struct SignalEvent {
    pub sender: String,
    pub path: String,
    pub body: SignalBody,
}

/// Releases one watch registration on drop.
pub struct WatchGuard {
    tx: mpsc::UnboundedSender<Message>,
    peer_id: String,
}

impl WatchGuard {
    pub fn peer_id(&self) -> &str {
        &self.peer_id
    }
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(Message::UnwatchPeer {
            peer_id: self.peer_id.clone(),
        });
    }
}

struct ConnShared {
    peer_id: String,
    tx: mpsc::UnboundedSender<Message>,
    next_serial: AtomicU64,
    pending: Mutex<HashMap<u64, oneshot::Sender<Result<ReplyBody, WireError>>>>,
    objects: Mutex<HashMap<String, Arc<dyn ObjectHandler>>>,
    signal_subs: Mutex<Vec<mpsc::UnboundedSender<SignalEvent>>>,
    vanish_subs: Mutex<Vec<mpsc::UnboundedSender<String>>>,
}

/// A live bus connection with an assigned unique peer name.
#[derive(Clone)]
pub struct Connection {
    shared: Arc<ConnShared>,
}

impl Connection {
    /// Connect to the bus socket at `path` and complete the Hello handshake.
    pub async fn connect(path: &Path) -> Result<Connection, BusError> {
        let stream = UnixStream::connect(path).await?;
        let (mut read_half, mut write_half) = stream.into_split();

        protocol::write_msg(&mut write_half, &Message::Hello).await?;
        let peer_id = match tokio::time::timeout(HELLO_TIMEOUT, protocol::read_msg(&mut read_half))
            .await
        {
            Ok(Ok(Message::HelloReply { peer_id })) => peer_id,
            Ok(Ok(other)) => {
                return Err(BusError::Handshake(format!(
                    "expected HelloReply, got {:?}",
                    other
                )))
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(BusError::Handshake("no HelloReply before timeout".into())),
        };

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
        let conn = Connection::assemble(peer_id, out_tx);

        // Writer: drain outbound messages onto the socket. A Disconnect is
        // written through, then the socket is dropped.
        tokio::spawn(async move {
            while let Some(msg) = out_rx.recv().await {
                let last = matches!(msg, Message::Disconnect);
                if protocol::write_msg(&mut write_half, &msg).await.is_err() || last {
                    break;
                }
            }
        });

        // Reader: decode inbound messages until the socket closes.
        let shared = Arc::clone(&conn.shared);
        let dispatch_tx = conn.spawn_dispatcher();
        tokio::spawn(async move {
            loop {
                match protocol::read_msg(&mut read_half).await {
                    Ok(msg) => dispatch_incoming(&shared, &dispatch_tx, msg),
                    Err(ProtocolError::ConnectionClosed) => break,
                    Err(e) => {
                        warn!("bus read error: {}", e);
                        break;
                    }
                }
            }
            fail_pending(&shared);
        });

        Ok(conn)
    }

    /// Build a connection over in-process channels. Used by the router to
    /// attach the hosting process as a peer.
    pub(crate) fn attach(
        peer_id: String,
        out_tx: mpsc::UnboundedSender<Message>,
        mut in_rx: mpsc::UnboundedReceiver<Message>,
    ) -> Connection {
        let conn = Connection::assemble(peer_id, out_tx);

        let shared = Arc::clone(&conn.shared);
        let dispatch_tx = conn.spawn_dispatcher();
        tokio::spawn(async move {
            while let Some(msg) = in_rx.recv().await {
                dispatch_incoming(&shared, &dispatch_tx, msg);
            }
            fail_pending(&shared);
        });

        conn
    }

    fn assemble(peer_id: String, tx: mpsc::UnboundedSender<Message>) -> Connection {
        Connection {
            shared: Arc::new(ConnShared {
                peer_id,
                tx,
                next_serial: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                objects: Mutex::new(HashMap::new()),
                signal_subs: Mutex::new(Vec::new()),
                vanish_subs: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Spawn the sequential call dispatcher and return its inbox.
    fn spawn_dispatcher(&self) -> mpsc::UnboundedSender<IncomingCall> {
        let (dispatch_tx, mut dispatch_rx) = mpsc::unbounded_channel::<IncomingCall>();
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            while let Some(call) = dispatch_rx.recv().await {
                let handler = shared.objects.lock().get(&call.path).cloned();
                match handler {
                    Some(handler) => handler.handle_call(call).await,
                    None => {
                        debug!(path = %call.path, "call for unexported object");
                        call.token.send(Err(WireError::UnknownObject { path: call.path }));
                    }
                }
            }
        });
        dispatch_tx
    }

    /// The unique name assigned by the hub.
    pub fn peer_id(&self) -> &str {
        &self.shared.peer_id
    }

    /// Issue a call and wait for its reply.
    pub async fn call(
        &self,
        destination: &str,
        path: &str,
        body: CallBody,
        timeout: Duration,
    ) -> Result<ReplyBody, WireError> {
        let serial = self.shared.next_serial.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(serial, tx);

        let sent = self.shared.tx.send(Message::Call {
            serial,
            sender: self.shared.peer_id.clone(),
            destination: destination.to_string(),
            path: path.to_string(),
            body,
        });
        if sent.is_err() {
            self.shared.pending.lock().remove(&serial);
            return Err(WireError::Disconnected);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(WireError::Disconnected),
            Err(_) => {
                self.shared.pending.lock().remove(&serial);
                Err(WireError::Timeout)
            }
        }
    }

    /// Claim a well-known name on the bus.
    pub async fn request_name(&self, name: &str) -> Result<(), WireError> {
        let serial = self.shared.next_serial.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(serial, tx);

        let sent = self.shared.tx.send(Message::RequestName {
            serial,
            name: name.to_string(),
        });
        if sent.is_err() {
            self.shared.pending.lock().remove(&serial);
            return Err(WireError::Disconnected);
        }

        match tokio::time::timeout(HELLO_TIMEOUT, rx).await {
            Ok(Ok(Ok(_))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(WireError::Disconnected),
            Err(_) => {
                self.shared.pending.lock().remove(&serial);
                Err(WireError::Timeout)
            }
        }
    }

    /// Export a handler object at `path`. Replaces any previous handler.
    pub fn export(&self, path: impl Into<String>, handler: Arc<dyn ObjectHandler>) {
        self.shared.objects.lock().insert(path.into(), handler);
    }

    /// Remove the handler at `path`. Late calls get an UnknownObject reply.
    pub fn unexport(&self, path: &str) {
        self.shared.objects.lock().remove(path);
    }

    /// Broadcast a signal to every peer on the bus.
    pub fn emit_signal(&self, path: &str, body: SignalBody) {
        let _ = self.shared.tx.send(Message::Signal {
            sender: self.shared.peer_id.clone(),
            path: path.to_string(),
            body,
        });
    }

    /// Watch a peer for disappearance. The returned guard releases the watch
    /// on drop; notifications arrive via [`subscribe_vanished`](Self::subscribe_vanished).
    pub fn watch_peer(&self, peer_id: &str) -> WatchGuard {
        let _ = self.shared.tx.send(Message::WatchPeer {
            peer_id: peer_id.to_string(),
        });
        WatchGuard {
            tx: self.shared.tx.clone(),
            peer_id: peer_id.to_string(),
        }
    }

    /// Observe broadcast signals.
    pub fn subscribe_signals(&self) -> mpsc::UnboundedReceiver<SignalEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.signal_subs.lock().push(tx);
        rx
    }

    /// Observe peer-vanished notifications for watched peers.
    pub fn subscribe_vanished(&self) -> mpsc::UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared.vanish_subs.lock().push(tx);
        rx
    }

    /// Say goodbye and tear the connection down. Outstanding calls resolve
    /// with a disconnect error.
    pub fn close(&self) {
        let _ = self.shared.tx.send(Message::Disconnect);
    }
}

/// Route one inbound message to the right place on the connection.
fn dispatch_incoming(
    shared: &Arc<ConnShared>,
    dispatch_tx: &mpsc::UnboundedSender<IncomingCall>,
    msg: Message,
) {
    match msg {
        Message::Call {
            serial,
            sender,
            path,
            body,
            ..
        } => {
            let call = IncomingCall {
                sender,
                path,
                body,
                token: ReplyToken {
                    serial,
                    tx: shared.tx.clone(),
                },
            };
            let _ = dispatch_tx.send(call);
        }
        Message::Reply { serial, result } => {
            if let Some(tx) = shared.pending.lock().remove(&serial) {
                let _ = tx.send(result);
            }
        }
        Message::Signal { sender, path, body } => {
            shared.signal_subs.lock().retain(|sub| {
                sub.send(SignalEvent {
                    sender: sender.clone(),
                    path: path.clone(),
                    body: body.clone(),
                })
                .is_ok()
            });
        }
        Message::PeerVanished { peer_id } => {
            shared
                .vanish_subs
                .lock()
                .retain(|sub| sub.send(peer_id.clone()).is_ok());
        }
        // Handshake traffic and client-bound control we do not consume.
        _ => {}
    }
}

/// Resolve every pending call with a disconnect error.
fn fail_pending(shared: &Arc<ConnShared>) {
    let pending: Vec<_> = shared.pending.lock().drain().collect();
    for (_, tx) in pending {
        let _ = tx.send(Err(WireError::Disconnected));
    }
}
