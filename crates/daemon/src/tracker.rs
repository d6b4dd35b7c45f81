// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The mount tracker: registry of live mounts plus the service facade.
//!
//! All registry and catalog mutation happens inside short lock sections in
//! the call handlers; the long waits (helper spawning, Mount calls) run in
//! spawned tasks holding no locks.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tracing::{debug, info};

use gvfsd_bus::{
    CallBody, Connection, IncomingCall, ObjectHandler, ReplyBody, ReplyToken, SignalBody,
    WatchGuard, WireError,
};
use gvfsd_core::{
    fuse_path_matches, MountInfo, MountRegistration, MountSourceRef, MountSpec, TrackerError,
    MOUNT_TRACKER_PATH,
};

use crate::catalog::Catalog;
use crate::spawn::SpawnCoordinator;

/// Escape set for the fuse directory leaf: everything outside the RFC 3986
/// unreserved alphabet is escaped, the `+@#$., ` reserved set included.
const FUSE_LEAF: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'~');

/// A live mount owned by some peer.
struct Mount {
    peer_id: String,
    object_path: String,
    display_name: String,
    stable_name: String,
    x_content_types: String,
    icon: String,
    preferred_filename_encoding: String,
    user_visible: bool,
    default_location: Vec<u8>,
    /// Computed for user-visible mounts even while fuse is unavailable; the
    /// wire form hides it until RegisterFuse latches.
    fuse_mountpoint: Vec<u8>,
    spec: MountSpec,
    /// Released on removal; keeps the peer-vanished subscription alive.
    _watch: WatchGuard,
}

impl Mount {
    fn to_wire(&self, fuse_available: bool) -> MountInfo {
        MountInfo {
            peer_id: self.peer_id.clone(),
            object_path: self.object_path.clone(),
            display_name: self.display_name.clone(),
            stable_name: self.stable_name.clone(),
            x_content_types: self.x_content_types.clone(),
            icon: self.icon.clone(),
            preferred_filename_encoding: self.preferred_filename_encoding.clone(),
            user_visible: self.user_visible,
            fuse_mountpoint: if fuse_available {
                self.fuse_mountpoint.clone()
            } else {
                Vec::new()
            },
            mount_spec: self.spec.to_wire(),
            default_location: self.default_location.clone(),
        }
    }
}

#[derive(Default)]
struct TrackerState {
    mounts: Vec<Mount>,
    fuse_available: bool,
}

struct TrackerInner {
    conn: Connection,
    catalog: Arc<Mutex<Catalog>>,
    spawner: SpawnCoordinator,
    fuse_base: PathBuf,
    state: Mutex<TrackerState>,
}

/// The broker context: mount registry, catalog handle, fuse flag, and the
/// spawn coordinator, exported on the bus as the tracker object.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

impl Tracker {
    /// Build the tracker, export it at the tracker path, and start watching
    /// for vanished peers.
    pub fn new(conn: Connection, catalog: Arc<Mutex<Catalog>>, fuse_base: PathBuf) -> Tracker {
        let tracker = Tracker {
            inner: Arc::new(TrackerInner {
                spawner: SpawnCoordinator::new(conn.clone()),
                conn: conn.clone(),
                catalog,
                fuse_base,
                state: Mutex::new(TrackerState::default()),
            }),
        };

        conn.export(
            MOUNT_TRACKER_PATH,
            Arc::new(TrackerObject {
                tracker: tracker.clone(),
            }),
        );

        let mut vanished = conn.subscribe_vanished();
        let gc = tracker.clone();
        tokio::spawn(async move {
            while let Some(peer_id) = vanished.recv().await {
                gc.peer_vanished(&peer_id);
            }
        });

        tracker
    }

    /// Register a mount owned by `sender`. Emits the Mounted broadcast
    /// before the caller sees the reply.
    fn register_mount(
        &self,
        sender: &str,
        registration: MountRegistration,
    ) -> Result<ReplyBody, WireError> {
        let MountRegistration {
            obj_path,
            display_name,
            stable_name,
            x_content_types,
            icon,
            preferred_filename_encoding,
            user_visible,
            mount_spec,
            default_location,
        } = registration;

        let mut state = self.inner.state.lock();

        if state
            .mounts
            .iter()
            .any(|m| m.peer_id == sender && m.object_path == obj_path)
        {
            return Err(TrackerError::already_mounted("Mountpoint Already registered").into());
        }

        let spec = MountSpec::from_wire(mount_spec)
            .map_err(|_| TrackerError::invalid_argument("Error in mount spec"))?;

        if state.mounts.iter().any(|m| m.spec.matches(&spec)) {
            return Err(TrackerError::already_mounted("Mountpoint Already registered").into());
        }

        let fuse_mountpoint = if user_visible {
            self.fuse_mountpoint_for(&stable_name)
        } else {
            Vec::new()
        };

        let mount = Mount {
            peer_id: sender.to_string(),
            object_path: obj_path,
            display_name,
            stable_name,
            x_content_types,
            icon,
            preferred_filename_encoding,
            user_visible,
            default_location,
            fuse_mountpoint,
            spec,
            _watch: self.inner.conn.watch_peer(sender),
        };
        let wire = mount.to_wire(state.fuse_available);
        state.mounts.push(mount);
        drop(state);

        info!(peer = %sender, path = %wire.object_path, "mount registered");
        self.inner
            .conn
            .emit_signal(MOUNT_TRACKER_PATH, SignalBody::Mounted { mount: wire });
        Ok(ReplyBody::Unit)
    }

    /// Withdraw a mount `sender` registered earlier.
    fn unregister_mount(&self, sender: &str, obj_path: &str) -> Result<ReplyBody, WireError> {
        let mut state = self.inner.state.lock();
        let position = state
            .mounts
            .iter()
            .position(|m| m.peer_id == sender && m.object_path == obj_path);

        let Some(position) = position else {
            return Err(
                TrackerError::not_mounted("The specified location is not mounted").into(),
            );
        };

        let mount = state.mounts.remove(position);
        let wire = mount.to_wire(state.fuse_available);
        drop(state);

        info!(peer = %sender, path = %obj_path, "mount unregistered");
        self.inner
            .conn
            .emit_signal(MOUNT_TRACKER_PATH, SignalBody::Unmounted { mount: wire });
        Ok(ReplyBody::Unit)
    }

    /// Latch fuse availability. Idempotent.
    fn register_fuse(&self) {
        let mut state = self.inner.state.lock();
        if !state.fuse_available {
            info!("fuse bridge registered");
            state.fuse_available = true;
        }
    }

    /// Drop every mount owned by a vanished peer, one Unmounted broadcast
    /// each. Watches fire once per registration, so repeats are no-ops.
    fn peer_vanished(&self, peer_id: &str) {
        let removed: Vec<MountInfo> = {
            let mut state = self.inner.state.lock();
            let fuse_available = state.fuse_available;
            let (gone, keep): (Vec<Mount>, Vec<Mount>) = state
                .mounts
                .drain(..)
                .partition(|m| m.peer_id == peer_id);
            state.mounts = keep;
            gone.iter().map(|m| m.to_wire(fuse_available)).collect()
        };

        for mount in removed {
            debug!(peer = %peer_id, path = %mount.object_path, "mount dropped with its peer");
            self.inner
                .conn
                .emit_signal(MOUNT_TRACKER_PATH, SignalBody::Unmounted { mount });
        }
    }

    /// LookupMount: find a matching mount, or try the automount path.
    fn lookup_mount(&self, spec_wire: gvfsd_core::MountSpecWire, token: ReplyToken) {
        match MountSpec::from_wire(spec_wire) {
            Ok(spec) => self.lookup_mount_spec(spec, true, token),
            Err(_) => token.send(Err(TrackerError::invalid_argument("Invalid arguments").into())),
        }
    }

    fn lookup_mount_spec(&self, spec: MountSpec, do_automount: bool, token: ReplyToken) {
        let found = {
            let state = self.inner.state.lock();
            state
                .mounts
                .iter()
                .find(|m| m.spec.matches(&spec))
                .map(|m| m.to_wire(state.fuse_available))
        };

        match found {
            Some(mount) => token.send(Ok(ReplyBody::Mount { mount })),
            None => self.maybe_automount(spec, do_automount, token),
        }
    }

    /// The automount policy: unsupported types error out, non-automountable
    /// (or forbidden) lookups report not-mounted, the rest spawn with a
    /// dummy source and re-enter lookup exactly once.
    fn maybe_automount(&self, spec: MountSpec, do_automount: bool, token: ReplyToken) {
        let mountable = self.inner.catalog.lock().lookup_for_spec(&spec).cloned();

        match mountable {
            None => token.send(Err(
                TrackerError::not_supported("The specified location is not supported").into(),
            )),
            Some(mountable) if do_automount && mountable.automount => {
                debug!(mount_type = %mountable.mount_type, "automounting");
                let tracker = self.clone();
                tokio::spawn(async move {
                    let outcome = tracker
                        .inner
                        .spawner
                        .mount(&mountable, &spec, MountSourceRef::dummy(), true)
                        .await;
                    match outcome {
                        Ok(()) => tracker.lookup_mount_spec(spec, false, token),
                        Err(e) => token.send(Err(TrackerError::not_mounted(format!(
                            "Automount failed: {}",
                            e
                        ))
                        .into())),
                    }
                });
            }
            Some(_) => token.send(Err(
                TrackerError::not_mounted("The specified location is not mounted").into(),
            )),
        }
    }

    fn lookup_mount_by_fuse_path(&self, fuse_path: &str) -> Result<ReplyBody, WireError> {
        let state = self.inner.state.lock();
        if !state.fuse_available {
            return Err(TrackerError::not_mounted("The specified location is not mounted").into());
        }
        state
            .mounts
            .iter()
            .find(|m| fuse_path_matches(&m.fuse_mountpoint, fuse_path.as_bytes()))
            .map(|m| ReplyBody::Mount {
                mount: m.to_wire(true),
            })
            .ok_or_else(|| {
                TrackerError::not_mounted("The specified location is not mounted").into()
            })
    }

    fn list_mounts(&self) -> ReplyBody {
        let state = self.inner.state.lock();
        ReplyBody::Mounts {
            mounts: state
                .mounts
                .iter()
                .map(|m| m.to_wire(state.fuse_available))
                .collect(),
        }
    }

    fn list_mount_types(&self) -> ReplyBody {
        ReplyBody::MountTypes {
            types: self.inner.catalog.lock().types(),
        }
    }

    fn list_mountable_info(&self) -> ReplyBody {
        ReplyBody::Mountables {
            mountables: self
                .inner
                .catalog
                .lock()
                .enumerate()
                .iter()
                .map(|m| m.info())
                .collect(),
        }
    }

    /// MountLocation: reject already-mounted specs, then hand the request to
    /// the spawn coordinator and reply when it completes.
    fn mount_location(
        &self,
        spec_wire: gvfsd_core::MountSpecWire,
        source: MountSourceRef,
        token: ReplyToken,
    ) {
        let spec = match MountSpec::from_wire(spec_wire) {
            Ok(spec) => spec,
            Err(_) => {
                return token
                    .send(Err(TrackerError::invalid_argument("Invalid arguments").into()))
            }
        };

        let mounted = {
            let state = self.inner.state.lock();
            state.mounts.iter().any(|m| m.spec.matches(&spec))
        };
        if mounted {
            return token.send(Err(
                TrackerError::already_mounted("Location is already mounted").into(),
            ));
        }

        let mountable = self.inner.catalog.lock().lookup_for_spec(&spec).cloned();
        let Some(mountable) = mountable else {
            return token.send(Err(
                TrackerError::not_mounted("Location is not mountable").into(),
            ));
        };

        let tracker = self.clone();
        tokio::spawn(async move {
            let outcome = tracker
                .inner
                .spawner
                .mount(&mountable, &spec, source, false)
                .await;
            token.send(outcome.map(|_| ReplyBody::Unit));
        });
    }

    fn fuse_mountpoint_for(&self, stable_name: &str) -> Vec<u8> {
        use std::os::unix::ffi::OsStrExt;
        let leaf = utf8_percent_encode(stable_name, FUSE_LEAF).to_string();
        self.inner
            .fuse_base
            .join(leaf)
            .as_os_str()
            .as_bytes()
            .to_vec()
    }
}

/// Bus object dispatching tracker calls.
struct TrackerObject {
    tracker: Tracker,
}

#[async_trait]
impl ObjectHandler for TrackerObject {
    async fn handle_call(&self, call: IncomingCall) {
        let IncomingCall {
            sender,
            body,
            token,
            ..
        } = call;
        match body {
            CallBody::RegisterMount(registration) => {
                token.send(self.tracker.register_mount(&sender, registration));
            }
            CallBody::UnregisterMount { obj_path } => {
                token.send(self.tracker.unregister_mount(&sender, &obj_path));
            }
            CallBody::RegisterFuse => {
                self.tracker.register_fuse();
                token.send(Ok(ReplyBody::Unit));
            }
            CallBody::LookupMount { mount_spec } => self.tracker.lookup_mount(mount_spec, token),
            CallBody::LookupMountByFusePath { fuse_path } => {
                token.send(self.tracker.lookup_mount_by_fuse_path(&fuse_path));
            }
            CallBody::ListMounts => token.send(Ok(self.tracker.list_mounts())),
            CallBody::ListMountTypes => token.send(Ok(self.tracker.list_mount_types())),
            CallBody::ListMountableInfo => token.send(Ok(self.tracker.list_mountable_info())),
            CallBody::MountLocation {
                mount_spec,
                mount_source,
            } => self.tracker.mount_location(mount_spec, mount_source, token),
            _ => token.send(Err(WireError::UnknownMethod)),
        }
    }
}

#[cfg(test)]
#[path = "tracker_tests.rs"]
mod tests;
