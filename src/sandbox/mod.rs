//! # Sandboxed Content Runtime
//!
//! The content side of the trust boundary. A [`Frame`] is one mounted
//! instance of a compiled room: it owns a [`LocalMirror`] deserialized from
//! the snapshots baked into the document, and an [`Outbox`] that posts actions
//! toward the host.
//!
//! Each client API call does two things synchronously:
//! 1. posts the matching action through the outbox (fire-and-forget);
//! 2. applies the same mutation to the local mirror.
//!
//! There is no way to read canonical state from inside a frame. The mirror can
//! drift from the host when actions race a remount or the host rejects one;
//! the drift disappears on the next mount.
//!
//! Frames are created by a [`FrameHost`], the seam standing in for the hosting
//! runtime's isolation primitive. [`NativeFrames`] runs frames in-process;
//! [`BridgedFrames`] hands each mount to an external renderer.

use log::debug;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::compiler::CompiledRoom;
use crate::errors::FrameError;
use crate::protocol::{Action, Scope};
use crate::state::{Mutation, StateMap};

/// Sending half of one mount's action channel.
///
/// Sends never block and never report failure to the caller; once the mount
/// is torn down, posted messages are discarded.
#[derive(Debug, Clone)]
pub struct Outbox {
    mount_id: u64,
    tx: mpsc::UnboundedSender<Value>,
}

impl Outbox {
    pub fn new(mount_id: u64, tx: mpsc::UnboundedSender<Value>) -> Self {
        Self { mount_id, tx }
    }

    pub fn mount_id(&self) -> u64 {
        self.mount_id
    }

    pub fn post(&self, message: Value) {
        if self.tx.send(message).is_err() {
            debug!("mount {} torn down; dropping posted message", self.mount_id);
        }
    }

    /// Whether the host side has released this mount.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Content-side copies of inventory and the active room's state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalMirror {
    pub inventory: StateMap,
    pub room_state: StateMap,
}

impl LocalMirror {
    /// Read back the snapshots serialized into a compiled document.
    pub fn from_room(room: &CompiledRoom) -> Result<Self, FrameError> {
        Ok(Self {
            inventory: StateMap::from_snapshot(room.inventory_snapshot())?,
            room_state: StateMap::from_snapshot(room.room_state_snapshot())?,
        })
    }

    fn scope_mut(&mut self, scope: Scope) -> &mut StateMap {
        match scope {
            Scope::Inventory => &mut self.inventory,
            Scope::RoomState => &mut self.room_state,
        }
    }
}

/// One mounted room instance exposing the client API.
#[derive(Debug)]
pub struct Frame {
    room: String,
    mirror: LocalMirror,
    outbox: Outbox,
}

impl Frame {
    pub fn mount(room: &CompiledRoom, outbox: Outbox) -> Result<Self, FrameError> {
        Ok(Self {
            room: room.room().to_string(),
            mirror: LocalMirror::from_room(room)?,
            outbox,
        })
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn mount_id(&self) -> u64 {
        self.outbox.mount_id()
    }

    pub fn mirror(&self) -> &LocalMirror {
        &self.mirror
    }

    pub fn inventory(&self) -> &StateMap {
        &self.mirror.inventory
    }

    pub fn room_state(&self) -> &StateMap {
        &self.mirror.room_state
    }

    /// Post an arbitrary record. Content is untrusted and may send anything.
    pub fn post_message(&self, message: Value) {
        self.outbox.post(message);
    }

    /// Ask the host to switch rooms. The mirror is not touched; the switch
    /// only takes effect when the host remounts.
    pub fn to_room(&self, room: &str) {
        self.outbox.post(
            Action::ChangeRoom {
                room: room.to_string(),
            }
            .to_message(),
        );
    }

    pub fn set_inventory(&mut self, key: &str, value: Value) {
        self.mutate(Scope::Inventory, key, Mutation::Set(value));
    }

    pub fn delete_inventory(&mut self, key: &str) {
        self.mutate(Scope::Inventory, key, Mutation::Delete);
    }

    pub fn increment_inventory(&mut self, key: &str) {
        self.mutate(Scope::Inventory, key, Mutation::Increment);
    }

    pub fn decrement_inventory(&mut self, key: &str) {
        self.mutate(Scope::Inventory, key, Mutation::Decrement);
    }

    pub fn set_room_state(&mut self, key: &str, value: Value) {
        self.mutate(Scope::RoomState, key, Mutation::Set(value));
    }

    pub fn delete_room_state(&mut self, key: &str) {
        self.mutate(Scope::RoomState, key, Mutation::Delete);
    }

    pub fn increment_room_state(&mut self, key: &str) {
        self.mutate(Scope::RoomState, key, Mutation::Increment);
    }

    pub fn decrement_room_state(&mut self, key: &str) {
        self.mutate(Scope::RoomState, key, Mutation::Decrement);
    }

    fn mutate(&mut self, scope: Scope, key: &str, mutation: Mutation) {
        self.outbox
            .post(Action::mutate(scope, key, mutation.clone()).to_message());
        self.mirror.scope_mut(scope).apply(key, &mutation);
    }
}

/// The isolation primitive that renders compiled documents.
///
/// The controller always calls [`FrameHost::unmount`] for the previous
/// document before calling [`FrameHost::mount`] for the next one.
pub trait FrameHost {
    fn mount(&mut self, room: &CompiledRoom, outbox: Outbox) -> Result<(), FrameError>;
    fn unmount(&mut self);
}

/// Runs frames in-process, one at a time.
#[derive(Debug, Default)]
pub struct NativeFrames {
    frame: Option<Frame>,
}

impl NativeFrames {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently mounted frame, if any.
    pub fn frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    pub fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.frame.as_mut()
    }
}

impl FrameHost for NativeFrames {
    fn mount(&mut self, room: &CompiledRoom, outbox: Outbox) -> Result<(), FrameError> {
        self.frame = Some(Frame::mount(room, outbox)?);
        Ok(())
    }

    fn unmount(&mut self) {
        self.frame = None;
    }
}

/// Mount lifecycle events published by [`BridgedFrames`].
#[derive(Debug)]
pub enum MountEvent {
    /// Render this document and forward its posted messages into the outbox.
    Mounted { room: CompiledRoom, outbox: Outbox },
    /// Tear down the previous document and drop its outbox.
    Unmounted { mount_id: u64 },
}

/// Publishes mounts to an external renderer (a webview, a browser bridge)
/// over a channel.
#[derive(Debug)]
pub struct BridgedFrames {
    events: mpsc::UnboundedSender<MountEvent>,
    mounted: Option<u64>,
}

impl BridgedFrames {
    pub fn new(events: mpsc::UnboundedSender<MountEvent>) -> Self {
        Self {
            events,
            mounted: None,
        }
    }
}

impl FrameHost for BridgedFrames {
    fn mount(&mut self, room: &CompiledRoom, outbox: Outbox) -> Result<(), FrameError> {
        let mount_id = outbox.mount_id();
        self.events
            .send(MountEvent::Mounted {
                room: room.clone(),
                outbox,
            })
            .map_err(|_| {
                FrameError::Io(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "renderer bridge closed",
                ))
            })?;
        self.mounted = Some(mount_id);
        Ok(())
    }

    fn unmount(&mut self) {
        if let Some(mount_id) = self.mounted.take() {
            let _ = self.events.send(MountEvent::Unmounted { mount_id });
        }
    }
}
