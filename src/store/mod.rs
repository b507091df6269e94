//! # Host State Store
//!
//! Owns the canonical inventory, per-room state and the current room id.
//! [`HostStateStore::apply_action`] is the single mutation entry point and
//! [`HostStateStore::snapshot`] the single read entry point; nothing outside
//! the store writes canonical state.

use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;

use crate::errors::{InitError, ProtocolError};
use crate::logutil::preview_value;
use crate::protocol::{parse_message, Action, Effect, Inbound, Scope};
use crate::rooms::{RoomRegistry, RoomSchema, StartRoomPolicy};
use crate::state::StateMap;

/// What applying one message did to canonical state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The current room changed.
    RoomChanged { from: String, to: String },
    /// An inventory or room-state entry changed.
    StateChanged { scope: Scope, key: String },
    /// The action was valid but left state as it was.
    Unchanged,
    /// The discriminator is not one this host knows.
    Ignored(String),
}

impl Outcome {
    /// Whether the mounted document is now stale.
    pub fn is_change(&self) -> bool {
        matches!(self, Outcome::RoomChanged { .. } | Outcome::StateChanged { .. })
    }
}

/// Read-only copy of canonical state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub current_room: String,
    pub inventory: StateMap,
    pub room_state: StateMap,
}

#[derive(Debug)]
pub struct HostStateStore {
    registry: RoomRegistry,
    inventory: StateMap,
    room_states: HashMap<String, StateMap>,
    current_room: String,
    revision: u64,
}

impl HostStateStore {
    /// Build the registry and start in the designated start room.
    pub fn initialize(schemas: Vec<RoomSchema>) -> Result<Self, InitError> {
        Self::initialize_with(schemas, StartRoomPolicy::default())
    }

    pub fn initialize_with(
        schemas: Vec<RoomSchema>,
        policy: StartRoomPolicy,
    ) -> Result<Self, InitError> {
        let registry = RoomRegistry::build(schemas, policy)?;
        let current_room = registry.start_room().to_string();
        info!(
            "Initialized {} rooms, starting in '{}'",
            registry.len(),
            current_room
        );
        Ok(Self {
            registry,
            inventory: StateMap::new(),
            room_states: HashMap::new(),
            current_room,
            revision: 0,
        })
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn current_room(&self) -> &str {
        &self.current_room
    }

    /// Schema of the active room.
    pub fn current_schema(&self) -> Option<&RoomSchema> {
        self.registry.get(&self.current_room)
    }

    pub fn inventory(&self) -> &StateMap {
        &self.inventory
    }

    /// State partition of the active room; empty until the room writes to it.
    pub fn current_room_state(&self) -> StateMap {
        self.room_state(&self.current_room)
    }

    /// State partition of any room; `None` if the room never wrote state.
    pub fn room_state_of(&self, room: &str) -> Option<&StateMap> {
        self.room_states.get(room)
    }

    fn room_state(&self, room: &str) -> StateMap {
        self.room_states.get(room).cloned().unwrap_or_default()
    }

    /// Bumped on every change to canonical state.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            current_room: self.current_room.clone(),
            inventory: self.inventory.clone(),
            room_state: self.current_room_state(),
        }
    }

    /// Validate a raw inbound message and apply it.
    ///
    /// Errors leave canonical state untouched.
    pub fn apply_message(&mut self, raw: &Value) -> Result<Outcome, ProtocolError> {
        match parse_message(raw)? {
            Inbound::Action(action) => self.apply_action(&action),
            Inbound::Unrecognized(name) => {
                debug!("Ignoring unrecognized action {}", name);
                Ok(Outcome::Ignored(name))
            }
        }
    }

    /// Apply a recognized action to canonical state.
    ///
    /// Room-state actions always target the room active at the time they are
    /// applied.
    pub fn apply_action(&mut self, action: &Action) -> Result<Outcome, ProtocolError> {
        let outcome = match action.effect() {
            Effect::ChangeRoom(room) => {
                if !self.registry.contains(room) {
                    return Err(ProtocolError::UnknownRoom(room.to_string()));
                }
                if room == self.current_room {
                    Outcome::Unchanged
                } else {
                    let from = std::mem::replace(&mut self.current_room, room.to_string());
                    info!("Room change '{}' -> '{}'", from, room);
                    Outcome::RoomChanged {
                        from,
                        to: room.to_string(),
                    }
                }
            }
            Effect::Mutate {
                scope: Scope::Inventory,
                key,
                mutation,
            } => {
                if self.inventory.apply(key, &mutation) {
                    info!(
                        target: "inventory",
                        "{} {} => {}",
                        action.name(),
                        key,
                        preview_value(self.inventory.get(key))
                    );
                    debug!(target: "inventory", "inventory now {}", self.inventory.to_snapshot());
                    Outcome::StateChanged {
                        scope: Scope::Inventory,
                        key: key.to_string(),
                    }
                } else {
                    Outcome::Unchanged
                }
            }
            Effect::Mutate {
                scope: Scope::RoomState,
                key,
                mutation,
            } => {
                let state = self
                    .room_states
                    .entry(self.current_room.clone())
                    .or_default();
                if state.apply(key, &mutation) {
                    debug!(
                        "{} {}[{}] => {}",
                        action.name(),
                        self.current_room,
                        key,
                        preview_value(state.get(key))
                    );
                    Outcome::StateChanged {
                        scope: Scope::RoomState,
                        key: key.to_string(),
                    }
                } else {
                    Outcome::Unchanged
                }
            }
        };
        if outcome.is_change() {
            self.revision += 1;
        }
        Ok(outcome)
    }
}
