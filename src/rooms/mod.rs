//! Room schemas and the immutable registry built from them at startup.

pub mod loader;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::InitError;

/// A named unit of content supplied once by the embedding application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSchema {
    /// Unique room identifier.
    pub name: String,
    /// Markup and embedded script rendered inside the frame.
    pub html: String,
    /// Marks the room the session starts in.
    #[serde(rename = "startHere", default)]
    pub start_here: bool,
}

impl RoomSchema {
    pub fn new(name: &str, html: &str) -> Self {
        Self {
            name: name.to_string(),
            html: html.to_string(),
            start_here: false,
        }
    }

    pub fn starting(mut self) -> Self {
        self.start_here = true;
        self
    }
}

/// How to resolve the start room when several schemas claim it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartRoomPolicy {
    /// Exactly one schema may be marked `startHere`.
    #[default]
    Strict,
    /// The last schema marked `startHere` wins (duplicates are logged).
    LastWins,
}

/// Mapping from room name to schema. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct RoomRegistry {
    rooms: HashMap<String, RoomSchema>,
    order: Vec<String>,
    start_room: String,
}

impl RoomRegistry {
    /// Build the registry and resolve the unique start room.
    pub fn build(schemas: Vec<RoomSchema>, policy: StartRoomPolicy) -> Result<Self, InitError> {
        let mut rooms = HashMap::with_capacity(schemas.len());
        let mut order = Vec::with_capacity(schemas.len());
        let mut starts = Vec::new();

        for schema in schemas {
            if rooms.contains_key(&schema.name) {
                return Err(InitError::DuplicateRoom(schema.name));
            }
            if schema.start_here {
                starts.push(schema.name.clone());
            }
            debug!("Registered room '{}' ({} bytes)", schema.name, schema.html.len());
            order.push(schema.name.clone());
            rooms.insert(schema.name.clone(), schema);
        }

        let start_room = match (starts.len(), policy) {
            (0, _) => return Err(InitError::NoStartRoom),
            (1, _) => starts.remove(0),
            (_, StartRoomPolicy::Strict) => return Err(InitError::MultipleStartRooms(starts)),
            (_, StartRoomPolicy::LastWins) => {
                warn!(
                    "Several rooms marked startHere ({}); using the last one",
                    starts.join(", ")
                );
                starts.pop().unwrap_or_default()
            }
        };

        Ok(Self {
            rooms,
            order,
            start_room,
        })
    }

    pub fn get(&self, name: &str) -> Option<&RoomSchema> {
        self.rooms.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn start_room(&self) -> &str {
        &self.start_room
    }

    /// Room names in the order they were supplied.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

/// The three-room demo set written by `roombox init`.
pub fn demo_rooms() -> Vec<RoomSchema> {
    vec![
        RoomSchema::new(
            "Room One",
            r#"
<style>
  .green { color: green; }
</style>
<div><span class="green"> Whoa </span> this is html in room one!</div>
<div onclick="toRoom('Room Two')"> Go to room two! </div>
<div onclick="toRoom('Room Three')"> Go to room three! </div>
<div onclick="setInventory('shinyKey', true)"> Get shiny key! </div>
<div onclick="setInventory('dullKey', true)"> Get dull key! </div>
"#,
        )
        .starting(),
        RoomSchema::new(
            "Room Two",
            r#"
<div>Whoa this is html in room two! Not green though.</div>
<div onclick="toRoom('Room One')"> Go to room one! </div>
<div onclick="toRoom('Room Three')"> Go to room three! </div>
<div onclick="console.log(inventory)"> Check backpack! </div>
"#,
        ),
        RoomSchema::new(
            "Room Three",
            r#"
<script>
  function addRandomToRoomState() {
    setRoomState(Math.random(), Math.random());
  }
</script>
<div> Man, room three sucks. </div>
<div onclick="toRoom('Room One')"> Go to room one! </div>
<div onclick="toRoom('Room Two')"> Go to room two! </div>
<div onclick="addRandomToRoomState()"> Add to room state! </div>
<div onclick="console.log(roomState)"> Get room state! </div>
"#,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_start_room_is_selected() {
        let registry = RoomRegistry::build(
            vec![
                RoomSchema::new("A", ""),
                RoomSchema::new("B", "").starting(),
            ],
            StartRoomPolicy::Strict,
        )
        .unwrap();
        assert_eq!(registry.start_room(), "B");
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["A", "B"]);
    }

    #[test]
    fn missing_start_room_is_fatal() {
        let err = RoomRegistry::build(vec![RoomSchema::new("A", "")], StartRoomPolicy::Strict)
            .unwrap_err();
        assert!(matches!(err, InitError::NoStartRoom));
        let err = RoomRegistry::build(Vec::new(), StartRoomPolicy::LastWins).unwrap_err();
        assert!(matches!(err, InitError::NoStartRoom));
    }

    #[test]
    fn multiple_start_rooms_follow_policy() {
        let schemas = vec![
            RoomSchema::new("A", "").starting(),
            RoomSchema::new("B", "").starting(),
        ];
        let err = RoomRegistry::build(schemas.clone(), StartRoomPolicy::Strict).unwrap_err();
        assert!(matches!(err, InitError::MultipleStartRooms(ref names) if names == &["A", "B"]));
        let registry = RoomRegistry::build(schemas, StartRoomPolicy::LastWins).unwrap();
        assert_eq!(registry.start_room(), "B");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = RoomRegistry::build(
            vec![
                RoomSchema::new("A", "").starting(),
                RoomSchema::new("A", "<p>again</p>"),
            ],
            StartRoomPolicy::Strict,
        )
        .unwrap_err();
        assert!(matches!(err, InitError::DuplicateRoom(ref name) if name == "A"));
    }

    #[test]
    fn demo_rooms_have_one_start() {
        let registry = RoomRegistry::build(demo_rooms(), StartRoomPolicy::Strict).unwrap();
        assert_eq!(registry.start_room(), "Room One");
        assert_eq!(registry.len(), 3);
    }
}
