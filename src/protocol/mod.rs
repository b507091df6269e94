//! # Action Protocol
//!
//! Messages crossing the trust boundary from sandboxed content to the host.
//!
//! Every message is a flat JSON record with an `action` discriminator plus the
//! fields that action needs:
//!
//! | action               | fields       |
//! |----------------------|--------------|
//! | `CHANGEROOM`         | `room`       |
//! | `SETINVENTORY`       | `key, value` |
//! | `DELETEINVENTORY`    | `key`        |
//! | `INCREMENTINVENTORY` | `key`        |
//! | `DECREMENTINVENTORY` | `key`        |
//! | `SETROOMSTATE`       | `key, value` |
//! | `DELETEROOMSTATE`    | `key`        |
//! | `INCREMENTROOMSTATE` | `key`        |
//! | `DECREMENTROOMSTATE` | `key`        |
//!
//! The protocol is strictly one-way. There is no reply, correlation id or
//! acknowledgment; the host answers only by recompiling the document.
//!
//! [`parse_message`] classifies an untrusted payload:
//! - no discriminator (or a falsy one) is a [`ProtocolError::MissingAction`];
//! - an unrecognized discriminator is returned as [`Inbound::Unrecognized`] so
//!   newer content keeps working against an older host;
//! - a recognized discriminator with missing or ill-typed fields is a
//!   [`ProtocolError::Malformed`].

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};

use crate::errors::ProtocolError;
use crate::state::{number_value, Mutation};

/// Which canonical map an action writes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// The global inventory shared by every room.
    Inventory,
    /// The active room's own state partition.
    RoomState,
}

/// A recognized inbound action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "UPPERCASE")]
pub enum Action {
    ChangeRoom {
        room: String,
    },
    SetInventory {
        #[serde(deserialize_with = "object_key")]
        key: String,
        value: Value,
    },
    DeleteInventory {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
    IncrementInventory {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
    DecrementInventory {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
    SetRoomState {
        #[serde(deserialize_with = "object_key")]
        key: String,
        value: Value,
    },
    DeleteRoomState {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
    IncrementRoomState {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
    DecrementRoomState {
        #[serde(deserialize_with = "object_key")]
        key: String,
    },
}

/// What an action does to canonical state.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<'a> {
    ChangeRoom(&'a str),
    Mutate {
        scope: Scope,
        key: &'a str,
        mutation: Mutation,
    },
}

/// Discriminators this host understands.
pub const KNOWN_ACTIONS: [&str; 9] = [
    "CHANGEROOM",
    "SETINVENTORY",
    "DELETEINVENTORY",
    "INCREMENTINVENTORY",
    "DECREMENTINVENTORY",
    "SETROOMSTATE",
    "DELETEROOMSTATE",
    "INCREMENTROOMSTATE",
    "DECREMENTROOMSTATE",
];

impl Action {
    /// Build the action that performs `mutation` on `key` within `scope`.
    pub fn mutate(scope: Scope, key: impl Into<String>, mutation: Mutation) -> Self {
        let key = key.into();
        match (scope, mutation) {
            (Scope::Inventory, Mutation::Set(value)) => Action::SetInventory { key, value },
            (Scope::Inventory, Mutation::Delete) => Action::DeleteInventory { key },
            (Scope::Inventory, Mutation::Increment) => Action::IncrementInventory { key },
            (Scope::Inventory, Mutation::Decrement) => Action::DecrementInventory { key },
            (Scope::RoomState, Mutation::Set(value)) => Action::SetRoomState { key, value },
            (Scope::RoomState, Mutation::Delete) => Action::DeleteRoomState { key },
            (Scope::RoomState, Mutation::Increment) => Action::IncrementRoomState { key },
            (Scope::RoomState, Mutation::Decrement) => Action::DecrementRoomState { key },
        }
    }

    /// The wire discriminator.
    pub fn name(&self) -> &'static str {
        match self {
            Action::ChangeRoom { .. } => "CHANGEROOM",
            Action::SetInventory { .. } => "SETINVENTORY",
            Action::DeleteInventory { .. } => "DELETEINVENTORY",
            Action::IncrementInventory { .. } => "INCREMENTINVENTORY",
            Action::DecrementInventory { .. } => "DECREMENTINVENTORY",
            Action::SetRoomState { .. } => "SETROOMSTATE",
            Action::DeleteRoomState { .. } => "DELETEROOMSTATE",
            Action::IncrementRoomState { .. } => "INCREMENTROOMSTATE",
            Action::DecrementRoomState { .. } => "DECREMENTROOMSTATE",
        }
    }

    pub fn effect(&self) -> Effect<'_> {
        use Action::*;
        let (scope, key, mutation) = match self {
            ChangeRoom { room } => return Effect::ChangeRoom(room),
            SetInventory { key, value } => (Scope::Inventory, key, Mutation::Set(value.clone())),
            DeleteInventory { key } => (Scope::Inventory, key, Mutation::Delete),
            IncrementInventory { key } => (Scope::Inventory, key, Mutation::Increment),
            DecrementInventory { key } => (Scope::Inventory, key, Mutation::Decrement),
            SetRoomState { key, value } => (Scope::RoomState, key, Mutation::Set(value.clone())),
            DeleteRoomState { key } => (Scope::RoomState, key, Mutation::Delete),
            IncrementRoomState { key } => (Scope::RoomState, key, Mutation::Increment),
            DecrementRoomState { key } => (Scope::RoomState, key, Mutation::Decrement),
        };
        Effect::Mutate {
            scope,
            key: key.as_str(),
            mutation,
        }
    }

    /// Render the action as the plain record posted across the boundary.
    pub fn to_message(&self) -> Value {
        let action = self.name();
        match self {
            Action::ChangeRoom { room } => json!({ "action": action, "room": room }),
            Action::SetInventory { key, value } | Action::SetRoomState { key, value } => {
                json!({ "action": action, "key": key, "value": value })
            }
            Action::DeleteInventory { key }
            | Action::IncrementInventory { key }
            | Action::DecrementInventory { key }
            | Action::DeleteRoomState { key }
            | Action::IncrementRoomState { key }
            | Action::DecrementRoomState { key } => json!({ "action": action, "key": key }),
        }
    }
}

/// A classified inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Action(Action),
    /// A discriminator this host does not know. Ignored without error.
    Unrecognized(String),
}

/// Classify a raw inbound payload.
pub fn parse_message(raw: &Value) -> Result<Inbound, ProtocolError> {
    let record = match raw {
        Value::Object(record) => record,
        Value::Null => return Err(ProtocolError::MissingAction),
        _ => return Err(ProtocolError::NotAnObject),
    };

    let name = match record.get("action") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => {
            return Err(ProtocolError::MissingAction)
        }
        Some(Value::String(s)) if s.is_empty() => return Err(ProtocolError::MissingAction),
        Some(Value::Number(n)) if n.as_f64() == Some(0.0) => {
            return Err(ProtocolError::MissingAction)
        }
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Ok(Inbound::Unrecognized(other.to_string())),
    };

    if !KNOWN_ACTIONS.contains(&name) {
        return Ok(Inbound::Unrecognized(name.to_string()));
    }

    Action::deserialize(raw)
        .map(Inbound::Action)
        .map_err(|e| ProtocolError::Malformed {
            action: name.to_string(),
            reason: e.to_string(),
        })
}

/// Content runtimes only have string object keys; numbers and booleans are
/// accepted in their string form. Integral floats drop the fraction (`1.0`
/// keys the same entry as `1`).
fn object_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(match n.as_f64() {
            Some(f) if n.is_f64() => number_value(f).to_string(),
            _ => n.to_string(),
        }),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Err(D::Error::custom("key must not be null")),
        Value::Array(_) => Err(D::Error::custom("key must be a string, got array")),
        Value::Object(_) => Err(D::Error::custom("key must be a string, got object")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_action() {
        for name in KNOWN_ACTIONS {
            let raw = json!({ "action": name, "room": "A", "key": "k", "value": 1 });
            let parsed = parse_message(&raw).unwrap();
            match parsed {
                Inbound::Action(action) => assert_eq!(action.name(), name),
                other => panic!("{name} parsed as {other:?}"),
            }
        }
    }

    #[test]
    fn missing_discriminator_is_an_error() {
        assert!(matches!(
            parse_message(&json!({})),
            Err(ProtocolError::MissingAction)
        ));
        assert!(matches!(
            parse_message(&json!({ "action": "" })),
            Err(ProtocolError::MissingAction)
        ));
        assert!(matches!(
            parse_message(&json!({ "action": null, "key": "k" })),
            Err(ProtocolError::MissingAction)
        ));
        assert!(matches!(
            parse_message(&json!("CHANGEROOM")),
            Err(ProtocolError::NotAnObject)
        ));
    }

    #[test]
    fn unknown_discriminator_is_ignored() {
        assert_eq!(
            parse_message(&json!({ "action": "FROBNICATE" })).unwrap(),
            Inbound::Unrecognized("FROBNICATE".into())
        );
        // discriminators are case sensitive
        assert_eq!(
            parse_message(&json!({ "action": "changeroom", "room": "A" })).unwrap(),
            Inbound::Unrecognized("changeroom".into())
        );
    }

    #[test]
    fn known_action_with_missing_fields_is_malformed() {
        let err = parse_message(&json!({ "action": "SETINVENTORY", "key": "k" })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { ref action, .. } if action == "SETINVENTORY"));
        let err = parse_message(&json!({ "action": "CHANGEROOM" })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
        let err = parse_message(&json!({ "action": "DELETEROOMSTATE", "key": [1] })).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed { .. }));
    }

    #[test]
    fn numeric_keys_become_strings() {
        let raw = json!({ "action": "SETROOMSTATE", "key": 0.25, "value": 0.5 });
        let parsed = parse_message(&raw).unwrap();
        assert_eq!(
            parsed,
            Inbound::Action(Action::SetRoomState {
                key: "0.25".into(),
                value: json!(0.5)
            })
        );
    }

    #[test]
    fn integral_float_keys_match_integer_keys() {
        for key in [json!(1.0), json!(1)] {
            let raw = json!({ "action": "SETINVENTORY", "key": key, "value": true });
            assert_eq!(
                parse_message(&raw).unwrap(),
                Inbound::Action(Action::SetInventory {
                    key: "1".into(),
                    value: json!(true)
                })
            );
        }
        let raw = json!({ "action": "DELETEINVENTORY", "key": -0.0 });
        assert_eq!(
            parse_message(&raw).unwrap(),
            Inbound::Action(Action::DeleteInventory { key: "0".into() })
        );
    }

    #[test]
    fn to_message_round_trips_through_parse() {
        let action = Action::mutate(Scope::RoomState, "door", Mutation::Decrement);
        assert_eq!(
            action.to_message(),
            json!({ "action": "DECREMENTROOMSTATE", "key": "door" })
        );
        assert_eq!(
            parse_message(&action.to_message()).unwrap(),
            Inbound::Action(action)
        );
    }

    #[test]
    fn effect_maps_scope_and_mutation() {
        let action = Action::SetInventory {
            key: "shinyKey".into(),
            value: json!(true),
        };
        assert_eq!(
            action.effect(),
            Effect::Mutate {
                scope: Scope::Inventory,
                key: "shinyKey",
                mutation: Mutation::Set(json!(true)),
            }
        );
        let action = Action::ChangeRoom { room: "B".into() };
        assert_eq!(action.effect(), Effect::ChangeRoom("B"));
    }
}
