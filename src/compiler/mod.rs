//! # Room Compiler
//!
//! Turns a room schema plus the current canonical state into one
//! self-contained document. The document starts with a bootstrap preamble:
//!
//! ```text
//! <script>
//! const parentURI = "<configured origin>";
//! let roomState = { ...active room state... };
//! let inventory = { ...global inventory... };
//! function toRoom(room) { ... }            // client API, see client_api.js
//! function setInventory(key, value) { ... }
//! ...
//! </script>
//! <room markup>
//! ```
//!
//! Content only ever reads state from these injected variables. They are a
//! local mirror: mutators update them immediately and post an action to the
//! host, and the whole document is rebuilt from canonical state after the host
//! applies it.
//!
//! Compilation is deterministic. Identical inputs give a byte-identical
//! document, which the [`CompiledRoom::fingerprint`] makes cheap to compare.

use sha2::{Digest, Sha256};

use crate::rooms::RoomSchema;
use crate::state::StateMap;

const CLIENT_API: &str = include_str!("client_api.js");

/// A compiled, renderable room document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRoom {
    room: String,
    inventory_snapshot: String,
    room_state_snapshot: String,
    document: String,
}

impl CompiledRoom {
    pub fn room(&self) -> &str {
        &self.room
    }

    /// The full document: preamble followed by the room's own content.
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Inventory as serialized into the preamble.
    pub fn inventory_snapshot(&self) -> &str {
        &self.inventory_snapshot
    }

    /// Room state as serialized into the preamble.
    pub fn room_state_snapshot(&self) -> &str {
        &self.room_state_snapshot
    }

    /// Hex SHA-256 of the document.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.document.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[derive(Debug, Clone)]
pub struct RoomCompiler {
    parent_origin: String,
}

impl RoomCompiler {
    /// `parent_origin` is the target origin content posts actions to.
    pub fn new(parent_origin: impl Into<String>) -> Self {
        Self {
            parent_origin: parent_origin.into(),
        }
    }

    pub fn parent_origin(&self) -> &str {
        &self.parent_origin
    }

    pub fn compile(
        &self,
        schema: &RoomSchema,
        inventory: &StateMap,
        room_state: &StateMap,
    ) -> CompiledRoom {
        let inventory_snapshot = inventory.to_snapshot();
        let room_state_snapshot = room_state.to_snapshot();
        let origin = serde_json::Value::String(self.parent_origin.clone()).to_string();

        let mut document = String::with_capacity(
            CLIENT_API.len() + schema.html.len() + inventory_snapshot.len() + 256,
        );
        document.push_str("<script>\n");
        document.push_str(&format!("const parentURI = {};\n", script_safe(&origin)));
        document.push_str(&format!(
            "let roomState = {};\n",
            script_safe(&room_state_snapshot)
        ));
        document.push_str(&format!(
            "let inventory = {};\n",
            script_safe(&inventory_snapshot)
        ));
        document.push_str(CLIENT_API);
        document.push_str("</script>\n");
        document.push_str(&schema.html);

        CompiledRoom {
            room: schema.name.clone(),
            inventory_snapshot,
            room_state_snapshot,
            document,
        }
    }
}

/// Make a JSON text safe to embed inside a `<script>` element.
///
/// `<`, `>` and `&` only occur inside JSON strings, where the `\uXXXX` forms
/// decode to the same characters. U+2028/U+2029 are line terminators in older
/// script engines.
fn script_safe(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for ch in json.chars() {
        match ch {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            '\u{2028}' => out.push_str("\\u2028"),
            '\u{2029}' => out.push_str("\\u2029"),
            c => out.push(c),
        }
    }
    out
}
