//! Room schema loading from JSON files.
//!
//! The file holds an ordered list of schemas, e.g.
//!
//! ```json
//! [
//!   { "name": "Room One", "html": "<div>...</div>", "startHere": true },
//!   { "name": "Room Two", "html": "<div>...</div>" }
//! ]
//! ```

use std::fs;
use std::path::Path;

use crate::errors::InitError;
use crate::rooms::RoomSchema;

/// Load room schemas from a JSON file, preserving file order.
pub fn load_rooms_from_json<P: AsRef<Path>>(path: P) -> Result<Vec<RoomSchema>, InitError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        InitError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read {}: {}", path.display(), e),
        ))
    })?;
    parse_rooms(&contents)
}

pub fn parse_rooms(contents: &str) -> Result<Vec<RoomSchema>, InitError> {
    Ok(serde_json::from_str(contents)?)
}

/// Write schemas to a JSON file in the format [`load_rooms_from_json`] reads.
pub fn save_rooms_to_json<P: AsRef<Path>>(path: P, rooms: &[RoomSchema]) -> Result<(), InitError> {
    let contents = serde_json::to_string_pretty(rooms)?;
    fs::write(path, contents)?;
    Ok(())
}
