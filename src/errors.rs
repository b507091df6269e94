use thiserror::Error;

/// Fatal errors raised while building the room registry at startup.
///
/// None of these leave a partially initialized store behind: when
/// initialization fails no room is ever rendered.
#[derive(Debug, Error)]
pub enum InitError {
    /// No schema carries `startHere: true`.
    #[error("no starting room found")]
    NoStartRoom,

    /// More than one schema carries `startHere: true` under the strict policy.
    #[error("more than one starting room found: {}", .0.join(", "))]
    MultipleStartRooms(Vec<String>),

    /// Two schemas share the same name.
    #[error("duplicate room name: {0}")]
    DuplicateRoom(String),

    /// Wrapper around IO errors while reading a room file.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The room file is not a JSON list of room schemas.
    #[error("failed to parse room schemas: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised at the trust boundary for an inbound message.
///
/// A protocol error never mutates canonical state.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The message carries no `action` discriminator.
    #[error("got data without any action set")]
    MissingAction,

    /// The message is not a record at all.
    #[error("message is not an object")]
    NotAnObject,

    /// A recognized action with missing or ill-typed fields.
    #[error("malformed {action} message: {reason}")]
    Malformed { action: String, reason: String },

    /// `CHANGEROOM` names a room that is not registered.
    #[error("unknown room: {0}")]
    UnknownRoom(String),
}

/// Errors raised by a frame host while mounting a compiled document.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The serialized snapshot embedded in the document could not be read back.
    #[error("snapshot error: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// The current room id does not resolve to a registered schema.
    #[error("room not registered: {0}")]
    MissingRoom(String),

    /// The frame host could not publish the document.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
