//! Shared fixtures for the integration tests.
#![allow(dead_code)] // each test crate uses a different subset

use roombox::compiler::RoomCompiler;
use roombox::controller::{RecordedAlerts, TransitionController};
use roombox::rooms::RoomSchema;
use roombox::sandbox::{Frame, NativeFrames};
use roombox::store::HostStateStore;

pub type Controller = TransitionController<NativeFrames, RecordedAlerts>;

/// Two rooms, "A" (start) and "B".
pub fn two_rooms() -> Vec<RoomSchema> {
    vec![
        RoomSchema::new("A", "<p>room a</p>").starting(),
        RoomSchema::new("B", "<p>room b</p>"),
    ]
}

/// A controller over in-process frames with alerts captured in memory.
pub fn start(schemas: Vec<RoomSchema>) -> Controller {
    let store = HostStateStore::initialize(schemas).expect("initialize");
    TransitionController::start(
        store,
        RoomCompiler::new("http://localhost:3000"),
        NativeFrames::new(),
        RecordedAlerts::default(),
    )
    .expect("start")
}

/// The frame currently mounted.
pub fn frame(controller: &mut Controller) -> &mut Frame {
    controller
        .host_mut()
        .frame_mut()
        .expect("a frame is always mounted")
}
