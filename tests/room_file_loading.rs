//! The shipped demo room file matches the built-in demo set.

use roombox::rooms::demo_rooms;
use roombox::rooms::loader::load_rooms_from_json;
use roombox::store::HostStateStore;
use std::path::Path;

#[test]
fn shipped_rooms_file_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data").join("rooms.json");
    let rooms = load_rooms_from_json(&path).expect("load data/rooms.json");
    assert_eq!(rooms, demo_rooms());
    let store = HostStateStore::initialize(rooms).unwrap();
    assert_eq!(store.current_room(), "Room One");
}
