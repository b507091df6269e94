//! Recompiling with unchanged inputs yields the same document.

mod common;

use common::{frame, start, two_rooms};
use roombox::compiler::RoomCompiler;
use roombox::rooms::demo_rooms;
use roombox::state::StateMap;
use serde_json::json;

#[test]
fn identical_inputs_give_identical_documents() {
    let compiler = RoomCompiler::new("http://localhost:3000");
    let mut inventory = StateMap::new();
    for (i, key) in ["wand", "apple", "zither", "map"].iter().enumerate() {
        inventory.set(key, json!(i));
    }
    let mut room_state = StateMap::new();
    room_state.set("lit", json!(true));

    for schema in demo_rooms() {
        let first = compiler.compile(&schema, &inventory, &room_state);
        let again = compiler.compile(&schema, &inventory, &room_state);
        assert_eq!(first.document().as_bytes(), again.document().as_bytes());
        assert!(first.document().ends_with(&schema.html));
    }
}

#[test]
fn insertion_order_does_not_matter() {
    let compiler = RoomCompiler::new("*");
    let schema = &demo_rooms()[0];
    let mut forward = StateMap::new();
    forward.set("a", json!(1));
    forward.set("b", json!(2));
    let mut backward = StateMap::new();
    backward.set("b", json!(2));
    backward.set("a", json!(1));
    assert_eq!(
        compiler.compile(schema, &forward, &StateMap::new()).fingerprint(),
        compiler.compile(schema, &backward, &StateMap::new()).fingerprint()
    );
}

#[test]
fn remount_after_round_trip_reproduces_the_document() {
    let mut c = start(two_rooms());
    let original = c.mounted().unwrap().document().to_string();
    frame(&mut c).to_room("B");
    frame(&mut c).to_room("A");
    c.pump().unwrap();
    assert_eq!(c.mount_id(), Some(3));
    assert_eq!(c.mounted().unwrap().document(), original);
}
