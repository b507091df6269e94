//! Start-room selection over generated room lists.

use roombox::errors::InitError;
use roombox::rooms::{RoomSchema, StartRoomPolicy};
use roombox::store::HostStateStore;

fn rooms(count: usize, starts: &[usize]) -> Vec<RoomSchema> {
    (0..count)
        .map(|i| {
            let schema = RoomSchema::new(&format!("room-{i}"), &format!("<p>{i}</p>"));
            if starts.contains(&i) {
                schema.starting()
            } else {
                schema
            }
        })
        .collect()
}

#[test]
fn exactly_one_start_room_always_initializes() {
    for count in 1..8 {
        for start in 0..count {
            let store = HostStateStore::initialize(rooms(count, &[start]))
                .unwrap_or_else(|e| panic!("{count} rooms, start {start}: {e}"));
            assert_eq!(store.current_room(), format!("room-{start}"));
            assert_eq!(store.registry().len(), count);
        }
    }
}

#[test]
fn zero_start_rooms_is_fatal() {
    for count in 0..8 {
        let err = HostStateStore::initialize(rooms(count, &[])).err();
        assert!(matches!(err, Some(InitError::NoStartRoom)), "{count} rooms");
    }
}

#[test]
fn several_start_rooms_depend_on_policy() {
    let err = HostStateStore::initialize(rooms(4, &[1, 3])).err();
    assert!(matches!(err, Some(InitError::MultipleStartRooms(_))));

    let store =
        HostStateStore::initialize_with(rooms(4, &[1, 3]), StartRoomPolicy::LastWins).unwrap();
    assert_eq!(store.current_room(), "room-3");
}

#[test]
fn fatal_error_message_matches_alert_text() {
    let err = HostStateStore::initialize(rooms(2, &[])).err().unwrap();
    assert_eq!(err.to_string(), "no starting room found");
}
