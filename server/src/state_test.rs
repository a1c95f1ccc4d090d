use super::*;

#[test]
fn room_state_new_is_empty() {
    let room = RoomState::new(LedgerConfig::default());
    assert!(room.clients.is_empty());
    assert!(room.users.is_empty());
    assert!(room.cursors.is_empty());
    assert_eq!(room.ledger.version(), 0);
    assert!(room.ledger.snapshot().ops.is_empty());
}

#[test]
fn room_state_honors_ledger_limits() {
    let limits = LedgerConfig { max_strokes: 5, max_points_per_stroke: 50 };
    let state = AppState::new(limits);
    assert_eq!(state.limits.max_strokes, 5);
    assert_eq!(state.limits.max_points_per_stroke, 50);
}

#[test]
fn cursor_serde_round_trip() {
    let cursor = Cursor { x: 0.25, y: 0.75, drawing: true };
    let json = serde_json::to_string(&cursor).expect("serialize");
    let restored: Cursor = serde_json::from_str(&json).expect("deserialize");
    assert!((restored.x - 0.25).abs() < f64::EPSILON);
    assert!((restored.y - 0.75).abs() < f64::EPSILON);
    assert!(restored.drawing);
}

#[tokio::test]
async fn seed_main_room_makes_room_available() {
    let state = test_helpers::test_app_state();
    test_helpers::seed_main_room(&state).await;
    let rooms = state.rooms.read().await;
    assert!(rooms.contains_key(MAIN_ROOM));
}
