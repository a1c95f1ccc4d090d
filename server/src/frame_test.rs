use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("stroke:start", Data::new());
    assert_eq!(frame.syscall, "stroke:start");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.room_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let req = Frame::request("stroke:point", Data::new()).with_room_id("main");
    let done = req.done_with(Data::new());

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.room_id.as_deref(), Some("main"));
    assert_eq!(done.syscall, "stroke:point");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn done_and_error_are_terminal() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("history:undo", Data::new());
    assert_eq!(frame.prefix(), "history");
    assert_eq!(frame.op(), "undo");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_round_trip() {
    let original = Frame::request("room:join", Data::new())
        .with_room_id("main")
        .with_from("test-user")
        .with_data("key", "value");

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.room_id.as_deref(), Some("main"));
    assert_eq!(restored.syscall, "room:join");
    assert_eq!(restored.from.as_deref(), Some("test-user"));
    assert_eq!(restored.data.get("key").and_then(|v| v.as_str()), Some("value"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("nothing to undo")]
    struct NothingToUndo;

    impl ErrorCode for NothingToUndo {
        fn error_code(&self) -> &'static str {
            "E_NOTHING_TO_UNDO"
        }
    }

    let req = Frame::request("history:undo", Data::new());
    let err = req.error_from(&NothingToUndo);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.data.get("code").and_then(|v| v.as_str()), Some("E_NOTHING_TO_UNDO"));
    assert_eq!(err.data.get("message").and_then(|v| v.as_str()), Some("nothing to undo"));
    assert_eq!(
        err.data.get("retryable").and_then(serde_json::Value::as_bool),
        Some(false)
    );
}
