use super::*;
use crate::geometry::{Color, Tool};
use uuid::Uuid;

fn conn() -> ConnectionId {
    Uuid::new_v4()
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y).expect("finite coordinates")
}

fn brush() -> StrokeStyle {
    StrokeStyle::new(Tool::Brush, "#2563eb".parse().expect("color"), 6.0)
}

fn ledger_with(max_strokes: usize, max_points: usize) -> Ledger {
    Ledger::new(LedgerConfig { max_strokes, max_points_per_stroke: max_points })
}

/// Draw and complete a two-segment stroke, returning its id.
fn draw_stroke(ledger: &mut Ledger, conn: ConnectionId, offset: f64) -> StrokeId {
    let start = ledger.start_stroke(conn, brush(), pt(offset, 0.1)).expect("start");
    let id = start.stroke_id;
    ledger.add_point(conn, &id, pt(offset, 0.2)).expect("point");
    ledger.add_point(conn, &id, pt(offset, 0.3)).expect("point");
    let end = ledger.end_stroke(conn, &id).expect("end");
    assert!(end.committed.is_some(), "stroke should commit");
    id
}

fn log_has_stroke(ledger: &Ledger, id: &StrokeId) -> bool {
    ledger.log().iter().any(|op| op.stroke_id() == id)
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[test]
fn start_assigns_unique_ids_per_ledger() {
    let mut ledger = Ledger::default();
    let a = conn();
    let b = conn();
    let first = ledger.start_stroke(a, brush(), pt(0.1, 0.1)).expect("start a");
    let second = ledger.start_stroke(b, brush(), pt(0.2, 0.2)).expect("start b");
    assert_ne!(first.stroke_id, second.stroke_id);
    assert_eq!(first.version, 1);
    assert_eq!(second.version, 2);
}

#[test]
fn start_rejects_concurrent_stroke_on_same_connection() {
    let mut ledger = Ledger::default();
    let c = conn();
    ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start");
    let err = ledger.start_stroke(c, brush(), pt(0.2, 0.2)).unwrap_err();
    assert_eq!(err, LedgerError::AlreadyDrawing);
}

#[test]
fn start_normalizes_style() {
    let mut ledger = Ledger::default();
    let c = conn();
    let style = StrokeStyle {
        tool: Tool::Eraser,
        color: "#ff0000".parse().expect("color"),
        width: 9999.0,
    };
    let outcome = ledger.start_stroke(c, style, pt(0.5, 0.5)).expect("start");
    let Operation::Start { stroke, .. } = &outcome.op else {
        panic!("start outcome should carry a start operation");
    };
    assert_eq!(stroke.style.color, Color::ERASER);
    assert!((stroke.style.width - 60.0).abs() < f64::EPSILON);
}

#[test]
fn duplicate_point_is_absorbed_without_log_entry() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start").stroke_id;
    let first = ledger.add_point(c, &id, pt(0.2, 0.2)).expect("point");
    assert!(first.applied.is_some());

    let version_before = ledger.version();
    let dup = ledger.add_point(c, &id, pt(0.2, 0.2)).expect("duplicate accepted");
    assert!(dup.applied.is_none());
    assert!(dup.op.is_none());
    assert_eq!(dup.version, version_before, "duplicate must not bump the version");

    ledger.end_stroke(c, &id).expect("end");
    // start + one point + end: the duplicate left no trace.
    assert_eq!(ledger.snapshot().ops.len(), 3);
}

#[test]
fn point_rejects_wrong_connection_and_wrong_id() {
    let mut ledger = Ledger::default();
    let a = conn();
    let b = conn();
    let id_a = ledger.start_stroke(a, brush(), pt(0.1, 0.1)).expect("start a").stroke_id;
    let id_b = ledger.start_stroke(b, brush(), pt(0.2, 0.2)).expect("start b").stroke_id;

    assert_eq!(
        ledger.add_point(conn(), &id_a, pt(0.3, 0.3)).unwrap_err(),
        LedgerError::NoStrokeInProgress
    );
    assert_eq!(
        ledger.add_point(a, &id_b, pt(0.3, 0.3)).unwrap_err(),
        LedgerError::StrokeIdMismatch
    );
}

#[test]
fn point_ceiling_is_enforced() {
    let mut ledger = ledger_with(1000, 3);
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.0, 0.0)).expect("start").stroke_id;
    ledger.add_point(c, &id, pt(0.1, 0.1)).expect("point 2");
    ledger.add_point(c, &id, pt(0.2, 0.2)).expect("point 3");
    let err = ledger.add_point(c, &id, pt(0.3, 0.3)).unwrap_err();
    assert_eq!(err, LedgerError::TooManyPoints);
}

#[test]
fn single_point_stroke_is_discarded_entirely() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.5, 0.5)).expect("start").stroke_id;
    let end = ledger.end_stroke(c, &id).expect("end");

    assert!(end.committed.is_none());
    assert!(!log_has_stroke(&ledger, &id), "discarded stroke must leave no operations");
    assert!(ledger.snapshot().ops.is_empty());
    assert!(ledger.visible_stroke_ids().is_empty());
    assert_eq!(end.version, 2, "the discard still bumps the version");
}

#[test]
fn end_requires_matching_open_stroke() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = draw_stroke(&mut ledger, c, 0.1);
    assert_eq!(ledger.end_stroke(c, &id).unwrap_err(), LedgerError::NoStrokeInProgress);
}

// =============================================================================
// DISCONNECT
// =============================================================================

#[test]
fn disconnect_commits_open_stroke() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start").stroke_id;
    ledger.add_point(c, &id, pt(0.2, 0.2)).expect("point");

    let committed = ledger.connection_lost(c).expect("stroke should commit");
    assert_eq!(committed.id, id);
    assert!(committed.ended_at.is_some());
    assert_eq!(ledger.visible_stroke_ids(), [id.clone()]);

    let ops = ledger.snapshot().ops;
    assert!(matches!(ops.last(), Some(Operation::End { stroke_id }) if *stroke_id == id));
}

#[test]
fn disconnect_discards_short_stroke() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start").stroke_id;

    assert!(ledger.connection_lost(c).is_none());
    assert!(!log_has_stroke(&ledger, &id));
    assert!(ledger.snapshot().ops.is_empty());
}

#[test]
fn disconnect_without_open_stroke_is_a_no_op() {
    let mut ledger = Ledger::default();
    let version = ledger.version();
    assert!(ledger.connection_lost(conn()).is_none());
    assert_eq!(ledger.version(), version);
}

// =============================================================================
// UNDO / REDO
// =============================================================================

#[test]
fn undo_then_redo_restores_the_stroke() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = draw_stroke(&mut ledger, c, 0.1);
    let before = ledger.snapshot().ops;

    ledger.undo().expect("undo");
    assert!(ledger.snapshot().ops.is_empty());
    assert!(log_has_stroke(&ledger, &id), "undone ops stay in the log for redo");

    ledger.redo().expect("redo");
    assert_eq!(ledger.snapshot().ops, before);
}

#[test]
fn undo_rejects_empty_history() {
    let mut ledger = Ledger::default();
    assert_eq!(ledger.undo().unwrap_err(), LedgerError::NothingToUndo);
}

#[test]
fn redo_rejects_empty_stack() {
    let mut ledger = Ledger::default();
    assert_eq!(ledger.redo().unwrap_err(), LedgerError::NothingToRedo);
}

#[test]
fn new_stroke_clears_redo_and_purges_its_operations() {
    let mut ledger = Ledger::default();
    let c = conn();
    draw_stroke(&mut ledger, c, 0.1);
    let undone = draw_stroke(&mut ledger, c, 0.2);
    ledger.undo().expect("undo");

    ledger.start_stroke(c, brush(), pt(0.5, 0.5)).expect("start");
    assert!(!log_has_stroke(&ledger, &undone), "redo ops must be purged on new stroke");

    let id = ledger.open_stroke(c).expect("open stroke").id.clone();
    ledger.add_point(c, &id, pt(0.6, 0.6)).expect("point");
    assert_eq!(ledger.redo().unwrap_err(), LedgerError::NothingToRedo);
}

#[test]
fn undo_force_ends_open_strokes_first() {
    let mut ledger = Ledger::default();
    let a = conn();
    let b = conn();
    let committed = draw_stroke(&mut ledger, a, 0.1);
    let open = ledger.start_stroke(b, brush(), pt(0.5, 0.5)).expect("start").stroke_id;
    ledger.add_point(b, &open, pt(0.6, 0.6)).expect("point");

    // The open stroke commits last, so it is what the undo removes.
    ledger.undo().expect("undo");
    assert_eq!(ledger.visible_stroke_ids(), [committed.clone()]);
    assert!(ledger.open_stroke(b).is_none());

    ledger.redo().expect("redo");
    assert_eq!(ledger.visible_stroke_ids().last(), Some(&open));
}

#[test]
fn undo_force_end_discards_short_open_strokes() {
    let mut ledger = Ledger::default();
    let a = conn();
    let b = conn();
    draw_stroke(&mut ledger, a, 0.1);
    let short = ledger.start_stroke(b, brush(), pt(0.5, 0.5)).expect("start").stroke_id;

    ledger.undo().expect("undo");
    assert!(!log_has_stroke(&ledger, &short));
    assert!(ledger.snapshot().ops.is_empty());
}

// =============================================================================
// CAPACITY
// =============================================================================

#[test]
fn eviction_keeps_most_recent_strokes() {
    let mut ledger = ledger_with(2, 100);
    let c = conn();
    let first = draw_stroke(&mut ledger, c, 0.1);
    let second = draw_stroke(&mut ledger, c, 0.2);
    let third = draw_stroke(&mut ledger, c, 0.3);

    assert_eq!(ledger.visible_stroke_ids(), [second.clone(), third.clone()]);
    assert!(!log_has_stroke(&ledger, &first), "evicted stroke must leave no operations");
    assert!(log_has_stroke(&ledger, &second));
    assert!(log_has_stroke(&ledger, &third));
}

#[test]
fn evicted_stroke_cannot_be_restored() {
    let mut ledger = ledger_with(1, 100);
    let c = conn();
    draw_stroke(&mut ledger, c, 0.1);
    ledger.undo().expect("undo");
    // The undone stroke sits in redo; filling the canvas to capacity starts
    // new strokes, which clears redo before any eviction can race it.
    draw_stroke(&mut ledger, c, 0.2);
    assert_eq!(ledger.redo().unwrap_err(), LedgerError::NothingToRedo);
}

// =============================================================================
// SNAPSHOT / VERSION
// =============================================================================

#[test]
fn snapshot_includes_in_progress_strokes() {
    let mut ledger = Ledger::default();
    let c = conn();
    let id = ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start").stroke_id;
    ledger.add_point(c, &id, pt(0.2, 0.2)).expect("point");

    let snapshot = ledger.snapshot();
    assert_eq!(snapshot.ops.len(), 2);
    assert!(matches!(&snapshot.ops[0], Operation::Start { stroke, .. } if stroke.id == id));
}

#[test]
fn snapshot_preserves_log_order_across_strokes() {
    let mut ledger = Ledger::default();
    let a = conn();
    let b = conn();
    let id_a = ledger.start_stroke(a, brush(), pt(0.1, 0.1)).expect("start a").stroke_id;
    let id_b = ledger.start_stroke(b, brush(), pt(0.5, 0.5)).expect("start b").stroke_id;
    ledger.add_point(a, &id_a, pt(0.2, 0.2)).expect("point a");
    ledger.add_point(b, &id_b, pt(0.6, 0.6)).expect("point b");
    ledger.end_stroke(a, &id_a).expect("end a");

    let snapshot = ledger.snapshot();
    let interleaved: Vec<&StrokeId> = snapshot.ops.iter().map(Operation::stroke_id).collect();
    assert_eq!(interleaved, [&id_a, &id_b, &id_a, &id_b, &id_a]);
}

#[test]
fn version_is_monotonic_across_mutations() {
    let mut ledger = Ledger::default();
    let c = conn();
    let mut last = ledger.version();
    let id = ledger.start_stroke(c, brush(), pt(0.1, 0.1)).expect("start").stroke_id;
    for step in [
        ledger.add_point(c, &id, pt(0.2, 0.2)).expect("point").version,
        ledger.end_stroke(c, &id).expect("end").version,
        ledger.undo().expect("undo"),
        ledger.redo().expect("redo"),
    ] {
        assert!(step > last, "version must strictly increase");
        last = step;
    }
    assert_eq!(ledger.snapshot().version, last);
}
