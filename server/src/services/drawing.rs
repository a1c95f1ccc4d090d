//! Drawing service — every ledger mutation behind one write guard.
//!
//! DESIGN
//! ======
//! Handlers stay pure and call into this module; each function takes the room
//! map's write lock, mutates the ledger, and (where callers need to
//! re-broadcast full state) produces the post-mutation snapshot inside the
//! same guard so the snapshot and the version it reports can never diverge.

use ink::{
    ConnectionId, EndOutcome, GeometryError, LedgerError, Point, PointOutcome, Snapshot,
    StartOutcome, Stroke, StrokeId, StrokeStyle,
};
use tracing::info;

use crate::frame::ErrorCode;
use crate::state::AppState;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DrawingError {
    #[error("room not loaded: {0}")]
    RoomNotLoaded(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl DrawingError {
    /// Wrap an input validation failure.
    #[must_use]
    pub fn invalid(err: GeometryError) -> Self {
        Self::Ledger(LedgerError::Invalid(err))
    }
}

impl ErrorCode for DrawingError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotLoaded(_) => "E_ROOM_NOT_LOADED",
            Self::Ledger(err) => match err {
                LedgerError::Invalid(GeometryError::UnknownTool(_)) => "E_INVALID_TOOL",
                LedgerError::Invalid(GeometryError::InvalidColor(_)) => "E_INVALID_COLOR",
                LedgerError::Invalid(GeometryError::NonFinitePoint) => "E_INVALID_POINT",
                LedgerError::AlreadyDrawing => "E_STROKE_IN_PROGRESS",
                LedgerError::NoStrokeInProgress => "E_NO_STROKE",
                LedgerError::StrokeIdMismatch => "E_STROKE_MISMATCH",
                LedgerError::TooManyPoints => "E_STROKE_FULL",
                LedgerError::NothingToUndo => "E_NOTHING_TO_UNDO",
                LedgerError::NothingToRedo => "E_NOTHING_TO_REDO",
            },
        }
    }
}

// =============================================================================
// STROKE LIFECYCLE
// =============================================================================

/// Begin a stroke for a connection.
///
/// # Errors
///
/// Returns an error if the room is not loaded or the ledger rejects the
/// start.
pub async fn start_stroke(
    state: &AppState,
    room_id: &str,
    conn: ConnectionId,
    style: StrokeStyle,
    point: Point,
) -> Result<StartOutcome, DrawingError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| DrawingError::RoomNotLoaded(room_id.to_owned()))?;
    Ok(room.ledger.start_stroke(conn, style, point)?)
}

/// Append a point to the connection's in-progress stroke.
///
/// # Errors
///
/// Returns an error if the room is not loaded or the ledger rejects the
/// point.
pub async fn add_point(
    state: &AppState,
    room_id: &str,
    conn: ConnectionId,
    stroke_id: &StrokeId,
    point: Point,
) -> Result<PointOutcome, DrawingError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| DrawingError::RoomNotLoaded(room_id.to_owned()))?;
    Ok(room.ledger.add_point(conn, stroke_id, point)?)
}

/// Complete the connection's in-progress stroke.
///
/// # Errors
///
/// Returns an error if the room is not loaded or the ledger rejects the end.
pub async fn end_stroke(
    state: &AppState,
    room_id: &str,
    conn: ConnectionId,
    stroke_id: &StrokeId,
) -> Result<EndOutcome, DrawingError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| DrawingError::RoomNotLoaded(room_id.to_owned()))?;
    Ok(room.ledger.end_stroke(conn, stroke_id)?)
}

/// Force-complete a disconnecting client's open stroke. Returns the
/// post-commit snapshot when a stroke was committed, so the caller can
/// re-broadcast full state.
pub async fn connection_lost(
    state: &AppState,
    room_id: &str,
    conn: ConnectionId,
) -> Option<(Stroke, Snapshot)> {
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(room_id)?;
    let committed = room.ledger.connection_lost(conn)?;
    info!(room_id, %conn, stroke_id = %committed.id, "force-completed stroke on disconnect");
    let snapshot = room.ledger.snapshot();
    Some((committed, snapshot))
}

// =============================================================================
// HISTORY
// =============================================================================

/// Undo the most recent visible stroke. Returns the new version and the
/// post-undo snapshot, captured under the same guard.
///
/// # Errors
///
/// Returns an error if the room is not loaded or there is nothing to undo.
pub async fn undo(state: &AppState, room_id: &str) -> Result<(u64, Snapshot), DrawingError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| DrawingError::RoomNotLoaded(room_id.to_owned()))?;
    let version = room.ledger.undo()?;
    Ok((version, room.ledger.snapshot()))
}

/// Restore the most recently undone stroke. Returns the new version and the
/// post-redo snapshot.
///
/// # Errors
///
/// Returns an error if the room is not loaded or there is nothing to redo.
pub async fn redo(state: &AppState, room_id: &str) -> Result<(u64, Snapshot), DrawingError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| DrawingError::RoomNotLoaded(room_id.to_owned()))?;
    let version = room.ledger.redo()?;
    Ok((version, room.ledger.snapshot()))
}

// =============================================================================
// SNAPSHOT
// =============================================================================

/// The room's current snapshot, or an empty one if the room does not exist
/// yet.
pub async fn snapshot(state: &AppState, room_id: &str) -> Snapshot {
    let rooms = state.rooms.read().await;
    rooms
        .get(room_id)
        .map(|room| room.ledger.snapshot())
        .unwrap_or_default()
}

#[cfg(test)]
#[path = "drawing_test.rs"]
mod tests;
