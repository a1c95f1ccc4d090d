//! The stroke ledger — the single authority for shared canvas state.
//!
//! DESIGN
//! ======
//! The ledger owns four pieces of state: the append-only operation log, the
//! per-connection in-progress map, the visible-history stack, and the redo
//! stack. All mutation goes through `&mut self`; callers provide the
//! serialization boundary (the server holds the ledger behind a write lock,
//! so operations apply atomically in lock-acquisition order). Every mutating
//! event bumps a monotonic version counter that travels with each broadcast
//! operation and snapshot.
//!
//! INVARIANTS
//! ==========
//! - Operations for one stroke appear in log order `start, point*, end`.
//! - The visible stack and the redo stack are disjoint.
//! - Starting or completing a stroke clears the redo stack and purges the
//!   cleared strokes' operations from the log.
//! - A stroke completing with fewer than two points is discarded entirely,
//!   operations included.
//! - Eviction removes a stroke from the log, the visible stack, and the redo
//!   stack, so redo can never reference operations the log no longer holds.

use std::collections::{HashMap, HashSet};

use crate::geometry::{GeometryError, Point};
use crate::stroke::{ConnectionId, Operation, Snapshot, Stroke, StrokeId, StrokeStyle, now_ms};

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error(transparent)]
    Invalid(#[from] GeometryError),
    #[error("a stroke is already in progress on this connection")]
    AlreadyDrawing,
    #[error("no stroke in progress on this connection")]
    NoStrokeInProgress,
    #[error("stroke id does not match the stroke in progress")]
    StrokeIdMismatch,
    #[error("stroke has reached the point limit")]
    TooManyPoints,
    #[error("nothing to undo")]
    NothingToUndo,
    #[error("nothing to redo")]
    NothingToRedo,
}

/// Capacity limits for one ledger.
#[derive(Debug, Clone, Copy)]
pub struct LedgerConfig {
    /// Ceiling on completed visible strokes before the oldest are evicted.
    pub max_strokes: usize,
    /// Ceiling on points recorded for a single stroke.
    pub max_points_per_stroke: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self { max_strokes: 1000, max_points_per_stroke: 10_000 }
    }
}

/// Result of an accepted [`Ledger::start_stroke`].
#[derive(Debug, Clone, PartialEq)]
pub struct StartOutcome {
    pub stroke_id: StrokeId,
    pub op: Operation,
    pub version: u64,
}

/// Result of an accepted [`Ledger::add_point`].
///
/// `applied` is `None` when the point duplicated the previous one: the
/// request is acknowledged but nothing was logged, so there is nothing for
/// observers to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct PointOutcome {
    pub applied: Option<Point>,
    pub op: Option<Operation>,
    pub version: u64,
}

/// Result of an accepted [`Ledger::end_stroke`].
///
/// `committed` is `None` when the stroke had fewer than two points and was
/// discarded entirely.
#[derive(Debug, Clone, PartialEq)]
pub struct EndOutcome {
    pub committed: Option<Stroke>,
    pub version: u64,
}

// =============================================================================
// LEDGER
// =============================================================================

#[derive(Debug)]
pub struct Ledger {
    config: LedgerConfig,
    /// Append-only operation log. Entries are removed only by purging whole
    /// strokes (discard, redo-clear, eviction), never reordered.
    ops: Vec<Operation>,
    in_progress: HashMap<ConnectionId, Stroke>,
    /// Completed strokes in completion order, oldest first.
    visible: Vec<StrokeId>,
    /// Undone strokes, most recently undone last.
    redo: Vec<StrokeId>,
    version: u64,
    next_seq: u64,
}

impl Ledger {
    #[must_use]
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            config,
            ops: Vec::new(),
            in_progress: HashMap::new(),
            visible: Vec::new(),
            redo: Vec::new(),
            version: 0,
            next_seq: 0,
        }
    }

    /// Current document version. Bumps on every mutating event.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// The full operation log, orphans excluded only by purging.
    #[must_use]
    pub fn log(&self) -> &[Operation] {
        &self.ops
    }

    /// Completed visible strokes, oldest first.
    #[must_use]
    pub fn visible_stroke_ids(&self) -> &[StrokeId] {
        &self.visible
    }

    /// The stroke currently in progress on a connection, if any.
    #[must_use]
    pub fn open_stroke(&self, conn: ConnectionId) -> Option<&Stroke> {
        self.in_progress.get(&conn)
    }

    // =========================================================================
    // STROKE LIFECYCLE
    // =========================================================================

    /// Begin a stroke for a connection.
    ///
    /// Clears the redo stack (and purges its operations) before assigning the
    /// id, so a new stroke always invalidates pending redo history.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::AlreadyDrawing`] if the connection already has
    /// a stroke in progress.
    pub fn start_stroke(
        &mut self,
        conn: ConnectionId,
        style: StrokeStyle,
        point: Point,
    ) -> Result<StartOutcome, LedgerError> {
        if self.in_progress.contains_key(&conn) {
            return Err(LedgerError::AlreadyDrawing);
        }
        self.clear_redo();

        // Re-normalize in case the caller built the style literally.
        let style = StrokeStyle::new(style.tool, style.color, style.width);

        self.next_seq += 1;
        let id = StrokeId::new(conn, self.next_seq);
        let stroke = Stroke::begin(id.clone(), conn, style, point, now_ms());
        let op = Operation::Start { stroke: stroke.header(), point };
        self.ops.push(op.clone());
        self.in_progress.insert(conn, stroke);

        Ok(StartOutcome { stroke_id: id, op, version: self.bump() })
    }

    /// Append a point to the connection's in-progress stroke.
    ///
    /// A point identical to the previous one is accepted but absorbed: no log
    /// entry, no version bump, `applied` is `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if no stroke is in progress, the id does not match,
    /// or the stroke is at its point limit.
    pub fn add_point(
        &mut self,
        conn: ConnectionId,
        stroke_id: &StrokeId,
        point: Point,
    ) -> Result<PointOutcome, LedgerError> {
        let max_points = self.config.max_points_per_stroke;
        let stroke = self.in_progress.get_mut(&conn).ok_or(LedgerError::NoStrokeInProgress)?;
        if stroke.id != *stroke_id {
            return Err(LedgerError::StrokeIdMismatch);
        }
        if stroke.points.len() >= max_points {
            return Err(LedgerError::TooManyPoints);
        }
        if stroke.points.last() == Some(&point) {
            return Ok(PointOutcome { applied: None, op: None, version: self.version });
        }

        stroke.points.push(point);
        let op = Operation::Point { stroke_id: stroke.id.clone(), point };
        self.ops.push(op.clone());
        Ok(PointOutcome { applied: Some(point), op: Some(op), version: self.bump() })
    }

    /// Complete the connection's in-progress stroke.
    ///
    /// A stroke with fewer than two points is discarded entirely: its
    /// operations are purged and it never becomes visible.
    ///
    /// # Errors
    ///
    /// Returns an error if no stroke is in progress or the id does not match.
    pub fn end_stroke(
        &mut self,
        conn: ConnectionId,
        stroke_id: &StrokeId,
    ) -> Result<EndOutcome, LedgerError> {
        {
            let stroke = self.in_progress.get(&conn).ok_or(LedgerError::NoStrokeInProgress)?;
            if stroke.id != *stroke_id {
                return Err(LedgerError::StrokeIdMismatch);
            }
        }
        let stroke = self.in_progress.remove(&conn).ok_or(LedgerError::NoStrokeInProgress)?;

        if stroke.points.len() < 2 {
            self.purge_stroke(&stroke.id);
            return Ok(EndOutcome { committed: None, version: self.bump() });
        }

        let stroke = self.commit(stroke);
        self.clear_redo();
        self.enforce_capacity();
        Ok(EndOutcome { committed: Some(stroke), version: self.bump() })
    }

    /// A connection went away. Its in-progress stroke, if any, is completed
    /// under the same rules as [`Self::end_stroke`]. Returns the committed
    /// stroke, or `None` if there was nothing to commit.
    pub fn connection_lost(&mut self, conn: ConnectionId) -> Option<Stroke> {
        let stroke = self.in_progress.remove(&conn)?;

        if stroke.points.len() < 2 {
            self.purge_stroke(&stroke.id);
            self.bump();
            return None;
        }

        let stroke = self.commit(stroke);
        self.clear_redo();
        self.enforce_capacity();
        self.bump();
        Some(stroke)
    }

    // =========================================================================
    // HISTORY
    // =========================================================================

    /// Undo the most recently completed visible stroke.
    ///
    /// Every in-progress stroke is forced to complete first, so history is
    /// only ever manipulated on settled state.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NothingToUndo`] if no visible stroke remains.
    pub fn undo(&mut self) -> Result<u64, LedgerError> {
        self.force_end_open_strokes();
        let Some(id) = self.visible.pop() else {
            return Err(LedgerError::NothingToUndo);
        };
        self.redo.push(id);
        Ok(self.bump())
    }

    /// Restore the most recently undone stroke.
    ///
    /// Forcing open strokes to complete may clear the redo stack, in which
    /// case the redo fails like any other empty-redo call.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::NothingToRedo`] if the redo stack is empty.
    pub fn redo(&mut self) -> Result<u64, LedgerError> {
        self.force_end_open_strokes();
        let Some(id) = self.redo.pop() else {
            return Err(LedgerError::NothingToRedo);
        };
        self.visible.push(id);
        self.enforce_capacity();
        Ok(self.bump())
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// The operation subsequence for every visible or in-progress stroke, in
    /// log order. Orphaned operations (purge in flight) never appear.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let mut active: HashSet<&StrokeId> = self.visible.iter().collect();
        active.extend(self.in_progress.values().map(|s| &s.id));
        let ops = self
            .ops
            .iter()
            .filter(|op| active.contains(op.stroke_id()))
            .cloned()
            .collect();
        Snapshot { version: self.version, ops }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }

    /// Move a finished stroke into the visible set and log its `end`.
    fn commit(&mut self, mut stroke: Stroke) -> Stroke {
        stroke.ended_at = Some(now_ms());
        self.visible.push(stroke.id.clone());
        self.ops.push(Operation::End { stroke_id: stroke.id.clone() });
        stroke
    }

    /// Complete every in-progress stroke. Short strokes are discarded under
    /// the usual rule. Bumps the version once if anything changed.
    fn force_end_open_strokes(&mut self) {
        let conns: Vec<ConnectionId> = self.in_progress.keys().copied().collect();
        let mut committed = false;
        let mut dropped = false;
        for conn in conns {
            let Some(stroke) = self.in_progress.remove(&conn) else {
                continue;
            };
            if stroke.points.len() < 2 {
                self.purge_stroke(&stroke.id);
                dropped = true;
                continue;
            }
            self.commit(stroke);
            committed = true;
        }
        if committed {
            self.clear_redo();
            self.enforce_capacity();
        }
        if committed || dropped {
            self.bump();
        }
    }

    /// Drop the redo stack and purge its strokes' operations from the log.
    fn clear_redo(&mut self) {
        if self.redo.is_empty() {
            return;
        }
        let cleared = std::mem::take(&mut self.redo);
        self.ops.retain(|op| !cleared.contains(op.stroke_id()));
    }

    /// Remove every operation belonging to one stroke.
    fn purge_stroke(&mut self, id: &StrokeId) {
        self.ops.retain(|op| op.stroke_id() != id);
    }

    /// Evict the oldest visible strokes past the capacity limit. Evicted ids
    /// leave the visible stack, the redo stack, and the log.
    fn enforce_capacity(&mut self) {
        if self.visible.len() <= self.config.max_strokes {
            return;
        }
        let overflow = self.visible.len() - self.config.max_strokes;
        let evicted: Vec<StrokeId> = self.visible.drain(..overflow).collect();
        self.redo.retain(|id| !evicted.contains(id));
        self.ops.retain(|op| !evicted.contains(op.stroke_id()));
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new(LedgerConfig::default())
    }
}

#[cfg(test)]
#[path = "ledger_test.rs"]
mod tests;
