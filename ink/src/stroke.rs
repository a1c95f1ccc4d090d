//! Stroke identity, the operation log entry, and snapshots.
//!
//! DESIGN
//! ======
//! Operations are the only persisted representation of the document. A
//! [`Stroke`] is the ephemeral in-progress accumulator the ledger keeps per
//! connection until the gesture completes; observers only ever see the
//! operation stream.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Color, Point, Tool, clamp_width};

/// Opaque stable identifier for a live connection, supplied by the transport.
pub type ConnectionId = Uuid;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Stroke identity: the authoring connection plus a ledger-wide sequence
/// number, so ids stay unique across reconnects of the same client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StrokeId(String);

impl StrokeId {
    pub(crate) fn new(conn: ConnectionId, seq: u64) -> Self {
        Self(format!("{conn}:{seq}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Tool, color, and width for one stroke. Immutable once the stroke starts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokeStyle {
    pub tool: Tool,
    pub color: Color,
    pub width: f64,
}

impl StrokeStyle {
    /// Build a normalized style: the width is clamped and eraser strokes
    /// always record the sentinel color.
    #[must_use]
    pub fn new(tool: Tool, color: Color, width: f64) -> Self {
        let color = match tool {
            Tool::Eraser => Color::ERASER,
            Tool::Brush => color,
        };
        Self { tool, color, width: clamp_width(width) }
    }
}

// =============================================================================
// STROKE
// =============================================================================

/// The immutable header carried by a `start` operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrokeHeader {
    pub id: StrokeId,
    pub by: ConnectionId,
    pub style: StrokeStyle,
    pub started_at: i64,
}

/// One continuous drawing gesture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub id: StrokeId,
    pub by: ConnectionId,
    pub style: StrokeStyle,
    pub points: Vec<Point>,
    pub started_at: i64,
    pub ended_at: Option<i64>,
}

impl Stroke {
    pub(crate) fn begin(
        id: StrokeId,
        by: ConnectionId,
        style: StrokeStyle,
        first: Point,
        started_at: i64,
    ) -> Self {
        Self { id, by, style, points: vec![first], started_at, ended_at: None }
    }

    /// Header recorded in this stroke's `start` operation.
    #[must_use]
    pub fn header(&self) -> StrokeHeader {
        StrokeHeader { id: self.id.clone(), by: self.by, style: self.style, started_at: self.started_at }
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// One entry in the append-only operation log.
///
/// Operations for a given stroke always appear in log order
/// `start, point*, end`; a stroke still in progress has no `end` yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Operation {
    Start { stroke: StrokeHeader, point: Point },
    Point { stroke_id: StrokeId, point: Point },
    End { stroke_id: StrokeId },
}

impl Operation {
    /// The stroke this operation belongs to.
    #[must_use]
    pub fn stroke_id(&self) -> &StrokeId {
        match self {
            Self::Start { stroke, .. } => &stroke.id,
            Self::Point { stroke_id, .. } | Self::End { stroke_id } => stroke_id,
        }
    }
}

/// The minimal state a new observer needs: the operation subsequence for
/// every visible or in-progress stroke, in log order, plus the document
/// version it corresponds to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u64,
    pub ops: Vec<Operation>,
}

#[cfg(test)]
#[path = "stroke_test.rs"]
mod tests;
