//! Deterministic replay of the authoritative operation sequence.
//!
//! DESIGN
//! ======
//! Observers never trust local input; they rebuild pixels from the operation
//! log. [`Replayer`] tracks per-stroke style and last point so each `point`
//! operation becomes exactly one drawn segment, whether it arrives in a full
//! snapshot or as a live broadcast. [`Surface`] is the minimal contract a
//! rendering backend implements: clear everything, or draw one styled
//! segment.
//!
//! Operations referencing an unknown stroke id are ignored. That makes the
//! replayer safe against broadcasts that race a purge on the server.

use std::collections::HashMap;

use crate::geometry::{Color, Point, Tool};
use crate::stroke::{Operation, StrokeId};

/// Compositing mode for a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompositeMode {
    /// Normal paint: source over destination.
    SourceOver,
    /// Destructive erase: destination out.
    DestinationOut,
}

/// Resolved drawing style for one stroke's segments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentStyle {
    pub mode: CompositeMode,
    pub color: Color,
    pub width: f64,
}

/// Minimal rendering contract replay needs from a canvas backend.
pub trait Surface {
    /// Reset to the blank background.
    fn clear(&mut self);
    /// Draw one line segment in the given style.
    fn draw_segment(&mut self, style: &SegmentStyle, from: Point, to: Point);
}

/// Replays operations onto a [`Surface`].
#[derive(Debug, Default)]
pub struct Replayer {
    styles: HashMap<StrokeId, SegmentStyle>,
    last_point: HashMap<StrokeId, Point>,
}

impl Replayer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Full replay: clear the surface, forget prior stroke state, and apply
    /// every operation in order.
    pub fn replay_all(&mut self, surface: &mut impl Surface, ops: &[Operation]) {
        surface.clear();
        self.styles.clear();
        self.last_point.clear();
        for op in ops {
            self.apply(surface, op);
        }
    }

    /// Incremental replay: apply one operation on top of what is already
    /// rendered. Unknown stroke ids are ignored.
    pub fn apply(&mut self, surface: &mut impl Surface, op: &Operation) {
        match op {
            Operation::Start { stroke, point } => {
                let mode = match stroke.style.tool {
                    Tool::Eraser => CompositeMode::DestinationOut,
                    Tool::Brush => CompositeMode::SourceOver,
                };
                let style = SegmentStyle { mode, color: stroke.style.color, width: stroke.style.width };
                self.styles.insert(stroke.id.clone(), style);
                self.last_point.insert(stroke.id.clone(), *point);
            }
            Operation::Point { stroke_id, point } => {
                let style = self.styles.get(stroke_id);
                let last = self.last_point.get(stroke_id).copied();
                let (Some(style), Some(last)) = (style, last) else {
                    return;
                };
                surface.draw_segment(style, last, *point);
                self.last_point.insert(stroke_id.clone(), *point);
            }
            Operation::End { stroke_id } => {
                self.last_point.remove(stroke_id);
            }
        }
    }
}

#[cfg(test)]
#[path = "replay_test.rs"]
mod tests;
