//! Client-side optimistic sync: draw now, confirm later.
//!
//! DESIGN
//! ======
//! The controller is a pure state machine. The embedding client feeds it
//! pointer events and server acknowledgments; it returns the commands to put
//! on the wire. Observers (the author included) render only from
//! server-broadcast operations, so the only job here is to never lose and
//! never duplicate ink between pointer-down and the asynchronous start
//! acknowledgment.
//!
//! TOKENS
//! ======
//! Each gesture gets a locally incrementing token carried on the start
//! request. An acknowledgment applies only while that token is still the
//! pending one; aborted or superseded gestures leave a stale token behind and
//! their late acknowledgments are discarded wholesale.

use crate::geometry::Point;
use crate::stroke::{StrokeId, StrokeStyle};

/// A request the embedding client should put on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Ask the server to start a stroke. `token` is handed back to
    /// [`SyncController::acknowledge`] with the server's verdict.
    Start { token: u64, style: StrokeStyle, point: Point },
    /// Append a point to the confirmed stroke.
    Point { stroke_id: StrokeId, point: Point },
    /// Finish the confirmed stroke.
    End { stroke_id: StrokeId },
}

/// Server verdict on a start request.
#[derive(Debug, Clone, PartialEq)]
pub enum StartAck {
    Accepted(StrokeId),
    Rejected,
}

#[derive(Debug)]
enum Gesture {
    Idle,
    /// Start request sent, acknowledgment outstanding. Motion buffers here.
    Pending { token: u64, buffered: Vec<Point>, end_pending: bool },
    /// Start accepted; points flow straight through.
    Drawing { stroke_id: StrokeId },
}

/// Optimistic gesture state machine for one drawing client.
#[derive(Debug)]
pub struct SyncController {
    next_token: u64,
    gesture: Gesture,
}

impl SyncController {
    #[must_use]
    pub fn new() -> Self {
        Self { next_token: 0, gesture: Gesture::Idle }
    }

    /// Whether a gesture is underway, pending or confirmed.
    #[must_use]
    pub fn is_drawing(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Begin a gesture. Any gesture already underway is superseded: its token
    /// goes stale and a late acknowledgment for it will be discarded.
    pub fn pointer_down(&mut self, style: StrokeStyle, point: Point) -> Command {
        self.next_token += 1;
        let token = self.next_token;
        self.gesture = Gesture::Pending { token, buffered: Vec::new(), end_pending: false };
        Command::Start { token, style, point }
    }

    /// Pointer motion. Buffers while the start acknowledgment is outstanding,
    /// passes through once the stroke is confirmed.
    pub fn pointer_move(&mut self, point: Point) -> Option<Command> {
        match &mut self.gesture {
            Gesture::Idle => None,
            Gesture::Pending { buffered, .. } => {
                buffered.push(point);
                None
            }
            Gesture::Drawing { stroke_id } => {
                Some(Command::Point { stroke_id: stroke_id.clone(), point })
            }
        }
    }

    /// Pointer released. While the start acknowledgment is outstanding the
    /// end is deferred; [`Self::acknowledge`] flushes it after the buffered
    /// points.
    pub fn pointer_up(&mut self) -> Option<Command> {
        match &mut self.gesture {
            Gesture::Idle => None,
            Gesture::Pending { end_pending, .. } => {
                *end_pending = true;
                None
            }
            Gesture::Drawing { stroke_id } => {
                let cmd = Command::End { stroke_id: stroke_id.clone() };
                self.gesture = Gesture::Idle;
                Some(cmd)
            }
        }
    }

    /// Pointer capture lost. Treated like a release.
    pub fn pointer_cancel(&mut self) -> Option<Command> {
        self.pointer_up()
    }

    /// Apply the server's verdict on a start request. Returns the commands to
    /// send, in order: buffered points first, then the deferred end if the
    /// pointer already lifted. A stale token leaves the current gesture
    /// untouched and returns nothing.
    pub fn acknowledge(&mut self, token: u64, ack: StartAck) -> Vec<Command> {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Pending { token: pending, buffered, end_pending } if pending == token => {
                match ack {
                    StartAck::Rejected => Vec::new(),
                    StartAck::Accepted(stroke_id) => {
                        let mut commands: Vec<Command> = buffered
                            .into_iter()
                            .map(|point| Command::Point { stroke_id: stroke_id.clone(), point })
                            .collect();
                        if end_pending {
                            commands.push(Command::End { stroke_id });
                        } else {
                            self.gesture = Gesture::Drawing { stroke_id };
                        }
                        commands
                    }
                }
            }
            other => {
                self.gesture = other;
                Vec::new()
            }
        }
    }

    /// Invalidate the current gesture (reconnect, local reset). Any late
    /// acknowledgment for it will be ignored.
    pub fn abort(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

impl Default for SyncController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
