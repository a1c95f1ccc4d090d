//! Core domain for Inkboard — a server-authoritative collaborative canvas.
//!
//! ARCHITECTURE
//! ============
//! The shared document is an append-only log of stroke operations. This crate
//! is transport- and UI-agnostic: the server drives [`ledger::Ledger`] behind
//! its own serialization boundary, while clients drive
//! [`sync::SyncController`] for optimistic local input and
//! [`replay::Replayer`] to rebuild pixels from confirmed operations.

pub mod geometry;
pub mod ledger;
pub mod replay;
pub mod stroke;
pub mod sync;

pub use geometry::{Color, GeometryError, Point, Tool, clamp_width};
pub use ledger::{EndOutcome, Ledger, LedgerConfig, LedgerError, PointOutcome, StartOutcome};
pub use replay::{CompositeMode, Replayer, SegmentStyle, Surface};
pub use stroke::{ConnectionId, Operation, Snapshot, Stroke, StrokeHeader, StrokeId, StrokeStyle};
pub use sync::{Command, StartAck, SyncController};
