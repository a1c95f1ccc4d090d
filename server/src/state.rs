//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the ledger capacity limits and a map of live rooms. Each room owns
//! its stroke ledger, connected client senders, the user directory, and last
//! known cursor positions. The `RwLock` write guard around the room map is
//! the serialization boundary for all ledger mutations.

use std::collections::HashMap;
use std::sync::Arc;

use ink::{Ledger, LedgerConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::frame::Frame;

/// The single shared room every connection lands in.
pub const MAIN_ROOM: &str = "main";

// =============================================================================
// ROOM STATE
// =============================================================================

/// Directory entry for a connected user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomUser {
    pub name: String,
    pub color: String,
}

/// Last reported cursor position for a connection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    pub drawing: bool,
}

/// Per-room live state. The document itself is the ledger; everything else
/// is presence. A room outlives its clients — the canvas is in-memory only,
/// so evicting an empty room would erase it.
pub struct RoomState {
    pub ledger: Ledger,
    /// Connected clients: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
    pub users: HashMap<Uuid, RoomUser>,
    pub cursors: HashMap<Uuid, Cursor>,
}

impl RoomState {
    #[must_use]
    pub fn new(limits: LedgerConfig) -> Self {
        Self {
            ledger: Ledger::new(limits),
            clients: HashMap::new(),
            users: HashMap::new(),
            cursors: HashMap::new(),
        }
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum — all inner fields are Copy or Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub limits: LedgerConfig,
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
}

impl AppState {
    #[must_use]
    pub fn new(limits: LedgerConfig) -> Self {
        Self { limits, rooms: Arc::new(RwLock::new(HashMap::new())) }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
