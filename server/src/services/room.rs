//! Room service — membership, user directory, cursors, and broadcast.
//!
//! DESIGN
//! ======
//! Every connection joins the single main room on upgrade. Joining creates
//! the room (and its ledger) on first use; parting removes only the client's
//! presence. The room itself is retained when empty because the canvas lives
//! nowhere else.

use rand::seq::IndexedRandom;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

use crate::frame::Frame;
use crate::state::{AppState, Cursor, RoomState, RoomUser};

/// Colors assigned to joining users, picked at random.
const PALETTE: [&str; 8] = [
    "#2563eb", "#16a34a", "#dc2626", "#7c3aed", "#ea580c", "#0f766e", "#db2777", "#ca8a04",
];

/// Directory entry paired with its connection id, for wire payloads.
#[derive(Debug, Clone, Serialize)]
pub struct RoomMember {
    pub client_id: Uuid,
    pub name: String,
    pub color: String,
}

/// Cursor position paired with its connection id, for wire payloads.
#[derive(Debug, Clone, Serialize)]
pub struct CursorEntry {
    pub client_id: Uuid,
    pub x: f64,
    pub y: f64,
    pub drawing: bool,
}

/// Short human-readable name derived from the connection id.
fn display_name(client_id: Uuid) -> String {
    let id = client_id.to_string();
    format!("User-{}", &id[..4])
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Join a room, creating it (and its ledger) on first use. Returns the
/// directory entry assigned to the new client.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    tx: mpsc::Sender<Frame>,
) -> RoomUser {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .entry(room_id.to_owned())
        .or_insert_with(|| RoomState::new(state.limits));

    let color = PALETTE
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(PALETTE[0])
        .to_owned();
    let user = RoomUser { name: display_name(client_id), color };

    room.clients.insert(client_id, tx);
    room.users.insert(client_id, user.clone());
    info!(room_id, %client_id, clients = room.clients.len(), "client joined room");
    user
}

/// Leave a room. Removes the client's presence only; the ledger stays.
pub async fn part_room(state: &AppState, room_id: &str, client_id: Uuid) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };

    room.clients.remove(&client_id);
    room.users.remove(&client_id);
    room.cursors.remove(&client_id);
    info!(room_id, %client_id, remaining = room.clients.len(), "client left room");
}

/// List currently connected users in a room.
pub async fn list_members(state: &AppState, room_id: &str) -> Vec<RoomMember> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return Vec::new();
    };
    room.users
        .iter()
        .map(|(client_id, user)| RoomMember {
            client_id: *client_id,
            name: user.name.clone(),
            color: user.color.clone(),
        })
        .collect()
}

/// Last known cursor positions in a room.
pub async fn list_cursors(state: &AppState, room_id: &str) -> Vec<CursorEntry> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return Vec::new();
    };
    room.cursors
        .iter()
        .map(|(client_id, cursor)| CursorEntry {
            client_id: *client_id,
            x: cursor.x,
            y: cursor.y,
            drawing: cursor.drawing,
        })
        .collect()
}

/// Record a client's cursor position.
pub async fn update_cursor(state: &AppState, room_id: &str, client_id: Uuid, cursor: Cursor) {
    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return;
    };
    room.cursors.insert(client_id, cursor);
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Broadcast a frame to all clients in a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room_id: &str, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: if a client's channel is full, skip it.
        let _ = tx.try_send(frame.clone());
    }
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
