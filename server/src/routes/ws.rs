//! WebSocket handler — bidirectional frame relay for the shared canvas.
//!
//! DESIGN
//! ======
//! On upgrade, generates a client ID, joins the main room, and enters a
//! `select!` loop:
//! - Incoming client frames → parse + dispatch by syscall prefix
//! - Broadcast frames from room peers → forward to client
//!
//! Handler functions are pure business logic — they validate, call services,
//! and return an `Outcome`. The dispatch layer owns all outbound concerns:
//! reply to sender and broadcast to peers. The history handlers are the one
//! exception: they push a `history:state` notification to every client
//! (sender included) directly, because undo/redo invalidates everyone's
//! rendered canvas at once.
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade → join main room → send `session:connected` with the snapshot
//! 2. Client sends frames → dispatch → handler returns Outcome
//! 3. Dispatch applies Outcome (reply / broadcast / both)
//! 4. Close → force-complete the open stroke → broadcast `room:part` → cleanup

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use ink::{Color, GeometryError, Point, StrokeId, StrokeStyle, Tool};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame, Status};
use crate::services;
use crate::services::drawing::DrawingError;
use crate::state::{AppState, Cursor, MAIN_ROOM};

// =============================================================================
// OUTCOME
// =============================================================================

/// Result returned by handler functions. The dispatch layer uses this to
/// decide who receives what — handlers never send frames directly.
enum Outcome {
    /// Broadcast done+data to ALL room clients including sender.
    /// Sender's copy carries `parent_id` for correlation.
    Broadcast(Data),
    /// Broadcast data to all room peers EXCLUDING sender. No reply to sender.
    /// Used for cursor moves (ephemeral).
    BroadcastExcludeSender(Data),
    /// Send done+data to sender only.
    Reply(Data),
    /// Send empty done to sender only.
    Done,
}

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let client_id = Uuid::new_v4();

    // Per-connection channel for receiving broadcast frames from peers.
    let (client_tx, mut client_rx) = mpsc::channel::<Frame>(256);

    let user = services::room::join_room(&state, MAIN_ROOM, client_id, client_tx).await;
    let members = services::room::list_members(&state, MAIN_ROOM).await;
    let cursors = services::room::list_cursors(&state, MAIN_ROOM).await;
    let snapshot = services::drawing::snapshot(&state, MAIN_ROOM).await;

    let welcome = Frame::request("session:connected", Data::new())
        .with_room_id(MAIN_ROOM)
        .with_data("client_id", client_id.to_string())
        .with_data("user", serde_json::to_value(&user).unwrap_or_default())
        .with_data("users", serde_json::to_value(&members).unwrap_or_default())
        .with_data("cursors", serde_json::to_value(&cursors).unwrap_or_default())
        .with_data("snapshot", serde_json::to_value(&snapshot).unwrap_or_default());
    if send_frame(&mut socket, &welcome).await.is_err() {
        services::room::part_room(&state, MAIN_ROOM, client_id).await;
        return;
    }

    let join = Frame::request("room:join", Data::new())
        .with_room_id(MAIN_ROOM)
        .with_data("client_id", client_id.to_string())
        .with_data("user", serde_json::to_value(&user).unwrap_or_default());
    services::room::broadcast(&state, MAIN_ROOM, &join, Some(client_id)).await;

    info!(%client_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(msg) = msg else { break };
                let Ok(msg) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        dispatch_frame(&state, &mut socket, client_id, &text).await;
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            Some(frame) = client_rx.recv() => {
                if send_frame(&mut socket, &frame).await.is_err() {
                    break;
                }
            }
        }
    }

    // Force-complete any stroke left open, then tell peers to repaint from
    // the committed state.
    if let Some((stroke, snapshot)) = services::drawing::connection_lost(&state, MAIN_ROOM, client_id).await {
        let notif = Frame::request("history:state", Data::new())
            .with_room_id(MAIN_ROOM)
            .with_data("reason", "connection_lost")
            .with_data("stroke_id", stroke.id.to_string())
            .with_data("snapshot", serde_json::to_value(&snapshot).unwrap_or_default());
        services::room::broadcast(&state, MAIN_ROOM, &notif, Some(client_id)).await;
    }

    let part = Frame::request("room:part", Data::new())
        .with_room_id(MAIN_ROOM)
        .with_data("client_id", client_id.to_string());
    services::room::broadcast(&state, MAIN_ROOM, &part, Some(client_id)).await;
    services::room::part_room(&state, MAIN_ROOM, client_id).await;

    info!(%client_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse an incoming JSON frame, dispatch to handler, apply outcome.
async fn dispatch_frame(state: &AppState, socket: &mut WebSocket, client_id: Uuid, text: &str) {
    let sender_frames = process_inbound_text(state, client_id, text).await;
    for frame in sender_frames {
        let _ = send_frame(socket, &frame).await;
    }
}

/// Parse and process one inbound text frame and return frames for the sender.
///
/// This keeps websocket transport concerns separate from frame handling, so
/// tests can exercise dispatch and broadcast behavior end-to-end.
async fn process_inbound_text(state: &AppState, client_id: Uuid, text: &str) -> Vec<Frame> {
    let mut req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            let err = Frame::request("gateway:error", Data::new())
                .with_data("message", format!("invalid json: {e}"));
            return vec![err];
        }
    };

    // Stamp the connection id as `from`; clients cannot impersonate peers.
    req.from = Some(client_id.to_string());

    let prefix = req.prefix();
    let is_cursor = prefix == "cursor";
    if !is_cursor {
        info!(%client_id, id = %req.id, syscall = %req.syscall, status = ?req.status, "ws: recv frame");
    }

    let result = match prefix {
        "stroke" => handle_stroke(state, client_id, &req).await,
        "history" => handle_history(state, &req).await,
        "snapshot" => handle_snapshot(state, &req).await,
        "cursor" => handle_cursor(state, client_id, &req).await,
        other => Err(req.error(format!("unknown prefix: {other}"))),
    };

    match result {
        Ok(Outcome::Broadcast(data)) => {
            let sender_frame = req.done_with(data);
            // Peers get a copy without parent_id (they didn't originate the request).
            let mut peer_frame = sender_frame.clone();
            peer_frame.id = Uuid::new_v4();
            peer_frame.parent_id = None;
            services::room::broadcast(state, MAIN_ROOM, &peer_frame, Some(client_id)).await;
            vec![sender_frame]
        }
        Ok(Outcome::BroadcastExcludeSender(data)) => {
            let frame = Frame::request(&req.syscall, data).with_room_id(MAIN_ROOM);
            services::room::broadcast(state, MAIN_ROOM, &frame, Some(client_id)).await;
            vec![]
        }
        Ok(Outcome::Reply(data)) => vec![req.done_with(data)],
        Ok(Outcome::Done) => vec![req.done()],
        Err(err_frame) => vec![err_frame],
    }
}

// =============================================================================
// STROKE HANDLERS
// =============================================================================

async fn handle_stroke(state: &AppState, client_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "start" => {
            let tool: Tool = req
                .data
                .get("tool")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .parse()
                .map_err(|e| invalid(req, e))?;
            // Erasers ignore the requested color entirely, so a malformed
            // color string is not an error for them.
            let color = match tool {
                Tool::Eraser => Color::ERASER,
                Tool::Brush => req
                    .data
                    .get("color")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .parse()
                    .map_err(|e| invalid(req, e))?,
            };
            let width = req
                .data
                .get("width")
                .and_then(serde_json::Value::as_f64)
                .unwrap_or(f64::NAN);
            let point = parse_point(req, req.data.get("point"))?;
            let style = StrokeStyle::new(tool, color, width);

            match services::drawing::start_stroke(state, MAIN_ROOM, client_id, style, point).await {
                Ok(outcome) => {
                    let mut data = Data::new();
                    data.insert("stroke_id".into(), serde_json::json!(outcome.stroke_id));
                    data.insert("op".into(), serde_json::to_value(&outcome.op).unwrap_or_default());
                    data.insert("version".into(), serde_json::json!(outcome.version));
                    Ok(Outcome::Broadcast(data))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "point" => {
            let stroke_id = parse_stroke_id(req)?;
            let point = parse_point(req, req.data.get("point"))?;

            match services::drawing::add_point(state, MAIN_ROOM, client_id, &stroke_id, point).await {
                Ok(outcome) => match outcome.op {
                    Some(op) => {
                        let mut data = Data::new();
                        data.insert("stroke_id".into(), serde_json::json!(stroke_id));
                        data.insert("op".into(), serde_json::to_value(&op).unwrap_or_default());
                        data.insert("version".into(), serde_json::json!(outcome.version));
                        Ok(Outcome::Broadcast(data))
                    }
                    // Duplicate point: acknowledged, but there is nothing for
                    // observers to draw.
                    None => Ok(Outcome::Done),
                },
                Err(e) => Err(req.error_from(&e)),
            }
        }
        "end" => {
            let stroke_id = parse_stroke_id(req)?;

            match services::drawing::end_stroke(state, MAIN_ROOM, client_id, &stroke_id).await {
                Ok(outcome) => {
                    let mut data = Data::new();
                    data.insert("stroke_id".into(), serde_json::json!(stroke_id));
                    data.insert("committed".into(), serde_json::json!(outcome.committed.is_some()));
                    data.insert("version".into(), serde_json::json!(outcome.version));
                    Ok(Outcome::Broadcast(data))
                }
                Err(e) => Err(req.error_from(&e)),
            }
        }
        op => Err(req.error(format!("unknown stroke op: {op}"))),
    }
}

// =============================================================================
// HISTORY HANDLERS (exception: broadcast state directly)
// =============================================================================

async fn handle_history(state: &AppState, req: &Frame) -> Result<Outcome, Frame> {
    let result = match req.op() {
        "undo" => services::drawing::undo(state, MAIN_ROOM).await,
        "redo" => services::drawing::redo(state, MAIN_ROOM).await,
        op => return Err(req.error(format!("unknown history op: {op}"))),
    };

    match result {
        Ok((version, snapshot)) => {
            // Everyone repaints from the authoritative snapshot, the
            // requester included — its own canvas changed too.
            let notif = Frame::request("history:state", Data::new())
                .with_room_id(MAIN_ROOM)
                .with_data("reason", req.op())
                .with_data("snapshot", serde_json::to_value(&snapshot).unwrap_or_default());
            services::room::broadcast(state, MAIN_ROOM, &notif, None).await;

            let mut data = Data::new();
            data.insert("version".into(), serde_json::json!(version));
            Ok(Outcome::Reply(data))
        }
        Err(e) => Err(req.error_from(&e)),
    }
}

// =============================================================================
// SNAPSHOT HANDLER
// =============================================================================

async fn handle_snapshot(state: &AppState, req: &Frame) -> Result<Outcome, Frame> {
    match req.op() {
        "get" => {
            let snapshot = services::drawing::snapshot(state, MAIN_ROOM).await;
            let mut data = Data::new();
            data.insert("snapshot".into(), serde_json::to_value(&snapshot).unwrap_or_default());
            Ok(Outcome::Reply(data))
        }
        op => Err(req.error(format!("unknown snapshot op: {op}"))),
    }
}

// =============================================================================
// CURSOR HANDLER
// =============================================================================

async fn handle_cursor(state: &AppState, client_id: Uuid, req: &Frame) -> Result<Outcome, Frame> {
    if req.op() != "moved" {
        return Err(req.error(format!("unknown cursor op: {}", req.op())));
    }

    // Cursor traffic is ephemeral; malformed positions are dropped silently.
    let Ok(point) = parse_point_raw(req.data.get("position")) else {
        return Ok(Outcome::Done);
    };
    let drawing = req
        .data
        .get("drawing")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let cursor = Cursor { x: point.x, y: point.y, drawing };
    services::room::update_cursor(state, MAIN_ROOM, client_id, cursor).await;

    let mut data = Data::new();
    data.insert("client_id".into(), serde_json::json!(client_id));
    data.insert("x".into(), serde_json::json!(cursor.x));
    data.insert("y".into(), serde_json::json!(cursor.y));
    data.insert("drawing".into(), serde_json::json!(cursor.drawing));
    Ok(Outcome::BroadcastExcludeSender(data))
}

// =============================================================================
// HELPERS
// =============================================================================

fn invalid(req: &Frame, err: GeometryError) -> Frame {
    req.error_from(&DrawingError::invalid(err))
}

fn parse_point_raw(value: Option<&serde_json::Value>) -> Result<Point, GeometryError> {
    let x = value
        .and_then(|v| v.get("x"))
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(f64::NAN);
    let y = value
        .and_then(|v| v.get("y"))
        .and_then(serde_json::Value::as_f64)
        .unwrap_or(f64::NAN);
    Point::new(x, y)
}

fn parse_point(req: &Frame, value: Option<&serde_json::Value>) -> Result<Point, Frame> {
    parse_point_raw(value).map_err(|e| invalid(req, e))
}

fn parse_stroke_id(req: &Frame) -> Result<StrokeId, Frame> {
    req.data
        .get("stroke_id")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| req.error("stroke_id required"))
}

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    let is_cursor = frame.syscall.starts_with("cursor:");
    if !is_cursor {
        if frame.status == Status::Error {
            let code = frame.data.get("code").and_then(|v| v.as_str()).unwrap_or("-");
            let message = frame.data.get("message").and_then(|v| v.as_str()).unwrap_or("-");
            warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
        } else {
            info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
        }
    }
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
