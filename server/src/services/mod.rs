//! Domain services dispatched from websocket frames.

pub mod drawing;
pub mod room;
