//! # loto-server
//!
//! WebSocket front end for multiplayer Lô Tô (90-ball bingo) rooms.
//!
//! Clients exchange JSON text frames: [`ClientAction`]s in,
//! [`ServerEvent`]s out. All game rules live in [`loto_room`]; this crate
//! accepts connections, decodes frames, and hands actions to the
//! [`RoomRegistry`].
//!
//! [`ClientAction`]: loto_protocol::ClientAction
//! [`ServerEvent`]: loto_protocol::ServerEvent
//! [`RoomRegistry`]: loto_room::RoomRegistry

mod config;
mod error;
mod handler;
mod server;
mod transport;

pub use config::{DEFAULT_BIND, ServerConfig};
pub use error::{ServerError, TransportError};
pub use server::{LotoServer, LotoServerBuilder};
pub use transport::{ConnectionId, WebSocketConnection, WebSocketTransport};
