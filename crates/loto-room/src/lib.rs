//! Room game engine for Lô Tô.
//!
//! Each room runs as an isolated Tokio task (actor model) that owns its
//! players, tickets, drawn numbers, and near-win declarations. The
//! [`RoomRegistry`] maps room codes to those actors and tracks which
//! connection sits in which room.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: connect, disconnect, and dispatch client actions
//! - [`RoomHandle`]: send commands to a running room actor
//! - [`RoomState`]: one room's data, mutated only by [`coordinator`]
//! - [`generate_tickets`]: the 3×9 ticket generator

mod config;
pub mod coordinator;
mod error;
mod pool;
mod registry;
mod room;
mod session;
mod state;
mod ticket;

pub use config::{
    DEFAULT_HOST_NAME, DEFAULT_PLAYER_NAME, MAX_NAME_CHARS, RegistryConfig, StatusExt,
    normalize_name,
};
pub use coordinator::{Outcome, RoomAction, RoomEffect};
pub use error::{ErrorKind, RoomError};
pub use pool::{MAX_NUMBER, MIN_NUMBER, NumberPool};
pub use registry::{CODE_ALPHABET, CODE_LEN, RoomRegistry};
pub use room::{EventSender, RoomHandle, RoomReply};
pub use session::{Session, SessionTable};
pub use state::{NearWinDeclaration, Player, RoomState};
pub use ticket::{COLUMN_RANGES, generate_tickets, is_well_formed};
