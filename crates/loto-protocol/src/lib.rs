//! Wire protocol for the Lô Tô server.
//!
//! - **Types** ([`PlayerId`], [`RoomCode`], [`Ticket`], [`RoomSettings`], …):
//!   the data that actions and events carry.
//! - **Messages** ([`ClientAction`], [`ServerEvent`]): the tagged enums
//!   clients send and receive.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how messages become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about rooms or connections; it only
//! describes what travels between them.

mod codec;
mod error;
mod messages;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use messages::{ClientAction, ServerEvent};
pub use types::{
    DramaticSpin, PlayerId, PlayerSummary, Recipient, RoomCode, RoomSettings, RoomStatus,
    RoomSummary, Ticket,
};
