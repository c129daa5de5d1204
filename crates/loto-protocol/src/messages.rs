//! Inbound actions and outbound events.
//!
//! Both enums are internally tagged by a `"type"` field whose value is the
//! kebab-case action/event name, and their fields are camelCase:
//!
//! ```json
//! { "type": "join-room", "code": "K7QX", "playerName": "Lan" }
//! { "type": "number-drawn", "number": 45, "drawnNumbers": [12, 45], ... }
//! ```

use serde::{Deserialize, Serialize};

use crate::{DramaticSpin, PlayerSummary, RoomCode, RoomSettings, RoomSummary, Ticket};

/// Everything a client can ask the server to do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientAction {
    /// Open a new room with the caller as host.
    CreateRoom {
        #[serde(default)]
        host_name: Option<String>,
        #[serde(default)]
        tickets_per_player: Option<i64>,
        #[serde(default)]
        host_plays: bool,
        #[serde(default)]
        spin_duration: Option<f64>,
    },

    /// Join a waiting room by code.
    JoinRoom {
        code: String,
        #[serde(default)]
        player_name: Option<String>,
    },

    /// Ask for the current lobby list.
    ListRooms,

    /// Host only: `waiting → playing`.
    StartGame,

    /// Host only: draw the next number.
    DrawNumber,

    /// Flip a number in the caller's mark set for one ticket.
    ToggleNumber { ticket_index: usize, number: u8 },

    /// Announce that a row is close to completion.
    #[serde(rename = "declare-near-loto")]
    DeclareNearWin { ticket_index: usize, row_index: usize },

    /// Claim a completed row.
    #[serde(rename = "claim-loto")]
    ClaimWin { ticket_index: usize },

    /// Host only: back to the lobby with fresh tickets.
    ResetGame,

    /// Host only: close the room.
    DisbandRoom,

    /// Rename the caller while the room is waiting.
    ChangeName {
        #[serde(default)]
        new_name: Option<String>,
    },
}

impl ClientAction {
    /// Short wire name, used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateRoom { .. } => "create-room",
            Self::JoinRoom { .. } => "join-room",
            Self::ListRooms => "list-rooms",
            Self::StartGame => "start-game",
            Self::DrawNumber => "draw-number",
            Self::ToggleNumber { .. } => "toggle-number",
            Self::DeclareNearWin { .. } => "declare-near-loto",
            Self::ClaimWin { .. } => "claim-loto",
            Self::ResetGame => "reset-game",
            Self::DisbandRoom => "disband-room",
            Self::ChangeName { .. } => "change-name",
        }
    }
}

/// Everything the server can tell a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    /// Sent to the host after `create-room`.
    RoomCreated {
        code: RoomCode,
        settings: RoomSettings,
        /// Present only when the host plays.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tickets: Option<Vec<Ticket>>,
    },

    /// Sent to a player after a successful `join-room`.
    RoomJoined {
        code: RoomCode,
        host_name: String,
        settings: RoomSettings,
        tickets: Vec<Ticket>,
        players: Vec<PlayerSummary>,
    },

    /// Lobby list of rooms still waiting for players.
    RoomList { rooms: Vec<RoomSummary> },

    PlayerListUpdated { players: Vec<PlayerSummary> },

    GameStarted,

    NumberDrawn {
        number: u8,
        drawn_numbers: Vec<u8>,
        remaining: usize,
        spin_duration: f64,
        #[serde(default)]
        dramatic_spin: Option<DramaticSpin>,
    },

    /// The pool ran dry before anyone won.
    GameFinished { reason: String },

    #[serde(rename = "near-loto-declared")]
    NearWinDeclared {
        player_name: String,
        missing_numbers: Vec<u8>,
        ticket_index: usize,
    },

    /// Reminder that a player has a row one number from completion but has
    /// not declared it.
    #[serde(rename = "near-loto-nudge")]
    NearWinNudge {
        player_name: String,
        missing_number: u8,
    },

    GameWon {
        player_name: String,
        ticket_index: usize,
    },

    BackToLobby {
        code: RoomCode,
        players: Vec<PlayerSummary>,
    },

    /// Sent individually after a reset; carries only the recipient's tickets.
    TicketsRefreshed { tickets: Vec<Ticket> },

    RoomClosed { reason: String },

    PlayerLeft { player_name: String },

    /// A rejected action, sent to the requester only.
    #[serde(rename = "error-msg")]
    Error { message: String },
}
