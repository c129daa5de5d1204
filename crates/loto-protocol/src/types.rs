//! Core protocol types shared by the room engine and the server.
//!
//! Everything in here travels on the wire at some point: identities,
//! room configuration, ticket grids, and the summary records that the
//! lobby and the player list are built from.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The ephemeral handle of one connected client.
///
/// A `PlayerId` is allocated when a connection is accepted and lives for as
/// long as that connection does. It is the only identity the engine knows
/// about: there are no accounts, and a reconnecting client is a new player.
///
/// `#[serde(transparent)]` makes `PlayerId(42)` serialize as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type in to join a room (e.g. `"K7QX"`).
///
/// Codes are unique among live rooms and never change for a room's
/// lifetime. [`RoomCode::normalized`] is applied to anything a client
/// sends, so `" k7qx "` finds the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    /// Trims surrounding whitespace and upper-cases the code.
    pub fn normalized(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound event.
///
/// The room engine pairs every event it produces with a `Recipient`; the
/// room actor resolves it against the room's current members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every member of the room (players and a non-playing host).
    All,

    /// A single member.
    Player(PlayerId),

    /// Every member except the given one.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Room status and settings
// ---------------------------------------------------------------------------

/// Lifecycle status of a room.
///
/// ```text
/// Waiting ──start──→ Playing ──win / pool exhausted──→ Finished
///    ↑                  │                                  │
///    └──────reset───────┴──────────────reset───────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Playing => write!(f, "playing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

/// Per-room configuration chosen by the host at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    /// How many tickets every player receives (1–5).
    pub tickets_per_player: u8,

    /// Whether the host also receives tickets and plays.
    pub host_plays: bool,

    /// Seconds the client-side draw animation should last (1–10).
    /// The engine never interprets this; it is passed through to clients.
    pub spin_duration: f64,
}

impl RoomSettings {
    pub const MIN_TICKETS: u8 = 1;
    pub const MAX_TICKETS: u8 = 5;
    pub const DEFAULT_TICKETS: u8 = 1;
    pub const MIN_SPIN_SECS: f64 = 1.0;
    pub const MAX_SPIN_SECS: f64 = 10.0;
    pub const DEFAULT_SPIN_SECS: f64 = 3.0;

    /// Builds settings from raw client input, clamping out-of-range values
    /// instead of rejecting them. Missing or non-finite values fall back to
    /// the defaults.
    pub fn clamped(
        tickets_per_player: Option<i64>,
        host_plays: bool,
        spin_duration: Option<f64>,
    ) -> Self {
        let tickets = match tickets_per_player {
            Some(n) if n > 0 => n.clamp(
                i64::from(Self::MIN_TICKETS),
                i64::from(Self::MAX_TICKETS),
            ) as u8,
            _ => Self::DEFAULT_TICKETS,
        };
        let spin = match spin_duration {
            Some(s) if s.is_finite() && s > 0.0 => {
                s.clamp(Self::MIN_SPIN_SECS, Self::MAX_SPIN_SECS)
            }
            _ => Self::DEFAULT_SPIN_SECS,
        };
        Self {
            tickets_per_player: tickets,
            host_plays,
            spin_duration: spin,
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::clamped(None, false, None)
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// One 3×9 bingo card.
///
/// A cell holds `0` when it is empty, otherwise a number in 1..=90.
/// Column `c` only ever holds numbers from its decade (col 0: 1–9,
/// col 1: 10–19, …, col 8: 80–90). Serializes as a plain nested array:
/// `[[0, 12, 0, ...], [...], [...]]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket([[u8; Ticket::COLS]; Ticket::ROWS]);

impl Ticket {
    pub const ROWS: usize = 3;
    pub const COLS: usize = 9;
    /// Numbered cells on a complete ticket.
    pub const NUMBERS: usize = 15;
    /// Numbered cells in each row of a complete ticket.
    pub const NUMBERS_PER_ROW: usize = 5;

    /// Wraps a raw grid.
    pub fn from_rows(rows: [[u8; Self::COLS]; Self::ROWS]) -> Self {
        Self(rows)
    }

    /// The raw grid, row-major.
    pub fn rows(&self) -> &[[u8; Self::COLS]; Self::ROWS] {
        &self.0
    }

    /// The numbered (non-zero) cells of one row, left to right.
    /// Returns `None` for an out-of-range row index.
    pub fn row_numbers(&self, row: usize) -> Option<Vec<u8>> {
        self.0
            .get(row)
            .map(|cells| cells.iter().copied().filter(|&n| n != 0).collect())
    }

    /// The numbered cells of one column, top to bottom.
    pub fn column_numbers(&self, col: usize) -> Vec<u8> {
        self.0
            .iter()
            .filter_map(|row| row.get(col).copied())
            .filter(|&n| n != 0)
            .collect()
    }

    /// Every numbered cell on the ticket, row by row.
    pub fn numbers(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().flatten().copied().filter(|&n| n != 0)
    }
}

// ---------------------------------------------------------------------------
// Summaries
// ---------------------------------------------------------------------------

/// One entry of the player list shown in the lobby.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
}

/// Public, non-sensitive description of a room for the lobby list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: RoomCode,
    pub host_name: String,
    pub player_count: usize,
    pub tickets_per_player: u8,
    pub spin_duration: f64,
    pub host_plays: bool,
    pub status: RoomStatus,
}

/// Payload of a "dramatic" draw: two or more single-number near-win
/// declarations sit in the same decade as the number just drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DramaticSpin {
    /// The shared decade, e.g. `40` for 40–49.
    pub decade: u8,
    /// Names of the players whose declarations matched, in declaration order.
    pub player_names: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&PlayerId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(PlayerId(7).to_string(), "P-7");
    }

    #[test]
    fn test_room_code_normalized() {
        assert_eq!(RoomCode::normalized("  k7qx "), RoomCode("K7QX".into()));
        assert_eq!(RoomCode("AB2C".into()).to_string(), "AB2C");
    }

    #[test]
    fn test_room_code_serializes_as_plain_string() {
        let json = serde_json::to_string(&RoomCode("AB2C".into())).unwrap();
        assert_eq!(json, "\"AB2C\"");
    }

    #[test]
    fn test_room_status_serializes_lowercase() {
        let json = serde_json::to_string(&RoomStatus::Playing).unwrap();
        assert_eq!(json, "\"playing\"");
        assert_eq!(RoomStatus::Finished.to_string(), "finished");
    }

    #[test]
    fn test_settings_clamp_out_of_range_values() {
        let s = RoomSettings::clamped(Some(9), true, Some(42.0));
        assert_eq!(s.tickets_per_player, 5);
        assert_eq!(s.spin_duration, 10.0);
        assert!(s.host_plays);

        let s = RoomSettings::clamped(Some(3), false, Some(0.5));
        assert_eq!(s.tickets_per_player, 3);
        assert_eq!(s.spin_duration, 1.0);
    }

    #[test]
    fn test_settings_defaults_for_missing_or_garbage() {
        let s = RoomSettings::clamped(None, false, None);
        assert_eq!(s.tickets_per_player, 1);
        assert_eq!(s.spin_duration, 3.0);

        let s = RoomSettings::clamped(Some(-4), false, Some(f64::NAN));
        assert_eq!(s.tickets_per_player, 1);
        assert_eq!(s.spin_duration, 3.0);
    }

    #[test]
    fn test_settings_json_is_camel_case() {
        let json = serde_json::to_value(RoomSettings::default()).unwrap();
        assert_eq!(json["ticketsPerPlayer"], 1);
        assert_eq!(json["hostPlays"], false);
        assert_eq!(json["spinDuration"], 3.0);
    }

    fn sample_ticket() -> Ticket {
        Ticket::from_rows([
            [1, 0, 23, 0, 41, 0, 65, 0, 80],
            [0, 14, 0, 35, 44, 51, 0, 77, 0],
            [7, 0, 0, 38, 0, 52, 69, 0, 86],
        ])
    }

    #[test]
    fn test_ticket_row_numbers_skip_empty_cells() {
        let t = sample_ticket();
        assert_eq!(t.row_numbers(0), Some(vec![1, 23, 41, 65, 80]));
        assert_eq!(t.row_numbers(3), None);
    }

    #[test]
    fn test_ticket_column_numbers_top_to_bottom() {
        let t = sample_ticket();
        assert_eq!(t.column_numbers(0), vec![1, 7]);
        assert_eq!(t.column_numbers(4), vec![41, 44]);
        assert!(t.column_numbers(9).is_empty());
    }

    #[test]
    fn test_ticket_serializes_as_nested_array() {
        let json = serde_json::to_value(sample_ticket()).unwrap();
        assert_eq!(json[1][1], 14);
        assert_eq!(json.as_array().unwrap().len(), 3);
        assert_eq!(sample_ticket().numbers().count(), 15);
    }

    #[test]
    fn test_room_summary_json_format() {
        let summary = RoomSummary {
            code: RoomCode("AB2C".into()),
            host_name: "Lan".into(),
            player_count: 3,
            tickets_per_player: 2,
            spin_duration: 4.0,
            host_plays: false,
            status: RoomStatus::Waiting,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["code"], "AB2C");
        assert_eq!(json["hostName"], "Lan");
        assert_eq!(json["playerCount"], 3);
        assert_eq!(json["status"], "waiting");
    }
}
