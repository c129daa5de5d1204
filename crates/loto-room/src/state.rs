//! One room's data: players, tickets, marks, draws, and declarations.
//!
//! `RoomState` is plain data plus queries. All transitions go through the
//! [`coordinator`](crate::coordinator), which runs inside the room actor, so
//! nothing here needs to be thread-safe.

use std::collections::HashSet;

use loto_protocol::{
    PlayerId, PlayerSummary, RoomCode, RoomSettings, RoomStatus, RoomSummary, Ticket,
};
use rand::Rng;

use crate::RoomError;
use crate::pool::NumberPool;
use crate::ticket::generate_tickets;

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A participant holding tickets.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub is_host: bool,
    tickets: Vec<Ticket>,
    /// One set of marked numbers per ticket, parallel to `tickets`.
    marks: Vec<HashSet<u8>>,
}

impl Player {
    pub fn new(id: PlayerId, name: String, is_host: bool, tickets: Vec<Ticket>) -> Self {
        let marks = vec![HashSet::new(); tickets.len()];
        Self {
            id,
            name,
            is_host,
            tickets,
            marks,
        }
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    /// Replaces the player's tickets and clears every mark.
    pub fn deal(&mut self, tickets: Vec<Ticket>) {
        self.marks = vec![HashSet::new(); tickets.len()];
        self.tickets = tickets;
    }

    /// Flips `number` in the mark set of one ticket. Returns `true` if the
    /// number is now marked.
    ///
    /// Marking is the client's own bookkeeping: the number does not have to
    /// be drawn, or even be on the ticket.
    ///
    /// # Errors
    /// Returns [`RoomError::InvalidArgument`] for an unknown ticket index.
    pub fn toggle_mark(&mut self, ticket_index: usize, number: u8) -> Result<bool, RoomError> {
        let marks = self.marks.get_mut(ticket_index).ok_or_else(|| {
            RoomError::InvalidArgument(format!("no ticket #{ticket_index}"))
        })?;
        if marks.remove(&number) {
            Ok(false)
        } else {
            marks.insert(number);
            Ok(true)
        }
    }

    pub fn is_marked(&self, ticket_index: usize, number: u8) -> bool {
        self.marks
            .get(ticket_index)
            .is_some_and(|marks| marks.contains(&number))
    }

    /// Numbers of one row that have not been drawn yet.
    /// `None` if the ticket or row index is out of range.
    pub fn missing_in_row(
        &self,
        ticket_index: usize,
        row_index: usize,
        pool: &NumberPool,
    ) -> Option<Vec<u8>> {
        let row = self.tickets.get(ticket_index)?.row_numbers(row_index)?;
        Some(row.into_iter().filter(|&n| !pool.is_drawn(n)).collect())
    }

    /// Returns `true` if the row has at least one number and every number
    /// in it is both drawn and marked.
    pub fn row_complete(&self, ticket_index: usize, row_index: usize, pool: &NumberPool) -> bool {
        let Some(row) = self
            .tickets
            .get(ticket_index)
            .and_then(|t| t.row_numbers(row_index))
        else {
            return false;
        };
        !row.is_empty()
            && row
                .iter()
                .all(|&n| pool.is_drawn(n) && self.is_marked(ticket_index, n))
    }

    /// Index of a ticket with a complete row, preferring `preferred` when it
    /// qualifies.
    pub fn winning_ticket(&self, pool: &NumberPool, preferred: Option<usize>) -> Option<usize> {
        let ticket_wins =
            |t: usize| (0..Ticket::ROWS).any(|r| self.row_complete(t, r, pool));
        preferred
            .filter(|&t| ticket_wins(t))
            .or_else(|| (0..self.tickets.len()).find(|&t| ticket_wins(t)))
    }

    /// First row, in ticket then row order, with exactly one undrawn number.
    /// Returns that number.
    pub fn first_single_missing(&self, pool: &NumberPool) -> Option<u8> {
        (0..self.tickets.len())
            .flat_map(|t| (0..Ticket::ROWS).map(move |r| (t, r)))
            .find_map(|(t, r)| match self.missing_in_row(t, r, pool)?.as_slice() {
                [only] => Some(*only),
                _ => None,
            })
    }

    pub fn summary(&self) -> PlayerSummary {
        PlayerSummary {
            id: self.id,
            name: self.name.clone(),
            is_host: self.is_host,
        }
    }
}

// ---------------------------------------------------------------------------
// NearWinDeclaration
// ---------------------------------------------------------------------------

/// A player's claim that one row is close to completion.
///
/// `missing` is a snapshot taken at declaration time. It is not kept in sync
/// with later draws; the declaration is simply dropped once any of its
/// numbers comes out, or when the game resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearWinDeclaration {
    pub player_id: PlayerId,
    pub player_name: String,
    pub ticket_index: usize,
    pub row_index: usize,
    pub missing: Vec<u8>,
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// Everything one room knows. The unit of mutual exclusion.
#[derive(Debug, Clone)]
pub struct RoomState {
    pub(crate) code: RoomCode,
    pub(crate) host_id: PlayerId,
    pub(crate) host_name: String,
    pub(crate) settings: RoomSettings,
    pub(crate) status: RoomStatus,
    /// In join order.
    pub(crate) players: Vec<Player>,
    pub(crate) pool: NumberPool,
    /// In declaration order; at most one per player.
    pub(crate) declarations: Vec<NearWinDeclaration>,
    /// Winner of the current game and their winning ticket.
    pub(crate) winner: Option<(PlayerId, usize)>,
}

impl RoomState {
    /// A new `waiting` room. When the host plays, they are dealt tickets
    /// and become the first player.
    pub fn new<R: Rng + ?Sized>(
        code: RoomCode,
        host_id: PlayerId,
        host_name: String,
        settings: RoomSettings,
        rng: &mut R,
    ) -> Self {
        let mut players = Vec::new();
        if settings.host_plays {
            let tickets = generate_tickets(usize::from(settings.tickets_per_player), rng);
            players.push(Player::new(host_id, host_name.clone(), true, tickets));
        }
        Self {
            code,
            host_id,
            host_name,
            settings,
            status: RoomStatus::Waiting,
            players,
            pool: NumberPool::new(),
            declarations: Vec::new(),
            winner: None,
        }
    }

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    pub fn host_id(&self) -> PlayerId {
        self.host_id
    }

    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn pool(&self) -> &NumberPool {
        &self.pool
    }

    pub fn drawn(&self) -> &[u8] {
        self.pool.sequence()
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn declarations(&self) -> &[NearWinDeclaration] {
        &self.declarations
    }

    pub fn winner(&self) -> Option<(PlayerId, usize)> {
        self.winner
    }

    pub fn is_host(&self, id: PlayerId) -> bool {
        self.host_id == id
    }

    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == id)
    }

    pub(crate) fn player_mut(&mut self, id: PlayerId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn declaration(&self, id: PlayerId) -> Option<&NearWinDeclaration> {
        self.declarations.iter().find(|d| d.player_id == id)
    }

    /// Stores a declaration, replacing the player's previous one in place.
    pub(crate) fn upsert_declaration(&mut self, declaration: NearWinDeclaration) {
        match self
            .declarations
            .iter_mut()
            .find(|d| d.player_id == declaration.player_id)
        {
            Some(existing) => *existing = declaration,
            None => self.declarations.push(declaration),
        }
    }

    /// Players other than the host.
    pub fn guest_count(&self) -> usize {
        self.players.iter().filter(|p| !p.is_host).count()
    }

    /// Whether there is at least one ticket holder to play for.
    pub fn has_participants(&self) -> bool {
        self.guest_count() > 0 || self.settings.host_plays
    }

    pub fn player_list(&self) -> Vec<PlayerSummary> {
        self.players.iter().map(Player::summary).collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.clone(),
            host_name: self.host_name.clone(),
            player_count: self.players.len(),
            tickets_per_player: self.settings.tickets_per_player,
            spin_duration: self.settings.spin_duration,
            host_plays: self.settings.host_plays,
            status: self.status,
        }
    }
}
