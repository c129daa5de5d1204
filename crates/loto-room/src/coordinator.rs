//! Room transitions: one function per action, all synchronous.
//!
//! Every transition takes the room state and the caller, checks its
//! preconditions, and only then mutates. It returns the events to deliver,
//! each paired with a [`Recipient`], plus a [`RoomEffect`] telling the
//! registry whether the public room listing or the room itself changed.
//! Delivery is the actor's job.

use loto_protocol::{ClientAction, DramaticSpin, PlayerId, Recipient, RoomStatus, ServerEvent};
use rand::Rng;

use crate::RoomError;
use crate::config::{DEFAULT_HOST_NAME, DEFAULT_PLAYER_NAME, StatusExt, normalize_name};
use crate::state::{NearWinDeclaration, Player, RoomState};
use crate::ticket::generate_tickets;

/// Largest number of missing numbers a near-win declaration may carry.
pub const MAX_NEAR_WIN_MISSING: usize = 3;

/// Outbound events, each with the recipients it goes to.
pub type Events = Vec<(Recipient, ServerEvent)>;

/// What the registry has to do after a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoomEffect {
    /// Nothing outside the room changed.
    #[default]
    None,
    /// The room's public summary changed; re-broadcast the room list.
    ListingChanged,
    /// The room is gone; unbind every member and drop it.
    Closed,
}

/// Result of a successful transition.
#[derive(Debug, Default)]
pub struct Outcome {
    pub events: Events,
    pub effect: RoomEffect,
}

impl Outcome {
    fn new(events: Events, effect: RoomEffect) -> Self {
        Self { events, effect }
    }

    fn events(events: Events) -> Self {
        Self::new(events, RoomEffect::None)
    }
}

/// Actions handled inside a room.
///
/// Creating, joining by code, and listing rooms are registry concerns; see
/// [`RoomAction::from_client`].
#[derive(Debug, Clone, PartialEq)]
pub enum RoomAction {
    Join { name: Option<String> },
    Leave,
    StartGame,
    DrawNumber,
    ToggleNumber { ticket_index: usize, number: u8 },
    DeclareNearWin { ticket_index: usize, row_index: usize },
    ClaimWin { ticket_index: usize },
    ResetGame,
    DisbandRoom,
    ChangeName { new_name: Option<String> },
}

impl RoomAction {
    /// Converts a client action into a room action. Returns `None` for the
    /// actions the registry answers itself.
    pub fn from_client(action: ClientAction) -> Option<Self> {
        Some(match action {
            ClientAction::CreateRoom { .. }
            | ClientAction::JoinRoom { .. }
            | ClientAction::ListRooms => return None,
            ClientAction::StartGame => Self::StartGame,
            ClientAction::DrawNumber => Self::DrawNumber,
            ClientAction::ToggleNumber {
                ticket_index,
                number,
            } => Self::ToggleNumber {
                ticket_index,
                number,
            },
            ClientAction::DeclareNearWin {
                ticket_index,
                row_index,
            } => Self::DeclareNearWin {
                ticket_index,
                row_index,
            },
            ClientAction::ClaimWin { ticket_index } => Self::ClaimWin { ticket_index },
            ClientAction::ResetGame => Self::ResetGame,
            ClientAction::DisbandRoom => Self::DisbandRoom,
            ClientAction::ChangeName { new_name } => Self::ChangeName { new_name },
        })
    }

    /// Wire name of the action, used in error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join-room",
            Self::Leave => "leave-room",
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

/// Applies one action from `caller` to the room.
///
/// # Errors
/// Any rejection leaves `state` untouched.
pub fn apply<R: Rng + ?Sized>(
    state: &mut RoomState,
    caller: PlayerId,
    action: RoomAction,
    rng: &mut R,
) -> Result<Outcome, RoomError> {
    match action {
        RoomAction::Join { name } => join(state, caller, name.as_deref(), rng),
        RoomAction::Leave => leave(state, caller),
        RoomAction::StartGame => start(state, caller),
        RoomAction::DrawNumber => draw(state, caller, rng),
        RoomAction::ToggleNumber {
            ticket_index,
            number,
        } => toggle(state, caller, ticket_index, number),
        RoomAction::DeclareNearWin {
            ticket_index,
            row_index,
        } => declare_near_win(state, caller, ticket_index, row_index),
        RoomAction::ClaimWin { ticket_index } => claim_win(state, caller, ticket_index),
        RoomAction::ResetGame => reset(state, caller, rng),
        RoomAction::DisbandRoom => disband(state, caller),
        RoomAction::ChangeName { new_name } => change_name(state, caller, new_name.as_deref()),
    }
}

/// The event the creator receives once the room exists.
pub fn created_event(state: &RoomState) -> ServerEvent {
    ServerEvent::RoomCreated {
        code: state.code().clone(),
        settings: *state.settings(),
        tickets: state
            .player(state.host_id())
            .map(|host| host.tickets().to_vec()),
    }
}

// ---------------------------------------------------------------------------
// Precondition helpers
// ---------------------------------------------------------------------------

fn require_host(state: &RoomState, caller: PlayerId, action: &'static str) -> Result<(), RoomError> {
    if state.is_host(caller) {
        Ok(())
    } else {
        Err(RoomError::Unauthorized(action))
    }
}

fn require_status(
    state: &RoomState,
    status: RoomStatus,
    action: &'static str,
) -> Result<(), RoomError> {
    if state.status == status {
        Ok(())
    } else {
        Err(RoomError::WrongPhase {
            action,
            status: state.status,
        })
    }
}

fn require_player(state: &RoomState, caller: PlayerId) -> Result<&Player, RoomError> {
    state.player(caller).ok_or(RoomError::NotAPlayer(caller))
}

// ---------------------------------------------------------------------------
// Membership
// ---------------------------------------------------------------------------

fn join<R: Rng + ?Sized>(
    state: &mut RoomState,
    caller: PlayerId,
    name: Option<&str>,
    rng: &mut R,
) -> Result<Outcome, RoomError> {
    if !state.status.is_joinable() {
        return Err(RoomError::WrongPhase {
            action: "join-room",
            status: state.status,
        });
    }
    if state.is_host(caller) || state.player(caller).is_some() {
        return Err(RoomError::AlreadyInRoom(caller, state.code.clone()));
    }

    let name = normalize_name(name, DEFAULT_PLAYER_NAME);
    let tickets = generate_tickets(usize::from(state.settings.tickets_per_player), rng);
    state
        .players
        .push(Player::new(caller, name.clone(), false, tickets.clone()));
    tracing::info!(room = %state.code, player = %caller, %name, "player joined");

    let players = state.player_list();
    Ok(Outcome::new(
        vec![
            (
                Recipient::Player(caller),
                ServerEvent::RoomJoined {
                    code: state.code.clone(),
                    host_name: state.host_name.clone(),
                    settings: state.settings,
                    tickets,
                    players: players.clone(),
                },
            ),
            (Recipient::All, ServerEvent::PlayerListUpdated { players }),
        ],
        RoomEffect::ListingChanged,
    ))
}

/// A member leaves or drops. The host leaving closes the room.
fn leave(state: &mut RoomState, caller: PlayerId) -> Result<Outcome, RoomError> {
    if state.is_host(caller) {
        tracing::info!(room = %state.code, "host left, closing room");
        return Ok(Outcome::new(
            vec![(
                Recipient::AllExcept(caller),
                ServerEvent::RoomClosed {
                    reason: "the host left the room".into(),
                },
            )],
            RoomEffect::Closed,
        ));
    }

    let index = state
        .players
        .iter()
        .position(|p| p.id == caller)
        .ok_or(RoomError::NotInRoom(caller))?;
    let player = state.players.remove(index);
    state.declarations.retain(|d| d.player_id != caller);
    tracing::info!(room = %state.code, player = %caller, "player left");

    Ok(Outcome::new(
        vec![
            (
                Recipient::All,
                ServerEvent::PlayerListUpdated {
                    players: state.player_list(),
                },
            ),
            (
                Recipient::All,
                ServerEvent::PlayerLeft {
                    player_name: player.name,
                },
            ),
        ],
        RoomEffect::ListingChanged,
    ))
}

fn change_name(
    state: &mut RoomState,
    caller: PlayerId,
    new_name: Option<&str>,
) -> Result<Outcome, RoomError> {
    require_status(state, RoomStatus::Waiting, "change-name")?;

    let fallback = if state.is_host(caller) {
        DEFAULT_HOST_NAME
    } else {
        DEFAULT_PLAYER_NAME
    };
    let name = normalize_name(new_name, fallback);
    if let Some(player) = state.player_mut(caller) {
        player.name = name.clone();
    }
    if state.is_host(caller) {
        state.host_name = name.clone();
    }
    tracing::debug!(room = %state.code, player = %caller, %name, "name changed");

    Ok(Outcome::new(
        vec![(
            Recipient::All,
            ServerEvent::PlayerListUpdated {
                players: state.player_list(),
            },
        )],
        RoomEffect::ListingChanged,
    ))
}

fn disband(state: &mut RoomState, caller: PlayerId) -> Result<Outcome, RoomError> {
    require_host(state, caller, "disband-room")?;
    tracing::info!(room = %state.code, "room disbanded");
    Ok(Outcome::new(
        vec![(
            Recipient::All,
            ServerEvent::RoomClosed {
                reason: "the host disbanded the room".into(),
            },
        )],
        RoomEffect::Closed,
    ))
}

// ---------------------------------------------------------------------------
// Game flow
// ---------------------------------------------------------------------------

fn start(state: &mut RoomState, caller: PlayerId) -> Result<Outcome, RoomError> {
    require_host(state, caller, "start-game")?;
    if !state.status.can_transition_to(RoomStatus::Playing) {
        return Err(RoomError::WrongPhase {
            action: "start-game",
            status: state.status,
        });
    }
    if !state.has_participants() {
        return Err(RoomError::InvalidArgument(
            "at least one player must hold tickets".into(),
        ));
    }

    state.status = RoomStatus::Playing;
    tracing::info!(room = %state.code, players = state.players.len(), "game started");
    Ok(Outcome::new(
        vec![(Recipient::All, ServerEvent::GameStarted)],
        RoomEffect::ListingChanged,
    ))
}

fn draw<R: Rng + ?Sized>(
    state: &mut RoomState,
    caller: PlayerId,
    rng: &mut R,
) -> Result<Outcome, RoomError> {
    require_host(state, caller, "draw-number")?;
    require_status(state, RoomStatus::Playing, "draw-number")?;

    match state.pool.draw(rng) {
        Ok(number) => Ok(after_draw(state, number)),
        Err(RoomError::Exhausted) => {
            state.status = RoomStatus::Finished;
            tracing::info!(room = %state.code, "pool exhausted, game finished");
            Ok(Outcome::events(vec![(
                Recipient::All,
                ServerEvent::GameFinished {
                    reason: "all numbers have been drawn".into(),
                },
            )]))
        }
        Err(err) => Err(err),
    }
}

/// Derives everything that follows from `number` coming out. The number
/// must already be recorded in the pool.
///
/// Order: the dramatic-spin check sees the declarations as they stood before
/// the draw; then declarations holding the number are resolved; then
/// players without a declaration who now need one number get a nudge;
/// finally every player is scanned in join order and the first complete
/// row wins.
pub(crate) fn after_draw(state: &mut RoomState, number: u8) -> Outcome {
    let dramatic_spin = dramatic_spin(&state.declarations, number);
    state.declarations.retain(|d| !d.missing.contains(&number));

    tracing::debug!(
        room = %state.code,
        number,
        remaining = state.pool.remaining(),
        dramatic = dramatic_spin.is_some(),
        "number drawn"
    );

    let mut events = vec![(
        Recipient::All,
        ServerEvent::NumberDrawn {
            number,
            drawn_numbers: state.pool.sequence().to_vec(),
            remaining: state.pool.remaining(),
            spin_duration: state.settings.spin_duration,
            dramatic_spin,
        },
    )];

    for player in &state.players {
        if state.declaration(player.id).is_some() {
            continue;
        }
        if let Some(missing_number) = player.first_single_missing(&state.pool) {
            events.push((
                Recipient::All,
                ServerEvent::NearWinNudge {
                    player_name: player.name.clone(),
                    missing_number,
                },
            ));
        }
    }

    let winner = state
        .players
        .iter()
        .find_map(|p| p.winning_ticket(&state.pool, None).map(|t| (p.id, t)));
    match winner {
        Some((id, ticket_index)) => {
            let won = declare_winner(state, id, ticket_index);
            events.extend(won.events);
            Outcome::new(events, won.effect)
        }
        None => Outcome::events(events),
    }
}

/// Two or more single-number declarations must be waiting on the drawn
/// number's decade for the spin to be dramatic. Decades are `n / 10`, so 90
/// sits alone in its own.
fn dramatic_spin(declarations: &[NearWinDeclaration], number: u8) -> Option<DramaticSpin> {
    let decade = number / 10;
    let singles: Vec<(&str, u8)> = declarations
        .iter()
        .filter_map(|d| match d.missing.as_slice() {
            [only] => Some((d.player_name.as_str(), *only)),
            _ => None,
        })
        .collect();
    if singles.len() < 2 {
        return None;
    }
    let player_names: Vec<String> = singles
        .into_iter()
        .filter(|(_, missing)| missing / 10 == decade)
        .map(|(name, _)| name.to_string())
        .collect();
    (player_names.len() >= 2).then(|| DramaticSpin {
        decade: decade * 10,
        player_names,
    })
}

fn toggle(
    state: &mut RoomState,
    caller: PlayerId,
    ticket_index: usize,
    number: u8,
) -> Result<Outcome, RoomError> {
    let player = state
        .player_mut(caller)
        .ok_or(RoomError::NotAPlayer(caller))?;
    let marked = player.toggle_mark(ticket_index, number)?;
    tracing::trace!(player = %caller, ticket_index, number, marked, "mark toggled");

    if state.status != RoomStatus::Playing {
        return Ok(Outcome::default());
    }
    let winning = state
        .player(caller)
        .and_then(|p| p.winning_ticket(&state.pool, Some(ticket_index)));
    Ok(match winning {
        Some(t) => declare_winner(state, caller, t),
        None => Outcome::default(),
    })
}

fn declare_near_win(
    state: &mut RoomState,
    caller: PlayerId,
    ticket_index: usize,
    row_index: usize,
) -> Result<Outcome, RoomError> {
    require_status(state, RoomStatus::Playing, "declare-near-loto")?;
    let player = require_player(state, caller)?;
    let missing = player
        .missing_in_row(ticket_index, row_index, &state.pool)
        .ok_or_else(|| {
            RoomError::InvalidArgument(format!("no row {row_index} on ticket #{ticket_index}"))
        })?;
    if missing.is_empty() || missing.len() > MAX_NEAR_WIN_MISSING {
        return Err(RoomError::InvalidArgument(format!(
            "row has {} numbers left; a near win needs 1 to {MAX_NEAR_WIN_MISSING}",
            missing.len()
        )));
    }

    let player_name = player.name.clone();
    state.upsert_declaration(NearWinDeclaration {
        player_id: caller,
        player_name: player_name.clone(),
        ticket_index,
        row_index,
        missing: missing.clone(),
    });
    tracing::info!(room = %state.code, player = %caller, ?missing, "near win declared");

    Ok(Outcome::events(vec![(
        Recipient::All,
        ServerEvent::NearWinDeclared {
            player_name,
            missing_numbers: missing,
            ticket_index,
        },
    )]))
}

fn claim_win(
    state: &mut RoomState,
    caller: PlayerId,
    ticket_index: usize,
) -> Result<Outcome, RoomError> {
    match state.status {
        RoomStatus::Finished => {
            tracing::debug!(room = %state.code, player = %caller, "claim after finish ignored");
            return Ok(Outcome::default());
        }
        RoomStatus::Waiting => {
            return Err(RoomError::WrongPhase {
                action: "claim-loto",
                status: state.status,
            });
        }
        RoomStatus::Playing => {}
    }
    let player = require_player(state, caller)?;
    let winning = player
        .winning_ticket(&state.pool, Some(ticket_index))
        .ok_or_else(|| RoomError::InvalidArgument("no completed row to claim".into()))?;
    Ok(declare_winner(state, caller, winning))
}

/// Ends the game in `winner`'s favour.
fn declare_winner(state: &mut RoomState, winner: PlayerId, ticket_index: usize) -> Outcome {
    state.status = RoomStatus::Finished;
    state.winner = Some((winner, ticket_index));
    let player_name = state
        .player(winner)
        .map(|p| p.name.clone())
        .unwrap_or_default();
    tracing::info!(room = %state.code, player = %winner, ticket_index, "game won");
    Outcome::new(
        vec![(
            Recipient::All,
            ServerEvent::GameWon {
                player_name,
                ticket_index,
            },
        )],
        RoomEffect::ListingChanged,
    )
}

fn reset<R: Rng + ?Sized>(
    state: &mut RoomState,
    caller: PlayerId,
    rng: &mut R,
) -> Result<Outcome, RoomError> {
    require_host(state, caller, "reset-game")?;
    if !state.status.can_transition_to(RoomStatus::Waiting) {
        return Err(RoomError::WrongPhase {
            action: "reset-game",
            status: state.status,
        });
    }

    state.status = RoomStatus::Waiting;
    state.pool = Default::default();
    state.declarations.clear();
    state.winner = None;

    let count = usize::from(state.settings.tickets_per_player);
    let mut events = Vec::with_capacity(state.players.len() + 1);
    for player in &mut state.players {
        let tickets = generate_tickets(count, rng);
        player.deal(tickets.clone());
        events.push((
            Recipient::Player(player.id),
            ServerEvent::TicketsRefreshed { tickets },
        ));
    }
    events.push((
        Recipient::All,
        ServerEvent::BackToLobby {
            code: state.code.clone(),
            players: state.player_list(),
        },
    ));
    tracing::info!(room = %state.code, "game reset");

    Ok(Outcome::new(events, RoomEffect::ListingChanged))
}
