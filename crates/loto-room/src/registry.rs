//! Room registry: creates rooms, routes connections to them, and keeps
//! the public room listing.
//!
//! The registry lock guards only the code → room map and the session
//! table. It is never held while waiting on a room actor, so a slow room
//! cannot stall lookups or other rooms.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use loto_protocol::{
    ClientAction, PlayerId, RoomCode, RoomSettings, RoomStatus, RoomSummary, ServerEvent,
};
use rand::Rng;
use rand::seq::IndexedRandom;
use tokio::sync::Mutex;

use crate::RoomError;
use crate::config::{DEFAULT_HOST_NAME, RegistryConfig, normalize_name};
use crate::coordinator::{self, RoomAction, RoomEffect};
use crate::room::{EventSender, RoomHandle, RoomReply, spawn_room};
use crate::session::{Session, SessionTable};
use crate::state::RoomState;

/// Characters used in room codes. No 0/O or 1/I.
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
/// Length of a room code.
pub const CODE_LEN: usize = 4;

struct RoomEntry {
    handle: RoomHandle,
    /// Newest summary reported by the actor.
    summary: RoomSummary,
    /// Revision `summary` came from. 0 until the first reply.
    revision: u64,
}

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomCode, RoomEntry>,
    sessions: SessionTable,
}

impl Inner {
    fn listing(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self
            .rooms
            .values()
            .filter(|entry| entry.summary.status == RoomStatus::Waiting)
            .map(|entry| entry.summary.clone())
            .collect();
        rooms.sort_by(|a, b| a.code.cmp(&b.code));
        rooms
    }

    fn broadcast_listing(&self) {
        self.sessions
            .broadcast(&ServerEvent::RoomList { rooms: self.listing() });
    }

    /// The live entry for `handle`'s room. `None` once that room has closed,
    /// even if a new room has since taken the code.
    fn entry_mut(&mut self, handle: &RoomHandle) -> Option<&mut RoomEntry> {
        self.rooms
            .get_mut(handle.code())
            .filter(|entry| entry.handle.same_room(handle))
    }

    /// Folds an actor reply back into the maps. Replies from one room may
    /// arrive in any order; a summary only replaces an older one.
    fn apply_reply(&mut self, handle: &RoomHandle, reply: RoomReply) {
        let code = handle.code();
        match reply.effect {
            RoomEffect::Closed => {
                if self.entry_mut(handle).is_none() {
                    return;
                }
                self.rooms.remove(code);
                self.sessions.unbind_all(code, &reply.members);
                tracing::info!(room = %code, rooms = self.rooms.len(), "room closed");
                self.broadcast_listing();
            }
            effect => {
                let Some(entry) = self.entry_mut(handle) else {
                    return;
                };
                if reply.revision > entry.revision {
                    entry.summary = reply.summary;
                    entry.revision = reply.revision;
                } else {
                    tracing::debug!(
                        room = %code,
                        revision = reply.revision,
                        "stale room summary ignored"
                    );
                }
                if effect == RoomEffect::ListingChanged {
                    self.broadcast_listing();
                }
            }
        }
    }

    fn unused_code<R: Rng + ?Sized>(&self, rng: &mut R) -> RoomCode {
        loop {
            let code = random_code(rng);
            if !self.rooms.contains_key(&code) {
                return code;
            }
        }
    }
}

/// Entry point for everything a connection can ask for.
///
/// Cheap to share: wrap it in an `Arc` and hand a clone to each connection
/// handler.
pub struct RoomRegistry {
    inner: Mutex<Inner>,
    next_player: AtomicU64,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            next_player: AtomicU64::new(1),
            config,
        }
    }

    /// Registers a new connection and sends it the current room list.
    pub async fn connect(&self, sender: EventSender) -> PlayerId {
        let player_id = PlayerId(self.next_player.fetch_add(1, Ordering::Relaxed));
        let mut inner = self.inner.lock().await;
        let session = Session::new(player_id, sender);
        session.send(ServerEvent::RoomList {
            rooms: inner.listing(),
        });
        inner.sessions.insert(session);
        tracing::info!(player = %player_id, connections = inner.sessions.len(), "connected");
        player_id
    }

    /// Forgets a connection. If it was in a room it leaves that room; a
    /// departing host closes it.
    pub async fn disconnect(&self, player_id: PlayerId) {
        let handle = {
            let mut inner = self.inner.lock().await;
            let Some(session) = inner.sessions.remove(player_id) else {
                return;
            };
            tracing::info!(player = %player_id, "disconnected");
            session
                .room
                .and_then(|code| inner.rooms.get(&code).map(|e| e.handle.clone()))
        };
        if let Some(handle) = handle {
            match handle.leave(player_id).await {
                Ok(reply) => self.apply_reply(&handle, reply).await,
                Err(err) => {
                    tracing::debug!(player = %player_id, error = %err, "leave on disconnect failed")
                }
            }
        }
    }

    /// Handles one client action from `player_id`.
    ///
    /// # Errors
    /// Returns the rejection to report back to that client. Rejections
    /// leave every room unchanged.
    pub async fn dispatch(&self, player_id: PlayerId, action: ClientAction) -> Result<(), RoomError> {
        tracing::debug!(player = %player_id, action = action.name(), "dispatch");
        match action {
            ClientAction::CreateRoom {
                host_name,
                tickets_per_player,
                host_plays,
                spin_duration,
            } => {
                let settings = RoomSettings::clamped(tickets_per_player, host_plays, spin_duration);
                let name = normalize_name(host_name.as_deref(), DEFAULT_HOST_NAME);
                self.create_room(player_id, name, settings).await.map(|_| ())
            }
            ClientAction::JoinRoom { code, player_name } => {
                self.join_room(player_id, &code, player_name).await
            }
            ClientAction::ListRooms => {
                let inner = self.inner.lock().await;
                if let Some(session) = inner.sessions.get(player_id) {
                    session.send(ServerEvent::RoomList {
                        rooms: inner.listing(),
                    });
                }
                Ok(())
            }
            other => {
                let name = other.name();
                let action = RoomAction::from_client(other).ok_or_else(|| {
                    RoomError::InvalidArgument(format!("{name} is not a room action"))
                })?;
                self.act(player_id, action).await
            }
        }
    }

    /// Creates a room hosted by `host` and returns its code.
    pub async fn create_room(
        &self,
        host: PlayerId,
        host_name: String,
        settings: RoomSettings,
    ) -> Result<RoomCode, RoomError> {
        let mut inner = self.inner.lock().await;
        let session = inner.sessions.get(host).ok_or(RoomError::NotInRoom(host))?;
        if let Some(current) = &session.room {
            return Err(RoomError::AlreadyInRoom(host, current.clone()));
        }
        let sender = session.sender.clone();

        let state = {
            let mut rng = rand::rng();
            let code = inner.unused_code(&mut rng);
            RoomState::new(code, host, host_name, settings, &mut rng)
        };
        let code = state.code().clone();
        let summary = state.summary();
        let _ = sender.send(coordinator::created_event(&state));

        let handle = spawn_room(state, sender, self.config.channel_size);
        inner.rooms.insert(
            code.clone(),
            RoomEntry {
                handle,
                summary,
                revision: 0,
            },
        );
        inner.sessions.bind(host, code.clone());
        tracing::info!(room = %code, host = %host, rooms = inner.rooms.len(), "room created");

        inner.broadcast_listing();
        Ok(code)
    }

    async fn join_room(
        &self,
        player_id: PlayerId,
        raw_code: &str,
        name: Option<String>,
    ) -> Result<(), RoomError> {
        let code = RoomCode::normalized(raw_code);
        let (handle, sender) = {
            let inner = self.inner.lock().await;
            let session = inner
                .sessions
                .get(player_id)
                .ok_or(RoomError::NotInRoom(player_id))?;
            if let Some(current) = &session.room {
                return Err(RoomError::AlreadyInRoom(player_id, current.clone()));
            }
            let entry = inner
                .rooms
                .get(&code)
                .ok_or_else(|| RoomError::NotFound(code.clone()))?;
            (entry.handle.clone(), session.sender.clone())
        };

        let reply = handle.join(player_id, name, sender).await?;

        let mut inner = self.inner.lock().await;
        if inner.entry_mut(&handle).is_none() {
            // Closed while the join was in flight. The actor already sent
            // this connection the room-closed notice.
            tracing::debug!(room = %code, player = %player_id, "room closed during join");
            return Ok(());
        }
        let bound = inner.sessions.bind(player_id, code.clone());
        inner.apply_reply(&handle, reply);
        drop(inner);

        if !bound {
            // The connection dropped while the room was adding it.
            let reply = handle.leave(player_id).await?;
            self.apply_reply(&handle, reply).await;
        }
        Ok(())
    }

    async fn act(&self, player_id: PlayerId, action: RoomAction) -> Result<(), RoomError> {
        let handle = {
            let inner = self.inner.lock().await;
            let code = inner
                .sessions
                .room_of(player_id)
                .ok_or(RoomError::NotInRoom(player_id))?;
            inner
                .rooms
                .get(code)
                .map(|e| e.handle.clone())
                .ok_or_else(|| RoomError::NotFound(code.clone()))?
        };
        let reply = handle.act(player_id, action).await?;
        self.apply_reply(&handle, reply).await;
        Ok(())
    }

    async fn apply_reply(&self, handle: &RoomHandle, reply: RoomReply) {
        self.inner.lock().await.apply_reply(handle, reply);
    }

    /// Waiting rooms, ordered by code.
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        self.inner.lock().await.listing()
    }

    /// Code of the room `player_id` is in.
    pub async fn room_of(&self, player_id: PlayerId) -> Option<RoomCode> {
        self.inner.lock().await.sessions.room_of(player_id).cloned()
    }

    /// Fresh summary straight from the room actor.
    pub async fn room_summary(&self, code: &RoomCode) -> Result<RoomSummary, RoomError> {
        let handle = {
            let inner = self.inner.lock().await;
            inner
                .rooms
                .get(code)
                .map(|e| e.handle.clone())
                .ok_or_else(|| RoomError::NotFound(code.clone()))?
        };
        handle.summary().await
    }

    pub async fn room_count(&self) -> usize {
        self.inner.lock().await.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

fn random_code<R: Rng + ?Sized>(rng: &mut R) -> RoomCode {
    let code: String = (0..CODE_LEN)
        .filter_map(|_| CODE_ALPHABET.choose(rng).map(|&b| char::from(b)))
        .collect();
    RoomCode(code)
}
