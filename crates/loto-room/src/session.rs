//! Connection sessions: who is connected and which room they sit in.
//!
//! `SessionTable` is a plain `HashMap` with no locking of its own. The
//! registry owns it behind its mutex.

use std::collections::HashMap;

use loto_protocol::{PlayerId, RoomCode, ServerEvent};

use crate::room::EventSender;

/// The server's record of one live connection.
#[derive(Debug, Clone)]
pub struct Session {
    pub player_id: PlayerId,
    /// Outbound channel to the connection's writer.
    pub sender: EventSender,
    /// The room this connection is bound to, if any. At most one.
    pub room: Option<RoomCode>,
}

impl Session {
    pub fn new(player_id: PlayerId, sender: EventSender) -> Self {
        Self {
            player_id,
            sender,
            room: None,
        }
    }

    /// Queues an event for this connection. Dropped silently if the
    /// connection is already gone.
    pub fn send(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}

/// All live sessions, keyed by player ID.
#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<PlayerId, Session>,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, session: Session) {
        tracing::debug!(player = %session.player_id, "session opened");
        self.sessions.insert(session.player_id, session);
    }

    /// Removes the session and returns it, room binding included.
    pub fn remove(&mut self, player_id: PlayerId) -> Option<Session> {
        let session = self.sessions.remove(&player_id);
        if session.is_some() {
            tracing::debug!(player = %player_id, "session closed");
        }
        session
    }

    pub fn get(&self, player_id: PlayerId) -> Option<&Session> {
        self.sessions.get(&player_id)
    }

    /// Room the player is bound to.
    pub fn room_of(&self, player_id: PlayerId) -> Option<&RoomCode> {
        self.sessions.get(&player_id)?.room.as_ref()
    }

    /// Binds the player to `code`. Returns `false` if the session is gone.
    pub fn bind(&mut self, player_id: PlayerId, code: RoomCode) -> bool {
        match self.sessions.get_mut(&player_id) {
            Some(session) => {
                session.room = Some(code);
                true
            }
            None => false,
        }
    }

    /// Clears the room binding of every listed player still bound to `code`.
    pub fn unbind_all(&mut self, code: &RoomCode, players: &[PlayerId]) {
        for id in players {
            if let Some(session) = self.sessions.get_mut(id) {
                if session.room.as_ref() == Some(code) {
                    session.room = None;
                }
            }
        }
    }

    /// Sends `event` to every connected session.
    pub fn broadcast(&self, event: &ServerEvent) {
        for session in self.sessions.values() {
            session.send(event.clone());
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
