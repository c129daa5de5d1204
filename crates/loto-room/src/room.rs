//! Room actor: one Tokio task per room, owning its [`RoomState`].
//!
//! Every command for a room goes through its channel and is applied in
//! arrival order, so each transition sees the result of the one before it.
//! Rooms never share state with each other.

use std::collections::HashMap;

use loto_protocol::{PlayerId, Recipient, RoomCode, RoomSummary, ServerEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::sync::{mpsc, oneshot};

use crate::RoomError;
use crate::coordinator::{self, Events, RoomAction, RoomEffect};
use crate::state::RoomState;

/// Channel for delivering events to one connection.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// What the actor reports after a command succeeds.
#[derive(Debug, Clone)]
pub struct RoomReply {
    pub effect: RoomEffect,
    /// Public summary after the command.
    pub summary: RoomSummary,
    /// Position of the command in the actor's sequence, starting at 1.
    /// Replies can reach the registry out of order; the highest revision
    /// carries the current summary.
    pub revision: u64,
    /// Every connection bound to the room before the command ran.
    /// Only filled in when the room closes.
    pub members: Vec<PlayerId>,
}

pub(crate) enum RoomCommand {
    Join {
        player_id: PlayerId,
        name: Option<String>,
        sender: EventSender,
        reply: oneshot::Sender<Result<RoomReply, RoomError>>,
    },
    Act {
        caller: PlayerId,
        action: RoomAction,
        reply: oneshot::Sender<Result<RoomReply, RoomError>>,
    },
    Summary {
        reply: oneshot::Sender<RoomSummary>,
    },
}

/// Handle to a running room actor. Cheap to clone.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Returns `true` if both handles drive the same actor. A code can be
    /// reused once its room has closed.
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        self.sender.same_channel(&other.sender)
    }

    /// Adds a connection to the room as a new player.
    pub async fn join(
        &self,
        player_id: PlayerId,
        name: Option<String>,
        sender: EventSender,
    ) -> Result<RoomReply, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Join {
            player_id,
            name,
            sender,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Applies an action on behalf of a member.
    pub async fn act(&self, caller: PlayerId, action: RoomAction) -> Result<RoomReply, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Act {
            caller,
            action,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Removes a member. If it was the host, the room closes.
    pub async fn leave(&self, player_id: PlayerId) -> Result<RoomReply, RoomError> {
        self.act(player_id, RoomAction::Leave).await
    }

    pub async fn summary(&self) -> Result<RoomSummary, RoomError> {
        let (reply, rx) = oneshot::channel();
        self.send(RoomCommand::Summary { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    async fn send(&self, cmd: RoomCommand) -> Result<(), RoomError> {
        self.sender.send(cmd).await.map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> RoomError {
        RoomError::Unavailable(self.code.clone())
    }
}

struct RoomActor {
    state: RoomState,
    /// Outbound channel per member connection, the host included.
    senders: HashMap<PlayerId, EventSender>,
    rng: StdRng,
    /// Successful commands applied so far.
    revision: u64,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    async fn run(mut self) {
        tracing::info!(room = %self.state.code(), "room actor started");

        while let Some(cmd) = self.receiver.recv().await {
            let closed = match cmd {
                RoomCommand::Join {
                    player_id,
                    name,
                    sender,
                    reply,
                } => {
                    let result = self.handle_join(player_id, name, sender);
                    let _ = reply.send(result);
                    false
                }
                RoomCommand::Act {
                    caller,
                    action,
                    reply,
                } => {
                    let result = self.handle_act(caller, action);
                    let closed = matches!(
                        result,
                        Ok(RoomReply {
                            effect: RoomEffect::Closed,
                            ..
                        })
                    );
                    let _ = reply.send(result);
                    closed
                }
                RoomCommand::Summary { reply } => {
                    let _ = reply.send(self.state.summary());
                    false
                }
            };
            if closed {
                break;
            }
        }

        tracing::info!(room = %self.state.code(), "room actor stopped");
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        name: Option<String>,
        sender: EventSender,
    ) -> Result<RoomReply, RoomError> {
        let outcome = coordinator::apply(
            &mut self.state,
            player_id,
            RoomAction::Join { name },
            &mut self.rng,
        )?;
        self.senders.insert(player_id, sender);
        self.dispatch(outcome.events);
        Ok(self.reply(outcome.effect, Vec::new()))
    }

    fn handle_act(&mut self, caller: PlayerId, action: RoomAction) -> Result<RoomReply, RoomError> {
        if !self.senders.contains_key(&caller) {
            tracing::warn!(room = %self.state.code(), player = %caller, "action from non-member");
            return Err(RoomError::NotInRoom(caller));
        }
        let leaving = matches!(action, RoomAction::Leave);
        let outcome = coordinator::apply(&mut self.state, caller, action, &mut self.rng)?;

        let members = if outcome.effect == RoomEffect::Closed {
            self.senders.keys().copied().collect()
        } else {
            Vec::new()
        };
        if leaving {
            self.senders.remove(&caller);
        }
        self.dispatch(outcome.events);
        Ok(self.reply(outcome.effect, members))
    }

    fn reply(&mut self, effect: RoomEffect, members: Vec<PlayerId>) -> RoomReply {
        self.revision += 1;
        RoomReply {
            effect,
            summary: self.state.summary(),
            revision: self.revision,
            members,
        }
    }

    fn dispatch(&self, events: Events) {
        for (recipient, event) in events {
            match recipient {
                Recipient::All => {
                    for sender in self.senders.values() {
                        let _ = sender.send(event.clone());
                    }
                }
                Recipient::Player(id) => self.send_to(id, event),
                Recipient::AllExcept(excluded) => {
                    for (id, sender) in &self.senders {
                        if *id != excluded {
                            let _ = sender.send(event.clone());
                        }
                    }
                }
            }
        }
    }

    /// Drops the event if the connection is gone.
    fn send_to(&self, id: PlayerId, event: ServerEvent) {
        if let Some(sender) = self.senders.get(&id) {
            let _ = sender.send(event);
        }
    }
}

/// Spawns the actor for a freshly created room. `host_sender` becomes the
/// room's first member connection.
pub(crate) fn spawn_room(
    state: RoomState,
    host_sender: EventSender,
    channel_size: usize,
) -> RoomHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let code = state.code().clone();
    let mut senders = HashMap::new();
    senders.insert(state.host_id(), host_sender);

    let actor = RoomActor {
        state,
        senders,
        rng: StdRng::from_os_rng(),
        revision: 0,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}

#[cfg(test)]
mod tests {
    use loto_protocol::{RoomSettings, RoomStatus};

    use super::*;

    fn spawn(host_plays: bool) -> (RoomHandle, mpsc::UnboundedReceiver<ServerEvent>) {
        let mut rng = StdRng::seed_from_u64(5);
        let settings = RoomSettings::clamped(None, host_plays, None);
        let state = RoomState::new(RoomCode("ROOM".into()), PlayerId(1), "Host".into(), settings, &mut rng);
        let (tx, rx) = mpsc::unbounded_channel();
        (spawn_room(state, tx, 8), rx)
    }

    #[tokio::test]
    async fn test_join_delivers_room_joined_then_player_list() {
        let (handle, mut host_rx) = spawn(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let reply = handle.join(PlayerId(2), Some("Lan".into()), tx).await.unwrap();
        assert_eq!(reply.effect, RoomEffect::ListingChanged);
        assert_eq!(reply.summary.player_count, 1);

        assert!(matches!(rx.recv().await, Some(ServerEvent::RoomJoined { .. })));
        assert!(matches!(rx.recv().await, Some(ServerEvent::PlayerListUpdated { .. })));
        assert!(matches!(host_rx.recv().await, Some(ServerEvent::PlayerListUpdated { .. })));
    }

    #[tokio::test]
    async fn test_actions_from_non_members_are_rejected() {
        let (handle, _host_rx) = spawn(true);
        let err = handle.act(PlayerId(7), RoomAction::StartGame).await.unwrap_err();
        assert!(matches!(err, RoomError::NotInRoom(PlayerId(7))));
    }

    #[tokio::test]
    async fn test_host_leaving_stops_actor() {
        let (handle, _host_rx) = spawn(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        handle.join(PlayerId(2), None, tx).await.unwrap();

        let reply = handle.leave(PlayerId(1)).await.unwrap();
        assert_eq!(reply.effect, RoomEffect::Closed);
        let mut members = reply.members.clone();
        members.sort_by_key(|p| p.0);
        assert_eq!(members, vec![PlayerId(1), PlayerId(2)]);

        // RoomJoined, PlayerListUpdated, then the close notice.
        rx.recv().await.unwrap();
        rx.recv().await.unwrap();
        assert!(matches!(rx.recv().await, Some(ServerEvent::RoomClosed { .. })));

        assert!(matches!(handle.summary().await, Err(RoomError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_revisions_count_successful_commands() {
        let (handle, _host_rx) = spawn(true);
        let (tx, _rx) = mpsc::unbounded_channel();
        let joined = handle.join(PlayerId(2), None, tx).await.unwrap();
        assert_eq!(joined.revision, 1);

        // A rejection does not advance the sequence.
        handle.act(PlayerId(2), RoomAction::StartGame).await.unwrap_err();
        let started = handle.act(PlayerId(1), RoomAction::StartGame).await.unwrap();
        assert_eq!(started.revision, 2);
    }

    #[tokio::test]
    async fn test_same_room() {
        let (handle, _host_rx) = spawn(true);
        let (other, _other_rx) = spawn(true);
        assert!(handle.same_room(&handle.clone()));
        assert!(!handle.same_room(&other));
    }

    #[tokio::test]
    async fn test_summary_tracks_status() {
        let (handle, _host_rx) = spawn(true);
        handle.act(PlayerId(1), RoomAction::StartGame).await.unwrap();
        let summary = handle.summary().await.unwrap();
        assert_eq!(summary.status, RoomStatus::Playing);
    }
}
