//! Error types for the room layer.

use loto_protocol::{PlayerId, RoomCode, RoomStatus};

/// Errors that can occur during room operations.
///
/// Every rejection is raised before any state is touched, so a failed
/// action leaves the room exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The action is not valid in the room's current status,
    /// e.g. joining a started game or drawing before the start.
    #[error("cannot {action} while the room is {status}")]
    WrongPhase {
        action: &'static str,
        status: RoomStatus,
    },

    /// A host-only action was attempted by someone else.
    #[error("only the host can {0}")]
    Unauthorized(&'static str),

    /// An index or value in the request is out of range, or the request
    /// does not hold up against the room's state.
    #[error("invalid request: {0}")]
    InvalidArgument(String),

    /// Every number from 1 to 90 has been drawn.
    #[error("no numbers left to draw")]
    Exhausted,

    /// The caller is in the room but holds no tickets (a non-playing host).
    #[error("{0} has no tickets in this room")]
    NotAPlayer(PlayerId),

    /// The caller is not in any room.
    #[error("{0} is not in a room")]
    NotInRoom(PlayerId),

    /// The caller is already in a room and must leave it first.
    #[error("{0} is already in room {1}")]
    AlreadyInRoom(PlayerId, RoomCode),

    /// The room's command channel is full or closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}

/// Coarse classification of a [`RoomError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    WrongPhase,
    Unauthorized,
    InvalidArgument,
    Exhausted,
}

impl RoomError {
    /// Maps the error onto its kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::Unavailable(_) => ErrorKind::NotFound,
            Self::WrongPhase { .. } | Self::AlreadyInRoom(..) => ErrorKind::WrongPhase,
            Self::Unauthorized(_) | Self::NotAPlayer(_) | Self::NotInRoom(_) => {
                ErrorKind::Unauthorized
            }
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Exhausted => ErrorKind::Exhausted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_human_readable() {
        let err = RoomError::WrongPhase {
            action: "join-room",
            status: RoomStatus::Playing,
        };
        assert_eq!(err.to_string(), "cannot join-room while the room is playing");
        assert_eq!(
            RoomError::Unauthorized("draw-number").to_string(),
            "only the host can draw-number"
        );
        assert_eq!(
            RoomError::NotFound(RoomCode("ZZZZ".into())).to_string(),
            "room ZZZZ not found"
        );
    }

    #[test]
    fn test_kinds() {
        assert_eq!(RoomError::Exhausted.kind(), ErrorKind::Exhausted);
        assert_eq!(
            RoomError::NotAPlayer(PlayerId(1)).kind(),
            ErrorKind::Unauthorized
        );
        assert_eq!(
            RoomError::InvalidArgument("x".into()).kind(),
            ErrorKind::InvalidArgument
        );
    }
}
