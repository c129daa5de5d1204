//! Registry configuration, name rules, and the status state machine.

use loto_protocol::RoomStatus;

// ---------------------------------------------------------------------------
// RegistryConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`RoomRegistry`](crate::RoomRegistry).
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Capacity of each room actor's command channel. When it is full,
    /// callers wait (bounded channel backpressure).
    pub channel_size: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { channel_size: 64 }
    }
}

// ---------------------------------------------------------------------------
// Names
// ---------------------------------------------------------------------------

pub const DEFAULT_HOST_NAME: &str = "Host";
pub const DEFAULT_PLAYER_NAME: &str = "Player";
pub const MAX_NAME_CHARS: usize = 20;

/// Trims a client-supplied display name and caps it at
/// [`MAX_NAME_CHARS`] characters. Missing or blank names become `fallback`.
pub fn normalize_name(raw: Option<&str>, fallback: &str) -> String {
    let name: String = raw
        .unwrap_or_default()
        .trim()
        .chars()
        .take(MAX_NAME_CHARS)
        .collect();
    let name = name.trim_end();
    if name.is_empty() {
        fallback.to_string()
    } else {
        name.to_string()
    }
}

// ---------------------------------------------------------------------------
// Status transitions
// ---------------------------------------------------------------------------

/// State machine rules for [`RoomStatus`].
///
/// ```text
/// waiting → playing → finished
/// waiting | playing | finished → waiting   (reset)
/// ```
///
/// There is no direct `waiting → finished`. Resetting a lobby re-deals
/// its tickets.
pub trait StatusExt {
    /// Returns `true` if new players may join.
    fn is_joinable(self) -> bool;

    /// Returns `true` if moving to `target` is a legal transition.
    fn can_transition_to(self, target: RoomStatus) -> bool;
}

impl StatusExt for RoomStatus {
    fn is_joinable(self) -> bool {
        matches!(self, RoomStatus::Waiting)
    }

    fn can_transition_to(self, target: RoomStatus) -> bool {
        matches!(
            (self, target),
            (RoomStatus::Waiting, RoomStatus::Playing)
                | (RoomStatus::Playing, RoomStatus::Finished)
                | (_, RoomStatus::Waiting)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_forward_transitions() {
        assert!(RoomStatus::Waiting.can_transition_to(RoomStatus::Playing));
        assert!(RoomStatus::Playing.can_transition_to(RoomStatus::Finished));
    }

    #[test]
    fn test_status_reset_transitions() {
        assert!(RoomStatus::Waiting.can_transition_to(RoomStatus::Waiting));
        assert!(RoomStatus::Playing.can_transition_to(RoomStatus::Waiting));
        assert!(RoomStatus::Finished.can_transition_to(RoomStatus::Waiting));
    }

    #[test]
    fn test_status_no_shortcuts() {
        assert!(!RoomStatus::Waiting.can_transition_to(RoomStatus::Finished));
        assert!(!RoomStatus::Finished.can_transition_to(RoomStatus::Playing));
        assert!(!RoomStatus::Playing.can_transition_to(RoomStatus::Playing));
    }

    #[test]
    fn test_only_waiting_is_joinable() {
        assert!(RoomStatus::Waiting.is_joinable());
        assert!(!RoomStatus::Playing.is_joinable());
        assert!(!RoomStatus::Finished.is_joinable());
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name(Some("  Lan  "), "Player"), "Lan");
        assert_eq!(normalize_name(Some("   "), "Player"), "Player");
        assert_eq!(normalize_name(None, "Host"), "Host");
        assert_eq!(
            normalize_name(Some("abcdefghijklmnopqrstuvwxyz"), "Player"),
            "abcdefghijklmnopqrst"
        );
    }

    #[test]
    fn test_normalize_name_counts_characters_not_bytes() {
        let name = normalize_name(Some("Nguy\u{1ec5}n Th\u{1ecb} Minh Khai Ph\u{01b0}\u{1edd}ng"), "Player");
        assert_eq!(name.chars().count(), 20);
    }

    #[test]
    fn test_registry_config_default() {
        assert_eq!(RegistryConfig::default().channel_size, 64);
    }
}
