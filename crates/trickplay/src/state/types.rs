use std::fmt;
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Speed units for normal (1x) playback. Trick rates are multiples of this.
pub const NORMAL_SPEED: i32 = 100;
/// Speed units for a paused player.
pub const PAUSED_SPEED: i32 = 0;

/// The trick-play mode. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TrickMode {
    #[default]
    Play,
    Pause,
    FastForward,
    Rewind,
}

impl TrickMode {
    pub const ALL: &[TrickMode] = &[
        TrickMode::Play,
        TrickMode::Pause,
        TrickMode::FastForward,
        TrickMode::Rewind,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            TrickMode::Play => "Play",
            TrickMode::Pause => "Pause",
            TrickMode::FastForward => "Fast Forward",
            TrickMode::Rewind => "Rewind",
        }
    }

    /// Direction of travel for FF/RW, `None` for Play and Pause.
    pub fn direction(&self) -> Option<Direction> {
        match self {
            TrickMode::FastForward => Some(Direction::Forward),
            TrickMode::Rewind => Some(Direction::Backward),
            TrickMode::Play | TrickMode::Pause => None,
        }
    }

    pub fn is_trick(&self) -> bool {
        self.direction().is_some()
    }

    /// Whether a press in `direction` from this mode counts as a slow-down.
    pub fn decelerates(&self, direction: Direction) -> bool {
        self.direction().is_some_and(|d| d != direction)
    }

    /// Classify a raw player speed.
    ///
    /// Anything above normal speed is fast-forward, anything below zero is
    /// rewind. Slow-motion forward speeds (0 < rate < 100) count as Play.
    pub fn from_rate(rate: i32) -> Self {
        match rate {
            PAUSED_SPEED => TrickMode::Pause,
            r if r < 0 => TrickMode::Rewind,
            r if r > NORMAL_SPEED => TrickMode::FastForward,
            _ => TrickMode::Play,
        }
    }
}

impl fmt::Display for TrickMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Requested direction of a trick-play key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn mode(self) -> TrickMode {
        match self {
            Direction::Forward => TrickMode::FastForward,
            Direction::Backward => TrickMode::Rewind,
        }
    }

    pub fn sign(self) -> i32 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }
}

/// Canonical trick-play state for one playback session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrickPlayState {
    pub mode: TrickMode,
    /// Signed speed units; sign always agrees with `mode`.
    pub rate: i32,
    /// 1-based position in the speed table; `None` outside FF/RW.
    pub index: Option<NonZeroUsize>,
}

impl TrickPlayState {
    pub fn playing() -> Self {
        Self {
            mode: TrickMode::Play,
            rate: NORMAL_SPEED,
            index: None,
        }
    }

    pub fn paused() -> Self {
        Self {
            mode: TrickMode::Pause,
            rate: PAUSED_SPEED,
            index: None,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.mode == TrickMode::Play && self.rate == NORMAL_SPEED
    }

    /// Current rate as a signed multiple of normal speed (e.g. `-4.0`).
    pub fn multiplier(&self) -> f64 {
        f64::from(self.rate) / f64::from(NORMAL_SPEED)
    }

    pub fn snapshot(&self) -> SavedState {
        SavedState {
            mode: self.mode,
            rate: self.rate,
        }
    }
}

impl Default for TrickPlayState {
    fn default() -> Self {
        Self::playing()
    }
}

/// `(mode, rate)` captured before a speed request, restored on rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub mode: TrickMode,
    pub rate: i32,
}

/// Read-only snapshot for UI (avoids borrowing the engine while rendering).
#[derive(Debug, Clone, PartialEq)]
pub struct TrickPlayInfo {
    pub mode: TrickMode,
    pub rate: i32,
    pub multiplier: f64,
    pub awaiting_confirmation: bool,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_from_rate() {
        assert_eq!(TrickMode::from_rate(0), TrickMode::Pause);
        assert_eq!(TrickMode::from_rate(100), TrickMode::Play);
        assert_eq!(TrickMode::from_rate(50), TrickMode::Play);
        assert_eq!(TrickMode::from_rate(400), TrickMode::FastForward);
        assert_eq!(TrickMode::from_rate(-200), TrickMode::Rewind);
    }

    #[test]
    fn only_ff_and_rw_have_direction() {
        assert_eq!(TrickMode::FastForward.direction(), Some(Direction::Forward));
        assert_eq!(TrickMode::Rewind.direction(), Some(Direction::Backward));
        assert!(TrickMode::Play.direction().is_none());
        assert!(TrickMode::Pause.direction().is_none());
    }

    #[test]
    fn decelerates_only_against_current_direction() {
        assert!(TrickMode::FastForward.decelerates(Direction::Backward));
        assert!(TrickMode::Rewind.decelerates(Direction::Forward));
        assert!(!TrickMode::FastForward.decelerates(Direction::Forward));
        assert!(!TrickMode::Play.decelerates(Direction::Backward));
    }

    #[test]
    fn display_names_non_empty() {
        for mode in TrickMode::ALL {
            assert!(!mode.display_name().is_empty());
            assert_eq!(mode.to_string(), mode.display_name());
        }
    }

    #[test]
    fn default_state_is_normal_play() {
        let state = TrickPlayState::default();
        assert!(state.is_playing());
        assert!(state.index.is_none());
        assert!((state.multiplier() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn snapshot_keeps_mode_and_rate() {
        let state = TrickPlayState {
            mode: TrickMode::Rewind,
            rate: -800,
            index: NonZeroUsize::new(3),
        };
        assert_eq!(
            state.snapshot(),
            SavedState {
                mode: TrickMode::Rewind,
                rate: -800
            }
        );
    }

    #[test]
    fn mode_serde_roundtrip() {
        for mode in TrickMode::ALL {
            let json = serde_json::to_string(mode).unwrap();
            let back: TrickMode = serde_json::from_str(&json).unwrap();
            assert_eq!(*mode, back);
        }
    }
}
