//! Player seam: commands the engine sends and notifications it receives back.
//!
//! Commands are synchronous calls on the [`Player`] trait. Results come back
//! later, in issue order, as [`PlayerEvent`]s on a notification channel that
//! the session drains once per update.

pub mod virtual_player;

use crossbeam_channel::{Receiver, Sender};

pub use virtual_player::{PlayerCommand, VirtualPlayer};

/// What the underlying player can do natively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerCapabilities {
    /// Accepts negative and super-unity speeds (native trick-play).
    pub variable_speed: bool,
}

impl PlayerCapabilities {
    pub const NATIVE: Self = Self {
        variable_speed: true,
    };
    pub const SEEK_ONLY: Self = Self {
        variable_speed: false,
    };
}

/// Asynchronous notification from the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// A speed change was applied; `rate` is the speed now in effect.
    SpeedChanged { rate: i32 },
    /// A speed change was refused.
    SpeedChangeFailed { requested: i32 },
    PositionChanged { position_ms: u64 },
    PositionChangeFailed { requested_ms: u64 },
    BeginningOfContent,
    EndOfContent,
    Buffering { percent: u8 },
    PlayStarted,
    /// Timeshifted playback reached the live edge.
    CaughtUpToLive,
}

/// A player instance exclusively owned by one engine for one session.
///
/// Command methods return immediately; their outcome is reported through the
/// notification channel. Queries reflect what the player is doing right now.
pub trait Player {
    fn set_speed(&mut self, rate: i32);
    fn seek(&mut self, position_ms: u64);
    fn speed(&self) -> i32;
    fn position(&self) -> u64;
    /// `None` for live or not-yet-known content.
    fn duration(&self) -> Option<u64>;
    fn capabilities(&self) -> PlayerCapabilities;
}

/// Create the notification channel a player reports on.
///
/// Unbounded: confirmations must never be dropped, or the engine would
/// wait for them forever.
pub fn notification_channel() -> (Sender<PlayerEvent>, Receiver<PlayerEvent>) {
    crossbeam_channel::unbounded()
}
