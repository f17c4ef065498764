//! Trick-play strategies behind one contract.
//!
//! [`DirectRateController`] drives players with native variable speed and
//! waits for each change to be confirmed. [`SimulatedSeekController`] fakes
//! trick-play on seek-only players by extrapolating a virtual position.

pub mod direct;
pub mod events;
pub mod schedule;
pub mod session;
pub mod simulated;
pub mod skip;

use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::config::TrickPlayConfig;
use crate::player::PlayerEvent;
use crate::state::{NORMAL_SPEED, PAUSED_SPEED, TrickMode, TrickPlayInfo, TrickPlayState};

pub use direct::DirectRateController;
pub use events::{BoundaryAction, DefaultHooks, EngineEvent, EventBus, PlaybackHooks};
pub use session::TrickPlaySession;
pub use simulated::SimulatedSeekController;
pub use skip::SkipEngine;

/// Operations every strategy supports.
///
/// Commands return `false` only when the engine refuses them (torn down, or
/// a speed change still in flight). A command that is already satisfied,
/// such as `play()` while playing, returns `true` without touching the player.
pub trait TrickPlayEngine {
    fn play(&mut self) -> bool;
    fn pause(&mut self) -> bool;
    fn rewind_with(&mut self, force: bool, allow_cycle: bool) -> bool;
    fn fast_forward_with(&mut self, force: bool, allow_cycle: bool) -> bool;
    /// Relative seek; always leaves trick-play.
    fn skip(&mut self, seconds: i32) -> bool;

    fn config(&self) -> &TrickPlayConfig;
    fn state(&self) -> TrickPlayState;
    /// Authoritative position in ms, whichever source that currently is.
    fn playback_position(&self) -> u64;
    fn duration(&self) -> Option<u64>;

    fn is_awaiting_confirmation(&self) -> bool {
        false
    }

    fn handle_player_event(&mut self, event: PlayerEvent);
    /// Drive timers by `dt` of elapsed time.
    fn advance(&mut self, dt: Duration);
    /// Cancel every timer; nothing is sent to the player afterwards.
    fn shutdown(&mut self);
    fn subscribe(&mut self) -> Receiver<EngineEvent>;

    fn rewind(&mut self, force: bool) -> bool {
        let allow_cycle = self.config().allow_speed_cycle;
        self.rewind_with(force, allow_cycle)
    }

    fn fast_forward(&mut self, force: bool) -> bool {
        let allow_cycle = self.config().allow_speed_cycle;
        self.fast_forward_with(force, allow_cycle)
    }

    /// Rewind, or slow down a fast-forward already in progress.
    fn slow_rewind(&mut self) -> bool {
        self.rewind(false)
    }

    /// Fast-forward, or slow down a rewind already in progress.
    fn slow_fast_forward(&mut self) -> bool {
        self.fast_forward(false)
    }

    /// Toggle between Play and Pause.
    ///
    /// `dedicated` is a PLAY button separate from the toggle: pressed during
    /// trick-play it pauses rather than resuming normal speed.
    fn play_pause(&mut self, dedicated: bool) -> bool {
        let rate = self.state().rate;
        let trick = rate != PAUSED_SPEED && rate != NORMAL_SPEED;
        if rate == NORMAL_SPEED || (dedicated && trick) {
            self.pause()
        } else {
            self.play()
        }
    }

    fn mode(&self) -> TrickMode {
        self.state().mode
    }

    fn rate(&self) -> i32 {
        self.state().rate
    }

    fn info(&self) -> TrickPlayInfo {
        let state = self.state();
        TrickPlayInfo {
            mode: state.mode,
            rate: state.rate,
            multiplier: state.multiplier(),
            awaiting_confirmation: self.is_awaiting_confirmation(),
            position_ms: self.playback_position(),
            duration_ms: self.duration(),
        }
    }
}
