//! Strategy for players that only do normal-speed play, pause and seek.
//!
//! Fast-forward and rewind pause the real player and move a virtual
//! position on a fixed-interval loop. The player only hears about it when
//! the trick session ends: one seek to the virtual position, then Play.

use std::time::Duration;

use crossbeam_channel::Receiver;

use super::TrickPlayEngine;
use super::events::{BoundaryAction, DefaultHooks, EngineEvent, EventBus, PlaybackHooks};
use super::schedule::RepeatingTimer;
use super::skip::{SkipEngine, clamp_target};
use crate::config::TrickPlayConfig;
use crate::error::Result;
use crate::player::{Player, PlayerEvent};
use crate::state::{
    CycleRequest, Direction, NORMAL_SPEED, PAUSED_SPEED, SpeedTable, TrickMode, TrickPlayState,
};

pub struct SimulatedSeekController<P: Player> {
    player: P,
    config: TrickPlayConfig,
    table: SpeedTable,
    state: TrickPlayState,
    /// Extrapolated position while a trick session is uncommitted.
    virtual_position: Option<i64>,
    trick_loop: Option<RepeatingTimer>,
    skip: SkipEngine,
    /// The pending skip was pressed from Pause or a trick session and
    /// resumes Play once committed.
    resume_after_skip: bool,
    bus: EventBus,
    hooks: Box<dyn PlaybackHooks>,
    shut_down: bool,
}

impl<P: Player> SimulatedSeekController<P> {
    pub fn new(player: P, config: TrickPlayConfig) -> Result<Self> {
        config.validate()?;
        let table = config.speed_table()?;
        let state = if player.speed() == PAUSED_SPEED {
            TrickPlayState::paused()
        } else {
            TrickPlayState::playing()
        };
        let skip = SkipEngine::new(config.skip_debounce());
        Ok(Self {
            player,
            config,
            table,
            state,
            virtual_position: None,
            trick_loop: None,
            skip,
            resume_after_skip: false,
            bus: EventBus::new(),
            hooks: Box::new(DefaultHooks),
            shut_down: false,
        })
    }

    pub fn with_hooks(mut self, hooks: Box<dyn PlaybackHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn virtual_position(&self) -> Option<i64> {
        self.virtual_position
    }

    pub fn is_loop_running(&self) -> bool {
        self.trick_loop.is_some()
    }

    pub fn pending_skip_offset_ms(&self) -> i64 {
        self.skip.pending_offset_ms()
    }

    fn publish_state(&mut self) {
        self.bus.emit(EngineEvent::StateChanged {
            mode: self.state.mode,
            rate: self.state.rate,
        });
    }

    fn cycle(&mut self, direction: Direction, force: bool, allow_cycle: bool) -> bool {
        if self.shut_down {
            return false;
        }
        if self.state.mode.decelerates(direction) && !force {
            log::debug!("Slowing {} by one step", self.state.mode);
        }
        let target = self.table.next(
            &self.state,
            CycleRequest {
                direction,
                force,
                allow_cycle,
            },
        );
        if target.mode == TrickMode::Play {
            self.commit();
        } else {
            self.enter_trick(target);
        }
        true
    }

    fn enter_trick(&mut self, target: TrickPlayState) {
        if self.virtual_position.is_none() {
            let start = match self.skip.preview() {
                Some(raw) => clamp_target(raw, self.player.duration(), self.config.end_guard_ms),
                None => self.player.position(),
            };
            self.skip.cancel();
            self.resume_after_skip = false;
            self.virtual_position = Some(start as i64);
            if self.player.speed() != PAUSED_SPEED {
                self.player.set_speed(PAUSED_SPEED);
            }
            log::debug!("Trick session started at {start}ms");
        }
        self.state = target;
        self.trick_loop = Some(RepeatingTimer::new(self.config.loop_interval()));
        self.publish_state();
    }

    /// End the trick session: one seek to the virtual position, then Play.
    fn commit(&mut self) {
        self.trick_loop = None;
        if let Some(position) = self.virtual_position.take() {
            let target = clamp_target(position, self.player.duration(), 0);
            log::debug!("Committing virtual position {target}ms");
            self.player.seek(target);
        }
        if self.player.speed() != NORMAL_SPEED {
            self.player.set_speed(NORMAL_SPEED);
        }
        self.state = TrickPlayState::playing();
        self.publish_state();
    }

    /// One loop tick. Returns false once the loop has stopped.
    fn tick(&mut self) -> bool {
        let Some(position) = self.virtual_position else {
            self.trick_loop = None;
            return false;
        };
        let step = i64::from(self.state.rate) * self.config.loop_interval_ms as i64
            / i64::from(NORMAL_SPEED);
        let next = position + step;

        let edge = match (self.state.mode, self.player.duration()) {
            (TrickMode::Rewind, _) if next <= 0 => Some((0, EngineEvent::AtBeginning)),
            (TrickMode::FastForward, Some(end)) if next >= end as i64 => {
                Some((end as i64, EngineEvent::AtEnd))
            }
            _ => None,
        };

        match edge {
            Some((clamped, event)) => {
                self.virtual_position = Some(clamped);
                self.trick_loop = None;
                self.publish_state();
                self.on_simulated_boundary(event);
                false
            }
            None => {
                self.virtual_position = Some(next);
                self.publish_state();
                true
            }
        }
    }

    fn on_simulated_boundary(&mut self, event: EngineEvent) {
        log::info!("Simulated {} reached {:?}", self.state.mode, event);
        self.bus.emit(event);
        match self.boundary_action(event) {
            BoundaryAction::ResumePlay => self.commit(),
            BoundaryAction::Pause => {
                self.state = TrickPlayState::paused();
                self.publish_state();
            }
            BoundaryAction::Hold => {}
        }
    }

    fn boundary_action(&mut self, event: EngineEvent) -> BoundaryAction {
        if event == EngineEvent::AtBeginning {
            self.hooks.at_beginning()
        } else {
            self.hooks.at_end()
        }
    }

    /// Boundary reported by the real player during normal playback.
    fn on_player_boundary(&mut self, event: EngineEvent) {
        if self.virtual_position.is_some() {
            log::debug!("Ignoring player {:?} during a trick session", event);
            return;
        }
        log::info!("Player reached {:?}", event);
        self.state = TrickPlayState::playing();
        self.publish_state();
        self.bus.emit(event);
        match self.boundary_action(event) {
            BoundaryAction::ResumePlay => {
                if self.player.speed() != NORMAL_SPEED {
                    self.player.set_speed(NORMAL_SPEED);
                }
            }
            BoundaryAction::Pause => {
                self.player.set_speed(PAUSED_SPEED);
                self.state = TrickPlayState::paused();
                self.publish_state();
            }
            BoundaryAction::Hold => {}
        }
    }

    fn commit_skip(&mut self, raw: i64) {
        let target = clamp_target(raw, self.player.duration(), self.config.end_guard_ms);
        log::debug!("Committing merged skip to {target}ms");
        self.player.seek(target);
        let resume = std::mem::take(&mut self.resume_after_skip);
        if !resume && self.state.mode != TrickMode::Play {
            return;
        }
        if self.player.speed() != NORMAL_SPEED {
            self.player.set_speed(NORMAL_SPEED);
        }
        if !self.state.is_playing() {
            self.state = TrickPlayState::playing();
            self.publish_state();
        }
    }

    fn sync_to_player(&mut self) {
        let rate = self.player.speed();
        let state = if rate == PAUSED_SPEED {
            TrickPlayState::paused()
        } else {
            TrickPlayState::playing()
        };
        if state != self.state {
            self.state = state;
            self.publish_state();
        }
    }

    fn in_trick_session(&self) -> bool {
        self.virtual_position.is_some()
    }
}

impl<P: Player> TrickPlayEngine for SimulatedSeekController<P> {
    fn play(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        self.resume_after_skip = false;
        if self.in_trick_session() {
            self.commit();
        } else if !self.state.is_playing() {
            self.player.set_speed(NORMAL_SPEED);
            self.state = TrickPlayState::playing();
            self.publish_state();
        }
        true
    }

    fn pause(&mut self) -> bool {
        if self.shut_down {
            return false;
        }
        // A pending skip still seeks, but leaves the player paused.
        self.resume_after_skip = false;
        if self.state.mode == TrickMode::Pause {
            return true;
        }
        if self.state.mode.is_trick() {
            // Player is already paused; freeze the virtual position.
            self.trick_loop = None;
        } else {
            self.player.set_speed(PAUSED_SPEED);
        }
        self.state = TrickPlayState::paused();
        self.publish_state();
        true
    }

    fn rewind_with(&mut self, force: bool, allow_cycle: bool) -> bool {
        self.cycle(Direction::Backward, force, allow_cycle)
    }

    fn fast_forward_with(&mut self, force: bool, allow_cycle: bool) -> bool {
        self.cycle(Direction::Forward, force, allow_cycle)
    }

    fn skip(&mut self, seconds: i32) -> bool {
        if self.shut_down {
            return false;
        }
        let base = self.playback_position();
        if self.in_trick_session() {
            // The real player is paused until the skip commits.
            self.trick_loop = None;
            self.virtual_position = None;
            self.state = TrickPlayState::paused();
            self.publish_state();
        }
        if !self.state.is_playing() {
            self.resume_after_skip = true;
        }
        self.skip.push(seconds, base);
        log::debug!(
            "Skip {seconds}s queued, pending offset {}ms",
            self.skip.pending_offset_ms()
        );
        true
    }

    fn config(&self) -> &TrickPlayConfig {
        &self.config
    }

    fn state(&self) -> TrickPlayState {
        self.state
    }

    fn playback_position(&self) -> u64 {
        if let Some(raw) = self.skip.preview() {
            return clamp_target(raw, self.player.duration(), self.config.end_guard_ms);
        }
        match self.virtual_position {
            Some(position) => clamp_target(position, self.player.duration(), 0),
            None => self.player.position(),
        }
    }

    fn duration(&self) -> Option<u64> {
        self.player.duration()
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        if self.shut_down {
            return;
        }
        match event {
            PlayerEvent::SpeedChanged { rate } => {
                if !self.in_trick_session() && !self.skip.is_pending() {
                    log::debug!("Player speed now {rate}");
                    self.sync_to_player();
                }
            }
            PlayerEvent::SpeedChangeFailed { requested } => {
                log::warn!("Player refused speed {requested}");
                if !self.in_trick_session() && !self.skip.is_pending() {
                    self.sync_to_player();
                }
            }
            PlayerEvent::PositionChanged { position_ms } => {
                self.bus.emit(EngineEvent::PositionChanged { position_ms });
            }
            PlayerEvent::PositionChangeFailed { requested_ms } => {
                log::warn!("Player refused seek to {requested_ms}ms");
                self.bus.emit(EngineEvent::PositionChangeFailed { requested_ms });
            }
            PlayerEvent::BeginningOfContent => self.on_player_boundary(EngineEvent::AtBeginning),
            PlayerEvent::EndOfContent => self.on_player_boundary(EngineEvent::AtEnd),
            PlayerEvent::CaughtUpToLive => {
                log::info!("Caught up to live");
                // The live edge is ahead of any virtual position; nothing to commit.
                self.trick_loop = None;
                self.virtual_position = None;
                if self.player.speed() != NORMAL_SPEED {
                    self.player.set_speed(NORMAL_SPEED);
                }
                self.state = TrickPlayState::playing();
                self.publish_state();
                self.bus.emit(EngineEvent::CaughtUpToLive);
            }
            PlayerEvent::Buffering { percent } => {
                self.bus.emit(EngineEvent::Buffering { percent });
            }
            PlayerEvent::PlayStarted => {
                self.hooks.player_playing();
                self.bus.emit(EngineEvent::PlayerPlaying);
            }
        }
    }

    fn advance(&mut self, dt: Duration) {
        if self.shut_down {
            return;
        }
        if let Some(raw) = self.skip.advance(dt) {
            self.commit_skip(raw);
        }
        let due = self.trick_loop.as_mut().map_or(0, |t| t.advance(dt));
        for _ in 0..due {
            if !self.tick() {
                break;
            }
        }
    }

    fn shutdown(&mut self) {
        if !self.shut_down {
            log::info!("Simulated trick-play session torn down");
        }
        self.shut_down = true;
        self.trick_loop = None;
        self.skip.cancel();
        self.resume_after_skip = false;
        self.virtual_position = None;
    }

    fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.bus.subscribe()
    }
}
