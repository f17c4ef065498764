//! Strategy for players with native variable-speed support.
//!
//! Every speed change is a request: the state is updated optimistically, the
//! previous `(mode, rate)` is saved, and the player's confirmation either
//! commits the new cycling index or rolls the state back.

use std::time::Duration;

use crossbeam_channel::Receiver;

use super::TrickPlayEngine;
use super::events::{BoundaryAction, DefaultHooks, EngineEvent, EventBus, PlaybackHooks};
use super::skip::{clamp_target, offset_ms};
use crate::config::TrickPlayConfig;
use crate::error::Result;
use crate::player::{Player, PlayerEvent};
use crate::state::{
    CycleRequest, Direction, NORMAL_SPEED, SavedState, SpeedTable, TrickMode, TrickPlayState,
};

/// A speed change sent to the player and not yet answered.
#[derive(Debug, Clone, Copy)]
struct PendingRequest {
    saved: SavedState,
    target: TrickPlayState,
    /// Seek to send once the change is confirmed (skip out of trick-play).
    then_seek: Option<u64>,
}

pub struct DirectRateController<P: Player> {
    player: P,
    config: TrickPlayConfig,
    table: SpeedTable,
    state: TrickPlayState,
    pending: Option<PendingRequest>,
    bus: EventBus,
    hooks: Box<dyn PlaybackHooks>,
    shut_down: bool,
}

impl<P: Player> DirectRateController<P> {
    pub fn new(player: P, config: TrickPlayConfig) -> Result<Self> {
        config.validate()?;
        let table = config.speed_table()?;
        let state = TrickPlayState {
            mode: TrickMode::from_rate(player.speed()),
            rate: player.speed(),
            index: table.index_of_rate(player.speed()),
        };
        Ok(Self {
            player,
            config,
            table,
            state,
            pending: None,
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

    /// `(mode, rate)` the engine would roll back to, while a request is in flight.
    pub fn saved_state(&self) -> Option<SavedState> {
        self.pending.map(|p| p.saved)
    }

    fn request(&mut self, target: TrickPlayState, then_seek: Option<u64>) -> bool {
        if self.shut_down {
            return false;
        }
        if let Some(pending) = &self.pending {
            log::debug!(
                "Ignoring speed request {} while {} is unconfirmed",
                target.rate,
                pending.target.rate
            );
            return false;
        }

        let saved = self.state.snapshot();
        self.state.mode = target.mode;
        self.state.rate = target.rate;
        self.pending = Some(PendingRequest {
            saved,
            target,
            then_seek,
        });

        log::debug!("Requesting speed {} ({}), was {}", target.rate, target.mode, saved.rate);
        self.player.set_speed(target.rate);
        true
    }

    fn cycle(&mut self, direction: Direction, force: bool, allow_cycle: bool) -> bool {
        let target = self.table.next(
            &self.state,
            CycleRequest {
                direction,
                force,
                allow_cycle,
            },
        );
        self.request(target, None)
    }

    fn publish_state(&mut self) {
        self.bus.emit(EngineEvent::StateChanged {
            mode: self.state.mode,
            rate: self.state.rate,
        });
    }

    /// Take on a speed the player reports without a matching request.
    fn adopt_rate(&mut self, rate: i32) {
        self.state = TrickPlayState {
            mode: TrickMode::from_rate(rate),
            rate,
            index: self.table.index_of_rate(rate),
        };
    }

    fn on_speed_changed(&mut self, rate: i32) {
        match self.pending.take() {
            Some(pending) => {
                if rate == pending.target.rate {
                    self.state = pending.target;
                } else {
                    log::warn!(
                        "Player settled at speed {rate} instead of requested {}",
                        pending.target.rate
                    );
                    self.adopt_rate(rate);
                }
                log::debug!("Speed {} confirmed ({})", self.state.rate, self.state.mode);
                self.publish_state();
                if let Some(position) = pending.then_seek {
                    self.player.seek(position);
                }
            }
            None => {
                // Player-driven change, or the answer to a rollback.
                if rate != self.state.rate {
                    log::debug!("Player changed speed on its own to {rate}");
                    self.adopt_rate(rate);
                    self.publish_state();
                }
            }
        }
    }

    fn on_speed_change_failed(&mut self, requested: i32) {
        let Some(pending) = self.pending.take() else {
            log::warn!("Player refused speed {requested} with no request outstanding");
            return;
        };

        log::warn!(
            "Speed change to {requested} rejected, rolling back to {} ({})",
            pending.saved.rate,
            pending.saved.mode
        );
        // The cycling index is only committed on confirmation, so it still
        // matches the saved state.
        self.state.mode = pending.saved.mode;
        self.state.rate = pending.saved.rate;

        if self.player.speed() != pending.saved.rate {
            log::debug!(
                "Player left at {}, forcing back to {}",
                self.player.speed(),
                pending.saved.rate
            );
            self.player.set_speed(pending.saved.rate);
        }
        if pending.then_seek.is_some() {
            log::debug!("Dropping skip that depended on the rejected change");
        }
        self.publish_state();
    }

    fn on_boundary(&mut self, event: EngineEvent) {
        log::info!("Player reached {:?} at speed {}", event, self.player.speed());
        self.pending = None;
        self.state = TrickPlayState::playing();
        self.publish_state();
        self.bus.emit(event);

        let action = if event == EngineEvent::AtBeginning {
            self.hooks.at_beginning()
        } else {
            self.hooks.at_end()
        };
        match action {
            BoundaryAction::ResumePlay => {
                if self.player.speed() != NORMAL_SPEED {
                    self.request(TrickPlayState::playing(), None);
                }
            }
            BoundaryAction::Pause => {
                self.request(TrickPlayState::paused(), None);
            }
            BoundaryAction::Hold => {
                // Report what the player is doing at the edge.
                let rate = self.player.speed();
                if rate != self.state.rate {
                    self.adopt_rate(rate);
                    self.publish_state();
                }
            }
        }
    }
}

impl<P: Player> TrickPlayEngine for DirectRateController<P> {
    fn play(&mut self) -> bool {
        if self.state.is_playing() && self.pending.is_none() {
            return !self.shut_down;
        }
        self.request(TrickPlayState::playing(), None)
    }

    fn pause(&mut self) -> bool {
        if self.state.mode == TrickMode::Pause && self.pending.is_none() {
            return !self.shut_down;
        }
        self.request(TrickPlayState::paused(), None)
    }

    fn rewind_with(&mut self, force: bool, allow_cycle: bool) -> bool {
        self.cycle(Direction::Backward, force, allow_cycle)
    }

    fn fast_forward_with(&mut self, force: bool, allow_cycle: bool) -> bool {
        self.cycle(Direction::Forward, force, allow_cycle)
    }

    fn skip(&mut self, seconds: i32) -> bool {
        if self.shut_down || self.pending.is_some() {
            return false;
        }
        let raw = self.player.position() as i64 + offset_ms(seconds);
        let target = clamp_target(raw, self.player.duration(), self.config.end_guard_ms);
        log::debug!("Skipping {seconds}s to {target}ms");

        if self.state.is_playing() {
            self.player.seek(target);
            true
        } else {
            self.request(TrickPlayState::playing(), Some(target))
        }
    }

    fn config(&self) -> &TrickPlayConfig {
        &self.config
    }

    fn state(&self) -> TrickPlayState {
        self.state
    }

    fn playback_position(&self) -> u64 {
        self.player.position()
    }

    fn duration(&self) -> Option<u64> {
        self.player.duration()
    }

    fn is_awaiting_confirmation(&self) -> bool {
        self.pending.is_some()
    }

    fn handle_player_event(&mut self, event: PlayerEvent) {
        if self.shut_down {
            return;
        }
        match event {
            PlayerEvent::SpeedChanged { rate } => self.on_speed_changed(rate),
            PlayerEvent::SpeedChangeFailed { requested } => self.on_speed_change_failed(requested),
            PlayerEvent::PositionChanged { position_ms } => {
                self.bus.emit(EngineEvent::PositionChanged { position_ms });
            }
            PlayerEvent::PositionChangeFailed { requested_ms } => {
                log::warn!("Player refused seek to {requested_ms}ms");
                self.bus.emit(EngineEvent::PositionChangeFailed { requested_ms });
            }
            PlayerEvent::BeginningOfContent => self.on_boundary(EngineEvent::AtBeginning),
            PlayerEvent::EndOfContent => self.on_boundary(EngineEvent::AtEnd),
            PlayerEvent::CaughtUpToLive => {
                log::info!("Caught up to live");
                self.pending = None;
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

    fn advance(&mut self, _dt: Duration) {}

    fn shutdown(&mut self) {
        if !self.shut_down {
            log::info!("Direct trick-play session torn down");
        }
        self.shut_down = true;
        self.pending = None;
    }

    fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use super::*;
    use crate::player::{
        PlayerCapabilities, PlayerCommand, VirtualPlayer, notification_channel,
    };
    use crate::state::PAUSED_SPEED;

    struct Rig {
        ctl: DirectRateController<VirtualPlayer>,
        player_rx: Receiver<PlayerEvent>,
        events: Receiver<EngineEvent>,
    }

    impl Rig {
        fn new(config: TrickPlayConfig) -> Self {
            let (tx, player_rx) = notification_channel();
            let player = VirtualPlayer::new(tx, PlayerCapabilities::NATIVE, Some(600_000))
                .with_position(100_000);
            let mut ctl = DirectRateController::new(player, config).unwrap();
            let events = ctl.subscribe();
            Self {
                ctl,
                player_rx,
                events,
            }
        }

        fn with_table(table: &[u32]) -> Self {
            Self::new(TrickPlayConfig {
                speed_table: table.to_vec(),
                ..Default::default()
            })
        }

        /// Deliver every notification, including ones caused by the delivery.
        fn settle(&mut self) {
            while let Ok(event) = self.player_rx.try_recv() {
                self.ctl.handle_player_event(event);
            }
        }

        fn commands(&mut self) -> Vec<PlayerCommand> {
            self.ctl.player_mut().take_commands()
        }

        fn states(&self) -> Vec<(TrickMode, i32)> {
            self.events
                .try_iter()
                .filter_map(|e| match e {
                    EngineEvent::StateChanged { mode, rate } => Some((mode, rate)),
                    _ => None,
                })
                .collect()
        }
    }

    #[test]
    fn fast_forward_presses_step_through_table() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        let mut confirmed = Vec::new();
        for _ in 0..4 {
            assert!(rig.ctl.fast_forward(true));
            rig.settle();
            confirmed.push(rig.ctl.rate());
        }
        assert_eq!(confirmed, vec![200, 400, 800, 800]);
        // Holding at the top still re-issues the rate.
        assert_eq!(
            rig.commands(),
            vec![
                PlayerCommand::SetSpeed(200),
                PlayerCommand::SetSpeed(400),
                PlayerCommand::SetSpeed(800),
                PlayerCommand::SetSpeed(800),
            ]
        );
    }

    #[test]
    fn fast_forward_wraps_when_cycling_allowed() {
        let mut rig = Rig::new(TrickPlayConfig {
            speed_table: vec![2, 4, 8],
            allow_speed_cycle: true,
            ..Default::default()
        });
        for _ in 0..4 {
            rig.ctl.fast_forward(true);
            rig.settle();
        }
        assert_eq!(rig.ctl.rate(), 200);
        assert_eq!(rig.ctl.state().index, NonZeroUsize::new(1));
    }

    #[test]
    fn per_call_cycle_override() {
        let mut rig = Rig::with_table(&[2, 4]);
        for _ in 0..2 {
            rig.ctl.fast_forward(true);
            rig.settle();
        }
        rig.ctl.fast_forward_with(true, true);
        rig.settle();
        assert_eq!(rig.ctl.rate(), 200);
    }

    #[test]
    fn second_request_refused_while_awaiting() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        assert!(rig.ctl.fast_forward(true));
        assert!(rig.ctl.is_awaiting_confirmation());
        assert_eq!(
            rig.ctl.saved_state(),
            Some(SavedState {
                mode: TrickMode::Play,
                rate: 100
            })
        );
        assert!(!rig.ctl.fast_forward(true));
        assert!(!rig.ctl.skip(30));
        rig.settle();
        assert!(!rig.ctl.is_awaiting_confirmation());
        assert_eq!(rig.commands(), vec![PlayerCommand::SetSpeed(200)]);
    }

    #[test]
    fn index_commits_only_on_confirmation() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        assert_eq!(rig.ctl.state().index, None);
        rig.settle();
        assert_eq!(rig.ctl.state().index, NonZeroUsize::new(1));
        assert_eq!(rig.states(), vec![(TrickMode::FastForward, 200)]);
    }

    #[test]
    fn rejected_change_rolls_back_to_saved_state() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        rig.settle();
        rig.ctl.player_mut().reject_rate(400);
        rig.commands();

        rig.ctl.fast_forward(true);
        assert_eq!(rig.ctl.rate(), 400);
        rig.settle();

        assert!(!rig.ctl.is_awaiting_confirmation());
        assert_eq!(rig.ctl.mode(), TrickMode::FastForward);
        assert_eq!(rig.ctl.rate(), 200);
        assert_eq!(rig.ctl.state().index, NonZeroUsize::new(1));
        // Player never left 200, so nothing is forced.
        assert_eq!(rig.commands(), vec![PlayerCommand::SetSpeed(400)]);
        assert_eq!(
            rig.states(),
            vec![(TrickMode::FastForward, 200), (TrickMode::FastForward, 200)]
        );
    }

    #[test]
    fn rejected_change_forces_player_back() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.player_mut().reject_rate_landing_at(-200, PAUSED_SPEED);
        rig.ctl.rewind(true);
        rig.settle();

        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
        assert_eq!(rig.ctl.player().speed(), NORMAL_SPEED);
        assert_eq!(
            rig.commands(),
            vec![PlayerCommand::SetSpeed(-200), PlayerCommand::SetSpeed(100)]
        );
        // The forced speed's own confirmation adds no extra refresh.
        assert_eq!(rig.states(), vec![(TrickMode::Play, 100)]);
    }

    #[test]
    fn play_while_playing_is_a_no_op() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        assert!(rig.ctl.play());
        rig.settle();
        assert!(rig.commands().is_empty());
        assert!(rig.states().is_empty());
    }

    #[test]
    fn opposite_key_decelerates_then_resumes_play() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        for _ in 0..2 {
            rig.ctl.fast_forward(true);
            rig.settle();
        }
        rig.ctl.slow_rewind();
        rig.settle();
        assert_eq!(rig.ctl.state().rate, 200);
        assert_eq!(rig.ctl.mode(), TrickMode::FastForward);

        rig.ctl.slow_rewind();
        rig.settle();
        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
    }

    #[test]
    fn dedicated_play_pauses_trick_play() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        rig.settle();
        rig.ctl.play_pause(true);
        rig.settle();
        assert_eq!(rig.ctl.mode(), TrickMode::Pause);
        assert_eq!(rig.ctl.rate(), PAUSED_SPEED);
    }

    #[test]
    fn toggle_resumes_play_from_trick_play() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.rewind(true);
        rig.settle();
        rig.ctl.play_pause(false);
        rig.settle();
        assert_eq!(rig.ctl.state(), TrickPlayState::playing());

        rig.ctl.play_pause(false);
        rig.settle();
        assert_eq!(rig.ctl.mode(), TrickMode::Pause);
    }

    #[test]
    fn end_of_content_resets_to_play_without_request() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        rig.settle();
        rig.commands();
        rig.states();

        rig.ctl.player_mut().advance(Duration::from_secs(600));
        rig.settle();

        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
        assert_eq!(rig.commands(), vec![PlayerCommand::SetSpeed(100)]);
        let events: Vec<_> = rig.events.try_iter().collect();
        assert!(events.contains(&EngineEvent::AtEnd));
        assert!(events.contains(&EngineEvent::StateChanged {
            mode: TrickMode::Play,
            rate: 100
        }));
    }

    #[test]
    fn boundary_hook_can_pause_instead() {
        struct PauseAtStart;
        impl PlaybackHooks for PauseAtStart {
            fn at_beginning(&mut self) -> BoundaryAction {
                BoundaryAction::Pause
            }
        }

        let (tx, rx) = notification_channel();
        let player = VirtualPlayer::new(tx, PlayerCapabilities::NATIVE, Some(600_000))
            .with_position(2_000);
        let mut ctl = DirectRateController::new(player, TrickPlayConfig::default())
            .unwrap()
            .with_hooks(Box::new(PauseAtStart));
        ctl.rewind(true);
        while let Ok(e) = rx.try_recv() {
            ctl.handle_player_event(e);
        }
        ctl.player_mut().advance(Duration::from_secs(1));
        while let Ok(e) = rx.try_recv() {
            ctl.handle_player_event(e);
        }
        assert_eq!(ctl.mode(), TrickMode::Pause);
        assert_eq!(ctl.player().position(), 0);
    }

    #[test]
    fn hold_hook_reports_stopped_player() {
        struct HoldAtEnd;
        impl PlaybackHooks for HoldAtEnd {
            fn at_end(&mut self) -> BoundaryAction {
                BoundaryAction::Hold
            }
        }

        let (tx, rx) = notification_channel();
        let player = VirtualPlayer::new(tx, PlayerCapabilities::NATIVE, Some(600_000))
            .with_position(590_000);
        let mut ctl = DirectRateController::new(player, TrickPlayConfig::default())
            .unwrap()
            .with_hooks(Box::new(HoldAtEnd));
        let events = ctl.subscribe();
        ctl.fast_forward(true);
        while let Ok(e) = rx.try_recv() {
            ctl.handle_player_event(e);
        }
        ctl.player_mut().take_commands();

        ctl.player_mut().advance(Duration::from_secs(10));
        while let Ok(e) = rx.try_recv() {
            ctl.handle_player_event(e);
        }
        assert_eq!(ctl.mode(), TrickMode::Pause);
        assert_eq!(ctl.rate(), PAUSED_SPEED);
        assert!(!ctl.is_awaiting_confirmation());
        assert!(ctl.player_mut().take_commands().is_empty());
        let last = events
            .try_iter()
            .filter(|e| matches!(e, EngineEvent::StateChanged { .. }))
            .last();
        assert_eq!(
            last,
            Some(EngineEvent::StateChanged {
                mode: TrickMode::Pause,
                rate: 0
            })
        );
    }

    #[test]
    fn skip_while_playing_seeks_directly() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        assert!(rig.ctl.skip(30));
        rig.settle();
        assert_eq!(rig.commands(), vec![PlayerCommand::Seek(130_000)]);
        assert_eq!(rig.ctl.playback_position(), 130_000);
    }

    #[test]
    fn skip_leaves_trick_play_before_seeking() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.rewind(true);
        rig.settle();
        rig.commands();

        rig.ctl.skip(-30);
        assert_eq!(rig.commands(), vec![PlayerCommand::SetSpeed(100)]);
        rig.settle();
        assert_eq!(rig.commands(), vec![PlayerCommand::Seek(70_000)]);
        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
    }

    #[test]
    fn skip_targets_are_clamped() {
        let mut rig = Rig::new(TrickPlayConfig {
            end_guard_ms: 5_000,
            ..Default::default()
        });
        rig.ctl.skip(10_000);
        rig.settle();
        assert_eq!(rig.ctl.playback_position(), 595_000);
        rig.ctl.skip(-10_000);
        rig.settle();
        assert_eq!(rig.ctl.playback_position(), 0);
    }

    #[test]
    fn failed_seek_is_reported_and_state_kept() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.player_mut().set_fail_seeks(true);
        rig.ctl.skip(30);
        rig.settle();
        assert!(
            rig.events
                .try_iter()
                .any(|e| e == EngineEvent::PositionChangeFailed { requested_ms: 130_000 })
        );
        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
    }

    #[test]
    fn caught_up_to_live_resets_cycling() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        rig.settle();
        rig.ctl.handle_player_event(PlayerEvent::CaughtUpToLive);
        assert_eq!(rig.ctl.state(), TrickPlayState::playing());
        assert!(rig.events.try_iter().any(|e| e == EngineEvent::CaughtUpToLive));
    }

    #[test]
    fn unsolicited_speed_change_is_adopted() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.handle_player_event(PlayerEvent::SpeedChanged { rate: -400 });
        assert_eq!(rig.ctl.mode(), TrickMode::Rewind);
        assert_eq!(rig.ctl.state().index, NonZeroUsize::new(2));
        assert_eq!(rig.states(), vec![(TrickMode::Rewind, -400)]);
    }

    #[test]
    fn shutdown_refuses_further_commands() {
        let mut rig = Rig::with_table(&[2, 4, 8]);
        rig.ctl.fast_forward(true);
        rig.ctl.shutdown();
        rig.settle();
        assert!(!rig.ctl.fast_forward(true));
        assert!(!rig.ctl.skip(30));
        assert!(!rig.ctl.play());
        assert_eq!(rig.commands(), vec![PlayerCommand::SetSpeed(200)]);
    }
}
