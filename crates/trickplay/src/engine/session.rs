use std::time::Duration;

use crossbeam_channel::Receiver;

use super::events::{DefaultHooks, EngineEvent, PlaybackHooks};
use super::{DirectRateController, SimulatedSeekController, TrickPlayEngine};
use crate::config::TrickPlayConfig;
use crate::error::Result;
use crate::keys::{KeyRouter, RemoteKey};
use crate::player::{Player, PlayerEvent};
use crate::state::TrickPlayInfo;

/// The strategy a session picked for its player.
pub enum Strategy<P: Player> {
    Direct(DirectRateController<P>),
    Simulated(SimulatedSeekController<P>),
}

impl<P: Player> Strategy<P> {
    pub fn display_name(&self) -> &'static str {
        match self {
            Strategy::Direct(_) => "Direct rate",
            Strategy::Simulated(_) => "Simulated seek",
        }
    }
}

/// One playback session: a player, its notification channel, and the engine
/// driving it.
///
/// The host calls [`update`](Self::update) from its loop; it drains player
/// notifications and then advances the engine's timers. Dropping the session
/// tears the engine down.
pub struct TrickPlaySession<P: Player> {
    strategy: Strategy<P>,
    notifications: Receiver<PlayerEvent>,
    router: KeyRouter,
}

impl<P: Player> TrickPlaySession<P> {
    pub fn new(
        player: P,
        notifications: Receiver<PlayerEvent>,
        config: TrickPlayConfig,
    ) -> Result<Self> {
        Self::new_with_hooks(player, notifications, config, Box::new(DefaultHooks))
    }

    /// Pick the strategy from the player's capabilities.
    pub fn new_with_hooks(
        player: P,
        notifications: Receiver<PlayerEvent>,
        config: TrickPlayConfig,
        hooks: Box<dyn PlaybackHooks>,
    ) -> Result<Self> {
        let router = KeyRouter::from_config(&config);
        let strategy = if player.capabilities().variable_speed {
            Strategy::Direct(DirectRateController::new(player, config)?.with_hooks(hooks))
        } else {
            Strategy::Simulated(SimulatedSeekController::new(player, config)?.with_hooks(hooks))
        };
        log::info!("Trick-play session started ({})", strategy.display_name());
        Ok(Self {
            strategy,
            notifications,
            router,
        })
    }

    pub fn strategy(&self) -> &Strategy<P> {
        &self.strategy
    }

    pub fn engine(&self) -> &dyn TrickPlayEngine {
        match &self.strategy {
            Strategy::Direct(ctl) => ctl,
            Strategy::Simulated(ctl) => ctl,
        }
    }

    pub fn engine_mut(&mut self) -> &mut dyn TrickPlayEngine {
        match &mut self.strategy {
            Strategy::Direct(ctl) => ctl,
            Strategy::Simulated(ctl) => ctl,
        }
    }

    pub fn player(&self) -> &P {
        match &self.strategy {
            Strategy::Direct(ctl) => ctl.player(),
            Strategy::Simulated(ctl) => ctl.player(),
        }
    }

    pub fn player_mut(&mut self) -> &mut P {
        match &mut self.strategy {
            Strategy::Direct(ctl) => ctl.player_mut(),
            Strategy::Simulated(ctl) => ctl.player_mut(),
        }
    }

    /// Drain pending player notifications, then advance timers by `dt`.
    pub fn update(&mut self, dt: Duration) {
        let events: Vec<PlayerEvent> = self.notifications.try_iter().collect();
        let engine = self.engine_mut();
        for event in events {
            engine.handle_player_event(event);
        }
        engine.advance(dt);
    }

    /// Route a remote key. Returns whether the engine accepted it.
    pub fn handle_key(&mut self, key: RemoteKey) -> bool {
        let router = self.router;
        router.handle(key, self.engine_mut())
    }

    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        self.engine_mut().subscribe()
    }

    pub fn info(&self) -> TrickPlayInfo {
        self.engine().info()
    }

    pub fn shutdown(&mut self) {
        self.engine_mut().shutdown();
    }
}

impl<P: Player> Drop for TrickPlaySession<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
