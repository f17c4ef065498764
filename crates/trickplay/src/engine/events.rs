use crossbeam_channel::{Receiver, Sender};

use crate::state::TrickMode;

/// Notifications the engine publishes to its listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineEvent {
    /// Committed or simulated state change; refresh the trick-play UI.
    StateChanged { mode: TrickMode, rate: i32 },
    PlayerPlaying,
    AtBeginning,
    AtEnd,
    CaughtUpToLive,
    PositionChanged { position_ms: u64 },
    /// A seek was refused. Trick-play state is left untouched.
    PositionChangeFailed { requested_ms: u64 },
    Buffering { percent: u8 },
}

/// Fan-out of engine events to every registered listener.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Sender<EngineEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Dropping the receiver unregisters it.
    pub fn subscribe(&mut self) -> Receiver<EngineEvent> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.listeners.push(tx);
        rx
    }

    pub fn emit(&mut self, event: EngineEvent) {
        self.listeners.retain(|tx| tx.send(event).is_ok());
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

/// What to do after the content edge has been reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundaryAction {
    #[default]
    ResumePlay,
    Pause,
    /// Leave the player where it is.
    Hold,
}

/// Overridable reactions to player milestones. Defaults resume Play.
pub trait PlaybackHooks {
    fn player_playing(&mut self) {}

    fn at_beginning(&mut self) -> BoundaryAction {
        BoundaryAction::ResumePlay
    }

    fn at_end(&mut self) -> BoundaryAction {
        BoundaryAction::ResumePlay
    }
}

pub struct DefaultHooks;

impl PlaybackHooks for DefaultHooks {}
