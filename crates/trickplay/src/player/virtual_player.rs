use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::Sender;

use super::{Player, PlayerCapabilities, PlayerEvent};
use crate::state::{NORMAL_SPEED, PAUSED_SPEED};

/// A command the engine sent, in the order it was sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerCommand {
    SetSpeed(i32),
    Seek(u64),
}

/// In-memory player that reports over a real notification channel.
///
/// Used by the demo binary and by the engine tests. Rejections and seek
/// failures can be scripted to exercise the rollback paths.
pub struct VirtualPlayer {
    notifier: Sender<PlayerEvent>,
    capabilities: PlayerCapabilities,
    speed: i32,
    position_ms: u64,
    duration_ms: Option<u64>,
    /// requested rate -> speed the player lands on after refusing it
    rejected: HashMap<i32, Option<i32>>,
    fail_seeks: bool,
    commands: Vec<PlayerCommand>,
    /// Sub-millisecond travel carried between `advance` calls.
    carry: f64,
}

impl VirtualPlayer {
    pub fn new(
        notifier: Sender<PlayerEvent>,
        capabilities: PlayerCapabilities,
        duration_ms: Option<u64>,
    ) -> Self {
        Self {
            notifier,
            capabilities,
            speed: NORMAL_SPEED,
            position_ms: 0,
            duration_ms,
            rejected: HashMap::new(),
            fail_seeks: false,
            commands: Vec::new(),
            carry: 0.0,
        }
    }

    pub fn with_position(mut self, position_ms: u64) -> Self {
        self.position_ms = position_ms;
        self
    }

    /// Refuse `rate` from now on; the player keeps its current speed.
    pub fn reject_rate(&mut self, rate: i32) {
        self.rejected.insert(rate, None);
    }

    /// Refuse `rate` but end up at `landed` (a partially applied change).
    pub fn reject_rate_landing_at(&mut self, rate: i32, landed: i32) {
        self.rejected.insert(rate, Some(landed));
    }

    pub fn accept_all_rates(&mut self) {
        self.rejected.clear();
    }

    pub fn set_fail_seeks(&mut self, fail: bool) {
        self.fail_seeks = fail;
    }

    pub fn commands(&self) -> &[PlayerCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<PlayerCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Play out `dt` of wall time at the current speed.
    ///
    /// Reports the beginning/end of content once when an edge is reached
    /// and stops there.
    pub fn advance(&mut self, dt: Duration) {
        if self.speed == PAUSED_SPEED {
            return;
        }
        let travel = dt.as_secs_f64() * 1000.0 * f64::from(self.speed) / f64::from(NORMAL_SPEED)
            + self.carry;
        let whole = travel.trunc();
        self.carry = travel - whole;

        let target = self.position_ms as i64 + whole as i64;
        if target <= 0 && self.speed < 0 {
            self.position_ms = 0;
            self.stop_at_edge(PlayerEvent::BeginningOfContent);
        } else if let Some(end) = self.duration_ms.filter(|&end| target >= end as i64) {
            self.position_ms = end;
            self.stop_at_edge(PlayerEvent::EndOfContent);
        } else {
            self.position_ms = target.max(0) as u64;
        }
    }

    fn stop_at_edge(&mut self, event: PlayerEvent) {
        self.speed = PAUSED_SPEED;
        self.carry = 0.0;
        self.notify(event);
    }

    fn notify(&self, event: PlayerEvent) {
        // Receiver gone means the session was torn down.
        let _ = self.notifier.send(event);
    }

    fn supports(&self, rate: i32) -> bool {
        self.capabilities.variable_speed || rate == NORMAL_SPEED || rate == PAUSED_SPEED
    }
}

impl Player for VirtualPlayer {
    fn set_speed(&mut self, rate: i32) {
        self.commands.push(PlayerCommand::SetSpeed(rate));

        if !self.supports(rate) {
            self.notify(PlayerEvent::SpeedChangeFailed { requested: rate });
            return;
        }
        if let Some(landed) = self.rejected.get(&rate).copied() {
            if let Some(landed) = landed {
                self.speed = landed;
            }
            self.notify(PlayerEvent::SpeedChangeFailed { requested: rate });
            return;
        }

        let previous = self.speed;
        self.speed = rate;
        self.notify(PlayerEvent::SpeedChanged { rate });
        if rate == NORMAL_SPEED && previous != NORMAL_SPEED {
            self.notify(PlayerEvent::PlayStarted);
        }
    }

    fn seek(&mut self, position_ms: u64) {
        self.commands.push(PlayerCommand::Seek(position_ms));

        if self.fail_seeks {
            self.notify(PlayerEvent::PositionChangeFailed {
                requested_ms: position_ms,
            });
            return;
        }
        self.position_ms = match self.duration_ms {
            Some(end) => position_ms.min(end),
            None => position_ms,
        };
        self.carry = 0.0;
        self.notify(PlayerEvent::PositionChanged {
            position_ms: self.position_ms,
        });
    }

    fn speed(&self) -> i32 {
        self.speed
    }

    fn position(&self) -> u64 {
        self.position_ms
    }

    fn duration(&self) -> Option<u64> {
        self.duration_ms
    }

    fn capabilities(&self) -> PlayerCapabilities {
        self.capabilities
    }
}
