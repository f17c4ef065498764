//! Remote-control key mapping onto engine operations.

use serde::{Deserialize, Serialize};

use crate::config::TrickPlayConfig;
use crate::engine::TrickPlayEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RemoteKey {
    Rewind,
    FastForward,
    PlayPause,
    Play,
    Pause,
    SkipForward,
    SkipBack,
}

impl RemoteKey {
    pub const ALL: &[RemoteKey] = &[
        RemoteKey::Rewind,
        RemoteKey::FastForward,
        RemoteKey::PlayPause,
        RemoteKey::Play,
        RemoteKey::Pause,
        RemoteKey::SkipForward,
        RemoteKey::SkipBack,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            RemoteKey::Rewind => "REW",
            RemoteKey::FastForward => "FFW",
            RemoteKey::PlayPause => "PLAY/PAUSE",
            RemoteKey::Play => "PLAY",
            RemoteKey::Pause => "PAUSE",
            RemoteKey::SkipForward => "SKIP+",
            RemoteKey::SkipBack => "SKIP-",
        }
    }

    /// Parse a key from a script or CLI token, case-insensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "rew" | "rewind" => Some(RemoteKey::Rewind),
            "ffw" | "ff" | "fastforward" => Some(RemoteKey::FastForward),
            "playpause" | "toggle" => Some(RemoteKey::PlayPause),
            "play" => Some(RemoteKey::Play),
            "pause" => Some(RemoteKey::Pause),
            "skip+" | "skipfwd" => Some(RemoteKey::SkipForward),
            "skip-" | "skipback" => Some(RemoteKey::SkipBack),
            _ => None,
        }
    }

    pub fn legend() -> &'static [(&'static str, &'static str)] {
        &[
            ("rew", "Rewind / next rewind speed"),
            ("ffw", "Fast-forward / next speed"),
            ("playpause", "Toggle play and pause"),
            ("play", "Play (pauses during trick-play)"),
            ("pause", "Pause"),
            ("skip+", "Skip forward"),
            ("skip-", "Skip back"),
        ]
    }
}

impl std::fmt::Display for RemoteKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Routes remote keys to an engine.
///
/// In direct mode REW/FFW always switch to their own direction; otherwise
/// the opposite key slows the current trick-play down first.
#[derive(Debug, Clone, Copy)]
pub struct KeyRouter {
    direct_mode: bool,
    skip_secs: i32,
}

impl KeyRouter {
    pub fn new(direct_mode: bool, skip_secs: u32) -> Self {
        Self {
            direct_mode,
            skip_secs: i32::try_from(skip_secs).unwrap_or(i32::MAX),
        }
    }

    pub fn from_config(config: &TrickPlayConfig) -> Self {
        Self::new(config.direct_mode, config.default_skip_secs)
    }

    pub fn direct_mode(&self) -> bool {
        self.direct_mode
    }

    /// Returns whether the key reached the engine and was accepted.
    ///
    /// Keys pressed while a speed change awaits confirmation are dropped.
    pub fn handle(&self, key: RemoteKey, engine: &mut dyn TrickPlayEngine) -> bool {
        if engine.is_awaiting_confirmation() {
            log::debug!("Dropping {key}: speed change in flight");
            return false;
        }
        log::debug!("Key {key}");
        match key {
            RemoteKey::Rewind if self.direct_mode => engine.rewind(true),
            RemoteKey::Rewind => engine.slow_rewind(),
            RemoteKey::FastForward if self.direct_mode => engine.fast_forward(true),
            RemoteKey::FastForward => engine.slow_fast_forward(),
            RemoteKey::PlayPause => engine.play_pause(false),
            RemoteKey::Play => engine.play_pause(true),
            RemoteKey::Pause => engine.pause(),
            RemoteKey::SkipForward => engine.skip(self.skip_secs),
            RemoteKey::SkipBack => engine.skip(-self.skip_secs),
        }
    }
}
