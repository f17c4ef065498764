use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building or persisting an engine configuration.
///
/// Runtime protocol failures (rejected speed changes, failed seeks) are not
/// errors: they roll the engine back and surface as events.
#[derive(Debug, Error)]
pub enum TrickPlayError {
    #[error("speed table is empty")]
    EmptySpeedTable,

    #[error("speed multiplier at position {index} must be positive")]
    ZeroMultiplier { index: usize },

    #[error("speed table must be strictly increasing ({value} at position {index} follows {previous})")]
    UnorderedSpeedTable {
        index: usize,
        previous: u32,
        value: u32,
    },

    #[error("speed multiplier {value} at position {index} exceeds the maximum of {max}")]
    MultiplierTooLarge { index: usize, value: u32, max: u32 },

    #[error("loop interval must be greater than zero")]
    ZeroLoopInterval,

    #[error("skip debounce window must be greater than zero")]
    ZeroSkipDebounce,

    #[error("failed to access config {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TrickPlayError>;
