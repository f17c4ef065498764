pub mod speed_table;
pub mod types;

pub use speed_table::{CycleRequest, SpeedTable};
pub use types::{
    Direction, NORMAL_SPEED, PAUSED_SPEED, SavedState, TrickMode, TrickPlayInfo, TrickPlayState,
};
