//! Trick-play control for set-top box video players.
//!
//! A [`TrickPlaySession`] owns a [`Player`] and picks a strategy for it:
//! native rate changes confirmed by the player, or a virtual position moved
//! on a timer for players that can only play, pause and seek.

pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod player;
pub mod state;

pub use config::TrickPlayConfig;
pub use engine::{
    BoundaryAction, EngineEvent, PlaybackHooks, TrickPlayEngine, TrickPlaySession,
};
pub use error::{Result, TrickPlayError};
pub use keys::{KeyRouter, RemoteKey};
pub use player::{Player, PlayerCapabilities, PlayerEvent};
pub use state::{TrickMode, TrickPlayInfo, TrickPlayState};
