pub mod game;
pub mod sync;
pub mod session;
pub mod error;
pub mod config;

pub use error::{GameError, Result};
pub use config::{Config, MatchConfig, SystemLimits};
