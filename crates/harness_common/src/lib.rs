//! Shared types for the fluency test harness.

pub mod error;
pub mod game_config;
pub mod outcome;
pub mod player;

pub use error::{EntityKind, HarnessError, Result};
pub use game_config::{ConditionConfig, EngineConfig, GameConfig, StageConfig};
pub use outcome::{Outcome, NO_MEDAL};
pub use player::{PlayerState, StageSummary};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
