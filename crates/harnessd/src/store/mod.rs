//! Persistence collaborators: players and question-set outcomes.
//!
//! The hierarchy never talks to a database directly; it goes through these
//! traits. `MemoryStore` backs tests and dry runs, `SqliteStore` the daemon.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use harness_common::{Outcome, PlayerState, Result};

#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Look a player up; unknown IDs are `NotFound`
    async fn find(&self, player_id: &str) -> Result<PlayerState>;

    /// Insert or update a player
    async fn save(&self, player: &PlayerState) -> Result<()>;
}

#[async_trait]
pub trait OutcomeStore: Send + Sync {
    /// Persist an outcome for a player that has already been resolved
    async fn save_outcome(&self, player: &PlayerState, outcome: &Outcome) -> Result<()>;

    /// Outcomes recorded for one player, oldest first
    async fn outcomes_for_player(&self, player_id: &str) -> Result<Vec<Outcome>>;
}
