//! In-memory player and outcome store.

use super::{OutcomeStore, PlayerStore};
use async_trait::async_trait;
use harness_common::{EntityKind, HarnessError, Outcome, PlayerState, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryStore {
    players: RwLock<HashMap<String, PlayerState>>,
    outcomes: RwLock<Vec<Outcome>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn outcome_count(&self) -> usize {
        self.outcomes.read().await.len()
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn find(&self, player_id: &str) -> Result<PlayerState> {
        self.players
            .read()
            .await
            .get(player_id)
            .cloned()
            .ok_or_else(|| HarnessError::not_found(EntityKind::Player, player_id))
    }

    async fn save(&self, player: &PlayerState) -> Result<()> {
        self.players
            .write()
            .await
            .insert(player.player_id.clone(), player.clone());
        Ok(())
    }
}

#[async_trait]
impl OutcomeStore for MemoryStore {
    async fn save_outcome(&self, player: &PlayerState, outcome: &Outcome) -> Result<()> {
        if !self.players.read().await.contains_key(&player.player_id) {
            return Err(HarnessError::not_found(EntityKind::Player, &player.player_id));
        }
        self.outcomes.write().await.push(outcome.clone());
        Ok(())
    }

    async fn outcomes_for_player(&self, player_id: &str) -> Result<Vec<Outcome>> {
        Ok(self
            .outcomes
            .read()
            .await
            .iter()
            .filter(|o| o.player_id == player_id)
            .cloned()
            .collect())
    }
}
