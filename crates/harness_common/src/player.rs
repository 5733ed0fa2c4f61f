//! Narrow view of a player as seen by the game hierarchy.

use serde::{Deserialize, Serialize};

/// The only player fields the configuration and outcome layers need.
/// Session and profile data stay with the request layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerState {
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub condition: String,
}

impl PlayerState {
    pub fn new(player_id: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            player_id: player_id.into(),
            condition: condition.into(),
        }
    }
}

/// Displayable stage entry returned for a player's condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSummary {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
}
