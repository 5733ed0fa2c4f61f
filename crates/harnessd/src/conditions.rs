//! Condition lookups over the hierarchy.

use crate::hierarchy::Hierarchy;
use harness_common::{EntityKind, HarnessError, PlayerState, Result, StageSummary};

impl Hierarchy {
    /// Configured condition names, sorted
    pub fn all_condition_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.conditions.keys().cloned().collect();
        names.sort();
        names.dedup();
        names
    }

    /// Stages the player's condition gives access to, in configured order
    pub fn available_stages_for_player(&self, player: &PlayerState) -> Result<Vec<StageSummary>> {
        let condition = self
            .conditions
            .get(&player.condition)
            .ok_or_else(|| HarnessError::not_found(EntityKind::Condition, &player.condition))?;

        condition
            .stages
            .iter()
            .map(|stage_id| self.stage(stage_id).map(|stage| stage.summary()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::hierarchy::Hierarchy;
    use crate::reader::FsReader;
    use crate::stage::StageEnv;
    use harness_common::{GameConfig, PlayerState, StageSummary};
    use std::sync::Arc;

    fn hierarchy(json: &str) -> Hierarchy {
        let env = StageEnv::new("/srv/data", false, Arc::new(FsReader));
        Hierarchy::build(GameConfig::from_json(json).unwrap(), &env, "game.json").unwrap()
    }

    const CONFIG: &str = r#"{
        "conditions": {
            "zeta": {"stages": ["s2", "s1"]},
            "A": {"stages": ["s1"]},
            "m": {"stages": []}
        },
        "stages": {
            "s1": {"engine": "e1", "taskDatasetRef": "task1", "displayName": "Stage One"},
            "s2": {"engine": "e1", "taskDatasetRef": "task2", "displayName": "Stage Two"}
        },
        "engines": {"e1": {"type": "CLFlashGameEngine", "taskID": "42"}}
    }"#;

    #[test]
    fn test_condition_names_sorted() {
        assert_eq!(hierarchy(CONFIG).all_condition_names(), vec!["A", "m", "zeta"]);
    }

    #[test]
    fn test_available_stages_in_order() {
        let stages = hierarchy(CONFIG)
            .available_stages_for_player(&PlayerState::new("p1", "zeta"))
            .unwrap();
        let ids: Vec<&str> = stages.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["s2", "s1"]);
    }

    #[test]
    fn test_end_to_end_example() {
        let h = hierarchy(CONFIG);
        let stages = h
            .available_stages_for_player(&PlayerState::new("p1", "A"))
            .unwrap();
        assert_eq!(
            stages,
            vec![StageSummary {
                id: "s1".to_string(),
                display_name: "Stage One".to_string()
            }]
        );
        assert_eq!(
            h.stage("s1").unwrap().engine().swf_path.as_deref(),
            Some("/fluency/games/42")
        );
    }

    #[test]
    fn test_unknown_condition() {
        let err = hierarchy(CONFIG)
            .available_stages_for_player(&PlayerState::new("p1", "B"))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_condition_with_no_stages() {
        let stages = hierarchy(CONFIG)
            .available_stages_for_player(&PlayerState::new("p1", "m"))
            .unwrap();
        assert!(stages.is_empty());
    }
}
