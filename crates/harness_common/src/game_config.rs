//! Raw game configuration as it appears in the root JSON file.
//!
//! These types are deliberately undecorated: derived engine paths and the
//! runtime stage objects are built from them by the daemon.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Root of the game configuration tree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub conditions: BTreeMap<String, ConditionConfig>,
    pub stages: BTreeMap<String, StageConfig>,
    pub engines: BTreeMap<String, EngineConfig>,
}

impl GameConfig {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Stage IDs whose engine reference does not resolve, as `(stage, engine)`
    pub fn dangling_engine_refs(&self) -> Vec<(String, String)> {
        self.stages
            .iter()
            .filter(|(_, stage)| !self.engines.contains_key(&stage.engine))
            .map(|(id, stage)| (id.clone(), stage.engine.clone()))
            .collect()
    }
}

/// An experimental condition: the ordered stages its players see
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConditionConfig {
    pub stages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    #[serde(rename = "displayName")]
    pub display_name: String,

    /// ID of the engine that renders this stage
    #[serde(alias = "engineID")]
    pub engine: String,

    /// Passed through to the game untouched
    #[serde(rename = "gameProperties", default)]
    pub game_properties: Map<String, Value>,

    /// Directory of the external task dataset, relative to the engine's data dir
    #[serde(
        rename = "taskDatasetRef",
        alias = "cli_fluency_task",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub task_dataset_ref: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(rename = "type")]
    pub engine_type: String,

    #[serde(
        rename = "taskID",
        alias = "cli_task_id",
        default,
        deserialize_with = "string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub task_id: Option<String>,

    /// Any other keys, kept for engine kinds the daemon does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Task IDs show up both as `"42"` and `42` in deployed configs
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "taskID must be a string or number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "conditions": {"A": {"stages": ["s1"]}},
        "stages": {"s1": {"engine": "e1", "taskDatasetRef": "task1", "displayName": "Stage One"}},
        "engines": {"e1": {"type": "CLFlashGameEngine", "taskID": "42"}}
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = GameConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.conditions["A"].stages, vec!["s1"]);
        assert_eq!(config.stages["s1"].display_name, "Stage One");
        assert_eq!(config.stages["s1"].task_dataset_ref.as_deref(), Some("task1"));
        assert_eq!(config.engines["e1"].task_id.as_deref(), Some("42"));
        assert!(config.dangling_engine_refs().is_empty());
    }

    #[test]
    fn test_legacy_keys() {
        let json = r#"{
            "conditions": {},
            "stages": {"s1": {"engine": "e1", "cli_fluency_task": "addition", "displayName": "Add"}},
            "engines": {"e1": {"type": "CLFlashGameEngine", "cli_task_id": 7}}
        }"#;
        let config = GameConfig::from_json(json).unwrap();
        assert_eq!(config.stages["s1"].task_dataset_ref.as_deref(), Some("addition"));
        assert_eq!(config.engines["e1"].task_id.as_deref(), Some("7"));
    }

    #[test]
    fn test_unknown_engine_keys_kept() {
        let json = r#"{
            "conditions": {},
            "stages": {},
            "engines": {"e2": {"type": "HTML5Engine", "entry": "main.js"}}
        }"#;
        let config = GameConfig::from_json(json).unwrap();
        let engine = &config.engines["e2"];
        assert_eq!(engine.engine_type, "HTML5Engine");
        assert!(engine.task_id.is_none());
        assert_eq!(engine.extra["entry"], "main.js");
    }

    #[test]
    fn test_dangling_engine_reference() {
        let json = r#"{
            "conditions": {},
            "stages": {"s1": {"engine": "missing", "displayName": "S"}},
            "engines": {}
        }"#;
        let config = GameConfig::from_json(json).unwrap();
        assert_eq!(
            config.dangling_engine_refs(),
            vec![("s1".to_string(), "missing".to_string())]
        );
    }

    #[test]
    fn test_missing_section_rejected() {
        assert!(GameConfig::from_json(r#"{"conditions": {}}"#).is_err());
    }
}
