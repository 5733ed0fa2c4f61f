//! Game engine registry.
//!
//! Decorates raw engine entries with the fields their type implies. Only the
//! CL Flash engine has derived fields today; other engine types are carried
//! through exactly as configured.

use harness_common::EngineConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub const CL_FLASH_GAME_ENGINE: &str = "CLFlashGameEngine";

const FLASH_GAMES_ROOT: &str = "/fluency/games/";
const FLASH_DATA_ROOT: &str = "/fluency/data/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    ClFlashGame,
    Other,
}

/// A configured engine plus its derived fields, serialized the way the game
/// client expects to receive it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Engine {
    #[serde(skip)]
    pub id: String,

    #[serde(rename = "type")]
    pub engine_type: String,

    #[serde(rename = "taskID", skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(rename = "swfPath", skip_serializing_if = "Option::is_none")]
    pub swf_path: Option<String>,

    #[serde(rename = "dataPath", skip_serializing_if = "Option::is_none")]
    pub data_path: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Engine {
    pub fn kind(&self) -> EngineKind {
        if self.engine_type == CL_FLASH_GAME_ENGINE {
            EngineKind::ClFlashGame
        } else {
            EngineKind::Other
        }
    }
}

/// Decorate one raw engine entry
pub fn decorate(id: &str, raw: &EngineConfig) -> Engine {
    let mut engine = Engine {
        id: id.to_string(),
        engine_type: raw.engine_type.clone(),
        task_id: raw.task_id.clone(),
        swf_path: None,
        data_path: None,
        extra: raw.extra.clone(),
    };

    if engine.kind() == EngineKind::ClFlashGame {
        match &raw.task_id {
            Some(task_id) => {
                engine.swf_path = Some(format!("{}{}", FLASH_GAMES_ROOT, task_id));
                engine.data_path = Some(format!("{}{}", FLASH_DATA_ROOT, task_id));
            }
            None => warn!("Engine '{}' is a {} without a taskID", id, CL_FLASH_GAME_ENGINE),
        }
    }

    engine
}

/// Decorate every engine in a configuration
pub fn decorate_all(raw: &BTreeMap<String, EngineConfig>) -> BTreeMap<String, Arc<Engine>> {
    raw.iter()
        .map(|(id, config)| (id.clone(), Arc::new(decorate(id, config))))
        .collect()
}
