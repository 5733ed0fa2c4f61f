//! The decorated game hierarchy: engines, stages and conditions.

use crate::engine::{self, Engine};
use crate::stage::{Stage, StageEnv};
use harness_common::{ConditionConfig, EntityKind, GameConfig, HarnessError, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

pub struct Hierarchy {
    pub(crate) conditions: BTreeMap<String, ConditionConfig>,
    engines: BTreeMap<String, Arc<Engine>>,
    stages: BTreeMap<String, Arc<Stage>>,
    rejected: Vec<HarnessError>,
}

impl Hierarchy {
    /// Decorate a raw configuration.
    ///
    /// A stage that names an unknown engine fails the whole build. A stage of
    /// an unsupported kind is left out and reported through
    /// [`Hierarchy::rejected_stages`].
    pub fn build(config: GameConfig, env: &StageEnv, source: &str) -> Result<Self> {
        if let Some((stage_id, engine_id)) = config.dangling_engine_refs().into_iter().next() {
            return Err(HarnessError::config_parse(
                source,
                format!("stage '{}' references unknown engine '{}'", stage_id, engine_id),
            ));
        }

        let engines = engine::decorate_all(&config.engines);

        let mut stages = BTreeMap::new();
        let mut rejected = Vec::new();
        for (id, stage_config) in &config.stages {
            let engine = Arc::clone(&engines[&stage_config.engine]);
            match Stage::new(id, stage_config, engine, env) {
                Ok(stage) => {
                    stages.insert(id.clone(), Arc::new(stage));
                }
                Err(e) => {
                    warn!("Skipping stage: {}", e);
                    rejected.push(e);
                }
            }
        }

        Ok(Self {
            conditions: config.conditions,
            engines,
            stages,
            rejected,
        })
    }

    pub fn engine(&self, engine_id: &str) -> Result<&Arc<Engine>> {
        self.engines
            .get(engine_id)
            .ok_or_else(|| HarnessError::not_found(EntityKind::Engine, engine_id))
    }

    pub fn stage(&self, stage_id: &str) -> Result<&Arc<Stage>> {
        self.stages
            .get(stage_id)
            .ok_or_else(|| HarnessError::not_found(EntityKind::Stage, stage_id))
    }

    pub fn engines(&self) -> impl Iterator<Item = &Arc<Engine>> {
        self.engines.values()
    }

    pub fn stages(&self) -> impl Iterator<Item = &Arc<Stage>> {
        self.stages.values()
    }

    /// Stages dropped at build time, with the reason
    pub fn rejected_stages(&self) -> &[HarnessError] {
        &self.rejected
    }
}
