//! Root game configuration cache.
//!
//! Production mode loads and decorates the configuration once and serves
//! that tree until `invalidate()`. Debug mode re-reads and re-decorates on
//! every `get()` so edits to the file show up on the next request. Either
//! way a new tree is only published once it is fully built, and a failed
//! reload leaves the previous tree in place.

use crate::hierarchy::Hierarchy;
use crate::scope::IoScope;
use crate::stage::StageEnv;
use harness_common::{GameConfig, HarnessError, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct ConfigStore {
    path: PathBuf,
    env: StageEnv,
    cached: RwLock<Option<Arc<Hierarchy>>>,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>, env: StageEnv) -> Self {
        Self {
            path: path.into(),
            env,
            cached: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_debug(&self) -> bool {
        self.env.debug
    }

    /// Read and parse the raw configuration file
    pub async fn load(&self, scope: &IoScope) -> Result<GameConfig> {
        info!("Reading game config: {}", self.path.display());
        scope
            .run("game config load", async {
                let text = self
                    .env
                    .reader
                    .read_to_string(&self.path)
                    .await
                    .map_err(|e| HarnessError::config_parse(self.path.display(), e))?;
                GameConfig::from_json(&text)
                    .map_err(|e| HarnessError::config_parse(self.path.display(), e))
            })
            .await
    }

    /// The decorated hierarchy, loading it as the cache policy requires
    pub async fn get(&self, scope: &IoScope) -> Result<Arc<Hierarchy>> {
        if !self.env.debug {
            if let Some(hierarchy) = self.cached.read().await.as_ref() {
                return Ok(Arc::clone(hierarchy));
            }
        }

        let hierarchy = match self.build(scope).await {
            Ok(hierarchy) => Arc::new(hierarchy),
            Err(e) => {
                warn!("Game config reload failed: {}", e);
                return Err(e);
            }
        };

        let mut cached = self.cached.write().await;
        if !self.env.debug {
            // Another caller may have finished a first load while we built ours.
            if let Some(existing) = cached.as_ref() {
                debug!("Discarding duplicate game config load");
                return Ok(Arc::clone(existing));
            }
        }
        *cached = Some(Arc::clone(&hierarchy));
        Ok(hierarchy)
    }

    /// Drop the cached tree (and with it every stage's dataset cache)
    pub async fn invalidate(&self) {
        info!("Invalidating game config cache");
        *self.cached.write().await = None;
    }

    /// Last successfully built tree, without triggering a load
    pub async fn current(&self) -> Option<Arc<Hierarchy>> {
        self.cached.read().await.clone()
    }

    async fn build(&self, scope: &IoScope) -> Result<Hierarchy> {
        let config = self.load(scope).await?;
        let source = self.path.display().to_string();
        Hierarchy::build(config, &self.env, &source)
    }
}
