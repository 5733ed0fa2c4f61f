//! Runtime stages and their question-set datasets.
//!
//! A stage owns a lazily loaded dataset of question sets read from
//! `<data dir>/<engine taskID>/<taskDatasetRef>/dataset.xml`. Outside debug
//! mode the dataset is cached on the stage after the first successful load.
//! First loads go through a single-flight group keyed by stage, so callers
//! racing on a cold stage share one read and one result.

use crate::dataset::{self, DatasetRecord, DATASET_FILE_NAME};
use crate::engine::Engine;
use crate::reader::ResourceReader;
use crate::scope::IoScope;
use crate::single_flight::SingleFlight;
use harness_common::{
    EntityKind, HarnessError, PlayerState, Result, StageConfig, StageSummary,
};
use rand::seq::SliceRandom;
use rand::Rng;
use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, RwLock};
use tracing::{debug, info, warn};

const INSTRUCTIONS_FILE: &str = "ft_instructions.html";
const TIPS_FILE: &str = "ft_tips.html";

/// Replacement for an instructions or tips fragment that does not exist
pub const NOT_AVAILABLE_HTML: &str = "<p>Not available.</p>";

static XML_PROLOG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<\?xml [^>]*\?>").unwrap());
static RELATIVE_IMG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<img src=['"])\./"#).unwrap());

/// Single-flight key: one stage's dataset file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StageKey {
    pub stage_id: String,
    pub dataset_path: PathBuf,
}

pub type DatasetLoads = SingleFlight<StageKey, Arc<TaskDataset>>;

/// What every stage needs from the process around it
#[derive(Clone)]
pub struct StageEnv {
    /// Root of the engines' data directories
    pub data_path: PathBuf,
    pub debug: bool,
    pub reader: Arc<dyn ResourceReader>,
    pub loads: Arc<DatasetLoads>,
}

impl StageEnv {
    pub fn new(data_path: impl Into<PathBuf>, debug: bool, reader: Arc<dyn ResourceReader>) -> Self {
        Self {
            data_path: data_path.into(),
            debug,
            reader,
            loads: Arc::new(DatasetLoads::new()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSetProperties {
    /// Data file of this set, relative to the engine's data directory
    #[serde(rename = "sourceFile")]
    pub source_file: String,
}

/// One playable unit of a stage. Refers back to its stage by ID only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSet {
    pub id: String,
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "stageID")]
    pub stage_id: String,
    #[serde(rename = "engineID")]
    pub engine_id: String,
    pub properties: QuestionSetProperties,
}

/// A loaded dataset: question sets keyed by ID, in dataset order
#[derive(Debug, Clone, Default)]
pub struct TaskDataset {
    order: Vec<String>,
    by_id: HashMap<String, QuestionSet>,
}

impl TaskDataset {
    fn build(stage_id: &str, engine_id: &str, task_ref: &str, records: Vec<DatasetRecord>) -> Self {
        let mut dataset = TaskDataset::default();
        for record in records {
            let question_set = QuestionSet {
                id: record.id.clone(),
                display_name: record.id.clone(),
                stage_id: stage_id.to_string(),
                engine_id: engine_id.to_string(),
                properties: QuestionSetProperties {
                    source_file: format!("{}/{}", task_ref, record.name),
                },
            };
            // A repeated ID replaces the earlier entry but keeps its position.
            if dataset.by_id.insert(record.id.clone(), question_set).is_none() {
                dataset.order.push(record.id);
            }
        }
        dataset
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn get(&self, id: &str) -> Option<&QuestionSet> {
        self.by_id.get(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Uniform pick with replacement
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&QuestionSet> {
        self.order.choose(rng).and_then(|id| self.by_id.get(id))
    }
}

pub struct Stage {
    id: String,
    display_name: String,
    engine: Arc<Engine>,
    game_properties: Map<String, Value>,
    task_ref: String,
    engine_data_dir: PathBuf,
    debug: bool,
    reader: Arc<dyn ResourceReader>,
    loads: Arc<DatasetLoads>,
    cached: Arc<RwLock<Option<Arc<TaskDataset>>>>,
}

impl Stage {
    /// Build the runtime stage. Only stages backed by an external task
    /// dataset are supported.
    pub fn new(id: &str, config: &StageConfig, engine: Arc<Engine>, env: &StageEnv) -> Result<Self> {
        let task_ref = config
            .task_dataset_ref
            .clone()
            .ok_or_else(|| HarnessError::UnsupportedStageKind {
                stage_id: id.to_string(),
                reason: "no taskDatasetRef".to_string(),
            })?;
        let task_id = engine
            .task_id
            .clone()
            .ok_or_else(|| HarnessError::UnsupportedStageKind {
                stage_id: id.to_string(),
                reason: format!("engine '{}' has no taskID", engine.id),
            })?;

        Ok(Self {
            id: id.to_string(),
            display_name: config.display_name.clone(),
            game_properties: config.game_properties.clone(),
            task_ref,
            engine_data_dir: env.data_path.join(task_id),
            engine,
            debug: env.debug,
            reader: Arc::clone(&env.reader),
            loads: Arc::clone(&env.loads),
            cached: Arc::new(RwLock::new(None)),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn game_properties(&self) -> &Map<String, Value> {
        &self.game_properties
    }

    pub fn task_dataset_ref(&self) -> &str {
        &self.task_ref
    }

    pub fn dataset_path(&self) -> PathBuf {
        self.engine_data_dir.join(&self.task_ref).join(DATASET_FILE_NAME)
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
        }
    }

    /// Client-facing description of the stage
    pub fn describe(&self) -> Value {
        json!({
            "id": self.id,
            "displayName": self.display_name,
            "engineID": self.engine.id,
            "gameProperties": self.game_properties,
        })
    }

    /// Dataset already held by this stage, if any
    pub fn cached_dataset(&self) -> Option<Arc<TaskDataset>> {
        read_cache(&self.cached)
    }

    /// The stage's question sets, loading them if needed
    pub async fn task_dataset(&self, scope: &IoScope) -> Result<Arc<TaskDataset>> {
        if !self.debug {
            if let Some(dataset) = self.cached_dataset() {
                debug!("Task dataset cache hit for stage {}", self.id);
                return Ok(dataset);
            }
        }

        let key = StageKey {
            stage_id: self.id.clone(),
            dataset_path: self.dataset_path(),
        };
        let load = DatasetLoad {
            reader: Arc::clone(&self.reader),
            path: key.dataset_path.clone(),
            stage_id: self.id.clone(),
            engine_id: self.engine.id.clone(),
            task_ref: self.task_ref.clone(),
        };
        let cache = (!self.debug).then(|| Arc::clone(&self.cached));
        let leader = scope.clone();

        // The leader's scope bounds the shared load; every caller's own scope
        // bounds its wait on it.
        let shared = self.loads.run(key, move || async move {
            let dataset = Arc::new(leader.run("task dataset load", load.run()).await?);
            if let Some(cache) = cache {
                write_cache(&cache, Arc::clone(&dataset));
            }
            Ok(dataset)
        });
        let dataset = scope.run("task dataset wait", shared).await?;

        // A load started by another stage object for the same dataset only
        // filled that object's cache.
        if !self.debug && self.cached_dataset().is_none() {
            write_cache(&self.cached, Arc::clone(&dataset));
        }
        Ok(dataset)
    }

    pub async fn all_question_set_ids(&self, scope: &IoScope) -> Result<Vec<String>> {
        Ok(self.task_dataset(scope).await?.ids().to_vec())
    }

    pub async fn question_set(&self, question_set_id: &str, scope: &IoScope) -> Result<QuestionSet> {
        self.task_dataset(scope)
            .await?
            .get(question_set_id)
            .cloned()
            .ok_or_else(|| HarnessError::not_found(EntityKind::QuestionSet, question_set_id))
    }

    /// Random question set, drawn with replacement. The player is not used
    /// to personalise the draw.
    pub async fn next_question_set(&self, _player: &PlayerState, scope: &IoScope) -> Result<QuestionSet> {
        let dataset = self.task_dataset(scope).await?;
        let picked = dataset.choose(&mut rand::thread_rng()).cloned();
        picked.ok_or_else(|| {
            HarnessError::not_found(EntityKind::QuestionSet, format!("any in stage {}", self.id))
        })
    }

    /// Instructions and tips for this stage as one HTML fragment
    pub async fn instructions_html(&self, base_url: &str, scope: &IoScope) -> Result<String> {
        let instructions_path = self.engine_data_dir.join(INSTRUCTIONS_FILE);
        let tips_path = self.engine_data_dir.join(&self.task_ref).join(TIPS_FILE);

        let (instructions, tips) = scope
            .run("instructions load", async {
                tokio::try_join!(
                    self.read_fragment(&instructions_path, base_url),
                    self.read_fragment(&tips_path, base_url)
                )
            })
            .await?;

        Ok(format!(
            "<h2>Instructions</h2>{}<h2>Tips</h2>{}",
            instructions, tips
        ))
    }

    async fn read_fragment(&self, path: &Path, base_url: &str) -> Result<String> {
        match self.reader.read_to_string(path).await {
            Ok(text) => Ok(rewrite_fragment(&text, base_url, self.task_id())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Instruction fragment missing: {}", path.display());
                Ok(NOT_AVAILABLE_HTML.to_string())
            }
            Err(e) => {
                warn!("Error reading {}: {}", path.display(), e);
                Err(e.into())
            }
        }
    }

    fn task_id(&self) -> &str {
        self.engine.task_id.as_deref().unwrap_or_default()
    }
}

/// Everything a dataset load needs, owned so it can run as its own task
struct DatasetLoad {
    reader: Arc<dyn ResourceReader>,
    path: PathBuf,
    stage_id: String,
    engine_id: String,
    task_ref: String,
}

impl DatasetLoad {
    async fn run(self) -> Result<TaskDataset> {
        info!("Reading task dataset: {}", self.path.display());
        let text = self.reader.read_to_string(&self.path).await.map_err(|e| {
            warn!("Error reading task dataset {}: {}", self.path.display(), e);
            HarnessError::from(e)
        })?;

        let records = dataset::parse_dataset(&text)
            .map_err(|e| HarnessError::config_parse(self.path.display(), e))?;

        let dataset = TaskDataset::build(&self.stage_id, &self.engine_id, &self.task_ref, records);
        info!(
            "Loaded {} question sets for stage {}",
            dataset.len(),
            self.stage_id
        );
        Ok(dataset)
    }
}

/// Drop the XML prolog and point `./` image sources at the engine's data
/// directory under `base_url`
fn rewrite_fragment(text: &str, base_url: &str, task_id: &str) -> String {
    let without_prolog = XML_PROLOG.replace(text, "");
    RELATIVE_IMG
        .replace_all(&without_prolog, |caps: &Captures| {
            format!("{}{}/data/{}/", &caps[1], base_url, task_id)
        })
        .into_owned()
}

fn read_cache(cache: &RwLock<Option<Arc<TaskDataset>>>) -> Option<Arc<TaskDataset>> {
    cache
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .clone()
}

fn write_cache(cache: &RwLock<Option<Arc<TaskDataset>>>, dataset: Arc<TaskDataset>) {
    *cache.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(dataset);
}
