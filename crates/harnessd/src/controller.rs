//! Game controller: the single entry point the request layer talks to.
//!
//! Resolves players through the player store, everything else through the
//! current hierarchy from the config store, and hands finished reports to
//! the outcome ingester.

use crate::artifacts::ArtifactStore;
use crate::config::ServerConfig;
use crate::config_store::ConfigStore;
use crate::engine::Engine;
use crate::hierarchy::Hierarchy;
use crate::ingest::OutcomeIngester;
use crate::reader::{FsReader, ResourceReader};
use crate::scope::IoScope;
use crate::stage::{QuestionSet, Stage, StageEnv};
use crate::store::{MemoryStore, OutcomeStore, PlayerStore, SqliteStore};
use harness_common::{Outcome, PlayerState, Result, StageSummary};
use std::sync::Arc;
use tracing::{debug, info};

pub struct GameController {
    config: ConfigStore,
    players: Arc<dyn PlayerStore>,
    outcomes: Arc<dyn OutcomeStore>,
    ingester: OutcomeIngester,
}

impl GameController {
    pub fn new(
        config: ConfigStore,
        players: Arc<dyn PlayerStore>,
        outcomes: Arc<dyn OutcomeStore>,
        artifacts: ArtifactStore,
    ) -> Self {
        let ingester = OutcomeIngester::new(artifacts, Arc::clone(&outcomes));
        Self {
            config,
            players,
            outcomes,
            ingester,
        }
    }

    /// Wire a controller from server settings, reading files from disk
    pub async fn from_server_config(settings: &ServerConfig) -> anyhow::Result<Self> {
        Self::with_reader(settings, Arc::new(FsReader)).await
    }

    pub async fn with_reader(
        settings: &ServerConfig,
        reader: Arc<dyn ResourceReader>,
    ) -> anyhow::Result<Self> {
        let env = StageEnv::new(&settings.paths.data, settings.debug_mode(), reader);
        let config = ConfigStore::new(&settings.paths.game_config, env);
        let artifacts = ArtifactStore::new(&settings.paths.output);

        let controller = match &settings.paths.database {
            Some(path) => {
                let store = Arc::new(SqliteStore::open(path).await?);
                Self::new(config, store.clone(), store, artifacts)
            }
            None => {
                info!("No database configured, keeping players and outcomes in memory");
                let store = Arc::new(MemoryStore::new());
                Self::new(config, store.clone(), store, artifacts)
            }
        };
        Ok(controller)
    }

    pub fn config_store(&self) -> &ConfigStore {
        &self.config
    }

    pub async fn hierarchy(&self, scope: &IoScope) -> Result<Arc<Hierarchy>> {
        self.config.get(scope).await
    }

    /// Force the next request to reload the game config
    pub async fn refresh(&self) {
        self.config.invalidate().await;
    }

    pub async fn all_condition_names(&self, scope: &IoScope) -> Result<Vec<String>> {
        Ok(self.hierarchy(scope).await?.all_condition_names())
    }

    pub async fn available_stages_for_player(
        &self,
        player_id: &str,
        scope: &IoScope,
    ) -> Result<Vec<StageSummary>> {
        let player = self.player_state(player_id, scope).await?;
        self.hierarchy(scope)
            .await?
            .available_stages_for_player(&player)
    }

    pub async fn stage(&self, stage_id: &str, scope: &IoScope) -> Result<Arc<Stage>> {
        let hierarchy = self.hierarchy(scope).await?;
        hierarchy.stage(stage_id).map(Arc::clone)
    }

    pub async fn engine_for_question_set(
        &self,
        question_set: &QuestionSet,
        scope: &IoScope,
    ) -> Result<Arc<Engine>> {
        let hierarchy = self.hierarchy(scope).await?;
        hierarchy.engine(&question_set.engine_id).map(Arc::clone)
    }

    pub async fn question_set_ids(&self, stage_id: &str, scope: &IoScope) -> Result<Vec<String>> {
        self.stage(stage_id, scope)
            .await?
            .all_question_set_ids(scope)
            .await
    }

    pub async fn question_set(
        &self,
        stage_id: &str,
        question_set_id: &str,
        scope: &IoScope,
    ) -> Result<QuestionSet> {
        self.stage(stage_id, scope)
            .await?
            .question_set(question_set_id, scope)
            .await
    }

    pub async fn next_question_set(
        &self,
        player_id: &str,
        stage_id: &str,
        scope: &IoScope,
    ) -> Result<QuestionSet> {
        let player = self.player_state(player_id, scope).await?;
        let stage = self.stage(stage_id, scope).await?;
        let question_set = stage.next_question_set(&player, scope).await?;
        debug!(
            "Player {} drew question set {} on stage {}",
            player.player_id, question_set.id, stage_id
        );
        Ok(question_set)
    }

    pub async fn instructions_html(
        &self,
        stage_id: &str,
        base_url: &str,
        scope: &IoScope,
    ) -> Result<String> {
        self.stage(stage_id, scope)
            .await?
            .instructions_html(base_url, scope)
            .await
    }

    pub async fn player_state(&self, player_id: &str, scope: &IoScope) -> Result<PlayerState> {
        scope.run("player lookup", self.players.find(player_id)).await
    }

    pub async fn save_player_state(&self, player: &PlayerState, scope: &IoScope) -> Result<()> {
        scope.run("player save", self.players.save(player)).await
    }

    /// Record a finished question set.
    ///
    /// Player, stage and question set are all resolved before the report is
    /// touched, so an unknown reference leaves no artifact behind.
    pub async fn save_question_set_results(
        &self,
        player_id: &str,
        stage_id: &str,
        question_set_id: &str,
        report: &str,
        scope: &IoScope,
    ) -> Result<Outcome> {
        let player = self.player_state(player_id, scope).await?;
        let question_set = self.question_set(stage_id, question_set_id, scope).await?;
        self.ingester
            .ingest(report, &player, &question_set, scope)
            .await
    }

    pub async fn outcomes_for_player(
        &self,
        player_id: &str,
        scope: &IoScope,
    ) -> Result<Vec<Outcome>> {
        scope
            .run("outcome query", self.outcomes.outcomes_for_player(player_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    const GAME: &str = r#"{
        "conditions": {"A": {"stages": ["s1"]}},
        "stages": {"s1": {"engine": "e1", "taskDatasetRef": "task1", "displayName": "Stage One"}},
        "engines": {"e1": {"type": "CLFlashGameEngine", "taskID": "42"}}
    }"#;

    fn settings(root: &Path) -> ServerConfig {
        let mut settings = ServerConfig::default();
        settings.paths.game_config = root.join("game.json");
        settings.paths.data = root.join("data");
        settings.paths.output = root.join("output");
        settings
    }

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("game.json"), GAME).unwrap();
        let task = dir.path().join("data").join("42").join("task1");
        fs::create_dir_all(&task).unwrap();
        fs::write(
            task.join("dataset.xml"),
            r#"<dataset><datafile name="q1.xml" id="1"/></dataset>"#,
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_unknown_player_is_not_found() {
        let dir = fixture();
        let controller = GameController::from_server_config(&settings(dir.path()))
            .await
            .unwrap();
        let err = controller
            .available_stages_for_player("ghost", &IoScope::unbounded())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_play_through() {
        let dir = fixture();
        let controller = GameController::from_server_config(&settings(dir.path()))
            .await
            .unwrap();
        let scope = IoScope::unbounded();

        controller
            .save_player_state(&PlayerState::new("p1", "A"), &scope)
            .await
            .unwrap();

        let stages = controller
            .available_stages_for_player("p1", &scope)
            .await
            .unwrap();
        assert_eq!(stages[0].id, "s1");

        let question_set = controller.next_question_set("p1", "s1", &scope).await.unwrap();
        assert_eq!(question_set.properties.source_file, "task1/q1.xml");

        let engine = controller
            .engine_for_question_set(&question_set, &scope)
            .await
            .unwrap();
        assert_eq!(engine.swf_path.as_deref(), Some("/fluency/games/42"));

        let outcome = controller
            .save_question_set_results(
                "p1",
                "s1",
                "1",
                r#"<SCORE_SUMMARY><Score TOTAL_SCORE="5"/></SCORE_SUMMARY>"#,
                &scope,
            )
            .await
            .unwrap();
        assert_eq!(outcome.score, 5);
        assert_eq!(outcome.medal, "none");
        assert_eq!(
            controller.outcomes_for_player("p1", &scope).await.unwrap(),
            vec![outcome]
        );
    }

    #[tokio::test]
    async fn test_unknown_question_set_writes_no_artifact() {
        let dir = fixture();
        let controller = GameController::from_server_config(&settings(dir.path()))
            .await
            .unwrap();
        let scope = IoScope::unbounded();
        controller
            .save_player_state(&PlayerState::new("p1", "A"), &scope)
            .await
            .unwrap();

        let err = controller
            .save_question_set_results("p1", "s1", "99", "<SCORE_SUMMARY/>", &scope)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("output").exists());
    }

    #[tokio::test]
    async fn test_sqlite_backed_controller() {
        let dir = fixture();
        let mut settings = settings(dir.path());
        settings.paths.database = Some(dir.path().join("harness.db"));
        let controller = GameController::from_server_config(&settings).await.unwrap();
        let scope = IoScope::unbounded();

        controller
            .save_player_state(&PlayerState::new("p1", "A"), &scope)
            .await
            .unwrap();
        assert_eq!(
            controller.player_state("p1", &scope).await.unwrap().condition,
            "A"
        );
    }
}
