//! Score report ingestion.
//!
//! Order matters here: the raw report is written to its artifact file
//! before it is parsed, so a report we cannot understand is still on disk
//! for diagnosis. The outcome is built as a plain value and only then handed
//! to the outcome store together with the already-resolved player.

use crate::artifacts::ArtifactStore;
use crate::report::ScoreReport;
use crate::scope::IoScope;
use crate::stage::QuestionSet;
use crate::store::OutcomeStore;
use crate::xml::XmlError;
use chrono::{DateTime, Utc};
use harness_common::{HarnessError, Outcome, PlayerState, Result};
use std::sync::Arc;
use tracing::{info, warn};

pub struct OutcomeIngester {
    artifacts: ArtifactStore,
    outcomes: Arc<dyn OutcomeStore>,
}

impl OutcomeIngester {
    pub fn new(artifacts: ArtifactStore, outcomes: Arc<dyn OutcomeStore>) -> Self {
        Self {
            artifacts,
            outcomes,
        }
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Store, parse and record one engine report
    pub async fn ingest(
        &self,
        text: &str,
        player: &PlayerState,
        question_set: &QuestionSet,
        scope: &IoScope,
    ) -> Result<Outcome> {
        let received_at = Utc::now();
        let artifact = self.artifacts.write_new(text, scope).await?;

        let outcome = build_outcome(&artifact, text, player, question_set, received_at)
            .map_err(|e| {
                warn!("Unreadable score report kept as {}: {}", artifact, e);
                e
            })?;

        scope
            .run("outcome save", self.outcomes.save_outcome(player, &outcome))
            .await?;

        info!(
            "Recorded outcome for player {} on {}/{}: score {}, medal {}",
            player.player_id, outcome.stage_id, outcome.question_set_id, outcome.score, outcome.medal
        );
        Ok(outcome)
    }
}

/// Turn a report into an outcome value. Nothing is persisted here.
pub fn build_outcome(
    artifact: &str,
    text: &str,
    player: &PlayerState,
    question_set: &QuestionSet,
    received_at: DateTime<Utc>,
) -> Result<Outcome> {
    let parse_error = |e: XmlError| HarnessError::score_parse(artifact, e);
    let report = ScoreReport::parse(text).map_err(parse_error)?;

    Ok(Outcome {
        artifact_file_name: artifact.to_string(),
        player_id: player.player_id.clone(),
        condition: player.condition.clone(),
        stage_id: question_set.stage_id.clone(),
        question_set_id: question_set.id.clone(),
        end_time_seconds: received_at.timestamp(),
        elapsed_millis: report.elapsed_millis().map_err(parse_error)?,
        score: report.score().map_err(parse_error)?,
        medal: report.medal().to_string(),
        end_state: report.end_state().map(str::to_string),
    })
}
