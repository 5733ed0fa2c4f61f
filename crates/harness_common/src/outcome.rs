//! Question-set outcome records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Medal recorded when a report names none
pub const NO_MEDAL: &str = "none";

/// A player's result on one question set.
///
/// `artifact_file_name` points at the raw report kept under the output
/// directory; it is unique for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outcome {
    pub artifact_file_name: String,
    #[serde(rename = "playerID")]
    pub player_id: String,
    pub condition: String,
    #[serde(rename = "stageID")]
    pub stage_id: String,
    #[serde(rename = "questionSetID")]
    pub question_set_id: String,
    pub end_time_seconds: i64,
    pub elapsed_millis: u64,
    pub score: i64,
    pub medal: String,
    pub end_state: Option<String>,
}

impl Outcome {
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.end_time_seconds, 0)
    }

    pub fn has_medal(&self) -> bool {
        self.medal != NO_MEDAL
    }
}
