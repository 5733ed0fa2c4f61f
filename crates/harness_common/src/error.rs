//! Error types for the fluency harness.

use std::fmt;
use std::io;
use std::sync::Arc;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, HarnessError>;

/// What kind of entity a lookup failed to find
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Condition,
    Stage,
    Engine,
    QuestionSet,
    Player,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Condition => "Condition",
            EntityKind::Stage => "Stage",
            EntityKind::Engine => "Engine",
            EntityKind::QuestionSet => "Question set",
            EntityKind::Player => "Player",
        };
        f.write_str(name)
    }
}

/// Errors surfaced by configuration, dataset and outcome operations.
///
/// Cloneable so a single failed load can be handed to every caller waiting
/// on it; I/O errors are shared behind an `Arc` for that reason.
#[derive(Error, Debug, Clone)]
pub enum HarnessError {
    #[error("Cannot parse game configuration {path}: {message}")]
    ConfigParse { path: String, message: String },

    #[error("Unsupported stage kind for stage '{stage_id}': {reason}")]
    UnsupportedStageKind { stage_id: String, reason: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("IO error: {0}")]
    Io(Arc<io::Error>),

    #[error("Cannot parse score report {artifact}: {message}")]
    ScoreParse { artifact: String, message: String },
}

impl HarnessError {
    pub fn config_parse(path: impl fmt::Display, message: impl fmt::Display) -> Self {
        HarnessError::ConfigParse {
            path: path.to_string(),
            message: message.to_string(),
        }
    }

    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        HarnessError::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn score_parse(artifact: impl Into<String>, message: impl fmt::Display) -> Self {
        HarnessError::ScoreParse {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }

    /// I/O failure for an operation abandoned through its cancellation token
    pub fn cancelled(what: impl fmt::Display) -> Self {
        HarnessError::Io(Arc::new(io::Error::new(
            io::ErrorKind::Interrupted,
            format!("{} cancelled", what),
        )))
    }

    /// I/O failure for an operation that ran past its deadline
    pub fn timed_out(what: impl fmt::Display) -> Self {
        HarnessError::Io(Arc::new(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("{} timed out", what),
        )))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, HarnessError::NotFound { .. })
    }

    /// Underlying I/O error kind, if this is an I/O failure
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            HarnessError::Io(e) => Some(e.kind()),
            _ => None,
        }
    }

    /// Process exit code used by the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::ConfigParse { .. } => 78,
            HarnessError::UnsupportedStageKind { .. } => 78,
            HarnessError::NotFound { .. } => 66,
            HarnessError::Io(_) => 74,
            HarnessError::ScoreParse { .. } => 65,
        }
    }
}

impl From<io::Error> for HarnessError {
    fn from(e: io::Error) -> Self {
        HarnessError::Io(Arc::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message() {
        let err = HarnessError::not_found(EntityKind::QuestionSet, "17");
        assert_eq!(err.to_string(), "Question set not found: 17");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_cancelled_is_io() {
        let err = HarnessError::cancelled("dataset load");
        assert_eq!(err.io_kind(), Some(io::ErrorKind::Interrupted));
        assert_eq!(
            HarnessError::timed_out("dataset load").io_kind(),
            Some(io::ErrorKind::TimedOut)
        );
    }

    #[test]
    fn test_clone_shares_io_error() {
        let err: HarnessError = io::Error::new(io::ErrorKind::PermissionDenied, "denied").into();
        let copy = err.clone();
        match (err, copy) {
            (HarnessError::Io(a), HarnessError::Io(b)) => assert!(Arc::ptr_eq(&a, &b)),
            _ => panic!("expected io errors"),
        }
    }
}
