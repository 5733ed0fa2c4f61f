//! harnessd - game configuration and outcome core of the fluency harness
//!
//! Resolves conditions to stages and stages to question sets from a JSON
//! game config, serves instruction pages, and records score reports.

pub mod artifacts;
pub mod conditions;
pub mod config;
pub mod config_store;
pub mod controller;
pub mod dataset;
pub mod engine;
pub mod hierarchy;
pub mod ingest;
pub mod reader;
pub mod report;
pub mod scope;
pub mod single_flight;
pub mod stage;
pub mod store;
pub mod xml;

pub use config::ServerConfig;
pub use config_store::ConfigStore;
pub use controller::GameController;
pub use hierarchy::Hierarchy;
pub use scope::IoScope;
pub use stage::{QuestionSet, Stage, StageEnv, TaskDataset};
