//! harnessd - fluency harness game core
//!
//! Command-line front end over the game controller: validates the game
//! config, resolves stages and question sets, and records score reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use harness_common::{HarnessError, PlayerState};
use harnessd::{GameController, IoScope, ServerConfig};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "harnessd")]
#[command(about = "Fluency harness - game configuration and outcome core", long_about = None)]
#[command(version)]
struct Cli {
    /// Read settings from this file instead of the default locations
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Force debug mode (reload the game config on every request)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and decorate the game config, reporting rejected stages
    Check,

    /// List condition names
    Conditions,

    /// List the stages a condition plays, in order
    Stages {
        #[arg(long)]
        condition: String,
    },

    /// List the question set IDs of a stage
    QuestionSets {
        #[arg(long)]
        stage: String,
    },

    /// Draw a random question set for a player
    Next {
        #[arg(long)]
        player: String,

        #[arg(long)]
        stage: String,
    },

    /// Print the instructions page of a stage
    Instructions {
        #[arg(long)]
        stage: String,

        /// Prefix for rewritten image URLs (defaults to the configured one)
        #[arg(long)]
        base_url: Option<String>,
    },

    /// Register a player in a condition
    AddPlayer {
        #[arg(long)]
        player: String,

        #[arg(long)]
        condition: String,
    },

    /// Record a score report for a finished question set
    Ingest {
        #[arg(long)]
        player: String,

        #[arg(long)]
        stage: String,

        #[arg(long)]
        question_set: String,

        /// Report XML file
        report: PathBuf,
    },

    /// List the outcomes recorded for a player
    Outcomes {
        #[arg(long)]
        player: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{:#}", e);
        let code = e
            .downcast_ref::<HarnessError>()
            .map(HarnessError::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut settings = match &cli.config {
        Some(path) => ServerConfig::load_from_path(path)?,
        None => ServerConfig::load(),
    };
    if cli.debug {
        settings.harness.debug = true;
    }

    info!("harnessd v{} starting", env!("CARGO_PKG_VERSION"));

    let controller = GameController::from_server_config(&settings)
        .await
        .context("Failed to initialise game controller")?;

    let scope = settings.scope();
    let cancel = scope.cancel_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling pending I/O");
            cancel.cancel();
        }
    });

    match cli.command {
        Commands::Check => check(&controller, &scope).await,
        Commands::Conditions => {
            for name in controller.all_condition_names(&scope).await? {
                println!("{}", name);
            }
            Ok(())
        }
        Commands::Stages { condition } => {
            let hierarchy = controller.hierarchy(&scope).await?;
            let member = PlayerState::new("", condition);
            let stages = hierarchy
                .available_stages_for_player(&member)?
                .iter()
                .map(|summary| hierarchy.stage(&summary.id).map(|stage| stage.describe()))
                .collect::<harness_common::Result<Vec<_>>>()?;
            println!("{}", serde_json::to_string_pretty(&stages)?);
            Ok(())
        }
        Commands::QuestionSets { stage } => {
            for id in controller.question_set_ids(&stage, &scope).await? {
                println!("{}", id);
            }
            Ok(())
        }
        Commands::Next { player, stage } => {
            let question_set = controller.next_question_set(&player, &stage, &scope).await?;
            let engine = controller
                .engine_for_question_set(&question_set, &scope)
                .await?;
            let out = serde_json::json!({
                "questionSet": question_set,
                "engine": engine.as_ref(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
            Ok(())
        }
        Commands::Instructions { stage, base_url } => {
            let base_url = base_url.unwrap_or_else(|| settings.harness.base_url.clone());
            println!(
                "{}",
                controller.instructions_html(&stage, &base_url, &scope).await?
            );
            Ok(())
        }
        Commands::AddPlayer { player, condition } => {
            let names = controller.all_condition_names(&scope).await?;
            if !names.contains(&condition) {
                return Err(HarnessError::not_found(
                    harness_common::EntityKind::Condition,
                    condition,
                )
                .into());
            }
            controller
                .save_player_state(&PlayerState::new(player.clone(), condition), &scope)
                .await?;
            info!("Saved player {}", player);
            Ok(())
        }
        Commands::Ingest {
            player,
            stage,
            question_set,
            report,
        } => {
            let text = tokio::fs::read_to_string(&report)
                .await
                .with_context(|| format!("Failed to read report {}", report.display()))?;
            let outcome = controller
                .save_question_set_results(&player, &stage, &question_set, &text, &scope)
                .await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(())
        }
        Commands::Outcomes { player } => {
            let outcomes = controller.outcomes_for_player(&player, &scope).await?;
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
            Ok(())
        }
    }
}

async fn check(controller: &GameController, scope: &IoScope) -> Result<()> {
    let hierarchy = controller.hierarchy(scope).await?;
    let stages = hierarchy.stages().count();
    let engines = hierarchy.engines().count();
    println!(
        "{}: {} conditions, {} stages, {} engines",
        controller.config_store().path().display(),
        hierarchy.all_condition_names().len(),
        stages,
        engines
    );
    for rejected in hierarchy.rejected_stages() {
        println!("  rejected: {}", rejected);
    }
    for stage in hierarchy.stages() {
        if let Err(e) = stage.task_dataset(scope).await {
            println!("  stage {}: {}", stage.id(), e);
        }
    }
    Ok(())
}
