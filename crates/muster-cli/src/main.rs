//! # Muster
//!
//! Mission decomposition command-line tool: load a mission document, expand
//! it into a task graph, and report every valid decomposition.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

mod config;
mod document;
mod report;

use config::RunConfig;
use document::MissionDocument;
use report::PlanReport;

use muster_graph::GraphBuilder;
use muster_planner::{derive_constraints, enumerate, linearize};

/// Decompose an annotated multi-robot mission into valid plans.
#[derive(Parser)]
#[command(name = "muster", about = "Multi-robot mission decomposition", version)]
struct Cli {
    /// Path to the mission document (JSON)
    mission: PathBuf,

    /// Initial world state file (JSON), overriding the document's facts
    #[arg(short, long)]
    world: Option<PathBuf>,

    /// Tool configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Increase log verbosity
    #[arg(short, long)]
    verbose: bool,
}

/// Run the decomposition pipeline over one mission document.
fn run(cli: &Cli, config: &RunConfig) -> Result<PlanReport> {
    let document = MissionDocument::load(&cli.mission)?;
    let state = document.initial_state(cli.world.as_deref())?;

    info!(
        "📋 Mission loaded with {} task definitions and {} initial facts",
        document.instances.len(),
        state.len()
    );

    let builder = GraphBuilder::new(
        &document.instances,
        &document.paths,
        &document.goal_model,
        &document.variables,
        &config.mappings,
        &state,
    );
    let graph = builder
        .build(&document.annotation)
        .context("Mission graph construction failed")?;

    let queue = linearize(&graph);
    let constraints = derive_constraints(&graph, &queue);
    info!(
        "🔧 {} queue entries, {} constraints derived",
        queue.len(),
        constraints.len()
    );

    let plans = enumerate(&graph, queue, &state, &constraints)
        .context("Decomposition search failed")?;
    info!("✅ Mission admits {} valid decompositions", plans.len());

    Ok(PlanReport::assemble(&graph, &constraints, &plans))
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("🚀 Muster starting...");

    let config = RunConfig::load(cli.config.as_deref())?;
    let report = run(&cli, &config)?;
    let rendered =
        serde_json::to_string_pretty(&report).context("Failed to render the report")?;

    match cli.output.as_ref().or(config.output.as_ref()) {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            info!("✅ Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MISSION: &str = r#"{
        "instances": {
            "CleanRoom": [
                {
                    "id": "AT1_1",
                    "name": "CleanRoom",
                    "robots": {"fixed": 1},
                    "location": {"single": "room1"},
                    "bindings": [{"variable": "?rm", "value": {"object": "room1"}}],
                    "triggers": []
                }
            ]
        },
        "paths": {
            "CleanRoom": [
                [
                    {
                        "name": "vacuum",
                        "parameters": [{"name": "?rm", "sort": "room"}],
                        "capabilities": ["vacuuming"],
                        "preconditions": [],
                        "effects": [
                            {"predicate": "clean", "args": [{"variable": "?rm"}], "positive": true}
                        ]
                    }
                ]
            ]
        },
        "annotation": {
            "kind": "task",
            "content": "AT1_1"
        },
        "world": []
    }"#;

    #[test]
    fn test_run_produces_a_report() {
        let mut mission = tempfile::NamedTempFile::new().unwrap();
        write!(mission, "{}", MISSION).unwrap();

        let cli = Cli {
            mission: mission.path().to_path_buf(),
            world: None,
            config: None,
            output: None,
            verbose: false,
        };

        let report = run(&cli, &RunConfig::default()).unwrap();

        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].id, "AT1_1");
        assert_eq!(report.plans.len(), 1);
        assert_eq!(report.plans[0].steps[0].decomposition, "AT1_1|1");
        assert_eq!(report.actions, vec!["vacuum"]);
        assert!(report.constraints.is_empty());
    }

    #[test]
    fn test_run_rejects_unknown_mission_file() {
        let cli = Cli {
            mission: PathBuf::from("/nonexistent/mission.json"),
            world: None,
            config: None,
            output: None,
            verbose: false,
        };

        assert!(run(&cli, &RunConfig::default()).is_err());
    }
}
