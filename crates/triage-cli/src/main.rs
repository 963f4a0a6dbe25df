use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use triage_core::{
    JsonFilePolicyStore, LearningConfig, LinearRiskModel, PolicyStore, QLearningScheduler,
    RiskModel, VitalSigns, VitalsRuleModel, assess,
};

#[derive(Parser)]
#[command(name = "triage", version, about = "Patient risk triage and scheduling policy tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assess a patient's risk from a vital signs file
    Assess {
        /// Path to a JSON file with the patient's vital signs
        #[arg(short, long)]
        vitals: PathBuf,

        /// Linear model artifact (falls back to the vitals rule model)
        #[arg(short, long, env = "TRIAGE_MODEL_PATH")]
        model: Option<PathBuf>,
    },

    /// Show the learned scheduling policy
    Policy {
        /// Path to the persisted Q-table
        #[arg(short, long, env = "TRIAGE_POLICY_PATH", default_value = "q_table.json")]
        path: PathBuf,

        /// Number of states to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("triage=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Assess { vitals, model } => cmd_assess(&vitals, model.as_deref())?,
        Commands::Policy { path, limit } => cmd_policy(&path, limit)?,
    }

    Ok(())
}

fn load_model(path: Option<&Path>) -> Result<Box<dyn RiskModel>> {
    match path {
        Some(path) => {
            let model = LinearRiskModel::from_json_file(path)
                .with_context(|| format!("Failed to load model artifact: {}", path.display()))?;
            Ok(Box::new(model))
        }
        None => Ok(Box::new(VitalsRuleModel)),
    }
}

fn cmd_assess(vitals_path: &Path, model_path: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(vitals_path)
        .with_context(|| format!("Failed to read vitals file: {}", vitals_path.display()))?;
    let vitals: VitalSigns = serde_json::from_str(&raw).context("Invalid vital signs JSON")?;

    let model = load_model(model_path)?;
    tracing::info!(model = %model.name(), "Assessing patient");

    let critical_factor = vitals.critical_factor();
    let assessment = assess(model.as_ref(), vitals, Utc::now())?;

    let output = serde_json::json!({
        "model": model.name(),
        "risk_level": assessment.risk_level,
        "confidence_score": assessment.confidence_score,
        "priority_score": assessment.priority_score,
        "critical_factor": critical_factor,
        "assessed_at": assessment.assessed_at,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}

fn cmd_policy(path: &Path, limit: usize) -> Result<()> {
    let store = JsonFilePolicyStore::new(path);
    let Some(table) = store.load()? else {
        println!("No learned policy at {}", path.display());
        return Ok(());
    };

    let states = table.len();
    let scheduler = QLearningScheduler::new(LearningConfig::default()).with_table(table);

    println!("Learned policy from {} ({} states):\n", path.display(), states);

    for (state, values) in scheduler.q_table().iter().take(limit) {
        let action = scheduler.best_action(state);
        let value = values.get(&action).copied().unwrap_or(0.0);
        println!("  {state:<32} {:<10} (Q = {value:.3})", action.as_str());
    }

    if states > limit {
        println!("\n... and {} more", states - limit);
    }

    Ok(())
}
