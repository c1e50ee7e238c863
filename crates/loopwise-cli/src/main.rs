//! CLI for loopwise.
//!
//! Makes single decisions or replays a session script of decisions and
//! feedback against one agent. Results go to stdout as JSON, logs to stderr.

mod provider;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use loopwise_agent::{AgentConfig, DecisionAgent};
use loopwise_core::DataMap;
use provider::{Provider, ProviderKind};
use serde_json::json;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make one decision from an operational snapshot
    Decide {
        /// Decision type, e.g. maintenance, energy_optimization, fault_diagnosis
        #[arg(long = "type")]
        decision_type: String,

        /// JSON object with operational data ("-" reads stdin)
        #[arg(long)]
        data: PathBuf,

        /// Optional JSON object with additional context
        #[arg(long)]
        context: Option<PathBuf>,

        /// Completion provider
        #[arg(long, value_enum, default_value = "offline")]
        provider: ProviderKind,

        /// Agent config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Replay a JSONL session script of decisions and feedback
    Session {
        /// Script path ("-" reads stdin)
        #[arg(long)]
        script: PathBuf,

        /// Write the feedback loop export here
        #[arg(long)]
        export: Option<PathBuf>,

        /// Write the agent export here (plus `<file>_feedback.json`)
        #[arg(long)]
        agent_export: Option<PathBuf>,

        /// Completion provider
        #[arg(long, value_enum, default_value = "offline")]
        provider: ProviderKind,

        /// Agent config file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("loopwise=info".parse()?),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decide {
            decision_type,
            data,
            context,
            provider,
            config,
        } => run_decide(&decision_type, &data, context.as_deref(), provider, config.as_deref()),
        Commands::Session {
            script,
            export,
            agent_export,
            provider,
            config,
        } => run_session(
            &script,
            export.as_deref(),
            agent_export.as_deref(),
            provider,
            config.as_deref(),
        ),
    }
}

fn load_config(path: Option<&Path>) -> Result<AgentConfig> {
    let Some(path) = path else {
        return Ok(AgentConfig::default());
    };
    let file = File::open(path)
        .with_context(|| format!("Failed to open config file: {}", path.display()))?;
    let config: AgentConfig = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Invalid config file: {}", path.display()))?;
    Ok(config)
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead>> {
    if path == Path::new("-") {
        return Ok(Box::new(BufReader::new(io::stdin())));
    }
    let file =
        File::open(path).with_context(|| format!("Failed to open input: {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn read_data_map(path: &Path) -> Result<DataMap> {
    let mut raw = String::new();
    open_input(path)?
        .read_to_string(&mut raw)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Expected a JSON object in {}", path.display()))
}

fn build_agent(kind: ProviderKind, config: Option<&Path>) -> Result<DecisionAgent<Provider>> {
    let config = load_config(config)?;
    let provider = Provider::from_kind(kind)?;
    Ok(DecisionAgent::new(config, provider))
}

fn run_decide(
    decision_type: &str,
    data: &Path,
    context: Option<&Path>,
    kind: ProviderKind,
    config: Option<&Path>,
) -> Result<()> {
    let operational_data = read_data_map(data)?;
    let context = context.map(read_data_map).transpose()?;
    let mut agent = build_agent(kind, config)?;

    let output = match agent.make_decision(operational_data, decision_type, context) {
        Ok(report) => serde_json::to_value(report)?,
        Err(err) => serde_json::to_value(err.fallback())?,
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    serde_json::to_writer_pretty(&mut out, &output)?;
    writeln!(out)?;
    Ok(())
}

fn run_session(
    script: &Path,
    export: Option<&Path>,
    agent_export: Option<&Path>,
    kind: ProviderKind,
    config: Option<&Path>,
) -> Result<()> {
    let mut agent = build_agent(kind, config)?;
    let reader = open_input(script)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let summary = session::replay(&mut agent, reader, &mut out)?;

    if let Some(path) = export {
        agent
            .feedback_loop()
            .export_data(path)
            .with_context(|| format!("Failed to export feedback loop to {}", path.display()))?;
    }
    if let Some(path) = agent_export {
        agent
            .export_agent_data(path)
            .with_context(|| format!("Failed to export agent to {}", path.display()))?;
    }

    tracing::info!(
        steps = summary.steps,
        decisions = summary.decisions_made,
        feedback = summary.feedback_recorded,
        "session replayed"
    );

    serde_json::to_writer(
        &mut out,
        &json!({"summary": summary, "insights": agent.performance_insights()}),
    )?;
    writeln!(out)?;
    Ok(())
}
