#![recursion_limit = "256"]

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};

use replay_gym::config::ScenarioConfig;
use replay_gym::training::harness::run_test;

/// Train and evaluate RL models on gym scenarios.
#[derive(Parser)]
#[command(name = "run_gym", about = "Train and evaluate RL models on gym scenarios")]
struct Cli {
    /// Scenario TOML files to run, in order
    #[arg(required = true)]
    configs: Vec<PathBuf>,

    /// Train on the GPU (wgpu) instead of the CPU (ndarray)
    #[arg(long)]
    use_gpu: bool,

    /// Write per-scenario reward histories to this JSON file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Override number of training episodes
    #[arg(long)]
    episodes: Option<usize>,

    /// Override the scenario seed
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(serde::Serialize)]
struct ScenarioReport {
    config: PathBuf,
    env: String,
    passed: bool,
    reward_history: Vec<f32>,
    error: Option<String>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    // Load every scenario up front so a bad file fails before any training.
    let mut scenarios = Vec::with_capacity(cli.configs.len());
    for path in &cli.configs {
        let mut config = ScenarioConfig::load(path)
            .with_context(|| format!("loading scenario from {}", path.display()))?;
        if let Some(episodes) = cli.episodes {
            config.num_episodes = episodes;
        }
        if let Some(seed) = cli.seed {
            config.seed = seed;
        }
        config
            .validate()
            .with_context(|| format!("validating overrides for {}", path.display()))?;
        scenarios.push((path.clone(), config));
    }

    let mut reports = Vec::with_capacity(scenarios.len());
    for (path, config) in &scenarios {
        info!("running {} ({})", path.display(), config.env);
        let report = match run_test(config, cli.use_gpu) {
            Ok(history) => {
                info!("{}: passed", path.display());
                ScenarioReport {
                    config: path.clone(),
                    env: config.env.clone(),
                    passed: true,
                    reward_history: history,
                    error: None,
                }
            }
            Err(e) => {
                error!("{}: {e}", path.display());
                let reward_history = match &e {
                    replay_gym::error::HarnessError::PerformanceBarNotMet { history, .. } => {
                        history.clone()
                    }
                    _ => Vec::new(),
                };
                ScenarioReport {
                    config: path.clone(),
                    env: config.env.clone(),
                    passed: false,
                    reward_history,
                    error: Some(e.to_string()),
                }
            }
        };
        reports.push(report);
    }

    if let Some(report_path) = &cli.report {
        let json = serde_json::to_string_pretty(&reports).context("serializing report")?;
        std::fs::write(report_path, json)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
        info!("report written to {}", report_path.display());
    }

    let failed = reports.iter().filter(|r| !r.passed).count();
    if failed > 0 {
        bail!("{failed} of {} scenarios failed", reports.len());
    }
    Ok(())
}
