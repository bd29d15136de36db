//! PayGuard command line

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use payguard_core::fraud_map::{global_stats, ScamLocation};
use payguard_core::{extract_payment, parse_amount, FileSessionStore, ScanSession};
use risk_engine::{AnalysisSession, Config, Frame, RiskPipeline, SignalBook};
use serde_json::json;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "payguard", version, about = "Scan before you pay")]
struct Cli {
    /// TOML configuration file (PAYGUARD_* variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Extract a scanned payload, assess the payee and print the decision
    Scan {
        /// QR payload, deep link or handle
        raw: String,
        /// Amount to assess instead of the payload's
        #[arg(long)]
        amount: Option<String>,
        /// Keep the scan in the session directory for `recover`
        #[arg(long)]
        persist: bool,
    },
    /// Print the payment recovered from the last persisted scan
    Recover,
    /// Gate a risk percentage
    Decide {
        /// Percentage (0-100)
        percentage: f64,
    },
    /// Aggregate a fraud map file (JSON array of locations)
    Stats {
        /// Locations file
        locations: PathBuf,
    },
    /// Run the video analysis channel over placeholder frames
    Analyze {
        /// Frames to send
        #[arg(long, default_value_t = 10)]
        frames: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading configuration")?;

    match cli.cmd {
        Cmd::Scan {
            raw,
            amount,
            persist,
        } => {
            let descriptor = extract_payment(&raw)?;
            if persist {
                let store = FileSessionStore::new(&config.session_dir);
                ScanSession::new(&store).persist_scan(&descriptor)?;
            }

            let signals = SignalBook::new(config.signals.clone());
            let pipeline = RiskPipeline::from_config(&config, signals)?;
            let assessment = match amount {
                Some(amount) => {
                    pipeline
                        .estimate_risk(descriptor.identifier(), parse_amount(&amount)?)
                        .await?
                }
                None => pipeline.assess_payment(&descriptor).await?,
            };

            let output = json!({
                "payment": descriptor,
                "payee": descriptor.payee_label(),
                "assessment": assessment,
                "safetyScore": assessment.safety_score(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Cmd::Recover => {
            let store = FileSessionStore::new(&config.session_dir);
            match ScanSession::new(&store).recover_scan()? {
                Some(descriptor) => println!("{}", serde_json::to_string_pretty(&descriptor)?),
                None => tracing::info!("No scan in progress"),
            }
        }
        Cmd::Decide { percentage } => {
            let gate = payguard_core::DecisionGate::new(config.gate)?;
            println!(
                "{}",
                json!({
                    "recommendation": gate.decide(percentage),
                    "level": gate.level(percentage),
                })
            );
        }
        Cmd::Stats { locations } => {
            let content = std::fs::read_to_string(&locations)
                .with_context(|| format!("reading {}", locations.display()))?;
            let locations: Vec<ScamLocation> = serde_json::from_str(&content)?;
            let locations: Vec<ScamLocation> =
                locations.into_iter().map(ScamLocation::with_colors).collect();
            println!("{}", serde_json::to_string_pretty(&global_stats(&locations))?);
        }
        Cmd::Analyze { frames } => {
            let gate = payguard_core::DecisionGate::new(config.gate)?;
            let mut session = AnalysisSession::connect(config.channel.clone()).await;
            tracing::info!(mode = ?session.mode(), "Analysis session open");

            for index in 0..frames {
                let verdict = session.analyze(&Frame::new(index, Vec::new())).await?;
                println!(
                    "{}",
                    json!({
                        "frame": index,
                        "verdict": verdict,
                        "recommendation": verdict.recommendation(&gate),
                    })
                );
            }
            session.close().await?;
        }
    }

    Ok(())
}
