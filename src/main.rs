// src/main.rs
use std::io::{self, BufRead};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use rangecalc::analysis::calculate;
use rangecalc::config::{default_config_path, Settings};
use rangecalc::ui::{render_ron, render_text};

#[derive(Parser)]
#[command(
    name = "rangecalc",
    version,
    about = "Monte Carlo calculator for expressions with uncertain ranges (e.g. \"2 * 10~12\")"
)]
struct Cli {
    /// Expression to evaluate. Reads one expression per line from stdin when omitted.
    expression: Option<String>,

    /// Number of Monte Carlo iterations
    #[arg(short = 'n', long)]
    iterations: Option<usize>,

    /// Number of histogram bins
    #[arg(short, long)]
    bins: Option<usize>,

    /// Seed for reproducible runs
    #[arg(short, long)]
    seed: Option<u64>,

    /// Config file (defaults to <config dir>/rangecalc/config.ron)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the full outcome as RON instead of a text report
    #[arg(long)]
    ron: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match &cli.expression {
        Some(expression) => run_one(expression, &settings, cli.ron),
        None => {
            let stdin = io::stdin();
            for line in stdin.lock().lines() {
                let line = line.context("Failed to read from stdin")?;
                if line.trim().is_empty() {
                    continue;
                }
                run_one(&line, &settings, cli.ron)?;
            }
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let path = cli.config.clone().or_else(default_config_path);
    let mut settings = Settings::load_from(path.as_deref())?;

    if let Some(iterations) = cli.iterations {
        settings.iterations = iterations;
    }
    if let Some(bins) = cli.bins {
        settings.histogram_bins = bins;
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }

    settings.validate()?;
    Ok(settings)
}

fn run_one(expression: &str, settings: &Settings, ron: bool) -> Result<()> {
    let outcome = calculate(expression, settings);
    if ron {
        println!("{}", render_ron(&outcome)?);
    } else {
        println!("{}", render_text(&outcome));
    }
    Ok(())
}
