//! Command-line interface for iQube capsules
//!
//! Scores quality signals, recommends encryption tiers, builds capsules and
//! seals or unseals payload files. Every command prints JSON on stdout; logs go
//! to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use iqube_core::{IqubeConfig, PolicyStrategy};
use std::path::PathBuf;

mod commands;

use commands::{
    capsule::CreateArgs,
    recommend::RecommendArgs,
    score::ScoreArgs,
    seal::{SealArgs, UnsealArgs},
};

#[derive(Parser)]
#[command(name = "iqube")]
#[command(about = "iQube - capsule scoring, tier policy and payload sealing", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Trust score, reliability and signal bands
    Score(ScoreArgs),
    /// Recommend an encryption tier
    Recommend(RecommendArgs),
    /// Build a capsule and print it
    Create(CreateArgs),
    /// Seal an open payload file
    Seal(SealArgs),
    /// Unseal a sealed record file
    Unseal(UnsealArgs),
}

impl Cli {
    /// Strategy override given on the command line, if any
    fn strategy(&self) -> Option<PolicyStrategy> {
        match &self.command {
            Commands::Recommend(args) => args.policy,
            _ => None,
        }
    }

    fn load_config(&self) -> Result<IqubeConfig> {
        IqubeConfig::load(self.config.as_deref(), self.strategy())
            .context("Failed to load configuration")
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.load_config()?;

    let output = match cli.command {
        Commands::Score(args) => commands::score::run(&args, &config)?,
        Commands::Recommend(args) => commands::recommend::run(&args, &config)?,
        Commands::Create(args) => commands::capsule::run(&args)?,
        Commands::Seal(args) => commands::seal::seal(&args, &config)?,
        Commands::Unseal(args) => commands::seal::unseal(&args)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
