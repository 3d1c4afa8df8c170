use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use directory_config::{logging, DirectoryConfig, DirectoryConfigLoader};

use std::path::PathBuf;

/// dirconf - inspect directory service client configuration
#[derive(Parser)]
#[command(name = "dirconf")]
#[command(about = "Inspect directory service client configuration")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML, password redacted) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the URLs a client would connect to
    Urls,
    /// Validate configuration and exit
    Check,
}

fn console_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(console_level(cli.verbose));

    // Layered config: defaults -> YAML (if provided) -> env (APP__*)
    let loader = DirectoryConfigLoader::layered(cli.config.as_deref())?;
    let config = loader.load().context("Failed to load directory configuration")?;

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Urls) {
        Commands::Urls => print_urls(&config, &loader),
        Commands::Check => check_config(&config, &loader),
    }
}

fn print_urls(config: &DirectoryConfig, loader: &DirectoryConfigLoader) -> Result<()> {
    let source = loader.port_source();
    for url in config.resolve_urls(Some(&source))?.iter() {
        println!("{url}");
    }
    Ok(())
}

fn check_config(config: &DirectoryConfig, loader: &DirectoryConfigLoader) -> Result<()> {
    tracing::info!("Checking directory configuration…");
    let source = loader.port_source();
    let urls = config
        .resolve_urls(Some(&source))
        .context("Failed to resolve directory urls")?;
    if config.base().is_none() {
        tracing::warn!("No base suffix configured, operations start at the root");
    }
    if config.username().is_some() != config.password().is_some() {
        tracing::warn!("Only one of username/password is configured");
    }
    println!("Configuration is valid ({} url(s))", urls.len());
    println!("{}", config.to_yaml()?);
    Ok(())
}
