//! rosah — command-line front end for the ROSA capability harness.
//!
//! Two subcommands:
//! - `rosah discover`: build the capability tree and print it as JSON
//! - `rosah run`: synthesize and execute one rosa command, bracketed in a
//!   login/logout session when a token is supplied

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use rosa_harness::{Auth, EnvCredentials, HarnessConfig, RosaHarness, SessionManager};
use tracing_subscriber::EnvFilter;

/// rosah — capability-discovering harness for the ROSA CLI.
#[derive(Parser)]
#[command(
    name = "rosah",
    version,
    about = "rosah — capability-discovering harness for the ROSA CLI"
)]
struct Cli {
    /// Path to config file [default: ./rosa-harness.toml or ~/.config/rosa-harness/rosa-harness.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the capability tree for the target binary and print it as JSON
    Discover {
        /// Target CLI binary (overrides config)
        #[arg(short, long)]
        binary: Option<String>,
    },
    /// Synthesize and execute one command against the target CLI
    Run {
        /// The command string, e.g. "create cluster --name foo"
        command: String,
        /// AWS region for region-scoped commands (overrides config)
        #[arg(short, long)]
        region: Option<String>,
        /// OCM access token; when set, the run is bracketed in a login/logout session
        #[arg(short, long)]
        token: Option<String>,
        /// OCM environment to log in to
        #[arg(short, long, default_value = "production")]
        env: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    match cli.command {
        Commands::Discover { binary } => run_discover(config, binary).await,
        Commands::Run {
            command,
            region,
            token,
            env,
        } => run_command(config, command, region, token, env).await,
    }
}

/// Build the capability tree and print it to stdout as pretty JSON.
async fn run_discover(mut config: HarnessConfig, binary: Option<String>) -> Result<()> {
    if let Some(binary) = binary {
        config.binary = binary;
    }

    let harness = RosaHarness::new(config)?;
    let tree = harness.capability_tree().await?;
    println!("{}", serde_json::to_string_pretty(&*tree)?);
    Ok(())
}

/// Execute one command; with a token the run is wrapped in a session bracket,
/// otherwise the current login state is checked first.
async fn run_command(
    mut config: HarnessConfig,
    command: String,
    region: Option<String>,
    token: Option<String>,
    env: String,
) -> Result<()> {
    if region.is_some() {
        config.region = region;
    }

    let harness = RosaHarness::new(config)?;
    let manager = SessionManager::new(&harness, Arc::new(EnvCredentials::aws()));

    let auth = token.map(|token| Auth::new(token).with_environment(env));
    let result = manager.execute(&command, auth.as_ref()).await?;

    println!("{}", result.stdout);
    if let Some(text) = result.stderr.as_text() {
        if !text.trim().is_empty() {
            eprintln!("{}", text);
        }
    }
    Ok(())
}

/// Resolve and load the config file: explicit flag → ./rosa-harness.toml →
/// ~/.config/rosa-harness/rosa-harness.toml → built-in defaults.
fn load_config(explicit: Option<PathBuf>) -> Result<HarnessConfig> {
    let path = match explicit {
        Some(path) => Some(path),
        None => {
            let local = Path::new("rosa-harness.toml");
            if local.exists() {
                Some(local.to_path_buf())
            } else {
                dirs::config_dir()
                    .map(|dir| dir.join("rosa-harness").join("rosa-harness.toml"))
                    .filter(|p| p.exists())
            }
        }
    };

    let Some(path) = path else {
        return Ok(HarnessConfig::default());
    };

    let content = std::fs::read_to_string(&path)
        .map_err(|e| anyhow::anyhow!("Failed to read config file {:?}: {}", path, e))?;
    let config: HarnessConfig = toml::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Failed to parse config file {:?}: {}", path, e))?;

    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}
