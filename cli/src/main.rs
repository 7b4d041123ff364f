use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use voicelist_dictation::config::Config;
use voicelist_dictation::controller::{DictationController, ListeningState};
use voicelist_dictation::recognition::scripted::ScriptedRecognition;

/// Application-specific environment variable for log filtering (overrides config).
const LOG_ENV_VAR: &str = "VOICELIST_LOG";

/// Utterances replayed when no script file is given.
const DEFAULT_SCRIPT: [&str; 3] = [
    "milk and a dozen eggs",
    "basmati rice",
    "shampoo and dish soap",
];

#[derive(Parser)]
#[command(name = "voicelist")]
#[command(about = "Voicelist - dictate a shopping list in the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a dictation session and print the resulting list text
    Dictate {
        /// Utterance script, one utterance per line (defaults to a built-in list)
        #[arg(long)]
        script: Option<PathBuf>,
        /// Pause between recognition events in milliseconds
        #[arg(long, default_value_t = 150)]
        delay_ms: u64,
    },
    /// Show the resolved configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load().unwrap_or_default();

    // VOICELIST_LOG env var overrides config file level
    let filter = EnvFilter::builder()
        .with_env_var(LOG_ENV_VAR)
        .with_default_directive(config.logging.level.as_directive().parse()?)
        .from_env()?;
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Dictate { script, delay_ms } => dictate(script, delay_ms).await,
        Commands::Config => show_config(&config),
    }
}

async fn dictate(script: Option<PathBuf>, delay_ms: u64) -> Result<()> {
    let utterances = load_script(script)?;
    let engine =
        Arc::new(ScriptedRecognition::new(utterances).with_delay(Duration::from_millis(delay_ms)));

    let list_text = Arc::new(Mutex::new(String::new()));
    let sink_text = list_text.clone();
    let controller = DictationController::new(engine, move |text: &str| {
        println!("  ... {text}");
        if let Ok(mut latest) = sink_text.lock() {
            *latest = text.to_string();
        }
    });
    let mut states = controller.subscribe();

    println!("Listening (simulated microphone)...");
    controller.toggle_listening().await;

    loop {
        match states.recv().await {
            Ok(ListeningState::Idle) => break,
            Ok(ListeningState::Error) => {
                anyhow::bail!(controller.error().await);
            }
            Ok(ListeningState::Listening) => {}
            Err(_) => break,
        }
    }

    let text = list_text.lock().map(|t| t.clone()).unwrap_or_default();
    println!("Shopping list: {text}");
    Ok(())
}

fn load_script(script: Option<PathBuf>) -> Result<Vec<String>> {
    match script {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read script file: {}", path.display()))?;
            let utterances: Vec<String> = content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
            tracing::debug!(path = %path.display(), utterances = utterances.len(), "Loaded script");
            anyhow::ensure!(!utterances.is_empty(), "script file contains no utterances");
            Ok(utterances)
        }
        None => Ok(DEFAULT_SCRIPT.iter().map(|s| s.to_string()).collect()),
    }
}

fn show_config(config: &Config) -> Result<()> {
    let path = Config::config_path()?;
    println!("config file: {}", path.display());
    print!(
        "{}",
        toml::to_string_pretty(config).context("Failed to serialize config")?
    );
    Ok(())
}
