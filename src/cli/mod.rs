//! Command-line interface parsing and handling
//!
//! Each subcommand drives one slice of the streaming pipeline: `chat` talks to
//! a live endpoint, `replay` feeds a file through the same path in chunks,
//! `render` parses a finished (or deliberately truncated) document and
//! `reveal` plays the typing effect.

pub mod chat;
pub mod render;
pub mod replay;
pub mod reveal;
pub mod session;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::cli::chat::{run_chat, ChatOptions};
use crate::cli::render::run_render;
use crate::cli::replay::run_replay;
use crate::cli::reveal::run_reveal;
use crate::core::config::{path_display, Config};

pub const LOG_ENV: &str = "STREAMARK_LOG";

#[derive(Parser, Debug)]
#[command(name = "streamark")]
#[command(version)]
#[command(about = "Stream chat completions into live, tolerant markdown")]
#[command(
    long_about = "Streamark streams a chat completion from an OpenAI-compatible API and \
re-parses the growing reply as markdown on every chunk, so half-written syntax \
renders sensibly while the answer is still arriving.\n\n\
Configuration:\n\
  Settings live in config.toml under the platform config directory.\n\
  Use 'streamark config' to see them and 'streamark config set <key> <value>' to change them.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    API key (the variable name is configurable with api_key_env)\n\
  STREAMARK_LOG     Diagnostic filter, e.g. 'streamark=debug' (default: warn)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,

    /// Model to use instead of the configured one
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Append finished messages to this transcript file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Send a prompt and stream the reply
    Chat {
        /// Prompt text (joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        prompt: Vec<String>,
        /// System prompt sent ahead of the conversation
        #[arg(short = 's', long)]
        system: Option<String>,
        /// Print the reply as it arrives, without the final markdown render
        #[arg(long)]
        raw: bool,
    },
    /// Parse a markdown document and print it rendered or as tokens
    Render {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Print the token tree as JSON
        #[arg(long)]
        json: bool,
        /// Treat the input as a stream that has not finished yet
        #[arg(long)]
        streaming: bool,
    },
    /// Feed a document through the streaming pipeline in small chunks
    Replay {
        /// Input file (stdin when omitted)
        file: Option<PathBuf>,
        /// Characters per chunk
        #[arg(long, default_value_t = 8)]
        chunk_size: usize,
        /// Pause before each chunk, in milliseconds
        #[arg(long, default_value_t = 0)]
        delay_ms: u64,
    },
    /// Type text out with the reveal effect
    Reveal {
        /// Text to reveal (joined with spaces)
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
        /// Grapheme clusters per tick
        #[arg(long)]
        step: Option<usize>,
        /// Milliseconds between ticks
        #[arg(long)]
        interval_ms: Option<u64>,
    },
    /// Show or edit configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Set a configuration value
    Set {
        /// Configuration key, e.g. model or reveal.step
        key: String,
        /// Value (multiple words are joined with spaces)
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Remove a configuration value so the default applies
    Unset {
        /// Configuration key
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async_main())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("❌ {err}");
            std::process::exit(1);
        }
    };
    if let Some(model) = args.model.clone() {
        config.model = Some(model);
    }

    let result = match args.command {
        Commands::Chat {
            prompt,
            system,
            raw,
        } => {
            run_chat(
                &config,
                ChatOptions {
                    prompt: prompt.join(" "),
                    system,
                    raw,
                    log: args.log,
                },
            )
            .await
        }
        Commands::Render {
            file,
            json,
            streaming,
        } => run_render(&config, file.as_deref(), json, streaming),
        Commands::Replay {
            file,
            chunk_size,
            delay_ms,
        } => run_replay(&config, file.as_deref(), chunk_size, delay_ms).await,
        Commands::Reveal {
            text,
            step,
            interval_ms,
        } => run_reveal(&config, &text.join(" "), step, interval_ms).await,
        Commands::Config { action } => run_config(action),
    };

    if let Err(err) = result {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
    Ok(())
}

fn run_config(action: Option<ConfigAction>) -> Result<(), Box<dyn Error>> {
    let path = Config::get_config_path()?;
    let mut config = Config::load_from_path(&path)?;

    match action {
        None => {
            println!("Config file: {}", path_display(&path));
            config.print_all();
        }
        Some(ConfigAction::Set { key, value }) => {
            let value = value.join(" ");
            config.set_value(&key, &value)?;
            config.save_to_path(&path)?;
            println!("✅ Set {key} to: {value}");
        }
        Some(ConfigAction::Unset { key }) => {
            config.unset_value(&key)?;
            config.save_to_path(&path)?;
            println!("✅ Unset {key}");
        }
    }
    Ok(())
}

/// Read `file`, or all of stdin when no file is given.
pub(crate) fn read_input(file: Option<&std::path::Path>) -> Result<String, Box<dyn Error>> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {err}", path_display(path)).into()),
        None => Ok(std::io::read_to_string(std::io::stdin())?),
    }
}
