use clap::{Parser, Subcommand};
use std::path::PathBuf;
use anyhow::{anyhow, Result};
use log::warn;

mod app;
mod config;
mod error;
mod llm;
mod prompt;
mod ui;

use crate::llm::client::PromptImprover;
use crate::prompt::{generate_prompt, PromptRequest, Tone};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Turn on verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the application
    Config {
        /// Set the completion API base URL
        #[arg(long)]
        api_url: Option<String>,

        /// Set the default model key
        #[arg(long)]
        model: Option<String>,

        /// Set the sampling temperature
        #[arg(long)]
        temperature: Option<f32>,
    },

    /// Build a prompt from the local templates
    Generate {
        /// What the prompt should ask for
        #[arg(required = true)]
        instruction: Vec<String>,

        /// Optional extra requirements
        #[arg(short = 'x', long, default_value = "")]
        context: String,

        /// formal, casual, technical, simple or creative
        #[arg(short, long, default_value = "casual")]
        tone: String,
    },

    /// Rewrite an instruction with the remote model
    Improve {
        #[arg(required = true)]
        instruction: Vec<String>,

        #[arg(short = 'x', long, default_value = "")]
        context: String,

        /// Model key to use instead of the configured one
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List the available models
    Models,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    // Load configuration
    let config_path = cli.config.unwrap_or_else(|| {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("promptsmith/config.toml")
    });

    let config = config::load_or_create_config(&config_path)?;

    match cli.command {
        Some(Commands::Config { api_url, model, temperature }) => {
            config::update_config(&config_path, &api_url, &model, &temperature)?;
            println!("Configuration updated successfully.");
        }
        Some(Commands::Generate { instruction, context, tone }) => {
            let tone = Tone::parse(&tone)?;
            let request = PromptRequest::new(instruction.join(" "), context, tone);
            let prompt = generate_prompt(&request)?;
            app::print_prompt(&prompt);
        }
        Some(Commands::Improve { instruction, context, model }) => {
            let api_key = config::api_key_from_env();
            let mut improver = PromptImprover::from_config(&config, api_key.as_deref())?;
            if let Some(model_key) = model {
                improver.set_model(&model_key)?;
            }

            let mut app = app::App::new(&config, Some(improver));
            app.set_instruction(&instruction.join(" "));
            app.set_context(&context);

            let improved = app
                .improve(|attempt, delay| {
                    eprintln!(
                        "Rate limit hit. Retrying in {}ms (attempt {})...",
                        delay.as_millis(),
                        attempt
                    );
                })
                .await
                .map(str::to_string)
                .map_err(|e| anyhow!("{}", e))?;
            app::print_prompt(&improved);
        }
        Some(Commands::Models) => {
            app::print_models(&config.llm.model);
        }
        None => {
            // No subcommand, enter interactive mode
            let improver = match PromptImprover::from_config(&config, config::api_key_from_env().as_deref()) {
                Ok(improver) => Some(improver),
                Err(e) => {
                    warn!("{}", e);
                    eprintln!("{}", ui::display::format_error(&format!(
                        "{} (set {} to enable AI improvement)",
                        e,
                        config::API_KEY_ENV
                    )));
                    None
                }
            };

            let mut app = app::App::new(&config, improver);
            app.run().await?;
        }
    }

    Ok(())
}
