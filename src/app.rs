use crate::config::{default_model, find_model, Config, MODELS};
use crate::error::PromptError;
use crate::llm::client::PromptImprover;
use crate::prompt::{generate_prompt, PromptRequest, Tone};
use crate::ui::display::{format_error, format_field_error, format_info, format_prompt, format_success};
use crate::ui::prompt::Prompt;
use anyhow::Result;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use log::debug;
use std::time::Duration;
use strum::IntoEnumIterator;

/// Owns the form state and drives both the local and the remote path.
pub struct App {
    instruction: String,
    context: String,
    tone: Tone,
    selected_model: String,
    generated_prompt: Option<String>,
    is_improving: bool,
    error: Option<PromptError>,
    retry_count: u32,
    improver: Option<PromptImprover>,
    prompt: Prompt,
}

impl App {
    pub fn new(config: &Config, improver: Option<PromptImprover>) -> Self {
        let selected_model = improver
            .as_ref()
            .map(|i| i.current_model().key.to_string())
            .unwrap_or_else(|| {
                find_model(&config.llm.model)
                    .unwrap_or_else(default_model)
                    .key
                    .to_string()
            });

        Self {
            instruction: String::new(),
            context: String::new(),
            tone: Tone::default(),
            selected_model,
            generated_prompt: None,
            is_improving: false,
            error: None,
            retry_count: 0,
            improver,
            prompt: Prompt::new(),
        }
    }

    pub fn set_instruction(&mut self, instruction: &str) {
        self.instruction = instruction.to_string();
    }

    pub fn set_context(&mut self, context: &str) {
        self.context = context.to_string();
    }

    pub fn set_tone(&mut self, name: &str) -> Result<(), &PromptError> {
        match Tone::parse(name) {
            Ok(tone) => {
                self.tone = tone;
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Switches the active model. On failure the previous model stays selected.
    pub fn select_model(&mut self, key: &str) -> Result<(), &PromptError> {
        if let Some(improver) = self.improver.as_mut() {
            if let Err(e) = improver.set_model(key) {
                return Err(self.fail(e));
            }
        } else if find_model(key).is_none() {
            return Err(self.fail(PromptError::InvalidModel(key.to_string())));
        }

        self.selected_model = key.to_string();
        self.error = None;
        Ok(())
    }

    /// Assembles a prompt locally from the current form fields.
    pub fn generate(&mut self) -> Result<&str, &PromptError> {
        let request = PromptRequest::new(self.instruction.as_str(), self.context.as_str(), self.tone);
        match generate_prompt(&request) {
            Ok(prompt) => {
                self.error = None;
                Ok(self.generated_prompt.insert(prompt).as_str())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Asks the remote model to rewrite the current instruction.
    ///
    /// `on_retry` receives each backoff as it starts so callers can show progress.
    pub async fn improve<R>(&mut self, mut on_retry: R) -> Result<&str, &PromptError>
    where
        R: FnMut(u32, Duration),
    {
        if self.instruction.trim().is_empty() {
            return Err(self.fail(PromptError::empty_instruction()));
        }

        let Some(improver) = self.improver.as_ref() else {
            return Err(self.fail(PromptError::Configuration(
                "Improvement service is not properly initialized. Please check your API key."
                    .to_string(),
            )));
        };

        self.is_improving = true;
        self.error = None;
        self.retry_count = 0;

        let retry_count = &mut self.retry_count;
        let result = improver
            .improve(&self.instruction, &self.context, |attempt, delay| {
                *retry_count = attempt;
                on_retry(attempt, delay);
            })
            .await;

        self.is_improving = false;

        match result {
            Ok(improved) => {
                self.retry_count = 0;
                Ok(self.generated_prompt.insert(improved).as_str())
            }
            Err(e) => {
                if let PromptError::RateLimit { attempts, message, .. } = &e {
                    debug!("Giving up after {} retries, last response: {}", attempts, message);
                    self.retry_count = *attempts;
                }
                Err(self.fail(e))
            }
        }
    }

    fn fail(&mut self, error: PromptError) -> &PromptError {
        self.error.insert(error)
    }

    pub fn generated_prompt(&self) -> Option<&str> {
        self.generated_prompt.as_deref()
    }

    pub fn error(&self) -> Option<&PromptError> {
        self.error.as_ref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn is_improving(&self) -> bool {
        self.is_improving
    }

    pub fn tone(&self) -> Tone {
        self.tone
    }

    pub fn selected_model(&self) -> &str {
        &self.selected_model
    }

    pub fn can_improve(&self) -> bool {
        self.improver.is_some() && !self.is_improving()
    }

    pub async fn run(&mut self) -> Result<()> {
        println!("{}", "Welcome to PromptSmith!".bright_green().bold());
        println!("Type an instruction, /help for commands, or 'exit' to quit");
        if self.improver.is_none() {
            println!("{}", format_info("AI improvement is disabled until an API key is set."));
        }

        loop {
            let input = self.prompt.get_input()?;
            let input_trimmed = input.trim();

            if input_trimmed.eq_ignore_ascii_case("exit") {
                break;
            }
            if input_trimmed.is_empty() {
                continue;
            }

            let (command, arg) = match input_trimmed.split_once(char::is_whitespace) {
                Some((c, a)) => (c, a.trim()),
                None => (input_trimmed, ""),
            };

            match command {
                "/context" => {
                    self.set_context(arg);
                    println!("{}", format_success("Context updated."));
                }
                "/tone" => match self.set_tone(arg) {
                    Ok(()) => println!("{}", format_success(&format!("Tone set to {}.", self.tone))),
                    Err(e) => println!("{}", format_field_error("Tone", &e.to_string())),
                },
                "/model" => match self.select_model(arg) {
                    Ok(()) => println!("{}", format_success(&format!("Model set to {}.", arg))),
                    Err(e) => println!("{} {}", "Error setting model:".bright_red().bold(), e),
                },
                "/models" => print_models(&self.selected_model),
                "/generate" => {
                    let outcome = self.generate().map(str::to_string).map_err(|e| e.to_string());
                    self.print_outcome(outcome);
                }
                "/improve" => self.improve_with_spinner().await,
                "/show" => self.show_form(),
                "/help" => print_help(),
                _ if command.starts_with('/') => {
                    println!("{} {}", "Unknown command:".bright_red().bold(), command);
                }
                _ => {
                    self.set_instruction(input_trimmed);
                    println!("{}", format_success("Instruction updated."));
                }
            }
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn improve_with_spinner(&mut self) {
        if !self.can_improve() {
            println!("{}", format_error("AI improvement is disabled. Set an API key to enable it."));
            return;
        }

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message("Improving...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        let max_retries = self
            .improver
            .as_ref()
            .map(|i| i.retry_policy().max_retries)
            .unwrap_or_default();
        let result = self
            .improve(|attempt, delay| {
                spinner.set_message(format!(
                    "Rate limit hit. Retrying in {}ms (attempt {}/{})",
                    delay.as_millis(),
                    attempt,
                    max_retries
                ));
            })
            .await
            .map(str::to_string)
            .map_err(|e| e.to_string());
        spinner.finish_and_clear();

        self.print_outcome(result);
    }

    fn print_outcome(&self, outcome: Result<String, String>) {
        match outcome {
            Ok(prompt) => print_prompt(&prompt),
            Err(message) if self.error.as_ref().is_some_and(PromptError::is_validation) => {
                println!("{}", format_field_error("Instruction", &message))
            }
            Err(message) => println!("{}", format_error(&message)),
        }
    }

    fn show_form(&self) {
        println!("{} {}", "Model:".bold(), self.selected_model());
        println!("{} {}", "Instruction:".bold(), self.instruction);
        println!("{} {}", "Context:".bold(), self.context);
        println!("{} {}", "Tone:".bold(), self.tone());
        if let Some(error) = self.error() {
            println!("{}", format_error(&error.to_string()));
            if self.retry_count() > 0 {
                println!("{}", format_info(&format!("Retries used: {}", self.retry_count())));
            }
        }
        if let Some(prompt) = self.generated_prompt() {
            print_prompt(prompt);
        }
    }
}

pub fn print_prompt(prompt: &str) {
    println!("{}", "Generated Prompt:".bright_green().bold());
    println!("{}", format_prompt(prompt));
}

pub fn print_models(selected: &str) {
    for model in MODELS {
        let marker = if model.key == selected { "*" } else { " " };
        println!(
            "{} {:<10} {} - {} ({} tokens, {})",
            marker,
            model.key,
            model.name.bold(),
            model.description,
            model.max_tokens,
            model.provider
        );
    }
}

fn print_help() {
    let tones: Vec<String> = Tone::iter().map(|t| t.to_string()).collect();
    println!("{}", "Commands:".bold());
    println!("  <text>             set the instruction");
    println!("  /context <text>    set optional context (empty to clear)");
    println!("  /tone <tone>       one of: {}", tones.join(", "));
    println!("  /model <key>       switch model (see /models)");
    println!("  /models            list available models");
    println!("  /generate          build a prompt from templates");
    println!("  /improve           rewrite the instruction with the selected model");
    println!("  /show              show the current form");
    println!("  exit               quit");
}
