use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::Path;
use anyhow::{anyhow, Result, Context};
use strum::Display;

/// Environment variable holding the completion API key.
pub const API_KEY_ENV: &str = "GLHF_API_KEY";

pub const DEFAULT_MODEL: &str = "qwen72b";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Provider {
    Glhf,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ModelInfo {
    /// Short key used in config files and on the command line.
    pub key: &'static str,
    /// Identifier sent to the completion endpoint.
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub max_tokens: usize,
    pub provider: Provider,
}

pub static MODELS: &[ModelInfo] = &[
    ModelInfo {
        key: "qwen72b",
        id: "hf:Qwen/Qwen2.5-72B-Instruct",
        name: "Qwen 2.5 72B",
        description: "High-performance large language model with 72B parameters",
        max_tokens: 4096,
        provider: Provider::Glhf,
    },
    ModelInfo {
        key: "mistral7b",
        id: "hf:mistralai/Mistral-7B-Instruct-v0.3",
        name: "Mistral 7B",
        description: "Efficient and powerful 7B parameter model",
        max_tokens: 2048,
        provider: Provider::Glhf,
    },
];

pub fn find_model(key: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.key == key)
}

pub fn default_model() -> &'static ModelInfo {
    &MODELS[0]
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub llm: LlmConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LlmConfig {
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig {
                api_url: "https://glhf.chat/api/openai/v1".to_string(),
                model: DEFAULT_MODEL.to_string(),
                temperature: 0.7,
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 1000,
                max_delay_ms: 10_000,
            },
        }
    }
}

/// Reads the API key from the environment. Blank values count as missing.
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

pub fn load_or_create_config(config_path: &Path) -> Result<Config> {
    if !config_path.exists() {
        if let Some(config_dir) = config_path.parent() {
            fs::create_dir_all(config_dir).with_context(|| {
                format!("Failed to create config directory: {}", config_dir.display())
            })?;
        }

        let config = Config::default();
        write_config(config_path, &config)?;

        return Ok(config);
    }

    let mut file = File::open(config_path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;

    let config: Config = toml::from_str(&contents)
        .context("Failed to parse config file")?;

    Ok(config)
}

pub fn update_config(
    config_path: &Path,
    api_url: &Option<String>,
    model: &Option<String>,
    temperature: &Option<f32>,
) -> Result<Config> {
    let mut config = load_or_create_config(config_path)?;

    if let Some(url) = api_url {
        config.llm.api_url = url.trim_end_matches('/').to_string();
    }

    if let Some(model_key) = model {
        if find_model(model_key).is_none() {
            return Err(anyhow!("Invalid model ID: {}", model_key));
        }
        config.llm.model = model_key.clone();
    }

    if let Some(temp) = temperature {
        config.llm.temperature = *temp;
    }

    write_config(config_path, &config)?;

    Ok(config)
}

fn write_config(config_path: &Path, config: &Config) -> Result<()> {
    let toml_string = toml::to_string_pretty(config)?;
    let mut file = File::create(config_path)
        .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;
    file.write_all(toml_string.as_bytes())?;
    Ok(())
}
