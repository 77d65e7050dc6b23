//! Process configuration read from the environment (and `.env` files).

use anyhow::{anyhow, Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::runtime::{Backoff, PollPolicy};

pub const DEFAULT_MODEL: &str = "gpt-4-0613";
pub const DEFAULT_PERSONA_NAME: &str = "Web app navigator";
pub const DEFAULT_BIND: &str = "0.0.0.0:3009";
pub const DEFAULT_MAX_CONVERSATIONS: usize = 64;
pub const DEFAULT_INSTRUCTIONS: &str = include_str!("instructions.md");

/// Name and system instructions of the assistant persona.
#[derive(Debug, Clone)]
pub struct PersonaConfig {
    pub name: String,
    pub instructions: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_PERSONA_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
    pub bind: SocketAddr,
    pub poll: PollPolicy,
    /// Open conversations allowed at once, the default one included
    pub max_conversations: usize,
    pub tools_path: Option<PathBuf>,
    pub persona: PersonaConfig,
}

impl NavigatorConfig {
    /// Loads `.env.local` and `.env` (if present), then reads the process
    /// environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::from_filename(".env.local").ok();
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("OPENAI_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .context("OPENAI_API_KEY must be set in .env")?;
        let model = lookup("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let base_url = lookup("OPENAI_BASE_URL");

        let bind_raw = lookup("NAVIGATOR_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind: SocketAddr = bind_raw
            .parse()
            .with_context(|| format!("NAVIGATOR_BIND is not a socket address: '{bind_raw}'"))?;

        let defaults = PollPolicy::default();
        let interval = parse_or(&lookup, "NAVIGATOR_POLL_INTERVAL_MS", defaults.interval.as_millis() as u64)?;
        if interval == 0 {
            return Err(anyhow!("NAVIGATOR_POLL_INTERVAL_MS must be at least 1"));
        }
        let max_polls = parse_or(&lookup, "NAVIGATOR_MAX_POLLS", defaults.max_polls)?;
        let timeout_secs = parse_or(
            &lookup,
            "NAVIGATOR_RUN_TIMEOUT_SECS",
            defaults.deadline.map_or(0, |d| d.as_secs()),
        )?;
        let transport_retries =
            parse_or(&lookup, "NAVIGATOR_TRANSPORT_RETRIES", defaults.transport_retries)?;

        let backoff = match lookup("NAVIGATOR_POLL_BACKOFF").as_deref() {
            None | Some("fixed") => Backoff::Fixed,
            Some("exponential") => Backoff::exponential(),
            Some(other) => {
                return Err(anyhow!(
                    "NAVIGATOR_POLL_BACKOFF must be 'fixed' or 'exponential', got '{other}'"
                ))
            }
        };

        let poll = PollPolicy {
            interval: Duration::from_millis(interval),
            backoff,
            max_polls,
            // 0 disables the wall-clock limit; max_polls still applies
            deadline: (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs)),
            transport_retries,
        };

        let max_conversations =
            parse_or(&lookup, "NAVIGATOR_MAX_CONVERSATIONS", DEFAULT_MAX_CONVERSATIONS)?;
        if max_conversations == 0 {
            return Err(anyhow!("NAVIGATOR_MAX_CONVERSATIONS must be at least 1"));
        }

        let mut persona = PersonaConfig::default();
        if let Some(name) = lookup("NAVIGATOR_PERSONA_NAME") {
            persona.name = name;
        }
        if let Some(path) = lookup("NAVIGATOR_INSTRUCTIONS_PATH") {
            persona.instructions = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read instructions at '{path}'"))?;
        }

        Ok(Self {
            api_key,
            model,
            base_url,
            bind,
            poll,
            max_conversations,
            tools_path: lookup("NAVIGATOR_TOOLS_PATH").map(PathBuf::from),
            persona,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}
