// src/config/credentials.rs
use anyhow::{anyhow, Result};
use std::{env, fmt};

pub const ENV_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Bot credentials for the one fixed recipient chat.
#[derive(Clone)]
pub struct TelegramCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

impl TelegramCredentials {
    /// Missing or blank values are fatal: nothing can be delivered without them.
    pub fn from_env() -> Result<Self> {
        let bot_token = read_required(ENV_BOT_TOKEN)?;
        let chat_id = read_required(ENV_CHAT_ID)?;
        Ok(Self { bot_token, chat_id })
    }
}

fn read_required(key: &str) -> Result<String> {
    match env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(anyhow!("Missing {key} env var")),
    }
}

// Never print the token itself.
impl fmt::Debug for TelegramCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramCredentials")
            .field("token_len", &self.bot_token.len())
            .field("chat_id", &self.chat_id)
            .finish()
    }
}
