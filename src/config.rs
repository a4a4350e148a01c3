use anyhow::Result;
use serde::Deserialize;

use crate::directory::{CustomerProfile, DirectoryAgent};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub speech: SpeechConfig,
    pub summarizer: SummarizerConfig,
    pub telephony: TelephonyConfig,
    #[serde(default)]
    pub directory: DirectoryConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct SpeechConfig {
    /// NATS server carrying audio chunks out and transcript segments back
    pub nats_url: String,
}

#[derive(Debug, Deserialize)]
pub struct SummarizerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct TelephonyConfig {
    pub base_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
    /// Public base URL Twilio-style webhooks are delivered to
    pub webhook_base_url: String,
}

/// Seed data for the agent directory and customer profiles
#[derive(Debug, Default, Deserialize)]
pub struct DirectoryConfig {
    #[serde(default)]
    pub agents: Vec<DirectoryAgent>,
    #[serde(default)]
    pub customers: Vec<CustomerProfile>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
