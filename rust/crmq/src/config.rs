use crate::llm::GeminiConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::{
    net::{SocketAddr, ToSocketAddrs},
    time::Duration,
};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_LLM_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub allowed_origins: Option<Vec<String>>,
    pub model: String,
    /// `None` runs the pipelines against the offline echo generator.
    pub llm: Option<GeminiConfig>,
    pub llm_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    crmq_listen_addr: Option<String>,
    #[serde(default)]
    crmq_listen_host: Option<String>,
    #[serde(default)]
    crmq_listen_port: Option<u16>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    crmq_allowed_origins: Option<String>,
    #[serde(default)]
    crmq_llm_api_key: Option<String>,
    #[serde(default)]
    gemini_api_key: Option<String>,
    #[serde(default = "default_model")]
    crmq_llm_model: String,
    #[serde(default = "default_base_url")]
    crmq_llm_base_url: String,
    #[serde(default = "default_temperature")]
    crmq_llm_temperature: f32,
    #[serde(default = "default_timeout_ms")]
    crmq_llm_timeout_ms: u64,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_LLM_BASE_URL.to_string()
}

const fn default_temperature() -> f32 {
    0.2
}

const fn default_timeout_ms() -> u64 {
    30_000
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let raw: RawConfig =
            envy::from_env().context("failed to parse CRMQ_* environment variables")?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let listen_addr = resolve_addr(
            raw.crmq_listen_addr,
            raw.crmq_listen_host,
            raw.crmq_listen_port.or(raw.port),
        )?;

        let allowed_origins = raw.crmq_allowed_origins.as_deref().and_then(parse_csv);
        let llm_timeout = Duration::from_millis(raw.crmq_llm_timeout_ms.max(1));

        let llm = raw
            .crmq_llm_api_key
            .or(raw.gemini_api_key)
            .filter(|key| !key.trim().is_empty())
            .map(|api_key| GeminiConfig {
                base_url: raw.crmq_llm_base_url.clone(),
                api_key,
                model: raw.crmq_llm_model.clone(),
                temperature: raw.crmq_llm_temperature,
                timeout: llm_timeout,
            });

        Ok(Self {
            listen_addr,
            allowed_origins,
            model: raw.crmq_llm_model,
            llm,
            llm_timeout,
        })
    }

    /// Model identifiers advertised by `/available_models`.
    pub fn available_models(&self) -> Vec<String> {
        vec![self.model.clone()]
    }
}

fn parse_csv(csv: &str) -> Option<Vec<String>> {
    let entries: Vec<_> = csv
        .split(',')
        .filter_map(|part| {
            let entry = part.trim();
            if entry.is_empty() {
                None
            } else {
                Some(entry.to_string())
            }
        })
        .collect();
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn resolve_addr(
    addr: Option<String>,
    host: Option<String>,
    port: Option<u16>,
) -> Result<SocketAddr> {
    if let Some(addr) = addr {
        return addr
            .to_socket_addrs()
            .context("invalid CRMQ_LISTEN_ADDR value")?
            .next()
            .context("CRMQ_LISTEN_ADDR resolved to no addresses");
    }

    let host = host.unwrap_or_else(|| "0.0.0.0".to_string());
    let port = port.unwrap_or(8000);
    format!("{host}:{port}")
        .to_socket_addrs()
        .context("invalid CRMQ listen host/port combination")?
        .next()
        .context("listen address resolved to no targets")
}
