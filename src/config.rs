// Configuration loading
// Defaults come from ~/.magi/gui.toml, then the MAGI_* environment variables.

use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Per-file attachment ceiling.
pub const MAX_ATTACHMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Accepted attachment MIME types (documents and images).
pub const ACCEPTED_ATTACHMENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
];

pub const MIN_DEBATE_ROUNDS: u32 = 1;
pub const MAX_DEBATE_ROUNDS: u32 = 5;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_ENGINE_URL: &str = "http://127.0.0.1:8700";
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:8750";

/// The closed set of supported Gemini model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeminiModel {
    #[default]
    #[serde(rename = "gemini-1.5-pro")]
    Pro,
    #[serde(rename = "gemini-1.5-flash")]
    Flash,
}

impl GeminiModel {
    pub const ALL: [GeminiModel; 2] = [GeminiModel::Pro, GeminiModel::Flash];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiModel::Pro => "gemini-1.5-pro",
            GeminiModel::Flash => "gemini-1.5-flash",
        }
    }

    pub fn parse(value: &str) -> Option<GeminiModel> {
        GeminiModel::ALL.into_iter().find(|m| m.as_str() == value)
    }
}

impl fmt::Display for GeminiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Process configuration for the GUI server.
///
/// Everything here is a form default or a service address; the credential
/// can equally be supplied per run through the page.
#[derive(Debug, Clone, Deserialize)]
pub struct GuiConfig {
    #[serde(default)]
    pub api_key: String,

    #[serde(default)]
    pub model: GeminiModel,

    #[serde(default = "default_debate_rounds")]
    pub debate_rounds: u32,

    #[serde(default)]
    pub streaming_enabled: bool,

    /// Base URL of the magi-core engine service.
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    /// Gemini endpoint handed through to the engine.
    #[serde(default = "default_gemini_endpoint")]
    pub gemini_endpoint: String,

    /// Bind address for the HTTP server.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GeminiModel::default(),
            debate_rounds: default_debate_rounds(),
            streaming_enabled: false,
            engine_url: default_engine_url(),
            gemini_endpoint: default_gemini_endpoint(),
            bind_address: default_bind_address(),
        }
    }
}

fn default_debate_rounds() -> u32 {
    3
}

fn default_engine_url() -> String {
    DEFAULT_ENGINE_URL.to_string()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

/// Load configuration from `~/.magi/gui.toml`, falling back to the MAGI_*
/// environment variables. A missing file is not an error; the page can
/// supply the credential per run.
pub fn load_config() -> Result<GuiConfig> {
    if let Some(home) = dirs::home_dir() {
        let path = home.join(".magi/gui.toml");
        if path.exists() {
            return load_config_from(&path);
        }
    }

    let mut config = GuiConfig::default();
    apply_env_defaults(&mut config);
    Ok(config)
}

/// Load configuration from an explicit TOML file.
pub fn load_config_from(path: &Path) -> Result<GuiConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config at {}", path.display()))
}

/// Environment variables are read once here as defaults; nothing in this
/// process ever writes them.
fn apply_env_defaults(config: &mut GuiConfig) {
    if let Ok(api_key) = std::env::var("MAGI_GEMINI_API_KEY") {
        if !api_key.is_empty() {
            config.api_key = api_key;
        }
    }
    if let Ok(model) = std::env::var("MAGI_GEMINI_MODEL") {
        if let Some(model) = GeminiModel::parse(&model) {
            config.model = model;
        }
    }
    if let Ok(endpoint) = std::env::var("MAGI_GEMINI_ENDPOINT") {
        if !endpoint.is_empty() {
            config.gemini_endpoint = endpoint;
        }
    }
    if let Ok(engine_url) = std::env::var("MAGI_ENGINE_URL") {
        if !engine_url.is_empty() {
            config.engine_url = engine_url;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = GuiConfig::default();
        assert_eq!(config.model, GeminiModel::Pro);
        assert_eq!(config.debate_rounds, 3);
        assert!(!config.streaming_enabled);
        assert_eq!(config.engine_url, DEFAULT_ENGINE_URL);
    }

    #[test]
    fn test_model_parse_is_closed() {
        assert_eq!(GeminiModel::parse("gemini-1.5-flash"), Some(GeminiModel::Flash));
        assert_eq!(GeminiModel::parse("gemini-2.0-ultra"), None);
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "model = \"gemini-1.5-flash\"\ndebate_rounds = 5\nstreaming_enabled = true"
        )
        .unwrap();

        let config = load_config_from(file.path()).unwrap();
        assert_eq!(config.model, GeminiModel::Flash);
        assert_eq!(config.debate_rounds, 5);
        assert!(config.streaming_enabled);
        // Unset fields keep their defaults
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
    }

    #[test]
    fn test_load_config_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debate_rounds = \"many\"").unwrap();
        assert!(load_config_from(file.path()).is_err());
    }
}
