//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.quill/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct QuillConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub recorder: RecorderConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub default_model: Option<String>,
    pub system_prompt: Option<String>,
    pub system_prompt_file: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BackendConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RecorderConfig {
    /// Program and arguments; must write MP3 to stdout and quit on `q`.
    pub command: Option<Vec<String>>,
    pub auto_submit_delay_ms: Option<u64>,
    pub stop_timeout_ms: Option<u64>,
}

/// Values given on the command line. `None` means not specified.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub model: Option<String>,
    pub base_url: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_AUTO_SUBMIT_DELAY_MS: u64 = 100;
pub const DEFAULT_STOP_TIMEOUT_MS: u64 = 3000;

const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. \
    When the user attaches an image, document or voice note, treat it as part of their message. \
    Be direct, be honest about uncertainty, and prefer clarity over hedging.";

/// `ffmpeg` reading the platform's default input and writing MP3 to stdout.
pub fn default_recorder_command() -> Vec<String> {
    let input: &[&str] = if cfg!(target_os = "macos") {
        &["-f", "avfoundation", "-i", ":0"]
    } else if cfg!(target_os = "windows") {
        &["-f", "dshow", "-i", "audio=default"]
    } else {
        &["-f", "pulse", "-i", "default"]
    };

    ["ffmpeg", "-hide_banner", "-loglevel", "error"]
        .iter()
        .chain(input)
        .chain(&["-ac", "1", "-f", "mp3", "-"])
        .map(|s| s.to_string())
        .collect()
}

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub model_name: String,
    pub system_prompt: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub recorder_command: Vec<String>,
    pub auto_submit_delay: Duration,
    pub stop_timeout: Duration,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Loading
// ============================================================================

/// Returns `~/.quill`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".quill"))
}

/// Returns the path to `~/.quill/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load config from `~/.quill/config.toml`.
///
/// If the file doesn't exist, generates a commented-out default and
/// returns `QuillConfig::default()`. If it exists but is malformed,
/// returns `ConfigError::Parse`.
pub fn load_config() -> Result<QuillConfig, ConfigError> {
    let Some(path) = config_path() else {
        warn!("Could not determine home directory, using default config");
        return Ok(QuillConfig::default());
    };
    load_config_from(&path)
}

pub fn load_config_from(path: &Path) -> Result<QuillConfig, ConfigError> {
    if !path.exists() {
        info!("No config file found, generating default at {}", path.display());
        generate_default_config(path);
        return Ok(QuillConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(ConfigError::Io)?;
    let config: QuillConfig = toml::from_str(&contents).map_err(ConfigError::Parse)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# Quill Configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [general]
# default_model = "gpt-4o-mini"        # Or set QUILL_MODEL, or pass --model
# system_prompt = "You are a helpful assistant."
# system_prompt_file = "system.md"     # Path relative to ~/.quill/

# [backend]
# base_url = "https://api.openai.com/v1"  # Any OpenAI-compatible server; or QUILL_BASE_URL
# api_key = "sk-..."                   # Or set OPENAI_API_KEY env var

# [recorder]
# command = ["ffmpeg", "-f", "pulse", "-i", "default", "-ac", "1", "-f", "mp3", "-"]
# auto_submit_delay_ms = 100           # Pause between stopping a recording and sending it
# stop_timeout_ms = 3000               # Kill the recorder if it takes longer to finish
"#;

    if let Some(parent) = path.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warn!("Failed to create config directory: {}", e);
        return;
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &QuillConfig, cli: &CliOverrides) -> ResolvedConfig {
    // Model: CLI → env → config → default
    let model_name = cli
        .model
        .clone()
        .or_else(|| std::env::var("QUILL_MODEL").ok())
        .or_else(|| config.general.default_model.clone())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    // Base URL: CLI → env → config → default
    let base_url = cli
        .base_url
        .clone()
        .or_else(|| std::env::var("QUILL_BASE_URL").ok())
        .or_else(|| config.backend.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // API key: env → config
    let api_key = std::env::var("OPENAI_API_KEY")
        .ok()
        .or_else(|| config.backend.api_key.clone());

    let recorder_command = config
        .recorder
        .command
        .clone()
        .filter(|argv| !argv.is_empty())
        .unwrap_or_else(default_recorder_command);

    ResolvedConfig {
        model_name,
        system_prompt: resolve_system_prompt(config),
        base_url,
        api_key,
        recorder_command,
        auto_submit_delay: Duration::from_millis(
            config
                .recorder
                .auto_submit_delay_ms
                .unwrap_or(DEFAULT_AUTO_SUBMIT_DELAY_MS),
        ),
        stop_timeout: Duration::from_millis(
            config
                .recorder
                .stop_timeout_ms
                .unwrap_or(DEFAULT_STOP_TIMEOUT_MS),
        ),
    }
}

/// Resolves the system prompt: inline wins over file, both win over default.
fn resolve_system_prompt(config: &QuillConfig) -> String {
    if let Some(ref prompt) = config.general.system_prompt {
        return prompt.clone();
    }

    // Relative to ~/.quill/
    if let Some(ref file) = config.general.system_prompt_file
        && let Some(dir) = config_dir()
    {
        let prompt_path = dir.join(file);
        match fs::read_to_string(&prompt_path) {
            Ok(contents) => {
                let trimmed = contents.trim().to_string();
                if !trimmed.is_empty() {
                    info!("Loaded system prompt from {}", prompt_path.display());
                    return trimmed;
                }
                warn!("System prompt file is empty: {}", prompt_path.display());
            }
            Err(e) => {
                warn!(
                    "Failed to read system prompt file {}: {}",
                    prompt_path.display(),
                    e
                );
            }
        }
    }

    DEFAULT_SYSTEM_PROMPT.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_uses_defaults_when_empty() {
        let resolved = resolve(&QuillConfig::default(), &CliOverrides::default());
        assert_eq!(resolved.auto_submit_delay, Duration::from_millis(100));
        assert_eq!(resolved.stop_timeout, Duration::from_millis(3000));
        assert_eq!(resolved.recorder_command[0], "ffmpeg");
        assert!(resolved.system_prompt.starts_with("You are a helpful assistant"));
    }

    #[test]
    fn test_resolve_config_values_override_defaults() {
        let config = QuillConfig {
            general: GeneralConfig {
                default_model: Some("my-model".to_string()),
                system_prompt: Some("Custom prompt.".to_string()),
                system_prompt_file: None,
            },
            recorder: RecorderConfig {
                command: Some(vec!["arecord".to_string()]),
                auto_submit_delay_ms: Some(250),
                stop_timeout_ms: None,
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default());
        if std::env::var("QUILL_MODEL").is_err() {
            assert_eq!(resolved.model_name, "my-model");
        }
        assert_eq!(resolved.system_prompt, "Custom prompt.");
        assert_eq!(resolved.recorder_command, vec!["arecord".to_string()]);
        assert_eq!(resolved.auto_submit_delay, Duration::from_millis(250));
    }

    #[test]
    fn test_resolve_cli_wins() {
        let config = QuillConfig {
            general: GeneralConfig {
                default_model: Some("from-file".to_string()),
                ..Default::default()
            },
            backend: BackendConfig {
                base_url: Some("http://file:1/v1".to_string()),
                api_key: None,
            },
            ..Default::default()
        };
        let cli = CliOverrides {
            model: Some("from-cli".to_string()),
            base_url: Some("http://cli:2/v1".to_string()),
        };
        let resolved = resolve(&config, &cli);
        assert_eq!(resolved.model_name, "from-cli");
        assert_eq!(resolved.base_url, "http://cli:2/v1");
    }

    #[test]
    fn test_empty_recorder_command_falls_back_to_default() {
        let config = QuillConfig {
            recorder: RecorderConfig {
                command: Some(Vec::new()),
                ..Default::default()
            },
            ..Default::default()
        };
        let resolved = resolve(&config, &CliOverrides::default());
        assert_eq!(resolved.recorder_command, default_recorder_command());
    }

    #[test]
    fn test_toml_round_trip() {
        let toml_str = r#"
[general]
default_model = "llava"

[backend]
base_url = "http://localhost:11434/v1"
api_key = "sk-test-123"

[recorder]
command = ["sox", "-d", "-t", "mp3", "-"]
auto_submit_delay_ms = 50
"#;
        let config: QuillConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.default_model.as_deref(), Some("llava"));
        assert_eq!(config.backend.api_key.as_deref(), Some("sk-test-123"));
        assert_eq!(config.recorder.command.as_ref().map(Vec::len), Some(5));
        assert_eq!(config.recorder.auto_submit_delay_ms, Some(50));
        assert!(config.recorder.stop_timeout_ms.is_none());
    }

    #[test]
    fn test_sparse_toml_parses() {
        let config: QuillConfig = toml::from_str("[backend]\nbase_url = \"http://x/v1\"\n").unwrap();
        assert!(config.general.default_model.is_none());
        assert!(config.recorder.command.is_none());
    }

    #[test]
    fn test_missing_file_generates_commented_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = load_config_from(&path).unwrap();
        assert!(config.general.default_model.is_none());

        let generated = fs::read_to_string(&path).unwrap();
        assert!(generated.starts_with("# Quill Configuration"));
        // The generated file is all comments, so it parses to defaults.
        let reparsed: QuillConfig = toml::from_str(&generated).unwrap();
        assert!(reparsed.backend.base_url.is_none());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[general\n").unwrap();
        assert!(matches!(load_config_from(&path), Err(ConfigError::Parse(_))));
    }
}
