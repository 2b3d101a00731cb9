use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub openai: OpenAiSettings,
    #[serde(default)]
    pub catalog: CatalogSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub export: ExportSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OpenAiSettings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    #[serde(default = "default_extraction_model")]
    pub extraction_model: String,
    #[serde(default = "default_explanation_model")]
    pub explanation_model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_explanation_max_tokens")]
    pub explanation_max_tokens: u32,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key: String::new(),
            transcription_model: default_transcription_model(),
            extraction_model: default_extraction_model(),
            explanation_model: default_explanation_model(),
            timeout_secs: default_timeout_secs(),
            explanation_max_tokens: default_explanation_max_tokens(),
        }
    }
}

fn default_endpoint() -> String { "https://api.openai.com/v1".to_string() }
fn default_transcription_model() -> String { "whisper-1".to_string() }
fn default_extraction_model() -> String { "gpt-4o".to_string() }
fn default_explanation_model() -> String { "gpt-4o-mini".to_string() }
fn default_timeout_secs() -> u64 { 120 }
fn default_explanation_max_tokens() -> u32 { 200 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogSettings {
    pub path: Option<PathBuf>,
    pub gazetteer_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    /// Size of the "top N" export selection
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// How many of the best matches get an AI explanation
    #[serde(default = "default_explain_top_n")]
    pub explain_top_n: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            explain_top_n: default_explain_top_n(),
        }
    }
}

fn default_top_n() -> usize { 5 }
fn default_explain_top_n() -> usize { 5 }

#[derive(Debug, Clone, Deserialize)]
pub struct ExportSettings {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self { output_dir: default_output_dir() }
    }
}

fn default_output_dir() -> PathBuf { PathBuf::from("exports") }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with PLACEMENT__)
    /// 5. OPENAI_API_KEY, when set
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., PLACEMENT__MATCHING__TOP_N -> matching.top_n
            .add_source(environment())
            .build()?;

        with_api_key_override(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        with_api_key_override(settings)?.try_deserialize()
    }
}

fn environment() -> Environment {
    Environment::with_prefix("PLACEMENT")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// The conventional OPENAI_API_KEY variable wins over file values
fn with_api_key_override(settings: Config) -> Result<Config, ConfigError> {
    match std::env::var("OPENAI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => Config::builder()
            .add_source(settings)
            .set_override("openai.api_key", key)?
            .build(),
        _ => Ok(settings),
    }
}
