//! Configuration loader and path helpers.
//!
//! Uses Figment to merge serialized defaults, `config.toml`,
//! `config.<env>.toml` and `APP_*` env vars (`__` separates nested keys,
//! e.g. `APP_STORE__BACKEND=lancedb`). Path settings expand `~` and
//! `${VAR}` on access.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

use crate::error::{Error, Result};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));
        Ok(Self { figment })
    }

    /// Build from an explicit figment, e.g. a single TOML file in tests.
    pub fn from_figment(figment: Figment) -> Self {
        Self { figment: Figment::from(Serialized::defaults(Settings::default())).merge(figment) }
    }

    pub fn settings(&self) -> Result<Settings> {
        let settings: Settings = self.figment.extract().map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub model: ModelSettings,
    pub rag: RagSettings,
    pub store: StoreSettings,
    pub embed: EmbedSettings,
    pub data: DataSettings,
    pub logging: LoggingSettings,
}

impl Settings {
    fn validate(&self) -> Result<()> {
        if self.model.name.trim().is_empty() { return Err(Error::Config("model.name must not be empty".into())); }
        if self.model.timeout_secs == 0 { return Err(Error::Config("model.timeout_secs must be at least 1".into())); }
        if self.rag.similar_limit == 0 || self.rag.question_limit == 0 {
            return Err(Error::Config("rag.similar_limit and rag.question_limit must be at least 1".into()));
        }
        Ok(())
    }
}

/// Generation model endpoint. The API key itself is read from the
/// environment variable named by `api_key_env`, never from config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub name: String,
    pub base_url: String,
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "gemini-2.5-flash".into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key_env: "GEMINI_API_KEY".into(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub enabled: bool,
    pub similar_limit: usize,
    pub question_limit: usize,
    pub search_question: bool,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self { enabled: true, similar_limit: 1, question_limit: 3, search_question: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Lancedb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub lancedb_dir: String,
    pub table: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self { backend: StoreBackend::Memory, lancedb_dir: "~/.local/share/plantcare/lancedb".into(), table: "care_documents".into() }
    }
}

impl StoreSettings {
    pub fn lancedb_path(&self) -> PathBuf { expand_path(&self.lancedb_dir) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EmbedBackend {
    Hashing,
    BgeM3,
}

/// Embedder used by the document store. `bge-m3` needs the crate feature of
/// the same name and the model files under `model_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedSettings {
    pub backend: EmbedBackend,
    pub model_dir: String,
}

impl Default for EmbedSettings {
    fn default() -> Self { Self { backend: EmbedBackend::Hashing, model_dir: "models/bge-m3".into() } }
}

impl EmbedSettings {
    pub fn model_dir(&self) -> PathBuf { expand_path(&self.model_dir) }
}

/// Seed dataset location; `None` selects the bundled curated dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub dataset_path: Option<String>,
}

impl DataSettings {
    pub fn dataset_path(&self) -> Option<PathBuf> { self.dataset_path.as_deref().map(expand_path) }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self { Self { filter: "info".into(), json: false } }
}

/// `~` and `$VAR`/`${VAR}` expanded; unknown variables are left as written.
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}
