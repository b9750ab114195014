//! Process configuration, read once at start-up from the environment.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::{info, warn};

use autocat_ai::{MatchMode, OpenAiConfig, PromptLocale, PromptTemplate};
use autocat_core::ManualRules;

use crate::external::FireflyConfig;
use crate::jobs::WorkQueueConfig;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MANUAL_CATEGORIES_PATH: &str = "manual_categories/config.json";
pub const DEFAULT_JOB_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("the required environment variable '{0}' is missing")]
    MissingVariable(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },

    #[error("cannot load manual categories from {path}: {reason}")]
    RulesFile { path: PathBuf, reason: String },
}

/// Resolved application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub enable_ui: bool,
    pub firefly: FireflyConfig,
    pub openai: OpenAiConfig,
    pub manual_categories_path: PathBuf,
    pub job_timeout: Duration,
    pub job_history_limit: Option<usize>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let required = |name: &'static str| get(name).ok_or(ConfigError::MissingVariable(name));

        let mut firefly = FireflyConfig::new(
            required("FIREFLY_URL")?,
            required("FIREFLY_PERSONAL_TOKEN")?,
        );
        if let Some(tag) = get("FIREFLY_TAG") {
            firefly = firefly.with_tag(tag);
        }

        let locale: PromptLocale = parse(&get, "PROMPT_LOCALE")?.unwrap_or_default();
        let match_mode: MatchMode = parse(&get, "CLASSIFIER_MATCH_MODE")?.unwrap_or_default();
        let mut openai = OpenAiConfig::new(required("OPENAI_API_KEY")?)
            .with_template(PromptTemplate::new(locale, match_mode));
        if let Some(model) = get("OPENAI_MODEL") {
            openai = openai.with_model(model);
        }
        if let Some(base_url) = get("OPENAI_BASE_URL") {
            openai = openai.with_base_url(base_url);
        }

        let job_timeout_secs: u64 = parse(&get, "JOB_TIMEOUT_SECS")?.unwrap_or(DEFAULT_JOB_TIMEOUT_SECS);
        if job_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "JOB_TIMEOUT_SECS",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            port: parse(&get, "PORT")?.unwrap_or(DEFAULT_PORT),
            enable_ui: parse_flag(&get, "ENABLE_UI")?,
            firefly,
            openai,
            manual_categories_path: get("MANUAL_CATEGORIES_PATH")
                .unwrap_or_else(|| DEFAULT_MANUAL_CATEGORIES_PATH.to_string())
                .into(),
            job_timeout: Duration::from_secs(job_timeout_secs),
            job_history_limit: parse(&get, "JOB_HISTORY_LIMIT")?,
        })
    }

    pub fn queue_config(&self) -> WorkQueueConfig {
        WorkQueueConfig::default().with_task_timeout(self.job_timeout)
    }
}

fn parse<T, G>(get: &G, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    get(name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

fn parse_flag<G>(get: &G, name: &'static str) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(name).map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("false" | "0" | "no") => Ok(false),
        Some("true" | "1" | "yes") => Ok(true),
        Some(other) => Err(ConfigError::Invalid {
            name,
            value: other.to_string(),
        }),
    }
}

/// Load the manual rule table.
///
/// A missing file is not an error: the service simply runs without manual
/// rules. A file that exists but cannot be parsed is.
pub fn load_manual_rules(path: impl AsRef<Path>) -> Result<ManualRules, ConfigError> {
    let path = path.as_ref();
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "manual categories file not found, continuing without manual rules");
            return Ok(ManualRules::default());
        }
        Err(e) => {
            return Err(ConfigError::RulesFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };

    let rules = ManualRules::from_json(&raw).map_err(|e| ConfigError::RulesFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    info!(path = %path.display(), rules = rules.len(), "manual categories loaded");
    Ok(rules)
}
