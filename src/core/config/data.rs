use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::markdown::{builtin, ExtensionSet};
use crate::reveal::{RevealConfig, RevealError};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// `[reveal]` table. Unset fields fall back to [`RevealConfig::default`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct RevealSettings {
    pub step: Option<usize>,
    pub interval_ms: Option<u64>,
    pub suffix: Option<String>,
}

impl RevealSettings {
    pub fn to_config(&self) -> Result<RevealConfig, RevealError> {
        let defaults = RevealConfig::default();
        let interval = self
            .interval_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.interval);
        let config = RevealConfig::new(self.step.unwrap_or(defaults.step), interval)?;
        Ok(match &self.suffix {
            Some(suffix) => config.with_suffix(suffix.clone()),
            None => config,
        })
    }

    fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Config {
    /// OpenAI-compatible API root, e.g. `https://api.openai.com/v1`
    pub base_url: Option<String>,
    pub model: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    /// Seconds to wait for the connection and the response headers
    pub request_timeout_secs: Option<u64>,
    /// Shown instead of an empty reply when a request fails before any text
    /// arrived
    pub fallback_message: Option<String>,
    /// Render replies as markdown
    pub markdown: Option<bool>,
    /// Built-in markdown extensions to enable, in priority order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extensions: Vec<String>,
    #[serde(default, skip_serializing_if = "RevealSettings::is_empty")]
    pub reveal: RevealSettings,
}

/// Render a path for display, abbreviating the home directory to `~`.
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV)
    }

    /// Read the API key from the configured environment variable. Empty
    /// values count as unset.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(self.api_key_env())
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn markdown_enabled(&self) -> bool {
        self.markdown.unwrap_or(true)
    }

    /// Resolve `extensions` to built-ins. Unknown names are skipped.
    pub fn extension_set(&self) -> ExtensionSet {
        self.extensions
            .iter()
            .fold(ExtensionSet::new(), |set, name| match builtin(name) {
                Some(extension) => set.with(extension),
                None => {
                    warn!(extension = %name, "Unknown markdown extension in config");
                    set
                }
            })
    }

    /// Set a top-level or `reveal.*` key from its string form.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), String> {
        fn number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, String> {
            value
                .trim()
                .parse()
                .map_err(|_| format!("{key} expects a number, got {value:?}"))
        }

        match key {
            "base_url" => self.base_url = Some(value.to_string()),
            "model" => self.model = Some(value.to_string()),
            "api_key_env" => self.api_key_env = Some(value.to_string()),
            "request_timeout_secs" => self.request_timeout_secs = Some(number(key, value)?),
            "fallback_message" => self.fallback_message = Some(value.to_string()),
            "markdown" => {
                self.markdown = Some(match value.trim() {
                    "on" | "true" | "yes" => true,
                    "off" | "false" | "no" => false,
                    other => return Err(format!("markdown expects on or off, got {other:?}")),
                })
            }
            "extensions" => {
                let names: Vec<String> = value
                    .split(',')
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect();
                if let Some(unknown) = names.iter().find(|name| builtin(name).is_none()) {
                    return Err(format!("unknown extension {unknown:?}"));
                }
                self.extensions = names;
            }
            "reveal.step" => self.reveal.step = Some(number(key, value)?),
            "reveal.interval_ms" => self.reveal.interval_ms = Some(number(key, value)?),
            "reveal.suffix" => self.reveal.suffix = Some(value.to_string()),
            _ => return Err(format!("unknown config key {key:?}")),
        }
        Ok(())
    }

    pub fn unset_value(&mut self, key: &str) -> Result<(), String> {
        match key {
            "base_url" => self.base_url = None,
            "model" => self.model = None,
            "api_key_env" => self.api_key_env = None,
            "request_timeout_secs" => self.request_timeout_secs = None,
            "fallback_message" => self.fallback_message = None,
            "markdown" => self.markdown = None,
            "extensions" => self.extensions.clear(),
            "reveal.step" => self.reveal.step = None,
            "reveal.interval_ms" => self.reveal.interval_ms = None,
            "reveal.suffix" => self.reveal.suffix = None,
            _ => return Err(format!("unknown config key {key:?}")),
        }
        Ok(())
    }
}
