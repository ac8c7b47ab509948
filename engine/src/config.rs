use std::path::{Path, PathBuf};
use std::{env, fs};

use duel_types::{ApiKey, Domain, ModelName, Provider};
use serde::Deserialize;
use thiserror::Error;

use crate::arbiter::OpponentSettings;
use crate::local::AccuracyTable;

/// Contents of `~/.duel/config.toml`. Every section is optional.
///
/// ```toml
/// [opponent]
/// provider = "gemini"
/// batch_size = 10
///
/// [api_keys]
/// openai = "${OPENAI_API_KEY}"
/// google = "${GEMINI_API_KEY}"
///
/// [models]
/// gemini = "gemini-3-flash-preview"
///
/// [accuracy]
/// wire = 0.44
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct DuelConfig {
    pub opponent: Option<OpponentConfig>,
    pub api_keys: Option<ApiKeys>,
    pub models: Option<ModelsConfig>,
    pub accuracy: Option<AccuracyConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &PathBuf {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct OpponentConfig {
    /// `simulated`, `openai`, or `gemini`.
    pub provider: Option<String>,
    pub batch_size: Option<usize>,
}

#[derive(Default, Deserialize)]
pub struct ApiKeys {
    pub openai: Option<String>,
    pub google: Option<String>,
}

// Keys must never reach a log line.
impl std::fmt::Debug for ApiKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ApiKeys")
            .field("openai", &mask(self.openai.as_ref()))
            .field("google", &mask(self.google.as_ref()))
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ModelsConfig {
    pub openai: Option<String>,
    pub gemini: Option<String>,
}

/// Per-domain overrides for the local simulator.
#[derive(Debug, Default, Deserialize)]
pub struct AccuracyConfig {
    pub wire: Option<f64>,
    pub physics: Option<f64>,
    pub agent: Option<f64>,
    pub riddle: Option<f64>,
}

/// Replace every `${VAR}` with the variable's value (empty when unset).
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        let Some(len) = rest[start + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..start]);
        let var = &rest[start + 2..start + 2 + len];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &rest[start + 2 + len + 1..];
    }

    out.push_str(rest);
    out
}

impl DuelConfig {
    /// Load from the default location. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path).map_err(|source| {
            tracing::warn!("Failed to read config at {}: {source}", path.display());
            ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;

        toml::from_str(&content).map(Some).map_err(|source| {
            tracing::warn!("Failed to parse config at {}: {source}", path.display());
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Configured provider; unknown names fall back to the simulator.
    #[must_use]
    pub fn provider(&self) -> Provider {
        let Some(raw) = self.opponent.as_ref().and_then(|o| o.provider.as_deref()) else {
            return Provider::default();
        };
        Provider::parse(raw).unwrap_or_else(|e| {
            tracing::warn!("{e}; using the simulated opponent");
            Provider::default()
        })
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.opponent
            .as_ref()
            .and_then(|o| o.batch_size)
            .filter(|&n| n > 0)
            .unwrap_or(duel_puzzles::DEFAULT_BATCH_SIZE)
    }

    /// Key for `provider` from the file (with `${VAR}` expansion), else from
    /// the provider's environment variable.
    #[must_use]
    pub fn api_key(&self, provider: Provider) -> Option<ApiKey> {
        let configured = self.api_keys.as_ref().and_then(|keys| match provider {
            Provider::OpenAI => keys.openai.as_deref(),
            Provider::Gemini => keys.google.as_deref(),
            Provider::Simulated => None,
        });

        configured
            .map(expand_env_vars)
            .and_then(|raw| ApiKey::for_provider(provider, &raw))
            .or_else(|| {
                let var = provider.env_var()?;
                ApiKey::for_provider(provider, &env::var(var).ok()?)
            })
    }

    /// Model for `provider`, falling back to its default when unset or invalid.
    #[must_use]
    pub fn model(&self, provider: Provider) -> Option<ModelName> {
        let configured = self.models.as_ref().and_then(|m| match provider {
            Provider::OpenAI => m.openai.as_deref(),
            Provider::Gemini => m.gemini.as_deref(),
            Provider::Simulated => None,
        });

        configured
            .and_then(|raw| {
                ModelName::parse(provider, raw)
                    .inspect_err(|e| tracing::warn!("Ignoring configured model: {e}"))
                    .ok()
            })
            .or_else(|| provider.default_model())
    }

    #[must_use]
    pub fn accuracy(&self) -> AccuracyTable {
        let mut table = AccuracyTable::default();
        if let Some(acc) = &self.accuracy {
            let overrides = [
                (Domain::Wire, acc.wire),
                (Domain::Physics, acc.physics),
                (Domain::Agent, acc.agent),
                (Domain::Riddle, acc.riddle),
            ];
            for (domain, value) in overrides {
                if let Some(p) = value {
                    table.set(domain, p);
                }
            }
        }
        table
    }

    /// Everything the arbitrator needs, resolved from this config.
    #[must_use]
    pub fn opponent_settings(&self) -> OpponentSettings {
        OpponentSettings {
            provider: self.provider(),
            openai_key: self.api_key(Provider::OpenAI),
            gemini_key: self.api_key(Provider::Gemini),
            openai_model: self.model(Provider::OpenAI),
            gemini_model: self.model(Provider::Gemini),
            accuracy: self.accuracy(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".duel").join("config.toml"))
}
