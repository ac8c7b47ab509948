//! Driver-supplied puzzle banks in TOML.
//!
//! ```toml
//! [[puzzles]]
//! prompt = "What has keys but can't open locks?"
//! accepted = ["keyboard", "a keyboard"]
//!
//! [[puzzles]]
//! prompt = "Which is heavier, a kilo of iron or a kilo of feathers?"
//! options = ["Iron", "Feathers", "Same", "Neither"]
//! answer = 2
//! ```
//!
//! Entries with `options` become choice puzzles; the rest are free text.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use duel_types::{AnswerKey, Domain, PuzzleError, PuzzleInstance};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BankError {
    #[error("failed to read bank at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse bank: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("bank contains no usable puzzles")]
    Empty,
}

#[derive(Debug, Default, Deserialize)]
struct BankFile {
    #[serde(default)]
    puzzles: Vec<BankEntry>,
}

#[derive(Debug, Deserialize)]
struct BankEntry {
    #[serde(default)]
    prompt: String,
    #[serde(default)]
    accepted: Vec<String>,
    options: Option<Vec<String>>,
    answer: Option<usize>,
}

impl BankEntry {
    fn into_instance(self, domain: Domain) -> Result<PuzzleInstance, PuzzleError> {
        let key = match self.options {
            Some(options) => {
                let correct = self.answer.unwrap_or(usize::MAX);
                AnswerKey::choice(options, correct)?
            }
            None => AnswerKey::free_text(self.accepted)?,
        };
        PuzzleInstance::new(domain, self.prompt.trim(), key, "")
    }
}

/// Parse a bank, dropping malformed entries and repeated prompts
/// (compared trimmed and case-insensitively).
pub fn parse_bank(content: &str, domain: Domain) -> Result<Vec<PuzzleInstance>, BankError> {
    let file: BankFile = toml::from_str(content)?;
    let mut seen = HashSet::new();
    let mut instances = Vec::with_capacity(file.puzzles.len());

    for (position, entry) in file.puzzles.into_iter().enumerate() {
        let dedup_key = entry.prompt.trim().to_lowercase();
        if dedup_key.is_empty() || seen.contains(&dedup_key) {
            tracing::debug!(position, "Skipping empty or duplicate bank prompt");
            continue;
        }
        match entry.into_instance(domain) {
            Ok(instance) => {
                seen.insert(dedup_key);
                instances.push(instance);
            }
            Err(e) => tracing::warn!(position, "Skipping malformed bank entry: {e}"),
        }
    }

    if instances.is_empty() {
        return Err(BankError::Empty);
    }
    tracing::info!(%domain, count = instances.len(), "Loaded puzzle bank");
    Ok(instances)
}

pub fn load_bank(path: &Path, domain: Domain) -> Result<Vec<PuzzleInstance>, BankError> {
    let content = std::fs::read_to_string(path).map_err(|source| BankError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_bank(&content, domain)
}
