//! Puzzle domains and the domain-agnostic instance envelope.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::matches_exactly;

/// Puzzle family a batch is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Ladder-network path tracing.
    Wire,
    /// Block-tower stability.
    Physics,
    /// Push-box warehouse moves.
    Agent,
    /// Free-text riddles supplied by the driver.
    Riddle,
}

impl Domain {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Domain::Wire => "wire",
            Domain::Physics => "physics",
            Domain::Agent => "agent",
            Domain::Riddle => "riddle",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "wire" | "ladder" => Some(Domain::Wire),
            "physics" | "tower" => Some(Domain::Physics),
            "agent" | "warehouse" => Some(Domain::Agent),
            "riddle" => Some(Domain::Riddle),
            _ => None,
        }
    }

    /// Whether instances of this domain are produced by a built-in generator.
    #[must_use]
    pub const fn is_generated(&self) -> bool {
        !matches!(self, Domain::Riddle)
    }

    /// One-line instructions shown when a batch starts.
    #[must_use]
    pub const fn help(&self) -> &'static str {
        match self {
            Domain::Wire => {
                "Trace from start to finish; as you go down, if you hit a horizontal line, you must follow it across."
            }
            Domain::Physics => {
                "Read the tower side-view and decide if it is stable (Yes) or falls (No) under gravity."
            }
            Domain::Agent => "Choose the best first move for P to eventually push B onto target T.",
            Domain::Riddle => "Type your answer to the riddle.",
        }
    }

    #[must_use]
    pub fn all() -> &'static [Domain] {
        &[Domain::Wire, Domain::Physics, Domain::Agent, Domain::Riddle]
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PuzzleError {
    #[error("choice puzzle needs at least two options (got {0})")]
    TooFewOptions(usize),
    #[error("correct index {index} is out of range for {len} options")]
    CorrectOutOfRange { index: usize, len: usize },
    #[error("free-text puzzle needs at least one accepted answer")]
    NoAcceptedAnswers,
    #[error("puzzle prompt must not be empty")]
    EmptyPrompt,
}

/// The verified answer carried by every instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnswerKey {
    /// Multiple choice; `correct` indexes into `options`.
    Choice { options: Vec<String>, correct: usize },
    /// Free text; any of `accepted` (normalized) is right.
    FreeText { accepted: Vec<String> },
}

impl AnswerKey {
    pub fn choice(options: Vec<String>, correct: usize) -> Result<Self, PuzzleError> {
        if options.len() < 2 {
            return Err(PuzzleError::TooFewOptions(options.len()));
        }
        if correct >= options.len() {
            return Err(PuzzleError::CorrectOutOfRange {
                index: correct,
                len: options.len(),
            });
        }
        Ok(AnswerKey::Choice { options, correct })
    }

    pub fn free_text(accepted: Vec<String>) -> Result<Self, PuzzleError> {
        let accepted: Vec<String> = accepted
            .into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if accepted.is_empty() {
            return Err(PuzzleError::NoAcceptedAnswers);
        }
        Ok(AnswerKey::FreeText { accepted })
    }
}

/// A self-contained puzzle: prompt, verified answer, and a text rendering.
///
/// Immutable once built; the generator that produced it owns nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PuzzleInstance {
    domain: Domain,
    prompt: String,
    key: AnswerKey,
    rendered: String,
}

impl PuzzleInstance {
    pub fn new(
        domain: Domain,
        prompt: impl Into<String>,
        key: AnswerKey,
        rendered: impl Into<String>,
    ) -> Result<Self, PuzzleError> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(PuzzleError::EmptyPrompt);
        }
        Ok(Self {
            domain,
            prompt,
            key,
            rendered: rendered.into(),
        })
    }

    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub const fn key(&self) -> &AnswerKey {
        &self.key
    }

    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Options for choice-style puzzles; empty for free text.
    #[must_use]
    pub fn options(&self) -> &[String] {
        match &self.key {
            AnswerKey::Choice { options, .. } => options,
            AnswerKey::FreeText { .. } => &[],
        }
    }

    #[must_use]
    pub fn correct_index(&self) -> Option<usize> {
        match &self.key {
            AnswerKey::Choice { correct, .. } => Some(*correct),
            AnswerKey::FreeText { .. } => None,
        }
    }

    /// Canonical correct answer text (first accepted string for free text).
    #[must_use]
    pub fn correct_text(&self) -> &str {
        match &self.key {
            AnswerKey::Choice { options, correct } => &options[*correct],
            AnswerKey::FreeText { accepted } => &accepted[0],
        }
    }

    #[must_use]
    pub fn is_free_text(&self) -> bool {
        matches!(self.key, AnswerKey::FreeText { .. })
    }

    /// Grade a human answer. Free text requires an exact normalized match.
    #[must_use]
    pub fn grade(&self, answer: &crate::HumanAnswer) -> bool {
        match (&self.key, answer) {
            (AnswerKey::Choice { correct, .. }, crate::HumanAnswer::Choice(index)) => {
                index == correct
            }
            (AnswerKey::FreeText { accepted }, crate::HumanAnswer::Text(text)) => {
                matches_exactly(text, accepted)
            }
            _ => false,
        }
    }
}
