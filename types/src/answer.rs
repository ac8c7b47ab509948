//! Answers from both sides and the per-round outcome.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Provider;

/// What the human submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HumanAnswer {
    Choice(usize),
    Text(String),
}

/// Which strategy actually produced an opponent answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    Local,
    OpenAI,
    Gemini,
}

impl AnswerSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            AnswerSource::Local => "local",
            AnswerSource::OpenAI => "openai",
            AnswerSource::Gemini => "gemini",
        }
    }

    /// Source tag for a successful answer from `provider`.
    #[must_use]
    pub const fn for_provider(provider: Provider) -> Self {
        match provider {
            Provider::Simulated => AnswerSource::Local,
            Provider::OpenAI => AnswerSource::OpenAI,
            Provider::Gemini => AnswerSource::Gemini,
        }
    }
}

impl fmt::Display for AnswerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The opponent's answer to one instance. Always present; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentAnswer {
    pub correct: bool,
    /// Chosen option index for choice puzzles.
    pub choice: Option<usize>,
    pub text: String,
    pub source: AnswerSource,
    /// Remote provider that failed before the local simulator stepped in.
    pub fallback_from: Option<Provider>,
}

impl OpponentAnswer {
    #[must_use]
    pub fn with_fallback_from(mut self, provider: Provider) -> Self {
        self.fallback_from = Some(provider);
        self
    }
}

/// One scored round. Immutable; the scoreboard accumulates these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub human_answer: String,
    pub human_correct: bool,
    pub opponent_answer: String,
    pub opponent_correct: bool,
    pub opponent_source: AnswerSource,
    pub correct_answer: String,
    pub elapsed: Duration,
}

impl RoundOutcome {
    #[must_use]
    pub const fn team_point(&self) -> bool {
        self.human_correct || self.opponent_correct
    }
}

/// Running totals for a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub human: u32,
    pub opponent: u32,
    /// Rounds where at least one side was right.
    pub team: u32,
    pub rounds: u32,
}

impl Scoreboard {
    pub fn record(&mut self, outcome: &RoundOutcome) {
        self.rounds += 1;
        if outcome.human_correct {
            self.human += 1;
        }
        if outcome.opponent_correct {
            self.opponent += 1;
        }
        if outcome.team_point() {
            self.team += 1;
        }
    }
}
