//! One batch of puzzles played against the opponent.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use duel_types::{Domain, HumanAnswer, Provider, PuzzleInstance, RoundOutcome, Scoreboard};
use thiserror::Error;

use crate::arbiter::{Arbitrator, OpponentSettings};
use crate::speculative::{Fingerprint, PendingAnswer, SpeculativeSlot};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("the batch is finished")]
    Finished,
    #[error("this puzzle was already scored; advance to the next one")]
    AlreadyAnswered,
    #[error("option {index} does not exist (there are {len})")]
    ChoiceOutOfRange { index: usize, len: usize },
    #[error("type an answer first")]
    EmptyAnswer,
    #[error("this puzzle expects {expected}")]
    WrongAnswerKind { expected: &'static str },
}

/// Session state for one domain's batch.
///
/// The batch is a circular queue: the front is the current puzzle, skipping
/// rotates it to the back. `index` counts puzzles presented so far, skips
/// included, and is what speculative evaluations are keyed by.
#[derive(Debug)]
pub struct Session {
    domain: Domain,
    queue: VecDeque<PuzzleInstance>,
    index: usize,
    answered: bool,
    scoreboard: Scoreboard,
    settings: OpponentSettings,
    arbiter: Arc<Arbitrator>,
    slot: SpeculativeSlot,
}

impl Session {
    #[must_use]
    pub fn new(domain: Domain, batch: Vec<PuzzleInstance>, settings: OpponentSettings) -> Self {
        let arbiter = Arbitrator::from_settings(&settings);
        Self::with_arbiter(domain, batch, settings, arbiter)
    }

    /// Session with an explicit strategy chain instead of one built from `settings`.
    #[must_use]
    pub fn with_arbiter(
        domain: Domain,
        batch: Vec<PuzzleInstance>,
        settings: OpponentSettings,
        arbiter: Arbitrator,
    ) -> Self {
        Self {
            domain,
            queue: batch.into(),
            index: 0,
            answered: false,
            scoreboard: Scoreboard::default(),
            settings,
            arbiter: Arc::new(arbiter),
            slot: SpeculativeSlot::default(),
        }
    }

    #[must_use]
    pub const fn domain(&self) -> Domain {
        self.domain
    }

    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Puzzles left, the current one included.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    #[must_use]
    pub const fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    #[must_use]
    pub const fn settings(&self) -> &OpponentSettings {
        &self.settings
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    #[must_use]
    pub fn current(&self) -> Option<&PuzzleInstance> {
        self.queue.front()
    }

    /// Key for the current puzzle under the current opponent settings.
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            domain: self.domain,
            index: self.index,
            provider: self.settings.provider,
            credential: self.settings.credential().cloned(),
        }
    }

    /// Show the current puzzle and start the opponent on it.
    ///
    /// # Panics
    ///
    /// The opponent task is spawned onto the ambient Tokio runtime, so this
    /// panics when called outside one.
    pub fn present(&mut self) -> Option<&PuzzleInstance> {
        self.pending();
        self.current()
    }

    /// The opponent's in-flight answer for the current puzzle. Repeated calls
    /// under unchanged settings return the same task.
    ///
    /// # Panics
    ///
    /// Outside a Tokio runtime, like [`Session::present`].
    pub fn pending(&mut self) -> Option<PendingAnswer> {
        let instance = self.queue.front()?.clone();
        let arbiter = Arc::clone(&self.arbiter);
        let fingerprint = self.fingerprint();
        Some(self.slot.request(fingerprint, move || async move {
            arbiter.answer(&instance).await
        }))
    }

    /// Score the human's answer against the opponent's for the current puzzle.
    pub async fn submit(&mut self, human: HumanAnswer) -> Result<RoundOutcome, SessionError> {
        let instance = self.queue.front().ok_or(SessionError::Finished)?;
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        let human_answer = validate(instance, &human)?;
        let human_correct = instance.grade(&human);
        let correct_answer = instance.correct_text().to_string();

        let started = Instant::now();
        let pending = self.pending().ok_or(SessionError::Finished)?;
        let opponent = match pending.resolve().await {
            Some(answer) => answer,
            None => {
                tracing::warn!("Opponent task lost; answering locally");
                let instance = self.queue.front().ok_or(SessionError::Finished)?;
                self.arbiter.answer_locally(instance)
            }
        };
        let elapsed = started.elapsed();

        let outcome = RoundOutcome {
            human_answer,
            human_correct,
            opponent_answer: opponent.text,
            opponent_correct: opponent.correct,
            opponent_source: opponent.source,
            correct_answer,
            elapsed,
        };
        self.scoreboard.record(&outcome);
        self.answered = true;

        tracing::info!(
            "[{}] R{}: You {}, AI {} ({})",
            self.domain,
            self.scoreboard.rounds,
            u8::from(outcome.human_correct),
            u8::from(outcome.opponent_correct),
            outcome.opponent_source
        );
        Ok(outcome)
    }

    /// Move the current puzzle to the back of the batch without scoring it.
    pub fn skip(&mut self) -> Result<(), SessionError> {
        if self.answered {
            return Err(SessionError::AlreadyAnswered);
        }
        let instance = self.queue.pop_front().ok_or(SessionError::Finished)?;
        self.queue.push_back(instance);
        self.index += 1;
        self.slot.invalidate();
        tracing::debug!(domain = %self.domain, index = self.index, "Puzzle skipped; moved to end of batch");
        Ok(())
    }

    /// Drop the current puzzle and move on. Returns whether another puzzle remains.
    pub fn advance(&mut self) -> bool {
        if self.queue.pop_front().is_some() {
            self.index += 1;
        }
        self.answered = false;
        self.slot.invalidate();
        !self.queue.is_empty()
    }

    pub fn set_provider(&mut self, provider: Provider) {
        self.settings.provider = provider;
        self.rebuild_arbiter();
    }

    /// Replace (or, with blank input, clear) the key for `provider`.
    pub fn set_credential(&mut self, provider: Provider, raw: &str) {
        self.settings.set_credential(provider, raw);
        self.rebuild_arbiter();
    }

    pub fn set_settings(&mut self, settings: OpponentSettings) {
        self.settings = settings;
        self.rebuild_arbiter();
    }

    fn rebuild_arbiter(&mut self) {
        self.arbiter = Arc::new(Arbitrator::from_settings(&self.settings));
        self.slot.invalidate();
        tracing::info!(provider = %self.settings.provider, "Opponent settings changed");
    }
}

/// Display text for the human's answer, or why it cannot be scored.
fn validate(instance: &PuzzleInstance, human: &HumanAnswer) -> Result<String, SessionError> {
    match human {
        HumanAnswer::Choice(index) => {
            if instance.is_free_text() {
                return Err(SessionError::WrongAnswerKind {
                    expected: "a typed answer",
                });
            }
            let options = instance.options();
            options
                .get(*index)
                .cloned()
                .ok_or(SessionError::ChoiceOutOfRange {
                    index: *index,
                    len: options.len(),
                })
        }
        HumanAnswer::Text(text) => {
            if !instance.is_free_text() {
                return Err(SessionError::WrongAnswerKind {
                    expected: "an option number",
                });
            }
            let text = text.trim();
            if text.is_empty() {
                return Err(SessionError::EmptyAnswer);
            }
            Ok(text.to_string())
        }
    }
}
