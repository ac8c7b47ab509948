//! Offline opponent: right with a fixed per-domain probability.

use duel_types::{AnswerKey, AnswerSource, Domain, OpponentAnswer, PuzzleInstance};
use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Plausible wrong riddle answers.
const WRONG_RIDDLE_ANSWERS: [&str; 4] = ["shadow", "book", "time", "cloud"];

/// Probability of a correct answer per domain, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyTable {
    wire: f64,
    physics: f64,
    agent: f64,
    riddle: f64,
}

impl Default for AccuracyTable {
    fn default() -> Self {
        Self {
            wire: 0.44,
            physics: 0.41,
            agent: 0.35,
            riddle: 0.46,
        }
    }
}

impl AccuracyTable {
    /// Same probability for every domain.
    #[must_use]
    pub fn uniform(probability: f64) -> Self {
        let p = clamp_probability(probability).unwrap_or(0.0);
        Self {
            wire: p,
            physics: p,
            agent: p,
            riddle: p,
        }
    }

    #[must_use]
    pub const fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::Wire => self.wire,
            Domain::Physics => self.physics,
            Domain::Agent => self.agent,
            Domain::Riddle => self.riddle,
        }
    }

    /// Override one domain. Values are clamped to `[0, 1]`; NaN is ignored.
    pub fn set(&mut self, domain: Domain, probability: f64) {
        let Some(p) = clamp_probability(probability) else {
            tracing::warn!(%domain, "Ignoring non-numeric accuracy");
            return;
        };
        let slot = match domain {
            Domain::Wire => &mut self.wire,
            Domain::Physics => &mut self.physics,
            Domain::Agent => &mut self.agent,
            Domain::Riddle => &mut self.riddle,
        };
        *slot = p;
    }
}

fn clamp_probability(p: f64) -> Option<f64> {
    (!p.is_nan()).then(|| p.clamp(0.0, 1.0))
}

/// The local stochastic opponent. Difficulty of the instance plays no part.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LocalSimulator {
    accuracy: AccuracyTable,
}

impl LocalSimulator {
    #[must_use]
    pub const fn new(accuracy: AccuracyTable) -> Self {
        Self { accuracy }
    }

    #[must_use]
    pub const fn accuracy(&self) -> &AccuracyTable {
        &self.accuracy
    }

    pub fn answer<R: Rng + ?Sized>(&self, instance: &PuzzleInstance, rng: &mut R) -> OpponentAnswer {
        let correct = rng.random_bool(self.accuracy.get(instance.domain()));

        let (choice, text) = match instance.key() {
            AnswerKey::FreeText { accepted } => {
                let text = if correct {
                    accepted[0].as_str()
                } else {
                    WRONG_RIDDLE_ANSWERS.choose(rng).copied().unwrap_or("shadow")
                };
                (None, text.to_string())
            }
            AnswerKey::Choice { options, correct: right } => {
                let index = if correct {
                    *right
                } else {
                    let wrong: Vec<usize> = (0..options.len()).filter(|i| i != right).collect();
                    wrong.choose(rng).copied().unwrap_or(*right)
                };
                (Some(index), options[index].clone())
            }
        };

        OpponentAnswer {
            correct,
            choice,
            text,
            source: AnswerSource::Local,
            fallback_from: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AccuracyTable, LocalSimulator};
    use duel_types::{AnswerKey, AnswerSource, Domain, PuzzleInstance};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn choice(domain: Domain) -> PuzzleInstance {
        let options = ["1", "2", "5", "6"].map(String::from).to_vec();
        PuzzleInstance::new(domain, "Trace 'C'", AnswerKey::choice(options, 2).unwrap(), "")
            .unwrap()
    }

    fn riddle() -> PuzzleInstance {
        let key = AnswerKey::free_text(vec!["a keyboard".into(), "keyboard".into()]).unwrap();
        PuzzleInstance::new(Domain::Riddle, "Keys but no locks?", key, "").unwrap()
    }

    #[test]
    fn defaults_match_domain_rates() {
        let table = AccuracyTable::default();
        assert!((table.get(Domain::Wire) - 0.44).abs() < f64::EPSILON);
        assert!((table.get(Domain::Physics) - 0.41).abs() < f64::EPSILON);
        assert!((table.get(Domain::Agent) - 0.35).abs() < f64::EPSILON);
        assert!((table.get(Domain::Riddle) - 0.46).abs() < f64::EPSILON);
    }

    #[test]
    fn set_clamps_and_ignores_nan() {
        let mut table = AccuracyTable::default();
        table.set(Domain::Wire, 1.7);
        table.set(Domain::Agent, -0.2);
        table.set(Domain::Physics, f64::NAN);
        assert!((table.get(Domain::Wire) - 1.0).abs() < f64::EPSILON);
        assert!(table.get(Domain::Agent).abs() < f64::EPSILON);
        assert!((table.get(Domain::Physics) - 0.41).abs() < f64::EPSILON);
    }

    #[test]
    fn always_right_picks_the_key() {
        let sim = LocalSimulator::new(AccuracyTable::uniform(1.0));
        let mut rng = StdRng::seed_from_u64(7);
        let answer = sim.answer(&choice(Domain::Wire), &mut rng);
        assert!(answer.correct);
        assert_eq!(answer.choice, Some(2));
        assert_eq!(answer.text, "5");
        assert_eq!(answer.source, AnswerSource::Local);

        let answer = sim.answer(&riddle(), &mut rng);
        assert!(answer.correct);
        assert_eq!(answer.text, "a keyboard");
    }

    #[test]
    fn always_wrong_never_picks_the_key() {
        let sim = LocalSimulator::new(AccuracyTable::uniform(0.0));
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let answer = sim.answer(&choice(Domain::Physics), &mut rng);
            assert!(!answer.correct);
            assert_ne!(answer.choice, Some(2));
            assert!(answer.choice.is_some_and(|i| i < 4));

            let answer = sim.answer(&riddle(), &mut rng);
            assert!(!answer.correct);
            assert!(["shadow", "book", "time", "cloud"].contains(&answer.text.as_str()));
        }
    }

    #[test]
    fn hit_rate_tracks_accuracy() {
        let sim = LocalSimulator::default();
        let mut rng = StdRng::seed_from_u64(3);
        let instance = choice(Domain::Agent);
        let rounds = 4000;
        let hits = (0..rounds)
            .filter(|_| sim.answer(&instance, &mut rng).correct)
            .count();
        let rate = hits as f64 / f64::from(rounds);
        assert!((rate - 0.35).abs() < 0.04, "rate {rate}");
    }
}
