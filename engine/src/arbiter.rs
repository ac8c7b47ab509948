//! Opponent strategy chain: remote backends first, the local simulator last.

use duel_providers::{ApiConfig, Backend, RemoteAnswerFailure};
use duel_types::{ApiKey, ModelName, OpponentAnswer, Provider, PuzzleInstance};

use crate::local::{AccuracyTable, LocalSimulator};

/// Everything that decides who answers for the opponent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpponentSettings {
    pub provider: Provider,
    pub openai_key: Option<ApiKey>,
    pub gemini_key: Option<ApiKey>,
    pub openai_model: Option<ModelName>,
    pub gemini_model: Option<ModelName>,
    pub accuracy: AccuracyTable,
}

impl OpponentSettings {
    /// Key for the active provider, if it needs one and has one.
    #[must_use]
    pub fn credential(&self) -> Option<&ApiKey> {
        self.key_for(self.provider)
    }

    #[must_use]
    pub fn key_for(&self, provider: Provider) -> Option<&ApiKey> {
        match provider {
            Provider::OpenAI => self.openai_key.as_ref(),
            Provider::Gemini => self.gemini_key.as_ref(),
            Provider::Simulated => None,
        }
    }

    /// Store `raw` as the key for `provider`; blank input clears it.
    pub fn set_credential(&mut self, provider: Provider, raw: &str) {
        let key = ApiKey::for_provider(provider, raw);
        match provider {
            Provider::OpenAI => self.openai_key = key,
            Provider::Gemini => self.gemini_key = key,
            Provider::Simulated => {}
        }
    }

    fn model_for(&self, provider: Provider) -> Option<&ModelName> {
        let model = match provider {
            Provider::OpenAI => self.openai_model.as_ref(),
            Provider::Gemini => self.gemini_model.as_ref(),
            Provider::Simulated => None,
        };
        model.filter(|model| model.provider() == provider)
    }
}

/// One fallible way of producing an opponent answer.
#[derive(Debug, Clone)]
pub enum Strategy {
    Remote(Backend),
    /// A remote provider was selected but has no credentials.
    Unconfigured(Provider),
}

impl Strategy {
    #[must_use]
    pub fn provider(&self) -> Provider {
        match self {
            Strategy::Remote(backend) => backend.provider(),
            Strategy::Unconfigured(provider) => *provider,
        }
    }

    pub async fn attempt(
        &self,
        instance: &PuzzleInstance,
    ) -> Result<OpponentAnswer, RemoteAnswerFailure> {
        match self {
            Strategy::Remote(backend) => backend.answer(instance).await,
            Strategy::Unconfigured(provider) => {
                Err(RemoteAnswerFailure::MissingCredentials(*provider))
            }
        }
    }
}

/// Tries each strategy in order and ends with the local simulator, so
/// [`Arbitrator::answer`] always produces an answer.
#[derive(Debug, Clone, Default)]
pub struct Arbitrator {
    chain: Vec<Strategy>,
    local: LocalSimulator,
}

impl Arbitrator {
    #[must_use]
    pub fn new(chain: Vec<Strategy>, local: LocalSimulator) -> Self {
        Self { chain, local }
    }

    /// Chain for the active provider in `settings`.
    #[must_use]
    pub fn from_settings(settings: &OpponentSettings) -> Self {
        let provider = settings.provider;
        let local = LocalSimulator::new(settings.accuracy);
        if !provider.is_remote() {
            return Self::new(Vec::new(), local);
        }

        let strategy = match settings.credential() {
            Some(key) => {
                let config = match settings.model_for(provider) {
                    Some(model) => ApiConfig::new(key.clone(), model.clone())
                        .unwrap_or_else(|_| ApiConfig::with_default_model(key.clone())),
                    None => ApiConfig::with_default_model(key.clone()),
                };
                tracing::debug!(%provider, model = %config.model(), "Remote opponent configured");
                Strategy::Remote(Backend::new(config))
            }
            None => {
                tracing::warn!(%provider, "No API key; opponent answers will come from the simulator");
                Strategy::Unconfigured(provider)
            }
        };
        Self::new(vec![strategy], local)
    }

    #[must_use]
    pub fn chain(&self) -> &[Strategy] {
        &self.chain
    }

    #[must_use]
    pub const fn local(&self) -> &LocalSimulator {
        &self.local
    }

    /// Local simulator answer, bypassing the chain.
    #[must_use]
    pub fn answer_locally(&self, instance: &PuzzleInstance) -> OpponentAnswer {
        self.local.answer(instance, &mut rand::rng())
    }

    /// The opponent's answer for `instance`. Never fails: the first strategy
    /// that succeeds wins, and the simulator answers when none does.
    pub async fn answer(&self, instance: &PuzzleInstance) -> OpponentAnswer {
        let mut failed_from = None;

        for strategy in &self.chain {
            match strategy.attempt(instance).await {
                Ok(answer) => {
                    tracing::debug!(source = %answer.source, correct = answer.correct, "Remote answer");
                    return answer;
                }
                Err(failure) => {
                    tracing::warn!(
                        provider = %strategy.provider(),
                        domain = %instance.domain(),
                        "Remote answer failed, falling back to simulator: {failure}"
                    );
                    failed_from.get_or_insert(failure.provider());
                }
            }
        }

        let answer = self.answer_locally(instance);
        match failed_from {
            Some(provider) => answer.with_fallback_from(provider),
            None => answer,
        }
    }
}
