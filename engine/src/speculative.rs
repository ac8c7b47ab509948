//! Speculative opponent evaluation keyed by a fingerprint.
//!
//! The opponent's answer for an instance is started when the instance is shown
//! and shared with whoever asks for it under the same [`Fingerprint`]. A new
//! fingerprint supersedes the old task: the slot drops its reference, the task
//! keeps running detached, and its result is never read.

use std::future::Future;

use duel_types::{ApiKey, Domain, OpponentAnswer, Provider};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

/// Identity of one speculative evaluation. Only the active provider's
/// credential participates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    pub domain: Domain,
    pub index: usize,
    pub provider: Provider,
    pub credential: Option<ApiKey>,
}

/// Handle to an in-flight opponent answer. Clones share one task.
#[derive(Clone)]
pub struct PendingAnswer {
    inner: Shared<BoxFuture<'static, Option<OpponentAnswer>>>,
}

impl std::fmt::Debug for PendingAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAnswer")
            .field("ready", &self.inner.peek().is_some())
            .finish()
    }
}

impl PendingAnswer {
    /// Run `task` on the runtime right away, independent of any awaiter.
    ///
    /// # Panics
    ///
    /// When called outside a Tokio runtime.
    pub fn spawn<F>(task: F) -> Self
    where
        F: Future<Output = OpponentAnswer> + Send + 'static,
    {
        let handle = tokio::spawn(task);
        let inner = async move {
            handle
                .await
                .inspect_err(|e| tracing::error!("Opponent task did not complete: {e}"))
                .ok()
        }
        .boxed()
        .shared();
        Self { inner }
    }

    /// The answer, or `None` if the task panicked.
    pub async fn resolve(self) -> Option<OpponentAnswer> {
        self.inner.await
    }

    /// Whether an earlier `resolve` on any clone has already produced the answer.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.peek().is_some()
    }

    /// Whether both handles refer to the same task.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Shared::ptr_eq(&self.inner, &other.inner)
    }
}

/// At most one live speculative task.
#[derive(Debug, Default)]
pub struct SpeculativeSlot {
    current: Option<(Fingerprint, PendingAnswer)>,
}

impl SpeculativeSlot {
    /// The pending answer for `fingerprint`, starting it with `start` unless an
    /// equal fingerprint is already in flight.
    pub fn request<F>(&mut self, fingerprint: Fingerprint, start: impl FnOnce() -> F) -> PendingAnswer
    where
        F: Future<Output = OpponentAnswer> + Send + 'static,
    {
        if let Some((current, pending)) = &self.current
            && *current == fingerprint
        {
            return pending.clone();
        }

        if let Some((stale, _)) = self.current.take() {
            tracing::debug!(
                domain = %stale.domain,
                index = stale.index,
                "Superseding speculative opponent task"
            );
        }
        tracing::debug!(
            domain = %fingerprint.domain,
            index = fingerprint.index,
            provider = %fingerprint.provider,
            "Speculative opponent task started"
        );

        let pending = PendingAnswer::spawn(start());
        self.current = Some((fingerprint, pending.clone()));
        pending
    }

    /// Detach from the current task without cancelling it.
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        self.current.as_ref().map(|(fingerprint, _)| fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::{Fingerprint, PendingAnswer, SpeculativeSlot};
    use duel_types::{AnswerSource, ApiKey, Domain, OpponentAnswer, Provider};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    fn fingerprint(index: usize, key: Option<&str>) -> Fingerprint {
        Fingerprint {
            domain: Domain::Wire,
            index,
            provider: Provider::Gemini,
            credential: key.and_then(|k| ApiKey::for_provider(Provider::Gemini, k)),
        }
    }

    fn answer(text: &str) -> OpponentAnswer {
        OpponentAnswer {
            correct: false,
            choice: Some(0),
            text: text.to_string(),
            source: AnswerSource::Local,
            fallback_from: None,
        }
    }

    #[tokio::test]
    async fn same_fingerprint_shares_one_task() {
        let starts = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = oneshot::channel::<()>();
        let mut slot = SpeculativeSlot::default();

        let counter = Arc::clone(&starts);
        let first = slot.request(fingerprint(0, Some("k")), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let _ = rx.await;
                answer("first")
            }
        });
        let counter = Arc::clone(&starts);
        let second = slot.request(fingerprint(0, Some("k")), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { answer("duplicate") }
        });

        assert!(first.ptr_eq(&second));
        assert!(!first.is_ready());
        assert_eq!(starts.load(Ordering::SeqCst), 1);

        tx.send(()).unwrap();
        assert_eq!(second.resolve().await.unwrap().text, "first");
        assert_eq!(first.resolve().await.unwrap().text, "first");
    }

    #[tokio::test]
    async fn changed_credential_supersedes_without_cancelling() {
        let (tx, rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<&'static str>();
        let mut slot = SpeculativeSlot::default();

        let stale = slot.request(fingerprint(3, Some("old")), move || async move {
            let _ = rx.await;
            let _ = done_tx.send("stale finished");
            answer("stale")
        });
        let fresh = slot.request(fingerprint(3, Some("new")), || async { answer("fresh") });

        assert!(!stale.ptr_eq(&fresh));
        assert_eq!(slot.fingerprint(), Some(&fingerprint(3, Some("new"))));
        drop(stale);

        assert_eq!(fresh.resolve().await.unwrap().text, "fresh");
        // The detached task still runs to completion.
        tx.send(()).unwrap();
        assert_eq!(done_rx.await.unwrap(), "stale finished");
    }

    #[tokio::test]
    async fn invalidate_forces_a_new_task() {
        let mut slot = SpeculativeSlot::default();
        let first = slot.request(fingerprint(1, None), || async { answer("a") });
        slot.invalidate();
        assert!(slot.fingerprint().is_none());
        let second = slot.request(fingerprint(1, None), || async { answer("b") });
        assert!(!first.ptr_eq(&second));
        assert_eq!(second.resolve().await.unwrap().text, "b");
    }

    async fn explode() -> OpponentAnswer {
        panic!("opponent exploded")
    }

    #[tokio::test]
    async fn panicked_task_resolves_to_none() {
        let pending = PendingAnswer::spawn(explode());
        assert!(pending.resolve().await.is_none());
    }

    #[tokio::test]
    async fn different_index_is_a_different_task() {
        let mut slot = SpeculativeSlot::default();
        let a = slot.request(fingerprint(0, None), || async { answer("zero") });
        let b = slot.request(fingerprint(1, None), || async { answer("one") });
        assert!(!a.ptr_eq(&b));
        assert_eq!(a.resolve().await.unwrap().text, "zero");
    }
}
