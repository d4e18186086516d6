//! Bounded worker pool that runs one dialogue per persona.
//!
//! A fixed number of workers pull personas from a shared queue, so at most
//! `workers` conversations talk to the model at once regardless of batch
//! size. A failure in one conversation is recorded next to the successful
//! results and never cancels its siblings.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;

use crate::demographics::Persona;
use crate::dialogue::{ChatCapability, ConversationResult, DialogueEngine};
use crate::error::{ErrorBody, ErrorKind, Result, SimError};

// ---------------------------------------------------------------------------
// Cancellation
// ---------------------------------------------------------------------------

/// Cooperative cancellation for a running batch.
///
/// Clones share the same flag. Cancelling stops the batch at its next
/// suspension point; in-flight model calls are abandoned and their results
/// discarded.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    flag: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (flag, _) = watch::channel(false);
        Self {
            flag: Arc::new(flag),
        }
    }

    pub fn cancel(&self) {
        self.flag.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.flag.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.flag.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// ---------------------------------------------------------------------------
// Batch outcome
// ---------------------------------------------------------------------------

/// A persona whose conversation could not be completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonaFailure {
    /// Position of the persona in the submitted batch.
    pub index: usize,
    pub persona: Persona,
    pub error: ErrorBody,
}

/// Successful conversations plus the personas that failed.
///
/// `results` is in completion order, not submission order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<ConversationResult>,
    pub failures: Vec<PersonaFailure>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.results.len() + self.failures.len()
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

type Job = (usize, Persona);
type JobResult = (usize, Persona, Result<ConversationResult>);

/// Fans personas out to independent [`DialogueEngine`] runs.
#[derive(Debug, Clone)]
pub struct ConversationPool {
    engine: DialogueEngine,
    capability: Arc<dyn ChatCapability>,
    workers: usize,
}

impl ConversationPool {
    /// Create a pool sized to the available parallelism.
    pub fn new(capability: Arc<dyn ChatCapability>) -> Self {
        Self {
            engine: DialogueEngine::new(),
            capability,
            workers: default_workers(),
        }
    }

    /// Override the worker count (minimum 1).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_engine(mut self, engine: DialogueEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run one conversation per persona and collect every outcome.
    pub async fn run_batch(
        &self,
        personas: Vec<Persona>,
        product_description: &str,
    ) -> Result<BatchOutcome> {
        self.run_batch_with_cancel(personas, product_description, &CancelHandle::new())
            .await
    }

    /// Like [`run_batch`](Self::run_batch), but fails with
    /// [`SimError::Cancelled`] as soon as `cancel` fires.
    pub async fn run_batch_with_cancel(
        &self,
        personas: Vec<Persona>,
        product_description: &str,
        cancel: &CancelHandle,
    ) -> Result<BatchOutcome> {
        if cancel.is_cancelled() {
            return Err(SimError::Cancelled);
        }
        let total = personas.len();
        if total == 0 {
            return Ok(BatchOutcome::default());
        }

        let workers = self.workers.min(total);
        log::info!(
            "Running {} conversations on {} workers",
            total,
            workers
        );

        let queue: Arc<Mutex<VecDeque<Job>>> =
            Arc::new(Mutex::new(personas.iter().cloned().enumerate().collect()));
        let product: Arc<str> = Arc::from(product_description);
        let (tx, mut rx) = mpsc::unbounded_channel::<JobResult>();

        let mut set = JoinSet::new();
        for worker_id in 0..workers {
            set.spawn(worker(
                worker_id,
                Arc::clone(&queue),
                self.engine.clone(),
                Arc::clone(&self.capability),
                Arc::clone(&product),
                tx.clone(),
            ));
        }
        drop(tx);

        let collect = async {
            let mut outcome = BatchOutcome::default();
            let mut seen = vec![false; total];
            while let Some((index, persona, result)) = rx.recv().await {
                seen[index] = true;
                match result {
                    Ok(conversation) => outcome.results.push(conversation),
                    Err(error) => {
                        log::warn!("Conversation for persona #{} failed: {}", index, error);
                        outcome.failures.push(PersonaFailure {
                            index,
                            persona,
                            error: error.to_body(),
                        });
                    }
                }
            }
            (outcome, seen)
        };

        let (mut outcome, seen) = tokio::select! {
            _ = cancel.cancelled() => {
                set.abort_all();
                log::warn!("Conversation batch cancelled");
                return Err(SimError::Cancelled);
            }
            collected = collect => collected,
        };

        while let Some(joined) = set.join_next().await {
            if let Err(e) = joined {
                log::error!("Conversation worker stopped abnormally: {}", e);
            }
        }

        // A panicking worker drops the job it was holding.
        for (index, persona) in personas.into_iter().enumerate() {
            if !seen[index] {
                outcome.failures.push(PersonaFailure {
                    index,
                    persona,
                    error: ErrorBody {
                        kind: ErrorKind::Internal,
                        message: "conversation worker stopped before reporting".to_string(),
                    },
                });
            }
        }

        log::info!(
            "Conversation batch done: {} succeeded, {} failed",
            outcome.results.len(),
            outcome.failures.len()
        );
        Ok(outcome)
    }
}

async fn worker(
    worker_id: usize,
    queue: Arc<Mutex<VecDeque<Job>>>,
    engine: DialogueEngine,
    capability: Arc<dyn ChatCapability>,
    product: Arc<str>,
    tx: mpsc::UnboundedSender<JobResult>,
) {
    loop {
        let next = queue.lock().pop_front();
        let Some((index, persona)) = next else {
            break;
        };
        log::debug!("Worker {} starting persona #{}", worker_id, index);
        let result = engine
            .run(&product, persona.clone(), capability.as_ref())
            .await;
        if tx.send((index, persona, result)).is_err() {
            break;
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::dialogue::{ChatSession, RoleConfig, Turn};
    use crate::testing::ScriptedChat;

    fn personas(n: usize) -> Vec<Persona> {
        (0..n)
            .map(|i| {
                vec![("id".to_string(), format!("p{}", i))]
                    .into_iter()
                    .collect()
            })
            .collect()
    }

    fn quick_chat() -> ScriptedChat {
        ScriptedChat::new()
            .script("seller", &["Great product."])
            .script("buyer", &["finished"])
    }

    #[tokio::test]
    async fn test_one_failure_does_not_abort_siblings() {
        let chat = quick_chat().fail_when_instruction_contains("id: p2");
        let pool = ConversationPool::new(Arc::new(chat)).with_workers(3);

        let outcome = pool.run_batch(personas(5), "A phone").await.unwrap();

        assert_eq!(outcome.results.len(), 4);
        assert_eq!(outcome.failures.len(), 1);
        let failure = &outcome.failures[0];
        assert_eq!(failure.index, 2);
        assert_eq!(failure.persona.get("id"), Some("p2"));
        assert_eq!(failure.error.kind, ErrorKind::UpstreamModel);
        assert!(outcome
            .results
            .iter()
            .all(|r| r.persona.get("id") != Some("p2")));
    }

    #[tokio::test]
    async fn test_every_persona_accounted_for() {
        let pool = ConversationPool::new(Arc::new(quick_chat())).with_workers(4);
        let outcome = pool.run_batch(personas(20), "A phone").await.unwrap();
        assert_eq!(outcome.total(), 20);
        assert!(outcome.failures.is_empty());

        let mut ids: Vec<String> = outcome
            .results
            .iter()
            .map(|r| r.persona.get("id").unwrap().to_string())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let pool = ConversationPool::new(Arc::new(quick_chat()));
        let outcome = pool.run_batch(Vec::new(), "A phone").await.unwrap();
        assert_eq!(outcome.total(), 0);
    }

    #[test]
    fn test_worker_count_floor() {
        let pool = ConversationPool::new(Arc::new(quick_chat())).with_workers(0);
        assert_eq!(pool.workers(), 1);
    }

    #[tokio::test]
    async fn test_cancel_before_start() {
        let pool = ConversationPool::new(Arc::new(quick_chat()));
        let cancel = CancelHandle::new();
        cancel.cancel();
        let err = pool
            .run_batch_with_cancel(personas(3), "A phone", &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, SimError::Cancelled));
    }

    #[tokio::test]
    async fn test_cancel_mid_batch_returns_promptly() {
        let chat = quick_chat().with_delay(Duration::from_secs(30));
        let pool = ConversationPool::new(Arc::new(chat)).with_workers(2);
        let cancel = CancelHandle::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            pool.run_batch_with_cancel(personas(4), "A phone", &cancel),
        )
        .await
        .expect("cancellation should not wait for in-flight calls");
        assert!(matches!(result, Err(SimError::Cancelled)));
    }

    /// Tracks how many sends are in flight at once.
    #[derive(Debug, Default)]
    struct InFlight {
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    struct InFlightSession {
        role: String,
        current: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatCapability for InFlight {
        async fn open_session(
            &self,
            config: &RoleConfig,
            _prior_turns: &[Turn],
        ) -> Result<Box<dyn ChatSession>> {
            Ok(Box::new(InFlightSession {
                role: config.name.clone(),
                current: Arc::clone(&self.current),
                peak: Arc::clone(&self.peak),
            }))
        }
    }

    #[async_trait]
    impl ChatSession for InFlightSession {
        async fn send(&mut self, _message: &str) -> Result<String> {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(10)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            Ok(if self.role == "buyer" {
                "finished".to_string()
            } else {
                "pitch".to_string()
            })
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_bounded_by_workers() {
        let capability = InFlight::default();
        let peak = Arc::clone(&capability.peak);
        let pool = ConversationPool::new(Arc::new(capability)).with_workers(2);

        let outcome = pool.run_batch(personas(8), "A phone").await.unwrap();
        assert_eq!(outcome.results.len(), 8);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }
}
