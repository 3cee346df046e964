//! Feedback Use Case
//!
//! Applies interaction events to user vectors.
//!
//! The request path updates the session vector under a per-user lock and
//! hands the long-term update to a background worker through a bounded
//! queue. The worker applies each job at most once (applied markers keyed
//! by event id) and logs failures instead of propagating them.
//!
//! ## Update rule
//!
//! ```text
//! new = normalize(alpha * (w * item) + (1 - alpha) * old)   if old exists
//! new = normalize(w * item)                                  otherwise
//! ```
//!
//! `w` is the signed interaction weight; negative feedback moves the vector
//! away from the item.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use recs_domain::error::{Error, Result};
use recs_domain::ports::providers::VectorIndexProvider;
use recs_domain::value_objects::{
    Embedding, FeedbackConfig, InteractionEvent, InteractionType, ItemId, UserId,
};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::embedding_cache::EmbeddingCache;
use crate::ports::services::{FeedbackOutcome, FeedbackServiceInterface};

/// EMA step shared by session and long-term updates
///
/// `None` when the result cancels out to a zero vector (e.g. a zero
/// weight on a cold profile).
pub fn ema_update(
    old: Option<&Embedding>,
    item: &Embedding,
    weight: f32,
    alpha: f32,
) -> Result<Option<Embedding>> {
    match old {
        Some(old) => Embedding::weighted_sum(&[(alpha * weight, item), (1.0 - alpha, old)]),
        None => Embedding::weighted_sum(&[(weight, item)]),
    }
}

// ============================================================================
// Long-term update queue
// ============================================================================

/// Deferred long-term update for one interaction
#[derive(Debug, Clone, PartialEq)]
pub struct LongTermJob {
    /// Interaction that produced the job (idempotency key)
    pub event_id: Uuid,
    /// User whose long-term vector is updated
    pub user_id: UserId,
    /// Item the user interacted with
    pub item_id: ItemId,
    /// Vector of the item at interaction time
    pub item_vector: Embedding,
    /// Signed interaction weight
    pub weight: f32,
}

#[derive(Debug)]
enum QueueMessage {
    Job(LongTermJob),
    Flush(oneshot::Sender<()>),
}

/// Producer side of the long-term update queue
#[derive(Debug, Clone)]
pub struct LongTermUpdateQueue {
    sender: mpsc::Sender<QueueMessage>,
}

impl LongTermUpdateQueue {
    /// Create a queue and the worker consuming it
    pub fn new(
        cache: Arc<EmbeddingCache>,
        config: &FeedbackConfig,
    ) -> (Self, LongTermUpdateWorker) {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = LongTermUpdateWorker {
            cache,
            alpha: config.long_term_alpha,
            marker_ttl: config.applied_marker_ttl(),
            receiver,
        };
        (Self { sender }, worker)
    }

    /// Create a queue and spawn its worker on the current runtime
    pub fn spawn(cache: Arc<EmbeddingCache>, config: &FeedbackConfig) -> (Self, JoinHandle<()>) {
        let (queue, worker) = Self::new(cache, config);
        (queue, tokio::spawn(worker.run()))
    }

    /// Enqueue without waiting
    ///
    /// Fails with `BackgroundUpdateFailed` when the queue is full or the
    /// worker has stopped.
    pub fn try_enqueue(&self, job: LongTermJob) -> Result<()> {
        self.sender
            .try_send(QueueMessage::Job(job))
            .map_err(|e| {
                let reason = match e {
                    mpsc::error::TrySendError::Full(_) => "queue full",
                    mpsc::error::TrySendError::Closed(_) => "worker stopped",
                };
                Error::background_update_failed(
                    format!("long-term update not queued: {reason}"),
                    None,
                )
            })
    }

    /// Wait until every job queued before this call has been processed
    pub async fn flush(&self) -> Result<()> {
        let (done, wait) = oneshot::channel();
        self.sender
            .send(QueueMessage::Flush(done))
            .await
            .map_err(|_| Error::background_update_failed("long-term worker stopped", None))?;
        wait.await
            .map_err(|_| Error::background_update_failed("long-term worker stopped", None))
    }
}

/// Consumer side of the long-term update queue
#[derive(Debug)]
pub struct LongTermUpdateWorker {
    cache: Arc<EmbeddingCache>,
    alpha: f32,
    marker_ttl: Duration,
    receiver: mpsc::Receiver<QueueMessage>,
}

impl LongTermUpdateWorker {
    /// Process jobs until every queue handle is dropped
    pub async fn run(mut self) {
        tracing::debug!("long-term update worker started");
        while let Some(message) = self.receiver.recv().await {
            match message {
                QueueMessage::Job(job) => {
                    if let Err(e) = self.process(&job).await {
                        let error = Error::background_update_failed(
                            format!(
                                "long-term update for user {} (event {}) failed",
                                job.user_id, job.event_id
                            ),
                            Some(e),
                        );
                        tracing::error!(
                            user_id = job.user_id.get(),
                            item_id = job.item_id.get(),
                            error = %error,
                            "background update failed"
                        );
                    }
                }
                QueueMessage::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        tracing::debug!("long-term update worker stopped");
    }

    /// Apply one job; `Ok(false)` when it had already been applied
    pub async fn process(&self, job: &LongTermJob) -> Result<bool> {
        if self.cache.is_applied(job.event_id).await? {
            tracing::debug!(event_id = %job.event_id, "long-term update already applied");
            return Ok(false);
        }
        let old = self.cache.get_long_term(job.user_id).await?;
        match ema_update(old.as_ref(), &job.item_vector, job.weight, self.alpha)? {
            Some(updated) => self.cache.set_long_term(job.user_id, &updated).await?,
            None => tracing::debug!(
                user_id = job.user_id.get(),
                "long-term update cancelled out, vector unchanged"
            ),
        }
        self.cache.mark_applied(job.event_id, self.marker_ttl).await?;
        Ok(true)
    }
}

// ============================================================================
// Feedback updater
// ============================================================================

/// Feedback updater
pub struct FeedbackUpdater {
    cache: Arc<EmbeddingCache>,
    index: Arc<dyn VectorIndexProvider>,
    queue: LongTermUpdateQueue,
    session_alpha: f32,
    user_locks: DashMap<UserId, Arc<Mutex<()>>>,
}

impl FeedbackUpdater {
    /// Create the updater with injected dependencies
    pub fn new(
        cache: Arc<EmbeddingCache>,
        index: Arc<dyn VectorIndexProvider>,
        queue: LongTermUpdateQueue,
        config: &FeedbackConfig,
    ) -> Self {
        Self {
            cache,
            index,
            queue,
            session_alpha: config.session_alpha,
            user_locks: DashMap::new(),
        }
    }

    /// Queue feeding the long-term worker
    pub fn queue(&self) -> &LongTermUpdateQueue {
        &self.queue
    }

    fn user_lock(&self, user_id: UserId) -> Arc<Mutex<()>> {
        Arc::clone(self.user_locks.entry(user_id).or_default().value())
    }

    fn release_user_lock(&self, user_id: UserId) {
        self.user_locks
            .remove_if(&user_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Item vector from the cache, falling back to the index
    async fn item_vector(&self, item_id: ItemId) -> Result<Option<Embedding>> {
        match self.cache.get_product_embedding(item_id).await {
            Ok(Some(vector)) => return Ok(Some(vector)),
            Ok(None) => {}
            Err(e) if e.is_integrity() => return Err(e),
            Err(e) => tracing::warn!(item_id = item_id.get(), error = %e, "cache read failed"),
        }
        self.index.reconstruct(item_id).await
    }

    /// Session EMA under the user's lock; `Ok(false)` when nothing changed
    async fn update_session(
        &self,
        event: &InteractionEvent,
        item_vector: &Embedding,
        weight: f32,
    ) -> Result<bool> {
        let lock = self.user_lock(event.user_id);
        let updated = {
            let _guard = lock.lock().await;
            self.blend_session(event, item_vector, weight).await
        };
        drop(lock);
        self.release_user_lock(event.user_id);
        updated
    }

    /// Read, blend and write the session vector; caller holds the user lock
    async fn blend_session(
        &self,
        event: &InteractionEvent,
        item_vector: &Embedding,
        weight: f32,
    ) -> Result<bool> {
        let old = match self.cache.get_session(event.user_id).await {
            Ok(old) => old,
            Err(e) if e.is_integrity() => return Err(e),
            Err(e) => {
                tracing::warn!(user_id = event.user_id.get(), error = %e, "session read failed");
                None
            }
        };
        let Some(session) = ema_update(old.as_ref(), item_vector, weight, self.session_alpha)?
        else {
            return Ok(false);
        };
        match self
            .cache
            .set_session(event.user_id, &session, event.session_ttl())
            .await
        {
            Ok(()) => Ok(true),
            Err(e) if e.is_integrity() => Err(e),
            Err(e) => {
                tracing::warn!(user_id = event.user_id.get(), error = %e, "session write failed");
                Ok(false)
            }
        }
    }

    /// Number of users with a session update in flight
    pub fn active_users(&self) -> usize {
        self.user_locks.len()
    }
}

#[async_trait]
impl FeedbackServiceInterface for FeedbackUpdater {
    async fn apply(&self, event: &InteractionEvent) -> Result<FeedbackOutcome> {
        let started = Instant::now();
        event.validate()?;
        let weight = event.weight();
        let mut outcome = FeedbackOutcome {
            session_updated: false,
            long_term_queued: false,
            results_invalidated: false,
            weight,
            elapsed: Duration::ZERO,
        };

        if event.interaction == InteractionType::View {
            if let Err(e) = self.cache.track_view(event.item_id).await {
                tracing::warn!(item_id = event.item_id.get(), error = %e, "view not counted");
            }
        }

        let Some(item_vector) = self.item_vector(event.item_id).await? else {
            tracing::warn!(
                user_id = event.user_id.get(),
                item_id = event.item_id.get(),
                "no vector for interacted item, feedback ignored"
            );
            outcome.elapsed = started.elapsed();
            return Ok(outcome);
        };
        item_vector.ensure_dimensions(self.cache.dimensions())?;

        outcome.session_updated = self.update_session(event, &item_vector, weight).await?;

        let job = LongTermJob {
            event_id: event.event_id,
            user_id: event.user_id,
            item_id: event.item_id,
            item_vector,
            weight,
        };
        match self.queue.try_enqueue(job) {
            Ok(()) => outcome.long_term_queued = true,
            Err(e) => tracing::error!(user_id = event.user_id.get(), error = %e, "long-term update dropped"),
        }

        match self.cache.invalidate_user_results(event.user_id).await {
            Ok(_) => outcome.results_invalidated = true,
            Err(e) => tracing::warn!(user_id = event.user_id.get(), error = %e, "result invalidation failed"),
        }

        outcome.elapsed = started.elapsed();
        tracing::debug!(
            user_id = event.user_id.get(),
            item_id = event.item_id.get(),
            interaction = event.interaction.as_str(),
            weight,
            session_updated = outcome.session_updated,
            long_term_queued = outcome.long_term_queued,
            elapsed_ms = outcome.elapsed.as_millis() as u64,
            "feedback applied"
        );
        Ok(outcome)
    }

    async fn flush(&self) -> Result<()> {
        self.queue.flush().await
    }
}

impl std::fmt::Debug for FeedbackUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackUpdater")
            .field("session_alpha", &self.session_alpha)
            .field("active_users", &self.active_users())
            .finish()
    }
}
