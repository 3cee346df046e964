//! Tests for the feedback loop: session EMA, deferred long-term updates

use std::sync::Arc;
use std::time::Duration;

use recs_application::{
    CachedRanking, FeedbackServiceInterface, FeedbackUpdater, LongTermJob, LongTermUpdateQueue,
    ema_update,
};
use recs_domain::error::Error;
use recs_domain::ports::providers::CacheEntryConfig;
use recs_domain::value_objects::{
    Embedding, FeedbackConfig, InteractionEvent, InteractionType, ItemId, RankedResult,
    SearchStrategy, UserId,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::fixtures::{Fixture, assert_close, emb, fixture, is_unit, vector_for};

fn updater(fx: &Fixture, config: &FeedbackConfig) -> (FeedbackUpdater, JoinHandle<()>) {
    let (queue, worker) = LongTermUpdateQueue::spawn(fx.cache.clone(), config);
    let updater = FeedbackUpdater::new(fx.cache.clone(), fx.index.clone(), queue, config);
    (updater, worker)
}

fn similarity(a: &Embedding, b: &Embedding) -> f32 {
    a.cosine_similarity(b).unwrap()
}

#[test]
fn test_ema_update_rules() {
    let item = emb(&[1.0, 0.0, 0.0, 0.0]);
    let old = emb(&[0.0, 1.0, 0.0, 0.0]);

    let cold = ema_update(None, &item, 1.0, 0.3).unwrap().unwrap();
    assert_close(&cold, &item);

    let warm = ema_update(Some(&old), &item, 1.0, 0.3).unwrap().unwrap();
    assert!(is_unit(&warm));
    // 0.3 * item + 0.7 * old
    assert!(similarity(&warm, &old) > similarity(&warm, &item));

    assert!(ema_update(None, &item, 0.0, 0.3).unwrap().is_none());
}

#[tokio::test]
async fn test_cold_start_like_sets_both_vectors() {
    let fx = fixture(20).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(1);
    let item_vector = vector_for(5);

    let outcome = updater
        .apply(&InteractionEvent::new(user, ItemId(5), InteractionType::Like))
        .await
        .unwrap();
    updater.flush().await.unwrap();

    assert!(outcome.session_updated);
    assert!(outcome.long_term_queued);
    assert!(outcome.results_invalidated);
    assert!((outcome.weight - 1.0).abs() < f32::EPSILON);

    let vectors = fx.cache.user_vectors(user).await.unwrap();
    assert_close(vectors.long_term.as_ref().unwrap(), &item_vector);
    assert_close(vectors.session.as_ref().unwrap(), &item_vector);
}

#[tokio::test]
async fn test_repeated_positive_feedback_moves_closer() {
    let fx = fixture(20).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(2);
    let target = vector_for(3);
    fx.cache
        .set_long_term(user, &emb(&[0.0, 0.0, 0.0, 1.0]))
        .await
        .unwrap();

    let before = similarity(&fx.cache.get_long_term(user).await.unwrap().unwrap(), &target);

    updater
        .apply(&InteractionEvent::new(user, ItemId(3), InteractionType::Like))
        .await
        .unwrap();
    updater.flush().await.unwrap();
    let once = similarity(&fx.cache.get_long_term(user).await.unwrap().unwrap(), &target);

    updater
        .apply(&InteractionEvent::new(user, ItemId(3), InteractionType::Like))
        .await
        .unwrap();
    updater.flush().await.unwrap();
    let twice = similarity(&fx.cache.get_long_term(user).await.unwrap().unwrap(), &target);

    assert!(once > before);
    assert!(twice > once);
}

#[tokio::test]
async fn test_negative_feedback_does_not_attract() {
    let fx = fixture(20).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(3);
    let target = vector_for(4);
    let start: Vec<f32> = target
        .as_slice()
        .iter()
        .zip([0.5f32, -0.5, 0.5, -0.5])
        .map(|(a, b)| a + b)
        .collect();
    fx.cache.set_long_term(user, &emb(&start)).await.unwrap();
    let before = similarity(&fx.cache.get_long_term(user).await.unwrap().unwrap(), &target);

    updater
        .apply(&InteractionEvent::new(user, ItemId(4), InteractionType::ThumbsDown))
        .await
        .unwrap();
    updater.flush().await.unwrap();

    let after = similarity(&fx.cache.get_long_term(user).await.unwrap().unwrap(), &target);
    assert!(after <= before);
}

#[tokio::test]
async fn test_stored_vectors_stay_unit_length() {
    let fx = fixture(20).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(4);

    for (item, interaction) in [
        (1, InteractionType::View),
        (2, InteractionType::Purchase),
        (3, InteractionType::Dislike),
        (4, InteractionType::AddToCart),
    ] {
        updater
            .apply(&InteractionEvent::new(user, ItemId(item), interaction))
            .await
            .unwrap();
    }
    updater.flush().await.unwrap();

    let vectors = fx.cache.user_vectors(user).await.unwrap();
    assert!(is_unit(vectors.long_term.as_ref().unwrap()));
    assert!(is_unit(vectors.session.as_ref().unwrap()));
}

#[tokio::test]
async fn test_rating_without_value_rejected() {
    let fx = fixture(5).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());

    let result = updater
        .apply(&InteractionEvent::new(UserId(1), ItemId(1), InteractionType::Rating))
        .await;
    assert!(matches!(result, Err(Error::InvalidArgument { .. })));

    // three stars carries no signal
    let neutral = updater
        .apply(&InteractionEvent::rating(UserId(1), ItemId(1), 3.0))
        .await
        .unwrap();
    assert!(!neutral.session_updated);
    assert!(fx.cache.get_session(UserId(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_item_is_ignored() {
    let fx = fixture(5).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());

    let outcome = updater
        .apply(&InteractionEvent::new(UserId(1), ItemId(404), InteractionType::Like))
        .await
        .unwrap();

    assert!(!outcome.session_updated);
    assert!(!outcome.long_term_queued);
    assert!(fx.cache.user_vectors(UserId(1)).await.unwrap().is_anonymous());
}

#[tokio::test]
async fn test_view_counts_and_session_decay() {
    let fx = fixture(5).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(6);

    updater
        .apply(&InteractionEvent::new(user, ItemId(2), InteractionType::View))
        .await
        .unwrap();
    updater
        .apply(&InteractionEvent::new(user, ItemId(3), InteractionType::Like))
        .await
        .unwrap();

    assert_eq!(fx.cache.view_count(ItemId(2)).await.unwrap(), 1);
    assert_eq!(fx.cache.view_count(ItemId(3)).await.unwrap(), 0);

    // the most recent event decides the session lifetime
    let ttl = fx.cache.session_ttl_remaining(user).await.unwrap().unwrap();
    assert!(ttl <= Duration::from_secs(30 * 60));
    assert!(ttl > Duration::from_secs(10 * 60));
}

#[tokio::test]
async fn test_feedback_invalidates_cached_results() {
    let fx = fixture(5).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(7);
    let cached = vec![RankedResult {
        item_id: ItemId(1),
        distance: 0.0,
        similarity: 1.0,
        rank: 0,
        original_rank: 0,
        final_score: 1.0,
        signals: None,
    }];
    let generation = fx.cache.results_generation(user).await.unwrap();
    let cached = CachedRanking {
        strategy: SearchStrategy::Unfiltered,
        results: cached,
    };
    fx.cache
        .cache_ranked_results(user, generation, "ctx:feed", &cached)
        .await
        .unwrap();

    updater
        .apply(&InteractionEvent::new(user, ItemId(2), InteractionType::Click))
        .await
        .unwrap();

    let current = fx.cache.results_generation(user).await.unwrap();
    assert!(current > generation);
    assert!(
        fx.cache
            .cached_ranked_results(user, current, "ctx:feed")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_worker_skips_applied_jobs() {
    let fx = fixture(5).await;
    let (_queue, worker) = LongTermUpdateQueue::new(fx.cache.clone(), &FeedbackConfig::default());
    let user = UserId(8);
    let job = LongTermJob {
        event_id: Uuid::new_v4(),
        user_id: user,
        item_id: ItemId(1),
        item_vector: vector_for(1),
        weight: 1.0,
    };

    assert!(worker.process(&job).await.unwrap());
    let first = fx.cache.get_long_term(user).await.unwrap().unwrap();

    assert!(!worker.process(&job).await.unwrap());
    let second = fx.cache.get_long_term(user).await.unwrap().unwrap();
    assert_close(&first, &second);
    assert!(fx.cache.is_applied(job.event_id).await.unwrap());
}

#[tokio::test]
async fn test_full_queue_drops_long_term_update() {
    let fx = fixture(5).await;
    let config = FeedbackConfig {
        queue_capacity: 1,
        ..FeedbackConfig::default()
    };
    // worker held but never run
    let (queue, _worker) = LongTermUpdateQueue::new(fx.cache.clone(), &config);
    let updater = FeedbackUpdater::new(fx.cache.clone(), fx.index.clone(), queue, &config);
    let user = UserId(9);

    let first = updater
        .apply(&InteractionEvent::new(user, ItemId(1), InteractionType::Like))
        .await
        .unwrap();
    let second = updater
        .apply(&InteractionEvent::new(user, ItemId(2), InteractionType::Like))
        .await
        .unwrap();

    assert!(first.long_term_queued);
    assert!(!second.long_term_queued);
    assert!(second.session_updated);
    assert!(fx.cache.get_long_term(user).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_feedback_for_one_user() {
    let fx = fixture(20).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let updater = Arc::new(updater);
    let user = UserId(10);

    let handles: Vec<_> = (1..=20u64)
        .map(|item| {
            let updater = Arc::clone(&updater);
            tokio::spawn(async move {
                updater
                    .apply(&InteractionEvent::new(user, ItemId(item), InteractionType::Click))
                    .await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap().session_updated);
    }
    updater.flush().await.unwrap();

    let vectors = fx.cache.user_vectors(user).await.unwrap();
    assert!(is_unit(vectors.session.as_ref().unwrap()));
    assert!(is_unit(vectors.long_term.as_ref().unwrap()));
    assert!(format!("{updater:?}").contains("active_users: 0"));
    assert_eq!(updater.active_users(), 0);
}

#[tokio::test]
async fn test_failed_session_update_releases_user_lock() {
    let fx = fixture(5).await;
    let (updater, _worker) = updater(&fx, &FeedbackConfig::default());
    let user = UserId(11);
    // session stored with the wrong dimension
    fx.cache
        .provider()
        .set_json(
            &format!("user:{user}:session"),
            "[1.0, 0.0]",
            CacheEntryConfig::default(),
        )
        .await
        .unwrap();

    let result = updater
        .apply(&InteractionEvent::new(user, ItemId(2), InteractionType::Click))
        .await;

    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    assert_eq!(updater.active_users(), 0);
}
