//! Tests for user vector blending

use recs_application::{BlendOutcome, PersonalizationBlender};
use recs_domain::error::Error;
use recs_domain::value_objects::{
    ContextWeights, PersonalizationConfig, RequestContext, UserVectors,
};

use crate::fixtures::{assert_close, emb, is_unit};

fn user(long_term: Option<&[f32]>, session: Option<&[f32]>) -> UserVectors {
    UserVectors {
        long_term: long_term.map(emb),
        session: session.map(emb),
    }
}

#[test]
fn test_anonymous_user_is_not_personalized() {
    let blender = PersonalizationBlender::default();
    let query = emb(&[1.0, 0.0, 0.0, 0.0]);

    for context in [RequestContext::Feed, RequestContext::Search, RequestContext::Similar] {
        let outcome = blender
            .blend(&UserVectors::anonymous(), Some(&query), context)
            .unwrap();
        assert_eq!(outcome, BlendOutcome::NoPersonalization);
        assert!(!outcome.is_personalized());
    }
}

#[test]
fn test_feed_blend_leans_to_long_term() {
    let blender = PersonalizationBlender::default();
    let long_term = [1.0, 0.0, 0.0, 0.0];
    let session = [0.0, 1.0, 0.0, 0.0];
    let vectors = user(Some(&long_term), Some(&session));

    let blended = blender
        .blend(&vectors, None, RequestContext::Feed)
        .unwrap()
        .into_embedding()
        .unwrap();

    assert!(is_unit(&blended));
    let to_long = blended.cosine_similarity(&emb(&long_term)).unwrap();
    let to_session = blended.cosine_similarity(&emb(&session)).unwrap();
    assert!(to_long > to_session);
}

#[test]
fn test_search_blend_leans_to_query() {
    let blender = PersonalizationBlender::default();
    let vectors = user(Some(&[1.0, 0.0, 0.0, 0.0]), Some(&[0.0, 1.0, 0.0, 0.0]));
    let query = emb(&[0.0, 0.0, 1.0, 0.0]);

    let blended = blender
        .blend(&vectors, Some(&query), RequestContext::Search)
        .unwrap()
        .into_embedding()
        .unwrap();

    let to_query = blended.cosine_similarity(&query).unwrap();
    let to_long = blended
        .cosine_similarity(&emb(&[1.0, 0.0, 0.0, 0.0]))
        .unwrap();
    assert!(to_query > to_long);
}

#[test]
fn test_single_vector_renormalizes() {
    let blender = PersonalizationBlender::default();
    let session = [0.0, 3.0, 4.0, 0.0];
    let vectors = user(None, Some(&session));

    let blended = blender
        .blend(&vectors, None, RequestContext::Feed)
        .unwrap()
        .into_embedding()
        .unwrap();

    assert_close(&blended, &emb(&session));
}

#[test]
fn test_zero_user_weights_disable_personalization() {
    let config = PersonalizationConfig {
        search: ContextWeights::from_tuple((0.0, 0.0, 1.0)),
        ..PersonalizationConfig::default()
    };
    let blender = PersonalizationBlender::new(config);
    let vectors = user(Some(&[1.0, 0.0, 0.0, 0.0]), None);

    let outcome = blender
        .blend(&vectors, Some(&emb(&[0.0, 1.0, 0.0, 0.0])), RequestContext::Search)
        .unwrap();
    assert_eq!(outcome, BlendOutcome::NoPersonalization);
}

#[test]
fn test_opposite_vectors_cancel_out() {
    let config = PersonalizationConfig {
        feed: ContextWeights::from_tuple((0.5, 0.5, 0.0)),
        ..PersonalizationConfig::default()
    };
    let blender = PersonalizationBlender::new(config);
    let vectors = user(Some(&[1.0, 0.0, 0.0, 0.0]), Some(&[-1.0, 0.0, 0.0, 0.0]));

    let outcome = blender.blend(&vectors, None, RequestContext::Feed).unwrap();
    assert_eq!(outcome, BlendOutcome::NoPersonalization);
}

#[test]
fn test_blend_dimension_mismatch() {
    let blender = PersonalizationBlender::default();
    let vectors = UserVectors {
        long_term: Some(emb(&[1.0, 0.0, 0.0, 0.0])),
        session: Some(emb(&[1.0, 0.0])),
    };

    let result = blender.blend(&vectors, None, RequestContext::Feed);
    assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
}

#[test]
fn test_item_blend_keeps_item_dominant() {
    let blender = PersonalizationBlender::default();
    let item = emb(&[1.0, 0.0, 0.0, 0.0]);
    let vectors = user(Some(&[0.0, 1.0, 0.0, 0.0]), None);

    let blended = blender.blend_item_and_user(&item, &vectors, 0.9).unwrap();

    assert!(is_unit(&blended));
    let to_item = blended.cosine_similarity(&item).unwrap();
    let to_user = blended
        .cosine_similarity(&emb(&[0.0, 1.0, 0.0, 0.0]))
        .unwrap();
    assert!(to_item > 0.9);
    assert!(to_user > 0.0);
}

#[test]
fn test_item_blend_edges() {
    let blender = PersonalizationBlender::default();
    let item = emb(&[1.0, 1.0, 0.0, 0.0]);
    let vectors = user(Some(&[0.0, 0.0, 1.0, 0.0]), None);

    let only_item = blender.blend_item_and_user(&item, &vectors, 1.0).unwrap();
    assert_close(&only_item, &item);

    let anonymous = blender
        .blend_item_and_user(&item, &UserVectors::anonymous(), 0.5)
        .unwrap();
    assert_close(&anonymous, &item);

    // out-of-range ratios are clamped
    let clamped = blender.blend_item_and_user(&item, &vectors, 7.0).unwrap();
    assert_close(&clamped, &item);
}
