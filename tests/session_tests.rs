//! Integration tests for collection sessions
//!
//! These tests verify that:
//! - Windows grow page by page and stop at the filtered total
//! - Mutations keep the user's scroll depth
//! - Overlapping loads are suppressed, queued or discarded as appropriate
//! - Failures are scoped to the failing call and leave prior data intact

mod support;

use support::*;
use tableside::prelude::*;

// =============================================================================
// Pagination
// =============================================================================

mod pagination_tests {
    use super::*;

    #[tokio::test]
    async fn test_twelve_reviews_in_pages_of_five() {
        let items = reviews(12);
        let (session, _source) = review_session(items.clone(), 5).await;
        assert_eq!(session.sort(), SortOption::Newest);

        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 5);
        assert!(view.has_more);
        assert_eq!(ids(&view.displayed_items), ids(&items[..5]));

        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Applied);
        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 10);
        assert!(view.has_more);

        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Applied);
        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 12);
        assert!(!view.has_more);
        assert_eq!(view.window, WindowState::Complete);

        session.apply_delete(items[3].id).unwrap();
        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 11);
        assert!(!view.has_more);
    }

    #[tokio::test]
    async fn test_request_more_when_complete_is_a_noop() {
        let (session, source) = review_session(reviews(3), 5).await;

        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Exhausted);
        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 3);
        assert!(!view.has_more);
        assert_eq!(source.more_calls(), 0);
    }

    #[tokio::test]
    async fn test_request_more_on_empty_result_is_a_noop() {
        let (session, _source) = review_session(reviews(4), 5).await;
        session
            .set_filter(FilterPatch::new().text("no review says this"))
            .unwrap();

        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Exhausted);
        let view = session.view_state();
        assert_eq!(view.window, WindowState::Empty);
        assert_eq!(view.total_filtered_count, 0);
        assert!(!view.has_more);
    }

    #[tokio::test]
    async fn test_load_more_appends_fetched_items_before_growing() {
        let (session, source) = review_session(reviews(5), 5).await;
        source.push_page(reviews(3));
        assert!(!session.view_state().has_more);

        // Window is complete, so the extra page is not requested yet
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Exhausted);

        session.apply_insert(reviews(1).remove(0)).unwrap();
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Applied);

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 9);
        assert_eq!(view.displayed_items.len(), 9);
        assert_eq!(source.more_calls(), 1);
    }

    #[tokio::test]
    async fn test_load_more_before_start_is_not_ready() {
        let source = ScriptedSource::new(reviews(8));
        let session = CollectionSession::builder(source.clone())
            .with_config(review_config(5))
            .build()
            .unwrap();

        assert_eq!(session.phase(), Phase::Idle);
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::NotReady);
        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::NotReady);
        assert_eq!(source.more_calls(), 0);
    }
}

// =============================================================================
// Filters and Sorting
// =============================================================================

mod query_tests {
    use super::*;

    fn restaurants() -> Vec<Restaurant> {
        vec![
            Restaurant::new("Harbor House", ["Seafood", "American"], "$$$", 4.6),
            Restaurant::new("Pasta Fina", ["Italian"], "$$", 4.2),
            Restaurant::new("Green Leaf", ["Vegetarian"], "$", 4.0),
        ]
    }

    #[tokio::test]
    async fn test_seafood_filter_on_three_restaurants() {
        let session = create_session(InMemorySource::new(restaurants()), EngineConfig::restaurants())
            .await
            .unwrap();

        session
            .set_filter(FilterPatch::new().select("cuisine", ["Seafood"]))
            .unwrap();

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 1);
        assert_eq!(view.displayed_items[0].name, "Harbor House");

        let summary = session.active_filter_summary();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.clauses, vec!["Cuisine: Seafood"]);
    }

    #[tokio::test]
    async fn test_empty_filter_is_identity_in_source_order() {
        let items = restaurants();
        let session = create_session(
            InMemorySource::new(items.clone()),
            EngineConfig::restaurants(),
        )
        .await
        .unwrap();
        session.set_sort(SortOption::Newest).unwrap();
        session
            .set_filter(FilterPatch::new().select("cuisine", ["Italian"]))
            .unwrap();
        session.clear_filters().unwrap();

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 3);
        assert!(session.filter().is_identity());
        assert_eq!(session.active_filter_summary().count, 0);
    }

    #[tokio::test]
    async fn test_filter_change_restarts_from_first_page() {
        let (session, _source) = review_session(reviews(12), 5).await;
        session.request_more().await.unwrap();
        assert_eq!(session.view_state().displayed_items.len(), 10);

        session
            .set_filter(FilterPatch::new().threshold("min_rating", 2.0))
            .unwrap();

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 12);
        assert_eq!(view.displayed_items.len(), 5);
        assert_eq!(view.generation, 1);
    }

    #[tokio::test]
    async fn test_sort_change_restarts_from_first_page() {
        let items = reviews(12);
        let (session, _source) = review_session(items.clone(), 5).await;
        session.request_more().await.unwrap();

        session.set_sort(SortOption::Oldest).unwrap();

        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 5);
        let oldest_first: Vec<Uuid> = ids(&items).into_iter().rev().take(5).collect();
        assert_eq!(ids(&view.displayed_items), oldest_first);
    }

    #[tokio::test]
    async fn test_invalid_filter_leaves_state_untouched() {
        let (session, _source) = review_session(reviews(12), 5).await;
        session.request_more().await.unwrap();
        session.set_filter(FilterPatch::new().text("visit")).unwrap();
        session.request_more().await.unwrap();

        let err = session
            .set_filter(FilterPatch::new().text("other").threshold("min_rating", -1.0))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidFilterValue(FilterError::OutOfRange { .. })
        ));

        let view = session.view_state();
        assert_eq!(session.filter().text(), "visit");
        assert_eq!(view.generation, 1);
        assert_eq!(view.displayed_items.len(), 10);

        let err = session
            .set_filter(FilterPatch::new().threshold("min_rating", f64::NAN))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_FILTER_VALUE");
    }

    #[tokio::test]
    async fn test_edit_reorders_under_rating_sort() {
        let items = reviews(6);
        let (session, _source) = review_session(items.clone(), 5).await;
        session.set_sort(SortOption::HighestRated).unwrap();
        assert_eq!(session.view_state().displayed_items[0].id, items[0].id);

        session
            .apply_edit(items[4].id, ReviewPatch::default().rating(5.0))
            .unwrap();

        let view = session.view_state();
        assert_eq!(view.displayed_items[0].id, items[4].id);
        assert_eq!(view.displayed_items[0].rating, 5.0);
        assert_eq!(view.displayed_items.len(), 5);
    }

    #[tokio::test]
    async fn test_custom_flag_body_is_used() {
        let session = CollectionSession::builder(InMemorySource::new(restaurants()))
            .with_config(EngineConfig::restaurants())
            .with_flag_fn("open_now", |r: &Restaurant| r.price == "$")
            .build()
            .unwrap();
        session.start().await.unwrap();

        session.set_filter(FilterPatch::new().flag("open_now", true)).unwrap();

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 1);
        assert_eq!(view.displayed_items[0].name, "Green Leaf");
    }

    #[test]
    fn test_custom_body_for_unknown_clause_is_rejected() {
        let result = CollectionSession::builder(InMemorySource::new(restaurants()))
            .with_config(EngineConfig::restaurants())
            .with_threshold_fn("open_now", |_: &Restaurant, _| true)
            .build();
        assert!(matches!(result, Err(ConfigError::InvalidClause { .. })));
    }
}

// =============================================================================
// Mutations
// =============================================================================

mod mutation_tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_beyond_window_keeps_depth() {
        let items = reviews(12);
        let (session, _source) = review_session(items.clone(), 5).await;
        session.request_more().await.unwrap();

        session.apply_delete(items[11].id).unwrap();

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 11);
        assert_eq!(view.displayed_items.len(), 10);
        assert!(view.has_more);
    }

    #[tokio::test]
    async fn test_delete_clamps_when_total_drops_below_window() {
        let items = reviews(7);
        let (session, _source) = review_session(items.clone(), 5).await;
        session.request_more().await.unwrap();
        assert_eq!(session.view_state().displayed_items.len(), 7);

        session.apply_delete(items[0].id).unwrap();
        session.apply_delete(items[1].id).unwrap();

        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 5);
        assert!(!view.has_more);
    }

    #[tokio::test]
    async fn test_unknown_id_fails_without_side_effects() {
        let (session, _source) = review_session(reviews(6), 5).await;
        let mut rx = session.subscribe();
        let stranger = Uuid::new_v4();

        let err = session.apply_delete(stranger).unwrap_err();
        assert_eq!(
            err,
            SessionError::NotFound {
                resource: "review",
                id: stranger,
            }
        );
        assert!(
            session
                .apply_edit(stranger, ReviewPatch::default().title("x"))
                .is_err()
        );

        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 6);
        assert_eq!(view.displayed_items.len(), 5);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_mutations_publish_events() {
        let items = reviews(3);
        let (session, _source) = review_session(items.clone(), 5).await;
        let mut rx = session.subscribe();

        session
            .apply_edit(items[0].id, ReviewPatch::default().helpful(true))
            .unwrap();
        session.apply_delete(items[1].id).unwrap();

        assert_eq!(
            rx.recv().await.unwrap().event,
            SessionEvent::ItemEdited { id: items[0].id }
        );
        assert_eq!(
            rx.recv().await.unwrap().event,
            SessionEvent::ItemDeleted { id: items[1].id }
        );
    }
}

// =============================================================================
// Load Coordination
// =============================================================================

mod coordination_tests {
    use super::*;

    #[tokio::test]
    async fn test_double_request_more_fetches_once() {
        let (session, source) = review_session(reviews(12), 5).await;

        let (first, second) = tokio::join!(session.request_more(), session.request_more());

        let mut outcomes = vec![first.unwrap(), second.unwrap()];
        outcomes.sort_by_key(|o| format!("{:?}", o));
        assert_eq!(outcomes, vec![LoadOutcome::Applied, LoadOutcome::Suppressed]);
        assert_eq!(source.more_calls(), 1);
        assert_eq!(session.view_state().displayed_items.len(), 10);
    }

    #[tokio::test]
    async fn test_request_more_while_loading_is_suppressed() {
        let (session, source) = review_session(reviews(12), 5).await;
        source.gate();

        let background = session.clone();
        let first = tokio::spawn(async move { background.request_more().await });
        wait_for_phase(&session, Phase::LoadingMore).await;

        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Suppressed);
        source.release(1);

        assert_eq!(first.await.unwrap().unwrap(), LoadOutcome::Applied);
        assert_eq!(source.more_calls(), 1);
        assert_eq!(session.view_state().displayed_items.len(), 10);
        assert_eq!(session.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn test_sort_change_discards_in_flight_load_more() {
        let items = reviews(12);
        let (session, source) = review_session(items.clone(), 5).await;
        let mut rx = session.subscribe();
        source.gate();

        let background = session.clone();
        let pending = tokio::spawn(async move { background.request_more().await });
        wait_for_phase(&session, Phase::LoadingMore).await;

        session.set_sort(SortOption::Oldest).unwrap();
        source.release(1);

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Discarded);
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.displayed_items.len(), 5);
        let oldest_first: Vec<Uuid> = ids(&items).into_iter().rev().take(5).collect();
        assert_eq!(ids(&view.displayed_items), oldest_first);

        assert!(matches!(
            rx.recv().await.unwrap().event,
            SessionEvent::QueryChanged { generation: 1, .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap().event,
            SessionEvent::ResultDiscarded {
                kind: LoadKind::More,
                generation: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_filter_change_is_rejected_during_initial_load() {
        let source = ScriptedSource::new(reviews(4));
        source.gate();
        let session = CollectionSession::builder(source.clone())
            .with_config(review_config(5))
            .build()
            .unwrap();

        let background = session.clone();
        let start = tokio::spawn(async move { background.start().await });
        wait_for_phase(&session, Phase::LoadingInitial).await;

        let err = session.set_sort(SortOption::Oldest).unwrap_err();
        assert_eq!(
            err,
            SessionError::Busy {
                operation: "change the query",
                phase: Phase::LoadingInitial,
            }
        );
        assert!(err.is_retryable());

        source.release(1);
        assert_eq!(start.await.unwrap().unwrap(), LoadOutcome::Applied);
        session.set_sort(SortOption::Oldest).unwrap();
    }

    #[tokio::test]
    async fn test_refresh_during_load_more_is_queued() {
        let (session, source) = review_session(reviews(12), 5).await;
        source.gate();

        let background = session.clone();
        let more = tokio::spawn(async move { background.request_more().await });
        wait_for_phase(&session, Phase::LoadingMore).await;

        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Queued);
        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Queued);
        assert_eq!(source.refresh_calls(), 0);

        source.replace(reviews(20));
        source.release(2);

        assert_eq!(more.await.unwrap().unwrap(), LoadOutcome::Applied);
        assert_eq!(source.refresh_calls(), 1);
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.total_filtered_count, 20);
        assert_eq!(view.displayed_items.len(), 10);
    }

    #[tokio::test]
    async fn test_sort_change_discards_in_flight_refresh() {
        let items = reviews(12);
        let (session, source) = review_session(items.clone(), 5).await;
        let mut rx = session.subscribe();
        source.gate();

        let background = session.clone();
        let pending = tokio::spawn(async move { background.request_refresh().await });
        wait_for_phase(&session, Phase::Refreshing).await;

        source.replace(reviews(30));
        session.set_sort(SortOption::Oldest).unwrap();
        source.release(1);

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Discarded);
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.total_filtered_count, 12);
        assert_eq!(view.displayed_items[0].id, items[11].id);

        assert!(matches!(
            rx.recv().await.unwrap().event,
            SessionEvent::QueryChanged { generation: 1, .. }
        ));
        assert_eq!(
            rx.recv().await.unwrap().event,
            SessionEvent::ResultDiscarded {
                kind: LoadKind::Refresh,
                generation: 0,
            }
        );
    }

    #[tokio::test]
    async fn test_crashed_queued_refresh_does_not_wedge_session() {
        let (session, source) = review_session(reviews(12), 5).await;
        source.gate();

        let background = session.clone();
        let more = tokio::spawn(async move { background.request_more().await });
        wait_for_phase(&session, Phase::LoadingMore).await;

        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Queued);
        source.panic_refresh(true);
        source.release(2);

        assert_eq!(more.await.unwrap().unwrap(), LoadOutcome::Applied);
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.displayed_items.len(), 10);
        assert!(matches!(
            view.last_error,
            Some(SessionError::Fetch {
                kind: LoadKind::Refresh,
                ..
            })
        ));

        source.panic_refresh(false);
        source.release(2);
        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(session.view_state().displayed_items.len(), 12);
    }

    #[tokio::test]
    async fn test_refresh_while_refreshing_is_suppressed() {
        let (session, source) = review_session(reviews(12), 5).await;
        source.gate();

        let background = session.clone();
        let refresh = tokio::spawn(async move { background.request_refresh().await });
        wait_for_phase(&session, Phase::Refreshing).await;

        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Suppressed);
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Suppressed);
        source.release(1);

        assert_eq!(refresh.await.unwrap().unwrap(), LoadOutcome::Applied);
        assert_eq!(source.refresh_calls(), 1);
        assert_eq!(source.more_calls(), 0);
    }

    #[tokio::test]
    async fn test_refresh_preserves_scroll_depth() {
        let (session, source) = review_session(reviews(12), 5).await;
        session.request_more().await.unwrap();

        source.replace(reviews(30));
        assert_eq!(session.request_refresh().await.unwrap(), LoadOutcome::Applied);
        let view = session.view_state();
        assert_eq!(view.total_filtered_count, 30);
        assert_eq!(view.displayed_items.len(), 10);

        source.replace(reviews(8));
        session.request_refresh().await.unwrap();
        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 8);
        assert!(!view.has_more);
    }

    #[tokio::test]
    async fn test_refresh_after_emptying_shows_first_page() {
        let items = reviews(2);
        let (session, source) = review_session(items.clone(), 5).await;
        session.apply_delete(items[0].id).unwrap();
        session.apply_delete(items[1].id).unwrap();
        assert_eq!(session.view_state().window, WindowState::Empty);

        source.replace(reviews(9));
        session.request_refresh().await.unwrap();

        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 5);
        assert!(view.has_more);
    }
}

// =============================================================================
// Failures
// =============================================================================

mod failure_tests {
    use super::*;

    #[tokio::test]
    async fn test_initial_load_failure_is_retryable() {
        let source = ScriptedSource::new(reviews(7));
        source.fail_load(true);

        let session = create_session(source.clone(), review_config(5)).await.unwrap();
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Idle);
        assert!(view.displayed_items.is_empty());
        let err = view.last_error.expect("failure should be surfaced");
        assert!(err.is_retryable());
        assert_eq!(err.error_code(), "FETCH_FAILURE");

        source.fail_load(false);
        assert_eq!(session.start().await.unwrap(), LoadOutcome::Applied);
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.displayed_items.len(), 5);
        assert!(view.last_error.is_none());
        assert_eq!(source.load_calls(), 2);
    }

    #[tokio::test]
    async fn test_load_more_failure_keeps_window() {
        let (session, source) = review_session(reviews(12), 5).await;
        source.fail_more(true);

        let err = session.request_more().await.unwrap_err();
        assert_eq!(
            err,
            SessionError::Fetch {
                kind: LoadKind::More,
                message: "request timed out".to_string(),
            }
        );
        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.displayed_items.len(), 5);
        assert_eq!(view.last_error, Some(err));

        source.fail_more(false);
        assert_eq!(session.request_more().await.unwrap(), LoadOutcome::Applied);
        assert_eq!(session.view_state().displayed_items.len(), 10);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_data() {
        let items = reviews(6);
        let (session, source) = review_session(items.clone(), 5).await;
        source.replace(reviews(2));
        source.fail_refresh(true);
        let mut rx = session.subscribe();

        let err = session.request_refresh().await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Fetch {
                kind: LoadKind::Refresh,
                ..
            }
        ));

        let view = session.view_state();
        assert_eq!(view.phase, Phase::Ready);
        assert_eq!(view.total_filtered_count, 6);
        assert_eq!(ids(&view.displayed_items), ids(&items[..5]));
        assert_eq!(
            rx.recv().await.unwrap().event,
            SessionEvent::LoadFailed {
                kind: LoadKind::Refresh,
                message: "service unavailable".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn test_fn_source_session() {
        let session = create_session(
            FnSource::new(|| async { Ok(support::reviews(3)) }),
            review_config(2),
        )
        .await
        .unwrap();

        let view = session.view_state();
        assert_eq!(view.displayed_items.len(), 2);
        assert!(view.has_more);
    }
}
