//! End-to-end pagination scenarios against the in-memory engine
//!
//! Covers page walking, sort tie-breaks, counting, stale cursors and the
//! agreement between native and client-filtered search.

use std::sync::Arc;

use folio_core::test_support::fixtures::{edge_ids, int_ids, numbered, record_ids, scored, titled};
use folio_core::{
    ExecutionMode, Filter, MemoryQueryEngine, PaginationConfig, PaginationEngine,
    PaginationError, PaginationParams, Pipeline, QueryEngine, RecordId, SearchSpec, SortKey,
    SortOrder, SortSpec, Stage, StaleCursorPolicy,
};
use serde_json::json;
use test_case::test_case;

fn build(
    store: &MemoryQueryEngine,
    sort: SortSpec,
    search: Option<&str>,
    first: usize,
    after: Option<RecordId>,
) -> PaginationEngine {
    PaginationEngine::builder(Arc::new(store.clone()))
        .sort(sort)
        .search(search.map(SearchSpec::new))
        .pagination(PaginationParams { first: Some(first), after })
        .build()
        .expect("valid engine inputs")
}

/// Follow end cursors until has_next_page is false
async fn walk_pages(
    store: &MemoryQueryEngine,
    sort: SortSpec,
    search: Option<&str>,
    first: usize,
) -> Vec<Vec<RecordId>> {
    let mut pages = Vec::new();
    let mut after = None;
    loop {
        let engine = build(store, sort.clone(), search, first, after.clone());
        pages.push(edge_ids(&engine.edges().await.unwrap()));
        if !engine.has_next_page().await.unwrap() {
            break;
        }
        after = engine.end_cursor().await.unwrap();
    }
    pages
}

#[tokio::test]
async fn test_thirty_records_three_pages() {
    let store = MemoryQueryEngine::with_records(numbered(30));

    let page = build(&store, SortSpec::none(), None, 10, None);
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids(1..=10));
    assert_eq!(page.end_cursor().await.unwrap(), Some(RecordId::Int(10)));
    assert!(page.has_next_page().await.unwrap());

    let page = build(&store, SortSpec::none(), None, 10, Some(RecordId::Int(10)));
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids(11..=20));
    assert!(page.has_next_page().await.unwrap());

    let page = build(&store, SortSpec::none(), None, 10, Some(RecordId::Int(20)));
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids(21..=30));
    assert_eq!(page.end_cursor().await.unwrap(), Some(RecordId::Int(30)));
    assert!(!page.has_next_page().await.unwrap());
}

#[tokio::test]
async fn test_score_descending_with_ties() {
    let store = MemoryQueryEngine::with_records(scored(&[(10, 5), (11, 5), (12, 3), (13, 1)]));
    let sort = SortSpec::by("score", SortOrder::Descending);

    let page = build(&store, sort.clone(), None, 2, None);
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids([10, 11]));

    let page = build(&store, sort, None, 2, Some(RecordId::Int(11)));
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids([12, 13]));
    assert!(!page.has_next_page().await.unwrap());
}

#[test_case(SortSpec::none(); "no sort")]
#[test_case(SortSpec::by("score", SortOrder::Ascending); "ascending")]
#[test_case(SortSpec::by("score", SortOrder::Descending); "descending")]
#[tokio::test]
async fn test_pages_concatenate_to_sorted_base(sort: SortSpec) {
    let pairs: Vec<(i64, i64)> = (1..=23).map(|id| (id, (id * 7) % 4)).collect();
    let store = MemoryQueryEngine::with_records(scored(&pairs));

    let mut pipeline = Pipeline::new();
    if let Some(key) = sort.key() {
        pipeline = pipeline.with_stage(Stage::Sort(key.clone()));
    }
    let expected = record_ids(&store.execute(&pipeline).await.unwrap());

    let pages = walk_pages(&store, sort, None, 5).await;
    assert_eq!(pages.len(), 5);
    assert!(pages.iter().all(|page| page.len() <= 5));
    assert_eq!(pages.concat(), expected);
}

#[tokio::test]
async fn test_first_page_matches_sort_plus_limit() {
    let store = MemoryQueryEngine::with_records(scored(&[(1, 4), (2, 9), (3, 1), (4, 9), (5, 0)]));
    let key = SortKey::new("score", SortOrder::Descending);
    let expected = store
        .execute(&Pipeline::from(vec![Stage::Sort(key.clone()), Stage::Limit(3)]))
        .await
        .unwrap();

    let page = build(&store, SortSpec::by("score", SortOrder::Descending), None, 3, None);
    assert_eq!(edge_ids(&page.edges().await.unwrap()), record_ids(&expected));
}

#[tokio::test]
async fn test_total_count_ignores_pagination_and_honors_filters() {
    let records = numbered(12)
        .into_iter()
        .map(|r| {
            let odd = matches!(r.id, RecordId::Int(n) if n % 2 == 1);
            r.with_field("odd", odd)
        })
        .collect::<Vec<_>>();
    let store = MemoryQueryEngine::with_records(records);

    let engine = PaginationEngine::builder(Arc::new(store.clone()))
        .base_stages(&[Stage::Project(vec!["title".into(), "odd".into()])])
        .filter(Filter::eq("odd", true))
        .pagination(PaginationParams::first(2).after(RecordId::Int(3)))
        .build()
        .unwrap();

    assert_eq!(engine.total_count().await.unwrap(), 6);
    assert_eq!(edge_ids(&engine.edges().await.unwrap()), int_ids([5, 7]));

    // Counting strips the projection stage
    let count_pipeline = store
        .executed()
        .into_iter()
        .find(|p| p.iter().any(|s| *s == Stage::Count))
        .expect("count pipeline executed");
    assert!(count_pipeline.iter().all(|s| !s.is_projection()));
}

#[tokio::test]
async fn test_set_membership_filter() {
    let store = MemoryQueryEngine::with_records(titled(&[
        (1, "draft"),
        (2, "live"),
        (3, "archived"),
        (4, "live"),
    ]));
    let engine = PaginationEngine::builder(Arc::new(store))
        .filter(Filter::any_of("title", ["draft", "live"]))
        .build()
        .unwrap();

    assert_eq!(edge_ids(&engine.edges().await.unwrap()), int_ids([1, 2, 4]));
    assert_eq!(engine.total_count().await.unwrap(), 3);
}

#[tokio::test]
async fn test_stale_cursor_native_fails_every_dependent_operation() {
    let store = MemoryQueryEngine::with_records(numbered(5));
    let engine = build(&store, SortSpec::none(), None, 2, Some(RecordId::Int(99)));
    let expected = PaginationError::CursorNotFound {
        cursor: RecordId::Int(99),
    };

    assert_eq!(engine.edges().await.unwrap_err(), expected);
    assert_eq!(engine.end_cursor().await.unwrap_err(), expected);
    assert_eq!(engine.has_next_page().await.unwrap_err(), expected);
    assert_eq!(engine.total_count().await.unwrap_err(), expected);
    // One resolution attempt, shared by every operation
    assert_eq!(store.call_count(), 1);
}

fn search_corpus() -> Vec<folio_core::Record> {
    titled(&[
        (1, "Rust ownership"),
        (2, "Go channels"),
        (3, "rust traits"),
        (4, "Python typing"),
        (5, "RUST async"),
        (6, "Zig comptime"),
        (7, "rust macros"),
        (8, "trusted builds"),
    ])
}

#[tokio::test]
async fn test_client_filtered_search_pages() {
    let store = MemoryQueryEngine::with_records(search_corpus());

    let page = build(&store, SortSpec::none(), Some("rust"), 2, None);
    assert_eq!(page.mode(), ExecutionMode::ClientFiltered);
    assert_eq!(edge_ids(&page.edges().await.unwrap()), int_ids([1, 3]));
    assert!(page.has_next_page().await.unwrap());
    assert_eq!(page.total_count().await.unwrap(), 5);
    // Count, edges and has-next-page share one unpaginated scan
    assert_eq!(store.call_count(), 1);

    let pages = walk_pages(&store, SortSpec::none(), Some("rust"), 2).await;
    assert_eq!(pages, vec![int_ids([1, 3]), int_ids([5, 7]), int_ids([8])]);
}

#[tokio::test]
async fn test_client_filtered_stale_cursor_fails_by_default() {
    let store = MemoryQueryEngine::with_records(search_corpus());
    let engine = build(&store, SortSpec::none(), Some("rust"), 2, Some(RecordId::Int(99)));

    assert!(engine.edges().await.unwrap_err().is_cursor_not_found());
    assert!(engine.has_next_page().await.unwrap_err().is_cursor_not_found());
    // Counting does not depend on the cursor in this mode
    assert_eq!(engine.total_count().await.unwrap(), 5);
}

#[tokio::test]
async fn test_client_filtered_stale_cursor_empty_page_policy() {
    let store = MemoryQueryEngine::with_records(search_corpus());
    let engine = PaginationEngine::builder(Arc::new(store))
        .search(Some(SearchSpec::new("rust")))
        .pagination(PaginationParams::first(2).after(RecordId::Int(99)))
        .config(PaginationConfig::default().with_stale_cursor(StaleCursorPolicy::EmptyPage))
        .build()
        .unwrap();

    assert!(engine.edges().await.unwrap().is_empty());
    assert_eq!(engine.end_cursor().await.unwrap(), None);
    assert!(!engine.has_next_page().await.unwrap());
}

#[tokio::test]
async fn test_native_and_client_search_agree() {
    let client = MemoryQueryEngine::with_records(search_corpus());
    let native = MemoryQueryEngine::with_records(search_corpus()).with_native_search();

    for sort in [
        SortSpec::none(),
        SortSpec::by("title", SortOrder::Ascending),
        SortSpec::by("title", SortOrder::Descending),
    ] {
        let client_pages = walk_pages(&client, sort.clone(), Some("rust"), 2).await;
        let native_pages = walk_pages(&native, sort.clone(), Some("rust"), 2).await;
        assert_eq!(client_pages, native_pages, "sort {sort:?}");

        let client_engine = build(&client, sort.clone(), Some("rust"), 2, None);
        let native_engine = build(&native, sort, Some("rust"), 2, None);
        assert_eq!(native_engine.mode(), ExecutionMode::Native);
        assert_eq!(
            client_engine.total_count().await.unwrap(),
            native_engine.total_count().await.unwrap()
        );
    }
}

#[tokio::test]
async fn test_search_field_restriction_from_config() {
    let records = vec![
        folio_core::Record::new(RecordId::Int(1))
            .with_field("title", "intro")
            .with_field("body", "rust"),
        folio_core::Record::new(RecordId::Int(2))
            .with_field("title", "rust")
            .with_field("body", "intro"),
    ];
    let store = MemoryQueryEngine::with_records(records);
    let mut config = PaginationConfig::default();
    config.search.fields = Some(vec!["title".to_string()]);

    let engine = PaginationEngine::builder(Arc::new(store))
        .search(Some(SearchSpec::new("rust")))
        .config(config)
        .build()
        .unwrap();
    assert_eq!(edge_ids(&engine.edges().await.unwrap()), int_ids([2]));
}

#[tokio::test]
async fn test_caller_base_stages_are_not_mutated() {
    let store = MemoryQueryEngine::with_records(numbered(3));
    let base = vec![Stage::Project(vec!["title".into()])];
    let engine = PaginationEngine::builder(Arc::new(store))
        .base_stages(&base)
        .filter(Filter::eq("title", "record 2"))
        .sort(SortSpec::by("title", SortOrder::Ascending))
        .build()
        .unwrap();

    engine.edges().await.unwrap();
    engine.has_next_page().await.unwrap();
    assert_eq!(base, vec![Stage::Project(vec!["title".into()])]);
    assert_eq!(engine.base_pipeline().len(), 3);
}

#[test_case(SortOrder::Ascending; "ascending")]
#[test_case(SortOrder::Descending; "descending")]
#[tokio::test]
async fn test_array_sort_values_walk_every_record(order: SortOrder) {
    let tags = [json!(["c"]), json!(["a"]), json!(["b"]), json!(["a", "z"]), json!(["a"])];
    let records = tags
        .into_iter()
        .zip(1..)
        .map(|(tags, id)| folio_core::Record::new(RecordId::Int(id)).with_field("tags", tags));
    let store = MemoryQueryEngine::with_records(records);
    let sort = SortSpec::by("tags", order);

    let expected = store
        .execute(&Pipeline::from(vec![Stage::Sort(SortKey::new("tags", order))]))
        .await
        .unwrap();
    let pages = walk_pages(&store, sort.clone(), None, 1).await;
    assert_eq!(pages.len(), 5);
    assert_eq!(pages.concat(), record_ids(&expected));

    let first = build(&store, sort, None, 1, None);
    assert!(first.has_next_page().await.unwrap());
    assert_eq!(first.total_count().await.unwrap(), 5);
}

fn object_id(n: u64) -> RecordId {
    RecordId::Text(format!("{n:024x}"))
}

#[tokio::test]
async fn test_text_ids_break_ties_across_pages() {
    let records = [(0x0a, 2), (0x01, 1), (0xff, 2), (0x10, 1), (0x0b, 2), (0x100, 1)]
        .into_iter()
        .map(|(n, score)| folio_core::Record::new(object_id(n)).with_field("score", score));
    let store = MemoryQueryEngine::with_records(records);

    let pages = walk_pages(&store, SortSpec::by("score", SortOrder::Descending), None, 2).await;
    assert_eq!(
        pages,
        vec![
            vec![object_id(0x0a), object_id(0x0b)],
            vec![object_id(0xff), object_id(0x01)],
            vec![object_id(0x10), object_id(0x100)],
        ]
    );

    let unsorted = walk_pages(&store, SortSpec::none(), None, 4).await;
    assert_eq!(
        unsorted.concat(),
        [0x01, 0x0a, 0x0b, 0x10, 0xff, 0x100].map(object_id).to_vec()
    );
}

#[tokio::test]
async fn test_sort_field_projected_away_falls_back_to_id_order() {
    let store = MemoryQueryEngine::with_records(scored(&[(1, 9), (2, 3), (3, 7), (4, 1), (5, 5)]));
    let mut after = None;
    let mut walked = Vec::new();
    loop {
        let engine = PaginationEngine::builder(Arc::new(store.clone()))
            .base_stages(&[Stage::Project(vec!["title".into()])])
            .sort(SortSpec::by("score", SortOrder::Descending))
            .pagination(PaginationParams { first: Some(2), after })
            .build()
            .unwrap();
        walked.extend(edge_ids(&engine.edges().await.unwrap()));
        if !engine.has_next_page().await.unwrap() {
            break;
        }
        after = engine.end_cursor().await.unwrap();
    }
    assert_eq!(walked, int_ids(1..=5));
}
