//! Flat listing, ordering and retrieval
//!
//! Test Categories:
//! 1. Filter semantics (AND across fields, OR within a field)
//! 2. Ordering is a strict total order
//! 3. Idempotence and page concatenation
//! 4. Retrieval and annotations

mod common;

use std::collections::HashSet;
use std::thread;

use uuid::Uuid;

use draftq::engine::ListRequest;
use draftq::error::QueryError;
use draftq::model::{IssueLink, Priority};

use common::{at, day, flat, ids, list_ids, World};

// =============================================================================
// FILTER SEMANTICS
// =============================================================================

/// Urgent drafts only, newest first
#[test]
fn test_urgent_drafts_newest_first() {
    let mut world = World::new();
    let older = world.add("older urgent", 1, |i| i.priority = Priority::Urgent);
    world.add("high", 2, |i| i.priority = Priority::High);
    let newer = world.add("newer urgent", 3, |i| i.priority = Priority::Urgent);
    world.add("published urgent", 4, |i| {
        i.priority = Priority::Urgent;
        i.is_draft = false;
    });
    let engine = world.engine();

    let request = ListRequest::default()
        .with_filter("priority", &["urgent"])
        .order_by("-created_at");
    let page = flat(engine.list(&world.scope, &request).unwrap());

    assert_eq!(ids(&page.results), vec![newer, older]);
    assert_eq!(page.total_count, 2);
    assert!(page
        .results
        .iter()
        .all(|d| d.issue.priority == Priority::Urgent && d.issue.is_draft));
}

/// A record matches iff every filtered field holds one of its values
#[test]
fn test_conjunction_of_disjunctions() {
    let mut world = World::new();
    let (bug, feature) = (world.bug, world.feature);

    let urgent_bug = world.add("urgent bug", 1, |i| i.priority = Priority::Urgent);
    world.label(urgent_bug, bug);
    let high_bug = world.add("high bug", 2, |i| i.priority = Priority::High);
    world.label(high_bug, bug);
    let low_bug = world.add("low bug", 3, |i| i.priority = Priority::Low);
    world.label(low_bug, bug);
    let urgent_feature = world.add("urgent feature", 4, |i| i.priority = Priority::Urgent);
    world.label(urgent_feature, feature);
    world.add("urgent unlabeled", 5, |i| i.priority = Priority::Urgent);
    let engine = world.engine();

    let bug_id = bug.to_string();
    let request = ListRequest::from_pairs([("priority", "urgent,high"), ("labels", bug_id.as_str())]);
    let found: HashSet<Uuid> = list_ids(&engine, &world.scope, &request).into_iter().collect();

    assert_eq!(found, HashSet::from([urgent_bug, high_bug]));
}

/// Null tokens select records without a value
#[test]
fn test_null_token_matches_unlabeled() {
    let mut world = World::new();
    let bug = world.bug;
    let labeled = world.draft("labeled", 1);
    world.label(labeled, bug);
    let bare = world.draft("bare", 2);
    let engine = world.engine();

    let request = ListRequest::default().with_filter("labels", &["None"]);
    assert_eq!(list_ids(&engine, &world.scope, &request), vec![bare]);

    let bug_id = bug.to_string();
    let request = ListRequest::default().with_filter("labels", &["None", bug_id.as_str()]);
    let found: HashSet<Uuid> = list_ids(&engine, &world.scope, &request).into_iter().collect();
    assert_eq!(found, HashSet::from([labeled, bare]));
}

/// Range bounds are inclusive
#[test]
fn test_date_range_inclusive() {
    let mut world = World::new();
    let on = |world: &mut World, d: Option<u32>, minute: i64| {
        world.add("dated", minute, |i| i.target_date = d.map(day))
    };
    let _before = on(&mut world, Some(4), 1);
    let first = on(&mut world, Some(5), 2);
    let middle = on(&mut world, Some(7), 3);
    let last = on(&mut world, Some(10), 4);
    let _after = on(&mut world, Some(11), 5);
    let _undated = on(&mut world, None, 6);
    let engine = world.engine();

    let request = ListRequest::default().with_filter("target_date", &["2024-03-05..2024-03-10"]);
    let found: HashSet<Uuid> = list_ids(&engine, &world.scope, &request).into_iter().collect();
    assert_eq!(found, HashSet::from([first, middle, last]));

    let request = ListRequest::default().with_filter("target_date", &["2024-03-10;after"]);
    let found: Vec<Uuid> = list_ids(&engine, &world.scope, &request);
    assert_eq!(found.len(), 2);
    assert!(found.contains(&last));
}

#[test]
fn test_unknown_filter_field_rejected() {
    let mut world = World::new();
    world.draft("any", 1);
    let engine = world.engine();

    let err = engine
        .list(&world.scope, &ListRequest::default().with_filter("estimate", &["3"]))
        .unwrap_err();
    assert_eq!(err.field(), Some("estimate"));
    assert!(err.is_client_error());

    let err = engine
        .list(&world.scope, &ListRequest::default().with_filter("draft", &["false"]))
        .unwrap_err();
    assert_eq!(err.field(), Some("draft"));
}

#[test]
fn test_page_size_above_max_rejected() {
    let engine = World::new().engine();
    let scope = draftq::model::ProjectScope::new(Uuid::new_v4(), Uuid::new_v4());
    let err = engine
        .list(&scope, &ListRequest::default().per_page(1001))
        .unwrap_err();
    assert_eq!(err.field(), Some("per_page"));
}

// =============================================================================
// ORDERING
// =============================================================================

/// Identical sort values fall back to ascending id
#[test]
fn test_ties_broken_by_id() {
    let mut world = World::new();
    let mut expected: Vec<Uuid> = (0..6).map(|_| world.draft("same", 1)).collect();
    expected.sort();
    let engine = world.engine();

    for order in ["priority", "-created_at", "name", "-state__name"] {
        let request = ListRequest::default().order_by(order);
        assert_eq!(list_ids(&engine, &world.scope, &request), expected, "order {}", order);
    }
}

/// Missing values sort last in both directions
#[test]
fn test_nulls_last_both_directions() {
    let mut world = World::new();
    let early = world.add("early", 1, |i| i.target_date = Some(day(3)));
    let undated = world.draft("undated", 2);
    let late = world.add("late", 3, |i| i.target_date = Some(day(9)));
    let engine = world.engine();

    let asc = list_ids(&engine, &world.scope, &ListRequest::default().order_by("target_date"));
    assert_eq!(asc, vec![early, late, undated]);

    let desc = list_ids(&engine, &world.scope, &ListRequest::default().order_by("-target_date"));
    assert_eq!(desc, vec![late, early, undated]);
}

#[test]
fn test_priority_order_most_pressing_first() {
    let mut world = World::new();
    let none = world.draft("none", 1);
    let low = world.add("low", 2, |i| i.priority = Priority::Low);
    let urgent = world.add("urgent", 3, |i| i.priority = Priority::Urgent);
    let high = world.add("high", 4, |i| i.priority = Priority::High);
    let engine = world.engine();

    let ordered = list_ids(&engine, &world.scope, &ListRequest::default().order_by("priority"));
    assert_eq!(ordered, vec![urgent, high, low, none]);
}

#[test]
fn test_order_by_link_count() {
    let mut world = World::new();
    let one = world.draft("one link", 1);
    world.link(one, "https://a.example");
    let two = world.draft("two links", 2);
    world.link(two, "https://b.example");
    world.link(two, "https://c.example");
    let zero = world.draft("no links", 3);
    let engine = world.engine();

    let page = flat(
        engine
            .list(&world.scope, &ListRequest::default().order_by("-link_count"))
            .unwrap(),
    );
    assert_eq!(ids(&page.results), vec![two, one, zero]);
    assert_eq!(page.results[0].annotations.link_count, 2);
}

#[test]
fn test_unknown_order_key_rejected() {
    let engine = World::new().engine();
    let scope = World::new().scope;
    let err = engine
        .list(&scope, &ListRequest::default().order_by("-colour"))
        .unwrap_err();
    assert!(matches!(err, QueryError::Validation { ref field, .. } if field == "order_by"));
}

// =============================================================================
// IDEMPOTENCE AND PAGINATION
// =============================================================================

#[test]
fn test_list_is_idempotent() {
    let mut world = World::new();
    for minute in 0..5 {
        let id = world.add("row", minute, |i| i.priority = Priority::High);
        if minute % 2 == 0 {
            world.link(id, "https://x.example");
        }
    }
    let engine = world.engine();
    let request = ListRequest::default().order_by("-link_count").per_page(2);

    let first = flat(engine.list(&world.scope, &request).unwrap());
    let second = flat(engine.list(&world.scope, &request).unwrap());

    assert_eq!(first.results, second.results);
    assert_eq!(first.total_count, second.total_count);
    assert_eq!(first.next_cursor, second.next_cursor);
}

/// Following next_cursor visits every record exactly once, in order
#[test]
fn test_pages_concatenate_to_full_listing() {
    let mut world = World::new();
    for minute in 0..7 {
        world.draft(&format!("row {}", minute), minute);
    }
    let engine = world.engine();

    let full = list_ids(&engine, &world.scope, &ListRequest::default());
    assert_eq!(full.len(), 7);

    let mut collected = Vec::new();
    let mut request = ListRequest::default().per_page(3);
    let mut pages = 0;
    loop {
        let page = flat(engine.list(&world.scope, &request).unwrap());
        assert_eq!(page.total_count, 7);
        assert_eq!(page.total_pages, 3);
        collected.extend(ids(&page.results));
        pages += 1;
        match page.next_cursor {
            Some(next) => request = ListRequest::default().cursor(&next),
            None => break,
        }
    }

    assert_eq!(pages, 3);
    assert_eq!(collected, full);
}

#[test]
fn test_prev_cursor_marks_direction() {
    let mut world = World::new();
    for minute in 0..4 {
        world.draft("row", minute);
    }
    let engine = world.engine();

    let page = flat(
        engine
            .list(&world.scope, &ListRequest::default().cursor("2:1:0"))
            .unwrap(),
    );
    assert_eq!(page.prev_cursor.as_deref(), Some("2:0:1"));
    assert_eq!(page.next_cursor, None);
    assert_eq!(page.results.len(), 2);
}

// =============================================================================
// RETRIEVAL AND ANNOTATIONS
// =============================================================================

/// Missing and deleted ids are NotFound
#[test]
fn test_fetch_missing_is_not_found() {
    let mut world = World::new();
    let id = world.draft("doomed", 1);
    let engine = world.engine();
    let actor = world.alice;

    let missing = Uuid::new_v4();
    assert!(matches!(
        engine.fetch_one(&world.scope, actor, missing),
        Err(QueryError::NotFound(m)) if m == missing
    ));

    engine.delete(&world.scope, actor, id, None).unwrap();
    assert!(matches!(
        engine.fetch_one(&world.scope, actor, id),
        Err(QueryError::NotFound(_))
    ));
}

#[test]
fn test_fetch_published_issue_is_not_found() {
    let mut world = World::new();
    let id = world.add("published", 1, |i| i.is_draft = false);
    let engine = world.engine();

    assert!(matches!(
        engine.fetch_one(&world.scope, world.alice, id),
        Err(QueryError::NotFound(_))
    ));
}

/// Link count stays exact while other records gain links
#[test]
fn test_link_count_unaffected_by_concurrent_writes() {
    let mut world = World::new();
    let target = world.draft("target", 1);
    let other = world.draft("other", 2);
    for n in 0..3 {
        world.link(target, &format!("https://target.example/{}", n));
    }
    let store = world.store();
    let engine = draftq::DraftQueryEngine::new(store.clone());

    thread::scope(|s| {
        s.spawn(|| {
            for n in 0..200 {
                store
                    .add_link(IssueLink {
                        id: Uuid::new_v4(),
                        issue_id: other,
                        url: format!("https://other.example/{}", n),
                        title: None,
                        created_by: None,
                        created_at: at(n),
                    })
                    .unwrap();
            }
        });

        for _ in 0..50 {
            let detail = engine.fetch_one(&world.scope, world.alice, target).unwrap();
            assert_eq!(detail.draft.annotations.link_count, 3);
            assert_eq!(detail.links.len(), 3);
        }
    });
}

#[test]
fn test_detail_carries_associations_and_subscription() {
    let mut world = World::new();
    let (alice, bob, bug) = (world.alice, world.bob, world.bug);
    let parent = world.draft("parent", 1);
    world.add("child", 2, |i| {
        i.is_draft = false;
        i.parent_id = Some(parent);
    });
    world.assign(parent, alice);
    world.label(parent, bug);
    world.dataset.subscriptions.push(draftq::store::Membership::new(parent, alice));
    let engine = world.engine();

    let detail = engine.fetch_one(&world.scope, alice, parent).unwrap();
    assert_eq!(detail.draft.assignee_ids, vec![alice]);
    assert_eq!(detail.draft.label_ids, vec![bug]);
    assert_eq!(detail.draft.annotations.sub_issues_count, 1);
    assert_eq!(detail.draft.annotations.is_subscribed, Some(true));
    assert!(detail.links.is_empty());

    let other = engine.fetch_one(&world.scope, bob, parent).unwrap();
    assert_eq!(other.draft.annotations.is_subscribed, Some(false));
}

#[test]
fn test_list_rows_omit_subscription_flag() {
    let mut world = World::new();
    world.draft("row", 1);
    let engine = world.engine();

    let page = flat(engine.list(&world.scope, &ListRequest::default()).unwrap());
    let json = serde_json::to_value(&page.results[0]).unwrap();
    assert!(json.get("is_subscribed").is_none());
    assert_eq!(json["link_count"], 0);
    assert_eq!(json["assignee_ids"], serde_json::json!([]));
}
