//! Create, update and delete of draft issues
//!
//! Test Categories:
//! 1. Create defaults and validation
//! 2. Partial updates and parent cycles
//! 3. Delete
//! 4. Activity events

mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use uuid::Uuid;

use draftq::activity::{ActivityKind, MemoryActivitySink};
use draftq::engine::{DraftInput, DraftPatch, DraftQueryEngine, ListRequest};
use draftq::error::QueryError;
use draftq::model::{Priority, ProjectScope};
use draftq::store::{Associations, MemoryStore};

use common::{day, flat, World};

fn engine_with_sink(world: &World) -> (DraftQueryEngine<MemoryStore>, MemoryActivitySink) {
    let sink = MemoryActivitySink::new();
    let engine = world.engine().with_activity(Arc::new(sink.clone()));
    (engine, sink)
}

// =============================================================================
// CREATE
// =============================================================================

#[test]
fn test_create_assigns_sequence_and_owner() {
    let mut world = World::new();
    world.draft("existing", 1);
    let (engine, sink) = engine_with_sink(&world);

    let created = engine
        .create(&world.scope, world.alice, DraftInput::named("  Fix login  "), None)
        .unwrap();

    assert_eq!(created.issue.name, "Fix login");
    assert_eq!(created.issue.sequence_id, 2);
    assert!(created.issue.is_draft);
    assert_eq!(created.issue.created_by, Some(world.alice));
    assert_eq!(created.annotations.link_count, 0);

    let listed = flat(engine.list(&world.scope, &ListRequest::default()).unwrap());
    assert_eq!(listed.total_count, 2);
    assert_eq!(listed.results[0].id(), created.id());

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ActivityKind::Created);
    assert_eq!(events[0].issue_id, created.id());
}

#[test]
fn test_create_applies_default_assignee() {
    let mut world = World::new();
    let bob = world.bob;
    world.dataset.projects[0].default_assignee_id = Some(bob);
    let engine = world.engine();

    let created = engine
        .create(&world.scope, world.alice, DraftInput::named("triage"), None)
        .unwrap();
    assert_eq!(created.assignee_ids, vec![bob]);

    let explicit = DraftInput {
        associations: Associations {
            assignee_ids: Some(BTreeSet::from([world.carol])),
            ..Associations::default()
        },
        ..DraftInput::named("explicit")
    };
    let created = engine.create(&world.scope, world.alice, explicit, None).unwrap();
    assert_eq!(created.assignee_ids, vec![world.carol]);
}

#[test]
fn test_create_rejects_bad_payloads() {
    let world = World::new();
    let engine = world.engine();
    let actor = world.alice;

    let err = engine
        .create(&world.scope, actor, DraftInput::named("   "), None)
        .unwrap_err();
    assert_eq!(err.field(), Some("name"));

    let backwards = DraftInput {
        start_date: Some(day(10)),
        target_date: Some(day(2)),
        ..DraftInput::named("backwards")
    };
    let err = engine.create(&world.scope, actor, backwards, None).unwrap_err();
    assert_eq!(err.field(), Some("start_date"));

    let foreign_state = DraftInput {
        state_id: Some(Uuid::new_v4()),
        ..DraftInput::named("foreign")
    };
    let err = engine.create(&world.scope, actor, foreign_state, None).unwrap_err();
    assert_eq!(err.field(), Some("state_id"));

    let foreign_label = DraftInput {
        associations: Associations {
            label_ids: Some(BTreeSet::from([Uuid::new_v4()])),
            ..Associations::default()
        },
        ..DraftInput::named("foreign")
    };
    let err = engine.create(&world.scope, actor, foreign_label, None).unwrap_err();
    assert_eq!(err.field(), Some("label_ids"));
}

#[test]
fn test_create_in_unknown_project() {
    let world = World::new();
    let engine = world.engine();
    let elsewhere = ProjectScope::new(world.scope.workspace_id, Uuid::new_v4());

    let err = engine
        .create(&elsewhere, world.alice, DraftInput::named("lost"), None)
        .unwrap_err();
    assert!(matches!(err, QueryError::ProjectNotFound(_)));
    assert_eq!(err.status_code(), 404);
}

// =============================================================================
// UPDATE
// =============================================================================

#[test]
fn test_patch_touches_only_given_fields() {
    let mut world = World::new();
    let started = world.started;
    let id = world.add("original", 1, |i| {
        i.priority = Priority::High;
        i.description = Some("keep me".into());
        i.target_date = Some(day(8));
    });
    let engine = world.engine();

    let patch: DraftPatch = serde_json::from_value(serde_json::json!({
        "name": "renamed",
        "state_id": started,
        "target_date": null
    }))
    .unwrap();
    engine.update(&world.scope, world.alice, id, patch, None).unwrap();

    let detail = engine.fetch_one(&world.scope, world.alice, id).unwrap();
    let issue = &detail.draft.issue;
    assert_eq!(issue.name, "renamed");
    assert_eq!(issue.state_id, Some(started));
    assert_eq!(issue.target_date, None);
    assert_eq!(issue.priority, Priority::High);
    assert_eq!(issue.description.as_deref(), Some("keep me"));
    assert!(issue.updated_at > issue.created_at);
}

#[test]
fn test_patch_replaces_association_sets() {
    let mut world = World::new();
    let (bug, feature) = (world.bug, world.feature);
    let id = world.draft("labeled", 1);
    world.label(id, bug);
    let engine = world.engine();

    let patch = DraftPatch {
        associations: Associations {
            label_ids: Some(BTreeSet::from([feature])),
            ..Associations::default()
        },
        ..DraftPatch::default()
    };
    engine.update(&world.scope, world.alice, id, patch, None).unwrap();

    let detail = engine.fetch_one(&world.scope, world.alice, id).unwrap();
    assert_eq!(detail.draft.label_ids, vec![feature]);
}

#[test]
fn test_update_missing_is_not_found() {
    let world = World::new();
    let engine = world.engine();
    let err = engine
        .update(&world.scope, world.alice, Uuid::new_v4(), DraftPatch::default(), None)
        .unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)));
}

/// Parents must stay a tree inside the project
#[test]
fn test_parent_cycles_rejected() {
    let mut world = World::new();
    let root = world.draft("root", 1);
    let child = world.add("child", 2, |i| i.parent_id = Some(root));
    let grandchild = world.add("grandchild", 3, |i| i.parent_id = Some(child));
    let engine = world.engine();
    let actor = world.alice;

    let onto_self = DraftPatch {
        parent_id: Some(Some(root)),
        ..DraftPatch::default()
    };
    let err = engine.update(&world.scope, actor, root, onto_self, None).unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));

    let onto_descendant = DraftPatch {
        parent_id: Some(Some(grandchild)),
        ..DraftPatch::default()
    };
    let err = engine
        .update(&world.scope, actor, root, onto_descendant, None)
        .unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));

    let foreign = DraftInput {
        parent_id: Some(Uuid::new_v4()),
        ..DraftInput::named("orphan")
    };
    let err = engine.create(&world.scope, actor, foreign, None).unwrap_err();
    assert_eq!(err.field(), Some("parent_id"));

    let detach = DraftPatch {
        parent_id: Some(None),
        ..DraftPatch::default()
    };
    engine.update(&world.scope, actor, grandchild, detach, None).unwrap();
    let reparent = DraftPatch {
        parent_id: Some(Some(grandchild)),
        ..DraftPatch::default()
    };
    engine.update(&world.scope, actor, root, reparent, None).unwrap();
}

// =============================================================================
// DELETE AND ACTIVITY
// =============================================================================

#[test]
fn test_delete_removes_row_and_reports_previous_state() {
    let mut world = World::new();
    let alice = world.alice;
    let id = world.draft("doomed", 1);
    world.assign(id, alice);
    world.link(id, "https://doomed.example");
    let (engine, sink) = engine_with_sink(&world);

    engine
        .delete(&world.scope, alice, id, Some("https://app.example".into()))
        .unwrap();

    let page = flat(engine.list(&world.scope, &ListRequest::default()).unwrap());
    assert_eq!(page.total_count, 0);

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ActivityKind::Deleted);
    assert_eq!(events[0].origin.as_deref(), Some("https://app.example"));
    let previous = events[0].previous_state.as_ref().unwrap();
    assert_eq!(previous["name"], "doomed");
    assert_eq!(previous["link_count"], 1);

    let err = engine.delete(&world.scope, alice, id, None).unwrap_err();
    assert!(matches!(err, QueryError::NotFound(_)));
    assert_eq!(sink.len(), 1);
}

#[test]
fn test_update_event_carries_request_and_previous_state() {
    let mut world = World::new();
    let id = world.add("before", 1, |i| i.priority = Priority::Low);
    let (engine, sink) = engine_with_sink(&world);

    let patch = DraftPatch {
        priority: Some(Priority::Urgent),
        ..DraftPatch::default()
    };
    engine.update(&world.scope, world.bob, id, patch, None).unwrap();

    let events = sink.events();
    assert_eq!(events[0].kind, ActivityKind::Updated);
    assert_eq!(events[0].actor_id, world.bob);
    assert_eq!(events[0].requested_data.as_ref().unwrap()["priority"], "urgent");
    assert_eq!(
        events[0].previous_state.as_ref().unwrap()["priority"],
        "low"
    );
}

/// Failed writes emit nothing
#[test]
fn test_rejected_write_emits_no_event() {
    let world = World::new();
    let (engine, sink) = engine_with_sink(&world);

    assert!(engine
        .create(&world.scope, world.alice, DraftInput::named(""), None)
        .is_err());
    assert!(sink.is_empty());
}
