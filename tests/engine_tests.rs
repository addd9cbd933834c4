use planboard::engine::{ChildSpec, Command, Edge, Reject};
use planboard::models::{Document, Row, RowId, RowKind, TaskStatus};
use planboard::seed::example_document;
use planboard::{tree, Core};

fn ids(rows: &[Row]) -> Vec<&str> {
    rows.iter().map(|r| r.id.as_str()).collect()
}

#[test]
fn test_status_cycle_closes_after_five_steps() {
    let mut doc = example_document();
    let id = RowId::from("r-checklist");
    assert_eq!(doc.find(&id).unwrap().status, TaskStatus::New);

    for _ in 0..5 {
        let outcome = doc.apply(Command::CycleStatus { id: id.clone() });
        assert!(outcome.is_applied());
    }

    let row = doc.find(&id).unwrap();
    assert_eq!(row.status, TaskStatus::New);
    // The wrap through Done must not leave a completion timestamp behind.
    assert!(row.completed_at.is_none());
}

#[test]
fn test_completion_timestamp_tracks_done() {
    let mut doc = example_document();
    let id = RowId::from("r-checklist");

    // New -> InProgress -> Attention -> Blocked -> Done
    for _ in 0..4 {
        doc.apply(Command::CycleStatus { id: id.clone() });
    }
    let row = doc.find(&id).unwrap();
    assert_eq!(row.status, TaskStatus::Done);
    assert!(row.completed_at.is_some());
}

#[test]
fn test_cycle_rejects_non_tasks() {
    let mut doc = example_document();
    let outcome = doc.apply(Command::CycleStatus {
        id: RowId::from("r-prep-notes"),
    });
    assert_eq!(
        outcome.rejected,
        Some(Reject::NotATask {
            id: RowId::from("r-prep-notes")
        })
    );
}

#[test]
fn test_move_conserves_rows() {
    let mut doc = example_document();
    let before = doc.row_count();

    let outcome = doc.apply(Command::MoveRow {
        source: RowId::from("r-checklist"),
        target: RowId::from("r-runbook"),
        edge: Edge::After,
    });
    assert!(outcome.is_applied());
    assert_eq!(doc.row_count(), before);

    let panel = doc.find(&RowId::from("r-prep")).unwrap();
    assert_eq!(
        ids(&panel.children),
        vec!["r-venue", "r-prep-notes", "r-runbook", "r-checklist"]
    );
}

#[test]
fn test_move_across_panels() {
    let mut doc = example_document();
    let before = doc.row_count();

    doc.apply(Command::MoveRow {
        source: RowId::from("r-venue"),
        target: RowId::from("r-domain"),
        edge: Edge::Before,
    });

    assert_eq!(doc.row_count(), before);
    let site = doc.find(&RowId::from("r-site")).unwrap();
    assert_eq!(ids(&site.children), vec!["r-venue", "r-domain", "r-copy"]);
    // The subtree moved intact.
    let venue = doc.find(&RowId::from("r-venue")).unwrap();
    assert_eq!(venue.children.len(), 2);
}

#[test]
fn test_move_into_own_subtree_is_rejected() {
    let mut doc = example_document();
    let snapshot = serde_json::to_string(&doc).unwrap();

    let outcome = doc.apply(Command::MoveRow {
        source: RowId::from("r-venue"),
        target: RowId::from("r-venue-quotes"),
        edge: Edge::Before,
    });

    assert_eq!(
        outcome.rejected,
        Some(Reject::WouldCycle {
            moved: RowId::from("r-venue"),
            target: RowId::from("r-venue-quotes"),
        })
    );
    // A rejected move leaves the document untouched.
    assert_eq!(serde_json::to_string(&doc).unwrap(), snapshot);
}

#[test]
fn test_move_onto_itself_is_rejected() {
    let mut doc = example_document();
    let outcome = doc.apply(Command::MoveRow {
        source: RowId::from("r-venue"),
        target: RowId::from("r-venue"),
        edge: Edge::After,
    });
    assert_eq!(
        outcome.rejected,
        Some(Reject::SourceIsTarget {
            id: RowId::from("r-venue")
        })
    );
}

#[test]
fn test_add_child_then_move_lands_before_target() {
    let mut doc = example_document();

    let outcome = doc.apply(Command::AddChild {
        parent: Some(RowId::from("r-prep")),
        kind: RowKind::Task,
    });
    let new_id = outcome.created[0].clone();
    assert!(doc.is_editing(&new_id));

    doc.apply(Command::CommitEdit {
        id: new_id.clone(),
        label: "Order signage".to_string(),
        link_target: None,
    });
    doc.apply(Command::MoveRow {
        source: new_id.clone(),
        target: RowId::from("r-checklist"),
        edge: Edge::Before,
    });

    let panel = doc.find(&RowId::from("r-prep")).unwrap();
    assert_eq!(panel.children[0].id, new_id);
    assert_eq!(panel.children[1].id, RowId::from("r-checklist"));
}

#[test]
fn test_delete_subtree_removes_descendants() {
    let mut doc = example_document();
    let before = doc.row_count();

    let outcome = doc.apply(Command::DeleteSubtree {
        id: RowId::from("r-venue"),
    });
    assert!(outcome.is_applied());

    // r-venue carried two children.
    assert_eq!(doc.row_count(), before - 3);
    assert!(doc.find(&RowId::from("r-venue-quotes")).is_none());
}

#[test]
fn test_delete_drops_edit_session_inside_subtree() {
    let mut doc = example_document();
    doc.apply(Command::BeginEdit {
        id: RowId::from("r-venue-visit"),
    });
    assert!(doc.editing.is_some());

    doc.apply(Command::DeleteSubtree {
        id: RowId::from("r-venue"),
    });
    assert!(doc.editing.is_none());
}

#[test]
fn test_single_edit_session() {
    let mut doc = example_document();
    doc.apply(Command::BeginEdit {
        id: RowId::from("r-checklist"),
    });
    doc.apply(Command::BeginEdit {
        id: RowId::from("r-domain"),
    });

    assert!(!doc.is_editing(&RowId::from("r-checklist")));
    assert!(doc.is_editing(&RowId::from("r-domain")));

    // Committing against the superseded row is a stale no-op.
    let outcome = doc.apply(Command::CommitEdit {
        id: RowId::from("r-checklist"),
        label: "late".to_string(),
        link_target: None,
    });
    assert_eq!(
        outcome.rejected,
        Some(Reject::StaleEdit {
            id: RowId::from("r-checklist")
        })
    );
    assert_ne!(doc.find(&RowId::from("r-checklist")).unwrap().label, "late");
}

#[test]
fn test_search_narrows_monotonically() {
    let doc = example_document();
    let broad = tree::flatten_visible(&doc.rows, Some("ve"));
    let narrow = tree::flatten_visible(&doc.rows, Some("venue"));

    assert!(!narrow.is_empty());
    for (row, _) in &narrow {
        assert!(
            broad.iter().any(|(r, _)| r.id == row.id),
            "row {} matched the longer term but not the shorter one",
            row.id
        );
    }
}

#[test]
fn test_search_reveals_collapsed_matches() {
    let mut doc = example_document();
    doc.apply(Command::SetAllExpanded { expanded: false });

    let hits = tree::flatten_visible(&doc.rows, Some("quotes"));
    assert!(hits
        .iter()
        .any(|(r, _)| r.id == RowId::from("r-venue-quotes")));
}

#[test]
fn test_add_children_highlights_without_editing() {
    let mut doc = example_document();
    let outcome = doc.apply(Command::AddChildren {
        parent: Some(RowId::from("r-prep")),
        items: vec![
            ChildSpec {
                label: "Book catering".to_string(),
                kind: RowKind::Task,
                tooltip: None,
            },
            ChildSpec {
                label: "Menu draft".to_string(),
                kind: RowKind::Text,
                tooltip: Some("vegetarian options".to_string()),
            },
        ],
    });

    assert_eq!(outcome.created.len(), 2);
    assert!(doc.editing.is_none());
    for id in &outcome.created {
        assert!(doc.find(id).unwrap().highlighted);
    }
}

#[test]
fn test_done_task_resets_through_the_gate() {
    let core = Core::new(example_document());
    let id = RowId::from("r-checklist");

    // Walk the task all the way to Done.
    for _ in 0..4 {
        core.apply(Command::CycleStatus { id: id.clone() });
    }
    let doc = core.snapshot();
    assert_eq!(doc.find(&id).unwrap().status, TaskStatus::Done);
    assert!(doc.find(&id).unwrap().completed_at.is_some());

    // Un-completing goes through the two-phase reset gate.
    let pending = core.request_reset(&id);
    assert!(pending.is_some());
    let outcome = core.confirm_pending().unwrap();
    assert!(outcome.is_applied());

    let doc = core.snapshot();
    let row = doc.find(&id).unwrap();
    assert_eq!(row.status, TaskStatus::New);
    assert!(row.completed_at.is_none());
}

#[test]
fn test_cancelled_delete_changes_nothing() {
    let core = Core::new(example_document());
    let before = serde_json::to_string(&core.snapshot()).unwrap();

    assert!(core.request_delete(&RowId::from("r-venue")).is_some());
    assert!(core.cancel_pending().is_some());
    assert!(core.pending().is_none());

    assert_eq!(serde_json::to_string(&core.snapshot()).unwrap(), before);
}

#[test]
fn test_unknown_ids_degrade_to_noops() {
    let mut doc = Document::new("empty");
    let ghost = RowId::from("ghost");

    let outcome = doc.apply(Command::ToggleExpanded { id: ghost.clone() });
    assert_eq!(outcome.rejected, Some(Reject::UnknownRow { id: ghost.clone() }));

    let outcome = doc.apply(Command::AddChild {
        parent: Some(ghost.clone()),
        kind: RowKind::Task,
    });
    assert_eq!(outcome.rejected, Some(Reject::UnknownParent { id: ghost }));
    assert_eq!(doc.row_count(), 0);
}
