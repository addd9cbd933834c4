//! Seed document
//!
//! The document is bootstrapped from a static literal tree and lives for
//! the process; there is no persistence step. This example seed doubles as
//! the fixture for tests and `planboard serve --example`.

use chrono::Utc;
use lazy_static::lazy_static;

use crate::models::{Document, Row, RowId, RowKind, TaskStatus};

lazy_static! {
    static ref EXAMPLE: Document = build_example();
}

/// A copy of the example plan document.
pub fn example_document() -> Document {
    EXAMPLE.clone()
}

fn build_example() -> Document {
    let mut doc = Document::new("Product launch");

    let mut prep = Row::with_id(RowId::from("r-prep"), RowKind::Panel, "Launch prep");

    let mut checklist = Row::with_id(
        RowId::from("r-checklist"),
        RowKind::Task,
        "Finalize launch checklist",
    );
    checklist.tooltip = Some("walk through it with the whole team".to_string());

    let mut venue = Row::with_id(RowId::from("r-venue"), RowKind::Task, "Book the venue");
    venue.children.push(Row::with_id(
        RowId::from("r-venue-quotes"),
        RowKind::Task,
        "Collect quotes",
    ));
    venue.children.push(Row::with_id(
        RowId::from("r-venue-visit"),
        RowKind::Task,
        "Visit shortlist",
    ));

    let notes = Row::with_id(
        RowId::from("r-prep-notes"),
        RowKind::Text,
        "Open questions",
    );

    let mut runbook = Row::with_id(RowId::from("r-runbook"), RowKind::Link, "Launch runbook");
    runbook.link_target = Some("https://example.com/runbook".to_string());
    runbook.open_in_new_context = true;

    prep.children.push(checklist);
    prep.children.push(venue);
    prep.children.push(notes);
    prep.children.push(runbook);

    let mut site = Row::with_id(RowId::from("r-site"), RowKind::Panel, "Marketing site");

    let mut domain = Row::with_id(RowId::from("r-domain"), RowKind::Task, "Register the domain");
    domain.status = TaskStatus::Done;
    domain.completed_at = Some(Utc::now());

    let mut copy = Row::with_id(RowId::from("r-copy"), RowKind::Task, "Draft landing copy");
    copy.status = TaskStatus::InProgress;
    copy.owner = Some("sam".to_string());

    let review = Row::with_id(
        RowId::from("r-copy-review"),
        RowKind::Comment,
        "Tone feels too formal",
    );
    copy.children.push(review);

    site.children.push(domain);
    site.children.push(copy);

    doc.rows.push(prep);
    doc.rows.push(site);
    doc
}
