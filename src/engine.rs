//! Mutation engine
//!
//! Every write to a [`Document`] goes through [`Document::apply`] with a
//! [`Command`]. A command either applies fully or leaves the document
//! untouched; a command that references a missing row, or a move that would
//! create a cycle, degrades to a no-op carrying a [`Reject`] diagnostic.
//! UI events can race with renders, so stale references are expected
//! traffic, not errors; the diagnostic exists for observability only.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::models::{Document, Row, RowId, RowKind};
use crate::tree;

/// Insertion side relative to a drop target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Before,
    After,
}

impl Edge {
    /// Resolves the edge from the pointer's vertical position relative to
    /// the target row's midpoint.
    pub fn from_pointer(pointer_y: f64, midpoint_y: f64) -> Self {
        if pointer_y < midpoint_y {
            Edge::Before
        } else {
            Edge::After
        }
    }
}

/// Payload for one bulk-inserted child row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSpec {
    pub label: String,
    pub kind: RowKind,
    #[serde(default)]
    pub tooltip: Option<String>,
}

/// Sparse field merge applied by [`Command::PatchSettings`]. `Some` sets a
/// field; for optional text fields an empty string clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowPatch {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub tooltip: Option<String>,
    #[serde(default)]
    pub link_target: Option<String>,
    #[serde(default)]
    pub open_in_new_context: Option<bool>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_script: Option<String>,
    #[serde(default)]
    pub due_at: Option<chrono::DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<String>,
}

/// The closed command set. This is the entire write surface of a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Appends a defaulted row to `parent` (`None` = document root),
    /// expands the parent, and opens an edit session on the new row so the
    /// author can type immediately.
    AddChild {
        parent: Option<RowId>,
        kind: RowKind,
    },
    /// Bulk insert of suggested child rows; inserted non-editing and
    /// highlighted for the transient "newly added" treatment.
    AddChildren {
        parent: Option<RowId>,
        items: Vec<ChildSpec>,
    },
    /// Removes the row and its entire subtree. Confirmation gating happens
    /// in [`crate::confirm`]; the engine deletes unconditionally.
    DeleteSubtree { id: RowId },
    /// Detaches `source` (with subtree) and re-inserts it before or after
    /// `target` in the target's sibling list.
    MoveRow {
        source: RowId,
        target: RowId,
        edge: Edge,
    },
    /// Advances a task's status by one, wrapping after `Done`. Hosts route
    /// un-completion of a done task through the reset gate instead of the
    /// plain cycle so a completion timestamp is never dropped silently.
    CycleStatus { id: RowId },
    /// Returns a task to `New` and clears its completion timestamp.
    /// Issued by the reset confirmation gate.
    ResetTask { id: RowId },
    ToggleExpanded { id: RowId },
    SetAllExpanded { expanded: bool },
    ToggleVisible { id: RowId },
    BeginEdit { id: RowId },
    /// Writes the authored fields back and closes the edit session.
    CommitEdit {
        id: RowId,
        label: String,
        #[serde(default)]
        link_target: Option<String>,
    },
    /// Commit, then immediately begin editing the next row in flattened
    /// visible order. Supports fast successive data entry.
    CommitEditAndAdvance {
        id: RowId,
        label: String,
        #[serde(default)]
        link_target: Option<String>,
    },
    /// Closes the edit session without writing anything back. Discarding
    /// unsaved keystrokes is the caller's responsibility.
    CancelEdit,
    /// Transient highlight marker; set on drop by the drag layer, cleared
    /// by the host when the animation ends.
    SetHighlight { id: RowId, on: bool },
    /// Direct merge of auxiliary metadata from a settings form.
    PatchSettings { id: RowId, patch: RowPatch },
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::AddChild { .. } => "add_child",
            Command::AddChildren { .. } => "add_children",
            Command::DeleteSubtree { .. } => "delete_subtree",
            Command::MoveRow { .. } => "move_row",
            Command::CycleStatus { .. } => "cycle_status",
            Command::ResetTask { .. } => "reset_task",
            Command::ToggleExpanded { .. } => "toggle_expanded",
            Command::SetAllExpanded { .. } => "set_all_expanded",
            Command::ToggleVisible { .. } => "toggle_visible",
            Command::BeginEdit { .. } => "begin_edit",
            Command::CommitEdit { .. } => "commit_edit",
            Command::CommitEditAndAdvance { .. } => "commit_edit_and_advance",
            Command::CancelEdit => "cancel_edit",
            Command::SetHighlight { .. } => "set_highlight",
            Command::PatchSettings { .. } => "patch_settings",
        }
    }
}

/// Why a command degraded to a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Reject {
    #[error("row {id} does not exist")]
    UnknownRow { id: RowId },
    #[error("parent row {id} does not exist")]
    UnknownParent { id: RowId },
    #[error("row {id} cannot be moved relative to itself")]
    SourceIsTarget { id: RowId },
    #[error("moving {moved} next to {target} would create a cycle")]
    WouldCycle {
        // Named `moved` because thiserror treats a field literally named
        // `source` as the implicit error source; serde keeps the wire name.
        #[serde(rename = "source")]
        moved: RowId,
        target: RowId,
    },
    #[error("row {id} is not a task")]
    NotATask { id: RowId },
    #[error("row {id} does not own the edit session")]
    StaleEdit { id: RowId },
}

/// Result of applying a command. `created` carries the ids of rows the
/// command inserted; `rejected` is set when the command was a no-op.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Outcome {
    #[serde(default)]
    pub created: Vec<RowId>,
    #[serde(default)]
    pub rejected: Option<Reject>,
}

impl Outcome {
    pub fn applied() -> Self {
        Self::default()
    }

    pub fn with_created(created: Vec<RowId>) -> Self {
        Self {
            created,
            rejected: None,
        }
    }

    fn rejected(command: &'static str, reject: Reject) -> Self {
        tracing::warn!(command, reason = %reject, "command rejected");
        Self {
            created: Vec::new(),
            rejected: Some(reject),
        }
    }

    /// True if the command changed the document.
    pub fn is_applied(&self) -> bool {
        self.rejected.is_none()
    }
}

impl Document {
    /// Applies a command, mutating the document in place. Rejected commands
    /// leave the document exactly as it was.
    pub fn apply(&mut self, command: Command) -> Outcome {
        let name = command.name();
        tracing::debug!(command = name, "applying command");
        match command {
            Command::AddChild { parent, kind } => self.add_child(name, parent, kind),
            Command::AddChildren { parent, items } => self.add_children(name, parent, items),
            Command::DeleteSubtree { id } => self.delete_subtree(name, id),
            Command::MoveRow {
                source,
                target,
                edge,
            } => self.move_row(name, source, target, edge),
            Command::CycleStatus { id } => self.cycle_status(name, id),
            Command::ResetTask { id } => self.reset_task(name, id),
            Command::ToggleExpanded { id } => match tree::find_by_id_mut(&mut self.rows, &id) {
                Some(row) => {
                    row.expanded = !row.expanded;
                    Outcome::applied()
                }
                None => Outcome::rejected(name, Reject::UnknownRow { id }),
            },
            Command::SetAllExpanded { expanded } => {
                set_expanded_all(&mut self.rows, expanded);
                Outcome::applied()
            }
            Command::ToggleVisible { id } => match tree::find_by_id_mut(&mut self.rows, &id) {
                Some(row) => {
                    row.visible = !row.visible;
                    Outcome::applied()
                }
                None => Outcome::rejected(name, Reject::UnknownRow { id }),
            },
            Command::BeginEdit { id } => {
                if self.find(&id).is_none() {
                    return Outcome::rejected(name, Reject::UnknownRow { id });
                }
                self.begin_session(id);
                Outcome::applied()
            }
            Command::CommitEdit {
                id,
                label,
                link_target,
            } => self.commit_edit(name, id, label, link_target),
            Command::CommitEditAndAdvance {
                id,
                label,
                link_target,
            } => {
                let outcome = self.commit_edit(name, id.clone(), label, link_target);
                if outcome.is_applied() {
                    let order: Vec<RowId> = tree::flatten_visible(&self.rows, None)
                        .iter()
                        .map(|(r, _)| r.id.clone())
                        .collect();
                    if let Some(pos) = order.iter().position(|r| r == &id) {
                        if let Some(next) = order.get(pos + 1) {
                            self.begin_session(next.clone());
                        }
                    }
                }
                outcome
            }
            Command::CancelEdit => {
                self.editing = None;
                Outcome::applied()
            }
            Command::SetHighlight { id, on } => match tree::find_by_id_mut(&mut self.rows, &id) {
                Some(row) => {
                    row.highlighted = on;
                    Outcome::applied()
                }
                None => Outcome::rejected(name, Reject::UnknownRow { id }),
            },
            Command::PatchSettings { id, patch } => match tree::find_by_id_mut(&mut self.rows, &id)
            {
                Some(row) => {
                    apply_patch(row, patch);
                    Outcome::applied()
                }
                None => Outcome::rejected(name, Reject::UnknownRow { id }),
            },
        }
    }

    fn add_child(&mut self, name: &'static str, parent: Option<RowId>, kind: RowKind) -> Outcome {
        let row = Row::new(kind, "");
        let id = row.id.clone();
        match &parent {
            None => self.rows.push(row),
            Some(pid) => match tree::find_by_id_mut(&mut self.rows, pid) {
                Some(parent_row) => {
                    parent_row.expanded = true;
                    parent_row.children.push(row);
                }
                None => return Outcome::rejected(name, Reject::UnknownParent { id: pid.clone() }),
            },
        }
        // New rows open in an edit session so the author can name them
        // without a second gesture.
        self.begin_session(id.clone());
        Outcome::with_created(vec![id])
    }

    fn add_children(
        &mut self,
        name: &'static str,
        parent: Option<RowId>,
        items: Vec<ChildSpec>,
    ) -> Outcome {
        let rows: Vec<Row> = items
            .into_iter()
            .map(|item| {
                let mut row = Row::new(item.kind, item.label);
                row.tooltip = item.tooltip;
                row.highlighted = true;
                row
            })
            .collect();
        let created: Vec<RowId> = rows.iter().map(|r| r.id.clone()).collect();
        match &parent {
            None => self.rows.extend(rows),
            Some(pid) => match tree::find_by_id_mut(&mut self.rows, pid) {
                Some(parent_row) => {
                    parent_row.expanded = true;
                    parent_row.children.extend(rows);
                }
                None => return Outcome::rejected(name, Reject::UnknownParent { id: pid.clone() }),
            },
        }
        Outcome::with_created(created)
    }

    fn delete_subtree(&mut self, name: &'static str, id: RowId) -> Outcome {
        let removed = match tree::find_parent_list_mut(&mut self.rows, &id) {
            Some((list, _)) => {
                let pos = list.iter().position(|r| r.id == id);
                match pos {
                    Some(pos) => list.remove(pos),
                    None => return Outcome::rejected(name, Reject::UnknownRow { id }),
                }
            }
            None => return Outcome::rejected(name, Reject::UnknownRow { id }),
        };
        // Drop an edit session that pointed into the removed subtree.
        if let Some(session) = &self.editing {
            if tree::find_by_id(std::slice::from_ref(&removed), &session.row).is_some() {
                self.editing = None;
            }
        }
        Outcome::applied()
    }

    fn move_row(&mut self, name: &'static str, source: RowId, target: RowId, edge: Edge) -> Outcome {
        if source == target {
            return Outcome::rejected(name, Reject::SourceIsTarget { id: source });
        }
        let source_row = match self.find(&source) {
            Some(row) => row,
            None => return Outcome::rejected(name, Reject::UnknownRow { id: source }),
        };
        if tree::find_by_id(&source_row.children, &target).is_some() {
            return Outcome::rejected(name, Reject::WouldCycle { moved: source, target });
        }
        if self.find(&target).is_none() {
            return Outcome::rejected(name, Reject::UnknownRow { id: target });
        }

        let (moved, origin, origin_pos) = match tree::find_parent_list_mut(&mut self.rows, &source)
        {
            Some((list, parent)) => {
                let pos = list.iter().position(|r| r.id == source);
                match pos {
                    Some(pos) => (list.remove(pos), parent, pos),
                    None => return Outcome::rejected(name, Reject::UnknownRow { id: source }),
                }
            }
            None => return Outcome::rejected(name, Reject::UnknownRow { id: source }),
        };

        // The target was verified to exist outside the moved subtree, so
        // this lookup succeeds; the fallback restores the subtree to where
        // it came from so a rejection never changes the document.
        match tree::find_parent_list_mut(&mut self.rows, &target) {
            Some((list, _)) => {
                let pos = list
                    .iter()
                    .position(|r| r.id == target)
                    .unwrap_or(list.len());
                let at = match edge {
                    Edge::Before => pos,
                    Edge::After => pos + 1,
                };
                let at = at.min(list.len());
                list.insert(at, moved);
                Outcome::applied()
            }
            None => {
                let list = match &origin {
                    tree::Parent::Root => &mut self.rows,
                    tree::Parent::Row(pid) => match tree::find_by_id_mut(&mut self.rows, pid) {
                        Some(row) => &mut row.children,
                        None => &mut self.rows,
                    },
                };
                list.insert(origin_pos.min(list.len()), moved);
                Outcome::rejected(name, Reject::UnknownRow { id: target })
            }
        }
    }

    fn cycle_status(&mut self, name: &'static str, id: RowId) -> Outcome {
        let row = match tree::find_by_id_mut(&mut self.rows, &id) {
            Some(row) => row,
            None => return Outcome::rejected(name, Reject::UnknownRow { id }),
        };
        if !row.is_task() {
            return Outcome::rejected(name, Reject::NotATask { id });
        }
        let was_done = row.status.is_done();
        row.status = row.status.cycled();
        if row.status.is_done() {
            row.completed_at = Some(Utc::now());
        } else if was_done {
            row.completed_at = None;
        }
        Outcome::applied()
    }

    fn reset_task(&mut self, name: &'static str, id: RowId) -> Outcome {
        let row = match tree::find_by_id_mut(&mut self.rows, &id) {
            Some(row) => row,
            None => return Outcome::rejected(name, Reject::UnknownRow { id }),
        };
        if !row.is_task() {
            return Outcome::rejected(name, Reject::NotATask { id });
        }
        row.status = crate::models::TaskStatus::New;
        row.completed_at = None;
        Outcome::applied()
    }

    fn commit_edit(
        &mut self,
        name: &'static str,
        id: RowId,
        label: String,
        link_target: Option<String>,
    ) -> Outcome {
        if !self.is_editing(&id) {
            return Outcome::rejected(name, Reject::StaleEdit { id });
        }
        let row = match tree::find_by_id_mut(&mut self.rows, &id) {
            Some(row) => row,
            None => return Outcome::rejected(name, Reject::UnknownRow { id }),
        };
        row.label = label;
        if let Some(target) = link_target {
            row.link_target = if target.is_empty() {
                None
            } else {
                Some(target)
            };
        }
        row.highlighted = false;
        self.editing = None;
        Outcome::applied()
    }
}

fn set_expanded_all(rows: &mut [Row], expanded: bool) {
    for row in rows {
        row.expanded = expanded;
        set_expanded_all(&mut row.children, expanded);
    }
}

fn apply_patch(row: &mut Row, patch: RowPatch) {
    if let Some(label) = patch.label {
        row.label = label;
    }
    set_opt_text(&mut row.tooltip, patch.tooltip);
    set_opt_text(&mut row.link_target, patch.link_target);
    if let Some(flag) = patch.open_in_new_context {
        row.open_in_new_context = flag;
    }
    set_opt_text(&mut row.media_url, patch.media_url);
    set_opt_text(&mut row.media_script, patch.media_script);
    if let Some(due) = patch.due_at {
        row.due_at = Some(due);
    }
    set_opt_text(&mut row.owner, patch.owner);
}

// Empty string clears, anything else sets.
fn set_opt_text(field: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        *field = if v.is_empty() { None } else { Some(v) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use crate::seed::example_document;
    use pretty_assertions::assert_eq;

    fn first_task_id(doc: &Document) -> RowId {
        tree::flatten_visible(&doc.rows, None)
            .iter()
            .find(|(r, _)| r.is_task())
            .map(|(r, _)| r.id.clone())
            .unwrap()
    }

    #[test]
    fn test_add_child_opens_edit_session() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let before = doc.row_count();

        let outcome = doc.apply(Command::AddChild {
            parent: Some(panel.clone()),
            kind: RowKind::Task,
        });
        assert!(outcome.is_applied());
        assert_eq!(outcome.created.len(), 1);
        assert_eq!(doc.row_count(), before + 1);

        let new_id = &outcome.created[0];
        let row = doc.find(new_id).unwrap();
        assert_eq!(row.label, "");
        assert!(doc.is_editing(new_id));
        assert!(doc.find(&panel).unwrap().expanded);
    }

    #[test]
    fn test_add_child_unknown_parent_is_noop() {
        let mut doc = example_document();
        let before = doc.row_count();
        let outcome = doc.apply(Command::AddChild {
            parent: Some(RowId::from("missing")),
            kind: RowKind::Task,
        });
        assert_eq!(
            outcome.rejected,
            Some(Reject::UnknownParent {
                id: RowId::from("missing")
            })
        );
        assert_eq!(doc.row_count(), before);
        assert!(doc.editing.is_none());
    }

    #[test]
    fn test_add_children_highlights_without_editing() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let outcome = doc.apply(Command::AddChildren {
            parent: Some(panel),
            items: vec![
                ChildSpec {
                    label: "Draft announcement".to_string(),
                    kind: RowKind::Task,
                    tooltip: Some("from the suggester".to_string()),
                },
                ChildSpec {
                    label: "Press kit".to_string(),
                    kind: RowKind::Task,
                    tooltip: None,
                },
            ],
        });
        assert_eq!(outcome.created.len(), 2);
        assert!(doc.editing.is_none());
        for id in &outcome.created {
            let row = doc.find(id).unwrap();
            assert!(row.highlighted);
        }
    }

    #[test]
    fn test_cycle_status_stamps_completion() {
        let mut doc = example_document();
        let id = first_task_id(&doc);
        let start = doc.find(&id).unwrap().status;
        assert_eq!(start, TaskStatus::New);

        for step in 1..=5u8 {
            doc.apply(Command::CycleStatus { id: id.clone() });
            let row = doc.find(&id).unwrap();
            // completed_at is set exactly while the status is Done.
            assert_eq!(row.completed_at.is_some(), row.status.is_done(), "step {step}");
        }
        assert_eq!(doc.find(&id).unwrap().status, start);
    }

    #[test]
    fn test_cycle_status_rejects_non_task() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let outcome = doc.apply(Command::CycleStatus { id: panel.clone() });
        assert_eq!(outcome.rejected, Some(Reject::NotATask { id: panel }));
    }

    #[test]
    fn test_toggle_expanded_is_involutive() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        let before = doc.find(&id).unwrap().expanded;
        doc.apply(Command::ToggleExpanded { id: id.clone() });
        doc.apply(Command::ToggleExpanded { id: id.clone() });
        assert_eq!(doc.find(&id).unwrap().expanded, before);
    }

    #[test]
    fn test_toggle_visible_leaves_children_alone() {
        let mut doc = example_document();
        let id = first_task_id(&doc);
        doc.apply(Command::ToggleVisible { id: id.clone() });
        let row = doc.find(&id).unwrap();
        assert!(!row.visible);
        assert!(row.children.iter().all(|c| c.visible));
    }

    #[test]
    fn test_move_row_before_and_after() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let siblings: Vec<RowId> = doc.find(&panel).unwrap().children.iter().map(|r| r.id.clone()).collect();
        assert!(siblings.len() >= 2);
        let (first, last) = (siblings[0].clone(), siblings[siblings.len() - 1].clone());
        let count = doc.row_count();

        let outcome = doc.apply(Command::MoveRow {
            source: last.clone(),
            target: first.clone(),
            edge: Edge::Before,
        });
        assert!(outcome.is_applied());
        assert_eq!(doc.row_count(), count);
        assert_eq!(doc.find(&panel).unwrap().children[0].id, last);

        doc.apply(Command::MoveRow {
            source: last.clone(),
            target: first.clone(),
            edge: Edge::After,
        });
        let children = &doc.find(&panel).unwrap().children;
        let pos_first = children.iter().position(|r| r.id == first).unwrap();
        assert_eq!(children[pos_first + 1].id, last);
    }

    #[test]
    fn test_move_row_rejects_self_and_cycles() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let child = doc.find(&panel).unwrap().children[0].id.clone();
        let snapshot = serde_json::to_string(&doc).unwrap();

        let outcome = doc.apply(Command::MoveRow {
            source: panel.clone(),
            target: panel.clone(),
            edge: Edge::Before,
        });
        assert!(matches!(outcome.rejected, Some(Reject::SourceIsTarget { .. })));

        let outcome = doc.apply(Command::MoveRow {
            source: panel.clone(),
            target: child,
            edge: Edge::After,
        });
        assert!(matches!(outcome.rejected, Some(Reject::WouldCycle { .. })));

        assert_eq!(serde_json::to_string(&doc).unwrap(), snapshot);
    }

    #[test]
    fn test_move_row_unknown_target_leaves_document_unchanged() {
        let mut doc = example_document();
        let child = doc.rows[0].children[0].id.clone();
        let snapshot = serde_json::to_string(&doc).unwrap();

        let outcome = doc.apply(Command::MoveRow {
            source: child,
            target: RowId::from("missing"),
            edge: Edge::Before,
        });
        assert_eq!(
            outcome.rejected,
            Some(Reject::UnknownRow {
                id: RowId::from("missing")
            })
        );
        assert_eq!(serde_json::to_string(&doc).unwrap(), snapshot);
    }

    #[test]
    fn test_delete_subtree_drops_dangling_session() {
        let mut doc = example_document();
        let panel = doc.rows[0].id.clone();
        let child = doc.find(&panel).unwrap().children[0].id.clone();
        doc.apply(Command::BeginEdit { id: child.clone() });
        assert!(doc.is_editing(&child));

        let removed = 1 + tree::row_count(&doc.find(&panel).unwrap().children);
        let before = doc.row_count();
        let outcome = doc.apply(Command::DeleteSubtree { id: panel.clone() });
        assert!(outcome.is_applied());
        assert_eq!(doc.row_count(), before - removed);
        assert!(doc.find(&panel).is_none());
        assert!(doc.find(&child).is_none());
        assert!(doc.editing.is_none());
    }

    #[test]
    fn test_begin_edit_is_exclusive() {
        let mut doc = example_document();
        let a = doc.rows[0].id.clone();
        let b = doc.rows[1].id.clone();
        doc.apply(Command::BeginEdit { id: a.clone() });
        doc.apply(Command::BeginEdit { id: b.clone() });
        assert!(!doc.is_editing(&a));
        assert!(doc.is_editing(&b));
    }

    #[test]
    fn test_commit_edit_writes_fields_and_closes() {
        let mut doc = example_document();
        let outcome = doc.apply(Command::AddChild {
            parent: Some(doc.rows[0].id.clone()),
            kind: RowKind::Link,
        });
        let id = outcome.created[0].clone();

        let outcome = doc.apply(Command::CommitEdit {
            id: id.clone(),
            label: "Design doc".to_string(),
            link_target: Some("https://example.com/doc".to_string()),
        });
        assert!(outcome.is_applied());
        let row = doc.find(&id).unwrap();
        assert_eq!(row.label, "Design doc");
        assert_eq!(row.link_target.as_deref(), Some("https://example.com/doc"));
        assert!(!row.highlighted);
        assert!(doc.editing.is_none());
    }

    #[test]
    fn test_commit_edit_without_session_is_stale() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        let outcome = doc.apply(Command::CommitEdit {
            id: id.clone(),
            label: "late".to_string(),
            link_target: None,
        });
        assert_eq!(outcome.rejected, Some(Reject::StaleEdit { id: id.clone() }));
        assert_ne!(doc.find(&id).unwrap().label, "late");
    }

    #[test]
    fn test_commit_and_advance_moves_session_forward() {
        let mut doc = example_document();
        let order: Vec<RowId> = tree::flatten_visible(&doc.rows, None)
            .iter()
            .map(|(r, _)| r.id.clone())
            .collect();
        let first = order[0].clone();
        doc.apply(Command::BeginEdit { id: first.clone() });
        let generation = doc.editing.as_ref().unwrap().generation;

        doc.apply(Command::CommitEditAndAdvance {
            id: first,
            label: "renamed".to_string(),
            link_target: None,
        });
        let session = doc.editing.as_ref().unwrap();
        assert_eq!(session.row, order[1]);
        assert!(session.generation > generation);
    }

    #[test]
    fn test_patch_settings_merges_and_clears() {
        let mut doc = example_document();
        let id = first_task_id(&doc);
        doc.apply(Command::PatchSettings {
            id: id.clone(),
            patch: RowPatch {
                tooltip: Some("check with legal".to_string()),
                owner: Some("dana".to_string()),
                ..Default::default()
            },
        });
        let row = doc.find(&id).unwrap();
        assert_eq!(row.tooltip.as_deref(), Some("check with legal"));
        assert_eq!(row.owner.as_deref(), Some("dana"));

        doc.apply(Command::PatchSettings {
            id: id.clone(),
            patch: RowPatch {
                tooltip: Some(String::new()),
                ..Default::default()
            },
        });
        assert!(doc.find(&id).unwrap().tooltip.is_none());
    }

    #[test]
    fn test_set_all_expanded() {
        let mut doc = example_document();
        doc.apply(Command::SetAllExpanded { expanded: false });
        assert_eq!(tree::flatten_visible(&doc.rows, None).len(), doc.rows.len());
        doc.apply(Command::SetAllExpanded { expanded: true });
        assert_eq!(tree::flatten_visible(&doc.rows, None).len(), doc.row_count());
    }
}
