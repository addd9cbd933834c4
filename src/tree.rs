//! Read-only tree traversals
//!
//! Pure query functions over a document's row forest: lookup, parent
//! resolution, ancestor paths, search matching, and the flattened visible
//! view the host renders from. None of these mutate the tree.

use crate::models::{Document, Row, RowId, RowKind, TaskStatus};

/// The logical owner of a sibling list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The implicit document root.
    Root,
    Row(RowId),
}

/// Depth-first lookup by id. Ids are unique, so first match is the match.
pub fn find_by_id<'a>(rows: &'a [Row], id: &RowId) -> Option<&'a Row> {
    for row in rows {
        if &row.id == id {
            return Some(row);
        }
        if let Some(found) = find_by_id(&row.children, id) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant of [`find_by_id`].
pub fn find_by_id_mut<'a>(rows: &'a mut [Row], id: &RowId) -> Option<&'a mut Row> {
    for row in rows {
        if &row.id == id {
            return Some(row);
        }
        if let Some(found) = find_by_id_mut(&mut row.children, id) {
            return Some(found);
        }
    }
    None
}

/// Returns the sibling list containing `id` and the id of its owner.
pub fn find_parent_list<'a>(rows: &'a Vec<Row>, id: &RowId) -> Option<(&'a Vec<Row>, Parent)> {
    if rows.iter().any(|r| &r.id == id) {
        return Some((rows, Parent::Root));
    }
    find_owned_list(rows, id)
}

fn find_owned_list<'a>(rows: &'a [Row], id: &RowId) -> Option<(&'a Vec<Row>, Parent)> {
    for row in rows {
        if row.children.iter().any(|c| &c.id == id) {
            return Some((&row.children, Parent::Row(row.id.clone())));
        }
        if let Some(found) = find_owned_list(&row.children, id) {
            return Some(found);
        }
    }
    None
}

/// Mutable variant of [`find_parent_list`], used by the mutation engine to
/// detach and insert rows.
pub fn find_parent_list_mut<'a>(
    rows: &'a mut Vec<Row>,
    id: &RowId,
) -> Option<(&'a mut Vec<Row>, Parent)> {
    if rows.iter().any(|r| &r.id == id) {
        return Some((rows, Parent::Root));
    }
    find_owned_list_mut(rows, id)
}

fn find_owned_list_mut<'a>(rows: &'a mut [Row], id: &RowId) -> Option<(&'a mut Vec<Row>, Parent)> {
    for row in rows {
        if row.children.iter().any(|c| &c.id == id) {
            return Some((&mut row.children, Parent::Row(row.id.clone())));
        }
        if let Some(found) = find_owned_list_mut(&mut row.children, id) {
            return Some(found);
        }
    }
    None
}

/// Ancestor chain from a top-level row down to and including `id`. Used to
/// keep ancestors visually marked during drag interactions.
pub fn path_to(rows: &[Row], id: &RowId) -> Option<Vec<RowId>> {
    for row in rows {
        if &row.id == id {
            return Some(vec![row.id.clone()]);
        }
        if let Some(mut path) = path_to(&row.children, id) {
            path.insert(0, row.id.clone());
            return Some(path);
        }
    }
    None
}

/// True if any descendant of `row` (the row itself excluded) has `kind`.
/// Panels are "trackable" for progress navigation only when they contain
/// at least one task.
pub fn has_descendant_of_kind(row: &Row, kind: RowKind) -> bool {
    row.children
        .iter()
        .any(|child| child.kind == kind || has_descendant_of_kind(child, kind))
}

/// Case-insensitive substring match against the label, tooltip, and link
/// target of `row` or any descendant. Matching on descendants keeps the
/// ancestors of a deep match visible while a search is active.
pub fn matches_search(row: &Row, term: &str) -> bool {
    let needle = term.to_lowercase();
    matches_lowered(row, &needle)
}

fn matches_lowered(row: &Row, needle: &str) -> bool {
    if row.label.to_lowercase().contains(needle) {
        return true;
    }
    if let Some(tooltip) = &row.tooltip {
        if tooltip.to_lowercase().contains(needle) {
            return true;
        }
    }
    if let Some(target) = &row.link_target {
        if target.to_lowercase().contains(needle) {
            return true;
        }
    }
    row.children.iter().any(|c| matches_lowered(c, needle))
}

/// Pre-order flatten of the renderable rows, paired with each row's depth
/// (0 for top-level panels).
///
/// With `search = Some(term)` every row failing [`matches_search`] is
/// pruned and the remaining rows are treated as expanded regardless of
/// their collapse state. Without a search, children of collapsed rows are
/// pruned. Soft-hidden rows are included either way; dimming them is the
/// host's job.
pub fn flatten_visible<'a>(rows: &'a [Row], search: Option<&str>) -> Vec<(&'a Row, usize)> {
    let needle = search.map(str::to_lowercase);
    let mut out = Vec::new();
    collect_visible(rows, needle.as_deref(), 0, &mut out);
    out
}

fn collect_visible<'a>(
    rows: &'a [Row],
    needle: Option<&str>,
    depth: usize,
    out: &mut Vec<(&'a Row, usize)>,
) {
    for row in rows {
        match needle {
            Some(n) => {
                if matches_lowered(row, n) {
                    out.push((row, depth));
                    // Search bypasses manual collapse state.
                    collect_visible(&row.children, needle, depth + 1, out);
                }
            }
            None => {
                out.push((row, depth));
                if row.expanded {
                    collect_visible(&row.children, None, depth + 1, out);
                }
            }
        }
    }
}

/// Active task progress beneath a row: `(done, total)`. Soft-hidden rows
/// and everything beneath them are excluded.
pub fn task_counts(row: &Row) -> (usize, usize) {
    let mut done = 0;
    let mut total = 0;
    count_tasks(&row.children, &mut done, &mut total);
    (done, total)
}

fn count_tasks(rows: &[Row], done: &mut usize, total: &mut usize) {
    for row in rows {
        if !row.visible {
            continue;
        }
        if row.kind == RowKind::Task {
            *total += 1;
            if row.status == TaskStatus::Done {
                *done += 1;
            }
        }
        count_tasks(&row.children, done, total);
    }
}

/// Top-level panels that participate in progress navigation.
pub fn trackable_panels(doc: &Document) -> Vec<&Row> {
    doc.rows
        .iter()
        .filter(|row| row.kind == RowKind::Panel && has_descendant_of_kind(row, RowKind::Task))
        .collect()
}

/// Total number of rows, subtrees included.
pub fn row_count(rows: &[Row]) -> usize {
    rows.iter().map(|r| 1 + row_count(&r.children)).sum()
}
