//! Core models for the planboard library
//!
//! This module contains the row/document data types that the rest of the
//! crate operates on. The mutation surface lives in [`crate::engine`]; the
//! read-only traversals live in [`crate::tree`].

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier for a row. Globally unique within a document and
/// immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    /// Generates a fresh random id.
    pub fn generate() -> Self {
        let id: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();
        RowId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        RowId(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        RowId(s)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The closed set of row kinds. `Panel` is the only kind expected at the
/// document root (by convention, not structurally enforced).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowKind {
    Panel,
    Task,
    Text,
    Link,
    Comment,
}

impl fmt::Display for RowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RowKind::Panel => "panel",
            RowKind::Task => "task",
            RowKind::Text => "text",
            RowKind::Link => "link",
            RowKind::Comment => "comment",
        };
        f.write_str(s)
    }
}

/// Five-valued task lifecycle. Only meaningful for [`RowKind::Task`] rows;
/// other kinds carry a value but nothing reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    New,
    InProgress,
    Attention,
    Blocked,
    Done,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::New => "new",
            TaskStatus::InProgress => "in progress",
            TaskStatus::Attention => "needs attention",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Done => "done",
        };
        f.write_str(s)
    }
}

impl TaskStatus {
    /// Advances to the next status, wrapping `Done` back to `New`.
    pub fn cycled(self) -> Self {
        match self {
            TaskStatus::New => TaskStatus::InProgress,
            TaskStatus::InProgress => TaskStatus::Attention,
            TaskStatus::Attention => TaskStatus::Blocked,
            TaskStatus::Blocked => TaskStatus::Done,
            TaskStatus::Done => TaskStatus::New,
        }
    }

    pub fn index(self) -> u8 {
        match self {
            TaskStatus::New => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Attention => 2,
            TaskStatus::Blocked => 3,
            TaskStatus::Done => 4,
        }
    }

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(TaskStatus::New),
            1 => Some(TaskStatus::InProgress),
            2 => Some(TaskStatus::Attention),
            3 => Some(TaskStatus::Blocked),
            4 => Some(TaskStatus::Done),
            _ => None,
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

/// One node in the plan tree.
///
/// Sibling order is the order of the owning `Vec<Row>`; the parent of a row
/// is derived by traversal rather than stored on the row, so a move cannot
/// leave a stale parent pointer behind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    pub kind: RowKind,
    /// Display name. May be empty while the row is being authored.
    pub label: String,
    #[serde(default)]
    pub tooltip: Option<String>,
    /// URL target; meaningful only for `Link` rows.
    #[serde(default)]
    pub link_target: Option<String>,
    #[serde(default)]
    pub open_in_new_context: bool,
    /// Soft-hide flag. Hidden rows stay in the tree and still render
    /// (dimmed) but are excluded from active task counts.
    pub visible: bool,
    pub expanded: bool,
    pub status: TaskStatus,
    /// Set iff `status == Done`.
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub media_url: Option<String>,
    #[serde(default)]
    pub media_script: Option<String>,
    /// Carried for display; never enforced by the engine.
    #[serde(default)]
    pub owner: Option<String>,
    /// Transient marker for newly inserted or just-dropped rows. Hosts
    /// clear it once their highlight animation ends.
    #[serde(default)]
    pub highlighted: bool,
    #[serde(default)]
    pub children: Vec<Row>,
}

impl Row {
    /// Creates a row with a fresh id and default flags.
    pub fn new(kind: RowKind, label: impl Into<String>) -> Self {
        Self::with_id(RowId::generate(), kind, label)
    }

    /// Creates a row with an explicit id. Used by seeds and tests; callers
    /// are responsible for keeping literal ids unique.
    pub fn with_id(id: RowId, kind: RowKind, label: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            label: label.into(),
            tooltip: None,
            link_target: None,
            open_in_new_context: false,
            visible: true,
            expanded: true,
            status: TaskStatus::New,
            completed_at: None,
            due_at: None,
            media_url: None,
            media_script: None,
            owner: None,
            highlighted: false,
            children: Vec::new(),
        }
    }

    pub fn is_task(&self) -> bool {
        self.kind == RowKind::Task
    }
}

/// The document-wide single edit session. At most one row is being edited
/// at a time; the generation counter is bumped on every `BeginEdit` and is
/// the staleness token checked by the suggestion boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditSession {
    pub row: RowId,
    pub generation: u64,
}

/// A plan document: a titled forest of rows with an implicit root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    /// Top-level sibling list; expected to contain only `Panel` rows.
    pub rows: Vec<Row>,
    #[serde(default)]
    pub editing: Option<EditSession>,
    #[serde(default)]
    pub(crate) next_generation: u64,
}

impl Document {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            rows: Vec::new(),
            editing: None,
            next_generation: 0,
        }
    }

    /// Looks up a row anywhere in the tree.
    pub fn find(&self, id: &RowId) -> Option<&Row> {
        crate::tree::find_by_id(&self.rows, id)
    }

    /// True if `id` owns the current edit session.
    pub fn is_editing(&self, id: &RowId) -> bool {
        self.editing.as_ref().map(|s| &s.row) == Some(id)
    }

    /// Total row count, subtrees included.
    pub fn row_count(&self) -> usize {
        crate::tree::row_count(&self.rows)
    }

    /// Opens an edit session on `id`, replacing any previous session.
    pub(crate) fn begin_session(&mut self, id: RowId) {
        self.next_generation += 1;
        self.editing = Some(EditSession {
            row: id,
            generation: self.next_generation,
        });
    }
}
