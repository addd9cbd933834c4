//! Two-phase confirmation gating
//!
//! Destructive or semantically lossy commands (delete a subtree, reset a
//! done task) go through a Request -> Confirm/Cancel gate. Requesting
//! captures the target and a classification used to pick the warning copy;
//! nothing touches the document until the confirm step. The engine itself
//! deletes unconditionally, so routing through the gate is a caller
//! contract, not something the engine can detect.

use serde::{Deserialize, Serialize};

use crate::engine::{Command, Outcome};
use crate::models::{Document, RowId, TaskStatus};

/// Why the delete warrants a warning. Selected at request time and used
/// only to choose the message shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteClass {
    HasChildren,
    ActiveTask,
    Plain,
}

/// A captured destructive request awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Pending {
    Delete { id: RowId, class: DeleteClass },
    Reset { id: RowId, label: String },
}

impl Pending {
    /// Warning copy for the host to display.
    pub fn message(&self) -> String {
        match self {
            Pending::Delete { class, .. } => match class {
                DeleteClass::HasChildren => {
                    "This row has children; deleting it removes everything beneath it.".to_string()
                }
                DeleteClass::ActiveTask => {
                    "This task is in progress; deleting it discards its status.".to_string()
                }
                DeleteClass::Plain => "Delete this row?".to_string(),
            },
            Pending::Reset { label, .. } => {
                format!("Reset \"{label}\"? Its completion timestamp will be discarded.")
            }
        }
    }
}

/// Holds at most one pending destructive request. A new request replaces
/// the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfirmGate {
    pending: Option<Pending>,
}

impl ConfirmGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a delete request for `id`. Returns `None` (and stays clear)
    /// when the row does not exist.
    pub fn request_delete(&mut self, doc: &Document, id: &RowId) -> Option<&Pending> {
        let row = doc.find(id)?;
        let class = if !row.children.is_empty() {
            DeleteClass::HasChildren
        } else if row.is_task() && row.status != TaskStatus::New {
            DeleteClass::ActiveTask
        } else {
            DeleteClass::Plain
        };
        self.pending = Some(Pending::Delete {
            id: id.clone(),
            class,
        });
        self.pending.as_ref()
    }

    /// Opens a reset request for a task, capturing its label for the
    /// warning copy. Returns `None` for missing rows and non-tasks.
    pub fn request_reset(&mut self, doc: &Document, id: &RowId) -> Option<&Pending> {
        let row = doc.find(id)?;
        if !row.is_task() {
            return None;
        }
        self.pending = Some(Pending::Reset {
            id: id.clone(),
            label: row.label.clone(),
        });
        self.pending.as_ref()
    }

    /// Executes the pending request against the document. Returns `None`
    /// when nothing is pending.
    pub fn confirm(&mut self, doc: &mut Document) -> Option<Outcome> {
        let pending = self.pending.take()?;
        let outcome = match pending {
            Pending::Delete { id, .. } => doc.apply(Command::DeleteSubtree { id }),
            Pending::Reset { id, .. } => doc.apply(Command::ResetTask { id }),
        };
        Some(outcome)
    }

    /// Discards the pending request without touching the document.
    pub fn cancel(&mut self) -> Option<Pending> {
        self.pending.take()
    }

    pub fn pending(&self) -> Option<&Pending> {
        self.pending.as_ref()
    }
}
