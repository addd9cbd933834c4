//! Shared document handle
//!
//! [`Core`] is the clone-cheap handle the server, CLI, and in-process
//! clients share: a document plus its confirmation gate behind a mutex,
//! with a broadcast channel that fans out update and diagnostic events to
//! watchers (the SSE endpoint, tests, any host UI). Commands execute one
//! at a time to completion; there is no interleaving of mutations.

use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::confirm::{ConfirmGate, Pending};
use crate::engine::{Command, Outcome, Reject};
use crate::models::{Document, RowId, RowKind};
use crate::tree;

/// The mutable state behind the handle.
pub struct Workspace {
    pub document: Document,
    pub confirm: ConfirmGate,
}

/// Broadcast to subscribers after every write. `Rejected` is the
/// non-fatal diagnostic channel for commands that degraded to no-ops.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Updated,
    Rejected { reject: Reject },
}

/// One flattened search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: RowId,
    pub label: String,
    pub kind: RowKind,
    pub depth: usize,
}

#[derive(Clone)]
pub struct Core {
    inner: Arc<Mutex<Workspace>>,
    update_tx: Arc<broadcast::Sender<Event>>,
}

impl Core {
    pub fn new(document: Document) -> Self {
        let (tx, _rx) = broadcast::channel(100);
        Self {
            inner: Arc::new(Mutex::new(Workspace {
                document,
                confirm: ConfirmGate::new(),
            })),
            update_tx: Arc::new(tx),
        }
    }

    // Write access: runs the closure, then notifies watchers.
    fn with_workspace<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Workspace) -> R,
    {
        let mut workspace = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let result = f(&mut workspace);
        let _ = self.update_tx.send(Event::Updated);
        result
    }

    // Read access: no notification.
    fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Workspace) -> R,
    {
        let workspace = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&workspace)
    }

    /// Applies a command to the document, republishing any diagnostic on
    /// the event channel.
    pub fn apply(&self, command: Command) -> Outcome {
        let outcome = self.with_workspace(|ws| ws.document.apply(command));
        if let Some(reject) = &outcome.rejected {
            let _ = self.update_tx.send(Event::Rejected {
                reject: reject.clone(),
            });
        }
        outcome
    }

    /// A point-in-time copy of the document.
    pub fn snapshot(&self) -> Document {
        self.read(|ws| ws.document.clone())
    }

    pub fn request_delete(&self, id: &RowId) -> Option<Pending> {
        self.with_workspace(|ws| {
            let Workspace { document, confirm } = ws;
            confirm.request_delete(document, id).cloned()
        })
    }

    pub fn request_reset(&self, id: &RowId) -> Option<Pending> {
        self.with_workspace(|ws| {
            let Workspace { document, confirm } = ws;
            confirm.request_reset(document, id).cloned()
        })
    }

    /// Executes whatever destructive request is pending, if any.
    pub fn confirm_pending(&self) -> Option<Outcome> {
        self.with_workspace(|ws| {
            let Workspace { document, confirm } = ws;
            confirm.confirm(document)
        })
    }

    pub fn cancel_pending(&self) -> Option<Pending> {
        self.with_workspace(|ws| ws.confirm.cancel())
    }

    pub fn pending(&self) -> Option<Pending> {
        self.read(|ws| ws.confirm.pending().cloned())
    }

    /// Flattened rows matching a search term, with their depth in the
    /// tree for indented rendering.
    pub fn search(&self, term: &str) -> Vec<SearchHit> {
        self.read(|ws| {
            tree::flatten_visible(&ws.document.rows, Some(term))
                .into_iter()
                .map(|(row, depth)| SearchHit {
                    id: row.id.clone(),
                    label: row.label.clone(),
                    kind: row.kind,
                    depth,
                })
                .collect()
        })
    }

    /// Subscribe to update/diagnostic events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.update_tx.subscribe()
    }
}
