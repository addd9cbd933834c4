//! Drag-and-drop reorder protocol
//!
//! A small session state machine layered over [`Command::MoveRow`]. The
//! state is a plain value the host passes around, so the protocol is
//! testable without a UI harness. Hovering only updates local state; the
//! document is untouched until the drop.

use serde::{Deserialize, Serialize};

use crate::engine::{Command, Edge, Outcome};
use crate::models::{Document, RowId};
use crate::tree;

/// The candidate target under the pointer and which side of it the drop
/// would land on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hover {
    pub target: RowId,
    pub edge: Edge,
}

/// Drag session state. One row at most is dragged at a time; starting a
/// second drag while one is active is a host bug and is ignored here.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        source: RowId,
        hover: Option<Hover>,
    },
}

impl DragState {
    pub fn new() -> Self {
        DragState::Idle
    }

    /// Idle -> Dragging. Ignored while a drag is already active.
    pub fn pick_up(&mut self, source: RowId) {
        if matches!(self, DragState::Idle) {
            *self = DragState::Dragging {
                source,
                hover: None,
            };
        }
    }

    /// Updates the hovered target and its before/after edge from the
    /// pointer's vertical position relative to the target's midpoint.
    /// Hovering the dragged row itself clears the indicator.
    pub fn hover_over(&mut self, target: RowId, pointer_y: f64, midpoint_y: f64) {
        if let DragState::Dragging { source, hover } = self {
            if *source == target {
                *hover = None;
            } else {
                *hover = Some(Hover {
                    target,
                    edge: Edge::from_pointer(pointer_y, midpoint_y),
                });
            }
        }
    }

    /// Clears the edge indicator when the pointer leaves `target`.
    pub fn hover_leave(&mut self, target: &RowId) {
        if let DragState::Dragging { hover, .. } = self {
            if hover.as_ref().map(|h| &h.target) == Some(target) {
                *hover = None;
            }
        }
    }

    /// Dragging -> Idle on drop. Issues the move and marks the moved row
    /// for the transient "dropped" highlight. Returns `None` when there is
    /// no active drag or no hovered target (equivalent to a cancel).
    pub fn drop_onto(&mut self, doc: &mut Document) -> Option<Outcome> {
        let state = std::mem::take(self);
        match state {
            DragState::Dragging {
                source,
                hover: Some(Hover { target, edge }),
            } => {
                let outcome = doc.apply(Command::MoveRow {
                    source: source.clone(),
                    target,
                    edge,
                });
                if outcome.is_applied() {
                    doc.apply(Command::SetHighlight {
                        id: source,
                        on: true,
                    });
                }
                Some(outcome)
            }
            _ => None,
        }
    }

    /// Dragging -> Idle without issuing any command.
    pub fn cancel(&mut self) {
        *self = DragState::Idle;
    }

    pub fn source(&self) -> Option<&RowId> {
        match self {
            DragState::Dragging { source, .. } => Some(source),
            DragState::Idle => None,
        }
    }

    pub fn hover(&self) -> Option<&Hover> {
        match self {
            DragState::Dragging { hover, .. } => hover.as_ref(),
            DragState::Idle => None,
        }
    }

    /// Ancestor chain of the dragged row (dragged row included), for the
    /// host to mark while the drag is active.
    pub fn marked_path(&self, doc: &Document) -> Vec<RowId> {
        match self.source() {
            Some(source) => tree::path_to(&doc.rows, source).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}
