//! Planboard library crate
//!
//! Planboard is a hierarchical plan document engine: a typed row tree with a
//! command-based mutation surface, a drag-and-drop reorder state machine,
//! two-phase confirmation for destructive operations, and a pluggable
//! suggestion boundary. The [`Core`] wraps a document for shared-state hosts
//! (the HTTP server, the CLI); the engine itself is plain synchronous code.

pub mod api;
pub mod cli;
pub mod confirm;
pub mod core;
pub mod drag;
pub mod engine;
pub mod models;
pub mod seed;
pub mod suggest;
pub mod tree;

pub use crate::confirm::{ConfirmGate, DeleteClass, Pending};
pub use crate::core::{Core, Event, SearchHit};
pub use crate::drag::DragState;
pub use crate::engine::{Command, Edge, Outcome, Reject, RowPatch};
pub use crate::models::{Document, EditSession, Row, RowId, RowKind, TaskStatus};
