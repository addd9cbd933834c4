//! Suggestion provider boundary
//!
//! The edit session can ask an external text-generation service for label
//! completions and for bulk child-row proposals. Calls are best-effort:
//! provider failures resolve to an empty suggestion, never an error into
//! the engine. Responses arrive asynchronously and may outlive the edit
//! session that requested them, so every response is checked against a
//! [`SuggestionTicket`] captured at request time and discarded when stale.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::engine::{ChildSpec, Command, Outcome};
use crate::models::{Document, EditSession, RowId, RowKind};
use crate::tree;

/// Context for a label completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub partial_label: String,
    pub kind: RowKind,
    pub sibling_labels: Vec<String>,
    pub section_title: String,
}

impl CompletionRequest {
    /// Assembles the request context for the row being edited: its current
    /// text, its siblings' labels, and the top-level panel it sits under.
    pub fn for_row(doc: &Document, id: &RowId) -> Option<Self> {
        let row = doc.find(id)?;
        let sibling_labels = tree::find_parent_list(&doc.rows, id)
            .map(|(list, _)| {
                list.iter()
                    .filter(|r| &r.id != id)
                    .map(|r| r.label.clone())
                    .collect()
            })
            .unwrap_or_default();
        let section_title = tree::path_to(&doc.rows, id)
            .and_then(|path| path.first().cloned())
            .and_then(|top| doc.find(&top).map(|r| r.label.clone()))
            .unwrap_or_else(|| doc.title.clone());
        Some(Self {
            partial_label: row.label.clone(),
            kind: row.kind,
            sibling_labels,
            section_title,
        })
    }
}

/// One proposed child row from the bulk generator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildSuggestion {
    pub label: String,
    pub kind: RowKind,
    #[serde(default)]
    pub tooltip: Option<String>,
}

impl From<ChildSuggestion> for ChildSpec {
    fn from(s: ChildSuggestion) -> Self {
        ChildSpec {
            label: s.label,
            kind: s.kind,
            tooltip: s.tooltip,
        }
    }
}

/// External text-suggestion service consumed by the edit session.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// Returns a suffix to append to the partial label, or an empty string
    /// when there is nothing to suggest. Must not repeat the input prefix.
    async fn suggest_completion(&self, request: CompletionRequest) -> String;

    /// Returns zero or more candidate child rows for bulk insertion.
    async fn suggest_children(
        &self,
        parent_label: &str,
        document_title: &str,
    ) -> Vec<ChildSuggestion>;
}

/// Provider that never suggests anything. Useful offline and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSuggestions;

#[async_trait]
impl SuggestionProvider for NoopSuggestions {
    async fn suggest_completion(&self, _request: CompletionRequest) -> String {
        String::new()
    }

    async fn suggest_children(
        &self,
        _parent_label: &str,
        _document_title: &str,
    ) -> Vec<ChildSuggestion> {
        Vec::new()
    }
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    suffix: String,
}

#[derive(Deserialize)]
struct ChildrenResponse {
    #[serde(default)]
    items: Vec<ChildSuggestion>,
}

#[derive(Serialize)]
struct ChildrenRequest<'a> {
    parent_label: &'a str,
    document_title: &'a str,
}

/// HTTP-backed provider posting JSON to a suggestion service.
#[derive(Debug, Clone)]
pub struct HttpSuggestionProvider {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSuggestionProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

// Guard against providers that echo the prefix back.
fn suffix_only(partial: &str, suggestion: String) -> String {
    if !partial.is_empty() {
        if let Some(rest) = suggestion.strip_prefix(partial) {
            return rest.to_string();
        }
    }
    suggestion
}

#[async_trait]
impl SuggestionProvider for HttpSuggestionProvider {
    async fn suggest_completion(&self, request: CompletionRequest) -> String {
        let url = format!("{}/api/suggest/complete", self.base_url);
        let partial = request.partial_label.clone();
        let result: Result<CompletionResponse, reqwest::Error> = async {
            let response = self.http.post(&url).json(&request).send().await?;
            response.error_for_status()?.json().await
        }
        .await;
        match result {
            Ok(body) => suffix_only(&partial, body.suffix),
            Err(e) => {
                tracing::warn!(error = %e, "completion suggestion failed");
                String::new()
            }
        }
    }

    async fn suggest_children(
        &self,
        parent_label: &str,
        document_title: &str,
    ) -> Vec<ChildSuggestion> {
        let url = format!("{}/api/suggest/children", self.base_url);
        let request = ChildrenRequest {
            parent_label,
            document_title,
        };
        let result: Result<ChildrenResponse, reqwest::Error> = async {
            let response = self.http.post(&url).json(&request).send().await?;
            response.error_for_status()?.json().await
        }
        .await;
        match result {
            Ok(body) => body.items,
            Err(e) => {
                tracing::warn!(error = %e, "child suggestion failed");
                Vec::new()
            }
        }
    }
}

/// Snapshot of the edit session a suggestion request was fired for.
/// Compared against the document before a response is applied; any
/// mismatch (row deleted, session closed, a newer session opened) means
/// the response is stale and must be discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionTicket {
    session: EditSession,
}

impl SuggestionTicket {
    /// Captures the current edit session, if any.
    pub fn capture(doc: &Document) -> Option<Self> {
        doc.editing.clone().map(|session| Self { session })
    }

    pub fn row(&self) -> &RowId {
        &self.session.row
    }

    /// True while the originating edit session is still the active one.
    pub fn is_current(&self, doc: &Document) -> bool {
        doc.editing.as_ref() == Some(&self.session)
    }
}

/// Merges a completion suffix into the authored text, or discards it when
/// the originating session is gone. Returns the merged text for the host's
/// input buffer; the document itself is only written on commit.
pub fn accept_completion(
    doc: &Document,
    ticket: &SuggestionTicket,
    partial: &str,
    suffix: &str,
) -> Option<String> {
    if !ticket.is_current(doc) {
        tracing::debug!(row = %ticket.row(), "discarding stale completion");
        return None;
    }
    if suffix.is_empty() {
        return None;
    }
    Some(format!("{partial}{suffix}"))
}

/// Inserts suggested child rows under the ticket's row, or discards them
/// when the session has moved on.
pub fn accept_children(
    doc: &mut Document,
    ticket: &SuggestionTicket,
    items: Vec<ChildSuggestion>,
) -> Option<Outcome> {
    if !ticket.is_current(doc) {
        tracing::debug!(row = %ticket.row(), "discarding stale child suggestions");
        return None;
    }
    if items.is_empty() {
        return None;
    }
    let outcome = doc.apply(Command::AddChildren {
        parent: Some(ticket.row().clone()),
        items: items.into_iter().map(ChildSpec::from).collect(),
    });
    Some(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Command;
    use crate::seed::example_document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_completion_request_context() {
        let doc = example_document();
        let panel = &doc.rows[0];
        let child = panel.children[0].id.clone();
        let request = CompletionRequest::for_row(&doc, &child).unwrap();
        assert_eq!(request.section_title, panel.label);
        assert_eq!(request.sibling_labels.len(), panel.children.len() - 1);
        assert!(!request.sibling_labels.contains(&request.partial_label));
    }

    #[test]
    fn test_suffix_only_strips_echoed_prefix() {
        assert_eq!(suffix_only("Write", "Write docs".to_string()), " docs");
        assert_eq!(suffix_only("Write", " docs".to_string()), " docs");
        assert_eq!(suffix_only("", "anything".to_string()), "anything");
    }

    #[test]
    fn test_ticket_tracks_session() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        doc.apply(Command::BeginEdit { id: id.clone() });
        let ticket = SuggestionTicket::capture(&doc).unwrap();
        assert!(ticket.is_current(&doc));

        // A newer session on the same row invalidates old tickets.
        doc.apply(Command::BeginEdit { id });
        assert!(!ticket.is_current(&doc));
    }

    #[test]
    fn test_stale_completion_is_discarded() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        doc.apply(Command::BeginEdit { id: id.clone() });
        let ticket = SuggestionTicket::capture(&doc).unwrap();

        doc.apply(Command::CancelEdit);
        assert_eq!(accept_completion(&doc, &ticket, "Laun", "ch prep"), None);

        doc.apply(Command::BeginEdit { id });
        let fresh = SuggestionTicket::capture(&doc).unwrap();
        assert_eq!(
            accept_completion(&doc, &fresh, "Laun", "ch prep"),
            Some("Launch prep".to_string())
        );
    }

    #[test]
    fn test_stale_children_are_discarded() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        doc.apply(Command::BeginEdit { id: id.clone() });
        let ticket = SuggestionTicket::capture(&doc).unwrap();
        let items = vec![ChildSuggestion {
            label: "Book venue".to_string(),
            kind: RowKind::Task,
            tooltip: None,
        }];

        // Deleting the originating row must discard the response.
        doc.apply(Command::DeleteSubtree { id });
        let before = doc.row_count();
        assert!(accept_children(&mut doc, &ticket, items.clone()).is_none());
        assert_eq!(doc.row_count(), before);
    }

    #[test]
    fn test_fresh_children_are_inserted() {
        let mut doc = example_document();
        let id = doc.rows[0].id.clone();
        doc.apply(Command::BeginEdit { id: id.clone() });
        let ticket = SuggestionTicket::capture(&doc).unwrap();

        let outcome = accept_children(
            &mut doc,
            &ticket,
            vec![
                ChildSuggestion {
                    label: "Book venue".to_string(),
                    kind: RowKind::Task,
                    tooltip: None,
                },
                ChildSuggestion {
                    label: "Guest list".to_string(),
                    kind: RowKind::Task,
                    tooltip: Some("ask marketing".to_string()),
                },
            ],
        )
        .unwrap();
        assert_eq!(outcome.created.len(), 2);
        for created in &outcome.created {
            assert!(doc.find(created).unwrap().highlighted);
        }
    }

    #[tokio::test]
    async fn test_noop_provider_is_empty() {
        let provider = NoopSuggestions;
        let doc = example_document();
        let request = CompletionRequest::for_row(&doc, &doc.rows[0].id).unwrap();
        assert_eq!(provider.suggest_completion(request).await, "");
        assert!(provider.suggest_children("x", "y").await.is_empty());
    }

    #[tokio::test]
    async fn test_http_provider_swallows_connection_errors() {
        // Nothing listens here; both calls must degrade to empty results.
        let provider = HttpSuggestionProvider::new("http://127.0.0.1:1").unwrap();
        let doc = example_document();
        let request = CompletionRequest::for_row(&doc, &doc.rows[0].id).unwrap();
        assert_eq!(provider.suggest_completion(request).await, "");
        assert!(provider.suggest_children("x", "y").await.is_empty());
    }
}
