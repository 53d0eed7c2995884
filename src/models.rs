//! Core data models that flow through the pipeline.
//!
//! An [`IssueRecord`] is what the tracker gives us and what the staging
//! table holds. An [`EnrichedDocument`] is a record plus its embedding,
//! shaped for the search index.

use serde::{Serialize, Serializer};

/// A normalized tracker issue.
///
/// The combined text used for embedding is not a field: it is always
/// derived from `title` and `description` via [`IssueRecord::content`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    pub author: String,
    pub labels: Vec<String>,
}

impl IssueRecord {
    /// Text sent to the embedding service: `"{title}. {description}"`.
    pub fn content(&self) -> String {
        format!("{}. {}", self.title, self.description)
    }

    /// Labels in their staged form (comma-joined).
    pub fn labels_joined(&self) -> String {
        self.labels.join(",")
    }
}

/// Split a staged comma-joined label column back into labels.
pub fn split_labels(joined: &str) -> Vec<String> {
    if joined.is_empty() {
        return Vec::new();
    }
    joined.split(',').map(str::to_string).collect()
}

/// An issue with its embedding, ready for upload.
///
/// Serializes to the flat field mapping the search index expects, with
/// `id` as a string and `labels` comma-joined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDocument {
    pub id: String,
    pub title: String,
    pub description: String,
    pub author: String,
    pub state: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(serialize_with = "serialize_labels")]
    pub labels: Vec<String>,
    pub embedding: Vec<f32>,
}

fn serialize_labels<S: Serializer>(labels: &[String], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&labels.join(","))
}

impl EnrichedDocument {
    /// Pair a record with its embedding.
    ///
    /// Returns `None` for an empty vector: a document without an
    /// embedding is never built.
    pub fn from_record(record: &IssueRecord, embedding: Vec<f32>) -> Option<Self> {
        if embedding.is_empty() {
            return None;
        }
        Some(Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            description: record.description.clone(),
            author: record.author.clone(),
            state: record.state.clone(),
            created_at: record.created_at.clone(),
            updated_at: record.updated_at.clone(),
            labels: record.labels.clone(),
            embedding,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> IssueRecord {
        IssueRecord {
            id: 42,
            title: "Login fails".to_string(),
            description: "Stack trace attached".to_string(),
            state: "opened".to_string(),
            created_at: "2024-03-01T10:00:00.000Z".to_string(),
            updated_at: "2024-03-02T11:30:00.000Z".to_string(),
            author: "Ada Lovelace".to_string(),
            labels: vec!["bug".to_string(), "auth".to_string()],
        }
    }

    #[test]
    fn content_joins_title_and_description() {
        let mut r = record();
        assert_eq!(r.content(), "Login fails. Stack trace attached");

        r.description.clear();
        assert_eq!(r.content(), "Login fails. ");

        r.title = "Renamed".to_string();
        assert_eq!(r.content(), "Renamed. ");
    }

    #[test]
    fn split_labels_handles_empty_column() {
        assert!(split_labels("").is_empty());
        assert_eq!(split_labels("bug,auth"), vec!["bug", "auth"]);
    }

    #[test]
    fn enriched_document_copies_fields_verbatim() {
        let r = record();
        let doc = EnrichedDocument::from_record(&r, vec![0.1, 0.2]).unwrap();
        assert_eq!(doc.id, "42");
        assert_eq!(doc.title, r.title);
        assert_eq!(doc.description, r.description);
        assert_eq!(doc.author, r.author);
        assert_eq!(doc.state, r.state);
        assert_eq!(doc.created_at, r.created_at);
        assert_eq!(doc.updated_at, r.updated_at);
        assert_eq!(doc.labels, r.labels);
    }

    #[test]
    fn enriched_document_requires_embedding() {
        assert!(EnrichedDocument::from_record(&record(), Vec::new()).is_none());
    }

    #[test]
    fn enriched_document_serializes_flat() {
        let doc = EnrichedDocument::from_record(&record(), vec![1.0]).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["id"], "42");
        assert_eq!(json["labels"], "bug,auth");
        assert_eq!(json["embedding"], serde_json::json!([1.0]));
        assert!(json.get("content").is_none());
    }
}
