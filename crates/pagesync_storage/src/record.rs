//! Records written to the content store.

use pagesync_codec::Digest;
use serde::{Deserialize, Serialize};

/// Rendered representation attached to a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    /// Rendered HTML.
    pub html: String,
}

/// A normalized record as persisted in the content store.
///
/// `digest` is a deterministic function of `data`; the store compares it
/// against the stored digest to decide whether an upsert changes anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    /// Stable remote identifier.
    pub id: String,
    /// Normalized record data.
    pub data: serde_json::Value,
    /// Fingerprint of `data`.
    pub digest: Digest,
    /// Optional rendered output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rendered: Option<Rendered>,
}

impl StoreRecord {
    /// Creates a record without rendered output.
    pub fn new(id: impl Into<String>, data: serde_json::Value, digest: Digest) -> Self {
        Self {
            id: id.into(),
            data,
            digest,
            rendered: None,
        }
    }

    /// Attaches rendered HTML.
    #[must_use]
    pub fn with_rendered(mut self, html: impl Into<String>) -> Self {
        self.rendered = Some(Rendered { html: html.into() });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rendered_is_omitted_when_absent() {
        let record = StoreRecord::new("prod_1", json!({"name": "Mug"}), Digest::new("abc"));
        let encoded = serde_json::to_value(&record).unwrap();
        assert_eq!(
            encoded,
            json!({"id": "prod_1", "data": {"name": "Mug"}, "digest": "abc"})
        );
    }

    #[test]
    fn with_rendered_sets_html() {
        let record = StoreRecord::new("prod_1", json!({}), Digest::new("abc"))
            .with_rendered("<p>Mug</p>");
        assert_eq!(record.rendered.unwrap().html, "<p>Mug</p>");
    }
}
