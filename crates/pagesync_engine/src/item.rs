//! Remote items and listing parameters.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Filter key carrying the incremental lower bound.
pub const CREATED_KEY: &str = "created";

/// A record as returned by a remote listing call.
///
/// Only `id` and `created` are understood by the engine; every other field is
/// an entity-specific payload passed through to the schema layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncItem {
    /// Stable unique identifier, also used as the pagination cursor.
    pub id: String,
    /// Creation time in epoch seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<i64>,
    /// Remaining fields.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl SyncItem {
    /// Creates an item with an empty payload.
    pub fn new(id: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            created: Some(created),
            payload: Map::new(),
        }
    }

    /// Adds a payload field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    /// Looks up a field by name, including `id` and `created`.
    pub fn field(&self, key: &str) -> Option<Value> {
        match key {
            "id" => Some(Value::String(self.id.clone())),
            CREATED_KEY => self.created.map(Value::from),
            _ => self.payload.get(key).cloned(),
        }
    }

    /// Reassembles the full JSON object as the remote returned it.
    pub fn to_value(&self) -> Value {
        let mut object = self.payload.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        if let Some(created) = self.created {
            object.insert(CREATED_KEY.to_string(), Value::from(created));
        }
        Value::Object(object)
    }
}

/// Parameters for a single remote listing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ListParams {
    /// Caller filter plus the engine's incremental clause.
    pub filter: BTreeMap<String, Value>,
    /// Maximum items to return in this page.
    pub limit: u32,
    /// Continue after the item with this id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starting_after: Option<String>,
}

impl ListParams {
    /// The `created > W` lower bound, if present.
    pub fn created_after(&self) -> Option<i64> {
        self.filter.get(CREATED_KEY)?.get("gt")?.as_i64()
    }
}

/// One page of a remote listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPage {
    /// Items in remote order.
    pub items: Vec<SyncItem>,
    /// Whether the remote has more items after this page.
    pub has_more: bool,
}

impl ListPage {
    /// Creates a page.
    pub fn new(items: Vec<SyncItem>, has_more: bool) -> Self {
        Self { items, has_more }
    }
}

/// Caller-supplied listing constraints for a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    /// Arbitrary remote filter parameters.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// Maximum items to sync in one pass; `None` is unbounded.
    #[serde(default)]
    pub item_cap: Option<usize>,
    /// Per-collection page size, clamped to the remote ceiling.
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl QueryFilter {
    /// Creates an empty, unbounded filter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Caps the number of items synced per pass.
    #[must_use]
    pub fn with_item_cap(mut self, cap: usize) -> Self {
        self.item_cap = Some(cap);
        self
    }

    /// Overrides the page size.
    #[must_use]
    pub fn with_page_size(mut self, size: u32) -> Self {
        self.page_size = Some(size);
        self
    }

    /// Returns the filter parameters with the `created > watermark` clause.
    ///
    /// A stored watermark replaces any caller-supplied `created` clause.
    pub fn incremental(&self, watermark: Option<i64>) -> BTreeMap<String, Value> {
        let mut params = self.params.clone();
        if let Some(watermark) = watermark {
            params.insert(CREATED_KEY.to_string(), serde_json::json!({ "gt": watermark }));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_deserializes_payload() {
        let item: SyncItem = serde_json::from_value(json!({
            "id": "prod_1",
            "created": 1_700_000_000,
            "name": "Mug",
            "active": true
        }))
        .unwrap();

        assert_eq!(item.id, "prod_1");
        assert_eq!(item.created, Some(1_700_000_000));
        assert_eq!(item.payload.get("name"), Some(&json!("Mug")));
        assert!(!item.payload.contains_key("id"));
    }

    #[test]
    fn item_without_created() {
        let item: SyncItem = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(item.created, None);
        assert_eq!(item.to_value(), json!({"id": "x"}));
    }

    #[test]
    fn to_value_reassembles_object() {
        let item = SyncItem::new("price_1", 42).with_field("unit_amount", 500);
        assert_eq!(
            item.to_value(),
            json!({"id": "price_1", "created": 42, "unit_amount": 500})
        );
        assert_eq!(item.field("created"), Some(json!(42)));
        assert_eq!(item.field("id"), Some(json!("price_1")));
    }

    #[test]
    fn incremental_adds_lower_bound() {
        let filter = QueryFilter::new().with_param("active", true);
        let params = filter.incremental(Some(1_700_000_000));
        assert_eq!(params.get("active"), Some(&json!(true)));
        assert_eq!(params.get("created"), Some(&json!({"gt": 1_700_000_000})));

        let params = ListParams {
            filter: params,
            limit: 100,
            starting_after: None,
        };
        assert_eq!(params.created_after(), Some(1_700_000_000));
    }

    #[test]
    fn incremental_without_watermark_keeps_caller_filter() {
        let filter = QueryFilter::new().with_param("created", json!({"gte": 5}));
        let params = filter.incremental(None);
        assert_eq!(params.get("created"), Some(&json!({"gte": 5})));
    }

    #[test]
    fn watermark_overrides_caller_created_clause() {
        let filter = QueryFilter::new().with_param("created", json!({"gte": 5}));
        let params = filter.incremental(Some(10));
        assert_eq!(params.get("created"), Some(&json!({"gt": 10})));
    }
}
