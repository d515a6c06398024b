//! Schema normalization of remote items.

use crate::item::SyncItem;
use serde_json::{Map, Value};
use thiserror::Error;

/// An item that failed schema validation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("item {id} failed schema validation: {message}")]
pub struct NormalizeError {
    /// Id of the offending item.
    pub id: String,
    /// What was wrong.
    pub message: String,
}

impl NormalizeError {
    /// Creates a normalization error.
    pub fn new(id: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            message: message.into(),
        }
    }
}

/// Validates a remote item and maps it to the data that gets stored.
///
/// The returned value is what the digest is computed over, so two items
/// that normalize to the same value are considered unchanged.
pub trait SchemaNormalizer: Send + Sync {
    /// Normalizes one item.
    fn normalize(&self, item: &SyncItem) -> Result<Value, NormalizeError>;
}

/// Stores the item exactly as the remote returned it.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughNormalizer;

impl SchemaNormalizer for PassthroughNormalizer {
    fn normalize(&self, item: &SyncItem) -> Result<Value, NormalizeError> {
        Ok(item.to_value())
    }
}

/// Requires a set of non-null top-level fields, optionally projecting the
/// item down to a field subset.
///
/// `id` and `created` are always kept.
#[derive(Debug, Clone, Default)]
pub struct RequiredFields {
    required: Vec<String>,
    projection: Option<Vec<String>>,
}

impl RequiredFields {
    /// Requires each of `fields` to be present and non-null.
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            required: fields.into_iter().map(Into::into).collect(),
            projection: None,
        }
    }

    /// Keeps only `fields` in the stored data.
    #[must_use]
    pub fn project<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

impl SchemaNormalizer for RequiredFields {
    fn normalize(&self, item: &SyncItem) -> Result<Value, NormalizeError> {
        for field in &self.required {
            match item.field(field) {
                None | Some(Value::Null) => {
                    return Err(NormalizeError::new(
                        &item.id,
                        format!("missing field `{field}`"),
                    ))
                }
                Some(_) => {}
            }
        }

        let Some(projection) = &self.projection else {
            return Ok(item.to_value());
        };

        let mut object = Map::new();
        object.insert("id".into(), Value::String(item.id.clone()));
        if let Some(created) = item.created {
            object.insert("created".into(), Value::from(created));
        }
        for field in projection {
            if let Some(value) = item.payload.get(field) {
                object.insert(field.clone(), value.clone());
            }
        }
        Ok(Value::Object(object))
    }
}
