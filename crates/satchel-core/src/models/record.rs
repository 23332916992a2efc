//! Stored record envelope

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Mint a new time-sortable record id (UUID v7).
///
/// Used for records created locally before the remote authority has seen
/// them; remote-origin records keep whatever id the server assigned.
#[must_use]
pub fn fresh_id() -> String {
    Uuid::now_v7().to_string()
}

/// A domain record as held by the local store.
///
/// The store is schema-agnostic: the full entity document lives in `payload`
/// exactly as the remote API shapes it, and the fields the store indexes on
/// (`updated_at`, `status`, `owner_id`) are promoted out of the payload at
/// construction time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Opaque id, unique within its collection
    pub id: String,
    /// Full entity document
    pub payload: Value,
    /// Last-modified timestamp (unix ms), promoted for indexing
    pub updated_at: i64,
    /// Optional status attribute, promoted for indexing
    pub status: Option<String>,
    /// Optional owner id attribute, promoted for indexing
    pub owner_id: Option<String>,
}

impl StoredRecord {
    /// Build a record from a payload that carries its own string `id` field.
    ///
    /// `fallback_updated_at` is used when the payload has no usable
    /// `updated_at`/`updatedAt` field (typically the ingest time).
    pub fn from_payload(payload: Value, fallback_updated_at: i64) -> Result<Self> {
        let id = payload
            .get("id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ToString::to_string)
            .ok_or_else(|| {
                Error::InvalidInput("record payload must carry a non-empty string 'id'".to_string())
            })?;

        Ok(Self::with_id(id, payload, fallback_updated_at))
    }

    /// Build a record under an explicit id, promoting index fields from the
    /// payload.
    #[must_use]
    pub fn with_id(id: impl Into<String>, payload: Value, fallback_updated_at: i64) -> Self {
        let updated_at = string_or_int_field(&payload, &["updated_at", "updatedAt"])
            .unwrap_or(fallback_updated_at);
        let status = string_field(&payload, &["status"]);
        let owner_id = string_field(&payload, &["owner_id", "ownerId"]);

        Self {
            id: id.into(),
            payload,
            updated_at,
            status,
            owner_id,
        }
    }
}

fn string_field(payload: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find_map(|name| payload.get(name))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}

fn string_or_int_field(payload: &Value, names: &[&str]) -> Option<i64> {
    let value = names.iter().find_map(|name| payload.get(name))?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|text| text.parse().ok()))
}
