//! Lenient deserializers for rows coming out of the backend.
//!
//! The backend stores everything in SQLite text/integer columns, so the same
//! logical value can arrive as a string, a number, `null`, or a JSON document
//! encoded as text. These helpers fold those spellings into one Rust type.

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

use crate::types::EntityId;

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Int(i64),
}

impl From<RawId> for EntityId {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Int(n) => n.to_string(),
        }
    }
}

/// Accept an identifier given either as a string or an integer.
pub(crate) fn id<'de, D>(deserializer: D) -> Result<EntityId, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer).map(EntityId::from)
}

/// Like [`id`] but tolerates `null`.
pub(crate) fn opt_id<'de, D>(deserializer: D) -> Result<Option<EntityId>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawId>::deserialize(deserializer)?.map(EntityId::from))
}

/// Treat an explicit `null` the same as a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept `true`/`false` as well as SQLite's `0`/`1`.
pub(crate) fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(b),
        Some(Value::Number(n)) => Ok(n.as_i64().unwrap_or(0) != 0),
        Some(other) => Err(de::Error::custom(format!(
            "expected a boolean flag, got {other}"
        ))),
    }
}

/// Accept a nested object either inline or as JSON-encoded text.
///
/// Blank text and `null` yield `T::default()`.
pub(crate) fn json_or_text<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(T::default()),
        Some(Value::String(text)) if text.trim().is_empty() => Ok(T::default()),
        Some(Value::String(text)) => serde_json::from_str(&text).map_err(de::Error::custom),
        Some(other) => serde_json::from_value(other).map_err(de::Error::custom),
    }
}
