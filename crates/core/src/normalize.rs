//! Translation between the UI item shape and the backend row shape.
//!
//! The backend calls the studied subject `ability` and the free-text notes
//! `description`; the UI calls them `subject` and `notes`. Everything crossing
//! the boundary goes through [`to_backend_payload`] or [`from_backend_item`],
//! which match exhaustively on the item type so that exactly one
//! type-specific shape is populated on either side.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::library::{
    ItemCommon, ItemType, LabText, LabTextCategory, LibraryItem, LibraryItemDraft, Summae,
    Tractatus,
};
use crate::types::{EntityId, Timestamp};

/// A library row as the backend stores and returns it.
///
/// Every column is always serialized; unset columns go out as `null` so a
/// partial update resets them instead of silently leaving them untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendItem {
    #[serde(
        default,
        deserialize_with = "crate::serde_util::opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<EntityId>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub title: Option<String>,
    pub author: Option<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub ability: Option<String>,
    pub category: Option<LabTextCategory>,
    pub effect: Option<String>,
    pub level: Option<i64>,
    pub quality: Option<i64>,
    #[serde(alias = "lab_total")]
    pub lab_total: Option<i64>,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl BackendItem {
    fn empty(item_type: ItemType) -> Self {
        Self {
            id: None,
            item_type,
            title: None,
            author: None,
            language: None,
            description: None,
            ability: None,
            category: None,
            effect: None,
            level: None,
            quality: None,
            lab_total: None,
            created_at: None,
            updated_at: None,
        }
    }
}

/// Build the backend payload for a create or update request.
pub fn to_backend_payload(draft: &LibraryItemDraft) -> BackendItem {
    let mut row = BackendItem {
        title: draft.title.clone(),
        author: draft.author.clone(),
        language: draft.language.clone(),
        description: draft.notes.clone(),
        ..BackendItem::empty(draft.item_type)
    };

    match draft.item_type {
        ItemType::Summae => {
            row.ability = draft.subject.clone();
            row.level = draft.level;
            row.quality = draft.quality;
        }
        ItemType::Tractatus => {
            row.ability = draft.subject.clone();
            row.quality = draft.quality;
        }
        ItemType::LabText => {
            row.category = draft.category;
            row.effect = draft.effect.clone();
            row.level = draft.level;
            row.lab_total = draft.lab_total;
        }
    }

    row
}

/// Convert a backend row into the UI shape.
pub fn from_backend_item(row: BackendItem) -> LibraryItem {
    let common = ItemCommon {
        id: row.id,
        title: row.title.unwrap_or_default(),
        author: row.author,
        language: row.language,
        notes: row.description,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };

    match row.item_type {
        ItemType::Summae => LibraryItem::Summae(Summae {
            common,
            subject: row.ability,
            level: row.level,
            quality: row.quality,
        }),
        ItemType::Tractatus => LibraryItem::Tractatus(Tractatus {
            common,
            subject: row.ability,
            quality: row.quality,
        }),
        ItemType::LabText => LibraryItem::LabText(LabText {
            common,
            category: row.category,
            effect: row.effect,
            level: row.level,
            lab_total: row.lab_total,
        }),
    }
}

/// Decode one raw backend row and convert it.
pub fn from_backend_value(value: serde_json::Value) -> Result<LibraryItem, CoreError> {
    let row: BackendItem = serde_json::from_value(value).map_err(|source| CoreError::Decode {
        what: "library item",
        source,
    })?;
    Ok(from_backend_item(row))
}

/// Decode a list of raw backend rows, preserving server order.
pub fn from_backend_list(value: serde_json::Value) -> Result<Vec<LibraryItem>, CoreError> {
    let rows: Vec<BackendItem> =
        serde_json::from_value(value).map_err(|source| CoreError::Decode {
            what: "library list",
            source,
        })?;
    Ok(rows.into_iter().map(from_backend_item).collect())
}
