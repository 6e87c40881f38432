//! Library items as the application sees them.
//!
//! A [`LibraryItem`] is one of three book shapes discriminated by the `type`
//! field. Forms and mutations work on a [`LibraryItemDraft`], the partial,
//! flat shape that a create or update request starts from. The backend's
//! column names are handled separately in [`crate::normalize`].

use std::cmp::Ordering;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

/* --------------------------------------------------------------------------
Discriminants
-------------------------------------------------------------------------- */

/// The `type` discriminant shared by the UI and backend shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    Summae,
    Tractatus,
    #[serde(rename = "Lab Text", alias = "LabText")]
    LabText,
}

impl ItemType {
    /// Wire value of the discriminant.
    pub fn as_str(self) -> &'static str {
        match self {
            ItemType::Summae => "Summae",
            ItemType::Tractatus => "Tractatus",
            ItemType::LabText => "Lab Text",
        }
    }
}

impl std::fmt::Display for ItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a lab text describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabTextCategory {
    Magia,
    #[serde(rename = "Item Encantado", alias = "ItemEncantado")]
    ItemEncantado,
    #[serde(rename = "Script de Iniciação", alias = "ScriptIniciacao")]
    ScriptIniciacao,
}

/* --------------------------------------------------------------------------
Items
-------------------------------------------------------------------------- */

/// Attributes every library item carries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemCommon {
    /// Server-assigned; `None` until the item has been created.
    pub id: Option<EntityId>,
    pub title: String,
    pub author: Option<String>,
    pub language: Option<String>,
    pub notes: Option<String>,
    pub created_at: Option<Timestamp>,
    pub updated_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summae {
    #[serde(flatten)]
    pub common: ItemCommon,
    pub subject: Option<String>,
    pub level: Option<i64>,
    pub quality: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tractatus {
    #[serde(flatten)]
    pub common: ItemCommon,
    pub subject: Option<String>,
    pub quality: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabText {
    #[serde(flatten)]
    pub common: ItemCommon,
    pub category: Option<LabTextCategory>,
    pub effect: Option<String>,
    pub level: Option<i64>,
    pub lab_total: Option<i64>,
}

/// A library entry in its UI shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LibraryItem {
    Summae(Summae),
    Tractatus(Tractatus),
    #[serde(rename = "Lab Text", alias = "LabText")]
    LabText(LabText),
}

impl LibraryItem {
    pub fn item_type(&self) -> ItemType {
        match self {
            LibraryItem::Summae(_) => ItemType::Summae,
            LibraryItem::Tractatus(_) => ItemType::Tractatus,
            LibraryItem::LabText(_) => ItemType::LabText,
        }
    }

    pub fn common(&self) -> &ItemCommon {
        match self {
            LibraryItem::Summae(s) => &s.common,
            LibraryItem::Tractatus(t) => &t.common,
            LibraryItem::LabText(l) => &l.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut ItemCommon {
        match self {
            LibraryItem::Summae(s) => &mut s.common,
            LibraryItem::Tractatus(t) => &mut t.common,
            LibraryItem::LabText(l) => &mut l.common,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.common().id.as_deref()
    }

    pub fn title(&self) -> &str {
        &self.common().title
    }

    /// Subject studied from a summa or tractatus. Lab texts have none.
    pub fn subject(&self) -> Option<&str> {
        match self {
            LibraryItem::Summae(s) => s.subject.as_deref(),
            LibraryItem::Tractatus(t) => t.subject.as_deref(),
            LibraryItem::LabText(_) => None,
        }
    }

    /// Level of a summa or lab text.
    pub fn level(&self) -> Option<i64> {
        match self {
            LibraryItem::Summae(s) => s.level,
            LibraryItem::Tractatus(_) => None,
            LibraryItem::LabText(l) => l.level,
        }
    }

    /// Quality of a summa or tractatus.
    pub fn quality(&self) -> Option<i64> {
        match self {
            LibraryItem::Summae(s) => s.quality,
            LibraryItem::Tractatus(t) => t.quality,
            LibraryItem::LabText(_) => None,
        }
    }

    pub fn effect(&self) -> Option<&str> {
        match self {
            LibraryItem::LabText(l) => l.effect.as_deref(),
            _ => None,
        }
    }

    /// Flatten the item into a draft carrying every field it holds.
    ///
    /// Identity and timestamps are left behind: they belong to the server.
    pub fn to_draft(&self) -> LibraryItemDraft {
        let common = self.common();
        let mut draft = LibraryItemDraft {
            title: Some(common.title.clone()),
            author: common.author.clone(),
            language: common.language.clone(),
            notes: common.notes.clone(),
            ..LibraryItemDraft::new(self.item_type())
        };

        match self {
            LibraryItem::Summae(s) => {
                draft.subject = s.subject.clone();
                draft.level = s.level;
                draft.quality = s.quality;
            }
            LibraryItem::Tractatus(t) => {
                draft.subject = t.subject.clone();
                draft.quality = t.quality;
            }
            LibraryItem::LabText(l) => {
                draft.category = l.category;
                draft.effect = l.effect.clone();
                draft.level = l.level;
                draft.lab_total = l.lab_total;
            }
        }

        draft
    }
}

/* --------------------------------------------------------------------------
Drafts
-------------------------------------------------------------------------- */

/// Partial, UI-shaped item used for create and update requests.
///
/// Only the discriminant is mandatory. Fields that do not apply to the
/// discriminant are ignored when the draft is normalized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryItemDraft {
    #[serde(rename = "type")]
    pub item_type: ItemType,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub category: Option<LabTextCategory>,
    #[serde(default)]
    pub effect: Option<String>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub quality: Option<i64>,
    #[serde(default)]
    pub lab_total: Option<i64>,
}

impl LibraryItemDraft {
    /// An empty draft of the given type.
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            title: None,
            author: None,
            language: None,
            notes: None,
            subject: None,
            category: None,
            effect: None,
            level: None,
            quality: None,
            lab_total: None,
        }
    }

    /// Check the fields the backend refuses to store without.
    pub fn validate(&self) -> Result<(), CoreError> {
        match self.title.as_deref().map(str::trim) {
            Some(title) if !title.is_empty() => Ok(()),
            _ => Err(CoreError::Validation("Title is required".to_string())),
        }
    }
}

/* --------------------------------------------------------------------------
Filtering
-------------------------------------------------------------------------- */

/// Criteria for narrowing the library list.
///
/// The default filter keeps every item. Setting either bound of a range also
/// drops the items that have no value for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryFilter {
    pub item_type: Option<ItemType>,
    pub min_level: Option<i64>,
    pub max_level: Option<i64>,
    pub min_quality: Option<i64>,
    pub max_quality: Option<i64>,
    /// Matched case-insensitively against title, author, notes, subject and
    /// effect. Blank matches everything.
    pub search: String,
}

impl LibraryFilter {
    pub fn matches(&self, item: &LibraryItem) -> bool {
        if self.item_type.is_some_and(|t| t != item.item_type()) {
            return false;
        }
        within(item.level(), self.min_level, self.max_level)
            && within(item.quality(), self.min_quality, self.max_quality)
            && self.matches_search(item)
    }

    fn matches_search(&self, item: &LibraryItem) -> bool {
        let needle = self.search.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let common = item.common();
        [
            Some(common.title.as_str()),
            common.author.as_deref(),
            common.notes.as_deref(),
            item.subject(),
            item.effect(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }

    /// The matching items, newest first.
    pub fn apply(&self, items: &[LibraryItem]) -> Vec<LibraryItem> {
        let mut kept: Vec<LibraryItem> = items
            .iter()
            .filter(|item| self.matches(item))
            .cloned()
            .collect();
        sort_newest_first(&mut kept);
        kept
    }
}

fn within(value: Option<i64>, min: Option<i64>, max: Option<i64>) -> bool {
    if min.is_none() && max.is_none() {
        return true;
    }
    match value {
        Some(v) => !min.is_some_and(|m| v < m) && !max.is_some_and(|m| v > m),
        None => false,
    }
}

/// Order items by creation time, newest first.
///
/// Items with a missing or unreadable `createdAt` follow the dated ones,
/// ordered by title ignoring case. The sort is stable.
pub fn sort_newest_first(items: &mut [LibraryItem]) {
    items.sort_by(|a, b| match (created_at(a), created_at(b)) {
        (Some(a), Some(b)) => b.cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title().to_lowercase().cmp(&b.title().to_lowercase()),
    });
}

/// Creation time as an instant. Accepts RFC 3339 and the SQL
/// `YYYY-MM-DD HH:MM:SS` form (read as UTC).
fn created_at(item: &LibraryItem) -> Option<DateTime<Utc>> {
    let raw = item.common().created_at.as_deref()?.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Some(at.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|at| at.and_utc())
}
