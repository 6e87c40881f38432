//! The AKIN character sheet and its sub-resources.
//!
//! The profile is a singleton upserted as a whole. Abilities, virtues and
//! flaws are separate collections with their own create/update/delete
//! lifecycle and share field names with the backend, so they need no
//! normalization.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::spells::{decode_spells, encode_spells, Spell};
use crate::types::{EntityId, Timestamp};

/// Fixed key of the singleton profile.
pub const AKIN_PROFILE_ID: &str = "akin";

fn default_profile_id() -> EntityId {
    AKIN_PROFILE_ID.to_string()
}

/* --------------------------------------------------------------------------
Profile
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Characteristics {
    pub int: i64,
    pub per: i64,
    pub str: i64,
    pub sta: i64,
    pub pre: i64,
    pub com: i64,
    pub dex: i64,
    pub qik: i64,
}

/// Scores in the five techniques and ten forms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Arts {
    pub creo: i64,
    pub intellego: i64,
    pub muto: i64,
    pub perdo: i64,
    pub rego: i64,
    pub animal: i64,
    pub aquam: i64,
    pub auram: i64,
    pub corpus: i64,
    pub herbam: i64,
    pub ignem: i64,
    pub imaginem: i64,
    pub mentem: i64,
    pub terram: i64,
    pub vim: i64,
}

/// The AKIN profile record.
///
/// `characteristics` and `arts` may arrive as objects or as JSON text;
/// they are always sent back as objects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    #[serde(
        default = "default_profile_id",
        deserialize_with = "crate::serde_util::id"
    )]
    pub id: EntityId,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub house: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default, deserialize_with = "crate::serde_util::json_or_text")]
    pub characteristics: Characteristics,
    #[serde(default, deserialize_with = "crate::serde_util::json_or_text")]
    pub arts: Arts,
    /// JSON-encoded spell list; see [`CharacterProfile::spells`].
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub spells: String,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub notes: String,
    #[serde(default, alias = "created_at", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, alias = "updated_at", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Default for CharacterProfile {
    fn default() -> Self {
        Self {
            id: default_profile_id(),
            name: String::new(),
            house: String::new(),
            age: None,
            characteristics: Characteristics::default(),
            arts: Arts::default(),
            spells: String::new(),
            notes: String::new(),
            created_at: None,
            updated_at: None,
        }
    }
}

impl CharacterProfile {
    /// Decode the spell blob.
    pub fn spells(&self) -> Result<Vec<Spell>, CoreError> {
        decode_spells(&self.spells)
    }

    /// Replace the spell blob with the encoded list.
    pub fn set_spells(&mut self, spells: &[Spell]) {
        self.spells = encode_spells(spells);
    }
}

/* --------------------------------------------------------------------------
Sub-resources
-------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ability {
    #[serde(deserialize_with = "crate::serde_util::id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default)]
    pub value: i64,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// Body of an ability create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityInput {
    pub name: String,
    pub value: i64,
    pub specialty: Option<String>,
}

impl From<&Ability> for AbilityInput {
    fn from(ability: &Ability) -> Self {
        Self {
            name: ability.name.clone(),
            value: ability.value,
            specialty: ability.specialty.clone(),
        }
    }
}

/// A virtue or a flaw; both collections share this shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtueFlaw {
    #[serde(deserialize_with = "crate::serde_util::id")]
    pub id: EntityId,
    pub name: String,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub description: String,
    #[serde(
        default,
        alias = "is_major",
        deserialize_with = "crate::serde_util::flag"
    )]
    pub is_major: bool,
    #[serde(default)]
    pub page: Option<i64>,
}

/// Body of a virtue/flaw create or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtueFlawInput {
    pub name: String,
    pub description: String,
    pub is_major: bool,
    pub page: Option<i64>,
}

impl From<&VirtueFlaw> for VirtueFlawInput {
    fn from(entry: &VirtueFlaw) -> Self {
        Self {
            name: entry.name.clone(),
            description: entry.description.clone(),
            is_major: entry.is_major,
            page: entry.page,
        }
    }
}

/// Which of the two virtue/flaw collections an operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VirtueFlawKind {
    Virtue,
    Flaw,
}

impl VirtueFlawKind {
    /// Path segment of the collection under `/akin`.
    pub fn collection(self) -> &'static str {
        match self {
            VirtueFlawKind::Virtue => "virtues",
            VirtueFlawKind::Flaw => "flaws",
        }
    }
}

/// Everything `GET /akin` returns in one call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AkinSheet {
    #[serde(default)]
    pub profile: Option<CharacterProfile>,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub abilities: Vec<Ability>,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub virtues: Vec<VirtueFlaw>,
    #[serde(default, deserialize_with = "crate::serde_util::null_as_default")]
    pub flaws: Vec<VirtueFlaw>,
}

impl AkinSheet {
    pub fn collection(&self, kind: VirtueFlawKind) -> &[VirtueFlaw] {
        match kind {
            VirtueFlawKind::Virtue => &self.virtues,
            VirtueFlawKind::Flaw => &self.flaws,
        }
    }

    pub fn collection_mut(&mut self, kind: VirtueFlawKind) -> &mut Vec<VirtueFlaw> {
        match kind {
            VirtueFlawKind::Virtue => &mut self.virtues,
            VirtueFlawKind::Flaw => &mut self.flaws,
        }
    }
}
