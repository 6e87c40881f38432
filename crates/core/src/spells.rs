//! Hermetic spells and their storage format.
//!
//! Spells have no endpoint of their own. The whole list is JSON-encoded into
//! the character profile's `spells` text column, which the backend treats as
//! opaque.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::EntityId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technique {
    Creo,
    Intellego,
    Muto,
    Perdo,
    Rego,
}

impl Technique {
    pub const ALL: [Technique; 5] = [
        Technique::Creo,
        Technique::Intellego,
        Technique::Muto,
        Technique::Perdo,
        Technique::Rego,
    ];

    /// Two-letter abbreviation used in spell designations.
    pub fn abbreviation(self) -> &'static str {
        match self {
            Technique::Creo => "Cr",
            Technique::Intellego => "In",
            Technique::Muto => "Mu",
            Technique::Perdo => "Pe",
            Technique::Rego => "Re",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Form {
    Animal,
    Aquam,
    Auram,
    Corpus,
    Herbam,
    Ignem,
    Imaginem,
    Mentem,
    Terram,
    Vim,
}

impl Form {
    pub const ALL: [Form; 10] = [
        Form::Animal,
        Form::Aquam,
        Form::Auram,
        Form::Corpus,
        Form::Herbam,
        Form::Ignem,
        Form::Imaginem,
        Form::Mentem,
        Form::Terram,
        Form::Vim,
    ];

    pub fn abbreviation(self) -> &'static str {
        match self {
            Form::Animal => "An",
            Form::Aquam => "Aq",
            Form::Auram => "Au",
            Form::Corpus => "Co",
            Form::Herbam => "He",
            Form::Ignem => "Ig",
            Form::Imaginem => "Im",
            Form::Mentem => "Me",
            Form::Terram => "Te",
            Form::Vim => "Vi",
        }
    }
}

/// One entry of the character's grimoire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spell {
    pub id: EntityId,
    pub name: String,
    pub technique: Technique,
    pub form: Form,
    pub level: i64,
    #[serde(default)]
    pub bonus: Option<String>,
    #[serde(default)]
    pub range: String,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub target: String,
    /// Experience points invested in the spell.
    #[serde(default, alias = "xp")]
    pub exp: i64,
    #[serde(default)]
    pub mastery: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Spell {
    /// Short Hermetic designation, e.g. `CrIg 20`.
    pub fn designation(&self) -> String {
        format!(
            "{}{} {}",
            self.technique.abbreviation(),
            self.form.abbreviation(),
            self.level
        )
    }
}

/// Decode the profile's spell blob. Blank text is an empty grimoire.
pub fn decode_spells(blob: &str) -> Result<Vec<Spell>, CoreError> {
    if blob.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(blob).map_err(|source| CoreError::Decode {
        what: "spell list",
        source,
    })
}

/// Encode spells into the text stored on the profile.
pub fn encode_spells(spells: &[Spell]) -> String {
    serde_json::to_string(spells).expect("spell list is always serialisable")
}
