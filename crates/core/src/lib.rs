//! Domain types for the Tabularium reference library and the AKIN sheet.
//!
//! Holds the UI-facing item shapes, the character sheet records, the spell
//! blob codec, and the normalizer that maps items to and from backend rows.
//! Nothing here performs I/O.

pub mod character;
pub mod error;
pub mod library;
pub mod normalize;
pub mod spells;
pub mod types;

mod serde_util;
