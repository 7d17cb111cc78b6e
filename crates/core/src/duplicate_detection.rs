//! Destination duplicate detection: identity keys and the preloaded index.
//!
//! A destination's identity is its English name (case-folded, whitespace
//! collapsed) plus its coordinates rounded to six decimal places. The index
//! is built once per run from the existing store and is read-only after.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::DbId;

/// Coordinate precision used in identity keys (~0.1 m).
pub const COORDINATE_DECIMALS: usize = 6;

/// A destination already present in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExistingDestination {
    pub id: DbId,
    pub name_en: String,
    pub name_th: String,
    pub lat: f64,
    pub lng: f64,
}

/// Identity of the stored record a row collides with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingMatch {
    pub id: DbId,
    pub name_en: String,
    pub name_th: String,
}

impl From<&ExistingDestination> for ExistingMatch {
    fn from(d: &ExistingDestination) -> Self {
        Self {
            id: d.id,
            name_en: d.name_en.clone(),
            name_th: d.name_th.clone(),
        }
    }
}

/// Lowercase, trim, and collapse internal whitespace runs to one space.
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Build the identity key for a name and coordinate pair.
pub fn identity_key(name_en: &str, lat: f64, lng: f64) -> String {
    // Adding 0.0 folds -0.0 into 0.0 so both print the same way.
    format!(
        "{}|{:.prec$}|{:.prec$}",
        normalize_name(name_en),
        lat + 0.0,
        lng + 0.0,
        prec = COORDINATE_DECIMALS
    )
}

/// Read-only lookup of existing destinations by identity key.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    entries: HashMap<String, ExistingMatch>,
}

impl DuplicateIndex {
    /// Build an index from stored destinations. On key collisions inside the
    /// store the lowest id wins, so lookups are deterministic.
    pub fn from_existing<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = ExistingDestination>,
    {
        let mut entries: HashMap<String, ExistingMatch> = HashMap::new();
        for dest in existing {
            let key = identity_key(&dest.name_en, dest.lat, dest.lng);
            let candidate = ExistingMatch::from(&dest);
            entries
                .entry(key)
                .and_modify(|current| {
                    if candidate.id < current.id {
                        *current = candidate.clone();
                    }
                })
                .or_insert(candidate);
        }
        Self { entries }
    }

    /// Look up a row's identity.
    pub fn find(&self, name_en: &str, lat: f64, lng: f64) -> Option<&ExistingMatch> {
        self.get(&identity_key(name_en, lat, lng))
    }

    /// Look up an already computed identity key.
    pub fn get(&self, key: &str) -> Option<&ExistingMatch> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn existing(id: DbId, name: &str, lat: f64, lng: f64) -> ExistingDestination {
        ExistingDestination {
            id,
            name_en: name.to_string(),
            name_th: format!("th-{name}"),
            lat,
            lng,
        }
    }

    #[test]
    fn normalize_collapses_case_and_whitespace() {
        assert_eq!(normalize_name("  Wat   ARUN\t"), "wat arun");
        assert_eq!(normalize_name("wat arun"), "wat arun");
    }

    #[test]
    fn match_is_case_and_whitespace_insensitive() {
        let index = DuplicateIndex::from_existing([existing(7, "Wat Arun", 13.7437, 100.4889)]);
        let hit = index.find("  wat   arun ", 13.7437, 100.4889).unwrap();
        assert_eq!(hit.id, 7);
        assert_eq!(hit.name_th, "th-Wat Arun");
    }

    #[test]
    fn different_coordinates_do_not_match() {
        let index = DuplicateIndex::from_existing([existing(7, "Wat Arun", 13.7437, 100.4889)]);
        assert!(index.find("Wat Arun", 13.7438, 100.4889).is_none());
    }

    #[test]
    fn sub_precision_noise_still_matches() {
        let index = DuplicateIndex::from_existing([existing(1, "Siam Paragon", 13.746, 100.535)]);
        assert!(index.find("Siam Paragon", 13.746_000_000_1, 100.535).is_some());
    }

    #[test]
    fn lowest_id_wins_on_store_collisions() {
        let index = DuplicateIndex::from_existing([
            existing(9, "Lumphini Park", 13.7314, 100.5414),
            existing(3, "LUMPHINI PARK", 13.7314, 100.5414),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.find("lumphini park", 13.7314, 100.5414).unwrap().id, 3);
    }

    #[test]
    fn empty_index() {
        let index = DuplicateIndex::default();
        assert!(index.is_empty());
        assert!(index.find("anything", 13.7, 100.5).is_none());
    }
}
