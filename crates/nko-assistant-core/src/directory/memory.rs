//! In-memory [`NkoDirectory`] implementation for fixtures and tests.
//!
//! Filtering is declarative: every recognized [`FilterSet`] key maps to
//! exactly one [`Predicate`], predicates are built in a fixed order
//! (city, categories, regex, favorites), and a record is listed when all of
//! them match. Records are kept newest first.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use super::{DirectoryError, NkoDirectory};
use crate::models::{CityRecord, FilterSet, NkoRecord};

/// On-disk fixture layout.
///
/// ```json
/// {
///   "cities": [{ "id": 1, "name": "Казань" }],
///   "nko": [{ "id": 1, "name": "Лапа", "address": "...", "city": "Казань" }],
///   "favorites": { "token-a": [1] }
/// }
/// ```
///
/// When `cities` is omitted it is derived from the records' city names.
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub cities: Vec<CityRecord>,
    #[serde(default)]
    pub nko: Vec<NkoRecord>,
    /// Favorite NKO ids keyed by opaque auth token.
    #[serde(default)]
    pub favorites: HashMap<String, Vec<i64>>,
}

/// One composable filter condition.
#[derive(Debug)]
pub enum Predicate {
    /// Case-insensitive substring of the record's city name.
    City(String),
    /// Record carries at least one of the categories.
    AnyCategory(Vec<String>),
    /// Case-insensitive regex over name or description.
    Pattern(Regex),
    /// Record id is in the caller's favorites.
    Favorites(HashSet<i64>),
}

impl Predicate {
    pub fn matches(&self, record: &NkoRecord) -> bool {
        match self {
            Predicate::City(needle) => record
                .city
                .as_deref()
                .map(|c| c.to_lowercase().contains(needle))
                .unwrap_or(false),
            Predicate::AnyCategory(wanted) => {
                record.categories.iter().any(|c| wanted.contains(c))
            }
            Predicate::Pattern(re) => {
                re.is_match(&record.name)
                    || record
                        .description
                        .as_deref()
                        .map(|d| re.is_match(d))
                        .unwrap_or(false)
            }
            Predicate::Favorites(ids) => ids.contains(&record.id),
        }
    }
}

fn case_insensitive(pattern: &str) -> Result<Regex, DirectoryError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| DirectoryError::InvalidFilter(format!("regex: {}", e)))
}

/// Fixture-backed directory.
#[derive(Debug)]
pub struct InMemoryDirectory {
    records: Vec<NkoRecord>,
    cities: Vec<CityRecord>,
    favorites: HashMap<String, HashSet<i64>>,
}

impl InMemoryDirectory {
    pub fn new(fixture: Fixture) -> Self {
        let mut records = fixture.nko;
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let cities = if fixture.cities.is_empty() {
            derive_cities(&records)
        } else {
            fixture.cities
        };

        let favorites = fixture
            .favorites
            .into_iter()
            .map(|(token, ids)| (token, ids.into_iter().collect()))
            .collect();

        Self {
            records,
            cities,
            favorites,
        }
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Builds the predicate list for `filters`, in fixed order.
    ///
    /// The favorites predicate applies only when `favorite` is true and a
    /// token is present; an unknown token leaves the listing unrestricted.
    pub fn build_predicates(&self, filters: &FilterSet) -> Result<Vec<Predicate>, DirectoryError> {
        let mut predicates = Vec::new();

        if let Some(city) = filters.city.as_deref().filter(|c| !c.trim().is_empty()) {
            predicates.push(Predicate::City(city.to_lowercase()));
        }
        if !filters.categories.is_empty() {
            predicates.push(Predicate::AnyCategory(filters.categories.clone()));
        }
        if let Some(pattern) = filters.regex.as_deref().filter(|r| !r.is_empty()) {
            predicates.push(Predicate::Pattern(case_insensitive(pattern)?));
        }
        if filters.favorite == Some(true) {
            let ids = filters
                .auth_token
                .as_deref()
                .and_then(|token| self.favorites.get(token));
            if let Some(ids) = ids {
                predicates.push(Predicate::Favorites(ids.clone()));
            }
        }

        Ok(predicates)
    }
}

fn derive_cities(records: &[NkoRecord]) -> Vec<CityRecord> {
    let mut seen: Vec<String> = Vec::new();
    for name in records.iter().filter_map(|r| r.city.as_ref()) {
        if !seen.contains(name) {
            seen.push(name.clone());
        }
    }
    seen.sort();
    seen.into_iter()
        .enumerate()
        .map(|(i, name)| CityRecord {
            id: i as i64 + 1,
            name,
        })
        .collect()
}

#[async_trait]
impl NkoDirectory for InMemoryDirectory {
    async fn list_nko(&self, filters: &FilterSet) -> Result<Vec<NkoRecord>, DirectoryError> {
        let predicates = self.build_predicates(filters)?;
        Ok(self
            .records
            .iter()
            .filter(|r| predicates.iter().all(|p| p.matches(r)))
            .cloned()
            .collect())
    }

    async fn get_nko(&self, id: i64) -> Result<NkoRecord, DirectoryError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| DirectoryError::NotFound {
                body: format!("NKO with ID {} not found", id),
            })
    }

    async fn list_cities(&self, regex: Option<&str>) -> Result<Vec<CityRecord>, DirectoryError> {
        let pattern = match regex.filter(|r| !r.is_empty()) {
            Some(r) => Some(case_insensitive(r)?),
            None => None,
        };
        Ok(self
            .cities
            .iter()
            .filter(|c| pattern.as_ref().map(|re| re.is_match(&c.name)).unwrap_or(true))
            .cloned()
            .collect())
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        Ok(())
    }
}
