//! Fallback query cascade.
//!
//! Resolves extracted filters into a record set by trying progressively
//! looser [`FilterSet`]s against an [`NkoDirectory`]:
//!
//! 1. [`Tier::Full`]: city and categories, plus the caller's token.
//! 2. [`Tier::CityOnly`]: only when a city was extracted.
//! 3. [`Tier::Unfiltered`]: the full listing.
//!
//! The first non-empty result wins. A failed call counts as empty for the
//! cascade but is recorded as [`Outcome::Failed`] in the [`Resolution`],
//! so callers can tell "confirmed empty" from "call failed". Candidates
//! are strictly sequential, and a candidate identical to one already tried
//! is skipped.

use serde::Serialize;

use crate::directory::NkoDirectory;
use crate::models::{ExtractedFilters, FilterSet, NkoRecord};

/// Position of a candidate in the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Full,
    CityOnly,
    Unfiltered,
}

/// What one candidate call produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Outcome {
    Found(usize),
    Empty,
    Failed(String),
}

/// One candidate call and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub tier: Tier,
    pub outcome: Outcome,
}

/// Terminal state of the cascade.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// Winning record set; empty if every candidate came back empty or failed.
    pub records: Vec<NkoRecord>,
    /// Tier that produced `records`, or the last tier tried.
    pub tier: Tier,
    pub attempts: Vec<Attempt>,
}

impl Resolution {
    /// Whether any candidate call failed rather than returning empty.
    pub fn had_failures(&self) -> bool {
        self.attempts
            .iter()
            .any(|a| matches!(a.outcome, Outcome::Failed(_)))
    }
}

/// Builds the ordered candidate list for `filters`.
///
/// Without a city the city tier is skipped, so categories alone fall back
/// straight to the unfiltered listing.
/// Duplicate filter sets are dropped, keeping the first occurrence.
pub fn candidates(filters: &ExtractedFilters, auth_token: Option<&str>) -> Vec<(Tier, FilterSet)> {
    let mut list = vec![(Tier::Full, FilterSet::from_extracted(filters, auth_token))];
    if let Some(city) = &filters.city {
        list.push((Tier::CityOnly, FilterSet::city_only(city.clone())));
    }
    list.push((Tier::Unfiltered, FilterSet::unfiltered()));

    let mut unique: Vec<(Tier, FilterSet)> = Vec::with_capacity(list.len());
    for (tier, set) in list {
        if !unique.iter().any(|(_, seen)| *seen == set) {
            unique.push((tier, set));
        }
    }
    unique
}

/// Runs the cascade. Never fails.
pub async fn resolve(
    directory: &dyn NkoDirectory,
    filters: &ExtractedFilters,
    auth_token: Option<&str>,
) -> Resolution {
    let mut attempts = Vec::new();
    let mut last_tier = Tier::Full;

    for (tier, set) in candidates(filters, auth_token) {
        last_tier = tier;
        match directory.list_nko(&set).await {
            Ok(records) if !records.is_empty() => {
                attempts.push(Attempt {
                    tier,
                    outcome: Outcome::Found(records.len()),
                });
                return Resolution {
                    records,
                    tier,
                    attempts,
                };
            }
            Ok(_) => attempts.push(Attempt {
                tier,
                outcome: Outcome::Empty,
            }),
            Err(e) => attempts.push(Attempt {
                tier,
                outcome: Outcome::Failed(e.to_string()),
            }),
        }
    }

    Resolution {
        records: Vec::new(),
        tier: last_tier,
        attempts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::memory::InMemoryDirectory;
    use crate::directory::DirectoryError;
    use crate::models::CityRecord;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Directory that records every filter set and replays scripted results.
    struct ScriptedDirectory {
        replies: Mutex<Vec<Result<Vec<NkoRecord>, DirectoryError>>>,
        calls: Mutex<Vec<FilterSet>>,
    }

    impl ScriptedDirectory {
        fn new(replies: Vec<Result<Vec<NkoRecord>, DirectoryError>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<FilterSet> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl NkoDirectory for ScriptedDirectory {
        async fn list_nko(&self, filters: &FilterSet) -> Result<Vec<NkoRecord>, DirectoryError> {
            self.calls.lock().unwrap().push(filters.clone());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(Vec::new())
            } else {
                replies.remove(0)
            }
        }

        async fn get_nko(&self, _id: i64) -> Result<NkoRecord, DirectoryError> {
            unimplemented!()
        }

        async fn list_cities(
            &self,
            _regex: Option<&str>,
        ) -> Result<Vec<CityRecord>, DirectoryError> {
            unimplemented!()
        }

        async fn ping(&self) -> Result<(), DirectoryError> {
            Ok(())
        }
    }

    fn rec(id: i64, city: &str, category: &str) -> NkoRecord {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("НКО {}", id),
            "address": "",
            "city": city,
            "categories": [category],
            "created_at": format!("2024-01-{:02}T00:00:00", id),
        }))
        .unwrap()
    }

    fn kazan_and_moscow() -> InMemoryDirectory {
        InMemoryDirectory::new(crate::directory::memory::Fixture {
            nko: vec![
                rec(1, "Казань", "пожилые"),
                rec(2, "Казань", "дети"),
                rec(3, "Москва", "животные"),
            ],
            ..Default::default()
        })
    }

    fn filters(city: Option<&str>, categories: &[&str]) -> ExtractedFilters {
        ExtractedFilters {
            city: city.map(str::to_string),
            categories: categories.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_candidates_full_cascade() {
        let c = candidates(&filters(Some("Казань"), &["животные"]), Some("tok"));
        let tiers: Vec<Tier> = c.iter().map(|(t, _)| *t).collect();
        assert_eq!(tiers, vec![Tier::Full, Tier::CityOnly, Tier::Unfiltered]);
        assert_eq!(c[0].1.auth_token.as_deref(), Some("tok"));
        assert_eq!(c[1].1, FilterSet::city_only("Казань"));
        assert_eq!(c[2].1, FilterSet::unfiltered());
    }

    #[test]
    fn test_candidates_categories_without_city_skip_city_tier() {
        let c = candidates(&filters(None, &["животные"]), None);
        let tiers: Vec<Tier> = c.iter().map(|(t, _)| *t).collect();
        assert_eq!(tiers, vec![Tier::Full, Tier::Unfiltered]);
    }

    #[test]
    fn test_candidates_deduplicate() {
        // Nothing extracted and no token: the full set is already unfiltered.
        let c = candidates(&ExtractedFilters::default(), None);
        assert_eq!(c.len(), 1);
        assert_eq!(c[0].0, Tier::Full);

        // City only, no token: the full set equals the city-only set.
        let c = candidates(&filters(Some("Казань"), &[]), None);
        let tiers: Vec<Tier> = c.iter().map(|(t, _)| *t).collect();
        assert_eq!(tiers, vec![Tier::Full, Tier::Unfiltered]);
    }

    #[tokio::test]
    async fn test_full_match_wins() {
        let dir = kazan_and_moscow();
        let res = resolve(&dir, &filters(Some("Казань"), &["дети"]), None).await;
        assert_eq!(res.tier, Tier::Full);
        assert_eq!(res.records.len(), 1);
        assert_eq!(res.records[0].id, 2);
        assert_eq!(res.attempts.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_city_listing() {
        let dir = kazan_and_moscow();
        let res = resolve(&dir, &filters(Some("Казань"), &["животные"]), None).await;
        assert_eq!(res.tier, Tier::CityOnly);
        let ids: Vec<i64> = res.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(
            res.attempts[0],
            Attempt {
                tier: Tier::Full,
                outcome: Outcome::Empty
            }
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_unfiltered_listing() {
        let dir = kazan_and_moscow();
        let res = resolve(&dir, &filters(Some("Омск"), &["животные"]), None).await;
        assert_eq!(res.tier, Tier::Unfiltered);
        assert_eq!(res.records.len(), 3);
        assert_eq!(res.attempts.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_directory_returns_empty() {
        let dir = InMemoryDirectory::new(Default::default());
        let res = resolve(&dir, &filters(Some("Казань"), &["животные"]), None).await;
        assert!(res.records.is_empty());
        assert_eq!(res.tier, Tier::Unfiltered);
        assert!(!res.had_failures());
    }

    #[tokio::test]
    async fn test_failures_count_as_empty() {
        let dir = ScriptedDirectory::new(vec![
            Err(DirectoryError::Transport("connection refused".into())),
            Err(DirectoryError::Status {
                status: 500,
                body: "boom".into(),
            }),
            Ok(vec![rec(7, "Москва", "спорт")]),
        ]);
        let res = resolve(&dir, &filters(Some("Казань"), &["спорт"]), Some("tok")).await;
        assert_eq!(res.tier, Tier::Unfiltered);
        assert_eq!(res.records[0].id, 7);
        assert!(res.had_failures());
        assert_eq!(
            res.attempts[1].outcome,
            Outcome::Failed("HTTP error 500: boom".into())
        );
    }

    #[tokio::test]
    async fn test_all_failures_return_empty() {
        let dir = ScriptedDirectory::new(vec![
            Err(DirectoryError::Transport("down".into())),
            Err(DirectoryError::Transport("down".into())),
        ]);
        let res = resolve(&dir, &filters(None, &["спорт"]), None).await;
        assert!(res.records.is_empty());
        assert_eq!(res.attempts.len(), 2);
    }

    #[tokio::test]
    async fn test_city_tier_drops_token() {
        let dir = ScriptedDirectory::new(vec![]);
        resolve(&dir, &filters(Some("Казань"), &["спорт"]), Some("tok")).await;
        let calls = dir.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].auth_token.as_deref(), Some("tok"));
        assert_eq!(calls[1], FilterSet::city_only("Казань"));
        assert_eq!(calls[2], FilterSet::unfiltered());
    }
}
