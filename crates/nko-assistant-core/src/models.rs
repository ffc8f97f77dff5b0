//! Core data types for the query pipeline.
//!
//! These types flow from an inbound [`Query`] through filter extraction
//! ([`ExtractedFilters`]), backend lookups ([`FilterSet`] → [`NkoRecord`]s),
//! and composition ([`RecommendationContext`]) to the final
//! [`QueryResponse`].

use serde::{Deserialize, Serialize};

/// Default number of records handed to the completion model.
pub const DEFAULT_CONTEXT_RECORDS: usize = 5;

/// Prefix of every apologetic response returned when a cycle cannot
/// produce a recommendation.
pub const APOLOGY_PREFIX: &str = "Извините, произошла ошибка при обработке вашего запроса";

/// Formats the apologetic response text embedding the error detail.
pub fn apology_text(detail: impl std::fmt::Display) -> String {
    format!("{}: {}", APOLOGY_PREFIX, detail)
}

/// A free-text question plus an optional opaque auth token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub text: String,
    pub auth_token: Option<String>,
}

impl Query {
    /// Creates a query. Blank tokens are treated as absent.
    pub fn new(text: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            text: text.into(),
            auth_token: auth_token.filter(|t| !t.trim().is_empty()),
        }
    }
}

/// Filters derived from a query by the completion model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractedFilters {
    pub city: Option<String>,
    pub categories: Vec<String>,
}

impl ExtractedFilters {
    pub fn is_empty(&self) -> bool {
        self.city.is_none() && self.categories.is_empty()
    }
}

/// Parameters of one Backend Search API call (`GET /nko`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub favorite: Option<bool>,
}

impl FilterSet {
    /// The empty filter set: a full, unfiltered listing.
    pub fn unfiltered() -> Self {
        Self::default()
    }

    /// Filters by city only.
    pub fn city_only(city: impl Into<String>) -> Self {
        Self {
            city: Some(city.into()),
            ..Self::default()
        }
    }

    /// City and categories from extraction, plus the caller's token.
    pub fn from_extracted(filters: &ExtractedFilters, auth_token: Option<&str>) -> Self {
        Self {
            city: filters.city.clone(),
            categories: filters.categories.clone(),
            auth_token: auth_token.map(str::to_string),
            ..Self::default()
        }
    }

    /// Encodes the filter set as backend query parameters.
    ///
    /// Empty fields are omitted; each category becomes its own repeated
    /// `category` pair.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(token) = non_blank(&self.auth_token) {
            pairs.push(("jwt_token", token.to_string()));
        }
        if let Some(city) = non_blank(&self.city) {
            pairs.push(("city", city.to_string()));
        }
        if let Some(favorite) = self.favorite {
            pairs.push(("favorite", favorite.to_string()));
        }
        if let Some(regex) = non_blank(&self.regex) {
            pairs.push(("regex", regex.to_string()));
        }
        for category in &self.categories {
            pairs.push(("category", category.clone()));
        }
        pairs
    }

    /// Decodes backend query parameters back into a filter set.
    ///
    /// Unknown keys are ignored. `favorite` must be `true` or `false`.
    pub fn from_query_pairs(
        pairs: &[(String, String)],
    ) -> Result<Self, crate::directory::DirectoryError> {
        let mut filters = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "jwt_token" => filters.auth_token = Some(value.clone()).filter(|v| !v.is_empty()),
                "city" => filters.city = Some(value.clone()).filter(|v| !v.is_empty()),
                "regex" => filters.regex = Some(value.clone()).filter(|v| !v.is_empty()),
                "category" => filters.categories.push(value.clone()),
                "favorite" => {
                    let parsed = match value.to_ascii_lowercase().as_str() {
                        "true" | "1" => true,
                        "false" | "0" => false,
                        other => {
                            return Err(crate::directory::DirectoryError::InvalidFilter(format!(
                                "favorite must be true or false, got '{}'",
                                other
                            )))
                        }
                    };
                    filters.favorite = Some(parsed);
                }
                _ => {}
            }
        }
        Ok(filters)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// An organization record as returned by the backend.
///
/// Fields the backend adds beyond this shape are kept in `extra` so that
/// pass-through tools return the record unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NkoRecord {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub meta: Option<serde_json::Value>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A city known to the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: i64,
    pub name: String,
}

/// Payload embedded into the composer prompt.
#[derive(Debug, Clone, Serialize)]
pub struct RecommendationContext {
    pub user_query: String,
    pub extracted_city: Option<String>,
    pub extracted_categories: Vec<String>,
    /// Total size of the winning record set, before truncation.
    pub nko_count: usize,
    /// At most `max_records` records from the winning record set, never
    /// more than [`DEFAULT_CONTEXT_RECORDS`].
    pub nko_data: Vec<NkoRecord>,
}

impl RecommendationContext {
    pub fn new(
        query: &Query,
        filters: &ExtractedFilters,
        records: &[NkoRecord],
        max_records: usize,
    ) -> Self {
        Self {
            user_query: query.text.clone(),
            extracted_city: filters.city.clone(),
            extracted_categories: filters.categories.clone(),
            nko_count: records.len(),
            nko_data: records
                .iter()
                .take(max_records.min(DEFAULT_CONTEXT_RECORDS))
                .cloned()
                .collect(),
        }
    }
}

/// Final answer to one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
}

impl QueryResponse {
    /// The response returned when a cycle fails outright.
    pub fn apology(detail: impl std::fmt::Display) -> Self {
        Self {
            response: apology_text(detail),
            city: None,
            categories: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> NkoRecord {
        NkoRecord {
            id,
            name: format!("НКО {}", id),
            description: None,
            logo: None,
            address: String::new(),
            city: None,
            latitude: 0.0,
            longitude: 0.0,
            meta: None,
            created_at: None,
            categories: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn test_query_drops_blank_token() {
        assert_eq!(Query::new("q", Some("  ".into())).auth_token, None);
        assert_eq!(
            Query::new("q", Some("abc".into())).auth_token.as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_context_caps_records() {
        let records: Vec<NkoRecord> = (1..=12).map(record).collect();
        let query = Query::new("помощь", None);
        let ctx = RecommendationContext::new(
            &query,
            &ExtractedFilters::default(),
            &records,
            DEFAULT_CONTEXT_RECORDS,
        );
        assert_eq!(ctx.nko_count, 12);
        assert_eq!(ctx.nko_data.len(), 5);
        assert_eq!(ctx.nko_data[0].id, 1);
        assert_eq!(ctx.nko_data[4].id, 5);
    }

    #[test]
    fn test_context_cap_never_exceeds_default() {
        let records: Vec<NkoRecord> = (1..=12).map(record).collect();
        let ctx = RecommendationContext::new(
            &Query::new("всё", None),
            &ExtractedFilters::default(),
            &records,
            12,
        );
        assert_eq!(ctx.nko_count, 12);
        assert_eq!(ctx.nko_data.len(), DEFAULT_CONTEXT_RECORDS);
    }

    #[test]
    fn test_context_keeps_short_record_sets() {
        let records: Vec<NkoRecord> = (1..=2).map(record).collect();
        let ctx = RecommendationContext::new(
            &Query::new("q", None),
            &ExtractedFilters::default(),
            &records,
            DEFAULT_CONTEXT_RECORDS,
        );
        assert_eq!(ctx.nko_count, 2);
        assert_eq!(ctx.nko_data.len(), 2);
    }

    #[test]
    fn test_query_pairs_repeat_categories() {
        let filters = FilterSet {
            city: Some("Казань".into()),
            categories: vec!["животные".into(), "экология".into()],
            auth_token: Some("tok".into()),
            regex: None,
            favorite: Some(true),
        };
        let pairs = filters.query_pairs();
        assert_eq!(
            pairs,
            vec![
                ("jwt_token", "tok".to_string()),
                ("city", "Казань".to_string()),
                ("favorite", "true".to_string()),
                ("category", "животные".to_string()),
                ("category", "экология".to_string()),
            ]
        );
    }

    #[test]
    fn test_unfiltered_has_no_pairs() {
        assert!(FilterSet::unfiltered().query_pairs().is_empty());
    }

    #[test]
    fn test_from_query_pairs() {
        let pairs = vec![
            ("city".to_string(), "Казань".to_string()),
            ("category".to_string(), "животные".to_string()),
            ("category".to_string(), "дети".to_string()),
            ("favorite".to_string(), "false".to_string()),
            ("page".to_string(), "2".to_string()),
        ];
        let filters = FilterSet::from_query_pairs(&pairs).unwrap();
        assert_eq!(filters.city.as_deref(), Some("Казань"));
        assert_eq!(filters.categories, vec!["животные", "дети"]);
        assert_eq!(filters.favorite, Some(false));
        assert_eq!(filters.auth_token, None);
    }

    #[test]
    fn test_from_query_pairs_rejects_bad_favorite() {
        let pairs = vec![("favorite".to_string(), "maybe".to_string())];
        assert!(FilterSet::from_query_pairs(&pairs).is_err());
    }

    #[test]
    fn test_record_keeps_unknown_fields() {
        let json = r#"{"id": 3, "name": "Лапа", "address": "ул. Баумана, 1", "website": "https://lapa.example"}"#;
        let rec: NkoRecord = serde_json::from_str(json).unwrap();
        assert_eq!(rec.extra["website"], "https://lapa.example");
        let back = serde_json::to_value(&rec).unwrap();
        assert_eq!(back["website"], "https://lapa.example");
        assert_eq!(back["categories"], serde_json::json!([]));
    }

    #[test]
    fn test_apology_response_shape() {
        let resp = QueryResponse::apology("boom");
        assert!(resp.response.starts_with(APOLOGY_PREFIX));
        assert!(resp.response.ends_with("boom"));
        assert!(resp.city.is_none());
        assert!(resp.categories.is_empty());
    }
}
