//! Filter extraction from free-text queries.
//!
//! Two independent completion calls run concurrently: one asks for the
//! city, the other for a JSON array of categories. Replies are parsed by
//! [`nko_assistant_core::extract`]. A failed call degrades to "no city" or
//! "no categories" and never aborts the cycle.

use std::sync::Arc;
use tracing::{debug, warn};

use nko_assistant_core::extract::{parse_categories_reply, parse_city_reply};
use nko_assistant_core::models::ExtractedFilters;

use crate::completion::{CompletionModel, CompletionRequest};

pub const CITY_PROMPT: &str = "Extract the city name from the user's query. \
Return only the city name in Russian, or 'null' if no city is mentioned.";

pub const CATEGORIES_PROMPT: &str = "Extract NKO categories from the user's query. \
Return a JSON array of category names in Russian, or an empty array if no categories are mentioned.";

#[derive(Clone)]
pub struct Extractor {
    completion: Arc<dyn CompletionModel>,
}

impl Extractor {
    pub fn new(completion: Arc<dyn CompletionModel>) -> Self {
        Self { completion }
    }

    pub async fn extract(&self, query: &str) -> ExtractedFilters {
        let (city, categories) = tokio::join!(self.city(query), self.categories(query));
        debug!(?city, ?categories, "extracted filters");
        ExtractedFilters { city, categories }
    }

    async fn city(&self, query: &str) -> Option<String> {
        match self
            .completion
            .complete(CompletionRequest::new(CITY_PROMPT, query))
            .await
        {
            Ok(reply) => parse_city_reply(&reply),
            Err(e) => {
                warn!(error = %e, "Error extracting city from query");
                None
            }
        }
    }

    async fn categories(&self, query: &str) -> Vec<String> {
        match self
            .completion
            .complete(CompletionRequest::new(CATEGORIES_PROMPT, query))
            .await
        {
            Ok(reply) => parse_categories_reply(&reply),
            Err(e) => {
                warn!(error = %e, "Error extracting categories from query");
                Vec::new()
            }
        }
    }
}
