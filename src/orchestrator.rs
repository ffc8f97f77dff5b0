//! Query orchestrator.
//!
//! One cycle per query, strictly linear:
//!
//! ```text
//! received → extracted → resolved → composed → returned
//! ```
//!
//! Extraction, resolution and composition each degrade instead of failing,
//! so a cycle always yields a [`QueryResponse`]. The cycle runs on its own
//! task; if it panics, the panic is caught here and turned into the same
//! apologetic response the composer uses.

use std::sync::Arc;
use tracing::{error, info, warn};

use nko_assistant_core::directory::NkoDirectory;
use nko_assistant_core::fallback;
use nko_assistant_core::models::{Query, QueryResponse, RecommendationContext};

use crate::completion::CompletionModel;
use crate::compose::Composer;
use crate::config::Config;
use crate::extract::Extractor;

#[derive(Clone)]
pub struct Orchestrator {
    extractor: Extractor,
    composer: Composer,
    directory: Arc<dyn NkoDirectory>,
    max_context_records: usize,
}

impl Orchestrator {
    pub fn new(
        completion: Arc<dyn CompletionModel>,
        directory: Arc<dyn NkoDirectory>,
        config: &Config,
    ) -> Self {
        Self {
            extractor: Extractor::new(completion.clone()),
            composer: Composer::new(completion, config.completion.reasoning),
            directory,
            max_context_records: config.query.max_context_records,
        }
    }

    /// Answers one query. Never fails.
    pub async fn answer(&self, query: Query) -> QueryResponse {
        let this = self.clone();
        match tokio::spawn(async move { this.run_cycle(query).await }).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Error processing user query");
                QueryResponse::apology(e)
            }
        }
    }

    async fn run_cycle(&self, query: Query) -> QueryResponse {
        let filters = self.extractor.extract(&query.text).await;

        let resolution = fallback::resolve(
            self.directory.as_ref(),
            &filters,
            query.auth_token.as_deref(),
        )
        .await;
        if resolution.had_failures() {
            warn!(attempts = ?resolution.attempts, "backend calls failed during fallback");
        }
        info!(
            city = ?filters.city,
            categories = ?filters.categories,
            tier = ?resolution.tier,
            records = resolution.records.len(),
            "resolved query"
        );

        let context = RecommendationContext::new(
            &query,
            &filters,
            &resolution.records,
            self.max_context_records,
        );
        let text = self.composer.compose(&context).await;

        QueryResponse {
            response: text,
            city: filters.city,
            categories: filters.categories,
        }
    }
}
