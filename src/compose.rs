//! Recommendation composer.
//!
//! Feeds the [`RecommendationContext`] back to the completion model as
//! pretty-printed JSON inside the system prompt and returns the model's
//! reply. Any failure becomes the apologetic response text.

use anyhow::Result;
use std::sync::Arc;
use tracing::error;

use nko_assistant_core::models::{apology_text, RecommendationContext};

use crate::completion::{CompletionModel, CompletionRequest};

pub const COMPOSER_PREAMBLE: &str =
    "You are a helpful assistant for finding non-profit organizations (NKO) in Russia.";

const COMPOSER_INSTRUCTIONS: &str = "\
Based on the user's query and the NKO data provided, give a personalized recommendation.
The data includes:
- User's original query
- Extracted city and categories
- Available NKO organizations with their details

Provide a helpful, friendly response that:
1. Acknowledges what the user is looking for
2. Recommends relevant NKO organizations from the data
3. Provides brief descriptions of each recommended organization
4. Suggests how the user can get more information or contact these organizations";

/// Marker preceding the JSON context in the system prompt.
pub const CONTEXT_MARKER: &str = "Context data:\n";

/// Renders the composer system prompt for `context`.
pub fn system_prompt(context: &RecommendationContext) -> Result<String> {
    let data = serde_json::to_string_pretty(context)?;
    Ok(format!(
        "{}\n\n{}\n\n{}{}",
        COMPOSER_PREAMBLE, COMPOSER_INSTRUCTIONS, CONTEXT_MARKER, data
    ))
}

#[derive(Clone)]
pub struct Composer {
    completion: Arc<dyn CompletionModel>,
    reasoning: bool,
}

impl Composer {
    pub fn new(completion: Arc<dyn CompletionModel>, reasoning: bool) -> Self {
        Self {
            completion,
            reasoning,
        }
    }

    /// Produces the recommendation text. Never fails.
    pub async fn compose(&self, context: &RecommendationContext) -> String {
        match self.try_compose(context).await {
            Ok(text) => text,
            Err(e) => {
                error!(error = %e, "Error composing recommendation");
                apology_text(e)
            }
        }
    }

    async fn try_compose(&self, context: &RecommendationContext) -> Result<String> {
        let request = CompletionRequest::new(system_prompt(context)?, context.user_query.clone())
            .with_reasoning(self.reasoning);
        self.completion.complete(request).await
    }
}
