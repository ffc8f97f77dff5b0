//! Process-wide wiring shared by the HTTP server, MCP stdio and console.

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use nko_assistant_core::directory::NkoDirectory;

use crate::backend::BackendClient;
use crate::completion::{CompletionModel, OpenRouterClient};
use crate::config::Config;
use crate::orchestrator::Orchestrator;
use crate::tools::{ToolContext, ToolRegistry};

/// Long-lived dependencies, built once at startup.
///
/// `completion` is `None` when no provider key is configured; the query
/// surfaces then refuse to run while the tools keep working.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub directory: Arc<dyn NkoDirectory>,
    pub completion: Option<Arc<dyn CompletionModel>>,
    pub tools: Arc<ToolRegistry>,
}

impl AppContext {
    pub fn new(
        config: Config,
        directory: Arc<dyn NkoDirectory>,
        completion: Option<Arc<dyn CompletionModel>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            directory,
            completion,
            tools: Arc::new(ToolRegistry::with_builtins()),
        }
    }

    /// Builds the HTTP backend client and, when a key is present, the
    /// OpenRouter client.
    pub fn from_config(config: Config) -> Result<Self> {
        let directory = BackendClient::new(&config.backend)?;
        let completion = OpenRouterClient::from_config(&config.completion)?;
        match &completion {
            Some(client) => info!(model = client.model_name(), "completion provider configured"),
            None => warn!(
                env = %config.completion.api_key_env,
                "no completion provider key; /query is disabled"
            ),
        }
        let completion = completion.map(|c| Arc::new(c) as Arc<dyn CompletionModel>);
        Ok(Self::new(config, Arc::new(directory), completion))
    }

    pub fn tool_context(&self) -> ToolContext {
        ToolContext::new(self.directory.clone())
    }

    /// Query orchestrator, or `None` without a completion provider.
    pub fn orchestrator(&self) -> Option<Orchestrator> {
        let completion = self.completion.clone()?;
        Some(Orchestrator::new(
            completion,
            self.directory.clone(),
            &self.config,
        ))
    }

    /// Pings the backend once; startup aborts when it is unreachable.
    pub async fn check_backend(&self) -> Result<()> {
        self.directory.ping().await.with_context(|| {
            format!("backend at {} is not reachable", self.config.backend.url)
        })?;
        info!(url = %self.config.backend.url, "backend reachable");
        Ok(())
    }
}
