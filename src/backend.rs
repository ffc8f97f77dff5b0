//! HTTP client for the NKO backend.
//!
//! Implements [`NkoDirectory`] over the backend's REST API:
//!
//! | Method | Path | Used by |
//! |--------|------|---------|
//! | `GET` | `/nko` | fallback cascade, `get_nko_list` tool |
//! | `GET` | `/nko/{id}` | `get_nko_by_id` tool |
//! | `GET` | `/city` | `get_cities` tool |
//! | `GET` | `/ping` | startup liveness check |
//!
//! One `reqwest::Client` is built per `BackendClient` and reused for every
//! call; all calls share the configured timeout (30 s by default).

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error};

use nko_assistant_core::directory::{DirectoryError, NkoDirectory};
use nko_assistant_core::models::{CityRecord, FilterSet, NkoRecord};

use crate::config::BackendConfig;

pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
}

impl BackendClient {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&'static str, String)],
    ) -> Result<T, DirectoryError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, params = query.len(), "backend request");

        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(if status.as_u16() == 404 {
                DirectoryError::NotFound { body }
            } else {
                DirectoryError::Status {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl NkoDirectory for BackendClient {
    async fn list_nko(&self, filters: &FilterSet) -> Result<Vec<NkoRecord>, DirectoryError> {
        self.get_json("/nko", &filters.query_pairs())
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching NKO list"))
    }

    async fn get_nko(&self, id: i64) -> Result<NkoRecord, DirectoryError> {
        self.get_json(&format!("/nko/{}", id), &[])
            .await
            .inspect_err(|e| error!(nko_id = id, error = %e, "Error fetching NKO by ID"))
    }

    async fn list_cities(&self, regex: Option<&str>) -> Result<Vec<CityRecord>, DirectoryError> {
        let mut params = Vec::new();
        if let Some(r) = regex.filter(|r| !r.is_empty()) {
            params.push(("regex", r.to_string()));
        }
        self.get_json("/city", &params)
            .await
            .inspect_err(|e| error!(error = %e, "Error fetching cities"))
    }

    async fn ping(&self) -> Result<(), DirectoryError> {
        let url = format!("{}/ping", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| DirectoryError::Transport(e.to_string()))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(DirectoryError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}
