//! Directory abstraction over the NKO backend.
//!
//! The [`NkoDirectory`] trait is the Backend Search API as seen by the
//! query pipeline and the tools. The HTTP implementation lives in the
//! `nko-assistant` crate; [`memory::InMemoryDirectory`] serves fixture data.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.

pub mod memory;

use async_trait::async_trait;

use crate::models::{CityRecord, FilterSet, NkoRecord};

/// Classified failure of a directory call.
///
/// Callers that only need "records or nothing" treat every variant as an
/// empty result; tools format each variant differently.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    /// The backend answered 404.
    #[error("HTTP error 404: {body}")]
    NotFound { body: String },

    /// The backend answered with another non-success status.
    #[error("HTTP error {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (connect, timeout, ...).
    #[error("{0}")]
    Transport(String),

    /// The response body did not have the expected shape.
    #[error("invalid response: {0}")]
    Decode(String),

    /// A filter value was rejected before any lookup ran.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the backend itself answered with an error status.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Status { .. })
    }
}

/// The Backend Search API.
#[async_trait]
pub trait NkoDirectory: Send + Sync {
    /// `GET /nko`: organizations matching `filters`, newest first.
    async fn list_nko(&self, filters: &FilterSet) -> Result<Vec<NkoRecord>, DirectoryError>;

    /// `GET /nko/{id}`.
    async fn get_nko(&self, id: i64) -> Result<NkoRecord, DirectoryError>;

    /// `GET /city`, optionally filtered by a case-insensitive regex on the name.
    async fn list_cities(&self, regex: Option<&str>) -> Result<Vec<CityRecord>, DirectoryError>;

    /// `GET /ping`: liveness probe.
    async fn ping(&self) -> Result<(), DirectoryError>;
}
