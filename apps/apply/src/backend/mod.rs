//! Job board backend: every call the application workflow makes to the REST
//! backend goes through `JobBoardBackend`.
//!
//! The workflow receives an `Arc<dyn JobBoardBackend>` instead of reaching
//! for shared globals, so tests swap in an in-memory double.
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

use crate::models::application::{ApplicationPayload, ApplicationSummary};
use crate::models::job::Job;
use crate::models::profile::Profile;

pub mod http;

#[cfg(test)]
pub mod fake;

pub use http::HttpBackend;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Raw bytes plus the content type the server reported, if any.
#[derive(Debug, Clone)]
pub struct FetchedBinary {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait JobBoardBackend: Send + Sync {
    async fn get_profile(&self) -> Result<Profile, BackendError>;

    async fn get_job(&self, job_id: &str) -> Result<Job, BackendError>;

    /// Answered from the locally cached application list.
    async fn has_applied(&self, job_id: &str) -> Result<bool, BackendError>;

    async fn create_application(
        &self,
        job_id: &str,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationSummary, BackendError>;

    async fn fetch_binary(&self, url: &str) -> Result<FetchedBinary, BackendError>;
}
