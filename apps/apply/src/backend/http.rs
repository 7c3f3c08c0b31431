//! REST implementation of `JobBoardBackend` over reqwest.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{BackendError, FetchedBinary, JobBoardBackend};
use crate::models::application::{ApplicationPayload, ApplicationSummary};
use crate::models::job::Job;
use crate::models::profile::Profile;

const PROFILE_ENDPOINT: &str = "/api/profile";
const APPLICATIONS_ENDPOINT: &str = "/api/applications";

/// How long the applied-jobs list is trusted before `has_applied` reloads it.
pub const DEFAULT_APPLIED_CACHE_TTL: Duration = Duration::from_secs(60);

/// Job ids the applicant has applied to, as last loaded from the backend
/// plus any tentative marks made since.
struct AppliedCache {
    job_ids: HashSet<String>,
    loaded_at: Instant,
}

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    api_token: Option<String>,
    cache_ttl: Duration,
    /// `None` until first loaded.
    applied: Arc<RwLock<Option<AppliedCache>>>,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let raw = base_url.into();
        let base_url = Url::parse(raw.trim_end_matches('/'))
            .map_err(|e| BackendError::InvalidUrl(format!("{raw}: {e}")))?;
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url,
            api_token,
            cache_ttl: DEFAULT_APPLIED_CACHE_TTL,
            applied: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// Fetches the applicant's applications and refreshes the local cache.
    pub async fn list_applications(&self) -> Result<Vec<ApplicationSummary>, BackendError> {
        let applications: Vec<ApplicationSummary> =
            self.get_json(&self.endpoint(APPLICATIONS_ENDPOINT)).await?;

        *self.applied.write().await = Some(AppliedCache {
            job_ids: applications.iter().map(|a| a.job_id.clone()).collect(),
            loaded_at: Instant::now(),
        });

        debug!("Cached {} existing applications", applications.len());
        Ok(applications)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.authorize(self.client.request(method, url))
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, BackendError> {
        let response = self.request(Method::GET, url).send().await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// Resolves `url` against the backend base URL unless it is already absolute.
    fn resolve_url(&self, url: &str) -> Result<Url, BackendError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            return Url::parse(url).map_err(|e| BackendError::InvalidUrl(format!("{url}: {e}")));
        }
        self.base_url
            .join(url)
            .map_err(|e| BackendError::InvalidUrl(format!("{url}: {e}")))
    }

    fn is_backend_origin(&self, url: &Url) -> bool {
        url.origin() == self.base_url.origin()
    }

    /// Tentatively records `job_id` as applied. Returns true when this call
    /// added it, so a failed submit knows whether to roll back.
    async fn mark_applied(&self, job_id: &str) -> bool {
        match self.applied.write().await.as_mut() {
            Some(cache) => cache.job_ids.insert(job_id.to_string()),
            None => false,
        }
    }

    async fn unmark_applied(&self, job_id: &str) {
        if let Some(cache) = self.applied.write().await.as_mut() {
            cache.job_ids.remove(job_id);
        }
    }

    async fn post_application(
        &self,
        job_id: &str,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationSummary, BackendError> {
        let mut form = Form::new()
            .text("cover_letter", payload.cover_letter().to_string())
            .text("skills", serde_json::to_string(payload.skills())?)
            .text("match_score", payload.match_score().to_string())
            .text(
                "additional_info",
                serde_json::to_string(payload.additional_info())?,
            );

        if let Some(resume) = payload.resume() {
            let part = Part::bytes(resume.bytes.to_vec())
                .file_name(resume.file_name.clone())
                .mime_str(&resume.content_type)?;
            form = form.part("resume", part);
        }

        let url = self.endpoint(&format!("/api/jobs/{job_id}/applications"));
        let response = self
            .request(Method::POST, &url)
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response).await?;

        // Any 2xx means the application exists; the body only adds a status.
        let status = response
            .text()
            .await
            .ok()
            .and_then(|body| serde_json::from_str::<serde_json::Value>(&body).ok())
            .and_then(|body| body.get("status")?.as_str().map(str::to_string));

        Ok(ApplicationSummary {
            job_id: job_id.to_string(),
            status,
        })
    }
}

#[async_trait]
impl JobBoardBackend for HttpBackend {
    async fn get_profile(&self) -> Result<Profile, BackendError> {
        self.get_json(&self.endpoint(PROFILE_ENDPOINT)).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, BackendError> {
        self.get_json(&self.endpoint(&format!("/api/jobs/{job_id}")))
            .await
    }

    async fn has_applied(&self, job_id: &str) -> Result<bool, BackendError> {
        if let Some(cache) = self.applied.read().await.as_ref() {
            if cache.loaded_at.elapsed() < self.cache_ttl {
                return Ok(cache.job_ids.contains(job_id));
            }
        }
        let applications = self.list_applications().await?;
        Ok(applications.iter().any(|a| a.job_id == job_id))
    }

    async fn create_application(
        &self,
        job_id: &str,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationSummary, BackendError> {
        let tentative = self.mark_applied(job_id).await;

        match self.post_application(job_id, payload).await {
            Ok(summary) => {
                info!("Application for job {job_id} accepted by backend");
                Ok(summary)
            }
            Err(e) => {
                if tentative {
                    self.unmark_applied(job_id).await;
                    debug!("Rolled back tentative applied mark for job {job_id}");
                }
                Err(e)
            }
        }
    }

    /// The bearer token is only sent when `url` shares the backend's origin.
    async fn fetch_binary(&self, url: &str) -> Result<FetchedBinary, BackendError> {
        let url = self.resolve_url(url)?;
        let builder = self.client.get(url.clone());
        let builder = if self.is_backend_origin(&url) {
            self.authorize(builder)
        } else {
            builder
        };
        let response = check_status(builder.send().await?).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await?;

        debug!("Fetched {} bytes from {}", bytes.len(), url);
        Ok(FetchedBinary {
            bytes,
            content_type,
        })
    }
}

/// Maps non-success responses onto `BackendError`, keeping the body as the message.
async fn check_status(response: Response) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    warn!("Backend returned {status} for {url}: {body}");

    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(url));
    }
    Err(BackendError::Api {
        status: status.as_u16(),
        message: body,
    })
}
