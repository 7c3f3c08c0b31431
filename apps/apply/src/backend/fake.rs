//! In-memory `JobBoardBackend` used by workflow and handler tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use super::{BackendError, FetchedBinary, JobBoardBackend};
use crate::models::application::{ApplicationPayload, ApplicationSummary};
use crate::models::job::Job;
use crate::models::profile::Profile;

pub struct FakeBackend {
    pub profile: Profile,
    pub jobs: HashMap<String, Job>,
    pub applied: Mutex<HashSet<String>>,
    pub files: HashMap<String, FetchedBinary>,
    pub created: Mutex<Vec<(String, ApplicationPayload)>>,
    pub fail_create: AtomicBool,
    pub create_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new(profile: Profile, jobs: Vec<Job>) -> Self {
        Self {
            profile,
            jobs: jobs.into_iter().map(|j| (j.id.clone(), j)).collect(),
            applied: Mutex::new(HashSet::new()),
            files: HashMap::new(),
            created: Mutex::new(Vec::new()),
            fail_create: AtomicBool::new(false),
            create_delay: None,
        }
    }

    pub fn with_file(mut self, url: &str, content_type: &str, bytes: &'static [u8]) -> Self {
        self.files.insert(
            url.to_string(),
            FetchedBinary {
                bytes: Bytes::from_static(bytes),
                content_type: Some(content_type.to_string()),
            },
        );
        self
    }

    pub fn with_create_delay(mut self, delay: Duration) -> Self {
        self.create_delay = Some(delay);
        self
    }

    pub fn with_applied(self, job_id: &str) -> Self {
        self.applied.lock().unwrap().insert(job_id.to_string());
        self
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn created(&self) -> Vec<(String, ApplicationPayload)> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl JobBoardBackend for FakeBackend {
    async fn get_profile(&self) -> Result<Profile, BackendError> {
        Ok(self.profile.clone())
    }

    async fn get_job(&self, job_id: &str) -> Result<Job, BackendError> {
        self.jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(format!("job {job_id}")))
    }

    async fn has_applied(&self, job_id: &str) -> Result<bool, BackendError> {
        Ok(self.applied.lock().unwrap().contains(job_id))
    }

    async fn create_application(
        &self,
        job_id: &str,
        payload: &ApplicationPayload,
    ) -> Result<ApplicationSummary, BackendError> {
        if let Some(delay) = self.create_delay {
            tokio::time::sleep(delay).await;
        }
        self.created
            .lock()
            .unwrap()
            .push((job_id.to_string(), payload.clone()));

        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BackendError::Api {
                status: 503,
                message: "service unavailable".to_string(),
            });
        }

        self.applied.lock().unwrap().insert(job_id.to_string());
        Ok(ApplicationSummary {
            job_id: job_id.to_string(),
            status: Some("pending".to_string()),
        })
    }

    async fn fetch_binary(&self, url: &str) -> Result<FetchedBinary, BackendError> {
        self.files
            .get(url)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(url.to_string()))
    }
}
