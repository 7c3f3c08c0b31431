//! In-memory store of open application forms, one entry per form instance.
//!
//! Each form sits behind its own mutex. Handlers hold that lock only for
//! synchronous state changes, never across backend calls; the form's
//! Submitting state is what keeps a second submit out.
//!
//! Closed forms and forms left untouched for longer than the idle TTL are
//! evicted, except while a submission is in flight.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::workflow::{ApplicationForm, SubmissionState};
use crate::errors::AppError;

pub const DEFAULT_FORM_IDLE_TTL: Duration = Duration::from_secs(30 * 60);

pub type SharedForm = Arc<Mutex<ApplicationForm>>;

struct SessionEntry {
    job_id: String,
    form: SharedForm,
    last_seen: Instant,
}

#[derive(Clone)]
pub struct FormSessions {
    inner: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    idle_ttl: Duration,
}

impl Default for FormSessions {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_IDLE_TTL)
    }
}

impl FormSessions {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
            idle_ttl,
        }
    }

    /// Registers an opened form. Only one form per job may be open at a time.
    pub async fn insert(&self, form: ApplicationForm) -> Result<Uuid, AppError> {
        let job_id = form.job().id.clone();
        let mut sessions = self.inner.write().await;
        evict(&mut sessions, self.idle_ttl);

        if sessions.values().any(|s| s.job_id == job_id) {
            return Err(AppError::Conflict(format!(
                "An application form for job {job_id} is already open"
            )));
        }

        let id = Uuid::new_v4();
        sessions.insert(
            id,
            SessionEntry {
                job_id,
                form: Arc::new(Mutex::new(form)),
                last_seen: Instant::now(),
            },
        );
        Ok(id)
    }

    /// Looks up a form and marks it as recently used.
    pub async fn get(&self, id: Uuid) -> Result<SharedForm, AppError> {
        let mut sessions = self.inner.write().await;
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Application form {id} not found")))?;
        entry.last_seen = Instant::now();
        Ok(entry.form.clone())
    }

    pub async fn is_open_for_job(&self, job_id: &str) -> bool {
        let mut sessions = self.inner.write().await;
        evict(&mut sessions, self.idle_ttl);
        sessions.values().any(|s| s.job_id == job_id)
    }

    /// Drops the form and its draft.
    pub async fn remove(&self, id: Uuid) {
        self.inner.write().await.remove(&id);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn evict_stale(&self) -> usize {
        evict(&mut *self.inner.write().await, self.idle_ttl)
    }

    /// Runs `evict_stale` every `period` until the runtime shuts down.
    pub fn spawn_sweeper(&self, period: Duration) -> JoinHandle<()> {
        let sessions = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let evicted = sessions.evict_stale().await;
                if evicted > 0 {
                    debug!("Evicted {evicted} stale application forms");
                }
            }
        })
    }
}

/// Removes closed forms and idle ones. A form whose lock is busy, or which is
/// Submitting, is kept. Returns how many entries were dropped.
fn evict(sessions: &mut HashMap<Uuid, SessionEntry>, idle_ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|id, entry| {
        let keep = match entry.form.try_lock() {
            Ok(form) => match form.state() {
                SubmissionState::Closed => false,
                SubmissionState::Submitting => true,
                _ => entry.last_seen.elapsed() < idle_ttl,
            },
            Err(_) => true,
        };
        if !keep {
            info!("Dropping application form {id} for job {}", entry.job_id);
        }
        keep
    });
    before - sessions.len()
}
