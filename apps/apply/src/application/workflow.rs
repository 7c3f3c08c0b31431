//! Submission Workflow: the confirmation gate and the single create call.
//!
//! Flow: Idle → validate → (AwaitingOverrideConfirmation | Submitting) →
//!       resolve resume → create_application → Closed (or back to Idle on failure).
//!
//! Submitting is split in three so a caller can release its lock on the form
//! while the network calls run: `request_submit`/`submit_anyway` hand out a
//! `PendingSubmission`, `PendingSubmission::execute` talks to the backend, and
//! `finish` records the result. While a submission is pending the form
//! refuses edits, a second submit, and cancel.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::application::cover_letter::generate_cover_letter;
use crate::application::form::{ApplicationDraft, ResumeFile};
use crate::backend::JobBoardBackend;
use crate::errors::AppError;
use crate::models::application::{ApplicationPayload, ApplicationSummary};
use crate::models::job::Job;
use crate::models::profile::Profile;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    AwaitingOverrideConfirmation { unrated_skills: Vec<String> },
    Submitting,
    Closed,
}

/// Result of asking to submit.
#[derive(Debug)]
pub enum SubmitStep {
    /// Some required skills are unrated; the user must go back or submit anyway.
    AwaitingConfirmation(Vec<String>),
    Ready(PendingSubmission),
}

#[cfg(test)]
#[derive(Debug)]
pub enum SubmitOutcome {
    AwaitingConfirmation(Vec<String>),
    Submitted(SubmissionReceipt),
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionReceipt {
    pub application: ApplicationSummary,
    pub match_score: u8,
    pub resume_attached: bool,
    /// Non-blocking problems, e.g. the profile resume could not be downloaded.
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone)]
enum ResumeSource {
    Profile { url: String, first_name: String },
    Uploaded(ResumeFile),
}

/// Everything needed to perform one create call, captured when the form
/// entered Submitting.
#[derive(Debug, Clone)]
pub struct PendingSubmission {
    job_id: String,
    payload: ApplicationPayload,
    resume: Option<ResumeSource>,
    requested_at: DateTime<Utc>,
}

/// One open application form: the job, the applicant, their draft and where
/// the submit state machine stands.
#[derive(Debug)]
pub struct ApplicationForm {
    job: Job,
    profile: Profile,
    draft: ApplicationDraft,
    state: SubmissionState,
}

impl ApplicationForm {
    /// Opens a form for `job_id` unless the applicant already applied to it.
    ///
    /// The duplicate check happens here only; it is not repeated at submit.
    pub async fn open(backend: &dyn JobBoardBackend, job_id: &str) -> Result<Self, AppError> {
        if backend.has_applied(job_id).await? {
            info!("Not opening application form: already applied to job {job_id}");
            return Err(AppError::AlreadyApplied(job_id.to_string()));
        }

        let job = backend.get_job(job_id).await?;
        let profile = backend.get_profile().await?;
        info!(
            "Opened application form for job {} ({} required skills)",
            job.id,
            job.skills.len()
        );
        Ok(Self::new(job, profile))
    }

    pub fn new(job: Job, profile: Profile) -> Self {
        let draft = ApplicationDraft::open(&job, &profile);
        Self {
            job,
            profile,
            draft,
            state: SubmissionState::Idle,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn draft(&self) -> &ApplicationDraft {
        &self.draft
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    /// Mutable access to the draft; only while the form is idle.
    pub fn edit(&mut self) -> Result<&mut ApplicationDraft, AppError> {
        self.ensure_idle()?;
        Ok(&mut self.draft)
    }

    /// Replaces the cover letter with freshly generated text, discarding edits.
    pub fn regenerate_cover_letter(&mut self) -> Result<(), AppError> {
        self.ensure_idle()?;
        let text = generate_cover_letter(&self.profile, &self.job.title);
        self.draft.set_cover_letter(text);
        Ok(())
    }

    /// Validates the draft and either opens the override gate or moves to Submitting.
    /// A validation error leaves the form idle and the draft untouched.
    pub fn request_submit(&mut self, today: NaiveDate) -> Result<SubmitStep, AppError> {
        self.ensure_idle()?;
        self.draft.validate_for_submit(today)?;

        let unrated = self.draft.unrated_required_skills();
        if !unrated.is_empty() {
            info!(
                "Job {}: {} required skills unrated, awaiting confirmation",
                self.job.id,
                unrated.len()
            );
            self.state = SubmissionState::AwaitingOverrideConfirmation {
                unrated_skills: unrated.clone(),
            };
            return Ok(SubmitStep::AwaitingConfirmation(unrated));
        }

        Ok(SubmitStep::Ready(self.begin_submission()))
    }

    /// Leaves the override gate without changing the draft.
    pub fn go_back(&mut self) -> Result<(), AppError> {
        self.ensure_awaiting_confirmation()?;
        self.state = SubmissionState::Idle;
        Ok(())
    }

    /// Proceeds past the override gate with the unrated skills left at 0.
    pub fn submit_anyway(&mut self) -> Result<PendingSubmission, AppError> {
        self.ensure_awaiting_confirmation()?;
        info!("Job {}: submitting despite unrated skills", self.job.id);
        Ok(self.begin_submission())
    }

    /// Records the outcome of a pending submission. Success closes the form;
    /// failure returns it to Idle with the draft as it was.
    pub fn finish(
        &mut self,
        outcome: Result<SubmissionReceipt, AppError>,
    ) -> Result<SubmissionReceipt, AppError> {
        match outcome {
            Ok(receipt) => {
                self.state = SubmissionState::Closed;
                Ok(receipt)
            }
            Err(e) => {
                warn!("Submission for job {} failed, draft kept: {e}", self.job.id);
                self.state = SubmissionState::Idle;
                Err(e)
            }
        }
    }

    /// Discards the form. Not allowed while a submission is in flight.
    pub fn cancel(&mut self) -> Result<(), AppError> {
        match self.state {
            SubmissionState::Submitting => Err(AppError::Conflict(
                "The application cannot be closed while it is being submitted".to_string(),
            )),
            SubmissionState::Closed => Ok(()),
            _ => {
                if self.draft.is_dirty() {
                    info!("Discarding edited draft for job {}", self.job.id);
                }
                self.state = SubmissionState::Closed;
                Ok(())
            }
        }
    }

    /// Validate and, if nothing is unrated, submit in one go.
    #[cfg(test)]
    pub async fn submit(
        &mut self,
        backend: &dyn JobBoardBackend,
        today: NaiveDate,
    ) -> Result<SubmitOutcome, AppError> {
        match self.request_submit(today)? {
            SubmitStep::AwaitingConfirmation(unrated) => {
                Ok(SubmitOutcome::AwaitingConfirmation(unrated))
            }
            SubmitStep::Ready(pending) => {
                let outcome = pending.execute(backend).await;
                self.finish(outcome).map(SubmitOutcome::Submitted)
            }
        }
    }

    /// "Submit anyway" from the override gate, then submit.
    #[cfg(test)]
    pub async fn confirm_and_submit(
        &mut self,
        backend: &dyn JobBoardBackend,
    ) -> Result<SubmissionReceipt, AppError> {
        let pending = self.submit_anyway()?;
        let outcome = pending.execute(backend).await;
        self.finish(outcome)
    }

    fn begin_submission(&mut self) -> PendingSubmission {
        self.state = SubmissionState::Submitting;

        let resume = if self.draft.uses_profile_resume() {
            self.draft
                .profile_resume_url()
                .map(|url| ResumeSource::Profile {
                    url: url.to_string(),
                    first_name: self.profile.first_name.clone(),
                })
        } else {
            self.draft
                .custom_resume_file()
                .cloned()
                .map(ResumeSource::Uploaded)
        };

        PendingSubmission {
            job_id: self.job.id.clone(),
            payload: self.draft.build_payload(),
            resume,
            requested_at: Utc::now(),
        }
    }

    fn ensure_idle(&self) -> Result<(), AppError> {
        match &self.state {
            SubmissionState::Idle => Ok(()),
            SubmissionState::AwaitingOverrideConfirmation { .. } => Err(AppError::Conflict(
                "Go back to rate the remaining skills or choose to submit anyway".to_string(),
            )),
            SubmissionState::Submitting => Err(AppError::Conflict(
                "The application is already being submitted".to_string(),
            )),
            SubmissionState::Closed => Err(AppError::Conflict(
                "This application form has been closed".to_string(),
            )),
        }
    }

    fn ensure_awaiting_confirmation(&self) -> Result<(), AppError> {
        match self.state {
            SubmissionState::AwaitingOverrideConfirmation { .. } => Ok(()),
            _ => Err(AppError::Conflict(
                "There is no pending confirmation for this application".to_string(),
            )),
        }
    }
}

impl PendingSubmission {
    /// Resolves the resume and calls `create_application` exactly once.
    ///
    /// A failed profile-resume download is reported as a warning and the
    /// application goes out without a resume.
    pub async fn execute(
        self,
        backend: &dyn JobBoardBackend,
    ) -> Result<SubmissionReceipt, AppError> {
        let mut warnings = Vec::new();

        let payload = match self.resume {
            Some(ResumeSource::Uploaded(file)) => self.payload.with_resume(file),
            Some(ResumeSource::Profile { url, first_name }) => {
                match backend.fetch_binary(&url).await {
                    Ok(fetched) => {
                        let ext = resume_extension(fetched.content_type.as_deref(), &url);
                        let content_type = fetched
                            .content_type
                            .unwrap_or_else(|| content_type_for(&ext).to_string());
                        self.payload.with_resume(ResumeFile {
                            file_name: profile_resume_file_name(
                                &first_name,
                                &ext,
                                self.requested_at.timestamp_millis(),
                            ),
                            content_type,
                            bytes: fetched.bytes,
                        })
                    }
                    Err(e) => {
                        warn!("Could not download profile resume from {url}: {e}");
                        warnings.push(
                            "Your profile resume could not be attached; the application was sent without it"
                                .to_string(),
                        );
                        self.payload
                    }
                }
            }
            None => self.payload,
        };

        let resume_attached = payload.resume().is_some();
        let application = backend.create_application(&self.job_id, &payload).await?;

        info!(
            "Submitted application for job {} (match score {}, resume attached: {})",
            self.job_id,
            payload.match_score(),
            resume_attached
        );

        Ok(SubmissionReceipt {
            application,
            match_score: payload.match_score(),
            resume_attached,
            warnings,
        })
    }
}

/// `profile_resume_<firstname>_<timestamp>.<ext>`
pub fn profile_resume_file_name(first_name: &str, ext: &str, timestamp_ms: i64) -> String {
    let name: String = first_name
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let name = if name.is_empty() { "applicant".to_string() } else { name };
    format!("profile_resume_{name}_{timestamp_ms}.{ext}")
}

/// Picks a file extension from the reported content type, then the URL,
/// falling back to `pdf`.
pub fn resume_extension(content_type: Option<&str>, url: &str) -> String {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_lowercase());

    let from_mime = match mime.as_deref() {
        Some("application/pdf") => Some("pdf"),
        Some("application/msword") => Some("doc"),
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document") => {
            Some("docx")
        }
        Some("text/plain") => Some("txt"),
        _ => None,
    };
    if let Some(ext) = from_mime {
        return ext.to_string();
    }

    let path = url.split(['?', '#']).next().unwrap_or_default();
    let last_segment = path.rsplit('/').next().unwrap_or_default();
    match last_segment.rsplit_once('.') {
        Some((stem, ext))
            if !stem.is_empty()
                && (1..=5).contains(&ext.len())
                && ext.chars().all(|c| c.is_ascii_alphanumeric()) =>
        {
            ext.to_lowercase()
        }
        _ => "pdf".to_string(),
    }
}

fn content_type_for(ext: &str) -> &'static str {
    match ext {
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::FakeBackend;
    use crate::models::profile::{ProfileSkill, Proficiency};
    use bytes::Bytes;

    const RESUME_URL: &str = "/files/resume.pdf";

    fn job() -> Job {
        Job {
            id: "job-42".to_string(),
            title: "Full Stack Developer".to_string(),
            skills: vec!["React".to_string(), "Node".to_string()],
            requirements: "Experience with Docker required".to_string(),
        }
    }

    fn profile(resume_url: Option<&str>) -> Profile {
        Profile {
            first_name: "Margaret".to_string(),
            last_name: "Hamilton".to_string(),
            title: Some("Software Engineer".to_string()),
            bio: None,
            skills: vec![ProfileSkill {
                name: "react".to_string(),
                proficiency: Proficiency::Advanced,
            }],
            resume_url: resume_url.map(str::to_string),
        }
    }

    fn backend(resume_url: Option<&str>) -> FakeBackend {
        FakeBackend::new(profile(resume_url), vec![job()]).with_file(
            RESUME_URL,
            "application/pdf",
            b"%PDF-1.7 resume",
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn uploaded() -> ResumeFile {
        ResumeFile {
            file_name: "margaret.docx".to_string(),
            content_type:
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                    .to_string(),
            bytes: Bytes::from_static(b"docx bytes"),
        }
    }

    #[tokio::test]
    async fn test_unrated_skill_goes_through_override_gate() {
        let backend = backend(Some(RESUME_URL));
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();

        assert_eq!(form.draft().required_skills()[0].rating, 4);
        assert_eq!(form.draft().required_skills()[1].rating, 0);

        let outcome = form.submit(&backend, today()).await.unwrap();
        match outcome {
            SubmitOutcome::AwaitingConfirmation(unrated) => {
                assert_eq!(unrated, vec!["Node".to_string()])
            }
            other => panic!("expected confirmation gate, got {other:?}"),
        }
        assert!(backend.created().is_empty());

        let receipt = form.confirm_and_submit(&backend).await.unwrap();
        assert_eq!(*form.state(), SubmissionState::Closed);
        assert!(receipt.resume_attached);

        let created = backend.created();
        assert_eq!(created.len(), 1);
        let (job_id, payload) = &created[0];
        assert_eq!(job_id, "job-42");
        assert_eq!(payload.skills().len(), 2);
        assert_eq!(payload.skills()[0].rating, 4);
        assert_eq!(payload.skills()[1].rating, 0);
        assert!(payload.skills().iter().all(|s| s.is_required && !s.is_custom));
        // 4 earned of 10 possible
        assert_eq!(payload.match_score(), 40);
    }

    #[tokio::test]
    async fn test_form_does_not_open_after_applying() {
        let backend = backend(None).with_applied("job-42");
        let result = ApplicationForm::open(&backend, "job-42").await;
        assert!(matches!(result, Err(AppError::AlreadyApplied(_))));
    }

    #[tokio::test]
    async fn test_fully_rated_draft_submits_directly() {
        let backend = backend(Some(RESUME_URL));
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        form.edit().unwrap().set_rating("Node", 3).unwrap();

        let outcome = form.submit(&backend, today()).await.unwrap();
        let receipt = match outcome {
            SubmitOutcome::Submitted(receipt) => receipt,
            other => panic!("expected submission, got {other:?}"),
        };
        assert_eq!(receipt.match_score, 70);
        assert!(receipt.warnings.is_empty());

        let created = backend.created();
        let resume = created[0].1.resume().unwrap();
        assert!(resume.file_name.starts_with("profile_resume_Margaret_"));
        assert!(resume.file_name.ends_with(".pdf"));
        assert_eq!(resume.bytes.as_ref(), b"%PDF-1.7 resume");
    }

    #[tokio::test]
    async fn test_empty_cover_letter_blocks_submit() {
        let backend = backend(Some(RESUME_URL));
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        form.edit().unwrap().set_cover_letter("");

        let result = form.submit(&backend, today()).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(*form.state(), SubmissionState::Idle);
        assert!(backend.created().is_empty());
    }

    #[tokio::test]
    async fn test_go_back_returns_to_idle_unchanged() {
        let backend = backend(Some(RESUME_URL));
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        let before = form.draft().clone();

        assert!(matches!(
            form.request_submit(today()).unwrap(),
            SubmitStep::AwaitingConfirmation(_)
        ));
        assert!(form.edit().is_err());
        form.go_back().unwrap();

        assert_eq!(*form.state(), SubmissionState::Idle);
        assert_eq!(form.draft(), &before);
        assert!(form.go_back().is_err());
    }

    #[tokio::test]
    async fn test_failed_submit_keeps_draft_and_retry_rebuilds_payload() {
        let backend = backend(None);
        backend.set_fail_create(true);

        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        {
            let draft = form.edit().unwrap();
            draft.set_rating("Node", 2).unwrap();
            draft.set_cover_letter("I would love to join.");
            draft.select_resume_file(uploaded()).unwrap();
        }
        let before = form.draft().clone();

        let result = form.submit(&backend, today()).await;
        assert!(matches!(result, Err(AppError::Backend(_))));
        assert_eq!(*form.state(), SubmissionState::Idle);
        assert_eq!(form.draft(), &before);

        backend.set_fail_create(false);
        form.submit(&backend, today()).await.unwrap();

        let created = backend.created();
        assert_eq!(created.len(), 2);
        assert_eq!(created[0].1, created[1].1);
        assert_eq!(created[1].1.resume().unwrap().file_name, "margaret.docx");
    }

    #[tokio::test]
    async fn test_resume_download_failure_does_not_block_submit() {
        let backend = FakeBackend::new(profile(Some("/files/gone.pdf")), vec![job()]);
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        form.edit().unwrap().set_rating("Node", 5).unwrap();

        let receipt = match form.submit(&backend, today()).await.unwrap() {
            SubmitOutcome::Submitted(receipt) => receipt,
            other => panic!("expected submission, got {other:?}"),
        };
        assert!(!receipt.resume_attached);
        assert_eq!(receipt.warnings.len(), 1);
        assert_eq!(backend.created().len(), 1);
        assert!(backend.created()[0].1.resume().is_none());
    }

    #[tokio::test]
    async fn test_pending_submission_blocks_second_submit_and_cancel() {
        let backend = backend(Some(RESUME_URL));
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        form.edit().unwrap().set_rating("Node", 1).unwrap();

        let pending = match form.request_submit(today()).unwrap() {
            SubmitStep::Ready(pending) => pending,
            other => panic!("expected ready submission, got {other:?}"),
        };
        assert_eq!(*form.state(), SubmissionState::Submitting);
        assert!(matches!(
            form.request_submit(today()),
            Err(AppError::Conflict(_))
        ));
        assert!(matches!(form.cancel(), Err(AppError::Conflict(_))));

        let outcome = pending.execute(&backend).await;
        form.finish(outcome).unwrap();
        assert_eq!(backend.created().len(), 1);
        assert!(form.edit().is_err());
    }

    #[tokio::test]
    async fn test_regenerate_overwrites_cover_letter() {
        let backend = backend(None);
        let mut form = ApplicationForm::open(&backend, "job-42").await.unwrap();
        let original = form.draft().cover_letter().to_string();

        form.edit().unwrap().set_cover_letter("my own words");
        form.regenerate_cover_letter().unwrap();
        assert_eq!(form.draft().cover_letter(), original);
    }

    #[test]
    fn test_cancel_from_idle_closes() {
        let mut form = ApplicationForm::new(job(), profile(None));
        form.cancel().unwrap();
        assert_eq!(*form.state(), SubmissionState::Closed);
        assert!(form.request_submit(today()).is_err());
    }

    #[test]
    fn test_profile_resume_file_name() {
        assert_eq!(
            profile_resume_file_name("Mary Ann", "pdf", 1_700_000_000_000),
            "profile_resume_Mary_Ann_1700000000000.pdf"
        );
        assert_eq!(
            profile_resume_file_name("  ", "doc", 1),
            "profile_resume_applicant_1.doc"
        );
    }

    #[test]
    fn test_resume_extension_sources() {
        assert_eq!(resume_extension(Some("application/msword"), "/x"), "doc");
        assert_eq!(resume_extension(Some("text/plain; charset=utf-8"), "/x"), "txt");
        assert_eq!(
            resume_extension(Some("application/octet-stream"), "https://cdn/cv.DOCX?sig=1"),
            "docx"
        );
        assert_eq!(resume_extension(None, "https://cdn/resume"), "pdf");
    }
}
