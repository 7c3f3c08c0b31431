//! Axum route handlers for application form sessions.
//!
//! Each handler locks one form, applies a single user action through
//! `ApplicationForm`, and returns the refreshed view. Submit releases the
//! lock while the backend calls run.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::application::form::{ResumeFile, ResumeFileInfo};
use crate::application::match_score::MatchBreakdown;
use crate::application::sessions::SharedForm;
use crate::application::skill_rating::{CustomSkill, SkillRating};
use crate::application::workflow::{
    ApplicationForm, PendingSubmission, SubmissionReceipt, SubmissionState, SubmitStep,
};
use crate::errors::AppError;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RatingRequest {
    pub rating: i64,
}

#[derive(Debug, Deserialize)]
pub struct AddCustomSkillRequest {
    pub name: String,
    pub rating: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct QualifiersRequest {
    pub driving_license: Option<bool>,
    pub willing_to_relocate: Option<bool>,
    pub available_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub clear_available_start_date: bool,
}

#[derive(Debug, Deserialize)]
pub struct CoverLetterRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    /// true = "submit anyway", false = "go back".
    pub proceed: bool,
}

#[derive(Debug, Serialize)]
pub struct FormView {
    pub form_id: Uuid,
    pub job_id: String,
    pub job_title: String,
    #[serde(flatten)]
    pub state: SubmissionState,
    pub cover_letter: String,
    pub use_profile_resume: bool,
    pub profile_resume_available: bool,
    pub custom_resume_file: Option<ResumeFileInfo>,
    pub driving_license: bool,
    pub willing_to_relocate: bool,
    pub available_start_date: Option<NaiveDate>,
    pub required_skills: Vec<SkillRating>,
    pub custom_skills: Vec<CustomSkill>,
    pub match_score: u8,
    pub match_breakdown: MatchBreakdown,
    pub ready_to_submit: bool,
    pub dirty: bool,
}

impl FormView {
    fn new(form_id: Uuid, form: &ApplicationForm) -> Self {
        let draft = form.draft();
        Self {
            form_id,
            job_id: form.job().id.clone(),
            job_title: form.job().title.clone(),
            state: form.state().clone(),
            cover_letter: draft.cover_letter().to_string(),
            use_profile_resume: draft.uses_profile_resume(),
            profile_resume_available: draft.profile_resume_url().is_some(),
            custom_resume_file: draft.custom_resume_file().map(ResumeFileInfo::from),
            driving_license: draft.driving_license(),
            willing_to_relocate: draft.willing_to_relocate(),
            available_start_date: draft.available_start_date(),
            required_skills: draft.required_skills().to_vec(),
            custom_skills: draft.custom_skills().to_vec(),
            match_score: draft.match_score(),
            match_breakdown: draft.match_breakdown().clone(),
            ready_to_submit: *form.state() == SubmissionState::Idle && draft.has_resume_source(),
            dirty: draft.is_dirty(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitResponse {
    ConfirmationRequired { unrated_skills: Vec<String> },
    Submitted { receipt: SubmissionReceipt },
    ReturnedToForm { form: FormView },
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/jobs/:job_id/form
///
/// Opens an application form unless the applicant already applied to the job
/// or a form for it is already open.
pub async fn handle_open_form(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<(StatusCode, Json<FormView>), AppError> {
    if state.sessions.is_open_for_job(&job_id).await {
        return Err(AppError::Conflict(format!(
            "An application form for job {job_id} is already open"
        )));
    }

    let form = ApplicationForm::open(state.backend.as_ref(), &job_id).await?;
    let form_id = state.sessions.insert(form).await?;
    let shared = state.sessions.get(form_id).await?;
    let view = FormView::new(form_id, &*shared.lock().await);

    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /api/v1/forms/:id
pub async fn handle_get_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<FormView>, AppError> {
    let form = state.sessions.get(form_id).await?;
    let form = form.lock().await;
    Ok(Json(FormView::new(form_id, &form)))
}

/// DELETE /api/v1/forms/:id
///
/// Cancels the form and discards the draft. Refused while submitting.
pub async fn handle_cancel_form(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let form = state.sessions.get(form_id).await?;
    form.lock().await.cancel()?;
    state.sessions.remove(form_id).await;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/v1/forms/:id/skills/:name
pub async fn handle_rate_skill(
    State(state): State<AppState>,
    Path((form_id, skill_name)): Path<(Uuid, String)>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        form.edit()?.set_rating(&skill_name, request.rating)?;
        Ok(())
    })
    .await
}

/// POST /api/v1/forms/:id/custom-skills
pub async fn handle_add_custom_skill(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<AddCustomSkillRequest>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        form.edit()?.add_custom_skill(&request.name, request.rating)?;
        Ok(())
    })
    .await
}

/// PUT /api/v1/forms/:id/custom-skills/:index
pub async fn handle_rate_custom_skill(
    State(state): State<AppState>,
    Path((form_id, index)): Path<(Uuid, usize)>,
    Json(request): Json<RatingRequest>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        form.edit()?.set_custom_rating(index, request.rating);
        Ok(())
    })
    .await
}

/// DELETE /api/v1/forms/:id/custom-skills/:index
pub async fn handle_remove_custom_skill(
    State(state): State<AppState>,
    Path((form_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        form.edit()?.remove_custom_skill(index);
        Ok(())
    })
    .await
}

/// PATCH /api/v1/forms/:id/qualifiers
pub async fn handle_update_qualifiers(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<QualifiersRequest>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        let draft = form.edit()?;
        // Date first: a rejected date must leave the whole draft unchanged.
        if request.clear_available_start_date {
            draft.set_available_start_date(None, today())?;
        } else if request.available_start_date.is_some() {
            draft.set_available_start_date(request.available_start_date, today())?;
        }
        if let Some(value) = request.driving_license {
            draft.set_driving_license(value);
        }
        if let Some(value) = request.willing_to_relocate {
            draft.set_willing_to_relocate(value);
        }
        Ok(())
    })
    .await
}

/// PUT /api/v1/forms/:id/cover-letter
pub async fn handle_set_cover_letter(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<CoverLetterRequest>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| {
        form.edit()?.set_cover_letter(request.text);
        Ok(())
    })
    .await
}

/// POST /api/v1/forms/:id/cover-letter/regenerate
pub async fn handle_regenerate_cover_letter(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| form.regenerate_cover_letter()).await
}

/// PUT /api/v1/forms/:id/resume/profile
pub async fn handle_use_profile_resume(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<FormView>, AppError> {
    mutate_form(&state, form_id, |form| form.edit()?.use_profile_resume()).await
}

/// POST /api/v1/forms/:id/resume
///
/// Multipart upload; the first part carrying a file name is taken as the resume.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<FormView>, AppError> {
    let mut upload: Option<ResumeFile> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid upload: {e}")))?;

        upload = Some(ResumeFile {
            file_name,
            content_type,
            bytes,
        });
        break;
    }

    let file = upload
        .ok_or_else(|| AppError::Validation("No resume file was uploaded".to_string()))?;
    info!(
        "Form {form_id}: resume upload {} ({} bytes)",
        file.file_name,
        file.size()
    );

    mutate_form(&state, form_id, |form| form.edit()?.select_resume_file(file)).await
}

/// POST /api/v1/forms/:id/submit
///
/// Validates the draft. Unrated required skills open the confirmation gate;
/// otherwise the application is sent and the form is closed.
pub async fn handle_submit(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
) -> Result<Json<SubmitResponse>, AppError> {
    let form = state.sessions.get(form_id).await?;

    let step = form.lock().await.request_submit(today())?;
    match step {
        SubmitStep::AwaitingConfirmation(unrated_skills) => {
            Ok(Json(SubmitResponse::ConfirmationRequired { unrated_skills }))
        }
        SubmitStep::Ready(pending) => run_submission(&state, form_id, form, pending).await,
    }
}

/// POST /api/v1/forms/:id/confirm
///
/// Answers the confirmation gate: submit anyway, or go back to the form.
pub async fn handle_confirm(
    State(state): State<AppState>,
    Path(form_id): Path<Uuid>,
    Json(request): Json<ConfirmRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let form = state.sessions.get(form_id).await?;

    if !request.proceed {
        let mut guard = form.lock().await;
        guard.go_back()?;
        return Ok(Json(SubmitResponse::ReturnedToForm {
            form: FormView::new(form_id, &guard),
        }));
    }

    let pending = form.lock().await.submit_anyway()?;
    run_submission(&state, form_id, form, pending).await
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

async fn mutate_form<F>(
    state: &AppState,
    form_id: Uuid,
    mutate: F,
) -> Result<Json<FormView>, AppError>
where
    F: FnOnce(&mut ApplicationForm) -> Result<(), AppError>,
{
    let form = state.sessions.get(form_id).await?;
    let mut form = form.lock().await;
    mutate(&mut *form)?;
    Ok(Json(FormView::new(form_id, &*form)))
}

/// Runs the backend calls without holding the form lock, then records the
/// result. A successful submit removes the session.
///
/// The work runs on its own task: if the request is dropped mid-flight the
/// submission still finishes and the form leaves Submitting.
async fn run_submission(
    state: &AppState,
    form_id: Uuid,
    form: SharedForm,
    pending: PendingSubmission,
) -> Result<Json<SubmitResponse>, AppError> {
    let backend = state.backend.clone();
    let sessions = state.sessions.clone();

    let task = tokio::spawn(async move {
        let outcome = pending.execute(backend.as_ref()).await;
        let result = form.lock().await.finish(outcome);
        if result.is_ok() {
            sessions.remove(form_id).await;
        }
        result
    });

    let receipt = task.await.map_err(|e| {
        AppError::Internal(anyhow::anyhow!("Submission task for form {form_id} failed: {e}"))
    })??;
    Ok(Json(SubmitResponse::Submitted { receipt }))
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}
