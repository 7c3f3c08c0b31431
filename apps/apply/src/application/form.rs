//! Application Form State: the in-memory draft for one open form.
//!
//! The draft is seeded from the job and the applicant's profile when the form
//! opens and is changed only through the methods below. Every rating or
//! custom-skill mutation recomputes the match score before returning, so the
//! stored score is never stale.

use bytes::Bytes;
use chrono::NaiveDate;
use serde::Serialize;

use crate::application::cover_letter::generate_cover_letter;
use crate::application::match_score::{compute_match_breakdown, MatchBreakdown};
use crate::application::skill_rating::{CustomSkill, SkillRating, SkillRatingModel};
use crate::errors::AppError;
use crate::models::application::{AdditionalInfo, ApplicationPayload, PayloadSkill};
use crate::models::job::Job;
use crate::models::profile::Profile;

/// Upper bound for an uploaded resume: 5 MiB.
pub const MAX_RESUME_BYTES: usize = 5 * 1024 * 1024;

pub const ACCEPTED_RESUME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
];

/// A resume file held in memory, either uploaded by the applicant or
/// downloaded from their profile at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl ResumeFile {
    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeFileInfo {
    pub file_name: String,
    pub content_type: String,
    pub size: usize,
}

impl From<&ResumeFile> for ResumeFileInfo {
    fn from(file: &ResumeFile) -> Self {
        Self {
            file_name: file.file_name.clone(),
            content_type: file.content_type.clone(),
            size: file.size(),
        }
    }
}

/// Checks an uploaded resume against the accepted MIME types and the size cap.
pub fn validate_resume_file(file: &ResumeFile) -> Result<(), AppError> {
    let content_type = file
        .content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    if !ACCEPTED_RESUME_TYPES.contains(&content_type.as_str()) {
        return Err(AppError::Validation(
            "Please upload a PDF, DOC, DOCX or plain text file".to_string(),
        ));
    }
    if file.size() > MAX_RESUME_BYTES {
        return Err(AppError::Validation(
            "Resume file must be 5 MB or smaller".to_string(),
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationDraft {
    requirements: String,
    profile_resume_url: Option<String>,
    cover_letter: String,
    use_profile_resume: bool,
    custom_resume_file: Option<ResumeFile>,
    driving_license: bool,
    willing_to_relocate: bool,
    available_start_date: Option<NaiveDate>,
    skills: SkillRatingModel,
    match_breakdown: MatchBreakdown,
    dirty: bool,
}

impl ApplicationDraft {
    /// Seeds a fresh draft for `job` from the applicant's profile.
    pub fn open(job: &Job, profile: &Profile) -> Self {
        let profile_resume_url = profile
            .has_resume()
            .then(|| profile.resume_url.clone())
            .flatten();

        let mut draft = Self {
            requirements: job.requirements.clone(),
            use_profile_resume: profile_resume_url.is_some(),
            profile_resume_url,
            cover_letter: generate_cover_letter(profile, &job.title),
            custom_resume_file: None,
            driving_license: false,
            willing_to_relocate: false,
            available_start_date: None,
            skills: SkillRatingModel::initialize(&job.skills, &profile.skills),
            match_breakdown: MatchBreakdown::default(),
            dirty: false,
        };
        draft.recompute();
        draft
    }

    // ── Skill ratings ────────────────────────────────────────────────────

    /// Returns the match score after the change.
    pub fn set_rating(&mut self, skill_name: &str, rating: i64) -> Result<u8, AppError> {
        self.skills.set_rating(skill_name, rating)?;
        Ok(self.touch_skills())
    }

    pub fn add_custom_skill(&mut self, name: &str, rating: Option<i64>) -> Result<u8, AppError> {
        self.skills.add_custom_skill(name, rating)?;
        Ok(self.touch_skills())
    }

    pub fn set_custom_rating(&mut self, index: usize, rating: i64) -> u8 {
        if self.skills.set_custom_rating(index, rating) {
            self.touch_skills()
        } else {
            self.match_score()
        }
    }

    pub fn remove_custom_skill(&mut self, index: usize) -> u8 {
        if self.skills.remove_custom_skill(index).is_some() {
            self.touch_skills()
        } else {
            self.match_score()
        }
    }

    fn touch_skills(&mut self) -> u8 {
        self.dirty = true;
        self.recompute();
        self.match_score()
    }

    fn recompute(&mut self) {
        self.match_breakdown = compute_match_breakdown(
            self.skills.required(),
            self.skills.custom_skills(),
            &self.requirements,
        );
        tracing::debug!(
            "Match score recomputed: {} ({}/{})",
            self.match_breakdown.score,
            self.match_breakdown.earned,
            self.match_breakdown.possible
        );
    }

    // ── Free-form fields ─────────────────────────────────────────────────

    pub fn set_cover_letter(&mut self, text: impl Into<String>) {
        self.cover_letter = text.into();
        self.dirty = true;
    }

    pub fn set_driving_license(&mut self, value: bool) {
        self.driving_license = value;
        self.dirty = true;
    }

    pub fn set_willing_to_relocate(&mut self, value: bool) {
        self.willing_to_relocate = value;
        self.dirty = true;
    }

    /// Sets or clears the start date. A date before `today` is rejected.
    pub fn set_available_start_date(
        &mut self,
        date: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<(), AppError> {
        check_start_date(date, today)?;
        self.available_start_date = date;
        self.dirty = true;
        Ok(())
    }

    // ── Resume source ────────────────────────────────────────────────────

    /// Selects an uploaded resume. On rejection the previous selection stays.
    pub fn select_resume_file(&mut self, file: ResumeFile) -> Result<(), AppError> {
        validate_resume_file(&file)?;
        self.custom_resume_file = Some(file);
        self.use_profile_resume = false;
        self.dirty = true;
        Ok(())
    }

    /// Switches back to the profile resume and forgets any uploaded file.
    pub fn use_profile_resume(&mut self) -> Result<(), AppError> {
        if self.profile_resume_url.is_none() {
            return Err(AppError::Validation(
                "Your profile has no resume on file; please upload one".to_string(),
            ));
        }
        self.use_profile_resume = true;
        self.custom_resume_file = None;
        self.dirty = true;
        Ok(())
    }

    /// True when a resume will resolve to an actual file at submit time.
    pub fn has_resume_source(&self) -> bool {
        if self.use_profile_resume {
            self.profile_resume_url.is_some()
        } else {
            self.custom_resume_file.is_some()
        }
    }

    // ── Submission ───────────────────────────────────────────────────────

    /// Checks everything that blocks a submit outright. Unrated required
    /// skills are not an error here; they go through the override gate.
    pub fn validate_for_submit(&self, today: NaiveDate) -> Result<(), AppError> {
        if self.cover_letter.trim().is_empty() {
            return Err(AppError::Validation(
                "Please write a cover letter before submitting".to_string(),
            ));
        }
        if !self.has_resume_source() {
            return Err(AppError::Validation(
                "Please choose your profile resume or upload a file".to_string(),
            ));
        }
        check_start_date(self.available_start_date, today)
    }

    /// Builds the submission body from the current draft, without the resume.
    pub fn build_payload(&self) -> ApplicationPayload {
        let skills: Vec<PayloadSkill> = self
            .skills
            .all_ratings()
            .into_iter()
            .map(|s| PayloadSkill {
                name: s.skill_name,
                rating: s.rating,
                is_required: s.is_required,
                is_custom: s.is_custom,
            })
            .collect();

        let required = self.skills.required();
        let additional_info = AdditionalInfo {
            driving_license: self.driving_license,
            willing_to_relocate: self.willing_to_relocate,
            available_start_date: self.available_start_date,
            required_skill_count: required.len(),
            rated_required_count: required.iter().filter(|r| r.rating > 0).count(),
            custom_skill_count: self.skills.custom_skills().len(),
        };

        ApplicationPayload::new(
            self.cover_letter.clone(),
            skills,
            self.match_score(),
            additional_info,
        )
    }

    // ── Accessors ────────────────────────────────────────────────────────

    pub fn cover_letter(&self) -> &str {
        &self.cover_letter
    }

    pub fn uses_profile_resume(&self) -> bool {
        self.use_profile_resume
    }

    pub fn profile_resume_url(&self) -> Option<&str> {
        self.profile_resume_url.as_deref()
    }

    pub fn custom_resume_file(&self) -> Option<&ResumeFile> {
        self.custom_resume_file.as_ref()
    }

    pub fn driving_license(&self) -> bool {
        self.driving_license
    }

    pub fn willing_to_relocate(&self) -> bool {
        self.willing_to_relocate
    }

    pub fn available_start_date(&self) -> Option<NaiveDate> {
        self.available_start_date
    }

    pub fn required_skills(&self) -> &[SkillRating] {
        self.skills.required()
    }

    pub fn custom_skills(&self) -> &[CustomSkill] {
        self.skills.custom_skills()
    }

    pub fn unrated_required_skills(&self) -> Vec<String> {
        self.skills.unrated_required()
    }

    pub fn match_score(&self) -> u8 {
        self.match_breakdown.score
    }

    pub fn match_breakdown(&self) -> &MatchBreakdown {
        &self.match_breakdown
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

fn check_start_date(date: Option<NaiveDate>, today: NaiveDate) -> Result<(), AppError> {
    match date {
        Some(d) if d < today => Err(AppError::Validation(
            "Available start date cannot be in the past".to_string(),
        )),
        _ => Ok(()),
    }
}
