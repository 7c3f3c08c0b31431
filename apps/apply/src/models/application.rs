use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::application::form::ResumeFile;

/// One skill entry in the submitted payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadSkill {
    pub name: String,
    pub rating: u8,
    pub is_required: bool,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalInfo {
    pub driving_license: bool,
    pub willing_to_relocate: bool,
    pub available_start_date: Option<NaiveDate>,
    pub required_skill_count: usize,
    pub rated_required_count: usize,
    pub custom_skill_count: usize,
}

/// Body of a `create application` call. Built once per submission attempt and
/// never mutated afterwards; the resume is attached by `with_resume` which
/// consumes the payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplicationPayload {
    cover_letter: String,
    resume: Option<ResumeFile>,
    skills: Vec<PayloadSkill>,
    match_score: u8,
    additional_info: AdditionalInfo,
}

impl ApplicationPayload {
    pub fn new(
        cover_letter: String,
        skills: Vec<PayloadSkill>,
        match_score: u8,
        additional_info: AdditionalInfo,
    ) -> Self {
        Self {
            cover_letter,
            resume: None,
            skills,
            match_score,
            additional_info,
        }
    }

    pub fn with_resume(self, resume: ResumeFile) -> Self {
        Self {
            resume: Some(resume),
            ..self
        }
    }

    pub fn cover_letter(&self) -> &str {
        &self.cover_letter
    }

    pub fn resume(&self) -> Option<&ResumeFile> {
        self.resume.as_ref()
    }

    pub fn skills(&self) -> &[PayloadSkill] {
        &self.skills
    }

    pub fn match_score(&self) -> u8 {
        self.match_score
    }

    pub fn additional_info(&self) -> &AdditionalInfo {
        &self.additional_info
    }
}

/// An application as read back from the backend. Status is backend-owned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSummary {
    pub job_id: String,
    #[serde(default)]
    pub status: Option<String>,
}
