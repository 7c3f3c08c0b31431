//! Skill Rating Model: star ratings for the job's required skills plus the
//! applicant's own custom skills.
//!
//! Required skills are rated 0–5 (0 = unrated). Custom skills are rated 1–5
//! and can never sit at 0. Every mutation clamps instead of rejecting.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;
use crate::models::profile::ProfileSkill;

pub const MAX_RATING: u8 = 5;
pub const MIN_CUSTOM_RATING: u8 = 1;
pub const DEFAULT_CUSTOM_RATING: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillRating {
    pub skill_name: String,
    pub rating: u8,
    pub is_required: bool,
    pub is_custom: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomSkill {
    pub name: String,
    pub rating: u8,
    /// Cosmetic only: highlights skills added during this session.
    pub is_new: bool,
}

/// Rating state for one open application form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkillRatingModel {
    required: Vec<SkillRating>,
    custom: Vec<CustomSkill>,
}

/// Clamps a raw rating into `[0, 5]`.
pub fn clamp_rating(rating: i64) -> u8 {
    rating.clamp(0, MAX_RATING as i64) as u8
}

/// Clamps a raw custom-skill rating into `[1, 5]`.
pub fn clamp_custom_rating(rating: i64) -> u8 {
    rating.clamp(MIN_CUSTOM_RATING as i64, MAX_RATING as i64) as u8
}

impl SkillRatingModel {
    /// Seeds one rating per job skill from the applicant's profile.
    ///
    /// Names are matched case-insensitively; a skill missing from the profile
    /// starts unrated. Duplicate job skills (ignoring case) are collapsed.
    pub fn initialize(job_skills: &[String], profile_skills: &[ProfileSkill]) -> Self {
        let mut required: Vec<SkillRating> = Vec::with_capacity(job_skills.len());

        for skill in job_skills {
            let name = skill.trim();
            if name.is_empty() || required.iter().any(|r| eq_ignore_case(&r.skill_name, name)) {
                continue;
            }

            let rating = profile_skills
                .iter()
                .find(|p| eq_ignore_case(&p.name, name))
                .map(|p| p.proficiency.stars())
                .unwrap_or(0);

            required.push(SkillRating {
                skill_name: name.to_string(),
                rating,
                is_required: true,
                is_custom: false,
            });
        }

        debug!(
            "Seeded {} required skills ({} pre-rated from profile)",
            required.len(),
            required.iter().filter(|r| r.rating > 0).count()
        );

        Self {
            required,
            custom: Vec::new(),
        }
    }

    pub fn required(&self) -> &[SkillRating] {
        &self.required
    }

    pub fn custom_skills(&self) -> &[CustomSkill] {
        &self.custom
    }

    #[cfg(test)]
    pub fn rating(&self, skill_name: &str) -> Option<u8> {
        self.find_required(skill_name).map(|i| self.required[i].rating)
    }

    /// Rates a required skill. Out-of-range values are clamped to `[0, 5]`.
    /// Returns the stored rating.
    pub fn set_rating(&mut self, skill_name: &str, rating: i64) -> Result<u8, AppError> {
        let index = self.find_required(skill_name).ok_or_else(|| {
            AppError::Validation(format!("'{skill_name}' is not a skill listed for this job"))
        })?;
        let stored = clamp_rating(rating);
        self.required[index].rating = stored;
        Ok(stored)
    }

    /// Adds an applicant-defined skill. `rating` defaults to 3 and is clamped to `[1, 5]`.
    pub fn add_custom_skill(&mut self, name: &str, rating: Option<i64>) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::Validation("Please enter a skill name".to_string()));
        }
        if self.find_required(name).is_some() {
            return Err(AppError::Validation(format!(
                "'{name}' is already listed as a required skill; rate it there instead"
            )));
        }
        if self.custom.iter().any(|c| eq_ignore_case(&c.name, name)) {
            return Err(AppError::Validation(format!("'{name}' has already been added")));
        }

        self.custom.push(CustomSkill {
            name: name.to_string(),
            rating: rating
                .map(clamp_custom_rating)
                .unwrap_or(DEFAULT_CUSTOM_RATING),
            is_new: true,
        });
        Ok(())
    }

    /// Re-rates a custom skill by position. Returns false when `index` is out of bounds.
    pub fn set_custom_rating(&mut self, index: usize, rating: i64) -> bool {
        match self.custom.get_mut(index) {
            Some(skill) => {
                skill.rating = clamp_custom_rating(rating);
                true
            }
            None => false,
        }
    }

    /// Removes a custom skill by position. Out of bounds is a no-op.
    pub fn remove_custom_skill(&mut self, index: usize) -> Option<CustomSkill> {
        if index < self.custom.len() {
            Some(self.custom.remove(index))
        } else {
            None
        }
    }

    /// Names of required skills still at 0, in job order.
    pub fn unrated_required(&self) -> Vec<String> {
        self.required
            .iter()
            .filter(|r| r.rating == 0)
            .map(|r| r.skill_name.clone())
            .collect()
    }

    /// Required skills followed by custom skills, each tagged with its origin.
    pub fn all_ratings(&self) -> Vec<SkillRating> {
        self.required
            .iter()
            .cloned()
            .chain(self.custom.iter().map(|c| SkillRating {
                skill_name: c.name.clone(),
                rating: c.rating,
                is_required: false,
                is_custom: true,
            }))
            .collect()
    }

    fn find_required(&self, skill_name: &str) -> Option<usize> {
        let skill_name = skill_name.trim();
        self.required
            .iter()
            .position(|r| eq_ignore_case(&r.skill_name, skill_name))
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}
