//! Match Score: converts the current skill ratings into a 0–100 percentage.
//!
//! Algorithm:
//! 1. Each required skill contributes `rating` to `earned` and 5 to `possible`.
//!    An unrated (0) skill still counts toward `possible`.
//! 2. When custom skills exist and the job has requirements text, every custom
//!    skill adds 3 to `possible`; custom skills whose name appears in the
//!    requirements (case-insensitive substring) also add 3 to `earned`.
//! 3. `possible == 0` → 0, otherwise `round(100 * earned / possible)`, capped at 100.

use serde::Serialize;

use crate::application::skill_rating::{CustomSkill, SkillRating, MAX_RATING};

/// Points a custom skill adds to `possible`, and to `earned` when it matches.
pub const CUSTOM_SKILL_BONUS: u32 = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MatchBreakdown {
    pub score: u8,
    pub earned: u32,
    pub possible: u32,
    pub matched_custom_skills: Vec<String>,
}

/// Computes the score together with the numbers that produced it.
pub fn compute_match_breakdown(
    required: &[SkillRating],
    custom: &[CustomSkill],
    requirements: &str,
) -> MatchBreakdown {
    let mut earned = 0_u32;
    let mut possible = 0_u32;

    for skill in required {
        earned += skill.rating.min(MAX_RATING) as u32;
        possible += MAX_RATING as u32;
    }

    let mut matched_custom_skills = Vec::new();
    let requirements_lower = requirements.to_lowercase();

    if !custom.is_empty() && !requirements.trim().is_empty() {
        for skill in custom {
            possible += CUSTOM_SKILL_BONUS;
            if requirements_lower.contains(&skill.name.to_lowercase()) {
                earned += CUSTOM_SKILL_BONUS;
                matched_custom_skills.push(skill.name.clone());
            }
        }
    }

    MatchBreakdown {
        score: percentage(earned, possible),
        earned,
        possible,
        matched_custom_skills,
    }
}

/// Integer round-half-up of `100 * earned / possible`, capped at 100.
fn percentage(earned: u32, possible: u32) -> u8 {
    if possible == 0 {
        return 0;
    }
    let numerator = 200 * earned as u64 + possible as u64;
    let rounded = numerator / (2 * possible as u64);
    rounded.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required(ratings: &[(&str, u8)]) -> Vec<SkillRating> {
        ratings
            .iter()
            .map(|(name, rating)| SkillRating {
                skill_name: name.to_string(),
                rating: *rating,
                is_required: true,
                is_custom: false,
            })
            .collect()
    }

    fn custom(name: &str, rating: u8) -> CustomSkill {
        CustomSkill {
            name: name.to_string(),
            rating,
            is_new: true,
        }
    }

    #[test]
    fn test_no_skills_scores_zero() {
        assert_eq!(compute_match_breakdown(&[], &[], "anything").score, 0);
    }

    #[test]
    fn test_custom_only_without_requirements_scores_zero() {
        let b = compute_match_breakdown(&[], &[custom("Docker", 4)], "");
        assert_eq!(b.possible, 0);
        assert_eq!(b.score, 0);
    }

    #[test]
    fn test_unrated_required_skill_lowers_score() {
        let b = compute_match_breakdown(&required(&[("A", 5), ("B", 0), ("C", 3)]), &[], "");
        assert_eq!(b.earned, 8);
        assert_eq!(b.possible, 15);
        assert_eq!(b.score, 53);
    }

    #[test]
    fn test_matching_custom_skill_adds_bonus_to_both() {
        let req = required(&[("A", 5), ("B", 0), ("C", 3)]);
        let text = "Experience with Docker required";

        let b = compute_match_breakdown(&req, &[custom("Docker", 4)], text);
        assert_eq!(b.earned, 11);
        assert_eq!(b.possible, 18);
        assert_eq!(b.matched_custom_skills, vec!["Docker".to_string()]);
        // 1100 / 18 = 61.1
        assert_eq!(b.score, 61);
    }

    #[test]
    fn test_unmatched_custom_skill_only_adds_possible() {
        let req = required(&[("A", 5), ("B", 0), ("C", 3)]);
        let b = compute_match_breakdown(&req, &[custom("Macrame", 5)], "Experience with Docker required");
        assert_eq!(b.earned, 8);
        assert_eq!(b.possible, 18);
        assert!(b.matched_custom_skills.is_empty());
        assert_eq!(b.score, 44);
    }

    #[test]
    fn test_custom_match_is_case_insensitive() {
        let b = compute_match_breakdown(&[], &[custom("docker", 3)], "DOCKER and Kubernetes");
        assert_eq!(b.score, 100);
    }

    #[test]
    fn test_rounds_half_up() {
        // 1/8 = 12.5% → 13
        assert_eq!(percentage(1, 8), 13);
        // 5/8 = 62.5% → 63
        assert_eq!(percentage(5, 8), 63);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 3), 33);
    }

    #[test]
    fn test_score_is_capped_at_100() {
        assert_eq!(percentage(10, 5), 100);
        let b = compute_match_breakdown(&required(&[("A", 9)]), &[], "");
        assert_eq!(b.score, 100);
    }
}
