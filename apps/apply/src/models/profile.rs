use serde::{Deserialize, Deserializer, Serialize};

/// Self-assessed level attached to a profile skill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Proficiency {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
    Unknown,
}

/// Levels are matched ignoring case and surrounding whitespace; anything
/// unrecognised becomes `Unknown`.
impl<'de> Deserialize<'de> for Proficiency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Proficiency::from_label(&label))
    }
}

impl Proficiency {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "beginner" => Proficiency::Beginner,
            "intermediate" => Proficiency::Intermediate,
            "advanced" => Proficiency::Advanced,
            "expert" => Proficiency::Expert,
            _ => Proficiency::Unknown,
        }
    }

    /// Star rating used to seed a required skill from the applicant's profile.
    pub fn stars(self) -> u8 {
        match self {
            Proficiency::Beginner => 2,
            Proficiency::Intermediate => 3,
            Proficiency::Advanced => 4,
            Proficiency::Expert => 5,
            Proficiency::Unknown => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSkill {
    pub name: String,
    pub proficiency: Proficiency,
}

/// Applicant profile as returned by the backend's `GET /api/profile`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<ProfileSkill>,
    #[serde(default)]
    pub resume_url: Option<String>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn has_resume(&self) -> bool {
        self.resume_url
            .as_deref()
            .map(|u| !u.trim().is_empty())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proficiency_star_table() {
        assert_eq!(Proficiency::Beginner.stars(), 2);
        assert_eq!(Proficiency::Intermediate.stars(), 3);
        assert_eq!(Proficiency::Advanced.stars(), 4);
        assert_eq!(Proficiency::Expert.stars(), 5);
        assert_eq!(Proficiency::Unknown.stars(), 0);
    }

    #[test]
    fn test_unknown_proficiency_deserializes() {
        let skill: ProfileSkill =
            serde_json::from_str(r#"{"name":"Go","proficiency":"guru"}"#).unwrap();
        assert_eq!(skill.proficiency, Proficiency::Unknown);
    }

    #[test]
    fn test_proficiency_ignores_case() {
        let skills: Vec<ProfileSkill> = serde_json::from_str(
            r#"[{"name":"React","proficiency":"Advanced"},{"name":"Rust","proficiency":" EXPERT "}]"#,
        )
        .unwrap();
        assert_eq!(skills[0].proficiency, Proficiency::Advanced);
        assert_eq!(skills[1].proficiency.stars(), 5);
    }

    #[test]
    fn test_blank_resume_url_is_not_a_resume() {
        let profile = Profile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            title: None,
            bio: None,
            skills: vec![],
            resume_url: Some("  ".to_string()),
        };
        assert!(!profile.has_resume());
        assert_eq!(profile.full_name(), "Ada Lovelace");
    }
}
