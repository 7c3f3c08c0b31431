use serde::{Deserialize, Serialize};

/// Job posting fields the application form needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    /// Skills declared by the posting; each becomes a required skill in the form.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Free-text requirements, used for custom-skill relevance matching.
    #[serde(default)]
    pub requirements: String,
}
