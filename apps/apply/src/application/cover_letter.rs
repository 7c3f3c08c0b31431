//! Cover letter starter text. Pure template fill: the same profile and job
//! title always produce the same bytes, so there is no date or randomness here.

use crate::models::profile::Profile;

pub const FALLBACK_TITLE: &str = "Experienced Professional";
pub const FALLBACK_SKILLS: &str = "relevant skills";
pub const FALLBACK_BIO: &str =
    "I am passionate about delivering high-quality work and continuously growing my expertise.";

const COVER_LETTER_TEMPLATE: &str = "Dear Hiring Manager,

I am writing to express my interest in the {job_title} position. As a {title}, I bring hands-on experience with {skills}, and I am confident I can make a meaningful contribution to your team.

{bio}

I would welcome the opportunity to discuss how my background aligns with the needs of this role. Thank you for your time and consideration.

Sincerely,
{full_name}";

/// Fills the starter template from the applicant's profile.
pub fn generate_cover_letter(profile: &Profile, job_title: &str) -> String {
    let title = non_blank(profile.title.as_deref()).unwrap_or(FALLBACK_TITLE);

    let skill_names: Vec<&str> = profile
        .skills
        .iter()
        .map(|s| s.name.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let skills = if skill_names.is_empty() {
        FALLBACK_SKILLS.to_string()
    } else {
        skill_names.join(", ")
    };

    let bio = non_blank(profile.bio.as_deref()).unwrap_or(FALLBACK_BIO);

    let full_name = profile.full_name();
    fill_template(COVER_LETTER_TEMPLATE, |key| match key {
        "job_title" => Some(job_title.trim()),
        "title" => Some(title),
        "skills" => Some(skills.as_str()),
        "bio" => Some(bio),
        "full_name" => Some(full_name.as_str()),
        _ => None,
    })
}

/// Single pass over `template`: each `{key}` is substituted once, so braces
/// inside substituted values are copied through untouched.
fn fill_template<'a>(template: &str, value: impl Fn(&str) -> Option<&'a str>) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}').and_then(|close| value(&after[..close]).map(|v| (close, v))) {
            Some((close, v)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
