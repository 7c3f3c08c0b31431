// Job application flow: skill ratings, match score, cover letter seed, the
// draft held by an open form, and the submit state machine.
// All backend calls go through `crate::backend::JobBoardBackend`.

pub mod cover_letter;
pub mod form;
pub mod handlers;
pub mod match_score;
pub mod sessions;
pub mod skill_rating;
pub mod workflow;
