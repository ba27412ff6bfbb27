pub mod completeness;
pub mod scoring;

pub use completeness::validate;
pub use scoring::{average_score, score_field};
