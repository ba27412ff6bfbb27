use thiserror::Error;

/// Errors surfaced by the public API. The extraction pipeline itself never
/// fails; a field that cannot be extracted is simply absent (see the merge
/// reason codes for why a merged field is missing).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VaxtractError {
    #[error("merge requires at least one candidate record")]
    EmptyCandidateSet,
}
