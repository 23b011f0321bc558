use thiserror::Error;

/// Fatal analysis errors.
///
/// Local outcomes such as an empty `K`, a collapsed refinement or an
/// indeterminate witness are recorded in the stage tree instead.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Solver error: {0}")]
    Solver(String),
    /// The oracle answered `unknown` on a finite boolean domain.
    #[error("Inconclusive oracle answer: {0}")]
    Inconclusive(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
