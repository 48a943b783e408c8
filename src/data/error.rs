use thiserror::Error;

/// A failed backend request. The caller keeps its last good state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("unknown item `{0}`")]
    UnknownId(String),
    #[error("no items are selected")]
    EmptySelection,
    #[error("fetch worker stopped before answering")]
    WorkerLost,
}
