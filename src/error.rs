/// Rejected user input: an empty query or a non-numeric quantity.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Failure of a recipe-data or search collaborator call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server responded with status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("duplicate entry: {0}")]
    Duplicate(String),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Errors surfaced by the application state container.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("no recipe is currently selected")]
    NoActiveRecipe,
    #[error("response superseded by a newer request")]
    Superseded,
}

pub(crate) fn map_anyhow(err: anyhow::Error) -> StoreError {
    StoreError::Storage(format!("{err:#}"))
}
