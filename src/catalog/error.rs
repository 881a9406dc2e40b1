/// Errors that can occur during catalog operations
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("worker already registered: {0}")]
    DuplicateWorker(String),

    #[error("worker not found: {0}")]
    WorkerNotFound(String),

    #[error("invalid worker '{id}': {message}")]
    InvalidWorker { id: String, message: String },
}
