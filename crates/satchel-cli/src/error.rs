use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] satchel_core::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record payload must be a JSON object")]
    PayloadNotAnObject,
    #[error("No API base URL configured; pass --api-url or set SATCHEL_API_URL")]
    MissingApiUrl,
    #[error("Record not found: {0}")]
    RecordNotFound(String),
}
