use thiserror::Error;

/// Failure taxonomy for the contract analysis pipeline.
///
/// Every variant is terminal for the request that produced it: nothing is
/// retried and no partial analysis is ever returned.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No resolvable user identity on the request.
    #[error("unauthorized: no resolvable user identity")]
    Unauthorized,

    /// The upload does not declare a supported document format.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// The uploaded document was zero bytes long.
    #[error("uploaded document is empty")]
    EmptyInput,

    /// Bytes were present but no usable text could be recovered from them.
    #[error("could not extract text from document: {0}")]
    Extraction(String),

    /// Required model-service configuration is missing.
    #[error("model service is not configured: {0}")]
    Configuration(String),

    /// The model service answered with no textual payload.
    #[error("model service returned an empty response")]
    EmptyResponse,

    /// The model response was not parseable JSON at all.
    #[error("model response was not valid JSON: {0}")]
    MalformedResponse(String),

    /// A named field of the model response failed validation.
    #[error("invalid model response field: {0}")]
    Schema(&'static str),

    /// The model service or identity provider could not be reached.
    #[error("upstream request failed: {0}")]
    Upstream(String),

    /// The analysis datastore failed.
    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
