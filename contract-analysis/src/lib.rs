pub mod analyze;
pub mod auth;
pub mod error;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod storage;
pub mod validate;

// Re-export commonly used types
pub use analyze::{AnalysisRequester, ModelClient, ModelRequest, OpenRouterClient};
pub use auth::{IdentityProvider, OidcUserinfoProvider, StaticTokenProvider};
pub use error::{AnalysisError, Result};
pub use extract::extract_text;
pub use models::{
    AnalysisHistory, AnalysisRecord, AnalysisResult, AnalyzeResponse, ExtractedText, Identity,
    SectionSummary, UploadedDocument,
};
pub use pipeline::UploadPipeline;
pub use storage::{AnalysisStore, InMemoryAnalysisStore, PostgresAnalysisStore};
pub use validate::{parse_analysis, validate_analysis};
