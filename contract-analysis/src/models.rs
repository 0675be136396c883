use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical structured output of a contract analysis.
///
/// A value of this type only exists after every field passed validation at
/// the model trust boundary, and it is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: String,
    pub risks: Vec<String>,
    pub obligations: Vec<String>,
    pub red_flags: Vec<String>,
    pub section_summaries: Vec<SectionSummary>,
}

/// Per-section digest of the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub section: String,
    pub summary: String,
}

/// An uploaded contract document, alive for the duration of one request.
#[derive(Debug, Clone)]
pub struct UploadedDocument {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedDocument {
    pub fn new(file_name: impl Into<String>, content_type: Option<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            bytes,
        }
    }

    /// Whether the declared media type, the filename extension, or the magic
    /// number identifies this upload as a PDF.
    pub fn is_pdf(&self) -> bool {
        self.content_type.as_deref() == Some("application/pdf")
            || self.file_name.to_lowercase().ends_with(".pdf")
            || self.bytes.starts_with(b"%PDF")
    }
}

/// Plain text recovered from an uploaded document.
///
/// Guaranteed non-empty after trimming; only the extractor constructs it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText(String);

impl ExtractedText {
    /// Trims and wraps extractor output, or `None` when nothing is left.
    pub(crate) fn new(text: String) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A persisted analysis, as returned in a user's history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub analysis: AnalysisResult,
    pub created_at: DateTime<Utc>,
}

impl AnalysisRecord {
    pub fn new(
        user_id: impl Into<String>,
        file_name: impl Into<String>,
        analysis: AnalysisResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            file_name: file_name.into(),
            analysis,
            created_at: Utc::now(),
        }
    }
}

/// An authenticated user, as resolved by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

/// Success payload for one analyzed upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub file_name: String,
    pub analysis: AnalysisResult,
}

/// A user's saved analyses, most recent first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisHistory {
    pub analyses: Vec<AnalysisRecord>,
}
