//! Single-pass orchestration of one contract upload.

use std::sync::Arc;

use tracing::info;

use crate::analyze::{AnalysisRequester, ModelClient};
use crate::error::{AnalysisError, Result};
use crate::extract::extract_text;
use crate::models::{AnalyzeResponse, Identity, UploadedDocument};

/// Runs one upload through auth check, format check, extraction, and
/// analysis, in that order.
///
/// Each stage either advances or fails the whole request; nothing is retried
/// and no partial result is ever produced. The caller decides what to do
/// with the completed analysis, including whether to persist it.
pub struct UploadPipeline {
    requester: AnalysisRequester,
}

impl UploadPipeline {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            requester: AnalysisRequester::new(model),
        }
    }

    pub async fn handle_upload(
        &self,
        identity: Option<&Identity>,
        document: UploadedDocument,
    ) -> Result<AnalyzeResponse> {
        let identity = identity.ok_or(AnalysisError::Unauthorized)?;

        if !document.is_pdf() {
            return Err(AnalysisError::UnsupportedFormat(document.file_name.clone()));
        }

        info!(
            user_id = %identity.user_id,
            file_name = %document.file_name,
            size = document.bytes.len(),
            "starting contract analysis"
        );

        let contract_text = extract_text(&document.bytes).await?;
        let analysis = self.requester.analyze(&contract_text).await?;

        info!(
            user_id = %identity.user_id,
            file_name = %document.file_name,
            "contract analysis completed"
        );

        Ok(AnalyzeResponse {
            file_name: document.file_name,
            analysis,
        })
    }
}
