//! Text extraction from uploaded contract documents.

use lopdf::Document;
use tracing::info;

use crate::error::{AnalysisError, Result};
use crate::models::ExtractedText;

/// Extract the embedded text layer of an uploaded PDF.
///
/// Fails with [`AnalysisError::EmptyInput`] for a zero-length buffer and with
/// [`AnalysisError::Extraction`] when the document parses but yields no
/// usable text, which is what a scanned page without a text layer looks like.
/// Parsing runs on a blocking thread so large documents do not stall the
/// async runtime.
pub async fn extract_text(bytes: &[u8]) -> Result<ExtractedText> {
    if bytes.is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let buffer = bytes.to_vec();
    let text = tokio::task::spawn_blocking(move || extract_pdf_text(&buffer))
        .await
        .map_err(|e| AnalysisError::Extraction(format!("extraction task failed: {e}")))??;

    let extracted = ExtractedText::new(text).ok_or_else(|| {
        AnalysisError::Extraction("document contains no extractable text".to_string())
    })?;

    info!(
        "extracted {} characters of contract text",
        extracted.as_str().len()
    );
    Ok(extracted)
}

/// Pages that fail to decode are skipped; the all-empty case is handled by
/// the caller.
fn extract_pdf_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| AnalysisError::Extraction(format!("failed to load PDF: {e}")))?;

    let mut text = String::new();
    for (page_num, _) in doc.get_pages() {
        if let Ok(page_text) = doc.extract_text(&[page_num]) {
            text.push_str(&page_text);
            text.push('\n');
        }
    }

    Ok(text)
}

/// Build a one-page PDF whose text layer contains `content`.
#[cfg(test)]
pub(crate) fn pdf_with_text(content: &str) -> Vec<u8> {
    use lopdf::{Object, Stream, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.new_object_id();
    let resources_id = doc.new_object_id();
    let content_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        font_id,
        Object::Dictionary(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        }),
    );

    doc.objects.insert(
        resources_id,
        Object::Dictionary(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        }),
    );

    let stream = format!("BT /F1 12 Tf 50 700 Td ({content}) Tj ET");
    doc.objects.insert(
        content_id,
        Object::Stream(Stream::new(dictionary! {}, stream.into_bytes())),
    );

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => resources_id,
            "Contents" => content_id,
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut pdf_bytes = Vec::new();
    doc.save_to(&mut pdf_bytes).unwrap();
    pdf_bytes
}

/// Build a structurally valid one-page PDF with no content stream at all.
#[cfg(test)]
pub(crate) fn pdf_without_text() -> Vec<u8> {
    use lopdf::{Object, dictionary};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();

    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut pdf_bytes = Vec::new();
    doc.save_to(&mut pdf_bytes).unwrap();
    pdf_bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_buffer_is_rejected_as_empty_input() {
        let result = extract_text(&[]).await;
        assert!(matches!(result, Err(AnalysisError::EmptyInput)));
    }

    #[tokio::test]
    async fn garbage_bytes_fail_extraction() {
        let result = extract_text(b"not a valid pdf content").await;
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));
    }

    #[tokio::test]
    async fn embedded_text_is_extracted() {
        let bytes = pdf_with_text("Master Services Agreement");
        let text = extract_text(&bytes).await.unwrap();
        assert!(text.as_str().contains("Master Services Agreement"));
    }

    #[tokio::test]
    async fn textless_pdf_fails_instead_of_returning_empty_text() {
        let bytes = pdf_without_text();
        let result = extract_text(&bytes).await;
        assert!(matches!(result, Err(AnalysisError::Extraction(_))));
    }
}
