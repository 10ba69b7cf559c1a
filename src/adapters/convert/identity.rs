//! Identity converter for formats that are already markdown-compatible
//! text (§4.3 step 4). PDF/DOCX conversion requires a dedicated parsing
//! library outside this crate's dependency set and is not implemented;
//! `IdentityConverter::supports` returns `false` for those formats so the
//! ingestion pipeline reports `UnsupportedFormat` rather than silently
//! mishandling binary input.

use async_trait::async_trait;

use crate::domain::errors::IngestionError;
use crate::domain::models::DocumentFormat;
use crate::domain::ports::DocumentConverter;

pub struct IdentityConverter;

#[async_trait]
impl DocumentConverter for IdentityConverter {
    fn supports(&self, format: DocumentFormat) -> bool {
        format.is_identity()
    }

    async fn convert(&self, format: DocumentFormat, raw: &[u8]) -> Result<String, IngestionError> {
        if !self.supports(format) {
            return Err(IngestionError::UnsupportedFormat(format.as_str().to_string()));
        }
        String::from_utf8(raw.to_vec()).map_err(|e| IngestionError::ConversionFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn converts_markdown_bytes_unchanged() {
        let converter = IdentityConverter;
        let out = converter.convert(DocumentFormat::Md, b"# Title\n\nBody").await.unwrap();
        assert_eq!(out, "# Title\n\nBody");
    }

    #[tokio::test]
    async fn rejects_pdf_as_unsupported() {
        let converter = IdentityConverter;
        let err = converter.convert(DocumentFormat::Pdf, b"%PDF-1.4").await.unwrap_err();
        assert!(matches!(err, IngestionError::UnsupportedFormat(_)));
    }

    #[tokio::test]
    async fn rejects_non_utf8_text() {
        let converter = IdentityConverter;
        let err = converter.convert(DocumentFormat::Txt, &[0xff, 0xfe, 0xfd]).await.unwrap_err();
        assert!(matches!(err, IngestionError::ConversionFailed(_)));
    }
}
