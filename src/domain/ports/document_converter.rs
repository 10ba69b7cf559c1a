//! Document-to-markdown conversion port (§4.3 step 4).

use async_trait::async_trait;

use crate::domain::errors::IngestionError;
use crate::domain::models::DocumentFormat;

#[async_trait]
pub trait DocumentConverter: Send + Sync {
    /// True if this converter handles the given format.
    fn supports(&self, format: DocumentFormat) -> bool;

    /// Converts raw document bytes to markdown. Identity formats (`Md`,
    /// `Txt`) are expected to decode as UTF-8 and pass through unchanged.
    async fn convert(&self, format: DocumentFormat, raw: &[u8]) -> Result<String, IngestionError>;
}
