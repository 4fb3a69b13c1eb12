//! Mock backend implementations for testing.
//!
//! Both mocks run the same parse/conversion paths as the live backends; only
//! the network hop is replaced. The uploaded bytes stand in for the remote
//! service's response: the extractor treats them as the model's raw output
//! text, the analyzer as a serialized analyze result.

use super::{azure, parse_model_output, DocumentAnalyzer, InvoiceExtractor, ProviderError};
use crate::models::{AnalysisOutcome, ExtractedInvoice};
use async_trait::async_trait;

pub struct MockInvoiceExtractor;

#[async_trait]
impl InvoiceExtractor for MockInvoiceExtractor {
    async fn extract(
        &self,
        filename: &str,
        pdf_bytes: &[u8],
    ) -> Result<ExtractedInvoice, ProviderError> {
        let text = String::from_utf8_lossy(pdf_bytes);
        parse_model_output(&text, filename)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

pub struct MockDocumentAnalyzer;

#[async_trait]
impl DocumentAnalyzer for MockDocumentAnalyzer {
    async fn analyze(&self, pdf_bytes: &[u8]) -> Result<AnalysisOutcome, ProviderError> {
        let result: azure::AnalyzeResult = serde_json::from_slice(pdf_bytes)
            .map_err(|e| ProviderError::AnalysisFailed(format!("mock analyze result: {}", e)))?;
        Ok(azure::convert_result(&result))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
