//! Extraction backend abstractions and implementations.
//!
//! Two trait seams, one per backend family: `InvoiceExtractor` turns a PDF
//! into a fixed-schema invoice via an LLM call, `DocumentAnalyzer` runs a
//! prebuilt document-intelligence model and returns whatever fields and
//! tables the service found. Mock implementations back the tests.

pub mod azure;
pub mod mock;
pub mod openai;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AnalysisOutcome, ExtractedInvoice};

/// Error type for backend operations.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Rate limited")]
    RateLimited,

    /// The model's response text was not a valid JSON object. The message
    /// names the uploaded file it belongs to.
    #[error("{0}")]
    MalformedOutput(String),

    /// The remote analysis job finished in a failed state.
    #[error("Analysis failed: {0}")]
    AnalysisFailed(String),

    /// The analysis job did not finish within the poll attempt cap.
    #[error("analysis did not complete after {polls} polls")]
    PollTimeout { polls: u32 },
}

/// LLM-backed extraction: one PDF in, one fixed-schema invoice out.
#[async_trait]
pub trait InvoiceExtractor: Send + Sync {
    async fn extract(
        &self,
        filename: &str,
        pdf_bytes: &[u8],
    ) -> Result<ExtractedInvoice, ProviderError>;

    /// Health check, surfaced on the readiness endpoint.
    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Document-intelligence-backed analysis: one PDF in, service-defined fields,
/// line items and generic tables out.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn analyze(&self, pdf_bytes: &[u8]) -> Result<AnalysisOutcome, ProviderError>;

    async fn health_check(&self) -> Result<(), ProviderError>;
}

/// Strict-parse a model's raw output into an invoice. Markdown fences are
/// stripped first since models occasionally add them despite instructions;
/// anything else that is not a JSON object fails the whole request.
pub fn parse_model_output(text: &str, filename: &str) -> Result<ExtractedInvoice, ProviderError> {
    let json_str = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let data: serde_json::Value = serde_json::from_str(json_str).map_err(|_| {
        ProviderError::MalformedOutput(format!(
            "Processing {} failed: model response is not valid JSON",
            filename
        ))
    })?;

    if !data.is_object() {
        return Err(ProviderError::MalformedOutput(format!(
            "Processing {} failed: model response is not a JSON object",
            filename
        )));
    }

    Ok(ExtractedInvoice::from_json(&data))
}
