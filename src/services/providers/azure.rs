//! Document-intelligence extraction backend.
//!
//! Submits the PDF to a prebuilt invoice-analysis model and polls the
//! returned operation until it completes, then walks the result's field tree
//! into flat, order-preserving maps plus dense table matrices.

use super::{DocumentAnalyzer, ProviderError};
use crate::models::{AnalysisOutcome, AnalyzedDocument, AnalyzedTable};
use async_trait::async_trait;
use base64::Engine;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Deserialize;

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Document-intelligence backend configuration.
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub api_version: String,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
}

pub struct AzureDocumentAnalyzer {
    config: AzureConfig,
    client: Client,
}

impl AzureDocumentAnalyzer {
    pub fn new(config: AzureConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn analyze_url(&self) -> String {
        format!(
            "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model_id,
            self.config.api_version
        )
    }

    /// Submit the document; returns the operation URL to poll.
    async fn submit(&self, pdf_bytes: &[u8]) -> Result<String, ProviderError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(pdf_bytes);

        let response = self
            .client
            .post(self.analyze_url())
            .header(API_KEY_HEADER, &self.config.api_key)
            .json(&serde_json::json!({ "base64Source": encoded }))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimited);
            }

            return Err(ProviderError::Api(format!(
                "Analyze submission failed {}: {}",
                status, error_text
            )));
        }

        response
            .headers()
            .get("operation-location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                ProviderError::Api("Analyze response missing Operation-Location".to_string())
            })
    }

    /// Poll the operation until it reports a terminal status.
    async fn await_result(&self, operation_url: &str) -> Result<AnalyzeResult, ProviderError> {
        for poll in 0..self.config.max_polls {
            let response = self
                .client
                .get(operation_url)
                .header(API_KEY_HEADER, &self.config.api_key)
                .send()
                .await
                .map_err(|e| ProviderError::Network(e.to_string()))?;

            if !response.status().is_success() {
                let status = response.status();
                let error_text = response.text().await.unwrap_or_default();
                return Err(ProviderError::Api(format!(
                    "Analyze poll failed {}: {}",
                    status, error_text
                )));
            }

            let operation: AnalyzeOperation = response
                .json()
                .await
                .map_err(|e| ProviderError::Api(format!("Failed to parse poll response: {}", e)))?;

            match operation.status.as_str() {
                "succeeded" => {
                    return Ok(operation.analyze_result.unwrap_or_default());
                }
                "failed" => {
                    let message = operation
                        .error
                        .map(|e| format!("{}: {}", e.code, e.message))
                        .unwrap_or_else(|| "analysis job failed".to_string());
                    return Err(ProviderError::AnalysisFailed(message));
                }
                _ => {
                    tracing::debug!(poll, status = %operation.status, "Analysis still running");
                    tokio::time::sleep(std::time::Duration::from_millis(
                        self.config.poll_interval_ms,
                    ))
                    .await;
                }
            }
        }

        Err(ProviderError::PollTimeout {
            polls: self.config.max_polls,
        })
    }
}

#[async_trait]
impl DocumentAnalyzer for AzureDocumentAnalyzer {
    async fn analyze(&self, pdf_bytes: &[u8]) -> Result<AnalysisOutcome, ProviderError> {
        tracing::debug!(
            model = %self.config.model_id,
            pdf_bytes = pdf_bytes.len(),
            "Submitting document for analysis"
        );

        let operation_url = self.submit(pdf_bytes).await?;
        let result = self.await_result(&operation_url).await?;

        Ok(convert_result(&result))
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.endpoint.is_empty() || self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "Document-intelligence endpoint or key not configured".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flatten one analyze result into documents and table matrices.
pub(crate) fn convert_result(result: &AnalyzeResult) -> AnalysisOutcome {
    AnalysisOutcome {
        documents: result.documents.iter().map(convert_document).collect(),
        tables: result.tables.iter().map(convert_table).collect(),
    }
}

fn convert_document(document: &DiDocument) -> AnalyzedDocument {
    let mut fields = IndexMap::new();
    let mut items = Vec::new();

    for (key, field) in &document.fields {
        // The Items array gets its own sheet; composite fields have no useful
        // scalar rendering so they stay out of the flat header map.
        if key == "Items" {
            if let Some(entries) = &field.value_array {
                for entry in entries {
                    let mut item = IndexMap::new();
                    if let Some(object) = &entry.value_object {
                        for (item_key, item_field) in object {
                            item.insert(item_key.clone(), item_field.scalar_text());
                        }
                    }
                    items.push(item);
                }
            }
            continue;
        }
        if field.value_array.is_some() || field.value_object.is_some() {
            continue;
        }
        fields.insert(key.clone(), field.scalar_text());
    }

    AnalyzedDocument { fields, items }
}

fn convert_table(table: &DiTable) -> AnalyzedTable {
    let row_count = table.row_count as usize;
    let column_count = table.column_count as usize;
    let mut rows = vec![vec![String::new(); column_count]; row_count];

    for cell in &table.cells {
        let row = cell.row_index as usize;
        let column = cell.column_index as usize;
        if row < row_count && column < column_count {
            rows[row][column] = cell.content.clone();
        }
    }

    AnalyzedTable { rows }
}

// ============================================================================
// Document Intelligence API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalyzeOperation {
    status: String,
    #[serde(default)]
    analyze_result: Option<AnalyzeResult>,
    #[serde(default)]
    error: Option<OperationError>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AnalyzeResult {
    #[serde(default)]
    documents: Vec<DiDocument>,
    #[serde(default)]
    tables: Vec<DiTable>,
}

#[derive(Debug, Deserialize, Default)]
struct DiDocument {
    #[serde(default)]
    fields: IndexMap<String, DiField>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiField {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    value_string: Option<String>,
    #[serde(default)]
    value_number: Option<f64>,
    #[serde(default)]
    value_integer: Option<i64>,
    #[serde(default)]
    value_date: Option<String>,
    #[serde(default)]
    value_currency: Option<DiCurrency>,
    #[serde(default)]
    value_array: Option<Vec<DiField>>,
    #[serde(default)]
    value_object: Option<IndexMap<String, DiField>>,
}

impl DiField {
    /// Resolve to text, preferring a typed value over raw content.
    fn scalar_text(&self) -> String {
        if let Some(s) = &self.value_string {
            return s.clone();
        }
        if let Some(n) = self.value_number {
            return n.to_string();
        }
        if let Some(n) = self.value_integer {
            return n.to_string();
        }
        if let Some(d) = &self.value_date {
            return d.clone();
        }
        if let Some(c) = &self.value_currency {
            if let Some(amount) = c.amount {
                return amount.to_string();
            }
        }
        self.content.clone().unwrap_or_default()
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiCurrency {
    #[serde(default)]
    amount: Option<f64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiTable {
    #[serde(default)]
    row_count: u32,
    #[serde(default)]
    column_count: u32,
    #[serde(default)]
    cells: Vec<DiCell>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct DiCell {
    #[serde(default)]
    row_index: u32,
    #[serde(default)]
    column_index: u32,
    #[serde(default)]
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
        "documents": [
            {
                "fields": {
                    "InvoiceId": { "type": "string", "valueString": "INV-100", "content": "INV-100" },
                    "VendorName": { "type": "string", "content": "Acme Kft." },
                    "InvoiceTotal": {
                        "type": "currency",
                        "content": "5 730,88 Ft",
                        "valueCurrency": { "amount": 5730.88, "currencyCode": "HUF" }
                    },
                    "Items": {
                        "type": "array",
                        "valueArray": [
                            {
                                "type": "object",
                                "valueObject": {
                                    "Description": { "type": "string", "valueString": "Widget" },
                                    "Amount": {
                                        "type": "currency",
                                        "valueCurrency": { "amount": 12.5 }
                                    }
                                }
                            }
                        ]
                    }
                }
            }
        ],
        "tables": [
            {
                "rowCount": 2,
                "columnCount": 3,
                "cells": [
                    { "rowIndex": 0, "columnIndex": 0, "content": "a" },
                    { "rowIndex": 0, "columnIndex": 2, "content": "c" },
                    { "rowIndex": 1, "columnIndex": 1, "content": "e" }
                ]
            }
        ]
    }"#;

    #[test]
    fn walks_fields_preferring_typed_values() {
        let result: AnalyzeResult = serde_json::from_str(FIXTURE).unwrap();
        let outcome = convert_result(&result);

        assert_eq!(outcome.documents.len(), 1);
        let document = &outcome.documents[0];
        assert_eq!(document.invoice_id(), "INV-100");
        assert_eq!(document.fields["VendorName"], "Acme Kft.");
        assert_eq!(document.fields["InvoiceTotal"], "5730.88");
        assert!(!document.fields.contains_key("Items"));
    }

    #[test]
    fn items_are_flattened_separately() {
        let result: AnalyzeResult = serde_json::from_str(FIXTURE).unwrap();
        let outcome = convert_result(&result);

        let items = &outcome.documents[0].items;
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["Description"], "Widget");
        assert_eq!(items[0]["Amount"], "12.5");
    }

    #[test]
    fn tables_become_dense_matrices() {
        let result: AnalyzeResult = serde_json::from_str(FIXTURE).unwrap();
        let outcome = convert_result(&result);

        assert_eq!(outcome.tables.len(), 1);
        let rows = &outcome.tables[0].rows;
        assert_eq!(rows, &vec![
            vec!["a".to_string(), "".to_string(), "c".to_string()],
            vec!["".to_string(), "e".to_string(), "".to_string()],
        ]);
    }

    #[test]
    fn field_order_is_preserved() {
        let result: AnalyzeResult = serde_json::from_str(FIXTURE).unwrap();
        let outcome = convert_result(&result);

        let keys: Vec<&str> = outcome.documents[0]
            .fields
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(keys, vec!["InvoiceId", "VendorName", "InvoiceTotal"]);
    }
}
