//! Results of the document-intelligence backend.
//!
//! Field keys here are whatever the remote invoice model reports (for the
//! prebuilt invoice model: `InvoiceId`, `VendorName`, ...); they are not
//! normalized to the LLM column set. Ordered maps keep the sheet schema
//! stable in the order the service returned the fields.

use indexmap::IndexMap;

/// One analyzed document: its resolved scalar fields plus any line items from
/// the nested `Items` array, each item an ordered field map of its own.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDocument {
    pub fields: IndexMap<String, String>,
    pub items: Vec<IndexMap<String, String>>,
}

impl AnalyzedDocument {
    /// The invoice identifier the item rows are keyed by.
    pub fn invoice_id(&self) -> &str {
        self.fields.get("InvoiceId").map(String::as_str).unwrap_or("")
    }
}

/// One generic table detected in the source document, as a dense row-major
/// matrix. Cells the service did not report are empty strings.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedTable {
    pub rows: Vec<Vec<String>>,
}

/// Everything one analysis call produced.
#[derive(Debug, Clone, Default)]
pub struct AnalysisOutcome {
    pub documents: Vec<AnalyzedDocument>,
    pub tables: Vec<AnalyzedTable>,
}
