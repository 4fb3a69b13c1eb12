//! Request-scoped row aggregation and xlsx workbook assembly.
//!
//! Both import endpoints feed this one pipeline: rows are collected into
//! `SheetRows` (schema fixed at first write, later rows aligned positionally)
//! and written out through a single workbook builder.

use crate::models::{AnalysisOutcome, ExtractedInvoice, INVOICE_COLUMNS, ITEM_COLUMNS};
use chrono::Local;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

/// Sheet name for invoice header rows.
pub const INVOICE_SHEET: &str = "Számlák";
/// Sheet name for line-item rows.
pub const ITEM_SHEET: &str = "Tételek";
/// Sheet name for concatenated generic tables (document-intelligence variant).
pub const TABLES_SHEET: &str = "Tables";

/// MIME type of the exported workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// One output sheet: a header row of column names, then data rows aligned to
/// that order. Rows narrower than the header are padded with empty strings.
#[derive(Debug, Clone)]
pub struct SheetRows {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetRows {
    pub fn new(name: &str, columns: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, mut row: Vec<String>) {
        if row.len() < self.columns.len() {
            row.resize(self.columns.len(), String::new());
        }
        self.rows.push(row);
    }
}

/// Aggregates LLM-extracted invoices for one request. Column order is fixed
/// in advance by the prompt schema.
pub struct InvoiceBatch {
    invoices: SheetRows,
    items: SheetRows,
}

impl InvoiceBatch {
    pub fn new() -> Self {
        Self {
            invoices: SheetRows::new(
                INVOICE_SHEET,
                INVOICE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            ),
            items: SheetRows::new(
                ITEM_SHEET,
                ITEM_COLUMNS.iter().map(|c| c.to_string()).collect(),
            ),
        }
    }

    /// Add one extracted invoice. Item rows are keyed to the parent by the
    /// record's own invoice number, not by insertion order.
    pub fn push(&mut self, extracted: &ExtractedInvoice) {
        self.invoices.push_row(extracted.record.to_row());

        for item in &extracted.items {
            self.items.push_row(vec![
                extracted.record.szamlaszam.clone(),
                item.megnevezes.clone(),
                item.netto.clone(),
                item.afa.clone(),
                item.afakulcs.clone(),
                item.brutto.clone(),
            ]);
        }
    }

    pub fn into_sheets(self) -> Vec<SheetRows> {
        vec![self.invoices, self.items]
    }
}

impl Default for InvoiceBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregates document-intelligence results for one request. Column order is
/// taken from the first document (and the first table's first row) observed;
/// later rows align to it, absent values as empty strings.
pub struct AnalysisBatch {
    invoices: SheetRows,
    items: SheetRows,
    tables: SheetRows,
    table_count: usize,
}

impl AnalysisBatch {
    pub fn new() -> Self {
        Self {
            invoices: SheetRows::new(INVOICE_SHEET, Vec::new()),
            items: SheetRows::new(ITEM_SHEET, Vec::new()),
            tables: SheetRows::new(TABLES_SHEET, Vec::new()),
            table_count: 0,
        }
    }

    pub fn push_outcome(&mut self, outcome: &AnalysisOutcome) {
        for document in &outcome.documents {
            if self.invoices.columns.is_empty() {
                self.invoices.columns = document.fields.keys().cloned().collect();
            }
            let row = self
                .invoices
                .columns
                .iter()
                .map(|key| document.fields.get(key).cloned().unwrap_or_default())
                .collect();
            self.invoices.push_row(row);

            for item in &document.items {
                if self.items.columns.is_empty() {
                    let mut columns = vec!["InvoiceId".to_string()];
                    columns.extend(item.keys().cloned());
                    self.items.columns = columns;
                }
                let mut row = vec![document.invoice_id().to_string()];
                row.extend(
                    self.items.columns[1..]
                        .iter()
                        .map(|key| item.get(key).cloned().unwrap_or_default()),
                );
                self.items.push_row(row);
            }
        }

        for table in &outcome.tables {
            if table.rows.is_empty() {
                continue;
            }
            // First row of the first table becomes the sheet header; every
            // table contributes its rows after its own first row, followed by
            // one blank separator row.
            if self.tables.columns.is_empty() {
                self.tables.columns = table.rows[0].clone();
            }
            for row in table.rows.iter().skip(1) {
                self.tables.push_row(row.clone());
            }
            self.tables.push_row(Vec::new());
            self.table_count += 1;
        }
    }

    pub fn into_sheets(self) -> Vec<SheetRows> {
        if self.table_count > 0 {
            vec![self.invoices, self.items, self.tables]
        } else {
            vec![self.invoices, self.items]
        }
    }
}

impl Default for AnalysisBatch {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize the sheets into an in-memory xlsx workbook. The first sheet is
/// the workbook's default sheet.
pub fn build_workbook(sheets: &[SheetRows]) -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;

        for (col, header) in sheet.columns.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }
        for (row_idx, row) in sheet.rows.iter().enumerate() {
            for (col_idx, cell) in row.iter().enumerate() {
                if !cell.is_empty() {
                    worksheet.write_string((row_idx + 1) as u32, col_idx as u16, cell)?;
                }
            }
        }
    }

    workbook.save_to_buffer()
}

/// Download filename with a second-resolution timestamp.
pub fn export_filename(prefix: &str) -> String {
    format!("{}_{}.xlsx", prefix, Local::now().format("%Y-%m-%d_%H-%M-%S"))
}
