pub mod analysis;
pub mod invoice;

pub use analysis::{AnalysisOutcome, AnalyzedDocument, AnalyzedTable};
pub use invoice::{ExtractedInvoice, InvoiceRecord, LineItem, INVOICE_COLUMNS, ITEM_COLUMNS};
