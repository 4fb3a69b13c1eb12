mod health;
mod import;

pub use health::{health_check, readiness_check};
pub use import::{import_analyzed, import_invoices};
