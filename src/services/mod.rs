pub mod providers;
pub mod workbook;
