//! Shared test harness: spawns the service with mock extraction backends.
//!
//! The mocks treat the uploaded bytes as the remote service's response, so
//! each test controls the extraction result through the file payload it
//! uploads.

use calamine::{Reader, Xlsx};
use invoice_import_service::config::ImportConfig;
use invoice_import_service::startup::Application;
use reqwest::multipart;
use std::io::Cursor;

pub struct TestApp {
    pub address: String,
}

impl TestApp {
    pub async fn spawn() -> Self {
        std::env::set_var("ENVIRONMENT", "test");
        std::env::set_var("APP__PORT", "0");
        std::env::set_var("EXTRACTION_MODE", "mock");

        let config = ImportConfig::load().expect("Failed to load configuration");
        let app = Application::build(config)
            .await
            .expect("Failed to build test application");
        let port = app.port();

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        let address = format!("http://127.0.0.1:{}", port);

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp { address }
    }
}

/// A multipart file part declared as a PDF; the bytes drive the mock backend.
pub fn pdf_part(bytes: impl Into<Vec<u8>>, filename: &str) -> multipart::Part {
    multipart::Part::bytes(bytes.into())
        .file_name(filename.to_string())
        .mime_str("application/pdf")
        .unwrap()
}

/// Read one sheet of a returned workbook as rows of strings.
pub fn read_sheet(workbook_bytes: &[u8], sheet_name: &str) -> Vec<Vec<String>> {
    let mut workbook =
        Xlsx::new(Cursor::new(workbook_bytes.to_vec())).expect("Failed to open workbook");
    let range = workbook
        .worksheet_range(sheet_name)
        .expect("Sheet not found");
    range
        .rows()
        .map(|row| row.iter().map(|cell| cell.to_string()).collect())
        .collect()
}

/// Sheet names of a returned workbook, in creation order.
pub fn sheet_names(workbook_bytes: &[u8]) -> Vec<String> {
    let workbook =
        Xlsx::new(Cursor::new(workbook_bytes.to_vec())).expect("Failed to open workbook");
    workbook.sheet_names().to_vec()
}
