use crate::error::AppError;
use crate::services::workbook::{
    build_workbook, export_filename, AnalysisBatch, InvoiceBatch, XLSX_CONTENT_TYPE,
};
use crate::startup::AppState;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
};

const PDF_CONTENT_TYPE: &str = "application/pdf";

struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

/// Read every multipart part named `field_name` into memory, validating the
/// declared content type and per-file size before anything is sent to a
/// remote backend. A single bad file rejects the whole upload.
async fn collect_pdf_uploads(
    multipart: &mut Multipart,
    field_name: &str,
    max_file_bytes: usize,
) -> Result<Vec<UploadedFile>, AppError> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        if field.name() != Some(field_name) {
            continue;
        }

        let filename = field.file_name().unwrap_or("unnamed").to_string();

        let content_type = field.content_type().unwrap_or_default().to_string();
        if content_type != PDF_CONTENT_TYPE {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} is not a PDF file",
                filename
            )));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| {
                AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
            })?
            .to_vec();

        if bytes.len() > max_file_bytes {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "{} is too large (max {} bytes)",
                filename,
                max_file_bytes
            )));
        }

        files.push(UploadedFile { filename, bytes });
    }

    Ok(files)
}

fn xlsx_attachment(buffer: Vec<u8>, filename: &str) -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", filename),
            ),
        ],
        buffer,
    )
}

/// `POST /import/invoice` (and `/import/gpt-5`): one or more PDFs under the
/// `files` field; every file is extracted through the LLM backend and the
/// batch comes back as one workbook.
pub async fn import_invoices(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let files =
        collect_pdf_uploads(&mut multipart, "files", state.config.upload.max_file_bytes).await?;

    if files.is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Upload at least one PDF file"
        )));
    }

    // Files are processed sequentially, in submission order; one failure
    // discards the whole batch.
    let mut batch = InvoiceBatch::new();
    for file in &files {
        tracing::info!(
            filename = %file.filename,
            size = file.bytes.len(),
            "Extracting invoice"
        );

        let extracted = state.extractor.extract(&file.filename, &file.bytes).await?;

        tracing::info!(
            filename = %file.filename,
            invoice_number = %extracted.record.szamlaszam,
            line_items = extracted.items.len(),
            "Invoice extracted"
        );

        batch.push(&extracted);
    }

    let buffer = build_workbook(&batch.into_sheets())?;

    Ok(xlsx_attachment(buffer, &export_filename("invoices")))
}

/// `POST /import/azure-ai`: exactly one PDF under the `file` field, analyzed
/// by the document-intelligence backend. The workbook gains a third sheet
/// concatenating any generic tables the service detected.
pub async fn import_analyzed(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    let mut files =
        collect_pdf_uploads(&mut multipart, "file", state.config.upload.max_file_bytes).await?;

    if files.len() != 1 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Upload exactly one PDF file"
        )));
    }
    let file = files.remove(0);

    tracing::info!(
        filename = %file.filename,
        size = file.bytes.len(),
        "Analyzing invoice document"
    );

    let outcome = state.analyzer.analyze(&file.bytes).await?;

    tracing::info!(
        filename = %file.filename,
        documents = outcome.documents.len(),
        tables = outcome.tables.len(),
        "Document analysis completed"
    );

    let mut batch = AnalysisBatch::new();
    batch.push_outcome(&outcome);

    let buffer = build_workbook(&batch.into_sheets())?;

    Ok(xlsx_attachment(buffer, &export_filename("invoice_data")))
}
