//! End-to-end tests for the document-intelligence import endpoint.

mod common;

use common::{pdf_part, read_sheet, sheet_names, TestApp};
use reqwest::multipart::Form;
use reqwest::StatusCode;

const INVOICE_SHEET: &str = "Számlák";
const ITEM_SHEET: &str = "Tételek";
const TABLES_SHEET: &str = "Tables";

/// An analyze result the mock backend replays: one invoice with two line
/// items and one generic table.
const ANALYZE_RESULT: &str = r#"{
    "documents": [
        {
            "fields": {
                "InvoiceId": { "type": "string", "valueString": "AZ-1" },
                "VendorName": { "type": "string", "valueString": "Acme Kft." },
                "InvoiceTotal": {
                    "type": "currency",
                    "content": "254 Ft",
                    "valueCurrency": { "amount": 254.0 }
                },
                "Items": {
                    "type": "array",
                    "valueArray": [
                        {
                            "type": "object",
                            "valueObject": {
                                "Description": { "type": "string", "valueString": "Widget" },
                                "Amount": { "type": "currency", "valueCurrency": { "amount": 127.0 } }
                            }
                        },
                        {
                            "type": "object",
                            "valueObject": {
                                "Description": { "type": "string", "valueString": "Gadget" },
                                "Amount": { "type": "currency", "valueCurrency": { "amount": 127.0 } }
                            }
                        }
                    ]
                }
            }
        }
    ],
    "tables": [
        {
            "rowCount": 3,
            "columnCount": 2,
            "cells": [
                { "rowIndex": 0, "columnIndex": 0, "content": "Name" },
                { "rowIndex": 0, "columnIndex": 1, "content": "Value" },
                { "rowIndex": 1, "columnIndex": 0, "content": "alpha" },
                { "rowIndex": 1, "columnIndex": 1, "content": "1" },
                { "rowIndex": 2, "columnIndex": 0, "content": "beta" }
            ]
        }
    ]
}"#;

#[tokio::test]
async fn analyzed_document_fills_all_three_sheets() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let form = Form::new().part("file", pdf_part(ANALYZE_RESULT, "scan.pdf"));

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, response.status());
    let disposition = response.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=invoice_data_"));

    let bytes = response.bytes().await.unwrap();

    assert_eq!(
        sheet_names(&bytes),
        vec![INVOICE_SHEET, ITEM_SHEET, TABLES_SHEET]
    );

    // header columns come from the service's own field keys
    let invoices = read_sheet(&bytes, INVOICE_SHEET);
    assert_eq!(invoices.len(), 2);
    assert_eq!(invoices[0], vec!["InvoiceId", "VendorName", "InvoiceTotal"]);
    assert_eq!(invoices[1], vec!["AZ-1", "Acme Kft.", "254"]);

    // item rows keyed to the parent invoice id
    let items = read_sheet(&bytes, ITEM_SHEET);
    assert_eq!(items.len(), 3);
    assert_eq!(items[0], vec!["InvoiceId", "Description", "Amount"]);
    assert_eq!(items[1], vec!["AZ-1", "Widget", "127"]);
    assert_eq!(items[2], vec!["AZ-1", "Gadget", "127"]);

    // table rows after the table's own header row, missing cells empty
    let tables = read_sheet(&bytes, TABLES_SHEET);
    assert_eq!(tables[0], vec!["Name", "Value"]);
    assert_eq!(tables[1], vec!["alpha", "1"]);
    assert_eq!(tables[2], vec!["beta", ""]);
}

#[tokio::test]
async fn tables_sheet_is_omitted_without_tables() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let result = r#"{
        "documents": [
            { "fields": { "InvoiceId": { "type": "string", "valueString": "AZ-2" } } }
        ],
        "tables": []
    }"#;

    let form = Form::new().part("file", pdf_part(result, "plain.pdf"));

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::OK, response.status());
    let bytes = response.bytes().await.unwrap();
    assert_eq!(sheet_names(&bytes), vec![INVOICE_SHEET, ITEM_SHEET]);
}

#[tokio::test]
async fn missing_file_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let form = Form::new().text("unrelated", "value");

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
}

#[tokio::test]
async fn second_file_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let form = Form::new()
        .part("file", pdf_part("{}", "a.pdf"))
        .part("file", pdf_part("{}", "b.pdf"));

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
}

#[tokio::test]
async fn non_pdf_upload_is_rejected() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    let form = Form::new().part(
        "file",
        reqwest::multipart::Part::bytes(vec![0; 10])
            .file_name("scan.png")
            .mime_str("image/png")
            .unwrap(),
    );

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_REQUEST, response.status());
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("scan.png"));
}

#[tokio::test]
async fn failed_analysis_is_a_bad_gateway() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::new();

    // bytes that are not a valid analyze result make the mock job fail,
    // standing in for a remote-service error
    let form = Form::new().part("file", pdf_part("garbage", "bad.pdf"));

    let response = client
        .post(format!("{}/import/azure-ai", app.address))
        .multipart(form)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(StatusCode::BAD_GATEWAY, response.status());
}
