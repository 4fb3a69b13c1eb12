//! LLM extraction backend using the OpenAI Responses API.
//!
//! Sends the uploaded PDF as an inline base64 file part together with a fixed
//! Hungarian-language extraction prompt, and strict-parses the model's text
//! output as a single JSON invoice object.

use super::{parse_model_output, InvoiceExtractor, ProviderError};
use crate::models::ExtractedInvoice;
use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Instruction prompt sent with every file. Mandates a bare JSON object,
/// empty strings for unresolvable fields, and monetary amounts without
/// currency symbols (the currency goes into its own field).
const EXTRACTION_PROMPT: &str = r#"
Olvasd be a feltöltött PDF dokumentum teljes tartalmát, akkor is, ha több oldalas a dokumentum.

A dokumentum egy számla. A feladatod, hogy kinyerd belőle az alábbi adatokat:

- számlaszám
- vevő neve
- szállító neve
- vevő adószáma
- szállító adószáma
- teljesítés dátuma
- számla kelte
- fizetési határidő
- bruttó összeg (összesen)
- nettó összeg (összesen)
- áfa összege (összesen)
- devizanem

Ezen felül, ha a számlán több tétel szerepel, azokat is add vissza egy 'tetelek' nevű tömbben.
Minden tétel egy objektum legyen a következő szerkezettel:
{
  "megnevezes": "",
  "netto": "",
  "afa": "",
  "afakulcs": "",
  "brutto": ""
}

Fontos szabály:
Az összegekhez (például bruttó, nettó, áfa) soha ne írd hozzá a devizanemet (például HUF, EUR, Ft, € stb.).
Az összegek értéke csak a szám legyen, formázás és devizajel nélkül (például "5730.88" vagy "573088").
A devizanem külön mezőben szerepeljen a "devizanem" kulcs alatt.

A választ csak jól formázott JSON formátumban add meg az alábbi szerkezet szerint:

{
  "szamlaszam": "",
  "vevo_neve": "",
  "szallito_neve": "",
  "vevo_adoszam": "",
  "szallito_adoszam": "",
  "teljesites_datuma": "",
  "szamla_keltee": "",
  "fizetesi_hatarido": "",
  "brutto_osszeg": "",
  "netto_osszeg": "",
  "afa_osszeg": "",
  "devizanem": "",
  "tetelek": [
    {
      "megnevezes": "",
      "netto": "",
      "afa": "",
      "afakulcs": "",
      "brutto": ""
    }
  ]
}

Ha egy adat vagy tétel bármely mezője nem található, az értéke legyen üres string ("").
Ne adj vissza semmit, csak a JSON-t.
"#;

/// OpenAI backend configuration.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

pub struct OpenAiExtractor {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiExtractor {
    pub fn new(config: OpenAiConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), method)
    }
}

#[async_trait]
impl InvoiceExtractor for OpenAiExtractor {
    async fn extract(
        &self,
        filename: &str,
        pdf_bytes: &[u8],
    ) -> Result<ExtractedInvoice, ProviderError> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(pdf_bytes);

        let request = ResponsesRequest {
            model: self.config.model.clone(),
            input: vec![InputMessage {
                role: "user".to_string(),
                content: vec![
                    InputPart::InputFile {
                        filename: filename.to_string(),
                        file_data: format!("data:application/pdf;base64,{}", encoded),
                    },
                    InputPart::InputText {
                        text: EXTRACTION_PROMPT.to_string(),
                    },
                ],
            }],
        };

        tracing::debug!(
            model = %self.config.model,
            filename = %filename,
            pdf_bytes = pdf_bytes.len(),
            "Sending extraction request to OpenAI"
        );

        let response = self
            .client
            .post(self.api_url("responses"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
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
                "OpenAI API error {}: {}",
                status, error_text
            )));
        }

        let api_response: ResponsesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Api(format!("Failed to parse response: {}", e)))?;

        let text = api_response.output_text();

        parse_model_output(&text, filename)
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        if self.config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "OpenAI API key not configured".to_string(),
            ));
        }

        let response = self
            .client
            .get(self.api_url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(ProviderError::Api(format!(
                "Health check failed: {}",
                response.status()
            )))
        }
    }
}

// ============================================================================
// OpenAI Responses API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ResponsesRequest {
    model: String,
    input: Vec<InputMessage>,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: String,
    content: Vec<InputPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum InputPart {
    InputFile { filename: String, file_data: String },
    InputText { text: String },
}

#[derive(Debug, Deserialize)]
struct ResponsesResponse {
    #[serde(default)]
    output: Vec<OutputItem>,
}

impl ResponsesResponse {
    /// Concatenate every `output_text` part across output items.
    fn output_text(&self) -> String {
        self.output
            .iter()
            .flat_map(|item| item.content.iter())
            .filter(|part| part.kind == "output_text")
            .map(|part| part.text.as_str())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<OutputPart>,
}

#[derive(Debug, Deserialize)]
struct OutputPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}
