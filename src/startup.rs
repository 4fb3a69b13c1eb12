use crate::config::{ExtractionMode, ImportConfig};
use crate::error::AppError;
use crate::handlers;
use crate::services::providers::azure::{AzureConfig, AzureDocumentAnalyzer};
use crate::services::providers::mock::{MockDocumentAnalyzer, MockInvoiceExtractor};
use crate::services::providers::openai::{OpenAiConfig, OpenAiExtractor};
use crate::services::providers::{DocumentAnalyzer, InvoiceExtractor};
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ImportConfig,
    pub extractor: Arc<dyn InvoiceExtractor>,
    pub analyzer: Arc<dyn DocumentAnalyzer>,
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
}

impl Application {
    pub async fn build(config: ImportConfig) -> Result<Self, AppError> {
        let (extractor, analyzer): (Arc<dyn InvoiceExtractor>, Arc<dyn DocumentAnalyzer>) =
            match config.extraction.mode {
                ExtractionMode::Live => {
                    let extractor = OpenAiExtractor::new(OpenAiConfig {
                        api_key: config.openai.api_key.clone(),
                        model: config.openai.model.clone(),
                        base_url: config.openai.base_url.clone(),
                    });
                    let analyzer = AzureDocumentAnalyzer::new(AzureConfig {
                        endpoint: config.azure.endpoint.clone(),
                        api_key: config.azure.api_key.clone(),
                        model_id: config.azure.model_id.clone(),
                        api_version: config.azure.api_version.clone(),
                        poll_interval_ms: config.azure.poll_interval_ms,
                        max_polls: config.azure.max_polls,
                    });

                    tracing::info!(
                        llm_model = %config.openai.model,
                        analysis_model = %config.azure.model_id,
                        "Initialized live extraction backends"
                    );

                    (
                        Arc::new(extractor) as Arc<dyn InvoiceExtractor>,
                        Arc::new(analyzer) as Arc<dyn DocumentAnalyzer>,
                    )
                }
                ExtractionMode::Mock => {
                    tracing::info!("Initialized mock extraction backends");
                    (
                        Arc::new(MockInvoiceExtractor) as Arc<dyn InvoiceExtractor>,
                        Arc::new(MockDocumentAnalyzer) as Arc<dyn DocumentAnalyzer>,
                    )
                }
            };

        let state = AppState {
            config: config.clone(),
            extractor,
            analyzer,
        };

        let app = Router::new()
            .route("/health", get(handlers::health_check))
            .route("/ready", get(handlers::readiness_check))
            .route("/import/invoice", post(handlers::import_invoices))
            .route("/import/gpt-5", post(handlers::import_invoices))
            .route("/import/azure-ai", post(handlers::import_analyzed))
            .layer(DefaultBodyLimit::max(config.upload.max_body_bytes))
            .layer(TraceLayer::new_for_http())
            .with_state(state);

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app);

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}
