//! HTTP client for network-based API calls
//!
//! `FarmApi` is the remote command surface the sync engine is written
//! against; `HttpClient` is its reqwest-backed implementation. Tests swap
//! in scripted doubles.

use crate::{ClientConfig, ClientError, ClientResult};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use shared::client::{GroupUpdate, MoveRequest, PrinterCommand, QuantityUpdate};
use shared::models::{EjectionConfig, EjectionPreset, FleetStats, PrintJob, Printer};
use shared::response::ApiResponse;

/// Remote command surface used by the sync engine
#[async_trait]
pub trait FarmApi: Send + Sync {
    /// Fetch the full job queue, priority-ordered.
    async fn list_jobs(&self) -> ClientResult<Vec<PrintJob>>;

    /// Fetch every printer with live telemetry.
    async fn list_printers(&self) -> ClientResult<Vec<Printer>>;

    /// Fetch farm-wide aggregate counters.
    async fn fetch_stats(&self) -> ClientResult<FleetStats>;

    /// Fetch the saved ejection presets.
    async fn list_presets(&self) -> ClientResult<Vec<EjectionPreset>>;

    /// Move a job to a new queue index.
    async fn reorder_job(&self, id: i64, new_index: usize) -> ClientResult<()>;

    /// Change the requested copy count of a job.
    async fn set_quantity(&self, id: i64, quantity: u32) -> ClientResult<()>;

    /// Replace the ejection settings of a job.
    async fn set_ejection(&self, id: i64, config: &EjectionConfig) -> ClientResult<()>;

    /// Move a printer to another dispatch group.
    async fn set_printer_group(&self, name: &str, group: &str) -> ClientResult<()>;

    /// Issue a control verb to a printer.
    async fn printer_command(&self, name: &str, command: PrinterCommand) -> ClientResult<()>;
}

/// HTTP client for making network requests to the farm controller
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
        }
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.get(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.post(&url).send().await?;
        Self::handle_response(response).await
    }

    /// Make a PATCH request with JSON body
    pub async fn patch<T: DeserializeOwned, B: serde::Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), path);
        let response = self.client.patch(&url).json(body).send().await?;
        Self::handle_response(response).await
    }

    /// Handle the HTTP response
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            return match status {
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                    Err(ClientError::Rejected(text))
                }
                _ => Err(ClientError::Internal(text)),
            };
        }

        response.json().await.map_err(Into::into)
    }

    /// Unwrap the response envelope, treating error codes as rejections.
    fn take_data<T>(response: ApiResponse<T>, what: &str) -> ClientResult<T> {
        if !response.is_success() {
            return Err(ClientError::Rejected(response.message));
        }
        response
            .data
            .ok_or_else(|| ClientError::InvalidResponse(format!("Missing {} data", what)))
    }

    /// Check a data-free envelope for success.
    fn check_ok(response: ApiResponse<serde_json::Value>) -> ClientResult<()> {
        if response.is_success() {
            Ok(())
        } else {
            Err(ClientError::Rejected(response.message))
        }
    }
}

// ========== Farm API ==========

#[async_trait]
impl FarmApi for HttpClient {
    async fn list_jobs(&self) -> ClientResult<Vec<PrintJob>> {
        let response = self
            .get::<ApiResponse<Vec<PrintJob>>>("api/v1/orders")
            .await?;
        Self::take_data(response, "order list")
    }

    async fn list_printers(&self) -> ClientResult<Vec<Printer>> {
        let response = self
            .get::<ApiResponse<Vec<Printer>>>("api/v1/printers")
            .await?;
        Self::take_data(response, "printer list")
    }

    async fn fetch_stats(&self) -> ClientResult<FleetStats> {
        let response = self.get::<ApiResponse<FleetStats>>("api/v1/stats").await?;
        Self::take_data(response, "stats")
    }

    async fn list_presets(&self) -> ClientResult<Vec<EjectionPreset>> {
        let response = self
            .get::<ApiResponse<Vec<EjectionPreset>>>("api/v1/settings/ejection-presets")
            .await?;
        Self::take_data(response, "preset list")
    }

    async fn reorder_job(&self, id: i64, new_index: usize) -> ClientResult<()> {
        let response = self
            .post::<ApiResponse<serde_json::Value>, _>(
                &format!("api/v1/orders/{}/move", id),
                &MoveRequest { new_index },
            )
            .await?;
        Self::check_ok(response)
    }

    async fn set_quantity(&self, id: i64, quantity: u32) -> ClientResult<()> {
        let response = self
            .patch::<ApiResponse<serde_json::Value>, _>(
                &format!("api/v1/orders/{}", id),
                &QuantityUpdate { quantity },
            )
            .await?;
        Self::check_ok(response)
    }

    async fn set_ejection(&self, id: i64, config: &EjectionConfig) -> ClientResult<()> {
        let response = self
            .patch::<ApiResponse<serde_json::Value>, _>(
                &format!("api/v1/orders/{}/ejection", id),
                config,
            )
            .await?;
        Self::check_ok(response)
    }

    async fn set_printer_group(&self, name: &str, group: &str) -> ClientResult<()> {
        let response = self
            .patch::<ApiResponse<serde_json::Value>, _>(
                &format!("api/v1/printers/{}", name),
                &GroupUpdate {
                    group: group.to_string(),
                },
            )
            .await?;
        Self::check_ok(response)
    }

    async fn printer_command(&self, name: &str, command: PrinterCommand) -> ClientResult<()> {
        let response = self
            .post_empty::<ApiResponse<serde_json::Value>>(&format!(
                "api/v1/printers/{}/{}",
                name,
                command.as_path()
            ))
            .await?;
        Self::check_ok(response)
    }
}
