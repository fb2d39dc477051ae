//! HTTP client for the external ERP API.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use std::time::Duration;

use crate::error::{ErpClientError, Result};
use crate::session::SessionToken;
use crate::types::*;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;

/// Client for the external ERP HTTP API.
///
/// Handles the three wire operations the reconciliation engine consumes:
/// login, batched incremental pull and order submit.
#[derive(Debug, Clone)]
pub struct ErpClient {
    client: reqwest::Client,
    base_url: String,
}

impl ErpClient {
    /// Create a new ERP client.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the ERP API (e.g., "https://erp.example.com")
    pub fn new(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("ERP response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("ERP response error ({}): {}", status, preview);
    }

    /// Create headers for an authenticated API request.
    fn headers(&self, session: &SessionToken) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let auth_value = HeaderValue::from_str(&format!("Bearer {}", session.token))
            .map_err(|_| ErpClientError::auth("Invalid session token format"))?;
        headers.insert(AUTHORIZATION, auth_value);

        let visitor_value = HeaderValue::from_str(&session.visitor_id.to_string())
            .map_err(|_| ErpClientError::auth("Invalid visitor ID format"))?;
        headers.insert("x-visitor-id", visitor_value);

        Ok(headers)
    }

    /// Parse a JSON response body.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            // Try to parse error response
            if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(&body) {
                if !error.message.is_empty() {
                    return Err(ErpClientError::api(
                        status.as_u16(),
                        format!("{}: {}", error.code, error.message),
                    ));
                }
            }
            return Err(ErpClientError::api(
                status.as_u16(),
                format!("Request failed: {}", body),
            ));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize ERP response. Body: {}, Error: {}",
                body,
                e
            );
            ErpClientError::api(status.as_u16(), format!("Failed to parse response: {}", e))
        })
    }

    /// Authenticate against the ERP.
    ///
    /// POST /api/Login
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse> {
        let url = format!("{}/api/Login", self.base_url);
        debug!("Logging in as {}", req.user_name);

        let response = self.client.post(&url).json(&req).send().await?;

        Self::parse_response(response).await
    }

    /// Pull everything changed since the given cursor set, across all
    /// tracked entity types in one round trip.
    ///
    /// POST /api/GetAllData
    pub async fn get_all_data(
        &self,
        session: &SessionToken,
        req: GetAllDataRequest,
    ) -> Result<GetAllDataResponse> {
        let url = format!("{}/api/GetAllData", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(session)?)
            .json(&req)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Submit one order with its resolved lines.
    ///
    /// POST /api/SaveOrder
    pub async fn save_order(
        &self,
        session: &SessionToken,
        req: SaveOrderRequest,
    ) -> Result<SaveOrderResponse> {
        let url = format!("{}/api/SaveOrder", self.base_url);

        let response = self
            .client
            .post(&url)
            .headers(self.headers(session)?)
            .json(&req)
            .send()
            .await?;

        Self::parse_response(response).await
    }
}
