use crate::config::SlipVerifyConfig;
use crate::error::{AppError, AppResult};
use crate::models::EvidenceUpload;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Fields a slip-verification service extracts from a transfer slip
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlipVerification {
    pub success: bool,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default, rename = "payeeName")]
    pub payee_name: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl SlipVerification {
    /// A passing result that echoes the expected amount
    pub fn accepted(amount: Decimal) -> Self {
        Self {
            success: true,
            amount: Some(amount),
            payee_name: None,
            message: None,
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            amount: None,
            payee_name: None,
            message: Some(message.into()),
        }
    }
}

#[async_trait]
pub trait SlipVerifier: Send + Sync {
    /// Ask the verification service what the slip shows. A slip the service
    /// reads but rejects comes back as `success == false`, not as an error.
    async fn verify(&self, expected_amount: Decimal, slip: &EvidenceUpload) -> AppResult<SlipVerification>;
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    amount: String,
    #[serde(rename = "contentType")]
    content_type: &'a str,
    image: String,
}

/// Client for an HTTP slip-verification API
pub struct HttpSlipVerifier {
    client: Client,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl HttpSlipVerifier {
    pub fn new(url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            api_key,
            timeout,
        }
    }

    /// Build from config; `None` when no verification URL is configured
    pub fn from_config(config: &SlipVerifyConfig) -> Option<Self> {
        let url = config.url.as_ref()?;
        Some(Self::new(
            url.clone(),
            config.api_key.clone(),
            config.timeout(),
        ))
    }
}

#[async_trait]
impl SlipVerifier for HttpSlipVerifier {
    async fn verify(&self, expected_amount: Decimal, slip: &EvidenceUpload) -> AppResult<SlipVerification> {
        let body = VerifyRequest {
            amount: expected_amount.to_string(),
            content_type: &slip.content_type,
            image: STANDARD.encode(&slip.bytes),
        };

        let mut request = self.client.post(&self.url).json(&body).timeout(self.timeout);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::ExternalService(format!("Slip verification request failed: {}", e)))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(AppError::ExternalService(format!(
                "Slip verification service returned {}",
                status
            )));
        }
        if !status.is_success() {
            // 4xx means the service looked at the slip and refused it
            let text = response.text().await.unwrap_or_default();
            debug!("Slip verification rejected with {}: {}", status, text);
            return Ok(SlipVerification::rejected(format!("verification service returned {}", status)));
        }

        response
            .json::<SlipVerification>()
            .await
            .map_err(|e| AppError::ExternalService(format!("Invalid slip verification response: {}", e)))
    }
}

/// Accepts every slip. Used when no verification service is configured
/// outside production.
pub struct DisabledSlipVerifier;

#[async_trait]
impl SlipVerifier for DisabledSlipVerifier {
    async fn verify(&self, expected_amount: Decimal, slip: &EvidenceUpload) -> AppResult<SlipVerification> {
        warn!(
            "Slip verification disabled, accepting {} for {}",
            slip.file_name, expected_amount
        );
        Ok(SlipVerification::accepted(expected_amount))
    }
}
