//! Platform-function client.
//!
//! The hosted backend platform exposes callable serverless functions
//! (message dispatch, payment intents, password-reset links, demo-user
//! provisioning). This client is the only place the service talks to them.

use async_trait::async_trait;
use hub_core::error::AppError;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use crate::config::PlatformConfig;

/// Callable platform functions used by the access core.
#[async_trait]
pub trait PlatformFunctions: Send + Sync {
    /// Dispatch a WhatsApp message to a phone number.
    async fn send_whatsapp_message(&self, to_phone: &str, body: &str) -> Result<(), AppError>;

    /// Ask the platform to issue a password-reset URL for an email.
    async fn issue_password_reset_link(&self, email: &str) -> Result<String, AppError>;

    /// Create a payment intent; returns the platform's intent id.
    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: serde_json::Value,
    ) -> Result<String, AppError>;

    /// Provision a demo user; returns the created account id.
    async fn provision_demo_user(&self, email: &str) -> Result<Uuid, AppError>;
}

/// HTTP client for the platform's function endpoints.
#[derive(Clone)]
pub struct HttpPlatformClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl HttpPlatformClient {
    /// Create a new client. Connections are established lazily on first use.
    pub fn new(config: &PlatformConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to build HTTP client: {}", e))
            })?;

        tracing::info!(
            base_url = %config.functions_base_url,
            "Platform function client configured"
        );

        Ok(Self {
            http,
            base_url: config.functions_base_url.trim_end_matches('/').to_string(),
            service_key: config.service_key.clone(),
        })
    }

    async fn invoke(
        &self,
        function: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let url = format!("{}/functions/v1/{}", self.base_url, function);

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.service_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, function = %function, "Platform function unreachable");
                AppError::ServiceUnavailable
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                function = %function,
                status = %status,
                body = %body,
                "Platform function returned an error"
            );
            return Err(AppError::ServiceUnavailable);
        }

        response.json().await.map_err(|e| {
            tracing::error!(error = %e, function = %function, "Platform function returned invalid JSON");
            AppError::InternalError(anyhow::anyhow!("Invalid platform response: {}", e))
        })
    }
}

#[async_trait]
impl PlatformFunctions for HttpPlatformClient {
    #[instrument(skip(self, body), fields(to = %to_phone))]
    async fn send_whatsapp_message(&self, to_phone: &str, body: &str) -> Result<(), AppError> {
        self.invoke(
            "enviar-whatsapp",
            serde_json::json!({ "telefone": to_phone, "mensagem": body }),
        )
        .await?;
        Ok(())
    }

    async fn issue_password_reset_link(&self, email: &str) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct ResetLinkResponse {
            url: String,
        }

        let value = self
            .invoke("gerar-link-redefinicao", serde_json::json!({ "email": email }))
            .await?;
        let parsed: ResetLinkResponse = serde_json::from_value(value).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Invalid reset-link response: {}", e))
        })?;
        Ok(parsed.url)
    }

    async fn create_payment_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: serde_json::Value,
    ) -> Result<String, AppError> {
        #[derive(Deserialize)]
        struct PaymentIntentResponse {
            intent_id: String,
        }

        let value = self
            .invoke(
                "criar-intencao-pagamento",
                serde_json::json!({
                    "valor_centavos": amount_cents,
                    "moeda": currency,
                    "metadata": metadata,
                }),
            )
            .await?;
        let parsed: PaymentIntentResponse = serde_json::from_value(value).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Invalid payment-intent response: {}", e))
        })?;
        Ok(parsed.intent_id)
    }

    async fn provision_demo_user(&self, email: &str) -> Result<Uuid, AppError> {
        #[derive(Deserialize)]
        struct DemoUserResponse {
            account_id: Uuid,
        }

        let value = self
            .invoke("criar-usuario-demo", serde_json::json!({ "email": email }))
            .await?;
        let parsed: DemoUserResponse = serde_json::from_value(value).map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Invalid demo-user response: {}", e))
        })?;
        Ok(parsed.account_id)
    }
}

/// In-memory platform client for tests: records every call.
#[derive(Default)]
pub struct MockPlatformClient {
    pub whatsapp_sent: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockPlatformClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PlatformFunctions for MockPlatformClient {
    async fn send_whatsapp_message(&self, to_phone: &str, body: &str) -> Result<(), AppError> {
        self.whatsapp_sent
            .lock()
            .expect("mock lock poisoned")
            .push((to_phone.to_string(), body.to_string()));
        Ok(())
    }

    async fn issue_password_reset_link(&self, email: &str) -> Result<String, AppError> {
        Ok(format!("https://example.test/redefinir?email={}", email))
    }

    async fn create_payment_intent(
        &self,
        _amount_cents: i64,
        _currency: &str,
        _metadata: serde_json::Value,
    ) -> Result<String, AppError> {
        Ok("intent-test".to_string())
    }

    async fn provision_demo_user(&self, _email: &str) -> Result<Uuid, AppError> {
        Ok(Uuid::new_v4())
    }
}
