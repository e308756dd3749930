use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use super::Deliverer;
use crate::error::RelayError;

const SERVICE: &str = "resend";
const RESEND_EMAILS_URL: &str = "https://api.resend.com/emails";

#[derive(Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    text: &'a str,
}

/// 通过 Resend 邮件接口投递
pub struct ResendDeliverer {
    client: reqwest::Client,
    api_key: String,
    from: String,
    to: String,
    subject: String,
}

impl ResendDeliverer {
    pub fn new(api_key: String, from: String, to: String, subject: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_key,
            from,
            to,
            subject,
        }
    }
}

#[async_trait]
impl Deliverer for ResendDeliverer {
    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        let request = SendEmailRequest {
            from: &self.from,
            to: [&self.to],
            subject: &self.subject,
            text,
        };

        let response = self
            .client
            .post(RESEND_EMAILS_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RelayError::upstream(SERVICE, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RelayError::upstream(
                SERVICE,
                format!("HTTP {}: {}", status, body),
            ));
        }
        Ok(())
    }
}

/// 只记录日志的投递实现，本地开发用。不记录正文
pub struct LogDeliverer;

#[async_trait]
impl Deliverer for LogDeliverer {
    async fn deliver(&self, text: &str) -> Result<(), RelayError> {
        tracing::info!(chars = text.chars().count(), "message delivered to log");
        Ok(())
    }
}
