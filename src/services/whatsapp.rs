//! WhatsApp Business Cloud API sender
//!
//! Sends approved template messages through the Graph API. Only template
//! messages are used since recipients have not opened a session window.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::debug;

use crate::config::settings::WhatsAppConfig;
use crate::services::notification::{MessageAck, NotificationSender, TemplateMessage};
use crate::utils::errors::{NotificationError, NotificationResult, PoolMateError, Result};
use crate::utils::helpers::normalize_phone;

/// WhatsApp Cloud API implementation of [`NotificationSender`]
#[derive(Clone)]
pub struct WhatsAppSender {
    client: Client,
    config: WhatsAppConfig,
}

impl WhatsAppSender {
    /// Create a new WhatsAppSender instance
    pub fn new(config: WhatsAppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent("PoolMate/1.0")
            .build()
            .map_err(PoolMateError::Http)?;

        Ok(Self { client, config })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/{}/messages",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.phone_number_id
        )
    }

    /// Build the Graph API request body for a template message
    pub fn build_payload(&self, recipient: &str, message: &TemplateMessage) -> Value {
        let mut components = Vec::new();

        if let Some(header) = &message.header {
            components.push(json!({
                "type": "header",
                "parameters": [{ "type": "text", "text": header }]
            }));
        }

        if !message.body.is_empty() {
            let parameters: Vec<Value> = message
                .body
                .iter()
                .map(|text| json!({ "type": "text", "text": text }))
                .collect();
            components.push(json!({ "type": "body", "parameters": parameters }));
        }

        if let Some(button) = &message.button {
            components.push(json!({
                "type": "button",
                "sub_type": "url",
                "index": "0",
                "parameters": [{ "type": "text", "text": button }]
            }));
        }

        json!({
            "messaging_product": "whatsapp",
            "recipient_type": "individual",
            "to": recipient,
            "type": "template",
            "template": {
                "name": message.kind.template_name(&self.config.templates),
                "language": { "code": self.config.language_code },
                "components": components
            }
        })
    }
}

#[async_trait]
impl NotificationSender for WhatsAppSender {
    async fn send_template(&self, recipient: &str, message: &TemplateMessage) -> NotificationResult<MessageAck> {
        let to = normalize_phone(recipient, &self.config.default_country_code)
            .ok_or_else(|| NotificationError::InvalidRecipient(recipient.to_string()))?;

        debug!(recipient = %to, template = %message.kind, "Sending WhatsApp template");

        let response = self
            .client
            .post(self.messages_url())
            .bearer_auth(&self.config.access_token)
            .json(&self.build_payload(&to, message))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotificationError::Timeout
                } else {
                    NotificationError::RequestFailed(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected(format!("HTTP {}: {}", status, error_text)));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| NotificationError::RequestFailed(format!("Invalid WhatsApp response: {}", e)))?;

        let message_id = body["messages"][0]["id"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        debug!(recipient = %to, message_id = %message_id, "WhatsApp template accepted");
        Ok(MessageAck { message_id })
    }
}
