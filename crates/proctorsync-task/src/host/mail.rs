//! HTTP mail gateway client.
//!
//! Delivers status e-mails as a JSON POST to a configurable mail relay
//! endpoint, with optional bearer authentication.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, warn};

use crate::notify::{Mailer, NotifyError, StatusEmail};

/// Configuration for the outbound mail gateway.
#[derive(Debug, Clone)]
pub struct MailGatewayConfig {
    /// Gateway endpoint URL (e.g. "<https://mail.example.com/v1/send>").
    pub endpoint: String,
    /// Sender address for all status e-mails.
    pub from: String,
    /// Optional bearer token for the gateway.
    pub token: Option<String>,
}

/// Outbound JSON payload for the gateway.
#[derive(Debug, Serialize)]
struct OutboundMail<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

/// Client for the HTTP mail gateway.
#[derive(Debug)]
pub struct MailGateway {
    http: reqwest::Client,
    config: MailGatewayConfig,
}

impl MailGateway {
    /// Create a new mail gateway client.
    pub fn new(config: MailGatewayConfig) -> Result<Self, NotifyError> {
        if config.endpoint.is_empty() {
            return Err(NotifyError::Config("endpoint is empty".into()));
        }
        if config.from.is_empty() {
            return Err(NotifyError::Config("from address is empty".into()));
        }

        // Ensure a TLS crypto provider is installed (reqwest uses rustls-no-provider).
        // The `Err` case just means it was already installed — safe to ignore.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| NotifyError::Config(e.to_string()))?;

        Ok(Self { http, config })
    }

    /// The configured gateway endpoint.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    /// The configured sender address.
    pub fn from_address(&self) -> &str {
        &self.config.from
    }
}

#[async_trait]
impl Mailer for MailGateway {
    async fn send_email(&self, message: &StatusEmail) -> Result<(), NotifyError> {
        let payload = OutboundMail {
            from: &self.config.from,
            to: &message.to,
            subject: &message.subject,
            body: &message.body,
        };

        let mut request = self.http.post(&self.config.endpoint).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(to = %message.to, "Status e-mail delivered");
            Ok(())
        } else {
            let status_code = status.as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read body>".to_string());
            warn!(status = status_code, body = %body, "Mail gateway returned error");
            Err(NotifyError::Gateway {
                status: status_code,
                body,
            })
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn test_config() -> MailGatewayConfig {
        MailGatewayConfig {
            endpoint: "https://mail.example.com/v1/send".into(),
            from: "no-reply@example.com".into(),
            token: None,
        }
    }

    #[test]
    fn empty_endpoint_returns_config_error() {
        let config = MailGatewayConfig {
            endpoint: String::new(),
            ..test_config()
        };
        let err = MailGateway::new(config).unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn empty_from_returns_config_error() {
        let config = MailGatewayConfig {
            from: String::new(),
            ..test_config()
        };
        let err = MailGateway::new(config).unwrap_err();
        assert!(matches!(err, NotifyError::Config(_)));
    }

    #[test]
    fn valid_config_creates_gateway() {
        let gateway = MailGateway::new(test_config()).unwrap();
        assert_eq!(gateway.endpoint(), "https://mail.example.com/v1/send");
        assert_eq!(gateway.from_address(), "no-reply@example.com");
    }

    #[test]
    fn payload_serializes_to_flat_json() {
        let payload = OutboundMail {
            from: "no-reply@example.com",
            to: "student@example.com",
            subject: "S",
            body: "B",
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["from"], "no-reply@example.com");
        assert_eq!(json["to"], "student@example.com");
        assert_eq!(json["subject"], "S");
        assert_eq!(json["body"], "B");
    }

    #[tokio::test]
    async fn send_to_unreachable_gateway_errors() {
        // No real gateway is reachable in tests; the send must surface a
        // request error rather than panic.
        let config = MailGatewayConfig {
            endpoint: "http://127.0.0.1:1/v1/send".into(),
            ..test_config()
        };
        let gateway = MailGateway::new(config).unwrap();
        let message = StatusEmail {
            to: "student@example.com".into(),
            subject: "S".into(),
            body: "B".into(),
        };
        let result = gateway.send_email(&message).await;
        assert!(result.is_err(), "expected an error from unreachable gateway");
    }
}
