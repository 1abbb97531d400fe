//! Transactional email API client.
//!
//! Endpoint: POST <endpoint> (SendGrid v3 mail-send shape)
//! Auth: Bearer token

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::Notifier;
use crate::domain::{Contact, Payload};

/// Fixed client label sent with every request
pub const CLIENT_LABEL: &str = "cronalert";

/// User agent sent with every request
const USER_AGENT: &str = concat!("cronalert/", env!("CARGO_PKG_VERSION"));

/// Errors constructing the delivery client
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Result of a delivery, as seen after the final attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    /// HTTP status of the final attempt, if one was obtained
    pub http_status: Option<u16>,

    /// Raw response body, or the transport error text when no response arrived
    pub raw_response: Vec<u8>,

    /// Number of requests made (1 + retries)
    pub attempts: u32,
}

impl DeliveryOutcome {
    /// Any status up to 299 is success; a missing status is failure
    pub fn is_success(&self) -> bool {
        matches!(self.http_status, Some(status) if status <= 299)
    }

    /// Raw response as text for logging
    pub fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.raw_response).into_owned()
    }
}

/// Delivery client settings
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    /// Automatic retries on transport failure
    pub max_retries: u32,
    /// Pause between transport retries
    pub retry_delay: Duration,
    /// Total timeout per request
    pub timeout: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
        }
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Serialize)]
struct MailRequest<'a> {
    personalizations: [Personalization<'a>; 1],
    from: Address<'a>,
    subject: &'a str,
    content: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Personalization<'a> {
    to: [Address<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Address<'a> {
    email: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

impl<'a> From<&'a Contact> for Address<'a> {
    fn from(contact: &'a Contact) -> Self {
        Self {
            email: &contact.email,
            name: &contact.name,
        }
    }
}

impl<'a> From<&'a Payload> for MailRequest<'a> {
    fn from(payload: &'a Payload) -> Self {
        Self {
            personalizations: [Personalization {
                to: [Address::from(&payload.to)],
            }],
            from: Address::from(&payload.from),
            subject: &payload.subject,
            content: [Content {
                kind: "text/plain",
                value: &payload.body,
            }],
        }
    }
}

/// Serialise a payload into the JSON request body
pub fn request_body(payload: &Payload) -> serde_json::Result<String> {
    serde_json::to_string(&MailRequest::from(payload))
}

// ============================================================================
// Client
// ============================================================================

/// Email API client with bounded retry on transport failure
pub struct DeliveryClient {
    endpoint: String,
    token: String,
    settings: DeliverySettings,
    /// Echo every raw response, not just failures
    debug: bool,
    client: reqwest::Client,
}

impl DeliveryClient {
    /// Create a new client
    pub fn new(
        endpoint: impl Into<String>,
        token: impl Into<String>,
        settings: DeliverySettings,
    ) -> Result<Self, DeliveryError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(settings.timeout)
            .build()?;

        Ok(Self {
            endpoint: endpoint.into(),
            token: token.into(),
            settings,
            debug: false,
            client,
        })
    }

    /// Enable echo of the raw response for every attempt
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a payload.
    ///
    /// Transport failures (connect, timeout, request errors) are retried up to
    /// `max_retries` times. Any HTTP response, whatever its status, ends the
    /// loop and is surfaced as-is.
    pub async fn deliver(&self, payload: &Payload) -> DeliveryOutcome {
        let body = MailRequest::from(payload);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let result = self
                .client
                .post(&self.endpoint)
                .bearer_auth(&self.token)
                .header("X-Client", CLIENT_LABEL)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let raw_response = match response.bytes().await {
                        Ok(bytes) => bytes.to_vec(),
                        Err(e) => {
                            warn!(error = %e, "Failed to read notification API response body");
                            Vec::new()
                        }
                    };

                    let outcome = DeliveryOutcome {
                        http_status: Some(status),
                        raw_response,
                        attempts: attempt,
                    };

                    if self.debug {
                        info!(
                            attempt,
                            status,
                            response = %outcome.response_text(),
                            "Notification API response"
                        );
                    } else {
                        debug!(attempt, status, "Notification API response");
                    }

                    return outcome;
                }
                Err(e) if attempt <= self.settings.max_retries && is_transient(&e) => {
                    if self.debug {
                        info!(attempt, error = %e, "Notification transport error");
                    }
                    warn!(
                        attempt,
                        delay_ms = self.settings.retry_delay.as_millis() as u64,
                        error = %e,
                        "Notification request failed, retrying"
                    );
                    tokio::time::sleep(self.settings.retry_delay).await;
                }
                Err(e) => {
                    if self.debug {
                        info!(attempt, error = %e, "Notification transport error");
                    }
                    return DeliveryOutcome {
                        http_status: None,
                        raw_response: e.to_string().into_bytes(),
                        attempts: attempt,
                    };
                }
            }
        }
    }
}

/// Connection-level failures worth another attempt
fn is_transient(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

#[async_trait]
impl Notifier for DeliveryClient {
    fn name(&self) -> &str {
        "email"
    }

    async fn send(&self, payload: &Payload) -> DeliveryOutcome {
        self.deliver(payload).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload() -> Payload {
        Payload {
            to: Contact::new("ops@example.com", "cron alerts (prod)"),
            from: Contact::new("cron@example.com", "cronalert"),
            subject: "[prod] cron job failure".to_string(),
            body: "command: false\nexit code: 1\n".to_string(),
        }
    }

    #[test]
    fn test_outcome_classification() {
        let outcome = |status| DeliveryOutcome {
            http_status: status,
            raw_response: Vec::new(),
            attempts: 1,
        };

        assert!(outcome(Some(200)).is_success());
        assert!(outcome(Some(202)).is_success());
        assert!(outcome(Some(299)).is_success());
        assert!(!outcome(Some(300)).is_success());
        assert!(!outcome(Some(500)).is_success());
        assert!(!outcome(None).is_success());
    }

    #[test]
    fn test_request_body_shape() {
        let json: serde_json::Value =
            serde_json::from_str(&request_body(&payload()).unwrap()).unwrap();

        assert_eq!(
            json["personalizations"][0]["to"][0]["email"],
            "ops@example.com"
        );
        assert_eq!(
            json["personalizations"][0]["to"][0]["name"],
            "cron alerts (prod)"
        );
        assert_eq!(json["from"]["email"], "cron@example.com");
        assert_eq!(json["subject"], "[prod] cron job failure");
        assert_eq!(json["content"][0]["type"], "text/plain");
        assert_eq!(json["content"][0]["value"], "command: false\nexit code: 1\n");
    }

    #[test]
    fn test_client_creation() {
        let client = DeliveryClient::new(
            "http://localhost:1/send",
            "TOKEN",
            DeliverySettings::default(),
        )
        .unwrap();
        assert_eq!(client.name(), "email");
        assert_eq!(client.endpoint(), "http://localhost:1/send");
    }
}
