//! Storage Queue REST transport
//!
//! Speaks the queue service's XML protocol over HTTP. Message text is the
//! envelope wrapped per `MessageEncoding` (base64 by default, matching what
//! the Functions host reads and writes).

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::{QueueTransport, ReceivedMessage};
use crate::config::{MessageEncoding, QueueConfig};
use crate::credential::{TokenCredential, STORAGE_SCOPE};
use crate::error::{Error, Result};

/// Put Message request body
#[derive(Serialize)]
#[serde(rename = "QueueMessage")]
struct PutMessage<'a> {
    #[serde(rename = "MessageText")]
    message_text: &'a str,
}

/// Get Messages response body
#[derive(Deserialize)]
struct QueueMessagesList {
    #[serde(rename = "QueueMessage", default)]
    messages: Vec<RawMessage>,
}

#[derive(Deserialize)]
struct RawMessage {
    #[serde(rename = "MessageId")]
    message_id: String,
    #[serde(rename = "InsertionTime", default)]
    insertion_time: String,
    #[serde(rename = "PopReceipt")]
    pop_receipt: String,
    #[serde(rename = "DequeueCount", default)]
    dequeue_count: u32,
    #[serde(rename = "MessageText", default)]
    message_text: String,
}

/// Storage Queue service client
#[derive(Clone)]
pub struct StorageQueueClient {
    client: Client,
    service_uri: String,
    service_version: String,
    encoding: MessageEncoding,
    credential: Option<Arc<dyn TokenCredential>>,
}

impl StorageQueueClient {
    /// Create a client for the configured queue service
    pub fn new(config: &QueueConfig, credential: Option<Arc<dyn TokenCredential>>) -> Result<Self> {
        let service_uri = config
            .service_uri
            .clone()
            .ok_or_else(|| Error::Config("queues.service_uri is required".to_string()))?;
        url::Url::parse(&service_uri)?;

        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        Ok(StorageQueueClient {
            client,
            service_uri: service_uri.trim_end_matches('/').to_string(),
            service_version: config.service_version.clone(),
            encoding: config.message_encoding,
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.service_uri, path)
    }

    /// Start a request with the service headers and bearer token
    async fn request(&self, method: Method, url: &str) -> Result<RequestBuilder> {
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let mut builder = self
            .client
            .request(method, url)
            .header("x-ms-version", &self.service_version)
            .header("x-ms-date", date);

        if let Some(ref credential) = self.credential {
            let token = credential.get_token(STORAGE_SCOPE).await?;
            builder = builder.bearer_auth(token.expose_secret());
        }

        Ok(builder)
    }

    /// Send a request and fail on a non-success status
    async fn execute(&self, builder: RequestBuilder, what: &str) -> Result<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Unauthorized(format!(
                "{} rejected by queue service ({}): {}",
                what, status, body
            ))),
            _ => Err(Error::Queue(format!("{} failed ({}): {}", what, status, body))),
        }
    }

    fn wrap(&self, body: &[u8]) -> Result<String> {
        match self.encoding {
            MessageEncoding::Base64 => Ok(BASE64.encode(body)),
            MessageEncoding::None => String::from_utf8(body.to_vec())
                .map_err(|e| Error::Queue(format!("message body is not UTF-8: {}", e))),
        }
    }

    fn unwrap_text(&self, message_id: &str, text: String) -> Vec<u8> {
        match self.encoding {
            MessageEncoding::Base64 => match BASE64.decode(text.as_bytes()) {
                Ok(bytes) => bytes,
                Err(e) => {
                    // Hand the raw text on; the tool rejects it and the message ends up poisoned
                    warn!(message_id, "Message text is not base64: {}", e);
                    text.into_bytes()
                }
            },
            MessageEncoding::None => text.into_bytes(),
        }
    }
}

#[async_trait]
impl QueueTransport for StorageQueueClient {
    async fn create_queue(&self, queue: &str) -> Result<()> {
        let builder = self.request(Method::PUT, &self.url(queue)).await?;
        let response = builder.send().await?;

        // 201 created, 204 already exists, 409 exists with other metadata
        match response.status() {
            status if status.is_success() || status == StatusCode::CONFLICT => {
                debug!(queue, %status, "Queue ensured");
                Ok(())
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(Error::Queue(format!(
                    "create queue {} failed ({}): {}",
                    queue, status, body
                )))
            }
        }
    }

    async fn send(&self, queue: &str, body: &[u8]) -> Result<()> {
        let text = self.wrap(body)?;
        let xml = quick_xml::se::to_string(&PutMessage { message_text: &text })
            .map_err(|e| Error::Internal(format!("Failed to serialize queue message: {}", e)))?;

        let builder = self
            .request(Method::POST, &self.url(&format!("{}/messages", queue)))
            .await?
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(xml);
        self.execute(builder, "put message").await?;

        debug!(queue, bytes = body.len(), "Message enqueued");
        Ok(())
    }

    async fn receive(
        &self,
        queue: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<ReceivedMessage>> {
        let builder = self
            .request(Method::GET, &self.url(&format!("{}/messages", queue)))
            .await?
            .query(&[
                ("numofmessages", max_messages.clamp(1, 32).to_string()),
                ("visibilitytimeout", visibility_timeout.as_secs().max(1).to_string()),
            ]);
        let xml = self.execute(builder, "get messages").await?.text().await?;

        let list: QueueMessagesList = quick_xml::de::from_str(&xml)
            .map_err(|e| Error::Queue(format!("Invalid get messages response: {}", e)))?;

        Ok(list
            .messages
            .into_iter()
            .map(|raw| {
                let inserted_at = DateTime::parse_from_rfc2822(&raw.insertion_time)
                    .map(|t| t.with_timezone(&Utc))
                    .unwrap_or_else(|_| Utc::now());
                let body = self.unwrap_text(&raw.message_id, raw.message_text);
                ReceivedMessage {
                    id: raw.message_id,
                    pop_receipt: raw.pop_receipt,
                    dequeue_count: raw.dequeue_count,
                    inserted_at,
                    body,
                }
            })
            .collect())
    }

    async fn delete(&self, queue: &str, message: &ReceivedMessage) -> Result<()> {
        let builder = self
            .request(
                Method::DELETE,
                &self.url(&format!("{}/messages/{}", queue, message.id)),
            )
            .await?
            .query(&[("popreceipt", message.pop_receipt.as_str())]);
        self.execute(builder, "delete message").await?;
        Ok(())
    }
}
