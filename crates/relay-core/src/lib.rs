//! # Relay Core
//!
//! Shared types, traits, and errors for the sms-relay workspace.
//!
//! This crate provides the building blocks the rest of the workspace composes:
//! - [`EntityStore`] trait abstracting the external record backend
//! - Domain records ([`Contact`], [`Conversation`], message payloads)
//! - [`InboundSms`], the normalized inbound message
//! - Error enums and the framework-agnostic [`WebhookResponse`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use relay_core::{EntityStore, NewContact};
//!
//! // Any record backend implements EntityStore
//! let contact = store.create_contact(NewContact {
//!     name: "+15551234567".into(),
//!     phone: "+15551234567".into(),
//! }).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

pub mod testing;

/// Errors returned by the external entity store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The HTTP client could not be built from the given settings
    #[error("configuration error: {0}")]
    Configuration(String),
    /// HTTP communication error (connect failure, timeout, broken body)
    #[error("http error: {0}")]
    Http(String),
    /// The store answered with a non-2xx status
    #[error("store returned HTTP {status}: {body}")]
    Api { status: u16, body: String },
    /// The store answered 2xx but the body could not be decoded
    #[error("decode error: {0}")]
    Decode(String),
}

/// Errors surfaced while relaying one inbound webhook.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("payload decode failed: {0}")]
    Parse(String),
    #[error("entity store error: {0}")]
    Store(#[from] StoreError),
}

/// HTTP status code for web responses. Only statuses the pipeline itself
/// produces appear here; 405 for non-POST methods comes from the web
/// layer's method routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpStatus {
    Ok = 200,
    BadRequest = 400,
    InternalServerError = 500,
}

impl HttpStatus {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Contact record held by the entity store, keyed by phone number.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
}

/// Payload for creating a Contact.
#[derive(Debug, Clone, Serialize)]
pub struct NewContact {
    pub name: String,
    pub phone: String,
}

/// Conversation record, linked 1:1 to a Contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub contact_id: String,
    #[serde(default)]
    pub last_message: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub last_message_time: Option<OffsetDateTime>,
    /// Stores may omit the counter on fresh records; missing reads as zero.
    #[serde(default)]
    pub unread_count: u32,
}

/// Payload for creating a Conversation.
#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub contact_id: String,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_time: OffsetDateTime,
}

/// Partial update applied to a Conversation after a message lands.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationPatch {
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub last_message_time: OffsetDateTime,
    pub unread_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Delivered,
}

/// Payload for inserting a Message record. Append-only, one per webhook call.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub sender_phone: String,
    pub receiver_phone: String,
    pub content: String,
    pub message_type: MessageType,
    /// Serialized as `null` when the inbound message carried no media.
    pub media_url: Option<String>,
    pub is_outgoing: bool,
    pub status: MessageStatus,
    /// Omitted from the wire entirely when the carrier sent no message sid,
    /// unlike `media_url` which goes out as an explicit `null`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twilio_sid: Option<String>,
}

/// Normalized inbound SMS/MMS notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InboundSms {
    pub from: String,
    pub to: String,
    pub body: Option<String>,
    /// First media attachment URL, if any. Empty strings are normalized away
    /// at decode time.
    pub media_url: Option<String>,
    /// Carrier-assigned message identifier.
    pub sid: Option<String>,
    /// Name of the carrier that delivered the webhook, e.g. "twilio".
    pub provider: &'static str,
    /// Raw carrier payload for debugging / audit.
    pub raw: serde_json::Value,
}

impl InboundSms {
    /// `image` when a media attachment is present, `text` otherwise.
    pub fn message_type(&self) -> MessageType {
        if self.media_url.is_some() {
            MessageType::Image
        } else {
            MessageType::Text
        }
    }
}

/// Generic webhook response that can be converted to any framework's response type
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    pub status: HttpStatus,
    pub body: String,
    pub content_type: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl WebhookResponse {
    /// TwiML acknowledgment the carrier expects on success.
    pub fn twiml_ack() -> Self {
        Self {
            status: HttpStatus::Ok,
            body: "<Response/>".to_string(),
            content_type: "application/xml".to_string(),
        }
    }

    pub fn error(status: HttpStatus, error: &str, details: Option<String>) -> Self {
        let body = serde_json::to_string(&ErrorBody { error, details })
            .unwrap_or_else(|_| "{}".to_string());
        Self {
            status,
            body,
            content_type: "application/json".to_string(),
        }
    }
}

/// Backend-agnostic interface to the external record store.
///
/// The webhook pipeline only ever talks to this trait, so tests can swap in
/// [`testing::MemoryStore`] and production wires up the REST client.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Exact match on `phone`; first match wins when the store holds duplicates.
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError>;

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError>;

    /// Exact match on `contact_id`; first match wins.
    async fn find_conversation_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Option<Conversation>, StoreError>;

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError>;

    async fn insert_message(&self, message: NewMessage) -> Result<(), StoreError>;

    async fn update_conversation(
        &self,
        conversation_id: &str,
        patch: ConversationPatch,
    ) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_type_follows_media_presence() {
        let mut sms = InboundSms {
            from: "+15550001111".into(),
            to: "+15550002222".into(),
            body: Some("hello".into()),
            media_url: None,
            sid: Some("SM1".into()),
            provider: "twilio",
            raw: json!({}),
        };
        assert_eq!(sms.message_type(), MessageType::Text);

        sms.media_url = Some("https://example.com/cat.jpg".into());
        assert_eq!(sms.message_type(), MessageType::Image);
    }

    #[test]
    fn new_message_serializes_wire_fields() {
        let message = NewMessage {
            conversation_id: "conv-1".into(),
            sender_phone: "+15550001111".into(),
            receiver_phone: "+15550002222".into(),
            content: "hello".into(),
            message_type: MessageType::Text,
            media_url: None,
            is_outgoing: false,
            status: MessageStatus::Delivered,
            twilio_sid: Some("SM1".into()),
        };
        let v = serde_json::to_value(&message).unwrap();
        assert_eq!(v["message_type"], "text");
        assert_eq!(v["status"], "delivered");
        assert_eq!(v["is_outgoing"], false);
        assert!(v["media_url"].is_null());
        assert_eq!(v["twilio_sid"], "SM1");
    }

    #[test]
    fn missing_sid_is_dropped_but_missing_media_stays_null() {
        let message = NewMessage {
            conversation_id: "conv-1".into(),
            sender_phone: "+15550001111".into(),
            receiver_phone: "+15550002222".into(),
            content: "hello".into(),
            message_type: MessageType::Text,
            media_url: None,
            is_outgoing: false,
            status: MessageStatus::Delivered,
            twilio_sid: None,
        };
        let v = serde_json::to_value(&message).unwrap();
        let fields = v.as_object().unwrap();
        assert!(!fields.contains_key("twilio_sid"));
        assert!(fields.contains_key("media_url"));
        assert!(v["media_url"].is_null());
    }

    #[test]
    fn conversation_defaults_missing_unread_count() {
        let conversation: Conversation =
            serde_json::from_value(json!({ "id": "conv-1", "contact_id": "c-1" })).unwrap();
        assert_eq!(conversation.unread_count, 0);
        assert!(conversation.last_message.is_none());
    }

    #[test]
    fn error_body_includes_details_when_present() {
        let response = WebhookResponse::error(
            HttpStatus::InternalServerError,
            "failed to relay message",
            Some("store returned HTTP 503: down".into()),
        );
        assert_eq!(response.status.as_u16(), 500);
        assert!(response.body.contains("\"error\""));
        assert!(response.body.contains("\"details\""));

        let response = WebhookResponse::error(HttpStatus::BadRequest, "bad payload", None);
        assert!(!response.body.contains("details"));
    }
}
