//! Base44 entity-store client.
//!
//! Thin REST client over the Base44 entities API. Every call carries the
//! static `api_key` header; lookups use the PostgREST-style `eq.` filter
//! syntax the API exposes.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{
    Contact, Conversation, ConversationPatch, EntityStore, NewContact, NewConversation,
    NewMessage, StoreError,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

const API_KEY_HEADER: &str = "api_key";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Base44 REST client.
#[derive(Clone, Debug)]
pub struct Base44Client {
    /// Entities API base URL; override for testing/mocking.
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl Base44Client {
    pub fn new<S: Into<String>>(base_url: S, api_key: S) -> Result<Self, StoreError> {
        Self::with_timeout(base_url, api_key, DEFAULT_TIMEOUT)
    }

    /// Build a client with an explicit per-request timeout.
    pub fn with_timeout<S: Into<String>>(
        base_url: S,
        api_key: S,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                StoreError::Configuration(format!("failed to build HTTP client: {e}"))
            })?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            http,
        })
    }

    fn entity_url(&self, entity: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), entity)
    }

    async fn read_checked(res: reqwest::Response) -> Result<String, StoreError> {
        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    /// GET an entity collection filtered by one `eq.` match.
    async fn find_first<T: DeserializeOwned>(
        &self,
        entity: &str,
        field: &str,
        value: &str,
    ) -> Result<Option<T>, StoreError> {
        debug!(entity, field, value, "entity lookup");
        let res = self
            .http
            .get(self.entity_url(entity))
            .query(&[(field, format!("eq.{value}"))])
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let body = Self::read_checked(res).await?;
        let mut records: Vec<T> =
            serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records.remove(0)))
        }
    }

    /// POST a new entity. The API answers with an array holding the created
    /// record.
    async fn create<P: Serialize, T: DeserializeOwned>(
        &self,
        entity: &str,
        payload: &P,
    ) -> Result<T, StoreError> {
        debug!(entity, "entity create");
        let res = self
            .http
            .post(self.entity_url(entity))
            .header(API_KEY_HEADER, &self.api_key)
            .json(payload)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        let body = Self::read_checked(res).await?;
        let mut records: Vec<T> =
            serde_json::from_str(&body).map_err(|e| StoreError::Decode(e.to_string()))?;
        if records.is_empty() {
            return Err(StoreError::Decode(format!(
                "create on {entity} returned an empty collection"
            )));
        }
        Ok(records.remove(0))
    }
}

#[async_trait]
impl EntityStore for Base44Client {
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError> {
        self.find_first("Contact", "phone", phone).await
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        self.create("Contact", &contact).await
    }

    async fn find_conversation_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        self.find_first("Conversation", "contact_id", contact_id)
            .await
    }

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        self.create("Conversation", &conversation).await
    }

    async fn insert_message(&self, message: NewMessage) -> Result<(), StoreError> {
        debug!(conversation_id = %message.conversation_id, "message insert");
        let res = self
            .http
            .post(self.entity_url("Message"))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Self::read_checked(res).await?;
        Ok(())
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        patch: ConversationPatch,
    ) -> Result<(), StoreError> {
        debug!(conversation_id, "conversation patch");
        let res = self
            .http
            .patch(self.entity_url("Conversation"))
            .query(&[("id", format!("eq.{conversation_id}"))])
            .header(API_KEY_HEADER, &self.api_key)
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Self::read_checked(res).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::OffsetDateTime;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> Base44Client {
        Base44Client::new(server.uri(), "test-key".to_string()).unwrap()
    }

    #[tokio::test]
    async fn finds_contact_by_phone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Contact"))
            .and(query_param("phone", "eq.+15551234567"))
            .and(header("api_key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "id": "c-1", "name": "+15551234567", "phone": "+15551234567" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let contact = client(&server)
            .find_contact_by_phone("+15551234567")
            .await
            .unwrap();
        assert_eq!(contact.unwrap().id, "c-1");
    }

    #[tokio::test]
    async fn empty_collection_means_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Contact"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let contact = client(&server)
            .find_contact_by_phone("+15550000000")
            .await
            .unwrap();
        assert!(contact.is_none());
    }

    #[tokio::test]
    async fn create_contact_unwraps_singleton_array() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/Contact"))
            .and(body_partial_json(json!({
                "name": "+15551234567",
                "phone": "+15551234567"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!([
                { "id": "c-9", "name": "+15551234567", "phone": "+15551234567" }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let contact = client(&server)
            .create_contact(NewContact {
                name: "+15551234567".into(),
                phone: "+15551234567".into(),
            })
            .await
            .unwrap();
        assert_eq!(contact.id, "c-9");
    }

    #[tokio::test]
    async fn non_2xx_surfaces_as_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Contact"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let err = client(&server)
            .find_contact_by_phone("+15551234567")
            .await
            .unwrap_err();
        match err {
            StoreError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "maintenance");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_store_times_out_as_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Contact"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = Base44Client::with_timeout(
            server.uri(),
            "test-key".to_string(),
            Duration::from_millis(50),
        )
        .unwrap();
        let err = client
            .find_contact_by_phone("+15551234567")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Http(_)));
    }

    #[tokio::test]
    async fn patch_carries_prefer_header_and_filter() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/Conversation"))
            .and(query_param("id", "eq.conv-1"))
            .and(header("Prefer", "return=representation"))
            .and(body_partial_json(json!({
                "last_message": "hello",
                "unread_count": 3
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .update_conversation(
                "conv-1",
                ConversationPatch {
                    last_message: "hello".into(),
                    last_message_time: OffsetDateTime::now_utc(),
                    unread_count: 3,
                },
            )
            .await
            .unwrap();
    }
}
