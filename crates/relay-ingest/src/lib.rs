//! Framework-agnostic ingestion pipeline for inbound Twilio webhooks.
//!
//! One webhook delivery turns into four strictly ordered entity-store calls:
//! find-or-create the Contact, find-or-create its Conversation, insert the
//! Message, then patch the Conversation's preview fields. A failure at any
//! step aborts the remaining chain; earlier writes are not rolled back.

use std::sync::Arc;

use relay_core::{
    Contact, Conversation, ConversationPatch, EntityStore, HttpStatus, InboundSms, NewContact,
    NewConversation, NewMessage, RelayError, WebhookResponse,
};
use time::OffsetDateTime;
use tracing::{error, info};

/// Seed text stored on a Conversation created by this pipeline.
pub const NEW_CONVERSATION_GREETING: &str = "Nova conversa iniciada";
/// Conversation preview text for messages that carry media but no body.
pub const MEDIA_PLACEHOLDER: &str = "Mídia recebida";

/// What one successful ingestion touched in the store.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub contact: Contact,
    /// Conversation as fetched or created, before the touch-up patch.
    pub conversation: Conversation,
}

/// Pipeline that handles the core relay logic against any [`EntityStore`].
#[derive(Clone)]
pub struct IngestPipeline {
    store: Arc<dyn EntityStore>,
}

impl IngestPipeline {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Process one raw webhook delivery and return a framework-agnostic
    /// response.
    pub async fn process(&self, content_type: Option<&str>, body: &[u8]) -> WebhookResponse {
        match self.process_internal(content_type, body).await {
            Ok(outcome) => {
                info!(
                    contact_id = %outcome.contact.id,
                    conversation_id = %outcome.conversation.id,
                    "inbound message relayed"
                );
                WebhookResponse::twiml_ack()
            }
            Err(e) => error_to_response(e),
        }
    }

    async fn process_internal(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<IngestOutcome, RelayError> {
        let sms = relay_twilio::decode_inbound(content_type, body)?;
        self.ingest(&sms).await
    }

    /// Run the four-step chain for an already-decoded inbound message.
    pub async fn ingest(&self, sms: &InboundSms) -> Result<IngestOutcome, RelayError> {
        let contact = self.find_or_create_contact(&sms.from).await?;
        let conversation = self.find_or_create_conversation(&contact.id).await?;

        let message = NewMessage {
            conversation_id: conversation.id.clone(),
            sender_phone: sms.from.clone(),
            receiver_phone: sms.to.clone(),
            content: sms.body.clone().unwrap_or_default(),
            message_type: sms.message_type(),
            media_url: sms.media_url.clone(),
            is_outgoing: false,
            status: relay_core::MessageStatus::Delivered,
            twilio_sid: sms.sid.clone(),
        };
        self.store.insert_message(message).await?;

        // The counter comes from the conversation fetched above, not a
        // re-read, so concurrent deliveries can lose increments.
        let patch = ConversationPatch {
            last_message: preview_text(sms),
            last_message_time: OffsetDateTime::now_utc(),
            unread_count: conversation.unread_count + 1,
        };
        self.store.update_conversation(&conversation.id, patch).await?;

        Ok(IngestOutcome {
            contact,
            conversation,
        })
    }

    /// Best-effort find-or-create: concurrent deliveries for the same new
    /// number can both miss the lookup and create duplicate Contacts. The
    /// store is not asked to enforce uniqueness.
    async fn find_or_create_contact(&self, phone: &str) -> Result<Contact, RelayError> {
        if let Some(contact) = self.store.find_contact_by_phone(phone).await? {
            return Ok(contact);
        }
        let contact = self
            .store
            .create_contact(NewContact {
                // Number doubles as the display name until someone edits it.
                name: phone.to_string(),
                phone: phone.to_string(),
            })
            .await?;
        Ok(contact)
    }

    /// Same duplicate-race caveat as [`Self::find_or_create_contact`].
    async fn find_or_create_conversation(
        &self,
        contact_id: &str,
    ) -> Result<Conversation, RelayError> {
        if let Some(conversation) = self.store.find_conversation_by_contact(contact_id).await? {
            return Ok(conversation);
        }
        let conversation = self
            .store
            .create_conversation(NewConversation {
                contact_id: contact_id.to_string(),
                last_message: NEW_CONVERSATION_GREETING.to_string(),
                last_message_time: OffsetDateTime::now_utc(),
            })
            .await?;
        Ok(conversation)
    }
}

fn preview_text(sms: &InboundSms) -> String {
    match sms.body.as_deref() {
        Some(body) if !body.is_empty() => body.to_string(),
        _ => MEDIA_PLACEHOLDER.to_string(),
    }
}

fn error_to_response(error: RelayError) -> WebhookResponse {
    match error {
        RelayError::Parse(msg) => {
            error!(%msg, "rejecting undecodable webhook payload");
            WebhookResponse::error(HttpStatus::BadRequest, "invalid webhook payload", Some(msg))
        }
        RelayError::Store(e) => {
            error!(error = %e, "downstream entity-store call failed");
            WebhookResponse::error(
                HttpStatus::InternalServerError,
                "failed to relay message",
                Some(e.to_string()),
            )
        }
    }
}
