//! In-memory [`EntityStore`] for tests and benches.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::{
    Contact, Conversation, ConversationPatch, EntityStore, NewContact, NewConversation,
    NewMessage, StoreError,
};

/// One store operation, recorded per call so tests can assert on traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
    FindContact,
    CreateContact,
    FindConversation,
    CreateConversation,
    InsertMessage,
    UpdateConversation,
}

#[derive(Default)]
struct Inner {
    contacts: Vec<Contact>,
    conversations: Vec<Conversation>,
    messages: Vec<NewMessage>,
    calls: Vec<StoreOp>,
    fail_on: Option<StoreOp>,
    next_id: u64,
}

/// Entity store backed by plain vectors. Supports seeding existing records
/// and injecting a failure at a chosen operation.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the named operation fail with an injected HTTP 500.
    pub fn fail_on(&self, op: StoreOp) {
        self.inner.lock().unwrap().fail_on = Some(op);
    }

    pub fn seed_contact(&self, contact: Contact) {
        self.inner.lock().unwrap().contacts.push(contact);
    }

    pub fn seed_conversation(&self, conversation: Conversation) {
        self.inner.lock().unwrap().conversations.push(conversation);
    }

    pub fn calls(&self) -> Vec<StoreOp> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn contacts(&self) -> Vec<Contact> {
        self.inner.lock().unwrap().contacts.clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.inner.lock().unwrap().conversations.clone()
    }

    pub fn messages(&self) -> Vec<NewMessage> {
        self.inner.lock().unwrap().messages.clone()
    }
}

impl Inner {
    fn record(&mut self, op: StoreOp) -> Result<(), StoreError> {
        self.calls.push(op);
        if self.fail_on == Some(op) {
            return Err(StoreError::Api {
                status: 500,
                body: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn find_contact_by_phone(&self, phone: &str) -> Result<Option<Contact>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::FindContact)?;
        Ok(inner.contacts.iter().find(|c| c.phone == phone).cloned())
    }

    async fn create_contact(&self, contact: NewContact) -> Result<Contact, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::CreateContact)?;
        let created = Contact {
            id: inner.next_id("contact"),
            name: contact.name,
            phone: contact.phone,
        };
        inner.contacts.push(created.clone());
        Ok(created)
    }

    async fn find_conversation_by_contact(
        &self,
        contact_id: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::FindConversation)?;
        Ok(inner
            .conversations
            .iter()
            .find(|c| c.contact_id == contact_id)
            .cloned())
    }

    async fn create_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::CreateConversation)?;
        let created = Conversation {
            id: inner.next_id("conversation"),
            contact_id: conversation.contact_id,
            last_message: Some(conversation.last_message),
            last_message_time: Some(conversation.last_message_time),
            unread_count: 0,
        };
        inner.conversations.push(created.clone());
        Ok(created)
    }

    async fn insert_message(&self, message: NewMessage) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::InsertMessage)?;
        inner.messages.push(message);
        Ok(())
    }

    async fn update_conversation(
        &self,
        conversation_id: &str,
        patch: ConversationPatch,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap();
        inner.record(StoreOp::UpdateConversation)?;
        let conversation = inner
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
            .ok_or_else(|| StoreError::Api {
                status: 404,
                body: format!("no conversation {conversation_id}"),
            })?;
        conversation.last_message = Some(patch.last_message);
        conversation.last_message_time = Some(patch.last_message_time);
        conversation.unread_count = patch.unread_count;
        Ok(())
    }
}
