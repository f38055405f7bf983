use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Conversation, DirectMessage, MessageType, NewConversation, NewDirectMessage};
use crate::store::EntityStore;

pub async fn open_conversation(
    store: &dyn EntityStore,
    customer_id: Uuid,
) -> Result<Conversation, AppError> {
    let conversation = store
        .insert_conversation(NewConversation::opened_by(customer_id))
        .await?;
    info!("Conversation {} opened by {}", conversation.id, customer_id);
    Ok(conversation)
}

/// The conversation, provided `user_id` takes part in it. Strangers get
/// `NotFound` rather than learning the thread exists.
pub async fn conversation_for(
    store: &dyn EntityStore,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Conversation, AppError> {
    store
        .get_conversation(conversation_id)
        .await?
        .filter(|c| c.has_participant(user_id))
        .ok_or_else(|| AppError::NotFound(format!("Conversation {}", conversation_id)))
}

pub async fn thread(
    store: &dyn EntityStore,
    conversation_id: Uuid,
    user_id: Uuid,
) -> Result<Vec<DirectMessage>, AppError> {
    conversation_for(store, conversation_id, user_id).await?;
    Ok(store.list_direct_messages(conversation_id).await?)
}

pub async fn send_message(
    store: &dyn EntityStore,
    conversation_id: Uuid,
    sender_id: Uuid,
    text: &str,
) -> Result<DirectMessage, AppError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::validation("Message cannot be empty"));
    }

    let conversation = conversation_for(store, conversation_id, sender_id).await?;
    let recipient_id = conversation
        .counterpart(sender_id)
        .ok_or_else(|| AppError::validation("No dealer has joined this conversation yet"))?;

    let message = store
        .insert_direct_message(NewDirectMessage {
            conversation_id,
            sender_id,
            recipient_id,
            message: text.to_string(),
            message_type: MessageType::Text,
            media_url: None,
        })
        .await?;

    // Only drives list ordering; the message is already committed.
    if let Err(e) = store.touch_conversation(conversation_id, message.created_at).await {
        warn!("Failed to bump conversation {}: {}", conversation_id, e);
    }

    info!("Message {} sent in {}", message.id, conversation_id);
    Ok(message)
}

pub async fn conversations(store: &dyn EntityStore, user_id: Uuid) -> Result<Vec<Conversation>, AppError> {
    Ok(store.list_conversations(user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    async fn staffed_conversation(store: &MemoryStore) -> (Uuid, Uuid, Conversation) {
        let customer = Uuid::new_v4();
        let dealer = Uuid::new_v4();
        let mut new_conversation = NewConversation::opened_by(customer);
        new_conversation.dealer_id = Some(dealer);
        let conversation = store.insert_conversation(new_conversation).await.unwrap();
        (customer, dealer, conversation)
    }

    #[tokio::test]
    async fn opened_conversation_waits_for_a_dealer() {
        let store = MemoryStore::new();
        let customer = Uuid::new_v4();

        let conversation = open_conversation(&store, customer).await.unwrap();
        assert_eq!(conversation.customer_id, customer);
        assert_eq!(conversation.dealer_id, None);
        assert_eq!(conversation.subject.as_deref(), Some("New Inquiry"));
        assert_eq!(conversation.status.as_deref(), Some("active"));

        let err = send_message(&store, conversation.id, customer, "Hello")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn messages_go_to_the_other_participant() {
        let store = MemoryStore::new();
        let (customer, dealer, conversation) = staffed_conversation(&store).await;

        let sent = send_message(&store, conversation.id, customer, " Is it available? ")
            .await
            .unwrap();
        assert_eq!(sent.recipient_id, dealer);
        assert_eq!(sent.message, "Is it available?");
        assert_eq!(sent.message_type.as_deref(), Some("text"));

        let reply = send_message(&store, conversation.id, dealer, "Yes").await.unwrap();
        assert_eq!(reply.recipient_id, customer);

        let messages = thread(&store, conversation.id, dealer).await.unwrap();
        let texts: Vec<_> = messages.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["Is it available?", "Yes"]);

        let bumped = store.get_conversation(conversation.id).await.unwrap().unwrap();
        assert_eq!(bumped.last_message_at, reply.created_at);
    }

    #[tokio::test]
    async fn strangers_cannot_read_or_write() {
        let store = MemoryStore::new();
        let (_, _, conversation) = staffed_conversation(&store).await;
        let stranger = Uuid::new_v4();

        assert!(matches!(
            thread(&store, conversation.id, stranger).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            send_message(&store, conversation.id, stranger, "hi").await,
            Err(AppError::NotFound(_))
        ));
    }
}
