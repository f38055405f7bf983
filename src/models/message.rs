use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    Audio,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Audio => "audio",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct DirectMessage {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub message_type: Option<String>,
    pub media_url: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for DirectMessage {
    fn default() -> Self {
        DirectMessage {
            id: Uuid::new_v4(),
            conversation_id: Uuid::nil(),
            sender_id: Uuid::nil(),
            recipient_id: Uuid::nil(),
            message: String::new(),
            message_type: Some(MessageType::Text.as_str().to_string()),
            media_url: None,
            is_read: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewDirectMessage {
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub message: String,
    pub message_type: MessageType,
    pub media_url: Option<String>,
}

impl From<NewDirectMessage> for DirectMessage {
    fn from(new_message: NewDirectMessage) -> Self {
        DirectMessage {
            conversation_id: new_message.conversation_id,
            sender_id: new_message.sender_id,
            recipient_id: new_message.recipient_id,
            message: new_message.message,
            message_type: Some(new_message.message_type.as_str().to_string()),
            media_url: new_message.media_url,
            ..Default::default()
        }
    }
}
