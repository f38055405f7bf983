use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_SUBJECT: &str = "New Inquiry";
pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Conversation {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub subject: Option<String>,
    pub status: Option<String>,
    pub last_message_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Conversation {
    fn default() -> Self {
        Conversation {
            id: Uuid::new_v4(),
            customer_id: Uuid::nil(),
            dealer_id: None,
            subject: None,
            status: Some(STATUS_ACTIVE.to_string()),
            last_message_at: Utc::now(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}

impl Conversation {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.customer_id == user_id || self.dealer_id == Some(user_id)
    }

    /// The recipient for a message sent by `sender`. `None` while no dealer has
    /// been assigned and the customer is the one writing.
    pub fn counterpart(&self, sender: Uuid) -> Option<Uuid> {
        if self.customer_id == sender {
            self.dealer_id
        } else {
            Some(self.customer_id)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewConversation {
    pub customer_id: Uuid,
    pub dealer_id: Option<Uuid>,
    pub subject: String,
    pub status: String,
}

impl NewConversation {
    /// A customer-initiated thread waiting for a dealer to be assigned.
    pub fn opened_by(customer_id: Uuid) -> Self {
        NewConversation {
            customer_id,
            dealer_id: None,
            subject: DEFAULT_SUBJECT.to_string(),
            status: STATUS_ACTIVE.to_string(),
        }
    }
}

impl From<NewConversation> for Conversation {
    fn from(new_conversation: NewConversation) -> Self {
        Conversation {
            customer_id: new_conversation.customer_id,
            dealer_id: new_conversation.dealer_id,
            subject: Some(new_conversation.subject),
            status: Some(new_conversation.status),
            ..Default::default()
        }
    }
}
