use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Inquiry,
    Lead,
    Car,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Inquiry => "inquiry",
            NotificationKind::Lead => "lead",
            NotificationKind::Car => "car",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub related_id: Option<Uuid>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Default for Notification {
    fn default() -> Self {
        Notification {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            title: String::new(),
            message: String::new(),
            kind: None,
            related_id: None,
            is_read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub related_id: Option<Uuid>,
}

impl From<NewNotification> for Notification {
    fn from(new_notification: NewNotification) -> Self {
        Notification {
            user_id: new_notification.user_id,
            title: new_notification.title,
            message: new_notification.message,
            kind: Some(new_notification.kind.as_str().to_string()),
            related_id: new_notification.related_id,
            ..Default::default()
        }
    }
}
