use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, ToSchema)]
pub struct Inquiry {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
    pub is_read: bool,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Default for Inquiry {
    fn default() -> Self {
        Inquiry {
            id: Uuid::new_v4(),
            customer_name: String::new(),
            customer_email: None,
            customer_phone: None,
            subject: None,
            message: String::new(),
            is_read: false,
            responded_at: None,
            responded_by: None,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewInquiry {
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub customer_phone: Option<String>,
    pub subject: Option<String>,
    pub message: String,
}

impl From<NewInquiry> for Inquiry {
    fn from(new_inquiry: NewInquiry) -> Self {
        Inquiry {
            customer_name: new_inquiry.customer_name,
            customer_email: new_inquiry.customer_email,
            customer_phone: new_inquiry.customer_phone,
            subject: new_inquiry.subject,
            message: new_inquiry.message,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InquiryChanges {
    pub is_read: Option<bool>,
    pub responded_at: Option<DateTime<Utc>>,
    pub responded_by: Option<Uuid>,
}

impl InquiryChanges {
    pub fn mark_read() -> Self {
        InquiryChanges {
            is_read: Some(true),
            ..Default::default()
        }
    }

    /// Bookkeeping for a staff reply; the reply itself is never dispatched.
    pub fn responded(by: Uuid, at: DateTime<Utc>) -> Self {
        InquiryChanges {
            is_read: Some(true),
            responded_at: Some(at),
            responded_by: Some(by),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.is_read.is_none() && self.responded_at.is_none() && self.responded_by.is_none()
    }
}
