//! Persistence contract for the dealership tables.
//!
//! The store is the only source of truth: nothing above it keeps records
//! between requests. [`EntityStore`] covers typed reads and writes,
//! [`ChangeFeed`] the row-change notifications that drive live chat views.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Car, CarDraft, CarStatus, Conversation, DashboardStats, DirectMessage, Inquiry,
    InquiryChanges, Lead, LeadChanges, LeadStatus, NewConversation, NewDirectMessage,
    NewInquiry, NewLead, NewNotification, Notification, Profile,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("read failed: {0}")]
    Read(String),
    #[error("write failed: {0}")]
    Write(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("store call timed out after {0:?}")]
    Timeout(Duration),
    #[error("subscription failed: {0}")]
    Subscription(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Cars,
    Leads,
    Inquiries,
    Conversations,
    DirectMessages,
    Notifications,
    Profiles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Cars => "cars",
            Table::Leads => "leads",
            Table::Inquiries => "inquiries",
            Table::Conversations => "conversations",
            Table::DirectMessages => "direct_messages",
            Table::Notifications => "notifications",
            Table::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One row change. Only the row's identifying columns are guaranteed to be
/// present in `record`; subscribers re-fetch instead of trusting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    #[serde(rename = "op")]
    pub kind: ChangeKind,
    pub record: Value,
}

pub type ChangeStream = BoxStream<'static, Result<ChangeEvent, StoreError>>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadFilter {
    /// Case-insensitive substring over name, email and phone.
    pub search: Option<String>,
    pub status: Option<LeadStatus>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InquiryFilter {
    /// Case-insensitive substring over name, email, phone and subject.
    pub search: Option<String>,
    pub is_read: Option<bool>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarFilter {
    /// Case-insensitive substring over make and model.
    pub search: Option<String>,
    pub status: Option<CarStatus>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub limit: Option<i64>,
}

/// Typed reads and writes against the dealership tables.
///
/// Lists are ordered newest first unless noted otherwise. Updates addressed
/// to an unknown id fail with [`StoreError::NotFound`]; concurrent updates are
/// last-write-wins.
#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn insert_car(&self, draft: CarDraft, created_by: Option<Uuid>) -> Result<Car, StoreError>;
    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError>;
    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<Car>, StoreError>;
    async fn update_car(&self, id: Uuid, draft: CarDraft) -> Result<Car, StoreError>;
    async fn set_car_status(&self, id: Uuid, status: CarStatus) -> Result<Car, StoreError>;
    /// Hard delete, there is no way back.
    async fn delete_car(&self, id: Uuid) -> Result<(), StoreError>;

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError>;
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError>;
    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError>;
    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Lead, StoreError>;

    async fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError>;
    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>, StoreError>;
    async fn update_inquiry(
        &self,
        id: Uuid,
        changes: &InquiryChanges,
    ) -> Result<Inquiry, StoreError>;

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError>;
    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;
    /// Only the owner's notification is touched; someone else's id is `NotFound`.
    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError>;
    /// Profiles with admin or staff role.
    async fn list_staff(&self) -> Result<Vec<Profile>, StoreError>;

    async fn insert_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError>;
    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError>;
    /// Conversations where the user is customer or dealer, most recent activity first.
    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError>;
    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError>;

    async fn insert_direct_message(
        &self,
        message: NewDirectMessage,
    ) -> Result<DirectMessage, StoreError>;
    /// Oldest first, the order a chat view renders them.
    async fn list_direct_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError>;
}

/// Row-change notifications for a set of tables.
#[async_trait]
pub trait ChangeFeed: Send + Sync {
    async fn subscribe(&self, tables: &[Table]) -> Result<ChangeStream, StoreError>;
}

/// Trimmed search term, or `None` when there is nothing to search for.
pub(crate) fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|term| !term.is_empty())
}

/// True when any of the fields contains `term`, ignoring case.
pub(crate) fn matches_any(term: &str, fields: &[Option<&str>]) -> bool {
    let term = term.to_lowercase();
    fields
        .iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn change_event_decodes_trigger_payload() {
        let payload = json!({
            "table": "direct_messages",
            "op": "INSERT",
            "record": { "id": "7d0c7c1e-54a4-4bb2-9f43-3c2c0f1c9a10", "recipient_id": "abc" }
        });

        let event: ChangeEvent = serde_json::from_value(payload).unwrap();
        assert_eq!(event.table, Table::DirectMessages);
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record["recipient_id"], "abc");
    }

    #[test]
    fn search_matching_ignores_case_and_missing_fields() {
        assert!(matches_any("camry", &[Some("Toyota"), Some("CAMRY XLE")]));
        assert!(matches_any("ada", &[None, Some("ada@example.com")]));
        assert!(!matches_any("lexus", &[Some("Toyota"), None]));
    }

    #[test]
    fn blank_search_is_no_search() {
        assert_eq!(search_term(&Some("   ".to_string())), None);
        assert_eq!(search_term(&Some(" camry ".to_string())), Some("camry"));
        assert_eq!(search_term(&None), None);
    }
}
