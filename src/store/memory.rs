//! In-process store used by the test-suite and for running the service
//! without a database (`DATABASE_URL=memory://`).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::ready;
use futures::{stream, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{
    matches_any, search_term, CarFilter, ChangeEvent, ChangeFeed, ChangeKind, ChangeStream,
    EntityStore, InquiryFilter, LeadFilter, StoreError, Table,
};
use crate::models::{
    Car, CarDraft, CarStatus, Conversation, DashboardStats, DirectMessage, Inquiry,
    InquiryChanges, Lead, LeadChanges, NewConversation, NewDirectMessage, NewInquiry, NewLead,
    NewNotification, Notification, Profile,
};

const CHANGE_BUFFER: usize = 256;

#[derive(Default)]
struct Tables {
    cars: Vec<Car>,
    leads: Vec<Lead>,
    inquiries: Vec<Inquiry>,
    notifications: Vec<Notification>,
    profiles: Vec<Profile>,
    conversations: Vec<Conversation>,
    messages: Vec<DirectMessage>,
}

#[derive(Clone)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    changes: broadcast::Sender<ChangeEvent>,
    failing: Arc<Mutex<HashSet<Table>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        MemoryStore {
            tables: Arc::new(RwLock::new(Tables::default())),
            changes,
            failing: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Inserts or replaces a profile. Profiles are owned by the auth provider,
    /// so there is no store operation for this.
    #[cfg(test)]
    pub async fn put_profile(&self, profile: Profile) {
        let mut tables = self.tables.write().await;
        tables.profiles.retain(|p| p.id != profile.id);
        tables.profiles.push(profile);
    }

    /// Dealers are attached to threads outside this service.
    #[cfg(test)]
    pub async fn assign_dealer(&self, conversation_id: Uuid, dealer_id: Uuid) {
        let mut tables = self.tables.write().await;
        if let Some(conversation) = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        {
            conversation.dealer_id = Some(dealer_id);
        }
    }

    /// Every following call touching `table` fails until [`restore_table`] is called.
    ///
    /// [`restore_table`]: MemoryStore::restore_table
    #[cfg(test)]
    pub fn fail_table(&self, table: Table) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.insert(table);
        }
    }

    #[cfg(test)]
    pub fn restore_table(&self, table: Table) {
        if let Ok(mut failing) = self.failing.lock() {
            failing.remove(&table);
        }
    }

    fn is_failing(&self, table: Table) -> bool {
        self.failing
            .lock()
            .map(|failing| failing.contains(&table))
            .unwrap_or(false)
    }

    fn check_read(&self, table: Table) -> Result<(), StoreError> {
        if self.is_failing(table) {
            return Err(StoreError::Read(format!("{} is unavailable", table)));
        }
        Ok(())
    }

    fn check_write(&self, table: Table) -> Result<(), StoreError> {
        if self.is_failing(table) {
            return Err(StoreError::Write(format!("{} is unavailable", table)));
        }
        Ok(())
    }

    fn emit<T: Serialize>(&self, table: Table, kind: ChangeKind, record: &T) {
        let record = serde_json::to_value(record).unwrap_or(Value::Null);
        // No receivers is the normal case outside of open chat views.
        let _ = self.changes.send(ChangeEvent {
            table,
            kind,
            record,
        });
    }
}

/// Newest first; among equal timestamps the later insert wins.
fn newest_first<T: Clone>(rows: &[T], created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut sorted: Vec<T> = rows.iter().rev().cloned().collect();
    sorted.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    sorted
}

/// Limits are validated as positive before they reach the store.
fn apply_limit<T>(mut rows: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        rows.truncate(limit as usize);
    }
    rows
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_car(&self, draft: CarDraft, created_by: Option<Uuid>) -> Result<Car, StoreError> {
        self.check_write(Table::Cars)?;
        let car = Car::from_draft(draft, created_by);
        self.tables.write().await.cars.push(car.clone());
        self.emit(Table::Cars, ChangeKind::Insert, &car);
        debug!("Car inserted: {}", car.id);
        Ok(car)
    }

    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        self.check_read(Table::Cars)?;
        let tables = self.tables.read().await;
        Ok(tables.cars.iter().find(|c| c.id == id).cloned())
    }

    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<Car>, StoreError> {
        self.check_read(Table::Cars)?;
        let tables = self.tables.read().await;
        let term = search_term(&filter.search);

        let matching: Vec<Car> = tables
            .cars
            .iter()
            .filter(|car| {
                term.map_or(true, |t| {
                    matches_any(t, &[Some(car.make.as_str()), Some(car.model.as_str())])
                })
            })
            .filter(|car| filter.status.map_or(true, |s| car.status == s))
            .filter(|car| filter.min_price.map_or(true, |min| car.price >= min))
            .filter(|car| filter.max_price.map_or(true, |max| car.price <= max))
            .cloned()
            .collect();

        Ok(apply_limit(newest_first(&matching, |c| c.created_at), filter.limit))
    }

    async fn update_car(&self, id: Uuid, draft: CarDraft) -> Result<Car, StoreError> {
        self.check_write(Table::Cars)?;
        let mut tables = self.tables.write().await;
        let car = tables
            .cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?;
        car.apply_draft(draft);
        let car = car.clone();
        drop(tables);

        self.emit(Table::Cars, ChangeKind::Update, &car);
        Ok(car)
    }

    async fn set_car_status(&self, id: Uuid, status: CarStatus) -> Result<Car, StoreError> {
        self.check_write(Table::Cars)?;
        let mut tables = self.tables.write().await;
        let car = tables
            .cars
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?;
        car.status = status;
        car.updated_at = Utc::now();
        let car = car.clone();
        drop(tables);

        self.emit(Table::Cars, ChangeKind::Update, &car);
        Ok(car)
    }

    async fn delete_car(&self, id: Uuid) -> Result<(), StoreError> {
        self.check_write(Table::Cars)?;
        let mut tables = self.tables.write().await;
        let position = tables
            .cars
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))?;
        let car = tables.cars.remove(position);
        drop(tables);

        self.emit(Table::Cars, ChangeKind::Delete, &car);
        Ok(())
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        self.check_write(Table::Leads)?;
        let lead = Lead::from(lead);
        self.tables.write().await.leads.push(lead.clone());
        self.emit(Table::Leads, ChangeKind::Insert, &lead);
        Ok(lead)
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        self.check_read(Table::Leads)?;
        let tables = self.tables.read().await;
        Ok(tables.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        self.check_read(Table::Leads)?;
        let tables = self.tables.read().await;
        let term = search_term(&filter.search);

        let matching: Vec<Lead> = tables
            .leads
            .iter()
            .filter(|lead| {
                term.map_or(true, |t| {
                    matches_any(
                        t,
                        &[
                            Some(lead.customer_name.as_str()),
                            lead.customer_email.as_deref(),
                            Some(lead.customer_phone.as_str()),
                        ],
                    )
                })
            })
            .filter(|lead| filter.status.map_or(true, |s| lead.status == s))
            .cloned()
            .collect();

        Ok(apply_limit(newest_first(&matching, |l| l.created_at), filter.limit))
    }

    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Lead, StoreError> {
        self.check_write(Table::Leads)?;
        let mut tables = self.tables.write().await;
        let lead = tables
            .leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("lead {}", id)))?;
        if let Some(status) = changes.status {
            lead.status = status;
        }
        if let Some(assigned_to) = changes.assigned_to {
            lead.assigned_to = Some(assigned_to);
        }
        lead.updated_at = Utc::now();
        let lead = lead.clone();
        drop(tables);

        self.emit(Table::Leads, ChangeKind::Update, &lead);
        Ok(lead)
    }

    async fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        self.check_write(Table::Inquiries)?;
        let inquiry = Inquiry::from(inquiry);
        self.tables.write().await.inquiries.push(inquiry.clone());
        self.emit(Table::Inquiries, ChangeKind::Insert, &inquiry);
        Ok(inquiry)
    }

    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>, StoreError> {
        self.check_read(Table::Inquiries)?;
        let tables = self.tables.read().await;
        let term = search_term(&filter.search);

        let matching: Vec<Inquiry> = tables
            .inquiries
            .iter()
            .filter(|inquiry| {
                term.map_or(true, |t| {
                    matches_any(
                        t,
                        &[
                            Some(inquiry.customer_name.as_str()),
                            inquiry.customer_email.as_deref(),
                            inquiry.customer_phone.as_deref(),
                            inquiry.subject.as_deref(),
                        ],
                    )
                })
            })
            .filter(|inquiry| filter.is_read.map_or(true, |read| inquiry.is_read == read))
            .cloned()
            .collect();

        Ok(apply_limit(newest_first(&matching, |i| i.created_at), filter.limit))
    }

    async fn update_inquiry(
        &self,
        id: Uuid,
        changes: &InquiryChanges,
    ) -> Result<Inquiry, StoreError> {
        self.check_write(Table::Inquiries)?;
        let mut tables = self.tables.write().await;
        let inquiry = tables
            .inquiries
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("inquiry {}", id)))?;
        if let Some(is_read) = changes.is_read {
            inquiry.is_read = is_read;
        }
        if let Some(responded_at) = changes.responded_at {
            inquiry.responded_at = Some(responded_at);
        }
        if let Some(responded_by) = changes.responded_by {
            inquiry.responded_by = Some(responded_by);
        }
        let inquiry = inquiry.clone();
        drop(tables);

        self.emit(Table::Inquiries, ChangeKind::Update, &inquiry);
        Ok(inquiry)
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError> {
        self.check_write(Table::Notifications)?;
        let notification = Notification::from(notification);
        self.tables
            .write()
            .await
            .notifications
            .push(notification.clone());
        self.emit(Table::Notifications, ChangeKind::Insert, &notification);
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        self.check_read(Table::Notifications)?;
        let tables = self.tables.read().await;
        let mine: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();

        Ok(apply_limit(newest_first(&mine, |n| n.created_at), Some(limit)))
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.check_write(Table::Notifications)?;
        let mut tables = self.tables.write().await;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("notification {}", id)))?;
        notification.is_read = true;
        let notification = notification.clone();
        drop(tables);

        self.emit(Table::Notifications, ChangeKind::Update, &notification);
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        self.check_read(Table::Profiles)?;
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn list_staff(&self) -> Result<Vec<Profile>, StoreError> {
        self.check_read(Table::Profiles)?;
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .iter()
            .filter(|p| p.role.has_admin_access())
            .cloned()
            .collect())
    }

    async fn insert_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        self.check_write(Table::Conversations)?;
        let conversation = Conversation::from(conversation);
        self.tables
            .write()
            .await
            .conversations
            .push(conversation.clone());
        self.emit(Table::Conversations, ChangeKind::Insert, &conversation);
        Ok(conversation)
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError> {
        self.check_read(Table::Conversations)?;
        let tables = self.tables.read().await;
        Ok(tables.conversations.iter().find(|c| c.id == id).cloned())
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        self.check_read(Table::Conversations)?;
        let tables = self.tables.read().await;
        let mine: Vec<Conversation> = tables
            .conversations
            .iter()
            .filter(|c| c.has_participant(user_id))
            .cloned()
            .collect();

        Ok(newest_first(&mine, |c| c.last_message_at))
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.check_write(Table::Conversations)?;
        let mut tables = self.tables.write().await;
        let conversation = tables
            .conversations
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("conversation {}", id)))?;
        conversation.last_message_at = at;
        conversation.updated_at = Utc::now();
        let conversation = conversation.clone();
        drop(tables);

        self.emit(Table::Conversations, ChangeKind::Update, &conversation);
        Ok(())
    }

    async fn insert_direct_message(
        &self,
        message: NewDirectMessage,
    ) -> Result<DirectMessage, StoreError> {
        self.check_write(Table::DirectMessages)?;
        let message = DirectMessage::from(message);
        self.tables.write().await.messages.push(message.clone());
        self.emit(Table::DirectMessages, ChangeKind::Insert, &message);
        Ok(message)
    }

    async fn list_direct_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        self.check_read(Table::DirectMessages)?;
        let tables = self.tables.read().await;
        let mut thread: Vec<DirectMessage> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        thread.sort_by_key(|m| m.created_at);
        Ok(thread)
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        self.check_read(Table::Cars)?;
        self.check_read(Table::Leads)?;
        self.check_read(Table::Inquiries)?;
        let tables = self.tables.read().await;

        Ok(DashboardStats {
            total_cars: tables.cars.len() as i64,
            available_cars: tables
                .cars
                .iter()
                .filter(|c| c.status == CarStatus::Available)
                .count() as i64,
            total_leads: tables.leads.len() as i64,
            active_leads: tables.leads.iter().filter(|l| l.status.is_active()).count() as i64,
            total_inquiries: tables.inquiries.len() as i64,
            unread_inquiries: tables.inquiries.iter().filter(|i| !i.is_read).count() as i64,
        })
    }
}

#[async_trait]
impl ChangeFeed for MemoryStore {
    async fn subscribe(&self, tables: &[Table]) -> Result<ChangeStream, StoreError> {
        if let Some(table) = tables.iter().find(|t| self.is_failing(**t)) {
            return Err(StoreError::Subscription(format!("{} is unavailable", table)));
        }

        let tables = tables.to_vec();
        let receiver = self.changes.subscribe();
        let events = stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(event) => Some((Ok(event), receiver)),
                Err(RecvError::Lagged(skipped)) => Some((
                    Err(StoreError::Subscription(format!(
                        "lagged behind by {} events",
                        skipped
                    ))),
                    receiver,
                )),
                Err(RecvError::Closed) => None,
            }
        })
        .filter(move |item| {
            ready(match item {
                Ok(event) => tables.contains(&event.table),
                Err(_) => true,
            })
        });

        Ok(events.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LeadStatus, Role};

    fn new_lead(name: &str, phone: &str) -> NewLead {
        NewLead {
            customer_name: name.to_string(),
            customer_phone: phone.to_string(),
            customer_email: None,
            message: None,
            source: "website".to_string(),
            interested_car_id: None,
        }
    }

    #[tokio::test]
    async fn leads_list_newest_first_and_filter_by_status() {
        let store = MemoryStore::new();
        let first = store.insert_lead(new_lead("Ada", "0801")).await.unwrap();
        let second = store.insert_lead(new_lead("Bayo", "0802")).await.unwrap();

        store
            .update_lead(
                first.id,
                &LeadChanges {
                    status: Some(LeadStatus::Contacted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let all = store.list_leads(&LeadFilter::default()).await.unwrap();
        assert_eq!(
            all.iter().map(|l| l.id).collect::<Vec<_>>(),
            vec![second.id, first.id]
        );

        let contacted = store
            .list_leads(&LeadFilter {
                status: Some(LeadStatus::Contacted),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(contacted.len(), 1);
        assert_eq!(contacted[0].id, first.id);
    }

    #[tokio::test]
    async fn updates_to_unknown_ids_are_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update_lead(Uuid::new_v4(), &LeadChanges::default())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        let err = store.delete_car(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn failing_table_rejects_reads_and_writes() {
        let store = MemoryStore::new();
        store.fail_table(Table::Leads);

        let err = store.insert_lead(new_lead("Ada", "0801")).await.unwrap_err();
        assert!(matches!(err, StoreError::Write(_)));
        let err = store.list_leads(&LeadFilter::default()).await.unwrap_err();
        assert!(matches!(err, StoreError::Read(_)));

        store.restore_table(Table::Leads);
        assert!(store.insert_lead(new_lead("Ada", "0801")).await.is_ok());
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_their_owner() {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let notification = store
            .insert_notification(NewNotification {
                user_id: owner,
                title: "New lead".to_string(),
                message: "Ada wants a call back".to_string(),
                kind: crate::models::NotificationKind::Lead,
                related_id: None,
            })
            .await
            .unwrap();

        let err = store
            .mark_notification_read(notification.id, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));

        store
            .mark_notification_read(notification.id, owner)
            .await
            .unwrap();
        let listed = store.list_notifications(owner, 20).await.unwrap();
        assert!(listed[0].is_read);
    }

    #[tokio::test]
    async fn staff_listing_excludes_customers() {
        let store = MemoryStore::new();
        store
            .put_profile(Profile::new(Uuid::new_v4(), "admin@jbautos.ng", Role::Admin))
            .await;
        store
            .put_profile(Profile::new(Uuid::new_v4(), "sales@jbautos.ng", Role::Staff))
            .await;
        store
            .put_profile(Profile::new(Uuid::new_v4(), "buyer@gmail.com", Role::Customer))
            .await;

        let staff = store.list_staff().await.unwrap();
        assert_eq!(staff.len(), 2);
        assert!(staff.iter().all(|p| p.role.has_admin_access()));
    }

    #[tokio::test]
    async fn change_feed_only_yields_requested_tables() {
        let store = MemoryStore::new();
        let mut events = store.subscribe(&[Table::Inquiries]).await.unwrap();

        store.insert_lead(new_lead("Ada", "0801")).await.unwrap();
        store
            .insert_inquiry(NewInquiry {
                customer_name: "Ada".to_string(),
                customer_email: None,
                customer_phone: None,
                subject: None,
                message: "Interested in Camry".to_string(),
            })
            .await
            .unwrap();

        let event = events.next().await.unwrap().unwrap();
        assert_eq!(event.table, Table::Inquiries);
        assert_eq!(event.kind, ChangeKind::Insert);
        assert_eq!(event.record["customer_name"], "Ada");
    }
}
