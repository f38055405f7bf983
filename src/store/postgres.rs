use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::{stream, StreamExt};
use lazy_static::lazy_static;
use regex::Regex;
use sqlx::postgres::{PgListener, PgPoolOptions};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    search_term, CarFilter, ChangeEvent, ChangeFeed, ChangeStream, EntityStore, InquiryFilter,
    LeadFilter, StoreError, Table,
};
use crate::models::{
    Car, CarDraft, CarStatus, Conversation, DashboardStats, DirectMessage, Inquiry,
    InquiryChanges, Lead, LeadChanges, NewConversation, NewDirectMessage, NewInquiry, NewLead,
    NewNotification, Notification, Profile,
};

/// Channel the `notify_entity_change` trigger publishes on.
const CHANGE_CHANNEL: &str = "entity_changes";

const CAR_COLUMNS: &str = "id, make, model, year, price, mileage, fuel_type, transmission, \
     color, description, features, images, status, created_by, created_at, updated_at";
const LEAD_COLUMNS: &str = "id, customer_name, customer_phone, customer_email, message, source, \
     interested_car_id, status, assigned_to, created_at, updated_at";
const INQUIRY_COLUMNS: &str = "id, customer_name, customer_email, customer_phone, subject, \
     message, is_read, responded_at, responded_by, created_at";
const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, \"type\", related_id, is_read, created_at";
const PROFILE_COLUMNS: &str = "id, email, full_name, phone, role, created_at, updated_at";
const CONVERSATION_COLUMNS: &str =
    "id, customer_id, dealer_id, subject, status, last_message_at, created_at, updated_at";
const MESSAGE_COLUMNS: &str = "id, conversation_id, sender_id, recipient_id, message, \
     message_type, media_url, is_read, created_at, updated_at";

lazy_static! {
    static ref LIKE_META: Regex = Regex::new(r"[\\%_]").unwrap();
}

/// `%term%` with LIKE metacharacters escaped so they match literally.
fn like_pattern(term: &str) -> String {
    format!("%{}%", LIKE_META.replace_all(term, r"\$0"))
}

fn read_err(e: sqlx::Error) -> StoreError {
    StoreError::Read(e.to_string())
}

fn write_err(e: sqlx::Error) -> StoreError {
    StoreError::Write(e.to_string())
}

fn subscription_err(e: sqlx::Error) -> StoreError {
    StoreError::Subscription(e.to_string())
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    /// Connects, applies pending migrations and bounds every later call by `timeout`.
    pub async fn connect(database_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(timeout)
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        info!("Connected to database, migrations applied");
        Ok(PgStore { pool, timeout })
    }

    async fn timed<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn insert_car(&self, draft: CarDraft, created_by: Option<Uuid>) -> Result<Car, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO cars (make, model, year, price, mileage, fuel_type, transmission, color,
                              description, features, images, status, created_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            CAR_COLUMNS
        );

        let car = self
            .timed(async {
                sqlx::query_as::<_, Car>(&sql)
                    .bind(&draft.make)
                    .bind(&draft.model)
                    .bind(draft.year)
                    .bind(draft.price)
                    .bind(draft.mileage)
                    .bind(&draft.fuel_type)
                    .bind(&draft.transmission)
                    .bind(&draft.color)
                    .bind(&draft.description)
                    .bind(&draft.features)
                    .bind(&draft.images)
                    .bind(draft.status.unwrap_or_default())
                    .bind(created_by)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(write_err)
            })
            .await?;

        debug!("Car created: {}", car.id);
        Ok(car)
    }

    async fn get_car(&self, id: Uuid) -> Result<Option<Car>, StoreError> {
        let sql = format!("SELECT {} FROM cars WHERE id = $1", CAR_COLUMNS);
        self.timed(async {
            sqlx::query_as::<_, Car>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn list_cars(&self, filter: &CarFilter) -> Result<Vec<Car>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM cars WHERE TRUE",
            CAR_COLUMNS
        ));
        if let Some(term) = search_term(&filter.search) {
            let pattern = like_pattern(term);
            qb.push(" AND (make ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR model ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        if let Some(min_price) = filter.min_price {
            qb.push(" AND price >= ").push_bind(min_price);
        }
        if let Some(max_price) = filter.max_price {
            qb.push(" AND price <= ").push_bind(max_price);
        }
        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        self.timed(async {
            qb.build_query_as::<Car>()
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn update_car(&self, id: Uuid, draft: CarDraft) -> Result<Car, StoreError> {
        let sql = format!(
            r#"
            UPDATE cars
            SET make = $1, model = $2, year = $3, price = $4, mileage = $5, fuel_type = $6,
                transmission = $7, color = $8, description = $9, features = $10, images = $11,
                status = COALESCE($12, status), updated_at = now()
            WHERE id = $13
            RETURNING {}
            "#,
            CAR_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Car>(&sql)
                .bind(&draft.make)
                .bind(&draft.model)
                .bind(draft.year)
                .bind(draft.price)
                .bind(draft.mileage)
                .bind(&draft.fuel_type)
                .bind(&draft.transmission)
                .bind(&draft.color)
                .bind(&draft.description)
                .bind(&draft.features)
                .bind(&draft.images)
                .bind(draft.status)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(write_err)?
                .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))
        })
        .await
    }

    async fn set_car_status(&self, id: Uuid, status: CarStatus) -> Result<Car, StoreError> {
        let sql = format!(
            "UPDATE cars SET status = $1, updated_at = now() WHERE id = $2 RETURNING {}",
            CAR_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Car>(&sql)
                .bind(status)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(write_err)?
                .ok_or_else(|| StoreError::NotFound(format!("car {}", id)))
        })
        .await
    }

    async fn delete_car(&self, id: Uuid) -> Result<(), StoreError> {
        let result = self
            .timed(async {
                sqlx::query("DELETE FROM cars WHERE id = $1")
                    .bind(id)
                    .execute(&self.pool)
                    .await
                    .map_err(write_err)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("car {}", id)));
        }
        debug!("Car deleted: {}", id);
        Ok(())
    }

    async fn insert_lead(&self, lead: NewLead) -> Result<Lead, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO leads (customer_name, customer_phone, customer_email, message, source,
                               interested_car_id, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'new')
            RETURNING {}
            "#,
            LEAD_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Lead>(&sql)
                .bind(&lead.customer_name)
                .bind(&lead.customer_phone)
                .bind(&lead.customer_email)
                .bind(&lead.message)
                .bind(&lead.source)
                .bind(lead.interested_car_id)
                .fetch_one(&self.pool)
                .await
                .map_err(write_err)
        })
        .await
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, StoreError> {
        let sql = format!("SELECT {} FROM leads WHERE id = $1", LEAD_COLUMNS);
        self.timed(async {
            sqlx::query_as::<_, Lead>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn list_leads(&self, filter: &LeadFilter) -> Result<Vec<Lead>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM leads WHERE TRUE",
            LEAD_COLUMNS
        ));
        if let Some(term) = search_term(&filter.search) {
            let pattern = like_pattern(term);
            qb.push(" AND (customer_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_phone ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status);
        }
        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        self.timed(async {
            qb.build_query_as::<Lead>()
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn update_lead(&self, id: Uuid, changes: &LeadChanges) -> Result<Lead, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE leads SET updated_at = now()");
        if let Some(status) = changes.status {
            qb.push(", status = ").push_bind(status);
        }
        if let Some(assigned_to) = changes.assigned_to {
            qb.push(", assigned_to = ").push_bind(assigned_to);
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", LEAD_COLUMNS));

        self.timed(async {
            qb.build_query_as::<Lead>()
                .fetch_optional(&self.pool)
                .await
                .map_err(write_err)?
                .ok_or_else(|| StoreError::NotFound(format!("lead {}", id)))
        })
        .await
    }

    async fn insert_inquiry(&self, inquiry: NewInquiry) -> Result<Inquiry, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO inquiries (customer_name, customer_email, customer_phone, subject, message, is_read)
            VALUES ($1, $2, $3, $4, $5, false)
            RETURNING {}
            "#,
            INQUIRY_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Inquiry>(&sql)
                .bind(&inquiry.customer_name)
                .bind(&inquiry.customer_email)
                .bind(&inquiry.customer_phone)
                .bind(&inquiry.subject)
                .bind(&inquiry.message)
                .fetch_one(&self.pool)
                .await
                .map_err(write_err)
        })
        .await
    }

    async fn list_inquiries(&self, filter: &InquiryFilter) -> Result<Vec<Inquiry>, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM inquiries WHERE TRUE",
            INQUIRY_COLUMNS
        ));
        if let Some(term) = search_term(&filter.search) {
            let pattern = like_pattern(term);
            qb.push(" AND (customer_name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_email ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR customer_phone ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR subject ILIKE ")
                .push_bind(pattern)
                .push(")");
        }
        if let Some(is_read) = filter.is_read {
            qb.push(" AND is_read = ").push_bind(is_read);
        }
        qb.push(" ORDER BY created_at DESC");
        if let Some(limit) = filter.limit {
            qb.push(" LIMIT ").push_bind(limit);
        }

        self.timed(async {
            qb.build_query_as::<Inquiry>()
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn update_inquiry(
        &self,
        id: Uuid,
        changes: &InquiryChanges,
    ) -> Result<Inquiry, StoreError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE inquiries SET ");
        if changes.is_empty() {
            qb.push("is_read = is_read");
        } else {
            let mut assignments = qb.separated(", ");
            if let Some(is_read) = changes.is_read {
                assignments.push("is_read = ").push_bind_unseparated(is_read);
            }
            if let Some(responded_at) = changes.responded_at {
                assignments
                    .push("responded_at = ")
                    .push_bind_unseparated(responded_at);
            }
            if let Some(responded_by) = changes.responded_by {
                assignments
                    .push("responded_by = ")
                    .push_bind_unseparated(responded_by);
            }
        }
        qb.push(" WHERE id = ")
            .push_bind(id)
            .push(format!(" RETURNING {}", INQUIRY_COLUMNS));

        self.timed(async {
            qb.build_query_as::<Inquiry>()
                .fetch_optional(&self.pool)
                .await
                .map_err(write_err)?
                .ok_or_else(|| StoreError::NotFound(format!("inquiry {}", id)))
        })
        .await
    }

    async fn insert_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO notifications (user_id, title, message, "type", related_id, is_read)
            VALUES ($1, $2, $3, $4, $5, false)
            RETURNING {}
            "#,
            NOTIFICATION_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Notification>(&sql)
                .bind(notification.user_id)
                .bind(&notification.title)
                .bind(&notification.message)
                .bind(notification.kind.as_str())
                .bind(notification.related_id)
                .fetch_one(&self.pool)
                .await
                .map_err(write_err)
        })
        .await
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let sql = format!(
            "SELECT {} FROM notifications WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2",
            NOTIFICATION_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Notification>(&sql)
                .bind(user_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn mark_notification_read(&self, id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        let result = self
            .timed(async {
                sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                    .bind(id)
                    .bind(user_id)
                    .execute(&self.pool)
                    .await
                    .map_err(write_err)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("notification {}", id)));
        }
        Ok(())
    }

    async fn get_profile(&self, id: Uuid) -> Result<Option<Profile>, StoreError> {
        let sql = format!("SELECT {} FROM profiles WHERE id = $1", PROFILE_COLUMNS);
        self.timed(async {
            sqlx::query_as::<_, Profile>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn list_staff(&self) -> Result<Vec<Profile>, StoreError> {
        let sql = format!(
            "SELECT {} FROM profiles WHERE role IN ('admin', 'staff') ORDER BY created_at",
            PROFILE_COLUMNS
        );
        self.timed(async {
            sqlx::query_as::<_, Profile>(&sql)
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn insert_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<Conversation, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO conversations (customer_id, dealer_id, subject, status)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            CONVERSATION_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, Conversation>(&sql)
                .bind(conversation.customer_id)
                .bind(conversation.dealer_id)
                .bind(&conversation.subject)
                .bind(&conversation.status)
                .fetch_one(&self.pool)
                .await
                .map_err(write_err)
        })
        .await
    }

    async fn get_conversation(&self, id: Uuid) -> Result<Option<Conversation>, StoreError> {
        let sql = format!(
            "SELECT {} FROM conversations WHERE id = $1",
            CONVERSATION_COLUMNS
        );
        self.timed(async {
            sqlx::query_as::<_, Conversation>(&sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<Conversation>, StoreError> {
        let sql = format!(
            r#"
            SELECT {} FROM conversations
            WHERE customer_id = $1 OR dealer_id = $1
            ORDER BY last_message_at DESC
            "#,
            CONVERSATION_COLUMNS
        );
        self.timed(async {
            sqlx::query_as::<_, Conversation>(&sql)
                .bind(user_id)
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn touch_conversation(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StoreError> {
        let result = self
            .timed(async {
                sqlx::query(
                    "UPDATE conversations SET last_message_at = $1, updated_at = now() WHERE id = $2",
                )
                .bind(at)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(write_err)
            })
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("conversation {}", id)));
        }
        Ok(())
    }

    async fn insert_direct_message(
        &self,
        message: NewDirectMessage,
    ) -> Result<DirectMessage, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO direct_messages (conversation_id, sender_id, recipient_id, message,
                                         message_type, media_url)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            MESSAGE_COLUMNS
        );

        self.timed(async {
            sqlx::query_as::<_, DirectMessage>(&sql)
                .bind(message.conversation_id)
                .bind(message.sender_id)
                .bind(message.recipient_id)
                .bind(&message.message)
                .bind(message.message_type.as_str())
                .bind(&message.media_url)
                .fetch_one(&self.pool)
                .await
                .map_err(write_err)
        })
        .await
    }

    async fn list_direct_messages(
        &self,
        conversation_id: Uuid,
    ) -> Result<Vec<DirectMessage>, StoreError> {
        let sql = format!(
            "SELECT {} FROM direct_messages WHERE conversation_id = $1 ORDER BY created_at ASC",
            MESSAGE_COLUMNS
        );
        self.timed(async {
            sqlx::query_as::<_, DirectMessage>(&sql)
                .bind(conversation_id)
                .fetch_all(&self.pool)
                .await
                .map_err(read_err)
        })
        .await
    }

    async fn dashboard_stats(&self) -> Result<DashboardStats, StoreError> {
        self.timed(async {
            sqlx::query_as::<_, DashboardStats>(
                r#"
                SELECT
                    (SELECT COUNT(*) FROM cars) AS total_cars,
                    (SELECT COUNT(*) FROM cars WHERE status = 'available') AS available_cars,
                    (SELECT COUNT(*) FROM leads) AS total_leads,
                    (SELECT COUNT(*) FROM leads
                        WHERE status IN ('new', 'contacted', 'interested')) AS active_leads,
                    (SELECT COUNT(*) FROM inquiries) AS total_inquiries,
                    (SELECT COUNT(*) FROM inquiries WHERE NOT is_read) AS unread_inquiries
                "#,
            )
            .fetch_one(&self.pool)
            .await
            .map_err(read_err)
        })
        .await
    }
}

#[async_trait]
impl ChangeFeed for PgStore {
    /// Opens a dedicated LISTEN connection. A dropped connection surfaces as an
    /// error item instead of the silent reconnect `PgListener::recv` would do,
    /// so the caller knows events may have been missed.
    async fn subscribe(&self, tables: &[Table]) -> Result<ChangeStream, StoreError> {
        let listener = self
            .timed(async {
                let mut listener = PgListener::connect_with(&self.pool)
                    .await
                    .map_err(subscription_err)?;
                listener
                    .listen(CHANGE_CHANNEL)
                    .await
                    .map_err(subscription_err)?;
                Ok(listener)
            })
            .await?;

        let tables = tables.to_vec();
        let events = stream::unfold(listener, move |mut listener| {
            let tables = tables.clone();
            async move {
                loop {
                    match listener.try_recv().await {
                        Ok(Some(notification)) => {
                            match serde_json::from_str::<ChangeEvent>(notification.payload()) {
                                Ok(event) if tables.contains(&event.table) => {
                                    return Some((Ok(event), listener))
                                }
                                Ok(_) => continue,
                                Err(e) => {
                                    warn!("Discarding malformed change payload: {}", e);
                                    continue;
                                }
                            }
                        }
                        Ok(None) => {
                            return Some((
                                Err(StoreError::Subscription(
                                    "listen connection lost".to_string(),
                                )),
                                listener,
                            ))
                        }
                        Err(e) => return Some((Err(subscription_err(e)), listener)),
                    }
                }
            }
        });

        Ok(events.boxed())
    }
}
