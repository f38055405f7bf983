//! Staff notifications for new leads and inquiries.
//!
//! The fan-out runs after the record it announces has been committed and is
//! deliberately not transactional with it: each staff member gets an
//! independent insert, a failed insert is logged and skipped, and nothing is
//! rolled back. Callers learn how many notifications landed and nothing more.

use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::{Inquiry, Lead, NewNotification, NotificationKind};
use crate::store::EntityStore;

/// How many of the newest notifications a staff member sees.
pub const NOTIFICATION_PAGE: i64 = 20;

const PREVIEW_CHARS: usize = 120;

/// Notifies every staff profile. Returns the number of notifications written.
pub async fn notify_staff(
    store: &dyn EntityStore,
    kind: NotificationKind,
    title: &str,
    message: &str,
    related_id: Uuid,
) -> usize {
    let staff = match store.list_staff().await {
        Ok(staff) => staff,
        Err(e) => {
            warn!("Skipping {} notification for {}: {}", kind.as_str(), related_id, e);
            return 0;
        }
    };

    let mut delivered = 0;
    for member in &staff {
        let notification = NewNotification {
            user_id: member.id,
            title: title.to_string(),
            message: message.to_string(),
            kind,
            related_id: Some(related_id),
        };

        match store.insert_notification(notification).await {
            Ok(_) => delivered += 1,
            Err(e) => warn!(
                "Failed to notify {} about {} {}: {}",
                member.id,
                kind.as_str(),
                related_id,
                e
            ),
        }
    }

    debug!(
        "Notified {}/{} staff about {} {}",
        delivered,
        staff.len(),
        kind.as_str(),
        related_id
    );
    delivered
}

pub async fn announce_lead(store: &dyn EntityStore, lead: &Lead) -> usize {
    let title = format!("New lead from {}", lead.customer_name);
    let message = match &lead.message {
        Some(message) => preview(message),
        None => format!("Call back on {}", lead.customer_phone),
    };
    notify_staff(store, NotificationKind::Lead, &title, &message, lead.id).await
}

pub async fn announce_inquiry(store: &dyn EntityStore, inquiry: &Inquiry) -> usize {
    let title = match &inquiry.subject {
        Some(subject) => format!("New inquiry: {}", subject),
        None => format!("New inquiry from {}", inquiry.customer_name),
    };
    notify_staff(
        store,
        NotificationKind::Inquiry,
        &title,
        &preview(&inquiry.message),
        inquiry.id,
    )
    .await
}

fn preview(text: &str) -> String {
    if text.chars().count() <= PREVIEW_CHARS {
        return text.to_string();
    }
    let cut: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Profile, Role};
    use crate::store::{MemoryStore, Table};

    async fn seeded_store() -> (MemoryStore, Vec<Uuid>) {
        let store = MemoryStore::new();
        let admin = Uuid::new_v4();
        let staff = Uuid::new_v4();
        store
            .put_profile(Profile::new(admin, "admin@dealer.ng", Role::Admin))
            .await;
        store
            .put_profile(Profile::new(staff, "sales@dealer.ng", Role::Staff))
            .await;
        store
            .put_profile(Profile::new(Uuid::new_v4(), "buyer@mail.ng", Role::Customer))
            .await;
        (store, vec![admin, staff])
    }

    #[tokio::test]
    async fn every_staff_member_gets_one_notification() {
        let (store, staff) = seeded_store().await;
        let related = Uuid::new_v4();

        let delivered =
            notify_staff(&store, NotificationKind::Lead, "New lead", "Camry", related).await;
        assert_eq!(delivered, 2);

        for user_id in staff {
            let inbox = store.list_notifications(user_id, NOTIFICATION_PAGE).await.unwrap();
            assert_eq!(inbox.len(), 1);
            assert_eq!(inbox[0].related_id, Some(related));
            assert_eq!(inbox[0].kind.as_deref(), Some("lead"));
            assert!(!inbox[0].is_read);
        }
    }

    #[tokio::test]
    async fn failures_are_counted_not_raised() {
        let (store, _) = seeded_store().await;
        store.fail_table(Table::Notifications);

        let delivered =
            notify_staff(&store, NotificationKind::Inquiry, "t", "m", Uuid::new_v4()).await;
        assert_eq!(delivered, 0);

        store.restore_table(Table::Notifications);
        store.fail_table(Table::Profiles);
        let delivered =
            notify_staff(&store, NotificationKind::Inquiry, "t", "m", Uuid::new_v4()).await;
        assert_eq!(delivered, 0);
    }

    #[test]
    fn long_messages_are_previewed() {
        let long = "a".repeat(300);
        let short = preview(&long);
        assert_eq!(short.chars().count(), PREVIEW_CHARS + 1);
        assert!(short.ends_with('…'));
        assert_eq!(preview("Hello"), "Hello");
    }
}
