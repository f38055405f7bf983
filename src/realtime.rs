//! Keeps open chat views fresh.
//!
//! A view asks [`watch`] for the changes it cares about and receives
//! [`Invalidation`]s telling it which list to re-fetch. Events are never
//! applied locally. When the feed breaks the watcher backs off, resubscribes
//! and sends [`Invalidation::Resync`], because no cursor is kept and anything
//! may have been missed in between.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::{ChangeEvent, ChangeFeed, ChangeKind, Table};

const BASE_DELAY: Duration = Duration::from_millis(500);
const INVALIDATION_BUFFER: usize = 32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Conversations,
    Messages,
}

/// Interest in one table, narrowed to some operations and an optional
/// `column = value` predicate on the changed row.
#[derive(Clone, Debug, PartialEq)]
pub struct Subscription {
    pub table: Table,
    pub ops: Vec<ChangeKind>,
    pub filter: Option<(String, String)>,
    pub list: ListKind,
}

const ALL_OPS: [ChangeKind; 3] = [ChangeKind::Insert, ChangeKind::Update, ChangeKind::Delete];

impl Subscription {
    /// Conversations the user takes part in, on either side.
    pub fn conversations_of(user_id: Uuid) -> Vec<Subscription> {
        ["customer_id", "dealer_id"]
            .into_iter()
            .map(|column| Subscription {
                table: Table::Conversations,
                ops: ALL_OPS.to_vec(),
                filter: Some((column.to_string(), user_id.to_string())),
                list: ListKind::Conversations,
            })
            .collect()
    }

    /// Messages addressed to the user.
    pub fn inbox_of(user_id: Uuid) -> Subscription {
        Subscription {
            table: Table::DirectMessages,
            ops: ALL_OPS.to_vec(),
            filter: Some(("recipient_id".to_string(), user_id.to_string())),
            list: ListKind::Messages,
        }
    }

    /// Every message in one thread, whoever sent it.
    pub fn thread(conversation_id: Uuid) -> Subscription {
        Subscription {
            table: Table::DirectMessages,
            ops: ALL_OPS.to_vec(),
            filter: Some(("conversation_id".to_string(), conversation_id.to_string())),
            list: ListKind::Messages,
        }
    }

    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table || !self.ops.contains(&event.kind) {
            return false;
        }
        match &self.filter {
            Some((column, value)) => event
                .record
                .get(column)
                .and_then(|v| v.as_str())
                .map_or(false, |v| v.eq_ignore_ascii_case(value)),
            None => true,
        }
    }

    fn invalidation(&self, event: &ChangeEvent) -> Option<Invalidation> {
        if !self.matches(event) {
            return None;
        }
        Some(match self.list {
            ListKind::Conversations => Invalidation::Conversations,
            ListKind::Messages => event
                .record
                .get("conversation_id")
                .and_then(|v| v.as_str())
                .and_then(|v| Uuid::parse_str(v).ok())
                .map(|conversation_id| Invalidation::Messages { conversation_id })
                // Without a thread id the view cannot know what to reload.
                .unwrap_or(Invalidation::Resync),
        })
    }
}

/// Which cached list a view should re-fetch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "invalidate", rename_all = "snake_case")]
pub enum Invalidation {
    Conversations,
    Messages { conversation_id: Uuid },
    /// Re-fetch everything; events may have been lost.
    Resync,
}

/// Exponential reconnect delay, jittered into `[d/2, d]`.
#[derive(Clone, Debug)]
pub struct Backoff {
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(max: Duration) -> Self {
        Backoff { max, attempt: 0 }
    }

    /// Un-jittered delay for the current attempt.
    pub fn ceiling(&self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempt.min(16));
        BASE_DELAY.saturating_mul(factor).min(self.max)
    }

    pub fn next_delay(&mut self) -> Duration {
        let ceiling = self.ceiling().as_millis() as u64;
        self.attempt = self.attempt.saturating_add(1);
        let floor = ceiling / 2;
        Duration::from_millis(rand::thread_rng().gen_range(floor..=ceiling))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Starts watching `subscriptions` and returns the invalidation channel.
/// Dropping the receiver stops the watcher.
pub fn watch(
    feed: Arc<dyn ChangeFeed>,
    subscriptions: Vec<Subscription>,
    backoff: Backoff,
) -> mpsc::Receiver<Invalidation> {
    let (tx, rx) = mpsc::channel(INVALIDATION_BUFFER);
    tokio::spawn(run(feed, subscriptions, backoff, tx));
    rx
}

async fn run(
    feed: Arc<dyn ChangeFeed>,
    subscriptions: Vec<Subscription>,
    mut backoff: Backoff,
    tx: mpsc::Sender<Invalidation>,
) {
    let mut tables: Vec<Table> = Vec::new();
    for subscription in &subscriptions {
        if !tables.contains(&subscription.table) {
            tables.push(subscription.table);
        }
    }

    let mut recovering = false;
    loop {
        let mut events = match feed.subscribe(&tables).await {
            Ok(events) => events,
            Err(e) => {
                warn!("Realtime subscribe failed: {}", e);
                recovering = true;
                if !pause(&tx, backoff.next_delay()).await {
                    break;
                }
                continue;
            }
        };

        if recovering {
            info!("Realtime feed restored, asking view to resync");
            backoff.reset();
            recovering = false;
            if tx.send(Invalidation::Resync).await.is_err() {
                break;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => {
                    debug!("Realtime view closed");
                    return;
                }
                item = events.next() => match item {
                    Some(Ok(event)) => {
                        for invalidation in invalidations(&subscriptions, &event) {
                            if tx.send(invalidation).await.is_err() {
                                return;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        warn!("Realtime feed failed: {}", e);
                        break;
                    }
                    None => {
                        warn!("Realtime feed ended");
                        break;
                    }
                }
            }
        }

        recovering = true;
        if !pause(&tx, backoff.next_delay()).await {
            break;
        }
    }
    debug!("Realtime watcher stopped");
}

fn invalidations(subscriptions: &[Subscription], event: &ChangeEvent) -> Vec<Invalidation> {
    let mut found = Vec::new();
    for invalidation in subscriptions.iter().filter_map(|s| s.invalidation(event)) {
        if !found.contains(&invalidation) {
            found.push(invalidation);
        }
    }
    found
}

/// Sleeps for `delay`; false when the view went away meanwhile.
async fn pause(tx: &mpsc::Sender<Invalidation>, delay: Duration) -> bool {
    debug!("Realtime reconnect in {:?}", delay);
    tokio::select! {
        _ = tx.closed() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
