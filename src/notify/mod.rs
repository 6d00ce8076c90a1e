//! # Notification Channel
//!
//! Fan-out of domain events to every connected observer. Coordinators receive
//! a [`NotificationChannel`] instead of reaching for a process-wide client list,
//! which keeps the game rules independent of any transport.
//!
//! Delivery is best-effort: each subscriber owns an unbounded queue, a
//! broadcast never blocks, and subscribers whose receiving half was dropped are
//! pruned on the next broadcast. Nothing is persisted for late subscribers.
//!
//! ```rust
//! use guildquest::notify::{GameEvent, NotificationChannel, NotificationHub};
//! use guildquest::game::TaskRecord;
//!
//! let hub = NotificationHub::new();
//! let mut sub = hub.subscribe();
//! hub.broadcast(GameEvent::NewTask(TaskRecord::new("Dishes", "guild-1")));
//! assert_eq!(sub.drain().len(), 1);
//! ```

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::game::types::{CompletionRecord, GuildRecord, PublicUser, QuestRecord, TaskRecord};
use crate::metrics;

/// Domain events pushed to observers. Serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GameEvent {
    TaskCompleted {
        completion: CompletionRecord,
        user: PublicUser,
    },
    LevelUp {
        user: PublicUser,
        previous_level: u32,
        level: u32,
    },
    QuestProgress(QuestRecord),
    NewTask(TaskRecord),
    GuildJoined {
        guild: GuildRecord,
        user: PublicUser,
    },
    GuildLeft {
        guild: GuildRecord,
        user: PublicUser,
    },
}

impl GameEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            GameEvent::TaskCompleted { .. } => "TASK_COMPLETED",
            GameEvent::LevelUp { .. } => "LEVEL_UP",
            GameEvent::QuestProgress(_) => "QUEST_PROGRESS",
            GameEvent::NewTask(_) => "NEW_TASK",
            GameEvent::GuildJoined { .. } => "GUILD_JOINED",
            GameEvent::GuildLeft { .. } => "GUILD_LEFT",
        }
    }

    /// Wire form sent to observers.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving half handed to an observer.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriberId,
    receiver: mpsc::UnboundedReceiver<GameEvent>,
}

impl Subscription {
    /// Wait for the next event; `None` once the subscriber was removed.
    pub async fn recv(&mut self) -> Option<GameEvent> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<GameEvent> {
        self.receiver.try_recv().ok()
    }

    /// Take every event queued so far without waiting.
    pub fn drain(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Injected broadcast seam used by the coordinators.
pub trait NotificationChannel: Send + Sync {
    fn subscribe(&self) -> Subscription;

    /// Returns false when `id` was not subscribed.
    fn unsubscribe(&self, id: SubscriberId) -> bool;

    /// Deliver `event` to all current subscribers; returns how many accepted it.
    fn broadcast(&self, event: GameEvent) -> usize;
}

/// In-process hub: one unbounded queue per subscriber.
#[derive(Debug, Default)]
pub struct NotificationHub {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<SubscriberId, mpsc::UnboundedSender<GameEvent>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .len()
    }
}

impl NotificationChannel for NotificationHub {
    fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .insert(id, tx);
        debug!("Subscriber {} connected", id);
        Subscription { id, receiver: rx }
    }

    fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self
            .subscribers
            .lock()
            .expect("subscriber registry poisoned")
            .remove(&id)
            .is_some();
        if removed {
            debug!("Subscriber {} disconnected", id);
        }
        removed
    }

    fn broadcast(&self, event: GameEvent) -> usize {
        let mut guard = self
            .subscribers
            .lock()
            .expect("subscriber registry poisoned");
        let mut delivered = 0usize;
        let mut closed = Vec::new();
        for (id, tx) in guard.iter() {
            if tx.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                closed.push(*id);
            }
        }
        for id in &closed {
            guard.remove(id);
            warn!(
                "Dropped {} for closed subscriber {} (pruned)",
                event.event_type(),
                id
            );
        }
        metrics::record_event_delivery(delivered as u64, closed.len() as u64);
        debug!("Broadcast {} to {} subscriber(s)", event.event_type(), delivered);
        delivered
    }
}
