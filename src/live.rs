// src/live.rs

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

use crate::models::{live::LiveEvent, score::ScoreRecord};

pub type ObserverId = u64;

/// Registry of connected live observers.
///
/// Each observer is an unbounded channel drained by its WebSocket task.
/// Observers are removed explicitly on disconnect; handles whose receiver is
/// gone are also pruned during broadcast.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: DashMap<ObserverId, UnboundedSender<String>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self) -> (ObserverId, UnboundedReceiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.insert(id, tx);
        debug!("Observer {} connected ({} total)", id, self.observers.len());
        (id, rx)
    }

    pub fn unregister(&self, id: ObserverId) {
        if self.observers.remove(&id).is_some() {
            debug!("Observer {} disconnected ({} left)", id, self.observers.len());
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn publish_new_score(&self, record: &ScoreRecord) -> usize {
        self.broadcast(&LiveEvent::NewScore(record.clone()))
    }

    pub fn publish_cleared(&self) -> usize {
        self.broadcast(&LiveEvent::ClearScores)
    }

    /// Sends the event to every open observer and returns how many received it.
    /// A failed send only drops that observer.
    pub fn broadcast(&self, event: &LiveEvent) -> usize {
        let message = match serde_json::to_string(event) {
            Ok(message) => message,
            Err(e) => {
                warn!("Failed to serialize live event: {}", e);
                return 0;
            }
        };

        let mut delivered = 0;
        let mut dead = Vec::new();
        for entry in self.observers.iter() {
            if entry.value().send(message.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*entry.key());
            }
        }

        // Removal happens after iteration; DashMap shards are still read-locked inside it.
        for id in dead {
            debug!("Pruning closed observer {}", id);
            self.observers.remove(&id);
        }

        delivered
    }
}
