//! Live subscriber set with best-effort fan-out.

use log::{debug, error};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::events::GestureEvent;

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("subscriber disconnected")]
    Disconnected,
    #[error("subscriber backlog full")]
    Backlogged,
}

/// One open connection to a client.
pub trait Subscriber {
    fn send(&mut self, payload: &str) -> Result<(), DeliveryError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishReport {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct HubStats {
    pub subscribers: usize,
    pub published: u64,
    pub pruned: u64,
}

pub struct BroadcastHub<S> {
    next_id: u64,
    subscribers: HashMap<SubscriberId, S>,
    published: u64,
    pruned: u64,
}

impl<S> Default for BroadcastHub<S> {
    fn default() -> Self {
        Self {
            next_id: 0,
            subscribers: HashMap::new(),
            published: 0,
            pruned: 0,
        }
    }
}

impl<S: Subscriber> BroadcastHub<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, sub: S) -> SubscriberId {
        self.next_id += 1;
        let id = SubscriberId(self.next_id);
        self.subscribers.insert(id, sub);
        id
    }

    /// Removing an unknown id is a no-op.
    pub fn unregister(&mut self, id: SubscriberId) -> bool {
        self.subscribers.remove(&id).is_some()
    }

    #[cfg(test)]
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    pub fn stats(&self) -> HubStats {
        HubStats {
            subscribers: self.subscribers.len(),
            published: self.published,
            pruned: self.pruned,
        }
    }

    pub fn publish(&mut self, event: &GestureEvent) -> PublishReport {
        match event.to_json() {
            Ok(payload) => self.publish_raw(&payload),
            Err(e) => {
                error!("failed to encode event: {e}");
                PublishReport::default()
            }
        }
    }

    /// Sends `payload` to every subscriber. Subscribers whose send fails are
    /// dropped once the pass is over.
    pub fn publish_raw(&mut self, payload: &str) -> PublishReport {
        self.published += 1;
        let mut report = PublishReport::default();
        let mut dead = Vec::new();

        for (id, sub) in self.subscribers.iter_mut() {
            match sub.send(payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    debug!("subscriber {id}: {e}");
                    dead.push(*id);
                }
            }
        }

        for id in dead {
            self.subscribers.remove(&id);
            report.pruned += 1;
        }
        self.pruned += report.pruned as u64;
        report
    }
}

pub type SharedHub<S> = Arc<Mutex<BroadcastHub<S>>>;

pub fn lock<S>(hub: &SharedHub<S>) -> MutexGuard<'_, BroadcastHub<S>> {
    // every critical section is non-blocking, a poisoned lock still holds a
    // consistent set
    hub.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
