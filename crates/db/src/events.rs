//! In-process change stream for notification inserts.
//!
//! A bus is an ordinary value: create one per store (or per test) and hand
//! clones to whoever needs to publish or subscribe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use sportnexus_models::Notification;
use tracing::debug;
use uuid::Uuid;

type Callback = Arc<dyn Fn(&Notification) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<Uuid, Vec<(u64, Callback)>>>,
}

impl Registry {
    fn subscribers(&self) -> MutexGuard<'_, HashMap<Uuid, Vec<(u64, Callback)>>> {
        self.subscribers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn remove(&self, user_id: Uuid, id: u64) {
        let mut subscribers = self.subscribers();
        if let Some(list) = subscribers.get_mut(&user_id) {
            list.retain(|(sub_id, _)| *sub_id != id);
            if list.is_empty() {
                subscribers.remove(&user_id);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct NotificationBus {
    registry: Arc<Registry>,
}

impl NotificationBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for every notification inserted for `user_id`.
    pub fn subscribe<F>(&self, user_id: Uuid, callback: F) -> Subscription
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .subscribers()
            .entry(user_id)
            .or_default()
            .push((id, Arc::new(callback)));
        debug!("Subscription {id} registered for user {user_id}");
        Subscription { registry: Arc::downgrade(&self.registry), user_id, id }
    }

    /// Delivers `notification` to its user's subscribers in registration
    /// order and returns how many were called.
    pub fn publish(&self, notification: &Notification) -> usize {
        // Callbacks run outside the lock so they may subscribe or unsubscribe.
        let callbacks: Vec<Callback> = self
            .registry
            .subscribers()
            .get(&notification.user_id)
            .map(|list| list.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in &callbacks {
            callback(notification);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, user_id: Uuid) -> usize {
        self.registry.subscribers().get(&user_id).map_or(0, Vec::len)
    }
}

/// Handle returned by [`NotificationBus::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes it immediately"]
pub struct Subscription {
    registry: Weak<Registry>,
    user_id: Uuid,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.user_id, self.id);
        }
    }
}
