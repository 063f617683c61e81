use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sportnexus_db::{Store, Subscription};
use sportnexus_models::{Notification, Result};
use uuid::Uuid;

use crate::{Marketplace, Session};

#[derive(Default)]
struct FeedState {
    items: Vec<Notification>,
    unread: usize,
}

/// A live, newest-first view of one user's notifications with an unread
/// counter. Dropping the feed ends its subscription.
pub struct NotificationFeed {
    store: Arc<dyn Store>,
    user_id: Uuid,
    state: Arc<Mutex<FeedState>>,
    _subscription: Subscription,
}

fn lock(state: &Mutex<FeedState>) -> MutexGuard<'_, FeedState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Marketplace {
    pub async fn list_notifications(&self, session: &Session) -> Result<Vec<Notification>> {
        let user_id = session.require()?;
        self.store.list_notifications(user_id).await
    }

    pub async fn mark_notification_read(&self, session: &Session, id: Uuid) -> Result<Notification> {
        let user_id = session.require()?;
        self.store.mark_notification_read(user_id, id).await
    }

    pub async fn mark_all_notifications_read(&self, session: &Session) -> Result<u64> {
        let user_id = session.require()?;
        self.store.mark_all_notifications_read(user_id).await
    }

    /// Loads the stored notifications, then follows new ones as they are inserted.
    pub async fn notification_feed(&self, session: &Session) -> Result<NotificationFeed> {
        let user_id = session.require()?;
        let state = Arc::new(Mutex::new(FeedState::default()));

        // Subscribe before loading so nothing inserted in between is missed.
        let sink = Arc::clone(&state);
        let subscription = self.bus.subscribe(user_id, move |notification| {
            let mut state = lock(&sink);
            if state.items.iter().any(|n| n.id == notification.id) {
                return;
            }
            if !notification.is_read {
                state.unread += 1;
            }
            state.items.insert(0, notification.clone());
        });

        let stored = self.store.list_notifications(user_id).await?;
        {
            let mut state = lock(&state);
            for notification in stored {
                if state.items.iter().any(|n| n.id == notification.id) {
                    continue;
                }
                if !notification.is_read {
                    state.unread += 1;
                }
                state.items.push(notification);
            }
        }

        Ok(NotificationFeed { store: Arc::clone(&self.store), user_id, state, _subscription: subscription })
    }
}

impl NotificationFeed {
    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.state).items.clone()
    }

    pub fn unread_count(&self) -> usize {
        lock(&self.state).unread
    }

    /// Fails with `Error::NotFound` for another user's notification.
    pub async fn mark_read(&self, id: Uuid) -> Result<()> {
        self.store.mark_notification_read(self.user_id, id).await?;
        let mut state = lock(&self.state);
        let was_unread = match state.items.iter_mut().find(|n| n.id == id) {
            Some(item) => !std::mem::replace(&mut item.is_read, true),
            None => false,
        };
        if was_unread {
            state.unread = state.unread.saturating_sub(1);
        }
        Ok(())
    }

    /// Safe to repeat: the counter simply stays at zero.
    pub async fn mark_all_read(&self) -> Result<u64> {
        let changed = self.store.mark_all_notifications_read(self.user_id).await?;
        let mut state = lock(&self.state);
        for item in &mut state.items {
            item.is_read = true;
        }
        state.unread = 0;
        Ok(changed)
    }
}
