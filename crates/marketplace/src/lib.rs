//! Application services over a [`Store`]: the booking conflict checker, the
//! rental inventory ledger, the tutorial progress tracker, the notification
//! feed and mocked payments.

use std::sync::Arc;

use sportnexus_db::{NotificationBus, Store};
use sportnexus_models::{Error, NewNotification, Result};
use tracing::warn;
use uuid::Uuid;

mod bookings;
mod catalogue;
mod notifications;
mod payments;
mod rentals;
mod tutorials;

pub use notifications::NotificationFeed;
pub use payments::{MockPaymentGateway, PaymentError, PaymentGateway, PaymentReceipt};
pub use tutorials::TutorialProgressTracker;

/// Who is making a request. Reads are open to anyone; every mutating
/// operation needs a signed-in user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Session {
    user_id: Option<Uuid>,
}

impl Session {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user(user_id: Uuid) -> Self {
        Self { user_id: Some(user_id) }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.user_id
    }

    pub fn require(&self) -> Result<Uuid> {
        self.user_id.ok_or(Error::LoginRequired)
    }
}

/// The service facade. `bus` must be the bus the store publishes on.
#[derive(Clone)]
pub struct Marketplace {
    store: Arc<dyn Store>,
    bus: NotificationBus,
    payments: Arc<dyn PaymentGateway>,
}

impl Marketplace {
    pub fn new(store: Arc<dyn Store>, bus: NotificationBus) -> Self {
        Self { store, bus, payments: Arc::new(MockPaymentGateway::default()) }
    }

    pub fn with_payment_gateway(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }

    pub fn store(&self) -> &dyn Store {
        &*self.store
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Records a notification for a domain event. The event itself already
    /// happened, so a failure here is logged rather than returned.
    async fn notify(&self, notification: NewNotification) {
        let user_id = notification.user_id;
        if let Err(e) = self.store.create_notification(notification).await {
            warn!("Could not record notification for user {user_id}: {e}");
        }
    }
}

/// Records owned by someone else are reported as missing.
fn ensure_owner(user_id: Uuid, owner_id: Uuid, entity: &'static str, id: Uuid) -> Result<()> {
    if user_id == owner_id { Ok(()) } else { Err(Error::not_found(entity, id)) }
}
