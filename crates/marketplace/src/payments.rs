use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use sportnexus_models::{
    BookingStatus, EquipmentRental, Error, NewNotification, PaymentStatus, PaymentUpdate, Result,
    VenueBooking,
};
use thiserror::Error as ThisError;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Marketplace, Session};

/// Proof of a successful charge.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub id: String,
    pub reference: String,
    pub amount: f64,
}

#[derive(Debug, ThisError)]
pub enum PaymentError {
    #[error("card declined for {reference}")]
    Declined { reference: String },
}

impl From<PaymentError> for Error {
    fn from(err: PaymentError) -> Self {
        Error::PaymentDeclined(err.to_string())
    }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn charge(&self, reference: &str, amount: f64) -> Result<PaymentReceipt, PaymentError>;
}

/// Approves every charge unless switched to declining.
#[derive(Debug, Default)]
pub struct MockPaymentGateway {
    decline: AtomicBool,
}

impl MockPaymentGateway {
    pub fn declining() -> Self {
        Self { decline: AtomicBool::new(true) }
    }

    pub fn set_decline(&self, decline: bool) {
        self.decline.store(decline, Ordering::SeqCst);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn charge(&self, reference: &str, amount: f64) -> Result<PaymentReceipt, PaymentError> {
        if self.decline.load(Ordering::SeqCst) {
            return Err(PaymentError::Declined { reference: reference.to_string() });
        }
        Ok(PaymentReceipt {
            id: format!("pay_{}", Uuid::new_v4().simple()),
            reference: reference.to_string(),
            amount,
        })
    }
}

impl Marketplace {
    /// Charges the booking's total. The payment is claimed before the
    /// gateway is called, so concurrent payers cannot charge twice. Success
    /// marks it paid and confirms a pending booking; a decline marks the
    /// payment failed.
    pub async fn pay_for_booking(&self, session: &Session, booking_id: Uuid) -> Result<VenueBooking> {
        let user_id = session.require()?;
        let booking = self.store.get_booking(booking_id).await?;
        crate::ensure_owner(user_id, booking.user_id, "booking", booking_id)?;
        let booking = self.store.claim_booking_payment(booking_id).await?;

        let reference = format!("booking:{booking_id}");
        let receipt = match self.payments.charge(&reference, booking.total_price).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("Payment for booking {booking_id} declined");
                let failed = PaymentUpdate { payment_status: PaymentStatus::Failed, payment_id: None };
                self.store.update_booking_payment(booking_id, failed).await?;
                return Err(e.into());
            }
        };

        let paid = PaymentUpdate { payment_status: PaymentStatus::Paid, payment_id: Some(receipt.id.clone()) };
        let mut booking = self.store.update_booking_payment(booking_id, paid).await?;
        info!("Booking {booking_id} paid {:.2} ({})", receipt.amount, receipt.id);

        if booking.status == BookingStatus::Pending {
            booking = self.store.update_booking_status(booking_id, BookingStatus::Confirmed).await?;
            self.notify_booking_status(&booking).await;
        }
        self.notify_payment(booking.user_id, "booking", booking_id, &receipt).await;
        Ok(booking)
    }

    /// Same as [`Marketplace::pay_for_booking`], for a rental.
    pub async fn pay_for_rental(&self, session: &Session, rental_id: Uuid) -> Result<EquipmentRental> {
        let user_id = session.require()?;
        let rental = self.store.get_rental(rental_id).await?;
        crate::ensure_owner(user_id, rental.user_id, "rental", rental_id)?;
        let rental = self.store.claim_rental_payment(rental_id).await?;

        let reference = format!("rental:{rental_id}");
        let receipt = match self.payments.charge(&reference, rental.total_price).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("Payment for rental {rental_id} declined");
                let failed = PaymentUpdate { payment_status: PaymentStatus::Failed, payment_id: None };
                self.store.update_rental_payment(rental_id, failed).await?;
                return Err(e.into());
            }
        };

        let paid = PaymentUpdate { payment_status: PaymentStatus::Paid, payment_id: Some(receipt.id.clone()) };
        let mut rental = self.store.update_rental_payment(rental_id, paid).await?;
        info!("Rental {rental_id} paid {:.2} ({})", receipt.amount, receipt.id);

        if rental.status == BookingStatus::Pending {
            rental = self.store.update_rental_status(rental_id, BookingStatus::Confirmed).await?;
            self.notify_rental_status(&rental).await;
        }
        self.notify_payment(rental.user_id, "rental", rental_id, &receipt).await;
        Ok(rental)
    }

    async fn notify_payment(&self, user_id: Uuid, entity_type: &str, entity_id: Uuid, receipt: &PaymentReceipt) {
        self.notify(NewNotification::about(
            user_id,
            "payment",
            entity_type,
            entity_id,
            "Payment received",
            format!("We received your payment of {:.2} ({}).", receipt.amount, receipt.id),
        ))
        .await;
    }
}
