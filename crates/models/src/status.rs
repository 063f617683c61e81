use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Lifecycle shared by venue bookings and equipment rentals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl BookingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Completed => "completed",
        }
    }

    /// Cancelled and completed reservations no longer hold a slot or stock.
    pub fn is_terminal(self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Completed)
    }

    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(self, next: BookingStatus) -> bool {
        if self == next {
            return true;
        }
        match self {
            BookingStatus::Pending => matches!(next, BookingStatus::Confirmed | BookingStatus::Cancelled),
            BookingStatus::Confirmed => next.is_terminal(),
            BookingStatus::Cancelled | BookingStatus::Completed => false,
        }
    }

    pub fn check_transition(self, next: BookingStatus) -> Result<(), Error> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(Error::Validation(format!("cannot move from {self} to {next}")))
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" | "canceled" => Ok(BookingStatus::Cancelled),
            "completed" => Ok(BookingStatus::Completed),
            other => Err(Error::Validation(format!("unknown status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    /// A charge is in flight; nobody else may start one.
    Processing,
    Paid,
    Refunded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Processing => "processing",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "processing" => Ok(PaymentStatus::Processing),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(Error::Validation(format!("unknown payment status '{other}'"))),
        }
    }
}

/// Whether a reservation may start a new charge. Stores run this under
/// their claim so only one caller moves a payment to `processing`.
pub fn check_payable(status: BookingStatus, payment: PaymentStatus, entity: &str) -> Result<(), Error> {
    if status == BookingStatus::Cancelled {
        return Err(Error::Validation(format!("cannot pay for a cancelled {entity}")));
    }
    match payment {
        PaymentStatus::Paid => Err(Error::Conflict(format!("{entity} is already paid"))),
        PaymentStatus::Processing => Err(Error::Conflict(format!("a payment for this {entity} is already in progress"))),
        PaymentStatus::Pending | PaymentStatus::Failed | PaymentStatus::Refunded => Ok(()),
    }
}

/// Payment fields are written independently of the reservation status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
}
