use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{BookingStatus, Error, PaymentStatus, Result};

/// A half-open wall-clock range `[start, end)` on a single day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Result<Self> {
        if start >= end {
            return Err(Error::Validation(format!(
                "start time {start} must be before end time {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Slots that only touch at an endpoint do not overlap.
    pub fn overlaps(&self, other: &TimeSlot) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whole hours between the hour components; minutes are ignored.
    pub fn billable_hours(&self) -> u32 {
        self.end.hour().saturating_sub(self.start.hour())
    }

    pub fn price(&self, hourly_price: f64) -> f64 {
        hourly_price * f64::from(self.billable_hours())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VenueBooking {
    pub id: Uuid,
    pub venue_id: Uuid,
    pub user_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl VenueBooking {
    pub fn slot(&self) -> TimeSlot {
        TimeSlot { start: self.start_time, end: self.end_time }
    }

    /// Whether this booking keeps `slot` on `date` from being booked again.
    pub fn blocks(&self, date: NaiveDate, slot: &TimeSlot) -> bool {
        self.status != BookingStatus::Cancelled
            && self.booking_date == date
            && self.slot().overlaps(slot)
    }
}

/// What a user asks for when booking a venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub venue_id: Uuid,
    pub booking_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn slot(&self) -> Result<TimeSlot> {
        TimeSlot::new(self.start_time, self.end_time)
    }
}

/// A validated, priced booking ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewBooking {
    pub venue_id: Uuid,
    pub user_id: Uuid,
    pub booking_date: NaiveDate,
    pub slot: TimeSlot,
    pub total_price: f64,
    pub notes: Option<String>,
}

impl NewBooking {
    pub fn into_booking(self, id: Uuid, created_at: DateTime<Utc>) -> VenueBooking {
        VenueBooking {
            id,
            venue_id: self.venue_id,
            user_id: self.user_id,
            booking_date: self.booking_date,
            start_time: self.slot.start,
            end_time: self.slot.end,
            total_price: self.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            notes: self.notes,
            created_at,
        }
    }
}

/// A booking with the venue fields a listing page shows next to it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BookingWithVenue {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub booking: VenueBooking,
    pub venue_name: String,
    pub venue_location: String,
    pub venue_sport: String,
    #[sqlx(json)]
    pub venue_images: Vec<String>,
}
