mod booking;
mod equipment;
mod error;
mod notification;
mod progress;
mod rental;
mod status;
mod tutorial;
mod venue;

pub use booking::{BookingRequest, BookingWithVenue, NewBooking, TimeSlot, VenueBooking};
pub use equipment::{rental_days, Equipment, EquipmentFilter, NewEquipment};
pub use error::{Error, Result};
pub use notification::{NewNotification, Notification};
pub use progress::{ProgressStatus, UserTutorialProgress};
pub use rental::{NewRental, RentalRequest, RentalWithEquipment, EquipmentRental};
pub use status::{check_payable, BookingStatus, PaymentStatus, PaymentUpdate};
pub use tutorial::{Difficulty, NewLesson, NewTutorial, Tutorial, TutorialFilter, TutorialLesson};
pub use venue::{NewVenue, Venue, VenueFilter};

/// Case-insensitive substring match used by the list filters.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

pub(crate) fn check_price(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(format!("{field} must be a non-negative number")));
    }
    Ok(())
}

pub(crate) fn check_not_blank(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}
