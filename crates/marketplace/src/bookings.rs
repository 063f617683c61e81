use chrono::{NaiveDate, Utc};
use sportnexus_models::{
    BookingRequest, BookingStatus, BookingWithVenue, Error, NewBooking, NewNotification, Result,
    TimeSlot, VenueBooking,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Marketplace, Session};

impl Marketplace {
    /// Validates and prices `request`, then inserts it unless it overlaps a
    /// live booking of the same venue and day.
    pub async fn check_and_create_booking(
        &self,
        session: &Session,
        request: BookingRequest,
    ) -> Result<VenueBooking> {
        let user_id = session.require()?;
        let slot = request.slot()?;
        let today = Utc::now().date_naive();
        if request.booking_date < today {
            return Err(Error::Validation(format!(
                "booking date {} is in the past",
                request.booking_date
            )));
        }

        let venue = self.store.get_venue(request.venue_id).await?;
        let booking = NewBooking {
            venue_id: venue.id,
            user_id,
            booking_date: request.booking_date,
            slot,
            total_price: slot.price(venue.hourly_price),
            notes: request.notes,
        };

        match self.store.create_booking(booking).await {
            Ok(booking) => {
                info!(
                    "Booking {} accepted: {} {} {}-{} for {:.2}",
                    booking.id, venue.name, booking.booking_date, booking.start_time, booking.end_time,
                    booking.total_price
                );
                Ok(booking)
            }
            Err(e) => {
                warn!("Booking of {} on {} rejected: {e}", venue.name, request.booking_date);
                Err(e)
            }
        }
    }

    pub async fn list_my_bookings(&self, session: &Session) -> Result<Vec<BookingWithVenue>> {
        let user_id = session.require()?;
        self.store.list_bookings_for_user(user_id).await
    }

    /// The booker and the venue owner may move a booking through its lifecycle.
    pub async fn update_booking_status(
        &self,
        session: &Session,
        booking_id: Uuid,
        status: BookingStatus,
    ) -> Result<VenueBooking> {
        let user_id = session.require()?;
        let booking = self.store.get_booking(booking_id).await?;
        if booking.user_id != user_id {
            let venue = self.store.get_venue(booking.venue_id).await?;
            crate::ensure_owner(user_id, venue.owner_id, "booking", booking_id)?;
        }

        let previous = booking.status;
        let updated = self.store.update_booking_status(booking_id, status).await?;
        if previous != updated.status {
            info!("Booking {booking_id}: {previous} -> {}", updated.status);
            self.notify_booking_status(&updated).await;
        }
        Ok(updated)
    }

    pub async fn cancel_booking(&self, session: &Session, booking_id: Uuid) -> Result<VenueBooking> {
        self.update_booking_status(session, booking_id, BookingStatus::Cancelled).await
    }

    /// Occupied slots of a venue on `date`, ordered by start time.
    pub async fn venue_availability(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<TimeSlot>> {
        self.store.get_venue(venue_id).await?;
        let bookings = self.store.list_bookings_for_venue(venue_id, date).await?;
        Ok(bookings
            .iter()
            .filter(|b| b.status != BookingStatus::Cancelled)
            .map(VenueBooking::slot)
            .collect())
    }

    pub(crate) async fn notify_booking_status(&self, booking: &VenueBooking) {
        let (title, verb) = match booking.status {
            BookingStatus::Confirmed => ("Booking confirmed", "is confirmed"),
            BookingStatus::Cancelled => ("Booking cancelled", "was cancelled"),
            _ => return,
        };
        let message = format!(
            "Your booking on {} from {} to {} {verb}.",
            booking.booking_date, booking.start_time, booking.end_time
        );
        self.notify(NewNotification::about(
            booking.user_id,
            "booking_status",
            "booking",
            booking.id,
            title,
            message,
        ))
        .await;
    }
}
