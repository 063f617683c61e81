use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use sportnexus_models::{
    BookingStatus, BookingWithVenue, Equipment, EquipmentFilter, EquipmentRental, Error,
    NewBooking, NewEquipment, NewLesson, NewNotification, NewRental, NewTutorial, NewVenue,
    Notification, PaymentUpdate, RentalWithEquipment, Result, Tutorial, TutorialFilter,
    TutorialLesson, UserTutorialProgress, Venue, VenueBooking, VenueFilter,
};
use tracing::warn;
use uuid::Uuid;

use crate::Store;

/// Reads from `primary`, and answers from `fallback` (normally the demo
/// dataset) only when the primary backend is unreachable. Writes never fall
/// back: a booking taken against demo data would be lost.
pub struct FallbackStore {
    primary: Arc<dyn Store>,
    fallback: Arc<dyn Store>,
}

impl FallbackStore {
    pub fn new(primary: Arc<dyn Store>, fallback: Arc<dyn Store>) -> Self {
        Self { primary, fallback }
    }
}

macro_rules! read_through {
    ($self:ident, $what:literal, $method:ident ( $($arg:expr),* )) => {
        match $self.primary.$method($($arg),*).await {
            Err(Error::BackendUnavailable(reason)) => {
                warn!("Primary store unavailable while reading {} ({reason}), serving demo data", $what);
                $self.fallback.$method($($arg),*).await
            }
            other => other,
        }
    };
}

#[async_trait]
impl Store for FallbackStore {
    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>> {
        read_through!(self, "venues", list_venues(filter))
    }

    async fn get_venue(&self, id: Uuid) -> Result<Venue> {
        read_through!(self, "venue", get_venue(id))
    }

    async fn create_venue(&self, owner_id: Uuid, venue: NewVenue) -> Result<Venue> {
        self.primary.create_venue(owner_id, venue).await
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<VenueBooking> {
        self.primary.create_booking(booking).await
    }

    async fn get_booking(&self, id: Uuid) -> Result<VenueBooking> {
        self.primary.get_booking(id).await
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithVenue>> {
        self.primary.list_bookings_for_user(user_id).await
    }

    async fn list_bookings_for_venue(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<VenueBooking>> {
        read_through!(self, "venue calendar", list_bookings_for_venue(venue_id, date))
    }

    async fn update_booking_status(&self, id: Uuid, status: BookingStatus) -> Result<VenueBooking> {
        self.primary.update_booking_status(id, status).await
    }

    async fn claim_booking_payment(&self, id: Uuid) -> Result<VenueBooking> {
        self.primary.claim_booking_payment(id).await
    }

    async fn update_booking_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<VenueBooking> {
        self.primary.update_booking_payment(id, payment).await
    }

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        read_through!(self, "equipment", list_equipment(filter))
    }

    async fn get_equipment(&self, id: Uuid) -> Result<Equipment> {
        read_through!(self, "equipment item", get_equipment(id))
    }

    async fn create_equipment(&self, owner_id: Uuid, equipment: NewEquipment) -> Result<Equipment> {
        self.primary.create_equipment(owner_id, equipment).await
    }

    async fn create_rental(&self, rental: NewRental) -> Result<EquipmentRental> {
        self.primary.create_rental(rental).await
    }

    async fn get_rental(&self, id: Uuid) -> Result<EquipmentRental> {
        self.primary.get_rental(id).await
    }

    async fn list_rentals_for_user(&self, user_id: Uuid) -> Result<Vec<RentalWithEquipment>> {
        self.primary.list_rentals_for_user(user_id).await
    }

    async fn update_rental_status(&self, id: Uuid, status: BookingStatus) -> Result<EquipmentRental> {
        self.primary.update_rental_status(id, status).await
    }

    async fn claim_rental_payment(&self, id: Uuid) -> Result<EquipmentRental> {
        self.primary.claim_rental_payment(id).await
    }

    async fn update_rental_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<EquipmentRental> {
        self.primary.update_rental_payment(id, payment).await
    }

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>> {
        read_through!(self, "tutorials", list_tutorials(filter))
    }

    async fn get_tutorial(&self, id: Uuid) -> Result<Tutorial> {
        read_through!(self, "tutorial", get_tutorial(id))
    }

    async fn create_tutorial(&self, tutorial: NewTutorial) -> Result<Tutorial> {
        self.primary.create_tutorial(tutorial).await
    }

    async fn list_lessons(&self, tutorial_id: Uuid) -> Result<Vec<TutorialLesson>> {
        read_through!(self, "lessons", list_lessons(tutorial_id))
    }

    async fn create_lesson(&self, tutorial_id: Uuid, lesson: NewLesson) -> Result<TutorialLesson> {
        self.primary.create_lesson(tutorial_id, lesson).await
    }

    async fn get_progress(&self, user_id: Uuid, tutorial_id: Uuid) -> Result<Option<UserTutorialProgress>> {
        self.primary.get_progress(user_id, tutorial_id).await
    }

    async fn save_progress(&self, progress: &UserTutorialProgress) -> Result<UserTutorialProgress> {
        self.primary.save_progress(progress).await
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        self.primary.list_notifications(user_id).await
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        self.primary.create_notification(notification).await
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        self.primary.mark_notification_read(user_id, id).await
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        self.primary.mark_all_notifications_read(user_id).await
    }
}
