use async_trait::async_trait;
use chrono::NaiveDate;
use sportnexus_models::{
    BookingStatus, BookingWithVenue, Equipment, EquipmentFilter, EquipmentRental, NewBooking,
    NewEquipment, NewLesson, NewNotification, NewRental, NewTutorial, NewVenue, Notification,
    PaymentUpdate, RentalWithEquipment, Result, Tutorial, TutorialFilter, TutorialLesson,
    UserTutorialProgress, Venue, VenueBooking, VenueFilter,
};
use uuid::Uuid;

/// The data-access contract every backend implements.
///
/// Implementations must make `create_booking`, `create_rental` and
/// `update_rental_status` atomic: the availability check and the write it
/// guards either both happen or neither does, even under concurrent callers.
/// Every inserted notification is published on the store's notification bus.
#[async_trait]
pub trait Store: Send + Sync {
    // --- Venues ---

    /// Ordered by name.
    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>>;
    async fn get_venue(&self, id: Uuid) -> Result<Venue>;
    async fn create_venue(&self, owner_id: Uuid, venue: NewVenue) -> Result<Venue>;

    // --- Bookings ---

    /// Inserts a pending booking unless a non-cancelled booking for the same
    /// venue and date overlaps it, in which case nothing is written and
    /// `Error::Conflict` is returned.
    async fn create_booking(&self, booking: NewBooking) -> Result<VenueBooking>;
    async fn get_booking(&self, id: Uuid) -> Result<VenueBooking>;
    /// Newest booking date first.
    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithVenue>>;
    /// Every booking of a venue on a date, cancelled ones included, by start time.
    async fn list_bookings_for_venue(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<VenueBooking>>;
    async fn update_booking_status(&self, id: Uuid, status: BookingStatus) -> Result<VenueBooking>;
    /// Moves the payment to `processing` if the booking may be paid (see
    /// `check_payable`). Of several concurrent claims exactly one succeeds.
    async fn claim_booking_payment(&self, id: Uuid) -> Result<VenueBooking>;
    async fn update_booking_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<VenueBooking>;

    // --- Equipment ---

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>>;
    async fn get_equipment(&self, id: Uuid) -> Result<Equipment>;
    async fn create_equipment(&self, owner_id: Uuid, equipment: NewEquipment) -> Result<Equipment>;

    // --- Rentals ---

    /// Takes `quantity` units out of the equipment's availability and inserts
    /// the rental as one unit of work; `Error::InsufficientStock` otherwise.
    async fn create_rental(&self, rental: NewRental) -> Result<EquipmentRental>;
    async fn get_rental(&self, id: Uuid) -> Result<EquipmentRental>;
    async fn list_rentals_for_user(&self, user_id: Uuid) -> Result<Vec<RentalWithEquipment>>;
    /// Moving a rental into a terminal status gives its units back.
    async fn update_rental_status(&self, id: Uuid, status: BookingStatus) -> Result<EquipmentRental>;
    async fn claim_rental_payment(&self, id: Uuid) -> Result<EquipmentRental>;
    async fn update_rental_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<EquipmentRental>;

    // --- Tutorials ---

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>>;
    async fn get_tutorial(&self, id: Uuid) -> Result<Tutorial>;
    async fn create_tutorial(&self, tutorial: NewTutorial) -> Result<Tutorial>;
    /// Ordered by `sequence_order`.
    async fn list_lessons(&self, tutorial_id: Uuid) -> Result<Vec<TutorialLesson>>;
    async fn create_lesson(&self, tutorial_id: Uuid, lesson: NewLesson) -> Result<TutorialLesson>;

    // --- Progress ---

    async fn get_progress(&self, user_id: Uuid, tutorial_id: Uuid) -> Result<Option<UserTutorialProgress>>;
    /// Upserts on (user, tutorial). Completed lessons, completion state,
    /// completion date and certificate never regress.
    async fn save_progress(&self, progress: &UserTutorialProgress) -> Result<UserTutorialProgress>;

    // --- Notifications ---

    /// Newest first.
    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>>;
    async fn create_notification(&self, notification: NewNotification) -> Result<Notification>;
    /// `Error::NotFound` unless the notification belongs to `user_id`.
    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification>;
    /// Returns how many notifications changed; calling it again returns 0.
    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64>;
}
