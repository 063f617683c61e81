//! In-process substitute for the SQL backend.
//!
//! Everything lives behind one mutex, which is what makes the check-then-write
//! operations atomic here. No lock is ever held across an `.await`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sportnexus_models::{
    check_payable, BookingStatus, BookingWithVenue, Equipment, EquipmentFilter, EquipmentRental, Error,
    NewBooking, NewEquipment, NewLesson, NewNotification, NewRental, NewTutorial, NewVenue,
    Notification, PaymentStatus, PaymentUpdate, RentalWithEquipment, Result, Tutorial, TutorialFilter,
    TutorialLesson, UserTutorialProgress, Venue, VenueBooking, VenueFilter,
};
use tracing::debug;
use uuid::Uuid;

use crate::{NotificationBus, Store};

#[derive(Default)]
struct Tables {
    venues: HashMap<Uuid, Venue>,
    bookings: HashMap<Uuid, VenueBooking>,
    equipment: HashMap<Uuid, Equipment>,
    rentals: HashMap<Uuid, EquipmentRental>,
    tutorials: HashMap<Uuid, Tutorial>,
    lessons: HashMap<Uuid, TutorialLesson>,
    progress: HashMap<(Uuid, Uuid), UserTutorialProgress>,
    // Insertion order doubles as arrival order.
    notifications: Vec<Notification>,
}

pub struct MemoryStore {
    tables: Mutex<Tables>,
    bus: NotificationBus,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(bus: NotificationBus) -> Self {
        Self { tables: Mutex::new(Tables::default()), bus, offline: AtomicBool::new(false) }
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }

    /// Simulates an outage: while offline every call fails with
    /// `Error::BackendUnavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::BackendUnavailable("in-memory store is offline".into()));
        }
        Ok(self.tables.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

fn embed_venue(booking: &VenueBooking, venues: &HashMap<Uuid, Venue>) -> Option<BookingWithVenue> {
    let venue = venues.get(&booking.venue_id)?;
    Some(BookingWithVenue {
        booking: booking.clone(),
        venue_name: venue.name.clone(),
        venue_location: venue.location.clone(),
        venue_sport: venue.sport.clone(),
        venue_images: venue.images.clone(),
    })
}

fn embed_equipment(
    rental: &EquipmentRental,
    equipment: &HashMap<Uuid, Equipment>,
) -> Option<RentalWithEquipment> {
    let item = equipment.get(&rental.equipment_id)?;
    Some(RentalWithEquipment {
        rental: rental.clone(),
        equipment_name: item.name.clone(),
        equipment_category: item.category.clone(),
        equipment_images: item.images.clone(),
    })
}

#[async_trait]
impl Store for MemoryStore {
    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>> {
        let tables = self.tables()?;
        let mut venues: Vec<Venue> =
            tables.venues.values().filter(|v| filter.matches(v)).cloned().collect();
        venues.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(venues)
    }

    async fn get_venue(&self, id: Uuid) -> Result<Venue> {
        self.tables()?.venues.get(&id).cloned().ok_or_else(|| Error::not_found("venue", id))
    }

    async fn create_venue(&self, owner_id: Uuid, venue: NewVenue) -> Result<Venue> {
        venue.validate()?;
        let venue = venue.into_venue(Uuid::new_v4(), owner_id, Utc::now());
        self.tables()?.venues.insert(venue.id, venue.clone());
        Ok(venue)
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<VenueBooking> {
        let mut tables = self.tables()?;
        if !tables.venues.contains_key(&booking.venue_id) {
            return Err(Error::not_found("venue", booking.venue_id));
        }
        let clash = tables.bookings.values().find(|existing| {
            existing.venue_id == booking.venue_id
                && existing.blocks(booking.booking_date, &booking.slot)
        });
        if let Some(existing) = clash {
            return Err(Error::Conflict(format!(
                "slot unavailable: {}-{} on {} overlaps booking {}",
                booking.slot.start, booking.slot.end, booking.booking_date, existing.id
            )));
        }
        let booking = booking.into_booking(Uuid::new_v4(), Utc::now());
        tables.bookings.insert(booking.id, booking.clone());
        debug!("Booking {} stored in memory", booking.id);
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<VenueBooking> {
        self.tables()?.bookings.get(&id).cloned().ok_or_else(|| Error::not_found("booking", id))
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithVenue>> {
        let tables = self.tables()?;
        let mut bookings: Vec<BookingWithVenue> = tables
            .bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .filter_map(|b| embed_venue(b, &tables.venues))
            .collect();
        bookings.sort_by(|a, b| {
            (b.booking.booking_date, b.booking.start_time)
                .cmp(&(a.booking.booking_date, a.booking.start_time))
        });
        Ok(bookings)
    }

    async fn list_bookings_for_venue(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<VenueBooking>> {
        let tables = self.tables()?;
        let mut bookings: Vec<VenueBooking> = tables
            .bookings
            .values()
            .filter(|b| b.venue_id == venue_id && b.booking_date == date)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.start_time);
        Ok(bookings)
    }

    async fn update_booking_status(&self, id: Uuid, status: BookingStatus) -> Result<VenueBooking> {
        let mut tables = self.tables()?;
        let booking = tables.bookings.get_mut(&id).ok_or_else(|| Error::not_found("booking", id))?;
        booking.status.check_transition(status)?;
        booking.status = status;
        Ok(booking.clone())
    }

    async fn claim_booking_payment(&self, id: Uuid) -> Result<VenueBooking> {
        let mut tables = self.tables()?;
        let booking = tables.bookings.get_mut(&id).ok_or_else(|| Error::not_found("booking", id))?;
        check_payable(booking.status, booking.payment_status, "booking")?;
        booking.payment_status = PaymentStatus::Processing;
        Ok(booking.clone())
    }

    async fn update_booking_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<VenueBooking> {
        let mut tables = self.tables()?;
        let booking = tables.bookings.get_mut(&id).ok_or_else(|| Error::not_found("booking", id))?;
        booking.payment_status = payment.payment_status;
        booking.payment_id = payment.payment_id;
        Ok(booking.clone())
    }

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        let tables = self.tables()?;
        let mut items: Vec<Equipment> =
            tables.equipment.values().filter(|e| filter.matches(e)).cloned().collect();
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }

    async fn get_equipment(&self, id: Uuid) -> Result<Equipment> {
        self.tables()?.equipment.get(&id).cloned().ok_or_else(|| Error::not_found("equipment", id))
    }

    async fn create_equipment(&self, owner_id: Uuid, equipment: NewEquipment) -> Result<Equipment> {
        equipment.validate()?;
        let item = equipment.into_equipment(Uuid::new_v4(), owner_id, Utc::now());
        self.tables()?.equipment.insert(item.id, item.clone());
        Ok(item)
    }

    async fn create_rental(&self, rental: NewRental) -> Result<EquipmentRental> {
        let mut tables = self.tables()?;
        let item = tables
            .equipment
            .get_mut(&rental.equipment_id)
            .ok_or_else(|| Error::not_found("equipment", rental.equipment_id))?;
        if item.available_quantity < rental.quantity {
            return Err(Error::InsufficientStock {
                requested: rental.quantity,
                available: item.available_quantity,
            });
        }
        item.available_quantity -= rental.quantity;
        let rental = rental.into_rental(Uuid::new_v4(), Utc::now());
        tables.rentals.insert(rental.id, rental.clone());
        Ok(rental)
    }

    async fn get_rental(&self, id: Uuid) -> Result<EquipmentRental> {
        self.tables()?.rentals.get(&id).cloned().ok_or_else(|| Error::not_found("rental", id))
    }

    async fn list_rentals_for_user(&self, user_id: Uuid) -> Result<Vec<RentalWithEquipment>> {
        let tables = self.tables()?;
        let mut rentals: Vec<RentalWithEquipment> = tables
            .rentals
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| embed_equipment(r, &tables.equipment))
            .collect();
        rentals.sort_by(|a, b| b.rental.start_date.cmp(&a.rental.start_date));
        Ok(rentals)
    }

    async fn update_rental_status(&self, id: Uuid, status: BookingStatus) -> Result<EquipmentRental> {
        let mut guard = self.tables()?;
        let tables = &mut *guard;
        let rental = tables.rentals.get_mut(&id).ok_or_else(|| Error::not_found("rental", id))?;
        rental.status.check_transition(status)?;
        if rental.status == status {
            return Ok(rental.clone());
        }
        if status.is_terminal() {
            if let Some(item) = tables.equipment.get_mut(&rental.equipment_id) {
                item.available_quantity =
                    (item.available_quantity + rental.quantity).min(item.total_quantity);
            }
        }
        rental.status = status;
        Ok(rental.clone())
    }

    async fn claim_rental_payment(&self, id: Uuid) -> Result<EquipmentRental> {
        let mut tables = self.tables()?;
        let rental = tables.rentals.get_mut(&id).ok_or_else(|| Error::not_found("rental", id))?;
        check_payable(rental.status, rental.payment_status, "rental")?;
        rental.payment_status = PaymentStatus::Processing;
        Ok(rental.clone())
    }

    async fn update_rental_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<EquipmentRental> {
        let mut tables = self.tables()?;
        let rental = tables.rentals.get_mut(&id).ok_or_else(|| Error::not_found("rental", id))?;
        rental.payment_status = payment.payment_status;
        rental.payment_id = payment.payment_id;
        Ok(rental.clone())
    }

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>> {
        let tables = self.tables()?;
        let mut tutorials: Vec<Tutorial> =
            tables.tutorials.values().filter(|t| filter.matches(t)).cloned().collect();
        tutorials.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(tutorials)
    }

    async fn get_tutorial(&self, id: Uuid) -> Result<Tutorial> {
        self.tables()?.tutorials.get(&id).cloned().ok_or_else(|| Error::not_found("tutorial", id))
    }

    async fn create_tutorial(&self, tutorial: NewTutorial) -> Result<Tutorial> {
        tutorial.validate()?;
        let tutorial = tutorial.into_tutorial(Uuid::new_v4(), Utc::now());
        self.tables()?.tutorials.insert(tutorial.id, tutorial.clone());
        Ok(tutorial)
    }

    async fn list_lessons(&self, tutorial_id: Uuid) -> Result<Vec<TutorialLesson>> {
        let tables = self.tables()?;
        let mut lessons: Vec<TutorialLesson> = tables
            .lessons
            .values()
            .filter(|l| l.tutorial_id == tutorial_id)
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.sequence_order);
        Ok(lessons)
    }

    async fn create_lesson(&self, tutorial_id: Uuid, lesson: NewLesson) -> Result<TutorialLesson> {
        lesson.validate()?;
        let mut tables = self.tables()?;
        if !tables.tutorials.contains_key(&tutorial_id) {
            return Err(Error::not_found("tutorial", tutorial_id));
        }
        let taken = tables
            .lessons
            .values()
            .any(|l| l.tutorial_id == tutorial_id && l.sequence_order == lesson.sequence_order);
        if taken {
            return Err(Error::Conflict(format!(
                "tutorial {tutorial_id} already has a lesson at position {}",
                lesson.sequence_order
            )));
        }
        let lesson = lesson.into_lesson(Uuid::new_v4(), tutorial_id);
        tables.lessons.insert(lesson.id, lesson.clone());
        Ok(lesson)
    }

    async fn get_progress(&self, user_id: Uuid, tutorial_id: Uuid) -> Result<Option<UserTutorialProgress>> {
        Ok(self.tables()?.progress.get(&(user_id, tutorial_id)).cloned())
    }

    async fn save_progress(&self, progress: &UserTutorialProgress) -> Result<UserTutorialProgress> {
        let mut tables = self.tables()?;
        let saved = tables
            .progress
            .entry((progress.user_id, progress.tutorial_id))
            .and_modify(|stored| stored.absorb(progress))
            .or_insert_with(|| progress.clone());
        Ok(saved.clone())
    }

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let tables = self.tables()?;
        Ok(tables.notifications.iter().rev().filter(|n| n.user_id == user_id).cloned().collect())
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let notification = notification.into_notification(Uuid::new_v4(), Utc::now());
        self.tables()?.notifications.push(notification.clone());
        self.bus.publish(&notification);
        Ok(notification)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        let mut tables = self.tables()?;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
            .ok_or_else(|| Error::not_found("notification", id))?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        let mut tables = self.tables()?;
        let mut changed = 0;
        for n in tables.notifications.iter_mut().filter(|n| n.user_id == user_id && !n.is_read) {
            n.is_read = true;
            changed += 1;
        }
        Ok(changed)
    }
}
