use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sportnexus_models::{
    check_payable, BookingStatus, BookingWithVenue, Equipment, EquipmentFilter, EquipmentRental, Error,
    NewBooking, NewEquipment, NewLesson, NewNotification, NewRental, NewTutorial, NewVenue,
    Notification, PaymentUpdate, RentalWithEquipment, Result, Tutorial, TutorialFilter,
    TutorialLesson, UserTutorialProgress, Venue, VenueBooking, VenueFilter,
};
use sqlx::types::Json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{NotificationBus, Store};

const VENUE_COLUMNS: &str = "id, owner_id, name, description, location, address, amenities, \
    images, hourly_price, half_day_price, full_day_price, sport, capacity, created_at";

const BOOKING_COLUMNS: &str = "id, venue_id, user_id, booking_date, start_time, end_time, \
    total_price, status, payment_status, payment_id, notes, created_at";

const EQUIPMENT_COLUMNS: &str = "id, owner_id, name, description, category, brand, images, \
    daily_price, weekly_price, monthly_price, total_quantity, available_quantity, created_at";

const RENTAL_COLUMNS: &str = "id, equipment_id, user_id, start_date, end_date, quantity, \
    total_price, status, payment_status, payment_id, notes, created_at";

const TUTORIAL_COLUMNS: &str = "id, title, description, sport, difficulty, instructor_id, \
    media_urls, duration_minutes, is_premium, created_at";

const LESSON_COLUMNS: &str =
    "id, tutorial_id, title, description, media_url, duration_minutes, sequence_order";

const PROGRESS_COLUMNS: &str = "id, user_id, tutorial_id, current_lesson_id, progress, \
    completed_lessons, total_lessons, last_accessed, completion_date, certificate_issued";

const NOTIFICATION_COLUMNS: &str =
    "id, user_id, title, message, is_read, kind, entity_type, entity_id, created_at";

/// `"a, b"` with alias `x` becomes `"x.a, x.b"`.
fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// The persisted backend: SQLite through sqlx.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
    bus: NotificationBus,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, bus: NotificationBus) -> Self {
        Self { pool, bus }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}

#[async_trait]
impl Store for SqliteStore {
    // --- Venues ---

    async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {VENUE_COLUMNS} FROM venues WHERE 1 = 1"));
        if let Some(sport) = &filter.sport {
            qb.push(" AND lower(sport) = lower(").push_bind(sport.clone()).push(")");
        }
        if let Some(term) = &filter.search {
            qb.push(" AND (instr(lower(name), lower(")
                .push_bind(term.clone())
                .push(")) > 0 OR instr(lower(description), lower(")
                .push_bind(term.clone())
                .push(")) > 0 OR instr(lower(location), lower(")
                .push_bind(term.clone())
                .push(")) > 0)");
        }
        if let Some(max) = filter.max_hourly_price {
            qb.push(" AND hourly_price <= ").push_bind(max);
        }
        qb.push(" ORDER BY name");
        Ok(qb.build_query_as::<Venue>().fetch_all(&self.pool).await?)
    }

    async fn get_venue(&self, id: Uuid) -> Result<Venue> {
        let sql = format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?");
        sqlx::query_as::<_, Venue>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("venue", id))
    }

    async fn create_venue(&self, owner_id: Uuid, venue: NewVenue) -> Result<Venue> {
        venue.validate()?;
        let venue = venue.into_venue(Uuid::new_v4(), owner_id, Utc::now());
        let sql = format!("INSERT INTO venues ({VENUE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(venue.id)
            .bind(venue.owner_id)
            .bind(&venue.name)
            .bind(&venue.description)
            .bind(&venue.location)
            .bind(&venue.address)
            .bind(Json(&venue.amenities))
            .bind(Json(&venue.images))
            .bind(venue.hourly_price)
            .bind(venue.half_day_price)
            .bind(venue.full_day_price)
            .bind(&venue.sport)
            .bind(venue.capacity)
            .bind(venue.created_at)
            .execute(&self.pool)
            .await?;
        info!("Venue {} created ({})", venue.id, venue.name);
        Ok(venue)
    }

    // --- Bookings ---

    async fn create_booking(&self, booking: NewBooking) -> Result<VenueBooking> {
        let booking = booking.into_booking(Uuid::new_v4(), Utc::now());

        // Venue check, overlap check and insert in one statement. A write as
        // the first statement takes the write lock up front, so concurrent
        // writers queue on the busy timeout instead of failing a lock upgrade.
        let sql = format!(
            "INSERT INTO venue_bookings ({BOOKING_COLUMNS}) \
             SELECT ?, ?, ?, ?, ?, ?, ?, ?, ?, NULL, ?, ? \
             WHERE EXISTS (SELECT 1 FROM venues WHERE id = ?) \
               AND NOT EXISTS ( \
                 SELECT 1 FROM venue_bookings \
                 WHERE venue_id = ? AND booking_date = ? AND status <> 'cancelled' \
                   AND start_time < ? AND ? < end_time)"
        );
        let inserted = sqlx::query(&sql)
            .bind(booking.id)
            .bind(booking.venue_id)
            .bind(booking.user_id)
            .bind(booking.booking_date)
            .bind(booking.start_time)
            .bind(booking.end_time)
            .bind(booking.total_price)
            .bind(booking.status.as_str())
            .bind(booking.payment_status.as_str())
            .bind(&booking.notes)
            .bind(booking.created_at)
            .bind(booking.venue_id)
            .bind(booking.venue_id)
            .bind(booking.booking_date)
            .bind(booking.end_time)
            .bind(booking.start_time)
            .execute(&self.pool)
            .await?;

        if inserted.rows_affected() == 0 {
            let venue_exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM venues WHERE id = ?")
                .bind(booking.venue_id)
                .fetch_optional(&self.pool)
                .await?;
            if venue_exists.is_none() {
                return Err(Error::not_found("venue", booking.venue_id));
            }
            return Err(Error::Conflict(format!(
                "slot unavailable: {}-{} on {} overlaps an existing booking",
                booking.start_time, booking.end_time, booking.booking_date
            )));
        }

        debug!("Booking {} inserted", booking.id);
        Ok(booking)
    }

    async fn get_booking(&self, id: Uuid) -> Result<VenueBooking> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM venue_bookings WHERE id = ?");
        sqlx::query_as::<_, VenueBooking>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("booking", id))
    }

    async fn list_bookings_for_user(&self, user_id: Uuid) -> Result<Vec<BookingWithVenue>> {
        let sql = format!(
            "SELECT {}, v.name AS venue_name, v.location AS venue_location, \
                    v.sport AS venue_sport, v.images AS venue_images \
             FROM venue_bookings b JOIN venues v ON v.id = b.venue_id \
             WHERE b.user_id = ? \
             ORDER BY b.booking_date DESC, b.start_time DESC",
            prefixed(BOOKING_COLUMNS, "b")
        );
        Ok(sqlx::query_as::<_, BookingWithVenue>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn list_bookings_for_venue(&self, venue_id: Uuid, date: NaiveDate) -> Result<Vec<VenueBooking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM venue_bookings \
             WHERE venue_id = ? AND booking_date = ? ORDER BY start_time"
        );
        Ok(sqlx::query_as::<_, VenueBooking>(&sql)
            .bind(venue_id)
            .bind(date)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_booking_status(&self, id: Uuid, status: BookingStatus) -> Result<VenueBooking> {
        let mut booking = self.get_booking(id).await?;
        booking.status.check_transition(status)?;
        if booking.status == status {
            return Ok(booking);
        }
        let updated = sqlx::query("UPDATE venue_bookings SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_str())
            .bind(id)
            .bind(booking.status.as_str())
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            // Lost the race; fine if the winner moved it to the same status.
            let current = self.get_booking(id).await?;
            if current.status == status {
                return Ok(current);
            }
            return Err(Error::Conflict(format!("booking {id} was changed concurrently")));
        }
        booking.status = status;
        Ok(booking)
    }

    async fn claim_booking_payment(&self, id: Uuid) -> Result<VenueBooking> {
        let claimed = sqlx::query(
            "UPDATE venue_bookings SET payment_status = 'processing' \
             WHERE id = ? AND status <> 'cancelled' AND payment_status NOT IN ('paid', 'processing')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        let booking = self.get_booking(id).await?;
        if claimed.rows_affected() == 0 {
            check_payable(booking.status, booking.payment_status, "booking")?;
            return Err(Error::Conflict(format!("booking {id} was changed concurrently")));
        }
        Ok(booking)
    }

    async fn update_booking_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<VenueBooking> {
        let updated = sqlx::query("UPDATE venue_bookings SET payment_status = ?, payment_id = ? WHERE id = ?")
            .bind(payment.payment_status.as_str())
            .bind(&payment.payment_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::not_found("booking", id));
        }
        self.get_booking(id).await
    }

    // --- Equipment ---

    async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE 1 = 1"));
        if let Some(category) = &filter.category {
            qb.push(" AND lower(category) = lower(").push_bind(category.clone()).push(")");
        }
        if let Some(term) = &filter.search {
            qb.push(" AND (instr(lower(name), lower(")
                .push_bind(term.clone())
                .push(")) > 0 OR instr(lower(description), lower(")
                .push_bind(term.clone())
                .push(")) > 0 OR instr(lower(coalesce(brand, '')), lower(")
                .push_bind(term.clone())
                .push(")) > 0)");
        }
        if let Some(max) = filter.max_daily_price {
            qb.push(" AND daily_price <= ").push_bind(max);
        }
        if filter.in_stock_only {
            qb.push(" AND available_quantity > 0");
        }
        qb.push(" ORDER BY name");
        Ok(qb.build_query_as::<Equipment>().fetch_all(&self.pool).await?)
    }

    async fn get_equipment(&self, id: Uuid) -> Result<Equipment> {
        let sql = format!("SELECT {EQUIPMENT_COLUMNS} FROM equipment WHERE id = ?");
        sqlx::query_as::<_, Equipment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("equipment", id))
    }

    async fn create_equipment(&self, owner_id: Uuid, equipment: NewEquipment) -> Result<Equipment> {
        equipment.validate()?;
        let item = equipment.into_equipment(Uuid::new_v4(), owner_id, Utc::now());
        let sql = format!("INSERT INTO equipment ({EQUIPMENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(item.id)
            .bind(item.owner_id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(&item.category)
            .bind(&item.brand)
            .bind(Json(&item.images))
            .bind(item.daily_price)
            .bind(item.weekly_price)
            .bind(item.monthly_price)
            .bind(item.total_quantity)
            .bind(item.available_quantity)
            .bind(item.created_at)
            .execute(&self.pool)
            .await?;
        info!("Equipment {} created ({} x{})", item.id, item.name, item.total_quantity);
        Ok(item)
    }

    // --- Rentals ---

    async fn create_rental(&self, rental: NewRental) -> Result<EquipmentRental> {
        let mut tx = self.pool.begin().await?;

        // Conditional decrement: succeeds only while enough units remain.
        let reserved = sqlx::query(
            "UPDATE equipment SET available_quantity = available_quantity - ? \
             WHERE id = ? AND available_quantity >= ?",
        )
        .bind(rental.quantity)
        .bind(rental.equipment_id)
        .bind(rental.quantity)
        .execute(&mut *tx)
        .await?;

        if reserved.rows_affected() == 0 {
            let available: Option<i64> =
                sqlx::query_scalar("SELECT available_quantity FROM equipment WHERE id = ?")
                    .bind(rental.equipment_id)
                    .fetch_optional(&mut *tx)
                    .await?;
            return Err(match available {
                None => Error::not_found("equipment", rental.equipment_id),
                Some(available) => Error::InsufficientStock { requested: rental.quantity, available },
            });
        }

        let rental = rental.into_rental(Uuid::new_v4(), Utc::now());
        let sql = format!("INSERT INTO equipment_rentals ({RENTAL_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(rental.id)
            .bind(rental.equipment_id)
            .bind(rental.user_id)
            .bind(rental.start_date)
            .bind(rental.end_date)
            .bind(rental.quantity)
            .bind(rental.total_price)
            .bind(rental.status.as_str())
            .bind(rental.payment_status.as_str())
            .bind(&rental.payment_id)
            .bind(&rental.notes)
            .bind(rental.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!("Rental {} inserted, {} unit(s) reserved", rental.id, rental.quantity);
        Ok(rental)
    }

    async fn get_rental(&self, id: Uuid) -> Result<EquipmentRental> {
        let sql = format!("SELECT {RENTAL_COLUMNS} FROM equipment_rentals WHERE id = ?");
        sqlx::query_as::<_, EquipmentRental>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("rental", id))
    }

    async fn list_rentals_for_user(&self, user_id: Uuid) -> Result<Vec<RentalWithEquipment>> {
        let sql = format!(
            "SELECT {}, e.name AS equipment_name, e.category AS equipment_category, \
                    e.images AS equipment_images \
             FROM equipment_rentals r JOIN equipment e ON e.id = r.equipment_id \
             WHERE r.user_id = ? \
             ORDER BY r.start_date DESC",
            prefixed(RENTAL_COLUMNS, "r")
        );
        Ok(sqlx::query_as::<_, RentalWithEquipment>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn update_rental_status(&self, id: Uuid, status: BookingStatus) -> Result<EquipmentRental> {
        let mut rental = self.get_rental(id).await?;
        rental.status.check_transition(status)?;
        if rental.status == status {
            return Ok(rental);
        }

        // The status CAS is the transaction's first statement, so the write
        // lock is taken before anything is read inside it.
        let mut tx = self.pool.begin().await?;
        let updated = sqlx::query("UPDATE equipment_rentals SET status = ? WHERE id = ? AND status = ?")
            .bind(status.as_str())
            .bind(id)
            .bind(rental.status.as_str())
            .execute(&mut *tx)
            .await?;
        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            let current = self.get_rental(id).await?;
            if current.status == status {
                return Ok(current);
            }
            return Err(Error::Conflict(format!("rental {id} was changed concurrently")));
        }

        if status.is_terminal() {
            sqlx::query(
                "UPDATE equipment \
                 SET available_quantity = MIN(total_quantity, available_quantity + ?) \
                 WHERE id = ?",
            )
            .bind(rental.quantity)
            .bind(rental.equipment_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        rental.status = status;
        Ok(rental)
    }

    async fn claim_rental_payment(&self, id: Uuid) -> Result<EquipmentRental> {
        let claimed = sqlx::query(
            "UPDATE equipment_rentals SET payment_status = 'processing' \
             WHERE id = ? AND status <> 'cancelled' AND payment_status NOT IN ('paid', 'processing')",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        let rental = self.get_rental(id).await?;
        if claimed.rows_affected() == 0 {
            check_payable(rental.status, rental.payment_status, "rental")?;
            return Err(Error::Conflict(format!("rental {id} was changed concurrently")));
        }
        Ok(rental)
    }

    async fn update_rental_payment(&self, id: Uuid, payment: PaymentUpdate) -> Result<EquipmentRental> {
        let updated = sqlx::query("UPDATE equipment_rentals SET payment_status = ?, payment_id = ? WHERE id = ?")
            .bind(payment.payment_status.as_str())
            .bind(&payment.payment_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::not_found("rental", id));
        }
        self.get_rental(id).await
    }

    // --- Tutorials ---

    async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>> {
        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {TUTORIAL_COLUMNS} FROM tutorials WHERE 1 = 1"));
        if let Some(sport) = &filter.sport {
            qb.push(" AND lower(sport) = lower(").push_bind(sport.clone()).push(")");
        }
        if let Some(difficulty) = filter.difficulty {
            qb.push(" AND difficulty = ").push_bind(difficulty.to_string());
        }
        if let Some(term) = &filter.search {
            qb.push(" AND (instr(lower(title), lower(")
                .push_bind(term.clone())
                .push(")) > 0 OR instr(lower(description), lower(")
                .push_bind(term.clone())
                .push(")) > 0)");
        }
        qb.push(" ORDER BY title");
        Ok(qb.build_query_as::<Tutorial>().fetch_all(&self.pool).await?)
    }

    async fn get_tutorial(&self, id: Uuid) -> Result<Tutorial> {
        let sql = format!("SELECT {TUTORIAL_COLUMNS} FROM tutorials WHERE id = ?");
        sqlx::query_as::<_, Tutorial>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("tutorial", id))
    }

    async fn create_tutorial(&self, tutorial: NewTutorial) -> Result<Tutorial> {
        tutorial.validate()?;
        let tutorial = tutorial.into_tutorial(Uuid::new_v4(), Utc::now());
        let sql = format!("INSERT INTO tutorials ({TUTORIAL_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(tutorial.id)
            .bind(&tutorial.title)
            .bind(&tutorial.description)
            .bind(&tutorial.sport)
            .bind(tutorial.difficulty.to_string())
            .bind(tutorial.instructor_id)
            .bind(Json(&tutorial.media_urls))
            .bind(tutorial.duration_minutes)
            .bind(tutorial.is_premium)
            .bind(tutorial.created_at)
            .execute(&self.pool)
            .await?;
        Ok(tutorial)
    }

    async fn list_lessons(&self, tutorial_id: Uuid) -> Result<Vec<TutorialLesson>> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM tutorial_lessons WHERE tutorial_id = ? ORDER BY sequence_order"
        );
        Ok(sqlx::query_as::<_, TutorialLesson>(&sql)
            .bind(tutorial_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_lesson(&self, tutorial_id: Uuid, lesson: NewLesson) -> Result<TutorialLesson> {
        lesson.validate()?;
        self.get_tutorial(tutorial_id).await?;
        let lesson = lesson.into_lesson(Uuid::new_v4(), tutorial_id);
        let sql = format!("INSERT INTO tutorial_lessons ({LESSON_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)");
        let result = sqlx::query(&sql)
            .bind(lesson.id)
            .bind(lesson.tutorial_id)
            .bind(&lesson.title)
            .bind(&lesson.description)
            .bind(&lesson.media_url)
            .bind(lesson.duration_minutes)
            .bind(lesson.sequence_order)
            .execute(&self.pool)
            .await;
        match result.map_err(Error::from) {
            Ok(_) => Ok(lesson),
            Err(Error::Conflict(_)) => Err(Error::Conflict(format!(
                "tutorial {tutorial_id} already has a lesson at position {}",
                lesson.sequence_order
            ))),
            Err(e) => Err(e),
        }
    }

    // --- Progress ---

    async fn get_progress(&self, user_id: Uuid, tutorial_id: Uuid) -> Result<Option<UserTutorialProgress>> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_tutorial_progress WHERE user_id = ? AND tutorial_id = ?"
        );
        Ok(sqlx::query_as::<_, UserTutorialProgress>(&sql)
            .bind(user_id)
            .bind(tutorial_id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_progress(&self, progress: &UserTutorialProgress) -> Result<UserTutorialProgress> {
        let sql = format!(
            "INSERT INTO user_tutorial_progress ({PROGRESS_COLUMNS}) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT DO UPDATE SET \
                 current_lesson_id = excluded.current_lesson_id, \
                 progress = CASE WHEN user_tutorial_progress.progress = 'completed' \
                                 THEN 'completed' ELSE excluded.progress END, \
                 completed_lessons = MAX(user_tutorial_progress.completed_lessons, excluded.completed_lessons), \
                 total_lessons = excluded.total_lessons, \
                 last_accessed = excluded.last_accessed, \
                 completion_date = COALESCE(user_tutorial_progress.completion_date, excluded.completion_date), \
                 certificate_issued = MAX(user_tutorial_progress.certificate_issued, excluded.certificate_issued)"
        );
        sqlx::query(&sql)
            .bind(progress.id)
            .bind(progress.user_id)
            .bind(progress.tutorial_id)
            .bind(progress.current_lesson_id)
            .bind(progress.progress.as_str())
            .bind(progress.completed_lessons)
            .bind(progress.total_lessons)
            .bind(progress.last_accessed)
            .bind(progress.completion_date)
            .bind(progress.certificate_issued)
            .execute(&self.pool)
            .await?;
        self.get_progress(progress.user_id, progress.tutorial_id)
            .await?
            .ok_or_else(|| Error::not_found("progress", progress.id))
    }

    // --- Notifications ---

    async fn list_notifications(&self, user_id: Uuid) -> Result<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = ? ORDER BY created_at DESC, rowid DESC"
        );
        Ok(sqlx::query_as::<_, Notification>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn create_notification(&self, notification: NewNotification) -> Result<Notification> {
        let notification = notification.into_notification(Uuid::new_v4(), Utc::now());
        let sql = format!("INSERT INTO notifications ({NOTIFICATION_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)");
        sqlx::query(&sql)
            .bind(notification.id)
            .bind(notification.user_id)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.is_read)
            .bind(&notification.kind)
            .bind(&notification.entity_type)
            .bind(notification.entity_id)
            .bind(notification.created_at)
            .execute(&self.pool)
            .await?;
        let delivered = self.bus.publish(&notification);
        debug!("Notification {} delivered to {delivered} subscriber(s)", notification.id);
        Ok(notification)
    }

    async fn mark_notification_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        let updated = sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if updated.rows_affected() == 0 {
            return Err(Error::not_found("notification", id));
        }
        let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?");
        Ok(sqlx::query_as::<_, Notification>(&sql).bind(id).fetch_one(&self.pool).await?)
    }

    async fn mark_all_notifications_read(&self, user_id: Uuid) -> Result<u64> {
        let updated = sqlx::query("UPDATE notifications SET is_read = 1 WHERE user_id = ? AND is_read = 0")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(updated.rows_affected())
    }
}
