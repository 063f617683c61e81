#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime, Utc};
use sportnexus_db::{connect, migrate, open_in_memory, MemoryStore, NotificationBus, SqliteStore};
use sportnexus_marketplace::{Marketplace, Session};
use sportnexus_models::{BookingRequest, Equipment, NewEquipment, NewVenue, RentalRequest, Venue};
use uuid::Uuid;

pub fn memory_market() -> Marketplace {
    let bus = NotificationBus::new();
    Marketplace::new(Arc::new(MemoryStore::new(bus.clone())), bus)
}

pub async fn sqlite_market() -> Marketplace {
    let bus = NotificationBus::new();
    let store = open_in_memory(bus.clone()).await.unwrap();
    Marketplace::new(Arc::new(store), bus)
}

/// A SQLite database file under `dir`, on the default multi-connection pool.
pub async fn file_market(dir: &Path) -> Marketplace {
    let bus = NotificationBus::new();
    let pool = connect(&format!("sqlite://{}", dir.join("sportnexus.db").display())).await.unwrap();
    migrate(&pool).await.unwrap();
    Marketplace::new(Arc::new(SqliteStore::new(pool, bus.clone())), bus)
}

pub fn new_user() -> Session {
    Session::user(Uuid::new_v4())
}

pub fn in_days(days: u64) -> NaiveDate {
    Utc::now().date_naive() + Days::new(days)
}

pub fn at(hour: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
}

pub async fn venue(market: &Marketplace, owner: &Session, hourly_price: f64) -> Venue {
    let venue = NewVenue {
        name: "Centre Court".into(),
        location: "Old Town".into(),
        sport: "tennis".into(),
        hourly_price,
        ..Default::default()
    };
    market.create_venue(owner, venue).await.unwrap()
}

pub async fn equipment(market: &Marketplace, owner: &Session, quantity: i64) -> Equipment {
    let item = NewEquipment {
        name: "Racket".into(),
        category: "tennis".into(),
        daily_price: 10.0,
        weekly_price: 50.0,
        total_quantity: quantity,
        ..Default::default()
    };
    market.create_equipment(owner, item).await.unwrap()
}

pub fn booking(venue_id: Uuid, date: NaiveDate, start: u32, end: u32) -> BookingRequest {
    BookingRequest { venue_id, booking_date: date, start_time: at(start), end_time: at(end), notes: None }
}

pub fn rental(equipment_id: Uuid, start: NaiveDate, end: NaiveDate, quantity: i64) -> RentalRequest {
    RentalRequest { equipment_id, start_date: start, end_date: end, quantity, notes: None, quoted_price: None }
}
