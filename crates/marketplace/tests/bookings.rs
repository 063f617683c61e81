mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::*;
use sportnexus_marketplace::{
    Marketplace, MockPaymentGateway, PaymentError, PaymentGateway, PaymentReceipt, Session,
};
use sportnexus_models::{BookingStatus, Error, PaymentStatus, TimeSlot};

#[tokio::test]
async fn overlapping_requests_are_rejected_touching_ones_accepted() {
    let market = memory_market();
    let owner = new_user();
    let venue = venue(&market, &owner, 25.0).await;
    let player = new_user();
    let day = in_days(3);

    market.check_and_create_booking(&player, booking(venue.id, day, 10, 12)).await.unwrap();
    let clash = market.check_and_create_booking(&player, booking(venue.id, day, 11, 13)).await;
    assert!(matches!(clash, Err(Error::Conflict(_))));
    market.check_and_create_booking(&player, booking(venue.id, day, 12, 14)).await.unwrap();

    // Another day is a different calendar.
    market.check_and_create_booking(&player, booking(venue.id, in_days(4), 11, 13)).await.unwrap();
}

#[tokio::test]
async fn price_is_hourly_rate_times_whole_hours() {
    let market = memory_market();
    let venue = venue(&market, &new_user(), 25.0).await;
    let booked = market
        .check_and_create_booking(&new_user(), booking(venue.id, in_days(1), 10, 13))
        .await
        .unwrap();
    assert_eq!(booked.total_price, 75.0);
}

#[tokio::test]
async fn invalid_requests_never_reach_the_calendar() {
    let market = memory_market();
    let venue = venue(&market, &new_user(), 25.0).await;
    let player = new_user();

    let anonymous = market.check_and_create_booking(&Session::anonymous(), booking(venue.id, in_days(1), 9, 10)).await;
    assert!(matches!(anonymous, Err(Error::LoginRequired)));

    let backwards = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 12, 10)).await;
    assert!(matches!(backwards, Err(Error::Validation(_))));

    let empty = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 10, 10)).await;
    assert!(matches!(empty, Err(Error::Validation(_))));

    let yesterday = chrono::Utc::now().date_naive().pred_opt().unwrap();
    let past = market.check_and_create_booking(&player, booking(venue.id, yesterday, 9, 10)).await;
    assert!(matches!(past, Err(Error::Validation(_))));

    assert!(market.list_my_bookings(&player).await.unwrap().is_empty());
}

async fn book_cancel_rebook(market: Marketplace) {
    let venue = venue(&market, &new_user(), 30.0).await;
    let day = in_days(10);
    let first = new_user();
    let second = new_user();

    let booked = market.check_and_create_booking(&first, booking(venue.id, day, 14, 16)).await.unwrap();
    assert_eq!(booked.total_price, 60.0);
    assert_eq!(booked.status, BookingStatus::Pending);
    assert_eq!(booked.payment_status, PaymentStatus::Pending);

    let blocked = market.check_and_create_booking(&second, booking(venue.id, day, 14, 16)).await;
    assert!(matches!(blocked, Err(Error::Conflict(_))));

    let cancelled = market.cancel_booking(&first, booked.id).await.unwrap();
    assert_eq!(cancelled.status, BookingStatus::Cancelled);

    let rebooked = market.check_and_create_booking(&second, booking(venue.id, day, 14, 16)).await.unwrap();
    assert_eq!(rebooked.status, BookingStatus::Pending);

    let mine = market.list_my_bookings(&first).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].booking.status, BookingStatus::Cancelled);
    assert_eq!(mine[0].venue_name, "Centre Court");
}

#[tokio::test]
async fn book_cancel_rebook_in_memory() {
    book_cancel_rebook(memory_market()).await;
}

#[tokio::test]
async fn book_cancel_rebook_on_sqlite() {
    book_cancel_rebook(sqlite_market().await).await;
}

#[tokio::test]
async fn only_booker_or_venue_owner_may_change_status() {
    let market = memory_market();
    let owner = new_user();
    let venue = venue(&market, &owner, 20.0).await;
    let player = new_user();
    let booked = market.check_and_create_booking(&player, booking(venue.id, in_days(2), 8, 9)).await.unwrap();

    let stranger = market.cancel_booking(&new_user(), booked.id).await;
    assert!(matches!(stranger, Err(Error::NotFound { .. })));

    let confirmed = market.update_booking_status(&owner, booked.id, BookingStatus::Confirmed).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);

    let reopened = market.update_booking_status(&player, booked.id, BookingStatus::Pending).await;
    assert!(matches!(reopened, Err(Error::Validation(_))));

    let notes = market.list_notifications(&player).await.unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].title, "Booking confirmed");
    assert_eq!(notes[0].entity_id, Some(booked.id));
}

#[tokio::test]
async fn availability_lists_live_slots_in_order() {
    let market = memory_market();
    let venue = venue(&market, &new_user(), 20.0).await;
    let player = new_user();
    let day = in_days(5);

    market.check_and_create_booking(&player, booking(venue.id, day, 15, 16)).await.unwrap();
    let dropped = market.check_and_create_booking(&player, booking(venue.id, day, 9, 10)).await.unwrap();
    market.check_and_create_booking(&player, booking(venue.id, day, 11, 13)).await.unwrap();
    market.cancel_booking(&player, dropped.id).await.unwrap();

    let slots = market.venue_availability(venue.id, day).await.unwrap();
    assert_eq!(
        slots,
        vec![TimeSlot::new(at(11), at(13)).unwrap(), TimeSlot::new(at(15), at(16)).unwrap()]
    );

    let missing = market.venue_availability(uuid::Uuid::new_v4(), day).await;
    assert!(matches!(missing, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn payment_confirms_a_pending_booking() {
    let market = memory_market();
    let venue = venue(&market, &new_user(), 30.0).await;
    let player = new_user();
    let booked = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 14, 16)).await.unwrap();

    let paid = market.pay_for_booking(&player, booked.id).await.unwrap();
    assert_eq!(paid.status, BookingStatus::Confirmed);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert!(paid.payment_id.as_deref().is_some_and(|id| id.starts_with("pay_")));

    let again = market.pay_for_booking(&player, booked.id).await;
    assert!(matches!(again, Err(Error::Conflict(_))));

    let titles: Vec<_> = market.list_notifications(&player).await.unwrap().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Payment received", "Booking confirmed"]);
}

#[tokio::test]
async fn declined_payment_is_recorded_as_failed() {
    let market = memory_market().with_payment_gateway(Arc::new(MockPaymentGateway::declining()));
    let venue = venue(&market, &new_user(), 30.0).await;
    let player = new_user();
    let booked = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 14, 16)).await.unwrap();

    let declined = market.pay_for_booking(&player, booked.id).await;
    assert!(matches!(declined, Err(Error::PaymentDeclined(_))));

    let stored = market.store().get_booking(booked.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Failed);
    assert_eq!(stored.status, BookingStatus::Pending);
}

/// Approves every charge after a pause, counting how often it was asked.
#[derive(Default)]
struct SlowGateway {
    charges: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for SlowGateway {
    async fn charge(&self, reference: &str, amount: f64) -> Result<PaymentReceipt, PaymentError> {
        self.charges.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(PaymentReceipt { id: "pay_slow".into(), reference: reference.into(), amount })
    }
}

async fn concurrent_payers_are_charged_once(market: Marketplace) {
    let gateway = Arc::new(SlowGateway::default());
    let market = market.with_payment_gateway(gateway.clone());
    let venue = venue(&market, &new_user(), 30.0).await;
    let player = new_user();
    let booked = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 9, 10)).await.unwrap();

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let market = market.clone();
            tokio::spawn(async move { market.pay_for_booking(&player, booked.id).await })
        })
        .collect();
    let mut paid = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => paid += 1,
            Err(Error::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(paid, 1);
    assert_eq!(gateway.charges.load(Ordering::SeqCst), 1);
    let stored = market.store().get_booking(booked.id).await.unwrap();
    assert_eq!(stored.payment_status, PaymentStatus::Paid);
    assert_eq!(stored.status, BookingStatus::Confirmed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_payers_are_charged_once_in_memory() {
    concurrent_payers_are_charged_once(memory_market()).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn concurrent_payers_are_charged_once_on_a_database_file() {
    let dir = tempfile::tempdir().unwrap();
    concurrent_payers_are_charged_once(file_market(dir.path()).await).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_bookings_on_a_database_file_conflict_instead_of_failing() {
    let dir = tempfile::tempdir().unwrap();
    let market = file_market(dir.path()).await;
    let owner = new_user();
    let day = in_days(4);

    // Different venues: nobody should lose.
    let mut venues = Vec::new();
    for _ in 0..6 {
        venues.push(venue(&market, &owner, 20.0).await.id);
    }
    let tasks: Vec<_> = venues
        .iter()
        .map(|&venue_id| {
            let market = market.clone();
            tokio::spawn(async move { market.check_and_create_booking(&new_user(), booking(venue_id, day, 18, 20)).await })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    // One venue, one slot: one winner, every loser a conflict.
    let tasks: Vec<_> = (0..6)
        .map(|_| {
            let market = market.clone();
            let venue_id = venues[0];
            tokio::spawn(async move { market.check_and_create_booking(&new_user(), booking(venue_id, day, 8, 10)).await })
        })
        .collect();
    let mut accepted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(Error::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(accepted, 1);
}
