mod common;

use common::*;
use sportnexus_models::{Error, NewNotification};
use uuid::Uuid;

fn note(user_id: Uuid, title: &str) -> NewNotification {
    NewNotification {
        user_id,
        title: title.into(),
        message: "Details inside".into(),
        kind: None,
        entity_type: None,
        entity_id: None,
    }
}

#[tokio::test]
async fn mark_all_read_is_idempotent() {
    let market = memory_market();
    let user = Uuid::new_v4();
    let session = sportnexus_marketplace::Session::user(user);
    for title in ["one", "two", "three"] {
        market.store().create_notification(note(user, title)).await.unwrap();
    }

    let feed = market.notification_feed(&session).await.unwrap();
    assert_eq!(feed.unread_count(), 3);

    assert_eq!(feed.mark_all_read().await.unwrap(), 3);
    assert_eq!(feed.unread_count(), 0);
    assert_eq!(feed.mark_all_read().await.unwrap(), 0);
    assert_eq!(feed.unread_count(), 0);
    assert!(market.list_notifications(&session).await.unwrap().iter().all(|n| n.is_read));
}

#[tokio::test]
async fn feed_follows_new_notifications() {
    let market = sqlite_market().await;
    let owner = new_user();
    let venue = venue(&market, &owner, 20.0).await;
    let player = new_user();

    let feed = market.notification_feed(&player).await.unwrap();
    assert_eq!(feed.unread_count(), 0);

    let booked = market.check_and_create_booking(&player, booking(venue.id, in_days(1), 9, 11)).await.unwrap();
    market.pay_for_booking(&player, booked.id).await.unwrap();

    let titles: Vec<_> = feed.notifications().into_iter().map(|n| n.title).collect();
    assert_eq!(titles, vec!["Payment received", "Booking confirmed"]);
    assert_eq!(feed.unread_count(), 2);

    let newest = feed.notifications()[0].id;
    feed.mark_read(newest).await.unwrap();
    assert_eq!(feed.unread_count(), 1);
    // Marking the same notification again does not count twice.
    feed.mark_read(newest).await.unwrap();
    assert_eq!(feed.unread_count(), 1);
}

#[tokio::test]
async fn unread_count_never_goes_negative() {
    let market = memory_market();
    let user = Uuid::new_v4();
    let session = sportnexus_marketplace::Session::user(user);
    let feed = market.notification_feed(&session).await.unwrap();

    let stored = market.store().create_notification(note(user, "hello")).await.unwrap();
    assert_eq!(feed.unread_count(), 1);
    feed.mark_all_read().await.unwrap();

    feed.mark_read(stored.id).await.unwrap();
    assert_eq!(feed.unread_count(), 0);
}

#[tokio::test]
async fn dropping_the_feed_unsubscribes() {
    let market = memory_market();
    let player = new_user();
    let user = player.user_id().unwrap();

    let feed = market.notification_feed(&player).await.unwrap();
    assert_eq!(market.bus().subscriber_count(user), 1);
    drop(feed);
    assert_eq!(market.bus().subscriber_count(user), 0);
}

#[tokio::test]
async fn other_users_notifications_are_hidden() {
    let market = memory_market();
    let owner = Uuid::new_v4();
    let stored = market.store().create_notification(note(owner, "private")).await.unwrap();

    let snoop = market.mark_notification_read(&new_user(), stored.id).await;
    assert!(matches!(snoop, Err(Error::NotFound { .. })));

    let anonymous = market.list_notifications(&sportnexus_marketplace::Session::anonymous()).await;
    assert!(matches!(anonymous, Err(Error::LoginRequired)));
}

#[tokio::test]
async fn feed_cannot_mark_another_users_notification() {
    let market = sqlite_market().await;
    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    market.store().create_notification(note(alice, "yours")).await.unwrap();
    let bobs = market.store().create_notification(note(bob, "not yours")).await.unwrap();

    let feed = market.notification_feed(&sportnexus_marketplace::Session::user(alice)).await.unwrap();
    assert_eq!(feed.unread_count(), 1);

    let result = feed.mark_read(bobs.id).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
    assert_eq!(feed.unread_count(), 1);

    let bob_view = market.list_notifications(&sportnexus_marketplace::Session::user(bob)).await.unwrap();
    assert!(!bob_view[0].is_read);
}
