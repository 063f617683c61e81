mod common;

use common::*;
use sportnexus_marketplace::{Marketplace, Session};
use sportnexus_models::{Difficulty, Error, NewLesson, NewTutorial, ProgressStatus, Tutorial};
use uuid::Uuid;

async fn tutorial_with_lessons(market: &Marketplace, count: i64) -> Tutorial {
    let author = new_user();
    let tutorial = market
        .create_tutorial(
            &author,
            NewTutorial {
                title: "Volleys".into(),
                description: String::new(),
                sport: "tennis".into(),
                difficulty: Difficulty::Beginner,
                instructor_id: None,
                media_urls: Vec::new(),
                duration_minutes: 30,
                is_premium: false,
            },
        )
        .await
        .unwrap();
    for order in 1..=count {
        add_lesson(market, &author, tutorial.id, order).await;
    }
    tutorial
}

async fn add_lesson(market: &Marketplace, author: &Session, tutorial_id: Uuid, order: i64) {
    let lesson = NewLesson {
        title: format!("Lesson {order}"),
        description: String::new(),
        media_url: None,
        duration_minutes: 10,
        sequence_order: order,
    };
    market.add_lesson(author, tutorial_id, lesson).await.unwrap();
}

#[tokio::test]
async fn first_access_starts_at_the_first_lesson() {
    let market = memory_market();
    let tutorial = tutorial_with_lessons(&market, 3).await;

    let tracker = market.open_tutorial(&new_user(), tutorial.id).await.unwrap();
    let progress = tracker.progress();
    assert_eq!(progress.progress, ProgressStatus::NotStarted);
    assert_eq!(progress.completed_lessons, 0);
    assert_eq!(progress.total_lessons, 3);
    assert_eq!(tracker.current_index(), Some(0));

    let anonymous = market.open_tutorial(&Session::anonymous(), tutorial.id).await;
    assert!(matches!(anonymous, Err(Error::LoginRequired)));
}

async fn progress_only_moves_forward(market: Marketplace) {
    let tutorial = tutorial_with_lessons(&market, 3).await;
    let learner = new_user();
    let mut tracker = market.open_tutorial(&learner, tutorial.id).await.unwrap();
    let ids: Vec<Uuid> = tracker.lessons().iter().map(|l| l.id).collect();

    tracker.move_to_lesson(ids[2]).await.unwrap();
    assert_eq!(tracker.progress().completed_lessons, 0);
    assert_eq!(tracker.progress().progress, ProgressStatus::InProgress);

    tracker.mark_lesson_complete(ids[1]).await.unwrap();
    assert_eq!(tracker.progress().completed_lessons, 2);

    // Revisiting an earlier lesson never lowers the count.
    tracker.mark_lesson_complete(ids[0]).await.unwrap();
    assert_eq!(tracker.progress().completed_lessons, 2);
    assert_eq!(tracker.current_index(), Some(0));

    let done = tracker.mark_lesson_complete(ids[2]).await.unwrap().clone();
    assert_eq!(done.progress, ProgressStatus::Completed);
    assert!(done.certificate_issued);
    let completed_on = done.completion_date.unwrap();

    // Completion is terminal; navigation still works.
    assert!(tracker.move_to_previous_lesson().await.unwrap());
    tracker.mark_lesson_complete(ids[0]).await.unwrap();
    let after = tracker.progress();
    assert_eq!(after.progress, ProgressStatus::Completed);
    assert_eq!(after.completion_date, Some(completed_on));
    assert!(after.certificate_issued);
    assert_eq!(after.current_lesson_id, Some(ids[0]));

    let reopened = market.open_tutorial(&learner, tutorial.id).await.unwrap();
    assert_eq!(reopened.progress().completed_lessons, 3);
    assert_eq!(reopened.progress().progress, ProgressStatus::Completed);
    assert_eq!(reopened.current_index(), Some(0));
}

#[tokio::test]
async fn progress_only_moves_forward_in_memory() {
    progress_only_moves_forward(memory_market()).await;
}

#[tokio::test]
async fn progress_only_moves_forward_on_sqlite() {
    progress_only_moves_forward(sqlite_market().await).await;
}

#[tokio::test]
async fn navigation_stops_at_the_ends() {
    let market = memory_market();
    let tutorial = tutorial_with_lessons(&market, 2).await;
    let mut tracker = market.open_tutorial(&new_user(), tutorial.id).await.unwrap();
    let before = tracker.progress().last_accessed;

    assert!(!tracker.move_to_previous_lesson().await.unwrap());
    assert_eq!(tracker.progress().last_accessed, before);
    assert_eq!(tracker.progress().progress, ProgressStatus::NotStarted);

    assert!(tracker.move_to_next_lesson().await.unwrap());
    assert_eq!(tracker.current_index(), Some(1));
    assert_eq!(tracker.progress().progress, ProgressStatus::InProgress);
    assert!(!tracker.move_to_next_lesson().await.unwrap());

    let unknown = tracker.move_to_lesson(Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(Error::NotFound { entity: "lesson", .. })));
    let unknown = tracker.mark_lesson_complete(Uuid::new_v4()).await;
    assert!(matches!(unknown, Err(Error::NotFound { entity: "lesson", .. })));
}

#[tokio::test]
async fn lessons_added_later_extend_unfinished_progress() {
    let market = memory_market();
    let author = new_user();
    let tutorial = tutorial_with_lessons(&market, 2).await;
    let learner = new_user();

    let mut tracker = market.open_tutorial(&learner, tutorial.id).await.unwrap();
    let first = tracker.lessons()[0].id;
    tracker.mark_lesson_complete(first).await.unwrap();

    add_lesson(&market, &author, tutorial.id, 3).await;
    let reopened = market.open_tutorial(&learner, tutorial.id).await.unwrap();
    assert_eq!(reopened.progress().total_lessons, 3);
    assert_eq!(reopened.progress().completed_lessons, 1);

    let duplicate = NewLesson {
        title: "Again".into(),
        description: String::new(),
        media_url: None,
        duration_minutes: 5,
        sequence_order: 3,
    };
    let clash = market.add_lesson(&author, tutorial.id, duplicate).await;
    assert!(matches!(clash, Err(Error::Conflict(_))));
}

#[tokio::test]
async fn only_the_instructor_adds_lessons() {
    let market = memory_market();
    let author = new_user();
    let tutorial = market
        .create_tutorial(
            &author,
            NewTutorial {
                title: "Drop shots".into(),
                description: String::new(),
                sport: "tennis".into(),
                difficulty: Difficulty::Intermediate,
                instructor_id: Some(Uuid::new_v4()),
                media_urls: Vec::new(),
                duration_minutes: 15,
                is_premium: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(tutorial.instructor_id, author.user_id());

    let lesson = NewLesson {
        title: "Sneaky".into(),
        description: String::new(),
        media_url: None,
        duration_minutes: 5,
        sequence_order: 1,
    };
    let stranger = market.add_lesson(&new_user(), tutorial.id, lesson).await;
    assert!(matches!(stranger, Err(Error::NotFound { entity: "tutorial", .. })));
    assert!(market.list_lessons(tutorial.id).await.unwrap().is_empty());

    add_lesson(&market, &author, tutorial.id, 1).await;
    assert_eq!(market.list_lessons(tutorial.id).await.unwrap().len(), 1);
}
