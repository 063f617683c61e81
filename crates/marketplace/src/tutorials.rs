use std::sync::Arc;

use chrono::Utc;
use sportnexus_db::Store;
use sportnexus_models::{Error, Result, Tutorial, TutorialLesson, UserTutorialProgress};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{Marketplace, Session};

impl Marketplace {
    /// Loads (or on first access creates) the caller's progress through a
    /// tutorial. A progress row is persisted as soon as it is created.
    pub async fn open_tutorial(&self, session: &Session, tutorial_id: Uuid) -> Result<TutorialProgressTracker> {
        let user_id = session.require()?;
        let tutorial = self.store.get_tutorial(tutorial_id).await?;
        let lessons = self.store.list_lessons(tutorial_id).await?;

        let progress = match self.store.get_progress(user_id, tutorial_id).await? {
            Some(mut progress) => {
                if progress.sync_total(lessons.len()) {
                    debug!("Tutorial {tutorial_id} grew to {} lessons", lessons.len());
                    self.store.save_progress(&progress).await?
                } else {
                    progress
                }
            }
            None => {
                let progress = UserTutorialProgress::start(user_id, tutorial_id, &lessons, Utc::now());
                info!("User {user_id} started tutorial '{}'", tutorial.title);
                self.store.save_progress(&progress).await?
            }
        };

        Ok(TutorialProgressTracker { store: Arc::clone(&self.store), tutorial, lessons, progress })
    }
}

/// One user's position in one tutorial. Every change is written through to
/// the store before the method returns.
pub struct TutorialProgressTracker {
    store: Arc<dyn Store>,
    tutorial: Tutorial,
    lessons: Vec<TutorialLesson>,
    progress: UserTutorialProgress,
}

impl TutorialProgressTracker {
    pub fn tutorial(&self) -> &Tutorial {
        &self.tutorial
    }

    /// Ordered by `sequence_order`.
    pub fn lessons(&self) -> &[TutorialLesson] {
        &self.lessons
    }

    pub fn progress(&self) -> &UserTutorialProgress {
        &self.progress
    }

    pub fn current_index(&self) -> Option<usize> {
        let current = self.progress.current_lesson_id?;
        self.lessons.iter().position(|l| l.id == current)
    }

    pub fn current_lesson(&self) -> Option<&TutorialLesson> {
        self.current_index().map(|i| &self.lessons[i])
    }

    fn index_of(&self, lesson_id: Uuid) -> Result<usize> {
        self.lessons
            .iter()
            .position(|l| l.id == lesson_id)
            .ok_or_else(|| Error::not_found("lesson", lesson_id))
    }

    async fn persist(&mut self) -> Result<()> {
        self.progress = self.store.save_progress(&self.progress).await?;
        Ok(())
    }

    pub async fn mark_lesson_complete(&mut self, lesson_id: Uuid) -> Result<&UserTutorialProgress> {
        let index = self.index_of(lesson_id)?;
        let was_completed = self.progress.is_completed();
        self.progress.mark_complete(index, lesson_id, Utc::now());
        self.persist().await?;

        if !was_completed && self.progress.is_completed() {
            info!(
                "User {} completed tutorial '{}', certificate issued",
                self.progress.user_id, self.tutorial.title
            );
        }
        Ok(&self.progress)
    }

    /// Returns `false` without persisting anything when already at the last lesson.
    pub async fn move_to_next_lesson(&mut self) -> Result<bool> {
        let next = match self.current_index() {
            Some(i) if i + 1 < self.lessons.len() => i + 1,
            Some(_) => return Ok(false),
            None if !self.lessons.is_empty() => 0,
            None => return Ok(false),
        };
        self.go_to(next).await?;
        Ok(true)
    }

    /// Returns `false` without persisting anything when already at the first lesson.
    pub async fn move_to_previous_lesson(&mut self) -> Result<bool> {
        match self.current_index() {
            Some(i) if i > 0 => {
                self.go_to(i - 1).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Jumps to any lesson; completed lessons are left untouched.
    pub async fn move_to_lesson(&mut self, lesson_id: Uuid) -> Result<&UserTutorialProgress> {
        let index = self.index_of(lesson_id)?;
        self.go_to(index).await?;
        Ok(&self.progress)
    }

    async fn go_to(&mut self, index: usize) -> Result<()> {
        let lesson_id = self.lessons[index].id;
        self.progress.move_to(index, lesson_id, Utc::now());
        self.persist().await
    }
}
