//! Per-user progress through a tutorial's ordered lessons.
//!
//! `completed_lessons` records the furthest lesson marked complete, so it never
//! decreases. Once a progress row reaches `Completed` it stays there, and its
//! completion date and certificate flag are never cleared.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::TutorialLesson;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::NotStarted => "not_started",
            ProgressStatus::InProgress => "in_progress",
            ProgressStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserTutorialProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub tutorial_id: Uuid,
    pub current_lesson_id: Option<Uuid>,
    pub progress: ProgressStatus,
    pub completed_lessons: i64,
    pub total_lessons: i64,
    pub last_accessed: DateTime<Utc>,
    pub completion_date: Option<DateTime<Utc>>,
    pub certificate_issued: bool,
}

impl UserTutorialProgress {
    /// First access: positioned at the first lesson, nothing completed.
    pub fn start(
        user_id: Uuid,
        tutorial_id: Uuid,
        lessons: &[TutorialLesson],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            tutorial_id,
            current_lesson_id: lessons.first().map(|l| l.id),
            progress: ProgressStatus::NotStarted,
            completed_lessons: 0,
            total_lessons: lessons.len() as i64,
            last_accessed: now,
            completion_date: None,
            certificate_issued: false,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.progress == ProgressStatus::Completed
    }

    /// Grows the lesson total when lessons were added after the snapshot was
    /// taken. Finished progress keeps its original total.
    pub fn sync_total(&mut self, lesson_count: usize) -> bool {
        let count = lesson_count as i64;
        if self.is_completed() || count <= self.total_lessons {
            return false;
        }
        self.total_lessons = count;
        true
    }

    pub fn mark_complete(&mut self, lesson_index: usize, lesson_id: Uuid, now: DateTime<Utc>) {
        let reached = (lesson_index as i64 + 1).min(self.total_lessons);
        self.completed_lessons = self.completed_lessons.max(reached);
        self.current_lesson_id = Some(lesson_id);
        if self.progress == ProgressStatus::NotStarted {
            self.progress = ProgressStatus::InProgress;
        }
        self.settle(now);
    }

    /// Changes the current lesson without touching `completed_lessons`.
    pub fn move_to(&mut self, lesson_index: usize, lesson_id: Uuid, now: DateTime<Utc>) {
        self.current_lesson_id = Some(lesson_id);
        if self.progress == ProgressStatus::NotStarted
            && (lesson_index > 0 || self.completed_lessons > 0)
        {
            self.progress = ProgressStatus::InProgress;
        }
        self.settle(now);
    }

    /// Folds a newer snapshot of the same (user, tutorial) pair into this
    /// stored one without letting any monotonic field go backwards.
    pub fn absorb(&mut self, newer: &UserTutorialProgress) {
        self.current_lesson_id = newer.current_lesson_id;
        self.completed_lessons = self.completed_lessons.max(newer.completed_lessons);
        self.total_lessons = newer.total_lessons;
        self.last_accessed = newer.last_accessed;
        if !self.is_completed() {
            self.progress = newer.progress;
        }
        self.completion_date = self.completion_date.or(newer.completion_date);
        self.certificate_issued |= newer.certificate_issued;
    }

    fn settle(&mut self, now: DateTime<Utc>) {
        self.last_accessed = now;
        if self.total_lessons > 0 && self.completed_lessons >= self.total_lessons {
            self.progress = ProgressStatus::Completed;
        }
        if self.is_completed() {
            self.completion_date.get_or_insert(now);
            self.certificate_issued = true;
        }
    }
}
