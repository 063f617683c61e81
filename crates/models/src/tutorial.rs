use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{check_not_blank, contains_ignore_case, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
            Difficulty::Expert => "expert",
        };
        f.write_str(s)
    }
}

impl FromStr for Difficulty {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "beginner" => Ok(Difficulty::Beginner),
            "intermediate" => Ok(Difficulty::Intermediate),
            "advanced" => Ok(Difficulty::Advanced),
            "expert" => Ok(Difficulty::Expert),
            other => Err(Error::Validation(format!("unknown difficulty '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tutorial {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub sport: String,
    pub difficulty: Difficulty,
    pub instructor_id: Option<Uuid>,
    #[sqlx(json)]
    pub media_urls: Vec<String>,
    pub duration_minutes: i64,
    pub is_premium: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTutorial {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub sport: String,
    pub difficulty: Difficulty,
    pub instructor_id: Option<Uuid>,
    #[serde(default)]
    pub media_urls: Vec<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub is_premium: bool,
}

impl NewTutorial {
    pub fn validate(&self) -> Result<()> {
        check_not_blank("title", &self.title)?;
        check_not_blank("sport", &self.sport)?;
        if self.duration_minutes < 0 {
            return Err(Error::Validation("duration must not be negative".into()));
        }
        Ok(())
    }

    pub fn into_tutorial(self, id: Uuid, created_at: DateTime<Utc>) -> Tutorial {
        Tutorial {
            id,
            title: self.title,
            description: self.description,
            sport: self.sport,
            difficulty: self.difficulty,
            instructor_id: self.instructor_id,
            media_urls: self.media_urls,
            duration_minutes: self.duration_minutes,
            is_premium: self.is_premium,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TutorialFilter {
    pub sport: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub search: Option<String>,
}

impl TutorialFilter {
    pub fn matches(&self, tutorial: &Tutorial) -> bool {
        if matches!(&self.sport, Some(sport) if !tutorial.sport.eq_ignore_ascii_case(sport)) {
            return false;
        }
        if matches!(self.difficulty, Some(d) if tutorial.difficulty != d) {
            return false;
        }
        match &self.search {
            Some(term) => {
                contains_ignore_case(&tutorial.title, term)
                    || contains_ignore_case(&tutorial.description, term)
            }
            None => true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TutorialLesson {
    pub id: Uuid,
    pub tutorial_id: Uuid,
    pub title: String,
    pub description: String,
    pub media_url: Option<String>,
    pub duration_minutes: i64,
    pub sequence_order: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLesson {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub media_url: Option<String>,
    pub duration_minutes: i64,
    pub sequence_order: i64,
}

impl NewLesson {
    pub fn validate(&self) -> Result<()> {
        check_not_blank("title", &self.title)?;
        if self.duration_minutes < 0 {
            return Err(Error::Validation("duration must not be negative".into()));
        }
        Ok(())
    }

    pub fn into_lesson(self, id: Uuid, tutorial_id: Uuid) -> TutorialLesson {
        TutorialLesson {
            id,
            tutorial_id,
            title: self.title,
            description: self.description,
            media_url: self.media_url,
            duration_minutes: self.duration_minutes,
            sequence_order: self.sequence_order,
        }
    }
}
