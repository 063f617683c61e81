use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{check_not_blank, check_price, contains_ignore_case, Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Venue {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub location: String,
    pub address: String,
    #[sqlx(json)]
    pub amenities: Map<String, Value>,
    #[sqlx(json)]
    pub images: Vec<String>,
    pub hourly_price: f64,
    pub half_day_price: Option<f64>,
    pub full_day_price: Option<f64>,
    pub sport: String,
    pub capacity: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewVenue {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub amenities: Map<String, Value>,
    #[serde(default)]
    pub images: Vec<String>,
    pub hourly_price: f64,
    pub half_day_price: Option<f64>,
    pub full_day_price: Option<f64>,
    pub sport: String,
    pub capacity: Option<i64>,
}

impl NewVenue {
    pub fn validate(&self) -> Result<()> {
        check_not_blank("name", &self.name)?;
        check_not_blank("sport", &self.sport)?;
        check_price("hourly_price", self.hourly_price)?;
        if let Some(p) = self.half_day_price {
            check_price("half_day_price", p)?;
        }
        if let Some(p) = self.full_day_price {
            check_price("full_day_price", p)?;
        }
        if matches!(self.capacity, Some(c) if c <= 0) {
            return Err(Error::Validation("capacity must be a positive integer".into()));
        }
        Ok(())
    }

    pub fn into_venue(self, id: Uuid, owner_id: Uuid, created_at: DateTime<Utc>) -> Venue {
        Venue {
            id,
            owner_id,
            name: self.name,
            description: self.description,
            location: self.location,
            address: self.address,
            amenities: self.amenities,
            images: self.images,
            hourly_price: self.hourly_price,
            half_day_price: self.half_day_price,
            full_day_price: self.full_day_price,
            sport: self.sport,
            capacity: self.capacity,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VenueFilter {
    pub sport: Option<String>,
    /// Matched against name, description and location.
    pub search: Option<String>,
    pub max_hourly_price: Option<f64>,
}

impl VenueFilter {
    pub fn matches(&self, venue: &Venue) -> bool {
        if let Some(sport) = &self.sport {
            if !venue.sport.eq_ignore_ascii_case(sport) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let hit = contains_ignore_case(&venue.name, term)
                || contains_ignore_case(&venue.description, term)
                || contains_ignore_case(&venue.location, term);
            if !hit {
                return false;
            }
        }
        if let Some(max) = self.max_hourly_price {
            if venue.hourly_price > max {
                return false;
            }
        }
        true
    }
}
