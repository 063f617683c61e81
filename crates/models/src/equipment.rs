use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{check_not_blank, check_price, contains_ignore_case, Error, Result};

const DAYS_PER_WEEK: i64 = 7;
const DAYS_PER_MONTH: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Equipment {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    #[sqlx(json)]
    pub images: Vec<String>,
    pub daily_price: f64,
    pub weekly_price: f64,
    pub monthly_price: Option<f64>,
    pub total_quantity: i64,
    pub available_quantity: i64,
    pub created_at: DateTime<Utc>,
}

/// Number of billable days; both endpoints count, so a same-day rental is one day.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

impl Equipment {
    /// Per-unit price for `days`, billed in whole months, then whole weeks, then days.
    /// A partial tier never costs more than the next full tier.
    pub fn unit_price_for_days(&self, days: i64) -> f64 {
        let days = days.max(0);
        let by_week = |d: i64| {
            let weeks = d / DAYS_PER_WEEK;
            let rest = d % DAYS_PER_WEEK;
            weeks as f64 * self.weekly_price + (rest as f64 * self.daily_price).min(self.weekly_price)
        };
        match self.monthly_price {
            Some(monthly) => {
                let months = days / DAYS_PER_MONTH;
                let rest = days % DAYS_PER_MONTH;
                months as f64 * monthly + by_week(rest).min(monthly)
            }
            None => by_week(days),
        }
    }

    pub fn rental_price(&self, start: NaiveDate, end: NaiveDate, quantity: i64) -> f64 {
        self.unit_price_for_days(rental_days(start, end)) * quantity as f64
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEquipment {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub daily_price: f64,
    pub weekly_price: f64,
    pub monthly_price: Option<f64>,
    pub total_quantity: i64,
    /// Defaults to `total_quantity`.
    pub available_quantity: Option<i64>,
}

impl NewEquipment {
    pub fn validate(&self) -> Result<()> {
        check_not_blank("name", &self.name)?;
        check_not_blank("category", &self.category)?;
        check_price("daily_price", self.daily_price)?;
        check_price("weekly_price", self.weekly_price)?;
        if let Some(p) = self.monthly_price {
            check_price("monthly_price", p)?;
        }
        if self.total_quantity < 0 {
            return Err(Error::Validation("total_quantity must not be negative".into()));
        }
        if let Some(available) = self.available_quantity {
            if available < 0 || available > self.total_quantity {
                return Err(Error::Validation(
                    "available_quantity must be between 0 and total_quantity".into(),
                ));
            }
        }
        Ok(())
    }

    pub fn into_equipment(self, id: Uuid, owner_id: Uuid, created_at: DateTime<Utc>) -> Equipment {
        Equipment {
            id,
            owner_id,
            name: self.name,
            description: self.description,
            category: self.category,
            brand: self.brand,
            images: self.images,
            daily_price: self.daily_price,
            weekly_price: self.weekly_price,
            monthly_price: self.monthly_price,
            available_quantity: self.available_quantity.unwrap_or(self.total_quantity),
            total_quantity: self.total_quantity,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EquipmentFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub max_daily_price: Option<f64>,
    #[serde(default)]
    pub in_stock_only: bool,
}

impl EquipmentFilter {
    pub fn matches(&self, item: &Equipment) -> bool {
        if let Some(category) = &self.category {
            if !item.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(term) = &self.search {
            let brand = item.brand.as_deref().unwrap_or_default();
            if !(contains_ignore_case(&item.name, term)
                || contains_ignore_case(&item.description, term)
                || contains_ignore_case(brand, term))
            {
                return false;
            }
        }
        if matches!(self.max_daily_price, Some(max) if item.daily_price > max) {
            return false;
        }
        !(self.in_stock_only && item.available_quantity <= 0)
    }
}
