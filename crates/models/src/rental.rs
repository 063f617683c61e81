use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{BookingStatus, Error, PaymentStatus, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct EquipmentRental {
    pub id: Uuid,
    pub equipment_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i64,
    pub total_price: f64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RentalRequest {
    pub equipment_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i64,
    pub notes: Option<String>,
    /// Price the caller displayed; checked against the server-side computation.
    pub quoted_price: Option<f64>,
}

impl RentalRequest {
    pub fn validate(&self) -> Result<()> {
        if self.quantity < 1 {
            return Err(Error::Validation("quantity must be at least 1".into()));
        }
        if self.end_date < self.start_date {
            return Err(Error::Validation(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub equipment_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub quantity: i64,
    pub total_price: f64,
    pub notes: Option<String>,
}

impl NewRental {
    pub fn into_rental(self, id: Uuid, created_at: DateTime<Utc>) -> EquipmentRental {
        EquipmentRental {
            id,
            equipment_id: self.equipment_id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            quantity: self.quantity,
            total_price: self.total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_id: None,
            notes: self.notes,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RentalWithEquipment {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub rental: EquipmentRental,
    pub equipment_name: String,
    pub equipment_category: String,
    #[sqlx(json)]
    pub equipment_images: Vec<String>,
}
