use chrono::NaiveDate;
use sportnexus_models::{
    BookingStatus, EquipmentRental, Error, NewNotification, NewRental, RentalRequest,
    RentalWithEquipment, Result,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{Marketplace, Session};

/// Largest accepted gap between a quoted and a computed rental price.
const PRICE_TOLERANCE: f64 = 0.01;

impl Marketplace {
    /// Server-side price of renting `quantity` units over `[start, end]`.
    pub async fn quote_rental(
        &self,
        equipment_id: Uuid,
        start_date: NaiveDate,
        end_date: NaiveDate,
        quantity: i64,
    ) -> Result<f64> {
        let request = RentalRequest {
            equipment_id,
            start_date,
            end_date,
            quantity,
            notes: None,
            quoted_price: None,
        };
        request.validate()?;
        let equipment = self.store.get_equipment(equipment_id).await?;
        Ok(equipment.rental_price(start_date, end_date, quantity))
    }

    /// Prices the request, checks any quoted price, and reserves stock and
    /// inserts the rental as one unit of work.
    pub async fn check_and_create_rental(
        &self,
        session: &Session,
        request: RentalRequest,
    ) -> Result<EquipmentRental> {
        let user_id = session.require()?;
        request.validate()?;

        let equipment = self.store.get_equipment(request.equipment_id).await?;
        let total_price = equipment.rental_price(request.start_date, request.end_date, request.quantity);
        if let Some(quoted) = request.quoted_price {
            if (quoted - total_price).abs() > PRICE_TOLERANCE {
                return Err(Error::Validation(format!(
                    "quoted price {quoted:.2} does not match {total_price:.2}"
                )));
            }
        }

        let rental = NewRental {
            equipment_id: equipment.id,
            user_id,
            start_date: request.start_date,
            end_date: request.end_date,
            quantity: request.quantity,
            total_price,
            notes: request.notes,
        };
        match self.store.create_rental(rental).await {
            Ok(rental) => {
                info!(
                    "Rental {} accepted: {} x{} {}..{} for {:.2}",
                    rental.id, equipment.name, rental.quantity, rental.start_date, rental.end_date,
                    rental.total_price
                );
                Ok(rental)
            }
            Err(e) => {
                warn!("Rental of {} x{} rejected: {e}", equipment.name, request.quantity);
                Err(e)
            }
        }
    }

    pub async fn list_my_rentals(&self, session: &Session) -> Result<Vec<RentalWithEquipment>> {
        let user_id = session.require()?;
        self.store.list_rentals_for_user(user_id).await
    }

    /// The renter and the equipment owner may move a rental through its
    /// lifecycle. Cancelling or completing it returns the units to stock.
    pub async fn update_rental_status(
        &self,
        session: &Session,
        rental_id: Uuid,
        status: BookingStatus,
    ) -> Result<EquipmentRental> {
        let user_id = session.require()?;
        let rental = self.store.get_rental(rental_id).await?;
        if rental.user_id != user_id {
            let equipment = self.store.get_equipment(rental.equipment_id).await?;
            crate::ensure_owner(user_id, equipment.owner_id, "rental", rental_id)?;
        }

        let previous = rental.status;
        let updated = self.store.update_rental_status(rental_id, status).await?;
        if previous != updated.status {
            info!("Rental {rental_id}: {previous} -> {}", updated.status);
            self.notify_rental_status(&updated).await;
        }
        Ok(updated)
    }

    pub async fn cancel_rental(&self, session: &Session, rental_id: Uuid) -> Result<EquipmentRental> {
        self.update_rental_status(session, rental_id, BookingStatus::Cancelled).await
    }

    pub(crate) async fn notify_rental_status(&self, rental: &EquipmentRental) {
        let (title, verb) = match rental.status {
            BookingStatus::Confirmed => ("Rental confirmed", "is confirmed"),
            BookingStatus::Cancelled => ("Rental cancelled", "was cancelled"),
            _ => return,
        };
        let message = format!(
            "Your rental of {} unit(s) from {} to {} {verb}.",
            rental.quantity, rental.start_date, rental.end_date
        );
        self.notify(NewNotification::about(rental.user_id, "rental_status", "rental", rental.id, title, message))
            .await;
    }
}
