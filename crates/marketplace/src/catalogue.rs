use sportnexus_models::{
    Equipment, Error, EquipmentFilter, NewEquipment, NewLesson, NewTutorial, NewVenue, Result, Tutorial,
    TutorialFilter, TutorialLesson, Venue, VenueFilter,
};
use tracing::info;
use uuid::Uuid;

use crate::{Marketplace, Session};

impl Marketplace {
    pub async fn list_venues(&self, filter: &VenueFilter) -> Result<Vec<Venue>> {
        self.store.list_venues(filter).await
    }

    pub async fn get_venue(&self, id: Uuid) -> Result<Venue> {
        self.store.get_venue(id).await
    }

    /// The signed-in user becomes the venue's owner.
    pub async fn create_venue(&self, session: &Session, venue: NewVenue) -> Result<Venue> {
        let owner_id = session.require()?;
        let venue = self.store.create_venue(owner_id, venue).await?;
        info!("User {owner_id} listed venue '{}'", venue.name);
        Ok(venue)
    }

    pub async fn list_equipment(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>> {
        self.store.list_equipment(filter).await
    }

    pub async fn get_equipment(&self, id: Uuid) -> Result<Equipment> {
        self.store.get_equipment(id).await
    }

    pub async fn create_equipment(&self, session: &Session, equipment: NewEquipment) -> Result<Equipment> {
        let owner_id = session.require()?;
        let equipment = self.store.create_equipment(owner_id, equipment).await?;
        info!("User {owner_id} listed equipment '{}'", equipment.name);
        Ok(equipment)
    }

    pub async fn list_tutorials(&self, filter: &TutorialFilter) -> Result<Vec<Tutorial>> {
        self.store.list_tutorials(filter).await
    }

    pub async fn get_tutorial(&self, id: Uuid) -> Result<Tutorial> {
        self.store.get_tutorial(id).await
    }

    pub async fn list_lessons(&self, tutorial_id: Uuid) -> Result<Vec<TutorialLesson>> {
        self.store.get_tutorial(tutorial_id).await?;
        self.store.list_lessons(tutorial_id).await
    }

    /// The signed-in user is always recorded as the instructor.
    pub async fn create_tutorial(&self, session: &Session, mut tutorial: NewTutorial) -> Result<Tutorial> {
        let user_id = session.require()?;
        tutorial.instructor_id = Some(user_id);
        let tutorial = self.store.create_tutorial(tutorial).await?;
        info!("User {user_id} published tutorial '{}'", tutorial.title);
        Ok(tutorial)
    }

    /// Only the tutorial's instructor may add lessons; anyone else sees
    /// `Error::NotFound`.
    pub async fn add_lesson(&self, session: &Session, tutorial_id: Uuid, lesson: NewLesson) -> Result<TutorialLesson> {
        let user_id = session.require()?;
        let tutorial = self.store.get_tutorial(tutorial_id).await?;
        match tutorial.instructor_id {
            Some(instructor_id) => crate::ensure_owner(user_id, instructor_id, "tutorial", tutorial_id)?,
            None => return Err(Error::not_found("tutorial", tutorial_id)),
        }
        self.store.create_lesson(tutorial_id, lesson).await
    }
}
