//! Demo catalogue used by `sportnexus seed` and as the read fallback when the
//! primary backend is down.

use serde_json::json;
use sportnexus_models::{
    Difficulty, NewEquipment, NewLesson, NewTutorial, NewVenue, Result,
};
use tracing::info;
use uuid::Uuid;

use crate::{MemoryStore, NotificationBus, Store};

/// Owner of every demo venue and equipment item.
pub const DEMO_OWNER: Uuid = Uuid::from_u128(0x5a0e_de70_0000_4000_8000_0000_0000_0001);

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub venues: usize,
    pub equipment: usize,
    pub tutorials: usize,
    pub lessons: usize,
}

fn venues() -> Vec<NewVenue> {
    vec![
        NewVenue {
            name: "Riverside Tennis Club".into(),
            description: "Four floodlit hard courts by the river".into(),
            location: "Riverside".into(),
            address: "12 Quay Road".into(),
            amenities: json!({ "parking": true, "showers": true, "floodlights": true })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            images: vec!["/images/venues/riverside-tennis.jpg".into()],
            hourly_price: 25.0,
            half_day_price: Some(90.0),
            full_day_price: Some(160.0),
            sport: "tennis".into(),
            capacity: Some(4),
        },
        NewVenue {
            name: "Northside Futsal Arena".into(),
            description: "Indoor five-a-side pitch with spectator seating".into(),
            location: "Northside".into(),
            address: "3 Mill Lane".into(),
            amenities: json!({ "parking": false, "changing_rooms": true })
                .as_object()
                .cloned()
                .unwrap_or_default(),
            images: vec!["/images/venues/northside-futsal.jpg".into()],
            hourly_price: 30.0,
            half_day_price: None,
            full_day_price: None,
            sport: "football".into(),
            capacity: Some(10),
        },
        NewVenue {
            name: "Harbour Basketball Court".into(),
            description: "Outdoor full court, resurfaced last spring".into(),
            location: "Harbour".into(),
            address: "Pier 4".into(),
            amenities: Default::default(),
            images: Vec::new(),
            hourly_price: 15.0,
            half_day_price: Some(50.0),
            full_day_price: None,
            sport: "basketball".into(),
            capacity: None,
        },
    ]
}

fn equipment() -> Vec<NewEquipment> {
    vec![
        NewEquipment {
            name: "Carbon Tennis Racket".into(),
            description: "Lightweight 300g frame, strung at 24kg".into(),
            category: "tennis".into(),
            brand: Some("Wilson".into()),
            images: vec!["/images/equipment/racket.jpg".into()],
            daily_price: 10.0,
            weekly_price: 50.0,
            monthly_price: Some(150.0),
            total_quantity: 6,
            available_quantity: None,
        },
        NewEquipment {
            name: "Mountain Bike".into(),
            description: "Hardtail, 29in wheels, medium frame".into(),
            category: "cycling".into(),
            brand: Some("Trek".into()),
            images: vec!["/images/equipment/mtb.jpg".into()],
            daily_price: 35.0,
            weekly_price: 180.0,
            monthly_price: None,
            total_quantity: 2,
            available_quantity: None,
        },
        NewEquipment {
            name: "Match Football".into(),
            description: "Size 5 FIFA quality ball".into(),
            category: "football".into(),
            brand: None,
            images: Vec::new(),
            daily_price: 3.0,
            weekly_price: 15.0,
            monthly_price: Some(40.0),
            total_quantity: 20,
            available_quantity: None,
        },
    ]
}

fn tutorials() -> Vec<(NewTutorial, Vec<NewLesson>)> {
    let lesson = |order: i64, title: &str, minutes: i64| NewLesson {
        title: title.into(),
        description: String::new(),
        media_url: None,
        duration_minutes: minutes,
        sequence_order: order,
    };
    vec![
        (
            NewTutorial {
                title: "Tennis Serve Fundamentals".into(),
                description: "From grip to follow-through".into(),
                sport: "tennis".into(),
                difficulty: Difficulty::Beginner,
                instructor_id: Some(DEMO_OWNER),
                media_urls: Vec::new(),
                duration_minutes: 45,
                is_premium: false,
            },
            vec![
                lesson(1, "Continental grip", 10),
                lesson(2, "Ball toss", 15),
                lesson(3, "Follow-through", 20),
            ],
        ),
        (
            NewTutorial {
                title: "Pick and Roll Reads".into(),
                description: "Reading the defence as ball handler".into(),
                sport: "basketball".into(),
                difficulty: Difficulty::Advanced,
                instructor_id: Some(DEMO_OWNER),
                media_urls: Vec::new(),
                duration_minutes: 30,
                is_premium: true,
            },
            vec![lesson(1, "Drop coverage", 15), lesson(2, "Hedge and recover", 15)],
        ),
    ]
}

/// Inserts the demo catalogue into `store`.
pub async fn load_demo(store: &dyn Store) -> Result<SeedSummary> {
    let mut summary = SeedSummary::default();

    for venue in venues() {
        store.create_venue(DEMO_OWNER, venue).await?;
        summary.venues += 1;
    }
    for item in equipment() {
        store.create_equipment(DEMO_OWNER, item).await?;
        summary.equipment += 1;
    }
    for (tutorial, lessons) in tutorials() {
        let tutorial = store.create_tutorial(tutorial).await?;
        summary.tutorials += 1;
        for lesson in lessons {
            store.create_lesson(tutorial.id, lesson).await?;
            summary.lessons += 1;
        }
    }

    info!(
        "Seeded {} venues, {} equipment items, {} tutorials ({} lessons)",
        summary.venues, summary.equipment, summary.tutorials, summary.lessons
    );
    Ok(summary)
}

/// An in-memory store holding only the demo catalogue.
pub async fn demo_store(bus: NotificationBus) -> Result<MemoryStore> {
    let store = MemoryStore::new(bus);
    load_demo(&store).await?;
    Ok(store)
}
