use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sportnexus_marketplace::{Marketplace, TutorialProgressTracker};
use sportnexus_models::{
    rental_days, BookingRequest, BookingStatus, BookingWithVenue, Equipment, EquipmentFilter,
    EquipmentRental, NewEquipment, NewVenue, Notification, RentalRequest, RentalWithEquipment,
    TimeSlot, Tutorial, TutorialFilter, TutorialLesson, UserTutorialProgress, Venue, VenueBooking,
    VenueFilter,
};
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;
use uuid::Uuid;

use crate::auth::{JwtKeys, Viewer};
use crate::error::ApiResult;
use crate::version_string;

#[derive(Clone)]
pub struct AppState {
    pub market: Marketplace,
    pub keys: Arc<JwtKeys>,
}

// --- Health ---

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": version_string()
    }))
}

// --- Venues & bookings ---

#[derive(Deserialize)]
struct DateQuery {
    date: NaiveDate,
}

#[derive(Deserialize)]
struct StatusUpdate {
    status: BookingStatus,
}

async fn api_list_venues(
    State(state): State<AppState>,
    Query(filter): Query<VenueFilter>,
) -> ApiResult<Json<Vec<Venue>>> {
    Ok(Json(state.market.list_venues(&filter).await?))
}

async fn api_get_venue(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Venue>> {
    Ok(Json(state.market.get_venue(id).await?))
}

async fn api_create_venue(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Json(body): Json<NewVenue>,
) -> ApiResult<(StatusCode, Json<Venue>)> {
    let venue = state.market.create_venue(&session, body).await?;
    Ok((StatusCode::CREATED, Json(venue)))
}

async fn api_venue_availability(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<DateQuery>,
) -> ApiResult<Json<Vec<TimeSlot>>> {
    Ok(Json(state.market.venue_availability(id, query.date).await?))
}

async fn api_list_bookings(
    State(state): State<AppState>,
    Viewer(session): Viewer,
) -> ApiResult<Json<Vec<BookingWithVenue>>> {
    Ok(Json(state.market.list_my_bookings(&session).await?))
}

async fn api_create_booking(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Json(body): Json<BookingRequest>,
) -> ApiResult<(StatusCode, Json<VenueBooking>)> {
    let booking = state.market.check_and_create_booking(&session, body).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

async fn api_update_booking_status(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<VenueBooking>> {
    Ok(Json(state.market.update_booking_status(&session, id, body.status).await?))
}

async fn api_pay_booking(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<VenueBooking>> {
    Ok(Json(state.market.pay_for_booking(&session, id).await?))
}

// --- Equipment & rentals ---

#[derive(Deserialize)]
struct QuoteQuery {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default = "one")]
    quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Serialize)]
struct Quote {
    equipment_id: Uuid,
    start_date: NaiveDate,
    end_date: NaiveDate,
    quantity: i64,
    days: i64,
    total_price: f64,
}

async fn api_list_equipment(
    State(state): State<AppState>,
    Query(filter): Query<EquipmentFilter>,
) -> ApiResult<Json<Vec<Equipment>>> {
    Ok(Json(state.market.list_equipment(&filter).await?))
}

async fn api_get_equipment(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Equipment>> {
    Ok(Json(state.market.get_equipment(id).await?))
}

async fn api_create_equipment(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Json(body): Json<NewEquipment>,
) -> ApiResult<(StatusCode, Json<Equipment>)> {
    let item = state.market.create_equipment(&session, body).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn api_quote_rental(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(q): Query<QuoteQuery>,
) -> ApiResult<Json<Quote>> {
    let total_price = state.market.quote_rental(id, q.start_date, q.end_date, q.quantity).await?;
    Ok(Json(Quote {
        equipment_id: id,
        start_date: q.start_date,
        end_date: q.end_date,
        quantity: q.quantity,
        days: rental_days(q.start_date, q.end_date),
        total_price,
    }))
}

async fn api_list_rentals(
    State(state): State<AppState>,
    Viewer(session): Viewer,
) -> ApiResult<Json<Vec<RentalWithEquipment>>> {
    Ok(Json(state.market.list_my_rentals(&session).await?))
}

async fn api_create_rental(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Json(body): Json<RentalRequest>,
) -> ApiResult<(StatusCode, Json<EquipmentRental>)> {
    let rental = state.market.check_and_create_rental(&session, body).await?;
    Ok((StatusCode::CREATED, Json(rental)))
}

async fn api_update_rental_status(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<StatusUpdate>,
) -> ApiResult<Json<EquipmentRental>> {
    Ok(Json(state.market.update_rental_status(&session, id, body.status).await?))
}

async fn api_pay_rental(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<EquipmentRental>> {
    Ok(Json(state.market.pay_for_rental(&session, id).await?))
}

// --- Tutorials & progress ---

#[derive(Deserialize)]
struct LessonRef {
    lesson_id: Uuid,
}

#[derive(Serialize)]
struct ProgressView {
    progress: UserTutorialProgress,
    current_lesson: Option<TutorialLesson>,
    /// Whether the last navigation actually changed lesson.
    #[serde(skip_serializing_if = "Option::is_none")]
    moved: Option<bool>,
}

impl ProgressView {
    fn of(tracker: &TutorialProgressTracker, moved: Option<bool>) -> Self {
        Self {
            progress: tracker.progress().clone(),
            current_lesson: tracker.current_lesson().cloned(),
            moved,
        }
    }
}

async fn api_list_tutorials(
    State(state): State<AppState>,
    Query(filter): Query<TutorialFilter>,
) -> ApiResult<Json<Vec<Tutorial>>> {
    Ok(Json(state.market.list_tutorials(&filter).await?))
}

async fn api_get_tutorial(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Json<Tutorial>> {
    Ok(Json(state.market.get_tutorial(id).await?))
}

async fn api_list_lessons(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<TutorialLesson>>> {
    Ok(Json(state.market.list_lessons(id).await?))
}

async fn api_get_progress(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProgressView>> {
    let tracker = state.market.open_tutorial(&session, id).await?;
    Ok(Json(ProgressView::of(&tracker, None)))
}

async fn api_complete_lesson(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<LessonRef>,
) -> ApiResult<Json<ProgressView>> {
    let mut tracker = state.market.open_tutorial(&session, id).await?;
    tracker.mark_lesson_complete(body.lesson_id).await?;
    Ok(Json(ProgressView::of(&tracker, None)))
}

async fn api_next_lesson(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProgressView>> {
    let mut tracker = state.market.open_tutorial(&session, id).await?;
    let moved = tracker.move_to_next_lesson().await?;
    Ok(Json(ProgressView::of(&tracker, Some(moved))))
}

async fn api_previous_lesson(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProgressView>> {
    let mut tracker = state.market.open_tutorial(&session, id).await?;
    let moved = tracker.move_to_previous_lesson().await?;
    Ok(Json(ProgressView::of(&tracker, Some(moved))))
}

async fn api_goto_lesson(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
    Json(body): Json<LessonRef>,
) -> ApiResult<Json<ProgressView>> {
    let mut tracker = state.market.open_tutorial(&session, id).await?;
    tracker.move_to_lesson(body.lesson_id).await?;
    Ok(Json(ProgressView::of(&tracker, None)))
}

// --- Notifications ---

async fn api_list_notifications(
    State(state): State<AppState>,
    Viewer(session): Viewer,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(state.market.list_notifications(&session).await?))
}

async fn api_mark_notification_read(
    State(state): State<AppState>,
    Viewer(session): Viewer,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Notification>> {
    Ok(Json(state.market.mark_notification_read(&session, id).await?))
}

async fn api_mark_all_notifications_read(
    State(state): State<AppState>,
    Viewer(session): Viewer,
) -> ApiResult<Json<serde_json::Value>> {
    let updated = state.market.mark_all_notifications_read(&session).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health))
        .route("/venues", get(api_list_venues).post(api_create_venue))
        .route("/venues/{id}", get(api_get_venue))
        .route("/venues/{id}/availability", get(api_venue_availability))
        .route("/bookings", get(api_list_bookings).post(api_create_booking))
        .route("/bookings/{id}/status", patch(api_update_booking_status))
        .route("/bookings/{id}/pay", post(api_pay_booking))
        .route("/equipment", get(api_list_equipment).post(api_create_equipment))
        .route("/equipment/{id}", get(api_get_equipment))
        .route("/equipment/{id}/quote", get(api_quote_rental))
        .route("/rentals", get(api_list_rentals).post(api_create_rental))
        .route("/rentals/{id}/status", patch(api_update_rental_status))
        .route("/rentals/{id}/pay", post(api_pay_rental))
        .route("/tutorials", get(api_list_tutorials))
        .route("/tutorials/{id}", get(api_get_tutorial))
        .route("/tutorials/{id}/lessons", get(api_list_lessons))
        .route("/tutorials/{id}/progress", get(api_get_progress))
        .route("/tutorials/{id}/progress/complete", post(api_complete_lesson))
        .route("/tutorials/{id}/progress/next", post(api_next_lesson))
        .route("/tutorials/{id}/progress/previous", post(api_previous_lesson))
        .route("/tutorials/{id}/progress/goto", post(api_goto_lesson))
        .route("/notifications", get(api_list_notifications))
        .route("/notifications/read-all", post(api_mark_all_notifications_read))
        .route("/notifications/{id}/read", post(api_mark_notification_read));

    Router::new()
        .nest("/api", api_routes)
        .fallback_service(ServeDir::new("frontend/dist").fallback(ServeFile::new("frontend/dist/index.html")))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(port: u16, state: AppState) -> anyhow::Result<()> {
    info!("SportNexus v{}", version_string());

    let app = router(state);
    let addr = format!("0.0.0.0:{port}");
    info!("Listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Method, Request};
    use chrono::{Days, Duration, Utc};
    use sportnexus_db::{seed, MemoryStore, NotificationBus};
    use tower::ServiceExt;

    use super::*;

    async fn app() -> (Router, Arc<JwtKeys>, Marketplace) {
        let bus = NotificationBus::new();
        let store = MemoryStore::new(bus.clone());
        seed::load_demo(&store).await.unwrap();
        let market = Marketplace::new(Arc::new(store), bus);
        let keys = Arc::new(JwtKeys::new("test-secret"));
        let state = AppState { market: market.clone(), keys: Arc::clone(&keys) };
        (router(state), keys, market)
    }

    fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { serde_json::Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, value)
    }

    #[tokio::test]
    async fn health_reports_version() {
        let (app, _, _) = app().await;
        let (status, body) = send(&app, request(Method::GET, "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn venues_are_public_and_filterable() {
        let (app, _, _) = app().await;
        let (status, body) = send(&app, request(Method::GET, "/api/venues?sport=tennis", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["name"], "Riverside Tennis Club");

        let missing = format!("/api/venues/{}", Uuid::new_v4());
        let (status, body) = send(&app, request(Method::GET, &missing, None, None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn booking_requires_a_valid_token_and_conflicts_map_to_409() {
        let (app, keys, market) = app().await;
        let venue = market.list_venues(&VenueFilter::default()).await.unwrap().remove(0);
        let date = Utc::now().date_naive() + Days::new(7);
        let payload = json!({
            "venue_id": venue.id,
            "booking_date": date,
            "start_time": "14:00:00",
            "end_time": "16:00:00",
        });

        let (status, body) = send(&app, request(Method::POST, "/api/bookings", None, Some(payload.clone()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["code"], "LOGIN_REQUIRED");

        let (status, _) = send(&app, request(Method::POST, "/api/bookings", Some("garbage"), Some(payload.clone()))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let token = keys.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let (status, body) = send(&app, request(Method::POST, "/api/bookings", Some(&token), Some(payload.clone()))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["status"], "pending");
        assert_eq!(body["total_price"], 2.0 * venue.hourly_price);

        let other = keys.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let (status, body) = send(&app, request(Method::POST, "/api/bookings", Some(&other), Some(payload))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "CONFLICT");

        let uri = format!("/api/venues/{}/availability?date={date}", venue.id);
        let (status, body) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["start"], "14:00:00");
    }

    #[tokio::test]
    async fn rental_quote_and_stock_errors() {
        let (app, keys, market) = app().await;
        let filter = EquipmentFilter { search: Some("bike".into()), ..Default::default() };
        let bike = market.list_equipment(&filter).await.unwrap().remove(0);
        let start = Utc::now().date_naive() + Days::new(1);
        let end = start + Days::new(2);

        let uri = format!("/api/equipment/{}/quote?start_date={start}&end_date={end}&quantity=1", bike.id);
        let (status, quote) = send(&app, request(Method::GET, &uri, None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(quote["days"], 3);
        assert_eq!(quote["total_price"], 3.0 * bike.daily_price);

        let token = keys.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();
        let payload = json!({
            "equipment_id": bike.id,
            "start_date": start,
            "end_date": end,
            "quantity": bike.total_quantity + 1,
        });
        let (status, body) = send(&app, request(Method::POST, "/api/rentals", Some(&token), Some(payload))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_STOCK");
    }

    #[tokio::test]
    async fn progress_endpoints_walk_a_tutorial() {
        let (app, keys, market) = app().await;
        let tutorial = market.list_tutorials(&TutorialFilter::default()).await.unwrap().remove(0);
        let lessons = market.list_lessons(tutorial.id).await.unwrap();
        let token = keys.issue(Uuid::new_v4(), Duration::hours(1)).unwrap();

        let base = format!("/api/tutorials/{}/progress", tutorial.id);
        let (status, body) = send(&app, request(Method::GET, &base, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["progress"]["progress"], "not_started");

        let (_, body) = send(&app, request(Method::POST, &format!("{base}/next"), Some(&token), None)).await;
        assert_eq!(body["moved"], true);
        assert_eq!(body["progress"]["progress"], "in_progress");

        let last = lessons.last().unwrap().id;
        let (_, body) = send(
            &app,
            request(Method::POST, &format!("{base}/complete"), Some(&token), Some(json!({ "lesson_id": last }))),
        )
        .await;
        assert_eq!(body["progress"]["progress"], "completed");
        assert_eq!(body["progress"]["certificate_issued"], true);

        let (status, _) = send(&app, request(Method::GET, &base, None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn notifications_can_be_cleared() {
        let (app, keys, market) = app().await;
        let user = Uuid::new_v4();
        let token = keys.issue(user, Duration::hours(1)).unwrap();
        let venue = market.list_venues(&VenueFilter::default()).await.unwrap().remove(0);
        let session = sportnexus_marketplace::Session::user(user);
        let request_body = BookingRequest {
            venue_id: venue.id,
            booking_date: Utc::now().date_naive() + Days::new(3),
            start_time: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end_time: chrono::NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            notes: None,
        };
        let booking = market.check_and_create_booking(&session, request_body).await.unwrap();

        let uri = format!("/api/bookings/{}/pay", booking.id);
        let (status, body) = send(&app, request(Method::POST, &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payment_status"], "paid");

        let (_, list) = send(&app, request(Method::GET, "/api/notifications", Some(&token), None)).await;
        assert_eq!(list.as_array().unwrap().len(), 2);

        let (_, body) = send(&app, request(Method::POST, "/api/notifications/read-all", Some(&token), None)).await;
        assert_eq!(body["updated"], 2);
        let (_, body) = send(&app, request(Method::POST, "/api/notifications/read-all", Some(&token), None)).await;
        assert_eq!(body["updated"], 0);
    }
}
