//! HTTP request handlers.

use crate::auth::{Actor, Role};
use crate::db::{self, Book, Offer, ReadingProgress, SellPost};
use crate::error::{AppError, Result};
use crate::marketplace::{PostStatus, SellerAction};
use crate::reading::{DailyPages, HeatmapDay, ProgressReport, ReadingStats, WeeklyPages};
use crate::server::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================================
// AUTH API
// ============================================================================

/// Login or registration request.
#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    username: String,
    password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    token: String,
    user_id: String,
    username: String,
    role: Role,
}

/// Auth login.
pub async fn auth_login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<LoginResponse>> {
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok(Json(LoginResponse {
        token,
        user_id: user.id,
        username: user.username,
        role: user.role,
    }))
}

/// Auth register.
pub async fn auth_register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<(StatusCode, Json<LoginResponse>)> {
    state.auth.register(&req.username, &req.password)?;
    let (user, token) = state.auth.login(&req.username, &req.password)?;

    Ok((
        StatusCode::CREATED,
        Json(LoginResponse {
            token,
            user_id: user.id,
            username: user.username,
            role: user.role,
        }),
    ))
}

/// Auth logout.
pub async fn auth_logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = extract_token(&headers) {
        state.auth.logout(&token)?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Get current user info.
pub async fn auth_me(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<db::User>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(user))
}

// ============================================================================
// BOOKS API
// ============================================================================

/// New catalog book.
#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    title: String,
    author: Option<String>,
    page_count: Option<i64>,
}

/// Add a catalog book. Admin only.
pub async fn create_book(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<Book>)> {
    let actor = get_actor(&state, &headers)?;
    if actor.role != Role::Admin {
        return Err(AppError::Forbidden("Only admins can add books".to_string()));
    }

    let book = Book::new(&req.title, req.author, req.page_count)?;
    state.db.run(|s| s.create_book(&book))?;
    tracing::info!(book_id = %book.id, title = %book.title, "Book added");

    Ok((StatusCode::CREATED, Json(book)))
}

/// List catalog books.
pub async fn list_books(State(state): State<AppState>) -> Result<Json<Vec<Book>>> {
    Ok(Json(state.db.run(|s| s.list_books())?))
}

/// Get one catalog book.
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Book>> {
    let book = state
        .db
        .run(|s| s.get_book(&id))?
        .ok_or_else(|| AppError::NotFound(format!("Book not found: {}", id)))?;
    Ok(Json(book))
}

// ============================================================================
// MARKETPLACE API
// ============================================================================

/// New listing.
#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    title: String,
    price_cents: i64,
    book_id: Option<String>,
}

/// Listing status change.
#[derive(Debug, Deserialize)]
pub struct UpdatePostStatusRequest {
    status: PostStatus,
}

/// New offer.
#[derive(Debug, Deserialize)]
pub struct CreateOfferRequest {
    price_cents: i64,
    message: Option<String>,
}

/// Seller response.
#[derive(Debug, Deserialize)]
pub struct RespondRequest {
    action: SellerAction,
    counter_price_cents: Option<i64>,
    message: Option<String>,
}

/// Buyer counter.
#[derive(Debug, Deserialize)]
pub struct CounterBackRequest {
    price_cents: i64,
}

/// Create a listing.
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<SellPost>)> {
    let actor = get_actor(&state, &headers)?;
    let post = state.marketplace.create_post(
        &actor,
        &req.title,
        req.price_cents,
        req.book_id.as_deref(),
    )?;
    Ok((StatusCode::CREATED, Json(post)))
}

/// Listings open for offers.
pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<SellPost>>> {
    Ok(Json(state.marketplace.list_available_posts()?))
}

/// Get one listing.
pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SellPost>> {
    Ok(Json(state.marketplace.get_post(&id)?))
}

/// Change a listing's status.
pub async fn update_post_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<UpdatePostStatusRequest>,
) -> Result<Json<SellPost>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(
        state.marketplace.update_post_status(&id, &actor, req.status)?,
    ))
}

/// Offers on a listing (seller or admin).
pub async fn list_post_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Vec<Offer>>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(state.marketplace.list_post_offers(&id, &actor)?))
}

/// Make an offer on a listing.
pub async fn create_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CreateOfferRequest>,
) -> Result<(StatusCode, Json<Offer>)> {
    let actor = get_actor(&state, &headers)?;
    let offer = state
        .marketplace
        .create_offer(&actor, &id, req.price_cents, req.message)?;
    Ok((StatusCode::CREATED, Json(offer)))
}

/// Offers made by the caller.
pub async fn list_my_offers(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<Offer>>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(state.marketplace.list_buyer_offers(&actor)?))
}

/// Get one offer.
pub async fn get_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Offer>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(state.marketplace.get_offer(&id, &actor)?))
}

/// Seller accepts, rejects or counters.
pub async fn respond_to_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<RespondRequest>,
) -> Result<Json<Offer>> {
    let actor = get_actor(&state, &headers)?;
    let offer = state.marketplace.respond_to_offer(
        &id,
        &actor,
        req.action,
        req.counter_price_cents,
        req.message,
    )?;
    Ok(Json(offer))
}

/// Buyer accepts a counter.
pub async fn accept_counter(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Offer>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(state.marketplace.accept_counter(&id, &actor)?))
}

/// Buyer counters a counter.
pub async fn counter_back(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(req): Json<CounterBackRequest>,
) -> Result<Json<Offer>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(
        state.marketplace.counter_back(&id, &actor, req.price_cents)?,
    ))
}

/// Buyer withdraws.
pub async fn withdraw_offer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Offer>> {
    let actor = get_actor(&state, &headers)?;
    Ok(Json(state.marketplace.withdraw_offer(&id, &actor)?))
}

// ============================================================================
// PROGRESS API
// ============================================================================

/// Result of a progress report.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    progress: ReadingProgress,
    /// Pages logged to history by this report, if a row was written.
    pages_read: Option<i64>,
}

/// Heatmap window.
#[derive(Debug, Deserialize)]
pub struct HeatmapQuery {
    #[serde(default = "default_heatmap_days")]
    days: u32,
}

fn default_heatmap_days() -> u32 {
    30
}

/// Record reading progress.
pub async fn record_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
    Json(report): Json<ProgressReport>,
) -> Result<Json<ProgressResponse>> {
    let user = get_authenticated_user(&state, &headers)?;
    let write = state.reading.record_progress(&user.id, &book_id, &report)?;

    Ok(Json(ProgressResponse {
        pages_read: write.history.map(|h| h.pages_read),
        progress: write.progress,
    }))
}

/// Get reading progress.
pub async fn get_progress(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<Option<ReadingProgress>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.reading.get_progress(&user.id, &book_id)?))
}

/// Reading heatmap.
pub async fn progress_heatmap(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
    Query(query): Query<HeatmapQuery>,
) -> Result<Json<Vec<HeatmapDay>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.reading.get_heatmap(&user.id, &book_id, query.days)?))
}

/// Pages per day.
pub async fn progress_daily(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<DailyPages>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.reading.get_pages_per_day(&user.id, &book_id)?))
}

/// Pages per week.
pub async fn progress_weekly(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<Vec<WeeklyPages>>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.reading.get_pages_per_week(&user.id, &book_id)?))
}

/// Reading totals.
pub async fn progress_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(book_id): Path<String>,
) -> Result<Json<ReadingStats>> {
    let user = get_authenticated_user(&state, &headers)?;
    Ok(Json(state.reading.get_stats(&user.id, &book_id)?))
}

// ============================================================================
// HELPERS
// ============================================================================

/// Extract token from Authorization header.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Get authenticated user from token.
fn get_authenticated_user(state: &AppState, headers: &HeaderMap) -> Result<db::User> {
    let token = extract_token(headers)
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".to_string()))?;

    state
        .auth
        .validate_token(&token)?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired token".to_string()))
}

fn get_actor(state: &AppState, headers: &HeaderMap) -> Result<Actor> {
    get_authenticated_user(state, headers).map(|user| Actor::from(&user))
}
