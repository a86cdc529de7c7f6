//! HTTP server and routes.

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/login", post(handlers::auth_login))
        .route("/register", post(handlers::auth_register))
        .route("/logout", post(handlers::auth_logout))
        .route("/me", get(handlers::auth_me));

    let book_routes = Router::new()
        .route("/", get(handlers::list_books).post(handlers::create_book))
        .route("/{id}", get(handlers::get_book));

    let post_routes = Router::new()
        .route("/", get(handlers::list_posts).post(handlers::create_post))
        .route("/{id}", get(handlers::get_post))
        .route("/{id}/status", put(handlers::update_post_status))
        .route(
            "/{id}/offers",
            get(handlers::list_post_offers).post(handlers::create_offer),
        );

    let offer_routes = Router::new()
        .route("/", get(handlers::list_my_offers))
        .route("/{id}", get(handlers::get_offer))
        .route("/{id}/respond", post(handlers::respond_to_offer))
        .route("/{id}/accept", post(handlers::accept_counter))
        .route("/{id}/counter", post(handlers::counter_back))
        .route("/{id}/withdraw", post(handlers::withdraw_offer));

    let progress_routes = Router::new()
        .route(
            "/{book_id}",
            get(handlers::get_progress).put(handlers::record_progress),
        )
        .route("/{book_id}/heatmap", get(handlers::progress_heatmap))
        .route("/{book_id}/daily", get(handlers::progress_daily))
        .route("/{book_id}/weekly", get(handlers::progress_weekly))
        .route("/{book_id}/stats", get(handlers::progress_stats));

    Router::new()
        .route("/health", get(handlers::health))
        .nest("/api/auth", auth_routes)
        .nest("/api/books", book_routes)
        .nest("/api/posts", post_routes)
        .nest("/api/offers", offer_routes)
        .nest("/api/progress", progress_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
