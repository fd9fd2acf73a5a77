use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod admin;
pub mod auth;
pub mod bookings;
pub mod error;
pub mod lots;
pub mod middleware;
pub mod payments;
pub mod state;

pub use state::AppState;

pub fn app(state: AppState) -> Router {
    // CORS Middleware
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
        ]);

    // Admin surface, gated by the bearer-token middleware. Merging with the
    // public routers below is per-method, so GET /v1/lots stays open while
    // POST /v1/lots requires a token.
    let admin_router = Router::new()
        .merge(lots::admin_routes())
        .merge(bookings::admin_routes())
        .merge(admin::routes())
        .merge(payments::routes())
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::admin_auth_middleware,
        ));

    Router::new()
        .merge(auth::routes())
        .merge(lots::routes())
        .merge(bookings::routes())
        .merge(admin_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
