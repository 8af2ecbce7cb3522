// Export route modules
pub mod chat;
pub mod health;

use crate::state::AppState;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(chat::routes(state))
        .merge(health::routes())
        .layer(cors)
}
