use axum::Router;

use crate::state::AppState;

// api routes all import here
mod auth;
mod common;
mod foods;
mod purchases;

pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(foods::foods_router(state.clone()))
        .merge(purchases::purchases_router(state.clone()))
        .merge(auth::auth_router(state))
}
