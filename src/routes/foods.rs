use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    middleware,
    routing::{get, post, put},
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::{AppError, AppResult},
    models::{AddFoodRequest, Food, UpdateFoodRequest, parse_object_id},
    routes::{
        auth::require_session,
        common::{Payload, QueryParams},
    },
    session::SessionClaims,
    state::AppState,
    store::{InsertOutcome, TOP_FOODS_LIMIT, UpdateOutcome},
};

#[derive(Deserialize)]
struct OwnerQuery {
    email: Option<String>,
}

// GET /foods
async fn list_foods(State(state): State<AppState>) -> AppResult<Json<Vec<Food>>> {
    Ok(Json(state.store.all_foods().await?))
}

// GET /foods/{id}
async fn get_food(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<Option<Food>>> {
    let id = parse_object_id(&id)?;
    Ok(Json(state.store.food_by_id(id).await?))
}

// GET /topFoods
async fn top_foods(State(state): State<AppState>) -> AppResult<Json<Vec<Food>>> {
    Ok(Json(state.store.top_foods(TOP_FOODS_LIMIT).await?))
}

// GET /myFoods?email=
async fn my_foods(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    QueryParams(query): QueryParams<OwnerQuery>,
) -> AppResult<Json<Vec<Food>>> {
    let email = query
        .email
        .filter(|e| !e.is_empty())
        .ok_or_else(|| AppError::Validation("email query parameter required".to_string()))?;
    if claims.email() != Some(email.as_str()) {
        return Err(AppError::Forbidden);
    }
    Ok(Json(state.store.foods_by_owner(&email).await?))
}

// POST /addFood
async fn add_food(
    State(state): State<AppState>,
    Payload(request): Payload<AddFoodRequest>,
) -> AppResult<Json<InsertOutcome>> {
    let food = request.validate()?;
    let outcome = state.store.insert_food(food).await?;
    info!(food_id = %outcome.inserted_id, "food added");
    Ok(Json(outcome))
}

// PUT /updateFood/{id}
async fn update_food(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Payload(request): Payload<UpdateFoodRequest>,
) -> AppResult<Json<UpdateOutcome>> {
    let id = parse_object_id(&id)?;
    let update = request.validate()?;
    let outcome = state.store.update_food(id, update).await?;
    info!(
        food_id = %id,
        matched = outcome.matched_count,
        modified = outcome.modified_count,
        "food updated"
    );
    Ok(Json(outcome))
}

pub fn foods_router(state: AppState) -> Router {
    let gated = Router::new()
        .route("/myFoods", get(my_foods))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/foods", get(list_foods))
        .route("/foods/{id}", get(get_food))
        .route("/topFoods", get(top_foods))
        .route("/addFood", post(add_food))
        .route("/updateFood/{id}", put(update_food))
        .merge(gated)
        .with_state(state)
}
