use axum::{
    Json, Router,
    extract::{Path, State},
    response::Response,
    routing::{delete, get, post},
};
use tracing::{error, info};

use crate::{
    error::{AppError, AppResult},
    models::{Purchase, PurchaseRequest, parse_object_id},
    routes::common::{Payload, message_response},
    state::AppState,
    store::{DeleteOutcome, PurchaseOutcome},
};

// POST /purchaseFood
async fn purchase_food(
    State(state): State<AppState>,
    Payload(request): Payload<PurchaseRequest>,
) -> AppResult<Response> {
    let purchase = request.validate()?;
    let food_id = purchase.food_id;

    match state.store.record_purchase(purchase).await {
        Ok(PurchaseOutcome::Recorded { purchase_id }) => {
            info!(%food_id, %purchase_id, "purchase recorded");
            Ok(message_response("Purchase successful"))
        }
        Ok(PurchaseOutcome::FoodNotFound) => Err(AppError::PurchaseFailed),
        Err(e) => {
            error!(%food_id, error = %e, "purchase transaction failed");
            Err(AppError::PurchaseFailed)
        }
    }
}

// GET /myOrders/{email}
async fn my_orders(
    Path(email): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<Purchase>>> {
    Ok(Json(state.store.purchases_by_buyer(&email).await?))
}

// DELETE /deleteOrder/{orderId}
async fn delete_order(
    Path(order_id): Path<String>,
    State(state): State<AppState>,
) -> AppResult<Json<DeleteOutcome>> {
    let id = parse_object_id(&order_id)?;
    let outcome = state.store.delete_purchase(id).await?;
    info!(order_id = %id, deleted = outcome.deleted_count, "order delete");
    Ok(Json(outcome))
}

pub fn purchases_router(state: AppState) -> Router {
    Router::new()
        .route("/purchaseFood", post(purchase_food))
        .route("/myOrders/{email}", get(my_orders))
        .route("/deleteOrder/{orderId}", delete(delete_order))
        .with_state(state)
}
