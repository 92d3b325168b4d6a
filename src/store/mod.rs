//! Document store seam.
//!
//! Handlers only ever talk to [`FoodStore`]. `MongoStore` is the production
//! backend; `MemoryStore` backs the tests and `--store memory` runs.

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Food, FoodUpdate, NewFood, NewPurchase, Purchase, hex_id, hex_id_opt};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

pub const FOODS_COLLECTION: &str = "foods";
pub const PURCHASES_COLLECTION: &str = "purchases";
pub const TOP_FOODS_LIMIT: i64 = 8;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Mongo(#[from] mongodb::error::Error),

    #[error("malformed document: {0}")]
    Decode(#[from] mongodb::bson::de::Error),

    #[error("purchaseCount overflow on food {0}")]
    CounterOverflow(ObjectId),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOutcome {
    pub acknowledged: bool,
    #[serde(serialize_with = "hex_id")]
    pub inserted_id: ObjectId,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub acknowledged: bool,
    pub matched_count: u64,
    pub modified_count: u64,
    #[serde(serialize_with = "hex_id_opt")]
    pub upserted_id: Option<ObjectId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub acknowledged: bool,
    pub deleted_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PurchaseOutcome {
    Recorded { purchase_id: ObjectId },
    /// The referenced food does not exist; nothing was written.
    FoodNotFound,
}

#[async_trait]
pub trait FoodStore: Send + Sync {
    async fn all_foods(&self) -> Result<Vec<Food>, StoreError>;

    async fn food_by_id(&self, id: ObjectId) -> Result<Option<Food>, StoreError>;

    /// Foods ordered by `purchaseCount` descending, at most `limit` of them.
    async fn top_foods(&self, limit: i64) -> Result<Vec<Food>, StoreError>;

    async fn foods_by_owner(&self, email: &str) -> Result<Vec<Food>, StoreError>;

    async fn insert_food(&self, food: NewFood) -> Result<InsertOutcome, StoreError>;

    async fn update_food(&self, id: ObjectId, update: FoodUpdate)
    -> Result<UpdateOutcome, StoreError>;

    /// Inserts the purchase and bumps the food's `purchaseCount` as one unit.
    async fn record_purchase(&self, purchase: NewPurchase) -> Result<PurchaseOutcome, StoreError>;

    async fn purchases_by_buyer(&self, email: &str) -> Result<Vec<Purchase>, StoreError>;

    async fn delete_purchase(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError>;

    async fn shutdown(&self) {}
}
