use async_trait::async_trait;
use futures::stream::TryStreamExt;
use mongodb::{
    Client, Collection, Cursor,
    bson::{self, Document, doc, oid::ObjectId},
    options::{ClientOptions, ServerApi, ServerApiVersion},
};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use super::{
    DeleteOutcome, FOODS_COLLECTION, FoodStore, InsertOutcome, PURCHASES_COLLECTION,
    PurchaseOutcome, StoreError, UpdateOutcome,
};
use crate::models::{Food, FoodUpdate, NewFood, NewPurchase, Purchase};

/// MongoDB backend. One client is shared by every request; the driver pools
/// connections underneath it.
pub struct MongoStore {
    client: Client,
    foods: Collection<Document>,
    purchases: Collection<Document>,
}

impl MongoStore {
    pub async fn connect(uri: &str, db_name: &str) -> Result<Self, StoreError> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("foodhive-server".to_string());
        options.server_api = Some(
            ServerApi::builder()
                .version(ServerApiVersion::V1)
                .strict(true)
                .deprecation_errors(true)
                .build(),
        );

        let client = Client::with_options(options)?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;
        info!(database = db_name, "connected to MongoDB");

        let db = client.database(db_name);
        Ok(Self {
            foods: db.collection::<Document>(FOODS_COLLECTION),
            purchases: db.collection::<Document>(PURCHASES_COLLECTION),
            client,
        })
    }
}

async fn collect<T: DeserializeOwned>(mut cursor: Cursor<Document>) -> Result<Vec<T>, StoreError> {
    let mut results = Vec::new();
    while let Some(doc) = cursor.try_next().await? {
        results.push(bson::from_document(doc)?);
    }
    Ok(results)
}

#[async_trait]
impl FoodStore for MongoStore {
    async fn all_foods(&self) -> Result<Vec<Food>, StoreError> {
        let cursor = self.foods.find(doc! {}).await?;
        collect(cursor).await
    }

    async fn food_by_id(&self, id: ObjectId) -> Result<Option<Food>, StoreError> {
        match self.foods.find_one(doc! { "_id": id }).await? {
            Some(doc) => Ok(Some(bson::from_document(doc)?)),
            None => Ok(None),
        }
    }

    async fn top_foods(&self, limit: i64) -> Result<Vec<Food>, StoreError> {
        let cursor = self
            .foods
            .find(doc! {})
            .sort(doc! { "purchaseCount": -1 })
            .limit(limit)
            .await?;
        collect(cursor).await
    }

    async fn foods_by_owner(&self, email: &str) -> Result<Vec<Food>, StoreError> {
        let cursor = self.foods.find(doc! { "addedBy.email": email }).await?;
        collect(cursor).await
    }

    async fn insert_food(&self, food: NewFood) -> Result<InsertOutcome, StoreError> {
        let id = ObjectId::new();
        self.foods.insert_one(food.to_document(id)).await?;
        Ok(InsertOutcome {
            acknowledged: true,
            inserted_id: id,
        })
    }

    async fn update_food(
        &self,
        id: ObjectId,
        update: FoodUpdate,
    ) -> Result<UpdateOutcome, StoreError> {
        let result = self
            .foods
            .update_one(doc! { "_id": id }, doc! { "$set": update.to_document() })
            .await?;
        Ok(UpdateOutcome {
            acknowledged: true,
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_id: result.upserted_id.and_then(|b| b.as_object_id()),
        })
    }

    async fn record_purchase(&self, purchase: NewPurchase) -> Result<PurchaseOutcome, StoreError> {
        // Dropping the session mid-transaction aborts it, so any `?` below
        // leaves neither write behind.
        let mut session = self.client.start_session().await?;
        session.start_transaction().await?;

        let purchase_id = ObjectId::new();
        self.purchases
            .insert_one(purchase.to_document(purchase_id))
            .session(&mut session)
            .await?;

        let bumped = self
            .foods
            .update_one(
                doc! { "_id": purchase.food_id },
                doc! { "$inc": { "purchaseCount": 1 } },
            )
            .session(&mut session)
            .await?;

        if bumped.modified_count == 0 {
            warn!(food_id = %purchase.food_id, "purchase for unknown food, rolling back");
            session.abort_transaction().await?;
            return Ok(PurchaseOutcome::FoodNotFound);
        }

        session.commit_transaction().await?;
        Ok(PurchaseOutcome::Recorded { purchase_id })
    }

    async fn purchases_by_buyer(&self, email: &str) -> Result<Vec<Purchase>, StoreError> {
        let cursor = self.purchases.find(doc! { "buyerEmail": email }).await?;
        collect(cursor).await
    }

    async fn delete_purchase(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        let result = self.purchases.delete_one(doc! { "_id": id }).await?;
        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count: result.deleted_count,
        })
    }

    async fn shutdown(&self) {
        info!("closing MongoDB client");
        self.client.clone().shutdown().await;
    }
}
