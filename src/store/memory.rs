use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{DeleteOutcome, FoodStore, InsertOutcome, PurchaseOutcome, StoreError, UpdateOutcome};
use crate::models::{Food, FoodUpdate, NewFood, NewPurchase, Purchase};

#[derive(Debug, Default)]
struct Collections {
    foods: Vec<Food>,
    purchases: Vec<Purchase>,
}

/// In-process store with the same observable behaviour as `MongoStore`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FoodStore for MemoryStore {
    async fn all_foods(&self) -> Result<Vec<Food>, StoreError> {
        Ok(self.inner.read().await.foods.clone())
    }

    async fn food_by_id(&self, id: ObjectId) -> Result<Option<Food>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner.foods.iter().find(|f| f.id == id).cloned())
    }

    async fn top_foods(&self, limit: i64) -> Result<Vec<Food>, StoreError> {
        let mut foods = self.inner.read().await.foods.clone();
        foods.sort_by(|a, b| b.purchase_count.cmp(&a.purchase_count));
        foods.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(foods)
    }

    async fn foods_by_owner(&self, email: &str) -> Result<Vec<Food>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .foods
            .iter()
            .filter(|f| f.added_by.email == email)
            .cloned()
            .collect())
    }

    async fn insert_food(&self, food: NewFood) -> Result<InsertOutcome, StoreError> {
        let id = ObjectId::new();
        self.inner.write().await.foods.push(food.into_food(id));
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
        let mut inner = self.inner.write().await;
        let (matched, modified) = match inner.foods.iter_mut().find(|f| f.id == id) {
            Some(food) => (1, u64::from(update.apply(food))),
            None => (0, 0),
        };
        Ok(UpdateOutcome {
            acknowledged: true,
            matched_count: matched,
            modified_count: modified,
            upserted_id: None,
        })
    }

    async fn record_purchase(&self, purchase: NewPurchase) -> Result<PurchaseOutcome, StoreError> {
        // both steps under one write lock
        let mut inner = self.inner.write().await;
        let Some(food) = inner.foods.iter_mut().find(|f| f.id == purchase.food_id) else {
            return Ok(PurchaseOutcome::FoodNotFound);
        };
        food.purchase_count = food
            .purchase_count
            .checked_add(1)
            .ok_or(StoreError::CounterOverflow(purchase.food_id))?;

        let purchase_id = ObjectId::new();
        inner.purchases.push(purchase.into_purchase(purchase_id));
        Ok(PurchaseOutcome::Recorded { purchase_id })
    }

    async fn purchases_by_buyer(&self, email: &str) -> Result<Vec<Purchase>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .purchases
            .iter()
            .filter(|p| p.buyer_email == email)
            .cloned()
            .collect())
    }

    async fn delete_purchase(&self, id: ObjectId) -> Result<DeleteOutcome, StoreError> {
        let mut inner = self.inner.write().await;
        let before = inner.purchases.len();
        if let Some(pos) = inner.purchases.iter().position(|p| p.id == id) {
            inner.purchases.remove(pos);
        }
        Ok(DeleteOutcome {
            acknowledged: true,
            deleted_count: (before - inner.purchases.len()) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AddedBy;

    fn food(name: &str, owner: &str, purchase_count: i64) -> NewFood {
        NewFood {
            name: name.to_string(),
            category: "Mains".to_string(),
            image: String::new(),
            price: 10.0,
            quantity: 5,
            description: String::new(),
            short_description: String::new(),
            purchase_count,
            food_origin: "Italy".to_string(),
            added_by: AddedBy {
                name: "Owner".to_string(),
                email: owner.to_string(),
            },
        }
    }

    fn purchase(food_id: ObjectId, buyer: &str) -> NewPurchase {
        NewPurchase {
            food_id,
            food_name: "Lasagna".to_string(),
            buyer_name: "Buyer".to_string(),
            buyer_email: buyer.to_string(),
            quantity: 1,
            price: 10.0,
            buying_date: "2024-05-01".to_string(),
            food_img: String::new(),
        }
    }

    #[tokio::test]
    async fn purchase_bumps_counter_and_records_order() {
        let store = MemoryStore::new();
        let food_id = store
            .insert_food(food("Lasagna", "a@example.com", 0))
            .await
            .unwrap()
            .inserted_id;

        let outcome = store
            .record_purchase(purchase(food_id, "b@example.com"))
            .await
            .unwrap();
        assert!(matches!(outcome, PurchaseOutcome::Recorded { .. }));

        let stored = store.food_by_id(food_id).await.unwrap().unwrap();
        assert_eq!(stored.purchase_count, 1);
        let orders = store.purchases_by_buyer("b@example.com").await.unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].food_id, food_id);
    }

    #[tokio::test]
    async fn purchase_of_unknown_food_writes_nothing() {
        let store = MemoryStore::new();
        let outcome = store
            .record_purchase(purchase(ObjectId::new(), "b@example.com"))
            .await
            .unwrap();
        assert_eq!(outcome, PurchaseOutcome::FoodNotFound);
        assert!(
            store
                .purchases_by_buyer("b@example.com")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn saturated_counter_fails_without_recording() {
        let store = MemoryStore::new();
        let food_id = store
            .insert_food(food("Lasagna", "a@example.com", i64::MAX))
            .await
            .unwrap()
            .inserted_id;

        let result = store
            .record_purchase(purchase(food_id, "b@example.com"))
            .await;
        assert!(matches!(result, Err(StoreError::CounterOverflow(id)) if id == food_id));

        let stored = store.food_by_id(food_id).await.unwrap().unwrap();
        assert_eq!(stored.purchase_count, i64::MAX);
        assert!(
            store
                .purchases_by_buyer("b@example.com")
                .await
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn top_foods_sorts_and_limits() {
        let store = MemoryStore::new();
        for count in 0..10 {
            store
                .insert_food(food(&format!("dish-{count}"), "a@example.com", count))
                .await
                .unwrap();
        }
        let top = store.top_foods(8).await.unwrap();
        assert_eq!(top.len(), 8);
        assert_eq!(top[0].purchase_count, 9);
        assert!(
            top.windows(2)
                .all(|w| w[0].purchase_count >= w[1].purchase_count)
        );
    }

    #[tokio::test]
    async fn update_of_missing_food_matches_nothing() {
        let store = MemoryStore::new();
        let outcome = store
            .update_food(
                ObjectId::new(),
                FoodUpdate {
                    price: Some(1.0),
                    ..FoodUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(outcome.matched_count, 0);
        assert_eq!(outcome.modified_count, 0);
    }

    #[tokio::test]
    async fn delete_twice_reports_zero_the_second_time() {
        let store = MemoryStore::new();
        let food_id = store
            .insert_food(food("Lasagna", "a@example.com", 0))
            .await
            .unwrap()
            .inserted_id;
        let PurchaseOutcome::Recorded { purchase_id } = store
            .record_purchase(purchase(food_id, "b@example.com"))
            .await
            .unwrap()
        else {
            panic!("purchase was not recorded");
        };

        assert_eq!(
            store.delete_purchase(purchase_id).await.unwrap().deleted_count,
            1
        );
        assert_eq!(
            store.delete_purchase(purchase_id).await.unwrap().deleted_count,
            0
        );
    }
}
