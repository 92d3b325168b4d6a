use mongodb::bson::{Bson, Document, doc, oid::ObjectId};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::AppError;

/// Serializes ObjectIds as plain 24-char hex strings in JSON responses.
pub(crate) fn hex_id<S: Serializer>(id: &ObjectId, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&id.to_hex())
}

pub(crate) fn hex_id_opt<S: Serializer>(
    id: &Option<ObjectId>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match id {
        Some(oid) => serializer.serialize_str(&oid.to_hex()),
        None => serializer.serialize_none(),
    }
}

fn whole_to_i64(v: f64) -> Option<i64> {
    (v.is_finite() && v >= i64::MIN as f64 && v < i64::MAX as f64).then(|| v.trunc() as i64)
}

/// Stored counts may be Int32, Int64, Double (even NaN) or a string; anything
/// unreadable decodes as 0 instead of failing the whole query.
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    Ok(match Bson::deserialize(deserializer)? {
        Bson::Int32(v) => i64::from(v),
        Bson::Int64(v) => v,
        Bson::Double(v) => whole_to_i64(v).unwrap_or(0),
        Bson::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(whole_to_i64))
                .unwrap_or(0)
        }
        _ => 0,
    })
}

fn lenient_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = match Bson::deserialize(deserializer)? {
        Bson::Int32(v) => f64::from(v),
        Bson::Int64(v) => v as f64,
        Bson::Double(v) => v,
        Bson::String(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddedBy {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Food {
    #[serde(rename = "_id", serialize_with = "hex_id")]
    pub id: ObjectId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: i64,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub purchase_count: i64,
    #[serde(default)]
    pub food_origin: String,
    #[serde(default)]
    pub added_by: AddedBy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Purchase {
    #[serde(rename = "_id", serialize_with = "hex_id")]
    pub id: ObjectId,
    #[serde(serialize_with = "hex_id")]
    pub food_id: ObjectId,
    #[serde(default)]
    pub food_name: String,
    #[serde(default)]
    pub buyer_name: String,
    #[serde(default)]
    pub buyer_email: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: f64,
    #[serde(default)]
    pub buying_date: String,
    #[serde(default)]
    pub food_img: String,
}

/// A number that clients may send either as JSON number or as a numeric string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Numeric {
    Number(serde_json::Number),
    Text(String),
}

impl Numeric {
    pub fn to_decimal(&self, field: &str) -> Result<f64, AppError> {
        let value = match self {
            Numeric::Number(n) => n.as_f64(),
            Numeric::Text(s) => s.trim().parse::<f64>().ok(),
        };
        value
            .filter(|v| v.is_finite())
            .ok_or_else(|| AppError::Validation(format!("{field} must be a number")))
    }

    pub fn to_integer(&self, field: &str) -> Result<i64, AppError> {
        let invalid = || AppError::Validation(format!("{field} must be an integer"));
        match self {
            Numeric::Number(n) => match n.as_i64() {
                Some(v) => Ok(v),
                None => n
                    .as_f64()
                    // i64::MAX as f64 rounds up to 2^63, hence the strict bound
                    .filter(|v| {
                        v.fract() == 0.0 && *v >= i64::MIN as f64 && *v < i64::MAX as f64
                    })
                    .map(|v| v as i64)
                    .ok_or_else(invalid),
            },
            Numeric::Text(s) => s.trim().parse::<i64>().map_err(|_| invalid()),
        }
    }
}

fn require<T>(value: Option<T>, field: &'static str, missing: &mut Vec<&'static str>) -> T
where
    T: Default,
{
    value.unwrap_or_else(|| {
        missing.push(field);
        T::default()
    })
}

fn missing_fields(missing: Vec<&'static str>) -> Result<(), AppError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "missing fields: {}",
            missing.join(", ")
        )))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AddedByInput {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddFoodRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub price: Option<Numeric>,
    pub quantity: Option<Numeric>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub purchase_count: Option<Numeric>,
    pub food_origin: Option<String>,
    pub added_by: Option<AddedByInput>,
}

/// A food that passed validation and is ready to be inserted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFood {
    pub name: String,
    pub category: String,
    pub image: String,
    pub price: f64,
    pub quantity: i64,
    pub description: String,
    pub short_description: String,
    pub purchase_count: i64,
    pub food_origin: String,
    pub added_by: AddedBy,
}

impl AddFoodRequest {
    pub fn validate(self) -> Result<NewFood, AppError> {
        let mut missing = Vec::new();
        let name = require(self.name, "name", &mut missing);
        let category = require(self.category, "category", &mut missing);
        let image = require(self.image, "image", &mut missing);
        let description = require(self.description, "description", &mut missing);
        let short_description = require(self.short_description, "shortDescription", &mut missing);
        let food_origin = require(self.food_origin, "foodOrigin", &mut missing);
        let added_by = self.added_by.unwrap_or_else(|| {
            missing.push("addedBy");
            AddedByInput::default()
        });
        let owner_name = require(added_by.name, "addedBy.name", &mut missing);
        let owner_email = require(added_by.email, "addedBy.email", &mut missing);
        if self.price.is_none() {
            missing.push("price");
        }
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        missing_fields(missing)?;

        let price = self
            .price
            .as_ref()
            .map(|p| p.to_decimal("price"))
            .transpose()?
            .unwrap_or_default();
        let quantity = self
            .quantity
            .as_ref()
            .map(|q| q.to_integer("quantity"))
            .transpose()?
            .unwrap_or_default();
        let purchase_count = match &self.purchase_count {
            Some(count) => count.to_integer("purchaseCount")?,
            None => 0,
        };

        Ok(NewFood {
            name,
            category,
            image,
            price,
            quantity,
            description,
            short_description,
            purchase_count,
            food_origin,
            added_by: AddedBy {
                name: owner_name,
                email: owner_email,
            },
        })
    }
}

impl NewFood {
    pub fn into_food(self, id: ObjectId) -> Food {
        Food {
            id,
            name: self.name,
            category: self.category,
            image: self.image,
            price: self.price,
            quantity: self.quantity,
            description: self.description,
            short_description: self.short_description,
            purchase_count: self.purchase_count,
            food_origin: self.food_origin,
            added_by: self.added_by,
        }
    }

    pub fn to_document(&self, id: ObjectId) -> Document {
        doc! {
            "_id": id,
            "name": &self.name,
            "category": &self.category,
            "image": &self.image,
            "price": self.price,
            "quantity": self.quantity,
            "description": &self.description,
            "shortDescription": &self.short_description,
            "purchaseCount": self.purchase_count,
            "foodOrigin": &self.food_origin,
            "addedBy": {
                "name": &self.added_by.name,
                "email": &self.added_by.email,
            },
        }
    }
}

/// Partial food body for `PUT /updateFood/{id}`. Unknown keys, including any
/// embedded `_id`, are dropped by serde.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFoodRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub price: Option<Numeric>,
    pub quantity: Option<Numeric>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub purchase_count: Option<Numeric>,
    pub food_origin: Option<String>,
    pub added_by: Option<AddedBy>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FoodUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
    pub short_description: Option<String>,
    pub purchase_count: Option<i64>,
    pub food_origin: Option<String>,
    pub added_by: Option<AddedBy>,
}

impl UpdateFoodRequest {
    pub fn validate(self) -> Result<FoodUpdate, AppError> {
        let update = FoodUpdate {
            price: self
                .price
                .as_ref()
                .map(|p| p.to_decimal("price"))
                .transpose()?,
            quantity: self
                .quantity
                .as_ref()
                .map(|q| q.to_integer("quantity"))
                .transpose()?,
            purchase_count: self
                .purchase_count
                .as_ref()
                .map(|c| c.to_integer("purchaseCount"))
                .transpose()?,
            name: self.name,
            category: self.category,
            image: self.image,
            description: self.description,
            short_description: self.short_description,
            food_origin: self.food_origin,
            added_by: self.added_by,
        };

        if update.to_document().is_empty() {
            return Err(AppError::Validation("no updatable fields".to_string()));
        }
        Ok(update)
    }
}

impl FoodUpdate {
    /// The `$set` body for this update.
    pub fn to_document(&self) -> Document {
        let mut set = Document::new();
        if let Some(name) = &self.name {
            set.insert("name", name);
        }
        if let Some(category) = &self.category {
            set.insert("category", category);
        }
        if let Some(image) = &self.image {
            set.insert("image", image);
        }
        if let Some(price) = self.price {
            set.insert("price", price);
        }
        if let Some(quantity) = self.quantity {
            set.insert("quantity", quantity);
        }
        if let Some(description) = &self.description {
            set.insert("description", description);
        }
        if let Some(short_description) = &self.short_description {
            set.insert("shortDescription", short_description);
        }
        if let Some(purchase_count) = self.purchase_count {
            set.insert("purchaseCount", purchase_count);
        }
        if let Some(food_origin) = &self.food_origin {
            set.insert("foodOrigin", food_origin);
        }
        if let Some(added_by) = &self.added_by {
            set.insert(
                "addedBy",
                doc! { "name": &added_by.name, "email": &added_by.email },
            );
        }
        set
    }

    /// Applies the update in place, returning whether any field changed.
    pub fn apply(&self, food: &mut Food) -> bool {
        let mut changed = false;
        fn assign<T: Clone + PartialEq>(slot: &mut T, value: &Option<T>, changed: &mut bool) {
            if let Some(v) = value {
                if slot != v {
                    *slot = v.clone();
                    *changed = true;
                }
            }
        }
        assign(&mut food.name, &self.name, &mut changed);
        assign(&mut food.category, &self.category, &mut changed);
        assign(&mut food.image, &self.image, &mut changed);
        assign(&mut food.price, &self.price, &mut changed);
        assign(&mut food.quantity, &self.quantity, &mut changed);
        assign(&mut food.description, &self.description, &mut changed);
        assign(&mut food.short_description, &self.short_description, &mut changed);
        assign(&mut food.purchase_count, &self.purchase_count, &mut changed);
        assign(&mut food.food_origin, &self.food_origin, &mut changed);
        assign(&mut food.added_by, &self.added_by, &mut changed);
        changed
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub food_id: Option<String>,
    pub food_name: Option<String>,
    pub buyer_name: Option<String>,
    pub buyer_email: Option<String>,
    pub quantity: Option<Numeric>,
    pub price: Option<Numeric>,
    pub buying_date: Option<String>,
    pub food_img: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPurchase {
    pub food_id: ObjectId,
    pub food_name: String,
    pub buyer_name: String,
    pub buyer_email: String,
    pub quantity: i64,
    pub price: f64,
    pub buying_date: String,
    pub food_img: String,
}

impl PurchaseRequest {
    pub fn validate(self) -> Result<NewPurchase, AppError> {
        let mut missing = Vec::new();
        let food_id = require(self.food_id, "foodId", &mut missing);
        let food_name = require(self.food_name, "foodName", &mut missing);
        let buyer_name = require(self.buyer_name, "buyerName", &mut missing);
        let buyer_email = require(self.buyer_email, "buyerEmail", &mut missing);
        let buying_date = require(self.buying_date, "buyingDate", &mut missing);
        let food_img = require(self.food_img, "foodImg", &mut missing);
        if self.quantity.is_none() {
            missing.push("quantity");
        }
        if self.price.is_none() {
            missing.push("price");
        }
        missing_fields(missing)?;

        let food_id = parse_object_id(&food_id)?;
        let quantity = self
            .quantity
            .as_ref()
            .map(|q| q.to_integer("quantity"))
            .transpose()?
            .unwrap_or_default();
        let price = self
            .price
            .as_ref()
            .map(|p| p.to_decimal("price"))
            .transpose()?
            .unwrap_or_default();

        Ok(NewPurchase {
            food_id,
            food_name,
            buyer_name,
            buyer_email,
            quantity,
            price,
            buying_date,
            food_img,
        })
    }
}

impl NewPurchase {
    pub fn into_purchase(self, id: ObjectId) -> Purchase {
        Purchase {
            id,
            food_id: self.food_id,
            food_name: self.food_name,
            buyer_name: self.buyer_name,
            buyer_email: self.buyer_email,
            quantity: self.quantity,
            price: self.price,
            buying_date: self.buying_date,
            food_img: self.food_img,
        }
    }

    pub fn to_document(&self, id: ObjectId) -> Document {
        doc! {
            "_id": id,
            "foodId": self.food_id,
            "foodName": &self.food_name,
            "buyerName": &self.buyer_name,
            "buyerEmail": &self.buyer_email,
            "quantity": self.quantity,
            "price": self.price,
            "buyingDate": &self.buying_date,
            "foodImg": &self.food_img,
        }
    }
}

pub fn parse_object_id(raw: &str) -> Result<ObjectId, AppError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| AppError::InvalidId(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn add_food_body() -> serde_json::Value {
        json!({
            "name": "Pad Thai",
            "category": "Noodles",
            "image": "https://img.example/pad-thai.jpg",
            "price": "12.50",
            "quantity": "3",
            "description": "Stir-fried rice noodles",
            "shortDescription": "Classic",
            "foodOrigin": "Thailand",
            "addedBy": { "name": "Mali", "email": "mali@example.com" }
        })
    }

    #[test]
    fn add_food_coerces_numeric_strings() {
        let request: AddFoodRequest = serde_json::from_value(add_food_body()).unwrap();
        let food = request.validate().unwrap();
        assert_eq!(food.price, 12.5);
        assert_eq!(food.quantity, 3);
        assert_eq!(food.purchase_count, 0);
        assert_eq!(food.added_by.email, "mali@example.com");
    }

    #[test]
    fn add_food_keeps_explicit_purchase_count() {
        let mut body = add_food_body();
        body["purchaseCount"] = json!(7);
        body["price"] = json!(9);
        let request: AddFoodRequest = serde_json::from_value(body).unwrap();
        let food = request.validate().unwrap();
        assert_eq!(food.purchase_count, 7);
        assert_eq!(food.price, 9.0);
    }

    #[test]
    fn add_food_reports_every_missing_field() {
        let request: AddFoodRequest =
            serde_json::from_value(json!({ "name": "Soup", "price": 4 })).unwrap();
        let err = request.validate().unwrap_err().to_string();
        assert!(err.contains("category"), "{err}");
        assert!(err.contains("quantity"), "{err}");
        assert!(err.contains("addedBy"), "{err}");
        assert!(!err.contains("price"), "{err}");
    }

    #[test]
    fn add_food_rejects_garbage_numbers() {
        let mut body = add_food_body();
        body["price"] = json!("twelve");
        let request: AddFoodRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));

        let mut body = add_food_body();
        body["quantity"] = json!(2.5);
        let request: AddFoodRequest = serde_json::from_value(body).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn update_ignores_embedded_id() {
        let request: UpdateFoodRequest = serde_json::from_value(json!({
            "_id": "65a1b2c3d4e5f6a7b8c9d0e1",
            "price": "4.25"
        }))
        .unwrap();
        let update = request.validate().unwrap();
        let set = update.to_document();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_f64("price").unwrap(), 4.25);
    }

    #[test]
    fn update_without_fields_is_rejected() {
        let request: UpdateFoodRequest =
            serde_json::from_value(json!({ "_id": "65a1b2c3d4e5f6a7b8c9d0e1" })).unwrap();
        assert!(matches!(request.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn apply_reports_no_change_for_identical_values() {
        let mut food = NewFood {
            name: "Tea".into(),
            category: "Drinks".into(),
            image: String::new(),
            price: 2.0,
            quantity: 10,
            description: String::new(),
            short_description: String::new(),
            purchase_count: 0,
            food_origin: "China".into(),
            added_by: AddedBy::default(),
        }
        .into_food(ObjectId::new());

        let same = FoodUpdate {
            name: Some("Tea".into()),
            ..FoodUpdate::default()
        };
        assert!(!same.apply(&mut food));

        let different = FoodUpdate {
            quantity: Some(4),
            ..FoodUpdate::default()
        };
        assert!(different.apply(&mut food));
        assert_eq!(food.quantity, 4);
    }

    #[test]
    fn purchase_rejects_malformed_food_id() {
        let request: PurchaseRequest = serde_json::from_value(json!({
            "foodId": "not-an-id",
            "foodName": "Tea",
            "buyerName": "Ana",
            "buyerEmail": "ana@example.com",
            "quantity": 1,
            "price": 2,
            "buyingDate": "2024-05-01",
            "foodImg": "https://img.example/tea.jpg"
        }))
        .unwrap();
        assert!(matches!(request.validate(), Err(AppError::InvalidId(_))));
    }

    #[test]
    fn food_serializes_hex_ids() {
        let id = ObjectId::new();
        let food = NewFood {
            name: "Tea".into(),
            category: "Drinks".into(),
            image: String::new(),
            price: 2.0,
            quantity: 1,
            description: String::new(),
            short_description: String::new(),
            purchase_count: 0,
            food_origin: String::new(),
            added_by: AddedBy::default(),
        }
        .into_food(id);
        let value = serde_json::to_value(&food).unwrap();
        assert_eq!(value["_id"], json!(id.to_hex()));
        assert_eq!(value["purchaseCount"], json!(0));
        assert!(value.get("shortDescription").is_some());
    }

    #[test]
    fn out_of_range_integers_are_rejected() {
        for quantity in [json!(1e20), json!(u64::MAX), json!(-1e19)] {
            let mut body = add_food_body();
            body["quantity"] = quantity.clone();
            let request: AddFoodRequest = serde_json::from_value(body).unwrap();
            assert!(
                matches!(request.validate(), Err(AppError::Validation(_))),
                "{quantity} was accepted"
            );
        }

        let mut body = add_food_body();
        body["quantity"] = json!(4.0);
        let request: AddFoodRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.validate().unwrap().quantity, 4);
    }

    #[test]
    fn legacy_documents_decode_leniently() {
        let id = ObjectId::new();
        let food: Food = mongodb::bson::from_document(doc! {
            "_id": id,
            "name": "Curry",
            "price": "8.75",
            "quantity": f64::NAN,
            "purchaseCount": "3",
            "addedBy": { "name": "Chef", "email": "chef@example.com" },
        })
        .unwrap();
        assert_eq!(food.id, id);
        assert_eq!(food.price, 8.75);
        assert_eq!(food.quantity, 0);
        assert_eq!(food.purchase_count, 3);

        let food: Food = mongodb::bson::from_document(doc! {
            "_id": id,
            "price": 5_i32,
            "quantity": 3.0,
            "purchaseCount": 2_i32,
        })
        .unwrap();
        assert_eq!(food.price, 5.0);
        assert_eq!(food.quantity, 3);
        assert_eq!(food.purchase_count, 2);

        let purchase: Purchase = mongodb::bson::from_document(doc! {
            "_id": ObjectId::new(),
            "foodId": id,
            "quantity": "2",
            "price": "not a price",
        })
        .unwrap();
        assert_eq!(purchase.quantity, 2);
        assert_eq!(purchase.price, 0.0);
    }
}
