//! # Domain Types
//!
//! Core domain types shared by the store, the router and the clients.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐  1     n  ┌─────────────────┐                      │
//! │  │    Product      │◄──────────│  InventoryItem  │                      │
//! │  │  ─────────────  │           │  ─────────────  │                      │
//! │  │  id (i64)       │           │  id (i64)       │                      │
//! │  │  name           │           │  product_id(FK) │                      │
//! │  │  price (Money)  │           │  product_name   │                      │
//! │  │  quantity       │           │  quantity       │                      │
//! │  │  created_at     │           │  created_at     │                      │
//! │  └─────────────────┘           └─────────────────┘                      │
//! │                                                                         │
//! │  Write models:   NewProduct, NewInventoryItem   (validated)            │
//! │  Wire inputs:    ProductInput, InventoryItemInput (lenient)            │
//! │  Read model:     CatalogState { products, inventory }                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Rows use sequential integer ids assigned by the store. Clients have been
//! seen sending ids both as JSON numbers and as numeric strings, so every
//! inbound id field goes through [`deserialize_optional_integer`].

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{
    validate_id, validate_movement_name, validate_price, validate_product_name,
    validate_quantity, ValidationResult,
};

// =============================================================================
// Product
// =============================================================================

/// A catalog entry with its authoritative on-hand stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Sequential identifier, immutable once created.
    pub id: i64,

    /// Display name.
    pub name: String,

    /// Unit price (stored as cents, sent as a decimal number).
    #[cfg_attr(feature = "sqlx", sqlx(rename = "price_cents"))]
    #[ts(type = "number")]
    pub price: Money,

    /// On-hand stock. Never negative.
    pub quantity: i64,

    /// When the product was created.
    #[serde(alias = "timestamp")]
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Item
// =============================================================================

/// One recorded stock movement.
///
/// `quantity` is the magnitude of the movement. The direction is not stored;
/// it is implied by whichever operation created the row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: i64,
    pub product_id: i64,
    /// Product name at movement time (frozen).
    pub product_name: String,
    pub quantity: i64,
    #[serde(alias = "timestamp")]
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog State
// =============================================================================

/// The complete catalog and movement ledger, as read back from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CatalogState {
    pub products: Vec<Product>,
    pub inventory: Vec<InventoryItem>,
}

// =============================================================================
// Write Models
// =============================================================================

/// Validated data for creating or overwriting a product.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub price: Money,
    pub quantity: i64,
}

impl NewProduct {
    /// Builds a product write model, trimming the name.
    pub fn new(name: impl Into<String>, price: Money, quantity: i64) -> ValidationResult<Self> {
        let product = NewProduct {
            name: name.into().trim().to_string(),
            price,
            quantity,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_product_name(&self.name)?;
        validate_price(self.price)?;
        validate_quantity(self.quantity)
    }

    /// True when `product` already holds exactly these values.
    pub fn matches(&self, product: &Product) -> bool {
        product.name == self.name && product.price == self.price && product.quantity == self.quantity
    }
}

/// Validated data for creating or overwriting a movement row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

impl NewInventoryItem {
    pub fn new(
        product_id: i64,
        product_name: impl Into<String>,
        quantity: i64,
    ) -> ValidationResult<Self> {
        let item = NewInventoryItem {
            product_id,
            product_name: product_name.into().trim().to_string(),
            quantity,
        };
        item.validate()?;
        Ok(item)
    }

    pub fn validate(&self) -> ValidationResult<()> {
        validate_id("product_id", self.product_id)?;
        validate_movement_name(&self.product_name)?;
        validate_quantity(self.quantity)
    }

    /// True when `item` already records exactly this movement.
    pub fn matches(&self, item: &InventoryItem) -> bool {
        item.product_name == self.product_name && item.quantity == self.quantity
    }
}

// =============================================================================
// Wire Inputs
// =============================================================================

/// A product as sent by a client: every field optional, ids lenient.
///
/// Unknown fields (`created_at`, `timestamp`, ...) are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductInput {
    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<Money>,
    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub quantity: Option<i64>,
}

impl ProductInput {
    /// Converts into a validated write model.
    ///
    /// `name` is required; a missing price or quantity means zero.
    pub fn to_new_product(&self) -> ValidationResult<NewProduct> {
        let name = self.name.as_deref().ok_or_else(|| ValidationError::Required {
            field: "name".to_string(),
        })?;
        NewProduct::new(
            name,
            self.price.unwrap_or_default(),
            self.quantity.unwrap_or(0),
        )
    }
}

/// An inventory row as sent by a client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventoryItemInput {
    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub product_id: Option<i64>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub quantity: Option<i64>,
}

impl InventoryItemInput {
    /// Converts into a validated write model.
    ///
    /// `product_id` and `quantity` are required; a missing name is blank.
    pub fn to_new_item(&self) -> ValidationResult<NewInventoryItem> {
        let product_id = self.product_id.ok_or_else(|| ValidationError::Required {
            field: "product_id".to_string(),
        })?;
        let quantity = self.quantity.ok_or_else(|| ValidationError::Required {
            field: "quantity".to_string(),
        })?;
        NewInventoryItem::new(
            product_id,
            self.product_name.clone().unwrap_or_default(),
            quantity,
        )
    }
}

// =============================================================================
// Lenient Integer Fields
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum IntegerOrString {
    Integer(i64),
    Text(String),
}

/// Deserializes an optional integer sent as a JSON number or numeric string.
///
/// `null`, a missing field, and `""` all read as `None`.
///
/// ## Example
/// ```rust
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Ref {
///     #[serde(default, deserialize_with = "stockhub_core::types::deserialize_optional_integer")]
///     product_id: Option<i64>,
/// }
///
/// let a: Ref = serde_json::from_str(r#"{"product_id": 7}"#).unwrap();
/// let b: Ref = serde_json::from_str(r#"{"product_id": "7"}"#).unwrap();
/// assert_eq!(a.product_id, b.product_id);
/// ```
pub fn deserialize_optional_integer<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<IntegerOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(IntegerOrString::Integer(value)) => Ok(Some(value)),
        Some(IntegerOrString::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<i64>()
                .map(Some)
                .map_err(|_| D::Error::custom(format!("'{}' is not an integer", text)))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_serializes_price_as_decimal() {
        let product = Product {
            id: 1,
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            quantity: 100,
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(&product).unwrap();
        assert_eq!(json["price"].as_f64(), Some(10.0));
        assert_eq!(json["quantity"], 100);
        assert!(json["created_at"].is_string());
    }

    #[test]
    fn test_product_accepts_timestamp_alias() {
        let json = r#"{"id":1,"name":"Widget","price":"10.00","quantity":5,
                       "timestamp":"2024-03-01T10:00:00Z"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.price.cents(), 1000);
        assert_eq!(product.created_at.to_rfc3339(), "2024-03-01T10:00:00+00:00");
    }

    #[test]
    fn test_product_input_lenient_ids() {
        let input: ProductInput =
            serde_json::from_str(r#"{"id":"12","name":"Bolt","price":0.5,"quantity":"3"}"#).unwrap();
        assert_eq!(input.id, Some(12));
        assert_eq!(input.quantity, Some(3));
        assert_eq!(input.price, Some(Money::from_cents(50)));

        let input: ProductInput = serde_json::from_str(r#"{"id":"","name":"Bolt"}"#).unwrap();
        assert_eq!(input.id, None);

        assert!(serde_json::from_str::<ProductInput>(r#"{"id":"abc"}"#).is_err());
    }

    #[test]
    fn test_product_input_to_new_product() {
        let input = ProductInput {
            name: Some("  Widget ".to_string()),
            price: Some(Money::from_cents(1000)),
            quantity: Some(100),
            ..Default::default()
        };
        let new = input.to_new_product().unwrap();
        assert_eq!(new.name, "Widget");
        assert_eq!(new.quantity, 100);

        let missing_name = ProductInput::default();
        assert!(matches!(
            missing_name.to_new_product(),
            Err(ValidationError::Required { .. })
        ));

        let negative = ProductInput {
            name: Some("Widget".to_string()),
            quantity: Some(-1),
            ..Default::default()
        };
        assert!(negative.to_new_product().is_err());
    }

    #[test]
    fn test_inventory_input_requires_product_and_quantity() {
        let input: InventoryItemInput =
            serde_json::from_str(r#"{"product_id":1,"product_name":"Widget","quantity":20}"#)
                .unwrap();
        let item = input.to_new_item().unwrap();
        assert_eq!(item.product_id, 1);
        assert_eq!(item.quantity, 20);

        let no_quantity: InventoryItemInput = serde_json::from_str(r#"{"product_id":1}"#).unwrap();
        assert!(no_quantity.to_new_item().is_err());

        let no_product: InventoryItemInput = serde_json::from_str(r#"{"quantity":1}"#).unwrap();
        assert!(no_product.to_new_item().is_err());
    }

    #[test]
    fn test_new_product_matches() {
        let product = Product {
            id: 3,
            name: "Widget".to_string(),
            price: Money::from_cents(1000),
            quantity: 100,
            created_at: Utc::now(),
        };
        let same = NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap();
        let cheaper = NewProduct::new("Widget", Money::from_cents(900), 100).unwrap();
        assert!(same.matches(&product));
        assert!(!cheaper.matches(&product));
    }
}
