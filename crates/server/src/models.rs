//! Wire-facing data model
//!
//! The REST contract uses camelCase field names. `Order` exclusively
//! owns its `Product`s; a `Product` exclusively owns its optional
//! `Guarantee` and its `Price`s. Hydrated reads always carry the full
//! nested graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// An intake batch grouping zero or more products
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub order_date: DateTime<Utc>,
    /// Present on hydrated reads, absent on the create response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub products: Option<Vec<Product>>,
}

/// A tracked item belonging to exactly one order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub order_id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub serial_number: Option<String>,
    pub photo: Option<String>,
    pub is_new: bool,
    pub specification: Option<String>,
    pub product_date: DateTime<Utc>,
    pub guarantee: Option<Guarantee>,
    pub prices: Vec<Price>,
    /// Owning order, present on product listings only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Order>,
}

/// Warranty date range, 1:1 with a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Guarantee {
    pub id: i64,
    pub product_id: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Currency-denominated value owned by a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Price {
    pub id: i64,
    pub product_id: i64,
    pub value: f64,
    pub symbol: String,
    pub is_default: bool,
}

/// Input for `POST /api/orders`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub title: String,
    pub description: Option<String>,
    pub order_date: Option<DateTime<Utc>>,
}

impl NewOrder {
    pub fn validate(&self) -> Result<()> {
        if self.title.chars().count() < 2 {
            return Err(Error::Validation(
                "Order title is required (min 2 chars)".to_string(),
            ));
        }
        Ok(())
    }
}

/// Input for `POST /api/products`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub title: String,
    #[serde(rename = "type")]
    pub product_type: String,
    pub serial_number: Option<String>,
    pub photo: Option<String>,
    #[serde(default)]
    pub is_new: bool,
    pub specification: Option<String>,
    pub order_id: i64,
    pub product_date: Option<DateTime<Utc>>,
    pub guarantee: Option<NewGuarantee>,
    #[serde(default)]
    pub prices: Vec<NewPrice>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<()> {
        if self.title.chars().count() < 2 {
            return Err(Error::Validation(
                "Product title is required (min 2 chars)".to_string(),
            ));
        }
        if self.product_type.chars().count() < 2 {
            return Err(Error::Validation(
                "Product type is required (min 2 chars)".to_string(),
            ));
        }
        for price in &self.prices {
            if price.value < 0.0 {
                return Err(Error::Validation(
                    "Price value must be non-negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Guarantee dates staged alongside a product create
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuarantee {
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Price staged alongside a product create
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrice {
    pub value: f64,
    pub symbol: String,
    #[serde(default)]
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_title_must_have_two_chars() {
        let order = NewOrder {
            title: "x".to_string(),
            description: None,
            order_date: None,
        };
        assert!(order.validate().is_err());

        let order = NewOrder {
            title: "ok".to_string(),
            description: None,
            order_date: None,
        };
        assert!(order.validate().is_ok());
    }

    #[test]
    fn product_type_is_validated() {
        let product = NewProduct {
            title: "Monitor".to_string(),
            product_type: "m".to_string(),
            serial_number: None,
            photo: None,
            is_new: true,
            specification: None,
            order_id: 1,
            product_date: None,
            guarantee: None,
            prices: vec![],
        };
        assert!(product.validate().is_err());
    }

    #[test]
    fn negative_price_rejected_before_write() {
        let product = NewProduct {
            title: "Monitor".to_string(),
            product_type: "monitors".to_string(),
            serial_number: None,
            photo: None,
            is_new: true,
            specification: None,
            order_id: 1,
            product_date: None,
            guarantee: None,
            prices: vec![NewPrice {
                value: -1.0,
                symbol: "USD".to_string(),
                is_default: true,
            }],
        };
        assert!(product.validate().is_err());
    }
}
