//! Catalog domain models touched by the reconciliation engine.
//!
//! The engine owns only the external-sync slice of these records; the rest
//! of the application remains the source of truth for everything else.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product category pulled from the external ERP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCategory {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a category locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductCategory {
    pub name: String,
}

/// A sellable product.
///
/// `price`, `barcode` and `available_stock` are enriched by later inbound
/// stages; a freshly created product starts with zero price pending the
/// product-detail stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub price: Decimal,
    pub barcode: Option<String>,
    pub available_stock: i32,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Payload for creating a product locally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub price: Decimal,
}

/// A product image ingested from the ERP picture feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    pub id: String,
    pub product_id: String,
    pub url: String,
    pub is_primary: bool,
    pub created_at: String,
}

/// Payload for attaching an image to a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProductImage {
    pub product_id: String,
    pub url: String,
    pub is_primary: bool,
}

/// An external party (customer) known to the ERP.
///
/// Placeholder parties are pre-registered during inbound sync so that a
/// later self-registration can claim the mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub id: String,
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub is_placeholder: bool,
    pub created_at: String,
}

/// Payload for pre-registering a placeholder party.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewParty {
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub is_placeholder: bool,
}
