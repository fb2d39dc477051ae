//! Typed wire shapes for the ERP protocol.
//!
//! One schema per external operation; the engines never touch untyped
//! maps. Field casing follows the ERP's PascalCase convention.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Error envelope returned by the ERP on non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

// ─────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginRequest {
    pub user_name: String,
    /// Lowercase hex MD5 of the configured password, as the ERP protocol
    /// requires.
    pub password_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LoginResponse {
    pub token: String,
    pub visitor_id: i64,
}

// ─────────────────────────────────────────────────────────────────────────
// GetAllData (batched incremental pull)
// ─────────────────────────────────────────────────────────────────────────

/// Cursor set for the single batched pull. One row version per tracked
/// entity type; the ERP returns everything strictly newer.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAllDataRequest {
    pub product_group_version: i64,
    pub product_version: i64,
    pub product_detail_version: i64,
    pub store_asset_version: i64,
    pub picture_version: i64,
    pub person_version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpProductGroup {
    pub code: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpProduct {
    pub code: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub group_code: Option<i64>,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Pricing record. The ERP carries parallel price tiers; `default_price_no`
/// selects the tier the store should sell at.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpProductDetail {
    pub code: i64,
    pub product_code: i64,
    #[serde(default)]
    pub price1: Option<Decimal>,
    #[serde(default)]
    pub price2: Option<Decimal>,
    #[serde(default)]
    pub price3: Option<Decimal>,
    #[serde(default = "default_price_no")]
    pub default_price_no: i32,
    #[serde(default)]
    pub barcode: Option<String>,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

fn default_price_no() -> i32 {
    1
}

impl ErpProductDetail {
    /// Price tiers in tier order, for the fallback policy.
    pub fn price_tiers(&self) -> [Option<Decimal>; 3] {
        [self.price1, self.price2, self.price3]
    }
}

/// Per-variant stock quantity. Quantities are summed across variants into
/// a single available-stock figure on the parent product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpStoreAsset {
    pub product_detail_code: i64,
    pub product_code: i64,
    pub count: Decimal,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

/// Newly uploaded picture. `entity_kind` tags which entity family the
/// picture belongs to; only `"Product"` batches are processed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpNewPicture {
    pub entity_kind: String,
    pub entity_code: i64,
    pub url: String,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

impl ErpNewPicture {
    pub const PRODUCT_KIND: &'static str = "Product";

    pub fn is_product_picture(&self) -> bool {
        self.entity_kind == Self::PRODUCT_KIND
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpPerson {
    pub code: i64,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub mobile: Option<String>,
    pub row_version: i64,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetAllDataResponse {
    #[serde(default)]
    pub product_groups: Option<Vec<ErpProductGroup>>,
    #[serde(default)]
    pub products: Option<Vec<ErpProduct>>,
    #[serde(default)]
    pub product_details: Option<Vec<ErpProductDetail>>,
    #[serde(default)]
    pub store_assets: Option<Vec<ErpStoreAsset>>,
    #[serde(default)]
    pub new_pictures: Option<Vec<ErpNewPicture>>,
    #[serde(default)]
    pub persons: Option<Vec<ErpPerson>>,
}

impl GetAllDataResponse {
    /// True when the ERP reported no changed data at all.
    pub fn is_empty(&self) -> bool {
        fn none_or_empty<T>(list: &Option<Vec<T>>) -> bool {
            list.as_ref().map(|v| v.is_empty()).unwrap_or(true)
        }

        none_or_empty(&self.product_groups)
            && none_or_empty(&self.products)
            && none_or_empty(&self.product_details)
            && none_or_empty(&self.store_assets)
            && none_or_empty(&self.new_pictures)
            && none_or_empty(&self.persons)
    }
}

// ─────────────────────────────────────────────────────────────────────────
// SaveOrder (outbound push)
// ─────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpOrderHeader {
    /// Deterministic surrogate derived from the local order identity, so
    /// retried pushes are recognizable on the ERP side.
    pub client_order_id: i64,
    pub discount_amount: Decimal,
    pub shipping_amount: Decimal,
    /// Settlement marker: orders are pushed only after local payment.
    pub is_settled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErpOrderLine {
    pub product_code: i64,
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveOrderRequest {
    pub order: ErpOrderHeader,
    pub lines: Vec<ErpOrderLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SaveOrderResponse {
    /// Echo of the accepted surrogate identity.
    pub client_order_id: i64,
}
