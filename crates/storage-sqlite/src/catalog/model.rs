//! Database models for catalog tables. Money is TEXT, booleans are 0/1
//! integers.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use shoplink_core::catalog::{Party, Product, ProductCategory, ProductImage};
use shoplink_core::errors::Result;

use crate::money::decimal_from_db;

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::product_categories)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductCategoryDB {
    pub id: String,
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ProductCategoryDB> for ProductCategory {
    fn from(row: ProductCategoryDB) -> Self {
        ProductCategory {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::products)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductDB {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<String>,
    pub price: String,
    pub barcode: Option<String>,
    pub available_stock: i32,
    pub is_active: i32,
    pub created_at: String,
    pub updated_at: String,
}

impl ProductDB {
    pub fn into_domain(self) -> Result<Product> {
        Ok(Product {
            price: decimal_from_db(&self.price)?,
            id: self.id,
            name: self.name,
            description: self.description,
            category_id: self.category_id,
            barcode: self.barcode,
            available_stock: self.available_stock,
            is_active: self.is_active != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::product_images)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct ProductImageDB {
    pub id: String,
    pub product_id: String,
    pub url: String,
    pub is_primary: i32,
    pub created_at: String,
}

impl From<ProductImageDB> for ProductImage {
    fn from(row: ProductImageDB) -> Self {
        ProductImage {
            id: row.id,
            product_id: row.product_id,
            url: row.url,
            is_primary: row.is_primary != 0,
            created_at: row.created_at,
        }
    }
}

#[derive(
    Queryable,
    Identifiable,
    Insertable,
    AsChangeset,
    Selectable,
    Debug,
    Clone,
    Serialize,
    Deserialize,
)]
#[diesel(table_name = crate::schema::parties)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PartyDB {
    pub id: String,
    pub full_name: Option<String>,
    pub mobile: Option<String>,
    pub is_placeholder: i32,
    pub created_at: String,
}

impl From<PartyDB> for Party {
    fn from(row: PartyDB) -> Self {
        Party {
            id: row.id,
            full_name: row.full_name,
            mobile: row.mobile,
            is_placeholder: row.is_placeholder != 0,
            created_at: row.created_at,
        }
    }
}
