//! Repositories for catalog tables.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use shoplink_core::catalog::{
    NewParty, NewProduct, NewProductCategory, NewProductImage, Party, Product, ProductCategory,
    ProductImage,
};
use shoplink_core::errors::Result;
use shoplink_core::repositories::{
    CategoryRepositoryTrait, ImageRepositoryTrait, PartyRepositoryTrait, ProductRepositoryTrait,
};

use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::StorageError;
use crate::money::decimal_to_db;
use crate::schema::{parties, product_categories, product_images, products};

use super::model::{PartyDB, ProductCategoryDB, ProductDB, ProductImageDB};

pub struct CategoryRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl CategoryRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        CategoryRepository { pool, writer }
    }
}

#[async_trait]
impl CategoryRepositoryTrait for CategoryRepository {
    fn get(&self, category_id: &str) -> Result<Option<ProductCategory>> {
        let mut conn = get_connection(&self.pool)?;
        let row = product_categories::table
            .find(category_id)
            .first::<ProductCategoryDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        Ok(row.map(ProductCategory::from))
    }

    async fn insert(&self, new_category: NewProductCategory) -> Result<ProductCategory> {
        self.writer
            .exec(move |conn| {
                let now = Utc::now().to_rfc3339();
                let row = ProductCategoryDB {
                    id: Uuid::new_v4().to_string(),
                    name: new_category.name,
                    created_at: now.clone(),
                    updated_at: now,
                };
                let inserted = diesel::insert_into(product_categories::table)
                    .values(&row)
                    .returning(ProductCategoryDB::as_returning())
                    .get_result::<ProductCategoryDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(ProductCategory::from(inserted))
            })
            .await
    }

    async fn rename(&self, category_id: String, name: String) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(product_categories::table.find(category_id))
                    .set((
                        product_categories::name.eq(name),
                        product_categories::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct ProductRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ProductRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ProductRepository { pool, writer }
    }
}

#[async_trait]
impl ProductRepositoryTrait for ProductRepository {
    fn get(&self, product_id: &str) -> Result<Option<Product>> {
        let mut conn = get_connection(&self.pool)?;
        let row = products::table
            .find(product_id)
            .first::<ProductDB>(&mut conn)
            .optional()
            .map_err(StorageError::from)?;
        row.map(ProductDB::into_domain).transpose()
    }

    async fn insert(&self, new_product: NewProduct) -> Result<Product> {
        self.writer
            .exec(move |conn| {
                let now = Utc::now().to_rfc3339();
                let row = ProductDB {
                    id: Uuid::new_v4().to_string(),
                    name: new_product.name,
                    description: new_product.description,
                    category_id: new_product.category_id,
                    price: decimal_to_db(&new_product.price),
                    barcode: None,
                    available_stock: 0,
                    is_active: 1,
                    created_at: now.clone(),
                    updated_at: now,
                };
                let inserted = diesel::insert_into(products::table)
                    .values(&row)
                    .returning(ProductDB::as_returning())
                    .get_result::<ProductDB>(conn)
                    .map_err(StorageError::from)?;
                inserted.into_domain()
            })
            .await
    }

    async fn update_catalog_fields(
        &self,
        product_id: String,
        name: String,
        description: Option<String>,
        category_id: Option<String>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(products::table.find(product_id))
                    .set((
                        products::name.eq(name),
                        products::description.eq(description),
                        products::category_id.eq(category_id),
                        products::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn update_pricing(
        &self,
        product_id: String,
        price: Decimal,
        barcode: Option<String>,
    ) -> Result<()> {
        self.writer
            .exec(move |conn| {
                let now = Utc::now().to_rfc3339();
                match barcode {
                    Some(code) => diesel::update(products::table.find(product_id))
                        .set((
                            products::price.eq(decimal_to_db(&price)),
                            products::barcode.eq(code),
                            products::updated_at.eq(now),
                        ))
                        .execute(conn),
                    // An absent barcode leaves the stored one in place.
                    None => diesel::update(products::table.find(product_id))
                        .set((
                            products::price.eq(decimal_to_db(&price)),
                            products::updated_at.eq(now),
                        ))
                        .execute(conn),
                }
                .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }

    async fn set_available_stock(&self, product_id: String, quantity: i32) -> Result<()> {
        self.writer
            .exec(move |conn| {
                diesel::update(products::table.find(product_id))
                    .set((
                        products::available_stock.eq(quantity),
                        products::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(StorageError::from)?;
                Ok(())
            })
            .await
    }
}

pub struct ImageRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl ImageRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        ImageRepository { pool, writer }
    }
}

#[async_trait]
impl ImageRepositoryTrait for ImageRepository {
    fn list_for_product(&self, product_id: &str) -> Result<Vec<ProductImage>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = product_images::table
            .filter(product_images::product_id.eq(product_id))
            .order(product_images::created_at.asc())
            .load::<ProductImageDB>(&mut conn)
            .map_err(StorageError::from)?;
        Ok(rows.into_iter().map(ProductImage::from).collect())
    }

    async fn insert(&self, new_image: NewProductImage) -> Result<ProductImage> {
        self.writer
            .exec(move |conn| {
                let row = ProductImageDB {
                    id: Uuid::new_v4().to_string(),
                    product_id: new_image.product_id,
                    url: new_image.url,
                    is_primary: new_image.is_primary as i32,
                    created_at: Utc::now().to_rfc3339(),
                };
                let inserted = diesel::insert_into(product_images::table)
                    .values(&row)
                    .returning(ProductImageDB::as_returning())
                    .get_result::<ProductImageDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(ProductImage::from(inserted))
            })
            .await
    }
}

pub struct PartyRepository {
    writer: WriteHandle,
}

impl PartyRepository {
    pub fn new(writer: WriteHandle) -> Self {
        PartyRepository { writer }
    }
}

#[async_trait]
impl PartyRepositoryTrait for PartyRepository {
    async fn insert(&self, new_party: NewParty) -> Result<Party> {
        self.writer
            .exec(move |conn| {
                let row = PartyDB {
                    id: Uuid::new_v4().to_string(),
                    full_name: new_party.full_name,
                    mobile: new_party.mobile,
                    is_placeholder: new_party.is_placeholder as i32,
                    created_at: Utc::now().to_rfc3339(),
                };
                let inserted = diesel::insert_into(parties::table)
                    .values(&row)
                    .returning(PartyDB::as_returning())
                    .get_result::<PartyDB>(conn)
                    .map_err(StorageError::from)?;
                Ok(Party::from(inserted))
            })
            .await
    }
}
