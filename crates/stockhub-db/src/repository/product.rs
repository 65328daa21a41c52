//! # Product Repository
//!
//! Database operations for catalog entries.
//!
//! ## Key Operations
//! - CRUD on the `product` table
//! - Connection-level helpers shared with stock movements and reconciliation
//!
//! ## Connection-Level Helpers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Who Runs Which Query Where                             │
//! │                                                                         │
//! │  ProductRepository::list()  ──► pool.acquire() ──┐                     │
//! │                                                   │                     │
//! │  InventoryRepository::decrement_stock()           ▼                     │
//! │       └── pool.begin() ──► tx ──────────► select_by_id(&mut conn)      │
//! │                                                   ▲                     │
//! │  Reconciler::reconcile()                          │                     │
//! │       └── pool.begin() ──► tx ────────────────────┘                     │
//! │                                                                         │
//! │  The helpers take `&mut SqliteConnection`, so the same SQL runs on a   │
//! │  pooled connection or inside a caller's transaction.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stockhub_core::{NewProduct, Product};

const SELECT_ALL_SQL: &str = r#"
    SELECT id, name, price_cents, quantity, created_at
    FROM product
    ORDER BY id
"#;

const SELECT_BY_ID_SQL: &str = r#"
    SELECT id, name, price_cents, quantity, created_at
    FROM product
    WHERE id = ?1
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO product (name, price_cents, quantity, created_at)
    VALUES (?1, ?2, ?3, ?4)
    RETURNING id, name, price_cents, quantity, created_at
"#;

const INSERT_WITH_ID_SQL: &str = r#"
    INSERT INTO product (id, name, price_cents, quantity, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    RETURNING id, name, price_cents, quantity, created_at
"#;

const UPDATE_SQL: &str = r#"
    UPDATE product
    SET name = ?2, price_cents = ?3, quantity = ?4
    WHERE id = ?1
    RETURNING id, name, price_cents, quantity, created_at
"#;

const DELETE_SQL: &str = "DELETE FROM product WHERE id = ?1";

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let widget = repo.create(&NewProduct::new("Widget", Money::from_cents(1000), 100)?).await?;
/// let again = repo.get_by_id(widget.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, oldest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        select_all(&mut conn).await
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        select_by_id(&mut conn, id).await
    }

    /// Inserts a new product with a store-assigned id.
    pub async fn create(&self, product: &NewProduct) -> DbResult<Product> {
        product.validate()?;
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, product).await
    }

    /// Overwrites name, price and quantity of an existing product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - The row as stored after the update
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, id: i64, product: &NewProduct) -> DbResult<Product> {
        product.validate()?;
        let mut conn = self.pool.acquire().await?;
        overwrite(&mut conn, id, product)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - Product doesn't exist
    /// * `DbError::ForeignKeyViolation` - Inventory rows still reference it;
    ///   nothing is changed
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = id, "Deleting product");

        let result = sqlx::query(DELETE_SQL).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

pub(crate) async fn select_all(conn: &mut SqliteConnection) -> DbResult<Vec<Product>> {
    let products = sqlx::query_as::<_, Product>(SELECT_ALL_SQL)
        .fetch_all(&mut *conn)
        .await?;
    Ok(products)
}

pub(crate) async fn select_by_id(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let product = sqlx::query_as::<_, Product>(SELECT_BY_ID_SQL)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(product)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, product: &NewProduct) -> DbResult<Product> {
    debug!(name = %product.name, "Inserting product");

    let created = sqlx::query_as::<_, Product>(INSERT_SQL)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

/// Inserts a product keeping an id chosen elsewhere (a client snapshot).
pub(crate) async fn insert_with_id(
    conn: &mut SqliteConnection,
    id: i64,
    product: &NewProduct,
) -> DbResult<Product> {
    debug!(id = id, name = %product.name, "Inserting product with client id");

    let created = sqlx::query_as::<_, Product>(INSERT_WITH_ID_SQL)
        .bind(id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

pub(crate) async fn overwrite(
    conn: &mut SqliteConnection,
    id: i64,
    product: &NewProduct,
) -> DbResult<Option<Product>> {
    debug!(id = id, "Updating product");

    let updated = sqlx::query_as::<_, Product>(UPDATE_SQL)
        .bind(id)
        .bind(&product.name)
        .bind(product.price)
        .bind(product.quantity)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(updated)
}

// =============================================================================
// Unit Tests
// =============================================================================
