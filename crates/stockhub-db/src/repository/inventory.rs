//! # Inventory Repository
//!
//! Database operations for stock movement rows, and the two stock mutations.
//!
//! ## Stock Movement Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                decrement_stock(product_id = 1, q = 20)                  │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  SELECT … FROM product WHERE id = 1            → on_hand = 100          │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  apply_movement(gate, Out, 100, 20)            → Some(80)               │
//! │    │        └── None? ─► ROLLBACK, return []   (declined, no error)    │
//! │    ▼                                                                    │
//! │  UPDATE product SET quantity = 80                                      │
//! │    WHERE id = 1 AND quantity = 100             ← compare-and-set        │
//! │    │        └── 0 rows? ─► ROLLBACK, Conflict                          │
//! │    ▼                                                                    │
//! │  INSERT INTO inventory (1, 'Widget', 20, now)  → InventoryItem          │
//! │    │                                                                    │
//! │    ▼                                                                    │
//! │  COMMIT                                        return [item]           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The read and the write of the on-hand count never interleave with another
//! movement for the same product: either the whole unit commits or none of
//! it does.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::product;
use stockhub_core::validation::validate_movement_name;
use stockhub_core::{apply_movement, InventoryItem, MovementDirection, NewInventoryItem, StockGate};

const SELECT_ALL_SQL: &str = r#"
    SELECT id, product_id, product_name, quantity, created_at
    FROM inventory
    ORDER BY id
"#;

const SELECT_BY_ID_SQL: &str = r#"
    SELECT id, product_id, product_name, quantity, created_at
    FROM inventory
    WHERE id = ?1
"#;

const SELECT_LATEST_FOR_PRODUCT_SQL: &str = r#"
    SELECT id, product_id, product_name, quantity, created_at
    FROM inventory
    WHERE product_id = ?1
    ORDER BY id DESC
    LIMIT 1
"#;

const INSERT_SQL: &str = r#"
    INSERT INTO inventory (product_id, product_name, quantity, created_at)
    VALUES (?1, ?2, ?3, ?4)
    RETURNING id, product_id, product_name, quantity, created_at
"#;

const INSERT_WITH_ID_SQL: &str = r#"
    INSERT INTO inventory (id, product_id, product_name, quantity, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    RETURNING id, product_id, product_name, quantity, created_at
"#;

const UPDATE_SQL: &str = r#"
    UPDATE inventory
    SET product_id = ?2, product_name = ?3, quantity = ?4
    WHERE id = ?1
    RETURNING id, product_id, product_name, quantity, created_at
"#;

const DELETE_SQL: &str = "DELETE FROM inventory WHERE id = ?1";

/// Opens a write transaction holding the database write lock from the start.
pub(crate) const BEGIN_IMMEDIATE: &str = "BEGIN IMMEDIATE";

const SET_ON_HAND_SQL: &str = r#"
    UPDATE product
    SET quantity = ?2
    WHERE id = ?1 AND quantity = ?3
"#;

/// Repository for inventory rows and stock movements.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
    gate: StockGate,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository applying `gate` to movements.
    pub fn new(pool: SqlitePool, gate: StockGate) -> Self {
        InventoryRepository { pool, gate }
    }

    /// Lists every movement row, oldest first.
    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        select_all(&mut conn).await
    }

    /// Gets a movement row by its ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<InventoryItem>> {
        let mut conn = self.pool.acquire().await?;
        select_by_id(&mut conn, id).await
    }

    /// Inserts a movement row directly, without touching on-hand stock.
    ///
    /// ## Errors
    /// * `DbError::ForeignKeyViolation` - `product_id` doesn't exist
    pub async fn create(&self, item: &NewInventoryItem) -> DbResult<InventoryItem> {
        item.validate()?;
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, item).await
    }

    /// Overwrites an existing movement row.
    ///
    /// ## Errors
    /// * `DbError::NotFound` - row doesn't exist
    /// * `DbError::ForeignKeyViolation` - new `product_id` doesn't exist
    pub async fn update(&self, id: i64, item: &NewInventoryItem) -> DbResult<InventoryItem> {
        item.validate()?;
        let mut conn = self.pool.acquire().await?;
        overwrite(&mut conn, id, item)
            .await?
            .ok_or_else(|| DbError::not_found("Inventory item", id))
    }

    /// Deletes a movement row.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = id, "Deleting inventory item");

        let result = sqlx::query(DELETE_SQL).bind(id).execute(&self.pool).await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Inventory item", id));
        }

        Ok(())
    }

    /// Receives `quantity` units of a product.
    ///
    /// ## Returns
    /// * `Ok(vec![item])` - stock raised, movement recorded
    /// * `Ok(vec![])` - declined by the stock gate; nothing changed
    pub async fn increment_stock(
        &self,
        product_id: i64,
        quantity: i64,
        product_name: &str,
    ) -> DbResult<Vec<InventoryItem>> {
        self.move_stock(MovementDirection::In, product_id, quantity, product_name)
            .await
    }

    /// Issues `quantity` units of a product.
    ///
    /// ## Returns
    /// * `Ok(vec![item])` - stock lowered, movement recorded
    /// * `Ok(vec![])` - declined by the stock gate; nothing changed
    pub async fn decrement_stock(
        &self,
        product_id: i64,
        quantity: i64,
        product_name: &str,
    ) -> DbResult<Vec<InventoryItem>> {
        self.move_stock(MovementDirection::Out, product_id, quantity, product_name)
            .await
    }

    async fn move_stock(
        &self,
        direction: MovementDirection,
        product_id: i64,
        quantity: i64,
        product_name: &str,
    ) -> DbResult<Vec<InventoryItem>> {
        validate_movement_name(product_name)?;

        // IMMEDIATE takes the write lock up front, so a second pooled
        // connection waits on the busy timeout instead of failing the upgrade
        let mut tx = self.pool.begin_with(BEGIN_IMMEDIATE).await?;

        let current = product::select_by_id(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let Some(next) = apply_movement(self.gate, direction, current.quantity, quantity)? else {
            debug!(
                product_id = product_id,
                direction = direction.as_str(),
                on_hand = current.quantity,
                requested = quantity,
                gate = %self.gate,
                "Stock movement declined"
            );
            tx.rollback().await?;
            return Ok(Vec::new());
        };

        let updated = sqlx::query(SET_ON_HAND_SQL)
            .bind(product_id)
            .bind(next)
            .bind(current.quantity)
            .execute(&mut *tx)
            .await?;

        if updated.rows_affected() == 0 {
            // Dropping `tx` rolls the transaction back
            return Err(DbError::conflict("Product", product_id));
        }

        let name = match product_name.trim() {
            "" => current.name.clone(),
            supplied => supplied.to_string(),
        };
        let movement = NewInventoryItem {
            product_id,
            product_name: name,
            quantity,
        };
        let item = insert(&mut tx, &movement).await?;

        tx.commit().await?;

        info!(
            product_id = product_id,
            direction = direction.as_str(),
            quantity = quantity,
            on_hand = next,
            "Stock moved"
        );

        Ok(vec![item])
    }
}

// =============================================================================
// Connection-Level Helpers
// =============================================================================

pub(crate) async fn select_all(conn: &mut SqliteConnection) -> DbResult<Vec<InventoryItem>> {
    let items = sqlx::query_as::<_, InventoryItem>(SELECT_ALL_SQL)
        .fetch_all(&mut *conn)
        .await?;
    Ok(items)
}

pub(crate) async fn select_by_id(
    conn: &mut SqliteConnection,
    id: i64,
) -> DbResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(SELECT_BY_ID_SQL)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

/// The most recent movement recorded for a product, if any.
pub(crate) async fn select_latest_for_product(
    conn: &mut SqliteConnection,
    product_id: i64,
) -> DbResult<Option<InventoryItem>> {
    let item = sqlx::query_as::<_, InventoryItem>(SELECT_LATEST_FOR_PRODUCT_SQL)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(item)
}

pub(crate) async fn insert(
    conn: &mut SqliteConnection,
    item: &NewInventoryItem,
) -> DbResult<InventoryItem> {
    debug!(product_id = item.product_id, quantity = item.quantity, "Inserting inventory item");

    let created = sqlx::query_as::<_, InventoryItem>(INSERT_SQL)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

/// Inserts a movement row keeping an id chosen elsewhere (a client snapshot).
pub(crate) async fn insert_with_id(
    conn: &mut SqliteConnection,
    id: i64,
    item: &NewInventoryItem,
) -> DbResult<InventoryItem> {
    debug!(id = id, product_id = item.product_id, "Inserting inventory item with client id");

    let created = sqlx::query_as::<_, InventoryItem>(INSERT_WITH_ID_SQL)
        .bind(id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .bind(Utc::now())
        .fetch_one(&mut *conn)
        .await?;
    Ok(created)
}

pub(crate) async fn overwrite(
    conn: &mut SqliteConnection,
    id: i64,
    item: &NewInventoryItem,
) -> DbResult<Option<InventoryItem>> {
    debug!(id = id, "Updating inventory item");

    let updated = sqlx::query_as::<_, InventoryItem>(UPDATE_SQL)
        .bind(id)
        .bind(item.product_id)
        .bind(&item.product_name)
        .bind(item.quantity)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(updated)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::error::DbErrorKind;
    use crate::{Database, DbConfig};
    use stockhub_core::{Money, NewInventoryItem, NewProduct, Product, StockGate};

    async fn db_with_widget(gate: StockGate) -> (Database, Product) {
        let db = Database::new(DbConfig::in_memory().stock_gate(gate))
            .await
            .unwrap();
        let widget = db
            .products()
            .create(&NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap())
            .await
            .unwrap();
        (db, widget)
    }

    async fn on_hand(db: &Database, id: i64) -> i64 {
        db.products().get_by_id(id).await.unwrap().unwrap().quantity
    }

    #[tokio::test]
    async fn test_decrement_below_on_hand() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        let items = db.inventory().decrement_stock(widget.id, 20, "Widget").await.unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 20);
        assert_eq!(items[0].product_id, widget.id);
        assert_eq!(items[0].product_name, "Widget");
        assert_eq!(on_hand(&db, widget.id).await, 80);
        assert_eq!(db.inventory().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_increment_at_or_above_on_hand_is_noop() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        for q in [100, 150] {
            let items = db.inventory().increment_stock(widget.id, q, "Widget").await.unwrap();
            assert!(items.is_empty());
        }

        assert_eq!(on_hand(&db, widget.id).await, 100);
        assert!(db.inventory().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_strict_gate_never_empties_stock() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        let items = db.inventory().decrement_stock(widget.id, 100, "Widget").await.unwrap();
        assert!(items.is_empty());
        assert_eq!(on_hand(&db, widget.id).await, 100);
    }

    #[tokio::test]
    async fn test_relaxed_gate() {
        let (db, widget) = db_with_widget(StockGate::Relaxed).await;

        let items = db.inventory().increment_stock(widget.id, 150, "Widget").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(on_hand(&db, widget.id).await, 250);

        let items = db.inventory().decrement_stock(widget.id, 250, "Widget").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(on_hand(&db, widget.id).await, 0);

        let items = db.inventory().decrement_stock(widget.id, 1, "Widget").await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_movement_on_missing_product_is_not_found() {
        let (db, _) = db_with_widget(StockGate::Strict).await;

        let err = db.inventory().decrement_stock(404, 1, "Ghost").await.unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_negative_movement_is_validation_error() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        let err = db.inventory().increment_stock(widget.id, -5, "Widget").await.unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::Validation);
        assert_eq!(on_hand(&db, widget.id).await, 100);
    }

    #[tokio::test]
    async fn test_blank_name_uses_product_name() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        let items = db.inventory().decrement_stock(widget.id, 5, "  ").await.unwrap();
        assert_eq!(items[0].product_name, "Widget");

        // a supplied name is recorded but never renames the product
        let items = db.inventory().decrement_stock(widget.id, 5, "Widget (blue)").await.unwrap();
        assert_eq!(items[0].product_name, "Widget (blue)");
        let product = db.products().get_by_id(widget.id).await.unwrap().unwrap();
        assert_eq!(product.name, "Widget");
    }

    #[tokio::test]
    async fn test_concurrent_decrements_lose_no_updates() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let inventory = db.inventory();
            let id = widget.id;
            handles.push(tokio::spawn(async move {
                inventory.decrement_stock(id, 5, "Widget").await
            }));
        }
        for handle in handles {
            let items = handle.await.unwrap().unwrap();
            assert_eq!(items.len(), 1);
        }

        assert_eq!(on_hand(&db, widget.id).await, 50);
        assert_eq!(db.inventory().list().await.unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_concurrent_decrements_across_pooled_connections() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("stock.db")).max_connections(4))
            .await
            .unwrap();
        let widget = db
            .products()
            .create(&NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap())
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..10 {
            let inventory = db.inventory();
            let id = widget.id;
            handles.push(tokio::spawn(async move {
                inventory.decrement_stock(id, 5, "Widget").await
            }));
        }

        let mut failures = Vec::new();
        for handle in handles {
            match handle.await.unwrap() {
                Ok(items) => assert_eq!(items.len(), 1),
                Err(e) => failures.push(e.to_string()),
            }
        }

        assert!(failures.is_empty(), "movements failed: {:?}", failures);
        assert_eq!(on_hand(&db, widget.id).await, 50);
        assert_eq!(db.inventory().list().await.unwrap().len(), 10);
        db.close().await;
    }

    #[tokio::test]
    async fn test_crud() {
        let (db, widget) = db_with_widget(StockGate::Strict).await;
        let repo = db.inventory();

        let created = repo
            .create(&NewInventoryItem::new(widget.id, "Widget", 3).unwrap())
            .await
            .unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap(), Some(created.clone()));

        let updated = repo
            .update(created.id, &NewInventoryItem::new(widget.id, "Widget", 9).unwrap())
            .await
            .unwrap();
        assert_eq!(updated.quantity, 9);
        // creating or editing a movement row does not move stock
        assert_eq!(on_hand(&db, widget.id).await, 100);

        repo.delete(created.id).await.unwrap();
        assert_eq!(repo.get_by_id(created.id).await.unwrap(), None);

        let err = repo.delete(created.id).await.unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::NotFound);

        let err = repo
            .update(created.id, &NewInventoryItem::new(widget.id, "Widget", 1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_for_missing_product_is_constraint_violation() {
        let (db, _) = db_with_widget(StockGate::Strict).await;

        let err = db
            .inventory()
            .create(&NewInventoryItem::new(999, "Ghost", 1).unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), DbErrorKind::ConstraintViolation);
    }
}
