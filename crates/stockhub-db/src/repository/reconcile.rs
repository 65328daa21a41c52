//! # Snapshot Reconciliation
//!
//! Merges a client's cached catalog and ledger into the store when the
//! client comes back online, then returns the converged state.
//!
//! ## Merge Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       reconcile(products, inventory)                    │
//! │                                                                         │
//! │  BEGIN IMMEDIATE                                                       │
//! │                                                                         │
//! │  for each client product (matched by id)                               │
//! │    ├── no id            → INSERT, store assigns id                     │
//! │    ├── id not in store  → INSERT keeping the client's id               │
//! │    ├── name/price/qty ≠ → UPDATE to the client's values                │
//! │    └── identical        → leave                                        │
//! │                                                                         │
//! │  for each client inventory row                                         │
//! │    ├── id of a row for the same product → match that row               │
//! │    ├── id not in store  → INSERT keeping the client's id               │
//! │    ├── otherwise        → match the product's latest row               │
//! │    ├── none for product → INSERT                                       │
//! │    ├── name/qty ≠       → UPDATE that row                              │
//! │    └── identical        → leave                                        │
//! │                                                                         │
//! │  SELECT every product and inventory row                                │
//! │  COMMIT                                 return CatalogState            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Conflict Policy
//! The client's copy wins on any difference. There is no version or
//! timestamp comparison: two offline clients reconciling one after the other
//! leave the store holding the later client's values. The whole merge runs in
//! one transaction, so a snapshot is applied completely or not at all, and a
//! second reconcile of the same snapshot changes nothing.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::{inventory, product};
use stockhub_core::validation::validate_id;
use stockhub_core::{CatalogState, InventoryItemInput, ProductInput};

/// Per-run counters, logged when a reconcile commits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
}

/// Applies client snapshots to the store.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    pub fn new(pool: SqlitePool) -> Self {
        Reconciler { pool }
    }

    /// Merges the snapshot and returns the converged catalog and ledger.
    ///
    /// ## Errors
    /// Any invalid entry or store failure aborts the whole merge; nothing
    /// from the snapshot is kept.
    pub async fn reconcile(
        &self,
        products: &[ProductInput],
        items: &[InventoryItemInput],
    ) -> DbResult<CatalogState> {
        let mut tx = self.pool.begin_with(inventory::BEGIN_IMMEDIATE).await?;
        let mut product_stats = ReconcileStats::default();
        let mut inventory_stats = ReconcileStats::default();

        // Products first: inventory rows may reference products this same
        // snapshot introduces
        for input in products {
            let wanted = input.to_new_product()?;

            let Some(id) = input.id else {
                product::insert(&mut tx, &wanted).await?;
                product_stats.inserted += 1;
                continue;
            };
            validate_id("id", id)?;

            match product::select_by_id(&mut tx, id).await? {
                None => {
                    product::insert_with_id(&mut tx, id, &wanted).await?;
                    product_stats.inserted += 1;
                }
                Some(existing) if wanted.matches(&existing) => {
                    product_stats.unchanged += 1;
                }
                Some(_) => {
                    product::overwrite(&mut tx, id, &wanted).await?;
                    product_stats.updated += 1;
                }
            }
        }

        for input in items {
            let wanted = input.to_new_item()?;

            let matched = match input.id {
                Some(id) => {
                    validate_id("id", id)?;
                    match inventory::select_by_id(&mut tx, id).await? {
                        Some(row) if row.product_id == wanted.product_id => Some(row),
                        Some(_) => {
                            inventory::select_latest_for_product(&mut tx, wanted.product_id)
                                .await?
                        }
                        None => {
                            inventory::insert_with_id(&mut tx, id, &wanted).await?;
                            inventory_stats.inserted += 1;
                            continue;
                        }
                    }
                }
                None => inventory::select_latest_for_product(&mut tx, wanted.product_id).await?,
            };

            match matched {
                None => {
                    inventory::insert(&mut tx, &wanted).await?;
                    inventory_stats.inserted += 1;
                }
                Some(existing) if wanted.matches(&existing) => {
                    inventory_stats.unchanged += 1;
                }
                Some(existing) => {
                    debug!(id = existing.id, product_id = wanted.product_id, "Overwriting movement");
                    inventory::overwrite(&mut tx, existing.id, &wanted).await?;
                    inventory_stats.updated += 1;
                }
            }
        }

        let state = CatalogState {
            products: product::select_all(&mut tx).await?,
            inventory: inventory::select_all(&mut tx).await?,
        };

        tx.commit().await?;

        info!(
            products_inserted = product_stats.inserted,
            products_updated = product_stats.updated,
            products_unchanged = product_stats.unchanged,
            inventory_inserted = inventory_stats.inserted,
            inventory_updated = inventory_stats.updated,
            inventory_unchanged = inventory_stats.unchanged,
            "Snapshot reconciled"
        );

        Ok(state)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
