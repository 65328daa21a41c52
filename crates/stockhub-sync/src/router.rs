//! # Message Router
//!
//! Turns one inbound frame into at most one outbound envelope.
//!
//! ## Routing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         route(frame)                                    │
//! │                                                                         │
//! │  frame ──► parse ──✗──► Dropped(MalformedFrame)                        │
//! │              │                                                          │
//! │              ▼                                                          │
//! │        type == REQUEST ──✗──► Dropped(NotARequest)                     │
//! │              │                                                          │
//! │              ▼                                                          │
//! │        known action ──✗──► Dropped(UnknownAction)                     │
//! │              │                                                          │
//! │      ┌───────┴────────────────────┐                                    │
//! │      ▼                            ▼                                     │
//! │  TAG_WRITE                   everything else                           │
//! │  product found?              repositories / reconciler                 │
//! │   ├── yes → Forward(REQUEST)  ├── Ok  → Respond(SUCCESS)               │
//! │   └── no  → Respond(FAILURE)  └── Err → Respond(FAILURE, code)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The router holds no per-connection state. It never sees a socket: the
//! hub publishes whatever [`RouteOutcome`] carries.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::protocol::{
    Action, Envelope, ErrorCode, InventoryRequest, MessageType, ModeSwitchRequest,
    ProductRequest, ResponsePayload, SyncRequest, TagWriteRequest,
};
use stockhub_core::{Product, ValidationError};
use stockhub_db::{Database, DbError, DbErrorKind};

// =============================================================================
// Outcomes
// =============================================================================

/// Why a frame produced no envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Not JSON, or not shaped like an envelope.
    MalformedFrame(String),
    /// Parsed, but the action tag is not one the router knows.
    UnknownAction(String),
    /// A `RESPONSE` frame (e.g. the peripheral's tag-write reply).
    NotARequest(String),
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DropReason::MalformedFrame(detail) => write!(f, "malformed frame: {}", detail),
            DropReason::UnknownAction(tag) => write!(f, "unknown action: {}", tag),
            DropReason::NotARequest(action) => write!(f, "not a request: {}", action),
        }
    }
}

/// Result of routing one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    /// A `RESPONSE` to broadcast.
    Respond(Envelope),
    /// A `REQUEST` to broadcast for an external component.
    Forward(Envelope),
    /// Nothing goes out.
    Dropped(DropReason),
}

impl RouteOutcome {
    /// The envelope to publish, if any.
    pub fn into_envelope(self) -> Option<Envelope> {
        match self {
            RouteOutcome::Respond(envelope) | RouteOutcome::Forward(envelope) => Some(envelope),
            RouteOutcome::Dropped(_) => None,
        }
    }
}

// =============================================================================
// Mode Flag
// =============================================================================

/// Process-wide operating mode set by `MODE_SWITCH`.
///
/// The router only records it; readers outside the router act on it.
#[derive(Debug, Clone, Default)]
pub struct ModeFlag(Arc<RwLock<Option<String>>>);

impl ModeFlag {
    pub async fn get(&self) -> Option<String> {
        self.0.read().await.clone()
    }

    pub async fn set(&self, mode: impl Into<String>) {
        *self.0.write().await = Some(mode.into());
    }
}

// =============================================================================
// Request Failures
// =============================================================================

/// A request that reached a handler and failed.
#[derive(Debug)]
struct Failure {
    code: ErrorCode,
    message: String,
}

impl Failure {
    fn invalid_payload(message: impl Into<String>) -> Self {
        Failure {
            code: ErrorCode::InvalidPayload,
            message: message.into(),
        }
    }
}

impl From<DbError> for Failure {
    fn from(err: DbError) -> Self {
        let code = match err.kind() {
            DbErrorKind::ConstraintViolation => ErrorCode::ConstraintViolation,
            DbErrorKind::NotFound => ErrorCode::NotFound,
            DbErrorKind::Validation => ErrorCode::ValidationError,
            DbErrorKind::Storage => {
                error!(error = %err, "Storage failure while handling request");
                ErrorCode::StorageError
            }
        };
        Failure {
            code,
            message: err.to_string(),
        }
    }
}

impl From<ValidationError> for Failure {
    fn from(err: ValidationError) -> Self {
        Failure {
            code: ErrorCode::ValidationError,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Failure {
    fn from(err: serde_json::Error) -> Self {
        Failure::invalid_payload(err.to_string())
    }
}

type HandlerResult = Result<ResponsePayload, Failure>;

// =============================================================================
// Router
// =============================================================================

/// Dispatches envelopes to the store.
///
/// Cloning is cheap: the database handle and mode flag are shared.
#[derive(Debug, Clone)]
pub struct Router {
    db: Database,
    mode: ModeFlag,
}

impl Router {
    pub fn new(db: Database, mode: ModeFlag) -> Self {
        Router { db, mode }
    }

    pub fn mode(&self) -> &ModeFlag {
        &self.mode
    }

    /// Routes one inbound text frame.
    ///
    /// Every recognized request yields exactly one `Respond`, or a `Forward`
    /// for a `TAG_WRITE` whose product exists.
    pub async fn route(&self, frame: &str) -> RouteOutcome {
        let request = match Envelope::from_json(frame) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(error = %e, "Dropping malformed frame");
                return RouteOutcome::Dropped(DropReason::MalformedFrame(e.to_string()));
            }
        };

        if request.message_type != MessageType::Request {
            debug!(action = %request.action, "Dropping non-request frame");
            return RouteOutcome::Dropped(DropReason::NotARequest(request.action));
        }

        let Some(action) = request.known_action() else {
            warn!(action = %request.action, "Dropping frame with unknown action");
            return RouteOutcome::Dropped(DropReason::UnknownAction(request.action));
        };

        debug!(action = %action, message_id = %request.message_id, "Routing request");

        if action == Action::TagWrite {
            return self.tag_write(&request).await;
        }

        match self.dispatch(action, &request).await {
            Ok(payload) => RouteOutcome::Respond(Envelope::success(&request, payload)),
            Err(failure) => {
                warn!(
                    action = %action,
                    code = ?failure.code,
                    message = %failure.message,
                    "Request failed"
                );
                RouteOutcome::Respond(Envelope::failure(&request, failure.code, failure.message))
            }
        }
    }

    async fn dispatch(&self, action: Action, request: &Envelope) -> HandlerResult {
        match action {
            Action::ProductGetAll => Ok(ResponsePayload::products(self.db.products().list().await?)),
            Action::ProductGetById => self.product_get_by_id(payload(request)?).await,
            Action::ProductAddEdit => self.product_add_edit(payload(request)?).await,
            Action::ProductDelete => self.product_delete(payload(request)?).await,
            Action::InventoryGetAll => Ok(ResponsePayload::inventory_items(
                self.db.inventory().list().await?,
            )),
            Action::InventoryGetById => self.inventory_get_by_id(payload(request)?).await,
            Action::InventoryAddEdit => self.inventory_add_edit(payload(request)?).await,
            Action::InventoryDelete => self.inventory_delete(payload(request)?).await,
            Action::InventoryIn | Action::InventoryOut => {
                self.inventory_move(action, payload(request)?).await
            }
            Action::ModeSwitch => self.mode_switch(payload(request)?).await,
            Action::Sync => self.sync(payload(request)?).await,
            Action::TagWrite => Err(Failure::invalid_payload("TAG_WRITE is forwarded, not handled")),
        }
    }

    // =========================================================================
    // Products
    // =========================================================================

    async fn product_get_by_id(&self, request: ProductRequest) -> HandlerResult {
        let id = request
            .target_id()
            .ok_or_else(|| Failure::invalid_payload("product_id is required"))?;
        let found = self.db.products().get_by_id(id).await?;
        Ok(ResponsePayload::products(found.into_iter().collect()))
    }

    async fn product_add_edit(&self, request: ProductRequest) -> HandlerResult {
        let entry = request
            .products
            .first()
            .ok_or_else(|| Failure::invalid_payload("products must hold one entry"))?;
        let product = entry.to_new_product()?;

        let saved = match request.target_id() {
            Some(id) => self.db.products().update(id, &product).await?,
            None => self.db.products().create(&product).await?,
        };
        Ok(ResponsePayload::products(vec![saved]))
    }

    async fn product_delete(&self, request: ProductRequest) -> HandlerResult {
        let id = request
            .target_id()
            .ok_or_else(|| Failure::invalid_payload("product_id is required"))?;
        self.db.products().delete(id).await?;
        Ok(ResponsePayload::product_id(id))
    }

    // =========================================================================
    // Inventory
    // =========================================================================

    async fn inventory_get_by_id(&self, request: InventoryRequest) -> HandlerResult {
        let id = request
            .target_id()
            .ok_or_else(|| Failure::invalid_payload("inventory_id is required"))?;
        let found = self.db.inventory().get_by_id(id).await?;
        Ok(ResponsePayload::inventory_items(found.into_iter().collect()))
    }

    async fn inventory_add_edit(&self, request: InventoryRequest) -> HandlerResult {
        let entry = request
            .inventory_items
            .first()
            .ok_or_else(|| Failure::invalid_payload("inventory_items must hold one entry"))?;
        let item = entry.to_new_item()?;

        let saved = match request.target_id() {
            Some(id) => self.db.inventory().update(id, &item).await?,
            None => self.db.inventory().create(&item).await?,
        };
        Ok(ResponsePayload::inventory_items(vec![saved]))
    }

    async fn inventory_delete(&self, request: InventoryRequest) -> HandlerResult {
        let id = request
            .target_id()
            .ok_or_else(|| Failure::invalid_payload("inventory_id is required"))?;
        self.db.inventory().delete(id).await?;
        Ok(ResponsePayload::inventory_id(id))
    }

    /// `INVENTORY_IN` / `INVENTORY_OUT`. A movement the stock gate declines
    /// is still a success, with an empty `inventory_items`.
    async fn inventory_move(&self, action: Action, request: InventoryRequest) -> HandlerResult {
        let entry = request
            .inventory_items
            .first()
            .ok_or_else(|| Failure::invalid_payload("inventory_items must hold one entry"))?;
        let movement = entry.to_new_item()?;

        let inventory = self.db.inventory();
        let recorded = if action == Action::InventoryIn {
            inventory
                .increment_stock(movement.product_id, movement.quantity, &movement.product_name)
                .await?
        } else {
            inventory
                .decrement_stock(movement.product_id, movement.quantity, &movement.product_name)
                .await?
        };
        Ok(ResponsePayload::inventory_items(recorded))
    }

    // =========================================================================
    // Mode, Sync, Tag Write
    // =========================================================================

    async fn mode_switch(&self, request: ModeSwitchRequest) -> HandlerResult {
        debug!(mode = %request.mode, "Switching mode");
        self.mode.set(request.mode.clone()).await;
        Ok(ResponsePayload::mode(request.mode))
    }

    async fn sync(&self, request: SyncRequest) -> HandlerResult {
        let state = self
            .db
            .reconciler()
            .reconcile(&request.products, &request.inventory)
            .await?;
        Ok(ResponsePayload::catalog(state.products, state.inventory))
    }

    async fn tag_write(&self, request: &Envelope) -> RouteOutcome {
        match self.tag_write_target(request).await {
            Ok(product) => {
                debug!(product_id = product.id, "Forwarding tag write to peripheral");
                RouteOutcome::Forward(Envelope::tag_write(request, product))
            }
            Err(failure) => {
                warn!(code = ?failure.code, message = %failure.message, "Tag write failed");
                RouteOutcome::Respond(Envelope::failure(request, failure.code, failure.message))
            }
        }
    }

    async fn tag_write_target(&self, request: &Envelope) -> Result<Product, Failure> {
        let target: TagWriteRequest = payload(request)?;
        let product = self.db.products().get_by_id(target.product_id).await?;
        product.ok_or_else(|| DbError::not_found("Product", target.product_id).into())
    }
}

fn payload<T: DeserializeOwned>(request: &Envelope) -> Result<T, Failure> {
    Ok(request.parse_payload()?)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Component, Status};
    use serde_json::{json, Value};
    use stockhub_core::{Money, NewInventoryItem, NewProduct, Product};
    use stockhub_db::DbConfig;

    async fn test_router() -> Router {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        Router::new(db, ModeFlag::default())
    }

    async fn widget(router: &Router) -> Product {
        router
            .db
            .products()
            .create(&NewProduct::new("Widget", Money::from_cents(1000), 100).unwrap())
            .await
            .unwrap()
    }

    async fn send(router: &Router, frame: Value) -> RouteOutcome {
        router.route(&frame.to_string()).await
    }

    fn respond(outcome: RouteOutcome) -> (Envelope, ResponsePayload) {
        match outcome {
            RouteOutcome::Respond(envelope) => {
                assert_eq!(envelope.message_type, MessageType::Response);
                assert_eq!(envelope.status, Some(Status::Success), "{:?}", envelope.payload);
                let payload = serde_json::from_value(envelope.payload.clone()).unwrap();
                (envelope, payload)
            }
            other => panic!("expected a response, got {:?}", other),
        }
    }

    fn failure_code(outcome: RouteOutcome) -> String {
        match outcome {
            RouteOutcome::Respond(envelope) => {
                assert_eq!(envelope.status, Some(Status::Failure));
                envelope.payload["error"]["code"].as_str().unwrap().to_string()
            }
            other => panic!("expected a failure response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_inventory_out_scenario() {
        let router = test_router().await;
        let product = widget(&router).await;

        let outcome = send(
            &router,
            json!({
                "action": "INVENTORY_OUT",
                "type": "REQUEST",
                "message_id": "out-1",
                "payload": {"inventory_items": [
                    {"product_id": product.id, "product_name": "Widget", "quantity": 20}
                ]}
            }),
        )
        .await;

        let (envelope, payload) = respond(outcome);
        assert_eq!(envelope.action, "INVENTORY_OUT");
        assert_eq!(envelope.message_id, json!("out-1"));
        let items = payload.inventory_items.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 20);

        let stored = router.db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 80);
    }

    #[tokio::test]
    async fn test_inventory_in_over_stock_is_noop() {
        let router = test_router().await;
        let product = widget(&router).await;

        let outcome = send(
            &router,
            json!({
                "action": "INVENTORY_IN",
                "message_id": 2,
                "payload": {"inventory_items": [
                    {"product_id": product.id, "product_name": "Widget", "quantity": 150}
                ]}
            }),
        )
        .await;

        let (_, payload) = respond(outcome);
        assert_eq!(payload.inventory_items, Some(vec![]));

        let stored = router.db.products().get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 100);
    }

    #[tokio::test]
    async fn test_movement_on_missing_product_is_not_found() {
        let router = test_router().await;

        let outcome = send(
            &router,
            json!({
                "action": "INVENTORY_OUT",
                "payload": {"inventory_items": [{"product_id": 42, "quantity": 1}]}
            }),
        )
        .await;

        assert_eq!(failure_code(outcome), "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_drops_are_named() {
        let router = test_router().await;

        assert!(matches!(
            router.route("{not json").await,
            RouteOutcome::Dropped(DropReason::MalformedFrame(_))
        ));
        assert_eq!(
            send(&router, json!({"action": "REBOOT", "type": "REQUEST"})).await,
            RouteOutcome::Dropped(DropReason::UnknownAction("REBOOT".to_string()))
        );
        assert_eq!(
            send(&router, json!({"action": "TAG_WRITE", "type": "RESPONSE", "status": "SUCCESS"}))
                .await,
            RouteOutcome::Dropped(DropReason::NotARequest("TAG_WRITE".to_string()))
        );
    }

    #[tokio::test]
    async fn test_browser_timestamp_and_foreign_component_still_answered() {
        let router = test_router().await;
        widget(&router).await;

        let (envelope, payload) = respond(
            send(
                &router,
                json!({
                    "action": "PRODUCT_GET_ALL",
                    "type": "REQUEST",
                    "message_id": "m1",
                    "timestamp": 1700000000000_i64
                }),
            )
            .await,
        );
        assert_eq!(envelope.message_id, json!("m1"));
        assert_eq!(payload.products.unwrap().len(), 1);

        let (envelope, _) = respond(
            send(
                &router,
                json!({
                    "action": "INVENTORY_GET_ALL",
                    "type": "REQUEST",
                    "message_id": "m2",
                    "component": "POS"
                }),
            )
            .await,
        );
        assert_eq!(envelope.message_id, json!("m2"));
    }

    #[tokio::test]
    async fn test_product_add_edit_creates_then_updates() {
        let router = test_router().await;

        let (_, created) = respond(
            send(
                &router,
                json!({
                    "action": "PRODUCT_ADD_EDIT",
                    "payload": {"products": [{"name": "Bolt", "price": 0.35, "quantity": 400}]}
                }),
            )
            .await,
        );
        let created = created.products.unwrap().remove(0);
        assert!(created.id > 0);
        assert_eq!(created.price, Money::from_cents(35));
        assert_eq!(created.quantity, 400);

        let (_, updated) = respond(
            send(
                &router,
                json!({
                    "action": "PRODUCT_ADD_EDIT",
                    "payload": {
                        "product_id": created.id,
                        "products": [{"id": created.id, "name": "Bolt M6", "price": "0.40", "quantity": 390}]
                    }
                }),
            )
            .await,
        );
        let updated = updated.products.unwrap().remove(0);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "Bolt M6");
        assert_eq!(updated.price, Money::from_cents(40));
        assert_eq!(router.db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_product_add_edit_failures() {
        let router = test_router().await;

        let empty = send(&router, json!({"action": "PRODUCT_ADD_EDIT", "payload": {"products": []}}));
        assert_eq!(failure_code(empty.await), "INVALID_PAYLOAD");

        let nameless = send(
            &router,
            json!({"action": "PRODUCT_ADD_EDIT", "payload": {"products": [{"name": "  "}]}}),
        );
        assert_eq!(failure_code(nameless.await), "VALIDATION_ERROR");

        let missing = send(
            &router,
            json!({"action": "PRODUCT_ADD_EDIT", "payload": {"product_id": 99, "products": [{"name": "Ghost"}]}}),
        );
        assert_eq!(failure_code(missing.await), "NOT_FOUND");

        let shapeless = send(&router, json!({"action": "PRODUCT_ADD_EDIT", "payload": {"products": 5}}));
        assert_eq!(failure_code(shapeless.await), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_delete_referenced_product_fails() {
        let router = test_router().await;
        let product = widget(&router).await;
        router
            .db
            .inventory()
            .create(&NewInventoryItem::new(product.id, "Widget", 5).unwrap())
            .await
            .unwrap();

        let outcome = send(
            &router,
            json!({"action": "PRODUCT_DELETE", "message_id": "d", "payload": {"product_id": product.id}}),
        )
        .await;

        assert_eq!(failure_code(outcome), "CONSTRAINT_VIOLATION");
        assert!(router.db.products().get_by_id(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_product_delete_echoes_id() {
        let router = test_router().await;
        let product = widget(&router).await;

        let (_, payload) = respond(
            send(&router, json!({"action": "PRODUCT_DELETE", "payload": {"product_id": product.id}}))
                .await,
        );
        assert_eq!(payload.product_id, Some(product.id));
        assert_eq!(router.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_by_id_missing_is_empty_success() {
        let router = test_router().await;

        let (_, products) = respond(
            send(&router, json!({"action": "PRODUCT_GET_BY_ID", "payload": {"product_id": 5}})).await,
        );
        assert_eq!(products.products, Some(vec![]));

        let (_, items) = respond(
            send(&router, json!({"action": "INVENTORY_GET_BY_ID", "payload": {"inventory_id": "5"}}))
                .await,
        );
        assert_eq!(items.inventory_items, Some(vec![]));
    }

    #[tokio::test]
    async fn test_get_all() {
        let router = test_router().await;
        let product = widget(&router).await;

        let (_, payload) = respond(send(&router, json!({"action": "PRODUCT_GET_ALL"})).await);
        assert_eq!(payload.products, Some(vec![product]));

        let (_, payload) = respond(send(&router, json!({"action": "INVENTORY_GET_ALL"})).await);
        assert_eq!(payload.inventory_items, Some(vec![]));
    }

    #[tokio::test]
    async fn test_inventory_add_edit_and_delete() {
        let router = test_router().await;
        let product = widget(&router).await;

        let (_, created) = respond(
            send(
                &router,
                json!({
                    "action": "INVENTORY_ADD_EDIT",
                    "payload": {"inventory_items": [{"product_id": product.id, "product_name": "Widget", "quantity": 3}]}
                }),
            )
            .await,
        );
        let created = created.inventory_items.unwrap().remove(0);

        let (_, updated) = respond(
            send(
                &router,
                json!({
                    "action": "INVENTORY_ADD_EDIT",
                    "payload": {
                        "inventory_id": created.id,
                        "inventory_items": [{"product_id": product.id, "product_name": "Widget", "quantity": 4}]
                    }
                }),
            )
            .await,
        );
        assert_eq!(updated.inventory_items.unwrap()[0].quantity, 4);

        let (_, deleted) = respond(
            send(&router, json!({"action": "INVENTORY_DELETE", "payload": {"inventory_id": created.id}}))
                .await,
        );
        assert_eq!(deleted.inventory_id, Some(created.id));
        assert!(router.db.inventory().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_inventory_for_missing_product_is_constraint_violation() {
        let router = test_router().await;

        let outcome = send(
            &router,
            json!({
                "action": "INVENTORY_ADD_EDIT",
                "payload": {"inventory_items": [{"product_id": 77, "quantity": 1}]}
            }),
        )
        .await;

        assert_eq!(failure_code(outcome), "CONSTRAINT_VIOLATION");
    }

    #[tokio::test]
    async fn test_tag_write_forwards_request() {
        let router = test_router().await;
        let product = widget(&router).await;

        let outcome = send(
            &router,
            json!({"action": "TAG_WRITE", "message_id": "tag-1", "payload": product.id}),
        )
        .await;

        let RouteOutcome::Forward(envelope) = outcome else {
            panic!("expected a forwarded request, got {:?}", outcome);
        };
        assert_eq!(envelope.action, "TAG_WRITE");
        assert_eq!(envelope.message_type, MessageType::Request);
        assert_eq!(envelope.component, Some(Component::Iot));
        assert_eq!(envelope.status, None);
        assert_eq!(envelope.message_id, json!("tag-1"));

        let payload: ResponsePayload = serde_json::from_value(envelope.payload).unwrap();
        assert_eq!(payload.product_id, Some(product.id));
        assert_eq!(payload.products, Some(vec![product]));
    }

    #[tokio::test]
    async fn test_tag_write_missing_product_is_not_found() {
        let router = test_router().await;

        let outcome = send(&router, json!({"action": "TAG_WRITE", "payload": {"product_id": 3}})).await;
        assert_eq!(failure_code(outcome), "NOT_FOUND");

        let outcome = send(&router, json!({"action": "TAG_WRITE"})).await;
        assert_eq!(failure_code(outcome), "INVALID_PAYLOAD");
    }

    #[tokio::test]
    async fn test_mode_switch_sets_flag() {
        let router = test_router().await;
        assert_eq!(router.mode().get().await, None);

        let (_, payload) = respond(
            send(&router, json!({"action": "MODE_SWITCH", "payload": {"mode": "WRITE"}})).await,
        );

        assert_eq!(payload.mode.as_deref(), Some("WRITE"));
        assert_eq!(router.mode().get().await.as_deref(), Some("WRITE"));
    }

    #[tokio::test]
    async fn test_sync_returns_converged_state() {
        let router = test_router().await;
        let stored = widget(&router).await;

        let (envelope, payload) = respond(
            send(
                &router,
                json!({
                    "action": "SYNC",
                    "message_id": "s",
                    "payload": {
                        "products": [
                            {"id": stored.id, "name": "Widget", "price": 11.0, "quantity": 90},
                            {"id": 50, "name": "Nut", "price": 0.1, "quantity": 1000}
                        ],
                        "inventory": [{"product_id": 50, "product_name": "Nut", "quantity": 10}]
                    }
                }),
            )
            .await,
        );

        assert_eq!(envelope.action, "SYNC");
        let products = payload.products.unwrap();
        assert_eq!(products.len(), 2);
        let merged = products.iter().find(|p| p.id == stored.id).unwrap();
        assert_eq!(merged.price, Money::from_cents(1100));
        assert_eq!(merged.quantity, 90);
        assert_eq!(payload.inventory.unwrap().len(), 1);
    }
}
