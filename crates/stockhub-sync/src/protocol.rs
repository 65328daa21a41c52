//! # Wire Protocol
//!
//! The JSON envelope exchanged with terminals and peripherals over the hub's
//! WebSocket, plus the typed payloads carried inside it.
//!
//! ## Protocol Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Stockhub Envelope Flow                             │
//! │                                                                         │
//! │  CATALOG / LEDGER                                                      │
//! │  ────────────────                                                      │
//! │  Client ───► { action: PRODUCT_GET_ALL, type: REQUEST, message_id }    │
//! │  ALL    ◄─── { action: PRODUCT_GET_ALL, type: RESPONSE, status,        │
//! │                message_id, payload: { products, timestamp } }          │
//! │                                                                         │
//! │  STOCK MOVEMENT                                                        │
//! │  ──────────────                                                        │
//! │  Client ───► INVENTORY_OUT { inventory_items: [{ product_id, qty }] }  │
//! │  ALL    ◄─── INVENTORY_OUT RESPONSE { inventory_items: [movement] }    │
//! │                                                                         │
//! │  OFFLINE SNAPSHOT                                                      │
//! │  ────────────────                                                      │
//! │  Client ───► SYNC { products, inventory }                              │
//! │  ALL    ◄─── SYNC RESPONSE { products, inventory }  (converged)        │
//! │                                                                         │
//! │  TAG WRITE (forwarded, not answered)                                   │
//! │  ───────────────────────────────────                                   │
//! │  Client ───► TAG_WRITE 7                                               │
//! │  ALL    ◄─── TAG_WRITE REQUEST component: IOT { products: [product] }  │
//! │                                                                         │
//! │  FAILURE                                                               │
//! │  ───────                                                               │
//! │  ALL    ◄─── RESPONSE status: FAILURE { error: { code, message } }     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wire Format
//! ```json
//! { "action": "INVENTORY_OUT", "type": "REQUEST", "message_id": "abc",
//!   "timestamp": "2026-01-01T00:00:00Z", "status": "SUCCESS",
//!   "payload": { ... }, "component": "IOT" }
//! ```
//!
//! `action` stays a plain string in [`Envelope`] so an unknown tag still
//! parses as an envelope; [`Action::from_tag`] decides whether it is known.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use ts_rs::TS;

use stockhub_core::types::deserialize_optional_integer;
use stockhub_core::{InventoryItem, InventoryItemInput, Product, ProductInput};

// =============================================================================
// Actions
// =============================================================================

/// Every action tag the router understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Action {
    ProductGetAll,
    ProductGetById,
    ProductAddEdit,
    ProductDelete,
    InventoryGetAll,
    InventoryGetById,
    InventoryAddEdit,
    InventoryDelete,
    InventoryIn,
    InventoryOut,
    ModeSwitch,
    Sync,
    TagWrite,
}

impl Action {
    pub const ALL: [Action; 13] = [
        Action::ProductGetAll,
        Action::ProductGetById,
        Action::ProductAddEdit,
        Action::ProductDelete,
        Action::InventoryGetAll,
        Action::InventoryGetById,
        Action::InventoryAddEdit,
        Action::InventoryDelete,
        Action::InventoryIn,
        Action::InventoryOut,
        Action::ModeSwitch,
        Action::Sync,
        Action::TagWrite,
    ];

    /// Returns the wire tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::ProductGetAll => "PRODUCT_GET_ALL",
            Action::ProductGetById => "PRODUCT_GET_BY_ID",
            Action::ProductAddEdit => "PRODUCT_ADD_EDIT",
            Action::ProductDelete => "PRODUCT_DELETE",
            Action::InventoryGetAll => "INVENTORY_GET_ALL",
            Action::InventoryGetById => "INVENTORY_GET_BY_ID",
            Action::InventoryAddEdit => "INVENTORY_ADD_EDIT",
            Action::InventoryDelete => "INVENTORY_DELETE",
            Action::InventoryIn => "INVENTORY_IN",
            Action::InventoryOut => "INVENTORY_OUT",
            Action::ModeSwitch => "MODE_SWITCH",
            Action::Sync => "SYNC",
            Action::TagWrite => "TAG_WRITE",
        }
    }

    /// Looks up a wire tag. Tags are case-sensitive.
    pub fn from_tag(tag: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|action| action.as_str() == tag)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Envelope Fields
// =============================================================================

/// Direction of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MessageType {
    /// Inbound frames without a `type` are requests.
    #[default]
    Request,
    Response,
}

/// Outcome carried on responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Status {
    Success,
    Failure,
}

/// Addressed component for peripheral traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub enum Component {
    /// Tag-writing peripheral.
    #[serde(rename = "IOT")]
    Iot,
    /// Browser terminal.
    #[serde(rename = "WEB")]
    Web,
}

// =============================================================================
// Envelope
// =============================================================================

/// One frame on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Envelope {
    /// Action tag, see [`Action`].
    pub action: String,

    #[serde(rename = "type", default)]
    pub message_type: MessageType,

    /// Correlation id chosen by the requester, echoed verbatim.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub message_id: Value,

    /// RFC 3339 string on outbound frames. Inbound values are kept as sent:
    /// browsers often send epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | number | null")]
    pub timestamp: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub status: Option<Status>,

    #[serde(default)]
    #[ts(type = "unknown")]
    pub payload: Value,

    /// Unrecognized component names read as absent.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_component"
    )]
    #[ts(optional)]
    pub component: Option<Component>,
}

impl Envelope {
    /// Creates a request envelope.
    pub fn request(action: Action, message_id: Value, payload: Value) -> Self {
        Envelope {
            action: action.as_str().to_string(),
            message_type: MessageType::Request,
            message_id,
            timestamp: Some(Value::String(now())),
            status: None,
            payload,
            component: None,
        }
    }

    /// Creates the success response to `request`.
    pub fn success(request: &Envelope, payload: ResponsePayload) -> Self {
        Self::response(request, Status::Success, to_value(&payload))
    }

    /// Creates the failure response to `request`.
    pub fn failure(request: &Envelope, code: ErrorCode, message: impl Into<String>) -> Self {
        let payload = ErrorPayload {
            error: ErrorBody {
                code,
                message: message.into(),
            },
            timestamp: now(),
        };
        Self::response(request, Status::Failure, to_value(&payload))
    }

    fn response(request: &Envelope, status: Status, payload: Value) -> Self {
        Envelope {
            action: request.action.clone(),
            message_type: MessageType::Response,
            message_id: request.message_id.clone(),
            timestamp: Some(Value::String(now())),
            status: Some(status),
            payload,
            component: None,
        }
    }

    /// Creates the `TAG_WRITE` request forwarded to the tag-writing
    /// peripheral, carrying the product's current attributes.
    pub fn tag_write(request: &Envelope, product: Product) -> Self {
        let payload = ResponsePayload {
            product_id: Some(product.id),
            products: Some(vec![product]),
            ..Default::default()
        };
        Envelope::request(Action::TagWrite, request.message_id.clone(), to_value(&payload))
            .with_component(Component::Iot)
    }

    /// Addresses the envelope to a component.
    pub fn with_component(mut self, component: Component) -> Self {
        self.component = Some(component);
        self
    }

    /// Returns the recognized action, if any.
    pub fn known_action(&self) -> Option<Action> {
        Action::from_tag(&self.action)
    }

    /// Decodes the payload. A missing or `null` payload reads as `{}`, so
    /// payload types whose fields all default accept it.
    pub fn parse_payload<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        match &self.payload {
            Value::Null => serde_json::from_value(Value::Object(Default::default())),
            payload => T::deserialize(payload),
        }
    }

    /// Serializes to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes from JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

// Response payloads are plain structs of serializable fields; if conversion
// ever failed the frame still goes out, with a null payload.
fn to_value<T: Serialize>(payload: &T) -> Value {
    serde_json::to_value(payload).unwrap_or(Value::Null)
}

// =============================================================================
// Request Payloads
// =============================================================================

/// Payload of the `PRODUCT_*` actions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProductRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub products: Vec<ProductInput>,

    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub product_id: Option<i64>,
}

impl ProductRequest {
    /// The targeted product: `product_id`, else the first entry's `id`.
    pub fn target_id(&self) -> Option<i64> {
        self.product_id
            .or_else(|| self.products.first().and_then(|p| p.id))
    }
}

/// Payload of the `INVENTORY_*` actions, movements included.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct InventoryRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub inventory_items: Vec<InventoryItemInput>,

    #[serde(default, deserialize_with = "deserialize_optional_integer")]
    pub inventory_id: Option<i64>,
}

impl InventoryRequest {
    /// The targeted row: `inventory_id`, else the first entry's `id`.
    pub fn target_id(&self) -> Option<i64> {
        self.inventory_id
            .or_else(|| self.inventory_items.first().and_then(|i| i.id))
    }
}

/// Payload of `MODE_SWITCH`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModeSwitchRequest {
    pub mode: String,
}

/// Payload of `SYNC`: the client's cached catalog and ledger.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SyncRequest {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub products: Vec<ProductInput>,

    #[serde(default, alias = "inventory_items", deserialize_with = "null_as_empty")]
    pub inventory: Vec<InventoryItemInput>,
}

/// Payload of `TAG_WRITE`: a bare product id or `{ product_id }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagWriteRequest {
    pub product_id: i64,
}

impl<'de> Deserialize<'de> for TagWriteRequest {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default, deserialize_with = "deserialize_optional_integer")]
            product_id: Option<i64>,
        }

        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Shape {
            Wrapped(Wrapped),
            Bare(#[serde(deserialize_with = "deserialize_optional_integer")] Option<i64>),
        }

        let product_id = match Shape::deserialize(deserializer)? {
            Shape::Wrapped(w) => w.product_id,
            Shape::Bare(id) => id,
        };
        product_id
            .map(|product_id| TagWriteRequest { product_id })
            .ok_or_else(|| serde::de::Error::custom("missing product_id"))
    }
}

fn lenient_component<'de, D>(deserializer: D) -> Result<Option<Component>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| Component::deserialize(value).ok()))
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Response Payloads
// =============================================================================

/// Success payload; only the fields relevant to the action are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ResponsePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub products: Option<Vec<Product>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub inventory_items: Option<Vec<InventoryItem>>,

    /// Ledger returned by `SYNC`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub inventory: Option<Vec<InventoryItem>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub product_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub inventory_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub mode: Option<String>,

    pub timestamp: String,
}

impl Default for ResponsePayload {
    fn default() -> Self {
        ResponsePayload {
            products: None,
            inventory_items: None,
            inventory: None,
            product_id: None,
            inventory_id: None,
            mode: None,
            timestamp: now(),
        }
    }
}

impl ResponsePayload {
    pub fn products(products: Vec<Product>) -> Self {
        ResponsePayload {
            products: Some(products),
            ..Default::default()
        }
    }

    pub fn inventory_items(items: Vec<InventoryItem>) -> Self {
        ResponsePayload {
            inventory_items: Some(items),
            ..Default::default()
        }
    }

    pub fn product_id(id: i64) -> Self {
        ResponsePayload {
            product_id: Some(id),
            ..Default::default()
        }
    }

    pub fn inventory_id(id: i64) -> Self {
        ResponsePayload {
            inventory_id: Some(id),
            ..Default::default()
        }
    }

    pub fn mode(mode: impl Into<String>) -> Self {
        ResponsePayload {
            mode: Some(mode.into()),
            ..Default::default()
        }
    }

    pub fn catalog(products: Vec<Product>, inventory: Vec<InventoryItem>) -> Self {
        ResponsePayload {
            products: Some(products),
            inventory: Some(inventory),
            ..Default::default()
        }
    }
}

// =============================================================================
// Failure Payloads
// =============================================================================

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ErrorCode {
    /// Foreign-key or uniqueness failure.
    ConstraintViolation,
    NotFound,
    /// A field failed domain validation.
    ValidationError,
    /// The payload does not have the shape the action needs.
    InvalidPayload,
    StorageError,
}

/// `{ error: { code, message }, timestamp }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorPayload {
    pub error: ErrorBody,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: String,
}
