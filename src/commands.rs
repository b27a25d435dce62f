//! JSON command handlers for the POS shell.
//!
//! Every handler returns a `{ "success": bool, ... }` value. Failures carry
//! an `error` string and a `notification` the sale screen shows as a toast;
//! nothing here returns `Err` or panics.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::cart::ActiveCart;
use crate::controller::{HoldController, HoldOptions, ResumeMode};
use crate::error::HeldOrderError;
use crate::models::Priority;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HoldPayload {
    #[serde(default)]
    priority: Option<String>,
    #[serde(default, alias = "order_notes", alias = "orderNotes")]
    notes: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResumePayload {
    #[serde(alias = "order_id")]
    #[serde(alias = "id")]
    #[serde(alias = "heldOrderId")]
    order_id: String,
    #[serde(default, alias = "discard_active")]
    discard_active: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeletePayload {
    #[serde(alias = "order_id")]
    #[serde(alias = "id")]
    #[serde(alias = "heldOrderId")]
    order_id: String,
}

/// A bare string payload is taken as the order id.
fn normalize_id_payload(payload: Option<Value>) -> Value {
    match payload {
        Some(Value::String(order_id)) => json!({ "orderId": order_id }),
        Some(v) => v,
        None => json!({}),
    }
}

fn parse_resume_payload(payload: Option<Value>) -> Result<ResumePayload, HeldOrderError> {
    let mut parsed: ResumePayload = serde_json::from_value(normalize_id_payload(payload))
        .map_err(|e| HeldOrderError::Invalid(format!("resume payload: {e}")))?;
    parsed.order_id = parsed.order_id.trim().to_string();
    if parsed.order_id.is_empty() {
        return Err(HeldOrderError::Invalid("Missing orderId".into()));
    }
    Ok(parsed)
}

fn parse_delete_payload(payload: Option<Value>) -> Result<DeletePayload, HeldOrderError> {
    let mut parsed: DeletePayload = serde_json::from_value(normalize_id_payload(payload))
        .map_err(|e| HeldOrderError::Invalid(format!("delete payload: {e}")))?;
    parsed.order_id = parsed.order_id.trim().to_string();
    if parsed.order_id.is_empty() {
        return Err(HeldOrderError::Invalid("Missing orderId".into()));
    }
    Ok(parsed)
}

fn parse_hold_payload(payload: Option<Value>) -> Result<HoldOptions, HeldOrderError> {
    let parsed: HoldPayload = match payload {
        None | Some(Value::Null) => HoldPayload::default(),
        Some(v) => serde_json::from_value(v)
            .map_err(|e| HeldOrderError::Invalid(format!("hold payload: {e}")))?,
    };
    Ok(HoldOptions {
        priority: parsed
            .priority
            .as_deref()
            .map(Priority::parse_lenient)
            .unwrap_or_default(),
        notes: parsed.notes,
    })
}

fn failure(command: &str, err: &HeldOrderError) -> Value {
    warn!(command, error = %err, "held order command failed");
    json!({
        "success": false,
        "error": err.to_string(),
        "notification": {
            "level": err.notification_level(),
            "message": err.notification_message(),
        }
    })
}

pub async fn held_orders_hold(
    controller: &HoldController,
    cart: &mut ActiveCart,
    payload: Option<Value>,
) -> Value {
    let options = match parse_hold_payload(payload) {
        Ok(o) => o,
        Err(e) => return failure("held_orders_hold", &e),
    };
    match controller.hold(cart, options).await {
        Ok(order) => json!({ "success": true, "heldOrder": order }),
        Err(e) => failure("held_orders_hold", &e),
    }
}

pub async fn held_orders_list(controller: &HoldController) -> Value {
    match controller.list().await {
        Ok(orders) => json!({ "success": true, "orders": orders }),
        Err(e) => failure("held_orders_list", &e),
    }
}

pub async fn held_orders_resume(
    controller: &HoldController,
    cart: &mut ActiveCart,
    payload: Option<Value>,
) -> Value {
    let parsed = match parse_resume_payload(payload) {
        Ok(p) => p,
        Err(e) => return failure("held_orders_resume", &e),
    };
    let mode = if parsed.discard_active {
        ResumeMode::DiscardActive
    } else {
        ResumeMode::RequireEmptyCart
    };
    match controller.resume(&parsed.order_id, cart, mode).await {
        Ok(order) => json!({ "success": true, "heldOrder": order }),
        Err(e) => failure("held_orders_resume", &e),
    }
}

pub async fn held_orders_delete(controller: &HoldController, payload: Option<Value>) -> Value {
    let parsed = match parse_delete_payload(payload) {
        Ok(p) => p,
        Err(e) => return failure("held_orders_delete", &e),
    };
    match controller.discard(&parsed.order_id).await {
        Ok(()) => json!({ "success": true }),
        Err(e) => failure("held_orders_delete", &e),
    }
}
