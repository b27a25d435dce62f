//! Held order record shapes shared by the store, the controller and the
//! command layer. Field names serialize as camelCase (the POS front end's
//! shape) and accept snake_case aliases on input.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line of a held sale, kept as the caller's JSON object.
///
/// The object is stored and returned verbatim. Description, quantity and
/// unit price are read through accessors that accept the key spellings the
/// POS screens use, first match wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HeldOrderItem(serde_json::Map<String, serde_json::Value>);

const DESCRIPTION_KEYS: &[&str] = &["description", "name", "item_name", "itemName", "title"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const UNIT_PRICE_KEYS: &[&str] = &["unit_price", "unitPrice", "price"];
const LINE_TOTAL_KEYS: &[&str] = &["total_price", "totalPrice"];

impl HeldOrderItem {
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert(
            "description".into(),
            serde_json::Value::String(description.into()),
        );
        fields.insert("quantity".into(), quantity.into());
        fields.insert("unitPrice".into(), unit_price.into());
        Self(fields)
    }

    /// Add or replace a field, builder style.
    pub fn with_field(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(key.into(), value);
        self
    }

    pub fn fields(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }

    pub fn description(&self) -> String {
        self.str_field(DESCRIPTION_KEYS).unwrap_or_default()
    }

    /// Missing quantity counts as one unit.
    pub fn quantity(&self) -> f64 {
        self.f64_field(QUANTITY_KEYS).unwrap_or(1.0)
    }

    pub fn unit_price(&self) -> f64 {
        self.f64_field(UNIT_PRICE_KEYS).unwrap_or(0.0)
    }

    /// Explicit line total when the cart supplied one, else quantity x price.
    pub fn line_total(&self) -> f64 {
        self.f64_field(LINE_TOTAL_KEYS)
            .unwrap_or_else(|| self.unit_price() * self.quantity())
    }

    fn str_field(&self, keys: &[&str]) -> Option<String> {
        for key in keys {
            if let Some(s) = self.0.get(*key).and_then(|v| v.as_str()) {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    return Some(trimmed.to_string());
                }
            }
        }
        None
    }

    fn f64_field(&self, keys: &[&str]) -> Option<f64> {
        keys.iter()
            .find_map(|key| self.0.get(*key).and_then(|v| v.as_f64()))
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for HeldOrderItem {
    fn from(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self(fields)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }

    /// Lenient parse used when reading rows; unknown tags read as `Normal`.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            "urgent" => Self::Urgent,
            _ => Self::Normal,
        }
    }
}

/// A parked sale. Stored and returned whole; the store never edits fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrder {
    pub id: String,
    #[serde(default, alias = "customer_name")]
    pub customer_name: String,
    #[serde(default, alias = "customer_phone")]
    pub customer_phone: String,
    #[serde(default)]
    pub items: Vec<HeldOrderItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default, alias = "tax_amount")]
    pub tax_amount: f64,
    #[serde(default, alias = "discount_amount")]
    pub discount_amount: f64,
    #[serde(default, alias = "total_amount")]
    pub total_amount: f64,
    #[serde(default, alias = "payment_method")]
    pub payment_method: String,
    #[serde(default, alias = "payment_terms")]
    pub payment_terms: String,
    #[serde(default, alias = "delivery_date")]
    pub delivery_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// Generate a held order id: `HOLD-<unix millis>-<8 hex>`.
///
/// The millisecond prefix keeps ids roughly time-ordered; the uuid suffix
/// keeps two holds in the same millisecond apart.
pub fn new_held_order_id(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("HOLD-{}-{}", now.timestamp_millis(), &suffix[..8])
}

/// One row of the hold picklist.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeldOrderSummary {
    pub id: String,
    pub customer_name: String,
    pub line_count: usize,
    pub item_count: f64,
    pub total_amount: f64,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
    pub elapsed: String,
}

impl HeldOrderSummary {
    pub fn from_order(order: &HeldOrder, now: DateTime<Utc>) -> Self {
        Self {
            id: order.id.clone(),
            customer_name: order.customer_name.clone(),
            line_count: order.items.len(),
            item_count: order.items.iter().map(HeldOrderItem::quantity).sum(),
            total_amount: order.total_amount,
            priority: order.priority,
            created_at: order.created_at,
            elapsed: elapsed_label(order.created_at, now),
        }
    }
}

/// Human label for the time since `then`, as shown in the hold list.
pub fn elapsed_label(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    if secs < 60 {
        "just now".to_string()
    } else if secs < 3_600 {
        format!("{}m ago", secs / 60)
    } else if secs < 86_400 {
        format!("{}h ago", secs / 3_600)
    } else {
        format!("{}d ago", secs / 86_400)
    }
}
