//! Active sale state as the POS screen holds it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{HeldOrder, HeldOrderItem, Priority};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCart {
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
}

impl ActiveCart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn add_item(&mut self, item: HeldOrderItem) {
        self.items.push(item);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Recompute subtotal, tax and total from the lines.
    ///
    /// Tax applies to the subtotal after discount. The discount is capped at
    /// the subtotal and the taxable base floors at zero, so neither tax nor
    /// total goes negative even when return lines outweigh sales.
    pub fn recalculate(&mut self, tax_rate: f64) {
        self.subtotal = round2(self.items.iter().map(HeldOrderItem::line_total).sum());
        self.discount_amount = self.discount_amount.clamp(0.0, self.subtotal.max(0.0));
        let taxable = (self.subtotal - self.discount_amount).max(0.0);
        self.tax_amount = round2(taxable * tax_rate.max(0.0));
        self.total_amount = round2(taxable + self.tax_amount);
    }

    /// Snapshot the cart as a held order. Amounts are copied, not derived.
    pub fn to_held_order(
        &self,
        id: String,
        created_at: DateTime<Utc>,
        priority: Priority,
    ) -> HeldOrder {
        HeldOrder {
            id,
            customer_name: self.customer_name.clone(),
            customer_phone: self.customer_phone.clone(),
            items: self.items.clone(),
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            payment_method: self.payment_method.clone(),
            payment_terms: self.payment_terms.clone(),
            delivery_date: self.delivery_date,
            notes: self.notes.clone(),
            priority,
            created_at,
        }
    }

    /// Replace the cart contents with a held order's contents.
    pub fn load_held_order(&mut self, order: HeldOrder) {
        *self = Self {
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            items: order.items,
            subtotal: order.subtotal,
            tax_amount: order.tax_amount,
            discount_amount: order.discount_amount,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            payment_terms: order.payment_terms,
            delivery_date: order.delivery_date,
            notes: order.notes,
        };
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
