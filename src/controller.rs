//! Hold/resume workflow between the active sale and the held order store.
//!
//! Store calls run on the blocking pool so the caller's event loop is never
//! parked on SQLite. Errors come back as `HeldOrderError`; the command layer
//! turns them into notifications.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

use crate::cart::ActiveCart;
use crate::config::HeldOrdersConfig;
use crate::error::{HeldOrderError, Result};
use crate::models::{new_held_order_id, HeldOrder, HeldOrderSummary, Priority};
use crate::store::{open_store, HeldOrderStore};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Default)]
pub struct HoldOptions {
    pub priority: Priority,
    /// Replaces the cart's notes on the held order when set.
    pub notes: Option<String>,
}

/// What to do when resuming while the active cart still has lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResumeMode {
    #[default]
    RequireEmptyCart,
    DiscardActive,
}

pub struct HoldController {
    store: Arc<dyn HeldOrderStore>,
    retention_days: Option<u32>,
    clock: Clock,
}

impl HoldController {
    pub fn new(store: Arc<dyn HeldOrderStore>) -> Self {
        Self {
            store,
            retention_days: None,
            clock: Arc::new(Utc::now),
        }
    }

    /// Open the configured store (degrading to unavailable on failure).
    pub fn from_config(config: &HeldOrdersConfig) -> Self {
        Self::new(open_store(config)).with_retention_days(config.retention_days)
    }

    pub fn with_retention_days(mut self, days: Option<u32>) -> Self {
        self.retention_days = days;
        self
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&dyn HeldOrderStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| HeldOrderError::StorageUnavailable(format!("{op} task failed: {e}")))?
    }

    /// Park the cart. The cart is cleared only once the record is stored.
    pub async fn hold(&self, cart: &mut ActiveCart, options: HoldOptions) -> Result<HeldOrder> {
        if cart.is_empty() {
            return Err(HeldOrderError::EmptyCart);
        }

        let now = self.now();
        let mut order = cart.to_held_order(new_held_order_id(now), now, options.priority);
        if let Some(notes) = options.notes {
            order.notes = notes;
        }

        let to_store = order.clone();
        if let Err(e) = self
            .run_blocking("hold", move |store| store.put(&to_store))
            .await
        {
            warn!(error = %e, "hold failed, active cart kept");
            return Err(e);
        }

        cart.clear();
        info!(
            held_order_id = %order.id,
            lines = order.items.len(),
            total = order.total_amount,
            "sale held"
        );
        Ok(order)
    }

    /// Held orders for the picklist, newest first.
    pub async fn list(&self) -> Result<Vec<HeldOrderSummary>> {
        let mut orders = self.run_blocking("list", |store| store.get_all()).await?;
        orders.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        let now = self.now();
        Ok(orders
            .iter()
            .map(|o| HeldOrderSummary::from_order(o, now))
            .collect())
    }

    /// Move a held order into the active cart.
    ///
    /// The record is read and deleted in one store transaction, so a crash
    /// after this point cannot leave the order both held and in the cart.
    pub async fn resume(
        &self,
        id: &str,
        cart: &mut ActiveCart,
        mode: ResumeMode,
    ) -> Result<HeldOrder> {
        if !cart.is_empty() && mode == ResumeMode::RequireEmptyCart {
            return Err(HeldOrderError::CartNotEmpty);
        }

        let key = id.to_string();
        let order = self
            .run_blocking("resume", move |store| store.take(&key))
            .await?
            .ok_or_else(|| HeldOrderError::NotFound(id.to_string()))?;

        if !cart.is_empty() {
            info!(
                held_order_id = %order.id,
                discarded_lines = cart.items.len(),
                "active cart discarded on resume"
            );
        }
        cart.load_held_order(order.clone());
        info!(held_order_id = %order.id, "held order resumed");
        Ok(order)
    }

    /// Remove a held order from the list without resuming it.
    pub async fn discard(&self, id: &str) -> Result<()> {
        let key = id.to_string();
        self.run_blocking("discard", move |store| store.delete(&key))
            .await?;
        info!(held_order_id = %id, "held order discarded");
        Ok(())
    }

    /// Apply the retention window. Returns the number of orders purged.
    pub async fn purge_expired(&self) -> Result<usize> {
        let Some(days) = self.retention_days else {
            return Ok(0);
        };
        let cutoff = self.now() - Duration::days(i64::from(days));
        self.run_blocking("purge", move |store| store.purge_older_than(cutoff))
            .await
    }
}
