//! The Small POS - held orders
//!
//! Device-local parking of in-progress sales. A cashier holds the active
//! cart, the sale is written to a local SQLite file, and it can be resumed
//! later from the hold list on the same device.

use tracing::{info, warn};

mod cart;
mod commands;
mod config;
mod controller;
mod db;
mod error;
mod logging;
mod models;
mod store;

pub use cart::ActiveCart;
pub use commands::{held_orders_delete, held_orders_hold, held_orders_list, held_orders_resume};
pub use config::HeldOrdersConfig;
pub use controller::{Clock, HoldController, HoldOptions, ResumeMode};
pub use error::{HeldOrderError, Result};
pub use logging::{default_log_dir, init_logging, prune_old_logs};
pub use models::{
    elapsed_label, new_held_order_id, HeldOrder, HeldOrderItem, HeldOrderSummary, Priority,
};
pub use store::{open_store, HeldOrderStore, SqliteHeldOrderStore, UnavailableStore};

/// Build the controller for `config` and apply the retention window once.
///
/// Never fails: an unopenable database yields a controller whose operations
/// report `StorageUnavailable`, and a failed purge is only logged.
pub async fn start(config: &HeldOrdersConfig) -> HoldController {
    info!(
        "Starting held orders v{} ({})",
        env!("CARGO_PKG_VERSION"),
        config.db_path().display()
    );
    let controller = HoldController::from_config(config);
    match controller.purge_expired().await {
        Ok(0) => {}
        Ok(removed) => info!(removed, "expired held orders purged on startup"),
        Err(e) => warn!(error = %e, "held order retention purge failed"),
    }
    controller
}
