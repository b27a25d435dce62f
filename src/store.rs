//! Held order persistence.
//!
//! `HeldOrderStore` is the seam between the hold/resume workflow and the
//! device-local storage engine. Records are written and read whole; the
//! store never edits a field.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, MutexGuard};
use tracing::{debug, info, warn};

use crate::config::HeldOrdersConfig;
use crate::db::{self, DbState};
use crate::error::{HeldOrderError, Result};
use crate::models::{HeldOrder, HeldOrderItem, Priority};

pub trait HeldOrderStore: Send + Sync {
    /// Insert or overwrite the record with `order.id`.
    fn put(&self, order: &HeldOrder) -> Result<()>;

    /// Every stored record, in no particular order.
    fn get_all(&self) -> Result<Vec<HeldOrder>>;

    /// Remove a record. Removing an id that is not stored succeeds.
    fn delete(&self, id: &str) -> Result<()>;

    /// Read and remove a record in one step. `None` when not stored.
    fn take(&self, id: &str) -> Result<Option<HeldOrder>>;

    /// Remove every record created before `cutoff`. Returns how many went.
    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

/// Open the configured store, falling back to [`UnavailableStore`] when the
/// database cannot be opened so the sale screen keeps working.
pub fn open_store(config: &HeldOrdersConfig) -> Arc<dyn HeldOrderStore> {
    match SqliteHeldOrderStore::open(config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            warn!(error = %e, "held orders disabled: storage could not be opened");
            Arc::new(UnavailableStore::new(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// SQLite
// ---------------------------------------------------------------------------

const SELECT_COLUMNS: &str = "id, customer_name, customer_phone, items, subtotal, tax_amount,
    discount_amount, total_amount, payment_method, payment_terms, delivery_date, notes,
    priority, created_at";

pub struct SqliteHeldOrderStore {
    db: DbState,
}

impl SqliteHeldOrderStore {
    pub fn open(config: &HeldOrdersConfig) -> Result<Self> {
        let db = db::init(&config.data_dir, &config.db_file_name)
            .map_err(HeldOrderError::StorageUnavailable)?;
        info!(path = %db.db_path.display(), "held order store opened");
        Ok(Self { db })
    }

    /// Location of the backing database file (`:memory:` for in-memory).
    pub fn path(&self) -> &Path {
        &self.db.db_path
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = db::init_in_memory().map_err(HeldOrderError::StorageUnavailable)?;
        Ok(Self { db })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.db
            .conn
            .lock()
            .map_err(|e| HeldOrderError::StorageUnavailable(e.to_string()))
    }
}

/// Timestamps are stored with fixed-width nanoseconds so text comparison
/// in SQL matches chronological order.
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Raw column values, decoded outside the rusqlite row callback so JSON and
/// timestamp failures surface as `Serialization` rather than engine errors.
struct HeldOrderRow {
    id: String,
    customer_name: String,
    customer_phone: String,
    items: String,
    subtotal: f64,
    tax_amount: f64,
    discount_amount: f64,
    total_amount: f64,
    payment_method: String,
    payment_terms: String,
    delivery_date: Option<String>,
    notes: String,
    priority: String,
    created_at: String,
}

impl HeldOrderRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            customer_name: row.get(1)?,
            customer_phone: row.get(2)?,
            items: row.get(3)?,
            subtotal: row.get(4)?,
            tax_amount: row.get(5)?,
            discount_amount: row.get(6)?,
            total_amount: row.get(7)?,
            payment_method: row.get(8)?,
            payment_terms: row.get(9)?,
            delivery_date: row.get(10)?,
            notes: row.get(11)?,
            priority: row.get(12)?,
            created_at: row.get(13)?,
        })
    }

    fn into_order(self) -> Result<HeldOrder> {
        let items: Vec<HeldOrderItem> = serde_json::from_str(&self.items).map_err(|e| {
            HeldOrderError::Serialization(format!("held order {} items: {e}", self.id))
        })?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| {
                HeldOrderError::Serialization(format!("held order {} created_at: {e}", self.id))
            })?
            .with_timezone(&Utc);
        let delivery_date = match self.delivery_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(
                NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| {
                    HeldOrderError::Serialization(format!(
                        "held order {} delivery_date: {e}",
                        self.id
                    ))
                })?,
            ),
            _ => None,
        };

        Ok(HeldOrder {
            id: self.id,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items,
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            discount_amount: self.discount_amount,
            total_amount: self.total_amount,
            payment_method: self.payment_method,
            payment_terms: self.payment_terms,
            delivery_date,
            notes: self.notes,
            priority: Priority::parse_lenient(&self.priority),
            created_at,
        })
    }
}

fn select_one(conn: &Connection, id: &str) -> Result<Option<HeldOrder>> {
    let row = conn
        .query_row(
            &format!("SELECT {SELECT_COLUMNS} FROM held_orders WHERE id = ?1"),
            params![id],
            HeldOrderRow::from_row,
        )
        .optional()?;
    row.map(HeldOrderRow::into_order).transpose()
}

impl HeldOrderStore for SqliteHeldOrderStore {
    fn put(&self, order: &HeldOrder) -> Result<()> {
        let items = serde_json::to_string(&order.items)?;
        let delivery_date = order
            .delivery_date
            .map(|d| d.format("%Y-%m-%d").to_string());

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO held_orders (
                id, customer_name, customer_phone, items, subtotal, tax_amount,
                discount_amount, total_amount, payment_method, payment_terms,
                delivery_date, notes, priority, created_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
             ON CONFLICT(id) DO UPDATE SET
                customer_name = excluded.customer_name,
                customer_phone = excluded.customer_phone,
                items = excluded.items,
                subtotal = excluded.subtotal,
                tax_amount = excluded.tax_amount,
                discount_amount = excluded.discount_amount,
                total_amount = excluded.total_amount,
                payment_method = excluded.payment_method,
                payment_terms = excluded.payment_terms,
                delivery_date = excluded.delivery_date,
                notes = excluded.notes,
                priority = excluded.priority,
                created_at = excluded.created_at",
            params![
                order.id,
                order.customer_name,
                order.customer_phone,
                items,
                order.subtotal,
                order.tax_amount,
                order.discount_amount,
                order.total_amount,
                order.payment_method,
                order.payment_terms,
                delivery_date,
                order.notes,
                order.priority.as_str(),
                format_timestamp(order.created_at),
            ],
        )?;
        debug!(held_order_id = %order.id, "held order stored");
        Ok(())
    }

    /// Rows that cannot be decoded are logged and skipped so one bad record
    /// does not hide the rest of the hold list.
    fn get_all(&self) -> Result<Vec<HeldOrder>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("SELECT {SELECT_COLUMNS} FROM held_orders"))?;
        let rows = stmt
            .query_map([], HeldOrderRow::from_row)?
            .filter_map(|r| match r {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable held order row");
                    None
                }
            })
            .collect::<Vec<_>>();
        Ok(rows
            .into_iter()
            .filter_map(|row| match row.into_order() {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(error = %e, "skipping undecodable held order");
                    None
                }
            })
            .collect())
    }

    fn delete(&self, id: &str) -> Result<()> {
        let conn = self.conn()?;
        let removed = conn.execute("DELETE FROM held_orders WHERE id = ?1", params![id])?;
        debug!(held_order_id = %id, removed, "held order delete");
        Ok(())
    }

    fn take(&self, id: &str) -> Result<Option<HeldOrder>> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let order = select_one(&tx, id)?;
        if order.is_some() {
            tx.execute("DELETE FROM held_orders WHERE id = ?1", params![id])?;
        }
        tx.commit()?;
        Ok(order)
    }

    fn purge_older_than(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM held_orders WHERE created_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        if removed > 0 {
            info!(removed, cutoff = %cutoff, "purged expired held orders");
        }
        Ok(removed)
    }
}

// ---------------------------------------------------------------------------
// Unavailable
// ---------------------------------------------------------------------------

/// Store used when the database could not be opened. Every call fails with
/// `StorageUnavailable` carrying the original open error.
#[derive(Debug, Clone)]
pub struct UnavailableStore {
    reason: String,
}

impl UnavailableStore {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    fn fail<T>(&self) -> Result<T> {
        Err(HeldOrderError::StorageUnavailable(self.reason.clone()))
    }
}

impl HeldOrderStore for UnavailableStore {
    fn put(&self, _order: &HeldOrder) -> Result<()> {
        self.fail()
    }

    fn get_all(&self) -> Result<Vec<HeldOrder>> {
        self.fail()
    }

    fn delete(&self, _id: &str) -> Result<()> {
        self.fail()
    }

    fn take(&self, _id: &str) -> Result<Option<HeldOrder>> {
        self.fail()
    }

    fn purge_older_than(&self, _cutoff: DateTime<Utc>) -> Result<usize> {
        self.fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn store() -> SqliteHeldOrderStore {
        SqliteHeldOrderStore::open_in_memory().expect("in-memory store")
    }

    fn order(id: &str, created_at: DateTime<Utc>) -> HeldOrder {
        let item = HeldOrderItem::new("Kandura", 2.0, 150.0)
            .with_field("size", serde_json::json!("58"));
        HeldOrder {
            id: id.to_string(),
            customer_name: "Khalid".into(),
            customer_phone: "+971500000000".into(),
            items: vec![item],
            subtotal: 300.0,
            tax_amount: 15.0,
            discount_amount: 0.0,
            total_amount: 315.0,
            payment_method: "card".into(),
            payment_terms: "on delivery".into(),
            delivery_date: NaiveDate::from_ymd_opt(2026, 5, 20),
            notes: "Tailoring: shorten sleeves".into(),
            priority: Priority::High,
            created_at,
        }
    }

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn test_put_then_get_all_returns_identical_record() {
        let s = store();
        let mut o = order("HOLD-1", t(0));
        o.created_at = o.created_at + Duration::nanoseconds(123_456_789);
        s.put(&o).unwrap();

        let all = s.get_all().unwrap();
        assert_eq!(all, vec![o]);
    }

    #[test]
    fn test_put_overwrites_same_id() {
        let s = store();
        s.put(&order("HOLD-1", t(0))).unwrap();

        let mut updated = order("HOLD-1", t(5));
        updated.customer_name = "Khalid Al Mansoori".into();
        updated.items.clear();
        updated.delivery_date = None;
        s.put(&updated).unwrap();

        let all = s.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0], updated);
    }

    #[test]
    fn test_delete_removes_and_is_idempotent() {
        let s = store();
        s.put(&order("HOLD-1", t(0))).unwrap();
        s.put(&order("HOLD-2", t(1))).unwrap();

        s.delete("HOLD-1").unwrap();
        let ids: Vec<String> = s.get_all().unwrap().into_iter().map(|o| o.id).collect();
        assert_eq!(ids, vec!["HOLD-2".to_string()]);

        s.delete("HOLD-1").unwrap();
        s.delete("never-held").unwrap();
        assert_eq!(s.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_take_moves_record_out() {
        let s = store();
        let o = order("HOLD-1", t(0));
        s.put(&o).unwrap();

        assert_eq!(s.take("HOLD-1").unwrap(), Some(o));
        assert!(s.get_all().unwrap().is_empty());
        assert_eq!(s.take("HOLD-1").unwrap(), None);
    }

    #[test]
    fn test_purge_older_than_keeps_recent() {
        let s = store();
        s.put(&order("old", t(0))).unwrap();
        s.put(&order("edge", t(60))).unwrap();
        s.put(&order("new", t(120))).unwrap();

        let removed = s.purge_older_than(t(60)).unwrap();
        assert_eq!(removed, 1);

        let mut ids: Vec<String> = s.get_all().unwrap().into_iter().map(|o| o.id).collect();
        ids.sort();
        assert_eq!(ids, vec!["edge".to_string(), "new".to_string()]);
    }

    #[test]
    fn test_corrupt_row_skipped_in_list_but_reported_on_take() {
        let s = store();
        s.put(&order("HOLD-1", t(0))).unwrap();
        s.put(&order("HOLD-2", t(1))).unwrap();
        {
            let conn = s.conn().unwrap();
            conn.execute("UPDATE held_orders SET items = 'not json' WHERE id = 'HOLD-1'", [])
                .unwrap();
        }

        let all = s.get_all().unwrap();
        assert_eq!(all, vec![order("HOLD-2", t(1))]);

        let err = s.take("HOLD-1").unwrap_err();
        assert!(matches!(err, HeldOrderError::Serialization(_)), "{err:?}");
    }

    #[test]
    fn test_mixed_key_items_stored_verbatim() {
        let s = store();
        let raw = serde_json::json!({
            "name": "Kandura (short)",
            "description": "Kandura",
            "qty": 2,
            "price": 150,
            "unitPrice": 150
        });
        let mut o = order("HOLD-1", t(0));
        o.items = vec![serde_json::from_value(raw.clone()).unwrap()];
        s.put(&o).unwrap();

        let back = s.take("HOLD-1").unwrap().unwrap();
        assert_eq!(serde_json::to_value(&back.items[0]).unwrap(), raw);
        assert_eq!(back.items[0].quantity(), 2.0);
    }

    #[test]
    fn test_unavailable_store_fails_everything() {
        let s = UnavailableStore::new("private mode");
        let o = order("HOLD-1", t(0));
        for result in [
            s.put(&o).map(|_| ()),
            s.get_all().map(|_| ()),
            s.delete("HOLD-1"),
            s.take("HOLD-1").map(|_| ()),
            s.purge_older_than(t(0)).map(|_| ()),
        ] {
            match result {
                Err(HeldOrderError::StorageUnavailable(reason)) => {
                    assert_eq!(reason, "private mode")
                }
                other => panic!("expected StorageUnavailable, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let config = HeldOrdersConfig::new(dir.path());
        {
            let s = SqliteHeldOrderStore::open(&config).unwrap();
            s.put(&order("HOLD-1", t(0))).unwrap();
        }
        let s = SqliteHeldOrderStore::open(&config).unwrap();
        assert_eq!(s.path(), config.db_path().as_path());
        assert_eq!(s.get_all().unwrap(), vec![order("HOLD-1", t(0))]);
    }

    #[test]
    fn test_legacy_schema_degrades_without_losing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let config = HeldOrdersConfig::new(dir.path());
        {
            let conn = Connection::open(config.db_path()).unwrap();
            conn.execute_batch(
                "CREATE TABLE held_orders (id TEXT PRIMARY KEY, payload TEXT);
                 INSERT INTO held_orders VALUES ('legacy-1', '{}');",
            )
            .unwrap();
        }

        let store = open_store(&config);
        let err = store.get_all().unwrap_err();
        assert!(matches!(err, HeldOrderError::StorageUnavailable(_)), "{err:?}");

        let conn = Connection::open(config.db_path()).unwrap();
        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM held_orders", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[test]
    fn test_open_store_falls_back_when_dir_unusable() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"file").unwrap();

        let store = open_store(&HeldOrdersConfig::new(blocker.join("nested")));
        let err = store.get_all().unwrap_err();
        assert!(matches!(err, HeldOrderError::StorageUnavailable(_)));
    }
}
