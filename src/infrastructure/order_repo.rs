use chrono::Utc;
use log::{debug, warn};
use rand::Rng;

use crate::domain::errors::DomainError;
use crate::domain::order::{Cursor, FindResult, NewOrder, Order, Page};
use crate::domain::ports::OrderRepository;

use super::keys::{order_key, parse_order_key, ORDER_KEY_PATTERN};
use super::models::OrderRecord;
use super::store::{OrderStore, StoreError, TxOutcome};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        DomainError::Store(Box::new(e))
    }
}

fn encode(order: &Order) -> Result<String, DomainError> {
    serde_json::to_string(&OrderRecord::from(order))
        .map_err(|e| DomainError::Internal(format!("failed to encode order: {e}")))
}

/// Decodes the record stored under `key`, which must carry the id the key names.
fn decode(key: &str, data: &str) -> Result<Order, DomainError> {
    let record: OrderRecord = serde_json::from_str(data)
        .map_err(|e| DomainError::Internal(format!("failed to decode order at {key}: {e}")))?;
    if parse_order_key(key) != Some(record.order_id) {
        return Err(DomainError::Internal(format!(
            "record at {key} holds order {}",
            record.order_id
        )));
    }
    Ok(Order::from(record))
}

/// Uniform random identifier in `1..=u64::MAX`.
pub fn random_order_id() -> u64 {
    rand::thread_rng().gen_range(1..=u64::MAX)
}

// ── Repository ────────────────────────────────────────────────────────────────

type IdGenerator = Box<dyn Fn() -> u64 + Send + Sync>;

/// [`OrderRepository`] over a key-value [`OrderStore`].
///
/// Each order is a JSON blob under `order:<id>`, and its key is a member of
/// the store's index set for as long as the order exists. Create and delete
/// change both in a single store transaction.
pub struct KvOrderRepository<S> {
    store: S,
    next_id: IdGenerator,
}

impl<S: OrderStore> KvOrderRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_id_generator(store, Box::new(random_order_id))
    }

    /// Uses `next_id` instead of [`random_order_id`] to assign identifiers.
    pub fn with_id_generator(store: S, next_id: IdGenerator) -> Self {
        Self { store, next_id }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: OrderStore> OrderRepository for KvOrderRepository<S> {
    fn create(&self, new_order: NewOrder) -> Result<Order, DomainError> {
        let order = Order {
            order_id: (self.next_id)(),
            customer_id: new_order.customer_id,
            line_items: new_order.line_items,
            created_at: Some(Utc::now()),
        };
        let data = encode(&order)?;
        let key = order_key(order.order_id);

        let mut tx = self.store.transaction();
        tx.set_if_absent(&key, data).index_add(&key);

        match tx.commit()? {
            TxOutcome::Committed => {
                debug!("created {key}");
                Ok(order)
            }
            TxOutcome::Rejected { .. } => {
                warn!("order id collision on {key}, keeping the existing record");
                Err(DomainError::AlreadyExists)
            }
        }
    }

    fn list(&self, page: Page) -> Result<FindResult, DomainError> {
        let scan = self.store.index_scan(
            page.offset.position(),
            ORDER_KEY_PATTERN,
            page.size.max(1),
        )?;
        let cursor = Cursor::new(scan.cursor);
        if scan.is_last() {
            debug!("scan of {} complete", self.store.index().name());
        }

        if scan.keys.is_empty() {
            return Ok(FindResult {
                orders: Vec::new(),
                cursor,
            });
        }

        let values = self.store.multi_get(&scan.keys)?;

        let mut orders = Vec::with_capacity(values.len());
        for (key, value) in scan.keys.iter().zip(values) {
            match value {
                Some(data) => orders.push(decode(key, &data)?),
                // Deleted between the scan and the read.
                None => warn!("skipping {key}: indexed but no longer stored"),
            }
        }

        Ok(FindResult { orders, cursor })
    }

    fn get_by_id(&self, order_id: u64) -> Result<Order, DomainError> {
        let key = order_key(order_id);
        match self.store.get_string(&key) {
            Ok(data) => decode(&key, &data),
            Err(StoreError::NotFound { .. }) => Err(DomainError::NotExist),
            Err(e) => Err(e.into()),
        }
    }

    fn update_by_id(&self, order: &Order) -> Result<(), DomainError> {
        let data = encode(order)?;
        let key = order_key(order.order_id);
        match self.store.set_if_present(&key, &data) {
            Ok(()) => {
                debug!("updated {key}");
                Ok(())
            }
            Err(StoreError::NotFound { .. }) => Err(DomainError::NotExist),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_by_id(&self, order_id: u64) -> Result<(), DomainError> {
        let key = order_key(order_id);

        let mut tx = self.store.transaction();
        tx.delete_existing(&key).index_remove(&key);

        match tx.commit()? {
            TxOutcome::Committed => {
                debug!("deleted {key}");
                Ok(())
            }
            TxOutcome::Rejected { .. } => Err(DomainError::NotExist),
        }
    }

    fn health(&self) -> Result<(), DomainError> {
        Ok(self.store.ping()?)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::str::FromStr;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use bigdecimal::BigDecimal;
    use uuid::Uuid;

    use super::*;
    use crate::domain::order::LineItem;
    use crate::infrastructure::store::{MemoryStore, SCAN_START};

    fn make_item(item_id: &str, quantity: u32) -> LineItem {
        LineItem {
            item_id: item_id.to_string(),
            quantity,
            unit_price: None,
        }
    }

    fn make_order(customer_id: Uuid) -> NewOrder {
        NewOrder {
            customer_id,
            line_items: vec![make_item("sku-1", 2)],
        }
    }

    fn repo() -> KvOrderRepository<MemoryStore> {
        KvOrderRepository::new(MemoryStore::new())
    }

    fn sequential_repo(start: u64) -> KvOrderRepository<MemoryStore> {
        let next = Arc::new(AtomicU64::new(start));
        KvOrderRepository::with_id_generator(
            MemoryStore::new(),
            Box::new(move || next.fetch_add(1, Ordering::SeqCst)),
        )
    }

    fn list_all(repo: &KvOrderRepository<MemoryStore>, size: u64) -> Vec<Order> {
        let mut cursor = Cursor::START;
        let mut orders = Vec::new();
        loop {
            let page = repo
                .list(Page {
                    offset: cursor,
                    size,
                })
                .expect("list failed");
            orders.extend(page.orders);
            cursor = page.cursor;
            if cursor.is_start() {
                return orders;
            }
        }
    }

    #[test]
    fn create_and_get_by_id_roundtrip() {
        let repo = repo();
        let customer_id =
            Uuid::parse_str("11111111-1111-1111-1111-111111111111").expect("valid uuid");

        let created = repo.create(make_order(customer_id)).expect("create failed");

        assert_ne!(created.order_id, 0);
        assert!(created.created_at.is_some());
        assert_eq!(created.customer_id, customer_id);
        assert_eq!(created.line_items, vec![make_item("sku-1", 2)]);

        let fetched = repo.get_by_id(created.order_id).expect("get failed");
        assert_eq!(fetched, created);
    }

    #[test]
    fn create_preserves_decimal_prices() {
        let repo = repo();
        let mut new_order = make_order(Uuid::new_v4());
        new_order.line_items[0].unit_price =
            Some(BigDecimal::from_str("19.990").expect("valid decimal"));

        let created = repo.create(new_order).expect("create failed");
        let fetched = repo.get_by_id(created.order_id).expect("get failed");

        assert_eq!(
            fetched.line_items[0].unit_price,
            Some(BigDecimal::from_str("19.99").expect("valid decimal"))
        );
    }

    #[test]
    fn create_writes_record_and_index_entry() {
        let repo = repo();
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");

        let key = order_key(created.order_id);
        assert!(repo.store().get_string(&key).is_ok());
        assert_eq!(repo.store().index_members(), vec![key]);
    }

    #[test]
    fn id_collision_fails_without_overwriting() {
        let repo = KvOrderRepository::with_id_generator(MemoryStore::new(), Box::new(|| 7u64));

        let first = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        let second = repo.create(make_order(Uuid::new_v4()));

        assert!(matches!(second, Err(DomainError::AlreadyExists)));
        assert_eq!(repo.get_by_id(7).expect("get failed"), first);
        assert_eq!(repo.store().index_members(), vec![order_key(7)]);
    }

    #[test]
    fn random_ids_are_never_zero() {
        for _ in 0..1000 {
            assert_ne!(random_order_id(), 0);
        }
    }

    #[test]
    fn get_by_id_unknown_is_not_exist() {
        let repo = repo();
        assert!(matches!(repo.get_by_id(42), Err(DomainError::NotExist)));
    }

    #[test]
    fn get_by_id_corrupt_record_is_internal() {
        let repo = repo();
        repo.store().put_raw(&order_key(5), "not json");

        assert!(matches!(repo.get_by_id(5), Err(DomainError::Internal(_))));
    }

    #[test]
    fn get_by_id_record_under_wrong_key_is_internal() {
        let repo = sequential_repo(1);
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        let data = repo
            .store()
            .get_string(&order_key(created.order_id))
            .expect("stored");
        repo.store().put_raw(&order_key(2), &data);

        assert!(matches!(repo.get_by_id(2), Err(DomainError::Internal(_))));
    }

    #[test]
    fn update_replaces_value_and_keeps_membership() {
        let repo = repo();
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");

        let mut changed = created.clone();
        changed.line_items = vec![make_item("sku-2", 5), make_item("sku-3", 1)];
        repo.update_by_id(&changed).expect("update failed");

        assert_eq!(repo.get_by_id(created.order_id).expect("get failed"), changed);
        assert_eq!(
            repo.store().index_members(),
            vec![order_key(created.order_id)]
        );
    }

    #[test]
    fn update_unknown_is_not_exist_and_creates_nothing() {
        let repo = repo();
        let ghost = Order {
            order_id: 99,
            customer_id: Uuid::new_v4(),
            line_items: vec![],
            created_at: None,
        };

        assert!(matches!(
            repo.update_by_id(&ghost),
            Err(DomainError::NotExist)
        ));
        assert!(matches!(repo.get_by_id(99), Err(DomainError::NotExist)));
        assert!(repo.store().index_members().is_empty());
    }

    #[test]
    fn delete_removes_record_and_index_entry() {
        let repo = repo();
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");

        repo.delete_by_id(created.order_id).expect("delete failed");

        assert!(matches!(
            repo.get_by_id(created.order_id),
            Err(DomainError::NotExist)
        ));
        assert!(repo.store().index_members().is_empty());
    }

    #[test]
    fn delete_unknown_is_not_exist_every_time() {
        let repo = repo();
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        repo.delete_by_id(created.order_id).expect("delete failed");

        assert!(matches!(
            repo.delete_by_id(created.order_id),
            Err(DomainError::NotExist)
        ));
        assert!(matches!(repo.delete_by_id(12345), Err(DomainError::NotExist)));
    }

    #[test]
    fn delete_of_unindexed_key_leaves_index_alone() {
        let repo = repo();
        repo.store().index_add(&order_key(3)).expect("index add");

        assert!(matches!(repo.delete_by_id(3), Err(DomainError::NotExist)));
        assert_eq!(repo.store().index_members(), vec![order_key(3)]);
    }

    #[test]
    fn list_returns_empty_when_no_orders() {
        let repo = repo();
        let result = repo
            .list(Page {
                offset: Cursor::START,
                size: 20,
            })
            .expect("list failed");

        assert!(result.orders.is_empty());
        assert!(result.cursor.is_start());
    }

    #[test]
    fn list_includes_freshly_created_order() {
        let repo = repo();
        let created = repo.create(make_order(Uuid::new_v4())).expect("create failed");

        let result = repo
            .list(Page {
                offset: Cursor::START,
                size: 100,
            })
            .expect("list failed");

        assert!(result.cursor.is_start());
        assert_eq!(result.orders, vec![created]);
    }

    #[test]
    fn list_paginates_with_cursor_until_wrap() {
        let repo = sequential_repo(1);
        let created: HashSet<u64> = (0..5)
            .map(|_| {
                repo.create(make_order(Uuid::new_v4()))
                    .expect("create failed")
                    .order_id
            })
            .collect();

        let first = repo
            .list(Page {
                offset: Cursor::START,
                size: 2,
            })
            .expect("list failed");
        assert_eq!(first.orders.len(), 2);
        assert!(!first.cursor.is_start());

        let seen: HashSet<u64> = list_all(&repo, 2).iter().map(|o| o.order_id).collect();
        assert_eq!(seen, created);
    }

    #[test]
    fn list_treats_zero_size_as_one() {
        let repo = sequential_repo(1);
        for _ in 0..2 {
            repo.create(make_order(Uuid::new_v4())).expect("create failed");
        }

        let page = repo
            .list(Page {
                offset: Cursor::START,
                size: 0,
            })
            .expect("list failed");

        assert_eq!(page.orders.len(), 1);
        assert!(!page.cursor.is_start());
    }

    #[test]
    fn list_skips_keys_deleted_after_scan() {
        let repo = sequential_repo(1);
        let kept = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        // Index entry whose record is gone, as seen by a reader racing a delete.
        repo.store().index_add(&order_key(500)).expect("index add");

        let orders = list_all(&repo, 10);
        assert_eq!(orders, vec![kept]);
    }

    #[test]
    fn list_with_corrupt_record_is_internal() {
        let repo = repo();
        repo.store().put_raw(&order_key(8), "{\"order_id\":");
        repo.store().index_add(&order_key(8)).expect("index add");

        let result = repo.list(Page {
            offset: Cursor::START,
            size: 10,
        });
        assert!(matches!(result, Err(DomainError::Internal(_))));
    }

    #[test]
    fn list_after_delete_omits_order() {
        let repo = sequential_repo(1);
        let a = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        let b = repo.create(make_order(Uuid::new_v4())).expect("create failed");
        repo.delete_by_id(a.order_id).expect("delete failed");

        assert_eq!(list_all(&repo, 10), vec![b]);
        assert_eq!(repo.store().index_members().len(), 1);
        assert_eq!(
            repo.store().index_scan(SCAN_START, "*", 10).expect("scan").keys,
            vec![order_key(2)]
        );
    }

    #[test]
    fn health_pings_store() {
        assert!(repo().health().is_ok());
    }

    #[test]
    fn store_errors_keep_their_source() {
        let err: DomainError = StoreError::Timeout.into();
        assert!(matches!(err, DomainError::Store(_)));
        assert_eq!(err.to_string(), "Store error: Store operation timed out");
        assert!(std::error::Error::source(&err).is_some());
    }
}
