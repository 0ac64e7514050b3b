//! Ephemeral order storage with lazy TTL eviction.

use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use rand::Rng;
use tracing::{debug, warn};

use crate::models::{Order, OrderRequest};

/// Order keys are 8-digit decimal strings drawn from this range.
const KEY_RANGE: std::ops::Range<u64> = 10_000_000..100_000_000;
/// Collision retries before declaring the key space exhausted.
const MAX_KEY_ATTEMPTS: u32 = 100;

/// Concurrency-safe, TTL-bounded order storage. The only shared mutable
/// state in the service; constructed once and injected into every component
/// that needs it.
///
/// Operations are atomic per key. A `get` followed by an `update` is not a
/// transaction: concurrent checkout attempts on the same key are
/// last-write-wins.
pub struct OrderStore {
    orders: DashMap<String, Order>,
    ttl: Duration,
}

impl OrderStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            orders: DashMap::new(),
            ttl,
        }
    }

    /// Stores a new order under a freshly generated key and returns the key.
    /// Expired entries are swept before the insert.
    pub fn put(&self, request: OrderRequest) -> String {
        self.sweep();
        let key = self.generate_key();
        self.orders
            .insert(key.clone(), Order::new(key.clone(), request));
        debug!(order_key = %key, active = self.orders.len(), "order stored");
        key
    }

    pub fn get(&self, key: &str) -> Option<Order> {
        self.orders.get(key).map(|entry| entry.value().clone())
    }

    /// Overwrites the stored order under its key. Used by checkout to commit
    /// backend-assigned identifiers.
    pub fn update(&self, order: Order) {
        self.orders.insert(order.key.clone(), order);
    }

    pub fn delete(&self, key: &str) {
        self.orders.remove(key);
    }

    /// Removes every entry older than the TTL. Runs at the start of each
    /// `put`; there is no background sweep, so a store that stops receiving
    /// inserts keeps stale entries until the next one.
    pub fn sweep(&self) {
        let cutoff = Utc::now() - chrono::Duration::seconds(self.ttl.as_secs() as i64);
        let before = self.orders.len();
        self.orders.retain(|_, order| order.created_at >= cutoff);
        let removed = before.saturating_sub(self.orders.len());
        if removed > 0 {
            debug!(removed, "swept expired orders");
        }
    }

    /// Number of currently stored orders.
    pub fn count(&self) -> usize {
        self.orders.len()
    }

    fn generate_key(&self) -> String {
        let mut rng = rand::thread_rng();
        for _ in 0..MAX_KEY_ATTEMPTS {
            let key = rng.gen_range(KEY_RANGE).to_string();
            if !self.orders.contains_key(&key) {
                return key;
            }
            warn!("order key collision, retrying");
        }
        // The key space is orders of magnitude larger than any realistic
        // number of active orders; exhausting the retries is a bug.
        panic!("order key space exhausted after {MAX_KEY_ATTEMPTS} attempts");
    }
}
