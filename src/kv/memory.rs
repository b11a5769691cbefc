//! In-memory key-value store (ordered maps behind a lock)

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use super::{Item, ItemValue, KeyScalar, KeyValueStore, KvError, ResumeKey, ScanPage};

/// Key-value store that keeps tables in process memory.
///
/// Items are ordered by their partition key, so scans are deterministic.
/// A resume key is only returned when more items remain after the page.
#[derive(Clone)]
pub struct MemoryStore {
    partition_key: String,
    tables: Arc<RwLock<HashMap<String, BTreeMap<KeyScalar, Item>>>>,
    /// Simulate store outages if true
    simulate_unavailable: Arc<RwLock<bool>>,
}

impl MemoryStore {
    pub fn new(partition_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            tables: Arc::new(RwLock::new(HashMap::new())),
            simulate_unavailable: Arc::new(RwLock::new(false)),
        }
    }

    /// Create an empty table (no-op if it exists)
    pub fn create_table(&self, table: &str) {
        self.tables.write().entry(table.to_string()).or_default();
    }

    /// Insert or replace an item, creating the table when needed
    pub fn put_item(&self, table: &str, item: Item) -> Result<(), KvError> {
        let key = match item.get(&self.partition_key) {
            Some(ItemValue::Str(s)) => KeyScalar::Str(s.clone()),
            Some(ItemValue::Num(n)) => KeyScalar::Num(n.clone()),
            _ => {
                return Err(KvError::InvalidRequest {
                    table: table.to_string(),
                    message: format!("item is missing key attribute '{}'", self.partition_key),
                })
            }
        };
        self.tables
            .write()
            .entry(table.to_string())
            .or_default()
            .insert(key, item);
        Ok(())
    }

    /// Enable outage simulation for testing
    pub fn set_unavailable(&self, enabled: bool) {
        *self.simulate_unavailable.write() = enabled;
    }

    pub fn item_count(&self, table: &str) -> usize {
        self.tables.read().get(table).map_or(0, BTreeMap::len)
    }

    fn check_available(&self) -> Result<(), KvError> {
        if *self.simulate_unavailable.read() {
            return Err(KvError::Upstream("simulated store outage".to_string()));
        }
        Ok(())
    }

    fn partition_value(&self, table: &str, key: &ResumeKey) -> Result<KeyScalar, KvError> {
        key.get(&self.partition_key)
            .cloned()
            .ok_or_else(|| KvError::InvalidRequest {
                table: table.to_string(),
                message: format!("key is missing attribute '{}'", self.partition_key),
            })
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn scan(
        &self,
        table: &str,
        limit: u32,
        resume: Option<ResumeKey>,
    ) -> Result<ScanPage, KvError> {
        self.check_available()?;

        if limit == 0 {
            return Err(KvError::InvalidRequest {
                table: table.to_string(),
                message: "limit must be at least 1".to_string(),
            });
        }

        let start = match &resume {
            Some(key) => Bound::Excluded(self.partition_value(table, key)?),
            None => Bound::Unbounded,
        };

        let tables = self.tables.read();
        let rows = tables.get(table).ok_or_else(|| KvError::TableNotFound {
            table: table.to_string(),
        })?;

        let mut remaining = rows.range((start, Bound::Unbounded));
        let page: Vec<(&KeyScalar, &Item)> = remaining.by_ref().take(limit as usize).collect();

        let resume: Option<ResumeKey> = match (page.last(), remaining.next()) {
            (Some((last_key, _)), Some(_)) => Some(
                std::iter::once((self.partition_key.clone(), (*last_key).clone())).collect(),
            ),
            _ => None,
        };

        Ok(ScanPage {
            items: page.into_iter().map(|(_, item)| item.clone()).collect(),
            resume,
        })
    }

    async fn get_item(&self, table: &str, key: &ResumeKey) -> Result<Option<Item>, KvError> {
        self.check_available()?;

        let value = self.partition_value(table, key)?;
        let tables = self.tables.read();
        let rows = tables.get(table).ok_or_else(|| KvError::TableNotFound {
            table: table.to_string(),
        })?;
        Ok(rows.get(&value).cloned())
    }
}
