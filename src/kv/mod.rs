//! Key-value store collaborator
//!
//! Point lookups and bounded scans over a table of items. The gateway only
//! reads; items are created elsewhere.
//!
//! Two implementations are provided:
//! - [`DynamoStore`] backed by `aws-sdk-dynamodb`
//! - [`MemoryStore`] backed by in-process ordered maps (tests, local runs)

pub mod dynamodb;
pub mod memory;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;

pub use dynamodb::DynamoStore;
pub use memory::MemoryStore;

/// A typed scalar that can appear in a table key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyScalar {
    /// String-typed key attribute
    Str(String),
    /// Number-typed key attribute, kept in its decimal string form
    Num(String),
}

impl KeyScalar {
    pub fn as_str(&self) -> &str {
        match self {
            KeyScalar::Str(s) | KeyScalar::Num(s) => s,
        }
    }
}

/// Key of an item: attribute name → typed scalar.
///
/// Used both for point lookups and as the resume key of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResumeKey(BTreeMap<String, KeyScalar>);

impl ResumeKey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single string attribute key, e.g. `{"id": S("m-1")}`.
    pub fn string(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut key = Self::new();
        key.insert(name, KeyScalar::Str(value.into()));
        key
    }

    pub fn insert(&mut self, name: impl Into<String>, value: KeyScalar) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&KeyScalar> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &KeyScalar)> {
        self.0.iter()
    }
}

impl FromIterator<(String, KeyScalar)> for ResumeKey {
    fn from_iter<T: IntoIterator<Item = (String, KeyScalar)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Attribute value of a stored item.
#[derive(Debug, Clone, PartialEq)]
pub enum ItemValue {
    Str(String),
    /// Numbers travel as decimal strings, as the store returns them
    Num(String),
    Bool(bool),
    Null,
    List(Vec<ItemValue>),
    Map(BTreeMap<String, ItemValue>),
    StrSet(Vec<String>),
}

/// A stored item: attribute name → value.
pub type Item = BTreeMap<String, ItemValue>;

/// One page of a bounded scan.
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    pub items: Vec<Item>,
    /// Present when the scan stopped early; absent means no more pages
    pub resume: Option<ResumeKey>,
}

/// Errors returned by key-value store implementations
#[derive(Debug, Clone, Error)]
pub enum KvError {
    #[error("table '{table}' does not exist")]
    TableNotFound { table: String },

    #[error("invalid request to table '{table}': {message}")]
    InvalidRequest { table: String, message: String },

    #[error("key-value store request failed: {0}")]
    Upstream(String),
}

/// Read-only key-value store operations
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Scan up to `limit` items, continuing after `resume` when given
    async fn scan(
        &self,
        table: &str,
        limit: u32,
        resume: Option<ResumeKey>,
    ) -> Result<ScanPage, KvError>;

    /// Fetch a single item by its key
    async fn get_item(&self, table: &str, key: &ResumeKey) -> Result<Option<Item>, KvError>;
}
