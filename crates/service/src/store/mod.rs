//! Native store seam: the byte-oriented types and session traits the
//! gateway operates against.
//!
//! The store hands back nested byte maps; they are kept in explicit
//! byte-ordered trees (`BTreeMap` keyed by raw bytes) so family and
//! qualifier ordering never has to be re-derived downstream.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::errors::StoreError;

pub mod memory;

/// Schema of one table as the store reports it: qualified name plus the
/// declared column families in byte order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub families: BTreeSet<Vec<u8>>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), families: BTreeSet::new() }
    }

    pub fn with_family(mut self, family: impl Into<Vec<u8>>) -> Self {
        self.families.insert(family.into());
        self
    }
}

/// One stored version of a cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Cell {
    pub timestamp: u64,
    pub value: Vec<u8>,
}

/// Ordered native row tree: family -> qualifier -> versions.
pub type FamilyMap = BTreeMap<Vec<u8>, BTreeMap<Vec<u8>, Vec<Cell>>>;

/// Result of a point get or one scanned row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RowResult {
    pub key: Vec<u8>,
    pub families: FamilyMap,
}

impl RowResult {
    /// True when no cell is present at all. Callers treat this the same
    /// as an absent result: row not found.
    pub fn is_empty(&self) -> bool {
        self.families.values().all(|qualifiers| qualifiers.is_empty())
    }
}

/// One (family, qualifier, value) triple of a write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationCell {
    pub family: Vec<u8>,
    pub qualifier: Vec<u8>,
    pub value: Vec<u8>,
}

/// Flat write request; the store applies all cells as one atomic
/// single-row mutation.
#[derive(Clone, Debug, Default)]
pub struct RowMutation {
    pub key: Vec<u8>,
    pub cells: Vec<MutationCell>,
}

/// Bounded, non-resumable scan request (page-filter semantics): at most
/// `limit` rows, forward from the first row or reverse from the last.
#[derive(Clone, Copy, Debug)]
pub struct ScanSpec {
    pub limit: u32,
    pub reverse: bool,
}

/// Login identity presented when opening a session.
#[derive(Clone, Debug, Default)]
pub struct SessionOptions {
    pub principal: Option<String>,
}

/// Store-facing transport. Opens one authenticated session per call.
#[async_trait]
pub trait StoreTransport: Send + Sync {
    /// Login failures surface as [`StoreError::Authentication`] and are
    /// never retried by callers; communication faults are retryable.
    async fn open_session(&self, opts: &SessionOptions) -> Result<Box<dyn StoreConnection>, StoreError>;
}

/// An authenticated session. Handles acquired from it must be closed
/// before the session itself, inner to outer.
#[async_trait]
pub trait StoreConnection: Send + Sync {
    async fn admin(&self) -> Result<Box<dyn AdminHandle>, StoreError>;
    async fn table(&self, name: &str) -> Result<Box<dyn TableHandle>, StoreError>;
    async fn close(self: Box<Self>);
}

impl std::fmt::Debug for dyn StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("StoreConnection")
    }
}

/// Administrative view: table lifecycle.
#[async_trait]
pub trait AdminHandle: Send + Sync {
    /// All tables visible under the session's scope, in the store's
    /// listing order (lexicographic by name).
    async fn list_tables(&self) -> Result<Vec<TableSchema>, StoreError>;
    async fn table_schema(&self, name: &str) -> Result<TableSchema, StoreError>;
    async fn create_table(&self, schema: TableSchema) -> Result<(), StoreError>;
    async fn close(self: Box<Self>);
}

/// Data view of one table.
#[async_trait]
pub trait TableHandle: Send + Sync {
    async fn get(&self, key: &[u8]) -> Result<Option<RowResult>, StoreError>;
    async fn put(&self, mutation: RowMutation) -> Result<(), StoreError>;
    async fn scanner(&self, spec: ScanSpec) -> Result<Box<dyn RowScanner>, StoreError>;
    async fn close(self: Box<Self>);
}

/// A bounded scan in progress.
#[async_trait]
pub trait RowScanner: Send + Sync {
    /// Next row in scan order, or `None` once the page is exhausted.
    async fn next(&mut self) -> Result<Option<RowResult>, StoreError>;
    async fn close(self: Box<Self>);
}
