//! Embedded in-memory wide-column backend behind the native seam.
//!
//! Serves tests and local development: byte-ordered row trees,
//! versioned cells, page-filter scans, all-or-nothing single-row
//! mutations. It also keeps open-handle accounting and supports
//! connect fault injection so callers' release and retry discipline
//! can be observed from the outside.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::debug;

use crate::errors::StoreError;

use super::{
    AdminHandle, Cell, FamilyMap, RowMutation, RowResult, RowScanner, ScanSpec, SessionOptions,
    StoreConnection, StoreTransport, TableHandle, TableSchema,
};

#[derive(Default)]
struct TableState {
    families: BTreeSet<Vec<u8>>,
    rows: RwLock<BTreeMap<Vec<u8>, FamilyMap>>,
}

struct Shared {
    tables: DashMap<String, Arc<TableState>>,
    /// Monotonic cell-timestamp source; one tick per mutation.
    clock: AtomicU64,
    open_handles: AtomicUsize,
    connect_attempts: AtomicUsize,
    failing_connects: AtomicUsize,
    required_principal: Option<String>,
}

impl Shared {
    fn retain(&self) {
        self.open_handles.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.open_handles.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cheaply clonable handle to one in-memory store instance.
#[derive(Clone)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// A store that rejects sessions whose principal differs from the
    /// given one.
    pub fn with_required_principal(principal: impl Into<String>) -> Self {
        Self::build(Some(principal.into()))
    }

    fn build(required_principal: Option<String>) -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: DashMap::new(),
                clock: AtomicU64::new(0),
                open_handles: AtomicUsize::new(0),
                connect_attempts: AtomicUsize::new(0),
                failing_connects: AtomicUsize::new(0),
                required_principal,
            }),
        }
    }

    /// Fail the next `n` session openings with a communication fault.
    pub fn fail_next_connects(&self, n: usize) {
        self.shared.failing_connects.store(n, Ordering::SeqCst);
    }

    /// Handles currently held by callers; zero when nothing leaked.
    pub fn open_handles(&self) -> usize {
        self.shared.open_handles.load(Ordering::SeqCst)
    }

    /// Total `open_session` calls seen, including failed ones.
    pub fn connect_attempts(&self) -> usize {
        self.shared.connect_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreTransport for MemoryStore {
    async fn open_session(&self, opts: &SessionOptions) -> Result<Box<dyn StoreConnection>, StoreError> {
        self.shared.connect_attempts.fetch_add(1, Ordering::SeqCst);

        let inject = self
            .shared
            .failing_connects
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if inject {
            return Err(StoreError::io("injected connect fault"));
        }

        if let Some(required) = &self.shared.required_principal {
            if opts.principal.as_deref() != Some(required.as_str()) {
                return Err(StoreError::Authentication(format!(
                    "login rejected for principal {:?}",
                    opts.principal
                )));
            }
        }

        self.shared.retain();
        debug!("session opened");
        Ok(Box::new(MemorySession { shared: Arc::clone(&self.shared) }))
    }
}

struct MemorySession {
    shared: Arc<Shared>,
}

#[async_trait]
impl StoreConnection for MemorySession {
    async fn admin(&self) -> Result<Box<dyn AdminHandle>, StoreError> {
        self.shared.retain();
        Ok(Box::new(MemoryAdmin { shared: Arc::clone(&self.shared) }))
    }

    async fn table(&self, name: &str) -> Result<Box<dyn TableHandle>, StoreError> {
        let table = self
            .shared
            .tables
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        self.shared.retain();
        Ok(Box::new(MemoryTable { shared: Arc::clone(&self.shared), name: name.to_string(), table }))
    }

    async fn close(self: Box<Self>) {
        self.shared.release();
    }
}

struct MemoryAdmin {
    shared: Arc<Shared>,
}

#[async_trait]
impl AdminHandle for MemoryAdmin {
    async fn list_tables(&self) -> Result<Vec<TableSchema>, StoreError> {
        let mut schemas: Vec<TableSchema> = self
            .shared
            .tables
            .iter()
            .map(|entry| TableSchema {
                name: entry.key().clone(),
                families: entry.value().families.clone(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(schemas)
    }

    async fn table_schema(&self, name: &str) -> Result<TableSchema, StoreError> {
        let entry = self
            .shared
            .tables
            .get(name)
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))?;
        Ok(TableSchema { name: name.to_string(), families: entry.value().families.clone() })
    }

    async fn create_table(&self, schema: TableSchema) -> Result<(), StoreError> {
        match self.shared.tables.entry(schema.name.clone()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(StoreError::TableAlreadyExists(schema.name))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(TableState {
                    families: schema.families,
                    rows: RwLock::new(BTreeMap::new()),
                }));
                Ok(())
            }
        }
    }

    async fn close(self: Box<Self>) {
        self.shared.release();
    }
}

struct MemoryTable {
    shared: Arc<Shared>,
    name: String,
    table: Arc<TableState>,
}

#[async_trait]
impl TableHandle for MemoryTable {
    async fn get(&self, key: &[u8]) -> Result<Option<RowResult>, StoreError> {
        let rows = self.table.rows.read().await;
        Ok(rows
            .get(key)
            .map(|families| RowResult { key: key.to_vec(), families: families.clone() }))
    }

    async fn put(&self, mutation: RowMutation) -> Result<(), StoreError> {
        // Validate every referenced family before touching the row, so
        // a bad triple commits nothing.
        for cell in &mutation.cells {
            if !self.table.families.contains(&cell.family) {
                return Err(StoreError::ColumnFamilyNotFound {
                    table: self.name.clone(),
                    family: String::from_utf8_lossy(&cell.family).into_owned(),
                });
            }
        }

        let timestamp = self.shared.clock.fetch_add(1, Ordering::SeqCst) + 1;
        let mut rows = self.table.rows.write().await;
        let row = rows.entry(mutation.key).or_default();
        for cell in mutation.cells {
            row.entry(cell.family)
                .or_default()
                .entry(cell.qualifier)
                .or_default()
                .insert(0, Cell { timestamp, value: cell.value });
        }
        Ok(())
    }

    async fn scanner(&self, spec: ScanSpec) -> Result<Box<dyn RowScanner>, StoreError> {
        let rows = self.table.rows.read().await;
        let limit = spec.limit as usize;
        let page: VecDeque<RowResult> = if spec.reverse {
            rows.iter()
                .rev()
                .take(limit)
                .map(|(key, families)| RowResult { key: key.clone(), families: families.clone() })
                .collect()
        } else {
            rows.iter()
                .take(limit)
                .map(|(key, families)| RowResult { key: key.clone(), families: families.clone() })
                .collect()
        };
        self.shared.retain();
        Ok(Box::new(MemoryScanner { shared: Arc::clone(&self.shared), page }))
    }

    async fn close(self: Box<Self>) {
        self.shared.release();
    }
}

struct MemoryScanner {
    shared: Arc<Shared>,
    page: VecDeque<RowResult>,
}

#[async_trait]
impl RowScanner for MemoryScanner {
    async fn next(&mut self) -> Result<Option<RowResult>, StoreError> {
        Ok(self.page.pop_front())
    }

    async fn close(self: Box<Self>) {
        self.shared.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MutationCell;

    fn mutation(key: &str, cells: &[(&str, &str, &str)]) -> RowMutation {
        RowMutation {
            key: key.as_bytes().to_vec(),
            cells: cells
                .iter()
                .map(|(f, q, v)| MutationCell {
                    family: f.as_bytes().to_vec(),
                    qualifier: q.as_bytes().to_vec(),
                    value: v.as_bytes().to_vec(),
                })
                .collect(),
        }
    }

    async fn store_with_table(name: &str) -> (MemoryStore, Box<dyn StoreConnection>) {
        let store = MemoryStore::new();
        let conn = store.open_session(&SessionOptions::default()).await.unwrap();
        let admin = conn.admin().await.unwrap();
        admin
            .create_table(TableSchema::new(name).with_family("cf"))
            .await
            .unwrap();
        admin.close().await;
        (store, conn)
    }

    #[tokio::test]
    async fn put_with_undeclared_family_writes_nothing() {
        let (_store, conn) = store_with_table("t").await;
        let table = conn.table("t").await.unwrap();

        let bad = mutation("r1", &[("cf", "a", "1"), ("nope", "b", "2")]);
        let err = table.put(bad).await.unwrap_err();
        assert!(matches!(err, StoreError::ColumnFamilyNotFound { .. }));

        // All-or-nothing: the valid triple must not have landed either.
        assert!(table.get(b"r1").await.unwrap().is_none());
        table.close().await;
        conn.close().await;
    }

    #[tokio::test]
    async fn versions_accumulate_newest_first() {
        let (_store, conn) = store_with_table("t").await;
        let table = conn.table("t").await.unwrap();

        table.put(mutation("r1", &[("cf", "q", "old")])).await.unwrap();
        table.put(mutation("r1", &[("cf", "q", "new")])).await.unwrap();

        let row = table.get(b"r1").await.unwrap().unwrap();
        let versions = &row.families[b"cf".as_slice()][b"q".as_slice()];
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].value, b"new");
        assert!(versions[0].timestamp > versions[1].timestamp);
        table.close().await;
        conn.close().await;
    }

    #[tokio::test]
    async fn scan_is_bounded_and_direction_aware() {
        let (_store, conn) = store_with_table("t").await;
        let table = conn.table("t").await.unwrap();
        for key in ["a", "b", "c"] {
            table.put(mutation(key, &[("cf", "q", "v")])).await.unwrap();
        }

        let mut forward = table.scanner(ScanSpec { limit: 2, reverse: false }).await.unwrap();
        let mut keys = Vec::new();
        while let Some(row) = forward.next().await.unwrap() {
            keys.push(row.key);
        }
        forward.close().await;
        assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec()]);

        let mut backward = table.scanner(ScanSpec { limit: 2, reverse: true }).await.unwrap();
        let mut keys = Vec::new();
        while let Some(row) = backward.next().await.unwrap() {
            keys.push(row.key);
        }
        backward.close().await;
        assert_eq!(keys, vec![b"c".to_vec(), b"b".to_vec()]);

        table.close().await;
        conn.close().await;
    }

    #[tokio::test]
    async fn handle_accounting_reaches_zero_after_close() {
        let (store, conn) = store_with_table("t").await;
        assert_eq!(store.open_handles(), 1);
        let table = conn.table("t").await.unwrap();
        assert_eq!(store.open_handles(), 2);
        table.close().await;
        conn.close().await;
        assert_eq!(store.open_handles(), 0);
    }

    #[tokio::test]
    async fn required_principal_gates_sessions() {
        let store = MemoryStore::with_required_principal("svc");
        let denied = store.open_session(&SessionOptions::default()).await;
        assert!(matches!(denied, Err(StoreError::Authentication(_))));

        let opts = SessionOptions { principal: Some("svc".into()) };
        let conn = store.open_session(&opts).await.unwrap();
        conn.close().await;
        assert_eq!(store.open_handles(), 0);
    }
}
