//! Table and row operations over the store, one session per call.
//!
//! Every operation runs the same lifecycle: acquire session, acquire
//! the needed handles, operate, convert, then release everything in
//! reverse acquisition order on success and failure paths alike.
//! Default namespace and page size are explicit per-call parameters,
//! not ambient state, so several namespaces can coexist in one process.

use models::row::RowValue;
use models::table::{self, TableDescriptor, NAMESPACE_SEPARATOR};
use tracing::{info, instrument};

use crate::connection::ConnectionFactory;
use crate::convert;
use crate::errors::StoreError;
use crate::pagination::ScanPage;
use crate::store::{ScanSpec, StoreConnection};

pub struct StoreGateway {
    connections: ConnectionFactory,
}

impl StoreGateway {
    pub fn new(connections: ConnectionFactory) -> Self {
        Self { connections }
    }

    /// List all tables visible to the session, in the store's listing
    /// order (lexicographic by name). Communication faults propagate
    /// like every other operation.
    #[instrument(skip(self))]
    pub async fn list_tables(&self) -> Result<Vec<TableDescriptor>, StoreError> {
        let conn = self.connections.connect().await?;
        let outcome = list_tables_on(conn.as_ref()).await;
        conn.close().await;
        outcome
    }

    /// Fetch one table descriptor by exact (qualified) name.
    #[instrument(skip(self))]
    pub async fn get_table_info(&self, name: &str) -> Result<TableDescriptor, StoreError> {
        let conn = self.connections.connect().await?;
        let outcome = get_table_info_on(conn.as_ref(), name).await;
        conn.close().await;
        outcome
    }

    /// Create a table with exactly the supplied family set. An
    /// unqualified name is prefixed with `default_namespace` when one
    /// is supplied; an already qualified name is left alone.
    #[instrument(skip(self, descriptor), fields(table = %descriptor.name))]
    pub async fn create_table(
        &self,
        descriptor: &TableDescriptor,
        default_namespace: Option<&str>,
    ) -> Result<(), StoreError> {
        table::validate_table_name(&descriptor.name)?;
        table::validate_families(&descriptor.families)?;
        let qualified = qualify(&descriptor.name, default_namespace);

        let conn = self.connections.connect().await?;
        let outcome = create_table_on(conn.as_ref(), &qualified, &descriptor.families).await;
        conn.close().await;
        outcome?;

        info!(table = %qualified, "table created");
        Ok(())
    }

    /// First (or, with `reverse`, last) `page` rows of a table. The
    /// scan is bounded by a row-count cap, not a resumable cursor:
    /// every call restarts from the table's first or last row.
    #[instrument(skip(self))]
    pub async fn head(
        &self,
        name: &str,
        page: ScanPage,
        reverse: bool,
    ) -> Result<Vec<RowValue>, StoreError> {
        let conn = self.connections.connect().await?;
        let outcome = head_on(conn.as_ref(), name, page.normalize(), reverse).await;
        conn.close().await;
        outcome
    }

    /// Point lookup. `Ok(None)` means the table exists but no cell
    /// matches the key; a missing table is [`StoreError::TableNotFound`].
    #[instrument(skip(self))]
    pub async fn get_row(&self, name: &str, key: &str) -> Result<Option<RowValue>, StoreError> {
        let conn = self.connections.connect().await?;
        let outcome = get_row_on(conn.as_ref(), name, key).await;
        conn.close().await;
        outcome
    }

    /// Write every (family, qualifier, value) triple of `row` as one
    /// atomic mutation; a single undeclared family fails the whole put.
    #[instrument(skip(self, row), fields(table = name, key = %row.key))]
    pub async fn put_row(&self, name: &str, row: &RowValue) -> Result<(), StoreError> {
        models::row::validate_row(row)?;

        let conn = self.connections.connect().await?;
        let outcome = put_row_on(conn.as_ref(), name, row).await;
        conn.close().await;
        outcome
    }
}

fn qualify(name: &str, default_namespace: Option<&str>) -> String {
    match default_namespace {
        Some(ns) if !name.contains(NAMESPACE_SEPARATOR) => {
            format!("{ns}{NAMESPACE_SEPARATOR}{name}")
        }
        _ => name.to_string(),
    }
}

async fn list_tables_on(conn: &dyn StoreConnection) -> Result<Vec<TableDescriptor>, StoreError> {
    let admin = conn.admin().await?;
    let listed = admin.list_tables().await;
    admin.close().await;
    let schemas = listed?;
    Ok(schemas
        .into_iter()
        .filter_map(|schema| convert::table_descriptor(Some(schema)))
        .collect())
}

async fn get_table_info_on(
    conn: &dyn StoreConnection,
    name: &str,
) -> Result<TableDescriptor, StoreError> {
    let admin = conn.admin().await?;
    let fetched = admin.table_schema(name).await;
    admin.close().await;
    let schema = fetched?;
    convert::table_descriptor(Some(schema))
        .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
}

async fn create_table_on(
    conn: &dyn StoreConnection,
    qualified_name: &str,
    families: &[String],
) -> Result<(), StoreError> {
    let admin = conn.admin().await?;
    let created = admin.create_table(convert::table_schema(qualified_name, families)).await;
    admin.close().await;
    created
}

async fn head_on(
    conn: &dyn StoreConnection,
    name: &str,
    limit: u32,
    reverse: bool,
) -> Result<Vec<RowValue>, StoreError> {
    let table = conn.table(name).await?;
    let scanned = scan_rows(table.as_ref(), limit, reverse).await;
    table.close().await;
    scanned
}

async fn scan_rows(
    table: &dyn crate::store::TableHandle,
    limit: u32,
    reverse: bool,
) -> Result<Vec<RowValue>, StoreError> {
    let mut scanner = table.scanner(ScanSpec { limit, reverse }).await?;
    let mut rows = Vec::new();
    let outcome = loop {
        match scanner.next().await {
            Ok(Some(native)) => {
                if let Some(row) = convert::row_value(Some(native)) {
                    rows.push(row);
                }
            }
            Ok(None) => break Ok(rows),
            Err(err) => break Err(err),
        }
    };
    scanner.close().await;
    outcome
}

async fn get_row_on(
    conn: &dyn StoreConnection,
    name: &str,
    key: &str,
) -> Result<Option<RowValue>, StoreError> {
    let table = conn.table(name).await?;
    let fetched = table.get(key.as_bytes()).await;
    table.close().await;
    Ok(convert::row_value(fetched?))
}

async fn put_row_on(
    conn: &dyn StoreConnection,
    name: &str,
    row: &RowValue,
) -> Result<(), StoreError> {
    let table = conn.table(name).await?;
    let written = table.put(convert::row_mutation(row)).await;
    table.close().await;
    written
}
