//! Conversions between the store's native byte trees and the wire DTOs.
//!
//! Absent native input maps to absent output; a native row with no
//! cells also maps to `None` and means "row not found", never an error.
//! Byte keys and values are decoded as lossy UTF-8 (documented wire
//! limitation). Ordering is inherited from the byte-ordered native
//! trees, not re-derived here.

use common::bytes::decode_utf8_lossy;
use models::row::{ColumnFamilyValue, ColumnValue, RowValue};
use models::table::TableDescriptor;

use crate::store::{Cell, MutationCell, RowMutation, RowResult, TableSchema};

pub fn table_descriptor(native: Option<TableSchema>) -> Option<TableDescriptor> {
    native.map(|schema| TableDescriptor {
        name: schema.name,
        families: schema.families.iter().map(|f| decode_utf8_lossy(f)).collect(),
    })
}

/// Write direction of [`table_descriptor`]: a schema carrying exactly
/// the supplied family set under the given (already qualified) name.
pub fn table_schema(qualified_name: &str, families: &[String]) -> TableSchema {
    TableSchema {
        name: qualified_name.to_string(),
        families: families.iter().map(|f| f.as_bytes().to_vec()).collect(),
    }
}

pub fn row_value(native: Option<RowResult>) -> Option<RowValue> {
    let row = native?;
    if row.is_empty() {
        return None;
    }

    let families = row
        .families
        .iter()
        .map(|(name, qualifiers)| ColumnFamilyValue {
            name: decode_utf8_lossy(name),
            columns: qualifiers
                .iter()
                .filter_map(|(qualifier, versions)| {
                    // Only the most recent value per qualifier is surfaced.
                    latest(versions).map(|cell| ColumnValue {
                        qualifier: decode_utf8_lossy(qualifier),
                        value: decode_utf8_lossy(&cell.value),
                    })
                })
                .collect(),
        })
        .collect();

    Some(RowValue { key: decode_utf8_lossy(&row.key), families })
}

/// Write direction of [`row_value`]: flatten every (family, qualifier,
/// value) triple into one mutation.
pub fn row_mutation(row: &RowValue) -> RowMutation {
    let cells = row
        .families
        .iter()
        .flat_map(|family| {
            family.columns.iter().map(|column| MutationCell {
                family: family.name.as_bytes().to_vec(),
                qualifier: column.qualifier.as_bytes().to_vec(),
                value: column.value.as_bytes().to_vec(),
            })
        })
        .collect();
    RowMutation { key: row.key.as_bytes().to_vec(), cells }
}

fn latest(versions: &[Cell]) -> Option<&Cell> {
    versions.iter().max_by_key(|cell| cell.timestamp)
}
