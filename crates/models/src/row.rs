use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Wire view of one row: key plus families in the store's byte order of
/// family names. A row with no matching cells is represented by the
/// absence of a `RowValue`, never by one with zero families.
///
/// Keys, qualifiers and values are byte sequences surfaced as UTF-8
/// strings; non-UTF-8 content is lossy under this model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowValue {
    pub key: String,
    pub families: Vec<ColumnFamilyValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnFamilyValue {
    pub name: String,
    pub columns: Vec<ColumnValue>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnValue {
    pub qualifier: String,
    pub value: String,
}

impl RowValue {
    pub fn new(key: impl Into<String>, families: Vec<ColumnFamilyValue>) -> Self {
        Self { key: key.into(), families }
    }

    /// Look up one cell value by family and qualifier.
    pub fn column(&self, family: &str, qualifier: &str) -> Option<&str> {
        self.families
            .iter()
            .find(|f| f.name == family)?
            .columns
            .iter()
            .find(|c| c.qualifier == qualifier)
            .map(|c| c.value.as_str())
    }
}

impl ColumnFamilyValue {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnValue>) -> Self {
        Self { name: name.into(), columns }
    }
}

impl ColumnValue {
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>) -> Self {
        Self { qualifier: qualifier.into(), value: value.into() }
    }
}

pub fn validate_row(row: &RowValue) -> Result<(), ModelError> {
    if row.key.is_empty() {
        return Err(ModelError::Validation("row key must not be empty".into()));
    }
    let mut family_names = HashSet::new();
    for family in &row.families {
        if family.name.is_empty() {
            return Err(ModelError::Validation("family name must not be empty".into()));
        }
        if !family_names.insert(family.name.as_str()) {
            return Err(ModelError::Validation(format!("duplicate family: {}", family.name)));
        }
        let mut qualifiers = HashSet::new();
        for column in &family.columns {
            if !qualifiers.insert(column.qualifier.as_str()) {
                return Err(ModelError::Validation(format!(
                    "duplicate qualifier {} in family {}",
                    column.qualifier, family.name
                )));
            }
        }
    }
    Ok(())
}
