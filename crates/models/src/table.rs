use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ModelError;

/// Separator between a namespace prefix and the table name proper.
pub const NAMESPACE_SEPARATOR: char = ':';

/// Wire view of a table: its (possibly namespace-qualified) name and the
/// column families declared at creation time. Families are listed in the
/// store's byte order of family names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    pub name: String,
    pub families: Vec<String>,
}

impl TableDescriptor {
    pub fn new(name: impl Into<String>, families: Vec<String>) -> Self {
        Self { name: name.into(), families }
    }

    /// Namespace prefix, if the name carries one.
    pub fn namespace(&self) -> Option<&str> {
        self.name.split_once(NAMESPACE_SEPARATOR).map(|(ns, _)| ns)
    }
}

pub fn validate_table_name(name: &str) -> Result<(), ModelError> {
    if name.trim().is_empty() {
        return Err(ModelError::Validation("table name must not be empty".into()));
    }
    Ok(())
}

pub fn validate_families(families: &[String]) -> Result<(), ModelError> {
    if families.is_empty() {
        return Err(ModelError::Validation(
            "table must declare at least one column family".into(),
        ));
    }
    let mut seen = HashSet::new();
    for family in families {
        if family.is_empty() {
            return Err(ModelError::Validation("family name must not be empty".into()));
        }
        if !seen.insert(family.as_str()) {
            return Err(ModelError::Validation(format!("duplicate family: {family}")));
        }
    }
    Ok(())
}
