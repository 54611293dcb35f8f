//! Query result sets.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// One row of a result set, aligned with [`ResultSet::columns`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }
}

/// Tabular query results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Whether paging truncated the results.
    pub has_more_items: bool,
}

impl ResultSet {
    pub fn new(columns: Vec<String>, rows: Vec<Row>, has_more_items: bool) -> Self {
        Self {
            columns,
            rows,
            has_more_items,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column, in row order.
    pub fn column(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().filter_map(|r| r.values.get(idx)).collect())
    }
}
