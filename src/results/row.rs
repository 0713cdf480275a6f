use std::collections::HashMap;
use std::sync::Arc;

use crate::types::HostValue;

/// One decoded row.
///
/// Column names are stored uppercased and shared by every row of a result set, as
/// is the name → ordinal index used for lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    column_names: Arc<Vec<String>>,
    values: Vec<HostValue>,
    column_index: Arc<HashMap<String, usize>>,
}

impl Row {
    /// Build a row, normalizing `column_names` to uppercase.
    ///
    /// Later duplicates of a name are reachable by ordinal only.
    #[must_use]
    pub fn new(column_names: &[&str], values: Vec<HostValue>) -> Self {
        let names: Vec<String> = column_names.iter().map(|name| name.to_uppercase()).collect();
        let index = build_index(&names);
        Self::from_shared(Arc::new(names), Arc::new(index), values)
    }

    pub(crate) fn from_shared(
        column_names: Arc<Vec<String>>,
        column_index: Arc<HashMap<String, usize>>,
        values: Vec<HostValue>,
    ) -> Self {
        Self {
            column_names,
            values,
            column_index,
        }
    }

    #[must_use]
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Ordinal of a column; the name is matched case-insensitively.
    #[must_use]
    pub fn column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index.get(column_name) {
            return Some(idx);
        }
        self.column_index.get(&column_name.to_uppercase()).copied()
    }

    /// Value of the named column.
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&HostValue> {
        self.column_index(column_name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Value at `index`, in declared column order.
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&HostValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn values(&self) -> &[HostValue] {
        &self.values
    }

    #[must_use]
    pub fn into_values(self) -> Vec<HostValue> {
        self.values
    }

    /// `(column name, value)` pairs in declared order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.column_names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}

pub(crate) fn build_index(names: &[String]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        index.entry(name.clone()).or_insert(i);
    }
    index
}
