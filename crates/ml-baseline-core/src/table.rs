//! Column-oriented in-memory table
//!
//! A `Table` is an ordered list of named, typed columns of equal length.
//! Column order and row order are significant and preserved by every
//! operation.

use std::collections::HashSet;

use crate::error::{BaselineError, Result};
use crate::schema::DType;

/// Values of one column, stored in one of the three type buckets
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Integer(Vec<i64>),
    Float(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    /// Number of values
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Integer(v) => v.len(),
            ColumnData::Float(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type bucket of the stored values
    pub fn dtype(&self) -> DType {
        match self {
            ColumnData::Integer(_) => DType::Integer,
            ColumnData::Float(_) => DType::Float,
            ColumnData::Text(_) => DType::Text,
        }
    }

    /// Render a single cell as text
    ///
    /// Floats use the shortest round-trippable form that keeps a decimal
    /// point, so a written `75.0` reads back as a float.
    pub fn cell_to_string(&self, row: usize) -> String {
        match self {
            ColumnData::Integer(v) => v[row].to_string(),
            ColumnData::Float(v) => format!("{:?}", v[row]),
            ColumnData::Text(v) => v[row].clone(),
        }
    }

    /// Gather the values at `rows`, in that order
    pub fn take(&self, rows: &[usize]) -> ColumnData {
        match self {
            ColumnData::Integer(v) => ColumnData::Integer(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Float(v) => ColumnData::Float(rows.iter().map(|&i| v[i]).collect()),
            ColumnData::Text(v) => ColumnData::Text(rows.iter().map(|&i| v[i].clone()).collect()),
        }
    }
}

/// A named column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn new(name: impl Into<String>, data: ColumnData) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    pub fn integer(name: impl Into<String>, values: Vec<i64>) -> Self {
        Self::new(name, ColumnData::Integer(values))
    }

    pub fn float(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, ColumnData::Float(values))
    }

    pub fn text<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self::new(
            name,
            ColumnData::Text(values.into_iter().map(Into::into).collect()),
        )
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.data.dtype()
    }
}

/// Ordered collection of equal-length columns with unique names
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking that columns are equal length and uniquely named
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(Column::len).unwrap_or(0);
        let mut table = Self::with_rows(n_rows);
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// A table with no columns that still knows its row count
    pub fn with_rows(n_rows: usize) -> Self {
        Self {
            columns: Vec::new(),
            n_rows,
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Append a column at the end
    pub fn push_column(&mut self, column: Column) -> Result<()> {
        if self.has_column(&column.name) {
            return Err(BaselineError::invalid_table(format!(
                "duplicate column '{}'",
                column.name
            )));
        }
        if column.len() != self.n_rows {
            return Err(BaselineError::invalid_table(format!(
                "column '{}' has {} rows, expected {}",
                column.name,
                column.len(),
                self.n_rows
            )));
        }
        self.columns.push(column);
        Ok(())
    }

    /// Project onto `names`, in the order given
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Table> {
        let mut selected = Self::with_rows(self.n_rows);
        for name in names {
            let name = name.as_ref();
            let column = self.column(name).ok_or_else(|| {
                BaselineError::invalid_table(format!("column '{}' not found", name))
            })?;
            selected.push_column(column.clone())?;
        }
        Ok(selected)
    }

    /// Copy of the table without the named columns (absent names are ignored)
    pub fn without_columns<S: AsRef<str>>(&self, names: &[S]) -> Table {
        let drop: HashSet<&str> = names.iter().map(AsRef::as_ref).collect();
        Self {
            columns: self
                .columns
                .iter()
                .filter(|c| !drop.contains(c.name.as_str()))
                .cloned()
                .collect(),
            n_rows: self.n_rows,
        }
    }

    /// Gather the rows at `rows`, in that order
    pub fn take_rows(&self, rows: &[usize]) -> Table {
        Self {
            columns: self
                .columns
                .iter()
                .map(|c| Column::new(c.name.clone(), c.data.take(rows)))
                .collect(),
            n_rows: rows.len(),
        }
    }
}
