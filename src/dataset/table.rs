use std::collections::HashMap;

use ndarray::{Array1, Axis};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::{Float, Records};
use crate::error::{Error, Result};

/// A single column of a [`Table`]
///
/// Numerical columns store missing entries as `NaN`, token columns (categorical or ordinal
/// features) store them as `None`.
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Column<F> {
    Numerical(Array1<F>),
    Tokens(Array1<Option<String>>),
}

impl<F: Float> Column<F> {
    pub fn len(&self) -> usize {
        match self {
            Column::Numerical(values) => values.len(),
            Column::Tokens(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, Column::Numerical(_))
    }

    /// Returns the value stored at `row`
    ///
    /// ### Panics
    ///
    /// If `row` is out of bounds
    pub fn value(&self, row: usize) -> ValueRef<'_, F> {
        match self {
            Column::Numerical(values) if values[row].is_nan() => ValueRef::Missing,
            Column::Numerical(values) => ValueRef::Number(values[row]),
            Column::Tokens(values) => match &values[row] {
                Some(token) => ValueRef::Token(token),
                None => ValueRef::Missing,
            },
        }
    }

    fn select(&self, rows: &[usize]) -> Self {
        match self {
            Column::Numerical(values) => Column::Numerical(values.select(Axis(0), rows)),
            Column::Tokens(values) => Column::Tokens(values.select(Axis(0), rows)),
        }
    }
}

/// Borrowed value of a single cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueRef<'a, F> {
    Number(F),
    Token(&'a str),
    Missing,
}

impl<'a, F> ValueRef<'a, F> {
    pub fn is_missing(&self) -> bool {
        matches!(self, ValueRef::Missing)
    }
}

/// Owned value of a single cell, used to describe samples outside of a table
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Value<F> {
    Number(F),
    Token(String),
    Missing,
}

impl<F: Float> Value<F> {
    pub fn token<S: Into<String>>(token: S) -> Self {
        Value::Token(token.into())
    }

    pub fn view(&self) -> ValueRef<'_, F> {
        match self {
            Value::Number(x) if x.is_nan() => ValueRef::Missing,
            Value::Number(x) => ValueRef::Number(*x),
            Value::Token(token) => ValueRef::Token(token),
            Value::Missing => ValueRef::Missing,
        }
    }
}

/// Tabular records with named, typed columns
///
/// All columns have the same number of rows and column names are unique. Columns keep the
/// order in which they were added.
///
/// ### Example
///
/// ```rust
/// use multisplit::dataset::Table;
/// use ndarray::array;
///
/// let table = Table::default()
///     .with_numerical("age", array![23., 41., f64::NAN])?
///     .with_tokens("status", vec![Some("single"), None, Some("married")])?;
///
/// assert_eq!(table.nrows(), 3);
/// assert!(table.is_missing(2, "age")?);
/// # Ok::<(), multisplit::Error>(())
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct Table<F> {
    names: Vec<String>,
    columns: Vec<Column<F>>,
    nrows: usize,
}

impl<F> Default for Table<F> {
    fn default() -> Self {
        Table {
            names: Vec::new(),
            columns: Vec::new(),
            nrows: 0,
        }
    }
}

impl<F: Float> Table<F> {
    /// Appends a column, the first column fixes the number of rows
    pub fn push_column<S: Into<String>>(&mut self, name: S, column: Column<F>) -> Result<()> {
        let name = name.into();
        if self.names.contains(&name) {
            return Err(Error::DuplicateColumn(name));
        }
        if !self.columns.is_empty() && column.len() != self.nrows {
            return Err(Error::ColumnLength {
                name,
                expected: self.nrows,
                found: column.len(),
            });
        }

        self.nrows = column.len();
        self.names.push(name);
        self.columns.push(column);

        Ok(())
    }

    /// Adds a numerical column, `NaN` entries are treated as missing
    pub fn with_numerical<S: Into<String>>(mut self, name: S, values: Array1<F>) -> Result<Self> {
        self.push_column(name, Column::Numerical(values))?;
        Ok(self)
    }

    /// Adds a column of tokens, `None` entries are treated as missing
    pub fn with_tokens<S, T, I>(mut self, name: S, values: I) -> Result<Self>
    where
        S: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = Option<T>>,
    {
        let values = values
            .into_iter()
            .map(|x| x.map(Into::into))
            .collect::<Array1<_>>();
        self.push_column(name, Column::Tokens(values))?;
        Ok(self)
    }

    pub fn nrows(&self) -> usize {
        self.nrows
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|x| x == name)
    }

    pub fn column(&self, name: &str) -> Option<&Column<F>> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    /// Returns the column at position `idx`
    ///
    /// ### Panics
    ///
    /// If `idx` is out of bounds
    pub fn column_at(&self, idx: usize) -> &Column<F> {
        &self.columns[idx]
    }

    /// Looks up a single cell by row and column name
    pub fn value(&self, row: usize, name: &str) -> Result<ValueRef<'_, F>> {
        self.column(name)
            .map(|column| column.value(row))
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn is_missing(&self, row: usize, name: &str) -> Result<bool> {
        self.value(row, name).map(|x| x.is_missing())
    }

    /// A view on a single row
    pub fn row(&self, row: usize) -> RowView<'_, F> {
        RowView { table: self, row }
    }

    /// Copy the given rows, in that order, into a new table
    pub fn select(&self, rows: &[usize]) -> Table<F> {
        Table {
            names: self.names.clone(),
            columns: self.columns.iter().map(|c| c.select(rows)).collect(),
            nrows: rows.len(),
        }
    }
}

impl<F: Float> Records for Table<F> {
    fn nsamples(&self) -> usize {
        self.nrows
    }

    fn nfeatures(&self) -> usize {
        self.columns.len()
    }
}

/// A single row of a [`Table`]
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a, F> {
    table: &'a Table<F>,
    row: usize,
}

impl<'a, F: Float> RowView<'a, F> {
    pub fn index(&self) -> usize {
        self.row
    }

    pub fn get(&self, name: &str) -> Option<ValueRef<'a, F>> {
        self.table.column(name).map(|c| c.value(self.row))
    }
}

/// Anything that can resolve feature names to cell values
pub trait FeatureLookup<F> {
    fn lookup(&self, name: &str) -> Option<ValueRef<'_, F>>;
}

impl<'a, F: Float> FeatureLookup<F> for RowView<'a, F> {
    fn lookup(&self, name: &str) -> Option<ValueRef<'_, F>> {
        self.get(name)
    }
}

impl<F: Float> FeatureLookup<F> for HashMap<String, Value<F>> {
    fn lookup(&self, name: &str) -> Option<ValueRef<'_, F>> {
        self.get(name).map(Value::view)
    }
}
