//! Error types in multisplit
//!

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("records have {0} rows but targets have {1} entries")]
    MismatchedShapes(usize, usize),
    #[error("column `{0}` is defined twice")]
    DuplicateColumn(String),
    #[error("column `{name}` has {found} values, expected {expected}")]
    ColumnLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("no column named `{0}`")]
    UnknownColumn(String),
}
