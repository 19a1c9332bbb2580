//! Datasets
//!
//! This module implements the dataset struct and various helper traits to extend its
//! functionality.
use ndarray::{Array1, Axis};
use num_traits::{FromPrimitive, NumAssignOps, NumCast};
use rand::seq::SliceRandom;
use rand::Rng;

use std::collections::BTreeSet;
use std::fmt;
use std::hash::Hash;
use std::iter::Sum;

mod table;

pub use table::{Column, FeatureLookup, RowView, Table, Value, ValueRef};

/// Floating point numbers
///
/// This trait bound multiplexes to the most common assumption of floating point number and
/// implement them for 32bit and 64bit floating points. They are used for numerical columns of a
/// table and for every impurity and gain computed from it.
pub trait Float:
    FromPrimitive
    + num_traits::Float
    + PartialOrd
    + Sync
    + Send
    + Default
    + fmt::Display
    + fmt::Debug
    + Sum
    + NumAssignOps
    + approx::AbsDiffEq
    + 'static
{
    fn cast<T: NumCast>(x: T) -> Self {
        NumCast::from(x).unwrap()
    }
}

impl Float for f32 {}

impl Float for f64 {}

/// Discrete labels
///
/// Labels are countable, comparable and hashable. Currently boolean (binary task), usize and
/// strings (multi-label tasks) are supported.
pub trait Label: PartialEq + Eq + Hash + Clone {}

impl Label for bool {}
impl Label for usize {}
impl Label for String {}
impl Label for &str {}

/// Record trait
pub trait Records: Sized {
    fn nsamples(&self) -> usize;
    fn nfeatures(&self) -> usize;
}

/// Implement records for references
impl<R: Records> Records for &R {
    fn nsamples(&self) -> usize {
        (*self).nsamples()
    }

    fn nfeatures(&self) -> usize {
        (*self).nfeatures()
    }
}

/// DatasetBase
///
/// This is the fundamental structure of a dataset. It contains a number of records about the data
/// and the targets belonging to them. The records carry their own column names.
///
/// # Fields
///
/// * `records`: a table with `nsamples` rows and one named column per feature
/// * `targets`: one target per row
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetBase<R, T>
where
    R: Records,
{
    pub records: R,
    pub targets: T,
}

/// Dataset
///
/// The most commonly used typed of dataset. It contains a number of records
/// stored as a [`Table`] and each record corresponds to a single label stored in an `Array1`.
pub type Dataset<F, L> = DatasetBase<Table<F>, Array1<L>>;

impl<R: Records, T> DatasetBase<R, T> {
    /// Create a new dataset from records and targets
    ///
    /// The number of targets is not checked here, algorithms validate it when fitting.
    pub fn new(records: R, targets: T) -> DatasetBase<R, T> {
        DatasetBase { records, targets }
    }

    /// Returns reference to the records
    pub fn records(&self) -> &R {
        &self.records
    }

    /// Returns reference to the targets
    pub fn targets(&self) -> &T {
        &self.targets
    }

    /// Number of observations in the records
    pub fn nsamples(&self) -> usize {
        self.records.nsamples()
    }

    /// Number of features in the records
    pub fn nfeatures(&self) -> usize {
        self.records.nfeatures()
    }
}

impl<F: Float, L: Label> Dataset<F, L> {
    /// Names of the columns of the records
    pub fn feature_names(&self) -> &[String] {
        self.records.column_names()
    }

    /// Sorted set of distinct labels found in the targets
    pub fn labels(&self) -> Vec<L>
    where
        L: Ord,
    {
        self.targets
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Copy the given rows, in that order, into a new dataset
    pub fn select(&self, rows: &[usize]) -> Dataset<F, L> {
        DatasetBase {
            records: self.records.select(rows),
            targets: self.targets.select(Axis(0), rows),
        }
    }

    /// Shuffle the rows of the dataset
    pub fn shuffle<R: Rng>(&self, rng: &mut R) -> Dataset<F, L> {
        let mut indices = (0..self.nsamples()).collect::<Vec<_>>();
        indices.shuffle(rng);

        self.select(&indices)
    }

    /// Split the dataset in two parts, the first one containing `ratio` of the rows
    ///
    /// The split point is rounded up, so that a non-zero ratio keeps at least one row in the
    /// first part.
    pub fn split_with_ratio(&self, ratio: f32) -> (Dataset<F, L>, Dataset<F, L>) {
        let n = (self.nsamples() as f32 * ratio).ceil() as usize;
        let n = n.min(self.nsamples());
        let indices = (0..self.nsamples()).collect::<Vec<_>>();

        (self.select(&indices[..n]), self.select(&indices[n..]))
    }
}
