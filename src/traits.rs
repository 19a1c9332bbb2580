//! Provide traits for different classes of algorithms
//!

use crate::dataset::{DatasetBase, Records};
use std::error::Error;

/// Fittable algorithms
///
/// A fittable algorithm takes a dataset and creates a concept of some kind about it. For example
/// a decision tree learns the split rules which separate the classes of its training targets.
/// The hyperparameters are expected to be checked before `fit` is reached, see
/// [`ParamGuard`](crate::ParamGuard).
pub trait Fit<R: Records, T, E: Error + From<crate::error::Error>> {
    type Object;

    fn fit(&self, dataset: &DatasetBase<R, T>) -> Result<Self::Object, E>;
}

/// Predict with a fitted model
///
/// The output type `T` is usually a `Result`, because records handed in at prediction time may
/// not match the layout the model was fitted on.
pub trait Predict<R, T> {
    fn predict(&self, x: R) -> T;
}
