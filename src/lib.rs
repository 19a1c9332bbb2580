//! `multisplit` provides the shared building blocks for learning decision trees with multi-way
//! splits on mixed tabular data.
//!
//! ## Current state
//!
//! The crate defines
//!
//! * a column-oriented [`Table`](dataset::Table) holding numerical and token (categorical or
//!   ordinal) columns with explicit missing values,
//! * the [`Dataset`] pairing of records with their labels,
//! * the [`ParamGuard`] protocol separating unchecked from checked hyperparameters,
//! * the [`Fit`](traits::Fit) and [`Predict`](traits::Predict) traits implemented by models,
//! * classification metrics, most prominently the [`ConfusionMatrix`](metrics::ConfusionMatrix).
//!
//! The tree learner itself lives in the `multisplit-trees` crate of this workspace.
//!

pub mod dataset;
pub mod error;
mod metrics_classification;
pub mod param_guard;
pub mod prelude;
pub mod traits;

pub use dataset::{Dataset, DatasetBase, Float, Label};
pub use error::Error;
pub use param_guard::ParamGuard;

/// Common metrics functions for classification
pub mod metrics {
    pub use crate::metrics_classification::{ConfusionMatrix, ToConfusionMatrix};
}
