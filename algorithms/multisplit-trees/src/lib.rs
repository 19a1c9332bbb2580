//!
//! # Multi-way decision trees
//! `multisplit-trees` provides a pure Rust implementation of decision tree learning with
//! multi-way splits on mixed tabular data.
//!
//! # The big picture
//!
//! Decision trees are a non-parametric supervised learning method for classification. The goal
//! is to create a model that predicts the label of a sample by learning simple decision rules
//! inferred from its features.
//!
//! Unlike binary trees on numerical matrices, the trees of this crate work on a
//! [`Table`](multisplit::dataset::Table) of named columns:
//!
//! * categorical features may be split into any number of value groups,
//! * ordinal features are cut along the ranking of their values,
//! * numerical features are split at a threshold.
//!
//! Missing values are allowed in every column, and a feature hierarchy can hold a feature back
//! until the tree has split on another one.
//!
//! # Current state
//!
//! `multisplit-trees` currently provides an [implementation](MultiSplitTree) of single-tree
//! fitting for classification, with export of fitted trees to [Graphviz](Graphviz).
//!

mod decision_trees;
mod error;

pub use decision_trees::*;
pub use error::{Result, TreeError};
