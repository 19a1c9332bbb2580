mod algorithm;
mod graphviz;
mod hyperparams;
mod impurity;
mod iter;
mod partitions;
mod schema;
mod splitter;

pub use algorithm::*;
pub use graphviz::*;
pub use hyperparams::*;
pub use iter::*;
pub use schema::FeatureKind;
