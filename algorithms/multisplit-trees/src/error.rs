use std::fmt::Write;

use thiserror::Error;

/// Simplified `Result` using [`TreeError`](crate::TreeError) as error type
pub type Result<T> = std::result::Result<T, TreeError>;

/// Error variants from hyper-parameter checking, schema validation and prediction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TreeError {
    #[error("min_samples_split must be at least 2, but is {0}")]
    InvalidMinSamplesSplit(usize),
    #[error("min_samples_leaf must be at least 1, but is {0}")]
    InvalidMinSamplesLeaf(usize),
    #[error("min_samples_split ({split}) must be at least twice min_samples_leaf ({leaf})")]
    InconsistentMinSamples { split: usize, leaf: usize },
    #[error("min_impurity_decrease must be finite and non-negative, but is {0}")]
    InvalidMinImpurityDecrease(String),
    #[error("max_children must be at least 2, but is {0}")]
    InvalidMaxChildren(usize),
    #[error("max_depth must be at least 1, but is {0}")]
    InvalidMaxDepth(usize),
    #[error("unknown split quality `{0}`, expected `gini` or `entropy`")]
    UnknownSplitQuality(String),
    #[error("at least one categorical, ordinal or numerical feature has to be declared")]
    NoFeatures,
    #[error("feature `{0}` is declared more than once")]
    DuplicateFeature(String),
    #[error("ordinal feature `{feature}` lists the value `{token}` more than once")]
    DuplicateToken { feature: String, token: String },
    #[error("hierarchy refers to `{0}`, which is not a declared feature")]
    UnknownHierarchyFeature(String),
    #[error("feature `{0}` cannot unlock itself")]
    SelfGating(String),
    #[error("feature `{feature}` is unlocked by both `{first}` and `{second}`")]
    ConflictingGates {
        feature: String,
        first: String,
        second: String,
    },
    #[error("the training data contains the column `{0}`, which is not declared as a feature")]
    UndeclaredColumn(String),
    #[error("feature `{0}` is declared but missing from the data")]
    MissingColumn(String),
    #[error("feature `{feature}` is declared {expected}, but its column holds other values")]
    ColumnKind {
        feature: String,
        expected: &'static str,
    },
    #[error("feature `{feature}` has the value `{token}`, which is not among its declared values")]
    UnknownToken { feature: String, token: String },
    #[error("cannot fit a tree on an empty dataset")]
    EmptyDataset,
    #[error("{}", feature_mismatch(.unexpected, .missing))]
    FeatureMismatch {
        unexpected: Vec<String>,
        missing: Vec<String>,
    },
    #[error(transparent)]
    BaseCrate(#[from] multisplit::Error),
}

fn feature_mismatch(unexpected: &[String], missing: &[String]) -> String {
    let mut out = String::from("the features differ from the ones seen during fit\n");
    if !unexpected.is_empty() {
        out.push_str("features not seen during fit:\n");
        for name in unexpected {
            let _ = writeln!(out, "- {}", name);
        }
    }
    if !missing.is_empty() {
        out.push_str("features seen during fit, but missing now:\n");
        for name in missing {
            let _ = writeln!(out, "- {}", name);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_both_sides_of_a_mismatch() {
        let err = TreeError::FeatureMismatch {
            unexpected: vec!["2. Age".into()],
            missing: vec!["2. Возраст".into()],
        };

        assert_eq!(
            err.to_string(),
            "the features differ from the ones seen during fit\n\
             features not seen during fit:\n\
             - 2. Age\n\
             features seen during fit, but missing now:\n\
             - 2. Возраст\n"
        );
    }
}
