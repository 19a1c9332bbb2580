use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use multisplit::{Float, Label, ParamGuard};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::schema::{self, FeatureKind};
use crate::error::{Result, TreeError};
use crate::MultiSplitTree;

/// The metric used to determine the feature by which a node is split
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SplitQuality {
    /// Measures the degree of probability of a randomly chosen point in the subtree being
    /// misclassified, defined as the sum over all labels of `p (1 - p)` where `p` is the
    /// probability of encountering that label.
    Gini,
    /// Measures the entropy of a subtree, defined as the sum over all labels of the probability of
    /// encountering that label in the subtree times its logarithm in base two, with negative sign.
    Entropy,
}

impl FromStr for SplitQuality {
    type Err = TreeError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gini" => Ok(SplitQuality::Gini),
            "entropy" => Ok(SplitQuality::Entropy),
            _ => Err(TreeError::UnknownSplitQuality(s.to_string())),
        }
    }
}

impl fmt::Display for SplitQuality {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SplitQuality::Gini => write!(f, "gini"),
            SplitQuality::Entropy => write!(f, "entropy"),
        }
    }
}

/// The set of hyperparameters and feature declarations used for fitting a
/// [multi-split tree](struct.MultiSplitTree.html).
///
/// Every column of the training table has to be declared as exactly one of categorical, ordinal
/// or numerical. Categorical and ordinal features may be split into more than two children,
/// numerical features are always split at a single threshold.
///
/// ### Example
///
/// ```rust
/// use multisplit::prelude::*;
/// use multisplit_trees::{MultiSplitTree, SplitQuality};
/// use ndarray::array;
///
/// let table = Table::default()
///     .with_tokens("weather", vec![Some("sun"), Some("rain"), Some("sun"), Some("snow")])?
///     .with_numerical("wind", array![3.0, 12.0, 25.0, 4.0])?;
/// let dataset = Dataset::new(table, array!["go", "stay", "stay", "stay"]);
///
/// let tree = MultiSplitTree::params()
///     .split_quality(SplitQuality::Entropy)
///     .categorical("weather", ["sun", "rain", "snow"])
///     .numerical("wind")
///     .fit(&dataset)?;
///
/// assert_eq!(tree.score(&dataset)?, 1.0);
/// # Ok::<(), multisplit_trees::TreeError>(())
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MultiSplitTreeValidParams<F, L> {
    split_quality: SplitQuality,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    min_impurity_decrease: F,
    max_children: Option<usize>,
    features: Vec<(String, FeatureKind)>,
    hierarchy: Vec<(String, Vec<String>)>,

    label_marker: PhantomData<L>,
}

impl<F: Float, L> MultiSplitTreeValidParams<F, L> {
    pub fn split_quality(&self) -> SplitQuality {
        self.split_quality
    }

    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    pub fn min_impurity_decrease(&self) -> F {
        self.min_impurity_decrease
    }

    pub fn max_children(&self) -> Option<usize> {
        self.max_children
    }

    /// Declared features in declaration order
    pub fn features(&self) -> &[(String, FeatureKind)] {
        &self.features
    }

    /// Gating features with the features they unlock, in declaration order
    pub fn hierarchy(&self) -> &[(String, Vec<String>)] {
        &self.hierarchy
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Clone, Debug, PartialEq)]
pub struct MultiSplitTreeParams<F, L>(MultiSplitTreeValidParams<F, L>);

impl<F: Float, L: Label> MultiSplitTreeParams<F, L> {
    pub fn new() -> Self {
        Self(MultiSplitTreeValidParams {
            split_quality: SplitQuality::Gini,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            min_impurity_decrease: F::zero(),
            max_children: None,
            features: Vec::new(),
            hierarchy: Vec::new(),
            label_marker: PhantomData,
        })
    }

    /// Sets the metric used to decide the feature on which to split a node
    pub fn split_quality(mut self, split_quality: SplitQuality) -> Self {
        self.0.split_quality = split_quality;
        self
    }

    /// Sets the optional limit to the depth at which nodes may still be split
    ///
    /// The root has depth one, so a tree limited to `max_depth` has nodes of depth up to
    /// `max_depth + 1`.
    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    /// Sets the minimum number of samples required to split a node
    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.0.min_samples_split = min_samples_split;
        self
    }

    /// Sets the minimum number of samples that a split has to place in each child
    ///
    /// Samples with a missing value on the split feature count towards every child.
    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.0.min_samples_leaf = min_samples_leaf;
        self
    }

    /// Sets the minimum information gain that a split needs to bring in order for it to be applied
    pub fn min_impurity_decrease(mut self, min_impurity_decrease: F) -> Self {
        self.0.min_impurity_decrease = min_impurity_decrease;
        self
    }

    /// Sets the optional limit to the number of children of a categorical split
    pub fn max_children(mut self, max_children: Option<usize>) -> Self {
        self.0.max_children = max_children;
        self
    }

    /// Declares an unordered feature with its set of allowed values
    pub fn categorical<S, I, T>(mut self, name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into).collect::<Vec<String>>();
        values.sort();
        values.dedup();

        self.0
            .features
            .push((name.into(), FeatureKind::Categorical(values)));
        self
    }

    /// Declares a ranked feature, the position of a value in `values` is its rank
    pub fn ordinal<S, I, T>(mut self, name: S, values: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let values = values.into_iter().map(Into::into).collect();

        self.0
            .features
            .push((name.into(), FeatureKind::Ordinal(values)));
        self
    }

    /// Declares a real-valued feature
    pub fn numerical<S: Into<String>>(mut self, name: S) -> Self {
        self.0.features.push((name.into(), FeatureKind::Numerical));
        self
    }

    /// Makes the `gated` features eligible only below a split on `gating`
    ///
    /// Repeated calls for the same gating feature extend its list.
    pub fn hierarchy<S, I, T>(mut self, gating: S, gated: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let gating = gating.into();
        let idx = match self.0.hierarchy.iter().position(|(name, _)| *name == gating) {
            Some(idx) => idx,
            None => {
                self.0.hierarchy.push((gating, Vec::new()));
                self.0.hierarchy.len() - 1
            }
        };

        let unlocked = &mut self.0.hierarchy[idx].1;
        for name in gated.into_iter().map(Into::into) {
            if !unlocked.contains(&name) {
                unlocked.push(name);
            }
        }

        self
    }
}

impl<F: Float, L: Label> Default for MultiSplitTreeParams<F, L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Float, L: Label> MultiSplitTree<F, L> {
    /// Defaults are provided if the optional parameters are not specified:
    /// * `split_quality = SplitQuality::Gini`
    /// * `max_depth = None`
    /// * `min_samples_split = 2`
    /// * `min_samples_leaf = 1`
    /// * `min_impurity_decrease = 0.0`
    /// * `max_children = None`
    ///
    /// No features are declared by default.
    // Violates the convention that new should return a value of type `Self`
    #[allow(clippy::new_ret_no_self)]
    pub fn params() -> MultiSplitTreeParams<F, L> {
        MultiSplitTreeParams::new()
    }
}

impl<F: Float, L> ParamGuard for MultiSplitTreeParams<F, L> {
    type Checked = MultiSplitTreeValidParams<F, L>;
    type Error = TreeError;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let params = &self.0;

        if params.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit(params.min_samples_split));
        }
        if params.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf(params.min_samples_leaf));
        }
        if params
            .min_samples_leaf
            .checked_mul(2)
            .map_or(true, |x| params.min_samples_split < x)
        {
            return Err(TreeError::InconsistentMinSamples {
                split: params.min_samples_split,
                leaf: params.min_samples_leaf,
            });
        }
        if !params.min_impurity_decrease.is_finite() || params.min_impurity_decrease < F::zero()
        {
            return Err(TreeError::InvalidMinImpurityDecrease(
                params.min_impurity_decrease.to_string(),
            ));
        }
        match params.max_children {
            Some(max_children) if max_children < 2 => {
                return Err(TreeError::InvalidMaxChildren(max_children))
            }
            _ => {}
        }
        if params.max_depth == Some(0) {
            return Err(TreeError::InvalidMaxDepth(0));
        }

        schema::check_declarations(&params.features, &params.hierarchy)?;

        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn declared() -> MultiSplitTreeParams<f64, String> {
        MultiSplitTree::params()
            .categorical("colour", ["red", "blue"])
            .ordinal("size", ["S", "M", "L"])
            .numerical("weight")
    }

    #[test]
    fn split_quality_from_str() {
        assert_eq!("gini".parse::<SplitQuality>(), Ok(SplitQuality::Gini));
        assert_eq!("entropy".parse::<SplitQuality>(), Ok(SplitQuality::Entropy));
        assert_eq!(
            "log_loss".parse::<SplitQuality>(),
            Err(TreeError::UnknownSplitQuality("log_loss".into()))
        );
        assert_eq!(SplitQuality::Entropy.to_string(), "entropy");
    }

    #[test]
    fn defaults_are_valid() {
        let params = declared().check_unwrap();

        assert_eq!(params.split_quality(), SplitQuality::Gini);
        assert_eq!(params.max_depth(), None);
        assert_eq!(params.min_samples_split(), 2);
        assert_eq!(params.min_samples_leaf(), 1);
        assert_eq!(params.min_impurity_decrease(), 0.0);
        assert_eq!(params.max_children(), None);
        assert_eq!(params.features().len(), 3);
    }

    #[test]
    fn categorical_values_are_sorted_and_unique() {
        let params = MultiSplitTree::<f64, usize>::params()
            .categorical("c", ["b", "a", "b"])
            .check_unwrap();

        assert_eq!(
            params.features()[0].1,
            FeatureKind::Categorical(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn rejects_invalid_sample_limits() {
        assert_eq!(
            declared().min_samples_split(1).check_ref(),
            Err(TreeError::InvalidMinSamplesSplit(1))
        );
        assert_eq!(
            declared().min_samples_leaf(0).check_ref(),
            Err(TreeError::InvalidMinSamplesLeaf(0))
        );
        assert_eq!(
            declared().min_samples_split(5).min_samples_leaf(3).check_ref(),
            Err(TreeError::InconsistentMinSamples { split: 5, leaf: 3 })
        );
        assert!(declared()
            .min_samples_split(6)
            .min_samples_leaf(3)
            .check_ref()
            .is_ok());
    }

    #[test]
    fn rejects_leaf_sizes_whose_double_overflows() {
        let leaf = usize::MAX / 2 + 1;
        assert_eq!(
            declared()
                .min_samples_split(usize::MAX)
                .min_samples_leaf(leaf)
                .check_ref(),
            Err(TreeError::InconsistentMinSamples {
                split: usize::MAX,
                leaf
            })
        );
        assert_eq!(
            declared().min_samples_leaf(usize::MAX).check_ref(),
            Err(TreeError::InconsistentMinSamples {
                split: 2,
                leaf: usize::MAX
            })
        );
    }

    #[test]
    fn rejects_invalid_limits() {
        assert_eq!(
            declared().min_impurity_decrease(-0.1).check_ref(),
            Err(TreeError::InvalidMinImpurityDecrease("-0.1".into()))
        );
        assert!(matches!(
            declared().min_impurity_decrease(f64::NAN).check_ref(),
            Err(TreeError::InvalidMinImpurityDecrease(_))
        ));
        assert_eq!(
            declared().max_children(Some(1)).check_ref(),
            Err(TreeError::InvalidMaxChildren(1))
        );
        assert_eq!(
            declared().max_depth(Some(0)).check_ref(),
            Err(TreeError::InvalidMaxDepth(0))
        );
    }

    #[test]
    fn hierarchy_calls_are_merged() {
        let params = declared()
            .hierarchy("colour", ["size"])
            .hierarchy("colour", ["weight", "size"])
            .check_unwrap();

        assert_eq!(
            params.hierarchy(),
            &[(
                "colour".to_string(),
                vec!["size".to_string(), "weight".to_string()]
            )]
        );
    }

    #[test]
    #[should_panic]
    fn panics_on_check_unwrap_without_features() {
        MultiSplitTree::<f64, bool>::params().check_unwrap();
    }
}
