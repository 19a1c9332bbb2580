//! Decision trees with multi-way splits
//!
use std::collections::{BTreeSet, HashMap};
use std::fmt::Debug;

use log::{debug, info, warn};
use ndarray::{Array1, Zip};

use multisplit::dataset::{FeatureLookup, Table, ValueRef};
use multisplit::metrics::ToConfusionMatrix;
use multisplit::{traits::*, Dataset, DatasetBase, Float, Label};

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::schema::{self, FeatureKind};
use super::splitter::{RowMask, Splitter};
use super::{Graphviz, MultiSplitTreeValidParams, NodeIter, SplitQuality};
use crate::error::{Result, TreeError};

/// The values or the range of the split feature that lead from a node to one of its children
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum Branch<F> {
    /// Categorical or ordinal values
    Values(Vec<String>),
    /// Numerical values up to and including the threshold
    LessEqual(F),
    /// Numerical values above the threshold
    Greater(F),
}

impl<F: Float> Branch<F> {
    /// Whether a sample with `value` on the split feature follows this branch
    ///
    /// Missing values follow no branch.
    pub fn matches(&self, value: ValueRef<'_, F>) -> bool {
        match (self, value) {
            (Branch::Values(values), ValueRef::Token(token)) => values.iter().any(|x| x == token),
            (Branch::LessEqual(threshold), ValueRef::Number(x)) => x <= *threshold,
            (Branch::Greater(threshold), ValueRef::Number(x)) => x > *threshold,
            _ => false,
        }
    }
}

#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone)]
/// A node in the decision tree
///
/// Every node, leaf or not, carries the statistics of the training samples which reached it.
pub struct TreeNode<F, L> {
    feature_idx: usize,
    feature_name: String,
    branch: Option<Branch<F>>,
    impurity: F,
    impurity_decrease: F,
    samples: usize,
    distribution: Vec<usize>,
    children: Vec<TreeNode<F, L>>,
    leaf_node: bool,
    prediction: L,
    depth: usize,
}

impl<F: Float, L: Label> TreeNode<F, L> {
    /// Returns true if the node has no children
    pub fn is_leaf(&self) -> bool {
        self.leaf_node
    }

    /// Returns the depth of the node in the decision tree, the root has depth one
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The most frequent class of the samples in this node
    pub fn prediction(&self) -> &L {
        &self.prediction
    }

    /// Children in the order of the branches of the split
    pub fn children(&self) -> &[TreeNode<F, L>] {
        &self.children
    }

    /// The branch leading from the parent to this node, `None` for the root
    pub fn branch(&self) -> Option<&Branch<F>> {
        self.branch.as_ref()
    }

    pub fn impurity(&self) -> F {
        self.impurity
    }

    /// Information gain of the split of this node, zero for leaves
    pub fn impurity_decrease(&self) -> F {
        self.impurity_decrease
    }

    /// Number of training samples in this node
    ///
    /// Samples with a missing value on an ancestor's split feature are counted in every sibling.
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Number of training samples of every class, ordered like the classes of the tree
    pub fn distribution(&self) -> &[usize] {
        &self.distribution
    }

    /// Returns the name of the feature used in the split if the node is internal,
    /// `None` otherwise
    pub fn split_feature(&self) -> Option<&str> {
        if self.leaf_node {
            None
        } else {
            Some(&self.feature_name)
        }
    }

    /// Returns the index of the feature used in the split if the node is internal
    pub fn feature_idx(&self) -> Option<usize> {
        if self.leaf_node {
            None
        } else {
            Some(self.feature_idx)
        }
    }
}

/// Samples reaching a node which is yet to be fitted, with the state of the hierarchy there
///
/// `eligible` are the features which may be split on, `unlocks` the features each gating
/// feature still has to unlock below this node.
struct Frame<F> {
    mask: RowMask,
    branch: Option<Branch<F>>,
    depth: usize,
    eligible: Vec<usize>,
    unlocks: Vec<(usize, Vec<usize>)>,
}

/// Node construction over a fixed training set
struct TreeBuilder<'a, F, L> {
    splitter: Splitter<'a, F>,
    classes: &'a [L],
    feature_names: &'a [String],
    min_samples_split: usize,
    max_depth: Option<usize>,
}

impl<'a, F: Float, L: Label + Debug> TreeBuilder<'a, F, L> {
    /// Fits the tree below `root` with an explicit work stack
    ///
    /// Nodes are grown in pre-order and attached to their parents once all of them exist, so the
    /// depth of the tree is not bounded by the call stack.
    fn build(&self, root: Frame<F>) -> TreeNode<F, L> {
        let (mut root_node, children) = self.grow(root);

        // grown nodes below the root with the position of their parent, `None` for the root
        let mut nodes: Vec<(Option<usize>, TreeNode<F, L>)> = Vec::new();
        let mut stack = children
            .into_iter()
            .rev()
            .map(|frame| (None, frame))
            .collect::<Vec<_>>();

        while let Some((parent, frame)) = stack.pop() {
            let (node, children) = self.grow(frame);
            nodes.push((parent, node));

            // the first child ends up on top of the stack
            let idx = nodes.len() - 1;
            stack.extend(children.into_iter().rev().map(|frame| (Some(idx), frame)));
        }

        // every node sits after its parent, so its children are complete when it is attached
        while let Some((parent, mut node)) = nodes.pop() {
            node.children.reverse();
            match parent {
                Some(idx) => nodes[idx].1.children.push(node),
                None => root_node.children.push(node),
            }
        }
        root_node.children.reverse();

        root_node
    }

    /// Fits a single node, returns it without children together with the frames of its children
    fn grow(&self, frame: Frame<F>) -> (TreeNode<F, L>, Vec<Frame<F>>) {
        let Frame {
            mask,
            branch,
            depth,
            mut eligible,
            mut unlocks,
        } = frame;

        let distribution = self.splitter.class_counts(&mask);
        let impurity = self.splitter.quality().impurity(&distribution);
        let prediction = self.classes[majority(&distribution)].clone();

        let splittable = mask.nsamples >= self.min_samples_split
            && self.max_depth.map_or(true, |max_depth| depth <= max_depth);
        let split = if splittable {
            self.splitter.best_split(&mask, &distribution, &eligible)
        } else {
            None
        };

        let (node, children) = match split {
            None => (
                TreeNode {
                    feature_idx: 0,
                    feature_name: String::new(),
                    branch,
                    impurity,
                    impurity_decrease: F::zero(),
                    samples: mask.nsamples,
                    distribution,
                    children: Vec::new(),
                    leaf_node: true,
                    prediction,
                    depth,
                },
                Vec::new(),
            ),
            Some(split) => {
                if let Some(pos) = unlocks
                    .iter()
                    .position(|(gating, _)| *gating == split.feature)
                {
                    let (_, gated) = unlocks.remove(pos);
                    eligible.extend(gated);
                }

                // every child starts from its own copy of the hierarchy at this split
                let children = split
                    .branches
                    .into_iter()
                    .zip(split.masks)
                    .map(|(branch, mask)| Frame {
                        mask,
                        branch: Some(branch),
                        depth: depth + 1,
                        eligible: eligible.clone(),
                        unlocks: unlocks.clone(),
                    })
                    .collect();

                let node = TreeNode {
                    feature_idx: split.feature,
                    feature_name: self.feature_names[split.feature].clone(),
                    branch,
                    impurity,
                    impurity_decrease: split.gain,
                    samples: mask.nsamples,
                    distribution,
                    children: Vec::new(),
                    leaf_node: false,
                    prediction,
                    depth,
                };

                (node, children)
            }
        };

        debug!(
            "feature: {:?}; branch: {:?}; impurity: {}; samples: {}; distribution: {:?}; label: {:?}",
            node.split_feature(),
            node.branch,
            node.impurity,
            node.samples,
            node.distribution,
            node.prediction
        );

        (node, children)
    }
}

/// Drops the subtree of a node with an explicit stack
impl<F, L> Drop for TreeNode<F, L> {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.children);
        }
    }
}

/// Position of the most frequent class, ties are resolved in favour of the first class
fn majority(distribution: &[usize]) -> usize {
    distribution
        .iter()
        .enumerate()
        .fold(0, |best, (idx, &n)| if n > distribution[best] { idx } else { best })
}

/// A fitted decision tree model for classification with multi-way splits.
///
/// ### Structure
///
/// Every internal node splits its samples on a single feature:
///
/// * a categorical feature is split into two or more children, each owning a group of values,
/// * an ordinal feature is cut in two, the lower ranked values and the higher ranked ones,
/// * a numerical feature is split at a threshold, `feature <= threshold` to the first child and
///   `feature > threshold` to the second.
///
/// Samples whose value is missing on the split feature are sent to every child. Leaves predict
/// the most frequent label of their samples.
///
/// ### Algorithm
///
/// Starting with a single root node, trees are trained recursively by applying the following
/// rules to every node considered:
///
/// * Search the best split of every eligible feature. Categorical features try every partition of
///   their values into groups, ordinal features every cut of their ranking and numerical features
///   every midpoint between consecutive values;
/// * Select the feature whose best split maximizes the information gain, the earlier feature wins
///   ties;
/// * If the gain reaches the minimum impurity decrease, children are created and the features
///   unlocked by the chosen feature become eligible below it.
///
/// ### Predictions
///
/// A sample is routed from the root to the child whose branch matches its value. If no child
/// matches, because the value was not seen in training or is missing, the label of the current
/// node is returned.
///
/// ### Example
///
/// ```rust
/// use multisplit::prelude::*;
/// use multisplit_trees::MultiSplitTree;
/// use ndarray::array;
///
/// let table = Table::default().with_numerical("x", array![1., 2., 10., 11.])?;
/// let dataset = Dataset::new(table, array!["neg", "neg", "pos", "pos"]);
///
/// let tree = MultiSplitTree::params().numerical("x").fit(&dataset)?;
///
/// assert_eq!(tree.predict(&dataset)?, array!["neg", "neg", "pos", "pos"]);
/// assert_eq!(tree.num_leaves(), 2);
/// # Ok::<(), multisplit_trees::TreeError>(())
/// ```
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone)]
pub struct MultiSplitTree<F: Float, L: Label> {
    root_node: TreeNode<F, L>,
    feature_names: Vec<String>,
    feature_kinds: Vec<FeatureKind>,
    classes: Vec<L>,
    importances: Vec<F>,
    split_quality: SplitQuality,
}

impl<F: Float, L: Label + Ord + Debug> Fit<Table<F>, Array1<L>, TreeError>
    for MultiSplitTreeValidParams<F, L>
{
    type Object = MultiSplitTree<F, L>;

    /// Fit a decision tree on the dataset, the columns of the records have to match the declared
    /// features.
    fn fit(&self, dataset: &DatasetBase<Table<F>, Array1<L>>) -> Result<Self::Object> {
        let table = dataset.records();
        let targets = dataset.targets();

        let feature_kinds = validate(table, targets, self).map_err(reject)?;

        let classes = dataset.labels();
        let positions = classes
            .iter()
            .enumerate()
            .map(|(idx, class)| (class, idx))
            .collect::<HashMap<_, _>>();
        let class_idx = targets.iter().map(|x| positions[x]).collect::<Vec<_>>();

        let root_node = {
            // unknown tokens are reported before any node is built
            let columns = schema::encode(table, &feature_kinds).map_err(reject)?;
            let unlocks = schema::unlocks(table.column_names(), self.hierarchy());
            let eligible = schema::initially_eligible(feature_kinds.len(), &unlocks);

            let builder = TreeBuilder {
                splitter: Splitter::new(columns, &class_idx, classes.len(), self),
                classes: &classes,
                feature_names: table.column_names(),
                min_samples_split: self.min_samples_split(),
                max_depth: self.max_depth(),
            };

            builder.build(Frame {
                mask: RowMask::all(table.nrows()),
                branch: None,
                depth: 1,
                eligible,
                unlocks,
            })
        };

        // importance of a split is its gain weighted by the share of samples reaching it
        let total = F::cast(table.nrows());
        let mut importances = vec![F::zero(); feature_kinds.len()];
        for node in NodeIter::new(vec![&root_node]).filter(|node| !node.is_leaf()) {
            importances[node.feature_idx] += F::cast(node.samples) / total * node.impurity_decrease;
        }

        let tree = MultiSplitTree {
            root_node,
            feature_names: table.column_names().to_vec(),
            feature_kinds,
            classes,
            importances,
            split_quality: self.split_quality(),
        };

        info!(
            "fitted tree on {} samples: {} nodes, {} leaves, depth {}",
            table.nrows(),
            tree.num_nodes(),
            tree.num_leaves(),
            tree.max_depth()
        );

        Ok(tree)
    }
}

/// Checks the training data against the declarations, returns the kind of every column
fn validate<F: Float, L>(
    table: &Table<F>,
    targets: &Array1<L>,
    params: &MultiSplitTreeValidParams<F, L>,
) -> Result<Vec<FeatureKind>> {
    if targets.len() != table.nrows() {
        return Err(multisplit::Error::MismatchedShapes(table.nrows(), targets.len()).into());
    }
    if table.nrows() == 0 {
        return Err(TreeError::EmptyDataset);
    }

    schema::resolve(table, params.features())
}

fn reject(err: TreeError) -> TreeError {
    warn!("rejecting training data: {}", err);
    err
}

impl<F: Float, L: Label> MultiSplitTree<F, L> {
    /// Create a node iterator in pre-order (DFS)
    pub fn iter_nodes(&self) -> NodeIter<F, L> {
        // queue of nodes yet to explore
        let queue = vec![&self.root_node];

        NodeIter::new(queue)
    }

    /// Return root node of the tree
    pub fn root_node(&self) -> &TreeNode<F, L> {
        &self.root_node
    }

    /// Names of the features seen during fit, in the column order of the training table
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Sorted classes seen during fit, node distributions follow this order
    pub fn classes(&self) -> &[L] {
        &self.classes
    }

    /// The kind of a feature seen during fit
    pub fn feature_kind(&self, name: &str) -> Option<&FeatureKind> {
        self.feature_names
            .iter()
            .position(|x| x == name)
            .map(|idx| &self.feature_kinds[idx])
    }

    pub fn split_quality(&self) -> SplitQuality {
        self.split_quality
    }

    /// Return the indices of the features used by any split, in ascending order
    pub fn features(&self) -> Vec<usize> {
        self.iter_nodes()
            .filter_map(|node| node.feature_idx())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Return the feature importance, i.e. the share of the total weighted information gain, for
    /// each feature
    ///
    /// The values are aligned with [`feature_names`](Self::feature_names) and sum to one. If the
    /// tree has no split at all, every importance is zero.
    pub fn feature_importance(&self) -> Vec<F> {
        let sum = self.importances.iter().cloned().sum::<F>();
        if sum <= F::zero() {
            return vec![F::zero(); self.importances.len()];
        }

        self.importances.iter().map(|&x| x / sum).collect()
    }

    /// Return the feature importance by feature name
    pub fn feature_importance_map(&self) -> HashMap<String, F> {
        self.feature_names
            .iter()
            .cloned()
            .zip(self.feature_importance())
            .collect()
    }

    /// Return max depth of the tree
    pub fn max_depth(&self) -> usize {
        self.iter_nodes()
            .fold(0, |max, node| usize::max(max, node.depth))
    }

    /// Return the number of leaves in this tree
    pub fn num_leaves(&self) -> usize {
        self.iter_nodes().filter(|node| node.is_leaf()).count()
    }

    /// Return the number of nodes in this tree
    pub fn num_nodes(&self) -> usize {
        self.iter_nodes().count()
    }

    /// Generates a [`Graphviz`](struct.Graphviz.html) structure to print the fitted tree in the
    /// DOT language, showing every node statistic
    pub fn export_to_graphviz(&self) -> Graphviz<F, L>
    where
        L: Debug,
    {
        Graphviz::new(self)
    }

    /// Classify a sample given the value of every feature by its position
    fn descend<'v>(&self, value_of: impl Fn(usize) -> ValueRef<'v, F>) -> &L {
        let mut node = &self.root_node;

        while !node.is_leaf() {
            let value = value_of(node.feature_idx);
            let child = node.children.iter().find(|child| {
                child
                    .branch
                    .as_ref()
                    .map_or(false, |branch| branch.matches(value))
            });

            match child {
                Some(child) => node = child,
                None => break,
            }
        }

        &node.prediction
    }

    /// Make a prediction for every row of `table`
    ///
    /// The columns are matched by name, their order does not matter. Rows are classified in
    /// parallel.
    pub fn try_predict(&self, table: &Table<F>) -> Result<Array1<L>>
    where
        L: Send + Sync,
    {
        let columns = schema::match_columns(&self.feature_names, &self.feature_kinds, table)
            .map_err(|err| {
                warn!("rejecting records for prediction: {}", err);
                err
            })?;

        let rows = Array1::from_iter(0..table.nrows());
        let predictions = Zip::from(&rows).par_map_collect(|&row| {
            self.descend(|idx| columns[idx].value(row)).clone()
        });

        Ok(predictions)
    }

    /// Make a prediction for a single sample, given by the value of every feature
    ///
    /// ```rust
    /// use std::collections::HashMap;
    /// # use multisplit::prelude::*;
    /// # use multisplit_trees::MultiSplitTree;
    /// # use ndarray::array;
    /// # let table = Table::<f64>::default().with_tokens("f", vec![Some("x"), Some("y")])?;
    /// # let dataset = Dataset::new(table, array![0usize, 1]);
    /// # let tree = MultiSplitTree::params().categorical("f", ["x", "y", "z"]).fit(&dataset)?;
    ///
    /// let mut sample = HashMap::new();
    /// sample.insert("f".to_string(), Value::token("y"));
    /// assert_eq!(tree.predict_sample(&sample)?, 1);
    /// # Ok::<(), multisplit_trees::TreeError>(())
    /// ```
    pub fn predict_sample<S: FeatureLookup<F>>(&self, sample: &S) -> Result<L> {
        let mut values = Vec::with_capacity(self.feature_names.len());
        let mut missing = Vec::new();

        for (name, kind) in self.feature_names.iter().zip(&self.feature_kinds) {
            match sample.lookup(name) {
                None => missing.push(name.clone()),
                Some(value) => {
                    let accepted = match value {
                        ValueRef::Number(_) => kind.is_numerical(),
                        ValueRef::Token(_) => !kind.is_numerical(),
                        ValueRef::Missing => true,
                    };
                    if !accepted {
                        return Err(TreeError::ColumnKind {
                            feature: name.clone(),
                            expected: kind.describe(),
                        });
                    }
                    values.push(value);
                }
            }
        }

        if !missing.is_empty() {
            return Err(TreeError::FeatureMismatch {
                unexpected: Vec::new(),
                missing,
            });
        }

        Ok(self.descend(|idx| values[idx]).clone())
    }

    /// Accuracy of the predictions for the records of `dataset` against its targets
    pub fn score(&self, dataset: &Dataset<F, L>) -> Result<f32>
    where
        L: Ord + Send + Sync,
    {
        let predictions = self.try_predict(dataset.records())?;
        let cm = predictions.confusion_matrix(dataset)?;

        Ok(cm.accuracy())
    }
}

impl<F: Float, L: Label + Send + Sync> Predict<&Table<F>, Result<Array1<L>>>
    for MultiSplitTree<F, L>
{
    /// Make predictions for each row of a table
    fn predict(&self, x: &Table<F>) -> Result<Array1<L>> {
        self.try_predict(x)
    }
}

impl<F: Float, L: Label + Send + Sync> Predict<&Dataset<F, L>, Result<Array1<L>>>
    for MultiSplitTree<F, L>
{
    /// Make predictions for each row of the records of a dataset
    fn predict(&self, x: &Dataset<F, L>) -> Result<Array1<L>> {
        self.try_predict(x.records())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use approx::assert_abs_diff_eq;
    use multisplit::dataset::Value;
    use multisplit::ParamGuard;
    use ndarray::{array, Array};
    use ndarray_rand::rand::SeedableRng;
    use ndarray_rand::rand_distr::Uniform;
    use ndarray_rand::RandomExt;
    use rand::rngs::SmallRng;

    use crate::MultiSplitTreeParams;

    #[test]
    fn majority_prefers_the_first_class_on_ties() {
        assert_eq!(majority(&[2, 5, 5]), 1);
        assert_eq!(majority(&[3, 3]), 0);
        assert_eq!(majority(&[0, 0, 1]), 2);
    }

    #[test]
    fn branches_match_values() {
        let values = Branch::<f64>::Values(vec!["x".into(), "y".into()]);
        assert!(values.matches(ValueRef::Token("y")));
        assert!(!values.matches(ValueRef::Token("z")));
        assert!(!values.matches(ValueRef::Missing));

        assert!(Branch::LessEqual(6.0).matches(ValueRef::Number(6.0)));
        assert!(!Branch::LessEqual(6.0).matches(ValueRef::Number(6.5)));
        assert!(Branch::Greater(6.0).matches(ValueRef::Number(6.5)));
        assert!(!Branch::Greater(6.0).matches(ValueRef::Missing));
    }

    #[test]
    /// Two well separated groups on a single numerical feature
    fn separable_numerical() -> Result<()> {
        let table = Table::default().with_numerical("x", array![1., 2., 10., 11.])?;
        let dataset = Dataset::new(table, array!["neg", "neg", "pos", "pos"]);

        let model = MultiSplitTree::params()
            .numerical("x")
            .min_samples_leaf(1)
            .min_samples_split(2)
            .fit(&dataset)?;

        let root = model.root_node();
        assert_eq!(root.split_feature(), Some("x"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].branch(), Some(&Branch::LessEqual(6.0)));
        assert_eq!(root.children()[1].branch(), Some(&Branch::Greater(6.0)));
        assert!(root.children().iter().all(|x| x.is_leaf() && x.impurity() == 0.0));
        assert_eq!(root.distribution(), &[2, 2]);
        assert_abs_diff_eq!(root.impurity_decrease(), 0.5);

        assert_eq!(model.score(&dataset)?, 1.0);
        assert_eq!(model.classes(), &["neg", "pos"]);

        Ok(())
    }

    #[test]
    /// Single feature test
    ///
    /// Generate a dataset where a single categorical feature perfectly correlates with the
    /// target while the numerical features are uniform noise and do not add any information.
    fn single_feature_random_noise() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);
        let targets = (0..60).map(|x| x % 3).collect::<Array1<usize>>();
        let colours = targets
            .iter()
            .map(|x| Some(["red", "green", "blue"][*x]))
            .collect::<Vec<_>>();

        let mut table = Table::default();
        for i in 0..4 {
            let noise = Array::random_using(60, Uniform::new(-4., 4.), &mut rng);
            table = table.with_numerical(format!("noise{}", i), noise)?;
        }
        let table = table.with_tokens("colour", colours)?;
        let dataset = Dataset::new(table, targets);

        let mut params = MultiSplitTree::params()
            .categorical("colour", ["red", "green", "blue"])
            .max_depth(Some(1));
        for i in 0..4 {
            params = params.numerical(format!("noise{}", i));
        }
        let model = params.fit(&dataset)?;

        // we should only use the colour here
        assert_eq!(&model.features(), &[4]);
        assert_eq!(model.root_node().children().len(), 3);

        let ground_truth = [0.0, 0.0, 0.0, 0.0, 1.0];
        for (imp, truth) in model.feature_importance().iter().zip(&ground_truth) {
            assert_abs_diff_eq!(imp, truth, epsilon = 1e-15);
        }
        assert_abs_diff_eq!(model.feature_importance_map()["colour"], 1.0);

        assert_abs_diff_eq!(model.score(&dataset)?, 1.0);

        Ok(())
    }

    #[test]
    /// Check that for random data the max depth is used
    fn check_max_depth() -> Result<()> {
        let mut rng = SmallRng::seed_from_u64(42);

        // create very sparse data
        let mut table = Table::default();
        let mut params = MultiSplitTree::params();
        for i in 0..20 {
            let name = format!("x{}", i);
            let values = Array::random_using(50, Uniform::new(-1., 1.), &mut rng);
            table = table.with_numerical(name.clone(), values)?;
            params = params.numerical(name);
        }
        let targets = (0..50).collect::<Array1<usize>>();
        let dataset = Dataset::new(table, targets);

        // splits happen up to depth `max_depth`, their children form the last level
        for max_depth in &[1, 3, 5] {
            let model = params.clone().max_depth(Some(*max_depth)).fit(&dataset)?;
            assert_eq!(model.max_depth(), max_depth + 1);
        }

        // without a limit the tree grows until every leaf is pure
        let model = params.fit(&dataset)?;
        assert_eq!(model.num_leaves(), 50);
        assert_eq!(model.num_nodes(), 99);

        Ok(())
    }

    #[test]
    fn grows_trees_deeper_than_the_call_stack() -> Result<()> {
        // alternating labels along a single feature peel off one sample per split
        let n = 5000;
        let table = Table::default().with_numerical("x", Array::range(0., n as f64, 1.))?;
        let targets = (0..n).map(|i| i % 2).collect::<Array1<usize>>();
        let dataset = Dataset::new(table, targets);

        let model = MultiSplitTree::params().numerical("x").fit(&dataset)?;

        assert_eq!(model.num_leaves(), n);
        assert_eq!(model.num_nodes(), 2 * n - 1);
        assert!(model.max_depth() > 1000);
        assert_abs_diff_eq!(model.score(&dataset)?, 1.0);

        // nodes are attached in branch order
        for node in model.iter_nodes().filter(|node| !node.is_leaf()) {
            match node.children() {
                [left, right] => {
                    assert!(matches!(left.branch(), Some(Branch::LessEqual(_))));
                    assert!(matches!(right.branch(), Some(Branch::Greater(_))));
                    assert_eq!(left.depth(), node.depth() + 1);
                    assert_eq!(left.samples() + right.samples(), node.samples());
                }
                other => panic!("expected two children, got {}", other.len()),
            }
        }

        let dot = model.export_to_graphviz().to_string();
        assert_eq!(dot.lines().filter(|x| x.contains("->")).count(), 2 * n - 2);

        Ok(())
    }

    #[test]
    fn stops_below_min_samples_split() -> Result<()> {
        let table = Table::default().with_numerical("x", array![1., 2., 10., 11.])?;
        let dataset = Dataset::new(table, array![0usize, 0, 1, 1]);

        let model = MultiSplitTree::params()
            .numerical("x")
            .min_samples_split(5)
            .fit(&dataset)?;

        assert!(model.root_node().is_leaf());
        assert_eq!(model.root_node().split_feature(), None);
        assert_eq!(model.root_node().prediction(), &0);
        assert_eq!(model.num_nodes(), 1);

        // without any split there is no importance to distribute
        assert_eq!(model.feature_importance(), vec![0.0]);

        Ok(())
    }

    #[test]
    fn multi_way_categorical_split() -> Result<()> {
        let table = Table::<f64>::default().with_tokens(
            "size",
            vec![Some("s"), Some("m"), Some("l"), Some("s"), Some("m"), Some("l")],
        )?;
        let dataset = Dataset::new(table, array!["a", "b", "c", "a", "b", "c"]);

        let params = MultiSplitTree::params().categorical("size", ["s", "m", "l"]);

        let model = params.clone().fit(&dataset)?;
        let branches = model
            .root_node()
            .children()
            .iter()
            .map(|x| x.branch().cloned())
            .collect::<Vec<_>>();
        assert_eq!(
            branches,
            vec![
                Some(Branch::Values(vec!["l".into()])),
                Some(Branch::Values(vec!["m".into()])),
                Some(Branch::Values(vec!["s".into()])),
            ]
        );
        assert_eq!(model.num_leaves(), 3);

        // with at most two children the tree needs another level
        let model = params.max_children(Some(2)).fit(&dataset)?;
        assert!(model.iter_nodes().all(|x| x.children().len() <= 2));
        assert_eq!(model.max_depth(), 3);
        assert_eq!(model.score(&dataset)?, 1.0);

        Ok(())
    }

    #[test]
    fn unseen_category_falls_back_to_the_node_label() -> Result<()> {
        let table = Table::<f64>::default().with_tokens(
            "f",
            vec![Some("x"), Some("x"), Some("x"), Some("y"), Some("y")],
        )?;
        let dataset = Dataset::new(table, array!["a", "a", "a", "b", "b"]);

        let model = MultiSplitTree::params()
            .categorical("f", ["x", "y", "z"])
            .fit(&dataset)?;
        assert_eq!(model.num_leaves(), 2);

        let unseen = Table::default().with_tokens("f", vec![Some("z"), None, Some("y")])?;
        assert_eq!(model.predict(&unseen)?, array!["a", "a", "b"]);

        Ok(())
    }

    #[test]
    fn missing_numerical_value_falls_back_to_the_node_label() -> Result<()> {
        let table = Table::default().with_numerical("x", array![1., 2., 3., 10., 11.])?;
        let dataset = Dataset::new(table, array![1usize, 1, 1, 0, 0]);

        let model = MultiSplitTree::params().numerical("x").fit(&dataset)?;

        let mut sample = HashMap::new();
        sample.insert("x".to_string(), Value::Number(f64::NAN));
        assert_eq!(model.predict_sample(&sample)?, 1);

        sample.insert("x".to_string(), Value::Number(12.));
        assert_eq!(model.predict_sample(&sample)?, 0);

        sample.insert("x".to_string(), Value::token("big"));
        assert_eq!(
            model.predict_sample(&sample),
            Err(TreeError::ColumnKind {
                feature: "x".into(),
                expected: "numerical"
            })
        );

        Ok(())
    }

    #[test]
    fn missing_values_are_counted_in_every_child() -> Result<()> {
        let table = Table::<f64>::default().with_tokens(
            "f",
            vec![Some("x"), Some("x"), Some("y"), Some("y"), None],
        )?;
        let dataset = Dataset::new(table, array![0usize, 0, 1, 1, 0]);

        let model = MultiSplitTree::params()
            .categorical("f", ["x", "y"])
            .fit(&dataset)?;

        let root = model.root_node();
        let total = root.children().iter().map(|x| x.samples()).sum::<usize>();
        assert_eq!(root.samples(), 5);
        assert_eq!(total, root.samples() + root.children().len() - 1);

        Ok(())
    }

    #[test]
    fn hierarchy_unlocks_features_below_the_gate() -> Result<()> {
        // `detail` alone separates the classes, but it is only eligible below `kind`
        let table = Table::default()
            .with_tokens(
                "kind",
                vec![Some("p"), Some("p"), Some("p"), Some("q"), Some("q"), Some("q")],
            )?
            .with_numerical("detail", array![1., 2., 9., 1., 8., 9.])?;
        let dataset = Dataset::new(table, array![0usize, 0, 1, 0, 1, 1]);

        let model = MultiSplitTree::params()
            .categorical("kind", ["p", "q"])
            .numerical("detail")
            .hierarchy("kind", ["detail"])
            .fit(&dataset)?;

        assert_eq!(model.root_node().split_feature(), Some("kind"));
        for node in model.iter_nodes().filter(|x| x.depth() == 2) {
            assert_eq!(node.split_feature(), Some("detail"));
        }
        assert_eq!(model.score(&dataset)?, 1.0);

        // without the hierarchy the numerical feature is chosen first
        let model = MultiSplitTree::params()
            .categorical("kind", ["p", "q"])
            .numerical("detail")
            .fit(&dataset)?;
        assert_eq!(model.root_node().split_feature(), Some("detail"));

        Ok(())
    }

    #[test]
    fn ordinal_split_keeps_the_ranking() -> Result<()> {
        let table = Table::<f64>::default().with_tokens(
            "grade",
            vec![Some("low"), Some("mid"), Some("high"), Some("low"), Some("high")],
        )?;
        let dataset = Dataset::new(table, array![0usize, 0, 1, 0, 1]);

        let model = MultiSplitTree::params()
            .ordinal("grade", ["low", "mid", "high"])
            .fit(&dataset)?;

        let branches = model
            .root_node()
            .children()
            .iter()
            .map(|x| x.branch().cloned())
            .collect::<Vec<_>>();
        assert_eq!(
            branches,
            vec![
                Some(Branch::Values(vec!["low".into(), "mid".into()])),
                Some(Branch::Values(vec!["high".into()])),
            ]
        );
        assert_eq!(model.feature_kind("grade").map(|x| x.describe()), Some("ordinal"));

        Ok(())
    }

    #[test]
    fn rejects_invalid_training_data() -> Result<()> {
        let table = Table::default().with_tokens("f", vec![Some("x"), Some("w")])?;
        let params: MultiSplitTreeParams<f64, usize> =
            MultiSplitTree::params().categorical("f", ["x", "y"]);

        assert_eq!(
            params.fit(&Dataset::new(table.clone(), array![0, 1])).map(|_| ()),
            Err(TreeError::UnknownToken {
                feature: "f".into(),
                token: "w".into()
            })
        );
        assert_eq!(
            params.fit(&Dataset::new(table, array![0])).map(|_| ()),
            Err(TreeError::BaseCrate(multisplit::Error::MismatchedShapes(2, 1)))
        );

        let empty = Table::default().with_tokens("f", Vec::<Option<&str>>::new())?;
        assert_eq!(
            params.fit(&Dataset::new(empty, array![])).map(|_| ()),
            Err(TreeError::EmptyDataset)
        );

        assert_eq!(
            MultiSplitTree::<f64, usize>::params().check().map(|_| ()),
            Err(TreeError::NoFeatures)
        );

        Ok(())
    }

    #[test]
    fn rejects_mismatching_prediction_records() -> Result<()> {
        let table = Table::default()
            .with_numerical("a", array![1., 2.])?
            .with_numerical("b", array![1., 2.])?;
        let dataset = Dataset::new(table, array![true, false]);
        let model = MultiSplitTree::params()
            .numerical("a")
            .numerical("b")
            .fit(&dataset)?;

        let other = Table::default()
            .with_numerical("b", array![1.])?
            .with_numerical("c", array![1.])?;
        assert_eq!(
            model.predict(&other),
            Err(TreeError::FeatureMismatch {
                unexpected: vec!["c".into()],
                missing: vec!["a".into()]
            })
        );

        // column order does not matter
        let swapped = Table::default()
            .with_numerical("b", array![1., 2.])?
            .with_numerical("a", array![1., 2.])?;
        assert_eq!(model.predict(&swapped)?, array![true, false]);

        let sample: HashMap<String, Value<f64>> = HashMap::new();
        assert_eq!(
            model.predict_sample(&sample),
            Err(TreeError::FeatureMismatch {
                unexpected: vec![],
                missing: vec!["a".into(), "b".into()]
            })
        );

        Ok(())
    }

    #[test]
    fn refit_returns_an_independent_model() -> Result<()> {
        let params = MultiSplitTree::params().numerical("x");
        let first = Dataset::new(
            Table::default().with_numerical("x", array![1., 2., 3., 4.])?,
            array![0usize, 0, 1, 1],
        );
        let model = params.fit(&first)?;

        let broken = Dataset::new(
            Table::default().with_numerical("y", array![1., 2.])?,
            array![0usize, 1],
        );
        assert!(params.fit(&broken).is_err());

        // the earlier model is untouched by the failed fit
        assert_eq!(model.score(&first)?, 1.0);

        Ok(())
    }
}
