use std::fmt::{self, Debug, Write};

use super::{Branch, MultiSplitTree, TreeNode};
use multisplit::{Float, Label};

/// Struct to print a fitted decision tree in the DOT language of Graphviz.
///
/// Internal nodes show the name of their split feature, edges show the values or the range of
/// the feature which lead to the child. Every other line of a node is optional.
///
/// ### Usage
///
/// ```rust
/// use multisplit::prelude::*;
/// use multisplit_trees::MultiSplitTree;
/// use ndarray::array;
///
/// let table = Table::default().with_numerical("x", array![1., 2., 10., 11.])?;
/// let dataset = Dataset::new(table, array!["neg", "neg", "pos", "pos"]);
/// let tree = MultiSplitTree::params().numerical("x").fit(&dataset)?;
///
/// let dot = tree
///     .export_to_graphviz()
///     .rounded(true)
///     .show_distribution(false)
///     .to_string();
///
/// assert!(dot.starts_with("digraph Tree {"));
/// assert!(dot.contains("node0 -> node1 [label=\"<= 6\"] ;"));
/// // Now you can write the graph to the preferred destination and render it with `dot`
/// # Ok::<(), multisplit_trees::TreeError>(())
/// ```
pub struct Graphviz<'a, F: Float, L: Label> {
    rounded: bool,
    impurity: bool,
    samples: bool,
    distribution: bool,
    label: bool,
    tree: &'a MultiSplitTree<F, L>,
}

impl<'a, F: Float, L: Label + Debug> Graphviz<'a, F, L> {
    /// Square nodes showing every node statistic
    pub fn new(tree: &'a MultiSplitTree<F, L>) -> Self {
        Graphviz {
            rounded: false,
            impurity: true,
            samples: true,
            distribution: true,
            label: true,
            tree,
        }
    }

    /// Whether nodes are drawn with rounded corners
    pub fn rounded(mut self, rounded: bool) -> Self {
        self.rounded = rounded;

        self
    }

    /// Whether nodes show their impurity
    pub fn show_impurity(mut self, show: bool) -> Self {
        self.impurity = show;

        self
    }

    /// Whether nodes show their number of training samples
    pub fn show_samples(mut self, show: bool) -> Self {
        self.samples = show;

        self
    }

    /// Whether nodes show the number of training samples of every class
    pub fn show_distribution(mut self, show: bool) -> Self {
        self.distribution = show;

        self
    }

    /// Whether nodes show their most frequent label
    pub fn show_label(mut self, show: bool) -> Self {
        self.label = show;

        self
    }

    fn node_label(&self, node: &TreeNode<F, L>) -> String {
        let mut lines = Vec::new();

        if let Some(feature) = node.split_feature() {
            lines.push(feature.to_string());
        }
        if self.impurity {
            lines.push(format!(
                "{} = {:.3}",
                self.tree.split_quality(),
                node.impurity()
            ));
        }
        if self.samples {
            lines.push(format!("samples = {}", node.samples()));
        }
        if self.distribution {
            lines.push(format!("distribution = {:?}", node.distribution()));
        }
        if self.label {
            lines.push(format!("label = {:?}", node.prediction()));
        }

        lines.iter().map(|x| escape(x)).collect::<Vec<_>>().join("\\n")
    }

    /// Writes every node and edge, identifiers are assigned in pre-order
    fn write_nodes(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut next = 0usize;
        let mut stack = vec![(self.tree.root_node(), None)];

        while let Some((node, parent)) = stack.pop() {
            let id = next;
            next += 1;

            writeln!(f, "node{} [label=\"{}\"] ;", id, self.node_label(node))?;
            if let (Some(parent), Some(branch)) = (parent, node.branch()) {
                writeln!(
                    f,
                    "node{} -> node{} [label=\"{}\"] ;",
                    parent,
                    id,
                    branch_label(branch)
                )?;
            }

            stack.extend(node.children().iter().rev().map(|child| (child, Some(id))));
        }

        Ok(())
    }
}

fn branch_label<F: Float>(branch: &Branch<F>) -> String {
    match branch {
        Branch::Values(values) => values
            .iter()
            .map(|x| escape(x))
            .collect::<Vec<_>>()
            .join("\\n"),
        Branch::LessEqual(threshold) => format!("<= {}", threshold),
        Branch::Greater(threshold) => format!("> {}", threshold),
    }
}

/// Escapes a string for a quoted DOT identifier
fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            c => out.push(c),
        }
    }

    out
}

impl<'a, F: Float, L: Debug + Label> fmt::Display for Graphviz<'a, F, L> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut style = String::from("shape=box");
        if self.rounded {
            write!(style, ", style=\"rounded\"")?;
        }

        writeln!(f, "digraph Tree {{")?;
        writeln!(f, "node [{}] ;", style)?;
        self.write_nodes(f)?;
        write!(f, "}}")
    }
}
