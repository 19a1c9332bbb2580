use multisplit::Float;

use super::SplitQuality;

impl SplitQuality {
    /// Impurity of a subset, given the number of samples of every class in it
    ///
    /// An empty subset has zero impurity.
    pub fn impurity<F: Float>(&self, class_counts: &[usize]) -> F {
        match self {
            SplitQuality::Gini => gini_impurity(class_counts),
            SplitQuality::Entropy => entropy(class_counts),
        }
    }
}

/// Given the class frequencies calculates the gini impurity of the subset.
fn gini_impurity<F: Float>(class_counts: &[usize]) -> F {
    let n_samples = class_counts.iter().sum::<usize>();
    if n_samples == 0 {
        return F::zero();
    }

    class_counts
        .iter()
        .map(|&x| F::cast(x) / F::cast(n_samples))
        .map(|p| p * (F::one() - p))
        .sum()
}

/// Given the class frequencies calculates the entropy of the subset.
fn entropy<F: Float>(class_counts: &[usize]) -> F {
    let n_samples = class_counts.iter().sum::<usize>();
    if n_samples == 0 {
        return F::zero();
    }

    class_counts
        .iter()
        .filter(|&&x| x > 0)
        .map(|&x| F::cast(x) / F::cast(n_samples))
        .map(|p| -p * p.log2())
        .sum()
}

/// Impurity of the parent minus the impurity of the children, weighted by their share of the
/// parent's samples
///
/// Samples may be counted in more than one child.
pub(crate) fn information_gain<F: Float>(
    quality: SplitQuality,
    parent: &[usize],
    children: &[Vec<usize>],
) -> F {
    let n_samples = F::cast(parent.iter().sum::<usize>());

    let weighted = children
        .iter()
        .map(|child| {
            let share = F::cast(child.iter().sum::<usize>()) / n_samples;
            share * quality.impurity::<F>(child)
        })
        .sum::<F>();

    quality.impurity::<F>(parent) - weighted
}
