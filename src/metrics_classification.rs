//! Common metrics for performance evaluation of classifier
//!
//! Scoring is essential for classification tasks. This module implements a confusion matrix,
//! from which the accuracy is derived.
use std::collections::{BTreeSet, HashMap};

use ndarray::prelude::*;
use ndarray::Data;

use crate::dataset::{Dataset, Float, Label};
use crate::error::{Error, Result};

/// Return tuple of class index for each element of prediction and ground_truth
fn map_prediction_to_idx<A: Label>(
    prediction: impl Iterator<Item = A>,
    ground_truth: impl Iterator<Item = A>,
    classes: &[A],
) -> Vec<Option<(usize, usize)>> {
    // create a map from class label to index
    let set = classes
        .iter()
        .enumerate()
        .map(|(a, b)| (b, a))
        .collect::<HashMap<_, usize>>();

    // indices for every prediction
    ground_truth
        .zip(prediction)
        .map(|(a, b)| set.get(&a).and_then(|x| set.get(&b).map(|y| (*x, *y))))
        .collect::<Vec<Option<_>>>()
}

/// Confusion matrix for multi-label evaluation
///
/// A confusion matrix shows predictions in a matrix, where rows correspond to target and columns
/// to predicted. The diagonal entries are correct predictions.
#[derive(Clone, Debug, PartialEq)]
pub struct ConfusionMatrix<A> {
    matrix: Array2<usize>,
    members: Array1<A>,
}

impl<A> ConfusionMatrix<A> {
    /// Return mean accuracy
    pub fn accuracy(&self) -> f32 {
        self.matrix.diag().sum() as f32 / self.matrix.sum() as f32
    }

    /// The classes in the order of the rows and columns
    pub fn members(&self) -> ArrayView1<'_, A> {
        self.members.view()
    }

    /// The raw counts, indexed by `(target, prediction)`
    pub fn counts(&self) -> ArrayView2<'_, usize> {
        self.matrix.view()
    }
}

/// Classification functions
///
/// Contains only routine for Confusion Matrix, as all other current metrics can be derived from
/// the entries in the matrix.
pub trait ToConfusionMatrix<A, T> {
    fn confusion_matrix(&self, ground_truth: T) -> Result<ConfusionMatrix<A>>;
}

impl<L: Label + Ord, S: Data<Elem = L>, T: Data<Elem = L>> ToConfusionMatrix<L, &ArrayBase<T, Ix1>>
    for ArrayBase<S, Ix1>
{
    fn confusion_matrix(&self, ground_truth: &ArrayBase<T, Ix1>) -> Result<ConfusionMatrix<L>> {
        if self.len() != ground_truth.len() {
            return Err(Error::MismatchedShapes(self.len(), ground_truth.len()));
        }

        let classes = ground_truth
            .iter()
            .chain(self.iter())
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        // find indices to labels
        let indices = map_prediction_to_idx(
            self.iter().cloned(),
            ground_truth.iter().cloned(),
            &classes,
        );

        // count each index tuple in the confusion matrix
        let mut confusion_matrix = Array2::zeros((classes.len(), classes.len()));
        for (i1, i2) in indices.into_iter().flatten() {
            confusion_matrix[(i1, i2)] += 1;
        }

        Ok(ConfusionMatrix {
            matrix: confusion_matrix,
            members: Array1::from(classes),
        })
    }
}

impl<F: Float, L: Label + Ord, S: Data<Elem = L>> ToConfusionMatrix<L, &Dataset<F, L>>
    for ArrayBase<S, Ix1>
{
    fn confusion_matrix(&self, ground_truth: &Dataset<F, L>) -> Result<ConfusionMatrix<L>> {
        self.confusion_matrix(ground_truth.targets())
    }
}

#[cfg(test)]
mod tests {
    use super::ToConfusionMatrix;
    use crate::dataset::{Dataset, Table};
    use crate::error::{Error, Result};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, ArrayView1};

    #[test]
    fn test_confusion_matrix() -> Result<()> {
        let predicted = ArrayView1::from(&[0usize, 1, 0, 1, 0, 1]);
        let ground_truth = ArrayView1::from(&[1usize, 1, 0, 1, 0, 1]);

        let cm = predicted.confusion_matrix(&ground_truth)?;

        assert_eq!(cm.counts(), array![[2usize, 0], [1, 3]]);
        assert_eq!(cm.members(), array![0usize, 1]);

        Ok(())
    }

    #[test]
    fn test_cm_accuracy() -> Result<()> {
        let predicted = array!["neg", "pos", "neg", "pos", "neg", "pos"];
        let ground_truth = array!["pos", "pos", "neg", "pos", "neg", "pos"];

        let x = predicted.confusion_matrix(&ground_truth)?;

        assert_abs_diff_eq!(x.accuracy(), 5.0 / 6.0);
        assert_eq!(x.members(), array!["neg", "pos"]);

        Ok(())
    }

    #[test]
    fn against_dataset() -> Result<()> {
        let table = Table::default().with_numerical("x", array![1., 2., 3.])?;
        let dataset = Dataset::new(table, array![true, false, true]);

        let cm = array![true, true, true].confusion_matrix(&dataset)?;
        assert_abs_diff_eq!(cm.accuracy(), 2.0 / 3.0);

        assert_eq!(
            array![true].confusion_matrix(&dataset).map(|x| x.accuracy()),
            Err(Error::MismatchedShapes(1, 3))
        );

        Ok(())
    }
}
