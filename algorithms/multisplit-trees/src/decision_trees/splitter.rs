//! Split evaluation for the three feature kinds and selection of the best split of a node
//!
use std::cmp::Ordering;

use multisplit::Float;
use ndarray::ArrayView1;

use super::impurity::information_gain;
use super::partitions::SetPartitions;
use super::{Branch, MultiSplitTreeValidParams, SplitQuality};

/// RowMask tracks observations
///
/// A split sends every observation of its parent to one or more children. Each child only sees
/// the observations marked in its mask. Observations with a missing value on the split feature
/// are marked in every child.
#[derive(Debug, Clone)]
pub(crate) struct RowMask {
    pub mask: Vec<bool>,
    pub nsamples: usize,
}

impl RowMask {
    /// Generates a RowMask without hidden observations
    pub fn all(nsamples: usize) -> Self {
        RowMask {
            mask: vec![true; nsamples],
            nsamples,
        }
    }

    /// Generates a RowMask where all observations are hidden
    pub fn none(nsamples: usize) -> Self {
        RowMask {
            mask: vec![false; nsamples],
            nsamples: 0,
        }
    }

    /// Sets the observation at the specified index as visible
    ///
    /// ### Panics
    ///
    /// If `idx` is out of bounds
    pub fn mark(&mut self, idx: usize) {
        if !self.mask[idx] {
            self.mask[idx] = true;
            self.nsamples += 1;
        }
    }

    /// Indices of the visible observations
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.mask
            .iter()
            .enumerate()
            .filter(|(_, visible)| **visible)
            .map(|(idx, _)| idx)
    }
}

/// Training column prepared for split search
///
/// Tokens are replaced by their position in the vocabulary of the feature.
#[derive(Debug)]
pub(crate) enum EncodedColumn<'a, F> {
    Categorical {
        codes: Vec<Option<usize>>,
        vocabulary: &'a [String],
    },
    Ordinal {
        codes: Vec<Option<usize>>,
        vocabulary: &'a [String],
    },
    Numerical(ArrayView1<'a, F>),
}

/// The split chosen for a node
#[derive(Debug)]
pub(crate) struct Split<F> {
    pub feature: usize,
    pub gain: F,
    pub branches: Vec<Branch<F>>,
    pub masks: Vec<RowMask>,
}

/// Class counts of every vocabulary position, and of the missing values
struct ValueCounts {
    values: Vec<Vec<usize>>,
    missing: Vec<usize>,
}

pub(crate) struct Splitter<'a, F> {
    columns: Vec<EncodedColumn<'a, F>>,
    targets: &'a [usize],
    nclasses: usize,
    quality: SplitQuality,
    min_samples_leaf: usize,
    min_impurity_decrease: F,
    max_children: Option<usize>,
}

impl<'a, F: Float> Splitter<'a, F> {
    /// Creates a splitter over `columns`, where `targets` holds the class index of every row
    pub fn new<L>(
        columns: Vec<EncodedColumn<'a, F>>,
        targets: &'a [usize],
        nclasses: usize,
        params: &MultiSplitTreeValidParams<F, L>,
    ) -> Self {
        Splitter {
            columns,
            targets,
            nclasses,
            quality: params.split_quality(),
            min_samples_leaf: params.min_samples_leaf(),
            min_impurity_decrease: params.min_impurity_decrease(),
            max_children: params.max_children(),
        }
    }

    pub fn nsamples(&self) -> usize {
        self.targets.len()
    }

    pub fn quality(&self) -> SplitQuality {
        self.quality
    }

    /// Number of observations of every class in `mask`
    pub fn class_counts(&self, mask: &RowMask) -> Vec<usize> {
        let mut counts = vec![0; self.nclasses];
        for idx in mask.iter() {
            counts[self.targets[idx]] += 1;
        }

        counts
    }

    /// Finds the best split of the observations in `mask` over the `eligible` features
    ///
    /// A feature replaces the current best one only if its gain reaches the minimum impurity
    /// decrease and is strictly greater, so ties keep the earlier feature.
    pub fn best_split(
        &self,
        mask: &RowMask,
        parent: &[usize],
        eligible: &[usize],
    ) -> Option<Split<F>> {
        let mut best: Option<Split<F>> = None;

        for &feature in eligible {
            let candidate = match &self.columns[feature] {
                EncodedColumn::Categorical { codes, vocabulary } => {
                    self.best_partition(feature, codes, vocabulary, mask, parent)
                }
                EncodedColumn::Ordinal { codes, vocabulary } => {
                    self.best_cut(feature, codes, vocabulary, mask, parent)
                }
                EncodedColumn::Numerical(values) => {
                    self.best_threshold(feature, values, mask, parent)
                }
            };

            if let Some(candidate) = candidate {
                let incumbent = best.as_ref().map_or_else(F::zero, |x| x.gain);
                if candidate.gain >= self.min_impurity_decrease && candidate.gain > incumbent {
                    best = Some(candidate);
                }
            }
        }

        best
    }

    /// Exhaustive search over the set partitions of the values present in `mask`
    ///
    /// Partitions are ranked by gain, then by fewer children, then by enumeration order.
    fn best_partition(
        &self,
        feature: usize,
        codes: &[Option<usize>],
        vocabulary: &[String],
        mask: &RowMask,
        parent: &[usize],
    ) -> Option<Split<F>> {
        let counts = self.value_counts(codes, vocabulary.len(), mask);
        let present = (0..vocabulary.len())
            .filter(|&code| counts.values[code].iter().any(|&n| n > 0))
            .collect::<Vec<_>>();

        if present.len() < 2 {
            return None;
        }

        let mut best: Option<(F, Vec<Vec<usize>>)> = None;
        for partition in SetPartitions::new(present.len(), self.max_children) {
            if partition.len() < 2 {
                continue;
            }

            let groups = partition
                .into_iter()
                .map(|block| block.into_iter().map(|i| present[i]).collect())
                .collect::<Vec<Vec<usize>>>();

            let children = match self.group_counts(&counts, &groups) {
                Some(children) => children,
                None => continue,
            };
            let gain = information_gain(self.quality, parent, &children);

            let improves = match &best {
                None => gain > F::zero(),
                Some((best_gain, best_groups)) => {
                    gain > *best_gain || (gain == *best_gain && groups.len() < best_groups.len())
                }
            };
            if improves {
                best = Some((gain, groups));
            }
        }

        best.map(|(gain, groups)| {
            self.split_by_groups(feature, gain, codes, vocabulary, groups, mask)
        })
    }

    /// Search over the cuts of the ranked vocabulary into a lower and an upper part
    fn best_cut(
        &self,
        feature: usize,
        codes: &[Option<usize>],
        vocabulary: &[String],
        mask: &RowMask,
        parent: &[usize],
    ) -> Option<Split<F>> {
        let nvalues = vocabulary.len();
        let counts = self.value_counts(codes, nvalues, mask);

        let mut best: Option<(F, Vec<Vec<usize>>)> = None;
        for cut in 1..nvalues {
            let groups = vec![(0..cut).collect(), (cut..nvalues).collect()];

            let children = match self.group_counts(&counts, &groups) {
                Some(children) => children,
                None => continue,
            };
            let gain = information_gain(self.quality, parent, &children);

            if gain > best.as_ref().map_or_else(F::zero, |x| x.0) {
                best = Some((gain, groups));
            }
        }

        best.map(|(gain, groups)| {
            self.split_by_groups(feature, gain, codes, vocabulary, groups, mask)
        })
    }

    /// Search over the midpoints between consecutive distinct values present in `mask`
    fn best_threshold(
        &self,
        feature: usize,
        values: &ArrayView1<F>,
        mask: &RowMask,
        parent: &[usize],
    ) -> Option<Split<F>> {
        let mut missing = vec![0; self.nclasses];
        let mut present = Vec::with_capacity(mask.nsamples);
        for idx in mask.iter() {
            if values[idx].is_nan() {
                missing[self.targets[idx]] += 1;
            } else {
                present.push((values[idx], self.targets[idx]));
            }
        }
        present.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

        // We start with all observations in the upper child and move them one by one to the
        // lower child. Missing observations stay in both.
        let mut lower = missing.clone();
        let mut upper = missing;
        for &(_, class) in &present {
            upper[class] += 1;
        }

        let mut best: Option<(F, F)> = None;
        for pair in present.windows(2) {
            let (value, class) = pair[0];
            let next = pair[1].0;

            lower[class] += 1;
            upper[class] -= 1;

            // equal values end up in the same child
            if next <= value {
                continue;
            }

            let children = vec![lower.clone(), upper.clone()];
            if !self.admissible(&children) {
                continue;
            }
            let gain = information_gain(self.quality, parent, &children);

            if gain > best.map_or_else(F::zero, |x| x.0) {
                best = Some((gain, midpoint(value, next)));
            }
        }

        best.map(|(gain, threshold)| {
            let mut masks = vec![RowMask::none(self.nsamples()); 2];
            for idx in mask.iter() {
                let value = values[idx];
                if value.is_nan() {
                    masks.iter_mut().for_each(|x| x.mark(idx));
                } else if value <= threshold {
                    masks[0].mark(idx);
                } else {
                    masks[1].mark(idx);
                }
            }

            Split {
                feature,
                gain,
                branches: vec![Branch::LessEqual(threshold), Branch::Greater(threshold)],
                masks,
            }
        })
    }

    fn value_counts(
        &self,
        codes: &[Option<usize>],
        nvalues: usize,
        mask: &RowMask,
    ) -> ValueCounts {
        let mut counts = ValueCounts {
            values: vec![vec![0; self.nclasses]; nvalues],
            missing: vec![0; self.nclasses],
        };

        for idx in mask.iter() {
            let class = self.targets[idx];
            match codes[idx] {
                Some(code) => counts.values[code][class] += 1,
                None => counts.missing[class] += 1,
            }
        }

        counts
    }

    /// Class counts of the children formed by `groups` of vocabulary positions, or `None` if a
    /// child would be too small
    fn group_counts(
        &self,
        counts: &ValueCounts,
        groups: &[Vec<usize>],
    ) -> Option<Vec<Vec<usize>>> {
        let children = groups
            .iter()
            .map(|group| {
                let mut child = counts.missing.clone();
                for &code in group {
                    for (total, n) in child.iter_mut().zip(&counts.values[code]) {
                        *total += n;
                    }
                }
                child
            })
            .collect::<Vec<_>>();

        if self.admissible(&children) {
            Some(children)
        } else {
            None
        }
    }

    fn admissible(&self, children: &[Vec<usize>]) -> bool {
        children
            .iter()
            .all(|child| child.iter().sum::<usize>() >= self.min_samples_leaf)
    }

    fn split_by_groups(
        &self,
        feature: usize,
        gain: F,
        codes: &[Option<usize>],
        vocabulary: &[String],
        groups: Vec<Vec<usize>>,
        mask: &RowMask,
    ) -> Split<F> {
        let mut child_of = vec![None; vocabulary.len()];
        for (child, group) in groups.iter().enumerate() {
            for &code in group {
                child_of[code] = Some(child);
            }
        }

        let mut masks = vec![RowMask::none(self.nsamples()); groups.len()];
        for idx in mask.iter() {
            match codes[idx] {
                None => masks.iter_mut().for_each(|x| x.mark(idx)),
                Some(code) => {
                    if let Some(child) = child_of[code] {
                        masks[child].mark(idx);
                    }
                }
            }
        }

        let branches = groups
            .into_iter()
            .map(|group| {
                let values = group.into_iter().map(|code| vocabulary[code].clone());
                Branch::Values(values.collect())
            })
            .collect();

        Split {
            feature,
            gain,
            branches,
            masks,
        }
    }
}

/// Midpoint of two consecutive values `a < b`
///
/// Falls back to `a` when the midpoint is not representable strictly below `b`, so that `b` is
/// never routed to the lower child.
fn midpoint<F: Float>(a: F, b: F) -> F {
    let mid = (a + b) / F::cast(2.0);
    if mid < b {
        mid
    } else {
        a
    }
}
