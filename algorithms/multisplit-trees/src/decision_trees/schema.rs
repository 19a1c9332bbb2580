use std::collections::{HashMap, HashSet};

use multisplit::dataset::{Column, Table};
use multisplit::Float;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use super::splitter::EncodedColumn;
use crate::error::{Result, TreeError};

/// Declared kind of a feature
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    /// Unordered tokens, the allowed values are kept sorted
    Categorical(Vec<String>),
    /// Ranked tokens, the position of a value is its rank
    Ordinal(Vec<String>),
    Numerical,
}

impl FeatureKind {
    /// Allowed values of categorical and ordinal features
    pub fn vocabulary(&self) -> Option<&[String]> {
        match self {
            FeatureKind::Categorical(values) | FeatureKind::Ordinal(values) => Some(values),
            FeatureKind::Numerical => None,
        }
    }

    pub fn is_numerical(&self) -> bool {
        matches!(self, FeatureKind::Numerical)
    }

    pub(crate) fn describe(&self) -> &'static str {
        match self {
            FeatureKind::Categorical(_) => "categorical",
            FeatureKind::Ordinal(_) => "ordinal",
            FeatureKind::Numerical => "numerical",
        }
    }

    pub(crate) fn accepts<F: Float>(&self, column: &Column<F>) -> bool {
        self.is_numerical() == column.is_numerical()
    }
}

/// Checks the feature declarations and the hierarchy for consistency
pub(crate) fn check_declarations(
    features: &[(String, FeatureKind)],
    hierarchy: &[(String, Vec<String>)],
) -> Result<()> {
    if features.is_empty() {
        return Err(TreeError::NoFeatures);
    }

    let mut declared = HashSet::new();
    for (name, kind) in features {
        if !declared.insert(name.as_str()) {
            return Err(TreeError::DuplicateFeature(name.clone()));
        }

        if let FeatureKind::Ordinal(values) = kind {
            let mut seen = HashSet::new();
            if let Some(token) = values.iter().find(|x| !seen.insert(x.as_str())) {
                return Err(TreeError::DuplicateToken {
                    feature: name.clone(),
                    token: token.clone(),
                });
            }
        }
    }

    let mut gated_by: HashMap<&str, &str> = HashMap::new();
    for (gating, gated) in hierarchy {
        if !declared.contains(gating.as_str()) {
            return Err(TreeError::UnknownHierarchyFeature(gating.clone()));
        }

        for feature in gated {
            if !declared.contains(feature.as_str()) {
                return Err(TreeError::UnknownHierarchyFeature(feature.clone()));
            }
            if feature == gating {
                return Err(TreeError::SelfGating(feature.clone()));
            }
            match gated_by.insert(feature, gating) {
                Some(first) if first != gating.as_str() => {
                    return Err(TreeError::ConflictingGates {
                        feature: feature.clone(),
                        first: first.to_string(),
                        second: gating.clone(),
                    })
                }
                _ => {}
            }
        }
    }

    Ok(())
}

/// Matches the columns of a training table against the declarations
///
/// Returns the kind of every column, in column order.
pub(crate) fn resolve<F: Float>(
    table: &Table<F>,
    features: &[(String, FeatureKind)],
) -> Result<Vec<FeatureKind>> {
    if let Some((name, _)) = features
        .iter()
        .find(|(name, _)| table.column_index(name).is_none())
    {
        return Err(TreeError::MissingColumn(name.clone()));
    }

    table
        .column_names()
        .iter()
        .map(|name| {
            let kind = features
                .iter()
                .find(|(declared, _)| declared == name)
                .map(|(_, kind)| kind)
                .ok_or_else(|| TreeError::UndeclaredColumn(name.clone()))?;

            match table.column(name) {
                Some(column) if kind.accepts(column) => Ok(kind.clone()),
                _ => Err(TreeError::ColumnKind {
                    feature: name.clone(),
                    expected: kind.describe(),
                }),
            }
        })
        .collect()
}

/// Replaces the tokens of every categorical and ordinal column with their position in the
/// vocabulary
pub(crate) fn encode<'a, F: Float>(
    table: &'a Table<F>,
    kinds: &'a [FeatureKind],
) -> Result<Vec<EncodedColumn<'a, F>>> {
    table
        .column_names()
        .iter()
        .zip(kinds)
        .enumerate()
        .map(|(idx, (name, kind))| match (table.column_at(idx), kind) {
            (Column::Numerical(values), FeatureKind::Numerical) => {
                Ok(EncodedColumn::Numerical(values.view()))
            }
            (Column::Tokens(tokens), FeatureKind::Categorical(vocabulary)) => {
                Ok(EncodedColumn::Categorical {
                    codes: encode_tokens(name, tokens.iter(), vocabulary)?,
                    vocabulary,
                })
            }
            (Column::Tokens(tokens), FeatureKind::Ordinal(vocabulary)) => {
                Ok(EncodedColumn::Ordinal {
                    codes: encode_tokens(name, tokens.iter(), vocabulary)?,
                    vocabulary,
                })
            }
            _ => Err(TreeError::ColumnKind {
                feature: name.clone(),
                expected: kind.describe(),
            }),
        })
        .collect()
}

fn encode_tokens<'a>(
    feature: &str,
    tokens: impl Iterator<Item = &'a Option<String>>,
    vocabulary: &[String],
) -> Result<Vec<Option<usize>>> {
    let positions = vocabulary
        .iter()
        .enumerate()
        .map(|(code, token)| (token.as_str(), code))
        .collect::<HashMap<_, _>>();

    tokens
        .map(|token| match token {
            None => Ok(None),
            Some(token) => positions
                .get(token.as_str())
                .map(|code| Some(*code))
                .ok_or_else(|| TreeError::UnknownToken {
                    feature: feature.to_string(),
                    token: token.clone(),
                }),
        })
        .collect()
}

/// Translates the hierarchy into positions of `names`
pub(crate) fn unlocks(
    names: &[String],
    hierarchy: &[(String, Vec<String>)],
) -> Vec<(usize, Vec<usize>)> {
    let position = |name: &String| names.iter().position(|x| x == name);

    hierarchy
        .iter()
        .filter_map(|(gating, gated)| {
            let gated = gated.iter().filter_map(position).collect();
            position(gating).map(|gating| (gating, gated))
        })
        .collect()
}

/// Features which are not unlocked by any other feature, in column order
pub(crate) fn initially_eligible(nfeatures: usize, unlocks: &[(usize, Vec<usize>)]) -> Vec<usize> {
    (0..nfeatures)
        .filter(|idx| !unlocks.iter().any(|(_, gated)| gated.contains(idx)))
        .collect()
}

/// Matches the columns of a table at prediction time against the fitted features
///
/// Returns the columns in the order of `names`.
pub(crate) fn match_columns<'a, F: Float>(
    names: &[String],
    kinds: &[FeatureKind],
    table: &'a Table<F>,
) -> Result<Vec<&'a Column<F>>> {
    let unexpected = table
        .column_names()
        .iter()
        .filter(|name| !names.contains(name))
        .cloned()
        .collect::<Vec<_>>();
    let missing = names
        .iter()
        .filter(|name| table.column_index(name).is_none())
        .cloned()
        .collect::<Vec<_>>();

    if !unexpected.is_empty() || !missing.is_empty() {
        return Err(TreeError::FeatureMismatch {
            unexpected,
            missing,
        });
    }

    names
        .iter()
        .zip(kinds)
        .map(|(name, kind)| match table.column(name) {
            Some(column) if kind.accepts(column) => Ok(column),
            _ => Err(TreeError::ColumnKind {
                feature: name.clone(),
                expected: kind.describe(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn declarations() -> Vec<(String, FeatureKind)> {
        vec![
            (
                "colour".into(),
                FeatureKind::Categorical(vec!["blue".into(), "red".into()]),
            ),
            (
                "size".into(),
                FeatureKind::Ordinal(vec!["S".into(), "M".into(), "L".into()]),
            ),
            ("weight".into(), FeatureKind::Numerical),
        ]
    }

    fn table() -> Table<f64> {
        Table::default()
            .with_numerical("weight", array![1.0, f64::NAN, 3.0])
            .and_then(|t| t.with_tokens("colour", vec![Some("red"), None, Some("blue")]))
            .and_then(|t| t.with_tokens("size", vec![Some("L"), Some("S"), None]))
            .unwrap()
    }

    #[test]
    fn rejects_malformed_declarations() {
        assert_eq!(check_declarations(&[], &[]), Err(TreeError::NoFeatures));

        let mut twice = declarations();
        twice.push(("colour".into(), FeatureKind::Numerical));
        assert_eq!(
            check_declarations(&twice, &[]),
            Err(TreeError::DuplicateFeature("colour".into()))
        );

        let repeated = vec![(
            "size".to_string(),
            FeatureKind::Ordinal(vec!["S".into(), "M".into(), "S".into()]),
        )];
        assert_eq!(
            check_declarations(&repeated, &[]),
            Err(TreeError::DuplicateToken {
                feature: "size".into(),
                token: "S".into()
            })
        );
    }

    #[test]
    fn rejects_malformed_hierarchy() {
        let features = declarations();

        let unknown = vec![("colour".to_string(), vec!["shape".to_string()])];
        assert_eq!(
            check_declarations(&features, &unknown),
            Err(TreeError::UnknownHierarchyFeature("shape".into()))
        );

        let itself = vec![("colour".to_string(), vec!["colour".to_string()])];
        assert_eq!(
            check_declarations(&features, &itself),
            Err(TreeError::SelfGating("colour".into()))
        );

        let twice = vec![
            ("colour".to_string(), vec!["weight".to_string()]),
            ("size".to_string(), vec!["weight".to_string()]),
        ];
        assert_eq!(
            check_declarations(&features, &twice),
            Err(TreeError::ConflictingGates {
                feature: "weight".into(),
                first: "colour".into(),
                second: "size".into()
            })
        );
    }

    #[test]
    fn resolves_kinds_in_column_order() -> Result<()> {
        let kinds = resolve(&table(), &declarations())?;

        assert_eq!(kinds[0], FeatureKind::Numerical);
        assert_eq!(kinds[1].describe(), "categorical");
        assert_eq!(kinds[2].vocabulary().map(|x| x.len()), Some(3));

        Ok(())
    }

    #[test]
    fn rejects_schema_violations() {
        let mut features = declarations();
        features.push(("shape".into(), FeatureKind::Numerical));
        assert_eq!(
            resolve(&table(), &features),
            Err(TreeError::MissingColumn("shape".into()))
        );

        let features = declarations()[..2].to_vec();
        assert_eq!(
            resolve(&table(), &features),
            Err(TreeError::UndeclaredColumn("weight".into()))
        );

        let mut features = declarations();
        features[2].1 = FeatureKind::Categorical(vec![]);
        assert_eq!(
            resolve(&table(), &features),
            Err(TreeError::ColumnKind {
                feature: "weight".into(),
                expected: "categorical"
            })
        );
    }

    #[test]
    fn encodes_tokens_by_vocabulary_position() -> Result<()> {
        let table = table();
        let kinds = resolve(&table, &declarations())?;
        let columns = encode(&table, &kinds)?;

        match &columns[2] {
            EncodedColumn::Ordinal { codes, .. } => {
                assert_eq!(codes, &vec![Some(2), Some(0), None])
            }
            _ => panic!("expected an ordinal column"),
        }

        let mut features = declarations();
        features[0].1 = FeatureKind::Categorical(vec!["red".into()]);
        let kinds = resolve(&table, &features)?;
        assert!(matches!(
            encode(&table, &kinds),
            Err(TreeError::UnknownToken { token, .. }) if token == "blue"
        ));

        Ok(())
    }

    #[test]
    fn gated_features_start_ineligible() {
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let hierarchy = vec![("c".to_string(), vec!["a".to_string()])];

        let unlocks = unlocks(&names, &hierarchy);
        assert_eq!(unlocks, vec![(2, vec![0])]);
        assert_eq!(initially_eligible(3, &unlocks), vec![1, 2]);
    }

    #[test]
    fn reports_both_sides_of_a_mismatch() {
        let names = vec!["weight".to_string(), "colour".to_string(), "age".to_string()];
        let kinds = vec![
            FeatureKind::Numerical,
            FeatureKind::Categorical(vec![]),
            FeatureKind::Numerical,
        ];

        assert_eq!(
            match_columns(&names, &kinds, &table()).map(|x| x.len()),
            Err(TreeError::FeatureMismatch {
                unexpected: vec!["size".into()],
                missing: vec!["age".into()]
            })
        );
    }
}
