use std::fs::File;
use std::io::Write;

use multisplit::prelude::*;
use multisplit_trees::{MultiSplitTree, Result, SplitQuality};
use ndarray::array;

fn main() -> Result<()> {
    // Whether to play outside, given the weather of the day
    let table = Table::default()
        .with_tokens(
            "outlook",
            vec![
                Some("sunny"),
                Some("sunny"),
                Some("overcast"),
                Some("rain"),
                Some("rain"),
                Some("rain"),
                Some("overcast"),
                Some("sunny"),
                Some("sunny"),
                Some("rain"),
                None,
                Some("overcast"),
                Some("overcast"),
                Some("rain"),
            ],
        )?
        .with_numerical(
            "temperature",
            array![85., 80., 83., 70., 68., 65., 64., 72., 69., 75., 75., 72., 81., 71.],
        )?
        .with_tokens(
            "humidity",
            vec![
                Some("high"),
                Some("high"),
                Some("high"),
                Some("high"),
                Some("normal"),
                Some("normal"),
                Some("normal"),
                Some("high"),
                Some("normal"),
                Some("normal"),
                Some("normal"),
                Some("high"),
                Some("normal"),
                Some("high"),
            ],
        )?
        .with_tokens(
            "wind",
            vec![
                Some("weak"),
                Some("strong"),
                Some("weak"),
                Some("weak"),
                Some("weak"),
                Some("strong"),
                Some("strong"),
                Some("weak"),
                Some("weak"),
                Some("weak"),
                Some("strong"),
                Some("strong"),
                Some("weak"),
                Some("strong"),
            ],
        )?;
    let targets = array![
        "no", "no", "yes", "yes", "yes", "no", "yes", "no", "yes", "yes", "yes", "yes", "yes",
        "no"
    ];
    let dataset = Dataset::new(table, targets);

    println!("Training model with the entropy criterion ...");
    let model = MultiSplitTree::params()
        .split_quality(SplitQuality::Entropy)
        .categorical("outlook", ["sunny", "overcast", "rain"])
        .numerical("temperature")
        .ordinal("humidity", ["normal", "high"])
        .ordinal("wind", ["weak", "strong"])
        .fit(&dataset)?;

    println!("Training accuracy: {:.2}%", 100.0 * model.score(&dataset)?);
    println!("Nodes: {}, leaves: {}", model.num_nodes(), model.num_leaves());
    for (name, importance) in model.feature_names().iter().zip(model.feature_importance()) {
        println!("  {:<12} {:.3}", name, importance);
    }

    let mut dot = File::create("decision_tree.dot").expect("can't create file");
    dot.write_all(
        model
            .export_to_graphviz()
            .rounded(true)
            .show_distribution(false)
            .to_string()
            .as_bytes(),
    )
    .expect("can't write file");
    println!(" => generate the tree with `dot -Tpng decision_tree.dot -o tree.png`");

    Ok(())
}
