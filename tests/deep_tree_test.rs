//! Very deep trees: export, import, rendering input and batched building.
//!
//! No tracing subscriber is installed here; per-node trace spans would
//! dominate the run time.

use rstest::rstest;

use featmodel::domain::{
    CounterFactory, FeatureModel, FeatureOutline, FeatureTreeMutator, GroupType, Identifier, ModelResult,
    RawMutator,
};

const LEVELS: usize = 50_000;

/// Chain of `levels` features with identifiers 2..=levels+1, root first.
fn chain_outline(levels: u64) -> FeatureOutline {
    let mut outline = FeatureOutline::new(GroupType::And).with_identifier(Identifier::Counter(levels + 1));
    for id in (2..=levels).rev() {
        outline = FeatureOutline::new(GroupType::Or)
            .with_identifier(Identifier::Counter(id))
            .with_child(outline);
    }
    outline
}

#[rstest]
fn given_deep_outline_when_imported_and_exported_then_round_trips() {
    let outline = chain_outline(LEVELS as u64);
    assert_eq!(outline.feature_count(), LEVELS);

    let model = FeatureModel::from_outline(Box::new(CounterFactory::new()), &outline).unwrap();

    assert_eq!(model.feature_count(), LEVELS);
    assert_eq!(model.tree().depth(), LEVELS);
    assert_eq!(model.feature_cache().len(), LEVELS);
    assert_eq!(model.outline(), outline);
}

#[rstest]
fn given_deep_chain_built_untracked_when_exported_then_reimports_equal() {
    let mut model = FeatureModel::new(CounterFactory::new());
    let root = *model.root_feature().identifier();

    let deepest = model
        .run_internally(|model| -> ModelResult<Identifier> {
            let mut raw = RawMutator::new(model);
            let mut parent = root;
            for _ in 1..LEVELS {
                parent = raw.create_feature_below(&parent)?;
            }
            assert_eq!(raw.model().feature_cache().len(), 1);
            Ok(parent)
        })
        .unwrap();

    assert_eq!(model.feature_cache().len(), LEVELS);
    assert!(model.has_feature(&deepest));
    assert_eq!(model.tree().depth(), LEVELS);

    let outline = model.outline();
    let imported = FeatureModel::from_outline(Box::new(CounterFactory::starting_at(1_000_000)), &outline).unwrap();
    assert_eq!(imported.outline(), outline);
    assert_eq!(imported.identifier(), &Identifier::Counter(1_000_000));
}

#[rstest]
fn given_deep_outlines_when_compared_then_difference_at_bottom_is_found() {
    let left = chain_outline(LEVELS as u64);
    let right = chain_outline(LEVELS as u64);
    assert_eq!(left, right);

    let longer = chain_outline(LEVELS as u64 + 1);
    assert_ne!(left, longer);
}
