//! Integration tests for the mutation gate: tracked and untracked edits and
//! how the identifier cache follows them.

use rstest::{fixture, rstest};

use featmodel::domain::{
    CounterFactory, ErrorKind, Feature, FeatureModel, FeatureTreeMutator, GroupType, Identifier,
    ModelError, ModelResult, RawMutator,
};
use featmodel::util::testing;

#[fixture]
fn model() -> FeatureModel {
    testing::init_test_setup();
    FeatureModel::new(CounterFactory::new())
}

fn root_of(model: &FeatureModel) -> Identifier {
    *model.root_feature().identifier()
}

fn child_ids(model: &FeatureModel, parent: &Identifier) -> Vec<Identifier> {
    let node = model.node_of(parent).expect("parent in model");
    model
        .tree()
        .children(node)
        .iter()
        .map(|&child| *model.tree().feature(child).unwrap().identifier())
        .collect()
}

fn group_of(model: &FeatureModel, feature: &Identifier) -> GroupType {
    let node = model.node_of(feature).unwrap();
    model.tree().group(node).unwrap()
}

// ============================================================
// Cache tracking
// ============================================================

#[rstest]
fn given_tracked_and_untracked_edits_when_reconciling_then_cache_catches_up(mut model: FeatureModel) {
    let root = root_of(&model);
    assert_eq!(model.feature_cache().len(), 1);

    let f1 = model.mutator().create_feature_below(&root).unwrap();
    assert_eq!(model.feature_cache().len(), 2);

    let f2 = model.mutator().create_feature_below(&root).unwrap();
    assert_eq!(model.feature_cache().len(), 3);

    let f3 = RawMutator::new(&mut model).create_feature_below(&root).unwrap();
    assert_eq!(model.feature_cache().len(), 3);
    assert!(!model.feature_cache().is_current(model.tree()));
    // reads still see the tree
    assert!(model.has_feature(&f3));

    let f4 = model
        .run_internally(|model| RawMutator::new(model).create_feature_below(&root))
        .unwrap();
    assert_eq!(model.feature_cache().len(), 5);
    assert!(model.feature_cache().is_current(model.tree()));

    for id in [root, f1, f2, f3, f4] {
        assert!(model.feature_cache().lookup(&id).is_some(), "{id} not cached");
    }
}

#[rstest]
fn given_tracked_mutator_when_editing_then_cache_matches_tree_after_each_call(mut model: FeatureModel) {
    let root = root_of(&model);
    let mut mutator = model.mutator();
    let a = mutator.create_feature_below(&root).unwrap();
    let b = mutator.create_feature_below(&a).unwrap();
    mutator.create_feature_next_to(&a).unwrap();
    mutator.remove_feature(&b).unwrap();
    drop(mutator);

    assert!(model.feature_cache().is_current(model.tree()));
    assert_eq!(model.feature_cache().len(), model.feature_count());
    assert!(model.feature_cache().lookup(&b).is_none());
}

#[rstest]
fn given_mutate_closure_when_it_fails_then_cache_is_still_rebuilt(mut model: FeatureModel) {
    let root = root_of(&model);
    let result: ModelResult<()> = model.mutate(|m| {
        m.create_feature_below(&root)?;
        m.create_feature_below(&root)?;
        m.remove_feature(&root)
    });

    assert_eq!(result, Err(ModelError::RootRemoval(root)));
    assert_eq!(model.feature_cache().len(), 3);
    assert!(model.feature_cache().is_current(model.tree()));
}

#[rstest]
fn given_run_internally_when_nested_work_panics_then_cache_is_rebuilt(mut model: FeatureModel) {
    let root = root_of(&model);
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        model.run_internally(|model| {
            RawMutator::new(model).create_feature_below(&root).unwrap();
            panic!("abort work");
        })
    }));

    assert!(outcome.is_err());
    assert_eq!(model.feature_cache().len(), 2);
}

// ============================================================
// Adding
// ============================================================

#[rstest]
fn given_sibling_when_adding_next_to_then_inserted_directly_after(mut model: FeatureModel) {
    let root = root_of(&model);
    let (a, b, x) = model
        .mutate(|m| -> ModelResult<_> {
            let a = m.create_feature_below(&root)?;
            let b = m.create_feature_below(&root)?;
            let x = m.create_feature_next_to(&a)?;
            Ok((a, b, x))
        })
        .unwrap();

    assert_eq!(child_ids(&model, &root), vec![a, x, b]);
}

#[rstest]
fn given_index_when_adding_below_at_then_placed_at_index(mut model: FeatureModel) {
    let root = root_of(&model);
    let mut mutator = model.mutator();
    let a = mutator.create_feature_below(&root).unwrap();
    let b = mutator.create_feature_below(&root).unwrap();
    let first = mutator.create_feature_below_at(&root, 0).unwrap();
    drop(mutator);

    assert_eq!(child_ids(&model, &root), vec![first, a, b]);
}

#[rstest]
fn given_index_past_end_when_adding_then_fails_without_change(mut model: FeatureModel) {
    let root = root_of(&model);
    let nodes_before = model.tree().len();

    let result = model.mutator().create_feature_below_at(&root, 5);

    assert_eq!(result, Err(ModelError::IndexOutOfRange { index: 5, len: 0 }));
    assert_eq!(model.tree().len(), nodes_before);
    assert_eq!(model.feature_count(), 1);
}

#[rstest]
fn given_root_when_adding_next_to_then_fails(mut model: FeatureModel) {
    let root = root_of(&model);
    let err = model.mutator().create_feature_next_to(&root).unwrap_err();
    assert_eq!(err, ModelError::RootHasNoSiblings(root));
    assert_eq!(err.kind(), ErrorKind::InvalidOperation);
}

#[rstest]
fn given_feature_already_in_model_when_adding_again_then_fails(mut model: FeatureModel) {
    let root = root_of(&model);
    let existing = model.mutator().create_feature_below(&root).unwrap();
    let duplicate = Feature::new(existing, *model.identifier());

    let result = model.mutator().add_feature_below(duplicate, &root);

    assert_eq!(result, Err(ModelError::FeatureAlreadyPresent(existing)));
    assert_eq!(model.feature_count(), 2);
}

#[rstest]
fn given_unknown_parent_when_adding_then_not_found(mut model: FeatureModel) {
    let unknown = Identifier::Counter(999);
    let feature = model.new_feature();
    let result = model.mutator().add_feature_below(feature, &unknown);
    assert_eq!(result, Err(ModelError::FeatureNotFound(unknown)));
}

#[rstest]
fn given_added_feature_when_reading_then_points_back_to_its_node(mut model: FeatureModel) {
    let root = root_of(&model);
    let feature = model.new_feature();
    let id = *feature.identifier();
    let node = model.mutator().add_feature_below(feature, &root).unwrap();

    let stored = model.feature(&id).unwrap();
    assert_eq!(stored.node(), Some(node));
    assert_eq!(stored.model(), model.identifier());
}

// ============================================================
// Removing
// ============================================================

#[rstest]
fn given_feature_with_children_when_removed_then_children_take_its_place(mut model: FeatureModel) {
    let root = root_of(&model);
    let (a, entity, b, c, x, y) = model
        .mutate(|m| -> ModelResult<_> {
            let a = m.create_feature_below(&root)?;
            let entity = m.create_feature_below(&root)?;
            let b = m.create_feature_below(&root)?;
            let c = m.create_feature_below(&root)?;
            let x = m.create_feature_below(&entity)?;
            let y = m.create_feature_below(&entity)?;
            Ok((a, entity, b, c, x, y))
        })
        .unwrap();

    model.mutator().remove_feature(&entity).unwrap();

    assert_eq!(child_ids(&model, &root), vec![a, x, y, b, c]);
    assert!(!model.has_feature(&entity));
    let x_node = model.node_of(&x).unwrap();
    assert_eq!(model.tree().parent(x_node), model.node_of(&root));
}

#[rstest]
#[case(GroupType::And)]
#[case(GroupType::Or)]
#[case(GroupType::Alternative)]
fn given_only_child_when_removed_then_parent_takes_child_group(
    mut model: FeatureModel,
    #[case] child_group: GroupType,
) {
    let root = root_of(&model);
    let (parent, child) = model
        .mutate(|m| -> ModelResult<_> {
            let parent = m.create_feature_below(&root)?;
            m.set_group(&parent, GroupType::Or)?;
            let child = m.create_feature_below(&parent)?;
            m.set_group(&child, child_group)?;
            Ok((parent, child))
        })
        .unwrap();

    model.mutator().remove_feature(&child).unwrap();

    assert_eq!(group_of(&model, &parent), child_group);
}

#[rstest]
fn given_parent_with_two_children_when_one_removed_then_group_kept(mut model: FeatureModel) {
    let root = root_of(&model);
    let (parent, child) = model
        .mutate(|m| -> ModelResult<_> {
            let parent = m.create_feature_below(&root)?;
            m.set_group(&parent, GroupType::Alternative)?;
            let child = m.create_feature_below(&parent)?;
            m.set_group(&child, GroupType::And)?;
            m.create_feature_below(&parent)?;
            Ok((parent, child))
        })
        .unwrap();

    model.mutator().remove_feature(&child).unwrap();

    assert_eq!(group_of(&model, &parent), GroupType::Alternative);
}

#[rstest]
fn given_root_when_removing_then_fails_and_tree_unchanged(mut model: FeatureModel) {
    let root = root_of(&model);
    model.mutator().create_feature_below(&root).unwrap();

    let err = model.mutator().remove_feature(&root).unwrap_err();

    assert_eq!(err, ModelError::RootRemoval(root));
    assert_eq!(model.feature_count(), 2);
}

#[rstest]
fn given_removed_feature_when_removing_again_then_not_found(mut model: FeatureModel) {
    let root = root_of(&model);
    let feature = model.mutator().create_feature_below(&root).unwrap();
    model.mutator().remove_feature(&feature).unwrap();

    let result = model.mutator().remove_feature(&feature);
    assert_eq!(result, Err(ModelError::FeatureNotFound(feature)));
}

#[rstest]
fn given_untracked_removal_when_reading_then_feature_is_gone(mut model: FeatureModel) {
    let root = root_of(&model);
    let feature = model.mutator().create_feature_below(&root).unwrap();

    RawMutator::new(&mut model).remove_feature(&feature).unwrap();

    assert_eq!(model.feature_cache().len(), 2);
    assert!(!model.has_feature(&feature));
    assert!(model.feature(&feature).is_none());
}

#[rstest]
fn given_untracked_edits_inside_run_internally_when_looking_up_then_answers_follow_tree(mut model: FeatureModel) {
    let root = root_of(&model);
    let (a, entity, x, y) = model
        .mutate(|m| -> ModelResult<_> {
            let a = m.create_feature_below(&root)?;
            let entity = m.create_feature_below(&root)?;
            let x = m.create_feature_below(&entity)?;
            let y = m.create_feature_below(&entity)?;
            Ok((a, entity, x, y))
        })
        .unwrap();

    let z = model
        .run_internally(|model| -> ModelResult<Identifier> {
            let mut raw = RawMutator::new(model);
            raw.remove_feature(&entity)?;
            let z = raw.create_feature_below(&x)?;

            let model = raw.model();
            assert_eq!(model.feature_cache().len(), 5);
            assert!(!model.has_feature(&entity));
            assert_eq!(model.tree().parent(model.node_of(&x).unwrap()), model.node_of(&root));
            assert_eq!(model.tree().parent(model.node_of(&z).unwrap()), model.node_of(&x));
            assert_eq!(model.node_of(&y), model.tree().find(&y));
            Ok(z)
        })
        .unwrap();

    assert_eq!(child_ids(&model, &root), vec![a, x, y]);
    assert_eq!(model.feature_cache().len(), 5);
    assert!(model.feature_cache().lookup(&entity).is_none());
    assert!(model.feature_cache().lookup(&z).is_some());
}

#[rstest]
fn given_tracked_mutator_inside_run_internally_when_mixed_with_untracked_then_lookups_stay_exact(
    mut model: FeatureModel,
) {
    let root = root_of(&model);
    model.run_internally(|model| {
        let tracked = model.mutator().create_feature_below(&root).unwrap();
        let raw = RawMutator::new(model).create_feature_below(&tracked).unwrap();
        assert_eq!(model.feature_cache().len(), 2);
        assert_eq!(model.node_of(&raw), model.tree().find(&raw));
        assert!(model.has_feature(&tracked));
    });
    assert_eq!(model.feature_cache().len(), 3);
}
