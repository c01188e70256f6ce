//! Domain Merge Tests
//!
//! Collision policy, idempotence, order independence and atomicity of
//! DomainModel::merge.

use crate::common::*;
use proptest::prelude::*;
use std::sync::Arc;

fn tagged(domain: &DomainId, name: &str, descriptor: &TypeHandle, tag: &str) -> TypeEntry {
    TypeEntry::builder(domain.clone(), name, descriptor.clone())
        .attribute(tag)
        .build()
}

fn attribute_view(model: &DomainModel) -> Vec<(String, Vec<String>)> {
    model
        .attributes()
        .into_iter()
        .map(|tag| {
            let names = model
                .find_by_attribute(&tag)
                .iter()
                .map(|e| e.name().to_string())
                .collect();
            (tag.as_str().to_string(), names)
        })
        .collect()
}

// ============================================================================
// Idempotence
// ============================================================================

#[test]
fn merge_with_self_leaves_state_unchanged() {
    let id = domain_id("shop");
    let model = DomainModel::with_types(
        id.clone(),
        vec![
            tagged(&id, "Order", &TypeHandle::new("shop.Order"), "Aggregate"),
            tagged(&id, "Line", &TypeHandle::new("shop.Line"), "Value"),
        ],
    )
    .unwrap();
    let types_before = model.snapshot();
    let attrs_before = attribute_view(&model);

    model.merge(&model).unwrap();

    assert_eq!(model.snapshot(), types_before);
    assert_eq!(attribute_view(&model), attrs_before);
}

#[test]
fn merge_with_identical_descriptors_leaves_state_unchanged() {
    let id = domain_id("shop");
    let order = TypeHandle::new("shop.Order");
    let a = DomainModel::with_types(id.clone(), vec![tagged(&id, "Order", &order, "Aggregate")])
        .unwrap();
    let b = DomainModel::with_types(id.clone(), vec![tagged(&id, "Order", &order, "Aggregate")])
        .unwrap();
    let kept = a.find("Order").unwrap();

    a.merge(&b).unwrap();
    a.merge(&b).unwrap();

    assert!(Arc::ptr_eq(&kept, &a.find("Order").unwrap()));
    assert_eq!(a.find_by_attribute(&"Aggregate".into()).len(), 1);
}

// ============================================================================
// Specialization precedence
// ============================================================================

#[test]
fn specialization_wins_regardless_of_order() {
    let id = domain_id("shop");
    let [base, _, leaf] = chain("shop");

    let base_first = DomainModel::with_types(id.clone(), vec![plain_with(&id, "X", &base)]).unwrap();
    base_first
        .merge(&DomainModel::with_types(id.clone(), vec![plain_with(&id, "X", &leaf)]).unwrap())
        .unwrap();

    let leaf_first = DomainModel::with_types(id.clone(), vec![plain_with(&id, "X", &leaf)]).unwrap();
    leaf_first
        .merge(&DomainModel::with_types(id.clone(), vec![plain_with(&id, "X", &base)]).unwrap())
        .unwrap();

    assert_eq!(base_first.find("X").unwrap().descriptor(), &leaf);
    assert_eq!(leaf_first.find("X").unwrap().descriptor(), &leaf);
}

fn plain_with(domain: &DomainId, name: &str, descriptor: &TypeHandle) -> TypeEntry {
    TypeEntry::builder(domain.clone(), name, descriptor.clone()).build()
}

proptest! {
    /// Whatever order the levels of a specialization chain arrive in, the
    /// deepest one ends up bound to the name.
    #[test]
    fn chain_merge_order_independent(order in prop::collection::vec(0usize..3, 1..12)) {
        let id = domain_id("shop");
        let levels = chain("shop");
        let target = DomainModel::new(id.clone());

        for &level in &order {
            let incoming = DomainModel::with_types(
                id.clone(),
                vec![plain_with(&id, "X", &levels[level])],
            ).unwrap();
            target.merge(&incoming).unwrap();
        }

        let deepest = *order.iter().max().unwrap();
        let found = target.find("X").unwrap();
        prop_assert_eq!(found.descriptor(), &levels[deepest]);
        prop_assert_eq!(target.len(), 1);
    }

    /// Disjoint domains merge to the same name set in either direction.
    #[test]
    fn disjoint_merge_commutes(
        left in prop::collection::btree_set("[a-m]{1,6}", 0..10),
        right in prop::collection::btree_set("[n-z]{1,6}", 0..10),
    ) {
        let id = domain_id("shop");
        let build = |names: &std::collections::BTreeSet<String>| {
            DomainModel::with_types(
                id.clone(),
                names.iter().map(|n| plain(&id, n, &format!("shop.{}", n))),
            ).unwrap()
        };

        let (a1, b1) = (build(&left), build(&right));
        a1.merge(&b1).unwrap();
        let (a2, b2) = (build(&left), build(&right));
        b2.merge(&a2).unwrap();

        prop_assert_eq!(a1.names(), b2.names());
        prop_assert_eq!(a1.len(), left.len() + right.len());
    }
}

// ============================================================================
// Conflicts
// ============================================================================

#[test]
fn event_over_entity_is_illegal_and_leaves_domain_unchanged() {
    let id = domain_id("shop");
    let order = TypeHandle::new("shop.Order");
    let target = DomainModel::with_types(
        id.clone(),
        vec![classified(&id, "Order", &order, Classification::Entity)],
    )
    .unwrap();
    let before = target.snapshot();

    let incoming = DomainModel::with_types(
        id.clone(),
        vec![
            plain(&id, "Audit", "shop.Audit"),
            classified(&id, "Order", &order, Classification::Event),
        ],
    )
    .unwrap();

    match target.merge(&incoming).unwrap_err() {
        ModelError::IllegalModel {
            type_name,
            existing,
            incoming,
        } => {
            assert_eq!(type_name, "Order");
            assert_eq!(existing, Classification::Entity);
            assert_eq!(incoming, Classification::Event);
        }
        other => panic!("expected IllegalModel, got {other:?}"),
    }
    assert_eq!(target.snapshot(), before);
    assert!(!target.contains("Audit"));
}

#[test]
fn entity_over_event_is_illegal() {
    let id = domain_id("shop");
    let placed = TypeHandle::new("shop.OrderPlaced");
    let target = DomainModel::with_types(
        id.clone(),
        vec![classified(&id, "OrderPlaced", &placed, Classification::Event)],
    )
    .unwrap();
    let incoming = DomainModel::with_types(
        id.clone(),
        vec![classified(&id, "OrderPlaced", &placed, Classification::Entity)],
    )
    .unwrap();

    let err = target.merge(&incoming).unwrap_err();
    assert!(err.is_conflict());
    assert!(target.find("OrderPlaced").unwrap().is_event());
}

#[test]
fn unrelated_descriptors_are_ambiguous() {
    let id = domain_id("shop");
    let a = DomainModel::with_types(id.clone(), vec![plain(&id, "Foo", "one.Foo")]).unwrap();
    let b = DomainModel::with_types(id.clone(), vec![plain(&id, "Foo", "two.Foo")]).unwrap();

    let err = a.merge(&b).unwrap_err();
    assert!(matches!(err, ModelError::AmbiguousType { ref type_name, .. } if type_name == "Foo"));
    assert_eq!(a.find("Foo").unwrap().descriptor().path(), "one.Foo");

    let message = err.to_string();
    assert!(message.contains("one.Foo") && message.contains("two.Foo"));
}

#[test]
fn concurrent_merges_into_one_domain() {
    let id = domain_id("shop");
    let target = Arc::new(DomainModel::new(id.clone()));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let target = Arc::clone(&target);
            let id = id.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    let name = format!("T{}_{}", t, i);
                    let incoming = DomainModel::with_types(
                        id.clone(),
                        vec![plain(&id, &name, &format!("shop.{}", name))],
                    )
                    .unwrap();
                    target.merge(&incoming).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(target.len(), 400);
}
