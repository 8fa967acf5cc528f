//! Structural guarantees checked over generated, heavily cyclic graphs.

use std::collections::HashSet;

use recordtree::{HierarchyBuilder, MemoryStore, Node, Record, RelationshipRegistry};

/// Small deterministic generator so failures are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound
    }
}

fn registry() -> RelationshipRegistry {
    let mut registry = RelationshipRegistry::empty();
    registry
        .add_rule("Item", "Item", "ParentId")
        .add_rule("Item", "Part", "ItemId")
        .add_rule("Item", "Part", "SpareFor")
        .add_rule("Part", "Item", "BuiltFrom")
        .add_rule("Part", "Missing", "PartId")
        .set_label_field("Item", "Name");
    registry
}

fn generated_store(seed: u64, items: usize, parts: usize) -> MemoryStore {
    let mut rng = Lcg(seed);
    let mut store = MemoryStore::new();
    for i in 0..items {
        let parent = format!("I{}", rng.next(items));
        let built_from = format!("P{}", rng.next(parts));
        store.insert(
            "Item",
            Record::new(format!("I{}", i))
                .with_field("Name", format!("Item {}", i))
                .with_field("ParentId", parent)
                .with_field("BuiltFrom", built_from),
        );
    }
    for p in 0..parts {
        let item = format!("I{}", rng.next(items));
        let spare = format!("I{}", rng.next(items));
        store.insert(
            "Part",
            Record::new(format!("P{}", p))
                .with_field("ItemId", item)
                .with_field("SpareFor", spare),
        );
    }
    store
}

fn check_structure(node: &Node, seen: &mut HashSet<String>) {
    if node.is_group {
        assert!(!node.children.is_empty(), "empty group {}", node.id);
        assert_eq!(node.label.as_deref(), Some(node.entity_type.as_str()));
        for child in &node.children {
            assert!(!child.is_group, "group {} nested in group {}", child.id, node.id);
            assert_eq!(child.entity_type, node.entity_type);
            check_structure(child, seen);
        }
    } else {
        assert!(seen.insert(node.id.clone()), "record {} emitted twice", node.id);
        for child in &node.children {
            assert!(child.is_group, "record {} directly under record {}", child.id, node.id);
            assert_eq!(child.id, Node::group_id(&node.id, &child.entity_type));
            check_structure(child, seen);
        }
    }
}

#[test]
fn test_generated_graphs_keep_tree_invariants() {
    let registry = registry();
    for seed in 1..=20u64 {
        let store = generated_store(seed, 12, 8);
        let builder = HierarchyBuilder::new(&registry, &store);
        for max_depth in 1..=6 {
            let root_id = format!("I{}", seed as usize % 12);
            let tree = builder.build(&root_id, "Item", max_depth).unwrap();

            let mut seen = HashSet::new();
            check_structure(&tree, &mut seen);
            assert!(tree.record_depth() <= max_depth + 1);
            assert_eq!(seen.len(), tree.record_count());

            let again = builder.build(&root_id, "Item", max_depth).unwrap();
            assert_eq!(tree, again, "seed {} depth {} not deterministic", seed, max_depth);
        }
    }
}

#[test]
fn test_depth_one_stops_at_direct_children() {
    let registry = registry();
    let store = generated_store(11, 10, 6);

    let tree = HierarchyBuilder::new(&registry, &store)
        .build("I0", "Item", 1)
        .unwrap();

    for group in &tree.children {
        assert!(group.children.iter().all(|c| c.children.is_empty()));
    }
    assert!(tree.record_depth() <= 2);
}

#[test]
fn test_missing_child_type_is_reported_not_fatal() {
    let registry = registry();
    let store = generated_store(3, 6, 4);

    let (tree, report) = HierarchyBuilder::new(&registry, &store)
        .build_with_report("I0", "Item", 4)
        .unwrap();

    assert!(tree.record_count() >= 1);
    assert!(report.skipped.iter().all(|s| s.child_type == "Missing"));
    assert_eq!(report.records_emitted, tree.record_count());
}
