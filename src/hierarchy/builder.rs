//! Depth-first hierarchy construction with global cycle suppression.

use std::collections::HashSet;

use serde::Serialize;

use super::{invalid_parameters, Node};
use crate::error::{RecordTreeError, Result};
use crate::registry::{ChildRule, RelationshipRegistry};
use crate::store::{Record, RecordStore};

/// Outcome of querying one relationship rule for one parent.
#[derive(Debug)]
pub enum RelationshipFetch {
    Fetched(Vec<Record>),
    /// The store failed; the rule contributes no children.
    Skipped { reason: String },
}

/// A rule that could not be evaluated for a particular parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRelationship {
    pub parent_id: String,
    pub parent_type: String,
    pub child_type: String,
    pub linking_field: String,
    pub reason: String,
}

/// What a build did, for logging and diagnostics. Not part of the tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildReport {
    pub records_emitted: usize,
    pub groups_emitted: usize,
    pub fetches: usize,
    pub cycles_pruned: usize,
    pub skipped: Vec<SkippedRelationship>,
}

/// Builds [`Node`] trees from a registry and a store.
///
/// Each call to [`build`](Self::build) owns its own visited set; nothing is
/// shared between builds.
pub struct HierarchyBuilder<'a> {
    registry: &'a RelationshipRegistry,
    store: &'a dyn RecordStore,
}

/// Per-build mutable state, threaded through every recursive call.
struct Traversal {
    max_depth: usize,
    visited: HashSet<String>,
    report: BuildReport,
}

impl<'a> HierarchyBuilder<'a> {
    pub fn new(registry: &'a RelationshipRegistry, store: &'a dyn RecordStore) -> Self {
        Self { registry, store }
    }

    /// Build the tree rooted at `root_id`. The root sits at depth 0 and
    /// records at `max_depth` are emitted without children.
    pub fn build(&self, root_id: &str, root_type: &str, max_depth: usize) -> Result<Node> {
        self.build_with_report(root_id, root_type, max_depth)
            .map(|(node, _)| node)
    }

    pub fn build_with_report(
        &self,
        root_id: &str,
        root_type: &str,
        max_depth: usize,
    ) -> Result<(Node, BuildReport)> {
        if root_id.trim().is_empty() || root_type.trim().is_empty() || max_depth == 0 {
            return Err(invalid_parameters());
        }

        let root = self
            .store
            .fetch_by_id(root_type, root_id)?
            .ok_or_else(|| RecordTreeError::RecordNotFound {
                entity_type: root_type.to_string(),
                id: root_id.to_string(),
            })?;

        let mut traversal = Traversal {
            max_depth,
            visited: HashSet::new(),
            report: BuildReport::default(),
        };
        let node = self.emit_node(&root, root_type, 0, &mut traversal);
        let report = traversal.report;

        log::info!(
            "Built hierarchy for {} {} (max depth {}): {} records, {} groups, {} fetches, {} skipped",
            root_type,
            root_id,
            max_depth,
            report.records_emitted,
            report.groups_emitted,
            report.fetches,
            report.skipped.len()
        );
        Ok((node, report))
    }

    /// `None` when the record was already emitted somewhere in this build.
    fn build_node(
        &self,
        record: &Record,
        entity_type: &str,
        depth: usize,
        traversal: &mut Traversal,
    ) -> Option<Node> {
        if traversal.visited.contains(&record.id) {
            log::debug!("Pruning already visited {} {}", entity_type, record.id);
            traversal.report.cycles_pruned += 1;
            return None;
        }
        Some(self.emit_node(record, entity_type, depth, traversal))
    }

    fn emit_node(
        &self,
        record: &Record,
        entity_type: &str,
        depth: usize,
        traversal: &mut Traversal,
    ) -> Node {
        traversal.visited.insert(record.id.clone());
        traversal.report.records_emitted += 1;

        let label = self
            .registry
            .label_field_for(entity_type)
            .and_then(|field| record.label_from(field));
        let mut node = Node::record(record.id.clone(), label, entity_type);

        if depth < traversal.max_depth {
            node.children = self.grouped_children(&record.id, entity_type, depth + 1, traversal);
        }
        node
    }

    /// One group per child type with at least one unvisited child, in the
    /// order each type was first returned by the parent's rules.
    fn grouped_children(
        &self,
        parent_id: &str,
        parent_type: &str,
        next_depth: usize,
        traversal: &mut Traversal,
    ) -> Vec<Node> {
        let buckets = self.collect_children(parent_id, parent_type, traversal);

        let mut groups = Vec::with_capacity(buckets.len());
        for (child_type, records) in buckets {
            let mut group = Node::group(parent_id, &child_type);
            for record in &records {
                if let Some(child) = self.build_node(record, &child_type, next_depth, traversal) {
                    group.children.push(child);
                }
            }

            if !group.children.is_empty() {
                traversal.report.groups_emitted += 1;
                groups.push(group);
            }
        }
        groups
    }

    /// Fetch every rule of `parent_type`, bucketing records by child type.
    /// Rules targeting the same type are concatenated in declaration order.
    fn collect_children(
        &self,
        parent_id: &str,
        parent_type: &str,
        traversal: &mut Traversal,
    ) -> Vec<(String, Vec<Record>)> {
        let mut buckets: Vec<(String, Vec<Record>)> = Vec::new();

        for rule in self.registry.child_rules_for(parent_type) {
            traversal.report.fetches += 1;
            match self.fetch_relationship(parent_id, rule) {
                RelationshipFetch::Fetched(records) => {
                    if records.is_empty() {
                        continue;
                    }
                    match buckets.iter_mut().find(|(t, _)| *t == rule.child_type) {
                        Some((_, bucket)) => bucket.extend(records),
                        None => buckets.push((rule.child_type.clone(), records)),
                    }
                }
                RelationshipFetch::Skipped { reason } => {
                    log::warn!(
                        "Skipping {} -> {}.{} for {}: {}",
                        parent_type,
                        rule.child_type,
                        rule.linking_field,
                        parent_id,
                        reason
                    );
                    traversal.report.skipped.push(SkippedRelationship {
                        parent_id: parent_id.to_string(),
                        parent_type: parent_type.to_string(),
                        child_type: rule.child_type.clone(),
                        linking_field: rule.linking_field.clone(),
                        reason,
                    });
                }
            }
        }
        buckets
    }

    /// Query one rule, converting store failures into [`RelationshipFetch::Skipped`].
    pub fn fetch_relationship(&self, parent_id: &str, rule: &ChildRule) -> RelationshipFetch {
        match self
            .store
            .fetch_children(&rule.child_type, &rule.linking_field, parent_id)
        {
            Ok(records) => RelationshipFetch::Fetched(records),
            Err(e) => RelationshipFetch::Skipped {
                reason: e.to_string(),
            },
        }
    }
}
