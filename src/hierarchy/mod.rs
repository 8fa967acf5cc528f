//! Record hierarchy: grouped, depth-bounded, cycle-free trees of records.
//!
//! A tree alternates levels: record nodes hold only group nodes, and group
//! nodes (one per related entity type) hold only record nodes. Each record id
//! appears at most once per tree.

mod builder;

pub use builder::{BuildReport, HierarchyBuilder, RelationshipFetch, SkippedRelationship};

use serde::{Deserialize, Serialize};

use crate::error::{RecordTreeError, Result};
use crate::registry::RelationshipRegistry;
use crate::store::RecordStore;

/// One element of the rendered tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    /// Record id, or `<parent id>_<entity type>` for group nodes.
    pub id: String,
    /// Value of the type's label field; the entity type name for groups.
    pub label: Option<String>,
    pub entity_type: String,
    pub is_group: bool,
    pub children: Vec<Node>,
}

impl Node {
    pub fn record(id: impl Into<String>, label: Option<String>, entity_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label,
            entity_type: entity_type.into(),
            is_group: false,
            children: Vec::new(),
        }
    }

    /// Empty group bucketing `entity_type` children under `parent_id`.
    pub fn group(parent_id: &str, entity_type: &str) -> Self {
        Self {
            id: Self::group_id(parent_id, entity_type),
            label: Some(entity_type.to_string()),
            entity_type: entity_type.to_string(),
            is_group: true,
            children: Vec::new(),
        }
    }

    pub fn group_id(parent_id: &str, entity_type: &str) -> String {
        format!("{}_{}", parent_id, entity_type)
    }

    /// Number of record nodes in this subtree, including `self` if it is one.
    pub fn record_count(&self) -> usize {
        let own = usize::from(!self.is_group);
        own + self.children.iter().map(Node::record_count).sum::<usize>()
    }

    /// Number of record levels in this subtree; a lone record is 1.
    pub fn record_depth(&self) -> usize {
        let below = self.children.iter().map(Node::record_depth).max().unwrap_or(0);
        if self.is_group {
            below
        } else {
            below + 1
        }
    }

    /// Record ids in depth-first pre-order.
    pub fn record_ids(&self) -> Vec<&str> {
        let mut ids = Vec::new();
        self.collect_record_ids(&mut ids);
        ids
    }

    fn collect_record_ids<'a>(&'a self, ids: &mut Vec<&'a str>) {
        if !self.is_group {
            ids.push(&self.id);
        }
        for child in &self.children {
            child.collect_record_ids(ids);
        }
    }

    /// First node (record or group) with `id`, depth-first.
    pub fn find(&self, id: &str) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(id))
    }
}

/// Entry point for callers holding raw request values.
///
/// Blank ids/types and non-positive depths fail with
/// [`RecordTreeError::InvalidInput`] before any store access.
pub fn get_hierarchy_data(
    store: &dyn RecordStore,
    registry: &RelationshipRegistry,
    record_id: &str,
    root_type: &str,
    max_depth: i64,
) -> Result<Node> {
    get_hierarchy_data_with_report(store, registry, record_id, root_type, max_depth)
        .map(|(node, _)| node)
}

/// [`get_hierarchy_data`] plus the [`BuildReport`] of skipped relationships and counts.
pub fn get_hierarchy_data_with_report(
    store: &dyn RecordStore,
    registry: &RelationshipRegistry,
    record_id: &str,
    root_type: &str,
    max_depth: i64,
) -> Result<(Node, BuildReport)> {
    let max_depth = usize::try_from(max_depth)
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(invalid_parameters)?;
    HierarchyBuilder::new(registry, store).build_with_report(record_id, root_type, max_depth)
}

pub(crate) fn invalid_parameters() -> RecordTreeError {
    RecordTreeError::InvalidInput("Invalid parameters provided".to_string())
}
