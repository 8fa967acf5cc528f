//! Static relationship and label tables.
//!
//! Onboarding a new entity type means adding rules and a label field here
//! (or in `config.toml`); the hierarchy builder never branches on type names.

use std::collections::HashMap;

use crate::config::Config;

/// A single child relationship of some parent type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRule {
    /// Entity type of the child records.
    pub child_type: String,
    /// Field on the child that holds the parent's identifier.
    pub linking_field: String,
}

impl ChildRule {
    pub fn new(child_type: impl Into<String>, linking_field: impl Into<String>) -> Self {
        Self {
            child_type: child_type.into(),
            linking_field: linking_field.into(),
        }
    }
}

/// Parent type -> ordered child rules, plus entity type -> label field.
#[derive(Debug, Clone, Default)]
pub struct RelationshipRegistry {
    rules: HashMap<String, Vec<ChildRule>>,
    label_fields: HashMap<String, String>,
}

impl RelationshipRegistry {
    /// Registry with no rules and no labels.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in CRM relationships.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.add_builtin_rules();
        registry.add_builtin_labels();
        registry
    }

    fn add_builtin_rules(&mut self) {
        self.add_rule("Account", "Contact", "AccountId")
            .add_rule("Account", "Opportunity", "AccountId")
            .add_rule("Account", "Case", "AccountId")
            .add_rule("Account", "Account", "ParentId")
            .add_rule("Contact", "Case", "ContactId")
            .add_rule("Opportunity", "OpportunityLineItem", "OpportunityId")
            .add_rule("Case", "Case", "ParentId")
            .add_rule("Case", "CaseComment", "ParentId");
    }

    fn add_builtin_labels(&mut self) {
        self.set_label_field("Account", "Name")
            .set_label_field("Contact", "Name")
            .set_label_field("Opportunity", "Name")
            .set_label_field("Case", "Subject")
            .set_label_field("CaseComment", "ParentId");
    }

    /// Build from config; each table falls back to the built-in one when absent.
    pub fn from_config(config: &Config) -> Self {
        let mut registry = Self::empty();

        match &config.relationships {
            Some(rules) => {
                for rule in rules {
                    registry.add_rule(&rule.parent, &rule.child, &rule.field);
                }
            }
            None => registry.add_builtin_rules(),
        }

        match &config.labels {
            Some(labels) => {
                for (entity_type, field) in labels {
                    registry.set_label_field(entity_type, field);
                }
            }
            None => registry.add_builtin_labels(),
        }

        log::debug!(
            "Relationship registry loaded: {} parent types, {} label fields",
            registry.rules.len(),
            registry.label_fields.len()
        );
        registry
    }

    /// Append a rule; rules for the same parent keep insertion order.
    pub fn add_rule(
        &mut self,
        parent_type: impl Into<String>,
        child_type: impl Into<String>,
        linking_field: impl Into<String>,
    ) -> &mut Self {
        self.rules
            .entry(parent_type.into())
            .or_default()
            .push(ChildRule::new(child_type, linking_field));
        self
    }

    pub fn set_label_field(
        &mut self,
        entity_type: impl Into<String>,
        field: impl Into<String>,
    ) -> &mut Self {
        self.label_fields.insert(entity_type.into(), field.into());
        self
    }

    /// Child rules of `entity_type` in declaration order; empty for unknown types.
    pub fn child_rules_for(&self, entity_type: &str) -> &[ChildRule] {
        self.rules
            .get(entity_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn label_field_for(&self, entity_type: &str) -> Option<&str> {
        self.label_fields.get(entity_type).map(String::as_str)
    }

    /// Every type that appears as a parent, child, or label owner, sorted.
    pub fn entity_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self
            .rules
            .iter()
            .flat_map(|(parent, rules)| {
                std::iter::once(parent.as_str()).chain(rules.iter().map(|r| r.child_type.as_str()))
            })
            .chain(self.label_fields.keys().map(String::as_str))
            .collect();
        types.sort_unstable();
        types.dedup();
        types
    }
}
