//! Relationship rule configuration

use crate::aggregate::BinaryRelationshipRule;
use crate::settings::RuleReference;
use crate::value_objects::ClassKind;
use std::sync::Arc;

/// The relationship rules applicable to the two axis kinds, and the active one
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipConfiguration {
    possible_rules: Vec<Arc<BinaryRelationshipRule>>,
    selected_rule: Option<Arc<BinaryRelationshipRule>>,
}

impl RelationshipConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn possible_rules(&self) -> &[Arc<BinaryRelationshipRule>] {
        &self.possible_rules
    }

    pub fn selected_rule(&self) -> Option<&Arc<BinaryRelationshipRule>> {
        self.selected_rule.as_ref()
    }

    /// Offer the rules whose source and target kinds together cover both axis kinds.
    ///
    /// With either kind unset nothing is offered. The selection is kept when its rule is still
    /// offered, picking up the latest version of it.
    pub fn populate_applicable_rules(
        &mut self,
        rules: Vec<Arc<BinaryRelationshipRule>>,
        kind_y: Option<ClassKind>,
        kind_x: Option<ClassKind>,
    ) {
        self.possible_rules = match (kind_y, kind_x) {
            (Some(y), Some(x)) => {
                let mut applicable: Vec<_> = rules.into_iter().filter(|r| r.is_applicable_to(y, x)).collect();
                applicable.sort_by(|a, b| a.name.cmp(&b.name));
                applicable
            }
            _ => Vec::new(),
        };

        self.selected_rule = self
            .selected_rule
            .take()
            .and_then(|selected| self.possible_rules.iter().find(|r| r.id == selected.id).cloned());
    }

    /// Select one of the offered rules; returns whether the selection changed
    pub fn select_rule(&mut self, rule: Option<&Arc<BinaryRelationshipRule>>) -> bool {
        let next = rule.and_then(|rule| self.possible_rules.iter().find(|r| r.id == rule.id).cloned());
        let changed = next.as_ref().map(|r| r.id) != self.selected_rule.as_ref().map(|r| r.id);
        self.selected_rule = next;
        changed
    }

    /// Select the offered rule matching a persisted reference
    pub fn select_reference(&mut self, reference: &RuleReference) -> bool {
        let rule = self
            .possible_rules
            .iter()
            .find(|r| {
                r.relationship_category == reference.relationship_category
                    && r.is_applicable_to(reference.kind_y, reference.kind_x)
            })
            .cloned();
        self.select_rule(rule.as_ref())
    }

    pub fn to_reference(&self, kind_y: Option<ClassKind>, kind_x: Option<ClassKind>) -> Option<RuleReference> {
        let rule = self.selected_rule.as_ref()?;
        Some(RuleReference {
            relationship_category: rule.relationship_category,
            kind_y: kind_y?,
            kind_x: kind_x?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::ThingId;

    fn rules() -> Vec<Arc<BinaryRelationshipRule>> {
        vec![
            Arc::new(BinaryRelationshipRule::new(
                "traces",
                ThingId::new(),
                [ClassKind::Requirement],
                [ClassKind::Requirement],
                "traces to",
            )),
            Arc::new(BinaryRelationshipRule::new(
                "satisfies",
                ThingId::new(),
                [ClassKind::ElementDefinition],
                [ClassKind::Requirement],
                "satisfies",
            )),
        ]
    }

    #[test]
    fn test_applicable_rules_ignore_axis_order() {
        let mut config = RelationshipConfiguration::new();

        config.populate_applicable_rules(rules(), Some(ClassKind::Requirement), Some(ClassKind::ElementDefinition));
        let names: Vec<&str> = config.possible_rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["satisfies"]);

        config.populate_applicable_rules(rules(), Some(ClassKind::Requirement), Some(ClassKind::Requirement));
        let names: Vec<&str> = config.possible_rules().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["satisfies", "traces"]);
    }

    #[test]
    fn test_unset_kind_offers_nothing() {
        let mut config = RelationshipConfiguration::new();
        config.populate_applicable_rules(rules(), Some(ClassKind::Requirement), None);
        assert!(config.possible_rules().is_empty());
        assert!(config.selected_rule().is_none());
    }

    #[test]
    fn test_selection_is_dropped_when_no_longer_applicable() {
        let all = rules();
        let mut config = RelationshipConfiguration::new();
        config.populate_applicable_rules(all.clone(), Some(ClassKind::Requirement), Some(ClassKind::Requirement));

        assert!(config.select_rule(Some(&all[0])));
        assert!(!config.select_rule(Some(&all[0])));

        config.populate_applicable_rules(all.clone(), Some(ClassKind::Requirement), Some(ClassKind::ElementDefinition));
        assert!(config.selected_rule().is_none());
    }

    #[test]
    fn test_reference_round_trip() {
        let all = rules();
        let mut config = RelationshipConfiguration::new();
        config.populate_applicable_rules(all.clone(), Some(ClassKind::ElementDefinition), Some(ClassKind::Requirement));
        config.select_rule(Some(&all[1]));

        let reference = config
            .to_reference(Some(ClassKind::ElementDefinition), Some(ClassKind::Requirement))
            .unwrap();

        let mut restored = RelationshipConfiguration::new();
        restored.populate_applicable_rules(all, Some(ClassKind::ElementDefinition), Some(ClassKind::Requirement));
        assert!(restored.select_reference(&reference));
        assert_eq!(restored.selected_rule().map(|r| r.name.as_str()), Some("satisfies"));
    }
}
