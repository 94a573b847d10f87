//! Ordered registry of rules with unique names

use crate::config::GuardianConfig;
use crate::domain::findings::{GuardianError, GuardianResult, RuleCategory};
use crate::rules::{self, Rule};
use serde::{Deserialize, Serialize};

/// Registry of the rules one run executes, in registration order
#[derive(Default)]
pub struct RuleRegistry {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Every built-in rule the configuration enables, in catalog order
    pub fn default_rules(config: &GuardianConfig) -> GuardianResult<Self> {
        let mut registry = Self::new();
        for rule in rules::all_rules(config)? {
            if config.is_rule_enabled(rule.id()) {
                registry.register(rule)?;
            } else {
                tracing::debug!("Rule {} disabled by configuration", rule.id());
            }
        }
        Ok(registry)
    }

    /// Register a rule; names must be unique
    pub fn register(&mut self, rule: Box<dyn Rule>) -> GuardianResult<()> {
        if self.get(rule.id()).is_some() {
            return Err(GuardianError::config(format!(
                "Rule '{}' is already registered",
                rule.id()
            )));
        }
        self.rules.push(rule);
        Ok(())
    }

    pub fn get(&self, rule_id: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.id() == rule_id)
            .map(|rule| rule.as_ref())
    }

    pub fn rules(&self) -> &[Box<dyn Rule>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rule metadata for `rules` and `explain`
    pub fn rule_metadata(&self) -> Vec<RuleMetadata> {
        self.rules
            .iter()
            .map(|rule| RuleMetadata {
                id: rule.id().to_string(),
                description: rule.description().to_string(),
                category: rule.category(),
            })
            .collect()
    }
}

/// Metadata about a rule for documentation/introspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMetadata {
    pub id: String,
    pub description: String,
    pub category: RuleCategory,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigBuilder;
    use crate::domain::findings::Finding;
    use crate::snapshot::ProjectSnapshot;

    struct Named(&'static str);

    impl Rule for Named {
        fn id(&self) -> &'static str {
            self.0
        }

        fn description(&self) -> &'static str {
            "test rule"
        }

        fn category(&self) -> RuleCategory {
            RuleCategory::Html
        }

        fn check(&self, _snapshot: &ProjectSnapshot) -> GuardianResult<Vec<Finding>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_registry_follows_catalog() {
        let registry = RuleRegistry::default_rules(&GuardianConfig::default()).unwrap();
        let ids: Vec<_> = registry.rules().iter().map(|rule| rule.id()).collect();

        // conformance is opt-in
        assert_eq!(ids.len(), rules::RULE_IDS.len() - 1);
        assert_eq!(ids, rules::RULE_IDS[..ids.len()].to_vec());
        assert!(registry.get("markup/conformance").is_none());
    }

    #[test]
    fn test_disabled_rules_are_not_registered() {
        let config = ConfigBuilder::new()
            .disable_rule("css/units")
            .build()
            .unwrap();
        let registry = RuleRegistry::default_rules(&config).unwrap();

        assert!(registry.get("css/units").is_none());
        assert!(registry.get("css/syntax").is_some());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(Named("a"))).unwrap();
        assert!(registry.register(Box::new(Named("a"))).is_err());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_metadata_keeps_registration_order() {
        let mut registry = RuleRegistry::new();
        registry.register(Box::new(Named("b"))).unwrap();
        registry.register(Box::new(Named("a"))).unwrap();

        let metadata = registry.rule_metadata();
        let ids: Vec<_> = metadata.iter().map(|rule| rule.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(metadata[0].description, "test rule");
        assert_eq!(metadata[0].category, RuleCategory::Html);
    }
}
