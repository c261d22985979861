//! Serializable introspection of a rule graph.
//!
//! Descriptors expose what a presentation layer needs to mirror rules
//! elsewhere (for example client-side checks) without touching engine types.

use crate::rule::CascadeMode;
use crate::validators::{Capability, ExecutionSupport};
use serde::{Deserialize, Serialize};

/// Description of one rule and its bindings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleDescriptor {
    pub property_name: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_sets: Vec<String>,
    pub cascade_mode: CascadeMode,
    pub is_collection: bool,
    pub has_condition: bool,
    pub validators: Vec<ValidatorDescriptor>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependent_rules: Vec<RuleDescriptor>,
}

impl RuleDescriptor {
    /// Find the first validator with the given capability kind.
    pub fn capability<F>(&self, mut predicate: F) -> Option<&Capability>
    where
        F: FnMut(&Capability) -> bool,
    {
        self.validators
            .iter()
            .flat_map(|validator| validator.capabilities.iter())
            .find(|capability| predicate(capability))
    }
}

/// Description of one validator binding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatorDescriptor {
    pub name: String,
    pub error_code: String,
    /// Raw message template, placeholders unresolved
    pub message_template: String,
    pub capabilities: Vec<Capability>,
    pub support: ExecutionSupport,
    /// Whether this binding rejects synchronous runs
    pub requires_async: bool,
    pub has_condition: bool,
}
