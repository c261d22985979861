//! Failure records and the result of a validation run.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// How serious a failure is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// One structured validation failure.
///
/// Failures are created once by the execution context and never mutated
/// after they are appended to the run's failure list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    /// Full property path, e.g. `address.postcode` or `orders[2].amount`
    pub property_name: String,
    /// Rendered message
    pub error_message: String,
    /// Error code, explicit or derived from the validator identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    /// The value that failed validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempted_value: Option<serde_json::Value>,
    /// Arbitrary state attached by a custom state provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_state: Option<serde_json::Value>,
    #[serde(default)]
    pub severity: Severity,
    /// Placeholder values used to render the message
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub placeholders: HashMap<String, serde_json::Value>,
}

impl Failure {
    /// Create a failure with an already rendered message.
    pub fn new(property_name: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            property_name: property_name.into(),
            error_message: error_message.into(),
            error_code: None,
            attempted_value: None,
            custom_state: None,
            severity: Severity::Error,
            placeholders: HashMap::new(),
        }
    }

    /// Set the error code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Set the attempted value.
    pub fn with_attempted_value(mut self, value: impl Serialize) -> Self {
        self.attempted_value = serde_json::to_value(value).ok();
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Get a placeholder value by name.
    pub fn placeholder(&self, name: &str) -> Option<&serde_json::Value> {
        self.placeholders.get(name)
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property_name, self.error_message)
    }
}

/// Ordered failures produced by one validation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub failures: Vec<Failure>,
    /// Rule sets that were selected for the run
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_sets_executed: Vec<String>,
}

impl ValidationResult {
    pub fn new(failures: Vec<Failure>) -> Self {
        Self {
            failures,
            rule_sets_executed: Vec::new(),
        }
    }

    /// True when no failure was recorded.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures recorded for one property path, in order.
    pub fn errors_for<'a>(&'a self, property: &'a str) -> impl Iterator<Item = &'a Failure> + 'a {
        self.failures
            .iter()
            .filter(move |f| f.property_name == property)
    }

    /// Distinct property paths with failures, in first-seen order.
    pub fn property_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for failure in &self.failures {
            if !names.contains(&failure.property_name.as_str()) {
                names.push(&failure.property_name);
            }
        }
        names
    }

    /// Append failures from another result, keeping their order.
    pub fn merge(&mut self, other: ValidationResult) {
        self.failures.extend(other.failures);
        for set in other.rule_sets_executed {
            if !self.rule_sets_executed.contains(&set) {
                self.rule_sets_executed.push(set);
            }
        }
    }

    /// Convert to Result - Ok if valid, Err with the failures otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            return write!(f, "Validation succeeded");
        }
        write!(f, "Validation failed: {} error(s)", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n -- {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationResult {}
