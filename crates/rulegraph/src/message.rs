//! Message formatting with `{Placeholder}` substitution.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// Placeholder holding the display name of the property.
pub const PROPERTY_NAME: &str = "PropertyName";
/// Placeholder holding the value being validated.
pub const PROPERTY_VALUE: &str = "PropertyValue";
/// Placeholder holding the index of the element inside a collection rule.
pub const COLLECTION_INDEX: &str = "CollectionIndex";

/// Accumulates placeholder values for one validator invocation and renders
/// message templates with them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageFormatter {
    placeholders: HashMap<String, Value>,
}

impl MessageFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a placeholder value.
    pub fn append_argument(&mut self, name: impl Into<String>, value: impl Serialize) -> &mut Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.placeholders.insert(name.into(), value);
        self
    }

    pub fn append_property_name(&mut self, display_name: &str) -> &mut Self {
        self.append_argument(PROPERTY_NAME, display_name)
    }

    pub fn append_property_value(&mut self, value: impl Serialize) -> &mut Self {
        self.append_argument(PROPERTY_VALUE, value)
    }

    pub fn placeholder(&self, name: &str) -> Option<&Value> {
        self.placeholders.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.placeholders.contains_key(name)
    }

    pub fn placeholders(&self) -> &HashMap<String, Value> {
        &self.placeholders
    }

    pub(crate) fn into_placeholders(self) -> HashMap<String, Value> {
        self.placeholders
    }

    /// Render a template, replacing every known `{Name}` token in one pass.
    ///
    /// Unknown tokens are left in place so that templates stay readable when
    /// a validator does not provide every argument.
    pub fn build_message(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.placeholders.get(key) {
                        Some(value) => out.push_str(&render(value)),
                        None => {
                            out.push('{');
                            out.push_str(key);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}
