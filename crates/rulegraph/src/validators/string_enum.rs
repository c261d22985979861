//! Restricts text to a fixed set of names.

use super::{Capability, PropertyValidator, TextValue};
use crate::error::{EngineError, Result};
use crate::execution::PropertyContext;
use crate::message::PROPERTY_VALUE;

/// Accepts only values that match one of the configured names.
///
/// Absent values pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringEnumValidator {
    names: Vec<String>,
    case_sensitive: bool,
}

impl StringEnumValidator {
    pub fn new<I, S>(names: I, case_sensitive: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(EngineError::invalid_argument(
                "names",
                "at least one accepted name is required",
            ));
        }
        Ok(Self {
            names,
            case_sensitive,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn accepts(&self, candidate: &str) -> bool {
        if self.case_sensitive {
            self.names.iter().any(|name| name == candidate)
        } else {
            let candidate = candidate.to_lowercase();
            self.names.iter().any(|name| name.to_lowercase() == candidate)
        }
    }
}

impl<T, P> PropertyValidator<T, P> for StringEnumValidator
where
    T: Send + Sync + 'static,
    P: TextValue + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "string_enum"
    }

    fn default_message_template(&self) -> &'static str {
        "'{PropertyName}' has a range of values which does not include '{PropertyValue}'."
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::OneOf {
            values: self.names.clone(),
            case_sensitive: self.case_sensitive,
        }]
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        let Some(text) = ctx.value().text() else {
            return Ok(());
        };
        if !self.accepts(text) {
            ctx.append_argument(PROPERTY_VALUE, text);
            ctx.add_failure();
        }
        Ok(())
    }
}
