//! Required-value validator.

use super::{Capability, PropertyValidator};
use crate::error::Result;
use crate::execution::PropertyContext;
use std::collections::HashMap;

/// Values with a notion of being empty.
pub trait Emptiness {
    fn is_empty_value(&self) -> bool;
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Emptiness for &'static str {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl<E> Emptiness for Vec<E> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Emptiness for HashMap<K, V> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

impl<E: Emptiness> Emptiness for Option<E> {
    fn is_empty_value(&self) -> bool {
        self.as_ref().map_or(true, Emptiness::is_empty_value)
    }
}

/// Fails for absent values, blank text and empty collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotEmptyValidator;

impl NotEmptyValidator {
    pub fn new() -> Self {
        Self
    }
}

impl<T, P> PropertyValidator<T, P> for NotEmptyValidator
where
    T: Send + Sync + 'static,
    P: Emptiness + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "not_empty"
    }

    fn default_message_template(&self) -> &'static str {
        "'{PropertyName}' must not be empty."
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Required]
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        if ctx.value().is_empty_value() {
            ctx.add_failure();
        }
        Ok(())
    }
}
