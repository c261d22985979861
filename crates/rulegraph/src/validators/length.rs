//! Text length validators.
//!
//! Length is measured in Unicode scalar values. Absent values pass; pair
//! with [`NotEmptyValidator`](super::NotEmptyValidator) to require them.

use super::{Capability, PropertyValidator};
use crate::error::{EngineError, Result};
use crate::execution::PropertyContext;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Values that may carry text.
pub trait TextValue {
    fn text(&self) -> Option<&str>;
}

impl TextValue for String {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl TextValue for &'static str {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl TextValue for Arc<str> {
    fn text(&self) -> Option<&str> {
        Some(self)
    }
}

impl<S: TextValue> TextValue for Option<S> {
    fn text(&self) -> Option<&str> {
        self.as_ref().and_then(TextValue::text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum LengthKind {
    Between,
    Minimum,
    Maximum,
    Exact,
}

/// Inclusive length bounds on text values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthValidator {
    min: usize,
    max: Option<usize>,
    kind: LengthKind,
}

impl LengthValidator {
    /// Length between `min` and `max`, both inclusive.
    pub fn new(min: usize, max: usize) -> Result<Self> {
        if max < min {
            return Err(EngineError::invalid_argument(
                "max",
                format!("max ({max}) must be greater than or equal to min ({min})"),
            ));
        }
        Ok(Self {
            min,
            max: Some(max),
            kind: LengthKind::Between,
        })
    }

    pub fn min_length(min: usize) -> Self {
        Self {
            min,
            max: None,
            kind: LengthKind::Minimum,
        }
    }

    pub fn max_length(max: usize) -> Self {
        Self {
            min: 0,
            max: Some(max),
            kind: LengthKind::Maximum,
        }
    }

    /// Exactly `length` characters; same bounds as `new(length, length)`.
    pub fn exact(length: usize) -> Self {
        Self {
            min: length,
            max: Some(length),
            kind: LengthKind::Exact,
        }
    }

    pub fn min(&self) -> usize {
        self.min
    }

    pub fn max(&self) -> Option<usize> {
        self.max
    }

    /// Check a length against the bounds.
    pub fn accepts(&self, length: usize) -> bool {
        length >= self.min && self.max.map_or(true, |max| length <= max)
    }
}

impl<T, P> PropertyValidator<T, P> for LengthValidator
where
    T: Send + Sync + 'static,
    P: TextValue + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        match self.kind {
            LengthKind::Between => "length",
            LengthKind::Minimum => "minimum_length",
            LengthKind::Maximum => "maximum_length",
            LengthKind::Exact => "exact_length",
        }
    }

    fn default_message_template(&self) -> &'static str {
        match self.kind {
            LengthKind::Between => "'{PropertyName}' must be between {MinLength} and {MaxLength} characters. You entered {TotalLength} characters.",
            LengthKind::Minimum => "The length of '{PropertyName}' must be at least {MinLength} characters. You entered {TotalLength} characters.",
            LengthKind::Maximum => "The length of '{PropertyName}' must be {MaxLength} characters or fewer. You entered {TotalLength} characters.",
            LengthKind::Exact => "'{PropertyName}' must be {MaxLength} characters in length. You entered {TotalLength} characters.",
        }
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Length {
            min: self.min,
            max: self.max,
        }]
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        let Some(text) = ctx.value().text() else {
            return Ok(());
        };

        let length = text.chars().count();
        if self.accepts(length) {
            return Ok(());
        }

        ctx.append_argument("MinLength", self.min);
        if let Some(max) = self.max {
            ctx.append_argument("MaxLength", max);
        }
        ctx.append_argument("TotalLength", length);
        ctx.add_failure();
        Ok(())
    }
}
