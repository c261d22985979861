//! The validator contract and the built-in validators.
//!
//! A validator inspects the property value through a [`PropertyContext`] and
//! records failures on it. Validators declare which behaviors they have
//! (sync, async or both) and which well-known capabilities they expose, so
//! downstream adapters can dispatch on capability rather than concrete type.

mod child;
mod length;
mod not_empty;
mod predicate;
mod string_enum;

pub use child::{ChildValidatorAdaptor, ChildValue};
pub use length::{LengthValidator, TextValue};
pub use not_empty::{Emptiness, NotEmptyValidator};
pub use predicate::{AsyncPredicateValidator, PredicateValidator};
pub use string_enum::StringEnumValidator;

use crate::error::{EngineError, Result};
use crate::execution::PropertyContext;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which execution paths a validator implements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionSupport {
    #[default]
    Sync,
    Async,
    Both,
}

/// Well-known capabilities a validator can declare.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Capability {
    /// Text length bounds, inclusive
    Length {
        min: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max: Option<usize>,
    },
    /// Value must be present and non-empty
    Required,
    /// Value must be one of a fixed set of names
    OneOf {
        values: Vec<String>,
        case_sensitive: bool,
    },
    /// Arbitrary user predicate
    Predicate,
    /// Delegates to a nested rule graph
    ChildRules,
}

/// A unit of behavior that inspects a property value and may record failures.
///
/// Implement [`validate`](Self::validate) for synchronous validators and
/// [`validate_async`](Self::validate_async) plus [`support`](Self::support)
/// for asynchronous ones. The default async path calls the sync one.
///
/// ## Example
///
/// ```rust,ignore
/// struct Even;
///
/// impl<T: Send + Sync + 'static> PropertyValidator<T, i64> for Even {
///     fn name(&self) -> &'static str {
///         "even"
///     }
///
///     fn default_message_template(&self) -> &'static str {
///         "'{PropertyName}' must be even."
///     }
///
///     fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, i64>) -> Result<()> {
///         if ctx.value() % 2 != 0 {
///             ctx.add_failure();
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PropertyValidator<T, P>: Send + Sync
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Validator identity, used as message key and default error code.
    fn name(&self) -> &'static str;

    /// Built-in message template used when nothing else is configured.
    fn default_message_template(&self) -> &'static str {
        "'{PropertyName}' is not valid."
    }

    fn capabilities(&self) -> Vec<Capability> {
        Vec::new()
    }

    fn support(&self) -> ExecutionSupport {
        ExecutionSupport::Sync
    }

    fn validate(&self, _ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        Err(EngineError::SyncNotSupported {
            validator: self.name().to_string(),
        })
    }

    async fn validate_async(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        self.validate(ctx)
    }
}
