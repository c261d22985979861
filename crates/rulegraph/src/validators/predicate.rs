//! Validators backed by user predicates.

use super::{Capability, ExecutionSupport, PropertyValidator};
use crate::error::Result;
use crate::execution::PropertyContext;
use async_trait::async_trait;
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

type Predicate<T, P> = Arc<dyn Fn(&T, &P) -> bool + Send + Sync>;
type AsyncPredicate<T, P> = Arc<dyn for<'a> Fn(&'a T, &'a P) -> BoxFuture<'a, bool> + Send + Sync>;

const PREDICATE_MESSAGE: &str = "The specified condition was not met for '{PropertyName}'.";

/// Fails when the predicate returns `false`.
pub struct PredicateValidator<T, P> {
    predicate: Predicate<T, P>,
}

impl<T, P> PredicateValidator<T, P> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T, &P) -> bool + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl<T, P> Clone for PredicateValidator<T, P> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T, P> fmt::Debug for PredicateValidator<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PredicateValidator")
    }
}

impl<T, P> PropertyValidator<T, P> for PredicateValidator<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "predicate"
    }

    fn default_message_template(&self) -> &'static str {
        PREDICATE_MESSAGE
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Predicate]
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        if !(self.predicate)(ctx.instance(), ctx.value()) {
            ctx.add_failure();
        }
        Ok(())
    }
}

/// Fails when the asynchronous predicate resolves to `false`.
///
/// Only runs on the asynchronous path; a synchronous run that reaches it is
/// rejected with [`EngineError::AsyncInSyncRun`](crate::EngineError::AsyncInSyncRun).
pub struct AsyncPredicateValidator<T, P> {
    predicate: AsyncPredicate<T, P>,
}

impl<T, P> AsyncPredicateValidator<T, P> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a P) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Arc::new(predicate),
        }
    }
}

impl<T, P> Clone for AsyncPredicateValidator<T, P> {
    fn clone(&self) -> Self {
        Self {
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T, P> fmt::Debug for AsyncPredicateValidator<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncPredicateValidator")
    }
}

#[async_trait]
impl<T, P> PropertyValidator<T, P> for AsyncPredicateValidator<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "async_predicate"
    }

    fn default_message_template(&self) -> &'static str {
        PREDICATE_MESSAGE
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::Predicate]
    }

    fn support(&self) -> ExecutionSupport {
        ExecutionSupport::Async
    }

    async fn validate_async(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        let instance = ctx.instance();
        let value = ctx.value();
        if !(self.predicate)(instance, value).await {
            ctx.add_failure();
        }
        Ok(())
    }
}
