//! Synchronous and asynchronous guards for rules and bindings.
//!
//! Composition is always "new AND old" with the new predicate evaluated
//! first; the older predicate is skipped when the new one returns false.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::fmt;
use std::sync::Arc;

type SyncPredicate<T> = dyn Fn(&T) -> bool + Send + Sync;
type AsyncPredicate<T> = dyn for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync;

/// Which bindings a guard applies to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ApplyConditionTo {
    /// Every binding already on the rule, and every dependent rule.
    #[default]
    AllValidators,
    /// Only the most recently added binding.
    CurrentValidator,
}

/// A synchronous predicate over the instance being validated.
pub struct Condition<T>(Arc<SyncPredicate<T>>);

impl<T> Condition<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub fn evaluate(&self, instance: &T) -> bool {
        (self.0)(instance)
    }

    /// Logical negation, used by `unless`.
    pub fn negate(self) -> Self
    where
        T: 'static,
    {
        let inner = self.0;
        Self(Arc::new(move |instance: &T| !inner(instance)))
    }

    /// Combine `self` (newly applied) with an existing condition.
    pub fn and_then_existing(self, existing: Option<Condition<T>>) -> Self
    where
        T: 'static,
    {
        match existing {
            None => self,
            Some(old) => {
                let new = self.0;
                let old = old.0;
                Self(Arc::new(move |instance: &T| new(instance) && old(instance)))
            }
        }
    }
}

impl<T> Clone for Condition<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Condition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Condition(..)")
    }
}

/// An asynchronous predicate over the instance being validated.
pub struct AsyncCondition<T>(Arc<AsyncPredicate<T>>);

impl<T> AsyncCondition<T> {
    pub fn new<F>(predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    pub async fn evaluate(&self, instance: &T) -> bool {
        (self.0)(instance).await
    }

    pub fn negate(self) -> Self
    where
        T: Sync + 'static,
    {
        let inner = self.0;
        Self::new(move |instance| {
            let inner = Arc::clone(&inner);
            async move { !inner(instance).await }.boxed()
        })
    }

    /// Combine `self` (newly applied) with an existing async condition.
    pub fn and_then_existing(self, existing: Option<AsyncCondition<T>>) -> Self
    where
        T: Sync + 'static,
    {
        match existing {
            None => self,
            Some(old) => {
                let new = self.0;
                let old = old.0;
                Self::new(move |instance| {
                    let new = Arc::clone(&new);
                    let old = Arc::clone(&old);
                    async move { new(instance).await && old(instance).await }.boxed()
                })
            }
        }
    }
}

impl<T> Clone for AsyncCondition<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for AsyncCondition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AsyncCondition(..)")
    }
}
