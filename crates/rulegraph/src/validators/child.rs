//! Delegation of a property to a nested rule graph.

use super::{Capability, ExecutionSupport, PropertyValidator};
use crate::context::{RuleSetSelector, ValidationContext};
use crate::error::Result;
use crate::execution::{PropertyContext, COLLECTION_INDEX_KEY};
use crate::graph::RuleGraph;
use crate::message::COLLECTION_INDEX;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Property values that may hold a child instance.
pub trait ChildValue<C> {
    fn child(&self) -> Option<&C>;
}

impl<C> ChildValue<C> for C {
    fn child(&self) -> Option<&C> {
        Some(self)
    }
}

impl<C> ChildValue<C> for Option<C> {
    fn child(&self) -> Option<&C> {
        self.as_ref()
    }
}

impl<C> ChildValue<C> for Box<C> {
    fn child(&self) -> Option<&C> {
        Some(self.as_ref())
    }
}

impl<C> ChildValue<C> for Arc<C> {
    fn child(&self) -> Option<&C> {
        Some(self.as_ref())
    }
}

type GraphProvider<T, C> = Arc<dyn Fn(&T, &C) -> Arc<RuleGraph<C>> + Send + Sync>;

enum GraphSource<T, C> {
    Static(Arc<RuleGraph<C>>),
    Dynamic(GraphProvider<T, C>),
}

/// Runs a nested [`RuleGraph`] against the property value.
///
/// Failures of the nested graph land in the same result as the parent's,
/// with property names prefixed by the parent property's path. Absent
/// values are skipped.
pub struct ChildValidatorAdaptor<T, C> {
    source: GraphSource<T, C>,
    rule_sets: Option<Vec<String>>,
}

impl<T, C> ChildValidatorAdaptor<T, C>
where
    T: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    pub fn new(graph: Arc<RuleGraph<C>>) -> Self {
        Self {
            source: GraphSource::Static(graph),
            rule_sets: None,
        }
    }

    /// Choose the nested graph per parent instance and child value.
    pub fn from_provider<F>(provider: F) -> Self
    where
        F: Fn(&T, &C) -> Arc<RuleGraph<C>> + Send + Sync + 'static,
    {
        Self {
            source: GraphSource::Dynamic(Arc::new(provider)),
            rule_sets: None,
        }
    }

    /// Run the nested graph with these rule sets instead of the parent's.
    pub fn with_rule_sets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rule_sets = Some(names.into_iter().map(Into::into).collect());
        self
    }

    fn resolve(&self, instance: &T, child: &C) -> Arc<RuleGraph<C>> {
        match &self.source {
            GraphSource::Static(graph) => Arc::clone(graph),
            GraphSource::Dynamic(provider) => provider(instance, child),
        }
    }

    fn selector<P>(&self, ctx: &PropertyContext<'_, '_, T, P>) -> Arc<RuleSetSelector>
    where
        P: Send + Sync + 'static,
    {
        match &self.rule_sets {
            Some(names) => Arc::new(RuleSetSelector::named(names.iter().cloned())),
            None => ctx.selector(),
        }
    }
}

impl<T, C> fmt::Debug for ChildValidatorAdaptor<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            GraphSource::Static(_) => "static",
            GraphSource::Dynamic(_) => "dynamic",
        };
        f.debug_struct("ChildValidatorAdaptor")
            .field("source", &source)
            .field("rule_sets", &self.rule_sets)
            .finish()
    }
}

/// Nested call inputs derived from the parent binding.
struct NestedCall<C> {
    graph: Arc<RuleGraph<C>>,
    selector: Arc<RuleSetSelector>,
    path: Option<String>,
    index: Option<serde_json::Value>,
}

impl<T, C> ChildValidatorAdaptor<T, C>
where
    T: Send + Sync + 'static,
    C: Send + Sync + 'static,
{
    fn prepare<P>(&self, ctx: &PropertyContext<'_, '_, T, P>, child: &C) -> NestedCall<C>
    where
        P: Send + Sync + 'static,
    {
        let path = ctx.property_path();
        tracing::debug!(property = %path, "descending into child graph");
        NestedCall {
            graph: self.resolve(ctx.instance(), child),
            selector: self.selector(ctx),
            path: (!path.is_empty()).then(|| path.to_string()),
            index: ctx.formatter().placeholder(COLLECTION_INDEX).cloned(),
        }
    }
}

#[async_trait]
impl<T, C, P> PropertyValidator<T, P> for ChildValidatorAdaptor<T, C>
where
    T: Send + Sync + 'static,
    C: Send + Sync + 'static,
    P: ChildValue<C> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        "child"
    }

    fn capabilities(&self) -> Vec<Capability> {
        vec![Capability::ChildRules]
    }

    fn support(&self) -> ExecutionSupport {
        ExecutionSupport::Both
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        let Some(child) = ctx.value().child() else {
            return Ok(());
        };
        let call = self.prepare(ctx, child);
        let config = call.graph.config_arc();

        let mut scope = ctx.state_mut().scoped_ambient(COLLECTION_INDEX_KEY, call.index);
        let mut nested =
            ValidationContext::new(child, &mut *scope, call.selector, call.path, config);
        call.graph.run(&mut nested)
    }

    async fn validate_async(&self, ctx: &mut PropertyContext<'_, '_, T, P>) -> Result<()> {
        let Some(child) = ctx.value().child() else {
            return Ok(());
        };
        let call = self.prepare(ctx, child);
        let config = call.graph.config_arc();

        let mut scope = ctx.state_mut().scoped_ambient(COLLECTION_INDEX_KEY, call.index);
        scope.check_cancelled()?;
        let mut nested =
            ValidationContext::new(child, &mut *scope, call.selector, call.path, config);
        call.graph.run_async(&mut nested).await
    }
}
