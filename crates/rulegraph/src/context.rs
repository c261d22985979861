//! Per-call validation state.
//!
//! A [`ValidationContext`] is created for every run of a [`RuleGraph`](crate::RuleGraph)
//! and for every nested graph invoked by a child adaptor. All contexts of one
//! call share a single [`RunState`]: the failure list, the ambient store, the
//! execution mode and the cancellation token.

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::failure::Failure;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Name of the implicit rule set.
pub const DEFAULT_RULE_SET: &str = "default";
/// Selects every rule regardless of membership.
pub const ALL_RULE_SETS: &str = "*";

/// Decides which rules run for a given rule-set selection.
///
/// Rule-set names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSetSelector {
    names: Option<Vec<String>>,
}

impl RuleSetSelector {
    /// Rules in the default set and rules without membership.
    pub fn default_rules() -> Self {
        Self::default()
    }

    pub fn named<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
        }
    }

    pub fn all() -> Self {
        Self::named([ALL_RULE_SETS])
    }

    /// Check whether a rule with the given membership runs.
    pub fn can_execute(&self, rule_sets: &[String]) -> bool {
        let is_default = |name: &String| name.eq_ignore_ascii_case(DEFAULT_RULE_SET);

        match &self.names {
            None => rule_sets.is_empty() || rule_sets.iter().any(is_default),
            Some(names) => {
                if names.iter().any(|n| n == ALL_RULE_SETS) {
                    return true;
                }
                if rule_sets.is_empty() {
                    return names.iter().any(is_default);
                }
                rule_sets
                    .iter()
                    .any(|set| names.iter().any(|n| n.eq_ignore_ascii_case(set)))
            }
        }
    }

    /// Selected names, `["default"]` when nothing was named.
    pub fn names(&self) -> Vec<String> {
        match &self.names {
            Some(names) => names.clone(),
            None => vec![DEFAULT_RULE_SET.to_string()],
        }
    }
}

/// Options for a single top-level validation call.
#[derive(Debug, Clone, Default)]
pub struct ValidateOptions {
    pub(crate) selector: RuleSetSelector,
    pub(crate) property_prefix: Option<String>,
    pub(crate) ambient: HashMap<String, Value>,
    pub(crate) cancellation: Option<CancellationToken>,
}

impl ValidateOptions {
    /// Create options that run the default rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run only the named rule sets. Include `"default"` to also run rules
    /// without membership.
    pub fn include_rule_sets<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selector = RuleSetSelector::named(names);
        self
    }

    /// Run every rule regardless of membership.
    pub fn include_all_rule_sets(mut self) -> Self {
        self.selector = RuleSetSelector::all();
        self
    }

    /// Prefix every failure path, e.g. `"request.body"`.
    pub fn property_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.property_prefix = Some(prefix.into());
        self
    }

    /// Seed the ambient store.
    pub fn ambient(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.ambient.insert(key.into(), value);
        self
    }

    /// Cancellation signal observed by asynchronous runs.
    pub fn cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// State shared by every context of one validation call.
#[derive(Debug, Default)]
pub struct RunState {
    failures: Vec<Failure>,
    ambient: HashMap<String, Value>,
    is_async: bool,
    cancellation: Option<CancellationToken>,
}

impl RunState {
    pub(crate) fn new(
        is_async: bool,
        ambient: HashMap<String, Value>,
        cancellation: Option<CancellationToken>,
    ) -> Self {
        Self {
            failures: Vec::new(),
            ambient,
            is_async,
            cancellation,
        }
    }

    pub fn is_async(&self) -> bool {
        self.is_async
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn ambient(&self, key: &str) -> Option<&Value> {
        self.ambient.get(key)
    }

    pub(crate) fn push_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    pub(crate) fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        match &self.cancellation {
            Some(token) if token.is_cancelled() => {
                tracing::debug!("validation run cancelled");
                Err(EngineError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    /// Set an ambient value until the returned scope is dropped.
    ///
    /// The previous value is restored, or the key removed if it was absent,
    /// on every exit path of the scope. A `None` value leaves the store
    /// untouched.
    pub(crate) fn scoped_ambient(&mut self, key: &str, value: Option<Value>) -> AmbientScope<'_> {
        let saved = value.map(|value| {
            let previous = self.ambient.insert(key.to_string(), value);
            (key.to_string(), previous)
        });
        AmbientScope { state: self, saved }
    }
}

/// Save-and-restore guard over one ambient key.
pub(crate) struct AmbientScope<'s> {
    state: &'s mut RunState,
    saved: Option<(String, Option<Value>)>,
}

impl Deref for AmbientScope<'_> {
    type Target = RunState;

    fn deref(&self) -> &RunState {
        &*self.state
    }
}

impl DerefMut for AmbientScope<'_> {
    fn deref_mut(&mut self) -> &mut RunState {
        &mut *self.state
    }
}

impl Drop for AmbientScope<'_> {
    fn drop(&mut self) {
        if let Some((key, previous)) = self.saved.take() {
            match previous {
                Some(value) => {
                    self.state.ambient.insert(key, value);
                }
                None => {
                    self.state.ambient.remove(&key);
                }
            }
        }
    }
}

/// Context for running one graph against one instance.
pub struct ValidationContext<'a, T> {
    instance: &'a T,
    state: &'a mut RunState,
    selector: Arc<RuleSetSelector>,
    property_chain: Option<String>,
    config: Arc<EngineConfig>,
}

impl<'a, T> ValidationContext<'a, T> {
    pub(crate) fn new(
        instance: &'a T,
        state: &'a mut RunState,
        selector: Arc<RuleSetSelector>,
        property_chain: Option<String>,
        config: Arc<EngineConfig>,
    ) -> Self {
        Self {
            instance,
            state,
            selector,
            property_chain,
            config,
        }
    }

    pub fn instance(&self) -> &'a T {
        self.instance
    }

    pub fn selector(&self) -> &RuleSetSelector {
        &self.selector
    }

    pub(crate) fn selector_arc(&self) -> &Arc<RuleSetSelector> {
        &self.selector
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_async(&self) -> bool {
        self.state.is_async
    }

    pub fn failures(&self) -> &[Failure] {
        &self.state.failures
    }

    pub fn failure_count(&self) -> usize {
        self.state.failures.len()
    }

    pub fn ambient(&self, key: &str) -> Option<&Value> {
        self.state.ambient(key)
    }

    /// Prefix applied to every property of this context, if any.
    pub fn property_chain(&self) -> Option<&str> {
        self.property_chain.as_deref()
    }

    /// Build the full path of a property of this context's instance.
    pub fn property_path(&self, name: &str) -> String {
        match self.property_chain.as_deref() {
            Some(prefix) if !prefix.is_empty() && !name.is_empty() => format!("{prefix}.{name}"),
            Some(prefix) if !prefix.is_empty() => prefix.to_string(),
            _ => name.to_string(),
        }
    }

    pub(crate) fn push_failure(&mut self, failure: Failure) {
        self.state.push_failure(failure);
    }

    pub(crate) fn state_mut(&mut self) -> &mut RunState {
        &mut *self.state
    }

    pub(crate) fn check_cancelled(&self) -> Result<()> {
        self.state.check_cancelled()
    }
}

impl<T> std::fmt::Debug for ValidationContext<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationContext")
            .field("selector", &self.selector)
            .field("property_chain", &self.property_chain)
            .field("is_async", &self.state.is_async)
            .field("failures", &self.state.failures.len())
            .finish()
    }
}
