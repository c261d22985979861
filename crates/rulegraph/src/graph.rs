//! The top-level rule graph and its fluent builder.

use crate::binding::ValidatorOptions;
use crate::condition::{ApplyConditionTo, AsyncCondition, Condition};
use crate::config::EngineConfig;
use crate::context::{RunState, ValidateOptions, ValidationContext};
use crate::descriptor::RuleDescriptor;
use crate::error::Result;
use crate::execution::MessageBuilderContext;
use crate::failure::{Failure, Severity, ValidationResult};
use crate::rule::{CascadeMode, PropertyRule, ValidationRule};
use crate::validators::{
    AsyncPredicateValidator, ChildValidatorAdaptor, ChildValue, Emptiness, LengthValidator,
    NotEmptyValidator, PredicateValidator, PropertyValidator, StringEnumValidator, TextValue,
};
use futures_util::future::BoxFuture;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Ordered rules for one target type.
///
/// Built once, then run any number of times, synchronously or
/// asynchronously. Graphs are `Send + Sync` and can be shared behind an
/// [`Arc`], which is also how a graph is nested into another one.
///
/// ## Example
///
/// ```rust,ignore
/// use rulegraph::prelude::*;
///
/// struct Signup {
///     username: String,
///     email: Option<String>,
/// }
///
/// let mut graph = RuleGraph::<Signup>::new();
/// graph
///     .rule_for("username", |s: &Signup| s.username.clone())
///     .not_empty()
///     .length(3, 20)?;
/// graph
///     .rule_for("email", |s: &Signup| s.email.clone())
///     .not_empty()
///     .with_error_code("EMAIL_REQUIRED");
///
/// let result = graph.validate(&signup)?;
/// assert!(result.is_valid());
/// ```
pub struct RuleGraph<T> {
    rules: Vec<Box<dyn ValidationRule<T>>>,
    config: Arc<EngineConfig>,
}

impl<T> RuleGraph<T>
where
    T: Send + Sync + 'static,
{
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an empty graph using `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self::with_shared_config(Arc::new(config))
    }

    /// Create an empty graph sharing an existing configuration.
    pub fn with_shared_config(config: Arc<EngineConfig>) -> Self {
        Self {
            rules: Vec::new(),
            config,
        }
    }

    /// Get the graph's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn config_arc(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.config)
    }

    /// Get the rules in declaration order.
    pub fn rules(&self) -> &[Box<dyn ValidationRule<T>>] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Add a rule built outside the fluent builder.
    pub fn add_rule(&mut self, rule: impl ValidationRule<T> + 'static) {
        self.add_boxed_rule(Box::new(rule));
    }

    /// Add a boxed rule, applying this graph's configuration to it.
    pub fn add_boxed_rule(&mut self, mut rule: Box<dyn ValidationRule<T>>) {
        rule.configure(&self.config);
        self.rules.push(rule);
    }

    /// Start a rule for one property. The rule joins the graph when the
    /// builder is dropped.
    pub fn rule_for<P, F>(&mut self, property_name: &str, accessor: F) -> RuleBuilder<'_, T, P>
    where
        P: Send + Sync + 'static,
        F: Fn(&T) -> P + Send + Sync + 'static,
    {
        RuleBuilder::new(self, PropertyRule::new(property_name, accessor))
    }

    /// Start a rule applied to every element of a collection.
    pub fn rule_for_each<E, F>(&mut self, property_name: &str, accessor: F) -> RuleBuilder<'_, T, E>
    where
        E: Send + Sync + 'static,
        F: Fn(&T) -> Vec<E> + Send + Sync + 'static,
    {
        RuleBuilder::new(self, PropertyRule::for_each(property_name, accessor))
    }

    /// Rules added inside `define` join the named rule sets, unless they
    /// already declare their own.
    pub fn rule_set<I, S, F>(&mut self, names: I, define: F) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Self),
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        let start = self.rules.len();
        define(self);
        for rule in &mut self.rules[start..] {
            if rule.rule_sets().is_empty() {
                rule.set_rule_sets(names.clone());
            }
        }
        self
    }

    /// Rules added inside `define` only run when `predicate` holds.
    pub fn when<C, F>(&mut self, predicate: C, define: F) -> &mut Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut Self),
    {
        self.shared_condition(Condition::new(predicate), define)
    }

    /// Rules added inside `define` only run when `predicate` does not hold.
    pub fn unless<C, F>(&mut self, predicate: C, define: F) -> &mut Self
    where
        C: Fn(&T) -> bool + Send + Sync + 'static,
        F: FnOnce(&mut Self),
    {
        self.shared_condition(Condition::new(predicate).negate(), define)
    }

    /// Rules added inside `define` only run when the async `predicate` holds.
    pub fn when_async<C, F>(&mut self, predicate: C, define: F) -> &mut Self
    where
        C: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
        F: FnOnce(&mut Self),
    {
        let condition = AsyncCondition::new(predicate);
        let start = self.rules.len();
        define(self);
        for rule in &mut self.rules[start..] {
            rule.apply_shared_async_condition(condition.clone());
        }
        self
    }

    /// Rules added inside `define` only run when the async `predicate` does not hold.
    pub fn unless_async<C, F>(&mut self, predicate: C, define: F) -> &mut Self
    where
        C: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
        F: FnOnce(&mut Self),
    {
        let condition = AsyncCondition::new(predicate).negate();
        let start = self.rules.len();
        define(self);
        for rule in &mut self.rules[start..] {
            rule.apply_shared_async_condition(condition.clone());
        }
        self
    }

    fn shared_condition<F>(&mut self, condition: Condition<T>, define: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        let start = self.rules.len();
        define(self);
        for rule in &mut self.rules[start..] {
            rule.apply_shared_condition(condition.clone());
        }
        self
    }

    /// Validate synchronously with the default rule set.
    pub fn validate(&self, instance: &T) -> Result<ValidationResult> {
        self.validate_with(instance, ValidateOptions::default())
    }

    /// Validate synchronously.
    ///
    /// Fails with [`EngineError::AsyncInSyncRun`](crate::EngineError::AsyncInSyncRun)
    /// when a selected rule needs the asynchronous path. The cancellation
    /// token, if any, is ignored.
    pub fn validate_with(
        &self,
        instance: &T,
        options: ValidateOptions,
    ) -> Result<ValidationResult> {
        let ValidateOptions {
            selector,
            property_prefix,
            ambient,
            ..
        } = options;
        let rule_sets = selector.names();
        let mut state = RunState::new(false, ambient, None);

        tracing::debug!(
            rules = self.rules.len(),
            rule_sets = ?rule_sets,
            "sync validation started"
        );
        let mut ctx = ValidationContext::new(
            instance,
            &mut state,
            Arc::new(selector),
            property_prefix,
            self.config_arc(),
        );
        self.run(&mut ctx)?;

        Ok(self.finish(state, rule_sets))
    }

    /// Validate asynchronously with the default rule set.
    pub async fn validate_async(&self, instance: &T) -> Result<ValidationResult> {
        self.validate_async_with(instance, ValidateOptions::default()).await
    }

    /// Validate asynchronously.
    ///
    /// Cancellation is observed before every rule, binding, dependent rule
    /// and nested graph, and surfaces as
    /// [`EngineError::Cancelled`](crate::EngineError::Cancelled).
    pub async fn validate_async_with(
        &self,
        instance: &T,
        options: ValidateOptions,
    ) -> Result<ValidationResult> {
        let ValidateOptions {
            selector,
            property_prefix,
            ambient,
            cancellation,
        } = options;
        let rule_sets = selector.names();
        let mut state = RunState::new(true, ambient, cancellation);

        tracing::debug!(
            rules = self.rules.len(),
            rule_sets = ?rule_sets,
            "async validation started"
        );
        let mut ctx = ValidationContext::new(
            instance,
            &mut state,
            Arc::new(selector),
            property_prefix,
            self.config_arc(),
        );
        self.run_async(&mut ctx).await?;
        state.check_cancelled()?;

        Ok(self.finish(state, rule_sets))
    }

    pub(crate) fn run(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()> {
        for rule in &self.rules {
            rule.validate(ctx)?;
        }
        Ok(())
    }

    pub(crate) async fn run_async(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()> {
        for rule in &self.rules {
            ctx.check_cancelled()?;
            rule.validate_async(ctx).await?;
        }
        Ok(())
    }

    fn finish(&self, state: RunState, rule_sets: Vec<String>) -> ValidationResult {
        let mut result = ValidationResult::new(state.into_failures());
        result.rule_sets_executed = rule_sets;
        tracing::debug!(failures = result.len(), "validation finished");
        result
    }

    /// Describe every rule, resolving codes and templates against this
    /// graph's configuration.
    pub fn describe(&self) -> Vec<RuleDescriptor> {
        self.rules.iter().map(|rule| rule.describe(&self.config)).collect()
    }
}

impl<T> Default for RuleGraph<T>
where
    T: Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for RuleGraph<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleGraph")
            .field("rules", &self.rules.len())
            .field("config", &self.config)
            .finish()
    }
}

/// Fluent configuration of one rule.
///
/// Option setters (`with_*`) target the most recently added validator.
/// Guards (`when`, `unless` and their async forms) apply to every validator
/// added so far, or only to the latest one with the `*_current` variants.
pub struct RuleBuilder<'g, T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    graph: &'g mut RuleGraph<T>,
    rule: Option<PropertyRule<T, P>>,
}

impl<'g, T, P> RuleBuilder<'g, T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn new(graph: &'g mut RuleGraph<T>, rule: PropertyRule<T, P>) -> Self {
        Self {
            graph,
            rule: Some(rule),
        }
    }

    fn with_rule(mut self, configure: impl FnOnce(&mut PropertyRule<T, P>)) -> Self {
        if let Some(rule) = self.rule.as_mut() {
            configure(rule);
        }
        self
    }

    fn with_current(
        self,
        configure: impl FnOnce(ValidatorOptions<T, P>) -> ValidatorOptions<T, P>,
    ) -> Self {
        self.with_rule(|rule| {
            if let Some(binding) = rule.current_binding_mut() {
                let options = std::mem::take(binding.options_mut());
                *binding.options_mut() = configure(options);
            }
        })
    }

    /// Drop the rule instead of adding it, then report the setup error.
    fn discard<E>(mut self, error: E) -> std::result::Result<Self, E> {
        self.rule = None;
        Err(error)
    }

    /// Add a validator with default options.
    pub fn validator(self, validator: impl PropertyValidator<T, P> + 'static) -> Self {
        self.validator_with(validator, ValidatorOptions::default())
    }

    /// Add a validator with explicit options.
    pub fn validator_with(
        self,
        validator: impl PropertyValidator<T, P> + 'static,
        options: ValidatorOptions<T, P>,
    ) -> Self {
        self.with_rule(|rule| rule.add_validator(validator, options))
    }

    /// Delegate to a nested graph.
    pub fn set_validator<C>(self, graph: Arc<RuleGraph<C>>) -> Self
    where
        C: Send + Sync + 'static,
        P: ChildValue<C>,
    {
        self.validator(ChildValidatorAdaptor::<T, C>::new(graph))
    }

    /// Delegate to a nested graph chosen per instance and value.
    pub fn set_validator_fn<C, F>(self, provider: F) -> Self
    where
        C: Send + Sync + 'static,
        P: ChildValue<C>,
        F: Fn(&T, &C) -> Arc<RuleGraph<C>> + Send + Sync + 'static,
    {
        self.validator(ChildValidatorAdaptor::<T, C>::from_provider(provider))
    }

    /// Set the message template of the latest validator.
    pub fn with_message(self, template: impl Into<String>) -> Self {
        let template = template.into();
        self.with_current(|options| options.with_message(template))
    }

    /// Build the latest validator's message template per instance.
    pub fn with_message_fn<F>(self, factory: F) -> Self
    where
        F: Fn(&T, &P) -> String + Send + Sync + 'static,
    {
        self.with_current(|options| options.with_message_fn(factory))
    }

    /// Set the error code of the latest validator.
    pub fn with_error_code(self, code: impl Into<String>) -> Self {
        let code = code.into();
        self.with_current(|options| options.with_error_code(code))
    }

    /// Set the severity of the latest validator.
    pub fn with_severity(self, severity: Severity) -> Self {
        self.with_current(|options| options.with_severity(severity))
    }

    /// Compute the latest validator's severity per instance.
    pub fn with_severity_fn<F>(self, provider: F) -> Self
    where
        F: Fn(&T, &P) -> Severity + Send + Sync + 'static,
    {
        self.with_current(|options| options.with_severity_fn(provider))
    }

    /// Attach custom state to failures of the latest validator.
    pub fn with_state<F>(self, provider: F) -> Self
    where
        F: Fn(&T, &P) -> Value + Send + Sync + 'static,
    {
        self.with_current(|options| options.with_state(provider))
    }

    /// Run the validators added so far only when `predicate` holds.
    pub fn when<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.when_with(predicate, ApplyConditionTo::AllValidators)
    }

    /// Run the latest validator only when `predicate` holds.
    pub fn when_current<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.when_with(predicate, ApplyConditionTo::CurrentValidator)
    }

    /// Guard validators in `scope` with `predicate`.
    pub fn when_with<F>(self, predicate: F, scope: ApplyConditionTo) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.apply_condition(Condition::new(predicate), scope))
    }

    /// Skip the validators added so far when `predicate` holds.
    pub fn unless<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.unless_with(predicate, ApplyConditionTo::AllValidators)
    }

    /// Skip the latest validator when `predicate` holds.
    pub fn unless_current<F>(self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.unless_with(predicate, ApplyConditionTo::CurrentValidator)
    }

    /// Skip validators in `scope` when `predicate` holds.
    pub fn unless_with<F>(self, predicate: F, scope: ApplyConditionTo) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.apply_condition(Condition::new(predicate).negate(), scope))
    }

    /// Async form of [`Self::when`]. Makes the rule async-only.
    pub fn when_async<F>(self, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.when_async_with(predicate, ApplyConditionTo::AllValidators)
    }

    /// Async form of [`Self::when_with`].
    pub fn when_async_with<F>(self, predicate: F, scope: ApplyConditionTo) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.apply_async_condition(AsyncCondition::new(predicate), scope))
    }

    /// Async form of [`Self::unless`]. Makes the rule async-only.
    pub fn unless_async<F>(self, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.unless_async_with(predicate, ApplyConditionTo::AllValidators)
    }

    /// Async form of [`Self::unless_with`].
    pub fn unless_async_with<F>(self, predicate: F, scope: ApplyConditionTo) -> Self
    where
        F: for<'a> Fn(&'a T) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        let condition = AsyncCondition::new(predicate).negate();
        self.with_rule(|rule| rule.apply_async_condition(condition, scope))
    }

    /// Set this rule's cascade mode.
    pub fn cascade(self, mode: CascadeMode) -> Self {
        self.with_rule(|rule| rule.set_cascade_mode(mode))
    }

    /// Override the display name used in messages.
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let name = name.into();
        self.with_rule(|rule| rule.set_display_name(name))
    }

    /// Compute the display name per instance.
    pub fn with_name_fn<F>(self, factory: F) -> Self
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.set_display_name_fn(factory))
    }

    /// Call `callback` for every failure this rule records.
    pub fn on_failure<F>(self, callback: F) -> Self
    where
        F: Fn(&T, &Failure) + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.set_on_failure(callback))
    }

    /// Replace message construction for every failure of this rule.
    pub fn with_message_builder<F>(self, builder: F) -> Self
    where
        F: Fn(&MessageBuilderContext<'_, T, P>) -> String + Send + Sync + 'static,
    {
        self.with_rule(|rule| rule.set_message_builder(builder))
    }

    /// Rules defined in `define` run after this rule's validators.
    pub fn dependent_rules<F>(self, define: F) -> Self
    where
        F: FnOnce(&mut RuleGraph<T>),
    {
        let mut scratch = RuleGraph::with_shared_config(self.graph.config_arc());
        define(&mut scratch);
        let rules = std::mem::take(&mut scratch.rules);
        self.with_rule(|rule| rule.add_dependent_rules(rules))
    }
}

impl<T, P> RuleBuilder<'_, T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Fail when `predicate` returns `false`.
    pub fn must<F>(self, predicate: F) -> Self
    where
        F: Fn(&T, &P) -> bool + Send + Sync + 'static,
    {
        self.validator(PredicateValidator::new(predicate))
    }

    /// Fail when the async `predicate` resolves to `false`. Async runs only.
    pub fn must_async<F>(self, predicate: F) -> Self
    where
        F: for<'a> Fn(&'a T, &'a P) -> BoxFuture<'a, bool> + Send + Sync + 'static,
    {
        self.validator(AsyncPredicateValidator::new(predicate))
    }

    /// Fail for absent values, blank text and empty collections.
    pub fn not_empty(self) -> Self
    where
        P: Emptiness,
    {
        self.validator(NotEmptyValidator::new())
    }
}

impl<T, P> RuleBuilder<'_, T, P>
where
    T: Send + Sync + 'static,
    P: Serialize + Send + Sync + 'static,
{
    /// Record the value on failures, as the attempted value and the
    /// `{PropertyValue}` placeholder.
    pub fn capture_values(self) -> Self {
        self.with_rule(PropertyRule::capture_values)
    }

    fn capture_values_once(self) -> Self {
        self.with_rule(|rule| {
            if !rule.captures_values() {
                rule.capture_values();
            }
        })
    }
}

impl<T, P> RuleBuilder<'_, T, P>
where
    T: Send + Sync + 'static,
    P: TextValue + Serialize + Send + Sync + 'static,
{
    /// Fails the setup, and drops the rule, when `max < min`.
    pub fn length(self, min: usize, max: usize) -> Result<Self> {
        match LengthValidator::new(min, max) {
            Ok(validator) => Ok(self.capture_values_once().validator(validator)),
            Err(err) => self.discard(err),
        }
    }

    /// At least `min` characters.
    pub fn min_length(self, min: usize) -> Self {
        self.capture_values_once()
            .validator(LengthValidator::min_length(min))
    }

    /// At most `max` characters.
    pub fn max_length(self, max: usize) -> Self {
        self.capture_values_once()
            .validator(LengthValidator::max_length(max))
    }

    /// Exactly `length` characters.
    pub fn exact_length(self, length: usize) -> Self {
        self.capture_values_once()
            .validator(LengthValidator::exact(length))
    }

    /// One of `names`. Fails the setup, and drops the rule, when `names`
    /// is empty.
    pub fn is_enum_name<I, S>(self, names: I, case_sensitive: bool) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match StringEnumValidator::new(names, case_sensitive) {
            Ok(validator) => Ok(self.capture_values_once().validator(validator)),
            Err(err) => self.discard(err),
        }
    }
}

impl<T, P> Drop for RuleBuilder<'_, T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn drop(&mut self) {
        if let Some(rule) = self.rule.take() {
            self.graph.add_rule(rule);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ValidateOptions;
    use crate::error::EngineError;

    #[derive(Debug)]
    struct Account {
        username: String,
        role: String,
    }

    fn account(username: &str, role: &str) -> Account {
        Account {
            username: username.to_string(),
            role: role.to_string(),
        }
    }

    #[test]
    fn builder_adds_rule_on_drop() {
        let mut graph = RuleGraph::<Account>::new();
        graph
            .rule_for("username", |a: &Account| a.username.clone())
            .not_empty();
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn setup_error_drops_rule() {
        let mut graph = RuleGraph::<Account>::new();
        let err = graph
            .rule_for("username", |a: &Account| a.username.clone())
            .length(5, 2)
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidArgument { .. }));
        assert!(graph.is_empty());
    }

    #[test]
    fn options_target_last_validator() {
        let mut graph = RuleGraph::<Account>::new();
        graph
            .rule_for("username", |a: &Account| a.username.clone())
            .not_empty()
            .with_error_code("REQUIRED")
            .max_length(3)
            .with_error_code("TOO_LONG");

        let result = graph.validate(&account("abcdef", "admin")).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.failures[0].error_code.as_deref(), Some("TOO_LONG"));
    }

    #[test]
    fn rule_set_membership_applies_to_rules_inside() {
        let mut graph = RuleGraph::<Account>::new();
        graph.rule_set(["admin"], |g| {
            g.rule_for("role", |a: &Account| a.role.clone())
                .is_enum_name(["admin", "owner"], true)
                .unwrap();
        });
        graph
            .rule_for("username", |a: &Account| a.username.clone())
            .not_empty();

        let invalid = account("", "guest");
        let defaults = graph.validate(&invalid).unwrap();
        assert_eq!(defaults.property_names(), vec!["username"]);

        let admin = graph
            .validate_with(&invalid, ValidateOptions::new().include_rule_sets(["ADMIN"]))
            .unwrap();
        assert_eq!(admin.property_names(), vec!["role"]);

        let all = graph
            .validate_with(&invalid, ValidateOptions::new().include_all_rule_sets())
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn shared_condition_gates_rules() {
        let mut graph = RuleGraph::<Account>::new();
        graph.when(
            |a: &Account| a.role == "admin",
            |g| {
                g.rule_for("username", |a: &Account| a.username.clone())
                    .min_length(5);
            },
        );

        assert!(graph.validate(&account("bob", "guest")).unwrap().is_valid());
        assert!(!graph.validate(&account("bob", "admin")).unwrap().is_valid());
    }

    #[test]
    fn describe_reports_bindings() {
        let mut graph = RuleGraph::<Account>::new();
        graph
            .rule_for("username", |a: &Account| a.username.clone())
            .not_empty()
            .length(2, 10)
            .unwrap();

        let described = graph.describe();
        assert_eq!(described.len(), 1);
        let rule = &described[0];
        assert_eq!(rule.display_name, "Username");
        let names: Vec<&str> = rule.validators.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["not_empty", "length"]);
        assert!(rule
            .capability(|c| {
                matches!(c, crate::validators::Capability::Length { min: 2, max: Some(10) })
            })
            .is_some());
    }
}
