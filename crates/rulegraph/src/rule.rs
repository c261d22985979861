//! Rules: one property accessor and its ordered validator bindings.
//!
//! A rule is executed per instance in three steps:
//!
//! 1. The rule-level condition is evaluated. When it fails, the rule and its
//!    dependent rules are skipped.
//! 2. Bindings run in insertion order. A binding whose own condition fails
//!    is skipped without affecting the cascade. Under
//!    [`CascadeMode::StopOnFirstFailure`] the first binding that records a
//!    failure ends the chain.
//! 3. Dependent rules run in order, sharing the same context.

use crate::binding::{ValidatorBinding, ValidatorOptions};
use crate::condition::{ApplyConditionTo, AsyncCondition, Condition};
use crate::config::EngineConfig;
use crate::context::ValidationContext;
use crate::descriptor::{RuleDescriptor, ValidatorDescriptor};
use crate::error::{EngineError, Result};
use crate::execution::{
    Accessor, MessageBuilder, MessageBuilderContext, OnFailure, PropertyContext, PropertyValue,
    RuleHooks, ValueRenderer,
};
use crate::failure::Failure;
use crate::validators::PropertyValidator;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Whether a rule keeps running validators after one fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeMode {
    #[default]
    Continue,
    StopOnFirstFailure,
}

/// Object-safe view of a rule, used by graphs and dependent-rule lists.
#[async_trait]
pub trait ValidationRule<T>: Send + Sync
where
    T: Send + Sync + 'static,
{
    /// Identifier of the validated property.
    fn property_name(&self) -> &str;

    /// Display name for messages. Works without an instance.
    fn display_name(&self, instance: Option<&T>) -> String;

    fn rule_sets(&self) -> &[String];

    /// Replace this rule's membership. Dependent rules without their own
    /// membership follow.
    fn set_rule_sets(&mut self, rule_sets: Vec<String>);

    fn apply_condition(&mut self, condition: Condition<T>, scope: ApplyConditionTo);

    fn apply_async_condition(&mut self, condition: AsyncCondition<T>, scope: ApplyConditionTo);

    /// AND a condition into the rule-level guard.
    fn apply_shared_condition(&mut self, condition: Condition<T>);

    fn apply_shared_async_condition(&mut self, condition: AsyncCondition<T>);

    /// Called once when the rule joins a graph.
    fn configure(&mut self, config: &EngineConfig);

    fn describe(&self, config: &EngineConfig) -> RuleDescriptor;

    fn validate(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()>;

    async fn validate_async(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()>;
}

type DisplayNameFactory<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;
type ElementsAccessor<T, E> = dyn Fn(&T) -> Vec<E> + Send + Sync;

enum Target<T, P> {
    Single(Box<Accessor<T, P>>),
    Each(Box<ElementsAccessor<T, P>>),
}

/// A rule over one property of `T` whose validators see values of type `P`.
///
/// Built with [`PropertyRule::new`] for a single value or
/// [`PropertyRule::for_each`] for every element of a collection. Collection
/// elements are validated under `name[index]` and carry a `CollectionIndex`
/// placeholder.
pub struct PropertyRule<T, P> {
    property_name: String,
    target: Target<T, P>,
    derived_name: String,
    display_name: Option<String>,
    display_name_factory: Option<DisplayNameFactory<T>>,
    cascade: Option<CascadeMode>,
    bindings: Vec<ValidatorBinding<T, P>>,
    rule_sets: Vec<String>,
    condition: Option<Condition<T>>,
    async_condition: Option<AsyncCondition<T>>,
    dependent_rules: Vec<Box<dyn ValidationRule<T>>>,
    hooks: RuleHooks<T, P>,
}

impl<T, P> PropertyRule<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Rule applied to the value returned by `accessor`.
    pub fn new<F>(property_name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> P + Send + Sync + 'static,
    {
        Self::with_target(property_name.into(), Target::Single(Box::new(accessor)))
    }

    /// Rule applied to every element returned by `accessor`.
    pub fn for_each<F>(property_name: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> Vec<P> + Send + Sync + 'static,
    {
        Self::with_target(property_name.into(), Target::Each(Box::new(accessor)))
    }

    fn with_target(property_name: String, target: Target<T, P>) -> Self {
        Self {
            derived_name: humanize(&property_name),
            property_name,
            target,
            display_name: None,
            display_name_factory: None,
            cascade: None,
            bindings: Vec::new(),
            rule_sets: Vec::new(),
            condition: None,
            async_condition: None,
            dependent_rules: Vec::new(),
            hooks: RuleHooks::default(),
        }
    }

    pub fn is_collection(&self) -> bool {
        matches!(self.target, Target::Each(_))
    }

    /// Append a validator binding.
    pub fn add_validator(
        &mut self,
        validator: impl PropertyValidator<T, P> + 'static,
        options: ValidatorOptions<T, P>,
    ) {
        self.bindings.push(ValidatorBinding::new(validator, options));
    }

    pub fn bindings(&self) -> &[ValidatorBinding<T, P>] {
        &self.bindings
    }

    /// The most recently added binding.
    pub fn current_binding_mut(&mut self) -> Option<&mut ValidatorBinding<T, P>> {
        self.bindings.last_mut()
    }

    /// Override the derived display name.
    pub fn set_display_name(&mut self, name: impl Into<String>) {
        self.display_name = Some(name.into());
    }

    pub fn set_display_name_fn<F>(&mut self, factory: F)
    where
        F: Fn(&T) -> String + Send + Sync + 'static,
    {
        self.display_name_factory = Some(Arc::new(factory));
    }

    pub fn set_cascade_mode(&mut self, mode: CascadeMode) {
        self.cascade = Some(mode);
    }

    /// This rule's mode, else the configured default.
    pub fn cascade_mode(&self, config: &EngineConfig) -> CascadeMode {
        self.cascade.unwrap_or_else(|| config.cascade_mode())
    }

    /// Call `callback` for every failure this rule records.
    pub fn set_on_failure<F>(&mut self, callback: F)
    where
        F: Fn(&T, &Failure) + Send + Sync + 'static,
    {
        let callback: OnFailure<T> = Arc::new(callback);
        self.hooks.on_failure = Some(callback);
    }

    /// Replace message construction for every failure of this rule.
    pub fn set_message_builder<F>(&mut self, builder: F)
    where
        F: Fn(&MessageBuilderContext<'_, T, P>) -> String + Send + Sync + 'static,
    {
        let builder: MessageBuilder<T, P> = Arc::new(builder);
        self.hooks.message_builder = Some(builder);
    }

    /// Convert values into the attempted value and `{PropertyValue}` of
    /// this rule's failures.
    pub fn set_value_renderer<F>(&mut self, renderer: F)
    where
        F: Fn(&P) -> Option<serde_json::Value> + Send + Sync + 'static,
    {
        let renderer: ValueRenderer<P> = Arc::new(renderer);
        self.hooks.value_renderer = Some(renderer);
    }

    pub fn captures_values(&self) -> bool {
        self.hooks.value_renderer.is_some()
    }

    /// Append dependent rules. When this rule has rule-set membership, every
    /// dependent rule without its own membership inherits it.
    pub fn add_dependent_rules<I>(&mut self, rules: I)
    where
        I: IntoIterator<Item = Box<dyn ValidationRule<T>>>,
    {
        for mut rule in rules {
            if !self.rule_sets.is_empty() && rule.rule_sets().is_empty() {
                rule.set_rule_sets(self.rule_sets.clone());
            }
            self.dependent_rules.push(rule);
        }
    }

    pub fn dependent_rules(&self) -> &[Box<dyn ValidationRule<T>>] {
        &self.dependent_rules
    }

    /// Record values through their `Serialize` impl.
    pub fn capture_values(&mut self)
    where
        P: Serialize,
    {
        self.set_value_renderer(|value: &P| serde_json::to_value(value).ok());
    }

    fn run_bindings(
        &self,
        ctx: &mut ValidationContext<'_, T>,
        value: PropertyValue<'_, T, P>,
        path: &str,
        display_name: &str,
        collection_index: Option<usize>,
        cascade: CascadeMode,
    ) -> Result<()> {
        for binding in &self.bindings {
            let validator = binding.validator();
            if binding.should_validate_asynchronously(false) {
                return Err(EngineError::async_in_sync(path, validator.name()));
            }
            if !binding.passes_condition(ctx.instance()) {
                tracing::trace!(
                    property = %path,
                    validator = validator.name(),
                    "binding skipped by condition"
                );
                continue;
            }

            let before = ctx.failure_count();
            let mut property_ctx = PropertyContext::new(
                ctx,
                binding,
                &self.hooks,
                value,
                path,
                display_name,
                collection_index,
            );
            validator.validate(&mut property_ctx)?;

            if cascade == CascadeMode::StopOnFirstFailure && ctx.failure_count() > before {
                tracing::debug!(property = %path, validator = validator.name(), "cascade stopped");
                break;
            }
        }
        Ok(())
    }

    async fn run_bindings_async(
        &self,
        ctx: &mut ValidationContext<'_, T>,
        value: PropertyValue<'_, T, P>,
        path: &str,
        display_name: &str,
        collection_index: Option<usize>,
        cascade: CascadeMode,
    ) -> Result<()> {
        for binding in &self.bindings {
            ctx.check_cancelled()?;
            let validator = binding.validator();
            let instance = ctx.instance();
            let passes = binding.passes_condition(instance)
                && binding.passes_async_condition(instance).await;
            if !passes {
                tracing::trace!(
                    property = %path,
                    validator = validator.name(),
                    "binding skipped by condition"
                );
                continue;
            }

            let before = ctx.failure_count();
            let mut property_ctx = PropertyContext::new(
                ctx,
                binding,
                &self.hooks,
                value,
                path,
                display_name,
                collection_index,
            );
            if binding.should_validate_asynchronously(true) {
                validator.validate_async(&mut property_ctx).await?;
            } else {
                validator.validate(&mut property_ctx)?;
            }

            if cascade == CascadeMode::StopOnFirstFailure && ctx.failure_count() > before {
                tracing::debug!(property = %path, validator = validator.name(), "cascade stopped");
                break;
            }
        }
        Ok(())
    }

    fn element_path(&self, ctx: &ValidationContext<'_, T>, index: usize) -> String {
        ctx.property_path(&format!("{}[{}]", self.property_name, index))
    }
}

#[async_trait]
impl<T, P> ValidationRule<T> for PropertyRule<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn property_name(&self) -> &str {
        &self.property_name
    }

    fn display_name(&self, instance: Option<&T>) -> String {
        if let (Some(factory), Some(instance)) = (&self.display_name_factory, instance) {
            return factory(instance);
        }
        self.display_name
            .clone()
            .unwrap_or_else(|| self.derived_name.clone())
    }

    fn rule_sets(&self) -> &[String] {
        &self.rule_sets
    }

    fn set_rule_sets(&mut self, rule_sets: Vec<String>) {
        for dependent in &mut self.dependent_rules {
            if dependent.rule_sets().is_empty() {
                dependent.set_rule_sets(rule_sets.clone());
            }
        }
        self.rule_sets = rule_sets;
    }

    fn apply_condition(&mut self, condition: Condition<T>, scope: ApplyConditionTo) {
        match scope {
            ApplyConditionTo::AllValidators => {
                for binding in &mut self.bindings {
                    binding.apply_condition(condition.clone());
                }
                for dependent in &mut self.dependent_rules {
                    dependent.apply_condition(condition.clone(), scope);
                }
            }
            ApplyConditionTo::CurrentValidator => {
                if let Some(binding) = self.bindings.last_mut() {
                    binding.apply_condition(condition);
                }
            }
        }
    }

    fn apply_async_condition(&mut self, condition: AsyncCondition<T>, scope: ApplyConditionTo) {
        match scope {
            ApplyConditionTo::AllValidators => {
                for binding in &mut self.bindings {
                    binding.apply_async_condition(condition.clone());
                }
                for dependent in &mut self.dependent_rules {
                    dependent.apply_async_condition(condition.clone(), scope);
                }
            }
            ApplyConditionTo::CurrentValidator => {
                if let Some(binding) = self.bindings.last_mut() {
                    binding.apply_async_condition(condition);
                }
            }
        }
    }

    fn apply_shared_condition(&mut self, condition: Condition<T>) {
        self.condition = Some(condition.and_then_existing(self.condition.take()));
    }

    fn apply_shared_async_condition(&mut self, condition: AsyncCondition<T>) {
        self.async_condition = Some(condition.and_then_existing(self.async_condition.take()));
    }

    fn configure(&mut self, config: &EngineConfig) {
        let container = std::any::type_name::<T>();
        if let Some(name) = config.resolve_display_name(container, &self.property_name) {
            self.derived_name = name;
        }
        for dependent in &mut self.dependent_rules {
            dependent.configure(config);
        }
    }

    fn describe(&self, config: &EngineConfig) -> RuleDescriptor {
        let validators = self
            .bindings
            .iter()
            .map(|binding| {
                let validator = binding.validator();
                ValidatorDescriptor {
                    name: validator.name().to_string(),
                    error_code: binding.error_code(config),
                    message_template: binding.raw_message_template(config),
                    capabilities: validator.capabilities(),
                    support: validator.support(),
                    requires_async: self.async_condition.is_some()
                        || binding.should_validate_asynchronously(false),
                    has_condition: binding.options().has_condition(),
                }
            })
            .collect();

        RuleDescriptor {
            property_name: self.property_name.clone(),
            display_name: self.display_name(None),
            rule_sets: self.rule_sets.clone(),
            cascade_mode: self.cascade_mode(config),
            is_collection: self.is_collection(),
            has_condition: self.condition.is_some() || self.async_condition.is_some(),
            validators,
            dependent_rules: self
                .dependent_rules
                .iter()
                .map(|rule| rule.describe(config))
                .collect(),
        }
    }

    fn validate(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()> {
        if !ctx.selector().can_execute(&self.rule_sets) {
            tracing::trace!(property = %self.property_name, "rule not in selected rule sets");
            return Ok(());
        }
        if self.async_condition.is_some() {
            return Err(EngineError::async_in_sync(
                &ctx.property_path(&self.property_name),
                "rule_condition",
            ));
        }

        let instance = ctx.instance();
        if let Some(condition) = &self.condition {
            if !condition.evaluate(instance) {
                tracing::debug!(property = %self.property_name, "rule skipped by condition");
                return Ok(());
            }
        }

        let display_name = self.display_name(Some(instance));
        let cascade = self.cascade_mode(ctx.config());
        match &self.target {
            Target::Single(accessor) => {
                let cell = OnceLock::new();
                let value = PropertyValue::Lazy {
                    cell: &cell,
                    accessor: accessor.as_ref(),
                    instance,
                };
                let path = ctx.property_path(&self.property_name);
                self.run_bindings(ctx, value, &path, &display_name, None, cascade)?;
            }
            Target::Each(accessor) => {
                let elements = accessor(instance);
                for (index, element) in elements.iter().enumerate() {
                    let path = self.element_path(ctx, index);
                    let value = PropertyValue::Resolved(element);
                    self.run_bindings(ctx, value, &path, &display_name, Some(index), cascade)?;
                }
            }
        }

        for dependent in &self.dependent_rules {
            dependent.validate(ctx)?;
        }
        Ok(())
    }

    async fn validate_async(&self, ctx: &mut ValidationContext<'_, T>) -> Result<()> {
        if !ctx.selector().can_execute(&self.rule_sets) {
            tracing::trace!(property = %self.property_name, "rule not in selected rule sets");
            return Ok(());
        }

        let instance = ctx.instance();
        if let Some(condition) = &self.condition {
            if !condition.evaluate(instance) {
                tracing::debug!(property = %self.property_name, "rule skipped by condition");
                return Ok(());
            }
        }
        if let Some(condition) = &self.async_condition {
            if !condition.evaluate(instance).await {
                tracing::debug!(property = %self.property_name, "rule skipped by async condition");
                return Ok(());
            }
        }

        let display_name = self.display_name(Some(instance));
        let cascade = self.cascade_mode(ctx.config());
        match &self.target {
            Target::Single(accessor) => {
                let cell = OnceLock::new();
                let value = PropertyValue::Lazy {
                    cell: &cell,
                    accessor: accessor.as_ref(),
                    instance,
                };
                let path = ctx.property_path(&self.property_name);
                self.run_bindings_async(ctx, value, &path, &display_name, None, cascade)
                    .await?;
            }
            Target::Each(accessor) => {
                let elements = accessor(instance);
                for (index, element) in elements.iter().enumerate() {
                    let path = self.element_path(ctx, index);
                    let value = PropertyValue::Resolved(element);
                    self.run_bindings_async(ctx, value, &path, &display_name, Some(index), cascade)
                        .await?;
                }
            }
        }

        for dependent in &self.dependent_rules {
            ctx.check_cancelled()?;
            dependent.validate_async(ctx).await?;
        }
        Ok(())
    }
}

impl<T, P> fmt::Debug for PropertyRule<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyRule")
            .field("property_name", &self.property_name)
            .field("collection", &self.is_collection())
            .field("cascade", &self.cascade)
            .field("bindings", &self.bindings)
            .field("rule_sets", &self.rule_sets)
            .field("dependent_rules", &self.dependent_rules.len())
            .finish()
    }
}

/// Turn an identifier into a label: `first_name` and `FirstName` both
/// become `First Name`.
pub(crate) fn humanize(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == '.' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).map_or(false, |next| next.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}
