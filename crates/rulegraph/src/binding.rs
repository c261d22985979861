//! Validator bindings: a validator paired with its per-binding options.

use crate::condition::{AsyncCondition, Condition};
use crate::config::{EngineConfig, OptionsSummary};
use crate::execution::PropertyContext;
use crate::failure::Severity;
use crate::validators::{ExecutionSupport, PropertyValidator};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

type MessageFactory<T, P> = Arc<dyn Fn(&T, &P) -> String + Send + Sync>;
type StateProvider<T, P> = Arc<dyn Fn(&T, &P) -> Value + Send + Sync>;
type SeverityProvider<T, P> = Arc<dyn Fn(&T, &P) -> Severity + Send + Sync>;

/// Where a binding's message template comes from.
pub enum MessageTemplate<T, P> {
    Static(String),
    Factory(MessageFactory<T, P>),
}

impl<T, P> Clone for MessageTemplate<T, P> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(s) => Self::Static(s.clone()),
            Self::Factory(f) => Self::Factory(Arc::clone(f)),
        }
    }
}

/// Per-binding configuration.
pub struct ValidatorOptions<T, P> {
    pub(crate) condition: Option<Condition<T>>,
    pub(crate) async_condition: Option<AsyncCondition<T>>,
    pub(crate) message: Option<MessageTemplate<T, P>>,
    pub(crate) error_code: Option<String>,
    pub(crate) custom_state: Option<StateProvider<T, P>>,
    pub(crate) severity: Option<SeverityProvider<T, P>>,
}

impl<T, P> Default for ValidatorOptions<T, P> {
    fn default() -> Self {
        Self {
            condition: None,
            async_condition: None,
            message: None,
            error_code: None,
            custom_state: None,
            severity: None,
        }
    }
}

impl<T: Sync + 'static, P: 'static> ValidatorOptions<T, P> {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a static message template.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message = Some(MessageTemplate::Static(template.into()));
        self
    }

    /// Build the message template from the instance and value.
    pub fn with_message_fn<F>(mut self, factory: F) -> Self
    where
        F: Fn(&T, &P) -> String + Send + Sync + 'static,
    {
        self.message = Some(MessageTemplate::Factory(Arc::new(factory)));
        self
    }

    /// Use an explicit error code.
    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }

    /// Use a fixed severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = Some(Arc::new(move |_: &T, _: &P| severity));
        self
    }

    /// Compute the severity from the instance and value.
    pub fn with_severity_fn<F>(mut self, provider: F) -> Self
    where
        F: Fn(&T, &P) -> Severity + Send + Sync + 'static,
    {
        self.severity = Some(Arc::new(provider));
        self
    }

    /// Attach custom state to each failure.
    pub fn with_state<F>(mut self, provider: F) -> Self
    where
        F: Fn(&T, &P) -> Value + Send + Sync + 'static,
    {
        self.custom_state = Some(Arc::new(provider));
        self
    }

    /// AND a condition into this binding; the new predicate runs first.
    pub fn apply_condition(&mut self, condition: Condition<T>) {
        self.condition = Some(condition.and_then_existing(self.condition.take()));
    }

    /// AND an async condition into this binding; the new predicate runs first.
    pub fn apply_async_condition(&mut self, condition: AsyncCondition<T>) {
        self.async_condition = Some(condition.and_then_existing(self.async_condition.take()));
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some() || self.async_condition.is_some()
    }

    /// What is configured, without the callbacks themselves.
    pub fn summary(&self) -> OptionsSummary {
        OptionsSummary {
            has_condition: self.condition.is_some(),
            has_async_condition: self.async_condition.is_some(),
            has_custom_message: self.message.is_some(),
            has_custom_state: self.custom_state.is_some(),
            has_severity: self.severity.is_some(),
        }
    }
}

/// A validator bound to a rule together with its options.
pub struct ValidatorBinding<T, P> {
    validator: Box<dyn PropertyValidator<T, P>>,
    options: ValidatorOptions<T, P>,
}

impl<T, P> ValidatorBinding<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    /// Bind `validator` with `options`.
    pub fn new(
        validator: impl PropertyValidator<T, P> + 'static,
        options: ValidatorOptions<T, P>,
    ) -> Self {
        Self {
            validator: Box::new(validator),
            options,
        }
    }

    /// Get the bound validator.
    pub fn validator(&self) -> &dyn PropertyValidator<T, P> {
        self.validator.as_ref()
    }

    /// Get the binding's options.
    pub fn options(&self) -> &ValidatorOptions<T, P> {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ValidatorOptions<T, P> {
        &mut self.options
    }

    pub fn apply_condition(&mut self, condition: Condition<T>) {
        self.options.apply_condition(condition);
    }

    pub fn apply_async_condition(&mut self, condition: AsyncCondition<T>) {
        self.options.apply_async_condition(condition);
    }

    /// Decide whether this binding has to run on the asynchronous path.
    ///
    /// An async condition or an async-only validator always requires it; a
    /// validator with both behaviors follows the mode of the top-level call.
    /// A `true` answer during a synchronous run is a mode mismatch the caller
    /// must reject.
    pub fn should_validate_asynchronously(&self, is_async_run: bool) -> bool {
        if self.options.async_condition.is_some() {
            return true;
        }
        match self.validator.support() {
            ExecutionSupport::Async => true,
            ExecutionSupport::Both => is_async_run,
            ExecutionSupport::Sync => false,
        }
    }

    pub(crate) fn passes_condition(&self, instance: &T) -> bool {
        self.options
            .condition
            .as_ref()
            .map_or(true, |condition| condition.evaluate(instance))
    }

    pub(crate) async fn passes_async_condition(&self, instance: &T) -> bool {
        match &self.options.async_condition {
            Some(condition) => condition.evaluate(instance).await,
            None => true,
        }
    }

    /// Explicit error code, else the configured resolver's code.
    pub fn error_code(&self, config: &EngineConfig) -> String {
        match &self.options.error_code {
            Some(code) => code.clone(),
            None => config.resolve_error_code(self.validator.name(), &self.options.summary()),
        }
    }

    /// Raw template: static message, else the configured source, else the
    /// validator's built-in text. Factories are not consulted.
    pub fn raw_message_template(&self, config: &EngineConfig) -> String {
        if let Some(MessageTemplate::Static(template)) = &self.options.message {
            return template.clone();
        }
        config
            .message_template(self.validator.name())
            .unwrap_or_else(|| self.validator.default_message_template().to_string())
    }

    /// Resolve the error message for this binding.
    ///
    /// With a context the factory, static, configured and built-in templates
    /// are tried in that order and placeholders are substituted from the
    /// context's formatter. Without a context the raw template is returned
    /// unresolved.
    pub fn get_error_message(&self, ctx: Option<&PropertyContext<'_, '_, T, P>>) -> String {
        let Some(ctx) = ctx else {
            return match &self.options.message {
                Some(MessageTemplate::Static(template)) => template.clone(),
                _ => self.validator.default_message_template().to_string(),
            };
        };

        let template = match &self.options.message {
            Some(MessageTemplate::Factory(factory)) => factory(ctx.instance(), ctx.value()),
            _ => self.raw_message_template(ctx.config()),
        };
        ctx.formatter().build_message(&template)
    }

    pub(crate) fn custom_state(&self, instance: &T, value: &P) -> Option<Value> {
        self.options
            .custom_state
            .as_ref()
            .map(|provider| provider(instance, value))
    }

    pub(crate) fn severity(&self, instance: &T, value: &P) -> Severity {
        self.options
            .severity
            .as_ref()
            .map(|provider| provider(instance, value))
            .unwrap_or_default()
    }
}

impl<T, P> fmt::Debug for ValidatorBinding<T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorBinding")
            .field("validator", &self.validator.name())
            .field("error_code", &self.options.error_code)
            .field("has_condition", &self.options.condition.is_some())
            .field("has_async_condition", &self.options.async_condition.is_some())
            .finish()
    }
}
