//! Execution context handed to a validator for one binding invocation.
//!
//! The property value is resolved lazily through a cell owned by the rule
//! execution, so every binding of a rule and the failure it builds observe
//! the same value, and a validator can finish without ever touching the
//! accessor.

use crate::binding::ValidatorBinding;
use crate::config::EngineConfig;
use crate::context::{RuleSetSelector, RunState, ValidationContext};
use crate::failure::Failure;
use crate::message::{MessageFormatter, COLLECTION_INDEX};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

/// Ambient key carrying the index of the enclosing collection element into
/// nested graphs.
pub const COLLECTION_INDEX_KEY: &str = "__rulegraph_collection_index";

pub(crate) type OnFailure<T> = Arc<dyn Fn(&T, &Failure) + Send + Sync>;
pub(crate) type MessageBuilder<T, P> =
    Arc<dyn Fn(&MessageBuilderContext<'_, T, P>) -> String + Send + Sync>;
pub(crate) type Accessor<T, P> = dyn Fn(&T) -> P + Send + Sync;
pub(crate) type ValueRenderer<P> = Arc<dyn Fn(&P) -> Option<Value> + Send + Sync>;

/// Rule-level callbacks consulted while building failures.
pub(crate) struct RuleHooks<T, P> {
    pub(crate) on_failure: Option<OnFailure<T>>,
    pub(crate) message_builder: Option<MessageBuilder<T, P>>,
    /// Turns the property value into the attempted value and the
    /// `{PropertyValue}` placeholder. Without one neither is recorded.
    pub(crate) value_renderer: Option<ValueRenderer<P>>,
}

impl<T, P> Default for RuleHooks<T, P> {
    fn default() -> Self {
        Self {
            on_failure: None,
            message_builder: None,
            value_renderer: None,
        }
    }
}

/// Memoized or already-resolved property value.
pub(crate) enum PropertyValue<'v, T, P> {
    Lazy {
        cell: &'v OnceLock<P>,
        accessor: &'v Accessor<T, P>,
        instance: &'v T,
    },
    Resolved(&'v P),
}

impl<T, P> Clone for PropertyValue<'_, T, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, P> Copy for PropertyValue<'_, T, P> {}

impl<'v, T, P> PropertyValue<'v, T, P> {
    pub(crate) fn get(&self) -> &'v P {
        match *self {
            Self::Lazy {
                cell,
                accessor,
                instance,
            } => cell.get_or_init(|| accessor(instance)),
            Self::Resolved(value) => value,
        }
    }
}

/// Inputs available to a rule-level custom message builder.
pub struct MessageBuilderContext<'m, T, P> {
    pub instance: &'m T,
    pub value: &'m P,
    pub property_path: &'m str,
    pub display_name: &'m str,
    pub formatter: &'m MessageFormatter,
    default_message: String,
}

impl<T, P> MessageBuilderContext<'_, T, P> {
    /// The message the binding would have produced without the builder.
    pub fn default_message(&self) -> &str {
        &self.default_message
    }
}

/// Per-binding view of a rule execution.
pub struct PropertyContext<'c, 'a, T, P> {
    parent: &'c mut ValidationContext<'a, T>,
    binding: &'c ValidatorBinding<T, P>,
    hooks: &'c RuleHooks<T, P>,
    value: PropertyValue<'c, T, P>,
    property_path: &'c str,
    display_name: &'c str,
    formatter: MessageFormatter,
}

impl<'c, 'a, T, P> PropertyContext<'c, 'a, T, P>
where
    T: Send + Sync + 'static,
    P: Send + Sync + 'static,
{
    pub(crate) fn new(
        parent: &'c mut ValidationContext<'a, T>,
        binding: &'c ValidatorBinding<T, P>,
        hooks: &'c RuleHooks<T, P>,
        value: PropertyValue<'c, T, P>,
        property_path: &'c str,
        display_name: &'c str,
        collection_index: Option<usize>,
    ) -> Self {
        let mut formatter = MessageFormatter::new();
        formatter.append_property_name(display_name);
        match collection_index {
            Some(index) => {
                formatter.append_argument(COLLECTION_INDEX, index);
            }
            None => {
                if let Some(index) = parent.ambient(COLLECTION_INDEX_KEY) {
                    formatter.append_argument(COLLECTION_INDEX, index.clone());
                }
            }
        }

        Self {
            parent,
            binding,
            hooks,
            value,
            property_path,
            display_name,
            formatter,
        }
    }

    /// The instance being validated.
    pub fn instance(&self) -> &'a T {
        self.parent.instance()
    }

    /// The property value, resolved on first access.
    pub fn value(&self) -> &'c P {
        self.value.get()
    }

    /// Full path of the property, including any prefix and collection index.
    pub fn property_path(&self) -> &str {
        self.property_path
    }

    pub fn display_name(&self) -> &str {
        self.display_name
    }

    pub fn formatter(&self) -> &MessageFormatter {
        &self.formatter
    }

    pub fn formatter_mut(&mut self) -> &mut MessageFormatter {
        &mut self.formatter
    }

    /// Add a placeholder for the message of the next failure.
    pub fn append_argument(&mut self, name: impl Into<String>, value: impl Serialize) -> &mut Self {
        self.formatter.append_argument(name, value);
        self
    }

    pub fn is_async(&self) -> bool {
        self.parent.is_async()
    }

    pub fn config(&self) -> &EngineConfig {
        self.parent.config()
    }

    pub fn parent(&self) -> &ValidationContext<'a, T> {
        &*self.parent
    }

    pub(crate) fn state_mut(&mut self) -> &mut RunState {
        self.parent.state_mut()
    }

    pub(crate) fn selector(&self) -> Arc<RuleSetSelector> {
        Arc::clone(self.parent.selector_arc())
    }

    /// The value as JSON, when the rule captures values.
    pub fn rendered_value(&self) -> Option<Value> {
        let renderer = self.hooks.value_renderer.as_ref()?;
        renderer(self.value())
    }

    /// Record a failure built from the binding's message and options.
    pub fn add_failure(&mut self) {
        self.prepare_formatter();
        let binding = self.binding;
        let hooks = self.hooks;

        let message = match hooks.message_builder.as_ref() {
            Some(builder) => {
                let builder_ctx = MessageBuilderContext {
                    instance: self.instance(),
                    value: self.value(),
                    property_path: self.property_path,
                    display_name: self.display_name,
                    formatter: &self.formatter,
                    default_message: binding.get_error_message(Some(&*self)),
                };
                builder(&builder_ctx)
            }
            None => binding.get_error_message(Some(&*self)),
        };

        let property = self.property_path.to_string();
        self.record(property, message);
    }

    /// Record a failure with a custom message template for this property.
    pub fn add_failure_message(&mut self, message: impl AsRef<str>) {
        self.prepare_formatter();
        let message = self.formatter.build_message(message.as_ref());
        let property = self.property_path.to_string();
        self.record(property, message);
    }

    /// Record a failure against another property of the same instance.
    pub fn add_failure_for(&mut self, property_name: &str, message: impl AsRef<str>) {
        self.prepare_formatter();
        let message = self.formatter.build_message(message.as_ref());
        let property = self.parent.property_path(property_name);
        self.record(property, message);
    }

    /// Record a failure constructed by the validator.
    ///
    /// The message is rendered with the formatter; an empty property name is
    /// replaced by the current path.
    pub fn add_explicit_failure(&mut self, mut failure: Failure) {
        self.prepare_formatter();
        failure.error_message = self.formatter.build_message(&failure.error_message);
        if failure.property_name.is_empty() {
            failure.property_name = self.property_path.to_string();
        }
        if failure.placeholders.is_empty() {
            failure.placeholders = self.formatter.placeholders().clone();
        }
        self.push(failure);
    }

    fn prepare_formatter(&mut self) {
        if self.formatter.contains(crate::message::PROPERTY_VALUE) {
            return;
        }
        if let Some(value) = self.rendered_value() {
            self.formatter.append_property_value(value);
        }
    }

    fn record(&mut self, property_name: String, error_message: String) {
        let binding = self.binding;
        let instance = self.instance();
        let value = self.value();

        let failure = Failure {
            property_name,
            error_message,
            error_code: Some(binding.error_code(self.parent.config())),
            attempted_value: self.rendered_value(),
            custom_state: binding.custom_state(instance, value),
            severity: binding.severity(instance, value),
            placeholders: self.formatter.clone().into_placeholders(),
        };
        self.push(failure);
    }

    fn push(&mut self, failure: Failure) {
        let hooks = self.hooks;
        if let Some(on_failure) = hooks.on_failure.as_ref() {
            on_failure(self.instance(), &failure);
        }
        tracing::trace!(
            property = %failure.property_name,
            code = ?failure.error_code,
            "failure recorded"
        );
        self.parent.push_failure(failure);
    }
}
