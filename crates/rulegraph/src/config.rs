//! Engine configuration.
//!
//! Everything the engine would otherwise look up from process-wide defaults
//! (cascade mode, display names, message templates, error codes) is carried
//! by an [`EngineConfig`] injected into each [`RuleGraph`](crate::RuleGraph).
//!
//! # Example
//!
//! ```rust,ignore
//! use rulegraph::prelude::*;
//!
//! let config = EngineConfig::builder()
//!     .cascade_mode(CascadeMode::StopOnFirstFailure)
//!     .message("not_empty", "{PropertyName} is required")
//!     .build();
//!
//! let graph = RuleGraph::<User>::with_config(config);
//! ```

use crate::error::{EngineError, Result};
use crate::rule::CascadeMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Resolves a display name from `(container type, member name)`.
pub type DisplayNameResolver = Arc<dyn Fn(&str, &str) -> Option<String> + Send + Sync>;

/// Derives an error code from a validator name and its binding's options
/// when none was set explicitly.
pub type ErrorCodeResolver = Arc<dyn Fn(&str, &OptionsSummary) -> String + Send + Sync>;

/// Read-only view of a binding's options, handed to the error-code resolver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OptionsSummary {
    pub has_condition: bool,
    pub has_async_condition: bool,
    pub has_custom_message: bool,
    pub has_custom_state: bool,
    pub has_severity: bool,
}

/// Source of message templates keyed by validator name.
pub trait MessageSource: Send + Sync {
    /// Look up a template; `None` falls back to the validator's built-in text.
    fn template(&self, key: &str) -> Option<String>;
}

/// Map-backed message source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticMessages {
    templates: HashMap<String, String>,
}

impl StaticMessages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.templates.insert(key.into(), template.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

impl MessageSource for StaticMessages {
    fn template(&self, key: &str) -> Option<String> {
        self.templates.get(key).cloned()
    }
}

impl From<HashMap<String, String>> for StaticMessages {
    fn from(templates: HashMap<String, String>) -> Self {
        Self { templates }
    }
}

/// Injected configuration shared by every rule of a graph.
#[derive(Clone, Default)]
pub struct EngineConfig {
    cascade_mode: CascadeMode,
    display_name_resolver: Option<DisplayNameResolver>,
    message_source: Option<Arc<dyn MessageSource>>,
    error_code_resolver: Option<ErrorCodeResolver>,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    /// Cascade mode used by rules that do not set their own.
    pub fn cascade_mode(&self) -> CascadeMode {
        self.cascade_mode
    }

    pub fn resolve_display_name(&self, container: &str, member: &str) -> Option<String> {
        self.display_name_resolver
            .as_ref()
            .and_then(|resolve| resolve(container, member))
    }

    pub fn message_template(&self, key: &str) -> Option<String> {
        self.message_source.as_ref().and_then(|source| source.template(key))
    }

    /// Error code for a validator without an explicit code.
    pub fn resolve_error_code(&self, validator_name: &str, options: &OptionsSummary) -> String {
        match &self.error_code_resolver {
            Some(resolve) => resolve(validator_name, options),
            None => validator_name.to_string(),
        }
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("cascade_mode", &self.cascade_mode)
            .field("has_display_name_resolver", &self.display_name_resolver.is_some())
            .field("has_message_source", &self.message_source.is_some())
            .field("has_error_code_resolver", &self.error_code_resolver.is_some())
            .finish()
    }
}

/// Builder for constructing an [`EngineConfig`].
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
    messages: StaticMessages,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Default cascade mode for rules without their own.
    pub fn cascade_mode(mut self, mode: CascadeMode) -> Self {
        self.config.cascade_mode = mode;
        self
    }

    /// Resolve display names from `(container type, member name)`.
    pub fn display_name_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str, &str) -> Option<String> + Send + Sync + 'static,
    {
        self.config.display_name_resolver = Some(Arc::new(resolver));
        self
    }

    /// Use a custom message source. Overrides templates added with [`Self::message`].
    pub fn message_source(mut self, source: impl MessageSource + 'static) -> Self {
        self.config.message_source = Some(Arc::new(source));
        self
    }

    /// Override the template for one validator name.
    pub fn message(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        self.messages = self.messages.insert(key, template);
        self
    }

    /// Derive error codes for validators without an explicit code.
    pub fn error_code_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str, &OptionsSummary) -> String + Send + Sync + 'static,
    {
        self.config.error_code_resolver = Some(Arc::new(resolver));
        self
    }

    /// Build the configuration.
    pub fn build(self) -> EngineConfig {
        let mut config = self.config;
        if config.message_source.is_none() && !self.messages.is_empty() {
            config.message_source = Some(Arc::new(self.messages));
        }
        config
    }
}

/// Serializable engine settings.
///
/// Loaded from JSON, or from `RULEGRAPH_*` environment variables with the
/// `env` feature, and turned into an [`EngineConfig`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub cascade_mode: CascadeMode,
    /// Message template overrides keyed by validator name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub messages: HashMap<String, String>,
}

impl EngineSettings {
    /// Parse settings from a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::Config(e.to_string()))
    }

    /// Load settings from `RULEGRAPH_CASCADE_MODE`.
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self> {
        envy::prefixed("RULEGRAPH_")
            .from_env::<Self>()
            .map_err(|e| EngineError::Config(e.to_string()))
    }

    pub fn into_config(self) -> EngineConfig {
        let mut builder = EngineConfig::builder().cascade_mode(self.cascade_mode);
        for (key, template) in self.messages {
            builder = builder.message(key, template);
        }
        builder.build()
    }
}

impl From<EngineSettings> for EngineConfig {
    fn from(settings: EngineSettings) -> Self {
        settings.into_config()
    }
}
