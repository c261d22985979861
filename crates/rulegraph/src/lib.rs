//! # rulegraph
//!
//! Declarative rule composition and execution. Attach validators to property
//! accessors of a type, guard them with synchronous or asynchronous
//! conditions, group rules into named sets, chain dependent rules, and run
//! the resulting graph against an instance to get structured failures.
//!
//! ## Example
//!
//! ```rust,ignore
//! use rulegraph::prelude::*;
//!
//! struct Order {
//!     reference: String,
//!     lines: Vec<Line>,
//! }
//!
//! let mut lines = RuleGraph::<Line>::new();
//! lines.rule_for("sku", |l: &Line| l.sku.clone()).exact_length(8);
//!
//! let mut orders = RuleGraph::<Order>::new();
//! orders
//!     .rule_for("reference", |o: &Order| o.reference.clone())
//!     .not_empty()
//!     .cascade(CascadeMode::StopOnFirstFailure)
//!     .length(4, 32)?;
//! orders
//!     .rule_for_each("lines", |o: &Order| o.lines.clone())
//!     .set_validator(Arc::new(lines));
//!
//! let result = orders.validate(&order)?;
//! for failure in &result.failures {
//!     println!("{failure}");
//! }
//! ```
//!
//! ## Execution modes
//!
//! A run is either fully synchronous ([`RuleGraph::validate`]) or fully
//! asynchronous ([`RuleGraph::validate_async`]). Validators implementing
//! both paths follow the mode of the call. A synchronous run that reaches
//! an async-only validator or an async condition fails with
//! [`EngineError::AsyncInSyncRun`] instead of skipping it.
//!
//! ## Message placeholders
//!
//! Templates use `{Name}` placeholders. Every failure carries
//! `{PropertyName}`. Rules that capture values, through
//! [`RuleBuilder::capture_values`] or a text validator, also carry
//! `{PropertyValue}` and the attempted value. Collection elements add
//! `{CollectionIndex}`, and validators add their own, such as `{MinLength}`.

mod binding;
mod condition;
mod config;
mod context;
mod descriptor;
mod error;
mod execution;
mod failure;
mod graph;
mod message;
mod rule;
pub mod validators;


pub use binding::{MessageTemplate, ValidatorBinding, ValidatorOptions};
pub use condition::{ApplyConditionTo, AsyncCondition, Condition};
pub use config::{
    DisplayNameResolver, EngineConfig, EngineConfigBuilder, EngineSettings, ErrorCodeResolver,
    MessageSource, OptionsSummary, StaticMessages,
};
pub use context::{
    RuleSetSelector, RunState, ValidateOptions, ValidationContext, ALL_RULE_SETS, DEFAULT_RULE_SET,
};
pub use descriptor::{RuleDescriptor, ValidatorDescriptor};
pub use error::{BoxError, EngineError, Result};
pub use execution::{MessageBuilderContext, PropertyContext, COLLECTION_INDEX_KEY};
pub use failure::{Failure, Severity, ValidationResult};
pub use graph::{RuleBuilder, RuleGraph};
pub use message::{MessageFormatter, COLLECTION_INDEX, PROPERTY_NAME, PROPERTY_VALUE};
pub use rule::{CascadeMode, PropertyRule, ValidationRule};

/// Prelude module for building and running rule graphs
pub mod prelude {
    pub use crate::condition::ApplyConditionTo;
    pub use crate::config::{EngineConfig, EngineSettings};
    pub use crate::context::ValidateOptions;
    pub use crate::error::{EngineError, Result};
    pub use crate::execution::PropertyContext;
    pub use crate::failure::{Failure, Severity, ValidationResult};
    pub use crate::graph::RuleGraph;
    pub use crate::rule::CascadeMode;
    pub use crate::validators::PropertyValidator;
    pub use futures_util::FutureExt;
}
