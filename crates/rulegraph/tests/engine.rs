use rulegraph::prelude::*;
use rulegraph::validators::LengthValidator;
use rulegraph::{EngineSettings, ValidateOptions, COLLECTION_INDEX_KEY};
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Serialize)]
struct Address {
    street: String,
    city: String,
}

#[derive(Debug, Clone, Serialize)]
struct Line {
    sku: String,
    quantity: u32,
}

#[derive(Debug, Clone)]
struct Customer {
    name: String,
    email: String,
    tier: String,
    address: Option<Address>,
    lines: Vec<Line>,
}

fn customer() -> Customer {
    Customer {
        name: "Ada".into(),
        email: "ada@example.com".into(),
        tier: "gold".into(),
        address: Some(Address {
            street: "1 Analytical Way".into(),
            city: "London".into(),
        }),
        lines: vec![
            Line {
                sku: "ABC".into(),
                quantity: 1,
            },
            Line {
                sku: "DE".into(),
                quantity: 2,
            },
        ],
    }
}

fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    (Arc::clone(&count), count)
}

#[test]
fn stop_on_first_failure_skips_later_validators() {
    let (second_calls, second) = counter();
    let (third_calls, third) = counter();

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .cascade(CascadeMode::StopOnFirstFailure)
        .must(|_, _| false)
        .must(move |_, _| {
            second.fetch_add(1, Ordering::SeqCst);
            false
        })
        .must(move |_, _| {
            third.fetch_add(1, Ordering::SeqCst);
            false
        });

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(second_calls.load(Ordering::SeqCst), 0);
    assert_eq!(third_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn continue_runs_every_validator() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .with_error_code("FIRST")
        .must(|_, _| false)
        .with_error_code("SECOND")
        .must(|_, _| false)
        .with_error_code("THIRD");

    let result = graph.validate(&customer()).unwrap();
    let codes: Vec<_> = result
        .failures
        .iter()
        .map(|f| f.error_code.clone().unwrap_or_default())
        .collect();
    assert_eq!(codes, vec!["FIRST", "SECOND", "THIRD"]);
}

#[test]
fn configured_cascade_applies_to_rules_without_their_own() {
    let config = EngineConfig::builder()
        .cascade_mode(CascadeMode::StopOnFirstFailure)
        .build();
    let mut graph = RuleGraph::<Customer>::with_config(config);
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .must(|_, _| false);
    graph
        .rule_for("email", |c: &Customer| c.email.clone())
        .cascade(CascadeMode::Continue)
        .must(|_, _| false)
        .must(|_, _| false);

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(result.errors_for("name").count(), 1);
    assert_eq!(result.errors_for("email").count(), 2);
}

#[test]
fn newest_condition_is_evaluated_first_and_short_circuits() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let first_log = Arc::clone(&log);
    let second_log = Arc::clone(&log);

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .when(move |_| {
            first_log.lock().unwrap().push("p1");
            true
        })
        .when(move |_| {
            second_log.lock().unwrap().push("p2");
            false
        });

    let result = graph.validate(&customer()).unwrap();
    assert!(result.is_valid());
    assert_eq!(*log.lock().unwrap(), vec!["p2"]);
}

#[test]
fn enclosing_rule_guard_runs_before_inner_guard() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let (outer_log, inner_log) = (Arc::clone(&log), Arc::clone(&log));

    let mut graph = RuleGraph::<Customer>::new();
    graph.when(
        move |c: &Customer| {
            outer_log.lock().unwrap().push("outer");
            c.tier == "gold"
        },
        move |g| {
            g.when(
                move |_: &Customer| {
                    inner_log.lock().unwrap().push("inner");
                    true
                },
                |g| {
                    g.rule_for("name", |c: &Customer| c.name.clone())
                        .must(|_, _| false);
                },
            );
        },
    );

    assert_eq!(graph.validate(&customer()).unwrap().len(), 1);
    assert_eq!(*log.lock().unwrap(), vec!["outer", "inner"]);

    log.lock().unwrap().clear();
    let mut bronze = customer();
    bronze.tier = "bronze".into();
    assert!(graph.validate(&bronze).unwrap().is_valid());
    assert_eq!(*log.lock().unwrap(), vec!["outer"]);
}

#[test]
fn guards_only_cover_validators_added_before_them() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .with_error_code("GUARDED")
        .unless(|_| true)
        .must(|_, _| false)
        .with_error_code("UNGUARDED");

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.failures[0].error_code.as_deref(), Some("UNGUARDED"));
}

#[test]
fn current_validator_guard_leaves_earlier_validators_alone() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .with_error_code("EARLIER")
        .must(|_, _| false)
        .with_error_code("CURRENT")
        .when_current(|_| false);

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.failures[0].error_code.as_deref(), Some("EARLIER"));
}

#[test]
fn length_failure_carries_placeholders() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .length(2, 5)
        .unwrap();

    let mut short = customer();
    short.name = "A".into();
    let result = graph.validate(&short).unwrap();
    assert_eq!(result.len(), 1);

    let failure = &result.failures[0];
    assert_eq!(failure.property_name, "name");
    assert_eq!(failure.placeholder("MinLength"), Some(&json!(2)));
    assert_eq!(failure.placeholder("MaxLength"), Some(&json!(5)));
    assert_eq!(failure.placeholder("TotalLength"), Some(&json!(1)));
    assert_eq!(failure.placeholder("PropertyValue"), Some(&json!("A")));
    assert_eq!(failure.attempted_value, Some(json!("A")));
    assert_eq!(failure.error_code.as_deref(), Some("length"));
    assert_eq!(
        failure.error_message,
        "'Name' must be between 2 and 5 characters. You entered 1 characters."
    );

    let mut fine = customer();
    fine.name = "Abc".into();
    assert!(graph.validate(&fine).unwrap().is_valid());
}

#[test]
fn inverted_length_bounds_fail_at_setup() {
    assert!(LengthValidator::new(5, 2).is_err());

    let mut graph = RuleGraph::<Customer>::new();
    let outcome = graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .length(5, 2)
        .map(|_| ());
    assert!(matches!(outcome, Err(EngineError::InvalidArgument { .. })));
    assert!(graph.is_empty());
}

#[test]
fn child_graph_skips_absent_values() {
    let (calls, seen) = counter();
    let mut addresses = RuleGraph::<Address>::new();
    addresses
        .rule_for("street", move |a: &Address| {
            seen.fetch_add(1, Ordering::SeqCst);
            a.street.clone()
        })
        .not_empty();

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("address", |c: &Customer| c.address.clone())
        .set_validator(Arc::new(addresses));

    let mut homeless = customer();
    homeless.address = None;
    let result = graph.validate(&homeless).unwrap();
    assert!(result.is_valid());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn child_graph_failures_are_prefixed() {
    let mut addresses = RuleGraph::<Address>::new();
    addresses
        .rule_for("street", |a: &Address| a.street.clone())
        .not_empty();
    addresses
        .rule_for("city", |a: &Address| a.city.clone())
        .min_length(3);

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("address", |c: &Customer| c.address.clone())
        .set_validator(Arc::new(addresses));

    let mut subject = customer();
    subject.address = Some(Address {
        street: " ".into(),
        city: "Oz".into(),
    });
    let result = graph.validate(&subject).unwrap();
    assert_eq!(result.property_names(), vec!["address.street", "address.city"]);
    assert_eq!(result.failures[0].error_message, "'Street' must not be empty.");
}

#[test]
fn collection_elements_get_indexed_paths_and_nested_index() {
    let mut lines = RuleGraph::<Line>::new();
    lines
        .rule_for("sku", |l: &Line| l.sku.clone())
        .exact_length(3)
        .with_message("Line {CollectionIndex}: '{PropertyName}' needs 3 characters");

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for_each("lines", |c: &Customer| c.lines.clone())
        .set_validator(Arc::new(lines));
    graph
        .rule_for_each("lines", |c: &Customer| {
            c.lines.iter().map(|l| l.quantity).collect::<Vec<u32>>()
        })
        .capture_values()
        .must(|_, quantity: &u32| *quantity < 2)
        .with_message("Quantity at {CollectionIndex} is {PropertyValue}");

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(result.property_names(), vec!["lines[1].sku", "lines[1]"]);
    assert_eq!(result.failures[0].error_message, "Line 1: 'Sku' needs 3 characters");
    assert_eq!(result.failures[0].placeholder("CollectionIndex"), Some(&json!(1)));
    assert_eq!(result.failures[1].error_message, "Quantity at 1 is 2");
}

#[test]
fn ambient_index_is_removed_after_nested_call() {
    let observed = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&observed);

    let mut lines = RuleGraph::<Line>::new();
    lines.rule_for("sku", |l: &Line| l.sku.clone()).not_empty();

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for_each("lines", |c: &Customer| c.lines.clone())
        .set_validator(Arc::new(lines));
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .validator(AmbientRecorder(sink));

    graph.validate(&customer()).unwrap();
    assert_eq!(*observed.lock().unwrap(), vec![None]);
}

struct AmbientRecorder(Arc<Mutex<Vec<Option<serde_json::Value>>>>);

impl PropertyValidator<Customer, String> for AmbientRecorder {
    fn name(&self) -> &'static str {
        "ambient_recorder"
    }

    fn validate(&self, ctx: &mut PropertyContext<'_, '_, Customer, String>) -> Result<()> {
        let value = ctx.parent().ambient(COLLECTION_INDEX_KEY).cloned();
        self.0.lock().unwrap().push(value);
        Ok(())
    }
}

#[test]
fn dependent_rules_inherit_rule_sets() {
    let mut graph = RuleGraph::<Customer>::new();
    graph.rule_set(["signup"], |g| {
        g.rule_for("name", |c: &Customer| c.name.clone())
            .not_empty()
            .dependent_rules(|d| {
                d.rule_for("email", |c: &Customer| c.email.clone())
                    .must(|_, _| false)
                    .with_error_code("INHERITED");
                d.rule_set(["billing"], |b| {
                    b.rule_for("tier", |c: &Customer| c.tier.clone())
                        .must(|_, _| false)
                        .with_error_code("OWN_SET");
                });
            });
    });

    let described = graph.describe();
    assert_eq!(described[0].dependent_rules[0].rule_sets, vec!["signup"]);
    assert_eq!(described[0].dependent_rules[1].rule_sets, vec!["billing"]);

    let subject = customer();
    assert!(graph.validate(&subject).unwrap().is_valid());

    let signup = graph
        .validate_with(&subject, ValidateOptions::new().include_rule_sets(["signup"]))
        .unwrap();
    let codes: Vec<_> = signup
        .failures
        .iter()
        .filter_map(|f| f.error_code.as_deref())
        .collect();
    assert_eq!(codes, vec!["INHERITED"]);
    assert_eq!(signup.rule_sets_executed, vec!["signup"]);
}

#[test]
fn dependent_rules_run_after_failures_but_not_when_rule_is_skipped() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .with_error_code("PARENT")
        .dependent_rules(|d| {
            d.rule_for("email", |c: &Customer| c.email.clone())
                .must(|_, _| false)
                .with_error_code("CHILD");
        });
    graph.when(
        |c: &Customer| c.tier == "platinum",
        |g| {
            g.rule_for("tier", |c: &Customer| c.tier.clone())
                .must(|_, _| false)
                .dependent_rules(|d| {
                    d.rule_for("email", |c: &Customer| c.email.clone())
                        .must(|_, _| false)
                        .with_error_code("NEVER");
                });
        },
    );

    let result = graph.validate(&customer()).unwrap();
    let codes: Vec<_> = result
        .failures
        .iter()
        .filter_map(|f| f.error_code.as_deref())
        .collect();
    assert_eq!(codes, vec!["PARENT", "CHILD"]);
}

#[test]
fn rule_guard_reaches_dependent_rules() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .must(|_, _| false)
        .dependent_rules(|d| {
            d.rule_for("email", |c: &Customer| c.email.clone())
                .must(|_, _| false)
                .with_error_code("DEPENDENT");
        })
        .when(|c: &Customer| c.tier == "platinum");

    assert!(graph.validate(&customer()).unwrap().is_valid());

    let mut platinum = customer();
    platinum.tier = "platinum".into();
    let result = graph.validate(&platinum).unwrap();
    let codes: Vec<_> = result
        .failures
        .iter()
        .filter_map(|f| f.error_code.as_deref())
        .collect();
    assert_eq!(codes, vec!["predicate", "DEPENDENT"]);
}

#[test]
fn sync_run_rejects_async_only_validator() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("email", |c: &Customer| c.email.clone())
        .must_async(|_, _| async { true }.boxed());

    let described = graph.describe();
    assert!(described[0].validators[0].requires_async);

    let err = graph.validate(&customer()).unwrap_err();
    match err {
        EngineError::AsyncInSyncRun { property, validator } => {
            assert_eq!(property, "email");
            assert_eq!(validator, "async_predicate");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn validator_fault_aborts_run() {
    struct Exploding;

    impl PropertyValidator<Customer, String> for Exploding {
        fn name(&self) -> &'static str {
            "exploding"
        }

        fn validate(&self, ctx: &mut PropertyContext<'_, '_, Customer, String>) -> Result<()> {
            Err(EngineError::fault(ctx.property_path(), "lookup table missing"))
        }
    }

    let (calls, later) = counter();
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .validator(Exploding);
    graph
        .rule_for("email", |c: &Customer| c.email.clone())
        .must(move |_, _| {
            later.fetch_add(1, Ordering::SeqCst);
            true
        });

    let err = graph.validate(&customer()).unwrap_err();
    assert!(matches!(err, EngineError::Fault { ref property, .. } if property == "name"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn failure_metadata_and_hooks() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("tier", |c: &Customer| c.tier.clone())
        .with_name("Membership tier")
        .is_enum_name(["bronze", "silver"], false)
        .unwrap()
        .with_severity(Severity::Warning)
        .with_state(|c: &Customer, _| json!({ "customer": c.name }))
        .on_failure(move |_, failure| sink.lock().unwrap().push(failure.property_name.clone()));

    let result = graph.validate(&customer()).unwrap();
    let failure = &result.failures[0];
    assert_eq!(failure.severity, Severity::Warning);
    assert_eq!(failure.custom_state, Some(json!({ "customer": "Ada" })));
    assert_eq!(failure.error_code.as_deref(), Some("string_enum"));
    assert_eq!(
        failure.error_message,
        "'Membership tier' has a range of values which does not include 'gold'."
    );
    assert_eq!(*seen.lock().unwrap(), vec!["tier".to_string()]);
}

#[test]
fn message_builder_wraps_default_message() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .min_length(10)
        .with_message_builder(|ctx| format!("[{}] {}", ctx.property_path, ctx.default_message()));

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(
        result.failures[0].error_message,
        "[name] The length of 'Name' must be at least 10 characters. You entered 3 characters."
    );
}

#[test]
fn message_factory_and_display_name_factory() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("email", |c: &Customer| c.email.clone())
        .with_name_fn(|c: &Customer| format!("{}'s email", c.name))
        .must(|_, email: &String| email.ends_with(".org"))
        .with_message_fn(|_, email: &String| {
            format!("{{PropertyName}} ({email}) must be an .org address")
        });

    let result = graph.validate(&customer()).unwrap();
    assert_eq!(
        result.failures[0].error_message,
        "Ada's email (ada@example.com) must be an .org address"
    );
}

#[test]
fn settings_override_builtin_templates() {
    let settings = EngineSettings::from_json(
        r#"{ "cascade_mode": "stop_on_first_failure", "messages": { "not_empty": "{PropertyName} is required" } }"#,
    )
    .unwrap();
    let mut graph = RuleGraph::<Customer>::with_config(settings.into());
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .not_empty()
        .max_length(0);

    let mut blank = customer();
    blank.name = String::new();
    let result = graph.validate(&blank).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.failures[0].error_message, "Name is required");
}

#[test]
fn property_prefix_and_display() {
    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .max_length(1);

    let result = graph
        .validate_with(&customer(), ValidateOptions::new().property_prefix("payload"))
        .unwrap();
    assert_eq!(result.property_names(), vec!["payload.name"]);

    let rendered = result.to_string();
    assert!(rendered.contains("payload.name"));
    assert!(result.into_result().is_err());
}

#[test]
fn custom_failures_resolve_paths_and_placeholders() {
    struct CrossCheck;

    impl PropertyValidator<Customer, String> for CrossCheck {
        fn name(&self) -> &'static str {
            "cross_check"
        }

        fn validate(&self, ctx: &mut PropertyContext<'_, '_, Customer, String>) -> Result<()> {
            ctx.append_argument("Limit", 2);
            ctx.add_failure_message("'{PropertyName}' is over {Limit}");
            ctx.add_failure_for("email", "{PropertyName} blocks email");
            let explicit = Failure::new("", "explicit for {PropertyValue}").with_code("EXPLICIT");
            ctx.add_explicit_failure(explicit);
            Ok(())
        }
    }

    let fired = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&fired);

    let mut graph = RuleGraph::<Customer>::new();
    graph
        .rule_for("name", |c: &Customer| c.name.clone())
        .capture_values()
        .validator(CrossCheck)
        .on_failure(move |_, failure| sink.lock().unwrap().push(failure.property_name.clone()));

    let result = graph
        .validate_with(&customer(), ValidateOptions::new().property_prefix("p"))
        .unwrap();
    assert_eq!(result.property_names(), vec!["p.name", "p.email", "p.name"]);

    let over = &result.failures[0];
    assert_eq!(over.error_message, "'Name' is over 2");
    assert_eq!(over.placeholder("Limit"), Some(&json!(2)));
    assert_eq!(over.attempted_value, Some(json!("Ada")));
    assert_eq!(over.error_code.as_deref(), Some("cross_check"));

    assert_eq!(result.failures[1].error_message, "Name blocks email");

    let explicit = &result.failures[2];
    assert_eq!(explicit.error_message, "explicit for Ada");
    assert_eq!(explicit.error_code.as_deref(), Some("EXPLICIT"));
    assert_eq!(explicit.placeholder("PropertyValue"), Some(&json!("Ada")));

    assert_eq!(*fired.lock().unwrap(), vec!["p.name", "p.email", "p.name"]);
}
