//! Selector and binding integration tests
//!
//! Test coverage areas:
//! - Precedence between bindings matching the same node
//! - Unused selector detection in strict and lenient mode
//! - Scope and depth selectors
//! - Filters, callbacks, and conditional assignments
//! - Custom generators and after-generate behavior
//! - Assignment failures

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use common::*;
use specimen::generators::{GenOptions, GeneratorContext, GeneratorHints, WithHints};
use specimen::random::RandomSource;
use specimen::selectors::{Assignment, Category};
use specimen::settings::AfterGenerate;
use specimen::{select, Error, Instance, Keys, Request, Settings, Value};

fn fixed_customer(_: &mut RandomSource, _: &GeneratorContext<'_>) -> Value {
    Value::Object(Instance::new("Customer").with("name", "Fixed"))
}

/// An instance of whatever concrete type is asked for, named "Rex".
fn named_rex(_: &mut RandomSource, ctx: &GeneratorContext<'_>) -> Value {
    Value::Object(Instance::new(ctx.ty.raw_name()).with("name", "Rex"))
}

// =============================================================================
// Precedence
// =============================================================================

mod precedence_tests {
    use super::*;

    #[test]
    fn test_last_supply_wins() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .supply(select::field("id"), |_| Value::Int(1))
            .supply(select::field("id"), |_| Value::Int(2))
            .with_seed(1)
            .build()
            .unwrap();
        assert_eq!(specimen.create(&request).unwrap().get("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_last_value_producer_wins_across_kinds() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .supply(select::field("id"), |_| Value::Int(1))
            .set(select::types("i32"), 3)
            .with_seed(1)
            .build()
            .unwrap();
        assert_eq!(specimen.create(&request).unwrap().get("id"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_ignore_beats_supply_in_either_order() {
        let specimen = specimen(item_model());
        let ignore_first = Request::builder("Item")
            .ignore(select::field("id"))
            .supply(select::field("id"), |_| Value::Int(1))
            .with_seed(1)
            .build()
            .unwrap();
        let ignore_last = Request::builder("Item")
            .set(select::field("id"), 1)
            .ignore(select::field("id"))
            .with_seed(1)
            .build()
            .unwrap();
        for request in [ignore_first, ignore_last] {
            let item = specimen.create(&request).unwrap();
            assert!(item.get("id").is_none());
            assert!(item.get("tags").is_some());
        }
    }

    #[test]
    fn test_nullable_applies_to_explicit_values() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .with_nullable(select::field("id"))
            .set(select::field("id"), 5)
            .with_seed(4)
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        let mut nulls = 0;
        for item in model.create_many(300).unwrap() {
            match item.get("id") {
                Some(Value::Null) => nulls += 1,
                other => assert_eq!(other, Some(&Value::Int(5))),
            }
        }
        assert!(nulls > 0 && nulls < 300, "nulls: {nulls}");
    }

    #[test]
    fn test_explicit_value_ignores_type_nullability() {
        let specimen = specimen(shop_model());
        let settings = Settings::new().with(&Keys::STRING_NULLABLE, true);
        let request = Request::builder("Address")
            .set(select::field("city"), "Lyon")
            .with_settings(&settings)
            .with_seed(4)
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        for address in model.create_many(100).unwrap() {
            assert_eq!(address.get("city"), Some(&Value::from("Lyon")));
        }
    }

    #[test]
    fn test_scenario_supply_and_nullable() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .supply(select::field("id"), |_| Value::Int(7))
            .with_nullable(select::field("tags"))
            .with_seed(42)
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        let items = model.create_many(100).unwrap();

        let mut nulls = 0;
        for item in &items {
            assert_eq!(item.get("id"), Some(&Value::Int(7)));
            match item.get("tags") {
                Some(Value::Null) => nulls += 1,
                Some(Value::List(tags)) => {
                    assert!((2..=6).contains(&tags.len()));
                    assert!(tags.iter().all(|t| t.as_str().is_some()));
                }
                other => panic!("unexpected tags: {other:?}"),
            }
        }
        assert!(nulls > 0 && nulls < items.len(), "nulls: {nulls}");
    }
}

// =============================================================================
// Unused Selectors
// =============================================================================

mod unused_selector_tests {
    use super::*;

    fn unused_of(request: &Request) -> specimen::selectors::UnusedSelectorReport {
        match specimen(item_model()).create(request) {
            Err(Error::UnusedSelectors(report)) => report,
            other => panic!("expected unused selectors, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_field_reported_as_generator() {
        let request = Request::builder("Item")
            .set(select::field("missing"), 1)
            .build()
            .unwrap();
        let report = unused_of(&request);
        assert_eq!(report.len(), 1);
        assert_eq!(report.categories(), vec![Category::Generator]);
        assert!(report.unused[0].location.contains("selector_tests.rs"));
        assert!(report.to_string().contains("missing"));
    }

    #[test]
    fn test_unknown_field_reported_as_ignore() {
        let request = Request::builder("Item")
            .ignore(select::field("missing"))
            .build()
            .unwrap();
        let report = unused_of(&request);
        assert_eq!(report.len(), 1);
        assert_eq!(report.categories(), vec![Category::Ignore]);
    }

    #[test]
    fn test_report_partitions_by_category() {
        let request = Request::builder("Item")
            .ignore(select::field("a"))
            .with_nullable(select::field("b"))
            .on_complete(select::field("c"), |_| {})
            .subtype(select::field("d"), "Item")
            .set(select::field("id"), 3)
            .build()
            .unwrap();
        let report = unused_of(&request);
        assert_eq!(report.len(), 4);
        assert_eq!(
            report.categories(),
            vec![
                Category::Ignore,
                Category::Nullable,
                Category::Callback,
                Category::Subtype
            ]
        );
    }

    #[test]
    fn test_overridden_binding_counts_as_used() {
        let request = Request::builder("Item")
            .set(select::field("id"), 1)
            .set(select::field("id"), 2)
            .build()
            .unwrap();
        assert!(specimen(item_model()).create(&request).is_ok());
    }

    #[test]
    fn test_usage_does_not_depend_on_null_rolls() {
        let specimen = specimen(item_model());
        for seed in 0..60 {
            let request = Request::builder("Item")
                .with_nullable(select::field("tags"))
                .generate(select::types("String"), GenOptions::new().length(2, 2))
                .with_seed(seed)
                .build()
                .unwrap();
            assert!(specimen.create(&request).is_ok(), "seed {seed}");
        }
    }

    #[test]
    fn test_selector_below_ignored_node_is_unused() {
        let request = Request::builder("Item")
            .ignore(select::field("tags"))
            .generate(select::types("String"), GenOptions::new().length(2, 2))
            .build()
            .unwrap();
        let report = unused_of(&request);
        assert_eq!(report.categories(), vec![Category::Generator]);
    }

    #[test]
    fn test_lenient_mode_returns_report() {
        let request = Request::builder("Item")
            .set(select::field("missing"), 1)
            .lenient()
            .with_seed(3)
            .build()
            .unwrap();
        let population = specimen(item_model()).populate(&request).unwrap();
        assert_eq!(population.unused.len(), 1);
        assert!(population.value.get("id").is_some());
    }

    #[test]
    fn test_lenient_mode_from_settings() {
        let settings = Settings::new().with(&Keys::MODE, specimen::settings::Mode::Lenient);
        let request = Request::builder("Item")
            .ignore(select::field("missing"))
            .with_settings(&settings)
            .build()
            .unwrap();
        assert!(specimen(item_model()).create(&request).is_ok());
    }
}

// =============================================================================
// Scope and Depth
// =============================================================================

mod scope_tests {
    use super::*;

    #[test]
    fn test_within_limits_to_subtree() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .set(select::types("String").within(select::field("address")), "X")
            .with_seed(10)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        let x = Value::from("X");
        assert_eq!(order.at("customer.address.street"), Some(&x));
        assert_eq!(order.at("customer.address.zip"), Some(&x));
        assert_ne!(order.at("customer.name"), Some(&x));
    }

    #[test]
    fn test_nested_scopes() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .set(
                select::field("city")
                    .within(select::field("address").within(select::field("customer"))),
                "Lyon",
            )
            .with_seed(10)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert_eq!(order.at("customer.address.city"), Some(&Value::from("Lyon")));
    }

    #[test]
    fn test_depth_selector() {
        let specimen = specimen(linked_model());
        let request = Request::builder("Node")
            .set(select::field("value").at_depth(2), -1)
            .with_max_depth(4)
            .with_seed(10)
            .build()
            .unwrap();
        let node = specimen.create(&request).unwrap();
        assert_eq!(node.at("next.value"), Some(&Value::Int(-1)));
        assert_ne!(node.get("value"), Some(&Value::Int(-1)));
        assert_ne!(node.at("next.next.value"), Some(&Value::Int(-1)));
    }

    #[test]
    fn test_path_selector() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .set(select::path("customer.name"), "Ada")
            .with_seed(10)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert_eq!(order.at("customer.name"), Some(&Value::from("Ada")));
    }

    #[test]
    fn test_group_selector() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .ignore(select::any([select::field("lines"), select::field("notes")]))
            .with_seed(10)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert!(order.get("lines").is_none());
        assert!(order.get("notes").is_none());
        assert!(order.get("customer").is_some());
    }
}

// =============================================================================
// Filters, Callbacks, Assignments
// =============================================================================

mod hook_tests {
    use super::*;

    #[test]
    fn test_filter_regenerates_until_accepted() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .filter(select::field("id"), |v| v.as_i64().is_some_and(|n| n % 2 == 0))
            .with_seed(17)
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        for item in model.create_many(20).unwrap() {
            assert_eq!(item.get("id").and_then(Value::as_i64).map(|n| n % 2), Some(0));
        }
    }

    #[test]
    fn test_null_from_nullable_skips_filters() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .with_nullable(select::field("id"))
            .filter(select::field("id"), |v| v.as_i64().is_some_and(|n| n % 2 == 0))
            .with_seed(21)
            .build()
            .unwrap();
        let model = specimen.model(&request).unwrap();
        let mut nulls = 0;
        for item in model.create_many(200).unwrap() {
            match item.get("id") {
                Some(Value::Null) => nulls += 1,
                other => assert_eq!(other.and_then(Value::as_i64).map(|n| n % 2), Some(0)),
            }
        }
        assert!(nulls > 0);
    }

    #[test]
    fn test_filter_exhaustion_reports_path() {
        let specimen = specimen(item_model());
        let settings = Settings::new().with(&Keys::MAX_GENERATION_ATTEMPTS, 10);
        let request = Request::builder("Item")
            .filter(select::field("id"), |_| false)
            .with_settings(&settings)
            .build()
            .unwrap();
        match specimen.create(&request) {
            Err(Error::FilterExhausted { path, attempts }) => {
                assert_eq!(path, "Item.id");
                assert_eq!(attempts, 10);
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_callback_sees_every_value() {
        let specimen = specimen(item_model());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let request = Request::builder("Item")
            .on_complete(select::field("id"), move |v| {
                sink.lock().unwrap().push(v.clone());
            })
            .with_seed(2)
            .build()
            .unwrap();
        let items = specimen.model(&request).unwrap().create_many(5).unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 5);
        for (item, value) in items.iter().zip(seen.iter()) {
            assert_eq!(item.get("id"), Some(value));
        }
    }

    #[test]
    fn test_callback_for_container_elements() {
        let specimen = specimen(item_model());
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        let request = Request::builder("Item")
            .on_complete(select::types("String"), move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .with_seed(2)
            .build()
            .unwrap();
        let item = specimen.create(&request).unwrap();
        assert_eq!(count.load(Ordering::SeqCst), len_of(item.get("tags")));
    }

    #[test]
    fn test_conditional_assignment() {
        let specimen = specimen(item_model());
        let euro = |country: &str| {
            Request::builder("Invoice")
                .set(select::field("country"), country)
                .assign(
                    Assignment::given(select::field("country"))
                        .satisfies(|v| v.as_str() == Some("DE"))
                        .set(select::field("currency"), "EUR"),
                )
                .with_seed(5)
                .build()
                .unwrap()
        };
        let de = specimen.create(&euro("DE")).unwrap();
        assert_eq!(de.get("currency"), Some(&Value::from("EUR")));

        let us = specimen.create(&euro("US")).unwrap();
        assert_ne!(us.get("currency"), Some(&Value::from("EUR")));
        assert!(us.get("currency").and_then(Value::as_str).is_some());
    }

    #[test]
    fn test_assignment_origin_must_be_valid() {
        let result = Request::builder("Invoice")
            .assign(Assignment::given(select::field("")).set(select::field("currency"), "EUR"))
            .build();
        assert!(matches!(result, Err(Error::InvalidSelector(_))));
    }
}

// =============================================================================
// Custom Generators
// =============================================================================

mod generator_tests {
    use super::*;

    #[test]
    fn test_registered_generator_applies_selectors_by_default() {
        let mut specimen = specimen(shop_model());
        specimen.register_generator("Customer", fixed_customer);
        let request = Request::builder("Order")
            .set(select::field("age"), 30)
            .with_seed(1)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert_eq!(order.at("customer.name"), Some(&Value::from("Fixed")));
        assert_eq!(order.at("customer.age"), Some(&Value::Int(30)));
        assert!(order.at("customer.address").is_none());
    }

    #[test]
    fn test_populate_nulls_completes_value() {
        let mut specimen = specimen(shop_model());
        specimen.register_generator("Customer", fixed_customer);
        let request = Request::builder("Order")
            .generate(
                select::field("customer"),
                GenOptions::new().after_generate(AfterGenerate::PopulateNulls),
            )
            .with_seed(1)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert_eq!(order.at("customer.name"), Some(&Value::from("Fixed")));
        assert!(order.at("customer.address.city").and_then(Value::as_str).is_some());
        assert!(order.at("customer.age").is_some());
    }

    #[test]
    fn test_populate_all_overwrites_value() {
        let mut specimen = specimen(shop_model());
        specimen.register_generator(
            "Customer",
            WithHints::new(
                fixed_customer,
                GeneratorHints {
                    after_generate: Some(AfterGenerate::PopulateAll),
                    ..Default::default()
                },
            ),
        );
        let order = specimen
            .create(&Request::builder("Order").with_seed(1).build().unwrap())
            .unwrap();
        assert_ne!(order.at("customer.name"), Some(&Value::from("Fixed")));
        assert!(order.at("customer.address").is_some());
    }

    #[test]
    fn test_supplied_value_left_untouched() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .supply(select::field("customer"), |_| {
                Value::Object(Instance::new("Customer").with("name", "Ann"))
            })
            .with_seed(1)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        let customer = order.get("customer").and_then(Value::as_object).unwrap();
        assert_eq!(customer.len(), 1);
    }

    #[test]
    fn test_supply_with_after_completes_value() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .supply_with_after(select::field("customer"), AfterGenerate::PopulateNulls, |_| {
                Value::Object(Instance::new("Customer").with("name", "Ann"))
            })
            .with_seed(1)
            .build()
            .unwrap();
        let order = specimen.create(&request).unwrap();
        assert_eq!(order.at("customer.name"), Some(&Value::from("Ann")));
        assert!(order.at("customer.address.street").is_some());
    }

    #[test]
    fn test_generator_for_supertype_used_for_subtype() {
        let mut specimen = specimen(zoo_model());
        specimen.register_generator("Animal", named_rex);
        let request = Request::builder("Zoo")
            .subtype(select::field("star"), "Dog")
            .ignore(select::field("animals"))
            .with_seed(1)
            .build()
            .unwrap();
        let zoo = specimen.create(&request).unwrap();
        assert_eq!(zoo.at("star.name"), Some(&Value::from("Rex")));
        assert_eq!(
            zoo.get("star").and_then(Value::as_object).map(|s| s.type_name()),
            Some("Dog")
        );
    }
}

// =============================================================================
// Assignment Failures
// =============================================================================

mod assignment_error_tests {
    use super::*;

    #[test]
    fn test_wrong_value_type_is_terminal() {
        let specimen = specimen(item_model());
        let request = Request::builder("Item")
            .set(select::field("id"), "seven")
            .build()
            .unwrap();
        match specimen.create(&request) {
            Err(Error::Assignment {
                path,
                expected,
                actual,
            }) => {
                assert_eq!(path, "Item.id");
                assert_eq!(expected, "i32");
                assert_eq!(actual, "String");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_out_of_range_integer_rejected() {
        let specimen = specimen(shop_model());
        let request = Request::builder("Order")
            .set(select::field("age"), 300)
            .build()
            .unwrap();
        assert!(matches!(specimen.create(&request), Err(Error::Assignment { .. })));
    }

    #[test]
    fn test_invalid_range_rejected_at_build() {
        let result = Request::builder("Item")
            .generate(select::field("id"), GenOptions::new().int_range(10, 1))
            .build();
        assert!(matches!(result, Err(Error::InvalidRange { .. })));
    }
}
