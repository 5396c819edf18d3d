use chart_pipeline::data_types::{records_from_values, SharedRecord, ValidationProgress};
use chart_pipeline::{Component, ComponentConfig, ManualClock, Scheduler};
use rand::Rng;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn random_records(n: usize) -> Vec<SharedRecord> {
    let mut rng = rand::rng();
    let values: Vec<Value> = (0..n)
        .map(|i| {
            json!({
                "x": i,
                "y": rng.random_range(-1000.0..1000.0),
                "label": format!("p{i}"),
            })
        })
        .collect();
    records_from_values(values)
}

fn config(step_ms: u64) -> ComponentConfig {
    let mut config = ComponentConfig::default()
        .with_field("x", "x")
        .with_field("y", "y")
        .with_field("label", "label");
    config.parsing_step_duration_ms = step_ms;
    config
}

/// A component whose clock moves 1ms per read and whose budget is 0ms:
/// every batch check exceeds the budget.
fn slow_component() -> Component {
    Component::new(config(0)).with_clock(Arc::new(ManualClock::stepping(Duration::from_millis(1))))
}

#[test]
fn test_small_budget_matches_single_pass() {
    let records = random_records(10_000);

    let mut single = Component::new(config(100)).with_clock(Arc::new(ManualClock::new()));
    single.set_data(records.clone());
    assert_eq!(single.validate_data(), ValidationProgress::Complete);

    let handle = slow_component().into_handle();
    handle.lock().set_data(records);
    let mut scheduler = Scheduler::new();
    scheduler.register(&handle);

    let mut yields = 0;
    let mut last_progress = 0.0;
    for _ in 0..1_000 {
        let report = scheduler.tick();
        if report.yielded == 0 {
            break;
        }
        yields += report.yielded;
        let progress = handle.lock().data_validation_progress();
        assert!(progress > last_progress && progress < 1.0);
        last_progress = progress;
    }

    assert_eq!(yields, 99);
    let chunked = handle.lock();
    assert_eq!(chunked.data_validation_progress(), 1.0);
    assert_eq!(chunked.parse_task().offset, 0);
    assert_eq!(chunked.data_items(), single.data_items());
}

#[test]
fn test_yield_saves_offset_and_progress() {
    let mut component = slow_component();
    component.set_data(random_records(1_000));

    let progress = component.validate_data();
    assert_eq!(progress, ValidationProgress::Yielded { progress: 0.099 });
    assert_eq!(component.parse_task().offset, 100);
    assert_eq!(component.data_items().len(), 100);
    assert!(component.flags().data);
    assert!(!component.flags().data_items);
}

#[test]
fn test_no_yield_when_few_records_remain() {
    let mut component = slow_component();
    component.set_data(random_records(105));
    assert_eq!(component.validate_data(), ValidationProgress::Complete);
    assert_eq!(component.data_items().len(), 105);
}

#[test]
fn test_set_data_during_pending_parse_restarts() {
    let mut component = slow_component();
    component.set_data(random_records(1_000));
    assert!(!component.validate_data().is_complete());

    let fresh = random_records(150);
    component.set_data(fresh.clone());
    while !component.validate_data().is_complete() {}

    assert_eq!(component.data_items().len(), 150);
    for (item, record) in component.data_items().iter().zip(&fresh) {
        assert!(item.data_context().points_to(record));
    }
}

#[test]
fn test_add_data_during_pending_parse_resumes_without_gaps() {
    let mut component = slow_component();
    component.set_data(random_records(1_000));
    assert!(!component.validate_data().is_complete());
    let generation = component.data_generation();

    component.add_data(random_records(50));
    assert_eq!(component.parse_task().offset, 100);
    assert_eq!(component.data_generation(), generation);
    while !component.validate_data().is_complete() {}

    let items = component.data_items();
    assert_eq!(items.len(), 1_050);
    assert!(items.iter().enumerate().all(|(i, item)| item.index() == i));
    for (item, record) in items.iter().zip(component.data()) {
        assert!(item.data_context().points_to(record));
    }
}

#[test]
fn test_add_data_after_completion_parses_only_new_records() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();

    let mut component = Component::new(ComponentConfig::default().with_field("x", "x"));
    component.set_value_adapter(Some(Arc::new(move |_: &str, value: Option<Value>| {
        counter.fetch_add(1, Ordering::SeqCst);
        value
    })));
    component.set_data(random_records(10));
    component.validate_data();
    assert_eq!(calls.load(Ordering::SeqCst), 10);

    component.add_data(random_records(5));
    assert_eq!(component.parse_task().offset, 10);
    component.validate_data();

    assert_eq!(calls.load(Ordering::SeqCst), 15);
    assert_eq!(component.data_items().len(), 15);
    assert_eq!(component.data_items()[14].index(), 14);
    assert_eq!(component.end_index(), 15);
}

#[test]
fn test_add_data_after_set_data_keeps_full_parse() {
    let mut component = Component::new(config(100));
    component.set_data(random_records(20));
    component.validate_data();

    component.set_data(random_records(3));
    component.add_data(random_records(2));
    assert_eq!(component.parse_task().offset, 0);
    component.validate_data();
    assert_eq!(component.data_items().len(), 5);
}

#[test]
fn test_empty_data_clears_items() {
    let mut component = Component::new(config(100));
    component.set_data(random_records(20));
    component.validate_data();

    component.set_data(Vec::new());
    assert!(component.validate_data().is_complete());
    assert!(component.data_items().is_empty());
    assert_eq!((component.start_index(), component.end_index()), (0, 0));
}
