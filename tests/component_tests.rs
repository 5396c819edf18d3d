use chart_pipeline::data_types::{records_from_values, JsonRecordSource, VecRecordSource};
use chart_pipeline::disposer::Disposer;
use chart_pipeline::{
    ChartRegistry, ChartStrategy, Component, ComponentConfig, ComponentEvent, FieldValue, GenericStrategy,
    Scheduler, TreeMap,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

fn config() -> ComponentConfig {
    ComponentConfig::default()
        .with_field("value", "v")
        .with_field("name", "n")
}

fn record_events(component: &Component) -> (Arc<Mutex<Vec<ComponentEvent>>>, chart_pipeline::Subscription) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let subscription = component.on(move |event| sink.lock().push(event.clone()));
    (events, subscription)
}

#[test]
fn test_one_tick_runs_every_stage_in_order() {
    let handle = Component::new(config()).into_handle();
    let (events, _subscription) = record_events(&handle.lock());

    handle
        .lock()
        .set_data_values(vec![json!({ "v": 1, "n": "a" }), json!({ "v": 2, "n": "b" })]);
    assert!(handle.lock().flags().data);

    let mut scheduler = Scheduler::new();
    scheduler.register(&handle);
    let report = scheduler.tick();

    assert_eq!(report.stages_run, 3);
    assert_eq!(
        *events.lock(),
        vec![
            ComponentEvent::PreDataValidate,
            ComponentEvent::DataValidated,
            ComponentEvent::ValuesChanged,
            ComponentEvent::DataRangeChanged,
        ]
    );

    let component = handle.lock();
    assert!(!component.flags().any());
    assert_eq!(component.data_items().len(), 2);
    assert_eq!(component.data_items()[1].number("value"), Some(2.0));
    assert_eq!(component.data_items()[1].text("name"), Some("b"));
    assert_eq!((component.start_index(), component.end_index()), (0, 2));
    assert_eq!(component.data_validation_progress(), 1.0);
    drop(component);
    assert!(scheduler.is_idle());
}

#[test]
fn test_validate_data_is_idempotent() {
    let mut component = Component::new(config());
    component.set_data_values(vec![json!({ "v": 1 }), json!({ "n": "x", "v": null }), json!({ "v": 3.5 })]);
    component.validate_data();
    let first = component.data_items().to_vec();

    component.invalidate_data();
    component.validate_data();
    assert_eq!(component.data_items(), first.as_slice());
    assert!(first[1].value("value").is_none());
}

#[test]
fn test_set_item_value_marks_items_dirty_only_on_change() {
    let mut component = Component::new(config());
    component.set_data_values(vec![json!({ "v": 1 })]);
    component.validate_data();
    component.validate_data_items();
    component.validate_data_range();
    assert!(!component.flags().any());

    assert!(!component.set_item_value(0, "value", FieldValue::Number(1.0)));
    assert!(!component.flags().data_items);

    assert!(component.set_item_value(0, "value", FieldValue::Number(5.0)));
    assert!(component.flags().data_items);
    assert_eq!(component.data_items()[0].number("value"), Some(5.0));

    assert!(!component.set_item_value(7, "value", FieldValue::Number(1.0)));
}

#[test]
fn test_bind_data_field_rebinds_existing_items() {
    let handle = Component::new(config()).into_handle();
    handle
        .lock()
        .set_data_values(vec![json!({ "v": 1, "extra": "x" }), json!({ "v": 2, "extra": "y" })]);
    let mut scheduler = Scheduler::new();
    scheduler.register(&handle);
    scheduler.tick();

    handle.lock().bind_data_field("label", "extra");
    {
        let component = handle.lock();
        assert!(component.flags().raw_data);
        assert!(component.flags().data_range);
        assert!(!component.flags().data);
    }

    scheduler.tick();
    let component = handle.lock();
    assert_eq!(component.data_items().len(), 2);
    assert_eq!(component.data_items()[0].text("label"), Some("x"));
    assert_eq!(component.data_items()[1].text("label"), Some("y"));
}

#[test]
fn test_in_place_record_edit_then_invalidate_raw_data() {
    let records = records_from_values(vec![json!({ "v": 1 }), json!({ "v": 2 })]);
    let mut component = Component::new(config());
    component.set_data(records.clone());
    component.validate_data();

    records[0].write().insert("v".to_string(), json!(10));
    component.invalidate_raw_data();
    component.validate_raw_data();

    assert_eq!(component.data_items().len(), 2);
    assert_eq!(component.data_items()[0].number("value"), Some(10.0));
    assert!(component.data_items()[0].data_context().points_to(&records[0]));
    assert!(component.flags().data_items);
}

#[test]
fn test_value_adapter_sees_every_field() {
    let mut component = Component::new(config());
    component.set_value_adapter(Some(Arc::new(|field: &str, value: Option<Value>| match field {
        "value" => value.and_then(|v| v.as_f64()).map(|v| json!(v * 100.0)),
        _ => value,
    })));
    component.set_data_values(vec![json!({ "v": 2, "n": "a" })]);
    component.validate_data();

    let item = &component.data_items()[0];
    assert_eq!(item.number("value"), Some(200.0));
    assert_eq!(item.text("name"), Some("a"));
}

#[test]
fn test_failed_coercion_leaves_field_unset() {
    let mut component = Component::new(config().with_number_field("value"));
    component.set_data_values(vec![json!({ "v": "12.5" }), json!({ "v": "n/a" }), json!({ "v": [1, 2] })]);
    component.validate_data();

    let items = component.data_items();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].number("value"), Some(12.5));
    assert_eq!(items[1].value("value"), None);
    assert_eq!(items[2].value("value"), None);
    assert_eq!(component.binding_failures(), 2);
}

#[test]
fn test_nested_children_bind_one_level_deeper() {
    let mut config = config().with_field("children", "kids");
    config.children_fields.insert("children".to_string());
    let mut component = Component::new(config);
    component.set_data_values(vec![json!({
        "n": "root",
        "kids": [{ "n": "a", "v": 1 }, { "n": "b", "v": 2, "kids": [{ "n": "c", "v": 3 }] }]
    })]);
    component.validate_data();

    let root = &component.data_items()[0];
    let children = root.children("children").unwrap();
    assert_eq!(children.len(), 2);
    assert_eq!(children[1].level(), 1);
    assert_eq!(children[1].index(), 1);
    assert_eq!(children[1].text("name"), Some("b"));

    let grandchild = &children[1].children("children").unwrap()[0];
    assert_eq!(grandchild.level(), 2);
    assert_eq!(grandchild.number("value"), Some(3.0));
    assert_eq!(grandchild.data_context().path().len(), 2);
    let snapshot = grandchild.data_context().snapshot().unwrap();
    assert_eq!(snapshot["n"], json!("c"));
}

#[test]
fn test_property_fields_copy_raw_values() {
    let mut component = Component::new(config().with_property("fill", "color"));
    component.set_data_values(vec![json!({ "v": 1, "color": "#ff0000" }), json!({ "v": 2 })]);
    component.validate_data();

    assert_eq!(component.data_items()[0].property("fill"), Some(&json!("#ff0000")));
    assert!(component.data_items()[1].properties().is_empty());
}

#[test]
fn test_dropping_subscription_unsubscribes() {
    let mut component = Component::new(config());
    let count = Arc::new(Mutex::new(0));
    let sink = count.clone();
    let subscription = component.on(move |_| *sink.lock() += 1);

    component.set_data_values(vec![json!({ "v": 1 })]);
    component.validate_data();
    assert_eq!(*count.lock(), 2);

    drop(subscription);
    component.invalidate_data();
    component.validate_data();
    assert_eq!(*count.lock(), 2);
}

#[test]
fn test_disposers_run_with_component() {
    let mut component = Component::new(config());
    let mut other = Component::new(config());
    let released = Arc::new(Mutex::new(Vec::new()));
    let sink = released.clone();
    component.add_disposer(Disposer::new(move || sink.lock().push("cache")));
    let seen = Arc::new(Mutex::new(0));
    let sink = seen.clone();
    component.add_disposer(other.on(move |_| *sink.lock() += 1));

    other.set_data_values(vec![json!({ "v": 1 })]);
    other.validate_data();
    assert_eq!(*seen.lock(), 2);

    component.dispose();
    assert_eq!(*released.lock(), vec!["cache"]);
    other.invalidate_data();
    other.validate_data();
    assert_eq!(*seen.lock(), 2);

    let sink = released.clone();
    component.add_disposer(Disposer::new(move || sink.lock().push("late")));
    assert_eq!(*released.lock(), vec!["cache", "late"]);
}

#[test]
fn test_disposed_component_leaves_scheduler() {
    let handle = Component::new(config()).into_handle();
    let mut scheduler = Scheduler::new();
    scheduler.register(&handle);
    handle.lock().set_data_values(vec![json!({ "v": 1 })]);
    scheduler.tick();

    handle.lock().dispose();
    handle.lock().invalidate_data();
    assert!(!handle.lock().flags().any());
    assert!(handle.lock().data_items().is_empty());

    let report = scheduler.tick();
    assert_eq!(report.stages_run, 0);
    assert!(scheduler.is_empty());
}

#[test]
fn test_dropped_handle_is_unregistered() {
    let mut scheduler = Scheduler::new();
    {
        let handle = Component::new(config()).into_handle();
        scheduler.register(&handle);
        assert_eq!(scheduler.len(), 1);
    }
    scheduler.tick();
    assert!(scheduler.is_empty());
}

#[test]
fn test_load_from_record_sources() {
    let mut component = Component::new(config());
    component
        .load(&VecRecordSource::new(vec![json!({ "v": 1 }), json!({ "v": 2 })]))
        .unwrap();
    component.validate_data();
    assert_eq!(component.data_items().len(), 2);

    component
        .load(&JsonRecordSource::new(r#"[{"v": 4}, {"v": 5}, {"v": 6}]"#))
        .unwrap();
    component.validate_data();
    assert_eq!(component.data_items().len(), 3);

    let err = component.load(&JsonRecordSource::new("not json")).unwrap_err();
    assert!(err.to_string().contains("invalid JSON"));
    assert_eq!(component.data().len(), 3);
}

#[test]
fn test_registry_creates_strategies_by_name() {
    let registry = ChartRegistry::with_defaults();
    assert!(registry.contains("Component"));
    assert!(registry.contains("TreeMap"));
    assert!(registry.create("PieChart").is_err());

    let strategy = registry.create("TreeMap").unwrap();
    assert_eq!(strategy.name(), "TreeMap");

    let mut component = Component::with_strategy(strategy, ComponentConfig::default());
    assert!(component.config().children_fields.contains("children"));
    component.set_data_values(vec![json!({ "name": "a", "value": 3 }), json!({ "name": "b", "value": 1 })]);
    component.validate_data();

    let treemap = component.strategy_as::<TreeMap>().unwrap();
    assert_eq!(treemap.tree().unwrap().len(), 3);
    assert!(component.strategy_as::<GenericStrategy>().is_none());
}

#[test]
fn test_generic_strategy_tracks_visible_window() {
    let mut component = Component::new(config());
    component.set_data_values((0..10).map(|i| json!({ "v": i })).collect());
    component.validate_data();
    component.zoom_to_indexes(2, 6, false, true);
    component.validate_data_range();

    assert_eq!(component.strategy().visible(), 2..6);
    assert_eq!(component.working_range(), 2..6);
    assert_eq!(component.visible_items().len(), 4);
    assert_eq!(component.visible_items()[0].number("value"), Some(2.0));
}
