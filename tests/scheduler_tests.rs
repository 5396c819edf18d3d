use chart_pipeline::{Component, ComponentConfig, ManualClock, Scheduler, ZoomRange};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn animated_component(n: usize) -> Component {
    let mut config = ComponentConfig::default().with_field("value", "v");
    config.range_change_duration_ms = 100;
    let mut component = Component::new(config);
    component.set_data_values((0..n).map(|i| json!({ "v": i })).collect());
    component
}

#[test]
fn test_tick_advances_animations_by_clock_delta() {
    let clock = Arc::new(ManualClock::new());
    let mut scheduler = Scheduler::with_clock(clock.clone());
    let handle = animated_component(100).into_handle();
    scheduler.register(&handle);
    scheduler.tick();

    handle.lock().zoom(ZoomRange::new(0.0, 0.5), false, false);
    assert!(!scheduler.is_idle());

    // No time has passed: the range stays put.
    scheduler.tick();
    assert_eq!(handle.lock().end(), 1.0);

    clock.advance(Duration::from_millis(40));
    scheduler.tick();
    let end = handle.lock().end();
    assert!(end < 1.0 && end > 0.5);
    assert!(handle.lock().flags().data_range);

    clock.advance(Duration::from_millis(60));
    scheduler.tick();
    assert!(!handle.lock().is_animating());
    assert_eq!(handle.lock().end(), 0.5);

    scheduler.tick();
    assert_eq!(handle.lock().working_range(), 0..50);
    assert!(scheduler.is_idle());
}

#[test]
fn test_run_until_idle_finishes_parse_and_animation() {
    let clock = Arc::new(ManualClock::stepping(Duration::from_millis(20)));
    let mut scheduler = Scheduler::with_clock(clock);
    let handle = animated_component(10).into_handle();
    scheduler.register(&handle);

    assert_eq!(scheduler.run_until_idle(10), 1);
    handle.lock().zoom(ZoomRange::new(0.5, 1.0), false, false);

    let ticks = scheduler.run_until_idle(50);
    assert!(ticks >= 5 && ticks < 50, "took {ticks} ticks");
    let component = handle.lock();
    assert_eq!((component.start(), component.end()), (0.5, 1.0));
    assert_eq!(component.working_range(), 5..10);
}

#[test]
fn test_run_until_idle_respects_tick_limit() {
    let mut scheduler = Scheduler::with_clock(Arc::new(ManualClock::new()));
    let handle = animated_component(10).into_handle();
    scheduler.register(&handle);
    scheduler.run_until_idle(10);

    handle.lock().zoom(ZoomRange::new(0.5, 1.0), false, false);
    assert_eq!(scheduler.run_until_idle(3), 3);
    assert!(handle.lock().is_animating());
}

#[test]
fn test_stages_run_across_components_in_order() {
    let mut scheduler = Scheduler::new();
    let handles: Vec<_> = (0..3).map(|n| animated_component(n + 1).into_handle()).collect();
    for handle in &handles {
        scheduler.register(handle);
    }

    let report = scheduler.tick();
    assert_eq!(report.stages_run, 9);
    assert_eq!(report.yielded, 0);
    for (n, handle) in handles.iter().enumerate() {
        assert_eq!(handle.lock().data_items().len(), n + 1);
        assert!(!handle.lock().flags().any());
    }
    assert_eq!(scheduler.tick().stages_run, 0);
}
