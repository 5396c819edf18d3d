use crate::data_types::{ComponentConfig, DataItem};
use crate::treemap::TreeMap;
use eyre::{eyre, Result};
use std::any::Any;
use std::collections::BTreeMap;
use std::ops::Range;

/// Trait for the chart-specific behavior plugged into a
/// [`Component`](crate::Component).
pub trait ChartStrategy: Send + 'static {
    fn name(&self) -> &'static str;

    /// Adjusts the component configuration before any binding happens.
    fn configure(&mut self, _config: &mut ComponentConfig) {}

    /// Called after the generic field binding of every item (including re-binds).
    fn bind(&mut self, _item: &mut DataItem) {}

    /// Called once all records are parsed.
    fn on_data_validated(&mut self, _items: &[DataItem]) {}

    /// Called when the visible index window `[start, end)` is revalidated.
    fn on_range_changed(&mut self, _items: &[DataItem], _window: Range<usize>) {}

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl ChartStrategy for Box<dyn ChartStrategy> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn configure(&mut self, config: &mut ComponentConfig) {
        (**self).configure(config)
    }

    fn bind(&mut self, item: &mut DataItem) {
        (**self).bind(item)
    }

    fn on_data_validated(&mut self, items: &[DataItem]) {
        (**self).on_data_validated(items)
    }

    fn on_range_changed(&mut self, items: &[DataItem], window: Range<usize>) {
        (**self).on_range_changed(items, window)
    }

    fn as_any(&self) -> &dyn Any {
        (**self).as_any()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        (**self).as_any_mut()
    }
}

/// Plain component: remembers the visible window, nothing else.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GenericStrategy {
    visible: Range<usize>,
}

impl GenericStrategy {
    pub fn visible(&self) -> Range<usize> {
        self.visible.clone()
    }
}

impl ChartStrategy for GenericStrategy {
    fn name(&self) -> &'static str {
        "Component"
    }

    fn on_range_changed(&mut self, _items: &[DataItem], window: Range<usize>) {
        self.visible = window;
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

type StrategyFactory = Box<dyn Fn() -> Box<dyn ChartStrategy> + Send + Sync>;

/// Chart kinds addressable by name.
#[derive(Default)]
pub struct ChartRegistry {
    factories: BTreeMap<String, StrategyFactory>,
}

impl ChartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `"Component"` and `"TreeMap"`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("Component", || Box::new(GenericStrategy::default()));
        registry.register("TreeMap", || Box::new(TreeMap::default()));
        registry
    }

    /// Registers `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> Box<dyn ChartStrategy> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str) -> Result<Box<dyn ChartStrategy>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| eyre!("unknown chart type '{name}'"))?;
        Ok(factory())
    }
}

impl std::fmt::Debug for ChartRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}
