//! Data pipeline of a chart element.
//!
//! A [`Component`] owns raw records, parses them into [`DataItem`]s in
//! time-boxed steps, tracks what needs revalidation through four dirty flags
//! and exposes a zoomable window over its items. Other components can be
//! registered as data users: they share the raw records and receive their
//! own items, bound with their own fields, while the provider parses.

use crate::animation::RangeAnimation;
use crate::binding::{FieldBinder, ValueAdapter};
use crate::data_types::{
    records_from_values, ComponentConfig, DataContext, DataItem, FieldValue, InvalidFlags, ParseTask,
    RecordSource, SharedRecord, Stage, ValidationProgress, ZoomRange,
};
use crate::disposer::{Disposer, MultiDisposer, MutableValueDisposer};
use crate::events::{ComponentEvent, EventDispatcher, Subscription};
use crate::scheduler::{Clock, SystemClock, Validatable};
use crate::strategy::{ChartStrategy, GenericStrategy};
use crate::utils::date_parser::DateParser;
use crate::utils::{fit_to_range, round_to};
use crate::view_controller::ViewController;
use eyre::Result;
use parking_lot::Mutex;
use serde_json::Value;
use slotmap::{new_key_type, SlotMap};
use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

/// Records parsed between two checks of the step budget.
pub const PARSE_BATCH_SIZE: usize = 100;
/// A step never yields when fewer records than this remain.
pub const MIN_REMAINING_TO_YIELD: usize = 10;

new_key_type! {
    /// Key of a data user in its provider's registry.
    pub struct DataUserId;
}

pub type ComponentHandle<S = GenericStrategy> = Arc<Mutex<Component<S>>>;

type DataUserList = Arc<Mutex<SlotMap<DataUserId, Arc<Mutex<dyn DataUser>>>>>;

/// The side of a component that a data provider drives.
///
/// A component must never be registered as its own data user.
pub trait DataUser: Send {
    fn has_provider(&self) -> bool;

    /// Stores the link to a provider. Replacing a link releases the old one.
    fn attach_provider(&mut self, id: DataUserId, link: Disposer);

    fn detach_provider(&mut self);

    /// The provider starts a full parse.
    fn begin_provider_parse(&mut self);

    /// The provider parsed record `index`.
    fn process_provider_record(&mut self, index: usize, record: &SharedRecord);

    /// The provider finished parsing. `full` is false when only appended
    /// records were parsed.
    fn provider_data_validated(&mut self, full: bool);

    fn invalidate_data_items(&mut self);

    fn invalidate_raw_data(&mut self);

    /// Re-binds existing items from their data contexts.
    fn validate_raw_data(&mut self);
}

pub struct Component<S: ChartStrategy = GenericStrategy> {
    strategy: S,
    config: ComponentConfig,
    date_parser: DateParser,
    value_adapter: Option<ValueAdapter>,

    data: Vec<SharedRecord>,
    data_items: Vec<DataItem>,
    flags: InvalidFlags,
    parse_task: ParseTask,
    data_generation: u64,
    data_validation_progress: f64,
    binding_failures: usize,

    start: f64,
    end: f64,
    start_index: usize,
    end_index: usize,
    indexed_len: Option<usize>,
    prev_window: Option<(usize, usize)>,
    working_window: (usize, usize),
    final_range: Option<(f64, f64)>,
    animation: Option<RangeAnimation>,
    animation_skips_event: bool,

    data_users: DataUserList,
    provider: MutableValueDisposer<DataUserId>,
    disposers: MultiDisposer,
    events: EventDispatcher,
    clock: Arc<dyn Clock>,
    disposed: bool,
}

impl Component<GenericStrategy> {
    pub fn new(config: ComponentConfig) -> Self {
        Self::with_strategy(GenericStrategy::default(), config)
    }
}

impl<S: ChartStrategy> Component<S> {
    pub fn with_strategy(mut strategy: S, mut config: ComponentConfig) -> Self {
        strategy.configure(&mut config);
        let date_parser = config.date_parser();
        Self {
            strategy,
            config,
            date_parser,
            value_adapter: None,
            data: Vec::new(),
            data_items: Vec::new(),
            flags: InvalidFlags::default(),
            parse_task: ParseTask::default(),
            data_generation: 0,
            data_validation_progress: 0.0,
            binding_failures: 0,
            start: 0.0,
            end: 1.0,
            start_index: 0,
            end_index: 0,
            indexed_len: None,
            prev_window: None,
            working_window: (0, 0),
            final_range: None,
            animation: None,
            animation_skips_event: false,
            data_users: Arc::new(Mutex::new(SlotMap::with_key())),
            provider: MutableValueDisposer::new(),
            disposers: MultiDisposer::default(),
            events: EventDispatcher::new(),
            clock: Arc::new(SystemClock),
            disposed: false,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn into_handle(self) -> ComponentHandle<S> {
        Arc::new(Mutex::new(self))
    }

    // --- accessors ---

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    pub fn strategy_mut(&mut self) -> &mut S {
        &mut self.strategy
    }

    /// Downcasts the strategy, for components holding a boxed one.
    pub fn strategy_as<T: 'static>(&self) -> Option<&T> {
        self.strategy.as_any().downcast_ref()
    }

    pub fn strategy_as_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.strategy.as_any_mut().downcast_mut()
    }

    pub fn config(&self) -> &ComponentConfig {
        &self.config
    }

    pub fn data(&self) -> &[SharedRecord] {
        &self.data
    }

    pub fn data_items(&self) -> &[DataItem] {
        &self.data_items
    }

    pub fn flags(&self) -> InvalidFlags {
        self.flags
    }

    pub fn parse_task(&self) -> ParseTask {
        self.parse_task
    }

    pub fn data_generation(&self) -> u64 {
        self.data_generation
    }

    pub fn data_validation_progress(&self) -> f64 {
        self.data_validation_progress
    }

    /// Fields that failed coercion since the component was created.
    pub fn binding_failures(&self) -> usize {
        self.binding_failures
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    pub fn range(&self) -> ZoomRange {
        ZoomRange::new(self.start, self.end)
    }

    pub fn start_index(&self) -> usize {
        self.start_index
    }

    pub fn end_index(&self) -> usize {
        self.end_index
    }

    /// Window applied by the last range change.
    pub fn working_range(&self) -> Range<usize> {
        self.working_window.0..self.working_window.1
    }

    pub fn visible_items(&self) -> &[DataItem] {
        let end = self.end_index.min(self.data_items.len());
        let start = self.start_index.min(end);
        &self.data_items[start..end]
    }

    pub fn zoom_factor(&self) -> f64 {
        ViewController::zoom_factor(self.start, self.end, self.config.max_zoom_factor())
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn on(&self, listener: impl FnMut(&ComponentEvent) + Send + 'static) -> Subscription {
        self.events.on(listener)
    }

    // --- data ---

    /// Replaces the raw records. Any parse in progress is abandoned.
    pub fn set_data(&mut self, records: Vec<SharedRecord>) {
        self.data = records;
        self.data_generation += 1;
        self.parse_task = ParseTask::new(0, self.data_generation);
        tracing::debug!(records = self.data.len(), generation = self.data_generation, "data replaced");
        self.invalidate_data();
    }

    pub fn set_data_values(&mut self, values: Vec<Value>) {
        self.set_data(records_from_values(values));
    }

    /// Appends records. Only the new records are parsed, unless a full
    /// parse is already pending.
    pub fn add_data(&mut self, records: Vec<SharedRecord>) {
        if !self.flags.data {
            self.parse_task = ParseTask::new(self.data_items.len(), self.data_generation);
        }
        self.data.extend(records);
        tracing::debug!(records = self.data.len(), from = self.parse_task.offset, "data appended");
        self.invalidate_data();
    }

    pub fn add_data_values(&mut self, values: Vec<Value>) {
        self.add_data(records_from_values(values));
    }

    pub fn load(&mut self, source: &dyn RecordSource) -> Result<()> {
        let records = source.records()?;
        self.set_data(records);
        Ok(())
    }

    /// Maps logical field `logical` onto raw key `raw`. Existing items
    /// re-bind on the next validation.
    pub fn bind_data_field(&mut self, logical: &str, raw: &str) {
        self.config.data_fields.insert(logical.to_string(), raw.to_string());
        self.invalidate_data_range();
        self.invalidate_raw_data();
    }

    pub fn set_value_adapter(&mut self, adapter: Option<ValueAdapter>) {
        self.value_adapter = adapter;
        self.invalidate_raw_data();
    }

    /// Sets one value of item `index`. Returns `true` if it changed.
    pub fn set_item_value(&mut self, index: usize, field: &str, value: FieldValue) -> bool {
        let changed = self
            .data_items
            .get_mut(index)
            .is_some_and(|item| item.set_value(field, value));
        if changed {
            self.invalidate_data_items();
        }
        changed
    }

    // --- data users ---

    /// Registers `user` to receive items parsed from this component's records.
    ///
    /// Forces a full reparse so the user receives every record.
    pub fn add_data_user<U: DataUser + 'static>(&mut self, user: &Arc<Mutex<U>>) -> DataUserId {
        let handle: Arc<Mutex<dyn DataUser>> = user.clone();
        let id = self.data_users.lock().insert(handle);

        let users = Arc::downgrade(&self.data_users);
        let link = Disposer::new(move || {
            if let Some(users) = users.upgrade() {
                users.lock().remove(id);
            }
        });
        user.lock().attach_provider(id, link);

        self.data_generation += 1;
        self.invalidate_data();
        id
    }

    pub fn remove_data_user(&mut self, id: DataUserId) -> bool {
        let removed = self.data_users.lock().remove(id);
        match removed {
            Some(user) => {
                user.lock().detach_provider();
                true
            }
            None => false,
        }
    }

    pub fn data_user_ids(&self) -> Vec<DataUserId> {
        self.data_users.lock().keys().collect()
    }

    fn users(&self) -> Vec<Arc<Mutex<dyn DataUser>>> {
        self.data_users.lock().values().cloned().collect()
    }

    // --- invalidation ---

    pub fn invalidate_data(&mut self) {
        if self.disposed {
            return;
        }
        self.flags.data = true;
        for user in self.users() {
            user.lock().invalidate_data_items();
        }
    }

    pub fn invalidate_data_items(&mut self) {
        if self.disposed {
            return;
        }
        self.flags.data_items = true;
        for user in self.users() {
            user.lock().invalidate_data_items();
        }
    }

    pub fn invalidate_data_range(&mut self) {
        if self.disposed {
            return;
        }
        self.flags.data_range = true;
    }

    pub fn invalidate_raw_data(&mut self) {
        if self.disposed {
            return;
        }
        self.flags.raw_data = true;
        for user in self.users() {
            user.lock().invalidate_raw_data();
        }
    }

    // --- validation ---

    fn bind_item(&mut self, item: &mut DataItem) {
        let binder = FieldBinder::new(&self.config, &self.date_parser, self.value_adapter.as_ref());
        self.binding_failures += binder.bind(item);
        self.strategy.bind(item);
    }

    fn process_record(&mut self, index: usize, record: &SharedRecord) {
        let mut item = DataItem::new(index, 0);
        item.set_data_context(DataContext::new(record));
        self.bind_item(&mut item);
        self.data_items.push(item);
    }

    /// Re-binds every existing item (and those of data users) in place.
    pub fn validate_raw_data(&mut self) {
        self.flags.raw_data = false;
        let mut items = std::mem::take(&mut self.data_items);
        for item in &mut items {
            self.bind_item(item);
        }
        self.data_items = items;
        tracing::debug!(items = self.data_items.len(), "raw data re-bound");

        for user in self.users() {
            user.lock().validate_raw_data();
        }
        self.invalidate_data_items();
    }

    fn reset_range_cache(&mut self) {
        self.prev_window = None;
        self.indexed_len = None;
    }

    fn recompute_indices(&mut self) {
        let len = self.data_items.len();
        self.start_index = ViewController::start_index_from_fraction(self.start, len);
        self.end_index = ViewController::end_index_from_fraction(self.end, len).max(self.start_index);
        self.indexed_len = Some(len);
    }

    fn finish_parse(&mut self, full: bool) {
        self.data_validation_progress = 1.0;
        if full && self.config.reset_zoom_on_data_update {
            self.start = 0.0;
            self.end = 1.0;
            self.final_range = None;
            self.animation = None;
        }
        self.recompute_indices();
        self.invalidate_data_items();
        self.events.emit(ComponentEvent::DataValidated);
        self.strategy.on_data_validated(&self.data_items);
    }

    /// Parses pending records, yielding once the step budget is spent.
    pub fn validate_data(&mut self) -> ValidationProgress {
        self.events.emit(ComponentEvent::PreDataValidate);
        self.flags.data = false;

        if self.parse_task.generation != self.data_generation {
            if self.parse_task.offset > 0 {
                tracing::debug!(offset = self.parse_task.offset, "stale parse task, restarting");
            }
            self.parse_task = ParseTask::new(0, self.data_generation);
        }

        let users = self.users();
        let from = self.parse_task.offset;
        if from == 0 {
            if !(self.has_provider() && self.data.is_empty()) {
                self.data_items.clear();
            }
            self.data_validation_progress = 0.0;
            self.reset_range_cache();
            for user in &users {
                user.lock().begin_provider_parse();
            }
        }

        let len = self.data.len();
        let budget = self.config.parsing_step_duration();
        let step_started = self.clock.now();
        let mut counter = 0;

        for i in from..len {
            let record = self.data[i].clone();
            self.process_record(i, &record);
            for user in &users {
                user.lock().process_provider_record(i, &record);
            }

            counter += 1;
            if counter == PARSE_BATCH_SIZE {
                counter = 0;
                let elapsed = self.clock.now().saturating_duration_since(step_started);
                tracing::trace!(parsed = i + 1, total = len, ?elapsed, "parse batch");
                if elapsed > budget && i + MIN_REMAINING_TO_YIELD < len {
                    self.parse_task = ParseTask::new(i + 1, self.data_generation);
                    self.data_validation_progress = i as f64 / len as f64;
                    tracing::debug!(offset = i + 1, total = len, "parse step yielded");
                    self.invalidate_data();
                    return ValidationProgress::Yielded {
                        progress: self.data_validation_progress,
                    };
                }
            }
        }

        self.parse_task = ParseTask::new(0, self.data_generation);
        tracing::debug!(items = self.data_items.len(), from, "data validated");
        for user in &users {
            user.lock().provider_data_validated(from == 0);
        }
        self.finish_parse(from == 0);
        ValidationProgress::Complete
    }

    pub fn validate_data_items(&mut self) {
        self.flags.data_items = false;
        self.invalidate_data_range();
        self.events.emit(ComponentEvent::ValuesChanged);
    }

    pub fn validate_data_range(&mut self) {
        self.flags.data_range = false;
        let len = self.data_items.len();
        if self.indexed_len != Some(len) {
            self.recompute_indices();
        }

        let window = (self.start_index, self.end_index);
        if self.prev_window != Some(window) {
            self.working_window = window;
            self.prev_window = Some(window);
        }

        let end = self.working_window.1.min(len);
        let start = self.working_window.0.min(end);
        self.strategy.on_range_changed(&self.data_items, start..end);
        self.events.emit(ComponentEvent::DataRangeChanged);
    }

    // --- zoom ---

    fn apply_range(&mut self, start: f64, end: f64, skip_range_event: bool) {
        let start = round_to(start, 5);
        let end = round_to(end, 5);
        if start == self.start && end == self.end {
            return;
        }
        self.start = start;
        self.end = end;
        self.recompute_indices();
        self.invalidate_data_range();
        if !skip_range_event {
            self.events.emit(ComponentEvent::RangeChanged { start, end });
        }
    }

    pub fn set_start(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.final_range = None;
        self.apply_range(fit_to_range(value, 0.0, self.end), self.end, false);
    }

    pub fn set_end(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }
        self.final_range = None;
        self.apply_range(self.start, fit_to_range(value, self.start, 1.0), false);
    }

    /// Sets the first visible index, clamped into `[0, len]`. The start
    /// fraction follows; the index is kept as given.
    pub fn set_start_index(&mut self, index: usize) {
        let len = self.data_items.len();
        let index = index.min(len);
        self.final_range = None;
        self.start_index = index;
        self.start = ViewController::fraction_from_index(index as f64, len);
        if self.end_index < index {
            self.end_index = index;
            self.end = self.start;
        }
        self.indexed_len = Some(len);
        self.invalidate_data_range();
    }

    pub fn set_end_index(&mut self, index: usize) {
        let len = self.data_items.len();
        let index = index.min(len);
        self.final_range = None;
        self.end_index = index;
        self.end = ViewController::fraction_from_index(index as f64, len);
        if self.start_index > index {
            self.start_index = index;
            self.start = self.end;
        }
        self.indexed_len = Some(len);
        self.invalidate_data_range();
    }

    /// Zooms to a fractional window and returns the window actually applied.
    ///
    /// A NaN bound leaves the range unchanged. With a range change duration
    /// configured and `instant` unset, the window is animated.
    pub fn zoom(&mut self, range: ZoomRange, skip_range_event: bool, instant: bool) -> ZoomRange {
        if range.start.is_nan() || range.end.is_nan() {
            return self.range();
        }

        let target = ViewController::clamp_zoom(range, self.config.max_zoom_factor());
        let pair = (target.start, target.end);
        if self.final_range == Some(pair) {
            return target;
        }
        self.final_range = Some(pair);

        let duration = self.config.range_change_duration();
        if !duration.is_zero() && !instant {
            if let Some(animation) = &self.animation {
                if !animation.is_finished() && animation.target() == pair {
                    return target;
                }
            }
            self.animation = Some(RangeAnimation::new((self.start, self.end), pair, duration));
            self.animation_skips_event = skip_range_event;
        } else {
            self.animation = None;
            self.apply_range(pair.0, pair.1, skip_range_event);
        }
        target
    }

    /// Zooms to `[start_index, end_index)`. Ignored when there are no items.
    pub fn zoom_to_indexes(
        &mut self,
        start_index: usize,
        end_index: usize,
        skip_range_event: bool,
        instant: bool,
    ) -> ZoomRange {
        let len = self.data_items.len();
        if len == 0 {
            return self.range();
        }
        let range = ZoomRange::new(start_index as f64 / len as f64, end_index as f64 / len as f64);
        self.zoom(range, skip_range_event, instant)
    }

    /// Sets the zoom limit; a window narrower than the new limit is widened.
    pub fn set_max_zoom_factor(&mut self, max_zoom_factor: Option<f64>) {
        self.config.max_zoom_factor = max_zoom_factor;
        let max = self.config.max_zoom_factor();
        let span = self.end - self.start;
        if span <= 0.0 || 1.0 / span > max {
            let clamped = ViewController::clamp_zoom(self.range(), max);
            self.final_range = None;
            self.animation = None;
            self.apply_range(clamped.start, clamped.end, false);
            self.invalidate_data_range();
        }
    }

    /// Advances a running range animation.
    pub fn advance_animation(&mut self, dt: Duration) -> bool {
        let Some(animation) = self.animation.as_mut() else {
            return false;
        };
        let (start, end) = animation.advance(dt);
        let finished = animation.is_finished();
        if finished {
            self.animation = None;
        }
        self.apply_range(start, end, self.animation_skips_event);
        !finished
    }

    // --- lifecycle ---

    /// Ties `disposer` to this component's lifetime: it runs on
    /// [`Component::dispose`], or right away on a disposed component.
    pub fn add_disposer(&mut self, disposer: impl Into<Disposer>) {
        self.disposers.push(disposer.into());
    }

    /// True while this component is registered as another one's data user.
    pub fn has_provider(&self) -> bool {
        self.provider.get().is_some()
    }

    /// Releases data, items, data users and listeners. A disposed component
    /// ignores invalidation and drops out of its scheduler.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        let users: Vec<_> = self.data_users.lock().drain().collect();
        for (_, user) in users {
            user.lock().detach_provider();
        }
        self.provider.reset();
        self.disposers.dispose();
        self.events.clear();
        self.animation = None;
        self.flags = InvalidFlags::default();
        self.data.clear();
        self.data_items.clear();
        tracing::debug!(strategy = self.strategy.name(), "component disposed");
    }
}

impl<S: ChartStrategy> DataUser for Component<S> {
    fn has_provider(&self) -> bool {
        Component::has_provider(self)
    }

    fn attach_provider(&mut self, id: DataUserId, link: Disposer) {
        self.provider.set(id, link);
    }

    fn detach_provider(&mut self) {
        self.provider.reset();
    }

    fn begin_provider_parse(&mut self) {
        self.data_items.clear();
        self.data_validation_progress = 0.0;
        self.reset_range_cache();
    }

    fn process_provider_record(&mut self, index: usize, record: &SharedRecord) {
        self.process_record(index, record);
    }

    fn provider_data_validated(&mut self, full: bool) {
        self.finish_parse(full);
    }

    fn invalidate_data_items(&mut self) {
        Component::invalidate_data_items(self);
    }

    fn invalidate_raw_data(&mut self) {
        Component::invalidate_raw_data(self);
    }

    fn validate_raw_data(&mut self) {
        Component::validate_raw_data(self);
    }
}

impl<S: ChartStrategy> Validatable for Component<S> {
    fn needs(&self, stage: Stage) -> bool {
        if self.disposed {
            return false;
        }
        match stage {
            Stage::RawData => self.flags.raw_data,
            Stage::Data => self.flags.data,
            Stage::DataItems => self.flags.data_items,
            Stage::DataRange => self.flags.data_range,
        }
    }

    fn run(&mut self, stage: Stage) -> ValidationProgress {
        match stage {
            Stage::RawData => self.validate_raw_data(),
            Stage::Data => return self.validate_data(),
            Stage::DataItems => self.validate_data_items(),
            Stage::DataRange => self.validate_data_range(),
        }
        ValidationProgress::Complete
    }

    fn advance_animation(&mut self, dt: Duration) -> bool {
        Component::advance_animation(self, dt)
    }

    fn is_animating(&self) -> bool {
        Component::is_animating(self)
    }

    fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl<S: ChartStrategy> std::fmt::Debug for Component<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Component")
            .field("strategy", &self.strategy.name())
            .field("records", &self.data.len())
            .field("items", &self.data_items.len())
            .field("flags", &self.flags)
            .field("range", &(self.start, self.end))
            .finish()
    }
}
