use crate::data_types::{Stage, ValidationProgress};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Time source of the chunked parser and of range animations.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to, or by a fixed step on every read.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<Instant>,
    step: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::stepping(Duration::ZERO)
    }

    /// Every call to [`Clock::now`] advances the clock by `step` afterwards.
    pub fn stepping(step: Duration) -> Self {
        Self {
            now: Mutex::new(Instant::now()),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let mut now = self.now.lock();
        let current = *now;
        *now += self.step;
        current
    }
}

/// Something the scheduler drives through the validation stages.
pub trait Validatable: Send {
    fn needs(&self, stage: Stage) -> bool;

    fn run(&mut self, stage: Stage) -> ValidationProgress;

    /// Moves running animations forward. Returns `true` while one is running.
    fn advance_animation(&mut self, _dt: Duration) -> bool {
        false
    }

    fn is_animating(&self) -> bool {
        false
    }

    fn is_disposed(&self) -> bool;
}

/// Summary of one [`Scheduler::tick`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Stage runs performed, over all components.
    pub stages_run: usize,
    /// Data validations that ran out of budget and will resume.
    pub yielded: usize,
}

/// Drives registered components through their dirty stages.
///
/// Components are held weakly: dropping the last handle, or disposing the
/// component, unregisters it on the next tick.
pub struct Scheduler {
    components: Vec<Weak<Mutex<dyn Validatable>>>,
    clock: Arc<dyn Clock>,
    last_tick: Option<Instant>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            components: Vec::new(),
            clock,
            last_tick: None,
        }
    }

    pub fn register<V: Validatable + 'static>(&mut self, handle: &Arc<Mutex<V>>) {
        let handle: Arc<Mutex<dyn Validatable>> = handle.clone();
        self.components.push(Arc::downgrade(&handle));
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn live(&mut self) -> Vec<Arc<Mutex<dyn Validatable>>> {
        let mut live = Vec::with_capacity(self.components.len());
        self.components.retain(|weak| match weak.upgrade() {
            Some(component) if !component.lock().is_disposed() => {
                live.push(component);
                true
            }
            _ => false,
        });
        live
    }

    /// Runs every stage, in order, for each component that needs it, then
    /// advances animations by the time elapsed since the previous tick.
    pub fn tick(&mut self) -> TickReport {
        let live = self.live();
        let mut report = TickReport::default();

        for stage in Stage::ORDER {
            for component in &live {
                let mut component = component.lock();
                if !component.needs(stage) {
                    continue;
                }
                report.stages_run += 1;
                if let ValidationProgress::Yielded { progress } = component.run(stage) {
                    tracing::trace!(progress, "data validation yielded");
                    report.yielded += 1;
                }
            }
        }

        let now = self.clock.now();
        let dt = self
            .last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);
        if !dt.is_zero() {
            for component in &live {
                component.lock().advance_animation(dt);
            }
        }

        report
    }

    /// True when no live component has a dirty stage or a running animation.
    pub fn is_idle(&mut self) -> bool {
        self.live().iter().all(|component| {
            let component = component.lock();
            !component.is_animating() && Stage::ORDER.iter().all(|stage| !component.needs(*stage))
        })
    }

    /// Ticks until idle or until `max_ticks` ticks ran. Returns the ticks run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> usize {
        let mut ticks = 0;
        while ticks < max_ticks && !self.is_idle() {
            self.tick();
            ticks += 1;
        }
        ticks
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("components", &self.components.len())
            .finish()
    }
}
