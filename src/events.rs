use crate::disposer::Disposer;
use parking_lot::Mutex;
use slotmap::{new_key_type, SlotMap};
use std::sync::Arc;

new_key_type! {
    /// Key of a registered listener.
    pub struct ListenerId;
}

/// Lifecycle notifications of a component.
#[derive(Clone, Debug, PartialEq)]
pub enum ComponentEvent {
    PreDataValidate,
    DataValidated,
    ValuesChanged,
    DataRangeChanged,
    RangeChanged { start: f64, end: f64 },
}

type Listener = Box<dyn FnMut(&ComponentEvent) + Send>;

/// Listener list of one component.
///
/// Listeners must not subscribe or unsubscribe from inside their callback.
pub struct EventDispatcher {
    listeners: Arc<Mutex<SlotMap<ListenerId, Listener>>>,
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(SlotMap::with_key())),
        }
    }

    /// Registers `listener`; it stays subscribed while the returned handle lives.
    pub fn on(&self, listener: impl FnMut(&ComponentEvent) + Send + 'static) -> Subscription {
        let id = self.listeners.lock().insert(Box::new(listener));

        let listeners = Arc::downgrade(&self.listeners);
        Subscription {
            id,
            disposer: Disposer::new(move || {
                if let Some(listeners) = listeners.upgrade() {
                    listeners.lock().remove(id);
                }
            }),
        }
    }

    pub fn emit(&self, event: ComponentEvent) {
        let mut listeners = self.listeners.lock();
        if listeners.is_empty() {
            return;
        }
        tracing::trace!(?event, listeners = listeners.len(), "emit");
        for listener in listeners.values_mut() {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_listening(&self, id: ListenerId) -> bool {
        self.listeners.lock().contains_key(id)
    }

    pub fn clear(&self) {
        self.listeners.lock().clear();
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Handle of an event listener. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    id: ListenerId,
    disposer: Disposer,
}

impl Subscription {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn unsubscribe(mut self) {
        self.disposer.dispose();
    }

    /// Keeps the listener registered for the dispatcher's whole lifetime.
    pub fn detach(self) {
        self.disposer.forget();
    }
}

impl From<Subscription> for Disposer {
    fn from(subscription: Subscription) -> Self {
        subscription.disposer
    }
}
