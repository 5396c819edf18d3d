/// Runs a cleanup closure exactly once: on [`Disposer::dispose`] or on drop.
#[derive(Default)]
pub struct Disposer {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl Disposer {
    pub fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Self { cleanup: None }
    }

    pub fn is_disposed(&self) -> bool {
        self.cleanup.is_none()
    }

    pub fn dispose(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }

    /// Drops the cleanup without running it.
    pub fn forget(mut self) {
        self.cleanup = None;
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Disposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Disposer")
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Disposes a group of disposers together, in insertion order.
#[derive(Debug, Default)]
pub struct MultiDisposer {
    disposers: Vec<Disposer>,
    disposed: bool,
}

impl MultiDisposer {
    pub fn new(disposers: Vec<Disposer>) -> Self {
        Self {
            disposers,
            disposed: false,
        }
    }

    /// Adds a disposer. Disposed immediately if the group already is.
    pub fn push(&mut self, mut disposer: Disposer) {
        if self.disposed {
            disposer.dispose();
        } else {
            self.disposers.push(disposer);
        }
    }

    pub fn len(&self) -> usize {
        self.disposers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disposers.is_empty()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn dispose(&mut self) {
        self.disposed = true;
        for mut disposer in self.disposers.drain(..) {
            disposer.dispose();
        }
    }
}

impl Drop for MultiDisposer {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Holds a value together with the disposer that releases it.
///
/// Assigning a new value disposes of the previous one first.
#[derive(Debug)]
pub struct MutableValueDisposer<T> {
    value: Option<T>,
    disposer: Option<Disposer>,
}

impl<T> Default for MutableValueDisposer<T> {
    fn default() -> Self {
        Self {
            value: None,
            disposer: None,
        }
    }
}

impl<T> MutableValueDisposer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn set(&mut self, value: T, disposer: Disposer) {
        self.reset();
        self.value = Some(value);
        self.disposer = Some(disposer);
    }

    /// Disposes of the current value, if any.
    pub fn reset(&mut self) {
        self.value = None;
        if let Some(mut disposer) = self.disposer.take() {
            disposer.dispose();
        }
    }

    /// Removes the value without disposing of it.
    pub fn take(&mut self) -> Option<T> {
        if let Some(disposer) = self.disposer.take() {
            disposer.forget();
        }
        self.value.take()
    }
}

impl<T> Drop for MutableValueDisposer<T> {
    fn drop(&mut self) {
        self.reset();
    }
}
