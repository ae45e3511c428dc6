//! Side-effect-only subscriptions.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tendon_core::{BindError, BindingId, CellId, CellListener, Link, Source};

use crate::sources::SourceSet;

type Callback = Rc<dyn Fn() -> Result<(), BindError>>;

/// Runs a callback whenever any of its sources changes.
///
/// Sources may be scalar cells or sequences; a sequence triggers the
/// callback once per mutation. Construction does not run the callback.
/// Re-enabling runs it once so the side effect catches up with changes
/// it missed.
#[must_use = "dropping the handle unsubscribes the binding"]
pub struct NotifyBinding {
    inner: Rc<NotifyInner>,
}

struct NotifyInner {
    id: BindingId,
    enabled: Cell<bool>,
    wiring: RefCell<Option<NotifyWiring>>,
}

struct NotifyWiring {
    callback: Callback,
    predicate: Option<Rc<dyn Fn() -> bool>>,
    sources: SourceSet,
}

impl NotifyBinding {
    /// Run `callback` after every change to any of `sources`.
    pub fn new(
        callback: impl Fn() -> Result<(), BindError> + 'static,
        sources: &[&dyn Source],
    ) -> Self {
        Self::build(Rc::new(callback), None, sources)
    }

    /// Like [`new`](Self::new), but only while `predicate` returns true.
    pub fn when(
        callback: impl Fn() -> Result<(), BindError> + 'static,
        predicate: impl Fn() -> bool + 'static,
        sources: &[&dyn Source],
    ) -> Self {
        Self::build(Rc::new(callback), Some(Rc::new(predicate)), sources)
    }

    fn build(
        callback: Callback,
        predicate: Option<Rc<dyn Fn() -> bool>>,
        sources: &[&dyn Source],
    ) -> Self {
        let inner = Rc::new(NotifyInner {
            id: BindingId::next(),
            enabled: Cell::new(true),
            wiring: RefCell::new(Some(NotifyWiring {
                callback,
                predicate,
                sources: SourceSet::new(sources),
            })),
        });
        let listener: Weak<dyn CellListener> = Rc::downgrade(&inner) as Weak<_>;
        if let Some(wiring) = inner.wiring.borrow().as_ref() {
            wiring.sources.attach_all(inner.id, &listener);
            tracing::debug!(
                binding = %inner.id,
                sources = wiring.sources.len(),
                "notify binding created"
            );
        }
        Self { inner }
    }
}

impl NotifyInner {
    fn fire(&self) -> Result<(), BindError> {
        if !self.enabled.get() {
            return Ok(());
        }
        let (callback, predicate) = match self.wiring.borrow().as_ref() {
            Some(w) => (Rc::clone(&w.callback), w.predicate.clone()),
            None => return Ok(()),
        };
        if predicate.is_some_and(|p| !p()) {
            return Ok(());
        }
        callback()
    }
}

impl CellListener for NotifyInner {
    fn on_changed(&self, _changed: CellId) -> Result<(), BindError> {
        self.fire()
    }
}

impl Drop for NotifyInner {
    fn drop(&mut self) {
        if let Some(wiring) = self.wiring.get_mut().take() {
            wiring.sources.detach_all(self.id);
        }
    }
}

impl Link for NotifyBinding {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), BindError> {
        let was = self.inner.enabled.replace(enabled);
        if enabled && !was {
            self.inner.fire()?;
        }
        Ok(())
    }

    fn delete(&self) {
        if let Some(wiring) = self.inner.wiring.borrow_mut().take() {
            wiring.sources.detach_all(self.inner.id);
            tracing::debug!(binding = %self.inner.id, "notify binding deleted");
        }
    }
}

impl Clone for NotifyBinding {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for NotifyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .finish()
    }
}
