//! Side-effect subscriptions to sequence events.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tendon_cell::PropertyList;
use tendon_core::{BindError, BindingId, CellId, ElementKey, Link, SeqListener};

type Callback = Rc<dyn Fn() -> Result<(), BindError>>;

/// Runs a callback on every insert, remove, replace, clear or rebuild of
/// a sequence.
///
/// Keeps no per-element state. Re-enabling runs the callback once.
#[must_use = "dropping the handle unsubscribes the binding"]
pub struct ListNotifyBinding<T> {
    inner: Rc<ListNotifyInner<T>>,
}

struct ListNotifyInner<T> {
    id: BindingId,
    enabled: Cell<bool>,
    source: PropertyList<T>,
    callback: RefCell<Option<Callback>>,
}

impl<T: Clone + 'static> ListNotifyBinding<T> {
    /// Run `callback` after every mutation of `source`.
    pub fn new(
        source: &PropertyList<T>,
        callback: impl Fn() -> Result<(), BindError> + 'static,
    ) -> Self {
        let inner = Rc::new(ListNotifyInner {
            id: BindingId::next(),
            enabled: Cell::new(true),
            source: source.clone(),
            callback: RefCell::new(Some(Rc::new(callback))),
        });
        let listener: Weak<dyn SeqListener<T>> = Rc::downgrade(&inner) as Weak<_>;
        source.attach_seq(inner.id, listener);
        tracing::debug!(binding = %inner.id, source = %source.id(), "list notify binding created");
        Self { inner }
    }
}

impl<T> ListNotifyInner<T> {
    fn fire(&self) -> Result<(), BindError> {
        if !self.enabled.get() {
            return Ok(());
        }
        let callback = self.callback.borrow().clone();
        match callback {
            Some(callback) => callback(),
            None => Ok(()),
        }
    }

    fn release(&self) -> bool {
        match self.callback.borrow_mut().take() {
            Some(_) => {
                self.source.detach_seq(self.id);
                true
            }
            None => false,
        }
    }
}

impl<T> SeqListener<T> for ListNotifyInner<T> {
    fn on_inserted(&self, _: CellId, _: usize, _: ElementKey, _: &T) -> Result<(), BindError> {
        self.fire()
    }

    fn on_removed(&self, _: CellId, _: usize, _: ElementKey, _: &T) -> Result<(), BindError> {
        self.fire()
    }

    fn on_replaced(&self, _: CellId, _: usize, _: ElementKey, _: &T, _: &T) -> Result<(), BindError> {
        self.fire()
    }

    fn on_cleared(&self, _: CellId) -> Result<(), BindError> {
        self.fire()
    }

    fn on_rebuilt(&self, _: CellId) -> Result<(), BindError> {
        self.fire()
    }
}

impl<T> Drop for ListNotifyInner<T> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<T: Clone + 'static> Link for ListNotifyBinding<T> {
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
        if self.inner.release() {
            tracing::debug!(binding = %self.inner.id, "list notify binding deleted");
        }
    }
}

impl<T> Clone for ListNotifyBinding<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for ListNotifyBinding<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListNotifyBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .finish()
    }
}
