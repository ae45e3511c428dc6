//! The scalar observable cell.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tendon_core::{BindError, BindingId, CellId, CellListener, Source};

use crate::listeners::ListenerList;
use crate::propagation;

/// A shared, observable value slot.
///
/// Cloning a `Property` yields another handle to the same cell. Writes
/// notify every attached listener in registration order, except when the
/// new value equals the current one: such writes are dropped silently.
/// Bindings depend on that suppression to terminate feedback loops, so
/// `V`'s `PartialEq` must be a real equivalence for values the graph
/// produces.
///
/// # Examples
///
/// ```
/// use tendon_cell::Property;
///
/// let speed = Property::new(4.0_f32);
/// assert_eq!(speed.set(4.0), Ok(false)); // equal value, suppressed
/// assert_eq!(speed.set(6.5), Ok(true));
/// assert_eq!(speed.get(), 6.5);
/// ```
pub struct Property<V> {
    inner: Rc<PropertyInner<V>>,
}

struct PropertyInner<V> {
    id: CellId,
    value: RefCell<V>,
    listeners: RefCell<ListenerList<Weak<dyn CellListener>>>,
}

impl<V: Clone + PartialEq + 'static> Property<V> {
    /// Create a cell holding `value`.
    pub fn new(value: V) -> Self {
        Self {
            inner: Rc::new(PropertyInner {
                id: CellId::next(),
                value: RefCell::new(value),
                listeners: RefCell::new(ListenerList::new()),
            }),
        }
    }

    /// Identity of this cell.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Clone out the current value. Has no side effects.
    pub fn get(&self) -> V {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference.
    ///
    /// `f` must not write this cell.
    pub fn with<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Write `value`, notifying every listener if it differs from the
    /// current value.
    ///
    /// Returns whether the value changed. A listener error aborts the rest
    /// of the cascade; the new value stays in place.
    pub fn set(&self, value: V) -> Result<bool, BindError> {
        self.write(value, None)
    }

    /// Write `value` on behalf of `origin`.
    ///
    /// Identical to [`set`](Self::set) except that the listener registered
    /// under `origin` is not notified of this change.
    pub fn set_from(&self, value: V, origin: BindingId) -> Result<bool, BindError> {
        self.write(value, Some(origin))
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&V) -> V) -> Result<bool, BindError> {
        let next = self.with(f);
        self.set(next)
    }

    /// Re-fire every listener without changing the value.
    ///
    /// Used to refresh consumers that may have gone stale, for instance
    /// after they were re-enabled.
    pub fn force_notify(&self) -> Result<(), BindError> {
        self.notify(None)
    }

    /// Number of attached listeners, dead ones included until the next
    /// fan-out prunes them.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Whether two handles refer to the same cell.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn write(&self, value: V, origin: Option<BindingId>) -> Result<bool, BindError> {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                propagation::record_write(false);
                return Ok(false);
            }
            *current = value;
        }
        propagation::record_write(true);
        self.notify(origin)?;
        Ok(true)
    }

    fn notify(&self, skip: Option<BindingId>) -> Result<(), BindError> {
        let listeners = self.inner.listeners.borrow().snapshot();
        if listeners.is_empty() {
            return Ok(());
        }
        let _guard = propagation::enter()?;
        tracing::trace!(cell = %self.inner.id, listeners = listeners.len(), "notify");

        let mut dead: SmallVec<[BindingId; 2]> = SmallVec::new();
        let mut outcome = Ok(());
        for (id, listener) in listeners {
            if Some(id) == skip {
                continue;
            }
            let Some(listener) = listener.upgrade() else {
                dead.push(id);
                continue;
            };
            propagation::record_notification();
            if let Err(err) = listener.on_changed(self.inner.id) {
                outcome = Err(err);
                break;
            }
        }

        if !dead.is_empty() {
            let mut list = self.inner.listeners.borrow_mut();
            for id in dead {
                list.remove(id);
            }
        }
        outcome
    }
}

impl<V> Clone for Property<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V: Clone + PartialEq + Default + 'static> Default for Property<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: fmt::Debug> fmt::Debug for Property<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .finish()
    }
}

impl<V: Clone + PartialEq + 'static> Source for Property<V> {
    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn attach(&self, binding: BindingId, listener: Weak<dyn CellListener>) {
        self.inner.listeners.borrow_mut().insert(binding, listener);
    }

    fn detach(&self, binding: BindingId) {
        self.inner.listeners.borrow_mut().remove(binding);
    }

    fn to_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }
}
