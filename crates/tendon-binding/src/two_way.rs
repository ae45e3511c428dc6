//! Bidirectional bindings between two cells.
//!
//! A [`TwoWayBinding`] keeps `A` and `B` consistent through a pair of
//! transforms. Each side has a source set: `A` is recomputed from `B` (and
//! any extra cells given for `A`), `B` from `A` (and its extras). When a
//! cell in `B`'s set changes, `B` is rewritten; otherwise `A` is.
//!
//! Feedback terminates because a write that reproduces the current value
//! is suppressed by [`Property`]. Transforms that do not round-trip to an
//! equal value keep bouncing until the propagation depth limit trips.
//!
//! At construction `A` takes precedence: the binding evaluates as if `A`
//! had just changed, overwriting whatever `B` held.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tendon_cell::Property;
use tendon_core::{BindError, BindingId, CellId, CellListener, Link, Source};

use crate::sources::SourceSet;

/// Whether a forced [`TwoWayBinding::reevaluate`] is in progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    /// No forced re-evaluation running.
    Idle,
    /// Inside [`TwoWayBinding::reevaluate`]; nested calls are skipped.
    Reevaluating,
}

/// Keeps two cells synchronized in both directions.
///
/// # Examples
///
/// ```
/// use tendon_binding::TwoWayBinding;
/// use tendon_cell::Property;
///
/// let celsius = Property::new(0.0_f64);
/// let fahrenheit = Property::new(0.0_f64);
/// let _sync = TwoWayBinding::new(
///     &celsius,
///     |f: &f64| (f - 32.0) * 5.0 / 9.0,
///     &fahrenheit,
///     |c: &f64| c * 9.0 / 5.0 + 32.0,
/// )
/// .unwrap();
/// assert_eq!(fahrenheit.get(), 32.0);
///
/// fahrenheit.set(212.0).unwrap();
/// assert_eq!(celsius.get(), 100.0);
/// ```
#[must_use = "dropping the handle unsubscribes the binding"]
pub struct TwoWayBinding<A, B> {
    inner: Rc<TwoWayInner<A, B>>,
}

struct TwoWayInner<A, B> {
    id: BindingId,
    enabled: Cell<bool>,
    state: Cell<SyncState>,
    wiring: RefCell<Option<TwoWayWiring<A, B>>>,
}

struct TwoWayWiring<A, B> {
    a: Property<A>,
    b: Property<B>,
    to_a: Rc<dyn Fn(&B) -> A>,
    to_b: Rc<dyn Fn(&A) -> B>,
    predicate: Option<Rc<dyn Fn() -> bool>>,
    a_sources: SourceSet,
    b_sources: SourceSet,
}

/// Which side a change or a forced re-evaluation writes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    WriteA,
    WriteB,
}

impl<A, B> TwoWayBinding<A, B>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    /// Bind `a` and `b`, with `to_a` computing `A` from `B` and `to_b`
    /// computing `B` from `A`.
    pub fn new(
        a: &Property<A>,
        to_a: impl Fn(&B) -> A + 'static,
        b: &Property<B>,
        to_b: impl Fn(&A) -> B + 'static,
    ) -> Result<Self, BindError> {
        Self::build(a, Rc::new(to_a), &[], b, Rc::new(to_b), &[], None)
    }

    /// Like [`new`](Self::new), with extra cells each side depends on.
    ///
    /// A change to any of `a_sources` rewrites `A`; a change to any of
    /// `b_sources` rewrites `B`. The transforms read those extra cells
    /// themselves.
    pub fn with_sources(
        a: &Property<A>,
        to_a: impl Fn(&B) -> A + 'static,
        a_sources: &[&dyn Source],
        b: &Property<B>,
        to_b: impl Fn(&A) -> B + 'static,
        b_sources: &[&dyn Source],
    ) -> Result<Self, BindError> {
        Self::build(
            a,
            Rc::new(to_a),
            a_sources,
            b,
            Rc::new(to_b),
            b_sources,
            None,
        )
    }

    /// Like [`new`](Self::new), only synchronizing while `predicate`
    /// returns true.
    pub fn when(
        a: &Property<A>,
        to_a: impl Fn(&B) -> A + 'static,
        b: &Property<B>,
        to_b: impl Fn(&A) -> B + 'static,
        predicate: impl Fn() -> bool + 'static,
    ) -> Result<Self, BindError> {
        Self::build(
            a,
            Rc::new(to_a),
            &[],
            b,
            Rc::new(to_b),
            &[],
            Some(Rc::new(predicate)),
        )
    }

    fn build(
        a: &Property<A>,
        to_a: Rc<dyn Fn(&B) -> A>,
        a_extra: &[&dyn Source],
        b: &Property<B>,
        to_b: Rc<dyn Fn(&A) -> B>,
        b_extra: &[&dyn Source],
        predicate: Option<Rc<dyn Fn() -> bool>>,
    ) -> Result<Self, BindError> {
        let mut a_sources = SourceSet::new(a_extra);
        a_sources.push(b);
        let mut b_sources = SourceSet::new(b_extra);
        b_sources.push(a);

        let inner = Rc::new(TwoWayInner {
            id: BindingId::next(),
            enabled: Cell::new(true),
            state: Cell::new(SyncState::Idle),
            wiring: RefCell::new(Some(TwoWayWiring {
                a: a.clone(),
                b: b.clone(),
                to_a,
                to_b,
                predicate,
                a_sources,
                b_sources,
            })),
        });
        let listener: Weak<dyn CellListener> = Rc::downgrade(&inner) as Weak<_>;
        if let Some(wiring) = inner.wiring.borrow().as_ref() {
            wiring.a_sources.attach_all(inner.id, &listener);
            wiring.b_sources.attach_all(inner.id, &listener);
            tracing::debug!(
                binding = %inner.id,
                a = %wiring.a.id(),
                b = %wiring.b.id(),
                "two-way binding created"
            );
        }
        inner.on_changed(a.id())?;
        Ok(Self { inner })
    }

    /// Force one direction of synchronization: recompute `target` from the
    /// other cell.
    ///
    /// Fails with [`BindError::UnknownSource`] if `target` is neither `A`
    /// nor `B`. Skipped while disabled, while the predicate is false, or
    /// when called from inside another `reevaluate` on this binding.
    pub fn reevaluate(&self, target: CellId) -> Result<(), BindError> {
        let inner = &self.inner;
        let direction = {
            let wiring = inner.wiring.borrow();
            let Some(w) = wiring.as_ref() else {
                return Ok(());
            };
            if target == w.a.id() {
                Direction::WriteA
            } else if target == w.b.id() {
                Direction::WriteB
            } else {
                return Err(BindError::UnknownSource {
                    binding: inner.id,
                    cell: target,
                });
            }
        };
        if inner.state.get() == SyncState::Reevaluating || !inner.active() {
            return Ok(());
        }
        inner.state.set(SyncState::Reevaluating);
        let result = inner.write(direction);
        inner.state.set(SyncState::Idle);
        result
    }

    /// Current re-evaluation state.
    pub fn state(&self) -> SyncState {
        self.inner.state.get()
    }
}

impl<A, B> TwoWayInner<A, B>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    /// Enabled, not deleted, and the predicate holds.
    fn active(&self) -> bool {
        if !self.enabled.get() {
            return false;
        }
        let predicate = match self.wiring.borrow().as_ref() {
            Some(w) => w.predicate.clone(),
            None => return false,
        };
        predicate.is_none_or(|p| p())
    }

    fn write(&self, direction: Direction) -> Result<(), BindError> {
        let wiring = self.wiring.borrow();
        let Some(w) = wiring.as_ref() else {
            return Ok(());
        };
        match direction {
            Direction::WriteA => {
                let (a, b, to_a) = (w.a.clone(), w.b.clone(), Rc::clone(&w.to_a));
                drop(wiring);
                let value = b.with(|v| to_a(v));
                a.set_from(value, self.id)?;
            }
            Direction::WriteB => {
                let (a, b, to_b) = (w.a.clone(), w.b.clone(), Rc::clone(&w.to_b));
                drop(wiring);
                let value = a.with(|v| to_b(v));
                b.set_from(value, self.id)?;
            }
        }
        Ok(())
    }
}

impl<A, B> CellListener for TwoWayInner<A, B>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    fn on_changed(&self, changed: CellId) -> Result<(), BindError> {
        if !self.active() {
            return Ok(());
        }
        let direction = {
            let wiring = self.wiring.borrow();
            let Some(w) = wiring.as_ref() else {
                return Ok(());
            };
            if w.b_sources.contains(changed) {
                Direction::WriteB
            } else if w.a_sources.contains(changed) {
                Direction::WriteA
            } else {
                return Err(BindError::UnknownSource {
                    binding: self.id,
                    cell: changed,
                });
            }
        };
        self.write(direction)
    }
}

impl<A, B> TwoWayInner<A, B> {
    fn release(&self) -> bool {
        match self.wiring.borrow_mut().take() {
            Some(wiring) => {
                wiring.a_sources.detach_all(self.id);
                wiring.b_sources.detach_all(self.id);
                true
            }
            None => false,
        }
    }
}

impl<A, B> Drop for TwoWayInner<A, B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<A, B> Link for TwoWayBinding<A, B>
where
    A: Clone + PartialEq + 'static,
    B: Clone + PartialEq + 'static,
{
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), BindError> {
        let was = self.inner.enabled.replace(enabled);
        if enabled && !was {
            let a = match self.inner.wiring.borrow().as_ref() {
                Some(w) => w.a.id(),
                None => return Ok(()),
            };
            self.inner.on_changed(a)?;
        }
        Ok(())
    }

    fn delete(&self) {
        if self.inner.release() {
            tracing::debug!(binding = %self.inner.id, "two-way binding deleted");
        }
    }
}

impl<T: Clone + PartialEq + 'static> TwoWayBinding<T, T> {
    /// Keep two cells of the same type equal. `a` wins at construction.
    pub fn mirror(a: &Property<T>, b: &Property<T>) -> Result<Self, BindError> {
        Self::new(a, T::clone, b, T::clone)
    }
}

impl<A, B> Clone for TwoWayBinding<A, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A, B> fmt::Debug for TwoWayBinding<A, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwoWayBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("state", &self.inner.state.get())
            .finish()
    }
}
