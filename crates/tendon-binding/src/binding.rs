//! One-way bindings: N sources, one destination.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use tendon_cell::Property;
use tendon_core::{BindError, BindingId, CellId, CellListener, Link, Source};

use crate::sources::SourceSet;

/// Keeps a destination cell equal to a function of its sources.
///
/// While enabled and while the activation predicate holds,
/// `destination == get()` right after any source changes. The binding
/// evaluates once at construction, so the destination is seeded
/// immediately.
///
/// `Binding` is a handle: clones share one binding. Deleting it, or
/// dropping the last handle, unsubscribes from every source.
///
/// # Examples
///
/// ```
/// use tendon_binding::Binding;
/// use tendon_cell::Property;
///
/// let health = Property::new(80);
/// let label = Property::new(String::new());
/// let _b = Binding::map(&label, &health, |hp| format!("{hp} HP")).unwrap();
/// assert_eq!(label.get(), "80 HP");
///
/// health.set(35).unwrap();
/// assert_eq!(label.get(), "35 HP");
/// ```
#[must_use = "dropping the handle unsubscribes the binding"]
pub struct Binding<V> {
    inner: Rc<BindingInner<V>>,
}

struct BindingInner<V> {
    id: BindingId,
    enabled: Cell<bool>,
    wiring: RefCell<Option<Wiring<V>>>,
}

struct Wiring<V> {
    destination: Property<V>,
    get: Rc<dyn Fn() -> V>,
    predicate: Option<Rc<dyn Fn() -> bool>>,
    sources: SourceSet,
}

impl<V: Clone + PartialEq + 'static> Binding<V> {
    /// Copy `source` into `destination`.
    pub fn mirror(destination: &Property<V>, source: &Property<V>) -> Result<Self, BindError> {
        let source_cell = source.clone();
        Self::build(destination, Rc::new(move || source_cell.get()), None, &[source])
    }

    /// Keep `destination` equal to `f(source)`.
    pub fn map<S: Clone + PartialEq + 'static>(
        destination: &Property<V>,
        source: &Property<S>,
        f: impl Fn(&S) -> V + 'static,
    ) -> Result<Self, BindError> {
        let source_cell = source.clone();
        Self::build(
            destination,
            Rc::new(move || source_cell.with(&f)),
            None,
            &[source],
        )
    }

    /// Like [`map`](Self::map), but only propagates while `predicate`
    /// returns true.
    pub fn map_when<S: Clone + PartialEq + 'static>(
        destination: &Property<V>,
        source: &Property<S>,
        f: impl Fn(&S) -> V + 'static,
        predicate: impl Fn() -> bool + 'static,
    ) -> Result<Self, BindError> {
        let source_cell = source.clone();
        Self::build(
            destination,
            Rc::new(move || source_cell.with(&f)),
            Some(Rc::new(predicate)),
            &[source],
        )
    }

    /// Keep `destination` equal to `get()`, re-evaluating whenever any of
    /// `sources` changes.
    ///
    /// `get` reads the sources itself, typically through clones captured by
    /// the closure.
    pub fn computed(
        destination: &Property<V>,
        get: impl Fn() -> V + 'static,
        sources: &[&dyn Source],
    ) -> Result<Self, BindError> {
        Self::build(destination, Rc::new(get), None, sources)
    }

    /// Like [`computed`](Self::computed), gated by `predicate`.
    pub fn computed_when(
        destination: &Property<V>,
        get: impl Fn() -> V + 'static,
        predicate: impl Fn() -> bool + 'static,
        sources: &[&dyn Source],
    ) -> Result<Self, BindError> {
        Self::build(destination, Rc::new(get), Some(Rc::new(predicate)), sources)
    }

    fn build(
        destination: &Property<V>,
        get: Rc<dyn Fn() -> V>,
        predicate: Option<Rc<dyn Fn() -> bool>>,
        sources: &[&dyn Source],
    ) -> Result<Self, BindError> {
        let inner = Rc::new(BindingInner {
            id: BindingId::next(),
            enabled: Cell::new(true),
            wiring: RefCell::new(Some(Wiring {
                destination: destination.clone(),
                get,
                predicate,
                sources: SourceSet::new(sources),
            })),
        });
        let listener: Weak<dyn CellListener> = Rc::downgrade(&inner) as Weak<_>;
        if let Some(wiring) = inner.wiring.borrow().as_ref() {
            wiring.sources.attach_all(inner.id, &listener);
            tracing::debug!(
                binding = %inner.id,
                destination = %wiring.destination.id(),
                sources = wiring.sources.len(),
                "binding created"
            );
        }
        inner.evaluate()?;
        Ok(Self { inner })
    }

    /// The destination cell, or `None` once deleted.
    pub fn destination(&self) -> Option<Property<V>> {
        self.inner
            .wiring
            .borrow()
            .as_ref()
            .map(|w| w.destination.clone())
    }

    /// Whether [`delete`](Link::delete) has run.
    pub fn is_deleted(&self) -> bool {
        self.inner.wiring.borrow().is_none()
    }
}

impl<V: Clone + PartialEq + 'static> BindingInner<V> {
    fn evaluate(&self) -> Result<(), BindError> {
        if !self.enabled.get() {
            return Ok(());
        }
        let (destination, get, predicate) = match self.wiring.borrow().as_ref() {
            Some(w) => (w.destination.clone(), Rc::clone(&w.get), w.predicate.clone()),
            None => return Ok(()),
        };
        if predicate.is_some_and(|p| !p()) {
            return Ok(());
        }
        destination.set_from(get(), self.id)?;
        Ok(())
    }

    fn release(&self) {
        if let Some(wiring) = self.wiring.borrow_mut().take() {
            wiring.sources.detach_all(self.id);
            tracing::debug!(binding = %self.id, "binding deleted");
        }
    }
}

impl<V: Clone + PartialEq + 'static> CellListener for BindingInner<V> {
    fn on_changed(&self, _changed: CellId) -> Result<(), BindError> {
        self.evaluate()
    }
}

impl<V> Drop for BindingInner<V> {
    fn drop(&mut self) {
        if let Some(wiring) = self.wiring.get_mut().take() {
            wiring.sources.detach_all(self.id);
        }
    }
}

impl<V: Clone + PartialEq + 'static> Link for Binding<V> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    fn set_enabled(&self, enabled: bool) -> Result<(), BindError> {
        let was = self.inner.enabled.replace(enabled);
        if enabled && !was {
            self.inner.evaluate()?;
        }
        Ok(())
    }

    fn delete(&self) {
        self.inner.release();
    }
}

impl<V> Clone for Binding<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<V> fmt::Debug for Binding<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendon_cell::PropertyList;

    #[test]
    fn seeds_destination_at_construction() {
        let src = Property::new(7);
        let dst = Property::new(0);
        let _b = Binding::mirror(&dst, &src).unwrap();
        assert_eq!(dst.get(), 7);
    }

    #[test]
    fn computed_tracks_every_source() {
        let w = Property::new(2.0_f32);
        let h = Property::new(3.0_f32);
        let area = Property::new(0.0_f32);
        let (w2, h2) = (w.clone(), h.clone());
        let _b = Binding::computed(&area, move || w2.get() * h2.get(), &[&w, &h]).unwrap();
        assert_eq!(area.get(), 6.0);
        w.set(4.0).unwrap();
        assert_eq!(area.get(), 12.0);
        h.set(0.5).unwrap();
        assert_eq!(area.get(), 2.0);
    }

    #[test]
    fn disabled_binding_does_not_write() {
        let src = Property::new(1);
        let dst = Property::new(0);
        let b = Binding::mirror(&dst, &src).unwrap();
        b.set_enabled(false).unwrap();
        src.set(5).unwrap();
        assert_eq!(dst.get(), 1);
        b.set_enabled(true).unwrap();
        assert_eq!(dst.get(), 5);
    }

    #[test]
    fn predicate_gates_propagation() {
        let grounded = Property::new(false);
        let speed = Property::new(3);
        let shown = Property::new(0);
        let g = grounded.clone();
        let _b = Binding::map_when(&shown, &speed, |s| *s, move || g.get()).unwrap();
        assert_eq!(shown.get(), 0);
        grounded.set(true).unwrap();
        speed.set(9).unwrap();
        assert_eq!(shown.get(), 9);
    }

    #[test]
    fn delete_unsubscribes_and_is_idempotent() {
        let src = Property::new(1);
        let dst = Property::new(0);
        let b = Binding::mirror(&dst, &src).unwrap();
        assert_eq!(src.listener_count(), 1);
        b.delete();
        b.delete();
        assert!(b.is_deleted());
        assert!(b.destination().is_none());
        assert_eq!(src.listener_count(), 0);
        src.set(2).unwrap();
        assert_eq!(dst.get(), 1);
        // Re-enabling a deleted binding is a no-op.
        b.set_enabled(false).unwrap();
        b.set_enabled(true).unwrap();
        assert_eq!(dst.get(), 1);
    }

    #[test]
    fn dropping_last_handle_unsubscribes() {
        let src = Property::new(1);
        let dst = Property::new(0);
        let b = Binding::mirror(&dst, &src).unwrap();
        let extra = b.clone();
        drop(b);
        assert_eq!(src.listener_count(), 1);
        drop(extra);
        assert_eq!(src.listener_count(), 0);
    }

    #[test]
    fn list_source_counts_elements() {
        let (items, writer) = PropertyList::<u8>::new();
        let count = Property::new(0usize);
        let view = items.clone();
        let _b = Binding::computed(&count, move || view.len(), &[&items]).unwrap();
        writer.push(1).unwrap();
        writer.push(2).unwrap();
        assert_eq!(count.get(), 2);
        writer.clear().unwrap();
        assert_eq!(count.get(), 0);
    }

    #[test]
    fn write_is_attributed_to_binding() {
        // A binding whose destination is also its source must not re-enter
        // on its own write.
        let cell = Property::new(1);
        let c = cell.clone();
        let _b = Binding::computed(&cell, move || c.get().min(10), &[&cell]).unwrap();
        cell.set(50).unwrap();
        assert_eq!(cell.get(), 10);
    }
}
