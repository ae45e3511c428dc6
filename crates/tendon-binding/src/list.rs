//! Incremental list transduction.
//!
//! A [`ListBinding`] derives a destination sequence from a source sequence
//! through a one-to-many `transform` and a `filter`. Each source element
//! owns one entry in a table kept in source order:
//!
//! ```text
//! source:       [ a        b    c (filtered out)   d     ]
//! entries:      [ 0..2     2..3 3..3 (excluded)    3..5  ]
//! destination:  [ a0 a1    b0                      d0 d1 ]
//! ```
//!
//! Every entry's `start` equals the summed length of the entries before
//! it, so an insert, remove or replace touches only its own destination
//! range and shifts the suffix of the table by the length delta. The
//! destination is rebuilt from scratch only on construction, when the
//! source is rebuilt, when the binding is re-enabled, and on the first
//! event after a destination write failed partway.
//!
//! Entries are matched by [`ElementKey`], never by element value, so
//! several equal elements in the source map independently.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::ops::Range;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tendon_cell::{ListWriter, PropertyList};
use tendon_core::{BindError, BindingId, CellId, ElementKey, Link, ListError, SeqListener};

/// Destination elements produced for one source element.
pub type Outputs<D> = SmallVec<[D; 4]>;

type Transform<S, D> = Box<dyn Fn(&S) -> Outputs<D>>;
type Filter<S> = Box<dyn Fn(&S) -> bool>;

/// Keeps a destination sequence equal to the filtered, transformed
/// concatenation of a source sequence.
///
/// The binding owns the destination's [`ListWriter`], so nothing else can
/// mutate the destination while the binding lives. Read the destination
/// through [`destination`](Self::destination) or through the
/// [`PropertyList`] handle kept before handing over the writer.
///
/// # Examples
///
/// ```
/// use tendon_binding::ListBinding;
/// use tendon_cell::PropertyList;
///
/// let (waypoints, edit) = PropertyList::from_vec(vec![1, 2, 3]);
/// let (markers, markers_writer) = PropertyList::new();
/// let _b = ListBinding::map(markers_writer, &waypoints, |x: &i32| [*x, x * 10]).unwrap();
/// assert_eq!(markers.to_vec(), vec![1, 10, 2, 20, 3, 30]);
///
/// edit.remove(1).unwrap();
/// assert_eq!(markers.to_vec(), vec![1, 10, 3, 30]);
/// ```
#[must_use = "dropping the handle unsubscribes the binding"]
pub struct ListBinding<S, D> {
    inner: Rc<ListInner<S, D>>,
}

struct ListInner<S, D> {
    id: BindingId,
    enabled: Cell<bool>,
    live: Cell<bool>,
    source: PropertyList<S>,
    destination: PropertyList<D>,
    state: RefCell<Option<Transducer<S, D>>>,
}

struct Transducer<S, D> {
    writer: ListWriter<D>,
    transform: Transform<S, D>,
    filter: Filter<S>,
    entries: Vec<Entry>,
    /// Set when an update failed partway; the next event rebuilds.
    stale: bool,
}

/// One source element's slice of the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Entry {
    key: ElementKey,
    start: usize,
    len: usize,
    included: bool,
}

impl<S: Clone + 'static, D: Clone + 'static> ListBinding<S, D> {
    /// Bind `destination` to the elements of `source` that pass `filter`,
    /// each expanded by `transform`.
    pub fn new<I>(
        destination: ListWriter<D>,
        source: &PropertyList<S>,
        transform: impl Fn(&S) -> I + 'static,
        filter: impl Fn(&S) -> bool + 'static,
    ) -> Result<Self, BindError>
    where
        I: IntoIterator<Item = D> + 'static,
    {
        Self::build(
            destination,
            source,
            Box::new(move |s| transform(s).into_iter().collect()),
            Box::new(filter),
        )
    }

    /// Bind `destination` to every element of `source`, expanded by
    /// `transform`.
    pub fn map<I>(
        destination: ListWriter<D>,
        source: &PropertyList<S>,
        transform: impl Fn(&S) -> I + 'static,
    ) -> Result<Self, BindError>
    where
        I: IntoIterator<Item = D> + 'static,
    {
        Self::new(destination, source, transform, |_| true)
    }

    fn build(
        destination: ListWriter<D>,
        source: &PropertyList<S>,
        transform: Transform<S, D>,
        filter: Filter<S>,
    ) -> Result<Self, BindError> {
        let inner = Rc::new(ListInner {
            id: BindingId::next(),
            enabled: Cell::new(true),
            live: Cell::new(true),
            source: source.clone(),
            destination: destination.list().clone(),
            state: RefCell::new(Some(Transducer {
                writer: destination,
                transform,
                filter,
                entries: Vec::new(),
                stale: false,
            })),
        });
        let listener: Weak<dyn SeqListener<S>> = Rc::downgrade(&inner) as Weak<_>;
        source.attach_seq(inner.id, listener);
        tracing::debug!(
            binding = %inner.id,
            source = %source.id(),
            destination = %inner.destination.id(),
            "list binding created"
        );
        inner.resync()?;
        Ok(Self { inner })
    }

    /// Read handle to the destination sequence.
    pub fn destination(&self) -> PropertyList<D> {
        self.inner.destination.clone()
    }

    /// Destination range of every included source element, in order.
    ///
    /// Empty while an event is being applied and after deletion.
    pub fn ranges(&self) -> Vec<(ElementKey, Range<usize>)> {
        match self.inner.state.try_borrow() {
            Ok(state) => state
                .as_ref()
                .map(|t| {
                    t.entries
                        .iter()
                        .filter(|e| e.included)
                        .map(|e| (e.key, e.start..e.start + e.len))
                        .collect()
                })
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    /// Sum of all range lengths. Equals the destination length whenever
    /// the binding is enabled and idle.
    pub fn mapped_len(&self) -> usize {
        self.ranges().iter().map(|(_, r)| r.len()).sum()
    }

    /// Whether [`delete`](Link::delete) has run.
    pub fn is_deleted(&self) -> bool {
        !self.inner.live.get()
    }
}

impl<T: Clone + 'static> ListBinding<T, T> {
    /// Keep `destination` an element-for-element copy of `source`.
    pub fn mirror(destination: ListWriter<T>, source: &PropertyList<T>) -> Result<Self, BindError> {
        Self::new(destination, source, |x: &T| [x.clone()], |_| true)
    }
}

impl<S: Clone + 'static, D: Clone + 'static> ListInner<S, D> {
    /// Run `f` against the transducer unless the binding is deleted or
    /// disabled. Fails if another event is still being applied.
    ///
    /// A stale transducer rebuilds from the source instead of running `f`;
    /// the source already reflects the event `f` would have applied.
    fn apply(
        &self,
        f: impl FnOnce(BindingId, &mut Transducer<S, D>) -> Result<(), BindError>,
    ) -> Result<(), BindError> {
        if !self.live.get() || !self.enabled.get() {
            return Ok(());
        }
        let mut state = self.state.try_borrow_mut().map_err(|_| {
            tracing::warn!(binding = %self.id, "list binding re-entered");
            BindError::Reentrant { binding: self.id }
        })?;
        let Some(t) = state.as_mut() else {
            return Ok(());
        };
        let result = if t.stale {
            t.rebuild(self.id, &self.source.snapshot())
        } else {
            f(self.id, t)
        };
        if t.stale {
            tracing::debug!(binding = %self.id, "destination write failed, list binding marked stale");
        }
        // Deleted while this event was being applied.
        if !self.live.get() {
            state.take();
        }
        result
    }

    fn resync(&self) -> Result<(), BindError> {
        let elements = self.source.snapshot();
        self.apply(|id, t| t.rebuild(id, &elements))
    }
}

impl<S, D: Clone + 'static> Transducer<S, D> {
    fn entry(&self, binding: BindingId, index: usize, key: ElementKey) -> Result<Entry, BindError> {
        let entry = self
            .entries
            .get(index)
            .copied()
            .ok_or(BindError::Desynchronized {
                binding,
                index,
                len: self.entries.len(),
            })?;
        if entry.key != key {
            return Err(BindError::MissingMapping { binding, key });
        }
        Ok(entry)
    }

    /// Offset at which the element now at `index` starts.
    fn offset(&self, index: usize) -> usize {
        match self.entries.get(index) {
            Some(e) => e.start,
            None => self.entries.last().map_or(0, |e| e.start + e.len),
        }
    }

    /// Shift every entry from `from` onward by `delta`.
    fn shift(&mut self, from: usize, delta: isize) {
        if delta == 0 {
            return;
        }
        for entry in &mut self.entries[from..] {
            entry.start = entry.start.saturating_add_signed(delta);
        }
    }

    /// Apply one destination edit. A failure may leave the destination
    /// partially edited, so it marks the table stale.
    fn write<R>(
        &mut self,
        binding: BindingId,
        op: impl FnOnce(&ListWriter<D>) -> Result<R, ListError>,
    ) -> Result<R, BindError> {
        op(&self.writer).map_err(|e| {
            self.stale = true;
            lift(binding, e)
        })
    }

    fn splice(&mut self, binding: BindingId, at: usize, outputs: Outputs<D>) -> Result<usize, BindError> {
        let count = outputs.len();
        for (i, item) in outputs.into_iter().enumerate() {
            self.write(binding, |w| w.insert(at + i, item))?;
        }
        Ok(count)
    }

    fn cut(&mut self, binding: BindingId, range: Range<usize>) -> Result<(), BindError> {
        for i in range.rev() {
            self.write(binding, |w| w.remove(i))?;
        }
        Ok(())
    }
}

impl<S, D: Clone + 'static> Transducer<S, D> {
    fn rebuild(&mut self, binding: BindingId, elements: &[(ElementKey, S)]) -> Result<(), BindError> {
        tracing::debug!(binding = %binding, elements = elements.len(), "list binding resync");
        self.stale = false;
        self.entries.clear();
        self.write(binding, |w| w.clear())?;
        for (key, item) in elements {
            let index = self.entries.len();
            self.insert(binding, index, *key, item)?;
        }
        Ok(())
    }

    fn insert(&mut self, binding: BindingId, index: usize, key: ElementKey, item: &S) -> Result<(), BindError> {
        if index > self.entries.len() {
            return Err(BindError::Desynchronized {
                binding,
                index,
                len: self.entries.len(),
            });
        }
        let start = self.offset(index);
        let included = (self.filter)(item);
        let len = if included {
            self.splice(binding, start, (self.transform)(item))?
        } else {
            0
        };
        self.entries.insert(
            index,
            Entry {
                key,
                start,
                len,
                included,
            },
        );
        self.shift(index + 1, len as isize);
        Ok(())
    }

    fn remove(&mut self, binding: BindingId, index: usize, key: ElementKey) -> Result<(), BindError> {
        let entry = self.entry(binding, index, key)?;
        self.cut(binding, entry.start..entry.start + entry.len)?;
        self.entries.remove(index);
        self.shift(index, -(entry.len as isize));
        Ok(())
    }

    fn replace(&mut self, binding: BindingId, index: usize, key: ElementKey, to: &S) -> Result<(), BindError> {
        let entry = self.entry(binding, index, key)?;
        let included = (self.filter)(to);
        let new_len = match (entry.included, included) {
            (true, true) => {
                let outputs = (self.transform)(to);
                let new_len = outputs.len();
                for (i, item) in outputs.into_iter().enumerate() {
                    if i < entry.len {
                        self.write(binding, |w| w.replace(entry.start + i, item))?;
                    } else {
                        self.write(binding, |w| w.insert(entry.start + i, item))?;
                    }
                }
                if new_len < entry.len {
                    self.cut(binding, entry.start + new_len..entry.start + entry.len)?;
                }
                new_len
            }
            (false, true) => self.splice(binding, entry.start, (self.transform)(to))?,
            (true, false) => {
                self.cut(binding, entry.start..entry.start + entry.len)?;
                0
            }
            (false, false) => return Ok(()),
        };
        self.entries[index] = Entry {
            len: new_len,
            included,
            ..entry
        };
        self.shift(index + 1, new_len as isize - entry.len as isize);
        Ok(())
    }
}

/// Convert a destination write failure into a propagation error.
///
/// An out-of-range write means the table no longer matches the
/// destination.
fn lift(binding: BindingId, err: ListError) -> BindError {
    match err {
        ListError::Propagation(inner) => inner,
        ListError::IndexOutOfRange { index, len } => {
            tracing::warn!(binding = %binding, index, len, "list binding desynchronized");
            BindError::Desynchronized {
                binding,
                index,
                len,
            }
        }
    }
}

impl<S: Clone + 'static, D: Clone + 'static> SeqListener<S> for ListInner<S, D> {
    fn on_inserted(&self, _: CellId, index: usize, key: ElementKey, item: &S) -> Result<(), BindError> {
        self.apply(|id, t| t.insert(id, index, key, item))
    }

    fn on_removed(&self, _: CellId, index: usize, key: ElementKey, _: &S) -> Result<(), BindError> {
        self.apply(|id, t| t.remove(id, index, key))
    }

    fn on_replaced(
        &self,
        _: CellId,
        index: usize,
        key: ElementKey,
        _from: &S,
        to: &S,
    ) -> Result<(), BindError> {
        self.apply(|id, t| t.replace(id, index, key, to))
    }

    fn on_cleared(&self, _: CellId) -> Result<(), BindError> {
        if !self.live.get() {
            return Ok(());
        }
        let mut state = self
            .state
            .try_borrow_mut()
            .map_err(|_| BindError::Reentrant { binding: self.id })?;
        let Some(t) = state.as_mut() else {
            return Ok(());
        };
        t.entries.clear();
        if !self.enabled.get() {
            return Ok(());
        }
        t.stale = false;
        let result = t.write(self.id, |w| w.clear());
        if !self.live.get() {
            state.take();
        }
        result
    }

    fn on_rebuilt(&self, _: CellId) -> Result<(), BindError> {
        self.resync()
    }
}

impl<S, D> ListInner<S, D> {
    fn release(&self) -> bool {
        if !self.live.replace(false) {
            return false;
        }
        self.source.detach_seq(self.id);
        // Mid-event the transducer stays borrowed; the event in flight
        // releases it when it finishes.
        if let Ok(mut state) = self.state.try_borrow_mut() {
            state.take();
        }
        true
    }
}

impl<S, D> Drop for ListInner<S, D> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<S: Clone + 'static, D: Clone + 'static> Link for ListBinding<S, D> {
    fn id(&self) -> BindingId {
        self.inner.id
    }

    fn enabled(&self) -> bool {
        self.inner.enabled.get()
    }

    /// Re-enabling rebuilds the destination from the current source, since
    /// events that arrived while disabled were dropped.
    fn set_enabled(&self, enabled: bool) -> Result<(), BindError> {
        let was = self.inner.enabled.replace(enabled);
        if enabled && !was {
            self.inner.resync()?;
        }
        Ok(())
    }

    fn delete(&self) {
        if self.inner.release() {
            tracing::debug!(binding = %self.inner.id, "list binding deleted");
        }
    }
}

impl<S, D> Clone for ListBinding<S, D> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S, D> fmt::Debug for ListBinding<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListBinding")
            .field("id", &self.inner.id)
            .field("enabled", &self.inner.enabled.get())
            .field("live", &self.inner.live.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doubled(x: &i32) -> [i32; 2] {
        [*x, x * 10]
    }

    fn setup(items: Vec<i32>) -> (ListWriter<i32>, PropertyList<i32>, ListBinding<i32, i32>) {
        let (source, edit) = PropertyList::from_vec(items);
        let (dest, writer) = PropertyList::new();
        let binding = ListBinding::map(writer, &source, doubled).unwrap();
        (edit, dest, binding)
    }

    fn starts(b: &ListBinding<i32, i32>) -> Vec<Range<usize>> {
        b.ranges().into_iter().map(|(_, r)| r).collect()
    }

    #[test]
    fn remove_shifts_later_ranges() {
        let (edit, dest, b) = setup(vec![1, 2, 3]);
        assert_eq!(starts(&b), vec![0..2, 2..4, 4..6]);
        edit.remove(1).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 10, 3, 30]);
        assert_eq!(starts(&b), vec![0..2, 2..4]);
    }

    #[test]
    fn insert_lands_in_source_position() {
        let (edit, dest, b) = setup(vec![1, 3]);
        edit.insert(1, 2).unwrap();
        edit.insert(0, 0).unwrap();
        assert_eq!(dest.to_vec(), vec![0, 0, 1, 10, 2, 20, 3, 30]);
        assert_eq!(b.mapped_len(), 8);
    }

    #[test]
    fn replace_resizes_range() {
        let (source, edit) = PropertyList::from_vec(vec![1, 2, 3]);
        let (dest, writer) = PropertyList::new();
        let b = ListBinding::map(writer, &source, |x: &i32| vec![*x; *x as usize]).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 2, 2, 3, 3, 3]);

        edit.replace(1, 4).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 4, 4, 4, 4, 3, 3, 3]);
        edit.replace(1, 1).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 1, 3, 3, 3]);
        edit.replace(1, 0).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 3, 3, 3]);
        assert_eq!(starts(&b), vec![0..1, 1..1, 1..4]);
    }

    #[test]
    fn filter_transitions() {
        let (source, edit) = PropertyList::from_vec(vec![1, 2, 3, 4]);
        let (dest, writer) = PropertyList::new();
        let b = ListBinding::new(writer, &source, |x: &i32| [*x], |x| x % 2 == 0).unwrap();
        assert_eq!(dest.to_vec(), vec![2, 4]);

        // excluded -> included
        edit.replace(0, 6).unwrap();
        assert_eq!(dest.to_vec(), vec![6, 2, 4]);
        // included -> excluded
        edit.replace(1, 5).unwrap();
        assert_eq!(dest.to_vec(), vec![6, 4]);
        // excluded -> excluded
        edit.replace(2, 7).unwrap();
        assert_eq!(dest.to_vec(), vec![6, 4]);
        // included -> included
        edit.replace(3, 8).unwrap();
        assert_eq!(dest.to_vec(), vec![6, 8]);
        assert_eq!(b.mapped_len(), dest.len());
    }

    #[test]
    fn excluded_boundary_entries_are_not_misshifted() {
        let (source, edit) = PropertyList::from_vec(vec![2, 1, 1, 4]);
        let (dest, writer) = PropertyList::new();
        let _b = ListBinding::new(writer, &source, |x: &i32| [*x], |x| x % 2 == 0).unwrap();
        // The two excluded entries share the boundary at offset 1.
        edit.replace(2, 8).unwrap();
        assert_eq!(dest.to_vec(), vec![2, 8, 4]);
        edit.replace(1, 6).unwrap();
        assert_eq!(dest.to_vec(), vec![2, 6, 8, 4]);
    }

    #[test]
    fn equal_elements_map_independently() {
        let (edit, dest, _b) = setup(vec![5, 5, 5]);
        edit.remove(1).unwrap();
        assert_eq!(dest.to_vec(), vec![5, 50, 5, 50]);
        edit.replace(0, 6).unwrap();
        assert_eq!(dest.to_vec(), vec![6, 60, 5, 50]);
    }

    #[test]
    fn clear_and_rebuild() {
        let (edit, dest, b) = setup(vec![1, 2]);
        edit.clear().unwrap();
        assert!(dest.is_empty());
        assert!(b.ranges().is_empty());
        edit.assign([7, 8]).unwrap();
        assert_eq!(dest.to_vec(), vec![7, 70, 8, 80]);
    }

    #[test]
    fn reenable_resyncs_missed_events() {
        let (edit, dest, b) = setup(vec![1, 2]);
        b.set_enabled(false).unwrap();
        edit.remove(0).unwrap();
        edit.push(3).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 10, 2, 20]);
        b.set_enabled(true).unwrap();
        assert_eq!(dest.to_vec(), vec![2, 20, 3, 30]);
        assert_eq!(b.mapped_len(), 4);
    }

    #[test]
    fn clear_while_disabled_keeps_destination() {
        let (edit, dest, b) = setup(vec![1]);
        b.set_enabled(false).unwrap();
        edit.clear().unwrap();
        assert_eq!(dest.to_vec(), vec![1, 10]);
        b.set_enabled(true).unwrap();
        assert!(dest.is_empty());
    }

    #[test]
    fn delete_detaches_and_freezes_destination() {
        let (edit, dest, b) = setup(vec![1]);
        b.delete();
        assert!(b.is_deleted());
        edit.push(2).unwrap();
        assert_eq!(dest.to_vec(), vec![1, 10]);
        assert_eq!(edit.list().listener_count(), 0);
    }

    #[test]
    fn mirror_copies() {
        let (source, edit) = PropertyList::from_vec(vec!["a", "b"]);
        let (dest, writer) = PropertyList::new();
        let _b = ListBinding::mirror(writer, &source).unwrap();
        edit.insert(1, "c").unwrap();
        assert_eq!(dest.to_vec(), vec!["a", "c", "b"]);
    }

    #[test]
    fn key_mismatch_is_missing_mapping() {
        let (edit, _dest, b) = setup(vec![1]);
        let stray = ElementKey::next();
        let err = b.inner.on_removed(edit.list().id(), 0, stray, &1);
        assert_eq!(
            err,
            Err(BindError::MissingMapping {
                binding: b.id(),
                key: stray
            })
        );
        let err = b.inner.on_removed(edit.list().id(), 4, stray, &1);
        assert!(matches!(err, Err(BindError::Desynchronized { index: 4, len: 1, .. })));
    }
}
