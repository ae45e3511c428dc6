//! The observable sequence and its exclusive writer.
//!
//! A sequence is split into two handles:
//!
//! - [`PropertyList`]: `Clone`, read-only access plus subscription.
//! - [`ListWriter`]: not `Clone`, the only way to mutate the sequence.
//!
//! Whoever holds the writer owns the contents. A list binding takes its
//! destination's writer by value, which is how "the destination is
//! mutated by exactly one binding" is enforced rather than assumed.
//!
//! Every element carries an [`ElementKey`] assigned at insertion and kept
//! across [`ListWriter::replace`]. Events name both the position and the
//! key of the element they concern.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;
use tendon_core::{
    BindError, BindingId, CellId, CellListener, ElementKey, ListError, SeqListener, Source,
};

use crate::listeners::ListenerList;
use crate::propagation;

/// A listener attached to a sequence: either a plain change listener or
/// a granular sequence listener.
enum Attached<T> {
    Cell(Weak<dyn CellListener>),
    Seq(Weak<dyn SeqListener<T>>),
}

impl<T> Clone for Attached<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Cell(w) => Self::Cell(Weak::clone(w)),
            Self::Seq(w) => Self::Seq(Weak::clone(w)),
        }
    }
}

/// One mutation, as delivered to sequence listeners.
enum Event<'a, T> {
    Inserted {
        index: usize,
        key: ElementKey,
        item: &'a T,
    },
    Removed {
        index: usize,
        key: ElementKey,
        item: &'a T,
    },
    Replaced {
        index: usize,
        key: ElementKey,
        from: &'a T,
        to: &'a T,
    },
    Cleared,
    Rebuilt,
}

struct Slots<T> {
    keys: Vec<ElementKey>,
    items: Vec<T>,
}

struct ListInner<T> {
    id: CellId,
    slots: RefCell<Slots<T>>,
    listeners: RefCell<ListenerList<Attached<T>>>,
}

/// Shared read/subscribe handle to an observable sequence.
pub struct PropertyList<T> {
    inner: Rc<ListInner<T>>,
}

/// Exclusive mutation handle for a [`PropertyList`].
///
/// Every method applies the change first and then notifies listeners in
/// registration order. If a listener fails, the change stays applied and
/// the error is returned as [`ListError::Propagation`].
pub struct ListWriter<T> {
    list: PropertyList<T>,
}

impl<T: Clone + 'static> PropertyList<T> {
    /// Create an empty sequence, returning its shared handle and its writer.
    pub fn new() -> (Self, ListWriter<T>) {
        Self::from_vec(Vec::new())
    }

    /// Create a sequence seeded with `items`. No events are emitted.
    pub fn from_vec(items: Vec<T>) -> (Self, ListWriter<T>) {
        let keys = items.iter().map(|_| ElementKey::next()).collect();
        let list = Self {
            inner: Rc::new(ListInner {
                id: CellId::next(),
                slots: RefCell::new(Slots { keys, items }),
                listeners: RefCell::new(ListenerList::new()),
            }),
        };
        let writer = ListWriter { list: list.clone() };
        (list, writer)
    }

    /// Identity of this sequence.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.inner.slots.borrow().items.len()
    }

    /// Whether the sequence has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone out the element at `index`.
    pub fn get(&self, index: usize) -> Option<T> {
        self.inner.slots.borrow().items.get(index).cloned()
    }

    /// Key of the element at `index`.
    pub fn key_at(&self, index: usize) -> Option<ElementKey> {
        self.inner.slots.borrow().keys.get(index).copied()
    }

    /// Current position of the element with `key`.
    pub fn position(&self, key: ElementKey) -> Option<usize> {
        self.inner.slots.borrow().keys.iter().position(|&k| k == key)
    }

    /// Clone out every element in order.
    pub fn to_vec(&self) -> Vec<T> {
        self.inner.slots.borrow().items.clone()
    }

    /// Clone out every `(key, element)` pair in order.
    pub fn snapshot(&self) -> Vec<(ElementKey, T)> {
        let slots = self.inner.slots.borrow();
        slots
            .keys
            .iter()
            .copied()
            .zip(slots.items.iter().cloned())
            .collect()
    }

    /// Read the elements by reference.
    ///
    /// `f` must not write this sequence.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.inner.slots.borrow().items)
    }

    /// Register a granular sequence listener under `binding`.
    ///
    /// Shares one ordered registry with plain listeners attached through
    /// [`Source::attach`].
    pub fn attach_seq(&self, binding: BindingId, listener: Weak<dyn SeqListener<T>>) {
        self.inner
            .listeners
            .borrow_mut()
            .insert(binding, Attached::Seq(listener));
    }

    /// Number of attached listeners of either kind.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    /// Whether two handles refer to the same sequence.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn dispatch(&self, event: Event<'_, T>) -> Result<(), BindError> {
        let listeners = self.inner.listeners.borrow().snapshot();
        if listeners.is_empty() {
            return Ok(());
        }
        let _guard = propagation::enter()?;
        let list = self.inner.id;
        tracing::trace!(list = %list, listeners = listeners.len(), "dispatch list event");

        let mut dead: SmallVec<[BindingId; 2]> = SmallVec::new();
        let mut outcome = Ok(());
        for (id, attached) in listeners {
            let result = match attached {
                Attached::Cell(weak) => match weak.upgrade() {
                    Some(listener) => {
                        propagation::record_notification();
                        listener.on_changed(list)
                    }
                    None => {
                        dead.push(id);
                        continue;
                    }
                },
                Attached::Seq(weak) => match weak.upgrade() {
                    Some(listener) => {
                        propagation::record_notification();
                        match event {
                            Event::Inserted { index, key, item } => {
                                listener.on_inserted(list, index, key, item)
                            }
                            Event::Removed { index, key, item } => {
                                listener.on_removed(list, index, key, item)
                            }
                            Event::Replaced {
                                index,
                                key,
                                from,
                                to,
                            } => listener.on_replaced(list, index, key, from, to),
                            Event::Cleared => listener.on_cleared(list),
                            Event::Rebuilt => listener.on_rebuilt(list),
                        }
                    }
                    None => {
                        dead.push(id);
                        continue;
                    }
                },
            };
            if let Err(err) = result {
                outcome = Err(err);
                break;
            }
        }

        if !dead.is_empty() {
            let mut registry = self.inner.listeners.borrow_mut();
            for id in dead {
                registry.remove(id);
            }
        }
        outcome
    }
}

impl<T> PropertyList<T> {
    /// Remove the listener registered under `binding`, of either kind.
    ///
    /// Same as [`Source::detach`], but callable without the element bounds,
    /// for instance from a listener's `Drop`.
    pub fn detach_seq(&self, binding: BindingId) {
        self.inner.listeners.borrow_mut().remove(binding);
    }
}

impl<T> Clone for Event<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Event<'_, T> {}

impl<T> Clone for PropertyList<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for PropertyList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyList")
            .field("id", &self.inner.id)
            .field("items", &self.inner.slots.borrow().items)
            .finish()
    }
}

impl<T: Clone + 'static> Source for PropertyList<T> {
    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn attach(&self, binding: BindingId, listener: Weak<dyn CellListener>) {
        self.inner
            .listeners
            .borrow_mut()
            .insert(binding, Attached::Cell(listener));
    }

    fn detach(&self, binding: BindingId) {
        self.inner.listeners.borrow_mut().remove(binding);
    }

    fn to_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }
}

impl<T: Clone + 'static> ListWriter<T> {
    /// The shared handle of the sequence this writer mutates.
    pub fn list(&self) -> &PropertyList<T> {
        &self.list
    }

    /// Append `item`, returning its key.
    pub fn push(&self, item: T) -> Result<ElementKey, ListError> {
        let index = self.list.len();
        self.insert(index, item)
    }

    /// Append every item in order.
    pub fn extend(&self, items: impl IntoIterator<Item = T>) -> Result<(), ListError> {
        for item in items {
            self.push(item)?;
        }
        Ok(())
    }

    /// Insert `item` at `index` (which may equal the length), returning its
    /// key.
    pub fn insert(&self, index: usize, item: T) -> Result<ElementKey, ListError> {
        let key = ElementKey::next();
        {
            let mut slots = self.list.inner.slots.borrow_mut();
            let len = slots.items.len();
            if index > len {
                return Err(ListError::IndexOutOfRange { index, len });
            }
            slots.keys.insert(index, key);
            slots.items.insert(index, item.clone());
        }
        self.list.dispatch(Event::Inserted {
            index,
            key,
            item: &item,
        })?;
        Ok(key)
    }

    /// Remove and return the element at `index`.
    pub fn remove(&self, index: usize) -> Result<T, ListError> {
        let (key, item) = {
            let mut slots = self.list.inner.slots.borrow_mut();
            let len = slots.items.len();
            if index >= len {
                return Err(ListError::IndexOutOfRange { index, len });
            }
            (slots.keys.remove(index), slots.items.remove(index))
        };
        self.list.dispatch(Event::Removed {
            index,
            key,
            item: &item,
        })?;
        Ok(item)
    }

    /// Replace the element at `index`, keeping its key, and return the old
    /// value.
    ///
    /// Always notifies: sequence elements are not required to be comparable.
    pub fn replace(&self, index: usize, item: T) -> Result<T, ListError> {
        let (key, old) = {
            let mut slots = self.list.inner.slots.borrow_mut();
            let len = slots.items.len();
            if index >= len {
                return Err(ListError::IndexOutOfRange { index, len });
            }
            let old = std::mem::replace(&mut slots.items[index], item.clone());
            (slots.keys[index], old)
        };
        self.list.dispatch(Event::Replaced {
            index,
            key,
            from: &old,
            to: &item,
        })?;
        Ok(old)
    }

    /// Remove every element.
    pub fn clear(&self) -> Result<(), ListError> {
        {
            let mut slots = self.list.inner.slots.borrow_mut();
            slots.keys.clear();
            slots.items.clear();
        }
        self.list.dispatch(Event::Cleared)?;
        Ok(())
    }

    /// Replace the whole contents with `items`, assigning fresh keys.
    ///
    /// Listeners receive a single rebuild event and resync from scratch.
    pub fn assign(&self, items: impl IntoIterator<Item = T>) -> Result<(), ListError> {
        {
            let mut slots = self.list.inner.slots.borrow_mut();
            slots.items = items.into_iter().collect();
            slots.keys = slots.items.iter().map(|_| ElementKey::next()).collect();
        }
        self.list.dispatch(Event::Rebuilt)?;
        Ok(())
    }
}

impl<T: fmt::Debug> fmt::Debug for ListWriter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListWriter")
            .field("list", &self.list)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Records every event as a compact string.
    struct Log {
        events: RefCell<Vec<String>>,
    }

    impl SeqListener<i32> for Log {
        fn on_inserted(&self, _: CellId, index: usize, _: ElementKey, item: &i32) -> Result<(), BindError> {
            self.events.borrow_mut().push(format!("ins {index} {item}"));
            Ok(())
        }
        fn on_removed(&self, _: CellId, index: usize, _: ElementKey, item: &i32) -> Result<(), BindError> {
            self.events.borrow_mut().push(format!("rm {index} {item}"));
            Ok(())
        }
        fn on_replaced(
            &self,
            _: CellId,
            index: usize,
            _: ElementKey,
            from: &i32,
            to: &i32,
        ) -> Result<(), BindError> {
            self.events.borrow_mut().push(format!("set {index} {from}->{to}"));
            Ok(())
        }
        fn on_cleared(&self, _: CellId) -> Result<(), BindError> {
            self.events.borrow_mut().push("clear".into());
            Ok(())
        }
        fn on_rebuilt(&self, _: CellId) -> Result<(), BindError> {
            self.events.borrow_mut().push("rebuild".into());
            Ok(())
        }
    }

    fn logged() -> (PropertyList<i32>, ListWriter<i32>, Rc<Log>) {
        let (list, writer) = PropertyList::new();
        let log = Rc::new(Log {
            events: RefCell::new(Vec::new()),
        });
        let weak: Weak<Log> = Rc::downgrade(&log);
        list.attach_seq(BindingId::next(), weak);
        (list, writer, log)
    }

    #[test]
    fn events_follow_mutations() {
        let (list, writer, log) = logged();
        writer.push(1).unwrap();
        writer.push(3).unwrap();
        writer.insert(1, 2).unwrap();
        writer.replace(0, 10).unwrap();
        writer.remove(2).unwrap();
        writer.clear().unwrap();
        writer.assign([7, 8]).unwrap();
        assert_eq!(
            *log.events.borrow(),
            vec![
                "ins 0 1",
                "ins 1 3",
                "ins 1 2",
                "set 0 1->10",
                "rm 2 3",
                "clear",
                "rebuild"
            ]
        );
        assert_eq!(list.to_vec(), vec![7, 8]);
    }

    #[test]
    fn replace_keeps_key() {
        let (list, writer) = PropertyList::from_vec(vec![5, 6]);
        let key = list.key_at(1).unwrap();
        assert_eq!(writer.replace(1, 60), Ok(6));
        assert_eq!(list.key_at(1), Some(key));
        assert_eq!(list.position(key), Some(1));
    }

    #[test]
    fn equal_values_get_distinct_keys() {
        let (list, writer) = PropertyList::new();
        let a = writer.push("crate").unwrap();
        let b = writer.push("crate").unwrap();
        assert_ne!(a, b);
        assert_eq!(list.snapshot(), vec![(a, "crate"), (b, "crate")]);
    }

    #[test]
    fn out_of_range_is_rejected() {
        let (_, writer) = PropertyList::from_vec(vec![1]);
        assert_eq!(
            writer.insert(3, 0),
            Err(ListError::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(
            writer.remove(1),
            Err(ListError::IndexOutOfRange { index: 1, len: 1 })
        );
        assert_eq!(
            writer.replace(5, 0),
            Err(ListError::IndexOutOfRange { index: 5, len: 1 })
        );
    }

    #[test]
    fn plain_listeners_see_every_mutation() {
        struct Count(RefCell<usize>);
        impl CellListener for Count {
            fn on_changed(&self, _: CellId) -> Result<(), BindError> {
                *self.0.borrow_mut() += 1;
                Ok(())
            }
        }

        let (list, writer) = PropertyList::new();
        let count = Rc::new(Count(RefCell::new(0)));
        let weak: Weak<Count> = Rc::downgrade(&count);
        list.attach(BindingId::next(), weak);
        writer.push(1).unwrap();
        writer.replace(0, 2).unwrap();
        writer.remove(0).unwrap();
        writer.clear().unwrap();
        assert_eq!(*count.0.borrow(), 4);
    }

    #[test]
    fn writer_reads_through_shared_handle() {
        let (list, writer) = PropertyList::from_vec(vec!['a', 'b']);
        assert!(writer.list().ptr_eq(&list));
        assert_eq!(writer.list().get(1), Some('b'));
        assert_eq!(list.get(2), None);
        assert!(!list.is_empty());
    }

    proptest! {
        #[test]
        fn keys_stay_parallel_to_items(ops in prop::collection::vec((0u8..3, 0usize..8, any::<i16>()), 0..40)) {
            let (list, writer) = PropertyList::new();
            for (kind, index, value) in ops {
                let len = list.len();
                match kind {
                    0 => { writer.insert(index.min(len), value).unwrap(); }
                    1 if len > 0 => { writer.remove(index % len).unwrap(); }
                    2 if len > 0 => { writer.replace(index % len, value).unwrap(); }
                    _ => {}
                }
                let snap = list.snapshot();
                prop_assert_eq!(snap.len(), list.len());
                let mut keys: Vec<ElementKey> = snap.iter().map(|(k, _)| *k).collect();
                keys.sort();
                keys.dedup();
                prop_assert_eq!(keys.len(), snap.len());
            }
        }
    }
}
