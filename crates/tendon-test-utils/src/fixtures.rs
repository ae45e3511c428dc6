//! Reusable listener fixtures.
//!
//! - [`RecordingListener`]: records every cell that notified it.
//! - [`EventLog`]: records every sequence event it receives.
//! - [`FailingListener`]: fails deterministically after N calls.
//!
//! Each fixture is created behind an `Rc` and attached with a weak handle,
//! the same way bindings attach themselves.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tendon_cell::PropertyList;
use tendon_core::{BindError, BindingId, CellId, CellListener, ElementKey, SeqListener, Source};

/// Records the cell ID of every notification.
pub struct RecordingListener {
    pub id: BindingId,
    seen: RefCell<Vec<CellId>>,
}

impl RecordingListener {
    /// Create a listener and attach it to `source`.
    pub fn attach(source: &dyn Source) -> Rc<Self> {
        let listener = Rc::new(Self {
            id: BindingId::next(),
            seen: RefCell::new(Vec::new()),
        });
        let weak: Weak<dyn CellListener> = Rc::downgrade(&listener) as Weak<_>;
        source.attach(listener.id, weak);
        listener
    }

    pub fn seen(&self) -> Vec<CellId> {
        self.seen.borrow().clone()
    }

    pub fn count(&self) -> usize {
        self.seen.borrow().len()
    }
}

impl CellListener for RecordingListener {
    fn on_changed(&self, changed: CellId) -> Result<(), BindError> {
        self.seen.borrow_mut().push(changed);
        Ok(())
    }
}

/// A sequence event as seen by a listener.
#[derive(Clone, Debug, PartialEq)]
pub enum SeqEvent<T> {
    Inserted { index: usize, key: ElementKey, item: T },
    Removed { index: usize, key: ElementKey, item: T },
    Replaced { index: usize, key: ElementKey, from: T, to: T },
    Cleared,
    Rebuilt,
}

/// Records every sequence event.
pub struct EventLog<T> {
    pub id: BindingId,
    events: RefCell<Vec<SeqEvent<T>>>,
}

impl<T: Clone + 'static> EventLog<T> {
    /// Create a log and attach it to `list`.
    pub fn attach(list: &PropertyList<T>) -> Rc<Self> {
        let log = Rc::new(Self {
            id: BindingId::next(),
            events: RefCell::new(Vec::new()),
        });
        let weak: Weak<dyn SeqListener<T>> = Rc::downgrade(&log) as Weak<_>;
        list.attach_seq(log.id, weak);
        log
    }

    pub fn events(&self) -> Vec<SeqEvent<T>> {
        self.events.borrow().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<SeqEvent<T>> {
        self.events.take()
    }
}

impl<T: Clone> SeqListener<T> for EventLog<T> {
    fn on_inserted(&self, _: CellId, index: usize, key: ElementKey, item: &T) -> Result<(), BindError> {
        self.events.borrow_mut().push(SeqEvent::Inserted {
            index,
            key,
            item: item.clone(),
        });
        Ok(())
    }

    fn on_removed(&self, _: CellId, index: usize, key: ElementKey, item: &T) -> Result<(), BindError> {
        self.events.borrow_mut().push(SeqEvent::Removed {
            index,
            key,
            item: item.clone(),
        });
        Ok(())
    }

    fn on_replaced(
        &self,
        _: CellId,
        index: usize,
        key: ElementKey,
        from: &T,
        to: &T,
    ) -> Result<(), BindError> {
        self.events.borrow_mut().push(SeqEvent::Replaced {
            index,
            key,
            from: from.clone(),
            to: to.clone(),
        });
        Ok(())
    }

    fn on_cleared(&self, _: CellId) -> Result<(), BindError> {
        self.events.borrow_mut().push(SeqEvent::Cleared);
        Ok(())
    }

    fn on_rebuilt(&self, _: CellId) -> Result<(), BindError> {
        self.events.borrow_mut().push(SeqEvent::Rebuilt);
        Ok(())
    }
}

/// Succeeds for the first `succeed_count` notifications, then fails with
/// [`BindError::UnknownSource`].
pub struct FailingListener {
    pub id: BindingId,
    succeed_count: usize,
    calls: Cell<usize>,
}

impl FailingListener {
    /// Create a listener and attach it to `source`.
    pub fn attach(source: &dyn Source, succeed_count: usize) -> Rc<Self> {
        let listener = Rc::new(Self {
            id: BindingId::next(),
            succeed_count,
            calls: Cell::new(0),
        });
        let weak: Weak<dyn CellListener> = Rc::downgrade(&listener) as Weak<_>;
        source.attach(listener.id, weak);
        listener
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl CellListener for FailingListener {
    fn on_changed(&self, changed: CellId) -> Result<(), BindError> {
        let n = self.calls.get();
        self.calls.set(n + 1);
        if n >= self.succeed_count {
            return Err(BindError::UnknownSource {
                binding: self.id,
                cell: changed,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tendon_cell::Property;

    #[test]
    fn recording_listener_sees_writes() {
        let cell = Property::new(0);
        let rec = RecordingListener::attach(&cell);
        cell.set(1).unwrap();
        cell.set(1).unwrap();
        assert_eq!(rec.seen(), vec![cell.id()]);
    }

    #[test]
    fn event_log_captures_keys() {
        let (list, writer) = PropertyList::new();
        let log = EventLog::attach(&list);
        let key = writer.push('x').unwrap();
        writer.replace(0, 'y').unwrap();
        assert_eq!(
            log.take(),
            vec![
                SeqEvent::Inserted {
                    index: 0,
                    key,
                    item: 'x'
                },
                SeqEvent::Replaced {
                    index: 0,
                    key,
                    from: 'x',
                    to: 'y'
                },
            ]
        );
        assert!(log.events().is_empty());
    }

    #[test]
    fn failing_listener_fails_after_budget() {
        let cell = Property::new(0);
        let failing = FailingListener::attach(&cell, 1);
        assert!(cell.set(1).is_ok());
        assert!(cell.set(2).is_err());
        assert_eq!(failing.calls(), 2);
    }
}
