//! Per-thread cascade tracking.
//!
//! Every notification fan-out, from a scalar cell or a sequence, enters a
//! [`DepthGuard`] before calling its listeners. The guard counts nesting
//! on the current thread and aborts the cascade with
//! [`BindError::CascadeTooDeep`] once the configured limit is exceeded,
//! turning an unsuppressed cycle into an error instead of a stack overflow.
//!
//! The tracker also keeps cheap counters ([`PropagationStats`]) that tests
//! and profiling use to check how much work a mutation caused.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;

use tendon_core::BindError;

use crate::config::{ConfigError, PropagationConfig};

/// Counters accumulated on the current thread since the last
/// [`reset_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PropagationStats {
    /// Writes that changed a value and were propagated.
    pub writes: u64,
    /// Writes dropped because the new value equalled the old one.
    pub suppressed_writes: u64,
    /// Individual listener invocations.
    pub notifications: u64,
    /// Deepest fan-out nesting observed.
    pub peak_depth: usize,
}

struct Tracker {
    config: Cell<PropagationConfig>,
    depth: Cell<usize>,
    stats: RefCell<PropagationStats>,
}

thread_local! {
    static TRACKER: Tracker = Tracker {
        config: Cell::new(PropagationConfig::default()),
        depth: Cell::new(0),
        stats: RefCell::new(PropagationStats::default()),
    };
}

/// Install `config` for the current thread.
pub fn configure(config: PropagationConfig) -> Result<(), ConfigError> {
    config.validate()?;
    TRACKER.with(|t| t.config.set(config));
    Ok(())
}

/// The configuration active on the current thread.
pub fn config() -> PropagationConfig {
    TRACKER.with(|t| t.config.get())
}

/// Current fan-out nesting on this thread. Zero outside any cascade.
pub fn depth() -> usize {
    TRACKER.with(|t| t.depth.get())
}

/// Snapshot of the counters for this thread.
pub fn stats() -> PropagationStats {
    TRACKER.with(|t| *t.stats.borrow())
}

/// Zero the counters for this thread.
pub fn reset_stats() {
    TRACKER.with(|t| *t.stats.borrow_mut() = PropagationStats::default());
}

/// RAII marker for one level of fan-out nesting.
///
/// Not `Send`: it decrements the counter of the thread that created it.
#[must_use]
pub(crate) struct DepthGuard {
    _not_send: PhantomData<*const ()>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        TRACKER.with(|t| t.depth.set(t.depth.get().saturating_sub(1)));
    }
}

/// Enter one level of fan-out, failing if the limit would be exceeded.
pub(crate) fn enter() -> Result<DepthGuard, BindError> {
    TRACKER.with(|t| {
        let depth = t.depth.get() + 1;
        let limit = t.config.get().max_depth;
        if depth > limit {
            tracing::warn!(depth, limit, "propagation depth limit exceeded");
            return Err(BindError::CascadeTooDeep { depth, limit });
        }
        t.depth.set(depth);
        let mut stats = t.stats.borrow_mut();
        stats.peak_depth = stats.peak_depth.max(depth);
        Ok(DepthGuard {
            _not_send: PhantomData,
        })
    })
}

pub(crate) fn record_write(changed: bool) {
    TRACKER.with(|t| {
        let mut stats = t.stats.borrow_mut();
        if changed {
            stats.writes += 1;
        } else {
            stats.suppressed_writes += 1;
        }
    });
}

pub(crate) fn record_notification() {
    TRACKER.with(|t| t.stats.borrow_mut().notifications += 1);
}
