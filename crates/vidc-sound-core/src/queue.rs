//! Timed event queue
//!
//! A small time-ordered queue driving the emulation's scheduled callbacks.
//! Handlers are dispatched while their entry is still at the head and are
//! expected to either reschedule themselves (the sound DMA event always
//! does) or remove their entry; `find`/`remove` exist so a subsystem can
//! verify its entry is present at shutdown.

/// Emulated-clock tick count.
pub type Cycles = u64;

#[derive(Clone, Copy, Debug)]
struct Entry<E> {
    time: Cycles,
    what: E,
}

/// Time-ordered event queue, generic over an event tag.
#[derive(Clone, Debug, Default)]
pub struct EventQueue<E> {
    entries: Vec<Entry<E>>,
}

impl<E: Copy + PartialEq> EventQueue<E> {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of scheduled entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Schedule `what` for `time`. Entries with equal times keep their
    /// insertion order.
    pub fn insert(&mut self, time: Cycles, what: E) {
        let idx = self.entries.partition_point(|e| e.time <= time);
        self.entries.insert(idx, Entry { time, what });
    }

    /// The earliest scheduled entry, if any.
    pub fn head(&self) -> Option<(Cycles, E)> {
        self.entries.first().map(|e| (e.time, e.what))
    }

    /// Move the head entry to `time`.
    ///
    /// Must be called from the head entry's own handler, which is the only
    /// place the sound code reschedules from; `what` names the handler for
    /// a consistency check.
    pub fn reschedule_head(&mut self, time: Cycles, what: E) {
        debug_assert!(
            self.entries.first().map(|e| e.what == what) == Some(true),
            "reschedule_head from a handler that is not at the head"
        );
        self.entries.remove(0);
        self.insert(time, what);
    }

    /// Index of the first entry matching `what`, if scheduled.
    pub fn find(&self, what: E) -> Option<usize> {
        self.entries.iter().position(|e| e.what == what)
    }

    /// Remove the entry at `index`, returning it.
    pub fn remove(&mut self, index: usize) -> Option<(Cycles, E)> {
        if index < self.entries.len() {
            let e = self.entries.remove(index);
            Some((e.time, e.what))
        } else {
            None
        }
    }
}
