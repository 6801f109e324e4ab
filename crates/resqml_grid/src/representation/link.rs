//! Link counting between a supporting grid and its sub-representations.
use std::cell::Cell;
use std::rc::Rc;

/// Number of live links onto one facade. Cloning shares the count.
#[derive(Clone, Debug, Default)]
pub(crate) struct LinkCounter(Rc<Cell<usize>>);

impl LinkCounter {
    pub(crate) fn get(&self) -> usize {
        self.0.get()
    }

    fn increment(&self) -> usize {
        let n = self.0.get() + 1;
        self.0.set(n);
        n
    }

    fn decrement(&self) -> usize {
        let n = self.0.get().saturating_sub(1);
        self.0.set(n);
        n
    }
}

/// One sub-representation's claim on its supporting grid.
///
/// The count goes down exactly once: through [`SubRepLink::release`], or on drop when the
/// link was never released.
#[derive(Debug)]
pub struct SubRepLink {
    counter: LinkCounter,
    parent_uuid: String,
    released: bool,
}

impl SubRepLink {
    pub(crate) fn acquire(counter: &LinkCounter, parent_uuid: &str) -> Self {
        counter.increment();
        Self {
            counter: counter.clone(),
            parent_uuid: parent_uuid.to_owned(),
            released: false,
        }
    }

    pub fn parent_uuid(&self) -> &str {
        &self.parent_uuid
    }

    /// Count of the parent's links, this one included while held.
    pub fn linked_count(&self) -> usize {
        self.counter.get()
    }

    /// Releases the link and returns the parent's remaining count.
    pub fn release(mut self) -> usize {
        self.released = true;
        self.counter.decrement()
    }
}

impl Drop for SubRepLink {
    fn drop(&mut self) {
        if !self.released {
            self.counter.decrement();
        }
    }
}
