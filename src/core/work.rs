//! Work items submitted to the limiter.

use std::fmt;

/// A unit of work tagged with a token cost.
///
/// The closure performs the caller's action and returns whether the cost
/// should actually be charged against the bucket. Returning `false` means
/// the action turned out to be a no-op and stays free.
///
/// A `WorkItem` is owned by exactly one container at a time: the caller's
/// stack, the worker channel, the deferred queue, then the executing worker.
pub struct WorkItem {
    /// Tokens this item charges when its work reports success.
    pub cost: u64,
    work: Box<dyn FnOnce() -> bool + Send + 'static>,
}

impl WorkItem {
    /// Create a work item from a cost and a closure.
    pub fn new<F>(cost: u64, work: F) -> Self
    where
        F: FnOnce() -> bool + Send + 'static,
    {
        Self {
            cost,
            work: Box::new(work),
        }
    }

    /// Run the work, consuming the item.
    ///
    /// Returns `true` when the cost should be charged.
    pub fn run(self) -> bool {
        (self.work)()
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}
