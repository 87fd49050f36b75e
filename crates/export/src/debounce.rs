//! Debounce helper
//!
//! Each `Debounced` owns its pending-call counter. A call waits for the delay
//! and only runs the wrapped function if no newer call arrived in the
//! meantime; superseded calls resolve to `None` and their arguments are
//! dropped.

use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use crate::host::Sleeper;

pub struct Debounced<F> {
    func: F,
    delay: Duration,
    sleeper: Rc<dyn Sleeper>,
    latest: Cell<u64>,
}

impl<F> Debounced<F> {
    pub fn new(func: F, delay: Duration, sleeper: Rc<dyn Sleeper>) -> Self {
        Self {
            func,
            delay,
            sleeper,
            latest: Cell::new(0),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule a call; `Some` holds the output if this call was the one that ran
    pub async fn call<A, Fut>(&self, args: A) -> Option<Fut::Output>
    where
        F: Fn(A) -> Fut,
        Fut: Future,
    {
        let ticket = self.latest.get().wrapping_add(1);
        self.latest.set(ticket);

        self.sleeper.sleep(self.delay).await;

        if self.latest.get() != ticket {
            log::trace!("Debounced call {ticket} superseded");
            return None;
        }
        Some((self.func)(args).await)
    }
}
