//! Time-based combinators
//!
//! These combinators postpone the moment at which a derived future starts
//! following its source. Until the deadline, the derived future stays
//! pending even if the source is already resolved. From the deadline on,
//! results are forwarded from an execution context as they come.
//!
//! Waiting happens on a short-lived timer thread, never on an execution
//! context.

use super::Future;
use crate::context::ExecutionContext;
use crate::error::{ExecutorError, FutureError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};


/// Name given to timer threads
const TIMER_NAME: &str = "future.timer";


impl<T: Clone + Send + 'static> Future<T> {
    /// Follow self once some time has elapsed, starting from the given
    /// context
    pub fn with_delay(&self, delay: Duration, context: Arc<dyn ExecutionContext>)
        -> Future<T>
    {
        self.after(Instant::now() + delay, context)
    }

    /// Follow self once a deadline is reached, starting from the given
    /// context
    ///
    /// A deadline which already passed makes the derived future follow self
    /// right away, on the calling thread.
    ///
    pub fn after(&self, deadline: Instant, context: Arc<dyn ExecutionContext>)
        -> Future<T>
    {
        let delayed = Future::with_reactivity(self.is_reactive());
        if deadline <= Instant::now() {
            delayed.follow(self);
            return delayed;
        }

        let (source, target) = (self.clone(), delayed.clone());
        let timer = thread::Builder::new()
            .name(TIMER_NAME.to_owned())
            .spawn(move || {
                thread::sleep(deadline.saturating_duration_since(Instant::now()));
                event!(TRACE, context = context.name(), "deadline reached");
                context.dispatch(Box::new(move || target.follow(&source)));
            });
        if let Err(source) = timer {
            let error = ExecutorError::Spawn { name: TIMER_NAME.to_owned(), source };
            delayed.set_error(FutureError::custom(error));
        }
        delayed
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Inline, SerialQueue};
    use std::sync::mpsc;

    /// Delayed futures stay pending until the delay has elapsed
    #[test]
    fn with_delay() {
        let start = Instant::now();
        let delayed = Future::from_value(1)
            .with_delay(Duration::from_millis(50), Arc::new(Inline::new()));
        assert_eq!(delayed.try_value(), Err(FutureError::NoValue));
        assert_eq!(delayed.value_timeout(Duration::from_secs(1)), Ok(1));
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    /// Past deadlines are honored immediately
    #[test]
    fn past_deadline() {
        let delayed = Future::<u8>::from_error(FutureError::NilValue)
            .after(Instant::now(), Arc::new(Inline::new()));
        assert_eq!(delayed.try_value(), Err(FutureError::NilValue));
    }

    /// Results arriving after the deadline are forwarded from the context,
    /// and reactivity is kept
    #[test]
    fn later_results() {
        let queue = Arc::new(SerialQueue::new("test.delay").unwrap());
        let source = Future::<&'static str>::reactive();
        let delayed = source.after(Instant::now() + Duration::from_millis(100),
                                   queue.clone());
        assert!(delayed.is_reactive());

        let (sender, receiver) = mpsc::channel();
        let c_queue = queue.clone();
        delayed.then(move |result| {
            sender.send((result, c_queue.is_current())).unwrap();
        }).unwrap();
        source.set_value("early");
        let (result, on_queue) = receiver.recv_timeout(Duration::from_secs(1))
                                         .unwrap();
        assert_eq!(result, Ok("early"));
        assert!(on_queue);

        // From now on, the source feeds the delayed future directly
        source.set_value("late");
        let (result, _) = receiver.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(result, Ok("late"));
    }
}
