//! Observation of future resolutions
//!
//! Observers are a secondary, best-effort channel for instrumentation: they
//! are told about every result stored into a future and about every result
//! sent to its continuation, whether or not a continuation is attached.
//! Futures only hold observers weakly, so an observer lives exactly as long
//! as its owner keeps it around.
//!
//! Every notification has an empty default implementation, so that an
//! observer only needs to implement the ones it cares about.

use super::Future;
use crate::error::FutureError;


/// Listener of a future's resolutions
#[allow(unused_variables)]
pub trait Observer<T>: Send + Sync {
    /// A value was stored into the future
    fn did_set_value(&self, future: &Future<T>, value: &T) {}

    /// An error was stored into the future
    fn did_set_error(&self, future: &Future<T>, error: &FutureError) {}

    /// A value was sent to the continuation of the future
    fn did_send_value(&self, future: &Future<T>, value: &T) {}

    /// An error was sent to the continuation of the future
    fn did_send_error(&self, future: &Future<T>, error: &FutureError) {}
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Records the name of every notification it receives
    #[derive(Default)]
    struct Journal {
        entries: Mutex<Vec<String>>,
    }
    //
    impl Observer<u32> for Journal {
        fn did_set_value(&self, _: &Future<u32>, value: &u32) {
            self.entries.lock().unwrap().push(format!("set {}", value));
        }

        fn did_set_error(&self, _: &Future<u32>, error: &FutureError) {
            self.entries.lock().unwrap().push(format!("set error {}", error));
        }

        fn did_send_value(&self, _: &Future<u32>, value: &u32) {
            self.entries.lock().unwrap().push(format!("send {}", value));
        }
    }

    /// Only cares about errors
    struct ErrorCounter(Mutex<usize>);
    //
    impl Observer<u32> for ErrorCounter {
        fn did_set_error(&self, _: &Future<u32>, _: &FutureError) {
            *self.0.lock().unwrap() += 1;
        }
    }

    /// Observers hear about results with and without a continuation
    #[test]
    fn notified_of_set_and_send() {
        let journal = Arc::new(Journal::default());
        let future = Future::<u32>::reactive();
        future.add_observer(&journal);

        future.set_value(1);
        future.then(|_| {}).unwrap();
        future.set_value(2);
        future.set_error(FutureError::NoValue);

        assert_eq!(*journal.entries.lock().unwrap(),
                   vec!["set 1", "send 1", "set 2", "send 2",
                        "set error no value available"]);
    }

    /// Unimplemented notifications are simply skipped
    #[test]
    fn optional_notifications() {
        let counter = Arc::new(ErrorCounter(Mutex::new(0)));
        let future = Future::<u32>::reactive();
        future.add_observer(&counter);
        future.set_value(1);
        future.set_error(FutureError::Timeout);
        future.set_error(FutureError::Timeout);
        assert_eq!(*counter.0.lock().unwrap(), 2);
    }

    /// Observers are held weakly and can be removed
    #[test]
    fn weak_and_removable() {
        let journal = Arc::new(Journal::default());
        let future = Future::<u32>::reactive();
        future.add_observer(&journal);
        future.set_value(1);
        future.remove_observer(&journal);
        future.set_value(2);
        assert_eq!(*journal.entries.lock().unwrap(), vec!["set 1"]);

        let dropped = Arc::new(Journal::default());
        future.add_observer(&dropped);
        drop(dropped);
        future.set_value(3);
    }
}
