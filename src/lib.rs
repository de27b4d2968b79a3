//! Thread-based futures and asynchronous use cases
//!
//! Picture yourself writing the business logic of an application: fetching
//! data from a server, reading a database, crunching numbers. All of this
//! takes time, and you would rather not block the thread which drives your
//! user interface while it happens. But you still need to know when the work
//! is done, to get its result or its error, and to update your application
//! state from the right thread when that happens.
//!
//! This crate provides the building blocks for this style of programming:
//!
//! - [`Future`] is a shared handle to an eventual value or error. Producers
//!   resolve it, consumers attach a continuation or derive new futures from
//!   it through combinators. Reactive futures can be resolved any number of
//!   times, turning them into streams of results. Results can also be
//!   held back until a deadline, see [`Future::with_delay`].
//! - [`Hub`] replays the resolutions of one future to many others, and
//!   [`Batch`] waits for many futures at once.
//! - [`Executor`] serializes units of work which may finish asynchronously,
//!   and tells whether some work is in progress.
//! - [`Interactor`] combines an executor and futures to express one
//!   asynchronous use case.
//!
//! Continuations run inline by default, or on an execution context such as
//! the process-wide [main queue](context::main_queue).

/// Emit a tracing event, if the `tracing` feature is enabled
#[cfg(feature = "tracing")]
macro_rules! event {
    ($level:ident, $($args:tt)*) => {
        tracing::event!(tracing::Level::$level, $($args)*)
    };
}
//
#[cfg(not(feature = "tracing"))]
macro_rules! event {
    ($($args:tt)*) => {};
}

pub mod batch;
pub mod context;
pub mod error;
pub mod executor;
pub mod future;
pub mod hub;
pub mod interactor;
pub mod status;

pub use crate::batch::Batch;
pub use crate::context::{main_queue, try_main_queue, ExecutionContext, Inline, SerialQueue};
pub use crate::error::{ExecutorError, FutureError};
pub use crate::executor::{EndGuard, Executor, ExecutorFactory};
pub use crate::future::{Future, Observer, WeakFuture};
pub use crate::hub::{Hub, Reference};
pub use crate::interactor::{Cycle, Interactor};
pub use crate::status::{FutureState, ResultSlot};


/// Outcome of a future
pub type FutureResult<T> = Result<T, FutureError>;


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    /// Route traces to the test harness, so that failing tests show them
    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::TRACE)
            .with_test_writer()
            .try_init();
    }

    /// A use case flowing through an executor, combinators and a hub
    #[test]
    fn end_to_end() {
        init_tracing();
        let interactor = Interactor::new(Executor::new("test.end_to_end").unwrap());
        let prices = interactor.perform_with_future(|future: Future<Vec<u32>>, _| {
            future.set_value(vec![3u32, 5, 8]);
        });
        let total = prices.map(|prices| prices.iter().sum::<u32>())
                          .filter(|total| {
                              if *total > 100 { Some(FutureError::NilValue) } else { None }
                          });

        let source = Future::<u32>::reactive();
        let hub = Hub::with_source(source.clone()).unwrap();
        let (sender, receiver) = mpsc::channel();
        let c_sender = sender.clone();
        hub.plug()
           .then(move |result: FutureResult<u32>| c_sender.send(result).unwrap())
           .unwrap();
        hub.plug()
           .map(|v| v * 10)
           .then(move |result| sender.send(result).unwrap())
           .unwrap();
        source.set_future(&total).unwrap();

        let received = (0..2).map(|_| receiver.recv_timeout(Duration::from_secs(1))
                                              .unwrap())
                             .collect::<Vec<_>>();
        assert_eq!(received, vec![Ok(16), Ok(160)]);
    }
}
