//! Polling-based future monitoring
//!
//! This module provides a way to monitor futures through polling. It gives
//! maximal performance in scenarios where a client does not need to
//! synchronize with a future, but only to periodically check the latest
//! result it received, as is the case for example when refreshing progress
//! bars and status displays from a reactive future.

use super::{Future, Observer};
use crate::error::FutureError;
use crate::status::ResultSlot;
use std::sync::{Arc, Mutex, PoisonError};
use triple_buffer::{Input, Output, TripleBuffer};


/// Pair of polling observer and client
pub struct Polling<T: Clone + Send> {
    /// Observer side, to be registered on one or more futures
    observer: Arc<PollingObserver<T>>,

    /// Client side, used to read the latest result
    client: PollingClient<T>,
}
//
impl<T: Clone + Send + 'static> Polling<T> {
    /// Create a new polling pair, initially reporting a pending result
    pub fn new() -> Self {
        // Setup triple buffer-based observer/client communication...
        let buffer = TripleBuffer::new(&ResultSlot::Pending);
        let (buf_input, buf_output) = buffer.split();

        // ...then build the observer and client
        Polling {
            observer: Arc::new(PollingObserver { buf_input: Mutex::new(buf_input) }),
            client: PollingClient { buf_output },
        }
    }

    /// Create a polling pair already observing a future
    pub fn watch(future: &Future<T>) -> Self {
        let polling = Self::new();
        future.add_observer(&polling.observer);
        polling
    }

    /// Split the pair into observer and client objects
    ///
    /// Futures only hold observers weakly, so the observer must be kept
    /// alive for as long as updates are wanted.
    ///
    pub fn split(self) -> (Arc<PollingObserver<T>>, PollingClient<T>) {
        (self.observer, self.client)
    }
}
//
impl<T: Clone + Send + 'static> Default for Polling<T> {
    fn default() -> Self {
        Self::new()
    }
}


/// Observer publishing every stored result into a triple buffer
pub struct PollingObserver<T: Clone + Send> {
    /// New results will be sent through this triple buffer
    buf_input: Mutex<Input<ResultSlot<T>>>,
}
//
impl<T: Clone + Send> PollingObserver<T> {
    fn publish(&self, slot: ResultSlot<T>) {
        self.buf_input.lock()
                      .unwrap_or_else(PoisonError::into_inner)
                      .write(slot);
    }
}
//
impl<T: Clone + Send> Observer<T> for PollingObserver<T> {
    fn did_set_value(&self, _future: &Future<T>, value: &T) {
        self.publish(ResultSlot::Value(value.clone()));
    }

    fn did_set_error(&self, _future: &Future<T>, error: &FutureError) {
        self.publish(ResultSlot::Error(error.clone()));
    }
}


/// Client interface, used to read the latest result
pub struct PollingClient<T: Clone + Send> {
    /// Latest result will be read through this triple buffer
    buf_output: Output<ResultSlot<T>>,
}
//
impl<T: Clone + Send> PollingClient<T> {
    /// Access the latest result published by the observed futures
    pub fn status(&mut self) -> &ResultSlot<T> {
        self.buf_output.read()
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;

    /// The client initially sees a pending result
    #[test]
    fn initial_state() {
        let future = Future::<u32>::new();
        let (_observer, mut client) = Polling::watch(&future).split();
        assert_eq!(*client.status(), ResultSlot::Pending);
    }

    /// Results propagate from the future to the client
    #[test]
    fn status_propagation() {
        let future = Future::<u32>::reactive();
        let (_observer, mut client) = Polling::watch(&future).split();
        future.set_value(1);
        future.set_value(2);
        assert_eq!(*client.status(), ResultSlot::Value(2));
        future.set_error(FutureError::Timeout);
        assert_eq!(*client.status(), ResultSlot::Error(FutureError::Timeout));
    }

    /// Dropping the observer stops the updates
    #[test]
    fn observer_lifetime() {
        let future = Future::<u32>::reactive();
        let (observer, mut client) = Polling::watch(&future).split();
        future.set_value(1);
        drop(observer);
        future.set_value(2);
        assert_eq!(*client.status(), ResultSlot::Value(1));
    }
}
