//! Tuple combinators
//!
//! Zipping waits for several futures and combines their values into a
//! tuple, failing as soon as any of them fails. For reactive inputs, the
//! zipped future fires again whenever one input delivers a new value, using
//! the latest value of the others. Unzipping splits a tuple future back into
//! one future per component, and collapsing merges the components into a
//! single value.

use super::Future;
use crate::error::FutureError;
use std::sync::{Arc, Mutex, PoisonError};


/// Latest values received from the two sides of a zip
struct Pair<T, U> {
    left: Option<T>,
    right: Option<U>,
}
//
impl<T: Clone, U: Clone> Pair<T, U> {
    /// The zipped value, once both sides have delivered
    fn both(&self) -> Option<(T, U)> {
        match (&self.left, &self.right) {
            (Some(left), Some(right)) => Some((left.clone(), right.clone())),
            _ => None,
        }
    }
}


impl<T: Clone + Send + 'static> Future<T> {
    /// Combine the values of two futures
    pub fn zip<U>(&self, other: &Future<U>) -> Future<(T, U)>
        where U: Clone + Send + 'static
    {
        let reactive = self.is_reactive() || other.is_reactive();
        let zipped = Future::with_reactivity(reactive);
        let pair = Arc::new(Mutex::new(Pair { left: None, right: None }));

        let (c_pair, c_zipped) = (pair.clone(), zipped.clone());
        let left = self.then(move |result| match result {
            Ok(value) => {
                let both = {
                    let mut pair = c_pair.lock().unwrap_or_else(PoisonError::into_inner);
                    pair.left = Some(value);
                    pair.both()
                };
                if let Some(both) = both {
                    c_zipped.set_value(both);
                }
            }
            Err(error) => c_zipped.set_error(error),
        });

        let c_zipped = zipped.clone();
        let right = other.then(move |result| match result {
            Ok(value) => {
                let both = {
                    let mut pair = pair.lock().unwrap_or_else(PoisonError::into_inner);
                    pair.right = Some(value);
                    pair.both()
                };
                if let Some(both) = both {
                    c_zipped.set_value(both);
                }
            }
            Err(error) => c_zipped.set_error(error),
        });

        if let Err(error) = left.and(right) {
            zipped.set_error(error);
        }
        zipped
    }

    /// Combine the values of three futures
    pub fn zip3<U, V>(&self, second: &Future<U>, third: &Future<V>)
        -> Future<(T, U, V)>
        where U: Clone + Send + 'static,
              V: Clone + Send + 'static
    {
        self.zip(second)
            .zip(third)
            .map(|((first, second), third)| (first, second, third))
    }
}


impl<A, B> Future<(A, B)>
    where A: Clone + Send + 'static,
          B: Clone + Send + 'static
{
    /// Split a future of pairs into a pair of futures
    pub fn unzip(&self) -> (Future<A>, Future<B>) {
        let reactive = self.is_reactive();
        let first = Future::with_reactivity(reactive);
        let second = Future::with_reactivity(reactive);
        let (c_first, c_second) = (first.clone(), second.clone());
        let split = move |result: Result<(A, B), FutureError>| match result {
            Ok((a, b)) => {
                c_first.set_value(a);
                c_second.set_value(b);
            }
            Err(error) => {
                c_first.set_error(error.clone());
                c_second.set_error(error);
            }
        };
        if let Err(error) = self.then(split) {
            first.set_error(error.clone());
            second.set_error(error);
        }
        (first, second)
    }

    /// Merge the components of a pair into a single value
    pub fn collapse<Z, F>(&self, mut merge: F) -> Future<Z>
        where Z: Clone + Send + 'static,
              F: FnMut(A, B) -> Z + Send + 'static
    {
        self.map(move |(a, b)| merge(a, b))
    }
}


impl<A, B, C> Future<(A, B, C)>
    where A: Clone + Send + 'static,
          B: Clone + Send + 'static,
          C: Clone + Send + 'static
{
    /// Merge the components of a triple into a single value
    pub fn collapse<Z, F>(&self, mut merge: F) -> Future<Z>
        where Z: Clone + Send + 'static,
              F: FnMut(A, B, C) -> Z + Send + 'static
    {
        self.map(move |(a, b, c)| merge(a, b, c))
    }
}


/// Combine the values of two futures
pub fn zip<T, U>(first: &Future<T>, second: &Future<U>) -> Future<(T, U)>
    where T: Clone + Send + 'static,
          U: Clone + Send + 'static
{
    first.zip(second)
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Zipped futures wait for both sides, in any order
    #[test]
    fn zip_waits_for_both() {
        let (left, right) = (Future::new(), Future::new());
        let zipped = left.zip(&right);
        right.set_value("b");
        assert_eq!(zipped.try_value(), Err(FutureError::NoValue));
        left.set_value(1);
        assert_eq!(zipped.value(), Ok((1, "b")));
    }

    /// Any failing side fails the zip
    #[test]
    fn zip_failure() {
        let zipped = zip(&Future::<u8>::from_error(FutureError::Timeout),
                         &Future::<u8>::new());
        assert_eq!(zipped.value(), Err(FutureError::Timeout));
    }

    /// Three-way zips flatten their tuple
    #[test]
    fn zip3() {
        let zipped = Future::from_value(1)
            .zip3(&Future::from_value('x'), &Future::from_value(2.5));
        assert_eq!(zipped.value(), Ok((1, 'x', 2.5)));
    }

    /// Reactive zips fire with the latest value of each side
    #[test]
    fn reactive_zip() {
        let (left, right) = (Future::reactive(), Future::reactive());
        let received = Arc::new(Mutex::new(Vec::new()));
        let c_received = received.clone();
        left.zip(&right)
            .then(move |result| c_received.lock().unwrap().push(result))
            .unwrap();
        left.set_value(1);
        right.set_value(10);
        left.set_value(2);
        assert_eq!(*received.lock().unwrap(), vec![Ok((1, 10)), Ok((2, 10))]);
    }

    /// Unzipping dispatches components and errors to both sides
    #[test]
    fn unzip() {
        let (a, b) = Future::from_value((3, "three")).unzip();
        assert_eq!(a.value(), Ok(3));
        assert_eq!(b.value(), Ok("three"));

        let (a, b) = Future::<(u8, u8)>::from_error(FutureError::NoValue).unzip();
        assert_eq!(a.value(), Err(FutureError::NoValue));
        assert_eq!(b.value(), Err(FutureError::NoValue));
    }

    /// Collapsing merges tuple components, zips fail on consumed inputs
    #[test]
    fn collapse() {
        let area = Future::from_value((3, 4)).collapse(|w, h| w * h);
        assert_eq!(area.value(), Ok(12));
        let label = Future::from_value(("x", 1, 'z'))
            .collapse(|a, b, c| format!("{}{}{}", a, b, c));
        assert_eq!(label.value(), Ok(String::from("x1z")));

        let consumed = Future::<u8>::new();
        let _first = consumed.map(|v| v);
        let zipped = consumed.zip(&Future::from_value(1u8));
        assert_eq!(zipped.value(), Err(FutureError::ContinuationAlreadySet));
    }
}
