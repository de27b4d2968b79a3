//! Multicast of future resolutions
//!
//! A future has a single continuation slot, so it can only feed one
//! consumer. A [`Hub`] takes over that slot and replays every resolution of
//! its source future to a dynamic set of plugged futures, each of which can
//! then feed its own consumer. This is typically used with reactive futures,
//! to maintain several live pipelines from a single stream of results.
//!
//! Plugged futures are held either strongly, in which case the hub keeps
//! them alive, or weakly, in which case they are forgotten as soon as
//! nobody else holds them.

use crate::error::FutureError;
use crate::future::{Future, WeakFuture};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};


/// How a hub holds on to a plugged future
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reference {
    /// The hub keeps the future alive
    Strong,

    /// The hub forgets the future once nobody else holds it
    Weak,
}


/// Entry of the plugged future set
enum Plug<T> {
    Strong(Future<T>),
    Weak(WeakFuture<T>),
}
//
impl<T> Plug<T> {
    /// Access the plugged future, if it is still alive
    fn get(&self) -> Option<Future<T>> {
        match self {
            Plug::Strong(future) => Some(future.clone()),
            Plug::Weak(future) => future.upgrade(),
        }
    }

    /// Truth that this entry refers to the given future
    fn refers_to(&self, target: &Future<T>) -> bool {
        match self {
            Plug::Strong(future) => future.ptr_eq(target),
            Plug::Weak(future) => future.refers_to(target),
        }
    }
}


/// Replays the resolutions of a source future to plugged futures
pub struct Hub<T> {
    inner: Arc<HubInner<T>>,
}
//
impl<T> Clone for Hub<T> {
    fn clone(&self) -> Self {
        Hub { inner: self.inner.clone() }
    }
}


struct HubInner<T> {
    state: Mutex<HubState<T>>,
}
//
struct HubState<T> {
    /// Source future, when owned by the hub
    source: Option<Future<T>>,

    /// Reactivity given to plugged futures, copied from the source
    reactive: bool,

    /// Plugged futures, in plug order
    plugged: Vec<Plug<T>>,
}


impl<T: Clone + Send + 'static> Hub<T> {
    /// Create a hub without a source
    ///
    /// Until a source is set, plugged futures are reactive.
    ///
    pub fn new() -> Self {
        Hub {
            inner: Arc::new(HubInner {
                state: Mutex::new(HubState {
                    source: None,
                    reactive: true,
                    plugged: Vec::new(),
                }),
            }),
        }
    }

    /// Create a hub replaying the given source future
    ///
    /// The hub owns its source and takes over its continuation.
    ///
    /// # Errors
    ///
    /// Same as [`Future::then`] on the source.
    ///
    pub fn with_source(source: Future<T>) -> Result<Self, FutureError> {
        let hub = Self::new();
        hub.set_source(source)?;
        Ok(hub)
    }

    /// Replace the source future
    ///
    /// Plugged futures copy the reactivity of the new source, and the hub
    /// takes over its continuation.
    ///
    /// # Errors
    ///
    /// Same as [`Future::then`] on the source, which is then not kept.
    ///
    pub fn set_source(&self, source: Future<T>) -> Result<(), FutureError> {
        self.attach(&source)?;
        self.lock().source = Some(source);
        Ok(())
    }

    /// Access the source future, when owned by the hub
    pub fn source(&self) -> Option<Future<T>> {
        self.lock().source.clone()
    }

    /// Start replaying the resolutions of a source future
    ///
    /// The source only holds the hub weakly, so that a future can own its
    /// own hub without creating a reference cycle.
    ///
    pub(crate) fn attach(&self, source: &Future<T>) -> Result<(), FutureError> {
        let reactive = source.is_reactive();
        {
            let mut state = self.lock();
            state.reactive = reactive;
            for future in state.plugged.iter().filter_map(Plug::get) {
                future.set_reactive(reactive);
            }
        }

        let hub = Arc::downgrade(&self.inner);
        source.then(move |result| {
            if let Some(inner) = Weak::upgrade(&hub) {
                Hub { inner }.forward(result);
            }
        })
    }

    /// Create a future and plug it strongly into the hub
    ///
    /// The hub keeps the future alive, so that a pipeline built on it keeps
    /// running without any other owner. This differs from plugging weakly,
    /// where the future is forgotten as soon as nobody else holds it; use
    /// [`Hub::plug_as`] with [`Reference::Weak`] for that.
    ///
    pub fn plug(&self) -> Future<T> {
        self.plug_as(Reference::Strong)
    }

    /// Create a future and plug it into the hub
    pub fn plug_as(&self, reference: Reference) -> Future<T> {
        let future = Future::with_reactivity(self.lock().reactive);
        self.plug_future(&future, reference);
        future
    }

    /// Plug an existing future into the hub
    pub fn plug_future(&self, future: &Future<T>, reference: Reference) {
        let mut state = self.lock();
        future.set_reactive(state.reactive);
        state.plugged.push(match reference {
            Reference::Strong => Plug::Strong(future.clone()),
            Reference::Weak => Plug::Weak(future.downgrade()),
        });
        event!(TRACE, plugged = state.plugged.len(), "future plugged into hub");
    }

    /// Unplug a future, returning whether it was plugged
    ///
    /// The source is not affected.
    ///
    pub fn unplug(&self, future: &Future<T>) -> bool {
        let mut state = self.lock();
        let before = state.plugged.len();
        state.plugged.retain(|plug| !plug.refers_to(future));
        before != state.plugged.len()
    }

    /// Unplug every future
    pub fn unplug_all(&self) {
        self.lock().plugged.clear();
    }

    /// Number of plugged futures which are still alive
    pub fn len(&self) -> usize {
        let mut state = self.lock();
        prune(&mut state.plugged);
        state.plugged.len()
    }

    /// Truth that no live future is plugged
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replay a resolution of the source to every plugged future
    fn forward(&self, result: Result<T, FutureError>) {
        // Plugged futures are resolved outside of the lock, so that their
        // continuations may plug or unplug futures
        let targets = {
            let mut state = self.lock();
            prune(&mut state.plugged);
            state.plugged.iter().filter_map(Plug::get).collect::<Vec<_>>()
        };
        event!(TRACE, targets = targets.len(), "hub forwarding a resolution");
        for target in targets {
            target.set(result.clone());
        }
    }

    fn lock(&self) -> MutexGuard<'_, HubState<T>> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
//
impl<T: Clone + Send + 'static> Default for Hub<T> {
    fn default() -> Self {
        Self::new()
    }
}


/// Forget the weakly plugged futures which nobody holds anymore
fn prune<T>(plugged: &mut Vec<Plug<T>>) {
    plugged.retain(|plug| match plug {
        Plug::Strong(_) => true,
        Plug::Weak(future) => future.upgrade().is_some(),
    });
}
