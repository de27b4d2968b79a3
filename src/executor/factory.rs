//! Scoped executor factory
//!
//! Some parts of an application want an executor of their own, others want
//! to share one with related code. An [`ExecutorFactory`] builds executors
//! on demand through a user-provided closure, and caches them by scope so
//! that every request for the same scope gets the same executor.

use super::Executor;
use crate::error::ExecutorError;
use std::any::{self, TypeId};
use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};


/// Closure building an executor from its name
type Builder = Box<dyn Fn(&str) -> Result<Executor, ExecutorError> + Send + Sync>;


/// Sharing scope of an executor
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Not shared: a new executor is built for every request
    None,

    /// Shared by every request using the same name
    Named(String),

    /// Shared by every request using the same index
    Index(i64),

    /// Shared by every request for the same type
    Type(TypeId),
}


/// Builds executors and caches them by scope
pub struct ExecutorFactory {
    builder: Builder,
    cache: Mutex<HashMap<Scope, Executor>>,
}
//
impl ExecutorFactory {
    /// Create a factory using a custom builder
    pub fn new<F>(builder: F) -> Self
        where F: Fn(&str) -> Result<Executor, ExecutorError> + Send + Sync + 'static
    {
        ExecutorFactory {
            builder: Box::new(builder),
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Create a factory building executors with their own serial queue
    pub fn serial() -> Self {
        Self::new(|name| Executor::new(name))
    }

    /// Process-wide factory of serial executors
    pub fn global() -> &'static ExecutorFactory {
        static GLOBAL: OnceLock<ExecutorFactory> = OnceLock::new();
        GLOBAL.get_or_init(Self::serial)
    }

    /// Get the executor of a scope, building it under the given name if
    /// the scope has none yet
    pub fn get(&self, scope: Scope, name: &str) -> Result<Executor, ExecutorError> {
        if scope == Scope::None {
            return (self.builder)(name);
        }
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(executor) = cache.get(&scope) {
            return Ok(executor.clone());
        }
        let executor = (self.builder)(name)?;
        event!(DEBUG, ?scope, executor = executor.name(), "scoped executor built");
        cache.insert(scope, executor.clone());
        Ok(executor)
    }

    /// Build an unshared executor
    pub fn get_default(&self) -> Result<Executor, ExecutorError> {
        self.get(Scope::None, "executor.default")
    }

    /// Get the executor shared under some name
    pub fn get_named(&self, name: &str) -> Result<Executor, ExecutorError> {
        self.get(Scope::Named(name.to_owned()), &format!("executor.{}", name))
    }

    /// Get the executor shared under some index
    pub fn get_index(&self, index: i64) -> Result<Executor, ExecutorError> {
        self.get(Scope::Index(index), &format!("executor.{}", index))
    }

    /// Get the executor shared by a type, named after it
    pub fn get_for<T: ?Sized + 'static>(&self) -> Result<Executor, ExecutorError> {
        self.get(Scope::Type(TypeId::of::<T>()), any::type_name::<T>())
    }
}


/// Unit tests
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_factory() -> (ExecutorFactory, Arc<AtomicUsize>) {
        let built = Arc::new(AtomicUsize::new(0));
        let c_built = built.clone();
        let factory = ExecutorFactory::new(move |_| {
            c_built.fetch_add(1, Ordering::SeqCst);
            Ok(Executor::direct())
        });
        (factory, built)
    }

    struct Checkout;
    struct Login;

    /// Scoped requests share an executor, unscoped ones do not
    #[test]
    fn scope_sharing() {
        let (factory, built) = counting_factory();
        assert!(factory.get_named("db").unwrap()
                       .ptr_eq(&factory.get_named("db").unwrap()));
        assert!(!factory.get_named("db").unwrap()
                        .ptr_eq(&factory.get_named("net").unwrap()));
        assert!(factory.get_index(3).unwrap()
                       .ptr_eq(&factory.get_index(3).unwrap()));
        assert!(factory.get_for::<Checkout>().unwrap()
                       .ptr_eq(&factory.get_for::<Checkout>().unwrap()));
        assert!(!factory.get_for::<Checkout>().unwrap()
                        .ptr_eq(&factory.get_for::<Login>().unwrap()));
        assert!(!factory.get_default().unwrap()
                        .ptr_eq(&factory.get_default().unwrap()));
        assert_eq!(built.load(Ordering::SeqCst), 7);
    }

    /// Executors are named after their scope
    #[test]
    fn scope_names() {
        let factory = ExecutorFactory::serial();
        assert_eq!(factory.get_named("io").unwrap().name(), "executor.io");
        assert_eq!(factory.get_index(7).unwrap().name(), "executor.7");
        assert!(factory.get_for::<Checkout>().unwrap().name().ends_with("Checkout"));
    }

    /// Build failures are reported and not cached
    #[test]
    fn build_failure() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let c_attempts = attempts.clone();
        let factory = ExecutorFactory::new(move |name| {
            c_attempts.fetch_add(1, Ordering::SeqCst);
            Err(ExecutorError::Spawn {
                name: name.to_owned(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "no threads"),
            })
        });
        assert!(factory.get_named("x").is_err());
        assert!(factory.get_named("x").is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
