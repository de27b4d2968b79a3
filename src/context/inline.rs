//! Inline execution context, implementing synchronous continuation execution
//!
//! This context follows the traditional pattern of directly executing
//! continuations on the thread which resolves the future. It can harm
//! producer performance, but it is a good choice for short continuations
//! and it is what futures use when no return context was configured.

use super::{ExecutionContext, Job};


/// ExecutionContext implementation suitable for inline execution
#[derive(Clone, Copy, Debug, Default)]
pub struct Inline;
//
impl Inline {
    /// Create a new inline execution context
    pub fn new() -> Self {
        Inline
    }
}
//
impl ExecutionContext for Inline {
    fn name(&self) -> &str {
        "inline"
    }

    fn dispatch(&self, job: Job) {
        job();
    }

    /// Inline jobs always run on whichever thread dispatched them
    fn is_current(&self) -> bool {
        true
    }
}
