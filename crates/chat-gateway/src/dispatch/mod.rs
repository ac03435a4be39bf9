//! Event dispatch
//!
//! Handlers, predicates and awaits.

mod awaits;
mod dispatcher;
mod predicate;

pub use awaits::{AwaitCallback, AwaitOutcome, AwaitRegistry};
pub use dispatcher::{Dispatcher, DispatcherConfig, HandlerFuture, Registration};
pub use predicate::{Matcher, Predicate};
