//! Async control-flow combinators on top of the flowgate executor
//!
//! Every combinator builds its own [`flowgate::Executor`], queues one unit per
//! input, runs the batch and post-processes the `(completed, pending)`
//! partition:
//!
//! | combinator | result |
//! |---|---|
//! | [`each`] / [`map`] | run a function per item, values in input order |
//! | [`filter`] / [`filter_false`] / [`dropwhile`] | items selected by an async predicate |
//! | [`some`] / [`every`] | short-circuiting tests |
//! | [`flat_map`] | [`map`] over the leaves of a nested input |
//! | [`race`] | first unit to succeed |
//! | [`gather`] / [`series`] / [`wait`] | outcomes of a set of units |
//! | [`reduce`] | sequential fold |
//! | [`repeat`] | call a function `times` times |
//! | [`whilst`] / [`until`] | call a function while or until an async test holds |
//! | [`interval`] | call a function periodically in the background |
//! | [`timeout`] | per-future deadline |
//!
//! Unless stated otherwise, an empty input is not an error, and a batch that
//! outlives [`FlowOptions::timeout`] fails with [`FlowError::Timeout`] after
//! aborting the units still running.

pub mod each;
pub mod error;
pub mod filter;
pub mod flat_map;
pub mod gather;
pub mod interval;
pub mod options;
pub mod race;
pub mod reduce;
pub mod repeat;
pub mod some;
pub mod timeout;
pub mod whilst;

pub use each::{each, map};
pub use error::{FlowError, FlowResult};
pub use filter::{dropwhile, filter, filter_false};
pub use flat_map::{flat_map, Nested};
pub use gather::{gather, series, wait};
pub use interval::interval;
pub use options::FlowOptions;
pub use race::race;
pub use reduce::reduce;
pub use repeat::repeat;
pub use some::{every, some};
pub use timeout::timeout;
pub use whilst::{until, whilst};
