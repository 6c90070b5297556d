//! Concurrency ceilings for an [`Executor`](crate::Executor).

use std::num::NonZero;

use serde::{Deserialize, Serialize};

/// Number of concurrently running units used when no explicit limit is given.
pub const DEFAULT_LIMIT: usize = 10;

/// Defines how many units of work may run at the same time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Limit {
    /// There is no limit, every queued unit is admitted immediately.
    None,

    /// There is an upper limit.
    Max(NonZero<usize>),

    /// Use [`DEFAULT_LIMIT`].
    #[default]
    Default,
}

impl Limit {
    /// A limit of one, which selects the sequential strategy.
    pub const SEQUENTIAL: Limit = Limit::Max(NonZero::<usize>::MIN);

    /// Returns the number of gate slots, or `None` when admission is unbounded.
    pub fn resolve(self) -> Option<usize> {
        match self {
            Limit::None => None,
            Limit::Max(max) => Some(max.get()),
            Limit::Default => Some(DEFAULT_LIMIT),
        }
    }

    /// Returns the limit as an integer where `0` means unbounded.
    pub fn as_usize(self) -> usize {
        self.resolve().unwrap_or(0)
    }

    /// Whether units must run strictly one after another.
    pub fn is_sequential(self) -> bool {
        self.resolve() == Some(1)
    }
}

impl From<usize> for Limit {
    fn from(value: usize) -> Self {
        NonZero::new(value).map(Limit::Max).unwrap_or(Limit::None)
    }
}
