//! Generation tokens for telling current results from stale ones
//!
//! Every `open` of a detail session and every query edit advances a counter.
//! Asynchronous work is tagged with the generation that started it, and the
//! owner merges a result only while that generation is still current.

use std::fmt;

/// Monotonically increasing session/query identifier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Counter owned by exactly one component
#[derive(Debug, Default)]
pub struct GenerationCounter {
    current: Generation,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new generation, invalidating every earlier one
    pub fn advance(&mut self) -> Generation {
        self.current = Generation(self.current.0 + 1);
        self.current
    }

    pub fn current(&self) -> Generation {
        self.current
    }

    pub fn is_current(&self, generation: Generation) -> bool {
        generation == self.current
    }
}

/// A payload stamped with the generation that produced it
#[derive(Debug)]
pub struct Tagged<T> {
    pub generation: Generation,
    pub payload: T,
}

impl<T> Tagged<T> {
    pub fn new(generation: Generation, payload: T) -> Self {
        Self {
            generation,
            payload,
        }
    }
}
