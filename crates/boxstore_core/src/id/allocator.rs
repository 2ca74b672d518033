//! Draw-and-check identifier allocator.
//!
//! # Invariants
//! - The oracle is called once per candidate, in draw order.
//! - With `max_attempts = None` the loop is unbounded. Over a 63-bit space
//!   this terminates in practice, but a pathological oracle that reports
//!   every candidate as taken never returns.

use super::generator::{IntegerIdGenerator, RandomIdGenerator};
use crate::model::ids::Identifier;
use log::{debug, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Retry policy for identifier allocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationPolicy {
    /// Maximum number of candidates to check. `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl AllocationPolicy {
    pub fn unbounded() -> Self {
        Self { max_attempts: None }
    }

    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts),
        }
    }
}

/// Allocation failure.
#[derive(Debug)]
pub enum AllocError<E> {
    /// Every candidate within the attempt budget was taken.
    Exhausted { attempts: u32 },
    /// The uniqueness oracle itself failed.
    Oracle(E),
}

impl<E: Display> Display for AllocError<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exhausted { attempts } => {
                write!(f, "no free identifier found after {attempts} attempts")
            }
            Self::Oracle(err) => write!(f, "uniqueness check failed: {err}"),
        }
    }
}

impl<E: Error + 'static> Error for AllocError<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Exhausted { .. } => None,
            Self::Oracle(err) => Some(err),
        }
    }
}

/// Produces identifiers that a uniqueness oracle reports as free.
#[derive(Debug, Clone)]
pub struct IdAllocator<G = RandomIdGenerator> {
    generator: G,
    policy: AllocationPolicy,
}

impl Default for IdAllocator<RandomIdGenerator> {
    fn default() -> Self {
        Self::new(RandomIdGenerator)
    }
}

impl<G: IntegerIdGenerator> IdAllocator<G> {
    pub fn new(generator: G) -> Self {
        Self::with_policy(generator, AllocationPolicy::default())
    }

    pub fn with_policy(generator: G, policy: AllocationPolicy) -> Self {
        Self { generator, policy }
    }

    pub fn policy(&self) -> AllocationPolicy {
        self.policy
    }

    /// Returns a typed identifier (`BoxId`, `ItemId`, ...) the oracle reports
    /// as free.
    pub fn next_id<T, E, F>(&self, is_taken: F) -> Result<T, AllocError<E>>
    where
        T: From<Identifier>,
        F: FnMut(Identifier) -> Result<bool, E>,
    {
        self.unused_identifier(is_taken).map(T::from)
    }

    /// Draws candidates until `is_taken` answers `false`.
    ///
    /// # Errors
    /// - `AllocError::Oracle` as soon as the oracle fails.
    /// - `AllocError::Exhausted` when a bounded policy runs out of attempts.
    pub fn unused_identifier<E, F>(&self, mut is_taken: F) -> Result<Identifier, AllocError<E>>
    where
        F: FnMut(Identifier) -> Result<bool, E>,
    {
        let mut attempts: u32 = 0;
        loop {
            if let Some(max_attempts) = self.policy.max_attempts {
                if attempts >= max_attempts {
                    warn!(
                        "event=id_allocation_exhausted module=id status=error attempts={}",
                        attempts
                    );
                    return Err(AllocError::Exhausted { attempts });
                }
            }

            let candidate = self.generator.integer_id();
            attempts = attempts.saturating_add(1);
            if !is_taken(candidate).map_err(AllocError::Oracle)? {
                return Ok(candidate);
            }

            debug!(
                "event=id_collision module=id status=retry candidate={} attempt={}",
                candidate, attempts
            );
        }
    }
}
