//! Candidate identifier sources.

use crate::model::ids::Identifier;

/// Source of candidate identifiers for `IdAllocator`.
///
/// Implementations only produce candidates; they do not need to know which
/// values are taken.
pub trait IntegerIdGenerator {
    fn integer_id(&self) -> Identifier;
}

/// Draws candidates uniformly from `[0, 2^63 - 1]`.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IntegerIdGenerator for RandomIdGenerator {
    fn integer_id(&self) -> Identifier {
        Identifier::from_bits_masked(rand::random::<u64>())
    }
}

impl<G: IntegerIdGenerator + ?Sized> IntegerIdGenerator for &G {
    fn integer_id(&self) -> Identifier {
        (**self).integer_id()
    }
}
