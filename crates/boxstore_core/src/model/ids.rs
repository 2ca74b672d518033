//! Integer identifiers for boxes and items.
//!
//! # Invariants
//! - Every `Identifier` is in `[0, i64::MAX]`.
//! - `BoxId` and `ItemId` are separate namespaces and not interchangeable.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Upper bound (inclusive) of the identifier space: `2^63 - 1`.
pub const MAX_IDENTIFIER: i64 = i64::MAX;

/// Raised when a raw integer cannot be used as an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    Negative(i64),
    NotAnInteger(String),
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Negative(value) => write!(f, "identifier must be non-negative, got {value}"),
            Self::NotAnInteger(raw) => write!(f, "identifier must be an integer, got `{raw}`"),
        }
    }
}

impl Error for IdError {}

/// Non-negative 63-bit integer identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Identifier(i64);

impl Identifier {
    pub fn new(value: i64) -> Result<Self, IdError> {
        if value < 0 {
            return Err(IdError::Negative(value));
        }
        Ok(Self(value))
    }

    /// Keeps the low 63 bits of `bits`, mapping any `u64` onto the valid range.
    pub fn from_bits_masked(bits: u64) -> Self {
        Self((bits & MAX_IDENTIFIER as u64) as i64)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for Identifier {
    type Error = IdError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identifier> for i64 {
    fn from(value: Identifier) -> Self {
        value.0
    }
}

impl FromStr for Identifier {
    type Err = IdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw
            .trim()
            .parse::<i64>()
            .map_err(|_| IdError::NotAnInteger(raw.to_string()))?;
        Self::new(value)
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! identifier_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Identifier);

        impl $name {
            pub fn new(value: i64) -> Result<Self, IdError> {
                Identifier::new(value).map(Self)
            }

            pub fn identifier(self) -> Identifier {
                self.0
            }

            pub fn get(self) -> i64 {
                self.0.get()
            }
        }

        impl From<Identifier> for $name {
            fn from(value: Identifier) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.parse().map(Self)
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier_newtype!(
    /// Identifier of a box aggregate.
    BoxId
);
identifier_newtype!(
    /// Identifier of an item. Unique across all boxes.
    ItemId
);
