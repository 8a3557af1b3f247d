//! Single-byte ownership handshake
//!
//! The byte at offset 4 of a region decides who may touch the payload:
//!
//! - `0` ([`Ownership::ProducerOwned`]): the producer may write, the consumer must not read.
//! - `128` ([`Ownership::ConsumerOwned`]): the consumer may read, the producer must not write.
//!
//! Any other value is a protocol violation. There is no locking state and no
//! acknowledgment: each side flips the byte after it is done with the payload.
//! Atomic ordering is used when the byte lives in our own address space, but
//! across a process boundary nothing guarantees the two sides see writes in
//! order, so a missed flip is treated as an ordinary skip.

use serde::{Deserialize, Serialize};

use crate::error::{MemFrameError, Result};

/// Which side currently holds the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Ownership {
    /// Producer may write the payload
    ProducerOwned = 0,
    /// Consumer may read the payload
    ConsumerOwned = 128,
}

impl Ownership {
    /// Decode an observed ownership byte
    pub fn from_byte(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::ProducerOwned),
            128 => Ok(Self::ConsumerOwned),
            other => Err(MemFrameError::invalid_ownership(other)),
        }
    }

    /// Encoded byte value
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    /// The state the holder hands over to when it is done
    pub fn handed_over(self) -> Self {
        match self {
            Self::ProducerOwned => Self::ConsumerOwned,
            Self::ConsumerOwned => Self::ProducerOwned,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ProducerOwned => "producer-owned",
            Self::ConsumerOwned => "consumer-owned",
        }
    }
}

impl Default for Ownership {
    fn default() -> Self {
        Self::ProducerOwned
    }
}

impl TryFrom<u8> for Ownership {
    type Error = MemFrameError;

    fn try_from(value: u8) -> Result<Self> {
        Self::from_byte(value)
    }
}

impl std::fmt::Display for Ownership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name(), self.as_byte())
    }
}
