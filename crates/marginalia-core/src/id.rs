//! Identifiers for tracked changes.
//!
//! Change ids follow the ObjectId layout: an 18 hex char seed followed by a
//! 6 hex char increment. All changes created by one tracked update share the
//! update's seed, which lets the client predict the ids it will get back.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use ulid::Ulid;

/// Unique identifier of a tracked change.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeId(String);

impl ChangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChangeId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ChangeId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

const SEED_LEN: usize = 18;

/// Prefix shared by a group of change ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IdSeed(String);

impl IdSeed {
    /// Fresh seed: the ULID timestamp followed by some of its randomness.
    pub fn generate() -> Self {
        let hex = format!("{:032x}", Ulid::new().0);
        Self(hex[..SEED_LEN].to_string())
    }

    /// Seed derived from arbitrary bytes. Equal input gives an equal seed.
    pub fn derive(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Self(hex[..SEED_LEN].to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for IdSeed {
    fn from(seed: &str) -> Self {
        Self(seed.to_string())
    }
}

/// Hands out ids from a seed and an increment.
#[derive(Clone, Debug)]
pub struct IdGenerator {
    seed: IdSeed,
    increment: u32,
}

impl IdGenerator {
    pub fn new(seed: IdSeed) -> Self {
        Self { seed, increment: 0 }
    }

    pub fn seed(&self) -> &IdSeed {
        &self.seed
    }

    /// Switch to a new seed and restart the increment.
    pub fn reseed(&mut self, seed: IdSeed) {
        self.seed = seed;
        self.increment = 0;
    }

    pub fn next_id(&mut self) -> ChangeId {
        self.increment += 1;
        ChangeId(format!("{}{:06x}", self.seed.0, self.increment))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(IdSeed::generate())
    }
}
