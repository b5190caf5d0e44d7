//! Shareable session identifiers.
//!
//! Ids are six upper-case hexadecimal characters drawn from a random 24-bit
//! value, with `0` replaced by `G` so it cannot be mistaken for the letter O
//! when read aloud or copied by hand.

use std::fmt::Display;

use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize};

/// Exclusive upper bound of the random value behind an id.
const ID_SPACE: u32 = 0x100_0000;

/// Identifier of a game session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(String);

impl SessionId {
    /// Draw a random id that `taken` does not already report as used.
    pub fn generate<R, F>(rng: &mut R, taken: F) -> Self
    where
        R: Rng + ?Sized,
        F: Fn(&SessionId) -> bool,
    {
        loop {
            let candidate = Self::from_raw(rng.random_range(0..ID_SPACE));
            if !taken(&candidate) {
                return candidate;
            }
        }
    }

    /// Normalise user input (case-insensitive) into an id.
    pub fn parse(input: &str) -> Self {
        Self(input.trim().to_uppercase())
    }

    fn from_raw(value: u32) -> Self {
        Self(format!("{value:06X}").replace('0', "G"))
    }

    /// Borrow the textual form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for SessionId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionId {
    fn deserialize<D>(deserializer: D) -> Result<SessionId, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(SessionId::parse(&raw))
    }
}
