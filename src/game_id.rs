//! Session code generation and parsing
//!
//! Session codes are the short, human-shareable identifiers participants
//! type to join a live game. They are four characters drawn from upper-case
//! letters and digits, and parsing is case-insensitive so codes read aloud
//! or typed on a phone keyboard still match.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::constants::session_code::{ALPHABET, LENGTH};

/// A short identifier for one live session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionCode([u8; LENGTH]);

/// Errors produced when parsing a session code
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The code has the wrong number of characters
    #[error("session code must be {LENGTH} characters long")]
    Length,
    /// The code contains a character outside the code alphabet
    #[error("session code contains an invalid character")]
    Character,
}

impl SessionCode {
    /// Draws a new random session code
    pub fn new() -> Self {
        let mut code = [0; LENGTH];
        for byte in &mut code {
            *byte = ALPHABET[fastrand::usize(..ALPHABET.len())];
        }
        Self(code)
    }

    /// Returns the code as text
    pub fn as_str(&self) -> &str {
        // Every byte is drawn from or checked against the ASCII alphabet.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl Default for SessionCode {
    /// Draws a new random session code (same as `new()`)
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionCode {
    type Err = ParseError;

    /// Parses a session code, ignoring letter case
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Length` if the code is not exactly `LENGTH`
    /// characters, or `ParseError::Character` if it contains anything
    /// outside the code alphabet.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != LENGTH {
            return Err(ParseError::Length);
        }

        let mut code = [0; LENGTH];
        for (slot, byte) in code.iter_mut().zip(bytes) {
            let byte = byte.to_ascii_uppercase();
            if !ALPHABET.contains(&byte) {
                return Err(ParseError::Character);
            }
            *slot = byte;
        }
        Ok(Self(code))
    }
}

impl Serialize for SessionCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SessionCode {
    fn deserialize<D>(deserializer: D) -> Result<SessionCode, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SessionCode::from_str(&s).map_err(serde::de::Error::custom)
    }
}
