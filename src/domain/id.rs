//! Identifier newtypes for roadmaps, phases, and tasks
//!
//! Fragments join on string keys (`phase_id`, `task_id`). Wrapping each key
//! in its own type keeps a phase ID from being used where a task ID is
//! expected. Authored IDs are free-form but never empty.
//!
//! Generated roadmap IDs use the format `r-{7-char-hash}`, where the hash is
//! derived from title + creation timestamp.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum IdError {
    #[error("Invalid {kind}: identifier must not be empty")]
    Empty { kind: &'static str },

    #[error("Invalid {kind} '{value}': identifier must not contain control characters")]
    ControlCharacter { kind: &'static str, value: String },
}

/// Generates a 7-character hash from title and timestamp
fn generate_hash(title: &str, timestamp: DateTime<Utc>) -> String {
    let input = format!("{}{}", title, timestamp.timestamp_nanos_opt().unwrap_or(0));
    let hash = blake3::hash(input.as_bytes());
    let hex = hash.to_hex();
    hex[..7].to_string()
}

/// Checks the rules every identifier follows: non-blank, no control characters
pub fn check_identifier(kind: &'static str, value: &str) -> Result<(), IdError> {
    if value.trim().is_empty() {
        return Err(IdError::Empty { kind });
    }
    if value.chars().any(char::is_control) {
        return Err(IdError::ControlCharacter {
            kind,
            value: value.to_string(),
        });
    }
    Ok(())
}

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier, rejecting empty values
            pub fn new(value: impl Into<String>) -> Result<Self, IdError> {
                let value = value.into();
                check_identifier($kind, &value)?;
                Ok(Self(value))
            }

            /// Returns the identifier as a string slice
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identifies one roadmap across all of its fragments
    RoadmapId,
    "roadmap ID"
);

string_id!(
    /// Identifies a phase; unique within a roadmap
    PhaseId,
    "phase ID"
);

string_id!(
    /// Identifies a task; unique within its phase
    TaskId,
    "task ID"
);

impl RoadmapId {
    /// Generates a new roadmap ID (`r-{hash}`) from title and timestamp
    pub fn generate(title: &str, timestamp: DateTime<Utc>) -> Self {
        Self(format!("r-{}", generate_hash(title, timestamp)))
    }
}
