use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::authz::errors::AuthzError;

/// Hierarchical access level.
///
/// Inclusion is declared per level in [`AccessLevel::included`] rather than derived
/// from declaration order, so a level can be added between existing ones without
/// changing how the others compare. For the same reason the type does not
/// implement `PartialOrd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    None,
    Read,
    Write,
    Security,
}

impl AccessLevel {
    pub const ALL: [AccessLevel; 4] = [
        AccessLevel::None,
        AccessLevel::Read,
        AccessLevel::Write,
        AccessLevel::Security,
    ];

    /// Levels granted by holding `self`, including `self`.
    pub fn included(self) -> &'static [AccessLevel] {
        use AccessLevel::*;
        match self {
            None => &[None],
            Read => &[None, Read],
            Write => &[None, Read, Write],
            Security => &[None, Read, Write, Security],
        }
    }

    pub fn includes(self, requested: AccessLevel) -> bool {
        self.included().contains(&requested)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessLevel::None => "NONE",
            AccessLevel::Read => "READ",
            AccessLevel::Write => "WRITE",
            AccessLevel::Security => "SECURITY",
        }
    }

    /// Exact-match parse of the canonical name, as stored in the database.
    pub fn from_stored(s: &str) -> Result<Self, AuthzError> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| AuthzError::InvalidAccessLevel(s.to_string()))
    }

    /// The level among `levels` that includes every other one.
    ///
    /// Returns `None` for an empty input. With the current table every pair is
    /// comparable, so a result always exists for non-empty input.
    pub fn highest<I>(levels: I) -> Option<AccessLevel>
    where
        I: IntoIterator<Item = AccessLevel>,
    {
        levels.into_iter().fold(None, |acc, level| match acc {
            Some(current) if current.includes(level) => Some(current),
            _ => Some(level),
        })
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessLevel {
    type Err = AuthzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(AccessLevel::None),
            "READ" => Ok(AccessLevel::Read),
            "WRITE" => Ok(AccessLevel::Write),
            "SECURITY" => Ok(AccessLevel::Security),
            _ => Err(AuthzError::InvalidAccessLevel(s.to_string())),
        }
    }
}
