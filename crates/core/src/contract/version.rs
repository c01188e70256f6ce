//! Version identifier for a domain
//!
//! A domain is published as a sequence of versions. Each version is written
//! as `major.minor[.increment]-QUALIFIER[-build]`, for example:
//!
//! - `1.2-BETA`
//! - `1.2.1-GA`
//! - `1.2.1-GA-5`
//!
//! ## Ordering
//!
//! Versions are totally ordered. Components are compared left to right:
//! major, minor, increment, qualifier, build. An absent increment or build
//! sorts before any present value, and qualifiers sort by their declaration
//! order in [`Qualifier`].
//!
//! ## Parsing
//!
//! Numeric components must be written without sign or leading zeros, so
//! `1.02-GA` is rejected. The qualifier is matched case-insensitively
//! (`2.0-rc-3` parses) and is always formatted upper case, so that input is
//! the one non-canonical form accepted.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Release qualifier of a version
///
/// Declaration order is the sort order: a snapshot precedes every
/// pre-release, and GA is the final release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Qualifier {
    /// Unreleased development build
    Snapshot,
    /// Early pre-release
    Alpha,
    /// Feature-complete pre-release
    Beta,
    /// Release candidate
    Rc,
    /// General availability
    Ga,
}

impl Qualifier {
    /// All qualifiers in ordinal order
    pub const ALL: [Qualifier; 5] = [
        Qualifier::Snapshot,
        Qualifier::Alpha,
        Qualifier::Beta,
        Qualifier::Rc,
        Qualifier::Ga,
    ];

    /// Canonical upper-case spelling
    pub const fn as_str(&self) -> &'static str {
        match self {
            Qualifier::Snapshot => "SNAPSHOT",
            Qualifier::Alpha => "ALPHA",
            Qualifier::Beta => "BETA",
            Qualifier::Rc => "RC",
            Qualifier::Ga => "GA",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Qualifier {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Qualifier::ALL
            .iter()
            .copied()
            .find(|q| q.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| VersionParseError::UnknownQualifier(s.to_string()))
    }
}

/// Error when parsing a version string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    /// Input is empty
    #[error("version string is empty")]
    Empty,
    /// Input does not follow `major.minor[.increment]-QUALIFIER[-build]`
    #[error("malformed version '{0}': expected major.minor[.increment]-QUALIFIER[-build]")]
    Malformed(String),
    /// A numeric component is not an unsigned integer
    #[error("invalid {component} '{value}' in version")]
    InvalidNumber {
        /// Which component failed (major, minor, increment, build)
        component: &'static str,
        /// The offending text
        value: String,
    },
    /// Qualifier is not one of the known qualifiers
    #[error("unknown version qualifier '{0}'")]
    UnknownQualifier(String),
}

/// Comparable version of a domain
///
/// Immutable once constructed. Equality and hashing are structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VersionId {
    major: u32,
    minor: u32,
    increment: Option<u32>,
    qualifier: Qualifier,
    build: Option<u32>,
}

impl VersionId {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Create a `major.minor-QUALIFIER` version
    pub const fn new(major: u32, minor: u32, qualifier: Qualifier) -> Self {
        VersionId {
            major,
            minor,
            increment: None,
            qualifier,
            build: None,
        }
    }

    /// Return a copy with the given increment component
    pub const fn with_increment(mut self, increment: u32) -> Self {
        self.increment = Some(increment);
        self
    }

    /// Return a copy with the given build number
    pub const fn with_build(mut self, build: u32) -> Self {
        self.build = Some(build);
        self
    }

    /// Parse the canonical string form
    pub fn parse(s: &str) -> Result<Self, VersionParseError> {
        s.parse()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Major component
    #[inline]
    pub const fn major(&self) -> u32 {
        self.major
    }

    /// Minor component
    #[inline]
    pub const fn minor(&self) -> u32 {
        self.minor
    }

    /// Optional increment (patch) component
    #[inline]
    pub const fn increment(&self) -> Option<u32> {
        self.increment
    }

    /// Release qualifier
    #[inline]
    pub const fn qualifier(&self) -> Qualifier {
        self.qualifier
    }

    /// Optional build number
    #[inline]
    pub const fn build(&self) -> Option<u32> {
        self.build
    }
}

impl Default for VersionId {
    /// `0.1-SNAPSHOT`
    fn default() -> Self {
        VersionId::new(0, 1, Qualifier::Snapshot)
    }
}

impl PartialOrd for VersionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for VersionId {
    /// `Option<u32>` already orders `None` before any `Some`, which is
    /// exactly the absent-before-present rule for increment and build.
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then_with(|| self.minor.cmp(&other.minor))
            .then_with(|| self.increment.cmp(&other.increment))
            .then_with(|| self.qualifier.cmp(&other.qualifier))
            .then_with(|| self.build.cmp(&other.build))
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)?;
        if let Some(increment) = self.increment {
            write!(f, ".{}", increment)?;
        }
        write!(f, "-{}", self.qualifier)?;
        if let Some(build) = self.build {
            write!(f, "-{}", build)?;
        }
        Ok(())
    }
}

fn parse_component(component: &'static str, value: &str) -> Result<u32, VersionParseError> {
    // u32::from_str accepts a leading '+' and leading zeros, neither of which
    // the canonical form emits
    if value.is_empty()
        || !value.bytes().all(|b| b.is_ascii_digit())
        || (value.len() > 1 && value.starts_with('0'))
    {
        return Err(VersionParseError::InvalidNumber {
            component,
            value: value.to_string(),
        });
    }
    value.parse().map_err(|_| VersionParseError::InvalidNumber {
        component,
        value: value.to_string(),
    })
}

impl FromStr for VersionId {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let mut dash_parts = s.split('-');
        let numbers = dash_parts.next().unwrap_or_default();
        let qualifier = dash_parts
            .next()
            .ok_or_else(|| VersionParseError::Malformed(s.to_string()))?;
        let build = dash_parts.next();
        if dash_parts.next().is_some() {
            return Err(VersionParseError::Malformed(s.to_string()));
        }

        let dotted: Vec<&str> = numbers.split('.').collect();
        let (major, minor, increment) = match dotted.as_slice() {
            [major, minor] => (
                parse_component("major", major)?,
                parse_component("minor", minor)?,
                None,
            ),
            [major, minor, increment] => (
                parse_component("major", major)?,
                parse_component("minor", minor)?,
                Some(parse_component("increment", increment)?),
            ),
            _ => return Err(VersionParseError::Malformed(s.to_string())),
        };

        Ok(VersionId {
            major,
            minor,
            increment,
            qualifier: qualifier.parse()?,
            build: build.map(|b| parse_component("build", b)).transpose()?,
        })
    }
}

impl TryFrom<String> for VersionId {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<VersionId> for String {
    fn from(version: VersionId) -> Self {
        version.to_string()
    }
}
