//! Property paths for correlating failures and conversion results.
//!
//! This module provides [`PropertyPath`] and [`PathSegment`] types for building,
//! parsing and comparing the dot/bracket paths (`Address.City`, `Emails[0]`)
//! that key both the error tree and the result registry.

use std::fmt::{self, Display};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::PathError;

static SEGMENT_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("segment pattern is valid"));

/// A segment of a property path.
///
/// Paths are built from segments that represent either member access or element indexing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A member access (e.g., `Address`, `City`)
    Field(String),
    /// An element index (e.g., `[0]`, `[42]`)
    Index(usize),
}

impl PathSegment {
    /// Creates a new field segment.
    pub fn field(name: impl Into<String>) -> Self {
        PathSegment::Field(name.into())
    }

    /// Creates a new index segment.
    pub fn index(idx: usize) -> Self {
        PathSegment::Index(idx)
    }

    /// Returns true for index segments.
    pub fn is_index(&self) -> bool {
        matches!(self, PathSegment::Index(_))
    }
}

/// A canonical path identifying a field or element of a validated value.
///
/// The empty path denotes the validated value itself.
///
/// # Example
///
/// ```rust
/// use coroner::PropertyPath;
///
/// let path = PropertyPath::root()
///     .push_field("Emails")
///     .push_index(0)
///     .push_field("Domain");
///
/// assert_eq!(path.to_string(), "Emails[0].Domain");
/// assert_eq!(path.without_indices().to_string(), "Emails.Domain");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct PropertyPath {
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    /// Creates an empty path representing the root value.
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a path from a single field segment.
    pub fn from_field(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Field(name.into())],
        }
    }

    /// Creates a path from pre-built segments.
    pub fn from_segments(segments: Vec<PathSegment>) -> Self {
        Self { segments }
    }

    /// Returns a new path with a field segment appended.
    pub fn push_field(&self, name: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Field(name.into()));
        Self { segments }
    }

    /// Returns a new path with an index segment appended.
    pub fn push_index(&self, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(PathSegment::Index(index));
        Self { segments }
    }

    /// Returns true if this is the root path (no segments).
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns the number of segments in this path.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns true if this path has no segments.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns an iterator over the path segments.
    pub fn segments(&self) -> impl Iterator<Item = &PathSegment> {
        self.segments.iter()
    }

    /// Returns the parent path (all segments except the last), or None if this is root.
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            None
        } else {
            Some(Self {
                segments: self.segments[..self.segments.len() - 1].to_vec(),
            })
        }
    }

    /// Returns the last segment, or None if this is root.
    pub fn last(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    /// Returns the leading member name: the text before the first `.` or `[`.
    ///
    /// Returns `None` for the root path and for paths that start with an index.
    pub fn root_field(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// Returns the path relative to its leading member.
    ///
    /// `Address.City` becomes `City`, `Emails[0]` becomes `[0]`. Paths without a
    /// leading member are returned unchanged.
    pub fn strip_root(&self) -> Self {
        match self.segments.first() {
            Some(PathSegment::Field(_)) => Self {
                segments: self.segments[1..].to_vec(),
            },
            _ => self.clone(),
        }
    }

    /// Returns a copy of this path with every index segment removed.
    pub fn without_indices(&self) -> Self {
        Self {
            segments: self
                .segments
                .iter()
                .filter(|s| !s.is_index())
                .cloned()
                .collect(),
        }
    }

    /// Returns true if `prefix` matches the leading segments of this path.
    ///
    /// Matching is segment-wise, so `Emails` is a prefix of `Emails.Domain` but
    /// not of `EmailsBackup`.
    pub fn starts_with(&self, prefix: &PropertyPath) -> bool {
        self.segments.starts_with(&prefix.segments)
    }
}

impl Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                PathSegment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PathSegment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl FromStr for PropertyPath {
    type Err = PathError;

    /// Parses the textual form produced by `Display`.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| PathError::Malformed {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let mut segments = Vec::new();
        let mut rest = input;

        while !rest.is_empty() {
            if let Some(after) = rest.strip_prefix('[') {
                let close = after.find(']').ok_or_else(|| malformed("unterminated index"))?;
                let index = after[..close]
                    .parse::<usize>()
                    .map_err(|_| malformed("index is not a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &after[close + 1..];
                continue;
            }

            if !segments.is_empty() {
                rest = rest
                    .strip_prefix('.')
                    .ok_or_else(|| malformed("expected '.' or '[' between segments"))?;
            }

            let end = rest.find(['.', '[']).unwrap_or(rest.len());
            let name = &rest[..end];
            if !SEGMENT_NAME.is_match(name) {
                return Err(malformed("member names must be identifiers"));
            }
            segments.push(PathSegment::Field(name.to_string()));
            rest = &rest[end..];
        }

        Ok(Self { segments })
    }
}
