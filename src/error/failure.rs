//! Raw failure records and message collections.
//!
//! This module provides [`FieldFailure`] for a single complaint produced by a rule,
//! [`FieldFailures`] for accumulating them, and [`Messages`] for the failure payload
//! of a stored conversion outcome.

use std::fmt::{self, Display};

use stillwater::prelude::*;

use crate::path::PropertyPath;

/// A single field failure reported by a rule.
///
/// # Example
///
/// ```rust
/// use coroner::{FieldFailure, PropertyPath};
///
/// let failure = FieldFailure::new(PropertyPath::from_field("Email"), "is not a valid address")
///     .with_code("invalid_email");
///
/// assert_eq!(failure.to_string(), "Email: is not a valid address");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    /// The path to the value that failed validation.
    pub path: PropertyPath,
    /// Human-readable error message.
    pub message: String,
    /// Machine-readable error code (e.g., `conversion_failed`).
    pub code: String,
}

impl FieldFailure {
    /// Creates a new failure with the default `validation_error` code.
    pub fn new(path: PropertyPath, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
            code: "validation_error".to_string(),
        }
    }

    /// Sets the error code and returns self for chaining.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }
}

impl Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

impl std::error::Error for FieldFailure {}

/// A non-empty collection of field failures.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailures(NonEmptyVec<FieldFailure>);

impl FieldFailures {
    /// Creates a collection containing a single failure.
    pub fn single(failure: FieldFailure) -> Self {
        Self(NonEmptyVec::singleton(failure))
    }

    /// Creates a collection from a vec, or `None` when it is empty.
    pub fn from_vec(failures: Vec<FieldFailure>) -> Option<Self> {
        failures.into_iter().map(Self::single).reduce(|a, b| a.combine(b))
    }

    /// Returns the number of failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the collection is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the failures in report order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldFailure> {
        self.0.iter()
    }

    /// Returns all failures at the specified path.
    pub fn at_path(&self, path: &PropertyPath) -> Vec<&FieldFailure> {
        self.0.iter().filter(|f| &f.path == path).collect()
    }

    /// Returns the first failure.
    pub fn first(&self) -> &FieldFailure {
        self.0.head()
    }

    /// Converts this collection into a `Vec<FieldFailure>`.
    pub fn into_vec(self) -> Vec<FieldFailure> {
        self.0.into_vec()
    }
}

impl Semigroup for FieldFailures {
    fn combine(self, other: Self) -> Self {
        FieldFailures(self.0.combine(other.0))
    }
}

impl Display for FieldFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Validation failed with {} error(s):", self.len())?;
        for (i, failure) in self.iter().enumerate() {
            writeln!(f, "  {}. {}", i + 1, failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldFailures {}

/// The non-empty failure payload of a stored conversion outcome.
///
/// # Example
///
/// ```rust
/// use coroner::Messages;
/// use stillwater::prelude::*;
///
/// let messages = Messages::single("not a number").combine(Messages::single("out of range"));
/// assert_eq!(messages.to_vec(), vec!["not a number", "out of range"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Messages(NonEmptyVec<String>);

impl Messages {
    /// Creates a payload holding one message.
    pub fn single(message: impl Into<String>) -> Self {
        Self(NonEmptyVec::singleton(message.into()))
    }

    /// Returns the number of messages.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; the payload is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns an iterator over the messages.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Returns the first message.
    pub fn first(&self) -> &str {
        self.0.head()
    }

    /// Copies the messages into a plain vec.
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl Semigroup for Messages {
    fn combine(self, other: Self) -> Self {
        Messages(self.0.combine(other.0))
    }
}

impl Display for Messages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}

impl From<String> for Messages {
    fn from(message: String) -> Self {
        Messages::single(message)
    }
}

impl From<&str> for Messages {
    fn from(message: &str) -> Self {
        Messages::single(message)
    }
}

const _: () = {
    const fn assert_send<T: Send>() {}
    const fn assert_sync<T: Sync>() {}
    assert_send::<FieldFailures>();
    assert_sync::<FieldFailures>();
    assert_send::<Messages>();
    assert_sync::<Messages>();
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_display_root() {
        let failure = FieldFailure::new(PropertyPath::root(), "value is inconsistent");
        assert_eq!(failure.to_string(), "(root): value is inconsistent");
    }

    #[test]
    fn test_failures_from_empty_vec_is_none() {
        assert!(FieldFailures::from_vec(Vec::new()).is_none());
    }

    #[test]
    fn test_failures_combine_keeps_order() {
        let a = FieldFailures::single(FieldFailure::new(PropertyPath::from_field("a"), "1"));
        let b = FieldFailures::single(FieldFailure::new(PropertyPath::from_field("b"), "2"));

        let combined = a.combine(b);
        let messages: Vec<_> = combined.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(messages, vec!["1", "2"]);
    }

    #[test]
    fn test_failures_at_path() {
        let name = PropertyPath::from_field("Name");
        let failures = FieldFailures::from_vec(vec![
            FieldFailure::new(name.clone(), "required"),
            FieldFailure::new(PropertyPath::from_field("Age"), "too young"),
            FieldFailure::new(name.clone(), "too short"),
        ])
        .unwrap();

        assert_eq!(failures.at_path(&name).len(), 2);
        assert_eq!(failures.first().message, "required");
    }

    #[test]
    fn test_messages_display() {
        let messages = Messages::single("a").combine(Messages::single("b"));
        assert_eq!(messages.to_string(), "a; b");
        assert_eq!(messages.first(), "a");
        assert_eq!(messages.len(), 2);
    }
}
