//! Errors raised while resolving or parsing property paths.

/// A path could not be derived from an accessor or parsed from text.
///
/// Both variants are recoverable: they come from caller-supplied accessor shapes
/// or rule-engine output and are reported through `Result`, never by panicking.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// The accessor contains a method or function invocation.
    #[error("unsupported path expression: accessor calls '{call}()'")]
    UnsupportedPathExpression {
        /// Name of the invoked method or function.
        call: String,
    },

    /// The text is not a well-formed dot/bracket path.
    #[error("malformed property path '{input}': {reason}")]
    Malformed {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },
}
