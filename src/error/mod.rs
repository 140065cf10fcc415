//! Error types for validation failures and contract checks.
//!
//! This module provides the raw failure records produced by rules, the error tree
//! they are folded into, and the path errors raised by accessor resolution.

mod failure;
mod path_error;
mod tree;

pub use failure::{FieldFailure, FieldFailures, Messages};
pub use path_error::PathError;
pub use tree::{ErrorNode, ErrorTree};
