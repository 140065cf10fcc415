//! # Coroner
//!
//! Correlates field validation with typed conversion results.
//!
//! ## Overview
//!
//! Validation rules often do more than pass or fail: to decide whether
//! `"2024-02-30"` is a valid date a rule has to parse it, and the parsed value is
//! exactly what calling code wants next. Coroner lets such rules remember their
//! conversion outcome, keyed by the field's property path and the result type,
//! and lets calling code retrieve it by the same typed accessor once validation
//! finishes. Failures are folded into a nested [`ErrorTree`] grouped by
//! top-level field.
//!
//! ## Core Types
//!
//! - [`Accessor`]: a typed getter that also resolves to a [`PropertyPath`]
//! - [`ResultRegistry`]: write-once store of [`StoredOutcome`]s keyed by path and type
//! - [`ErrorTree`]: nested rendering of the [`FieldFailure`]s of a run
//! - [`Validator`] / [`ValidationSession`]: evaluate rules and hand back a [`SessionHandle`]
//!
//! ## Example
//!
//! ```rust
//! use coroner::{Accessor, Validator};
//! use stillwater::Validation;
//!
//! struct Signup {
//!     email: String,
//!     age: String,
//! }
//!
//! let email = Accessor::<Signup>::identity().field("Email", |s: &Signup| &s.email);
//! let age = Accessor::<Signup>::identity().field("Age", |s: &Signup| &s.age);
//!
//! let validator = Validator::new()
//!     .rule_for(email.clone(), |e: &String| {
//!         if e.contains('@') { Ok(()) } else { Err("must contain @".to_string()) }
//!     })
//!     .convert(age.clone(), |a: &String| {
//!         a.parse::<u8>().map_err(|_| "must be a whole number".to_string())
//!     });
//!
//! let (outcome, session) = validator.validate(Signup {
//!     email: "ada@example.com".to_string(),
//!     age: "36".to_string(),
//! });
//! assert!(outcome.is_success());
//! assert_eq!(session.expect_value::<u8, _>(&age), 36);
//!
//! let (outcome, session) = validator.validate(Signup {
//!     email: "nope".to_string(),
//!     age: "old".to_string(),
//! });
//! match outcome {
//!     Validation::Failure(tree) => assert_eq!(
//!         tree.to_string(),
//!         "Signup { Email: must contain @, Age: must be a whole number }"
//!     ),
//!     Validation::Success(_) => unreachable!(),
//! }
//! assert!(session.expect_result::<u8, _>(&age).is_err());
//! ```

pub mod accessor;
pub mod error;
pub mod path;
pub mod registry;
pub mod rules;
pub mod session;

pub use accessor::{resolve, AccessExpr, Accessor};
pub use error::{ErrorNode, ErrorTree, FieldFailure, FieldFailures, Messages, PathError};
pub use path::{PathSegment, PropertyPath};
pub use registry::{ContractViolation, ResultKey, ResultRegistry, StoredOutcome};
pub use rules::{Rule, RuleContext, Validator};
pub use session::{Outcome, RetrievalError, SessionHandle, ValidationSession};
