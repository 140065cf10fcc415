//! Rule sets evaluated by a validation session.
//!
//! A [`Validator`] is an ordered list of [`Rule`]s combined by composition. Each
//! rule inspects the instance and reports [`FieldFailure`]s through a
//! [`RuleContext`], which also gives it a side channel into the run's
//! [`ResultRegistry`] for remembering typed conversion results.
//!
//! # Example
//!
//! ```rust
//! use coroner::{Accessor, Validator};
//!
//! struct Signup {
//!     name: String,
//!     age: String,
//! }
//!
//! let name = Accessor::<Signup>::identity().field("Name", |s: &Signup| &s.name);
//! let age = Accessor::<Signup>::identity().field("Age", |s: &Signup| &s.age);
//!
//! let validator = Validator::new()
//!     .rule_for(name, |n: &String| {
//!         if n.is_empty() { Err("must not be empty".to_string()) } else { Ok(()) }
//!     })
//!     .convert(age.clone(), |a: &String| a.parse::<u32>().map_err(|e| e.to_string()));
//!
//! let (outcome, session) = validator.validate(Signup {
//!     name: "Ada".to_string(),
//!     age: "36".to_string(),
//! });
//!
//! assert!(outcome.is_success());
//! assert_eq!(session.expect_value::<u32, _>(&age), 36);
//! ```

use rayon::prelude::*;
use stillwater::Validation;

use crate::accessor::Accessor;
use crate::error::{FieldFailure, Messages, PathError};
use crate::path::PropertyPath;
use crate::registry::{ResultRegistry, StoredOutcome};

/// A single rule over values of type `T`.
pub trait Rule<T>: Send + Sync {
    /// Evaluates the rule, reporting failures and registering outcomes through `ctx`.
    fn evaluate(&self, instance: &T, ctx: &mut RuleContext<'_>);
}

/// What a rule sees of the running session.
pub struct RuleContext<'r> {
    registry: &'r ResultRegistry,
    failures: Vec<FieldFailure>,
}

impl<'r> RuleContext<'r> {
    /// Creates a context that registers into `registry`.
    pub fn new(registry: &'r ResultRegistry) -> Self {
        Self {
            registry,
            failures: Vec::new(),
        }
    }

    /// Reports a failure at `path`.
    pub fn fail(&mut self, path: PropertyPath, message: impl Into<String>) {
        self.failures.push(FieldFailure::new(path, message));
    }

    /// Reports a prepared failure.
    pub fn report(&mut self, failure: FieldFailure) {
        self.failures.push(failure);
    }

    /// Registers a conversion outcome for `(path, R)`.
    ///
    /// # Panics
    ///
    /// Panics if an outcome is already registered for the same key.
    pub fn register<R>(&self, path: PropertyPath, outcome: StoredOutcome<R>)
    where
        R: Send + Sync + 'static,
    {
        self.registry.register(path, outcome);
    }

    /// Returns the registry of the running session.
    pub fn registry(&self) -> &ResultRegistry {
        self.registry
    }

    /// Returns the failures reported so far.
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Consumes the context, returning the reported failures in order.
    pub fn into_failures(self) -> Vec<FieldFailure> {
        self.failures
    }

    /// Records `result` under `(path, R)` and reports its failure, if any.
    fn record<R>(&mut self, path: PropertyPath, result: Result<R, String>)
    where
        R: Send + Sync + 'static,
    {
        let outcome = match result {
            Ok(value) => Validation::Success(value),
            Err(message) => {
                self.report(
                    FieldFailure::new(path.clone(), message.clone()).with_code("conversion_failed"),
                );
                Validation::Failure(Messages::single(message))
            }
        };
        self.register(path, outcome);
    }

    fn unsupported(&mut self, error: &PathError) {
        self.report(
            FieldFailure::new(PropertyPath::root(), error.to_string())
                .with_code("unsupported_path"),
        );
    }
}

struct FnRule<F>(F);

impl<T, F> Rule<T> for FnRule<F>
where
    F: Fn(&T, &mut RuleContext<'_>) + Send + Sync,
{
    fn evaluate(&self, instance: &T, ctx: &mut RuleContext<'_>) {
        (self.0)(instance, ctx)
    }
}

/// An ordered set of rules for values of type `T`.
pub struct Validator<T> {
    rules: Vec<Box<dyn Rule<T>>>,
}

impl<T: 'static> Validator<T> {
    /// Creates a validator with no rules.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule.
    pub fn rule<R>(mut self, rule: R) -> Self
    where
        R: Rule<T> + 'static,
    {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a rule written as a closure over the instance and the context.
    ///
    /// # Example
    ///
    /// ```rust
    /// use coroner::{PropertyPath, Validator};
    ///
    /// struct Range {
    ///     start: u32,
    ///     end: u32,
    /// }
    ///
    /// let validator = Validator::new().custom(|r: &Range, ctx| {
    ///     if r.start > r.end {
    ///         ctx.fail(PropertyPath::root(), "start must not exceed end");
    ///     }
    /// });
    ///
    /// let (outcome, _) = validator.validate(Range { start: 5, end: 1 });
    /// assert!(outcome.is_failure());
    /// ```
    pub fn custom<F>(self, rule: F) -> Self
    where
        F: Fn(&T, &mut RuleContext<'_>) + Send + Sync + 'static,
    {
        self.rule(FnRule(rule))
    }

    /// Adds a check on the part read by `accessor`.
    ///
    /// An `Err` message is reported at the accessor's path.
    pub fn rule_for<U, F>(self, accessor: Accessor<T, U>, check: F) -> Self
    where
        U: ?Sized + 'static,
        F: Fn(&U) -> Result<(), String> + Send + Sync + 'static,
    {
        let path = accessor.path();
        self.custom(move |instance: &T, ctx: &mut RuleContext<'_>| match &path {
            Ok(path) => {
                if let Err(message) = check(accessor.get(instance)) {
                    ctx.fail(path.clone(), message);
                }
            }
            Err(error) => ctx.unsupported(error),
        })
    }

    /// Adds a conversion of the part read by `accessor` into `R`.
    ///
    /// The outcome is always registered under `(path, R)`. A failed conversion
    /// additionally reports its message at the accessor's path.
    pub fn convert<U, R, F>(self, accessor: Accessor<T, U>, conversion: F) -> Self
    where
        U: ?Sized + 'static,
        R: Send + Sync + 'static,
        F: Fn(&U) -> Result<R, String> + Send + Sync + 'static,
    {
        let path = accessor.path();
        self.custom(move |instance: &T, ctx: &mut RuleContext<'_>| match &path {
            Ok(path) => ctx.record(path.clone(), conversion(accessor.get(instance))),
            Err(error) => ctx.unsupported(error),
        })
    }

    /// Adds an element-by-element conversion of the sequence read by `accessor`.
    ///
    /// Element `i` is registered under `path[i]`, and its failure is reported there.
    pub fn convert_each<U, E, R, F>(self, accessor: Accessor<T, U>, conversion: F) -> Self
    where
        U: AsRef<[E]> + ?Sized + 'static,
        E: 'static,
        R: Send + Sync + 'static,
        F: Fn(&E) -> Result<R, String> + Send + Sync + 'static,
    {
        let path = accessor.path();
        self.custom(move |instance: &T, ctx: &mut RuleContext<'_>| match &path {
            Ok(path) => {
                for (i, element) in accessor.get(instance).as_ref().iter().enumerate() {
                    ctx.record(path.push_index(i), conversion(element));
                }
            }
            Err(error) => ctx.unsupported(error),
        })
    }

    /// Adds a conversion that runs only when the optional part is present.
    ///
    /// Nothing is registered for an absent value, so retrieving `R` for it
    /// finds no result.
    pub fn convert_present<E, R, F>(self, accessor: Accessor<T, Option<E>>, conversion: F) -> Self
    where
        E: 'static,
        R: Send + Sync + 'static,
        F: Fn(&E) -> Result<R, String> + Send + Sync + 'static,
    {
        let path = accessor.path();
        self.custom(move |instance: &T, ctx: &mut RuleContext<'_>| match &path {
            Ok(path) => {
                if let Some(value) = accessor.get(instance) {
                    ctx.record(path.clone(), conversion(value));
                }
            }
            Err(error) => ctx.unsupported(error),
        })
    }

    /// Adds a nullable conversion of an optional part.
    ///
    /// The outcome is registered as `Option<R>`: an absent value converts to
    /// `Success(None)`, a present one to `Some` of the conversion result.
    pub fn convert_optional<E, R, F>(self, accessor: Accessor<T, Option<E>>, conversion: F) -> Self
    where
        E: 'static,
        R: Send + Sync + 'static,
        F: Fn(&E) -> Result<R, String> + Send + Sync + 'static,
    {
        let path = accessor.path();
        self.custom(move |instance: &T, ctx: &mut RuleContext<'_>| match &path {
            Ok(path) => {
                let result = match accessor.get(instance) {
                    Some(value) => conversion(value).map(Some),
                    None => Ok(None),
                };
                ctx.record(path.clone(), result);
            }
            Err(error) => ctx.unsupported(error),
        })
    }

    /// Returns the number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the validator has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule in order against one instance.
    pub fn evaluate(&self, instance: &T, registry: &ResultRegistry) -> Vec<FieldFailure> {
        let mut ctx = RuleContext::new(registry);
        for rule in &self.rules {
            rule.evaluate(instance, &mut ctx);
        }
        ctx.into_failures()
    }

    /// Evaluates the rules on the rayon pool.
    ///
    /// Each rule reports into its own context; failures are concatenated in
    /// rule order, so the result matches [`Validator::evaluate`].
    pub fn evaluate_parallel(&self, instance: &T, registry: &ResultRegistry) -> Vec<FieldFailure>
    where
        T: Sync,
    {
        self.rules
            .par_iter()
            .map(|rule| {
                let mut ctx = RuleContext::new(registry);
                rule.evaluate(instance, &mut ctx);
                ctx.into_failures()
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    }
}

impl<T: 'static> Default for Validator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Form {
        name: String,
        tags: Vec<String>,
        nickname: Option<String>,
    }

    fn form() -> Form {
        Form {
            name: String::new(),
            tags: vec!["a".to_string(), "".to_string()],
            nickname: None,
        }
    }

    fn name() -> Accessor<Form, String> {
        Accessor::<Form>::identity().field("Name", |f: &Form| &f.name)
    }

    fn tags() -> Accessor<Form, Vec<String>> {
        Accessor::<Form>::identity().field("Tags", |f: &Form| &f.tags)
    }

    fn nickname() -> Accessor<Form, Option<String>> {
        Accessor::<Form>::identity().field("Nickname", |f: &Form| &f.nickname)
    }

    fn non_empty(s: &String) -> Result<String, String> {
        if s.is_empty() {
            Err("must not be empty".to_string())
        } else {
            Ok(s.to_uppercase())
        }
    }

    #[test]
    fn test_check_reports_at_accessor_path() {
        let validator = Validator::new().rule_for(name(), |n: &String| {
            if n.is_empty() {
                Err("must not be empty".to_string())
            } else {
                Ok(())
            }
        });

        let registry = ResultRegistry::new();
        let failures = validator.evaluate(&form(), &registry);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path.to_string(), "Name");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_conversion_registers_and_reports_same_message() {
        let validator = Validator::new().convert(name(), non_empty);
        let registry = ResultRegistry::new();
        let failures = validator.evaluate(&form(), &registry);

        assert_eq!(failures[0].message, "must not be empty");
        assert_eq!(failures[0].code, "conversion_failed");

        let stored = registry
            .lookup::<String>(&PropertyPath::from_field("Name"))
            .unwrap();
        match stored.as_ref() {
            Validation::Failure(messages) => assert_eq!(messages.first(), "must not be empty"),
            Validation::Success(_) => panic!("expected failure"),
        }
    }

    #[test]
    fn test_convert_each_registers_indexed_keys() {
        let validator = Validator::new().convert_each(tags(), non_empty);
        let registry = ResultRegistry::new();
        let failures = validator.evaluate(&form(), &registry);

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].path.to_string(), "Tags[1]");

        let keys: Vec<_> = registry.keys().iter().map(|k| k.path().to_string()).collect();
        assert_eq!(keys, vec!["Tags[0]", "Tags[1]"]);
    }

    #[test]
    fn test_optional_conversions() {
        let validator = Validator::new()
            .convert_present(nickname(), non_empty)
            .convert_optional(nickname(), non_empty);
        let registry = ResultRegistry::new();
        let failures = validator.evaluate(&form(), &registry);

        assert!(failures.is_empty());
        let path = PropertyPath::from_field("Nickname");
        assert!(registry.lookup::<String>(&path).is_none());
        let stored = registry.lookup::<Option<String>>(&path).unwrap();
        assert!(matches!(stored.as_ref(), Validation::Success(None)));
    }

    #[test]
    fn test_unsupported_accessor_reports_instead_of_panicking() {
        let trimmed = name().call("trim", |s: &String| s.trim());
        let validator = Validator::new().rule_for(trimmed, |_: &str| Ok(()));

        let registry = ResultRegistry::new();
        let failures = validator.evaluate(&form(), &registry);

        assert_eq!(failures.len(), 1);
        assert!(failures[0].path.is_root());
        assert_eq!(failures[0].code, "unsupported_path");
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_conversion_is_fatal() {
        let validator = Validator::new()
            .convert(name(), non_empty)
            .convert(name(), non_empty);
        validator.evaluate(&form(), &ResultRegistry::new());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let validator = Validator::new()
            .convert(name(), non_empty)
            .convert_each(tags(), non_empty)
            .custom(|_: &Form, ctx| ctx.fail(PropertyPath::root(), "whole form"));

        let sequential = validator.evaluate(&form(), &ResultRegistry::new());
        let registry = ResultRegistry::new();
        let parallel = validator.evaluate_parallel(&form(), &registry);

        assert_eq!(sequential, parallel);
        assert_eq!(registry.len(), 3);
    }
}
