//! Validation sessions and typed result retrieval.
//!
//! A [`ValidationSession`] runs a [`Validator`] once over one instance. It
//! returns the success-or-failure [`Outcome`] together with a [`SessionHandle`]
//! that owns the run's [`ResultRegistry`], so calling code can pull back the
//! typed values that conversion rules produced along the way.
//!
//! # Retrieval contract
//!
//! | Method                          | Missing or failed result       |
//! |---------------------------------|--------------------------------|
//! | [`SessionHandle::expect_result`]  | `Err(RetrievalError)`          |
//! | [`SessionHandle::expect_results`] | `Err(RetrievalError)`          |
//! | [`SessionHandle::expect_value`]   | panics (`ContractViolation`)   |
//! | [`SessionHandle::expect_value_or_default`] | `R::default()`        |
//!
//! Results are keyed by exact type. A value registered as `Option<R>` is not
//! found when asking for `R`, and vice versa.

use std::marker::PhantomData;

use stillwater::prelude::*;
use stillwater::Validation;

use crate::accessor::Accessor;
use crate::error::{ErrorTree, FieldFailure, FieldFailures, Messages, PathError};
use crate::path::PropertyPath;
use crate::registry::{ContractViolation, ResultRegistry};
use crate::rules::Validator;

/// The result of a validation run: the (possibly transformed) instance, or its error tree.
pub type Outcome<T> = Validation<T, ErrorTree>;

/// A recoverable failure to retrieve a typed result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RetrievalError {
    /// The accessor's path could not be resolved.
    #[error(transparent)]
    Path(#[from] PathError),

    /// No result of the requested type was registered for the path.
    #[error("no {type_name} result was registered for '{path}'")]
    Missing {
        /// The resolved path.
        path: PropertyPath,
        /// The requested result type.
        type_name: &'static str,
    },

    /// The registered result is a failure.
    #[error("the {type_name} result for '{path}' failed: {messages}")]
    Failed {
        /// The resolved path.
        path: PropertyPath,
        /// The requested result type.
        type_name: &'static str,
        /// Messages of every failed outcome.
        messages: Messages,
    },
}

impl RetrievalError {
    /// Returns the failure messages carried by a `Failed` error.
    pub fn messages(&self) -> Option<&Messages> {
        match self {
            RetrievalError::Failed { messages, .. } => Some(messages),
            _ => None,
        }
    }
}

/// One validation run over one instance.
///
/// The session is consumed by `run`, so it cannot be re-entered.
pub struct ValidationSession<'v, T> {
    validator: &'v Validator<T>,
    type_name: String,
}

impl<'v, T: 'static> ValidationSession<'v, T> {
    /// Creates a session that will evaluate `validator`.
    pub fn new(validator: &'v Validator<T>) -> Self {
        Self {
            validator,
            type_name: short_type_name::<T>().to_string(),
        }
    }

    /// Overrides the name used to label the root of the error tree.
    ///
    /// Defaults to the unqualified name of `T`.
    pub fn type_name(mut self, name: impl Into<String>) -> Self {
        self.type_name = name.into();
        self
    }

    /// Evaluates every rule once and returns the outcome with its session handle.
    ///
    /// The run succeeds with `instance` when no rule reported a failure.
    ///
    /// # Panics
    ///
    /// Panics if two rules register a result under the same path and type.
    pub fn run(self, instance: T) -> (Outcome<T>, SessionHandle<T>) {
        self.run_map(instance, |instance| instance)
    }

    /// Like [`run`](Self::run), but transforms the instance on success.
    pub fn run_map<V, F>(self, instance: T, transform: F) -> (Outcome<V>, SessionHandle<T>)
    where
        F: FnOnce(T) -> V,
    {
        tracing::debug!(
            type_name = %self.type_name,
            rules = self.validator.len(),
            "starting validation run"
        );
        let registry = ResultRegistry::new();
        let failures = self.validator.evaluate(&instance, &registry);
        conclude(self.type_name, registry, failures, || transform(instance))
    }

    /// Like [`run`](Self::run), but evaluates the rules on the rayon pool.
    ///
    /// Registrations remain write-once across threads, and failures are
    /// reported in rule order.
    pub fn run_parallel(self, instance: T) -> (Outcome<T>, SessionHandle<T>)
    where
        T: Sync,
    {
        tracing::debug!(
            type_name = %self.type_name,
            rules = self.validator.len(),
            "starting parallel validation run"
        );
        let registry = ResultRegistry::new();
        let failures = self.validator.evaluate_parallel(&instance, &registry);
        conclude(self.type_name, registry, failures, || instance)
    }
}

fn conclude<T, V>(
    type_name: String,
    registry: ResultRegistry,
    failures: Vec<FieldFailure>,
    value: impl FnOnce() -> V,
) -> (Outcome<V>, SessionHandle<T>) {
    tracing::debug!(
        type_name = %type_name,
        failures = failures.len(),
        registered = registry.len(),
        "validation run finished"
    );

    let outcome = match FieldFailures::from_vec(failures.clone()) {
        None => Validation::Success(value()),
        Some(failures) => Validation::Failure(ErrorTree::new(type_name.clone(), failures)),
    };

    let handle = SessionHandle {
        type_name,
        registry,
        failures,
        _validated: PhantomData,
    };
    (outcome, handle)
}

impl<T: 'static> Validator<T> {
    /// Runs a default [`ValidationSession`] over `instance`.
    pub fn validate(&self, instance: T) -> (Outcome<T>, SessionHandle<T>) {
        ValidationSession::new(self).run(instance)
    }
}

/// Read access to the results of a finished validation run.
pub struct SessionHandle<T> {
    type_name: String,
    registry: ResultRegistry,
    failures: Vec<FieldFailure>,
    _validated: PhantomData<fn() -> T>,
}

impl<T> SessionHandle<T> {
    /// Returns the stored result for the accessor's path and type `R`.
    ///
    /// # Errors
    ///
    /// - `RetrievalError::Path` if the accessor contains a method call
    /// - `RetrievalError::Missing` if no `R` result was registered for the path
    /// - `RetrievalError::Failed` if the registered result is a failure
    pub fn expect_result<R, U>(&self, accessor: &Accessor<T, U>) -> Result<R, RetrievalError>
    where
        R: Clone + Send + Sync + 'static,
        U: ?Sized,
    {
        let path = accessor.path()?;
        let type_name = std::any::type_name::<R>();
        let stored = self
            .registry
            .lookup::<R>(&path)
            .ok_or_else(|| RetrievalError::Missing {
                path: path.clone(),
                type_name,
            })?;

        match stored.as_ref() {
            Validation::Success(value) => Ok(value.clone()),
            Validation::Failure(messages) => Err(RetrievalError::Failed {
                path,
                type_name,
                messages: messages.clone(),
            }),
        }
    }

    /// Returns the successfully converted value for the accessor's path.
    ///
    /// # Panics
    ///
    /// Panics with a [`ContractViolation`] when the result is missing, failed,
    /// or the accessor cannot be resolved. Use this only where the run
    /// succeeded and a matching rule is known to register `R` exactly, not
    /// `Option<R>`.
    pub fn expect_value<R, U>(&self, accessor: &Accessor<T, U>) -> R
    where
        R: Clone + Send + Sync + 'static,
        U: ?Sized,
    {
        match self.expect_result(accessor) {
            Ok(value) => value,
            Err(error) => {
                let violation = ContractViolation::from(error);
                tracing::warn!(%violation, "unchecked result retrieval");
                panic!("{}", violation)
            }
        }
    }

    /// Returns the converted value, or `R::default()` when the result is
    /// missing or failed.
    ///
    /// This cannot tell "absent" from "present and equal to the default". For
    /// an optional field, register and retrieve `Option<R>` so absence reads
    /// back as `None` rather than as a zero value.
    pub fn expect_value_or_default<R, U>(&self, accessor: &Accessor<T, U>) -> R
    where
        R: Clone + Default + Send + Sync + 'static,
        U: ?Sized,
    {
        self.expect_result(accessor).unwrap_or_default()
    }

    /// Returns the values registered for every element of a sequence field.
    ///
    /// Elements are matched by path with index segments removed, so
    /// `Emails[0]`, `Emails[1]`, ... are all gathered for the `Emails`
    /// accessor, in registration order.
    ///
    /// # Errors
    ///
    /// - `RetrievalError::Missing` if no element result of type `R` exists
    /// - `RetrievalError::Failed` with the messages of every failed element
    pub fn expect_results<R, U>(&self, accessor: &Accessor<T, U>) -> Result<Vec<R>, RetrievalError>
    where
        R: Clone + Send + Sync + 'static,
        U: ?Sized,
    {
        let path = accessor.path()?;
        let type_name = std::any::type_name::<R>();
        let outcomes = self.registry.lookup_by_prefix::<R>(&path);

        if outcomes.is_empty() {
            return Err(RetrievalError::Missing { path, type_name });
        }

        let mut values = Vec::with_capacity(outcomes.len());
        let mut failed: Option<Messages> = None;
        for outcome in &outcomes {
            match outcome.as_ref() {
                Validation::Success(value) => values.push(value.clone()),
                Validation::Failure(messages) => {
                    failed = Some(match failed {
                        None => messages.clone(),
                        Some(acc) => acc.combine(messages.clone()),
                    });
                }
            }
        }

        match failed {
            None => Ok(values),
            Some(messages) => Err(RetrievalError::Failed {
                path,
                type_name,
                messages,
            }),
        }
    }

    /// Returns true if the run reported no failures.
    pub fn is_valid(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the raw failures in report order.
    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Returns the registry populated during the run.
    pub fn registry(&self) -> &ResultRegistry {
        &self.registry
    }

    /// Returns the root label used for the error tree.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }
}

/// Strips module paths and generic arguments: `app::model::Person<u8>` -> `Person`.
fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
