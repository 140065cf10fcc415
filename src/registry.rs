//! Write-once storage for typed conversion outcomes.
//!
//! This module provides the [`ResultRegistry`] type that rules populate while a
//! validation run evaluates, and that the session reads from afterwards. Each
//! outcome is keyed by the property path it was produced for and the type it
//! converts to.

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use stillwater::Validation;

use crate::error::Messages;
use crate::path::PropertyPath;
use crate::session::RetrievalError;

/// A typed success-or-failure value produced by a conversion rule.
pub type StoredOutcome<R> = Validation<R, Messages>;

type OutcomeMap = RwLock<IndexMap<ResultKey, Arc<dyn Any + Send + Sync>>>;

/// Identity of a stored outcome: the property path and the result type.
///
/// Two keys are equal when both the path (including index segments) and the
/// result type match exactly. The type name is carried for diagnostics only.
#[derive(Clone)]
pub struct ResultKey {
    path: PropertyPath,
    type_id: TypeId,
    type_name: &'static str,
}

impl ResultKey {
    /// Creates the key for results of type `R` at `path`.
    pub fn of<R: 'static>(path: PropertyPath) -> Self {
        Self {
            path,
            type_id: TypeId::of::<R>(),
            type_name: std::any::type_name::<R>(),
        }
    }

    /// Returns the property path component.
    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// Returns the name of the result type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn is<R: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<R>()
    }
}

impl PartialEq for ResultKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.path == other.path
    }
}

impl Eq for ResultKey {}

impl Hash for ResultKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResultKey({:?} as {})", self.path.to_string(), self.type_name)
    }
}

/// A write-once, read-many store of conversion outcomes for one validation run.
///
/// # Thread Safety
///
/// The store sits behind a `parking_lot::RwLock`. Registration checks for an
/// existing key and inserts under a single write lock, so concurrent rules can
/// never both register the same key.
///
/// # Example
///
/// ```rust
/// use coroner::{PropertyPath, ResultRegistry};
/// use stillwater::Validation;
///
/// let registry = ResultRegistry::new();
/// let path = PropertyPath::from_field("Age");
///
/// registry.register(path.clone(), Validation::Success(42u32));
///
/// let stored = registry.lookup::<u32>(&path).unwrap();
/// assert!(stored.is_success());
///
/// // Same path, different type: nothing stored.
/// assert!(registry.lookup::<i64>(&path).is_none());
/// ```
pub struct ResultRegistry {
    outcomes: OutcomeMap,
}

impl ResultRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            outcomes: RwLock::new(IndexMap::new()),
        }
    }

    /// Stores `outcome` under `(path, R)`.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation::DuplicateRegistration` if the key is already
    /// present. The existing outcome is left untouched.
    pub fn try_register<R>(
        &self,
        path: PropertyPath,
        outcome: StoredOutcome<R>,
    ) -> Result<(), ContractViolation>
    where
        R: Send + Sync + 'static,
    {
        let key = ResultKey::of::<R>(path);
        let mut outcomes = self.outcomes.write();

        if outcomes.contains_key(&key) {
            return Err(ContractViolation::DuplicateRegistration {
                path: key.path,
                type_name: key.type_name,
            });
        }

        tracing::trace!(
            path = %key.path,
            result_type = key.type_name,
            success = outcome.is_success(),
            "registered conversion outcome"
        );
        outcomes.insert(key, Arc::new(outcome));
        Ok(())
    }

    /// Stores `outcome` under `(path, R)`.
    ///
    /// # Panics
    ///
    /// Panics if the key is already present. At most one outcome may be
    /// registered per path and result type in a run; a second registration is
    /// a bug in the rule set, not a validation failure.
    pub fn register<R>(&self, path: PropertyPath, outcome: StoredOutcome<R>)
    where
        R: Send + Sync + 'static,
    {
        if let Err(violation) = self.try_register(path, outcome) {
            tracing::warn!(%violation, "result registry contract violated");
            panic!("{}", violation);
        }
    }

    /// Returns the outcome stored under `(path, R)`.
    ///
    /// Lookups never mutate; repeated calls return the same allocation.
    pub fn lookup<R>(&self, path: &PropertyPath) -> Option<Arc<StoredOutcome<R>>>
    where
        R: Send + Sync + 'static,
    {
        let key = ResultKey::of::<R>(path.clone());
        let outcomes = self.outcomes.read();
        outcomes.get(&key).and_then(downcast::<R>)
    }

    /// Returns every outcome of type `R` whose path, with index segments
    /// removed, starts with `prefix` (also stripped of indices).
    ///
    /// Outcomes are returned in registration order. This is how elements of a
    /// collection, registered as `Emails[0]`, `Emails[1]`, ..., are gathered
    /// back under `Emails`.
    pub fn lookup_by_prefix<R>(&self, prefix: &PropertyPath) -> Vec<Arc<StoredOutcome<R>>>
    where
        R: Send + Sync + 'static,
    {
        let prefix = prefix.without_indices();
        let outcomes = self.outcomes.read();

        outcomes
            .iter()
            .filter(|(key, _)| key.is::<R>() && key.path.without_indices().starts_with(&prefix))
            .filter_map(|(_, outcome)| downcast::<R>(outcome))
            .collect()
    }

    /// Returns the number of stored outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.read().len()
    }

    /// Returns true if nothing has been registered.
    pub fn is_empty(&self) -> bool {
        self.outcomes.read().is_empty()
    }

    /// Returns the stored keys in registration order.
    pub fn keys(&self) -> Vec<ResultKey> {
        self.outcomes.read().keys().cloned().collect()
    }
}

fn downcast<R>(outcome: &Arc<dyn Any + Send + Sync>) -> Option<Arc<StoredOutcome<R>>>
where
    R: Send + Sync + 'static,
{
    Arc::clone(outcome).downcast::<StoredOutcome<R>>().ok()
}

impl Default for ResultRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ResultRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResultRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}

/// A caller bug detected at the registry or retrieval boundary.
///
/// These are never data-dependent: they signal a mismatch between how a
/// result was registered and how it is being read.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ContractViolation {
    /// A second outcome was registered under an existing key.
    #[error("a {type_name} result for '{path}' is already registered")]
    DuplicateRegistration {
        /// Path of the duplicated key.
        path: PropertyPath,
        /// Result type of the duplicated key.
        type_name: &'static str,
    },

    /// A value was demanded from a result that is absent or failed.
    #[error("expected a successful result, but {0}")]
    UncheckedRetrieval(#[from] RetrievalError),
}
