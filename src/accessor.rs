//! Typed property accessors and path resolution.
//!
//! An [`Accessor`] pairs a getter with an [`AccessExpr`] that records how the
//! getter was built. [`resolve`] turns that record into a canonical
//! [`PropertyPath`], so the same accessor can read a value inside a rule and key
//! its conversion result for retrieval afterwards.
//!
//! # Example
//!
//! ```rust
//! use coroner::Accessor;
//!
//! struct Address {
//!     city: String,
//! }
//!
//! struct Person {
//!     address: Address,
//! }
//!
//! let city = Accessor::<Person>::identity()
//!     .field("Address", |p: &Person| &p.address)
//!     .field("City", |a: &Address| &a.city);
//!
//! assert_eq!(city.path().unwrap().to_string(), "Address.City");
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::PathError;
use crate::path::PropertyPath;

/// The shape of an accessor, recorded as it is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessExpr {
    /// The validated value itself.
    Identity,
    /// Member access on the inner expression.
    Member {
        /// Expression the member is read from.
        parent: Box<AccessExpr>,
        /// Member name used in the path.
        name: String,
    },
    /// A transparent conversion (deref, numeric widening) around the inner expression.
    Convert(Box<AccessExpr>),
    /// A method or function invocation on the inner expression.
    Call {
        /// Expression the method is invoked on.
        parent: Box<AccessExpr>,
        /// Name of the invoked method.
        name: String,
    },
}

/// Resolves an accessor expression to its canonical path.
///
/// Identity resolves to the root path, member chains join outer-to-inner with
/// `.`, and conversions are skipped. Any invocation anywhere in the chain fails
/// the whole resolution with [`PathError::UnsupportedPathExpression`].
pub fn resolve(expr: &AccessExpr) -> Result<PropertyPath, PathError> {
    match expr {
        AccessExpr::Identity => Ok(PropertyPath::root()),
        AccessExpr::Member { parent, name } => Ok(resolve(parent)?.push_field(name.as_str())),
        AccessExpr::Convert(inner) => resolve(inner),
        AccessExpr::Call { name, .. } => Err(PathError::UnsupportedPathExpression {
            call: name.clone(),
        }),
    }
}

type Getter<T, U> = Arc<dyn for<'a> Fn(&'a T) -> &'a U + Send + Sync>;

/// A typed accessor from `T` to one of its parts `U`.
pub struct Accessor<T: ?Sized, U: ?Sized = T> {
    expr: AccessExpr,
    getter: Getter<T, U>,
}

impl<T: ?Sized + 'static> Accessor<T, T> {
    /// The accessor that returns the value itself.
    pub fn identity() -> Self {
        Self {
            expr: AccessExpr::Identity,
            getter: erase(|value: &T| value),
        }
    }
}

impl<T: ?Sized + 'static, U: ?Sized + 'static> Accessor<T, U> {
    /// Extends the accessor with a named member.
    pub fn field<V, F>(self, name: impl Into<String>, getter: F) -> Accessor<T, V>
    where
        V: ?Sized + 'static,
        F: for<'a> Fn(&'a U) -> &'a V + Send + Sync + 'static,
    {
        Accessor {
            expr: AccessExpr::Member {
                parent: Box::new(self.expr),
                name: name.into(),
            },
            getter: chain(self.getter, getter),
        }
    }

    /// Extends the accessor with a transparent conversion that does not add a segment.
    pub fn view<V, F>(self, getter: F) -> Accessor<T, V>
    where
        V: ?Sized + 'static,
        F: for<'a> Fn(&'a U) -> &'a V + Send + Sync + 'static,
    {
        Accessor {
            expr: AccessExpr::Convert(Box::new(self.expr)),
            getter: chain(self.getter, getter),
        }
    }

    /// Extends the accessor with a method invocation.
    ///
    /// The resulting accessor can still read values, but its path cannot be
    /// resolved: [`Accessor::path`] returns [`PathError::UnsupportedPathExpression`].
    pub fn call<V, F>(self, name: impl Into<String>, getter: F) -> Accessor<T, V>
    where
        V: ?Sized + 'static,
        F: for<'a> Fn(&'a U) -> &'a V + Send + Sync + 'static,
    {
        Accessor {
            expr: AccessExpr::Call {
                parent: Box::new(self.expr),
                name: name.into(),
            },
            getter: chain(self.getter, getter),
        }
    }
}

impl<T: ?Sized, U: ?Sized> Accessor<T, U> {
    /// Reads the accessed part of `value`.
    pub fn get<'a>(&self, value: &'a T) -> &'a U {
        (self.getter)(value)
    }

    /// Returns the recorded expression.
    pub fn expr(&self) -> &AccessExpr {
        &self.expr
    }

    /// Resolves the canonical path of this accessor.
    pub fn path(&self) -> Result<PropertyPath, PathError> {
        resolve(&self.expr)
    }
}

fn chain<T, U, V, F>(outer: Getter<T, U>, inner: F) -> Getter<T, V>
where
    T: ?Sized + 'static,
    U: ?Sized + 'static,
    V: ?Sized + 'static,
    F: for<'a> Fn(&'a U) -> &'a V + Send + Sync + 'static,
{
    erase(move |value: &T| inner(outer(value)))
}

fn erase<T, U, F>(f: F) -> Getter<T, U>
where
    T: ?Sized,
    U: ?Sized,
    F: for<'a> Fn(&'a T) -> &'a U + Send + Sync + 'static,
{
    Arc::new(f)
}

impl<T: ?Sized, U: ?Sized> Clone for Accessor<T, U> {
    fn clone(&self) -> Self {
        Self {
            expr: self.expr.clone(),
            getter: Arc::clone(&self.getter),
        }
    }
}

impl<T: ?Sized, U: ?Sized> fmt::Debug for Accessor<T, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").field("expr", &self.expr).finish()
    }
}
