//! Hierarchical error trees built from flat failure lists.
//!
//! Failures are grouped by the leading member of their path. A group holding one
//! failure directly on that member stays a flat [`ErrorNode::Field`]; any other
//! group becomes an [`ErrorNode::Object`] whose children are keyed relative to it.

use std::fmt::{self, Display};

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::failure::{FieldFailure, FieldFailures};

/// A node of a rendered error tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorNode {
    /// A leaf complaint.
    Field {
        /// Path of the failing value, relative to the enclosing node.
        key: String,
        /// Human-readable error message.
        message: String,
    },
    /// A grouping node. The root of a tree always has an empty key.
    Object {
        /// Path of the group, relative to the enclosing node.
        key: String,
        /// Child nodes in discovery order.
        children: Vec<ErrorNode>,
    },
}

impl ErrorNode {
    /// Creates a leaf node.
    pub fn field(key: impl Into<String>, message: impl Into<String>) -> Self {
        ErrorNode::Field {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Creates a grouping node.
    pub fn object(key: impl Into<String>, children: Vec<ErrorNode>) -> Self {
        ErrorNode::Object {
            key: key.into(),
            children,
        }
    }

    /// Returns the node key.
    pub fn key(&self) -> &str {
        match self {
            ErrorNode::Field { key, .. } | ErrorNode::Object { key, .. } => key,
        }
    }

    /// Returns the message of a leaf node.
    pub fn message(&self) -> Option<&str> {
        match self {
            ErrorNode::Field { message, .. } => Some(message),
            ErrorNode::Object { .. } => None,
        }
    }

    /// Returns the children of a grouping node; leaves have none.
    pub fn children(&self) -> &[ErrorNode] {
        match self {
            ErrorNode::Field { .. } => &[],
            ErrorNode::Object { children, .. } => children,
        }
    }

    /// Returns the child with the given key, if any.
    pub fn child(&self, key: &str) -> Option<&ErrorNode> {
        self.children().iter().find(|c| c.key() == key)
    }

    /// Returns true for leaf nodes.
    pub fn is_field(&self) -> bool {
        matches!(self, ErrorNode::Field { .. })
    }

    fn write_to(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            ErrorNode::Field { key, message } => write!(f, "{}: {}", key, message),
            ErrorNode::Object { key, children } => {
                write!(f, "{}: ", key)?;
                write_block(f, children, depth)
            }
        }
    }

    fn to_json_value(&self) -> Value {
        match self {
            ErrorNode::Field { message, .. } => Value::String(message.clone()),
            ErrorNode::Object { children, .. } => Value::Object(children_to_json(children)),
        }
    }
}

impl Display for ErrorNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_to(f, 0)
    }
}

/// Writes `{ a: x, b: y }`, or one child per indented line in alternate mode.
fn write_block(f: &mut fmt::Formatter<'_>, children: &[ErrorNode], depth: usize) -> fmt::Result {
    if children.is_empty() {
        return write!(f, "{{}}");
    }

    if f.alternate() {
        let indent = "  ".repeat(depth + 1);
        writeln!(f, "{{")?;
        for child in children {
            write!(f, "{}", indent)?;
            child.write_to(f, depth + 1)?;
            writeln!(f)?;
        }
        write!(f, "{}}}", "  ".repeat(depth))
    } else {
        write!(f, "{{ ")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            child.write_to(f, depth + 1)?;
        }
        write!(f, " }}")
    }
}

fn children_to_json(children: &[ErrorNode]) -> Map<String, Value> {
    let mut map = Map::new();
    for child in children {
        let value = child.to_json_value();
        match map.get_mut(child.key()) {
            None => {
                map.insert(child.key().to_string(), value);
            }
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }
    map
}

/// The error tree of a failed validation run.
///
/// # Example
///
/// ```rust
/// use coroner::{ErrorNode, ErrorTree, FieldFailure, FieldFailures, PropertyPath};
///
/// let failures = FieldFailures::from_vec(vec![
///     FieldFailure::new(PropertyPath::from_field("Name"), "must not be empty"),
///     FieldFailure::new("Address.City".parse().unwrap(), "is required"),
/// ])
/// .unwrap();
///
/// let tree = ErrorTree::new("Person", failures);
/// assert_eq!(tree.root().key(), "");
/// assert_eq!(
///     tree.to_string(),
///     "Person { Name: must not be empty, Address: { City: is required } }"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorTree {
    type_name: String,
    root: ErrorNode,
    failures: FieldFailures,
}

impl ErrorTree {
    /// Folds the failures into a tree rooted at the validated type.
    pub fn new(type_name: impl Into<String>, failures: FieldFailures) -> Self {
        let type_name = type_name.into();
        let root = Self::build(&type_name, failures.iter());
        Self {
            type_name,
            root,
            failures,
        }
    }

    /// Folds a flat failure sequence into a root [`ErrorNode::Object`] with an empty key.
    ///
    /// Failures are grouped by the leading member of their path, in discovery
    /// order; failures without one (root or index-first paths) group under
    /// `type_name`. A group with a single failure directly on its member becomes a
    /// `Field`; every other group becomes an `Object` whose children are keyed by
    /// the failure path with the member prefix removed. A child whose relative key
    /// would be empty keeps the group key.
    pub fn build<'a>(
        type_name: &str,
        failures: impl IntoIterator<Item = &'a FieldFailure>,
    ) -> ErrorNode {
        let mut groups: IndexMap<&str, Vec<&FieldFailure>> = IndexMap::new();
        for failure in failures {
            let root = failure.path.root_field().unwrap_or(type_name);
            groups.entry(root).or_default().push(failure);
        }

        let children = groups
            .into_iter()
            .map(|(root, members)| match members.as_slice() {
                [only] if is_flat(only) => ErrorNode::field(root, only.message.clone()),
                _ => ErrorNode::object(
                    root,
                    members
                        .iter()
                        .map(|m| ErrorNode::field(relative_key(m, root), m.message.clone()))
                        .collect(),
                ),
            })
            .collect();

        ErrorNode::object("", children)
    }

    /// Returns the label used for the root when rendering.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the root node.
    pub fn root(&self) -> &ErrorNode {
        &self.root
    }

    /// Returns the top-level groups.
    pub fn children(&self) -> &[ErrorNode] {
        self.root.children()
    }

    /// Returns the flat failures the tree was built from.
    pub fn failures(&self) -> &FieldFailures {
        &self.failures
    }

    /// Renders the tree as a JSON object suitable for an API error body.
    ///
    /// Repeated keys within one group collect their messages into an array.
    pub fn to_json(&self) -> Value {
        Value::Object(children_to_json(self.root.children()))
    }
}

/// True when the failure sits directly on its group: the root itself or a single member.
fn is_flat(failure: &FieldFailure) -> bool {
    failure.path.is_root() || (failure.path.len() == 1 && failure.path.root_field().is_some())
}

fn relative_key(failure: &FieldFailure, group: &str) -> String {
    let relative = match failure.path.root_field() {
        Some(_) => failure.path.strip_root().to_string(),
        None => failure.path.to_string(),
    };
    if relative.is_empty() {
        group.to_string()
    } else {
        relative
    }
}

impl Display for ErrorTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.type_name)?;
        write_block(f, self.root.children(), 0)
    }
}

impl std::error::Error for ErrorTree {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PropertyPath;
    use serde_json::json;

    fn failure(path: &str, message: &str) -> FieldFailure {
        FieldFailure::new(path.parse::<PropertyPath>().unwrap(), message)
    }

    fn tree(failures: Vec<FieldFailure>) -> ErrorTree {
        ErrorTree::new("Person", FieldFailures::from_vec(failures).unwrap())
    }

    #[test]
    fn test_single_flat_failure_stays_field() {
        let tree = tree(vec![failure("Name", "must not be empty")]);
        assert_eq!(
            tree.root(),
            &ErrorNode::object("", vec![ErrorNode::field("Name", "must not be empty")])
        );
    }

    #[test]
    fn test_single_nested_failure_becomes_object() {
        let tree = tree(vec![failure("Address.City", "is required")]);
        assert_eq!(
            tree.children(),
            &[ErrorNode::object(
                "Address",
                vec![ErrorNode::field("City", "is required")]
            )]
        );
    }

    #[test]
    fn test_multiple_failures_on_one_field_nest() {
        let tree = tree(vec![
            failure("Name", "must not be empty"),
            failure("Name", "must start with a capital"),
        ]);
        assert_eq!(
            tree.children(),
            &[ErrorNode::object(
                "Name",
                vec![
                    ErrorNode::field("Name", "must not be empty"),
                    ErrorNode::field("Name", "must start with a capital"),
                ]
            )]
        );
    }

    #[test]
    fn test_groups_keep_discovery_order() {
        let tree = tree(vec![
            failure("Emails[1]", "invalid"),
            failure("Name", "required"),
            failure("Emails[0]", "invalid"),
        ]);
        let keys: Vec<_> = tree.children().iter().map(|c| c.key()).collect();
        assert_eq!(keys, vec!["Emails", "Name"]);

        let emails = tree.root().child("Emails").unwrap();
        let element_keys: Vec<_> = emails.children().iter().map(|c| c.key()).collect();
        assert_eq!(element_keys, vec!["[1]", "[0]"]);
    }

    #[test]
    fn test_indexed_single_failure_nests() {
        let tree = tree(vec![failure("Emails[0]", "invalid")]);
        let emails = tree.root().child("Emails").unwrap();
        assert!(!emails.is_field());
        assert_eq!(emails.children()[0].key(), "[0]");
    }

    #[test]
    fn test_root_failures_group_under_type_name() {
        let tree = tree(vec![failure("", "start must precede end")]);
        assert_eq!(
            tree.children(),
            &[ErrorNode::field("Person", "start must precede end")]
        );
    }

    #[test]
    fn test_index_first_failure_nests_under_type_name() {
        let tree = tree(vec![failure("[2]", "duplicate entry")]);
        assert_eq!(
            tree.children(),
            &[ErrorNode::object(
                "Person",
                vec![ErrorNode::field("[2]", "duplicate entry")]
            )]
        );
    }

    #[test]
    fn test_display_single_line() {
        let tree = tree(vec![
            failure("Name", "must not be empty"),
            failure("Address.City", "is required"),
            failure("Address.Zip", "is invalid"),
        ]);
        assert_eq!(
            tree.to_string(),
            "Person { Name: must not be empty, Address: { City: is required, Zip: is invalid } }"
        );
    }

    #[test]
    fn test_display_alternate_is_indented() {
        let tree = tree(vec![
            failure("Name", "must not be empty"),
            failure("Address.City", "is required"),
        ]);
        let expected = "Person {\n  Name: must not be empty\n  Address: {\n    City: is required\n  }\n}";
        assert_eq!(format!("{:#}", tree), expected);
    }

    #[test]
    fn test_build_empty_is_empty_object() {
        let node = ErrorTree::build("Person", std::iter::empty());
        assert_eq!(node, ErrorNode::object("", Vec::new()));
    }

    #[test]
    fn test_to_json() {
        let tree = tree(vec![
            failure("Name", "must not be empty"),
            failure("Address.City", "is required"),
            failure("Tags", "too many"),
            failure("Tags", "duplicates"),
        ]);
        assert_eq!(
            tree.to_json(),
            json!({
                "Name": "must not be empty",
                "Address": { "City": "is required" },
                "Tags": { "Tags": ["too many", "duplicates"] }
            })
        );
    }
}
