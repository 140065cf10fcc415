//! Integration tests for PropertyPath and accessor resolution.

use coroner::{resolve, AccessExpr, Accessor, PathError, PathSegment, PropertyPath};

struct Address {
    city: String,
    zip: u32,
}

struct Customer {
    name: String,
    address: Address,
}

#[test]
fn test_path_construction_and_display() {
    assert_eq!(PropertyPath::root().to_string(), "");
    assert_eq!(PropertyPath::from_field("Name").to_string(), "Name");

    let path = PropertyPath::root()
        .push_field("Orders")
        .push_index(0)
        .push_field("Address")
        .push_field("City");
    assert_eq!(path.to_string(), "Orders[0].Address.City");
}

#[test]
fn test_parsed_segments_preserved() {
    let path: PropertyPath = "Data[42].Value".parse().unwrap();
    let segments: Vec<&PathSegment> = path.segments().collect();

    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0], &PathSegment::field("Data"));
    assert_eq!(segments[1], &PathSegment::index(42));
    assert_eq!(segments[2], &PathSegment::field("Value"));
}

#[test]
fn test_consecutive_indices() {
    let path = PropertyPath::root().push_index(0).push_index(1).push_index(2);
    assert_eq!(path.to_string(), "[0][1][2]");
    assert!(path.without_indices().is_root());
}

#[test]
fn test_identity_accessor_is_root() {
    let accessor = Accessor::<Customer>::identity();
    assert_eq!(accessor.path(), Ok(PropertyPath::root()));
}

#[test]
fn test_member_chain() {
    let zip = Accessor::<Customer>::identity()
        .field("Address", |c: &Customer| &c.address)
        .field("Zip", |a: &Address| &a.zip);

    assert_eq!(zip.path().unwrap().to_string(), "Address.Zip");

    let customer = Customer {
        name: "Ada".to_string(),
        address: Address {
            city: "London".to_string(),
            zip: 12345,
        },
    };
    assert_eq!(*zip.get(&customer), 12345);
}

#[test]
fn test_transparent_wrappers_are_unwrapped() {
    let city = Accessor::<Customer>::identity()
        .view(|c: &Customer| c)
        .field("Address", |c: &Customer| &c.address)
        .field("City", |a: &Address| &a.city)
        .view(|s: &String| s.as_str());

    assert_eq!(city.path().unwrap().to_string(), "Address.City");
}

#[test]
fn test_method_call_is_rejected_without_partial_path() {
    let first_char = Accessor::<Customer>::identity()
        .field("Name", |c: &Customer| &c.name)
        .call("as_str", |s: &String| s.as_str());

    let result = first_char.path();
    assert_eq!(
        result,
        Err(PathError::UnsupportedPathExpression {
            call: "as_str".to_string()
        })
    );
    assert!(result.unwrap_err().to_string().contains("as_str"));
}

#[test]
fn test_resolve_expression_directly() {
    let expr = AccessExpr::Convert(Box::new(AccessExpr::Member {
        parent: Box::new(AccessExpr::Member {
            parent: Box::new(AccessExpr::Identity),
            name: "Address".to_string(),
        }),
        name: "City".to_string(),
    }));
    assert_eq!(resolve(&expr).unwrap().to_string(), "Address.City");

    let call = AccessExpr::Member {
        parent: Box::new(AccessExpr::Call {
            parent: Box::new(AccessExpr::Identity),
            name: "primary_address".to_string(),
        }),
        name: "City".to_string(),
    };
    assert!(matches!(
        resolve(&call),
        Err(PathError::UnsupportedPathExpression { .. })
    ));
}

#[test]
fn test_malformed_text_paths() {
    let err = "Address..City".parse::<PropertyPath>().unwrap_err();
    assert!(matches!(err, PathError::Malformed { .. }));
    assert!(err.to_string().contains("Address..City"));
}
