use super::*;
use serde_json::json;

#[test]
fn test_normalize_str() {
    assert_eq!(normalize_str("  Café au Lait "), "cafeaulait");
    assert_eq!(normalize_str("ÅNGSTRÖM"), "angstrom");
    assert_eq!(normalize_str("tab\tand\nnewline"), "tabandnewline");
    assert_eq!(normalize_str(""), "");
}

#[test]
fn test_str_equals_insensitive() {
    assert!(str_equals("café ", "Cafe"));
    assert!(str_equals("Hello World", "helloworld"));
    assert!(str_equals("naïve", "NAIVE"));
    assert!(!str_equals("cafe", "cafes"));
}

#[test]
fn test_str_contains() {
    assert!(str_contains("Total: 12 Crème brûlée", "creme brulee"));
    assert!(str_contains("anything", ""));
    assert!(!str_contains("abc", "abd"));
}

#[test]
fn test_any_equals_strings() {
    assert!(any_equals(&json!("café "), &json!("Cafe")));
    assert!(!any_equals(&json!("a"), &json!("b")));
}

#[test]
fn test_any_equals_scalars_coerced() {
    assert!(any_equals(&json!(1), &json!("1")));
    assert!(any_equals(&json!(1.0), &json!("1")));
    assert!(any_equals(&json!(1), &json!(1.0)));
    assert!(any_equals(&json!(true), &json!("TRUE")));
    assert!(any_equals(&json!(null), &json!("")));
    assert!(!any_equals(&json!(2), &json!("3")));
    assert!(any_equals(&json!(2.5), &json!("2.5")));
}

#[test]
fn test_any_equals_objects_deep() {
    let a = json!({ "name": "Zoë", "tags": ["A", "b"], "nested": { "n": 1 } });
    let b = json!({ "tags": ["a", "B"], "name": "zoe", "nested": { "n": "1" } });
    assert!(any_equals(&a, &b));

    let missing = json!({ "name": "zoe" });
    assert!(!any_equals(&a, &missing));

    let extra = json!({ "name": "zoe", "tags": ["a", "b"], "nested": { "n": 1 }, "x": 1 });
    assert!(!any_equals(&a, &extra));
}

#[test]
fn test_any_equals_arrays_ordered() {
    assert!(any_equals(&json!([1, "a"]), &json!(["1", "A"])));
    assert!(!any_equals(&json!([1, 2]), &json!([2, 1])));
    assert!(!any_equals(&json!([1]), &json!([1, 1])));
}

#[test]
fn test_any_equals_mixed_structures() {
    assert!(!any_equals(&json!([]), &json!({})));
    assert!(!any_equals(&json!({ "a": 1 }), &json!("{\"a\":1}")));
    assert!(!any_equals(&json!(["x"]), &json!("x")));
}

#[test]
fn test_any_equals_symmetry() {
    let values = vec![
        json!(null),
        json!(""),
        json!(0),
        json!("0"),
        json!(1.5),
        json!(true),
        json!("True "),
        json!("Crème"),
        json!("creme"),
        json!([1, "x"]),
        json!(["1", "X"]),
        json!({ "a": "É" }),
        json!({ "a": "e" }),
        json!({}),
        json!([]),
    ];
    for a in &values {
        for b in &values {
            assert_eq!(any_equals(a, b), any_equals(b, a), "{} vs {}", a, b);
        }
    }
}

#[test]
fn test_any_contains_string() {
    assert!(any_contains(&json!("Order #123 confirmed"), &json!("CONFIRMED")));
    assert!(any_contains(&json!(12345), &json!(234)));
    assert!(!any_contains(&json!("abc"), &json!(["a"])));
}

#[test]
fn test_any_contains_array() {
    assert!(any_contains(&json!(["Apple", "Pear"]), &json!("apple")));
    assert!(any_contains(&json!([{ "a": 1 }]), &json!({ "a": "1" })));
    assert!(!any_contains(&json!(["Apple pie"]), &json!("apple")));
}

#[test]
fn test_any_contains_object() {
    let haystack = json!({ "name": "Ana", "age": 30, "city": "Lyon" });
    assert!(any_contains(&haystack, &json!({ "name": "ana", "city": "LYON" })));
    assert!(!any_contains(&haystack, &json!({ "name": "ana", "zip": "1" })));
    assert!(any_contains(&haystack, &json!("30")));
    assert!(!any_contains(&haystack, &json!("Paris")));
}

#[test]
fn test_coerce_str() {
    assert_eq!(coerce_str(&json!("x")), "x");
    assert_eq!(coerce_str(&json!(null)), "");
    assert_eq!(coerce_str(&json!(3.0)), "3");
    assert_eq!(coerce_str(&json!(3.25)), "3.25");
    assert_eq!(coerce_str(&json!(-7)), "-7");
    assert_eq!(coerce_str(&json!(false)), "false");
}
