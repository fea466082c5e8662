//! The runtime object model through its Rust API: property storage, prototype chains and the
//! conversion operations compiled code relies on.

extern crate kiln;

use kiln::runner::ds::array_object::ARRAY_LENGTH_PROP;
use kiln::runner::ds::execution_context::EvalContext;
use kiln::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use kiln::runner::ds::operations::object::{
    create_array, create_object, create_object_with_prototype, create_wrapper, delete_property,
    enumerate_keys, get, get_prototype_of, get_v, has_own_property, has_property,
    set, set_prototype_of,
};
use kiln::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, add, less_than, same_value, strict_equality_comparison,
};
use kiln::runner::ds::operations::type_conversion::{
    to_boolean, to_int32, to_number, to_property_key, to_string, to_uint32,
};
use kiln::runner::ds::value::JsValue;

fn key(name: &str) -> PropertyKey {
    PropertyKey::new(name)
}

#[test]
fn test_key_order_survives_overwrite() {
    let mut ctx = EvalContext::default();
    let o = create_object(&mut ctx).unwrap();
    for name in ["z", "10", "a", "2", "m"] {
        set(&o, key(name), JsValue::Number(1.0));
    }
    set(&o, key("z"), JsValue::Number(2.0));
    assert_eq!(enumerate_keys(&o), vec!["z", "a", "m", "2", "10"]);
    assert_eq!(get(&o, &key("z")), JsValue::Number(2.0));
}

#[test]
fn test_canonical_index_keys() {
    assert_eq!(key("7"), PropertyKey::Int(7));
    assert_eq!(key("07"), PropertyKey::Str("07".to_string()));
    assert_eq!(key("4294967295"), PropertyKey::Str("4294967295".to_string()));
    assert_eq!(to_property_key(&JsValue::Number(3.0)), PropertyKey::Int(3));
    assert_eq!(to_property_key(&JsValue::Number(1.5)), key("1.5"));
}

#[test]
fn test_get_walks_prototypes_but_set_does_not() {
    let mut ctx = EvalContext::default();
    let proto = create_object(&mut ctx).unwrap();
    set(&proto, key("p"), JsValue::from("inherited"));
    let child = create_object_with_prototype(&mut ctx, Some(proto.clone()), 0).unwrap();

    assert_eq!(get(&child, &key("p")), JsValue::from("inherited"));
    assert!(has_property(&child, &key("p")));
    assert!(!has_own_property(&child, &key("p")));

    set(&child, key("p"), JsValue::from("own"));
    assert_eq!(get(&child, &key("p")), JsValue::from("own"));
    assert_eq!(get(&proto, &key("p")), JsValue::from("inherited"));
    assert_eq!(get(&child, &key("nothing")), JsValue::Undefined);
}

#[test]
fn test_frozen_property_refuses_writes_and_deletes() {
    let mut ctx = EvalContext::default();
    let o = create_object(&mut ctx).unwrap();
    (*o).borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .define_own_property(key("k"), PropertyDescriptor::new_frozen(JsValue::Number(1.0)));

    assert!(!set(&o, key("k"), JsValue::Number(2.0)));
    assert_eq!(get(&o, &key("k")), JsValue::Number(1.0));
    assert!(!delete_property(&o, &key("k")));
    assert!(enumerate_keys(&o).is_empty());
}

#[test]
fn test_non_extensible_object_refuses_new_keys() {
    let mut ctx = EvalContext::default();
    let o = create_object(&mut ctx).unwrap();
    set(&o, key("a"), JsValue::Number(1.0));
    (*o).borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .prevent_extensions();
    assert!(!set(&o, key("b"), JsValue::Number(1.0)));
    assert!(set(&o, key("a"), JsValue::Number(2.0)));
    let other = create_object(&mut ctx).unwrap();
    assert!(!set_prototype_of(&o, Some(other)));
}

#[test]
fn test_set_prototype_of_rejects_cycles() {
    let mut ctx = EvalContext::default();
    let a = create_object(&mut ctx).unwrap();
    let b = create_object_with_prototype(&mut ctx, Some(a.clone()), 0).unwrap();
    assert!(!set_prototype_of(&a, Some(b.clone())));
    assert!(!set_prototype_of(&a, Some(a.clone())));
    assert!(set_prototype_of(&b, None));
    assert!(get_prototype_of(&b).is_none());
}

#[test]
fn test_array_length_tracks_indices() {
    let mut ctx = EvalContext::default();
    let arr = create_array(
        &mut ctx,
        vec![Some(JsValue::Number(1.0)), None, Some(JsValue::Number(3.0))],
    )
    .unwrap();
    assert_eq!(get(&arr, &ARRAY_LENGTH_PROP), JsValue::Number(3.0));
    assert!(!has_own_property(&arr, &PropertyKey::Int(1)));

    set(&arr, PropertyKey::Int(5), JsValue::Number(6.0));
    assert_eq!(get(&arr, &ARRAY_LENGTH_PROP), JsValue::Number(6.0));

    set(&arr, ARRAY_LENGTH_PROP.clone(), JsValue::Number(1.0));
    assert_eq!(get(&arr, &PropertyKey::Int(2)), JsValue::Undefined);
    assert_eq!(enumerate_keys(&arr), vec!["0"]);
}

#[test]
fn test_string_values_expose_length_and_indices() {
    let mut ctx = EvalContext::default();
    let s = JsValue::from("héllo");
    assert_eq!(get_v(&ctx, &s, &ARRAY_LENGTH_PROP).unwrap(), JsValue::Number(5.0));
    assert_eq!(get_v(&ctx, &s, &PropertyKey::Int(1)).unwrap(), JsValue::from("é"));
    assert!(get_v(&ctx, &JsValue::Null, &key("x")).is_err());

    let wrapper = create_wrapper(&mut ctx, JsValue::from("ab")).unwrap();
    assert_eq!(enumerate_keys(&wrapper), vec!["0", "1"]);
    assert!(!set(&wrapper, PropertyKey::Int(0), JsValue::from("z")));
}

#[test]
fn test_conversions() {
    assert_eq!(to_number(&JsValue::from("  12  ")), 12.0);
    assert_eq!(to_number(&JsValue::from("0x1F")), 31.0);
    assert_eq!(to_number(&JsValue::from("")), 0.0);
    assert!(to_number(&JsValue::from("12px")).is_nan());
    assert!(to_number(&JsValue::Undefined).is_nan());
    assert_eq!(to_int32(&JsValue::Number(4294967295.0)), -1);
    assert_eq!(to_uint32(&JsValue::Number(-1.0)), 4294967295);
    assert_eq!(to_string(&JsValue::Number(1.0)), "1");
    assert_eq!(to_string(&JsValue::Number(-0.0)), "0");
    assert_eq!(to_string(&JsValue::Number(0.1 + 0.2)), "0.30000000000000004");
    assert_eq!(to_string(&JsValue::Number(1e21)), "1e+21");
    assert!(!to_boolean(&JsValue::Number(f64::NAN)));
    assert!(!to_boolean(&JsValue::from("")));
    assert!(to_boolean(&JsValue::from("0")));
}

#[test]
fn test_wrappers_convert_to_their_primitive() {
    let mut ctx = EvalContext::default();
    let n = JsValue::Object(create_wrapper(&mut ctx, JsValue::Number(1.0)).unwrap());
    let empty = JsValue::Object(create_wrapper(&mut ctx, JsValue::from("")).unwrap());
    assert_eq!(to_number(&n), 1.0);
    assert!(to_boolean(&empty));
    assert_eq!(add(&n, &JsValue::Number(1.0)), JsValue::Number(2.0));
    assert!(abstract_equality_comparison(&n, &JsValue::Number(1.0)));
    assert!(!strict_equality_comparison(&n, &JsValue::Number(1.0)));
}

#[test]
fn test_comparisons() {
    assert!(abstract_equality_comparison(&JsValue::Null, &JsValue::Undefined));
    assert!(!abstract_equality_comparison(&JsValue::Null, &JsValue::Number(0.0)));
    assert!(abstract_equality_comparison(&JsValue::from("1"), &JsValue::Boolean(true)));
    assert!(!strict_equality_comparison(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
    assert!(same_value(&JsValue::Number(f64::NAN), &JsValue::Number(f64::NAN)));
    assert!(!same_value(&JsValue::Number(0.0), &JsValue::Number(-0.0)));
    assert!(less_than(&JsValue::from("a"), &JsValue::from("b")));
    assert!(!less_than(&JsValue::Number(f64::NAN), &JsValue::Number(1.0)));
    assert_eq!(add(&JsValue::from("a"), &JsValue::Number(1.0)), JsValue::from("a1"));
}
