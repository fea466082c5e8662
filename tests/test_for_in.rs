//! for-in enumeration: snapshot semantics, shadowing, unwinding through break/continue.

extern crate kiln;

use kiln::runner::api::Engine;
use kiln::runner::config::EngineConfig;
use kiln::runner::ds::execution_context::EvalContext;
use kiln::runner::ds::object_property::PropertyKey;
use kiln::runner::ds::operations::object::{create_object, for_in_keys, get, set};
use kiln::runner::ds::value::JsValue;

/// Runs `code` and returns everything it passed to `emit`.
fn emitted(code: &str) -> String {
    let mut engine = Engine::new(EngineConfig::default());
    if let Err(e) = engine.run(code) {
        panic!("{} failed: {}", code, e);
    }
    engine.take_output()
}

// ============================================================================
// Basic enumeration
// ============================================================================

#[test]
fn test_keys_in_definition_order() {
    let code = "foo = { a: 1, b: 2, c: 3 }; for (key in foo) { emit(key); }";
    assert_eq!(emitted(code), "abc");
}

#[test]
fn test_values_read_through_loop_key() {
    let code = "foo = { a: 1, b: 2, c: 3 }; for (key in foo) { emit(foo[key]); }";
    assert_eq!(emitted(code), "123");
}

#[test]
fn test_nested_for_in() {
    let code = r#"
        var foo = { bar: { a: 1, b: 2 }, boo: { c: 3, d: 4 } };
        for (var key in foo) {
            for (var inner in foo[key]) {
                emit(inner);
            }
        }
    "#;
    assert_eq!(emitted(code), "abcd");
}

#[test]
fn test_break_leaves_after_first_key() {
    let code = "var foo = { a: 1, b: 2, c: 3 }; for (key in foo) { emit(key); break; }";
    assert_eq!(emitted(code), "a");
}

#[test]
fn test_continue_skips_rest_of_body() {
    let code = r#"
        var foo = { a: 1, b: 2, c: 3 };
        for (key in foo) {
            if (key == 'b') continue;
            emit(key);
        }
    "#;
    assert_eq!(emitted(code), "ac");
}

#[test]
fn test_named_keys_before_indices() {
    let code = "var o = { b: 1, 2: 1, a: 1, 0: 1 }; for (var k in o) emit(k + ';')";
    assert_eq!(emitted(code), "b;a;0;2;");
}

#[test]
fn test_inherited_keys_follow_own_keys() {
    let code = r#"
        var proto = { inherited: 1, shared: 1 };
        var o = Object.create(proto);
        o.own = 1;
        o.shared = 2;
        for (var k in o) emit(k + ' ');
    "#;
    assert_eq!(emitted(code), "own shared inherited ");
}

// ============================================================================
// Snapshot semantics
// ============================================================================

#[test]
fn test_deleted_key_is_skipped() {
    let code = r#"
        var o = { a: 1, b: 2, c: 3 };
        for (var k in o) {
            emit(k);
            delete o.c;
        }
    "#;
    assert_eq!(emitted(code), "ab");
}

#[test]
fn test_added_key_is_not_visited() {
    let code = "var o = { a: 1 }; for (var k in o) { o.z = 1; emit(k); } emit(o.z)";
    assert_eq!(emitted(code), "a1");
}

#[test]
fn test_nullish_iterates_zero_times() {
    let code = r#"
        for (var k in null) emit(k);
        for (var k in undefined) emit(k);
        emit('done');
    "#;
    assert_eq!(emitted(code), "done");
}

#[test]
fn test_primitives_enumerate_through_wrapper() {
    assert_eq!(emitted("for (var i in 'hi') emit(i)"), "01");
    assert_eq!(emitted("for (var i in 42) emit(i); emit('!')"), "!");
}

#[test]
fn test_array_holes_are_not_keys() {
    assert_eq!(emitted("var a = [5, , 7]; for (var i in a) emit(i)"), "02");
}

// ============================================================================
// Targets and unwinding
// ============================================================================

#[test]
fn test_member_target() {
    let code = "var t = {}; for (t.k in { z: 1 }) ; emit(t.k)";
    assert_eq!(emitted(code), "z");
}

#[test]
fn test_continue_outer_releases_inner_iterator() {
    let code = r#"
        outer: for (var a in { x: 1, y: 1 }) {
            for (var b in { p: 1, q: 1 }) {
                emit(a + b);
                continue outer;
            }
        }
    "#;
    assert_eq!(emitted(code), "xpyp");
}

#[test]
fn test_break_outer_from_nested_for_in() {
    let code = r#"
        outer: for (var a in { x: 1, y: 1 }) {
            for (var b in { p: 1, q: 1 }) {
                if (a == 'y') break outer;
                emit(a + b);
            }
        }
        emit('.');
    "#;
    assert_eq!(emitted(code), "xpxq.");
}

#[test]
fn test_labelled_break_and_continue_on_nested_objects() {
    let foo = "foo = { bar: { a: 1, b: 2 }, boo: { c: 3, d: 4 } };";
    let broken = format!(
        "{} outer: for (k1 in foo) {{ inner: for (k2 in foo[k1]) {{ if (k2 == 'b') break outer; emit(k2); }} }}",
        foo
    );
    assert_eq!(emitted(&broken), "a");
    let continued = format!(
        "{} outer: for (k1 in foo) {{ inner: for (k2 in foo[k1]) {{ if (k2 == 'b') continue outer; emit(k2); }} }}",
        foo
    );
    assert_eq!(emitted(&continued), "acd");
}

#[test]
fn test_return_from_inside_for_in() {
    let code = r#"
        function first(o) {
            for (var k in o) return k;
            return 'none';
        }
        emit(first({ m: 1, n: 2 }));
        emit(first({}));
    "#;
    assert_eq!(emitted(code), "mnone");
}

#[test]
fn test_loop_variable_in_closure_scope() {
    let code = r#"
        function keys(o) {
            var out = '';
            for (var k in o) out += k;
            return out;
        }
        emit(keys({ a: 1, b: 2 }));
    "#;
    assert_eq!(emitted(code), "ab");
}

// ============================================================================
// Cyclic prototype chains
// ============================================================================

#[test]
fn test_cyclic_chain_terminates() {
    let mut ctx = EvalContext::default();
    let a = create_object(&mut ctx).unwrap();
    let b = create_object(&mut ctx).unwrap();
    set(&a, PropertyKey::new("fromA"), JsValue::Number(1.0));
    set(&b, PropertyKey::new("fromB"), JsValue::Number(2.0));
    // The checked API refuses this, so build the loop directly in storage.
    (*a).borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .set_prototype_unchecked(Some(b.clone()));
    (*b).borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .set_prototype_unchecked(Some(a.clone()));

    assert_eq!(for_in_keys(&a), vec!["fromA".to_string(), "fromB".to_string()]);
    assert_eq!(get(&a, &PropertyKey::new("missing")), JsValue::Undefined);
    assert_eq!(get(&a, &PropertyKey::new("fromB")), JsValue::Number(2.0));
}
