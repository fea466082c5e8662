//! The property protocol compiled code calls into: Get, Set, Delete, key enumeration,
//! prototype traversal and object construction.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::runner::ds::array_object::ArrayObject;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::execution_context::EvalContext;
use crate::runner::ds::function_object::{
    FunctionKind, FunctionObject, NativeFn, NativeFunction, ScriptFunction,
};
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase, ObjectType};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::type_conversion::to_string;
use crate::runner::ds::scope::ScopeRef;
use crate::runner::ds::value::JsValue;
use crate::runner::ds::wrapper_object::{string_code_unit_at, WrapperObject};
use crate::runner::jit::bytecode::FunctionChunk;

lazy_static! {
    pub static ref PROTOTYPE_PROP: PropertyKey = PropertyKey::Str("prototype".to_string());
    pub static ref CONSTRUCTOR_PROP: PropertyKey = PropertyKey::Str("constructor".to_string());
    static ref LENGTH_PROP: PropertyKey = PropertyKey::Str("length".to_string());
}

/// Hops walked before the chain walker starts remembering objects. Real chains are a handful
/// of objects long, so the common case never allocates.
const UNCHECKED_HOPS: usize = 32;

/// Iterates an object followed by its prototypes. Stops at the end of the chain, or when an
/// object comes round a second time.
pub struct PrototypeChain {
    next: Option<JsObjectType>,
    hops: usize,
    visited: Option<FxHashSet<*const RefCell<ObjectType>>>,
}

impl Iterator for PrototypeChain {
    type Item = JsObjectType;

    fn next(&mut self) -> Option<JsObjectType> {
        let current = self.next.take()?;
        self.hops += 1;
        if self.hops > UNCHECKED_HOPS {
            let visited = self.visited.get_or_insert_with(FxHashSet::default);
            if !visited.insert(Rc::as_ptr(&current)) {
                log::debug!("prototype cycle detected after {} hops", self.hops);
                return None;
            }
        }
        self.next = (*current)
            .borrow()
            .as_js_object()
            .get_object_base()
            .get_prototype();
        Some(current)
    }
}

pub fn prototype_chain(o: &JsObjectType) -> PrototypeChain {
    PrototypeChain {
        next: Some(o.clone()),
        hops: 0,
        visited: None,
    }
}

/// `[[Get]]`: own property first, then the prototype chain. A miss anywhere, including on a
/// cyclic chain, is `undefined`.
pub fn get(o: &JsObjectType, p: &PropertyKey) -> JsValue {
    for obj in prototype_chain(o) {
        if let Some(v) = (*obj).borrow().as_js_object().get_own_value(p) {
            return v;
        }
    }
    JsValue::Undefined
}

/// Get on an arbitrary value. Primitives read through their prototype; strings also expose
/// `length` and their characters.
pub fn get_v(ctx: &EvalContext, v: &JsValue, p: &PropertyKey) -> Result<JsValue, JErrorType> {
    match v {
        JsValue::Object(o) | JsValue::Function(o) => Ok(get(o, p)),
        JsValue::String(s) => {
            if *p == *LENGTH_PROP {
                return Ok(JsValue::Number(s.encode_utf16().count() as f64));
            }
            if let PropertyKey::Int(i) = p {
                if let Some(unit) = string_code_unit_at(s, *i) {
                    return Ok(JsValue::String(unit));
                }
            }
            Ok(get(&ctx.realm.string_prototype, p))
        }
        JsValue::Number(_) => Ok(get(&ctx.realm.number_prototype, p)),
        JsValue::Boolean(_) => Ok(get(&ctx.realm.boolean_prototype, p)),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot read property '{}' of {}",
            p, v
        ))),
    }
}

/// `[[Set]]` on the receiver's own bag. Prototypes are never written through.
pub fn set(o: &JsObjectType, p: PropertyKey, v: JsValue) -> bool {
    (**o).borrow_mut().as_js_object_mut().set_own_value(p, v)
}

/// Assignment to a property of an arbitrary value. Writes to primitives are dropped.
pub fn put_v(target: &JsValue, p: PropertyKey, v: JsValue) -> Result<bool, JErrorType> {
    match target {
        JsValue::Object(o) | JsValue::Function(o) => Ok(set(o, p, v)),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "Cannot set property '{}' of {}",
            p, target
        ))),
        _ => Ok(false),
    }
}

/// Removes an own property. Returns whether a property was actually removed: a missing key
/// and a non-configurable property both give `false`, and the latter stays in place.
pub fn delete_property(o: &JsObjectType, p: &PropertyKey) -> bool {
    (**o).borrow_mut().as_js_object_mut().delete_own_property(p)
}

pub fn has_own_property(o: &JsObjectType, p: &PropertyKey) -> bool {
    (**o).borrow().as_js_object().has_own_property(p)
}

pub fn has_property(o: &JsObjectType, p: &PropertyKey) -> bool {
    prototype_chain(o).any(|obj| (*obj).borrow().as_js_object().has_own_property(p))
}

/// Own enumerable keys: named keys in insertion order, then index keys ascending.
pub fn enumerate_keys(o: &JsObjectType) -> Vec<String> {
    (**o)
        .borrow()
        .as_js_object()
        .own_keys()
        .into_iter()
        .filter(|(_, enumerable)| *enumerable)
        .map(|(k, _)| k.to_string())
        .collect()
}

/// The keys a `for-in` loop visits: own keys before inherited ones, each name at most once.
///
/// A name seen on a nearer object hides the same name further up the chain even when the
/// nearer property is not enumerable.
pub fn for_in_keys(o: &JsObjectType) -> Vec<String> {
    let mut seen: FxHashSet<String> = FxHashSet::default();
    let mut keys = Vec::new();
    for obj in prototype_chain(o) {
        for (k, enumerable) in (*obj).borrow().as_js_object().own_keys() {
            let name = k.to_string();
            if seen.insert(name.clone()) && enumerable {
                keys.push(name);
            }
        }
    }
    keys
}

/// Joins the elements `0..len` of `o` with `separator`. Undefined, null and missing elements
/// become empty strings.
///
/// Only index keys that exist somewhere on the chain are read, so the work follows the
/// populated elements rather than `len`.
pub fn join_elements(o: &JsObjectType, len: u32, separator: &str) -> String {
    let mut indices: BTreeSet<u32> = BTreeSet::new();
    for obj in prototype_chain(o) {
        for (k, _) in (*obj).borrow().as_js_object().own_keys() {
            if let PropertyKey::Int(i) = k {
                if i < len {
                    indices.insert(i);
                }
            }
        }
    }
    let mut out = String::new();
    let mut written = 0;
    for i in indices {
        push_separators(&mut out, separator, i - written);
        written = i;
        match get(o, &PropertyKey::Int(i)) {
            JsValue::Undefined | JsValue::Null => {}
            v => out.push_str(&to_string(&v)),
        }
    }
    if len > 0 {
        push_separators(&mut out, separator, len - 1 - written);
    }
    out
}

fn push_separators(out: &mut String, separator: &str, count: u32) {
    if !separator.is_empty() && count > 0 {
        out.push_str(&separator.repeat(count as usize));
    }
}

pub fn get_prototype_of(o: &JsObjectType) -> Option<JsObjectType> {
    (**o).borrow().as_js_object().get_object_base().get_prototype()
}

/// Changes the prototype link. Refused (false) when the object is not extensible or when the
/// new chain would lead back to `o`.
pub fn set_prototype_of(o: &JsObjectType, prototype: Option<JsObjectType>) -> bool {
    let current = get_prototype_of(o);
    let unchanged = match (&current, &prototype) {
        (None, None) => true,
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    };
    if unchanged {
        return true;
    }
    if !(**o).borrow().as_js_object().get_object_base().is_extensible() {
        return false;
    }
    if let Some(p) = &prototype {
        // To prevent circular chain
        if prototype_chain(p).any(|link| Rc::ptr_eq(&link, o)) {
            return false;
        }
    }
    (**o)
        .borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .set_prototype_unchecked(prototype);
    true
}

/// Installs a non-enumerable property, the way built-in methods are attached.
pub fn define_hidden_property(o: &JsObjectType, name: &str, value: JsValue) {
    (**o)
        .borrow_mut()
        .as_js_object_mut()
        .get_object_base_mut()
        .define_own_property(PropertyKey::new(name), PropertyDescriptor::new_hidden(value));
}

fn wrap(o: ObjectType) -> JsObjectType {
    Rc::new(RefCell::new(o))
}

pub fn create_object(ctx: &mut EvalContext) -> Result<JsObjectType, JErrorType> {
    let prototype = ctx.realm.object_prototype.clone();
    create_object_with_prototype(ctx, Some(prototype), 0)
}

pub fn create_object_with_prototype(
    ctx: &mut EvalContext,
    prototype: Option<JsObjectType>,
    capacity: usize,
) -> Result<JsObjectType, JErrorType> {
    ctx.heap.allocate_object(capacity)?;
    Ok(wrap(ObjectType::Ordinary(ObjectBase::new(prototype))))
}

/// Builds an array from already-evaluated elements. `None` leaves a hole at that index.
pub fn create_array(
    ctx: &mut EvalContext,
    elements: Vec<Option<JsValue>>,
) -> Result<JsObjectType, JErrorType> {
    ctx.heap.allocate_object(elements.len())?;
    let mut array = ArrayObject::new(Some(ctx.realm.array_prototype.clone()));
    let len = elements.len() as u32;
    for (i, element) in elements.into_iter().enumerate() {
        if let Some(v) = element {
            array.set_own_value(PropertyKey::Int(i as u32), v);
        }
    }
    array.set_length(len);
    Ok(wrap(ObjectType::Array(array)))
}

pub fn create_wrapper(ctx: &mut EvalContext, primitive: JsValue) -> Result<JsObjectType, JErrorType> {
    let prototype = match &primitive {
        JsValue::String(_) => ctx.realm.string_prototype.clone(),
        JsValue::Number(_) => ctx.realm.number_prototype.clone(),
        JsValue::Boolean(_) => ctx.realm.boolean_prototype.clone(),
        _ => ctx.realm.object_prototype.clone(),
    };
    ctx.heap.allocate_object(0)?;
    Ok(wrap(ObjectType::Wrapper(WrapperObject::new(
        primitive,
        Some(prototype),
    ))))
}

/// `ToObject`: objects pass through, primitives are boxed, `undefined`/`null` throw.
pub fn to_object(ctx: &mut EvalContext, v: &JsValue) -> Result<JsObjectType, JErrorType> {
    match v {
        JsValue::Object(o) | JsValue::Function(o) => Ok(o.clone()),
        JsValue::Undefined | JsValue::Null => Err(JErrorType::TypeError(format!(
            "'{}' cannot be converted to object",
            v
        ))),
        _ => create_wrapper(ctx, v.clone()),
    }
}

/// A closure over `scope`, with a fresh `prototype` object linked back through `constructor`.
pub fn create_script_function(
    ctx: &mut EvalContext,
    code: Rc<FunctionChunk>,
    scope: Option<ScopeRef>,
) -> Result<JsObjectType, JErrorType> {
    ctx.heap.allocate_object(1)?;
    let base = ObjectBase::new(Some(ctx.realm.function_prototype.clone()));
    let function = wrap(ObjectType::Function(FunctionObject::new(
        FunctionKind::Script(ScriptFunction { code, scope }),
        base,
    )));
    let prototype = create_object(ctx)?;
    define_hidden_property(&prototype, "constructor", JsValue::Function(function.clone()));
    define_hidden_property(&function, "prototype", JsValue::Object(prototype));
    Ok(function)
}

/// A built-in function. Built-ins are part of the realm and are not charged to the heap.
pub fn create_native_function(
    function_prototype: &JsObjectType,
    name: &str,
    call: NativeFn,
    construct: Option<NativeFn>,
) -> JsObjectType {
    let base = ObjectBase::new(Some(function_prototype.clone()));
    wrap(ObjectType::Function(FunctionObject::new(
        FunctionKind::Native(NativeFunction {
            name: name.to_string(),
            call,
            construct,
        }),
        base,
    )))
}

/// `v instanceof constructor`.
pub fn instance_of(v: &JsValue, constructor: &JsValue) -> Result<bool, JErrorType> {
    let c = match constructor {
        JsValue::Function(c) => c,
        _ => {
            return Err(JErrorType::TypeError(format!(
                "Right-hand side of 'instanceof' is not callable: {}",
                constructor
            )))
        }
    };
    let o = match v.as_object() {
        Some(o) => o,
        None => return Ok(false),
    };
    let prototype = match get(c, &PROTOTYPE_PROP) {
        JsValue::Object(p) | JsValue::Function(p) => p,
        _ => {
            return Err(JErrorType::TypeError(
                "Function has non-object prototype in instanceof check".to_string(),
            ))
        }
    };
    let found = match get_prototype_of(o) {
        Some(first) => prototype_chain(&first).any(|link| Rc::ptr_eq(&link, &prototype)),
        None => false,
    };
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_ctx() -> EvalContext {
        EvalContext::default()
    }

    fn named(s: &str) -> PropertyKey {
        PropertyKey::new(s)
    }

    #[test]
    fn test_get_after_set_is_idempotent() {
        let mut ctx = new_ctx();
        let o = create_object(&mut ctx).unwrap();
        for _ in 0..3 {
            assert!(set(&o, named("k"), JsValue::Number(9.0)));
            assert_eq!(get(&o, &named("k")), JsValue::Number(9.0));
        }
        assert_eq!(enumerate_keys(&o), vec!["k"]);
    }

    #[test]
    fn test_missing_property_is_undefined() {
        let mut ctx = new_ctx();
        let o = create_object(&mut ctx).unwrap();
        assert_eq!(get(&o, &named("nope")), JsValue::Undefined);
    }

    #[test]
    fn test_set_shadows_prototype() {
        let mut ctx = new_ctx();
        let proto = create_object(&mut ctx).unwrap();
        set(&proto, named("a"), JsValue::Number(1.0));
        let child = create_object_with_prototype(&mut ctx, Some(proto.clone()), 0).unwrap();
        assert_eq!(get(&child, &named("a")), JsValue::Number(1.0));
        set(&child, named("a"), JsValue::Number(2.0));
        assert_eq!(get(&child, &named("a")), JsValue::Number(2.0));
        assert_eq!(get(&proto, &named("a")), JsValue::Number(1.0));
        assert!(delete_property(&child, &named("a")));
        assert_eq!(get(&child, &named("a")), JsValue::Number(1.0));
        assert!(!delete_property(&child, &named("a")));
    }

    #[test]
    fn test_join_elements_skips_holes_without_visiting_them() {
        let mut ctx = new_ctx();
        let arr = create_array(
            &mut ctx,
            vec![Some(JsValue::Number(1.0)), None, Some(JsValue::Null)],
        )
        .unwrap();
        set(&arr, PropertyKey::Int(5), JsValue::from("x"));
        assert_eq!(join_elements(&arr, 6, "-"), "1----x");
        assert_eq!(join_elements(&arr, 2, ","), "1,");
        assert_eq!(join_elements(&arr, 0, ","), "");
        assert_eq!(join_elements(&arr, 4_000_000_000, ""), "1x");
    }

    #[test]
    fn test_for_in_keys_walk_chain_once_per_name() {
        let mut ctx = new_ctx();
        let proto = create_object(&mut ctx).unwrap();
        set(&proto, named("x"), JsValue::Number(1.0));
        set(&proto, named("shared"), JsValue::Number(1.0));
        let child = create_object_with_prototype(&mut ctx, Some(proto), 0).unwrap();
        set(&child, named("shared"), JsValue::Number(2.0));
        set(&child, named("own"), JsValue::Number(3.0));
        assert_eq!(enumerate_keys(&child), vec!["shared", "own"]);
        assert_eq!(for_in_keys(&child), vec!["shared", "own", "x"]);
    }

    #[test]
    fn test_hidden_property_still_shadows() {
        let mut ctx = new_ctx();
        let proto = create_object(&mut ctx).unwrap();
        set(&proto, named("m"), JsValue::Null);
        let child = create_object_with_prototype(&mut ctx, Some(proto), 0).unwrap();
        define_hidden_property(&child, "m", JsValue::Null);
        assert!(for_in_keys(&child).is_empty());
    }

    #[test]
    fn test_cyclic_chain_is_rejected_and_tolerated() {
        let mut ctx = new_ctx();
        let a = create_object_with_prototype(&mut ctx, None, 0).unwrap();
        let b = create_object_with_prototype(&mut ctx, Some(a.clone()), 0).unwrap();
        assert!(!set_prototype_of(&a, Some(b.clone())));

        // Build the cycle behind the protocol's back.
        (*a).borrow_mut()
            .as_js_object_mut()
            .get_object_base_mut()
            .set_prototype_unchecked(Some(b.clone()));
        set(&a, named("onA"), JsValue::Number(1.0));
        assert_eq!(get(&b, &named("missing")), JsValue::Undefined);
        assert_eq!(get(&b, &named("onA")), JsValue::Number(1.0));
        assert_eq!(for_in_keys(&b), vec!["onA"]);
        assert!(!has_property(&b, &named("missing")));
    }

    #[test]
    fn test_array_literal_holes_and_length() {
        let mut ctx = new_ctx();
        let arr = create_array(
            &mut ctx,
            vec![Some(JsValue::Number(1.0)), None, Some(JsValue::Number(3.0))],
        )
        .unwrap();
        assert_eq!(get(&arr, &named("length")), JsValue::Number(3.0));
        assert_eq!(enumerate_keys(&arr), vec!["0", "2"]);
        assert!(!has_own_property(&arr, &PropertyKey::Int(1)));
    }

    #[test]
    fn test_instance_of_follows_chain() {
        let mut ctx = new_ctx();
        let ctor = create_native_function(
            &ctx.realm.function_prototype.clone(),
            "F",
            |_, _, _| Ok(JsValue::Undefined),
            None,
        );
        let proto = create_object(&mut ctx).unwrap();
        define_hidden_property(&ctor, "prototype", JsValue::Object(proto.clone()));
        let instance = create_object_with_prototype(&mut ctx, Some(proto), 0).unwrap();
        let f = JsValue::Function(ctor);
        assert_eq!(instance_of(&JsValue::Object(instance), &f), Ok(true));
        assert_eq!(instance_of(&JsValue::Number(1.0), &f), Ok(false));
        assert!(instance_of(&JsValue::Null, &JsValue::Number(1.0)).is_err());
    }

    #[test]
    fn test_heap_limit_stops_allocation() {
        let config = crate::runner::config::EngineConfig::default()
            .with_heap(crate::runner::ds::heap::HeapConfig::with_limit(100));
        let mut ctx = EvalContext::new(&config);
        assert!(create_object(&mut ctx).is_ok());
        assert_eq!(
            create_object(&mut ctx).err(),
            Some(JErrorType::RangeError("Out of memory".to_string()))
        );
    }
}
