use crate::runner::ds::array_object::ARRAY_LENGTH_PROP;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::value::JsValue;

/// A `String`, `Number` or `Boolean` object boxing a primitive (`new String("ab")`).
///
/// String wrappers expose their UTF-16 code units as read-only index properties and a
/// read-only `length`.
pub struct WrapperObject {
    base: ObjectBase,
    primitive: JsValue,
}

impl WrapperObject {
    pub fn new(primitive: JsValue, prototype: Option<JsObjectType>) -> Self {
        WrapperObject {
            base: ObjectBase::new(prototype),
            primitive,
        }
    }

    pub fn primitive_value(&self) -> &JsValue {
        &self.primitive
    }

    fn string_len(&self) -> Option<u32> {
        match &self.primitive {
            JsValue::String(s) => Some(s.encode_utf16().count() as u32),
            _ => None,
        }
    }

    fn is_virtual_key(&self, key: &PropertyKey) -> bool {
        match (self.string_len(), key) {
            (Some(_), k) if *k == *ARRAY_LENGTH_PROP => true,
            (Some(len), PropertyKey::Int(i)) => *i < len,
            _ => false,
        }
    }
}

/// The code unit at `index` as a one-unit string, like `"abc"[1]`.
pub fn string_code_unit_at(s: &str, index: u32) -> Option<String> {
    s.encode_utf16()
        .nth(index as usize)
        .map(|unit| String::from_utf16_lossy(&[unit]))
}

impl JsObject for WrapperObject {
    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn class_name(&self) -> &'static str {
        match self.primitive {
            JsValue::String(_) => "String",
            JsValue::Number(_) => "Number",
            JsValue::Boolean(_) => "Boolean",
            _ => "Object",
        }
    }

    fn get_own_value(&self, key: &PropertyKey) -> Option<JsValue> {
        if let JsValue::String(s) = &self.primitive {
            if *key == *ARRAY_LENGTH_PROP {
                return Some(JsValue::Number(s.encode_utf16().count() as f64));
            }
            if let PropertyKey::Int(i) = key {
                if let Some(unit) = string_code_unit_at(s, *i) {
                    return Some(JsValue::String(unit));
                }
            }
        }
        self.base.get_own_property(key).map(|d| d.value.clone())
    }

    fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.is_virtual_key(key) || self.base.has_own_property(key)
    }

    fn own_keys(&self) -> Vec<(PropertyKey, bool)> {
        let len = match self.string_len() {
            Some(len) => len,
            None => return self.base.own_property_keys(),
        };
        let own = self.base.own_property_keys();
        let (named, indexed): (Vec<_>, Vec<_>) = own.into_iter().partition(|(k, _)| !k.is_index());
        let mut keys = vec![(ARRAY_LENGTH_PROP.clone(), false)];
        keys.extend(named);
        keys.extend((0..len).map(|i| (PropertyKey::Int(i), true)));
        keys.extend(indexed);
        keys
    }

    fn set_own_value(&mut self, key: PropertyKey, value: JsValue) -> bool {
        if self.is_virtual_key(&key) {
            return false;
        }
        let base = &mut self.base;
        match base.get_own_property_mut(&key) {
            Some(desc) => {
                if desc.writable {
                    desc.value = value;
                    true
                } else {
                    false
                }
            }
            None => base.define_own_property(key, PropertyDescriptor::new_data(value)),
        }
    }

    fn delete_own_property(&mut self, key: &PropertyKey) -> bool {
        if self.is_virtual_key(key) {
            return false;
        }
        let configurable = self
            .base
            .get_own_property(key)
            .map(|d| d.configurable)
            .unwrap_or(false);
        configurable && self.base.remove_own_property(key).is_some()
    }
}
