use crate::runner::ds::error::JErrorType;
use crate::runner::ds::object::{JsObject, JsObjectType, ObjectBase};
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::operations::type_conversion::to_number;
use crate::runner::ds::value::JsValue;

lazy_static! {
    pub static ref ARRAY_LENGTH_PROP: PropertyKey = PropertyKey::Str("length".to_string());
}

/// An exotic object whose `length` tracks its highest index.
///
/// `length` is virtual: it is answered from `self.length` and never stored in the base, so it
/// stays non-enumerable without any bookkeeping. Holes are simply absent index keys.
pub struct ArrayObject {
    base: ObjectBase,
    length: u32,
}

impl ArrayObject {
    pub fn new(prototype: Option<JsObjectType>) -> Self {
        ArrayObject {
            base: ObjectBase::new(prototype),
            length: 0,
        }
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn set_length(&mut self, len: u32) {
        if len < self.length {
            self.base.truncate_indices(len);
        }
        self.length = len;
    }

    /// Appends `value`. Fails once the length would pass `u32::MAX`.
    pub fn push(&mut self, value: JsValue) -> Result<u32, JErrorType> {
        if self.length == u32::MAX {
            return Err(JErrorType::RangeError("Invalid array length".to_string()));
        }
        let index = self.length;
        self.set_own_value(PropertyKey::Int(index), value);
        Ok(self.length)
    }

    pub fn element(&self, index: u32) -> Option<JsValue> {
        self.base
            .get_own_property(&PropertyKey::Int(index))
            .map(|d| d.value.clone())
    }
}

impl JsObject for ArrayObject {
    fn get_object_base(&self) -> &ObjectBase {
        &self.base
    }

    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        &mut self.base
    }

    fn class_name(&self) -> &'static str {
        "Array"
    }

    fn get_own_value(&self, key: &PropertyKey) -> Option<JsValue> {
        if *key == *ARRAY_LENGTH_PROP {
            return Some(JsValue::Number(self.length as f64));
        }
        self.base.get_own_property(key).map(|d| d.value.clone())
    }

    fn has_own_property(&self, key: &PropertyKey) -> bool {
        *key == *ARRAY_LENGTH_PROP || self.base.has_own_property(key)
    }

    fn own_keys(&self) -> Vec<(PropertyKey, bool)> {
        let mut keys = vec![(ARRAY_LENGTH_PROP.clone(), false)];
        keys.extend(self.base.own_property_keys());
        keys
    }

    fn set_own_value(&mut self, key: PropertyKey, value: JsValue) -> bool {
        if key == *ARRAY_LENGTH_PROP {
            let n = to_number(&value);
            if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 {
                self.set_length(n as u32);
                return true;
            }
            return false;
        }
        let index = match key {
            // The last index would need a length of 2^32.
            PropertyKey::Int(u32::MAX) => return false,
            PropertyKey::Int(i) => Some(i),
            PropertyKey::Str(_) => None,
        };
        let base = &mut self.base;
        let written = match base.get_own_property_mut(&key) {
            Some(desc) => {
                if desc.writable {
                    desc.value = value;
                    true
                } else {
                    false
                }
            }
            None => base.define_own_property(key, PropertyDescriptor::new_data(value)),
        };
        if let (true, Some(i)) = (written, index) {
            if i >= self.length {
                self.length = i + 1;
            }
        }
        written
    }

    fn delete_own_property(&mut self, key: &PropertyKey) -> bool {
        if *key == *ARRAY_LENGTH_PROP {
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
