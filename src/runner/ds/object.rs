use crate::runner::ds::array_object::ArrayObject;
use crate::runner::ds::function_object::FunctionObject;
use crate::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use crate::runner::ds::value::JsValue;
use crate::runner::ds::wrapper_object::WrapperObject;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

pub type JsObjectType = Rc<RefCell<ObjectType>>;

pub enum ObjectType {
    Ordinary(ObjectBase),
    Function(FunctionObject),
    Array(ArrayObject),
    Wrapper(WrapperObject),
}

impl ObjectType {
    pub fn is_callable(&self) -> bool {
        matches!(self, ObjectType::Function(_))
    }

    pub fn as_js_object(&self) -> &dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o,
            ObjectType::Function(o) => o,
            ObjectType::Array(o) => o,
            ObjectType::Wrapper(o) => o,
        }
    }

    pub fn as_js_object_mut(&mut self) -> &mut dyn JsObject {
        match self {
            ObjectType::Ordinary(o) => o,
            ObjectType::Function(o) => o,
            ObjectType::Array(o) => o,
            ObjectType::Wrapper(o) => o,
        }
    }

    pub fn class_name(&self) -> &'static str {
        self.as_js_object().class_name()
    }
}

/// Storage shared by every object kind.
///
/// Named keys live in a hash map with a side vector recording insertion order; array-index
/// keys live in a `BTreeMap` so they come out ascending. Own keys are therefore always listed
/// as named keys in insertion order followed by index keys in numeric order, and replacing a
/// value never moves its key.
pub struct ObjectBase {
    named: FxHashMap<String, PropertyDescriptor>,
    named_order: Vec<String>,
    indexed: BTreeMap<u32, PropertyDescriptor>,
    is_extensible: bool,
    prototype: Option<JsObjectType>,
}

impl ObjectBase {
    pub fn new(prototype: Option<JsObjectType>) -> Self {
        ObjectBase {
            named: FxHashMap::default(),
            named_order: Vec::new(),
            indexed: BTreeMap::new(),
            is_extensible: true,
            prototype,
        }
    }

    pub fn get_prototype(&self) -> Option<JsObjectType> {
        self.prototype.clone()
    }

    /// Replaces the prototype link without any cycle check.
    ///
    /// Script-visible paths go through `operations::object::set_prototype_of`.
    pub fn set_prototype_unchecked(&mut self, prototype: Option<JsObjectType>) {
        self.prototype = prototype;
    }

    pub fn is_extensible(&self) -> bool {
        self.is_extensible
    }

    pub fn prevent_extensions(&mut self) {
        self.is_extensible = false;
    }

    pub fn get_own_property(&self, key: &PropertyKey) -> Option<&PropertyDescriptor> {
        match key {
            PropertyKey::Str(s) => self.named.get(s),
            PropertyKey::Int(i) => self.indexed.get(i),
        }
    }

    pub fn get_own_property_mut(&mut self, key: &PropertyKey) -> Option<&mut PropertyDescriptor> {
        match key {
            PropertyKey::Str(s) => self.named.get_mut(s),
            PropertyKey::Int(i) => self.indexed.get_mut(i),
        }
    }

    pub fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_own_property(key).is_some()
    }

    /// Inserts or replaces a property. New keys are refused on non-extensible objects.
    pub fn define_own_property(&mut self, key: PropertyKey, desc: PropertyDescriptor) -> bool {
        if let Some(existing) = self.get_own_property_mut(&key) {
            *existing = desc;
            return true;
        }
        if !self.is_extensible {
            return false;
        }
        match key {
            PropertyKey::Str(s) => {
                self.named_order.push(s.clone());
                self.named.insert(s, desc);
            }
            PropertyKey::Int(i) => {
                self.indexed.insert(i, desc);
            }
        }
        true
    }

    pub fn remove_own_property(&mut self, key: &PropertyKey) -> Option<PropertyDescriptor> {
        match key {
            PropertyKey::Str(s) => {
                let removed = self.named.remove(s);
                if removed.is_some() {
                    self.named_order.retain(|k| k != s);
                }
                removed
            }
            PropertyKey::Int(i) => self.indexed.remove(i),
        }
    }

    /// Own keys with their enumerable flag, in enumeration order.
    pub fn own_property_keys(&self) -> Vec<(PropertyKey, bool)> {
        let mut keys = Vec::with_capacity(self.named_order.len() + self.indexed.len());
        for name in &self.named_order {
            if let Some(desc) = self.named.get(name) {
                keys.push((PropertyKey::Str(name.clone()), desc.enumerable));
            }
        }
        for (i, desc) in &self.indexed {
            keys.push((PropertyKey::Int(*i), desc.enumerable));
        }
        keys
    }

    pub fn property_count(&self) -> usize {
        self.named.len() + self.indexed.len()
    }

    /// Drops every index key at or above `len`. Used when an array shrinks.
    pub fn truncate_indices(&mut self, len: u32) {
        let _ = self.indexed.split_off(&len);
    }

    pub fn index_keys(&self) -> impl Iterator<Item = &u32> {
        self.indexed.keys()
    }
}

/// Per-kind behaviour on top of `ObjectBase`.
///
/// Kinds with virtual properties (array `length`, string wrapper characters) override the
/// own-property hooks; everything else falls through to the shared storage.
pub trait JsObject {
    fn get_object_base(&self) -> &ObjectBase;

    fn get_object_base_mut(&mut self) -> &mut ObjectBase;

    fn class_name(&self) -> &'static str;

    fn get_own_value(&self, key: &PropertyKey) -> Option<JsValue> {
        self.get_object_base()
            .get_own_property(key)
            .map(|d| d.value.clone())
    }

    fn has_own_property(&self, key: &PropertyKey) -> bool {
        self.get_object_base().has_own_property(key)
    }

    /// Own keys with their enumerable flag, in enumeration order.
    fn own_keys(&self) -> Vec<(PropertyKey, bool)> {
        self.get_object_base().own_property_keys()
    }

    /// Ordinary `[[Set]]` on the receiver itself: overwrite a writable own property or add a
    /// new one. Returns false when the write is refused.
    fn set_own_value(&mut self, key: PropertyKey, value: JsValue) -> bool {
        let base = self.get_object_base_mut();
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

    /// Removes a configurable own property. Returns whether a property was removed.
    fn delete_own_property(&mut self, key: &PropertyKey) -> bool {
        let base = self.get_object_base_mut();
        let configurable = base
            .get_own_property(key)
            .map(|d| d.configurable)
            .unwrap_or(false);
        configurable && base.remove_own_property(key).is_some()
    }
}

impl JsObject for ObjectBase {
    fn get_object_base(&self) -> &ObjectBase {
        self
    }

    fn get_object_base_mut(&mut self) -> &mut ObjectBase {
        self
    }

    fn class_name(&self) -> &'static str {
        "Object"
    }
}
