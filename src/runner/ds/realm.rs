use crate::runner::ds::object::{JsObjectType, ObjectBase, ObjectType};
use std::cell::RefCell;
use std::rc::Rc;

/// The intrinsic objects every script starts from.
///
/// The realm only wires up the prototype graph. Methods and global bindings are installed by
/// `runner::std_lib` before any user code runs.
pub struct Realm {
    pub object_prototype: JsObjectType,
    pub function_prototype: JsObjectType,
    pub array_prototype: JsObjectType,
    pub string_prototype: JsObjectType,
    pub number_prototype: JsObjectType,
    pub boolean_prototype: JsObjectType,
    pub global_object: JsObjectType,
}

fn ordinary(prototype: Option<&JsObjectType>) -> JsObjectType {
    Rc::new(RefCell::new(ObjectType::Ordinary(ObjectBase::new(
        prototype.cloned(),
    ))))
}

impl Realm {
    pub fn new() -> Self {
        let object_prototype = ordinary(None);
        Realm {
            function_prototype: ordinary(Some(&object_prototype)),
            array_prototype: ordinary(Some(&object_prototype)),
            string_prototype: ordinary(Some(&object_prototype)),
            number_prototype: ordinary(Some(&object_prototype)),
            boolean_prototype: ordinary(Some(&object_prototype)),
            global_object: ordinary(Some(&object_prototype)),
            object_prototype,
        }
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
