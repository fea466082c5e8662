use crate::runner::ds::value::JsValue;
use std::cell::RefCell;
use std::rc::Rc;

pub type ScopeRef = Rc<ActivationScope>;

/// The variable storage of one function activation.
///
/// Every local the analysis pass assigned to the function lives in `slots`. Closures keep the
/// defining activation alive through `parent`, and a `Closure { depth, index }` slot is reached
/// by following `parent` `depth` times.
pub struct ActivationScope {
    slots: RefCell<Vec<JsValue>>,
    parent: Option<ScopeRef>,
}

impl ActivationScope {
    pub fn new(size: usize, parent: Option<ScopeRef>) -> Self {
        ActivationScope {
            slots: RefCell::new(vec![JsValue::Undefined; size]),
            parent,
        }
    }

    pub fn get(&self, index: usize) -> JsValue {
        self.slots
            .borrow()
            .get(index)
            .cloned()
            .unwrap_or(JsValue::Undefined)
    }

    pub fn set(&self, index: usize, value: JsValue) {
        let mut slots = self.slots.borrow_mut();
        if index >= slots.len() {
            slots.resize(index + 1, JsValue::Undefined);
        }
        slots[index] = value;
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    /// The activation `depth` levels out; `0` is `self`.
    pub fn ancestor(self: &Rc<Self>, depth: usize) -> Option<ScopeRef> {
        let mut current = self.clone();
        for _ in 0..depth {
            current = current.parent.clone()?;
        }
        Some(current)
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ancestor_walk() {
        let outer = Rc::new(ActivationScope::new(1, None));
        outer.set(0, JsValue::Number(7.0));
        let inner = Rc::new(ActivationScope::new(2, Some(outer.clone())));
        let found = inner.ancestor(1).map(|s| s.get(0));
        assert_eq!(found, Some(JsValue::Number(7.0)));
        assert!(inner.ancestor(2).is_none());
    }
}
