//! Compile-time scopes.
//!
//! One [`ScopeContext`] exists per function being analysed, plus one for the program. A
//! function scope owns the slot table of its activation and sees its parents read-only, so
//! a name resolves to a local slot, a slot some number of function boundaries out, or a
//! global.

use rustc_hash::FxHashMap;

use crate::compiler::analyze::AnalyzeOptions;
use crate::compiler::expr_type::ExprType;
use crate::parser::ast::Slot;
use crate::runner::std_lib::global::READ_ONLY_GLOBALS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Program,
    Function,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelEntry {
    pub name: String,
    /// Whether the label names a loop, and so can be a `continue` target.
    pub is_iteration: bool,
}

pub struct ScopeContext<'p> {
    parent: Option<&'p ScopeContext<'p>>,
    kind: ScopeKind,
    pub options: AnalyzeOptions,
    locals: FxHashMap<String, usize>,
    local_count: usize,
    param_count: usize,
    /// Types of the most recent straight-line writes, keyed by variable name.
    known_types: FxHashMap<String, (Slot, ExprType)>,
    labels: Vec<LabelEntry>,
    iteration_depth: usize,
}

impl ScopeContext<'static> {
    pub fn new_program(options: AnalyzeOptions) -> Self {
        ScopeContext {
            parent: None,
            kind: ScopeKind::Program,
            options,
            locals: FxHashMap::default(),
            local_count: 0,
            param_count: 0,
            known_types: FxHashMap::default(),
            labels: vec![],
            iteration_depth: 0,
        }
    }
}

impl<'p> ScopeContext<'p> {
    /// A function scope. Parameters take the first slots; a repeated parameter name binds to
    /// its last occurrence.
    pub fn new_function(parent: &'p ScopeContext<'p>, params: &[String]) -> Self {
        let mut locals = FxHashMap::default();
        for (index, name) in params.iter().enumerate() {
            locals.insert(name.clone(), index);
        }
        ScopeContext {
            parent: Some(parent),
            kind: ScopeKind::Function,
            options: parent.options,
            locals,
            local_count: params.len(),
            param_count: params.len(),
            known_types: FxHashMap::default(),
            labels: vec![],
            iteration_depth: 0,
        }
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn is_program(&self) -> bool {
        self.kind == ScopeKind::Program
    }

    pub fn local_count(&self) -> usize {
        self.local_count
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    pub fn has_local(&self, name: &str) -> bool {
        self.locals.contains_key(name)
    }

    /// Gives `name` a slot in this activation unless it already has one. Program scopes have
    /// no activation: their names live on the global object, and `None` is returned.
    pub fn declare(&mut self, name: &str) -> Option<usize> {
        if self.is_program() {
            return None;
        }
        if let Some(index) = self.locals.get(name) {
            return Some(*index);
        }
        let index = self.local_count;
        self.locals.insert(name.to_string(), index);
        self.local_count += 1;
        Some(index)
    }

    pub fn resolve(&self, name: &str) -> Slot {
        let mut depth = 0;
        let mut scope = Some(self);
        while let Some(s) = scope {
            if s.is_program() {
                break;
            }
            if let Some(index) = s.locals.get(name) {
                return if depth == 0 {
                    Slot::Local(*index)
                } else {
                    Slot::Closure {
                        depth,
                        index: *index,
                    }
                };
            }
            depth += 1;
            scope = s.parent;
        }
        Slot::Global(name.to_string())
    }

    // ── Straight-line narrowing ───────────────────────────────

    pub fn known_type(&self, name: &str) -> ExprType {
        self.known_types
            .get(name)
            .map(|(_, t)| *t)
            .unwrap_or(ExprType::Dynamic)
    }

    /// Writes to read-only globals are dropped at runtime, so they record nothing.
    pub fn record_type(&mut self, name: &str, slot: &Slot, expr_type: ExprType) {
        let read_only =
            matches!(slot, Slot::Global(g) if READ_ONLY_GLOBALS.contains(&g.as_str()));
        if !self.options.narrow_types || expr_type == ExprType::Dynamic || read_only {
            self.known_types.remove(name);
        } else {
            self.known_types
                .insert(name.to_string(), (slot.clone(), expr_type));
        }
    }

    pub fn forget_type(&mut self, name: &str) {
        self.known_types.remove(name);
    }

    /// Globals are properties, so any property write may change one.
    pub fn forget_globals(&mut self) {
        self.known_types
            .retain(|_, (slot, _)| !matches!(slot, Slot::Global(_)));
    }

    pub fn clear_known_types(&mut self) {
        self.known_types.clear();
    }

    // ── Labels ────────────────────────────────────────────────

    /// Returns false if a label of the same name already encloses this point.
    pub fn push_label(&mut self, name: &str, is_iteration: bool) -> bool {
        if self.find_label(name).is_some() {
            return false;
        }
        self.labels.push(LabelEntry {
            name: name.to_string(),
            is_iteration,
        });
        true
    }

    pub fn pop_label(&mut self) {
        self.labels.pop();
    }

    pub fn find_label(&self, name: &str) -> Option<&LabelEntry> {
        self.labels.iter().rev().find(|l| l.name == name)
    }

    pub fn enter_iteration(&mut self) {
        self.iteration_depth += 1;
    }

    pub fn exit_iteration(&mut self) {
        self.iteration_depth -= 1;
    }

    pub fn in_iteration(&self) -> bool {
        self.iteration_depth > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_program_scope_resolves_globals() {
        let mut program = ScopeContext::new_program(AnalyzeOptions::default());
        assert_eq!(program.declare("x"), None);
        assert_eq!(program.resolve("x"), Slot::Global("x".to_string()));
    }

    #[test]
    fn test_locals_and_closures() {
        let program = ScopeContext::new_program(AnalyzeOptions::default());
        let mut outer = ScopeContext::new_function(&program, &params(&["a", "b"]));
        assert_eq!(outer.declare("v"), Some(2));
        assert_eq!(outer.declare("a"), Some(0));
        let mut inner = ScopeContext::new_function(&outer, &params(&["b"]));
        inner.declare("w");
        assert_eq!(inner.local_count(), 2);
        assert_eq!(inner.resolve("b"), Slot::Local(0));
        assert_eq!(inner.resolve("w"), Slot::Local(1));
        assert_eq!(inner.resolve("v"), Slot::Closure { depth: 1, index: 2 });
        assert_eq!(inner.resolve("zz"), Slot::Global("zz".to_string()));
    }

    #[test]
    fn test_duplicate_parameter_binds_last() {
        let program = ScopeContext::new_program(AnalyzeOptions::default());
        let f = ScopeContext::new_function(&program, &params(&["a", "a"]));
        assert_eq!(f.resolve("a"), Slot::Local(1));
        assert_eq!(f.local_count(), 2);
    }

    #[test]
    fn test_known_types_forget_globals_only() {
        let mut program = ScopeContext::new_program(AnalyzeOptions::default());
        program.record_type("g", &Slot::Global("g".to_string()), ExprType::Number);
        program.record_type("l", &Slot::Local(0), ExprType::String);
        program.forget_globals();
        assert_eq!(program.known_type("g"), ExprType::Dynamic);
        assert_eq!(program.known_type("l"), ExprType::String);
    }

    #[test]
    fn test_narrowing_disabled_records_nothing() {
        let options = AnalyzeOptions {
            narrow_types: false,
            fold_constants: true,
        };
        let mut program = ScopeContext::new_program(options);
        program.record_type("g", &Slot::Global("g".to_string()), ExprType::Number);
        assert_eq!(program.known_type("g"), ExprType::Dynamic);
    }

    #[test]
    fn test_read_only_globals_record_nothing() {
        let mut program = ScopeContext::new_program(AnalyzeOptions::default());
        for name in ["undefined", "NaN", "Infinity"] {
            program.record_type(name, &Slot::Global(name.to_string()), ExprType::String);
            assert_eq!(program.known_type(name), ExprType::Dynamic);
        }
        let mut f = ScopeContext::new_function(&program, &[]);
        f.record_type("undefined", &Slot::Local(0), ExprType::Number);
        assert_eq!(f.known_type("undefined"), ExprType::Number);
    }

    #[test]
    fn test_labels() {
        let mut program = ScopeContext::new_program(AnalyzeOptions::default());
        assert!(program.push_label("outer", true));
        assert!(!program.push_label("outer", false));
        assert!(program.find_label("outer").unwrap().is_iteration);
        program.pop_label();
        assert!(program.find_label("outer").is_none());
    }
}
