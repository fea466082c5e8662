use crate::runner::config::EngineConfig;
use crate::runner::ds::error::JErrorType;
use crate::runner::ds::heap::Heap;
use crate::runner::ds::object::JsObjectType;
use crate::runner::ds::realm::Realm;

/// Execution state shared by compiled code and native functions.
pub struct EvalContext {
    pub realm: Realm,
    pub heap: Heap,
    output: String,
    call_depth: usize,
    max_call_depth: usize,
}

impl EvalContext {
    /// A context with a bare realm. Globals are installed separately.
    pub fn new(config: &EngineConfig) -> Self {
        EvalContext {
            realm: Realm::new(),
            heap: Heap::new(config.heap.clone()),
            output: String::new(),
            call_depth: 0,
            max_call_depth: config.max_call_depth,
        }
    }

    pub fn global_object(&self) -> JsObjectType {
        self.realm.global_object.clone()
    }

    /// Appends text to the captured script output.
    pub fn write_output(&mut self, text: &str) {
        self.output.push_str(text);
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }

    pub fn enter_call(&mut self) -> Result<(), JErrorType> {
        if self.call_depth >= self.max_call_depth {
            return Err(JErrorType::RangeError(
                "Maximum call stack size exceeded".to_string(),
            ));
        }
        self.call_depth += 1;
        Ok(())
    }

    pub fn exit_call(&mut self) {
        self.call_depth = self.call_depth.saturating_sub(1);
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }
}

impl Default for EvalContext {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
