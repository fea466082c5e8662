//! Engine configuration.

use crate::compiler::analyze::AnalyzeOptions;
use crate::runner::ds::heap::HeapConfig;

/// Each script call nests one interpreter loop on the Rust stack; this keeps a debug build
/// inside a 2 MiB thread stack.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 100;

/// Knobs for a single [`Engine`](crate::runner::api::Engine).
///
/// ```
/// use kiln::runner::config::EngineConfig;
/// use kiln::runner::ds::heap::HeapConfig;
///
/// let config = EngineConfig::default()
///     .with_narrow_types(false)
///     .with_heap(HeapConfig::with_limit(1 << 20));
/// assert!(!config.analysis_options().narrow_types);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Run ExprType narrowing during analysis. Without it every node stays Dynamic.
    pub narrow_types: bool,
    /// Fold constant subtrees into literals during analysis.
    pub fold_constants: bool,
    /// Nested calls allowed before a RangeError.
    pub max_call_depth: usize,
    pub heap: HeapConfig,
}

impl EngineConfig {
    pub fn new() -> Self {
        EngineConfig {
            narrow_types: true,
            fold_constants: true,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            heap: HeapConfig::default(),
        }
    }

    pub fn with_narrow_types(mut self, narrow_types: bool) -> Self {
        self.narrow_types = narrow_types;
        self
    }

    pub fn with_fold_constants(mut self, fold_constants: bool) -> Self {
        self.fold_constants = fold_constants;
        self
    }

    pub fn with_max_call_depth(mut self, max_call_depth: usize) -> Self {
        self.max_call_depth = max_call_depth;
        self
    }

    pub fn with_heap(mut self, heap: HeapConfig) -> Self {
        self.heap = heap;
        self
    }

    pub fn analysis_options(&self) -> AnalyzeOptions {
        AnalyzeOptions {
            narrow_types: self.narrow_types,
            fold_constants: self.fold_constants,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
