//! AST-to-bytecode compiler.
//!
//! Walks the analysed AST once and emits a flat bytecode representation
//! that the VM can execute without tree-walking overhead. Slots chosen by
//! analysis map directly onto local, scoped and global instructions, and
//! expression types pick the typed arithmetic instructions.

use crate::compiler::backend::CompilerBackend;
use crate::compiler::error::CompileError;
use crate::compiler::expr_type::ExprType;
use crate::parser::ast::{
    AssignmentOperator, BinaryOperator, FunctionData, LiteralValue, LogicalOperator,
    MemberProperty, Node, NodeKind, Slot, UnaryOperator, UpdateOperator, VariableDeclarator,
};
use crate::runner::ds::value::JsValue;

use super::bytecode::{Chunk, FunctionChunk, Instruction, OpCode};
use super::CompiledScript;

/// Tracks a break/continue target.
struct LoopContext {
    /// Labels naming this construct.
    labels: Vec<String>,
    /// Loops accept unlabelled jumps and `continue`; labelled blocks only accept `break L`.
    is_iteration: bool,
    /// Indices of continue jumps, patched once the continue target is known.
    continue_jumps: Vec<usize>,
    /// Indices of break jumps that need patching when the construct ends.
    break_jumps: Vec<usize>,
    /// for-in iterators live inside the construct, its own included.
    for_in_depth: usize,
}

/// The bytecode compiler for one function body or the program.
pub struct Compiler {
    chunk: Chunk,
    /// Stack of active loop contexts for break/continue.
    loop_stack: Vec<LoopContext>,
    /// Labels waiting for the loop they are attached to.
    pending_labels: Vec<String>,
    for_in_depth: usize,
    is_function: bool,
}

fn backend_error(message: impl Into<String>) -> CompileError {
    CompileError::Backend {
        message: message.into(),
    }
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            chunk: Chunk::new(),
            loop_stack: Vec::new(),
            pending_labels: Vec::new(),
            for_in_depth: 0,
            is_function: false,
        }
    }

    fn for_function() -> Self {
        Compiler {
            is_function: true,
            ..Compiler::new()
        }
    }

    /// Compile a full analysed program into bytecode.
    pub fn compile_program(mut self, program: &Node) -> Result<Chunk, CompileError> {
        let (body, declarations) = match &program.kind {
            NodeKind::Program { body, declarations } => (body, declarations),
            _ => return Err(backend_error("expected a program node")),
        };
        for name in declarations {
            let name_idx = self.chunk.add_name(name);
            self.chunk.emit_with(OpCode::DeclareGlobal, name_idx);
        }
        self.compile_hoisted_functions(body)?;
        for stmt in body {
            self.compile_statement(stmt)?;
        }
        self.chunk.emit_op(OpCode::Halt);
        Ok(self.chunk)
    }

    fn compile_function(&mut self, data: &FunctionData) -> Result<u32, CompileError> {
        let layout = data
            .layout
            .as_ref()
            .ok_or_else(|| backend_error("function body was not analysed"))?;
        let mut compiler = Compiler::for_function();
        compiler.compile_hoisted_functions(&data.body)?;
        for stmt in &data.body {
            compiler.compile_statement(stmt)?;
        }
        compiler.chunk.emit_op(OpCode::Undefined);
        compiler.chunk.emit_op(OpCode::Return);
        Ok(self.chunk.add_function(FunctionChunk {
            name: data.name.clone(),
            param_count: data.params.len(),
            local_count: layout.local_count,
            self_slot: layout.self_slot,
            chunk: compiler.chunk,
        }))
    }

    /// Function declarations are initialised before the first statement runs, in source order.
    fn compile_hoisted_functions(&mut self, body: &[Node]) -> Result<(), CompileError> {
        let mut declarations = vec![];
        for stmt in body {
            collect_function_declarations(stmt, &mut declarations);
        }
        for data in declarations {
            let binding = data
                .binding
                .as_ref()
                .ok_or_else(|| backend_error("function declaration has no binding"))?;
            let fn_idx = self.compile_function(data)?;
            self.chunk.emit_with(OpCode::MakeClosure, fn_idx);
            self.compile_store(binding);
        }
        Ok(())
    }

    // ════════════════════════════════════════════════════════════
    // Statements
    // ════════════════════════════════════════════════════════════

    fn compile_statement(&mut self, stmt: &Node) -> Result<(), CompileError> {
        match &stmt.kind {
            NodeKind::Empty | NodeKind::FunctionDecl(_) => {}

            NodeKind::ExpressionStatement(expression) => {
                self.compile_expression(expression)?;
                if self.is_function {
                    self.chunk.emit_op(OpCode::Pop);
                } else {
                    self.chunk.emit_op(OpCode::Completion);
                }
            }

            NodeKind::Block(body) => {
                for stmt in body {
                    self.compile_statement(stmt)?;
                }
            }

            NodeKind::Var(declarators) => self.compile_var_declaration(declarators)?,

            NodeKind::If {
                test,
                consequent,
                alternate,
            } => {
                self.compile_expression(test)?;
                let jump_to_else = self.chunk.emit_with(OpCode::JumpIfFalse, 0);
                self.compile_statement(consequent)?;
                if let Some(alt) = alternate {
                    let jump_over_else = self.chunk.emit_with(OpCode::Jump, 0);
                    self.chunk.patch_jump(jump_to_else);
                    self.compile_statement(alt)?;
                    self.chunk.patch_jump(jump_over_else);
                } else {
                    self.chunk.patch_jump(jump_to_else);
                }
            }

            NodeKind::While { test, body } => self.compile_while(test, body)?,
            NodeKind::DoWhile { body, test } => self.compile_do_while(body, test)?,
            NodeKind::For {
                init,
                test,
                update,
                body,
            } => self.compile_for(
                init.as_deref(),
                test.as_deref(),
                update.as_deref(),
                body,
            )?,
            NodeKind::ForIn {
                target,
                iterable,
                body,
            } => self.compile_for_in(target, iterable, body)?,

            NodeKind::Label { name, body } => self.compile_label(name, body)?,
            NodeKind::Break { label } => self.compile_break(label.as_deref())?,
            NodeKind::Continue { label } => self.compile_continue(label.as_deref())?,

            NodeKind::Return(argument) => {
                if !self.is_function {
                    return Err(backend_error(format!(
                        "Illegal return statement at {}",
                        stmt.position
                    )));
                }
                match argument {
                    Some(arg) => self.compile_expression(arg)?,
                    None => {
                        self.chunk.emit_op(OpCode::Undefined);
                    }
                }
                self.chunk.emit_op(OpCode::Return);
            }

            _ => {
                return Err(backend_error(format!(
                    "expression in statement position at {}",
                    stmt.position
                )))
            }
        }
        Ok(())
    }

    fn compile_var_declaration(
        &mut self,
        declarators: &[VariableDeclarator],
    ) -> Result<(), CompileError> {
        for declarator in declarators {
            if let Some(init) = &declarator.init {
                let slot = variable_slot(&declarator.target)?;
                self.compile_expression(init)?;
                self.compile_store(slot);
            }
        }
        Ok(())
    }

    // ── Control flow ─────────────────────────────────────────

    fn push_loop(&mut self, is_iteration: bool) {
        let labels = if is_iteration {
            std::mem::take(&mut self.pending_labels)
        } else {
            Vec::new()
        };
        self.loop_stack.push(LoopContext {
            labels,
            is_iteration,
            continue_jumps: Vec::new(),
            break_jumps: Vec::new(),
            for_in_depth: self.for_in_depth,
        });
    }

    /// Pops the innermost context, sending its continues to `continue_target` and its breaks
    /// to the current position.
    fn pop_loop(&mut self, continue_target: usize) {
        if let Some(ctx) = self.loop_stack.pop() {
            for cj in ctx.continue_jumps {
                self.chunk.patch_jump_to(cj, continue_target);
            }
            for bj in ctx.break_jumps {
                self.chunk.patch_jump(bj);
            }
        }
    }

    fn compile_while(&mut self, test: &Node, body: &Node) -> Result<(), CompileError> {
        let loop_start = self.chunk.current_pos();
        self.push_loop(true);

        self.compile_expression(test)?;
        let exit_jump = self.chunk.emit_with(OpCode::JumpIfFalse, 0);

        self.compile_statement(body)?;
        self.chunk.emit_with(OpCode::Jump, loop_start as u32);

        self.chunk.patch_jump(exit_jump);
        self.pop_loop(loop_start);
        Ok(())
    }

    fn compile_do_while(&mut self, body: &Node, test: &Node) -> Result<(), CompileError> {
        let loop_start = self.chunk.current_pos();
        self.push_loop(true);

        self.compile_statement(body)?;

        // Continue target is the test
        let continue_target = self.chunk.current_pos();
        self.compile_expression(test)?;
        self.chunk.emit_with(OpCode::JumpIfTrue, loop_start as u32);

        self.pop_loop(continue_target);
        Ok(())
    }

    fn compile_for(
        &mut self,
        init: Option<&Node>,
        test: Option<&Node>,
        update: Option<&Node>,
        body: &Node,
    ) -> Result<(), CompileError> {
        if let Some(init) = init {
            match &init.kind {
                NodeKind::Var(declarators) => self.compile_var_declaration(declarators)?,
                _ => {
                    self.compile_expression(init)?;
                    self.chunk.emit_op(OpCode::Pop);
                }
            }
        }

        let loop_start = self.chunk.current_pos();
        self.push_loop(true);

        let exit_jump = match test {
            Some(test) => {
                self.compile_expression(test)?;
                Some(self.chunk.emit_with(OpCode::JumpIfFalse, 0))
            }
            None => None,
        };

        self.compile_statement(body)?;

        // Update (this is the continue target)
        let update_pos = self.chunk.current_pos();
        if let Some(update) = update {
            self.compile_expression(update)?;
            self.chunk.emit_op(OpCode::Pop);
        }
        self.chunk.emit_with(OpCode::Jump, loop_start as u32);

        if let Some(ej) = exit_jump {
            self.chunk.patch_jump(ej);
        }
        self.pop_loop(update_pos);
        Ok(())
    }

    /// ```text
    ///       <iterable> ForInStart
    /// top:  ForInNext -> exit
    ///       <target prefix> ForInKey <store>
    ///       <body>
    ///       Jump top
    /// exit: ForInEnd
    /// ```
    fn compile_for_in(
        &mut self,
        target: &Node,
        iterable: &Node,
        body: &Node,
    ) -> Result<(), CompileError> {
        self.compile_expression(iterable)?;
        self.chunk.emit_op(OpCode::ForInStart);
        self.for_in_depth += 1;

        let top = self.chunk.current_pos();
        self.push_loop(true);
        let next = self.chunk.emit_with(OpCode::ForInNext, 0);

        match &target.kind {
            NodeKind::Variable { slot, .. } => {
                self.chunk.emit_op(OpCode::ForInKey);
                self.compile_store(slot);
            }
            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                match property {
                    MemberProperty::Named(name) => {
                        self.chunk.emit_op(OpCode::ForInKey);
                        let name_idx = self.chunk.add_name(name);
                        self.chunk.emit_with(OpCode::SetProp, name_idx);
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.chunk.emit_op(OpCode::ForInKey);
                        self.chunk.emit_op(OpCode::SetElem);
                    }
                }
                self.chunk.emit_op(OpCode::Pop);
            }
            _ => {
                return Err(backend_error(format!(
                    "Invalid left-hand side in for-in loop at {}",
                    target.position
                )))
            }
        }

        self.compile_statement(body)?;
        self.chunk.emit_with(OpCode::Jump, top as u32);

        self.chunk.patch_jump(next);
        self.pop_loop(top);
        self.chunk.emit_op(OpCode::ForInEnd);
        self.for_in_depth -= 1;
        Ok(())
    }

    fn compile_label(&mut self, name: &str, body: &Node) -> Result<(), CompileError> {
        if body.is_iteration() {
            self.pending_labels.push(name.to_string());
            return self.compile_statement(body);
        }
        self.push_loop(false);
        if let Some(ctx) = self.loop_stack.last_mut() {
            ctx.labels.push(name.to_string());
        }
        self.compile_statement(body)?;
        let end = self.chunk.current_pos();
        self.pop_loop(end);
        Ok(())
    }

    fn find_target(&self, label: Option<&str>, continuing: bool) -> Option<usize> {
        self.loop_stack.iter().rposition(|ctx| match label {
            Some(l) => ctx.labels.iter().any(|n| n == l) && (!continuing || ctx.is_iteration),
            None => ctx.is_iteration,
        })
    }

    /// Ends the for-in iterators a jump to the context at `target` leaves behind.
    fn unwind_for_in(&mut self, keep: usize) {
        for _ in keep..self.for_in_depth {
            self.chunk.emit_op(OpCode::ForInEnd);
        }
    }

    fn compile_break(&mut self, label: Option<&str>) -> Result<(), CompileError> {
        let target = self
            .find_target(label, false)
            .ok_or_else(|| backend_error("break outside of a breakable statement"))?;
        // Breaking out of a for-in lands on its own ForInEnd.
        let keep = self.loop_stack[target].for_in_depth;
        self.unwind_for_in(keep);
        let jump = self.chunk.emit_with(OpCode::Jump, 0);
        self.loop_stack[target].break_jumps.push(jump);
        Ok(())
    }

    fn compile_continue(&mut self, label: Option<&str>) -> Result<(), CompileError> {
        let target = self
            .find_target(label, true)
            .ok_or_else(|| backend_error("continue outside of a loop"))?;
        let keep = self.loop_stack[target].for_in_depth;
        self.unwind_for_in(keep);
        let jump = self.chunk.emit_with(OpCode::Jump, 0);
        self.loop_stack[target].continue_jumps.push(jump);
        Ok(())
    }

    // ════════════════════════════════════════════════════════════
    // Expressions
    // ════════════════════════════════════════════════════════════

    fn compile_expression(&mut self, expr: &Node) -> Result<(), CompileError> {
        match &expr.kind {
            NodeKind::Literal(lit) => self.compile_literal(lit),

            NodeKind::Variable { slot, .. } => self.compile_load(slot),

            NodeKind::Identifier(name) => {
                return Err(backend_error(format!("unresolved identifier '{}'", name)))
            }

            NodeKind::This => {
                self.chunk.emit_op(OpCode::This);
            }

            NodeKind::Array(elements) => {
                let mut shape = Vec::with_capacity(elements.len());
                for element in elements {
                    match element {
                        Some(e) => {
                            self.compile_expression(e)?;
                            shape.push(true);
                        }
                        None => shape.push(false),
                    }
                }
                let shape_idx = self.chunk.add_array_shape(shape);
                self.chunk.emit_with(OpCode::CreateArray, shape_idx);
            }

            NodeKind::Object(properties) => {
                let mut shape = Vec::with_capacity(properties.len());
                for property in properties {
                    self.compile_expression(&property.value)?;
                    shape.push(property.key.clone());
                }
                let shape_idx = self.chunk.add_object_shape(shape);
                self.chunk.emit_with(OpCode::CreateObject, shape_idx);
            }

            NodeKind::Function(data) => {
                let fn_idx = self.compile_function(data)?;
                self.chunk.emit_with(OpCode::MakeClosure, fn_idx);
            }

            NodeKind::Unary { operator, argument } => self.compile_unary(*operator, argument)?,

            NodeKind::Update {
                operator,
                prefix,
                argument,
            } => self.compile_update(*operator, *prefix, argument)?,

            NodeKind::Binary {
                operator,
                left,
                right,
            } => {
                self.compile_expression(left)?;
                self.compile_expression(right)?;
                let numeric = left.expr_type == ExprType::Number
                    && right.expr_type == ExprType::Number;
                self.compile_binary_op(*operator, numeric);
            }

            NodeKind::Logical {
                operator,
                left,
                right,
            } => self.compile_logical(*operator, left, right)?,

            NodeKind::Conditional {
                test,
                consequent,
                alternate,
            } => {
                self.compile_expression(test)?;
                let jump_to_alt = self.chunk.emit_with(OpCode::JumpIfFalse, 0);
                self.compile_expression(consequent)?;
                let jump_over = self.chunk.emit_with(OpCode::Jump, 0);
                self.chunk.patch_jump(jump_to_alt);
                self.compile_expression(alternate)?;
                self.chunk.patch_jump(jump_over);
            }

            NodeKind::Assignment {
                operator,
                target,
                value,
            } => self.compile_assignment(*operator, target, value, expr.expr_type)?,

            NodeKind::Sequence(expressions) => {
                for (i, e) in expressions.iter().enumerate() {
                    self.compile_expression(e)?;
                    if i < expressions.len() - 1 {
                        self.chunk.emit_op(OpCode::Pop);
                    }
                }
            }

            NodeKind::Call { callee, arguments } => self.compile_call(callee, arguments)?,

            NodeKind::New { callee, arguments } => {
                self.compile_expression(callee)?;
                for arg in arguments {
                    self.compile_expression(arg)?;
                }
                self.chunk.emit_with(OpCode::New, arguments.len() as u32);
            }

            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                match property {
                    MemberProperty::Named(name) => {
                        let name_idx = self.chunk.add_name(name);
                        self.chunk.emit_with(OpCode::GetProp, name_idx);
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.chunk.emit_op(OpCode::GetElem);
                    }
                }
            }

            _ => {
                return Err(backend_error(format!(
                    "statement in expression position at {}",
                    expr.position
                )))
            }
        }
        Ok(())
    }

    fn compile_literal(&mut self, lit: &LiteralValue) {
        match lit {
            LiteralValue::Undefined => self.chunk.emit_op(OpCode::Undefined),
            LiteralValue::Null => self.chunk.emit_op(OpCode::Null),
            LiteralValue::Boolean(true) => self.chunk.emit_op(OpCode::True),
            LiteralValue::Boolean(false) => self.chunk.emit_op(OpCode::False),
            LiteralValue::Number(n) => {
                let idx = self.chunk.add_constant(JsValue::Number(*n));
                self.chunk.emit_with(OpCode::Constant, idx)
            }
            LiteralValue::String(s) => {
                let idx = self.chunk.add_constant(JsValue::String(s.clone()));
                self.chunk.emit_with(OpCode::Constant, idx)
            }
        };
    }

    fn compile_load(&mut self, slot: &Slot) {
        match slot {
            Slot::Local(index) => {
                self.chunk.emit_with(OpCode::GetLocal, *index as u32);
            }
            Slot::Closure { depth, index } => {
                self.chunk.emit(Instruction::with_two_operands(
                    OpCode::GetScoped,
                    *depth as u32,
                    *index as u32,
                ));
            }
            Slot::Global(name) => {
                let name_idx = self.chunk.add_name(name);
                self.chunk.emit_with(OpCode::GetGlobal, name_idx);
            }
        }
    }

    /// Pops the top of the stack into `slot`.
    fn compile_store(&mut self, slot: &Slot) {
        match slot {
            Slot::Local(index) => {
                self.chunk.emit_with(OpCode::SetLocal, *index as u32);
            }
            Slot::Closure { depth, index } => {
                self.chunk.emit(Instruction::with_two_operands(
                    OpCode::SetScoped,
                    *depth as u32,
                    *index as u32,
                ));
            }
            Slot::Global(name) => {
                let name_idx = self.chunk.add_name(name);
                self.chunk.emit_with(OpCode::SetGlobal, name_idx);
            }
        }
    }

    fn compile_binary_op(&mut self, op: BinaryOperator, numeric: bool) {
        let opcode = match op {
            BinaryOperator::Add if numeric => OpCode::AddNum,
            BinaryOperator::Subtract if numeric => OpCode::SubNum,
            BinaryOperator::Multiply if numeric => OpCode::MulNum,
            BinaryOperator::Divide if numeric => OpCode::DivNum,
            BinaryOperator::Modulo if numeric => OpCode::ModNum,
            BinaryOperator::LessThan if numeric => OpCode::LessNum,
            BinaryOperator::LessThanEqual if numeric => OpCode::LessEqualNum,
            BinaryOperator::GreaterThan if numeric => OpCode::GreaterNum,
            BinaryOperator::GreaterThanEqual if numeric => OpCode::GreaterEqualNum,
            BinaryOperator::Add => OpCode::Add,
            BinaryOperator::Subtract => OpCode::Sub,
            BinaryOperator::Multiply => OpCode::Mul,
            BinaryOperator::Divide => OpCode::Div,
            BinaryOperator::Modulo => OpCode::Mod,
            BinaryOperator::StrictlyEqual => OpCode::StrictEqual,
            BinaryOperator::StrictlyUnequal => OpCode::StrictNotEqual,
            BinaryOperator::LooselyEqual => OpCode::Equal,
            BinaryOperator::LooselyUnequal => OpCode::NotEqual,
            BinaryOperator::LessThan => OpCode::LessThan,
            BinaryOperator::LessThanEqual => OpCode::LessEqual,
            BinaryOperator::GreaterThan => OpCode::GreaterThan,
            BinaryOperator::GreaterThanEqual => OpCode::GreaterEqual,
            BinaryOperator::BitwiseAnd => OpCode::BitAnd,
            BinaryOperator::BitwiseOr => OpCode::BitOr,
            BinaryOperator::BitwiseXor => OpCode::BitXor,
            BinaryOperator::BitwiseLeftShift => OpCode::ShiftLeft,
            BinaryOperator::BitwiseRightShift => OpCode::ShiftRight,
            BinaryOperator::BitwiseUnsignedRightShift => OpCode::UShiftRight,
            BinaryOperator::In => OpCode::In,
            BinaryOperator::InstanceOf => OpCode::InstanceOf,
        };
        self.chunk.emit_op(opcode);
    }

    fn compile_unary(&mut self, op: UnaryOperator, argument: &Node) -> Result<(), CompileError> {
        match op {
            UnaryOperator::Delete => return self.compile_delete(argument),
            UnaryOperator::TypeOf => {
                if let NodeKind::Variable {
                    slot: Slot::Global(name),
                    ..
                } = &argument.kind
                {
                    let name_idx = self.chunk.add_name(name);
                    self.chunk.emit_with(OpCode::TypeOfGlobal, name_idx);
                    return Ok(());
                }
            }
            _ => {}
        }
        self.compile_expression(argument)?;
        let opcode = match op {
            UnaryOperator::Minus if argument.expr_type == ExprType::Number => OpCode::NegateNum,
            UnaryOperator::Minus => OpCode::Negate,
            UnaryOperator::Plus => OpCode::UnaryPlus,
            UnaryOperator::LogicalNot if argument.expr_type == ExprType::Boolean => {
                OpCode::NotBool
            }
            UnaryOperator::LogicalNot => OpCode::Not,
            UnaryOperator::BitwiseNot => OpCode::BitNot,
            UnaryOperator::TypeOf => OpCode::TypeOf,
            UnaryOperator::Void | UnaryOperator::Delete => OpCode::Void,
        };
        self.chunk.emit_op(opcode);
        Ok(())
    }

    fn compile_delete(&mut self, argument: &Node) -> Result<(), CompileError> {
        match &argument.kind {
            NodeKind::Variable {
                slot: Slot::Global(name),
                ..
            } => {
                let name_idx = self.chunk.add_name(name);
                self.chunk.emit_with(OpCode::DeleteGlobal, name_idx);
            }
            // Function-scoped bindings cannot be deleted.
            NodeKind::Variable { .. } => {
                self.chunk.emit_op(OpCode::False);
            }
            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                match property {
                    MemberProperty::Named(name) => {
                        let name_idx = self.chunk.add_name(name);
                        self.chunk.emit_with(OpCode::DeleteProp, name_idx);
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.chunk.emit_op(OpCode::DeleteElem);
                    }
                }
            }
            _ => {
                self.compile_expression(argument)?;
                self.chunk.emit_op(OpCode::Pop);
                self.chunk.emit_op(OpCode::True);
            }
        }
        Ok(())
    }

    fn compile_logical(
        &mut self,
        op: LogicalOperator,
        left: &Node,
        right: &Node,
    ) -> Result<(), CompileError> {
        self.compile_expression(left)?;
        self.chunk.emit_op(OpCode::Dup);
        let jump = match op {
            // Short-circuit: if left is falsy, skip right
            LogicalOperator::And => self.chunk.emit_with(OpCode::JumpIfFalse, 0),
            // Short-circuit: if left is truthy, skip right
            LogicalOperator::Or => self.chunk.emit_with(OpCode::JumpIfTrue, 0),
        };
        self.chunk.emit_op(OpCode::Pop);
        self.compile_expression(right)?;
        self.chunk.patch_jump(jump);
        Ok(())
    }

    fn compile_update(
        &mut self,
        op: UpdateOperator,
        prefix: bool,
        argument: &Node,
    ) -> Result<(), CompileError> {
        let step = match op {
            UpdateOperator::PlusPlus => OpCode::Increment,
            UpdateOperator::MinusMinus => OpCode::Decrement,
        };
        match &argument.kind {
            NodeKind::Variable { slot, .. } => {
                self.compile_load(slot);
                if prefix {
                    self.chunk.emit_op(step);
                    self.chunk.emit_op(OpCode::Dup);
                } else {
                    self.chunk.emit_op(OpCode::UnaryPlus);
                    self.chunk.emit_op(OpCode::Dup);
                    self.chunk.emit_op(step);
                }
                self.compile_store(slot);
            }
            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                let (depth, set_op, name_idx) = match property {
                    MemberProperty::Named(name) => {
                        let name_idx = self.chunk.add_name(name);
                        self.chunk.emit_op(OpCode::Dup);
                        self.chunk.emit_with(OpCode::GetProp, name_idx);
                        (2, OpCode::SetProp, name_idx)
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.chunk.emit_op(OpCode::Dup2);
                        self.chunk.emit_op(OpCode::GetElem);
                        (3, OpCode::SetElem, 0)
                    }
                };
                if prefix {
                    self.chunk.emit_op(step);
                    self.chunk.emit_with(set_op, name_idx);
                } else {
                    // Keep the old value below the reference for the result.
                    self.chunk.emit_op(OpCode::UnaryPlus);
                    self.chunk.emit_op(OpCode::Dup);
                    self.chunk.emit_with(OpCode::Bury, depth);
                    self.chunk.emit_op(step);
                    self.chunk.emit_with(set_op, name_idx);
                    self.chunk.emit_op(OpCode::Pop);
                }
            }
            _ => {
                return Err(backend_error(format!(
                    "Invalid left-hand side expression in {} operation at {}",
                    if prefix { "prefix" } else { "postfix" },
                    argument.position
                )))
            }
        }
        Ok(())
    }

    fn compile_assignment(
        &mut self,
        op: AssignmentOperator,
        target: &Node,
        value: &Node,
        result_type: ExprType,
    ) -> Result<(), CompileError> {
        let numeric = result_type == ExprType::Number;
        match &target.kind {
            NodeKind::Variable { slot, .. } => {
                match op.binary_operator() {
                    None => self.compile_expression(value)?,
                    Some(binary) => {
                        // Compound assignment: get current value, compute, set
                        self.compile_load(slot);
                        self.compile_expression(value)?;
                        self.compile_binary_op(binary, numeric);
                    }
                }
                self.chunk.emit_op(OpCode::Dup); // keep value on stack as result
                self.compile_store(slot);
            }
            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                match property {
                    MemberProperty::Named(name) => {
                        let prop_idx = self.chunk.add_name(name);
                        if let Some(binary) = op.binary_operator() {
                            self.chunk.emit_op(OpCode::Dup);
                            self.chunk.emit_with(OpCode::GetProp, prop_idx);
                            self.compile_expression(value)?;
                            self.compile_binary_op(binary, numeric);
                        } else {
                            self.compile_expression(value)?;
                        }
                        self.chunk.emit_with(OpCode::SetProp, prop_idx);
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        if let Some(binary) = op.binary_operator() {
                            self.chunk.emit_op(OpCode::Dup2);
                            self.chunk.emit_op(OpCode::GetElem);
                            self.compile_expression(value)?;
                            self.compile_binary_op(binary, numeric);
                        } else {
                            self.compile_expression(value)?;
                        }
                        self.chunk.emit_op(OpCode::SetElem);
                    }
                }
            }
            _ => {
                return Err(backend_error(format!(
                    "Invalid left-hand side in assignment at {}",
                    target.position
                )))
            }
        }
        Ok(())
    }

    fn compile_call(&mut self, callee: &Node, arguments: &[Node]) -> Result<(), CompileError> {
        let opcode = match &callee.kind {
            // Method call: push receiver and callee, then args, then CallMethod
            NodeKind::Member { object, property } => {
                self.compile_expression(object)?;
                self.chunk.emit_op(OpCode::Dup);
                match property {
                    MemberProperty::Named(name) => {
                        let name_idx = self.chunk.add_name(name);
                        self.chunk.emit_with(OpCode::GetProp, name_idx);
                    }
                    MemberProperty::Computed(key) => {
                        self.compile_expression(key)?;
                        self.chunk.emit_op(OpCode::GetElem);
                    }
                }
                OpCode::CallMethod
            }
            _ => {
                self.compile_expression(callee)?;
                OpCode::Call
            }
        };
        for arg in arguments {
            self.compile_expression(arg)?;
        }
        self.chunk.emit_with(opcode, arguments.len() as u32);
        Ok(())
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

fn variable_slot(target: &Node) -> Result<&Slot, CompileError> {
    match &target.kind {
        NodeKind::Variable { slot, .. } => Ok(slot),
        _ => Err(backend_error(format!(
            "unresolved declaration target at {}",
            target.position
        ))),
    }
}

/// Function declarations reachable from `stmt` without entering another function.
fn collect_function_declarations<'n>(stmt: &'n Node, out: &mut Vec<&'n FunctionData>) {
    match &stmt.kind {
        NodeKind::FunctionDecl(data) => out.push(data),
        NodeKind::Block(body) => {
            for n in body {
                collect_function_declarations(n, out);
            }
        }
        NodeKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_function_declarations(consequent, out);
            if let Some(a) = alternate {
                collect_function_declarations(a, out);
            }
        }
        NodeKind::For { body, .. }
        | NodeKind::ForIn { body, .. }
        | NodeKind::While { body, .. }
        | NodeKind::DoWhile { body, .. }
        | NodeKind::Label { body, .. } => collect_function_declarations(body, out),
        _ => {}
    }
}

/// The stack bytecode backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytecodeBackend;

impl BytecodeBackend {
    pub fn new() -> Self {
        BytecodeBackend
    }
}

impl CompilerBackend for BytecodeBackend {
    fn compile(&self, program: &Node) -> Result<CompiledScript, CompileError> {
        let chunk = Compiler::new().compile_program(program)?;
        log::debug!(
            "Compiled {} instructions, {} functions",
            chunk.code.len(),
            chunk.functions.len()
        );
        log::trace!("{}", chunk.disassemble("script"));
        Ok(CompiledScript::new(chunk))
    }
}
