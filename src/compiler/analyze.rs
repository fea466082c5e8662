//! The analysis pass.
//!
//! [`analyze`] consumes a node and returns it, or a replacement, with identifiers resolved
//! to slots, constant subtrees folded and an [`ExprType`] on every expression. Children are
//! always analysed left to right before their parent computes its own type, so the
//! known-type map in the [`ScopeContext`] reflects evaluation order. The map is cleared
//! wherever code may or may not run (the far side of a branch, loops, labels) and after
//! calls, which can write any variable they close over.

use std::time::Instant;

use rustc_hash::FxHashSet;

use crate::compiler::error::{CompileError, JumpKind};
use crate::compiler::expr_type::ExprType;
use crate::compiler::scope::ScopeContext;
use crate::parser::ast::{
    BinaryOperator, FunctionData, FunctionLayout, LiteralValue, LogicalOperator, MemberProperty,
    Node, NodeKind, PropertyData, SourcePosition, UnaryOperator, VariableDeclarator,
};
use crate::runner::ds::operations::arithmetic;
use crate::runner::ds::operations::test_and_comparison::{
    abstract_equality_comparison, add, greater_than, greater_than_or_equal, less_than,
    less_than_or_equal, strict_equality_comparison,
};
use crate::runner::ds::operations::type_conversion::{get_type, to_boolean, to_number};

/// Switches for the optional parts of analysis. Slot resolution and label checking always
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzeOptions {
    pub narrow_types: bool,
    pub fold_constants: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        AnalyzeOptions {
            narrow_types: true,
            fold_constants: true,
        }
    }
}

/// Analyses a whole program in a fresh program scope.
pub fn analyze_program(program: Node, options: AnalyzeOptions) -> Result<Node, CompileError> {
    let start = Instant::now();
    let mut scope = ScopeContext::new_program(options);
    let result = analyze(program, &mut scope)?;
    log::debug!("Analysis done in {:?}", start.elapsed());
    Ok(result)
}

pub fn analyze(node: Node, scope: &mut ScopeContext) -> Result<Node, CompileError> {
    let Node { kind, position, .. } = node;
    match kind {
        NodeKind::Literal(value) => {
            let t = literal_type(&value);
            Ok(typed(NodeKind::Literal(value), position, t, scope))
        }
        NodeKind::Identifier(name) => {
            let slot = scope.resolve(&name);
            let t = scope.known_type(&name);
            log::trace!("{} resolved to {:?} ({})", name, slot, t);
            Ok(typed(NodeKind::Variable { name, slot }, position, t, scope))
        }
        NodeKind::Variable { name, slot } => {
            let t = scope.known_type(&name);
            Ok(typed(NodeKind::Variable { name, slot }, position, t, scope))
        }
        NodeKind::This => Ok(typed(NodeKind::This, position, ExprType::Dynamic, scope)),
        NodeKind::Array(elements) => {
            let mut analysed = Vec::with_capacity(elements.len());
            for element in elements {
                analysed.push(match element {
                    Some(e) => Some(analyze(e, scope)?),
                    None => None,
                });
            }
            Ok(typed(NodeKind::Array(analysed), position, ExprType::Object, scope))
        }
        NodeKind::Object(properties) => {
            let mut analysed = Vec::with_capacity(properties.len());
            for PropertyData { key, value } in properties {
                analysed.push(PropertyData {
                    key,
                    value: analyze(value, scope)?,
                });
            }
            Ok(typed(NodeKind::Object(analysed), position, ExprType::Object, scope))
        }
        NodeKind::Function(data) => {
            let data = analyze_function(*data, true, scope)?;
            Ok(typed(
                NodeKind::Function(Box::new(data)),
                position,
                ExprType::Function,
                scope,
            ))
        }
        NodeKind::Unary { operator, argument } => analyze_unary(operator, *argument, position, scope),
        NodeKind::Update {
            operator,
            prefix,
            argument,
        } => {
            let argument = analyze(*argument, scope)?;
            let t = ExprType::numeric(argument.expr_type, ExprType::Number);
            match &argument.kind {
                NodeKind::Variable { name, slot } => {
                    let (name, slot) = (name.clone(), slot.clone());
                    scope.record_type(&name, &slot, ExprType::Number);
                }
                _ => scope.forget_globals(),
            }
            Ok(typed(
                NodeKind::Update {
                    operator,
                    prefix,
                    argument: Box::new(argument),
                },
                position,
                t,
                scope,
            ))
        }
        NodeKind::Binary {
            operator,
            left,
            right,
        } => {
            let left = analyze(*left, scope)?;
            let right = analyze(*right, scope)?;
            if scope.options.fold_constants {
                if let (Some(l), Some(r)) = (left.literal(), right.literal()) {
                    if let Some(folded) = fold_binary(operator, l, r) {
                        log::trace!("Folded binary {:?} at {}", operator, position);
                        return Ok(literal_node(folded, position, scope));
                    }
                }
            }
            let t = binary_type(operator, left.expr_type, right.expr_type);
            Ok(typed(
                NodeKind::Binary {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
                t,
                scope,
            ))
        }
        NodeKind::Logical {
            operator,
            left,
            right,
        } => {
            let left = analyze(*left, scope)?;
            let right = analyze(*right, scope)?;
            scope.clear_known_types();
            if scope.options.fold_constants {
                if let Some(l) = left.literal() {
                    let truthy = to_boolean(&l.to_value());
                    let take_left = match operator {
                        LogicalOperator::And => !truthy,
                        LogicalOperator::Or => truthy,
                    };
                    return Ok(if take_left { left } else { right });
                }
            }
            let t = left.expr_type.join(right.expr_type);
            Ok(typed(
                NodeKind::Logical {
                    operator,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                position,
                t,
                scope,
            ))
        }
        NodeKind::Conditional {
            test,
            consequent,
            alternate,
        } => {
            let test = analyze(*test, scope)?;
            let consequent = analyze(*consequent, scope)?;
            scope.clear_known_types();
            let alternate = analyze(*alternate, scope)?;
            scope.clear_known_types();
            if scope.options.fold_constants {
                if let Some(t) = test.literal() {
                    return Ok(if to_boolean(&t.to_value()) {
                        consequent
                    } else {
                        alternate
                    });
                }
            }
            let t = consequent.expr_type.join(alternate.expr_type);
            Ok(typed(
                NodeKind::Conditional {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                },
                position,
                t,
                scope,
            ))
        }
        NodeKind::Assignment {
            operator,
            target,
            value,
        } => {
            let target = analyze(*target, scope)?;
            let value = analyze(*value, scope)?;
            let t = match operator.binary_operator() {
                None => value.expr_type,
                Some(op) => binary_type(op, target.expr_type, value.expr_type),
            };
            match &target.kind {
                NodeKind::Variable { name, slot } => {
                    let (name, slot) = (name.clone(), slot.clone());
                    scope.record_type(&name, &slot, t);
                }
                _ => scope.forget_globals(),
            }
            Ok(typed(
                NodeKind::Assignment {
                    operator,
                    target: Box::new(target),
                    value: Box::new(value),
                },
                position,
                t,
                scope,
            ))
        }
        NodeKind::Call { callee, arguments } => {
            let callee = analyze(*callee, scope)?;
            let arguments = analyze_all(arguments, scope)?;
            scope.clear_known_types();
            Ok(typed(
                NodeKind::Call {
                    callee: Box::new(callee),
                    arguments,
                },
                position,
                ExprType::Dynamic,
                scope,
            ))
        }
        NodeKind::New { callee, arguments } => {
            let callee = analyze(*callee, scope)?;
            let arguments = analyze_all(arguments, scope)?;
            scope.clear_known_types();
            Ok(typed(
                NodeKind::New {
                    callee: Box::new(callee),
                    arguments,
                },
                position,
                ExprType::Dynamic,
                scope,
            ))
        }
        NodeKind::Member { object, property } => {
            let object = analyze(*object, scope)?;
            let property = match property {
                MemberProperty::Named(name) => MemberProperty::Named(name),
                MemberProperty::Computed(key) => {
                    let key = analyze(*key, scope)?;
                    match key.kind {
                        NodeKind::Literal(LiteralValue::String(s)) if scope.options.fold_constants => {
                            MemberProperty::Named(s)
                        }
                        kind => MemberProperty::Computed(Box::new(Node { kind, ..key })),
                    }
                }
            };
            Ok(typed(
                NodeKind::Member {
                    object: Box::new(object),
                    property,
                },
                position,
                ExprType::Dynamic,
                scope,
            ))
        }
        NodeKind::Sequence(expressions) => {
            let expressions = analyze_all(expressions, scope)?;
            let t = expressions
                .last()
                .map(|e| e.expr_type)
                .unwrap_or(ExprType::Undefined);
            Ok(typed(NodeKind::Sequence(expressions), position, t, scope))
        }

        // ── Statements ───────────────────────────────────────
        NodeKind::Program { body, .. } => {
            let declarations = hoisted_names(&body);
            for name in declarations.iter() {
                scope.declare(name);
            }
            let body = analyze_all(body, scope)?;
            Ok(statement(NodeKind::Program { body, declarations }, position))
        }
        NodeKind::FunctionDecl(data) => {
            let data = analyze_function(*data, false, scope)?;
            Ok(statement(NodeKind::FunctionDecl(Box::new(data)), position))
        }
        NodeKind::Var(declarators) => {
            let mut analysed = Vec::with_capacity(declarators.len());
            for VariableDeclarator { target, init } in declarators {
                let target = analyze(target, scope)?;
                let init = match init {
                    Some(init) => {
                        let init = analyze(init, scope)?;
                        if let NodeKind::Variable { name, slot } = &target.kind {
                            scope.record_type(name, slot, init.expr_type);
                        }
                        Some(init)
                    }
                    None => None,
                };
                analysed.push(VariableDeclarator { target, init });
            }
            Ok(statement(NodeKind::Var(analysed), position))
        }
        NodeKind::ExpressionStatement(expression) => {
            let expression = analyze(*expression, scope)?;
            Ok(statement(
                NodeKind::ExpressionStatement(Box::new(expression)),
                position,
            ))
        }
        NodeKind::Block(body) => {
            let body = analyze_all(body, scope)?;
            Ok(statement(NodeKind::Block(body), position))
        }
        NodeKind::Empty => Ok(statement(NodeKind::Empty, position)),
        NodeKind::If {
            test,
            consequent,
            alternate,
        } => {
            let test = analyze(*test, scope)?;
            let consequent = analyze(*consequent, scope)?;
            scope.clear_known_types();
            let alternate = match alternate {
                Some(a) => Some(Box::new(analyze(*a, scope)?)),
                None => None,
            };
            scope.clear_known_types();
            Ok(statement(
                NodeKind::If {
                    test: Box::new(test),
                    consequent: Box::new(consequent),
                    alternate,
                },
                position,
            ))
        }
        NodeKind::For {
            init,
            test,
            update,
            body,
        } => {
            let init = analyze_optional(init, scope)?;
            scope.clear_known_types();
            scope.enter_iteration();
            let test = analyze_optional(test, scope)?;
            let body = analyze(*body, scope);
            scope.exit_iteration();
            let body = body?;
            // `continue` reaches the update from anywhere in the body.
            scope.clear_known_types();
            let update = analyze_optional(update, scope)?;
            scope.clear_known_types();
            Ok(statement(
                NodeKind::For {
                    init,
                    test,
                    update,
                    body: Box::new(body),
                },
                position,
            ))
        }
        NodeKind::ForIn {
            target,
            iterable,
            body,
        } => {
            let iterable = analyze(*iterable, scope)?;
            scope.clear_known_types();
            let target = for_in_target(*target);
            let target = analyze(target, scope)?;
            if let NodeKind::Variable { name, .. } = &target.kind {
                scope.forget_type(name);
            }
            scope.enter_iteration();
            let body = analyze(*body, scope);
            scope.exit_iteration();
            let body = body?;
            scope.clear_known_types();
            Ok(statement(
                NodeKind::ForIn {
                    target: Box::new(target),
                    iterable: Box::new(iterable),
                    body: Box::new(body),
                },
                position,
            ))
        }
        NodeKind::While { test, body } => {
            scope.clear_known_types();
            scope.enter_iteration();
            let test = analyze(*test, scope)?;
            let body = analyze(*body, scope);
            scope.exit_iteration();
            let body = body?;
            scope.clear_known_types();
            Ok(statement(
                NodeKind::While {
                    test: Box::new(test),
                    body: Box::new(body),
                },
                position,
            ))
        }
        NodeKind::DoWhile { body, test } => {
            scope.clear_known_types();
            scope.enter_iteration();
            let body = analyze(*body, scope);
            scope.exit_iteration();
            let body = body?;
            scope.clear_known_types();
            let test = analyze(*test, scope)?;
            scope.clear_known_types();
            Ok(statement(
                NodeKind::DoWhile {
                    body: Box::new(body),
                    test: Box::new(test),
                },
                position,
            ))
        }
        NodeKind::Break { label } => {
            check_jump(&label, JumpKind::Break, position, scope)?;
            Ok(statement(NodeKind::Break { label }, position))
        }
        NodeKind::Continue { label } => {
            check_jump(&label, JumpKind::Continue, position, scope)?;
            Ok(statement(NodeKind::Continue { label }, position))
        }
        NodeKind::Return(argument) => {
            if scope.is_program() {
                return Err(CompileError::IllegalReturn { position });
            }
            let argument = analyze_optional(argument, scope)?;
            Ok(statement(NodeKind::Return(argument), position))
        }
        NodeKind::Label { name, body } => {
            if !scope.push_label(&name, body.is_iteration()) {
                return Err(CompileError::DuplicateLabel {
                    label: name,
                    position,
                });
            }
            scope.clear_known_types();
            let body = analyze(*body, scope);
            scope.pop_label();
            let body = body?;
            scope.clear_known_types();
            Ok(statement(
                NodeKind::Label {
                    name,
                    body: Box::new(body),
                },
                position,
            ))
        }
    }
}

fn analyze_unary(
    operator: UnaryOperator,
    argument: Node,
    position: SourcePosition,
    scope: &mut ScopeContext,
) -> Result<Node, CompileError> {
    let argument = analyze(argument, scope)?;
    if operator == UnaryOperator::Delete {
        match &argument.kind {
            NodeKind::Variable { name, .. } => {
                let name = name.clone();
                scope.forget_type(&name);
            }
            _ => scope.forget_globals(),
        }
    } else if scope.options.fold_constants {
        if let Some(v) = argument.literal() {
            if let Some(folded) = fold_unary(operator, v) {
                log::trace!("Folded unary {} at {}", operator, position);
                return Ok(literal_node(folded, position, scope));
            }
        }
        if operator == UnaryOperator::TypeOf && scope.options.narrow_types {
            if let (NodeKind::Variable { .. }, Some(s)) =
                (&argument.kind, argument.expr_type.type_of())
            {
                log::trace!("Folded typeof of {} variable at {}", argument.expr_type, position);
                return Ok(literal_node(
                    LiteralValue::String(s.to_string()),
                    position,
                    scope,
                ));
            }
        }
    }
    let t = match operator {
        UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::BitwiseNot => {
            ExprType::numeric(argument.expr_type, ExprType::Number)
        }
        UnaryOperator::LogicalNot | UnaryOperator::Delete => ExprType::Boolean,
        UnaryOperator::TypeOf => ExprType::String,
        UnaryOperator::Void => ExprType::Undefined,
    };
    Ok(typed(
        NodeKind::Unary {
            operator,
            argument: Box::new(argument),
        },
        position,
        t,
        scope,
    ))
}

/// Analyses a function body in its own scope. `is_expression` decides whether the
/// function's name is bound inside it; declarations bind their name in the enclosing scope.
fn analyze_function(
    data: FunctionData,
    is_expression: bool,
    parent: &ScopeContext,
) -> Result<FunctionData, CompileError> {
    let FunctionData {
        name, params, body, ..
    } = data;
    let binding = match &name {
        Some(n) if !is_expression => Some(parent.resolve(n)),
        _ => None,
    };
    let mut scope = ScopeContext::new_function(parent, &params);
    for hoisted in hoisted_names(&body) {
        scope.declare(&hoisted);
    }
    let self_slot = match &name {
        Some(n) if is_expression && !scope.has_local(n) => scope.declare(n),
        _ => None,
    };
    let body = analyze_all(body, &mut scope)?;
    log::trace!(
        "Function {} has {} locals",
        name.as_deref().unwrap_or("<anonymous>"),
        scope.local_count()
    );
    Ok(FunctionData {
        name,
        params,
        body,
        layout: Some(FunctionLayout {
            local_count: scope.local_count(),
            self_slot,
        }),
        binding,
    })
}

fn analyze_all(nodes: Vec<Node>, scope: &mut ScopeContext) -> Result<Vec<Node>, CompileError> {
    nodes.into_iter().map(|n| analyze(n, scope)).collect()
}

fn analyze_optional(
    node: Option<Box<Node>>,
    scope: &mut ScopeContext,
) -> Result<Option<Box<Node>>, CompileError> {
    match node {
        Some(n) => Ok(Some(Box::new(analyze(*n, scope)?))),
        None => Ok(None),
    }
}

/// `for (var k in o)` writes to `k` like `for (k in o)`; the `var` part is already hoisted.
fn for_in_target(target: Node) -> Node {
    match target.kind {
        NodeKind::Var(mut declarators) if declarators.len() == 1 => declarators.remove(0).target,
        kind => Node { kind, ..target },
    }
}

fn check_jump(
    label: &Option<String>,
    kind: JumpKind,
    position: SourcePosition,
    scope: &ScopeContext,
) -> Result<(), CompileError> {
    let valid = match label {
        Some(name) => match scope.find_label(name) {
            Some(entry) => kind == JumpKind::Break || entry.is_iteration,
            None => false,
        },
        None => scope.in_iteration(),
    };
    if valid {
        Ok(())
    } else {
        Err(CompileError::InvalidLabelTarget {
            label: label.clone(),
            kind,
            position,
        })
    }
}

/// Names declared with `var` or as functions anywhere in `body`, without descending into
/// nested functions. First occurrence order.
pub fn hoisted_names(body: &[Node]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut names = vec![];
    for node in body {
        collect_hoisted(node, &mut seen, &mut names);
    }
    names
}

fn collect_hoisted(node: &Node, seen: &mut FxHashSet<String>, names: &mut Vec<String>) {
    let mut add = |name: &str| {
        if seen.insert(name.to_string()) {
            names.push(name.to_string());
        }
    };
    match &node.kind {
        NodeKind::Var(declarators) => {
            for d in declarators {
                if let NodeKind::Identifier(name) | NodeKind::Variable { name, .. } = &d.target.kind
                {
                    add(name);
                }
            }
        }
        NodeKind::FunctionDecl(data) => {
            if let Some(name) = &data.name {
                add(name);
            }
        }
        NodeKind::Block(body) => {
            for n in body {
                collect_hoisted(n, seen, names);
            }
        }
        NodeKind::If {
            consequent,
            alternate,
            ..
        } => {
            collect_hoisted(consequent, seen, names);
            if let Some(a) = alternate {
                collect_hoisted(a, seen, names);
            }
        }
        NodeKind::For { init, body, .. } => {
            if let Some(init) = init {
                collect_hoisted(init, seen, names);
            }
            collect_hoisted(body, seen, names);
        }
        NodeKind::ForIn { target, body, .. } => {
            collect_hoisted(target, seen, names);
            collect_hoisted(body, seen, names);
        }
        NodeKind::While { body, .. } | NodeKind::DoWhile { body, .. } => {
            collect_hoisted(body, seen, names)
        }
        NodeKind::Label { body, .. } => collect_hoisted(body, seen, names),
        _ => {}
    }
}

fn typed(kind: NodeKind, position: SourcePosition, t: ExprType, scope: &ScopeContext) -> Node {
    let t = if scope.options.narrow_types {
        t
    } else {
        ExprType::Dynamic
    };
    Node {
        kind,
        position,
        expr_type: t,
    }
}

fn statement(kind: NodeKind, position: SourcePosition) -> Node {
    Node::new(kind, position)
}

fn literal_node(value: LiteralValue, position: SourcePosition, scope: &ScopeContext) -> Node {
    let t = literal_type(&value);
    typed(NodeKind::Literal(value), position, t, scope)
}

fn literal_type(value: &LiteralValue) -> ExprType {
    match value {
        LiteralValue::Undefined => ExprType::Undefined,
        LiteralValue::Null => ExprType::Dynamic,
        LiteralValue::Boolean(_) => ExprType::Boolean,
        LiteralValue::Number(_) => ExprType::Number,
        LiteralValue::String(_) => ExprType::String,
    }
}

fn binary_type(operator: BinaryOperator, left: ExprType, right: ExprType) -> ExprType {
    if operator.is_comparison() {
        ExprType::Boolean
    } else {
        ExprType::numeric(left, right)
    }
}

fn fold_unary(operator: UnaryOperator, v: &LiteralValue) -> Option<LiteralValue> {
    let v = v.to_value();
    Some(match operator {
        UnaryOperator::Minus => LiteralValue::Number(-to_number(&v)),
        UnaryOperator::Plus => LiteralValue::Number(to_number(&v)),
        UnaryOperator::BitwiseNot => LiteralValue::Number(arithmetic::bit_not(&v)),
        UnaryOperator::LogicalNot => LiteralValue::Boolean(!to_boolean(&v)),
        UnaryOperator::TypeOf => LiteralValue::String(get_type(&v).to_string()),
        UnaryOperator::Void => LiteralValue::Undefined,
        UnaryOperator::Delete => return None,
    })
}

fn fold_binary(operator: BinaryOperator, l: &LiteralValue, r: &LiteralValue) -> Option<LiteralValue> {
    let (a, b) = (l.to_value(), r.to_value());
    let number = |n: f64| Some(LiteralValue::Number(n));
    let boolean = |b: bool| Some(LiteralValue::Boolean(b));
    match operator {
        BinaryOperator::Add => LiteralValue::from_value(add(&a, &b)),
        BinaryOperator::Subtract => number(arithmetic::subtract(&a, &b)),
        BinaryOperator::Multiply => number(arithmetic::multiply(&a, &b)),
        BinaryOperator::Divide => number(arithmetic::divide(&a, &b)),
        BinaryOperator::Modulo => number(arithmetic::remainder(&a, &b)),
        BinaryOperator::BitwiseLeftShift => number(arithmetic::shift_left(&a, &b)),
        BinaryOperator::BitwiseRightShift => number(arithmetic::shift_right(&a, &b)),
        BinaryOperator::BitwiseUnsignedRightShift => {
            number(arithmetic::unsigned_shift_right(&a, &b))
        }
        BinaryOperator::BitwiseAnd => number(arithmetic::bit_and(&a, &b)),
        BinaryOperator::BitwiseOr => number(arithmetic::bit_or(&a, &b)),
        BinaryOperator::BitwiseXor => number(arithmetic::bit_xor(&a, &b)),
        BinaryOperator::LooselyEqual => boolean(abstract_equality_comparison(&a, &b)),
        BinaryOperator::LooselyUnequal => boolean(!abstract_equality_comparison(&a, &b)),
        BinaryOperator::StrictlyEqual => boolean(strict_equality_comparison(&a, &b)),
        BinaryOperator::StrictlyUnequal => boolean(!strict_equality_comparison(&a, &b)),
        BinaryOperator::LessThan => boolean(less_than(&a, &b)),
        BinaryOperator::LessThanEqual => boolean(less_than_or_equal(&a, &b)),
        BinaryOperator::GreaterThan => boolean(greater_than(&a, &b)),
        BinaryOperator::GreaterThanEqual => boolean(greater_than_or_equal(&a, &b)),
        BinaryOperator::In | BinaryOperator::InstanceOf => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ast::Slot;
    use crate::parser::JsParser;

    fn analysed(source: &str, options: AnalyzeOptions) -> Result<Vec<Node>, CompileError> {
        let program = JsParser::parse_to_ast(source)?;
        match analyze_program(program, options)?.kind {
            NodeKind::Program { body, .. } => Ok(body),
            other => panic!("not a program: {:?}", other),
        }
    }

    fn last_expression(source: &str, options: AnalyzeOptions) -> Node {
        let body = analysed(source, options).unwrap();
        match body.into_iter().last().map(|n| n.kind) {
            Some(NodeKind::ExpressionStatement(e)) => *e,
            other => panic!("not an expression statement: {:?}", other),
        }
    }

    fn expression(source: &str) -> Node {
        last_expression(source, AnalyzeOptions::default())
    }

    fn no_folding() -> AnalyzeOptions {
        AnalyzeOptions {
            narrow_types: true,
            fold_constants: false,
        }
    }

    #[test]
    fn test_folds_arithmetic() {
        let e = expression("1 + 2 * 3");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::Number(7.0)));
        assert_eq!(e.expr_type, ExprType::Number);
        let e = expression("'a' + 1");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::String("a1".to_string())));
        let e = expression("1 >>> 0 === 1");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::Boolean(true)));
    }

    #[test]
    fn test_numeric_narrowing_without_folding() {
        let e = last_expression("var a = 1, b = 2; a * b", no_folding());
        assert_eq!(e.expr_type, ExprType::Number);
        let e = last_expression("var a = 1, b = 's'; a + b", no_folding());
        assert_eq!(e.expr_type, ExprType::Dynamic);
        let e = last_expression("var a = 1; a < 2", no_folding());
        assert_eq!(e.expr_type, ExprType::Boolean);
    }

    #[test]
    fn test_typeof_of_known_variable_folds() {
        let e = expression("var s = 'x'; typeof s");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::String("string".to_string())));
        let e = expression("var s = 'x'; f(); typeof s");
        assert!(matches!(e.kind, NodeKind::Unary { .. }));
        assert_eq!(e.expr_type, ExprType::String);
    }

    #[test]
    fn test_branches_clear_known_types() {
        let e = last_expression("var n = 1; if (c) n = 'a'; n", no_folding());
        assert_eq!(e.expr_type, ExprType::Dynamic);
        let e = last_expression("var n = 1; c && (n = 2); n", no_folding());
        assert_eq!(e.expr_type, ExprType::Dynamic);
    }

    #[test]
    fn test_loop_update_ignores_body_writes() {
        let body = analysed("var x = 's'; for (;; x) { x = 1 }", no_folding()).unwrap();
        match &body[1].kind {
            NodeKind::For {
                update: Some(update),
                ..
            } => assert_eq!(update.expr_type, ExprType::Dynamic),
            other => panic!("not a for loop: {:?}", other),
        }
    }

    #[test]
    fn test_logical_and_conditional_join() {
        let e = last_expression("var a = 1, b = 2; a || b", no_folding());
        assert_eq!(e.expr_type, ExprType::Number);
        let e = last_expression("var a = 1; c ? a : 'x'", no_folding());
        assert_eq!(e.expr_type, ExprType::Dynamic);
        let e = expression("0 || 'x'");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::String("x".to_string())));
        let e = expression("true ? 1 : f()");
        assert_eq!(e.kind, NodeKind::Literal(LiteralValue::Number(1.0)));
    }

    #[test]
    fn test_update_makes_number() {
        let e = last_expression("var s = '5'; s++; s", no_folding());
        assert_eq!(e.expr_type, ExprType::Number);
    }

    #[test]
    fn test_fixed_result_types() {
        assert_eq!(expression("[1, 2]").expr_type, ExprType::Object);
        assert_eq!(expression("({})").expr_type, ExprType::Object);
        assert_eq!(expression("new F()").expr_type, ExprType::Dynamic);
        assert_eq!(expression("(function () {})").expr_type, ExprType::Function);
        assert_eq!(expression("f()").expr_type, ExprType::Dynamic);
        assert_eq!(expression("o.p").expr_type, ExprType::Dynamic);
        assert_eq!(expression("delete o.p").expr_type, ExprType::Boolean);
        assert_eq!(expression("void f()").expr_type, ExprType::Undefined);
        assert_eq!(expression("typeof f()").expr_type, ExprType::String);
        assert_eq!(expression("!f()").expr_type, ExprType::Boolean);
    }

    #[test]
    fn test_narrowing_disabled_leaves_dynamic() {
        let options = AnalyzeOptions {
            narrow_types: false,
            fold_constants: false,
        };
        let e = last_expression("var a = 1; a * 2", options);
        assert_eq!(e.expr_type, ExprType::Dynamic);
        let e = last_expression("[1]", options);
        assert_eq!(e.expr_type, ExprType::Dynamic);
    }

    #[test]
    fn test_string_key_becomes_named() {
        let e = expression("o['k']");
        match e.kind {
            NodeKind::Member { property, .. } => {
                assert_eq!(property, MemberProperty::Named("k".to_string()))
            }
            other => panic!("not a member: {:?}", other),
        }
    }

    #[test]
    fn test_function_slots() {
        let body = analysed(
            "function f(a) { var b; function g() { return a + b + c; } }",
            AnalyzeOptions::default(),
        )
        .unwrap();
        let f = match &body[0].kind {
            NodeKind::FunctionDecl(f) => f,
            other => panic!("not a function: {:?}", other),
        };
        assert_eq!(f.layout.as_ref().unwrap().local_count, 3);
        assert_eq!(f.binding, Some(Slot::Global("f".to_string())));
        let g = match &f.body[1].kind {
            NodeKind::FunctionDecl(g) => g,
            other => panic!("not a function: {:?}", other),
        };
        assert_eq!(g.binding, Some(Slot::Local(2)));
        let mut slots = vec![];
        collect_slots(&g.body[0], &mut slots);
        assert_eq!(
            slots,
            vec![
                Slot::Closure { depth: 1, index: 0 },
                Slot::Closure { depth: 1, index: 1 },
                Slot::Global("c".to_string()),
            ]
        );
    }

    fn collect_slots(node: &Node, slots: &mut Vec<Slot>) {
        match &node.kind {
            NodeKind::Variable { slot, .. } => slots.push(slot.clone()),
            NodeKind::Return(Some(e)) => collect_slots(e, slots),
            NodeKind::Binary { left, right, .. } => {
                collect_slots(left, slots);
                collect_slots(right, slots);
            }
            _ => {}
        }
    }

    #[test]
    fn test_named_function_expression_binds_itself() {
        let e = expression("(function fact(n) { return fact; })");
        match e.kind {
            NodeKind::Function(data) => {
                assert_eq!(
                    data.layout,
                    Some(FunctionLayout {
                        local_count: 2,
                        self_slot: Some(1)
                    })
                );
            }
            other => panic!("not a function: {:?}", other),
        }
    }

    #[test]
    fn test_program_declarations_are_hoisted() {
        let program = JsParser::parse_to_ast("x = 1; if (x) { var y; } function f() { var z; }")
            .unwrap();
        match analyze_program(program, AnalyzeOptions::default()).unwrap().kind {
            NodeKind::Program { declarations, .. } => {
                assert_eq!(declarations, vec!["y".to_string(), "f".to_string()])
            }
            other => panic!("not a program: {:?}", other),
        }
    }

    #[test]
    fn test_label_errors() {
        let options = AnalyzeOptions::default();
        assert!(matches!(
            analysed("break nowhere;", options),
            Err(CompileError::InvalidLabelTarget {
                kind: JumpKind::Break,
                ..
            })
        ));
        assert!(matches!(
            analysed("continue;", options),
            Err(CompileError::InvalidLabelTarget { label: None, .. })
        ));
        assert!(matches!(
            analysed("l: { while (1) { continue l; } }", options),
            Err(CompileError::InvalidLabelTarget {
                kind: JumpKind::Continue,
                ..
            })
        ));
        assert!(matches!(
            analysed("l: l: ;", options),
            Err(CompileError::DuplicateLabel { .. })
        ));
        assert!(matches!(
            analysed("l: while (1) { (function () { break l; }); }", options),
            Err(CompileError::InvalidLabelTarget { .. })
        ));
        assert!(analysed("l: { break l; }", options).is_ok());
        assert!(analysed("a: b: for (;;) { continue a; }", options).is_ok());
        assert!(analysed("l: ; l: ;", options).is_ok());
    }
}
