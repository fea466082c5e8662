//! Turns a parse tree into [`Node`]s.

use crate::compiler::error::CompileError;
use crate::runner::ds::operations::type_conversion::{number_to_string, string_to_number};

use super::ast::*;
use super::tree::{TreeKind, TreeNode};

fn unexpected<T: TreeNode>(node: &T, context: &str) -> CompileError {
    CompileError::Parse {
        message: format!(
            "Unexpected {:?} in {} at {}",
            node.kind(),
            context,
            node.position()
        ),
    }
}

fn child<T: TreeNode>(children: &[T], index: usize, parent: &T) -> Result<T, CompileError>
where
    T: Clone,
{
    children
        .get(index)
        .cloned()
        .ok_or_else(|| unexpected(parent, "incomplete construct"))
}

/// Builds the `Program` node for a `script` tree.
pub fn build_program<T: TreeNode + Clone>(root: &T) -> Result<Node, CompileError> {
    if root.kind() != TreeKind::Script {
        return Err(unexpected(root, "script"));
    }
    let body = build_statement_list(&root.children())?;
    Ok(Node::new(
        NodeKind::Program {
            body,
            declarations: vec![],
        },
        root.position(),
    ))
}

fn build_statement_list<T: TreeNode + Clone>(nodes: &[T]) -> Result<Vec<Node>, CompileError> {
    nodes.iter().map(build_statement).collect()
}

fn build_statement<T: TreeNode + Clone>(node: &T) -> Result<Node, CompileError> {
    let position = node.position();
    let children = node.children();
    let kind = match node.kind() {
        TreeKind::Block => NodeKind::Block(build_statement_list(&children)?),
        TreeKind::VariableStatement => NodeKind::Var(build_declarators(&children)?),
        TreeKind::EmptyStatement => NodeKind::Empty,
        TreeKind::ExpressionStatement => {
            NodeKind::ExpressionStatement(Box::new(build_expression(&child(&children, 0, node)?)?))
        }
        TreeKind::IfStatement => NodeKind::If {
            test: Box::new(build_expression(&child(&children, 0, node)?)?),
            consequent: Box::new(build_statement(&child(&children, 1, node)?)?),
            alternate: match children.get(2) {
                Some(s) => Some(Box::new(build_statement(s)?)),
                None => None,
            },
        },
        TreeKind::DoWhileStatement => NodeKind::DoWhile {
            body: Box::new(build_statement(&child(&children, 0, node)?)?),
            test: Box::new(build_expression(&child(&children, 1, node)?)?),
        },
        TreeKind::WhileStatement => NodeKind::While {
            test: Box::new(build_expression(&child(&children, 0, node)?)?),
            body: Box::new(build_statement(&child(&children, 1, node)?)?),
        },
        TreeKind::ForStatement => build_for(node, &children)?,
        TreeKind::ForInStatement => {
            let binding = child(&children, 0, node)?;
            let target = child(&binding.children(), 0, &binding)?;
            let target = if target.kind() == TreeKind::ForInDeclaration {
                let name = child(&target.children(), 0, &target)?;
                Node::new(
                    NodeKind::Var(vec![VariableDeclarator {
                        target: identifier(&name),
                        init: None,
                    }]),
                    target.position(),
                )
            } else {
                build_expression(&target)?
            };
            NodeKind::ForIn {
                target: Box::new(target),
                iterable: Box::new(build_expression(&child(&children, 1, node)?)?),
                body: Box::new(build_statement(&child(&children, 2, node)?)?),
            }
        }
        TreeKind::ContinueStatement => NodeKind::Continue {
            label: children.first().map(|l| l.text().to_string()),
        },
        TreeKind::BreakStatement => NodeKind::Break {
            label: children.first().map(|l| l.text().to_string()),
        },
        TreeKind::ReturnStatement => NodeKind::Return(match children.first() {
            Some(e) => Some(Box::new(build_expression(e)?)),
            None => None,
        }),
        TreeKind::LabelledStatement => NodeKind::Label {
            name: child(&children, 0, node)?.text().to_string(),
            body: Box::new(build_statement(&child(&children, 1, node)?)?),
        },
        TreeKind::FunctionDeclaration => NodeKind::FunctionDecl(Box::new(build_function(node)?)),
        _ => return Err(unexpected(node, "statement")),
    };
    Ok(Node::new(kind, position))
}

fn build_for<T: TreeNode + Clone>(node: &T, children: &[T]) -> Result<NodeKind, CompileError> {
    let mut init = None;
    let mut test = None;
    let mut update = None;
    let mut body = None;
    for c in children {
        match c.kind() {
            TreeKind::ForInit => {
                let inner = child(&c.children(), 0, c)?;
                init = Some(Box::new(if inner.kind() == TreeKind::ForVarDeclaration {
                    Node::new(
                        NodeKind::Var(build_declarators(&inner.children())?),
                        inner.position(),
                    )
                } else {
                    build_expression(&inner)?
                }));
            }
            TreeKind::ForTest => {
                test = Some(Box::new(build_expression(&child(&c.children(), 0, c)?)?))
            }
            TreeKind::ForUpdate => {
                update = Some(Box::new(build_expression(&child(&c.children(), 0, c)?)?))
            }
            _ => body = Some(Box::new(build_statement(c)?)),
        }
    }
    let body = body.ok_or_else(|| unexpected(node, "for statement without body"))?;
    Ok(NodeKind::For {
        init,
        test,
        update,
        body,
    })
}

fn build_declarators<T: TreeNode + Clone>(
    nodes: &[T],
) -> Result<Vec<VariableDeclarator>, CompileError> {
    let mut declarators = Vec::with_capacity(nodes.len());
    for declaration in nodes {
        if declaration.kind() != TreeKind::VariableDeclaration {
            return Err(unexpected(declaration, "variable declaration"));
        }
        let parts = declaration.children();
        let name = child(&parts, 0, declaration)?;
        let init = match parts.get(1) {
            Some(e) => Some(build_expression(e)?),
            None => None,
        };
        declarators.push(VariableDeclarator {
            target: identifier(&name),
            init,
        });
    }
    Ok(declarators)
}

fn identifier<T: TreeNode>(node: &T) -> Node {
    Node::new(NodeKind::Identifier(node.text().to_string()), node.position())
}

fn build_function<T: TreeNode + Clone>(node: &T) -> Result<FunctionData, CompileError> {
    let mut name = None;
    let mut params = vec![];
    let mut body = vec![];
    for c in node.children() {
        match c.kind() {
            TreeKind::Identifier => name = Some(c.text().to_string()),
            TreeKind::FormalParameters => {
                params = c.children().iter().map(|p| p.text().to_string()).collect()
            }
            TreeKind::FunctionBody => body = build_statement_list(&c.children())?,
            _ => return Err(unexpected(&c, "function")),
        }
    }
    Ok(FunctionData {
        name,
        params,
        body,
        layout: None,
        binding: None,
    })
}

fn build_expression<T: TreeNode + Clone>(node: &T) -> Result<Node, CompileError> {
    let position = node.position();
    let children = node.children();
    let kind = match node.kind() {
        TreeKind::Expression => {
            if children.len() == 1 {
                return build_expression(&children[0]);
            }
            NodeKind::Sequence(
                children
                    .iter()
                    .map(build_expression)
                    .collect::<Result<Vec<_>, _>>()?,
            )
        }
        TreeKind::AssignmentExpression => {
            if children.len() == 1 {
                return build_expression(&children[0]);
            }
            let op_node = child(&children, 1, node)?;
            let operator = AssignmentOperator::from_token(op_node.text())
                .ok_or_else(|| unexpected(&op_node, "assignment"))?;
            NodeKind::Assignment {
                operator,
                target: Box::new(build_expression(&child(&children, 0, node)?)?),
                value: Box::new(build_expression(&child(&children, 2, node)?)?),
            }
        }
        TreeKind::ConditionalExpression => {
            if children.len() == 1 {
                return build_expression(&children[0]);
            }
            NodeKind::Conditional {
                test: Box::new(build_expression(&child(&children, 0, node)?)?),
                consequent: Box::new(build_expression(&child(&children, 1, node)?)?),
                alternate: Box::new(build_expression(&child(&children, 2, node)?)?),
            }
        }
        TreeKind::LogicalOrExpression => {
            return build_logical_chain(node, &children, LogicalOperator::Or)
        }
        TreeKind::LogicalAndExpression => {
            return build_logical_chain(node, &children, LogicalOperator::And)
        }
        TreeKind::BitwiseOrExpression => {
            return build_fixed_binary_chain(node, &children, BinaryOperator::BitwiseOr)
        }
        TreeKind::BitwiseXorExpression => {
            return build_fixed_binary_chain(node, &children, BinaryOperator::BitwiseXor)
        }
        TreeKind::BitwiseAndExpression => {
            return build_fixed_binary_chain(node, &children, BinaryOperator::BitwiseAnd)
        }
        TreeKind::BinaryExpression => return build_binary_chain(node, &children),
        TreeKind::UnaryExpression => {
            if children.len() == 1 {
                return build_expression(&children[0]);
            }
            let op_node = child(&children, 0, node)?;
            let argument = Box::new(build_expression(&child(&children, 1, node)?)?);
            match op_node.text() {
                "++" => NodeKind::Update {
                    operator: UpdateOperator::PlusPlus,
                    prefix: true,
                    argument,
                },
                "--" => NodeKind::Update {
                    operator: UpdateOperator::MinusMinus,
                    prefix: true,
                    argument,
                },
                text => NodeKind::Unary {
                    operator: unary_operator(text).ok_or_else(|| unexpected(&op_node, "unary"))?,
                    argument,
                },
            }
        }
        TreeKind::PostfixExpression => {
            if children.len() == 1 {
                return build_expression(&children[0]);
            }
            let operator = match child(&children, 1, node)?.text() {
                "++" => UpdateOperator::PlusPlus,
                _ => UpdateOperator::MinusMinus,
            };
            NodeKind::Update {
                operator,
                prefix: false,
                argument: Box::new(build_expression(&child(&children, 0, node)?)?),
            }
        }
        TreeKind::LeftHandSideExpression | TreeKind::NewCallee => {
            return build_member_chain(node, &children)
        }
        TreeKind::NewExpression => {
            let arguments = match children.get(1) {
                Some(args) => build_arguments(args)?,
                None => vec![],
            };
            NodeKind::New {
                callee: Box::new(build_expression(&child(&children, 0, node)?)?),
                arguments,
            }
        }
        TreeKind::ParenthesizedExpression => {
            return build_expression(&child(&children, 0, node)?)
        }
        TreeKind::ThisExpression => NodeKind::This,
        TreeKind::FunctionExpression => NodeKind::Function(Box::new(build_function(node)?)),
        TreeKind::NullLiteral => NodeKind::Literal(LiteralValue::Null),
        TreeKind::BooleanLiteral => NodeKind::Literal(LiteralValue::Boolean(node.text() == "true")),
        TreeKind::NumericLiteral => NodeKind::Literal(LiteralValue::Number(numeric_value(node)?)),
        TreeKind::StringLiteral => NodeKind::Literal(LiteralValue::String(string_value(node.text()))),
        TreeKind::Identifier => NodeKind::Identifier(node.text().to_string()),
        TreeKind::ArrayLiteral => {
            let mut elements = Vec::with_capacity(children.len());
            for element in &children {
                elements.push(match element.children().first() {
                    Some(e) => Some(build_expression(e)?),
                    None => None,
                });
            }
            // `[a,]` has one element: a trailing comma does not open a hole.
            if let Some(None) = elements.last() {
                elements.pop();
            }
            NodeKind::Array(elements)
        }
        TreeKind::ObjectLiteral => {
            let mut properties = Vec::with_capacity(children.len());
            for assignment in &children {
                let parts = assignment.children();
                let name = child(&parts, 0, assignment)?;
                let name = child(&name.children(), 0, &name)?;
                let key = match name.kind() {
                    TreeKind::StringLiteral => string_value(name.text()),
                    TreeKind::NumericLiteral => number_to_string(numeric_value(&name)?),
                    _ => name.text().to_string(),
                };
                properties.push(PropertyData {
                    key,
                    value: build_expression(&child(&parts, 1, assignment)?)?,
                });
            }
            NodeKind::Object(properties)
        }
        _ => return Err(unexpected(node, "expression")),
    };
    Ok(Node::new(kind, position))
}

fn unary_operator(text: &str) -> Option<UnaryOperator> {
    Some(match text {
        "-" => UnaryOperator::Minus,
        "+" => UnaryOperator::Plus,
        "!" => UnaryOperator::LogicalNot,
        "~" => UnaryOperator::BitwiseNot,
        "typeof" => UnaryOperator::TypeOf,
        "void" => UnaryOperator::Void,
        "delete" => UnaryOperator::Delete,
        _ => return None,
    })
}

/// `a || b || c` as `(a || b) || c`.
fn build_logical_chain<T: TreeNode + Clone>(
    node: &T,
    children: &[T],
    operator: LogicalOperator,
) -> Result<Node, CompileError> {
    let mut operands = children.iter();
    let first = operands
        .next()
        .ok_or_else(|| unexpected(node, "logical expression"))?;
    let mut left = build_expression(first)?;
    for operand in operands {
        let right = build_expression(operand)?;
        left = Node::new(
            NodeKind::Logical {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            node.position(),
        );
    }
    Ok(left)
}

fn build_fixed_binary_chain<T: TreeNode + Clone>(
    node: &T,
    children: &[T],
    operator: BinaryOperator,
) -> Result<Node, CompileError> {
    let mut operands = children.iter();
    let first = operands
        .next()
        .ok_or_else(|| unexpected(node, "binary expression"))?;
    let mut left = build_expression(first)?;
    for operand in operands {
        let right = build_expression(operand)?;
        left = Node::new(
            NodeKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            node.position(),
        );
    }
    Ok(left)
}

/// Levels that mix several operators: operands and operator tokens alternate.
fn build_binary_chain<T: TreeNode + Clone>(node: &T, children: &[T]) -> Result<Node, CompileError> {
    let mut parts = children.iter();
    let first = parts
        .next()
        .ok_or_else(|| unexpected(node, "binary expression"))?;
    let mut left = build_expression(first)?;
    while let Some(op_node) = parts.next() {
        let operator = BinaryOperator::from_token(op_node.text())
            .ok_or_else(|| unexpected(op_node, "binary operator"))?;
        let operand = parts
            .next()
            .ok_or_else(|| unexpected(node, "binary expression"))?;
        let right = build_expression(operand)?;
        left = Node::new(
            NodeKind::Binary {
                operator,
                left: Box::new(left),
                right: Box::new(right),
            },
            node.position(),
        );
    }
    Ok(left)
}

/// A primary (or `new`) expression followed by member accesses and calls.
fn build_member_chain<T: TreeNode + Clone>(node: &T, children: &[T]) -> Result<Node, CompileError> {
    let mut parts = children.iter();
    let head = parts
        .next()
        .ok_or_else(|| unexpected(node, "member expression"))?;
    let mut current = build_expression(head)?;
    for suffix in parts {
        let kind = match suffix.kind() {
            TreeKind::DotMember => NodeKind::Member {
                object: Box::new(current),
                property: MemberProperty::Named(
                    child(&suffix.children(), 0, suffix)?.text().to_string(),
                ),
            },
            TreeKind::ComputedMember => NodeKind::Member {
                object: Box::new(current),
                property: MemberProperty::Computed(Box::new(build_expression(&child(
                    &suffix.children(),
                    0,
                    suffix,
                )?)?)),
            },
            TreeKind::Arguments => NodeKind::Call {
                callee: Box::new(current),
                arguments: build_arguments(suffix)?,
            },
            _ => return Err(unexpected(suffix, "member expression")),
        };
        current = Node::new(kind, node.position());
    }
    Ok(current)
}

fn build_arguments<T: TreeNode + Clone>(node: &T) -> Result<Vec<Node>, CompileError> {
    node.children().iter().map(build_expression).collect()
}

fn numeric_value<T: TreeNode>(node: &T) -> Result<f64, CompileError> {
    let text = node.text();
    let value = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        hex.chars()
            .filter_map(|c| c.to_digit(16))
            .fold(0.0, |acc, d| acc * 16.0 + d as f64)
    } else {
        string_to_number(text)
    };
    if value.is_nan() {
        return Err(unexpected(node, "numeric literal"));
    }
    Ok(value)
}

/// Decodes a quoted string literal, escapes included.
fn string_value(quoted: &str) -> String {
    let raw = if quoted.len() >= 2 {
        &quoted[1..quoted.len() - 1]
    } else {
        quoted
    };
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{C}'),
            Some('v') => out.push('\u{B}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let code = take_hex(&mut chars, 2);
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some('u') => {
                let mut code = take_hex(&mut chars, 4);
                if (0xD800..0xDC00).contains(&code) {
                    let mut lookahead = chars.clone();
                    if lookahead.next() == Some('\\') && lookahead.next() == Some('u') {
                        let low = take_hex(&mut lookahead, 4);
                        if (0xDC00..0xE000).contains(&low) {
                            code = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                            chars = lookahead;
                        }
                    }
                }
                out.push(char::from_u32(code).unwrap_or('\u{FFFD}'));
            }
            Some('\r') => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            Some('\n') | Some('\u{2028}') | Some('\u{2029}') => {}
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn take_hex<I: Iterator<Item = char>>(chars: &mut I, count: usize) -> u32 {
    let mut code = 0;
    for _ in 0..count {
        match chars.next().and_then(|c| c.to_digit(16)) {
            Some(d) => code = code * 16 + d,
            None => break,
        }
    }
    code
}
