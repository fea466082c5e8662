//! Abstract syntax tree.
//!
//! A single [`Node`] type carries every construct. The builder produces nodes with
//! `expr_type == Dynamic` and unresolved identifiers; analysis rewrites them in place.

use std::fmt;

use crate::compiler::expr_type::ExprType;
use crate::runner::ds::value::JsValue;

pub use super::tree::SourcePosition;

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub position: SourcePosition,
    pub expr_type: ExprType,
}

impl Node {
    pub fn new(kind: NodeKind, position: SourcePosition) -> Self {
        Node {
            kind,
            position,
            expr_type: ExprType::Dynamic,
        }
    }

    pub fn with_type(mut self, expr_type: ExprType) -> Self {
        self.expr_type = expr_type;
        self
    }

    pub fn literal(&self) -> Option<&LiteralValue> {
        match &self.kind {
            NodeKind::Literal(v) => Some(v),
            _ => None,
        }
    }

    /// Loops, as seen through any labels wrapped around them.
    pub fn is_iteration(&self) -> bool {
        match &self.kind {
            NodeKind::For { .. }
            | NodeKind::ForIn { .. }
            | NodeKind::While { .. }
            | NodeKind::DoWhile { .. } => true,
            NodeKind::Label { body, .. } => body.is_iteration(),
            _ => false,
        }
    }
}

/// Where analysis decided a variable lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// A slot of the current function's activation.
    Local(usize),
    /// A slot of an enclosing function's activation, `depth` function boundaries out.
    Closure { depth: usize, index: usize },
    /// A property of the global object.
    Global(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl LiteralValue {
    pub fn to_value(&self) -> JsValue {
        match self {
            LiteralValue::Undefined => JsValue::Undefined,
            LiteralValue::Null => JsValue::Null,
            LiteralValue::Boolean(b) => JsValue::Boolean(*b),
            LiteralValue::Number(n) => JsValue::Number(*n),
            LiteralValue::String(s) => JsValue::String(s.clone()),
        }
    }

    /// Primitive values only; objects have no literal form.
    pub fn from_value(v: JsValue) -> Option<Self> {
        Some(match v {
            JsValue::Undefined => LiteralValue::Undefined,
            JsValue::Null => LiteralValue::Null,
            JsValue::Boolean(b) => LiteralValue::Boolean(b),
            JsValue::Number(n) => LiteralValue::Number(n),
            JsValue::String(s) => LiteralValue::String(s),
            JsValue::Object(_) | JsValue::Function(_) => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Minus,
    Plus,
    LogicalNot,
    BitwiseNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOperator {
    PlusPlus,
    MinusMinus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    LooselyEqual,
    LooselyUnequal,
    StrictlyEqual,
    StrictlyUnequal,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    BitwiseLeftShift,
    BitwiseRightShift,
    BitwiseUnsignedRightShift,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    BitwiseOr,
    BitwiseAnd,
    BitwiseXor,
    In,
    InstanceOf,
}

impl BinaryOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => BinaryOperator::LooselyEqual,
            "!=" => BinaryOperator::LooselyUnequal,
            "===" => BinaryOperator::StrictlyEqual,
            "!==" => BinaryOperator::StrictlyUnequal,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessThanEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterThanEqual,
            "<<" => BinaryOperator::BitwiseLeftShift,
            ">>" => BinaryOperator::BitwiseRightShift,
            ">>>" => BinaryOperator::BitwiseUnsignedRightShift,
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "%" => BinaryOperator::Modulo,
            "|" => BinaryOperator::BitwiseOr,
            "&" => BinaryOperator::BitwiseAnd,
            "^" => BinaryOperator::BitwiseXor,
            "in" => BinaryOperator::In,
            "instanceof" => BinaryOperator::InstanceOf,
            _ => return None,
        })
    }

    /// Operators whose result is always a number: arithmetic other than `+`, bitwise, shifts.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
                | BinaryOperator::BitwiseLeftShift
                | BinaryOperator::BitwiseRightShift
                | BinaryOperator::BitwiseUnsignedRightShift
                | BinaryOperator::BitwiseOr
                | BinaryOperator::BitwiseAnd
                | BinaryOperator::BitwiseXor
        )
    }

    /// Operators whose result is always a boolean.
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::LooselyEqual
                | BinaryOperator::LooselyUnequal
                | BinaryOperator::StrictlyEqual
                | BinaryOperator::StrictlyUnequal
                | BinaryOperator::LessThan
                | BinaryOperator::LessThanEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterThanEqual
                | BinaryOperator::In
                | BinaryOperator::InstanceOf
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    Or,
    And,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOperator {
    Equals,
    AddEquals,
    SubtractEquals,
    MultiplyEquals,
    DivideEquals,
    ModuloEquals,
    BitwiseLeftShiftEquals,
    BitwiseRightShiftEquals,
    BitwiseUnsignedRightShiftEquals,
    BitwiseOrEquals,
    BitwiseAndEquals,
    BitwiseXorEquals,
}

impl AssignmentOperator {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "=" => AssignmentOperator::Equals,
            "+=" => AssignmentOperator::AddEquals,
            "-=" => AssignmentOperator::SubtractEquals,
            "*=" => AssignmentOperator::MultiplyEquals,
            "/=" => AssignmentOperator::DivideEquals,
            "%=" => AssignmentOperator::ModuloEquals,
            "<<=" => AssignmentOperator::BitwiseLeftShiftEquals,
            ">>=" => AssignmentOperator::BitwiseRightShiftEquals,
            ">>>=" => AssignmentOperator::BitwiseUnsignedRightShiftEquals,
            "|=" => AssignmentOperator::BitwiseOrEquals,
            "&=" => AssignmentOperator::BitwiseAndEquals,
            "^=" => AssignmentOperator::BitwiseXorEquals,
            _ => return None,
        })
    }

    /// The operator a compound assignment applies; `None` for plain `=`.
    pub fn binary_operator(self) -> Option<BinaryOperator> {
        Some(match self {
            AssignmentOperator::Equals => return None,
            AssignmentOperator::AddEquals => BinaryOperator::Add,
            AssignmentOperator::SubtractEquals => BinaryOperator::Subtract,
            AssignmentOperator::MultiplyEquals => BinaryOperator::Multiply,
            AssignmentOperator::DivideEquals => BinaryOperator::Divide,
            AssignmentOperator::ModuloEquals => BinaryOperator::Modulo,
            AssignmentOperator::BitwiseLeftShiftEquals => BinaryOperator::BitwiseLeftShift,
            AssignmentOperator::BitwiseRightShiftEquals => BinaryOperator::BitwiseRightShift,
            AssignmentOperator::BitwiseUnsignedRightShiftEquals => {
                BinaryOperator::BitwiseUnsignedRightShift
            }
            AssignmentOperator::BitwiseOrEquals => BinaryOperator::BitwiseOr,
            AssignmentOperator::BitwiseAndEquals => BinaryOperator::BitwiseAnd,
            AssignmentOperator::BitwiseXorEquals => BinaryOperator::BitwiseXor,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberProperty {
    Named(String),
    Computed(Box<Node>),
}

/// Slot assignment of a function body, filled in by analysis.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionLayout {
    /// Activation size: parameters, then `var` and inner function names.
    pub local_count: usize,
    /// Slot holding the function itself, for named function expressions.
    pub self_slot: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionData {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub layout: Option<FunctionLayout>,
    /// Where a declaration stores the function in its enclosing scope. Expressions have none.
    pub binding: Option<Slot>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDeclarator {
    /// `Identifier` before analysis, `Variable` after.
    pub target: Node,
    pub init: Option<Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyData {
    pub key: String,
    pub value: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ── Expressions ──────────────────────────────────────────
    Literal(LiteralValue),
    Identifier(String),
    Variable {
        name: String,
        slot: Slot,
    },
    This,
    /// Holes are `None`.
    Array(Vec<Option<Node>>),
    Object(Vec<PropertyData>),
    Function(Box<FunctionData>),
    Unary {
        operator: UnaryOperator,
        argument: Box<Node>,
    },
    Update {
        operator: UpdateOperator,
        prefix: bool,
        argument: Box<Node>,
    },
    Binary {
        operator: BinaryOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Logical {
        operator: LogicalOperator,
        left: Box<Node>,
        right: Box<Node>,
    },
    Conditional {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Box<Node>,
    },
    Assignment {
        operator: AssignmentOperator,
        target: Box<Node>,
        value: Box<Node>,
    },
    Call {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    New {
        callee: Box<Node>,
        arguments: Vec<Node>,
    },
    Member {
        object: Box<Node>,
        property: MemberProperty,
    },
    Sequence(Vec<Node>),

    // ── Statements ───────────────────────────────────────────
    Program {
        body: Vec<Node>,
        /// Hoisted `var` and function names, filled in by analysis.
        declarations: Vec<String>,
    },
    FunctionDecl(Box<FunctionData>),
    Var(Vec<VariableDeclarator>),
    ExpressionStatement(Box<Node>),
    Block(Vec<Node>),
    Empty,
    If {
        test: Box<Node>,
        consequent: Box<Node>,
        alternate: Option<Box<Node>>,
    },
    For {
        init: Option<Box<Node>>,
        test: Option<Box<Node>>,
        update: Option<Box<Node>>,
        body: Box<Node>,
    },
    ForIn {
        /// A `Var` with one declarator, or an assignable expression.
        target: Box<Node>,
        iterable: Box<Node>,
        body: Box<Node>,
    },
    While {
        test: Box<Node>,
        body: Box<Node>,
    },
    DoWhile {
        body: Box<Node>,
        test: Box<Node>,
    },
    Break {
        label: Option<String>,
    },
    Continue {
        label: Option<String>,
    },
    Return(Option<Box<Node>>),
    Label {
        name: String,
        body: Box<Node>,
    },
}

impl fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::LogicalNot => "!",
            UnaryOperator::BitwiseNot => "~",
            UnaryOperator::TypeOf => "typeof",
            UnaryOperator::Void => "void",
            UnaryOperator::Delete => "delete",
        })
    }
}
