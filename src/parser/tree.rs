//! The parse tree as seen by the AST builder.
//!
//! The builder never touches `pest` types directly; it walks anything implementing
//! [`TreeNode`]. [`PestTreeNode`] adapts the pairs produced by the generated parser.

use std::fmt;
use std::rc::Rc;

use pest::iterators::Pair;

use super::api::Rule;

/// Location of a node in the source text. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcePosition {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Grammar constructs the builder distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeKind {
    Script,
    Block,
    VariableStatement,
    VariableDeclaration,
    EmptyStatement,
    ExpressionStatement,
    IfStatement,
    DoWhileStatement,
    WhileStatement,
    ForStatement,
    ForVarDeclaration,
    ForInit,
    ForTest,
    ForUpdate,
    ForInStatement,
    ForInBinding,
    ForInDeclaration,
    ContinueStatement,
    BreakStatement,
    ReturnStatement,
    LabelledStatement,
    FunctionDeclaration,
    FunctionExpression,
    FormalParameters,
    FunctionBody,
    Expression,
    AssignmentExpression,
    AssignmentOperator,
    ConditionalExpression,
    LogicalOrExpression,
    LogicalAndExpression,
    BitwiseOrExpression,
    BitwiseXorExpression,
    BitwiseAndExpression,
    /// Equality, relational, shift, additive and multiplicative levels.
    BinaryExpression,
    BinaryOperator,
    UnaryExpression,
    PrefixOperator,
    PostfixExpression,
    PostfixOperator,
    LeftHandSideExpression,
    NewExpression,
    NewCallee,
    DotMember,
    ComputedMember,
    Arguments,
    ThisExpression,
    ParenthesizedExpression,
    NullLiteral,
    BooleanLiteral,
    NumericLiteral,
    StringLiteral,
    ArrayLiteral,
    ArrayElement,
    ObjectLiteral,
    PropertyAssignment,
    PropertyName,
    Identifier,
    IdentifierName,
    /// Keywords and sub-lexical tokens. Never handed to the builder.
    Token,
}

/// One node of a parse tree.
pub trait TreeNode: Sized {
    fn kind(&self) -> TreeKind;

    /// Significant children in source order. Keywords and lexical fragments are skipped.
    fn children(&self) -> Vec<Self>;

    fn text(&self) -> &str;

    fn position(&self) -> SourcePosition;
}

/// Byte offsets of line starts, for turning offsets into line/column pairs.
#[derive(Debug)]
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in source.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        LineIndex { line_starts }
    }

    /// 1-based line and column of a byte offset.
    pub fn line_col(&self, offset: usize) -> (usize, usize) {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line + 1, offset - self.line_starts[line] + 1)
    }
}

/// [`TreeNode`] over a `pest` pair.
#[derive(Clone)]
pub struct PestTreeNode<'i> {
    pair: Pair<'i, Rule>,
    lines: Rc<LineIndex>,
}

impl<'i> PestTreeNode<'i> {
    pub fn new(pair: Pair<'i, Rule>, lines: Rc<LineIndex>) -> Self {
        PestTreeNode { pair, lines }
    }

    pub fn rule(&self) -> Rule {
        self.pair.as_rule()
    }
}

fn tree_kind(rule: Rule) -> TreeKind {
    match rule {
        Rule::script => TreeKind::Script,
        Rule::block => TreeKind::Block,
        Rule::variable_statement => TreeKind::VariableStatement,
        Rule::variable_declaration => TreeKind::VariableDeclaration,
        Rule::empty_statement => TreeKind::EmptyStatement,
        Rule::expression_statement => TreeKind::ExpressionStatement,
        Rule::if_statement => TreeKind::IfStatement,
        Rule::do_while_statement => TreeKind::DoWhileStatement,
        Rule::while_statement => TreeKind::WhileStatement,
        Rule::for_statement => TreeKind::ForStatement,
        Rule::for_var_declaration => TreeKind::ForVarDeclaration,
        Rule::for_init => TreeKind::ForInit,
        Rule::for_test => TreeKind::ForTest,
        Rule::for_update => TreeKind::ForUpdate,
        Rule::for_in_statement => TreeKind::ForInStatement,
        Rule::for_in_binding => TreeKind::ForInBinding,
        Rule::for_in_declaration => TreeKind::ForInDeclaration,
        Rule::continue_statement => TreeKind::ContinueStatement,
        Rule::break_statement => TreeKind::BreakStatement,
        Rule::return_statement => TreeKind::ReturnStatement,
        Rule::labelled_statement => TreeKind::LabelledStatement,
        Rule::function_declaration => TreeKind::FunctionDeclaration,
        Rule::function_expression => TreeKind::FunctionExpression,
        Rule::formal_parameters => TreeKind::FormalParameters,
        Rule::function_body => TreeKind::FunctionBody,
        Rule::expression => TreeKind::Expression,
        Rule::assignment_expression => TreeKind::AssignmentExpression,
        Rule::assignment_operator => TreeKind::AssignmentOperator,
        Rule::conditional_expression => TreeKind::ConditionalExpression,
        Rule::logical_or_expression => TreeKind::LogicalOrExpression,
        Rule::logical_and_expression => TreeKind::LogicalAndExpression,
        Rule::bitwise_or_expression => TreeKind::BitwiseOrExpression,
        Rule::bitwise_xor_expression => TreeKind::BitwiseXorExpression,
        Rule::bitwise_and_expression => TreeKind::BitwiseAndExpression,
        Rule::equality_expression
        | Rule::relational_expression
        | Rule::shift_expression
        | Rule::additive_expression
        | Rule::multiplicative_expression => TreeKind::BinaryExpression,
        Rule::equality_operator
        | Rule::relational_operator
        | Rule::shift_operator
        | Rule::additive_operator
        | Rule::multiplicative_operator => TreeKind::BinaryOperator,
        Rule::unary_expression => TreeKind::UnaryExpression,
        Rule::prefix_operator => TreeKind::PrefixOperator,
        Rule::postfix_expression => TreeKind::PostfixExpression,
        Rule::postfix_operator => TreeKind::PostfixOperator,
        Rule::left_hand_side_expression => TreeKind::LeftHandSideExpression,
        Rule::new_expression => TreeKind::NewExpression,
        Rule::new_callee => TreeKind::NewCallee,
        Rule::dot_member => TreeKind::DotMember,
        Rule::computed_member => TreeKind::ComputedMember,
        Rule::arguments => TreeKind::Arguments,
        Rule::this_expression => TreeKind::ThisExpression,
        Rule::parenthesized_expression => TreeKind::ParenthesizedExpression,
        Rule::null_literal => TreeKind::NullLiteral,
        Rule::boolean_literal => TreeKind::BooleanLiteral,
        Rule::numeric_literal => TreeKind::NumericLiteral,
        Rule::string_literal => TreeKind::StringLiteral,
        Rule::array_literal => TreeKind::ArrayLiteral,
        Rule::array_element => TreeKind::ArrayElement,
        Rule::object_literal => TreeKind::ObjectLiteral,
        Rule::property_assignment => TreeKind::PropertyAssignment,
        Rule::property_name => TreeKind::PropertyName,
        Rule::identifier => TreeKind::Identifier,
        Rule::identifier_name => TreeKind::IdentifierName,
        _ => TreeKind::Token,
    }
}

impl<'i> TreeNode for PestTreeNode<'i> {
    fn kind(&self) -> TreeKind {
        tree_kind(self.pair.as_rule())
    }

    fn children(&self) -> Vec<Self> {
        self.pair
            .clone()
            .into_inner()
            .filter(|p| tree_kind(p.as_rule()) != TreeKind::Token)
            .map(|p| PestTreeNode::new(p, self.lines.clone()))
            .collect()
    }

    fn text(&self) -> &str {
        self.pair.as_str()
    }

    fn position(&self) -> SourcePosition {
        let span = self.pair.as_span();
        let (line, column) = self.lines.line_col(span.start());
        SourcePosition {
            start: span.start(),
            end: span.end(),
            line,
            column,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_index() {
        let lines = LineIndex::new("a\nbc\n\nd");
        assert_eq!(lines.line_col(0), (1, 1));
        assert_eq!(lines.line_col(3), (2, 2));
        assert_eq!(lines.line_col(5), (3, 1));
        assert_eq!(lines.line_col(6), (4, 1));
    }
}
