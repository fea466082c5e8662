extern crate kiln;

use kiln::compiler::CompileError;
use kiln::parser::ast::{
    BinaryOperator, LiteralValue, MemberProperty, Node, NodeKind, UpdateOperator,
};
use kiln::parser::JsParser;

fn program(code: &str) -> Vec<Node> {
    match JsParser::parse_to_ast(code) {
        Ok(Node {
            kind: NodeKind::Program { body, .. },
            ..
        }) => body,
        Ok(other) => panic!("not a program: {:?}", other),
        Err(e) => panic!("{} failed to parse: {}", code, e),
    }
}

fn expression(code: &str) -> Node {
    match program(code).into_iter().next().map(|n| n.kind) {
        Some(NodeKind::ExpressionStatement(e)) => *e,
        other => panic!("not an expression statement: {:?}", other),
    }
}

fn number(n: f64) -> NodeKind {
    NodeKind::Literal(LiteralValue::Number(n))
}

#[test]
fn test_multiplication_binds_tighter() {
    match expression("1 + 2 * 3").kind {
        NodeKind::Binary {
            operator: BinaryOperator::Add,
            left,
            right,
        } => {
            assert_eq!(left.kind, number(1.0));
            assert!(matches!(
                right.kind,
                NodeKind::Binary {
                    operator: BinaryOperator::Multiply,
                    ..
                }
            ));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_member_forms() {
    match expression("o.k").kind {
        NodeKind::Member { property, .. } => {
            assert_eq!(property, MemberProperty::Named("k".to_string()))
        }
        other => panic!("unexpected {:?}", other),
    }
    match expression("o[i]").kind {
        NodeKind::Member {
            property: MemberProperty::Computed(key),
            ..
        } => assert_eq!(key.kind, NodeKind::Identifier("i".to_string())),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_object_literal_keys_are_strings() {
    match expression("({ a: 1, 'b': 2, 3: 4 })").kind {
        NodeKind::Object(props) => {
            let keys: Vec<&str> = props.iter().map(|p| p.key.as_str()).collect();
            assert_eq!(keys, vec!["a", "b", "3"]);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_array_holes_are_none() {
    match expression("[1, , 3]").kind {
        NodeKind::Array(elements) => {
            assert_eq!(elements.len(), 3);
            assert!(elements[1].is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_postfix_and_prefix_update() {
    assert!(matches!(
        expression("i++").kind,
        NodeKind::Update {
            operator: UpdateOperator::PlusPlus,
            prefix: false,
            ..
        }
    ));
    assert!(matches!(
        expression("--i").kind,
        NodeKind::Update {
            operator: UpdateOperator::MinusMinus,
            prefix: true,
            ..
        }
    ));
}

#[test]
fn test_function_declaration() {
    match &program("function add(a, b) { return a + b }")[0].kind {
        NodeKind::FunctionDecl(f) => {
            assert_eq!(f.name.as_deref(), Some("add"));
            assert_eq!(f.params, vec!["a".to_string(), "b".to_string()]);
            assert_eq!(f.body.len(), 1);
            assert!(f.layout.is_none());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_string_escapes() {
    assert_eq!(
        expression(r#""a\tb\x41B""#).kind,
        NodeKind::Literal(LiteralValue::String("a\tbAB".to_string()))
    );
}

#[test]
fn test_hex_literal() {
    assert_eq!(expression("0xff").kind, number(255.0));
}

#[test]
fn test_labelled_loop() {
    match &program("outer: while (1) { break outer; }")[0].kind {
        NodeKind::Label { name, body } => {
            assert_eq!(name, "outer");
            assert!(body.is_iteration());
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_break_label_must_share_the_line() {
    match &program("while (1) { break\nouter }")[0].kind {
        NodeKind::While { body, .. } => match &body.kind {
            NodeKind::Block(statements) => {
                assert_eq!(statements[0].kind, NodeKind::Break { label: None });
                assert_eq!(statements.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        },
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_for_in_with_member_target() {
    match &program("for (o.k in p) ;")[0].kind {
        NodeKind::ForIn { target, body, .. } => {
            assert!(matches!(target.kind, NodeKind::Member { .. }));
            assert_eq!(body.kind, NodeKind::Empty);
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_positions_are_one_based() {
    let body = program("a;\n  b");
    assert_eq!((body[0].position.line, body[0].position.column), (1, 1));
    assert_eq!((body[1].position.line, body[1].position.column), (2, 3));
}

#[test]
fn test_parse_failure_is_a_syntax_error() {
    match JsParser::parse_to_ast("var = 1") {
        Err(e @ CompileError::Parse { .. }) => {
            assert!(e.to_string().starts_with("SyntaxError: "))
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_token_tree_names_rules() {
    let tree = JsParser::parse_to_token_tree("x = 1").unwrap();
    assert!(tree.starts_with("script => (0,5)"));
    assert!(tree.contains("numeric_literal"));
}
