use super::api::JsParser;
use super::api::Rule;

use pest::consumes_to;
use pest::fails_with;
use pest::parses_to;
use pest::Parser;
use std::time::Instant;

#[test]
fn test_decimal_number_with_no_dot() {
    parses_to! {
        parser: JsParser,
        input: "10",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 2, [
                decimal_literal(0, 2, [
                    decimal_integer_literal(0, 2)
                ])
            ])
        ]
    };
}

#[test]
fn test_decimal_number_with_fraction() {
    parses_to! {
        parser: JsParser,
        input: "10.25",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 5, [
                decimal_literal(0, 5, [
                    decimal_integer_literal(0, 2),
                    decimal_digits(3, 5)
                ])
            ])
        ]
    };
}

#[test]
fn test_decimal_number_with_dot_at_start_and_exp() {
    parses_to! {
        parser: JsParser,
        input: ".5e-3",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 5, [
                decimal_literal(0, 5, [
                    decimal_digits(1, 2),
                    exponent_part(2, 5, [
                        signed_integer(3, 5, [
                            decimal_digits(4, 5),
                        ])
                    ])
                ])
            ])
        ]
    };
}

#[test]
fn test_hex_number() {
    parses_to! {
        parser: JsParser,
        input: "0xFf09",
        rule: Rule::numeric_literal,
        tokens: [
            numeric_literal(0, 6, [
                hex_integer_literal(0, 6)
            ])
        ]
    };
}

#[test]
fn test_string_quotes() {
    parses_to! {
        parser: JsParser,
        input: "'say \"hi\"'",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 10)
        ]
    };
    parses_to! {
        parser: JsParser,
        input: "\"it\\\"s\"",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 7)
        ]
    };
}

#[test]
fn test_string_line_continuation() {
    parses_to! {
        parser: JsParser,
        input: "'a\\\nb'",
        rule: Rule::string_literal,
        tokens: [
            string_literal(0, 6)
        ]
    };
}

#[test]
fn test_string_with_raw_newline_fails() {
    fails_with! {
        parser: JsParser,
        input: "'a\nb'",
        rule: Rule::string_literal,
        positives: vec![Rule::string_literal],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_identifier_may_start_with_keyword() {
    parses_to! {
        parser: JsParser,
        input: "instanceofFoo",
        rule: Rule::identifier,
        tokens: [
            identifier(0, 13)
        ]
    };
    parses_to! {
        parser: JsParser,
        input: "$in_1",
        rule: Rule::identifier,
        tokens: [
            identifier(0, 5)
        ]
    };
}

#[test]
fn test_keyword_is_not_identifier() {
    fails_with! {
        parser: JsParser,
        input: "in",
        rule: Rule::identifier,
        positives: vec![Rule::identifier],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_break_label_on_same_line() {
    parses_to! {
        parser: JsParser,
        input: "break outer",
        rule: Rule::break_statement,
        tokens: [
            break_statement(0, 11, [
                kw_break(0, 5),
                identifier(6, 11)
            ])
        ]
    };
}

#[test]
fn test_break_label_on_next_line_is_not_a_label() {
    parses_to! {
        parser: JsParser,
        input: "break\nouter",
        rule: Rule::break_statement,
        tokens: [
            break_statement(0, 5, [
                kw_break(0, 5)
            ])
        ]
    };
}

#[test]
fn test_array_holes() {
    parses_to! {
        parser: JsParser,
        input: "[,,]",
        rule: Rule::array_literal,
        tokens: [
            array_literal(0, 4, [
                array_element(1, 1),
                array_element(2, 2),
                array_element(3, 3)
            ])
        ]
    };
}

#[test]
fn test_shift_operator_leaves_compound_assignment() {
    fails_with! {
        parser: JsParser,
        input: ">>=",
        rule: Rule::shift_operator,
        positives: vec![Rule::shift_operator],
        negatives: vec![],
        pos: 0
    };
    parses_to! {
        parser: JsParser,
        input: ">>>",
        rule: Rule::shift_operator,
        tokens: [
            shift_operator(0, 3)
        ]
    };
}

#[test]
fn test_additive_operator_leaves_increment() {
    fails_with! {
        parser: JsParser,
        input: "++",
        rule: Rule::additive_operator,
        positives: vec![Rule::additive_operator],
        negatives: vec![],
        pos: 0
    };
}

#[test]
fn test_relational_keyword_operator() {
    parses_to! {
        parser: JsParser,
        input: "instanceof",
        rule: Rule::relational_operator,
        tokens: [
            relational_operator(0, 10)
        ]
    };
}

#[test]
fn test_for_in_is_not_a_for_statement() {
    let src = "for (var k in o) emit(k)";
    assert!(JsParser::parse(Rule::for_in_statement, src).is_ok());
    assert!(JsParser::parse(Rule::for_statement, src).is_err());
    let src = "for (var i = 0; i < 3; i++) {}";
    assert!(JsParser::parse(Rule::for_in_statement, src).is_err());
    assert!(JsParser::parse(Rule::for_statement, src).is_ok());
}

#[test]
fn test_scripts_parse() {
    let scripts = [
        "",
        "var a = 1, b; a = b = 2",
        "function f(x, y) { return x + y } f(1, 2);",
        "var o = { a: 1, 'b': 2, 3: [1, , 3] }; o.a; o['b']",
        "outer: for (;;) { inner: while (true) { break outer; } }",
        "do x++; while (x < 10)",
        "if (a) b(); else { c() }",
        "x = typeof y === 'undefined' ? void 0 : -y",
        "new F; new F(1).g(); new new G()()",
        "a >>>= 1; b <<= 2; c |= d & e ^ f",
        "/* block */ x // line\n y",
        "var f = function named(n) { return n ? n * named(n - 1) : 1 }",
        "for (x in o) {} for (o.k in p) ;",
        "delete o.p, delete o[k]",
    ];
    let start = Instant::now();
    for script in scripts.iter() {
        if let Err(e) = JsParser::parse(Rule::script, script) {
            panic!("failed to parse {:?}: {}", script, e);
        }
    }
    assert!(start.elapsed().as_secs() < 5);
}

#[test]
fn test_scripts_rejected() {
    let scripts = ["var = 1", "a +* b", "function (a) {}", "if a b", "'unterminated"];
    for script in scripts.iter() {
        assert!(
            JsParser::parse(Rule::script, script).is_err(),
            "{:?} should not parse",
            script
        );
    }
}
