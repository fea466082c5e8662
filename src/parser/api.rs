use std::rc::Rc;
use std::time::Instant;

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::compiler::error::CompileError;

use super::ast::Node;
use super::builder::build_program;
use super::tree::{LineIndex, PestTreeNode};

#[derive(Parser)]
#[grammar = "parser/js_grammar.pest"] // relative to src
pub struct JsParser;

const TAB_WIDTH: usize = 2;

fn parse_error(error: pest::error::Error<Rule>) -> CompileError {
    CompileError::Parse {
        message: error.to_string(),
    }
}

impl JsParser {
    /// Renders the raw parse tree, one pair per line, for debugging grammar changes.
    pub fn parse_to_token_tree(script: &str) -> Result<String, CompileError> {
        let pairs = JsParser::parse(Rule::script, script).map_err(parse_error)?;
        let mut tree = vec![];
        for pair in pairs {
            tree.push(pair_to_string(pair, 0).join("\n"));
        }
        Ok(tree.join("\n"))
    }

    /// Parses a script into an unanalysed `Program` node.
    pub fn parse_to_ast(script: &str) -> Result<Node, CompileError> {
        let start = Instant::now();
        let mut pairs = JsParser::parse(Rule::script, script).map_err(parse_error)?;
        let parsed = Instant::now();
        let root = pairs.next().ok_or_else(|| CompileError::Parse {
            message: "empty parse result".to_string(),
        })?;
        let lines = Rc::new(LineIndex::new(script));
        let program = build_program(&PestTreeNode::new(root, lines))?;
        log::debug!(
            "parsed {} bytes in {}us, built AST in {}us",
            script.len(),
            parsed.saturating_duration_since(start).as_micros(),
            parsed.elapsed().as_micros()
        );
        Ok(program)
    }
}

fn pair_to_string(pair: Pair<Rule>, level: usize) -> Vec<String> {
    let mut tree = vec![];
    let span = pair.as_span();
    let rule_name = format!(
        "{:?} => ({},{}) #{:?}",
        pair.as_rule(),
        span.start(),
        span.end(),
        span.as_str()
    );
    let string_pads = " ".repeat(level * TAB_WIDTH);
    tree.push(format!("{}{}", string_pads, rule_name));
    for child_pair in pair.into_inner() {
        tree.append(pair_to_string(child_pair, level + 1).as_mut());
    }
    tree
}
