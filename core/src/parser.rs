// gridcalc-core/src/parser.rs
// Formula parsing using pest

use pest::iterators::Pairs;
use pest::pratt_parser::{Assoc, Op, PrattParser};
use pest::Parser;
use pest_derive::Parser;
use std::sync::OnceLock;

use crate::ast::{AstNode, BinaryOperator, UnaryOperator};
use crate::error::EngineError;
use crate::model::Position;

#[derive(Parser)]
#[grammar = "grammar/formula.pest"]
struct FormulaParser;

fn pratt_parser() -> &'static PrattParser<Rule> {
    static PRATT: OnceLock<PrattParser<Rule>> = OnceLock::new();
    PRATT.get_or_init(|| {
        PrattParser::new()
            .op(Op::infix(Rule::add, Assoc::Left) | Op::infix(Rule::subtract, Assoc::Left))
            .op(Op::infix(Rule::multiply, Assoc::Left) | Op::infix(Rule::divide, Assoc::Left))
            .op(Op::prefix(Rule::neg) | Op::prefix(Rule::pos))
    })
}

/// Parses a formula expression (without the leading `=`) into an AST.
pub fn parse_formula(input: &str) -> Result<AstNode, EngineError> {
    let mut pairs = FormulaParser::parse(Rule::formula, input)
        .map_err(|e| EngineError::ParseError(e.to_string()))?;
    let formula = pairs
        .next()
        .ok_or_else(|| EngineError::ParseError("empty formula".to_string()))?;
    let expr = formula
        .into_inner()
        .next()
        .ok_or_else(|| EngineError::ParseError("empty formula".to_string()))?;
    Ok(build_expression(expr.into_inner()))
}

fn build_expression(pairs: Pairs<Rule>) -> AstNode {
    pratt_parser()
        .map_primary(|primary| match primary.as_rule() {
            // Grammar-valid number text always parses; overflow saturates to
            // infinity and is rejected later as an arithmetic error.
            Rule::number => AstNode::Number(primary.as_str().parse().unwrap_or(f64::NAN)),
            Rule::cell_ref => {
                AstNode::Reference(Position::from_a1(primary.as_str()).unwrap_or(Position::NONE))
            }
            Rule::expr => build_expression(primary.into_inner()),
            rule => unreachable!("unexpected primary rule: {:?}", rule),
        })
        .map_prefix(|op, operand| {
            let op = match op.as_rule() {
                Rule::neg => UnaryOperator::Negative,
                Rule::pos => UnaryOperator::Positive,
                rule => unreachable!("unexpected prefix rule: {:?}", rule),
            };
            AstNode::UnaryOp {
                op,
                operand: Box::new(operand),
            }
        })
        .map_infix(|left, op, right| {
            let op = match op.as_rule() {
                Rule::add => BinaryOperator::Add,
                Rule::subtract => BinaryOperator::Subtract,
                Rule::multiply => BinaryOperator::Multiply,
                Rule::divide => BinaryOperator::Divide,
                rule => unreachable!("unexpected infix rule: {:?}", rule),
            };
            AstNode::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            }
        })
        .parse(pairs)
}
