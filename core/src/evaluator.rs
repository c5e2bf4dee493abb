// gridcalc-core/src/evaluator.rs
// AST evaluation against a cell-value resolver

use crate::ast::{AstNode, BinaryOperator, UnaryOperator};
use crate::error::CellError;
use crate::model::Position;

/// Walks an expression tree, pulling referenced cell values through the
/// resolver the owning sheet provides.
pub fn evaluate<F>(node: &AstNode, resolver: &F) -> Result<f64, CellError>
where
    F: Fn(Position) -> Result<f64, CellError>,
{
    match node {
        AstNode::Number(n) => Ok(*n),
        AstNode::Reference(pos) => resolver(*pos),
        AstNode::UnaryOp { op, operand } => {
            let value = evaluate(operand, resolver)?;
            Ok(match op {
                UnaryOperator::Positive => value,
                UnaryOperator::Negative => -value,
            })
        }
        AstNode::BinaryOp { op, left, right } => {
            let lhs = evaluate(left, resolver)?;
            let rhs = evaluate(right, resolver)?;
            match op {
                BinaryOperator::Add => Ok(lhs + rhs),
                BinaryOperator::Subtract => Ok(lhs - rhs),
                BinaryOperator::Multiply => Ok(lhs * rhs),
                BinaryOperator::Divide => {
                    if rhs == 0.0 {
                        Err(CellError::Arithmetic)
                    } else {
                        Ok(lhs / rhs)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_formula;

    fn no_cells(_: Position) -> Result<f64, CellError> {
        Ok(0.0)
    }

    #[test]
    fn test_arithmetic() {
        let node = parse_formula("1+2*3-4/2").unwrap();
        assert_eq!(evaluate(&node, &no_cells), Ok(5.0));
    }

    #[test]
    fn test_unary_sign() {
        let node = parse_formula("-(1+2)").unwrap();
        assert_eq!(evaluate(&node, &no_cells), Ok(-3.0));
        let node = parse_formula("+5").unwrap();
        assert_eq!(evaluate(&node, &no_cells), Ok(5.0));
    }

    #[test]
    fn test_division_by_zero() {
        let node = parse_formula("1/0").unwrap();
        assert_eq!(evaluate(&node, &no_cells), Err(CellError::Arithmetic));
    }

    #[test]
    fn test_resolver_values_flow_through() {
        let node = parse_formula("A1+B1").unwrap();
        let resolver = |pos: Position| {
            if pos == Position::new(0, 0) {
                Ok(10.0)
            } else {
                Ok(32.0)
            }
        };
        assert_eq!(evaluate(&node, &resolver), Ok(42.0));
    }

    #[test]
    fn test_resolver_error_propagates() {
        let node = parse_formula("1+A1").unwrap();
        let resolver = |_: Position| Err(CellError::Value);
        assert_eq!(evaluate(&node, &resolver), Err(CellError::Value));
    }
}
