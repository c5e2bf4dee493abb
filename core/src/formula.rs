// gridcalc-core/src/formula.rs
// Compiled formulas: the parsed, evaluatable form of a cell's `=` text

use crate::ast::AstNode;
use crate::error::{CellError, EngineError};
use crate::evaluator;
use crate::model::Position;
use crate::parser::parse_formula;

/// A parsed formula expression together with the cells it reads.
///
/// Produced from the text after the leading `=`. The reference list is
/// sorted and deduplicated at construction; it may contain out-of-range
/// positions, which never receive graph edges and evaluate to `#REF!`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFormula {
    ast: AstNode,
    references: Vec<Position>,
}

impl CompiledFormula {
    pub fn parse(expression: &str) -> Result<Self, EngineError> {
        let ast = parse_formula(expression)?;
        let mut references = Vec::new();
        collect_references(&ast, &mut references);
        references.sort();
        references.dedup();
        Ok(CompiledFormula { ast, references })
    }

    /// Evaluates the expression. Values are finite numbers; a non-finite
    /// result (overflow, 0/0 through cell inputs) is an arithmetic error.
    pub fn evaluate<F>(&self, resolver: F) -> Result<f64, CellError>
    where
        F: Fn(Position) -> Result<f64, CellError>,
    {
        let value = evaluator::evaluate(&self.ast, &resolver)?;
        if !value.is_finite() {
            return Err(CellError::Arithmetic);
        }
        Ok(value)
    }

    /// The canonical printed form, without the leading `=`.
    pub fn expression_text(&self) -> String {
        self.ast.to_string()
    }

    pub fn referenced_positions(&self) -> &[Position] {
        &self.references
    }
}

fn collect_references(node: &AstNode, out: &mut Vec<Position>) {
    match node {
        AstNode::Number(_) => {}
        AstNode::Reference(pos) => out.push(*pos),
        AstNode::UnaryOp { operand, .. } => collect_references(operand, out),
        AstNode::BinaryOp { left, right, .. } => {
            collect_references(left, out);
            collect_references(right, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> impl Fn(Position) -> Result<f64, CellError> {
        move |_| Ok(value)
    }

    #[test]
    fn test_parse_and_evaluate() {
        let formula = CompiledFormula::parse("2*(3+4)").unwrap();
        assert_eq!(formula.evaluate(constant(0.0)), Ok(14.0));
        assert_eq!(formula.expression_text(), "2*(3+4)");
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            CompiledFormula::parse("1+"),
            Err(EngineError::ParseError(_))
        ));
    }

    #[test]
    fn test_references_sorted_and_deduped() {
        let formula = CompiledFormula::parse("B1+A1+B1+A2").unwrap();
        assert_eq!(
            formula.referenced_positions(),
            &[
                Position::new(0, 0), // A1
                Position::new(0, 1), // B1
                Position::new(1, 0), // A2
            ]
        );
    }

    #[test]
    fn test_no_references() {
        let formula = CompiledFormula::parse("1+2").unwrap();
        assert!(formula.referenced_positions().is_empty());
    }

    #[test]
    fn test_invalid_reference_evaluates_to_ref_error() {
        let formula = CompiledFormula::parse("ZZZZ99999+1").unwrap();
        let resolver = |pos: Position| {
            if pos.valid() {
                Ok(0.0)
            } else {
                Err(CellError::Ref)
            }
        };
        assert_eq!(formula.evaluate(resolver), Err(CellError::Ref));
    }

    #[test]
    fn test_overflow_is_arithmetic_error() {
        let formula = CompiledFormula::parse("1e308*10").unwrap();
        assert_eq!(formula.evaluate(constant(0.0)), Err(CellError::Arithmetic));
    }

    #[test]
    fn test_canonical_text_normalizes_input() {
        let formula = CompiledFormula::parse(" 1 +  2 ").unwrap();
        assert_eq!(formula.expression_text(), "1+2");

        let formula = CompiledFormula::parse("1+(2*3)").unwrap();
        assert_eq!(formula.expression_text(), "1+2*3");
    }
}
