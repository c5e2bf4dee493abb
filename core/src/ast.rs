// gridcalc-core/src/ast.rs
// Abstract Syntax Tree for formula expressions

use std::fmt;

use crate::model::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Number(f64),
    Reference(Position),
    BinaryOp {
        op: BinaryOperator,
        left: Box<AstNode>,
        right: Box<AstNode>,
    },
    UnaryOp {
        op: UnaryOperator,
        operand: Box<AstNode>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Positive,
    Negative,
}

impl BinaryOperator {
    fn symbol(self) -> char {
        match self {
            BinaryOperator::Add => '+',
            BinaryOperator::Subtract => '-',
            BinaryOperator::Multiply => '*',
            BinaryOperator::Divide => '/',
        }
    }
}

impl UnaryOperator {
    fn symbol(self) -> char {
        match self {
            UnaryOperator::Positive => '+',
            UnaryOperator::Negative => '-',
        }
    }
}

impl AstNode {
    // Atoms bind tightest, then unary sign, then * /, then + -.
    fn precedence(&self) -> u8 {
        match self {
            AstNode::Number(_) | AstNode::Reference(_) => 3,
            AstNode::UnaryOp { .. } => 2,
            AstNode::BinaryOp { op, .. } => match op {
                BinaryOperator::Multiply | BinaryOperator::Divide => 1,
                BinaryOperator::Add | BinaryOperator::Subtract => 0,
            },
        }
    }
}

/// Canonical printed form: whitespace-free, with the minimal parentheses
/// that preserve the tree. An equal-precedence operand keeps its
/// parentheses only on the right-hand side of `-` and `/`.
impl fmt::Display for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNode::Number(n) => write!(f, "{}", n),
            AstNode::Reference(pos) => write!(f, "{}", pos),
            AstNode::UnaryOp { op, operand } => {
                write!(f, "{}", op.symbol())?;
                if operand.precedence() < self.precedence() {
                    write!(f, "({})", operand)
                } else {
                    write!(f, "{}", operand)
                }
            }
            AstNode::BinaryOp { op, left, right } => {
                let prec = self.precedence();
                if left.precedence() < prec {
                    write!(f, "({})", left)?;
                } else {
                    write!(f, "{}", left)?;
                }
                write!(f, "{}", op.symbol())?;
                let grouped = right.precedence() < prec
                    || (right.precedence() == prec
                        && matches!(op, BinaryOperator::Subtract | BinaryOperator::Divide));
                if grouped {
                    write!(f, "({})", right)
                } else {
                    write!(f, "{}", right)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Box<AstNode> {
        Box::new(AstNode::Number(n))
    }

    fn bin(op: BinaryOperator, left: Box<AstNode>, right: Box<AstNode>) -> Box<AstNode> {
        Box::new(AstNode::BinaryOp { op, left, right })
    }

    #[test]
    fn test_print_flat() {
        let node = bin(BinaryOperator::Add, num(1.0), num(2.0));
        assert_eq!(node.to_string(), "1+2");
    }

    #[test]
    fn test_print_keeps_needed_parens() {
        // (1+2)*3
        let node = bin(
            BinaryOperator::Multiply,
            bin(BinaryOperator::Add, num(1.0), num(2.0)),
            num(3.0),
        );
        assert_eq!(node.to_string(), "(1+2)*3");
    }

    #[test]
    fn test_print_drops_redundant_parens() {
        // 1+(2*3) prints without the grouping
        let node = bin(
            BinaryOperator::Add,
            num(1.0),
            bin(BinaryOperator::Multiply, num(2.0), num(3.0)),
        );
        assert_eq!(node.to_string(), "1+2*3");
    }

    #[test]
    fn test_print_subtraction_right_operand() {
        // 1-(2-3) must keep the parentheses, 1-(2+3) too
        let inner = bin(BinaryOperator::Subtract, num(2.0), num(3.0));
        let node = bin(BinaryOperator::Subtract, num(1.0), inner);
        assert_eq!(node.to_string(), "1-(2-3)");

        let inner = bin(BinaryOperator::Add, num(2.0), num(3.0));
        let node = bin(BinaryOperator::Subtract, num(1.0), inner);
        assert_eq!(node.to_string(), "1-(2+3)");
    }

    #[test]
    fn test_print_division_right_operand() {
        let inner = bin(BinaryOperator::Multiply, num(2.0), num(3.0));
        let node = bin(BinaryOperator::Divide, num(6.0), inner);
        assert_eq!(node.to_string(), "6/(2*3)");
    }

    #[test]
    fn test_print_unary() {
        let node = AstNode::UnaryOp {
            op: UnaryOperator::Negative,
            operand: bin(BinaryOperator::Add, num(1.0), num(2.0)),
        };
        assert_eq!(node.to_string(), "-(1+2)");

        let node = AstNode::UnaryOp {
            op: UnaryOperator::Negative,
            operand: num(3.0),
        };
        assert_eq!(node.to_string(), "-3");
    }

    #[test]
    fn test_print_reference() {
        let node = AstNode::Reference(Position::new(0, 1));
        assert_eq!(node.to_string(), "B1");
    }
}
