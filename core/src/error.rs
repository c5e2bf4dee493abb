// gridcalc-core/src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Position;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid position: ({}, {})", .0.row, .0.col)]
    InvalidPosition(Position),

    #[error("Circular reference detected at {0}")]
    CircularReference(Position),
}

/// Evaluation errors that live in cells like any other value: they are
/// cached, printed with their token, and adopted by dependent formulas.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellError {
    #[error("#REF!")]
    Ref,

    #[error("#VALUE!")]
    Value,

    #[error("#ARITHM!")]
    Arithmetic,
}
