use std::error::Error;
use std::fmt::{Display, Formatter};

use super::NodeId;
use crate::operator::OpError;
use crate::value::{DataType, ValueType};

/// Errors that occur when running an operator node.
#[derive(Debug, PartialEq)]
pub enum RunError {
    /// No node exists with a given ID.
    InvalidNodeId(NodeId),

    /// The node exists but is a value or constant.
    NotAnOperator(NodeId),

    /// The number of inputs supplied does not match the number of inputs the
    /// node was lowered with.
    InputCountMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Execution of an operator failed.
    OperatorError { name: String, error: OpError },

    /// The operator did not produce an output.
    MissingOutput { name: String },

    /// The operator produced an output whose type differs from the type
    /// recorded when the node was lowered.
    OutputTypeMismatch {
        name: String,
        expected: DataType,
        actual: ValueType,
    },
}

impl Display for RunError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            RunError::InvalidNodeId(id) => write!(f, "node ID {} is invalid", id),
            RunError::NotAnOperator(id) => write!(f, "node {} is not an operator", id),
            RunError::InputCountMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "operator \"{}\" expects {} inputs but got {}",
                name, expected, actual
            ),
            RunError::OperatorError { name, error } => {
                write!(f, "operator \"{}\" failed: {}", name, error)
            }
            RunError::MissingOutput { name } => {
                write!(f, "operator \"{}\" produced no output", name)
            }
            RunError::OutputTypeMismatch {
                name,
                expected,
                actual,
            } => write!(
                f,
                "operator \"{}\" produced {} but {} was expected",
                name,
                actual,
                ValueType::Tensor(*expected)
            ),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            RunError::OperatorError { error, .. } => Some(error),
            _ => None,
        }
    }
}
