use thiserror::Error;

/// Errors raised while building or differentiating an expression.
///
/// Domain errors are raised when a primal value is computed, so they surface
/// at the arithmetic that caused them and never during a backward pass.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Divide, invert or negative integer power of a zero primal.
    #[error("division by zero in `{op}`")]
    DivisionByZero { op: &'static str },

    /// Even-order (or zero-order) root of a negative primal.
    #[error("invalid root in `{op}`: root of degree {degree} of {operand}")]
    InvalidRoot {
        op: &'static str,
        degree: u32,
        operand: f64,
    },

    /// A gradient was requested for a node that has no accumulator.
    #[error("node {node} has no gradient accumulator: only independent and dependent variables can be differentiated against")]
    UnboundAccumulator { node: usize },

    /// Only independent variables can have their value reassigned.
    #[error("node {node} is not an independent variable")]
    NotIndependent { node: usize },
}
