#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::return_self_not_must_use)]

//! Automatic differentiation of scalar expressions, in forward mode with dual
//! numbers and Taylor jets, and in reverse mode with a recorded expression graph.
//!
//! ```
//! use scalarken::{derivatives, Trace};
//!
//! let trace = Trace::<f64>::new();
//! let x = trace.var(3.0);
//! let y = x * x + 2.0 * x;
//! assert_eq!(y.value(), 15.0);
//! assert_eq!(derivatives(&y, &[&x]).unwrap(), vec![8.0]);
//! ```

mod ad_forward;
mod ad_ops;
mod ad_ops_reverse;
mod ad_reverse;
mod ad_taylor;
mod ad_trace;
mod error;
mod math_macros;
pub mod num;
mod trace_display;

pub use ad_forward::{diff1, gradient, value_and_diff1, Dual};
pub use ad_ops::{BinaryOp, TernaryOp, UnaryOp};
pub use ad_reverse::{
    derivatives, grad1, grad_expr, gradn, value_and_grad1, value_and_gradn, Var,
};
pub use ad_taylor::{taylor_derivatives, Jet};
pub use ad_trace::Trace;
pub use error::Error;

// TODO:
// - Skip building adjoint expressions for constant operands in grad_expr; they are
//   built and then never used.
// - Mixed mode: a Trace over Dual numbers would give Hessian-vector products in one
//   pass, but needs Dual to implement Float.
