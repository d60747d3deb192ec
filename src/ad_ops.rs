use std::fmt::{Display, Formatter};

use crate::{
    num::{Float, ZeroOne},
    Error,
};

// The elementary operations, and their derivative rules.
//
// Each operation knows how to compute its primal (`eval`), whether its operands are
// in its domain (`check`), and how to scale an incoming derivative `d` by its
// partial derivatives (`dfda`, `dfdb`, `dfdc`). The partials get the operands and the
// result of `eval`, so rules like exp can reuse the forward calculation.
//
// Forward mode calls `dfda` with a tangent, reverse mode with an adjoint. Since the
// partials are scalars both directions are the same multiplication, so the two modes
// share this table and agree to the last bit.

/// Operations with a single operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Recip,
    Powi(i32),
    Root(u32),
    Sqrt,
    Cbrt,
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Asinh,
    Acosh,
    Atanh,
    Exp,
    Ln,
    Exp10,
    Log10,
}

/// Operations with two operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    /// Real-valued exponent.
    Pow,
}

/// Operations with three operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TernaryOp {
    /// `a * b + c`
    MulAdd,
}

fn ln_10<T: Float>() -> T {
    T::from_f64(std::f64::consts::LN_10)
}

fn check_root<T: Float>(op: &'static str, degree: u32, a: T) -> Result<(), Error> {
    if degree == 0 || (degree % 2 == 0 && a < T::ZERO) {
        return Err(Error::InvalidRoot {
            op,
            degree,
            operand: a.to_f64(),
        });
    }
    Ok(())
}

impl UnaryOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::Recip => "recip",
            UnaryOp::Powi(_) => "powi",
            UnaryOp::Root(_) => "root",
            UnaryOp::Sqrt => "sqrt",
            UnaryOp::Cbrt => "cbrt",
            UnaryOp::Sin => "sin",
            UnaryOp::Cos => "cos",
            UnaryOp::Tan => "tan",
            UnaryOp::Asin => "asin",
            UnaryOp::Acos => "acos",
            UnaryOp::Atan => "atan",
            UnaryOp::Sinh => "sinh",
            UnaryOp::Cosh => "cosh",
            UnaryOp::Tanh => "tanh",
            UnaryOp::Asinh => "asinh",
            UnaryOp::Acosh => "acosh",
            UnaryOp::Atanh => "atanh",
            UnaryOp::Exp => "exp",
            UnaryOp::Ln => "ln",
            UnaryOp::Exp10 => "exp10",
            UnaryOp::Log10 => "log10",
        }
    }

    /// Check that `a` is in the domain of this operation.
    ///
    /// # Errors
    /// `DivisionByZero` for `recip` of zero and negative `powi` of zero,
    /// `InvalidRoot` for even roots of negative numbers.
    pub fn check<T: Float>(self, a: T) -> Result<(), Error> {
        match self {
            UnaryOp::Recip if a == T::ZERO => Err(Error::DivisionByZero { op: self.name() }),
            UnaryOp::Powi(n) if n < 0 && a == T::ZERO => {
                Err(Error::DivisionByZero { op: self.name() })
            }
            UnaryOp::Root(n) => check_root(self.name(), n, a),
            UnaryOp::Sqrt => check_root(self.name(), 2, a),
            _ => Ok(()),
        }
    }

    /// The primal value, without domain checks.
    pub fn eval<T: Float>(self, a: T) -> T {
        match self {
            UnaryOp::Neg => -a,
            UnaryOp::Recip => T::ONE / a,
            UnaryOp::Powi(n) => a.powi(n),
            UnaryOp::Root(2) | UnaryOp::Sqrt => a.sqrt(),
            UnaryOp::Root(3) | UnaryOp::Cbrt => a.cbrt(),
            UnaryOp::Root(n) => {
                let inv = T::ONE / T::from_f64(f64::from(n));
                if a < T::ZERO {
                    // only reachable for odd n, after check.
                    -(-a).powf(inv)
                } else {
                    a.powf(inv)
                }
            }
            UnaryOp::Sin => a.sin(),
            UnaryOp::Cos => a.cos(),
            UnaryOp::Tan => a.tan(),
            UnaryOp::Asin => a.asin(),
            UnaryOp::Acos => a.acos(),
            UnaryOp::Atan => a.atan(),
            UnaryOp::Sinh => a.sinh(),
            UnaryOp::Cosh => a.cosh(),
            UnaryOp::Tanh => a.tanh(),
            UnaryOp::Asinh => a.asinh(),
            UnaryOp::Acosh => a.acosh(),
            UnaryOp::Atanh => a.atanh(),
            UnaryOp::Exp => a.exp(),
            UnaryOp::Ln => a.ln(),
            UnaryOp::Exp10 => a.exp10(),
            UnaryOp::Log10 => a.log10(),
        }
    }

    /// Checked primal value.
    ///
    /// # Errors
    /// See `check`.
    pub fn apply<T: Float>(self, a: T) -> Result<T, Error> {
        self.check(a)?;
        Ok(self.eval(a))
    }

    /// `d * ∂r/∂a` where `r` is the result of `eval(a)`.
    pub fn dfda<T: Float>(self, a: T, r: T, d: T) -> T {
        match self {
            UnaryOp::Neg => -d,
            UnaryOp::Recip => -d / (a * a),
            UnaryOp::Powi(0) => T::ZERO,
            UnaryOp::Powi(n) => {
                // n - 1 overflows for i32::MIN, where a is nonzero.
                let a_pow = match n.checked_sub(1) {
                    Some(m) => a.powi(m),
                    None => a.powi(n) / a,
                };
                d * T::from_f64(f64::from(n)) * a_pow
            }
            UnaryOp::Root(n) => {
                // d/da a^(1/n) = 1 / (n * r^(n-1))
                let m = n.saturating_sub(1);
                let r_pow = match i32::try_from(m) {
                    Ok(k) => r.powi(k),
                    Err(_) => r.powf(T::from_f64(f64::from(m))),
                };
                d / (T::from_f64(f64::from(n)) * r_pow)
            }
            UnaryOp::Sqrt => d / (T::from_f64(2.0) * r),
            UnaryOp::Cbrt => d / (T::from_f64(3.0) * r * r),
            UnaryOp::Sin => d * a.cos(),
            UnaryOp::Cos => -d * a.sin(),
            UnaryOp::Tan => d * (T::ONE + r * r),
            UnaryOp::Asin => d / (T::ONE - a * a).sqrt(),
            UnaryOp::Acos => -d / (T::ONE - a * a).sqrt(),
            UnaryOp::Atan => d / (T::ONE + a * a),
            UnaryOp::Sinh => d * a.cosh(),
            UnaryOp::Cosh => d * a.sinh(),
            UnaryOp::Tanh => d * (T::ONE - r * r),
            UnaryOp::Asinh => d / (a * a + T::ONE).sqrt(),
            UnaryOp::Acosh => d / (a * a - T::ONE).sqrt(),
            UnaryOp::Atanh => d / (T::ONE - a * a),
            UnaryOp::Exp => d * r,
            UnaryOp::Ln => d / a,
            UnaryOp::Exp10 => d * r * ln_10::<T>(),
            UnaryOp::Log10 => d / (a * ln_10::<T>()),
        }
    }
}

impl BinaryOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Pow => "pow",
        }
    }

    /// Check that `a` and `b` are in the domain of this operation.
    ///
    /// # Errors
    /// `DivisionByZero` if dividing by zero.
    pub fn check<T: ZeroOne>(self, _a: T, b: T) -> Result<(), Error> {
        match self {
            BinaryOp::Div if b == T::ZERO => Err(Error::DivisionByZero { op: self.name() }),
            _ => Ok(()),
        }
    }

    pub fn eval<T: Float>(self, a: T, b: T) -> T {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
        }
    }

    /// Checked primal value.
    ///
    /// # Errors
    /// See `check`.
    pub fn apply<T: Float>(self, a: T, b: T) -> Result<T, Error> {
        self.check(a, b)?;
        Ok(self.eval(a, b))
    }

    /// `d * ∂r/∂a`
    pub fn dfda<T: Float>(self, a: T, b: T, _r: T, d: T) -> T {
        match self {
            BinaryOp::Add | BinaryOp::Sub => d,
            BinaryOp::Mul => d * b,
            BinaryOp::Div => d / b,
            BinaryOp::Pow => d * b * a.powf(b - T::ONE),
        }
    }

    /// `d * ∂r/∂b`
    pub fn dfdb<T: Float>(self, a: T, b: T, r: T, d: T) -> T {
        match self {
            BinaryOp::Add => d,
            BinaryOp::Sub => -d,
            BinaryOp::Mul => d * a,
            BinaryOp::Div => -d * a / (b * b),
            // a^b vanishes faster than ln(a) diverges.
            BinaryOp::Pow if r == T::ZERO => T::ZERO,
            BinaryOp::Pow => d * a.ln() * r,
        }
    }
}

impl TernaryOp {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            TernaryOp::MulAdd => "mul_add",
        }
    }

    pub fn eval<T: Float>(self, a: T, b: T, c: T) -> T {
        match self {
            TernaryOp::MulAdd => a * b + c,
        }
    }

    /// `d * ∂r/∂a`
    pub fn dfda<T: Float>(self, _a: T, b: T, _c: T, d: T) -> T {
        match self {
            TernaryOp::MulAdd => d * b,
        }
    }

    /// `d * ∂r/∂b`
    pub fn dfdb<T: Float>(self, a: T, _b: T, _c: T, d: T) -> T {
        match self {
            TernaryOp::MulAdd => d * a,
        }
    }

    /// `d * ∂r/∂c`
    pub fn dfdc<T: Float>(self, _a: T, _b: T, _c: T, d: T) -> T {
        match self {
            TernaryOp::MulAdd => d,
        }
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Powi(n) => write!(f, "powi({n})"),
            UnaryOp::Root(n) => write!(f, "root({n})"),
            op => write!(f, "{}", op.name()),
        }
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Display for TernaryOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
