use crate::{
    ad_ops::{BinaryOp, TernaryOp, UnaryOp},
    num::Float,
    Error, Var,
};

// The derivative rules of `ad_ops`, but recorded on the trace instead of evaluated,
// for higher order reverse mode. They must compute the same values as
// `UnaryOp::dfda` and friends; `d` is the incoming adjoint, `r` the node itself.
// Since `d` is only ever multiplied in, they double as pushforwards of a tangent `d`.

fn ln_10<T: Float>() -> T {
    T::from_f64(std::f64::consts::LN_10)
}

/// `d * ∂r/∂a`, as an expression.
pub(crate) fn unary_dfda<'t, T: Float>(
    op: UnaryOp,
    a: Var<'t, T>,
    r: Var<'t, T>,
    d: Var<'t, T>,
) -> Result<Var<'t, T>, Error> {
    let one_minus_a2 = || -(a * a) + T::ONE;
    Ok(match op {
        UnaryOp::Neg => -d,
        UnaryOp::Recip => (-d / (a * a))?,
        UnaryOp::Powi(0) => d * T::ZERO,
        UnaryOp::Powi(n) => {
            let a_pow = match n.checked_sub(1) {
                Some(m) => a.powi(m)?,
                None => (a.powi(n)? / a)?,
            };
            d * T::from_f64(f64::from(n)) * a_pow
        }
        UnaryOp::Root(n) => {
            let m = n.saturating_sub(1);
            let r_pow = match i32::try_from(m) {
                Ok(k) => r.powi(k)?,
                Err(_) => r.powf(T::from_f64(f64::from(m))),
            };
            (d / (r_pow * T::from_f64(f64::from(n))))?
        }
        UnaryOp::Sqrt => (d / (r * T::from_f64(2.0)))?,
        UnaryOp::Cbrt => (d / (r * r * T::from_f64(3.0)))?,
        UnaryOp::Sin => d * a.cos(),
        UnaryOp::Cos => -d * a.sin(),
        UnaryOp::Tan => d * (r * r + T::ONE),
        UnaryOp::Asin => (d / one_minus_a2().sqrt()?)?,
        UnaryOp::Acos => (-d / one_minus_a2().sqrt()?)?,
        UnaryOp::Atan => (d / (a * a + T::ONE))?,
        UnaryOp::Sinh => d * a.cosh(),
        UnaryOp::Cosh => d * a.sinh(),
        UnaryOp::Tanh => d * (-(r * r) + T::ONE),
        UnaryOp::Asinh => (d / (a * a + T::ONE).sqrt()?)?,
        UnaryOp::Acosh => (d / (a * a - T::ONE).sqrt()?)?,
        UnaryOp::Atanh => (d / one_minus_a2())?,
        UnaryOp::Exp => d * r,
        UnaryOp::Ln => (d / a)?,
        UnaryOp::Exp10 => d * r * ln_10::<T>(),
        UnaryOp::Log10 => (d / (a * ln_10::<T>()))?,
    })
}

/// `d * ∂r/∂a`, as an expression.
pub(crate) fn binary_dfda<'t, T: Float>(
    op: BinaryOp,
    a: Var<'t, T>,
    b: Var<'t, T>,
    d: Var<'t, T>,
) -> Result<Var<'t, T>, Error> {
    Ok(match op {
        BinaryOp::Add | BinaryOp::Sub => d,
        BinaryOp::Mul => d * b,
        BinaryOp::Div => (d / b)?,
        BinaryOp::Pow => d * b * a.pow(&(b - T::ONE)),
    })
}

/// `d * ∂r/∂b`, as an expression.
pub(crate) fn binary_dfdb<'t, T: Float>(
    op: BinaryOp,
    a: Var<'t, T>,
    b: Var<'t, T>,
    r: Var<'t, T>,
    d: Var<'t, T>,
) -> Result<Var<'t, T>, Error> {
    Ok(match op {
        BinaryOp::Add => d,
        BinaryOp::Sub => -d,
        BinaryOp::Mul => d * a,
        BinaryOp::Div => (-(d * a) / (b * b))?,
        BinaryOp::Pow if r.value() == T::ZERO => d * T::ZERO,
        BinaryOp::Pow => d * a.ln() * r,
    })
}

/// `d * ∂r/∂a`, as an expression.
pub(crate) fn ternary_dfda<'t, T: Float>(op: TernaryOp, b: Var<'t, T>, d: Var<'t, T>) -> Var<'t, T> {
    match op {
        TernaryOp::MulAdd => d * b,
    }
}

/// `d * ∂r/∂b`, as an expression.
pub(crate) fn ternary_dfdb<'t, T: Float>(op: TernaryOp, a: Var<'t, T>, d: Var<'t, T>) -> Var<'t, T> {
    match op {
        TernaryOp::MulAdd => d * a,
    }
}

/// `d * ∂r/∂c`, as an expression.
pub(crate) fn ternary_dfdc<'t, T: Float>(op: TernaryOp, d: Var<'t, T>) -> Var<'t, T> {
    match op {
        TernaryOp::MulAdd => d,
    }
}
