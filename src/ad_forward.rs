use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::{
    ad_ops::{BinaryOp, TernaryOp, UnaryOp},
    num::Float,
    Error,
};

/// Forward AD implementation.
///
/// A dual number carries a primal value and `K` tangents, one per derivative
/// direction. Arithmetic on duals computes the primal exactly as plain arithmetic
/// would, and pushes every tangent through the derivative rules in `ad_ops`.
/// No trace is recorded, so the cost is proportional to `K`, not to the size of
/// the expression.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Dual<T, const K: usize = 1> {
    primal: T,
    tangents: [T; K],
}

impl<T: Float> Dual<T, 1> {
    /// A dual number with the given primal and seed tangent.
    pub fn new(primal: T, tangent: T) -> Self {
        Dual {
            primal,
            tangents: [tangent],
        }
    }

    /// The variable we differentiate with respect to: its tangent is one.
    pub fn variable(x: T) -> Self {
        Self::new(x, T::ONE)
    }

    pub fn tangent(&self) -> T {
        self.tangents[0]
    }
}

impl<T: Float, const K: usize> Dual<T, K> {
    pub fn with_tangents(primal: T, tangents: [T; K]) -> Self {
        Dual { primal, tangents }
    }

    /// A constant: all tangents are zero.
    pub fn constant(x: T) -> Self {
        Dual {
            primal: x,
            tangents: [T::ZERO; K],
        }
    }

    /// Seed direction `direction` with one, all others with zero.
    ///
    /// # Panics
    /// If `direction >= K`.
    pub fn seeded(x: T, direction: usize) -> Self {
        let mut tangents = [T::ZERO; K];
        tangents[direction] = T::ONE;
        Dual {
            primal: x,
            tangents,
        }
    }

    pub fn primal(&self) -> T {
        self.primal
    }

    pub fn tangents(&self) -> &[T; K] {
        &self.tangents
    }

    pub(crate) fn lift(&self, x: T) -> Self {
        Self::constant(x)
    }

    // A zero tangent contributes nothing. Skipping it avoids 0 * inf = NaN from
    // partials that are unbounded at this point, e.g. d/dx sqrt(x) at 0 for a constant x.
    fn push(t: T, rule: impl Fn(T) -> T) -> T {
        if t == T::ZERO {
            T::ZERO
        } else {
            rule(t)
        }
    }

    pub(crate) fn map(&self, op: UnaryOp) -> Self {
        let a = self.primal;
        let primal = op.eval(a);
        Dual {
            primal,
            tangents: self
                .tangents
                .map(|t| Self::push(t, |t| op.dfda(a, primal, t))),
        }
    }

    fn try_map(&self, op: UnaryOp) -> Result<Self, Error> {
        op.check(self.primal)?;
        Ok(self.map(op))
    }

    pub(crate) fn binary(&self, rhs: &Self, op: BinaryOp) -> Self {
        let (a, b) = (self.primal, rhs.primal);
        let primal = op.eval(a, b);
        Dual {
            primal,
            tangents: std::array::from_fn(|i| {
                Self::push(self.tangents[i], |t| op.dfda(a, b, primal, t))
                    + Self::push(rhs.tangents[i], |t| op.dfdb(a, b, primal, t))
            }),
        }
    }

    pub(crate) fn try_binary(&self, rhs: &Self, op: BinaryOp) -> Result<Self, Error> {
        op.check(self.primal, rhs.primal)?;
        Ok(self.binary(rhs, op))
    }

    fn ternary(&self, b: &Self, c: &Self, op: TernaryOp) -> Self {
        let (x, y, z) = (self.primal, b.primal, c.primal);
        let primal = op.eval(x, y, z);
        Dual {
            primal,
            tangents: std::array::from_fn(|i| {
                Self::push(self.tangents[i], |t| op.dfda(x, y, z, t))
                    + Self::push(b.tangents[i], |t| op.dfdb(x, y, z, t))
                    + Self::push(c.tangents[i], |t| op.dfdc(x, y, z, t))
            }),
        }
    }

    /// # Errors
    /// `DivisionByZero` if the primal is zero.
    pub fn recip(&self) -> Result<Self, Error> {
        self.try_map(UnaryOp::Recip)
    }

    /// # Errors
    /// `DivisionByZero` if `n` is negative and the primal is zero.
    pub fn powi(&self, n: i32) -> Result<Self, Error> {
        self.try_map(UnaryOp::Powi(n))
    }

    /// The real `n`-th root. Odd roots of negative numbers are negative.
    ///
    /// # Errors
    /// `InvalidRoot` if `n` is even and the primal negative, or `n` is zero.
    pub fn root(&self, n: u32) -> Result<Self, Error> {
        self.try_map(UnaryOp::Root(n))
    }

    /// # Errors
    /// `InvalidRoot` if the primal is negative.
    pub fn sqrt(&self) -> Result<Self, Error> {
        self.try_map(UnaryOp::Sqrt)
    }

    #[must_use]
    pub fn cbrt(&self) -> Self {
        self.map(UnaryOp::Cbrt)
    }

    #[must_use]
    pub fn sin(&self) -> Self {
        self.map(UnaryOp::Sin)
    }

    #[must_use]
    pub fn cos(&self) -> Self {
        self.map(UnaryOp::Cos)
    }

    #[must_use]
    pub fn tan(&self) -> Self {
        self.map(UnaryOp::Tan)
    }

    #[must_use]
    pub fn asin(&self) -> Self {
        self.map(UnaryOp::Asin)
    }

    #[must_use]
    pub fn acos(&self) -> Self {
        self.map(UnaryOp::Acos)
    }

    #[must_use]
    pub fn atan(&self) -> Self {
        self.map(UnaryOp::Atan)
    }

    #[must_use]
    pub fn sinh(&self) -> Self {
        self.map(UnaryOp::Sinh)
    }

    #[must_use]
    pub fn cosh(&self) -> Self {
        self.map(UnaryOp::Cosh)
    }

    #[must_use]
    pub fn tanh(&self) -> Self {
        self.map(UnaryOp::Tanh)
    }

    #[must_use]
    pub fn asinh(&self) -> Self {
        self.map(UnaryOp::Asinh)
    }

    #[must_use]
    pub fn acosh(&self) -> Self {
        self.map(UnaryOp::Acosh)
    }

    #[must_use]
    pub fn atanh(&self) -> Self {
        self.map(UnaryOp::Atanh)
    }

    #[must_use]
    pub fn exp(&self) -> Self {
        self.map(UnaryOp::Exp)
    }

    #[must_use]
    pub fn ln(&self) -> Self {
        self.map(UnaryOp::Ln)
    }

    #[must_use]
    pub fn exp10(&self) -> Self {
        self.map(UnaryOp::Exp10)
    }

    #[must_use]
    pub fn log10(&self) -> Self {
        self.map(UnaryOp::Log10)
    }

    /// Raise to a (differentiable) real power.
    #[must_use]
    pub fn pow(&self, exponent: &Self) -> Self {
        self.binary(exponent, BinaryOp::Pow)
    }

    /// Raise to a constant real power.
    #[must_use]
    pub fn powf(&self, exponent: T) -> Self {
        self.binary(&self.lift(exponent), BinaryOp::Pow)
    }

    /// `self * b + c`
    #[must_use]
    pub fn mul_add(&self, b: &Self, c: &Self) -> Self {
        self.ternary(b, c, TernaryOp::MulAdd)
    }
}

crate::math_macros::impl_bin_op!(Add, add, Dual<T, K>, [T: Float, const K: usize], binary, BinaryOp::Add, Self);
crate::math_macros::impl_bin_op!(Sub, sub, Dual<T, K>, [T: Float, const K: usize], binary, BinaryOp::Sub, Self);
crate::math_macros::impl_bin_op!(Mul, mul, Dual<T, K>, [T: Float, const K: usize], binary, BinaryOp::Mul, Self);
crate::math_macros::impl_bin_op!(Div, div, Dual<T, K>, [T: Float, const K: usize], try_binary, BinaryOp::Div, Result<Self, Error>);

crate::math_macros::impl_un_op!(Neg, neg, Dual<T, K>, [T: Float, const K: usize]);

macro_rules! impl_dual_scalar_lhs {
    ($($t:ty),+) => {
        $(
        crate::math_macros::impl_scalar_lhs_op!(Add, add, [const K: usize], $t, Dual<$t, K>, binary, BinaryOp::Add, Dual<$t, K>);
        crate::math_macros::impl_scalar_lhs_op!(Sub, sub, [const K: usize], $t, Dual<$t, K>, binary, BinaryOp::Sub, Dual<$t, K>);
        crate::math_macros::impl_scalar_lhs_op!(Mul, mul, [const K: usize], $t, Dual<$t, K>, binary, BinaryOp::Mul, Dual<$t, K>);
        crate::math_macros::impl_scalar_lhs_op!(Div, div, [const K: usize], $t, Dual<$t, K>, try_binary, BinaryOp::Div, Result<Dual<$t, K>, Error>);
        )+
    };
}

impl_dual_scalar_lhs!(f32, f64);

/// Compute the result and the derivative of a function at the given primal.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn value_and_diff1<T: Float, F>(f: F, at: T) -> Result<(T, T), Error>
where
    F: Fn(Dual<T>) -> Result<Dual<T>, Error>,
{
    let result = f(Dual::variable(at))?;
    Ok((result.primal(), result.tangent()))
}

/// Compute the derivative of a function at the given primal.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn diff1<T: Float, F>(f: F, at: T) -> Result<T, Error>
where
    F: Fn(Dual<T>) -> Result<Dual<T>, Error>,
{
    value_and_diff1(f, at).map(|(_, df)| df)
}

/// Compute the result and the gradient of a function of `K` inputs in a single
/// forward pass, by seeding each input with its own direction.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn gradient<T: Float, const K: usize, F>(f: F, at: [T; K]) -> Result<(T, [T; K]), Error>
where
    F: Fn([Dual<T, K>; K]) -> Result<Dual<T, K>, Error>,
{
    let vars = std::array::from_fn(|i| Dual::seeded(at[i], i));
    let result = f(vars)?;
    Ok((result.primal, result.tangents))
}
