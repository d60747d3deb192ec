use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::{
    ad_ops::{BinaryOp, UnaryOp},
    num::Float,
    Error,
};

/// Truncated Taylor series, for higher order forward mode.
///
/// A `Jet` holds the normalized Taylor coefficients `c[k] = f^(k)(x) / k!` for
/// `k < N`. The linear operations are O(N), multiplication, division and the
/// elementary functions are O(N^2) recurrences.
///
/// `N` must be at least one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Jet<T, const N: usize> {
    coeffs: [T; N],
}

#[allow(clippy::cast_precision_loss)]
fn scalar<T: Float>(k: usize) -> T {
    T::from_f64(k as f64)
}

impl<T: Float, const N: usize> Jet<T, N> {
    /// The variable we differentiate with respect to: `x + t`.
    pub fn variable(x: T) -> Self {
        let mut coeffs = [T::ZERO; N];
        coeffs[0] = x;
        if N > 1 {
            coeffs[1] = T::ONE;
        }
        Jet { coeffs }
    }

    pub fn constant(x: T) -> Self {
        let mut coeffs = [T::ZERO; N];
        coeffs[0] = x;
        Jet { coeffs }
    }

    pub fn from_coefficients(coeffs: [T; N]) -> Self {
        Jet { coeffs }
    }

    pub fn value(&self) -> T {
        self.coeffs[0]
    }

    /// # Panics
    /// If `k >= N`.
    pub fn coefficient(&self, k: usize) -> T {
        self.coeffs[k]
    }

    pub fn coefficients(&self) -> &[T; N] {
        &self.coeffs
    }

    /// The `k`-th derivative, `k! * c[k]`.
    ///
    /// # Panics
    /// If `k >= N`.
    pub fn derivative(&self, k: usize) -> T {
        (1..=k).fold(self.coeffs[k], |acc, i| acc * scalar::<T>(i))
    }

    /// All derivatives, from the value up to order `N - 1`.
    pub fn derivatives(&self) -> [T; N] {
        std::array::from_fn(|k| self.derivative(k))
    }

    pub(crate) fn lift(&self, x: T) -> Self {
        Self::constant(x)
    }

    fn zip_with(&self, rhs: &Self, f: impl Fn(T, T) -> T) -> Self {
        Jet {
            coeffs: std::array::from_fn(|k| f(self.coeffs[k], rhs.coeffs[k])),
        }
    }

    fn scale(&self, s: T) -> Self {
        Jet {
            coeffs: self.coeffs.map(|c| c * s),
        }
    }

    fn mul_series(&self, rhs: &Self) -> Self {
        Jet {
            coeffs: std::array::from_fn(|k| {
                (0..=k).fold(T::ZERO, |acc, j| acc + self.coeffs[j] * rhs.coeffs[k - j])
            }),
        }
    }

    // q = a / b, from a = q * b.
    fn div_series(&self, rhs: &Self) -> Self {
        let b = &rhs.coeffs;
        let mut q = [T::ZERO; N];
        for k in 0..N {
            let acc = (0..k).fold(self.coeffs[k], |acc, j| acc - q[j] * b[k - j]);
            q[k] = acc / b[0];
        }
        Jet { coeffs: q }
    }

    // b = F(a) where b' = g * a', given b0 = F(a0) and the series of g = F'(a).
    fn integrate(&self, b0: T, g: &Self) -> Self {
        let a = &self.coeffs;
        let mut b = [T::ZERO; N];
        b[0] = b0;
        for k in 1..N {
            let acc = (1..=k).fold(T::ZERO, |acc, j| acc + scalar::<T>(j) * a[j] * g.coeffs[k - j]);
            b[k] = acc / scalar::<T>(k);
        }
        Jet { coeffs: b }
    }

    // b = a^p, from a * b' = p * a' * b.
    fn power_series(&self, p: T, b0: T) -> Self {
        let a = &self.coeffs;
        let mut b = [T::ZERO; N];
        b[0] = b0;
        for k in 1..N {
            let acc = (1..=k).fold(T::ZERO, |acc, j| {
                acc + (p * scalar::<T>(j) - scalar::<T>(k - j)) * a[j] * b[k - j]
            });
            b[k] = acc / (scalar::<T>(k) * a[0]);
        }
        Jet { coeffs: b }
    }

    // a^p at a zero value, for p not a natural number: c[k] = C(p, k) * 0^(p - k) * a1^k.
    // Coefficients below order p vanish, the ones above are infinite.
    fn singular_power(&self, p: T, b0: T) -> Self {
        let a1 = if N > 1 { self.coeffs[1] } else { T::ZERO };
        let mut b = [T::ZERO; N];
        b[0] = b0;
        let (mut binom, mut a1_k) = (T::ONE, T::ONE);
        for k in 1..N {
            binom = binom * (p - scalar::<T>(k - 1)) / scalar::<T>(k);
            a1_k = a1_k * a1;
            b[k] = binom * T::ZERO.powf(p - scalar::<T>(k)) * a1_k;
        }
        Jet { coeffs: b }
    }

    // a^p for a constant p.
    fn powf_series(&self, p: T) -> Self {
        let a0 = self.coeffs[0];
        let b0 = a0.powf(p);
        if self.is_constant() {
            return self.lift(b0);
        }
        if a0 != T::ZERO {
            return self.power_series(p, b0);
        }
        let pf = p.to_f64();
        if pf >= 0.0 && pf.fract() == 0.0 && pf <= f64::from(i32::MAX) {
            #[allow(clippy::cast_possible_truncation)]
            let mut r = self.powi_series(pf as i32);
            r.coeffs[0] = b0;
            return r;
        }
        self.singular_power(p, b0)
    }

    fn exp_series(&self) -> Self {
        let a = &self.coeffs;
        let mut b = [T::ZERO; N];
        b[0] = a[0].exp();
        for k in 1..N {
            let acc = (1..=k).fold(T::ZERO, |acc, j| acc + scalar::<T>(j) * a[j] * b[k - j]);
            b[k] = acc / scalar::<T>(k);
        }
        Jet { coeffs: b }
    }

    fn ln_series(&self) -> Self {
        let a = &self.coeffs;
        let mut b = [T::ZERO; N];
        b[0] = a[0].ln();
        for k in 1..N {
            let acc = (1..k).fold(T::ZERO, |acc, j| {
                acc + scalar::<T>(k - j) * a[j] * b[k - j]
            });
            b[k] = (a[k] - acc / scalar::<T>(k)) / a[0];
        }
        Jet { coeffs: b }
    }

    // (sin a, cos a) when `hyperbolic` is false, (sinh a, cosh a) otherwise.
    fn sin_cos_series(&self, hyperbolic: bool) -> (Self, Self) {
        let a = &self.coeffs;
        let mut s = [T::ZERO; N];
        let mut c = [T::ZERO; N];
        if hyperbolic {
            s[0] = a[0].sinh();
            c[0] = a[0].cosh();
        } else {
            s[0] = a[0].sin();
            c[0] = a[0].cos();
        }
        for k in 1..N {
            let (ds, dc) = (1..=k).fold((T::ZERO, T::ZERO), |(ds, dc), j| {
                let ja = scalar::<T>(j) * a[j];
                (ds + ja * c[k - j], dc + ja * s[k - j])
            });
            s[k] = ds / scalar::<T>(k);
            c[k] = if hyperbolic {
                dc / scalar::<T>(k)
            } else {
                -dc / scalar::<T>(k)
            };
        }
        (Jet { coeffs: s }, Jet { coeffs: c })
    }

    fn one_minus_square(&self) -> Self {
        self.lift(T::ONE) - *self * *self
    }

    fn square_plus(&self, x: T) -> Self {
        *self * *self + x
    }

    fn is_constant(&self) -> bool {
        self.coeffs[1..].iter().all(|c| *c == T::ZERO)
    }

    pub(crate) fn map(&self, op: UnaryOp) -> Self {
        let a0 = self.coeffs[0];
        if self.is_constant() {
            // the recurrences below can divide by a zero value even when all
            // higher coefficients vanish.
            return self.lift(op.eval(a0));
        }
        match op {
            UnaryOp::Neg => Jet {
                coeffs: self.coeffs.map(|c| -c),
            },
            UnaryOp::Recip => self.lift(T::ONE).div_series(self),
            UnaryOp::Powi(n) => self.powi_series(n),
            UnaryOp::Root(_) | UnaryOp::Sqrt | UnaryOp::Cbrt => {
                let n = match op {
                    UnaryOp::Root(n) => n,
                    UnaryOp::Sqrt => 2,
                    _ => 3,
                };
                let p = T::ONE / T::from_f64(f64::from(n));
                if a0 == T::ZERO {
                    self.singular_power(p, op.eval(a0))
                } else {
                    self.power_series(p, op.eval(a0))
                }
            }
            UnaryOp::Sin => self.sin_cos_series(false).0,
            UnaryOp::Cos => self.sin_cos_series(false).1,
            UnaryOp::Tan => {
                let (s, c) = self.sin_cos_series(false);
                s.div_series(&c)
            }
            UnaryOp::Sinh => self.sin_cos_series(true).0,
            UnaryOp::Cosh => self.sin_cos_series(true).1,
            UnaryOp::Tanh => {
                let (s, c) = self.sin_cos_series(true);
                s.div_series(&c)
            }
            UnaryOp::Asin => {
                let g = self.one_minus_square().power_series(-T::from_f64(0.5), T::ONE / (T::ONE - a0 * a0).sqrt());
                self.integrate(op.eval(a0), &g)
            }
            UnaryOp::Acos => {
                let g = self.one_minus_square().power_series(-T::from_f64(0.5), T::ONE / (T::ONE - a0 * a0).sqrt());
                self.integrate(op.eval(a0), &-g)
            }
            UnaryOp::Atan => {
                let g = self.lift(T::ONE).div_series(&self.square_plus(T::ONE));
                self.integrate(op.eval(a0), &g)
            }
            UnaryOp::Asinh => {
                let g = self.square_plus(T::ONE).power_series(-T::from_f64(0.5), T::ONE / (a0 * a0 + T::ONE).sqrt());
                self.integrate(op.eval(a0), &g)
            }
            UnaryOp::Acosh => {
                let g = self.square_plus(-T::ONE).power_series(-T::from_f64(0.5), T::ONE / (a0 * a0 - T::ONE).sqrt());
                self.integrate(op.eval(a0), &g)
            }
            UnaryOp::Atanh => {
                let g = self.lift(T::ONE).div_series(&self.one_minus_square());
                self.integrate(op.eval(a0), &g)
            }
            UnaryOp::Exp => self.exp_series(),
            UnaryOp::Ln => self.ln_series(),
            UnaryOp::Exp10 => {
                let ln_10 = T::from_f64(std::f64::consts::LN_10);
                let mut r = self.scale(ln_10).exp_series();
                // keep the primal identical to the scalar function
                r.coeffs[0] = op.eval(a0);
                r
            }
            UnaryOp::Log10 => {
                let ln_10 = T::from_f64(std::f64::consts::LN_10);
                let mut r = self.ln_series().scale(T::ONE / ln_10);
                r.coeffs[0] = op.eval(a0);
                r
            }
        }
    }

    // Repeated squaring, so integer powers stay exact at zero.
    fn powi_series(&self, n: i32) -> Self {
        let mut base = *self;
        let mut acc = self.lift(T::ONE);
        let mut e = n.unsigned_abs();
        while e > 0 {
            if e & 1 == 1 {
                acc = acc.mul_series(&base);
            }
            base = base.mul_series(&base);
            e >>= 1;
        }
        if n < 0 {
            self.lift(T::ONE).div_series(&acc)
        } else {
            acc
        }
    }

    fn try_map(&self, op: UnaryOp) -> Result<Self, Error> {
        op.check(self.coeffs[0])?;
        Ok(self.map(op))
    }

    pub(crate) fn binary(&self, rhs: &Self, op: BinaryOp) -> Self {
        if self.is_constant() && rhs.is_constant() {
            return self.lift(op.eval(self.coeffs[0], rhs.coeffs[0]));
        }
        match op {
            BinaryOp::Add => self.zip_with(rhs, |a, b| a + b),
            BinaryOp::Sub => self.zip_with(rhs, |a, b| a - b),
            BinaryOp::Mul => self.mul_series(rhs),
            BinaryOp::Div => self.div_series(rhs),
            // a^b vanishes at a zero base whatever b does, like the partial to b in `ad_ops`.
            BinaryOp::Pow if rhs.is_constant() || self.coeffs[0] == T::ZERO => {
                self.powf_series(rhs.coeffs[0])
            }
            BinaryOp::Pow => {
                // a^b = exp(b ln a), with the primal taken from the scalar function.
                let mut r = rhs.mul_series(&self.ln_series()).exp_series();
                r.coeffs[0] = op.eval(self.coeffs[0], rhs.coeffs[0]);
                r
            }
        }
    }

    pub(crate) fn try_binary(&self, rhs: &Self, op: BinaryOp) -> Result<Self, Error> {
        op.check(self.coeffs[0], rhs.coeffs[0])?;
        Ok(self.binary(rhs, op))
    }

    /// # Errors
    /// `DivisionByZero` if the value is zero.
    pub fn recip(&self) -> Result<Self, Error> {
        self.try_map(UnaryOp::Recip)
    }

    /// # Errors
    /// `DivisionByZero` if `n` is negative and the value is zero.
    pub fn powi(&self, n: i32) -> Result<Self, Error> {
        self.try_map(UnaryOp::Powi(n))
    }

    /// # Errors
    /// `InvalidRoot` if `n` is even and the value negative, or `n` is zero.
    pub fn root(&self, n: u32) -> Result<Self, Error> {
        self.try_map(UnaryOp::Root(n))
    }

    /// # Errors
    /// `InvalidRoot` if the value is negative.
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

    #[must_use]
    pub fn pow(&self, exponent: &Self) -> Self {
        self.binary(exponent, BinaryOp::Pow)
    }

    /// Raise to a constant real power.
    #[must_use]
    pub fn powf(&self, exponent: T) -> Self {
        self.powf_series(exponent)
    }
}

crate::math_macros::impl_bin_op!(Add, add, Jet<T, N>, [T: Float, const N: usize], binary, BinaryOp::Add, Self);
crate::math_macros::impl_bin_op!(Sub, sub, Jet<T, N>, [T: Float, const N: usize], binary, BinaryOp::Sub, Self);
crate::math_macros::impl_bin_op!(Mul, mul, Jet<T, N>, [T: Float, const N: usize], binary, BinaryOp::Mul, Self);
crate::math_macros::impl_bin_op!(Div, div, Jet<T, N>, [T: Float, const N: usize], try_binary, BinaryOp::Div, Result<Self, Error>);

crate::math_macros::impl_un_op!(Neg, neg, Jet<T, N>, [T: Float, const N: usize]);

macro_rules! impl_jet_scalar_lhs {
    ($($t:ty),+) => {
        $(
        crate::math_macros::impl_scalar_lhs_op!(Add, add, [const N: usize], $t, Jet<$t, N>, binary, BinaryOp::Add, Jet<$t, N>);
        crate::math_macros::impl_scalar_lhs_op!(Sub, sub, [const N: usize], $t, Jet<$t, N>, binary, BinaryOp::Sub, Jet<$t, N>);
        crate::math_macros::impl_scalar_lhs_op!(Mul, mul, [const N: usize], $t, Jet<$t, N>, binary, BinaryOp::Mul, Jet<$t, N>);
        crate::math_macros::impl_scalar_lhs_op!(Div, div, [const N: usize], $t, Jet<$t, N>, try_binary, BinaryOp::Div, Result<Jet<$t, N>, Error>);
        )+
    };
}

impl_jet_scalar_lhs!(f32, f64);

/// Compute the value and the first `N - 1` derivatives of a function at the given primal.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn taylor_derivatives<T: Float, const N: usize, F>(f: F, at: T) -> Result<[T; N], Error>
where
    F: Fn(Jet<T, N>) -> Result<Jet<T, N>, Error>,
{
    Ok(f(Jet::variable(at))?.derivatives())
}

#[cfg(test)]
mod tests {

    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert!(
            a.iter().zip(b).all(|(a, b)| (a - b).abs() < 1e-9),
            "\r\nleft : {a:?}\r\nright: {b:?}"
        );
    }

    #[test]
    fn test_polynomial() {
        // x^3 at 2: 8, 12, 12, 6, 0
        let x = Jet::<f64, 5>::variable(2.0);
        assert_close(&(x * x * x).derivatives(), &[8.0, 12.0, 12.0, 6.0, 0.0]);
        assert_close(&x.powi(3).unwrap().derivatives(), &[8.0, 12.0, 12.0, 6.0, 0.0]);
    }

    #[test]
    fn test_sin_derivatives_cycle() {
        let x = 0.3f64;
        let d = Jet::<f64, 5>::variable(x).sin().derivatives();
        assert_close(&d, &[x.sin(), x.cos(), -x.sin(), -x.cos(), x.sin()]);
    }

    #[test]
    fn test_exp_ln_inverse() {
        let x = Jet::<f64, 4>::variable(1.5);
        let y = x.exp().ln();
        assert_close(y.coefficients(), x.coefficients());
    }

    #[test]
    fn test_division_recurrence() {
        // 1 / (1 - x) at 0 = 1 + x + x^2 + ...
        let x = Jet::<f64, 4>::variable(0.0);
        let y = (1.0 / (1.0 - x)).unwrap();
        assert_close(y.coefficients(), &[1.0, 1.0, 1.0, 1.0]);
        assert_eq!(
            (x / x).unwrap_err(),
            Error::DivisionByZero { op: "div" }
        );
    }

    #[test]
    fn test_sqrt_series() {
        // sqrt(x) at 4: 2, 1/4, -1/32
        let d = Jet::<f64, 3>::variable(4.0).sqrt().unwrap().derivatives();
        assert_close(&d, &[2.0, 0.25, -1.0 / 32.0]);
    }

    #[test]
    fn test_powers_at_zero() {
        let x = Jet::<f64, 4>::variable(0.0);
        assert_eq!(x.powf(2.0).derivatives(), [0.0, 0.0, 2.0, 0.0]);
        assert_eq!(x.pow(&Jet::constant(3.0)).derivatives(), [0.0, 0.0, 0.0, 6.0]);
        assert_eq!(Jet::<f64, 4>::constant(0.0).powf(2.0).coefficients(), &[0.0; 4]);
        assert_eq!(x.powf(0.0).coefficients(), &[1.0, 0.0, 0.0, 0.0]);

        // x^2.5 is twice differentiable at 0, its third derivative blows up.
        let d = x.powf(2.5).derivatives();
        assert_eq!(&d[..3], &[0.0, 0.0, 0.0]);
        assert_eq!(d[3], f64::INFINITY);

        let d = x.sqrt().unwrap().derivatives();
        assert_eq!(d[0], 0.0);
        assert_eq!(d[1], f64::INFINITY);
    }

    #[test]
    #[should_panic]
    fn test_coefficient_out_of_range() {
        Jet::<f64, 2>::variable(1.0).coefficient(2);
    }
}
