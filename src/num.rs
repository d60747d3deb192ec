use std::{
    fmt::Debug,
    ops::{Add, Div, Mul, Neg, Sub},
};

/// A number that has both zero and one values.
pub trait ZeroOne: 'static + Copy + PartialEq + PartialOrd + Debug {
    /// The zero value.
    const ZERO: Self;
    /// The one value.
    const ONE: Self;
}

/// A trait with basic requirements of the scalars we differentiate.
/// Zero detection and sign checks go through `PartialEq` and `PartialOrd`.
pub trait Num:
    ZeroOne
    + Add<Self, Output = Self>
    + Sub<Self, Output = Self>
    + Mul<Self, Output = Self>
    + Div<Self, Output = Self>
    + Neg<Output = Self>
{
    /// Convert from f64. Used for integer exponents, root degrees and
    /// the constants that show up in derivative rules.
    fn from_f64(x: f64) -> Self;

    /// Convert to f64. Used for reporting offending operands in errors, and to
    /// test whether an exponent is integral.
    fn to_f64(self) -> f64;
}

/// The elementary functions. These are the raw functions of the scalar type:
/// they do no domain checks, so e.g. `sqrt` of a negative number is NaN for floats.
pub trait Float: Num {
    #[must_use]
    fn sin(self) -> Self;
    #[must_use]
    fn cos(self) -> Self;
    #[must_use]
    fn tan(self) -> Self;
    #[must_use]
    fn asin(self) -> Self;
    #[must_use]
    fn acos(self) -> Self;
    #[must_use]
    fn atan(self) -> Self;
    #[must_use]
    fn sinh(self) -> Self;
    #[must_use]
    fn cosh(self) -> Self;
    #[must_use]
    fn tanh(self) -> Self;
    #[must_use]
    fn asinh(self) -> Self;
    #[must_use]
    fn acosh(self) -> Self;
    #[must_use]
    fn atanh(self) -> Self;
    /// Apply exponential function.
    #[must_use]
    fn exp(self) -> Self;
    /// Apply the natural logarithm.
    #[must_use]
    fn ln(self) -> Self;
    #[must_use]
    fn exp10(self) -> Self;
    #[must_use]
    fn log10(self) -> Self;
    #[must_use]
    fn sqrt(self) -> Self;
    #[must_use]
    fn cbrt(self) -> Self;
    /// Raise self to an integer power.
    #[must_use]
    fn powi(self, n: i32) -> Self;
    /// Raise self to the power of given exponent.
    #[must_use]
    fn powf(self, exponent: Self) -> Self;
    fn is_nan(self) -> bool;
}

macro_rules! impl_float {
    ($t:ident) => {
        impl ZeroOne for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
        }

        impl Num for $t {
            #[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
            fn from_f64(x: f64) -> Self {
                x as _
            }

            #[allow(clippy::cast_lossless)]
            fn to_f64(self) -> f64 {
                self as _
            }
        }

        impl Float for $t {
            fn sin(self) -> Self {
                $t::sin(self)
            }

            fn cos(self) -> Self {
                $t::cos(self)
            }

            fn tan(self) -> Self {
                $t::tan(self)
            }

            fn asin(self) -> Self {
                $t::asin(self)
            }

            fn acos(self) -> Self {
                $t::acos(self)
            }

            fn atan(self) -> Self {
                $t::atan(self)
            }

            fn sinh(self) -> Self {
                $t::sinh(self)
            }

            fn cosh(self) -> Self {
                $t::cosh(self)
            }

            fn tanh(self) -> Self {
                $t::tanh(self)
            }

            fn asinh(self) -> Self {
                $t::asinh(self)
            }

            fn acosh(self) -> Self {
                $t::acosh(self)
            }

            fn atanh(self) -> Self {
                $t::atanh(self)
            }

            fn exp(self) -> Self {
                $t::exp(self)
            }

            fn ln(self) -> Self {
                $t::ln(self)
            }

            fn exp10(self) -> Self {
                $t::powf(10.0, self)
            }

            fn log10(self) -> Self {
                $t::log10(self)
            }

            fn sqrt(self) -> Self {
                $t::sqrt(self)
            }

            fn cbrt(self) -> Self {
                $t::cbrt(self)
            }

            fn powi(self, n: i32) -> Self {
                $t::powi(self, n)
            }

            fn powf(self, exp: Self) -> Self {
                $t::powf(self, exp)
            }

            fn is_nan(self) -> bool {
                $t::is_nan(self)
            }
        }
    };
}

impl_float!(f32);
impl_float!(f64);
