// A couple of macros to help with implementing Add, Sub, Mul, Div and Neg for the
// differentiable number types, both between themselves and with a plain scalar.
// All of the types are Copy, so only owned arguments are covered.
// The types need `lift`, which turns a scalar into a constant of the type, and
// `map`/`binary`/`try_binary`, which apply an op from `ad_ops`.

macro_rules! impl_bin_op {
    // Add          , add         , Dual<T, K>, [T: Float, const K: usize], binary      , BinaryOp::Add, Self
    ($op_trait:ident, $op_fn:ident, $name:ty, [$($g:tt)*], $method:ident, $op:expr, $out:ty) => {
        impl<$($g)*> $op_trait for $name {
            type Output = $out;

            fn $op_fn(self, rhs: Self) -> Self::Output {
                self.$method(&rhs, $op)
            }
        }

        impl<$($g)*> $op_trait<T> for $name {
            type Output = $out;

            fn $op_fn(self, rhs: T) -> Self::Output {
                let rhs = self.lift(rhs);
                self.$method(&rhs, $op)
            }
        }
    };
}

pub(crate) use impl_bin_op;

// Scalars on the left hand side can't be generic (orphan rules), so these are
// implemented per concrete scalar type.
macro_rules! impl_scalar_lhs_op {
    // Sub          , sub         , [const K: usize], f64    , Dual<f64, K>, binary      , BinaryOp::Sub, Dual<f64, K>
    ($op_trait:ident, $op_fn:ident, [$($g:tt)*], $scalar:ty, $name:ty, $method:ident, $op:expr, $out:ty) => {
        impl<$($g)*> $op_trait<$name> for $scalar {
            type Output = $out;

            fn $op_fn(self, rhs: $name) -> Self::Output {
                rhs.lift(self).$method(&rhs, $op)
            }
        }
    };
}

pub(crate) use impl_scalar_lhs_op;

macro_rules! impl_un_op {
    ($op_trait:ident, $op_fn:ident, $name:ty, [$($g:tt)*]) => {
        impl<$($g)*> $op_trait for $name {
            type Output = Self;

            fn $op_fn(self) -> Self::Output {
                self.map(UnaryOp::Neg)
            }
        }
    };
}

pub(crate) use impl_un_op;
