use std::{
    fmt::Debug,
    ops::{Add, Div, Mul, Neg, Sub},
    ptr,
};

use log::debug;

use crate::{
    ad_ops::{BinaryOp, TernaryOp, UnaryOp},
    ad_ops_reverse,
    ad_trace::{Trace, TracedOp},
    num::Float,
    Error,
};

/// Reverse AD implementation.
///
/// A `Var` is a handle to a node of a `Trace`. Arithmetic on handles evaluates the
/// result straight away and records the operation as a new node, so the trace always
/// holds a fully evaluated forward pass.
#[derive(Clone, Copy)]
pub struct Var<'t, T> {
    trace: &'t Trace<T>,
    index: usize,
}

impl<'t, T> Var<'t, T> {
    pub(crate) fn new(trace: &'t Trace<T>, index: usize) -> Self {
        Var { trace, index }
    }

    pub(crate) fn index(&self) -> usize {
        self.index
    }

    /// The trace this variable was recorded on.
    pub fn trace(&self) -> &'t Trace<T> {
        self.trace
    }

    fn assert_same_trace(&self, other: &Self) {
        assert!(
            ptr::eq(self.trace, other.trace),
            "traces must be the same - variables from different traces can't be combined"
        );
    }
}

impl<T: Float> Debug for Var<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Var({}, {:?})", self.index, self.value())
    }
}

impl<'t, T: Float> Var<'t, T> {
    /// The primal value.
    pub fn value(&self) -> T {
        self.trace.value(self.index)
    }

    /// The value accumulated in this variable's gradient accumulator.
    ///
    /// # Errors
    /// `UnboundAccumulator` if this is not an independent or dependent variable.
    pub fn grad(&self) -> Result<T, Error> {
        self.trace.grad(self.index)
    }

    /// Give an independent variable a new value. Call `Trace::update` afterwards
    /// to re-evaluate the expressions that depend on it.
    ///
    /// # Errors
    /// `NotIndependent` if this is not an independent variable.
    pub fn set_value(&self, value: T) -> Result<(), Error> {
        self.trace.set_value(self.index, value)
    }

    /// Expose this intermediate result as a dependent variable, so the derivative
    /// with respect to it can be requested.
    #[must_use]
    pub fn bind(&self) -> Self {
        self.trace.dependent(self)
    }

    /// Run a backward pass from this variable and add the results to the
    /// accumulators of all variables it depends on. Accumulators are not reset,
    /// so calling this twice adds up; use `derivatives` to get fresh results.
    pub fn backward(&self) {
        self.trace.backward(self.index);
    }

    pub(crate) fn lift(&self, x: T) -> Self {
        self.trace.constant(x)
    }

    pub(crate) fn map(&self, op: UnaryOp) -> Self {
        let value = op.eval(self.value());
        self.trace
            .push_op(value, TracedOp::Unary(op, self.index))
    }

    fn try_map(&self, op: UnaryOp) -> Result<Self, Error> {
        let value = op.apply(self.value())?;
        Ok(self
            .trace
            .push_op(value, TracedOp::Unary(op, self.index)))
    }

    pub(crate) fn binary(&self, rhs: &Self, op: BinaryOp) -> Self {
        self.assert_same_trace(rhs);
        let value = op.eval(self.value(), rhs.value());
        self.trace
            .push_op(value, TracedOp::Binary(op, self.index, rhs.index))
    }

    pub(crate) fn try_binary(&self, rhs: &Self, op: BinaryOp) -> Result<Self, Error> {
        self.assert_same_trace(rhs);
        let value = op.apply(self.value(), rhs.value())?;
        Ok(self
            .trace
            .push_op(value, TracedOp::Binary(op, self.index, rhs.index)))
    }

    fn ternary(&self, b: &Self, c: &Self, op: TernaryOp) -> Self {
        self.assert_same_trace(b);
        self.assert_same_trace(c);
        let value = op.eval(self.value(), b.value(), c.value());
        self.trace
            .push_op(value, TracedOp::Ternary(op, self.index, b.index, c.index))
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

    /// The real `n`-th root. Odd roots of negative numbers are negative.
    ///
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

crate::math_macros::impl_bin_op!(Add, add, Var<'t, T>, ['t, T: Float], binary, BinaryOp::Add, Self);
crate::math_macros::impl_bin_op!(Sub, sub, Var<'t, T>, ['t, T: Float], binary, BinaryOp::Sub, Self);
crate::math_macros::impl_bin_op!(Mul, mul, Var<'t, T>, ['t, T: Float], binary, BinaryOp::Mul, Self);
crate::math_macros::impl_bin_op!(Div, div, Var<'t, T>, ['t, T: Float], try_binary, BinaryOp::Div, Result<Self, Error>);

crate::math_macros::impl_un_op!(Neg, neg, Var<'t, T>, ['t, T: Float]);

macro_rules! impl_var_scalar_lhs {
    ($($t:ty),+) => {
        $(
        crate::math_macros::impl_scalar_lhs_op!(Add, add, ['t], $t, Var<'t, $t>, binary, BinaryOp::Add, Var<'t, $t>);
        crate::math_macros::impl_scalar_lhs_op!(Sub, sub, ['t], $t, Var<'t, $t>, binary, BinaryOp::Sub, Var<'t, $t>);
        crate::math_macros::impl_scalar_lhs_op!(Mul, mul, ['t], $t, Var<'t, $t>, binary, BinaryOp::Mul, Var<'t, $t>);
        crate::math_macros::impl_scalar_lhs_op!(Div, div, ['t], $t, Var<'t, $t>, try_binary, BinaryOp::Div, Result<Var<'t, $t>, Error>);
        )+
    };
}

impl_var_scalar_lhs!(f32, f64);

fn check_targets<T: Float>(root: &Var<'_, T>, with_respect_to: &[&Var<'_, T>]) -> Result<(), Error> {
    for var in with_respect_to {
        assert!(
            ptr::eq(root.trace, var.trace),
            "traces must be the same - can't differentiate with respect to a variable of another trace"
        );
        if !root.trace.op(var.index).is_bound() {
            return Err(Error::UnboundAccumulator { node: var.index });
        }
    }
    Ok(())
}

/// The partial derivatives of `root` with respect to each of the given independent
/// or dependent variables, in the order given.
///
/// Zeroes all accumulators of the trace, then does a single backward pass that is
/// shared by all requested variables.
///
/// # Errors
/// `UnboundAccumulator` if one of the variables is not an independent or dependent
/// variable.
///
/// # Panics
/// If a variable belongs to a different trace than `root`.
pub fn derivatives<T: Float>(
    root: &Var<'_, T>,
    with_respect_to: &[&Var<'_, T>],
) -> Result<Vec<T>, Error> {
    check_targets(root, with_respect_to)?;
    debug!(
        "derivatives of node {} with respect to {} variables",
        root.index,
        with_respect_to.len()
    );
    root.trace.zero_grad();
    root.backward();
    with_respect_to.iter().map(|var| var.grad()).collect()
}

fn update<'t, T: Float>(adjoints: &mut [Option<Var<'t, T>>], idx: usize, dfda: Var<'t, T>) {
    adjoints[idx] = Some(adjoints[idx].map_or(dfda, |c| c + dfda));
}

fn sum<'t, T: Float>(a: Option<Var<'t, T>>, b: Option<Var<'t, T>>) -> Option<Var<'t, T>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a + b),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Like `derivatives`, but the derivatives are themselves recorded on the trace as
/// expressions, so they can be differentiated again for higher order derivatives.
///
/// Where the backward sweep runs into 0 * inf, i.e. it fails or yields NaN, the
/// derivative is built by a forward sweep from the variable instead, which skips
/// zero tangents like `Dual` does.
///
/// # Errors
/// `UnboundAccumulator` as for `derivatives`. Since building the derivative expressions
/// evaluates them, also any domain error of the derivative rules, e.g. `DivisionByZero`
/// for the derivative of `sqrt` at zero.
///
/// # Panics
/// If a variable belongs to a different trace than `root`.
pub fn grad_expr<'t, T: Float>(
    root: &Var<'t, T>,
    with_respect_to: &[&Var<'t, T>],
) -> Result<Vec<Var<'t, T>>, Error> {
    check_targets(root, with_respect_to)?;
    let trace = root.trace;
    debug!(
        "derivative expressions of node {} with respect to {} variables",
        root.index,
        with_respect_to.len()
    );

    let adjoints = match adjoint_exprs(root) {
        Ok(adjoints) => adjoints,
        Err(e) => {
            debug!("backward sweep failed with {e}, sweeping forward instead");
            return with_respect_to
                .iter()
                .map(|var| tangent_expr(trace, var.index, root.index).map_err(|_| e.clone()))
                .collect();
        }
    };

    with_respect_to
        .iter()
        .map(|var| match adjoints.get(var.index).copied().flatten() {
            Some(adjoint) if adjoint.value().is_nan() => {
                debug!("adjoint of node {} is NaN, sweeping forward from it", var.index);
                Ok(tangent_expr(trace, var.index, root.index).unwrap_or(adjoint))
            }
            Some(adjoint) => Ok(adjoint),
            None => Ok(trace.constant(T::ZERO)),
        })
        .collect()
}

// New nodes are pushed while we go, but they all land after `root`.
fn adjoint_exprs<'t, T: Float>(root: &Var<'t, T>) -> Result<Vec<Option<Var<'t, T>>>, Error> {
    let trace = root.trace;
    let mut adjoints: Vec<Option<Var<'t, T>>> = vec![None; root.index + 1];
    adjoints[root.index] = Some(trace.constant(T::ONE));

    for i in (0..=root.index).rev() {
        let Some(adjoint) = adjoints[i] else {
            continue;
        };
        let r = Var::new(trace, i);
        match trace.op(i) {
            TracedOp::Constant | TracedOp::Independent => {}
            TracedOp::Dependent(a) => update(&mut adjoints, a, adjoint),
            TracedOp::Unary(op, a) => {
                let da = ad_ops_reverse::unary_dfda(op, Var::new(trace, a), r, adjoint)?;
                update(&mut adjoints, a, da);
            }
            TracedOp::Binary(op, a, b) => {
                let (va, vb) = (Var::new(trace, a), Var::new(trace, b));
                let da = ad_ops_reverse::binary_dfda(op, va, vb, adjoint)?;
                let db = ad_ops_reverse::binary_dfdb(op, va, vb, r, adjoint)?;
                update(&mut adjoints, a, da);
                update(&mut adjoints, b, db);
            }
            TracedOp::Ternary(op, a, b, c) => {
                let (va, vb) = (Var::new(trace, a), Var::new(trace, b));
                update(&mut adjoints, a, ad_ops_reverse::ternary_dfda(op, vb, adjoint));
                update(&mut adjoints, b, ad_ops_reverse::ternary_dfdb(op, va, adjoint));
                update(&mut adjoints, c, ad_ops_reverse::ternary_dfdc(op, adjoint));
            }
        }
    }
    Ok(adjoints)
}

/// The derivative of node `root` with respect to node `seed`, as an expression built
/// by a forward sweep. A tangent that is absent or evaluates to zero is skipped.
fn tangent_expr<'t, T: Float>(
    trace: &'t Trace<T>,
    seed: usize,
    root: usize,
) -> Result<Var<'t, T>, Error> {
    fn live<'t, T: Float>(tangents: &[Option<Var<'t, T>>], idx: usize) -> Option<Var<'t, T>> {
        tangents[idx].filter(|t| t.value() != T::ZERO)
    }

    if seed > root {
        return Ok(trace.constant(T::ZERO));
    }
    let mut tangents: Vec<Option<Var<'t, T>>> = vec![None; root + 1];
    tangents[seed] = Some(trace.constant(T::ONE));
    for i in seed + 1..=root {
        let r = Var::new(trace, i);
        tangents[i] = match trace.op(i) {
            TracedOp::Constant | TracedOp::Independent => None,
            TracedOp::Dependent(a) => tangents[a],
            TracedOp::Unary(op, a) => live(&tangents, a)
                .map(|t| ad_ops_reverse::unary_dfda(op, Var::new(trace, a), r, t))
                .transpose()?,
            TracedOp::Binary(op, a, b) => {
                let (va, vb) = (Var::new(trace, a), Var::new(trace, b));
                let da = live(&tangents, a)
                    .map(|t| ad_ops_reverse::binary_dfda(op, va, vb, t))
                    .transpose()?;
                let db = live(&tangents, b)
                    .map(|t| ad_ops_reverse::binary_dfdb(op, va, vb, r, t))
                    .transpose()?;
                sum(da, db)
            }
            TracedOp::Ternary(op, a, b, c) => {
                let (va, vb) = (Var::new(trace, a), Var::new(trace, b));
                let da = live(&tangents, a).map(|t| ad_ops_reverse::ternary_dfda(op, vb, t));
                let db = live(&tangents, b).map(|t| ad_ops_reverse::ternary_dfdb(op, va, t));
                let dc = live(&tangents, c).map(|t| ad_ops_reverse::ternary_dfdc(op, t));
                sum(sum(da, db), dc)
            }
        };
    }
    Ok(tangents[root].unwrap_or_else(|| trace.constant(T::ZERO)))
}

/// Compute the result and the derivative of a function at the given primal.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn value_and_grad1<T: Float, F>(f: F, at: T) -> Result<(T, T), Error>
where
    for<'t> F: Fn(Var<'t, T>) -> Result<Var<'t, T>, Error>,
{
    let trace = Trace::new();
    let x = trace.var(at);
    let result = f(x)?;
    let df = derivatives(&result, &[&x])?;
    Ok((result.value(), df[0]))
}

/// Compute the derivative of a function at the given primal.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn grad1<T: Float, F>(f: F, at: T) -> Result<T, Error>
where
    for<'t> F: Fn(Var<'t, T>) -> Result<Var<'t, T>, Error>,
{
    value_and_grad1(f, at).map(|(_, df)| df)
}

/// Compute the result and the gradient of a function at the given primals,
/// with one backward pass.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn value_and_gradn<T: Float, F>(f: F, at: &[T]) -> Result<(T, Vec<T>), Error>
where
    for<'t> F: Fn(&[Var<'t, T>]) -> Result<Var<'t, T>, Error>,
{
    let trace = Trace::new();
    let vars: Vec<_> = at.iter().map(|&x| trace.var(x)).collect();
    let result = f(&vars)?;
    let var_refs: Vec<_> = vars.iter().collect();
    let grads = derivatives(&result, &var_refs)?;
    Ok((result.value(), grads))
}

/// Compute the gradient of a function at the given primals.
///
/// # Errors
/// Any domain error raised while evaluating `f`.
pub fn gradn<T: Float, F>(f: F, at: &[T]) -> Result<Vec<T>, Error>
where
    for<'t> F: Fn(&[Var<'t, T>]) -> Result<Var<'t, T>, Error>,
{
    value_and_gradn(f, at).map(|(_, grads)| grads)
}
