use std::cell::{Ref, RefCell};

use log::{debug, trace};

use crate::{
    ad_ops::{BinaryOp, TernaryOp, UnaryOp},
    num::{Float, ZeroOne},
    Error, Var,
};

/// The kind of a node in the expression graph, with the indices of its operands.
/// Operands always have a lower index than the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TracedOp {
    Constant,
    Independent,
    /// A re-binding of the node at the given index, with its own accumulator.
    Dependent(usize),
    Unary(UnaryOp, usize),
    Binary(BinaryOp, usize, usize),
    Ternary(TernaryOp, usize, usize, usize),
}

impl TracedOp {
    /// Whether the node owns a gradient accumulator.
    pub(crate) fn is_bound(self) -> bool {
        matches!(self, TracedOp::Independent | TracedOp::Dependent(_))
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Node<T> {
    pub(crate) value: T,
    /// Gradient accumulator. Only meaningful for independent and dependent variables.
    pub(crate) grad: T,
    pub(crate) op: TracedOp,
}

/// The recorded expression graph.
///
/// Nodes are stored in an arena and refer to their operands by index. Since a node
/// can only be created from nodes that already exist, the graph is a DAG and the
/// index order is a topological order. Shared sub-expressions are simply indices
/// that show up as operands more than once.
///
/// A trace is single threaded: accumulators are updated in place during a backward
/// pass, so two passes over the same trace must not run at the same time.
#[derive(Debug)]
pub struct Trace<T> {
    trace: RefCell<Vec<Node<T>>>,
}

impl<T> Trace<T> {
    #[must_use]
    pub fn new() -> Self {
        Trace {
            trace: RefCell::new(vec![]),
        }
    }

    /// Number of nodes recorded so far.
    pub fn len(&self) -> usize {
        self.trace.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trace.borrow().is_empty()
    }

    pub(crate) fn borrow(&self) -> Ref<'_, Vec<Node<T>>> {
        self.trace.borrow()
    }

    pub(crate) fn op(&self, index: usize) -> TracedOp {
        self.trace.borrow()[index].op
    }
}

impl<T: Float> Trace<T> {
    pub(crate) fn push_op(&self, value: T, op: TracedOp) -> Var<'_, T> {
        let mut trace = self.trace.borrow_mut();
        let index = trace.len();
        trace!("push {index}: {op:?} = {value:?}");
        trace.push(Node {
            value,
            grad: T::ZERO,
            op,
        });
        Var::new(self, index)
    }

    /// A new independent variable: an input we can differentiate with respect to.
    pub fn var(&self, value: T) -> Var<'_, T> {
        self.push_op(value, TracedOp::Independent)
    }

    /// A constant. Constants never receive a gradient.
    pub fn constant(&self, value: T) -> Var<'_, T> {
        self.push_op(value, TracedOp::Constant)
    }

    /// A dependent variable: re-binds `of` so that the derivative with respect to
    /// this intermediate result can be requested, while it stays part of the
    /// larger expression.
    ///
    /// # Panics
    /// If `of` belongs to another trace.
    pub fn dependent<'t>(&'t self, of: &Var<'t, T>) -> Var<'t, T> {
        assert!(
            std::ptr::eq(self, of.trace()),
            "a dependent variable must be created on the trace of the expression it binds"
        );
        let value = self.value(of.index());
        self.push_op(value, TracedOp::Dependent(of.index()))
    }

    pub(crate) fn value(&self, index: usize) -> T {
        self.trace.borrow()[index].value
    }

    pub(crate) fn grad(&self, index: usize) -> Result<T, Error> {
        let trace = self.trace.borrow();
        let node = &trace[index];
        if node.op.is_bound() {
            Ok(node.grad)
        } else {
            Err(Error::UnboundAccumulator { node: index })
        }
    }

    pub(crate) fn set_value(&self, index: usize, value: T) -> Result<(), Error> {
        let mut trace = self.trace.borrow_mut();
        let node = &mut trace[index];
        if node.op != TracedOp::Independent {
            return Err(Error::NotIndependent { node: index });
        }
        node.value = value;
        Ok(())
    }

    /// Reset all gradient accumulators to zero.
    pub fn zero_grad(&self) {
        for node in self.trace.borrow_mut().iter_mut() {
            node.grad = T::ZERO;
        }
    }

    /// Re-evaluate every node bottom-up, after independent variables were given new
    /// values with `Var::set_value`. The graph is reused as is, nothing is rebuilt.
    ///
    /// Either all nodes are updated, or, if a new value is outside the domain of one
    /// of the operations, none are.
    ///
    /// # Errors
    /// The first domain error encountered, in index order.
    pub fn update(&self) -> Result<(), Error> {
        let mut trace = self.trace.borrow_mut();
        let mut values: Vec<T> = Vec::with_capacity(trace.len());
        for node in trace.iter() {
            let value = match node.op {
                TracedOp::Constant | TracedOp::Independent => node.value,
                TracedOp::Dependent(a) => values[a],
                TracedOp::Unary(op, a) => op.apply(values[a])?,
                TracedOp::Binary(op, a, b) => op.apply(values[a], values[b])?,
                TracedOp::Ternary(op, a, b, c) => op.eval(values[a], values[b], values[c]),
            };
            values.push(value);
        }
        for (node, value) in trace.iter_mut().zip(values) {
            node.value = value;
        }
        debug!("updated {} nodes", trace.len());
        Ok(())
    }

    /// Propagate adjoints from `root` down to the start of the trace, and add the
    /// adjoint that reaches each independent and dependent variable to its accumulator.
    ///
    /// Every node is visited once. Adjoints of nodes with more than one parent are
    /// summed before the node is visited, because all its parents have a higher index.
    /// Accumulators are not reset first, see `zero_grad`.
    ///
    /// Forward mode skips zero tangents, so a singular derivative rule downstream of a
    /// zero tangent contributes nothing. In reverse the same path multiplies the
    /// singular partial by zero and gives NaN. A NaN adjoint reaching a variable is
    /// therefore replaced by the tangent of a forward sweep from that variable.
    pub(crate) fn backward(&self, root: usize) {
        let mut trace = self.trace.borrow_mut();
        let mut adjoints = Adjoints::new(root + 1);
        adjoints.adjoints[root] = Some(T::ONE);

        for i in (0..=root).rev() {
            let Some(adjoint) = adjoints.adjoints[i] else {
                // no gradient to propagate - this node makes no contribution.
                continue;
            };
            let (op, r) = (trace[i].op, trace[i].value);
            trace!("backward {i}: {op:?} adjoint {adjoint:?}");
            match op {
                TracedOp::Constant => {}
                TracedOp::Independent => {
                    let g = settle(&trace, i, root, adjoint);
                    trace[i].grad = trace[i].grad + g;
                }
                TracedOp::Dependent(a) => {
                    let g = settle(&trace, i, root, adjoint);
                    trace[i].grad = trace[i].grad + g;
                    adjoints.update(a, adjoint);
                }
                TracedOp::Unary(op, a) => {
                    adjoints.update(a, op.dfda(trace[a].value, r, adjoint));
                }
                TracedOp::Binary(op, a, b) => {
                    let (va, vb) = (trace[a].value, trace[b].value);
                    adjoints.update(a, op.dfda(va, vb, r, adjoint));
                    adjoints.update(b, op.dfdb(va, vb, r, adjoint));
                }
                TracedOp::Ternary(op, a, b, c) => {
                    let (va, vb, vc) = (trace[a].value, trace[b].value, trace[c].value);
                    adjoints.update(a, op.dfda(va, vb, vc, adjoint));
                    adjoints.update(b, op.dfdb(va, vb, vc, adjoint));
                    adjoints.update(c, op.dfdc(va, vb, vc, adjoint));
                }
            }
        }
    }
}

fn settle<T: Float>(trace: &[Node<T>], seed: usize, root: usize, adjoint: T) -> T {
    if adjoint.is_nan() {
        debug!("adjoint of node {seed} is NaN, sweeping forward from it");
        tangent(trace, seed, root)
    } else {
        adjoint
    }
}

/// The derivative of `root` with respect to `seed` by a forward sweep over the
/// nodes in between, with the same zero skipping as `Dual`.
fn tangent<T: Float>(trace: &[Node<T>], seed: usize, root: usize) -> T {
    fn push<T: Float>(t: T, rule: impl FnOnce(T) -> T) -> T {
        if t == T::ZERO {
            T::ZERO
        } else {
            rule(t)
        }
    }

    let mut tangents = vec![T::ZERO; root + 1];
    tangents[seed] = T::ONE;
    for i in seed + 1..=root {
        let r = trace[i].value;
        tangents[i] = match trace[i].op {
            TracedOp::Constant | TracedOp::Independent => T::ZERO,
            TracedOp::Dependent(a) => tangents[a],
            TracedOp::Unary(op, a) => push(tangents[a], |t| op.dfda(trace[a].value, r, t)),
            TracedOp::Binary(op, a, b) => {
                let (va, vb) = (trace[a].value, trace[b].value);
                push(tangents[a], |t| op.dfda(va, vb, r, t))
                    + push(tangents[b], |t| op.dfdb(va, vb, r, t))
            }
            TracedOp::Ternary(op, a, b, c) => {
                let (va, vb, vc) = (trace[a].value, trace[b].value, trace[c].value);
                push(tangents[a], |t| op.dfda(va, vb, vc, t))
                    + push(tangents[b], |t| op.dfdb(va, vb, vc, t))
                    + push(tangents[c], |t| op.dfdc(va, vb, vc, t))
            }
        };
    }
    tangents[root]
}

impl<T> Default for Trace<T> {
    fn default() -> Self {
        Trace::new()
    }
}

#[derive(Debug)]
pub(crate) struct Adjoints<T> {
    pub(crate) adjoints: Vec<Option<T>>,
}

impl<T: Copy + ZeroOne + std::ops::Add<Output = T>> Adjoints<T> {
    pub(crate) fn new(len: usize) -> Self {
        Adjoints {
            adjoints: vec![None; len],
        }
    }

    fn update(&mut self, idx: usize, dfda: T) {
        self.adjoints[idx] = Some(self.adjoints[idx].map_or(dfda, |c| c + dfda));
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn test_operands_precede_nodes() {
        let trace = Trace::new();
        let x = trace.var(2.0f64);
        let y = x * x + x.sin();
        assert_eq!(trace.len(), 4);
        assert_eq!(trace.op(0), TracedOp::Independent);
        assert_eq!(trace.op(1), TracedOp::Binary(BinaryOp::Mul, 0, 0));
        assert_eq!(trace.op(2), TracedOp::Unary(UnaryOp::Sin, 0));
        assert_eq!(trace.op(y.index()), TracedOp::Binary(BinaryOp::Add, 1, 2));
    }

    #[test]
    fn test_failed_construction_pushes_nothing() {
        let trace = Trace::new();
        let x = trace.var(0.0f64);
        assert!(x.recip().is_err());
        assert_eq!(trace.len(), 1);
    }

    #[test]
    fn test_update_is_all_or_nothing() {
        let trace = Trace::new();
        let x = trace.var(2.0f64);
        let y = trace.var(1.0f64);
        let s = (x * x).sqrt().unwrap();
        let q = (y / x).unwrap();
        x.set_value(0.0).unwrap();
        assert_eq!(trace.update(), Err(Error::DivisionByZero { op: "div" }));
        assert_eq!(s.value(), 2.0);
        assert_eq!(q.value(), 0.5);
    }

    #[test]
    fn test_unbounded_partial_behind_zero_tangent() {
        // d/dx sqrt(x * 0) is infinite times zero on the way back; forward it is zero.
        let trace = Trace::new();
        let x = trace.var(3.0f64);
        let y = trace.var(5.0f64);
        let z = (x * 0.0).sqrt().unwrap() + x * y;
        trace.backward(z.index());
        assert_eq!(trace.grad(x.index()), Ok(5.0));
        assert_eq!(trace.grad(y.index()), Ok(3.0));
    }

    #[test]
    fn test_grad_of_unbound_node() {
        let trace = Trace::new();
        let x = trace.var(1.0f64);
        let c = trace.constant(2.0);
        let y = x * c;
        assert_eq!(trace.grad(c.index()), Err(Error::UnboundAccumulator { node: 1 }));
        assert_eq!(trace.grad(y.index()), Err(Error::UnboundAccumulator { node: 2 }));
        assert_eq!(trace.grad(x.index()), Ok(0.0));
        assert_eq!(
            trace.set_value(y.index(), 1.0),
            Err(Error::NotIndependent { node: 2 })
        );
    }
}
