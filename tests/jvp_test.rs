use scalarken::{diff1, gradient, taylor_derivatives, value_and_diff1, Dual, Error, Jet};

fn assert_close(a: f64, b: f64) {
    assert!(
        (a.is_nan() && b.is_nan()) || (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0),
        "\r\nleft : {a:?}\r\nright: {b:?}"
    );
}

fn assert_vec_close(a: &[f64], b: &[f64]) {
    assert_eq!(a.len(), b.len());
    for (a, b) in a.iter().zip(b) {
        assert_close(*a, *b);
    }
}

/// Test that the first derivative of a function is correct at a few points,
/// given the function to derive using jvp and the expected derivative function (symbolically derived).
fn test_df<F, G, H>(f: F, df: G, ft: H, at: &[f64])
where
    F: Fn(Dual<f64>) -> Result<Dual<f64>, Error>,
    G: Fn(f64) -> f64,
    H: Fn(f64) -> f64,
{
    for &x in at {
        let (f_actual, df_actual) = value_and_diff1(&f, x).unwrap();
        assert_close(f_actual, ft(x));
        assert_close(df_actual, df(x));
    }
}

#[test]
fn test_derivative_constant() {
    test_df(|_| Ok(Dual::constant(1.0)), |_| 0.0, |_| 1.0, &[-2.0, 0.0, 3.0]);
}

#[test]
fn test_derivative_identity() {
    test_df(Ok, |_| 1.0, |x| x, &[-2.0, 0.0, 3.0]);
}

#[test]
fn test_derivative_arithmetic() {
    test_df(|x| Ok(x + x), |_| 2.0, |x| x + x, &[-2.0, 3.0]);
    test_df(|x| Ok(x - 3.0 * x), |_| -2.0, |x| -2.0 * x, &[-2.0, 3.0]);
    test_df(|x| Ok(x * x + 2.0 * x), |x| 2.0 * x + 2.0, |x| x * x + 2.0 * x, &[-2.0, 3.0]);
    test_df(|x| 1.0 / x, |x| -1.0 / (x * x), |x| 1.0 / x, &[-2.0, 0.5, 3.0]);
    test_df(|x| x / (x + 1.0), |x| 1.0 / ((x + 1.0) * (x + 1.0)), |x| x / (x + 1.0), &[0.5, 3.0]);
    test_df(|x| Ok(-x), |_| -1.0, |x| -x, &[-2.0, 3.0]);
}

#[test]
fn test_derivative_powers() {
    test_df(|x| x.powi(3), |x| 3.0 * x * x, |x| x.powi(3), &[-2.0, 0.0, 3.0]);
    test_df(|x| x.powi(-2), |x| -2.0 / x.powi(3), |x| x.powi(-2), &[-2.0, 3.0]);
    test_df(|x| x.powi(0), |_| 0.0, |_| 1.0, &[-2.0, 0.0, 3.0]);
    test_df(|x| x.sqrt(), |x| 0.5 / x.sqrt(), f64::sqrt, &[0.25, 4.0]);
    test_df(|x| Ok(x.cbrt()), |x| 1.0 / (3.0 * x.cbrt().powi(2)), f64::cbrt, &[0.5, 8.0]);
    test_df(|x| Ok(x.powf(2.5)), |x| 2.5 * x.powf(1.5), |x| x.powf(2.5), &[0.5, 2.0]);
    test_df(|x| Ok(x.pow(&x)), |x| x.powf(x) * (x.ln() + 1.0), |x| x.powf(x), &[0.5, 2.0]);
}

#[test]
fn test_derivative_odd_root_of_negative() {
    // d/dx x^(1/3) at -8 = 1 / (3 * (-2)^2)
    let (r, df) = value_and_diff1(|x| x.root(3), -8.0f64).unwrap();
    assert_close(r, -2.0);
    assert_close(df, 1.0 / 12.0);
}

#[test]
fn test_derivative_trigonometric() {
    let at = &[-0.7, 0.0, 0.4];
    test_df(|x| Ok(x.sin()), f64::cos, f64::sin, at);
    test_df(|x| Ok(x.cos()), |x| -x.sin(), f64::cos, at);
    test_df(|x| Ok(x.tan()), |x| 1.0 / (x.cos() * x.cos()), f64::tan, at);
    test_df(|x| Ok(x.asin()), |x| 1.0 / (1.0 - x * x).sqrt(), f64::asin, at);
    test_df(|x| Ok(x.acos()), |x| -1.0 / (1.0 - x * x).sqrt(), f64::acos, at);
    test_df(|x| Ok(x.atan()), |x| 1.0 / (1.0 + x * x), f64::atan, at);
}

#[test]
fn test_derivative_hyperbolic() {
    let at = &[-0.7, 0.0, 0.4];
    test_df(|x| Ok(x.sinh()), f64::cosh, f64::sinh, at);
    test_df(|x| Ok(x.cosh()), f64::sinh, f64::cosh, at);
    test_df(|x| Ok(x.tanh()), |x| 1.0 - x.tanh().powi(2), f64::tanh, at);
    test_df(|x| Ok(x.asinh()), |x| 1.0 / (x * x + 1.0).sqrt(), f64::asinh, at);
    test_df(|x| Ok(x.atanh()), |x| 1.0 / (1.0 - x * x), f64::atanh, at);
    test_df(|x| Ok(x.acosh()), |x| 1.0 / (x * x - 1.0).sqrt(), f64::acosh, &[1.5, 3.0]);
}

#[test]
fn test_derivative_exp_log() {
    test_df(|x| Ok(x.exp()), f64::exp, f64::exp, &[-1.0, 0.0, 2.0]);
    test_df(|x| Ok(x.ln()), |x| 1.0 / x, f64::ln, &[0.5, 2.0]);
    test_df(
        |x| Ok(x.exp10()),
        |x| 10f64.powf(x) * std::f64::consts::LN_10,
        |x| 10f64.powf(x),
        &[-1.0, 0.5],
    );
    test_df(
        |x| Ok(x.log10()),
        |x| 1.0 / (x * std::f64::consts::LN_10),
        f64::log10,
        &[0.5, 2.0],
    );
}

#[test]
fn test_derivative_chain_rule() {
    let at = &[-1.3, 0.2, 2.0];
    test_df(
        |x| Ok((x * x).sin()),
        |x| 2.0 * x * (x * x).cos(),
        |x| (x * x).sin(),
        at,
    );
    test_df(|x| Ok(x.exp().ln()), |_| 1.0, |x| x, at);
    test_df(
        |x| (x * x + 1.0).sqrt(),
        |x| x / (x * x + 1.0).sqrt(),
        |x| (x * x + 1.0).sqrt(),
        at,
    );
    test_df(
        |x| Ok(x.mul_add(&x, &x.sin())),
        |x| 2.0 * x + x.cos(),
        |x| x * x + x.sin(),
        at,
    );
}

#[test]
fn test_derivative_f32() {
    let (r, df) = value_and_diff1(|x: Dual<f32>| Ok(x * x.exp()), 1.0f32).unwrap();
    assert!((r - std::f32::consts::E).abs() < 1e-6);
    assert!((df - 2.0 * std::f32::consts::E).abs() < 1e-5);
}

#[test]
fn test_domain_errors() {
    assert_eq!(
        diff1(|x: Dual<f64>| 1.0 / x, 0.0),
        Err(Error::DivisionByZero { op: "div" })
    );
    assert_eq!(
        diff1(|x: Dual<f64>| x.recip(), 0.0),
        Err(Error::DivisionByZero { op: "recip" })
    );
    assert_eq!(
        diff1(|x: Dual<f64>| x.sqrt(), -4.0),
        Err(Error::InvalidRoot {
            op: "sqrt",
            degree: 2,
            operand: -4.0
        })
    );
    assert!(matches!(
        diff1(|x: Dual<f64>| x.root(4), -1.0),
        Err(Error::InvalidRoot { degree: 4, .. })
    ));
}

#[test]
fn test_extreme_exponents() {
    let (r, df) = value_and_diff1(|x: Dual<f64>| x.powi(i32::MIN), 1.0).unwrap();
    assert_eq!((r, df), (1.0, f64::from(i32::MIN)));

    // d/dx x^(1/n) = x^(1/n) / (n x)
    let n = 3_000_000_000u32;
    let (r, df) = value_and_diff1(|x: Dual<f64>| x.root(n), 2.0).unwrap();
    assert!((df - r / (f64::from(n) * 2.0)).abs() < 1e-5 * df);
}

#[test]
fn test_powers_at_zero() {
    assert_eq!(
        taylor_derivatives(|x: Jet<f64, 3>| Ok(x.powf(2.0)), 0.0).unwrap(),
        [0.0, 0.0, 2.0]
    );
    assert_eq!(
        taylor_derivatives(|x: Jet<f64, 3>| Ok(x.pow(&Jet::constant(2.0))), 0.0).unwrap(),
        [0.0, 0.0, 2.0]
    );
    assert_eq!(diff1(|x: Dual<f64>| Ok(x.powf(2.0)), 0.0), Ok(0.0));

    let (f, df) = gradient(|[x, y]| Ok(x.pow(&y)), [0.0, 2.0]).unwrap();
    assert_eq!((f, df), (0.0, [0.0, 0.0]));
}

#[test]
fn test_constant_tangents_stay_finite() {
    // sqrt is not differentiable at 0, but a constant has nothing to differentiate.
    let c = Dual::<f64>::constant(0.0).sqrt().unwrap();
    assert_eq!(c.primal(), 0.0);
    assert_eq!(c.tangent(), 0.0);

    let x = Dual::variable(2.0);
    let y = x * Dual::<f64>::constant(0.0).sqrt().unwrap();
    assert_eq!(y.tangent(), 0.0);
}

#[test]
fn test_gradient_in_one_pass() {
    // f(x, y) = x * y + sin(x)
    let (r, grad) = gradient(|[x, y]| Ok(x * y + x.sin()), [1.0f64, 2.0]).unwrap();
    assert_close(r, 2.0 + 1f64.sin());
    assert_vec_close(&grad, &[2.0 + 1f64.cos(), 1.0]);

    // f(x, y, z) = x / y + z^2
    let (r, grad) = gradient(|[x, y, z]| Ok((x / y)? + z * z), [3.0f64, 2.0, -1.0]).unwrap();
    assert_close(r, 2.5);
    assert_vec_close(&grad, &[0.5, -0.75, -2.0]);
}

#[test]
fn test_directional_derivative() {
    // the tangent of a seeded direction v is the dot product of the gradient with v.
    let x = Dual::<f64, 2>::with_tangents(1.0, [1.0, 0.5]);
    let y = Dual::<f64, 2>::with_tangents(2.0, [0.0, -1.0]);
    let r = x * y + x.sin();
    let (dx, dy) = (2.0 + 1f64.cos(), 1.0);
    assert_close(r.tangents()[0], dx);
    assert_close(r.tangents()[1], 0.5 * dx - dy);

    let seeded = Dual::<f64, 3>::seeded(4.0, 1);
    assert_eq!(seeded.tangents(), &[0.0, 1.0, 0.0]);
}

#[test]
fn test_first_jet_coefficient_matches_dual() {
    let f_dual = |x: Dual<f64>| Ok((x.sin() * x.exp() + 1.0).ln());
    let f_jet = |x: Jet<f64, 4>| Ok((x.sin() * x.exp() + 1.0).ln());
    for at in [0.1, 0.5, 1.2] {
        let dual = diff1(f_dual, at).unwrap();
        let jet = taylor_derivatives(f_jet, at).unwrap();
        assert_close(jet[1], dual);
    }
}

#[test]
fn test_higher_derivatives_with_jets() {
    // exp: all derivatives are exp.
    let d: [f64; 5] = taylor_derivatives(|x: Jet<f64, 5>| Ok(x.exp()), 0.7).unwrap();
    assert_vec_close(&d, &[0.7f64.exp(); 5]);

    // 1/x: (-1)^k k! / x^(k+1)
    let d: [f64; 4] = taylor_derivatives(|x: Jet<f64, 4>| x.recip(), 2.0).unwrap();
    assert_vec_close(&d, &[0.5, -0.25, 0.25, -0.375]);

    // atan at 0: 0, 1, 0, -2
    let d: [f64; 4] = taylor_derivatives(|x: Jet<f64, 4>| Ok(x.atan()), 0.0).unwrap();
    assert_vec_close(&d, &[0.0, 1.0, 0.0, -2.0]);

    assert_eq!(
        taylor_derivatives(|x: Jet<f64, 3>| x.sqrt(), -1.0),
        Err(Error::InvalidRoot {
            op: "sqrt",
            degree: 2,
            operand: -1.0
        })
    );
}
