//! Bounded numeric helpers shared by the tokenizer and the crystallizer.

/// Input bound for [`sigmoid`]. Keeps `e^{-x}` finite and the output strictly
/// inside (0, 1) in f64.
pub const SIGMOID_INPUT_BOUND: f64 = 10.0;

/// Logistic function with the input clamped to `[-10, 10]`.
///
/// Non-finite input maps to the nearest bound (NaN maps to 0.5).
pub fn sigmoid(x: f64) -> f64 {
    let x = if x.is_nan() {
        0.0
    } else {
        x.clamp(-SIGMOID_INPUT_BOUND, SIGMOID_INPUT_BOUND)
    };
    1.0 / (1.0 + (-x).exp())
}

/// Logistic curve `1 / (1 + e^{-k(x - θ)})` with the exponent bounded to
/// `[-50, 50]`.
pub fn logistic(x: f64, k: f64, theta: f64) -> f64 {
    let exponent = -k * (x - theta);
    let exponent = if exponent.is_nan() {
        0.0
    } else {
        exponent.clamp(-50.0, 50.0)
    };
    1.0 / (1.0 + exponent.exp())
}

/// Clamp to the unit interval, mapping NaN to 0.
pub fn unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}
