//! One-dimensional linear interpolation.

/// Linearly interpolate `y(x)` at `xi`.
///
/// `x` must be monotonic, increasing or decreasing. Points outside the
/// tabulated range take the nearest end value.
pub fn interp_linear(x: &[f64], y: &[f64], xi: f64) -> f64 {
    debug_assert_eq!(x.len(), y.len());
    match x.len() {
        0 => return f64::NAN,
        1 => return y[0],
        _ => {}
    }

    let increasing = x[x.len() - 1] >= x[0];
    let (lo, hi) = if increasing {
        (0, x.len() - 1)
    } else {
        (x.len() - 1, 0)
    };

    if xi <= x[lo] {
        return y[lo];
    }
    if xi >= x[hi] {
        return y[hi];
    }

    for i in 0..x.len() - 1 {
        let (x0, x1) = (x[i], x[i + 1]);
        let inside = if increasing {
            xi >= x0 && xi <= x1
        } else {
            xi <= x0 && xi >= x1
        };
        if inside {
            if x1 == x0 {
                return y[i];
            }
            let t = (xi - x0) / (x1 - x0);
            return y[i] + t * (y[i + 1] - y[i]);
        }
    }

    y[hi]
}
