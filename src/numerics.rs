//! Small numerical helpers shared by the gas-exchange and hemodynamics modules

/// Trapezoidal-rule integral of `y` over the (possibly non-uniform) abscissa `t`.
pub fn trapz(y: &[f64], t: &[f64]) -> f64 {
    y.windows(2)
        .zip(t.windows(2))
        .map(|(y_pair, t_pair)| 0.5 * (y_pair[0] + y_pair[1]) * (t_pair[1] - t_pair[0]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapz_of_constant_is_height_times_width() {
        let y = vec![2.0, 2.0, 2.0];
        let t = vec![0.0, 1.0, 2.0];
        assert!((trapz(&y, &t) - 4.0).abs() < 1e-9);
    }

    #[test]
    fn trapz_handles_non_uniform_spacing() {
        let y = vec![0.0, 1.0, 0.0];
        let t = vec![0.0, 1.0, 3.0];
        // first segment: 0.5*(0+1)*1 = 0.5, second: 0.5*(1+0)*2 = 1.0
        assert!((trapz(&y, &t) - 1.5).abs() < 1e-9);
    }
}
