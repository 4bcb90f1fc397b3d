use ndarray::Array1;

/// `num_values` evenly spaced points from `start` to `end`, both ends included.
///
/// A single point is `start`; zero points is an empty array.
pub fn linspace(start: f64, end: f64, num_values: usize) -> Array1<f64> {
    match num_values {
        0 => Array1::zeros(0),
        1 => Array1::from_elem(1, start),
        _ => {
            let step = (end - start) / (num_values as f64 - 1.0);
            let mut values = Array1::from_shape_fn(num_values, |i| start + i as f64 * step);
            // pin the last point so rounding never overshoots the interval
            values[num_values - 1] = end;
            values
        }
    }
}

/// Central difference of `f` at each of `x_values`.
pub fn numerical_derivative<F>(f: F, x_values: &[f64], h: f64) -> Vec<f64>
where
    F: Fn(f64) -> f64,
{
    x_values
        .iter()
        .map(|&x| (f(x + h) - f(x - h)) / (2.0 * h))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linspace_includes_both_ends() {
        let xs = linspace(-10.0, 10.0, 100);
        assert_eq!(xs.len(), 100);
        assert_eq!(xs[0], -10.0);
        assert_eq!(xs[99], 10.0);
        assert!(!xs.iter().any(|&x| x == 0.0));
    }

    #[test]
    fn test_linspace_degenerate_sizes() {
        assert_eq!(linspace(1.0, 2.0, 0).len(), 0);
        assert_eq!(linspace(1.0, 2.0, 1).to_vec(), vec![1.0]);
        assert_eq!(linspace(0.0, 1.0, 5).to_vec(), vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_numerical_derivative() {
        let derivatives = numerical_derivative(|x| x * x, &[0.0, 1.0, 2.0], 1e-4);
        assert_relative_eq!(derivatives[0], 0.0, epsilon = 1e-8);
        assert_relative_eq!(derivatives[1], 2.0, epsilon = 1e-6);
        assert_relative_eq!(derivatives[2], 4.0, epsilon = 1e-6);
    }
}
