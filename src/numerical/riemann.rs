//! # Riemann sums
//!
//! Plain data types of the engine (interval, partition, result, rectangle geometry) and the
//! fixed-partition Riemann sum itself. The sum evaluates the function once, vectorized, over
//! all sample points.
//!
//! ```
//! use riemann_explorer::numerical::riemann::{riemann_sum, Interval, Orientation, Partition};
//! use riemann_explorer::symbolic::expression_compiler::ExpressionCompiler;
//! let f = ExpressionCompiler::new().compile("x").unwrap();
//! let interval = Interval::new(0.0, 10.0);
//! let left = riemann_sum(&f, &interval, &Partition::new(10, Orientation::Left)).unwrap();
//! let right = riemann_sum(&f, &interval, &Partition::new(10, Orientation::Right)).unwrap();
//! assert_eq!((left.approximation, right.approximation), (45.0, 55.0));
//! ```

use crate::symbolic::expression_compiler::Expression;
use crate::symbolic::utils::linspace;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter, EnumString};

/// Integration bounds. Order is not enforced here, only checked before computing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub lower: f64,
    pub upper: f64,
}

impl Interval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Interval { lower, upper }
    }

    /// `lower < upper`; false for NaN bounds.
    pub fn is_ordered(&self) -> bool {
        self.lower < self.upper
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }
}

impl Default for Interval {
    fn default() -> Self {
        Interval::new(0.0, 1.0)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {}]", self.lower, self.upper)
    }
}

/// Which end of each sub-interval the function is sampled at.
/// Parses case-insensitively; "gauche" and "droite" are accepted as well.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    #[strum(to_string = "left", serialize = "gauche")]
    #[serde(alias = "gauche", alias = "Left", alias = "Gauche")]
    Left,
    #[strum(to_string = "right", serialize = "droite")]
    #[serde(alias = "droite", alias = "Right", alias = "Droite")]
    Right,
}

/// `count` equal sub-intervals sampled at their `orientation` end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    count: usize,
    orientation: Orientation,
}

impl Partition {
    /// A count of zero is clamped to one.
    pub fn new(count: usize, orientation: Orientation) -> Self {
        Partition {
            count: count.max(1),
            orientation,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn dx(&self, interval: &Interval) -> f64 {
        interval.width() / self.count as f64
    }

    /// Left: lower + i*dx, Right: lower + (i+1)*dx, for i in 0..count.
    pub fn sample_points(&self, interval: &Interval) -> Array1<f64> {
        let dx = self.dx(interval);
        let offset = match self.orientation {
            Orientation::Left => 0,
            Orientation::Right => 1,
        };
        (0..self.count)
            .map(|i| interval.lower + (i + offset) as f64 * dx)
            .collect()
    }
}

impl Default for Partition {
    fn default() -> Self {
        Partition::new(10, Orientation::Left)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} x {}", self.count, self.orientation)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiemannResult {
    pub approximation: f64,
    pub dx: f64,
    pub partition: Partition,
}

/// A term of the sum, or the running total, stopped being finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonFiniteTerm {
    /// sample point where it happened
    pub sample: f64,
}

impl fmt::Display for NonFiniteTerm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Riemann sum is not finite at sample x = {}", self.sample)
    }
}

impl std::error::Error for NonFiniteTerm {}

/// Σ f(sample_i) * dx over the partition.
pub fn riemann_sum(
    function: &Expression,
    interval: &Interval,
    partition: &Partition,
) -> Result<RiemannResult, NonFiniteTerm> {
    let dx = partition.dx(interval);
    let samples = partition.sample_points(interval);
    let values = function.evaluate_array(&samples);
    let mut total = 0.0;
    for (&sample, &value) in samples.iter().zip(values.iter()) {
        total += value * dx;
        if !total.is_finite() {
            return Err(NonFiniteTerm { sample });
        }
    }
    Ok(RiemannResult {
        approximation: total,
        dx,
        partition: *partition,
    })
}

/// One bar of the Riemann picture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rectangle {
    pub left: f64,
    pub width: f64,
    /// function value at the sample point, negative below the axis
    pub height: f64,
}

impl Rectangle {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    /// Signed area.
    pub fn area(&self) -> f64 {
        self.width * self.height
    }
}

/// Bars for every sub-interval, left to right.
pub fn rectangles(function: &Expression, interval: &Interval, partition: &Partition) -> Vec<Rectangle> {
    let dx = partition.dx(interval);
    let heights = function.evaluate_array(&partition.sample_points(interval));
    heights
        .iter()
        .enumerate()
        .map(|(i, &height)| Rectangle {
            left: interval.lower + i as f64 * dx,
            width: dx,
            height,
        })
        .collect()
}

/// `points` evenly spaced (x, f(x)) pairs over the closed interval, for drawing the curve.
pub fn sample_curve(
    function: &Expression,
    interval: &Interval,
    points: usize,
) -> (Array1<f64>, Array1<f64>) {
    let xs = linspace(interval.lower, interval.upper, points);
    let ys = function.evaluate_array(&xs);
    (xs, ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::expression_compiler::ExpressionCompiler;
    use approx::assert_relative_eq;
    use strum::IntoEnumIterator;

    fn compile(source: &str) -> Expression {
        ExpressionCompiler::new().compile(source).unwrap()
    }

    #[test]
    fn test_interval_order() {
        assert!(Interval::new(0.0, 1.0).is_ordered());
        assert!(!Interval::new(5.0, 2.0).is_ordered());
        assert!(!Interval::new(1.0, 1.0).is_ordered());
        assert!(!Interval::new(f64::NAN, 1.0).is_ordered());
        assert_eq!(Interval::new(-1.0, 3.0).width(), 4.0);
        assert_eq!(Interval::new(-1.0, 3.0).to_string(), "[-1, 3]");
    }

    #[test]
    fn test_orientation_parsing() {
        assert_eq!("left".parse::<Orientation>().unwrap(), Orientation::Left);
        assert_eq!("RIGHT".parse::<Orientation>().unwrap(), Orientation::Right);
        assert_eq!("Gauche".parse::<Orientation>().unwrap(), Orientation::Left);
        assert_eq!("droite".parse::<Orientation>().unwrap(), Orientation::Right);
        assert!("middle".parse::<Orientation>().is_err());
        let names: Vec<String> = Orientation::iter().map(|o| o.to_string()).collect();
        assert_eq!(names, vec!["left", "right"]);
    }

    #[test]
    fn test_partition_clamp_and_samples() {
        let interval = Interval::new(0.0, 1.0);
        assert_eq!(Partition::new(0, Orientation::Left).count(), 1);
        let left = Partition::new(4, Orientation::Left);
        assert_eq!(left.dx(&interval), 0.25);
        assert_eq!(left.sample_points(&interval).to_vec(), vec![0.0, 0.25, 0.5, 0.75]);
        let right = Partition::new(4, Orientation::Right);
        assert_eq!(right.sample_points(&interval).to_vec(), vec![0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn test_riemann_sum_orientation() {
        let f = compile("x");
        let interval = Interval::new(0.0, 10.0);
        let left = riemann_sum(&f, &interval, &Partition::new(10, Orientation::Left)).unwrap();
        let right = riemann_sum(&f, &interval, &Partition::new(10, Orientation::Right)).unwrap();
        assert_relative_eq!(left.approximation, 45.0);
        assert_relative_eq!(right.approximation, 55.0);
        assert_eq!(left.dx, 1.0);
        assert_eq!(right.partition.orientation(), Orientation::Right);
    }

    #[test]
    fn test_riemann_sum_single_rectangle() {
        let f = compile("x^2");
        let interval = Interval::new(1.0, 3.0);
        let result = riemann_sum(&f, &interval, &Partition::new(0, Orientation::Right)).unwrap();
        assert_eq!(result.partition.count(), 1);
        assert_relative_eq!(result.approximation, 18.0);
    }

    #[test]
    fn test_riemann_sum_non_finite() {
        // finite on the probe domain, infinite at x = -1 outside of it
        let f = compile("1/(x + 11)");
        let interval = Interval::new(-12.0, -10.0);
        let err = riemann_sum(&f, &interval, &Partition::new(2, Orientation::Right)).unwrap_err();
        assert_eq!(err.sample, -11.0);
        assert!(err.to_string().contains("-11"));
    }

    #[test]
    fn test_rectangles() {
        let f = compile("2*x");
        let interval = Interval::new(0.0, 2.0);
        let bars = rectangles(&f, &interval, &Partition::new(2, Orientation::Right));
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0], Rectangle { left: 0.0, width: 1.0, height: 2.0 });
        assert_eq!(bars[1].right(), 2.0);
        let total: f64 = bars.iter().map(Rectangle::area).sum();
        assert_relative_eq!(total, 6.0);
    }

    #[test]
    fn test_sample_curve() {
        let f = compile("x^2");
        let (xs, ys) = sample_curve(&f, &Interval::new(-1.0, 1.0), 5);
        assert_eq!(xs.to_vec(), vec![-1.0, -0.5, 0.0, 0.5, 1.0]);
        assert_eq!(ys.to_vec(), vec![1.0, 0.25, 0.0, 0.25, 1.0]);
    }
}
