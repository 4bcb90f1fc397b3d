/*
Pretty printing of Riemann sum vs exact integral comparisons.
*/
use crate::numerical::riemann::{Interval, Partition};
use crate::numerical::riemann_engine::{ComputeOutcome, ExactResult, RiemannEngine};
use tabled::{builder::Builder, settings::Style};

const HEADER: [&str; 6] = [
    "function",
    "interval",
    "partition",
    "Riemann sum",
    "exact integral",
    "absolute error",
];

/// One line of the comparison table, already formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub function: String,
    pub interval: String,
    pub partition: String,
    pub riemann: String,
    pub exact: String,
    pub absolute_error: String,
}

impl ComparisonRow {
    pub fn new(
        function: &str,
        interval: &Interval,
        partition: &Partition,
        outcome: &ComputeOutcome,
    ) -> Self {
        let riemann = match &outcome.riemann {
            Ok(result) => format!("{:.6}", result.approximation),
            Err(err) => err.to_string(),
        };
        let exact = match &outcome.exact {
            Ok(ExactResult::Value(value)) => format!("{:.6}", value),
            Ok(ExactResult::Undefined) | Err(_) => "undefined".to_string(),
        };
        let absolute_error = outcome
            .absolute_error()
            .map(|e| format!("{:.3e}", e))
            .unwrap_or_else(|| "-".to_string());
        ComparisonRow {
            function: function.to_string(),
            interval: interval.to_string(),
            partition: partition.to_string(),
            riemann,
            exact,
            absolute_error,
        }
    }

    /// Row for the engine's current function and settings.
    pub fn from_engine(engine: &RiemannEngine, outcome: &ComputeOutcome) -> Self {
        let function = engine
            .expression()
            .map(|e| e.source().to_string())
            .unwrap_or_else(|| "-".to_string());
        Self::new(&function, &engine.interval(), &engine.partition(), outcome)
    }

    fn cells(&self) -> [String; 6] {
        [
            self.function.clone(),
            self.interval.clone(),
            self.partition.clone(),
            self.riemann.clone(),
            self.exact.clone(),
            self.absolute_error.clone(),
        ]
    }
}

pub fn comparison_table(rows: &[ComparisonRow]) -> String {
    let mut builder = Builder::default();
    builder.push_record(HEADER);
    for row in rows {
        builder.push_record(row.cells());
    }
    let mut table = builder.build();
    table.with(Style::modern_rounded());
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numerical::riemann::Orientation;
    use crate::symbolic::expression_compiler::ExpressionCompiler;

    fn engine_for(source: &str) -> RiemannEngine {
        let mut engine = RiemannEngine::new();
        engine.set_function(ExpressionCompiler::new().compile(source).unwrap());
        engine.set_interval(0.0, 10.0);
        engine.set_partition(10, Orientation::Right);
        engine
    }

    #[test]
    fn test_row_formatting() {
        let mut engine = engine_for("x");
        let outcome = engine.compute();
        let row = ComparisonRow::from_engine(&engine, &outcome);
        assert_eq!(row.function, "x");
        assert_eq!(row.interval, "[0, 10]");
        assert_eq!(row.partition, "10 x right");
        assert_eq!(row.riemann, "55.000000");
        assert_eq!(row.exact, "50.000000");
        assert_eq!(row.absolute_error, "5.000e0");
    }

    #[test]
    fn test_row_for_unintegrable_function() {
        let mut engine = engine_for("exp(-x^2)");
        let outcome = engine.compute();
        let row = ComparisonRow::from_engine(&engine, &outcome);
        assert_eq!(row.exact, "undefined");
        assert_eq!(row.absolute_error, "-");
    }

    #[test]
    fn test_table_contains_every_row() {
        let rows: Vec<ComparisonRow> = ["x", "x^2"]
            .iter()
            .map(|source| {
                let mut engine = engine_for(source);
                let outcome = engine.compute();
                ComparisonRow::from_engine(&engine, &outcome)
            })
            .collect();
        let table = comparison_table(&rows);
        for header in HEADER {
            assert!(table.contains(header));
        }
        assert!(table.contains("x^2"));
        assert!(table.contains("385.000000"));
        assert!(table.starts_with('╭'));
    }
}
