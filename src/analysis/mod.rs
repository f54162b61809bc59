// src/analysis/mod.rs
pub mod bounds;
pub mod calculator;
pub mod deterministic;
pub mod normalize;
pub mod ranges;
pub mod simulation;
pub mod statistics;

// Re-export commonly used types
pub use bounds::{solve_bounds, BoundSolution, Bounds, EXACT_RANGE_LIMIT};
pub use calculator::{calculate, calculate_with_rng, CalculationOutcome};
pub use deterministic::evaluate_deterministic;
pub use normalize::{normalize, process, ProcessedExpression};
pub use ranges::{extract_ranges, RangeExtraction, RangeSpec};
pub use simulation::{run_simulation, run_simulation_with_rng};
pub use statistics::{histogram, mean, percentile, std_dev, HistogramBin, Summary};
