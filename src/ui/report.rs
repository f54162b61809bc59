// src/ui/report.rs
use std::fmt::Write as _;

use anyhow::Result;

use crate::analysis::CalculationOutcome;

const BAR_WIDTH: usize = 40;

/// Human-readable report for a terminal.
pub fn render_text(outcome: &CalculationOutcome) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Expression: {}", outcome.expression);
    if outcome.normalized != outcome.expression {
        let _ = writeln!(out, "Normalized: {}", outcome.normalized);
    }

    if let Some(error) = &outcome.error {
        let _ = writeln!(out, "Error: {}", error);
        write_warnings(&mut out, outcome);
        return out;
    }

    if outcome.is_deterministic {
        let _ = writeln!(out, "Result: {:.6}", outcome.mean);
        write_warnings(&mut out, outcome);
        return out;
    }

    if let Some(nominal) = outcome.nominal {
        let _ = writeln!(out, "Nominal: {:.6}", nominal);
    }
    if let Some(bounds) = outcome.analytical {
        let _ = writeln!(
            out,
            "Analytical Range: [{:.6}, {:.6}]{}",
            bounds.min,
            bounds.max,
            if outcome.approximate { " (approximate)" } else { "" }
        );
    }
    if let Some(bounds) = outcome.simulated {
        let _ = writeln!(out, "Simulated Range: [{:.6}, {:.6}]", bounds.min, bounds.max);
    }
    let _ = writeln!(out, "Mean: {:.6}", outcome.mean);
    let _ = writeln!(out, "Std Dev: {:.6}", outcome.std_dev);
    let _ = writeln!(
        out,
        "Iterations: {} ({} valid, {} invalid)",
        outcome.iterations, outcome.valid_count, outcome.invalid_count
    );

    if !outcome.percentiles.is_empty() {
        let _ = writeln!(out, "Percentiles:");
        for p in &outcome.percentiles {
            let _ = writeln!(out, "  P{:<5} {:.6}", p.p, p.value);
        }
    }

    if !outcome.confidence_intervals.is_empty() {
        let _ = writeln!(out, "Confidence Intervals:");
        for ci in &outcome.confidence_intervals {
            let _ = writeln!(
                out,
                "  {:>7.2}%: [{:.6}, {:.6}]",
                ci.confidence_level * 100.0,
                ci.lower_bound,
                ci.upper_bound
            );
        }
    }

    if !outcome.histogram.is_empty() {
        let _ = writeln!(out, "Histogram:");
        let tallest = outcome
            .histogram
            .iter()
            .map(|b| b.probability)
            .fold(0.0, f64::max);
        let label_width = outcome.histogram.iter().map(|b| b.label.len()).max().unwrap_or(0);
        for bin in &outcome.histogram {
            let len = if tallest > 0.0 {
                (bin.probability / tallest * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            let _ = writeln!(
                out,
                "  {:<width$} {:>6.2}% {}",
                bin.label,
                bin.probability * 100.0,
                "#".repeat(len),
                width = label_width
            );
        }
    }

    write_warnings(&mut out, outcome);
    out
}

fn write_warnings(out: &mut String, outcome: &CalculationOutcome) {
    for warning in &outcome.warnings {
        let _ = writeln!(out, "Warning: {}", warning);
    }
}

/// Machine-readable output in the same RON layout used for config files.
pub fn render_ron(outcome: &CalculationOutcome) -> Result<String> {
    let content = ron::ser::to_string_pretty(
        outcome,
        ron::ser::PrettyConfig::new()
            .depth_limit(4)
            .separate_tuple_members(true),
    )?;
    Ok(content)
}
