// src/analysis/ranges.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::error::CalcError;

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([+-]?)(\d+(?:\.\d+)?)\s*~\s*([+-]?\d+(?:\.\d+)?)")
        .expect("range pattern is a valid regex")
});

/// One `min~max` occurrence. Bounds that failed to parse are stored as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeSpec {
    pub placeholder: String,
    pub min_val: f64,
    pub max_val: f64,
}

impl RangeSpec {
    pub fn is_valid(&self) -> bool {
        !self.min_val.is_nan() && !self.max_val.is_nan()
    }

    pub fn midpoint(&self) -> f64 {
        (self.min_val + self.max_val) / 2.0
    }
}

/// A range token located in source text.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RangeMatch {
    pub start: usize,
    pub end: usize,
    pub min_text: String,
    pub max_text: String,
}

impl RangeMatch {
    pub fn source<'a>(&self, src: &'a str) -> &'a str {
        &src[self.start..self.end]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RangeExtraction {
    pub ranges: Vec<RangeSpec>,
    /// Input with every range replaced by its placeholder identifier.
    pub placeholder_expr: String,
    /// Input with every range replaced by its midpoint; the input itself when
    /// no ranges were found.
    pub substituted_expr: String,
    pub errors: Vec<CalcError>,
}

/// Finds every range token, left to right.
///
/// A sign directly in front of the lower bound is only part of the range when
/// it cannot be a binary operator, i.e. the previous non-space character does
/// not end an operand: `5-1~2` is `5 - (1~2)` while `(-1~2)` starts at `-1`.
/// Digits glued to an identifier (`a1~2`) are never a range.
pub(crate) fn find_ranges(src: &str) -> Vec<RangeMatch> {
    let mut matches = Vec::new();

    for caps in RANGE_PATTERN.captures_iter(src) {
        let (Some(whole), Some(sign), Some(digits), Some(max)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let binary_sign = !sign.as_str().is_empty()
            && src[..whole.start()]
                .trim_end()
                .chars()
                .last()
                .is_some_and(ends_operand);

        let (start, min_text) = if binary_sign {
            (digits.start(), digits.as_str().to_string())
        } else {
            (whole.start(), format!("{}{}", sign.as_str(), digits.as_str()))
        };

        let glued = src[..start]
            .chars()
            .last()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if glued {
            continue;
        }

        matches.push(RangeMatch {
            start,
            end: whole.end(),
            min_text,
            max_text: max.as_str().to_string(),
        });
    }

    matches
}

fn ends_operand(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == ')'
}

/// Rebuilds `src` with each range swapped for `replace(index, range)`.
pub(crate) fn replace_ranges<F>(src: &str, matches: &[RangeMatch], mut replace: F) -> String
where
    F: FnMut(usize, &RangeMatch) -> String,
{
    let mut out = String::with_capacity(src.len());
    let mut last = 0;
    for (i, m) in matches.iter().enumerate() {
        out.push_str(&src[last..m.start]);
        out.push_str(&replace(i, m));
        last = m.end;
    }
    out.push_str(&src[last..]);
    out
}

/// Picks a placeholder prefix that does not already occur in `src`.
fn placeholder_prefix(src: &str) -> String {
    let mut prefix = String::from("VAR");
    while src.contains(&prefix) {
        prefix.push('_');
    }
    prefix
}

fn parse_bound(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Formats a number so the expression parser reads it back unambiguously.
pub(crate) fn literal(value: f64) -> String {
    if value < 0.0 {
        format!("({})", value)
    } else {
        format!("{}", value)
    }
}

pub fn extract_ranges(raw: &str) -> RangeExtraction {
    let matches = find_ranges(raw);
    let prefix = placeholder_prefix(raw);
    let mut ranges = Vec::with_capacity(matches.len());
    let mut errors = Vec::new();

    for (i, m) in matches.iter().enumerate() {
        let mut bound = |text: &str| {
            parse_bound(text).unwrap_or_else(|| {
                errors.push(CalcError::RangeParse {
                    range: m.source(raw).to_string(),
                    bound: text.to_string(),
                });
                f64::NAN
            })
        };
        let min_val = bound(&m.min_text);
        let max_val = bound(&m.max_text);
        ranges.push(RangeSpec {
            placeholder: format!("{}{}", prefix, i),
            min_val,
            max_val,
        });
    }

    let placeholder_expr = replace_ranges(raw, &matches, |i, _| ranges[i].placeholder.clone());
    let substituted_expr = replace_ranges(raw, &matches, |i, _| literal(ranges[i].midpoint()));

    RangeExtraction { ranges, placeholder_expr, substituted_expr, errors }
}
