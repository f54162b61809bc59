// src/analysis/normalize.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Serialize, Deserialize};

use super::ranges::{extract_ranges, find_ranges, replace_ranges, RangeSpec};

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is a valid regex"));

static SAMPLING_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(sample|uniform|normal|triangular)\s*\(").expect("sampling pattern is a valid regex")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedExpression {
    pub expression: String,
    pub is_probabilistic: bool,
    pub ranges: Vec<RangeSpec>,
}

/// Textual rewrite into the sampling form: `x` becomes `*`, every range
/// becomes `sample(uniform(min, max))`, implicit multiplication is made
/// explicit and whitespace is collapsed.
pub fn normalize(raw: &str) -> ProcessedExpression {
    let expression = normalize_multiplication(raw);
    let expression = ranges_to_samples(&expression);
    let expression = insert_implicit_multiplication(&expression);
    let expression = collapse_whitespace(&expression);

    ProcessedExpression {
        is_probabilistic: is_probabilistic(&expression),
        expression,
        ranges: Vec::new(),
    }
}

/// The same rewrites as [`normalize`] except that ranges are left in place,
/// so the result can still be fed to the range extractor.
pub fn normalize_lexical(raw: &str) -> String {
    let expression = normalize_multiplication(raw);
    let expression = insert_implicit_multiplication(&expression);
    collapse_whitespace(&expression)
}

/// Normalizes `raw` and attaches the ranges found in it.
pub fn process(raw: &str) -> ProcessedExpression {
    let extraction = extract_ranges(&normalize_lexical(raw));
    ProcessedExpression {
        ranges: extraction.ranges,
        ..normalize(raw)
    }
}

pub fn is_probabilistic(expression: &str) -> bool {
    SAMPLING_CALL.is_match(expression)
}

/// Rewrites a standalone `x` or `X` as `*`. Letters inside identifiers such as
/// `exp` or `max` are left alone.
pub fn normalize_multiplication(src: &str) -> String {
    let chars: Vec<char> = src.chars().collect();
    let is_word = |i: Option<&char>| i.is_some_and(|c| c.is_ascii_alphabetic() || *c == '_');

    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let standalone = !is_word(i.checked_sub(1).and_then(|p| chars.get(p)))
                && !is_word(chars.get(i + 1));
            if (c == 'x' || c == 'X') && standalone {
                '*'
            } else {
                c
            }
        })
        .collect()
}

pub fn ranges_to_samples(src: &str) -> String {
    let matches = find_ranges(src);
    replace_ranges(src, &matches, |_, m| {
        format!("sample(uniform({}, {}))", m.min_text, m.max_text)
    })
}

#[derive(Clone, Copy)]
enum Left {
    Number,
    CloseParen,
}

#[derive(Clone, Copy)]
enum Right {
    OpenParen,
    IdentStart,
}

/// Inserts `*` in four passes, each over the previous result:
/// `2(` , `)(` , `2a` and `)a`.
pub fn insert_implicit_multiplication(src: &str) -> String {
    [
        (Left::Number, Right::OpenParen),
        (Left::CloseParen, Right::OpenParen),
        (Left::Number, Right::IdentStart),
        (Left::CloseParen, Right::IdentStart),
    ]
    .into_iter()
    .fold(src.to_string(), |acc, (left, right)| insert_pass(&acc, left, right))
}

fn insert_pass(src: &str, left: Left, right: Right) -> String {
    let bytes = src.as_bytes();
    let number_ends = number_end_positions(bytes);
    let mut out = String::with_capacity(src.len() + 8);
    let mut last = 0;

    for i in 0..bytes.len() {
        let left_ok = match left {
            Left::Number => number_ends[i],
            Left::CloseParen => bytes[i] == b')',
        };
        let right_ok = bytes.get(i + 1).is_some_and(|&b| match right {
            Right::OpenParen => b == b'(',
            Right::IdentStart => b.is_ascii_alphabetic() || b == b'_',
        });
        if left_ok && right_ok {
            out.push_str(&src[last..=i]);
            out.push('*');
            last = i + 1;
        }
    }
    out.push_str(&src[last..]);
    out
}

// Marks the last byte of every numeric literal that is not part of an
// identifier (`VAR0` or `log10` contain digits but are not numbers).
fn number_end_positions(bytes: &[u8]) -> Vec<bool> {
    let mut ends = vec![false; bytes.len()];
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_alphabetic() || b == b'_' {
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
        } else if b.is_ascii_digit() || (b == b'.' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit)) {
            let end = scan_number(bytes, i);
            ends[end - 1] = true;
            i = end;
        } else {
            i += 1;
        }
    }
    ends
}

/// Returns the index just past a numeric literal starting at `start`.
/// An exponent is only consumed when digits actually follow it, so `2e`
/// is the number `2` followed by the identifier `e`.
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
    }
    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        let mut j = i + 1;
        if j < bytes.len() && (bytes[j] == b'+' || bytes[j] == b'-') {
            j += 1;
        }
        if j < bytes.len() && bytes[j].is_ascii_digit() {
            while j < bytes.len() && bytes[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    i
}

pub fn collapse_whitespace(src: &str) -> String {
    WHITESPACE.replace_all(src, " ").trim().to_string()
}
