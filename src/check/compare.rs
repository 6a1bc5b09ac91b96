use std::time::Duration;

use lazy_static::lazy_static;
use regex::Regex;
use serde_derive::Deserialize;
use similar::{Algorithm, TextDiff};


/// Largest tolerated |fractional difference| between paired numeric values.
pub const DEFAULT_FRAC_DELTA: f64 = 0.001;

const DIFF_DEADLINE: Duration = Duration::from_secs(10);

/// Comparison strategy of a test case. Adding a strategy means adding a
/// variant here, nothing else branches on it.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum DiffMode {
    Exact,
    Tolerant,
}

/// Verdict of one expected-vs-actual comparison.
#[derive(Clone, Debug)]
pub struct Comparison {
    pub passed: bool,
    pub diff: String,
}

impl DiffMode {
    pub fn compare(&self, expected: &str, actual: &str) -> Comparison {
        match self {
            DiffMode::Exact => exact_diff(expected, actual),
            DiffMode::Tolerant => tolerant_diff(expected, actual, DEFAULT_FRAC_DELTA),
        }
    }
}

/// Whitespace-insensitive line comparison: blank lines are skipped and all
/// whitespace within a line is ignored. The reported diff is rendered from
/// the unmodified texts.
fn exact_diff(expected: &str, actual: &str) -> Comparison {
    let passed = normalized_lines(expected) == normalized_lines(actual);
    let diff = if passed {
        String::new()
    } else {
        TextDiff::configure()
            .algorithm(Algorithm::Patience)
            .timeout(DIFF_DEADLINE)
            .newline_terminated(true)
            .diff_lines(expected, actual)
            .unified_diff()
            .context_radius(3)
            .header("expected", "actual")
            .to_string()
    };
    Comparison { passed, diff }
}

fn normalized_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split_whitespace().collect::<String>())
        .filter(|line| !line.is_empty())
        .collect()
}

/// Line-by-line comparison pairing lines positionally; missing lines on the
/// shorter side compare as empty strings. Pairs of the shape
/// `identifier whitespace number` match when the identifiers agree and the
/// numeric values lie within the tolerance.
fn tolerant_diff(expected: &str, actual: &str, frac_delta: f64) -> Comparison {
    let expected_lines: Vec<&str> = expected.lines().collect();
    let actual_lines: Vec<&str> = actual.lines().collect();

    let mut diff = String::new();
    let mut passed = true;
    for i in 0..expected_lines.len().max(actual_lines.len()) {
        let expected_line = expected_lines.get(i).unwrap_or(&"").trim_end();
        let actual_line = actual_lines.get(i).unwrap_or(&"").trim_end();
        if !line_match(expected_line, actual_line, frac_delta) {
            diff.push_str(&format!("< {}\n> {}\n", expected_line, actual_line));
            passed = false;
        }
    }
    Comparison { passed, diff }
}

fn line_match(expected: &str, actual: &str, frac_delta: f64) -> bool {
    if expected == actual {
        return true;
    }

    lazy_static! {
        static ref KEYED_VALUE: Regex = Regex::new(r"^(\w+)\s+([.\d]+)$").unwrap();
    }
    let expected_caps = match KEYED_VALUE.captures(expected) {
        Some(caps) => caps,
        None => return false,
    };
    let actual_caps = match KEYED_VALUE.captures(actual) {
        Some(caps) => caps,
        None => return false,
    };

    if expected_caps.get(1).unwrap().as_str() != actual_caps.get(1).unwrap().as_str() {
        return false;
    }

    let expected_value: f64 = match expected_caps.get(2).unwrap().as_str().parse() {
        Ok(value) => value,
        Err(_) => return false,
    };
    let actual_value: f64 = match actual_caps.get(2).unwrap().as_str().parse() {
        Ok(value) => value,
        Err(_) => return false,
    };

    frac_difference(expected_value, actual_value).abs() <= frac_delta
}

/// Fraction difference (percent difference, not x100) between two values.
/// `0.0` when both are zero, `1.0` when only the expected value is zero.
pub fn frac_difference(expected: f64, actual: f64) -> f64 {
    if expected == 0.0 {
        if actual == 0.0 {
            return 0.0;
        }
        return 1.0;
    }
    actual / expected - 1.0
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frac_difference_of_two_zeros_is_zero() {
        assert_eq!(frac_difference(0.0, 0.0), 0.0);
    }

    #[test]
    fn frac_difference_against_zero_expected_is_one() {
        assert_eq!(frac_difference(0.0, 5.0), 1.0);
    }

    #[test]
    fn frac_difference_is_the_relative_deviation() {
        assert!((frac_difference(100.0, 100.05) - 0.0005).abs() < 1e-12);
        assert!((frac_difference(100.0, 105.0) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn tolerant_comparison_is_reflexive() {
        let output = "cache_hits 120\ncache_misses 8\nrate 0.9375\n";
        let result = DiffMode::Tolerant.compare(output, output);
        assert!(result.passed);
        assert!(result.diff.is_empty());
    }

    #[test]
    fn tolerant_comparison_accepts_values_within_tolerance() {
        let result = DiffMode::Tolerant.compare("rate 100\n", "rate 100.05\n");
        assert!(result.passed);
    }

    #[test]
    fn tolerant_comparison_rejects_values_outside_tolerance() {
        let result = DiffMode::Tolerant.compare("rate 100\n", "rate 105\n");
        assert!(!result.passed);
        assert_eq!(result.diff, "< rate 100\n> rate 105\n");
    }

    #[test]
    fn tolerant_comparison_rejects_zero_when_a_value_was_expected() {
        let result = DiffMode::Tolerant.compare("count 5\n", "count 0\n");
        assert!(!result.passed);
    }

    #[test]
    fn tolerant_comparison_accepts_matching_zeros() {
        let result = DiffMode::Tolerant.compare("count 0\n", "count 0.0\n");
        assert!(result.passed);
    }

    #[test]
    fn tolerant_comparison_rejects_differing_identifiers() {
        let result = DiffMode::Tolerant.compare("hits 10\n", "misses 10\n");
        assert!(!result.passed);
    }

    #[test]
    fn lines_with_trailing_tokens_fail_the_pattern() {
        let result = DiffMode::Tolerant.compare("rate 1.0 total\n", "rate 1.00 total\n");
        assert!(!result.passed);
    }

    #[test]
    fn unparseable_numeric_tokens_mismatch() {
        let result = DiffMode::Tolerant.compare("rate ...\n", "rate 1.0\n");
        assert!(!result.passed);
    }

    #[test]
    fn missing_lines_compare_as_empty() {
        let result = DiffMode::Tolerant.compare("a 1\nb 2\nc 3\n", "a 1\n");
        assert!(!result.passed);
        assert_eq!(result.diff, "< b 2\n> \n< c 3\n> \n");
    }

    #[test]
    fn surplus_lines_also_mismatch() {
        let result = DiffMode::Tolerant.compare("a 1\n", "a 1\nextra 9\n");
        assert!(!result.passed);
        assert_eq!(result.diff, "< \n> extra 9\n");
    }

    #[test]
    fn trailing_whitespace_is_ignored_in_tolerant_pairs() {
        let result = DiffMode::Tolerant.compare("done 1  \n", "done 1\n");
        assert!(result.passed);
    }

    #[test]
    fn exact_comparison_ignores_whitespace_and_blank_lines() {
        let result = DiffMode::Exact.compare("a  b\n\nc\n", "a b\nc\n\n");
        assert!(result.passed);
        assert!(result.diff.is_empty());
    }

    #[test]
    fn exact_comparison_flags_content_differences() {
        let result = DiffMode::Exact.compare("alpha\nbeta\n", "alpha\ngamma\n");
        assert!(!result.passed);
        assert!(result.diff.contains("-beta"));
        assert!(result.diff.contains("+gamma"));
    }

    #[test]
    fn exact_comparison_is_reflexive() {
        let result = DiffMode::Exact.compare("same\n", "same\n");
        assert!(result.passed);
    }
}
