//! Column label cleaning, de-duplication and placeholder-header detection.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Label substituted for columns whose cleaned label is empty.
pub const UNNAMED_LABEL: &str = "Unnamed";

/// Share of placeholder-looking labels above which a header row is rejected.
const PLACEHOLDER_SHARE: f64 = 0.5;

fn numeric_label_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[-+]?\d+(\.\d+)?$").expect("regex is valid"))
}

// ── Cleaning ──────────────────────────────────────────────────────────────────

/// Collapse every whitespace run (non-breaking spaces included) to a single
/// space and trim both ends. A missing label cleans to the empty string.
pub fn clean_label(raw: Option<&str>) -> String {
    match raw {
        Some(s) => s.split_whitespace().collect::<Vec<_>>().join(" "),
        None => String::new(),
    }
}

/// Clean and de-duplicate a label sequence, preserving order and length.
///
/// Empty labels become [`UNNAMED_LABEL`]. The first occurrence of a base
/// label is kept as-is; the k-th repeat becomes `base__k`.
pub fn dedupe_columns<I, S>(labels: I) -> Vec<String>
where
    I: IntoIterator<Item = Option<S>>,
    S: AsRef<str>,
{
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut out = Vec::new();

    for raw in labels {
        let mut base = clean_label(raw.as_ref().map(|s| s.as_ref()));
        if base.is_empty() {
            base = UNNAMED_LABEL.to_string();
        }
        match seen.get_mut(&base) {
            Some(count) => {
                *count += 1;
                out.push(format!("{}__{}", base, count));
            }
            None => {
                seen.insert(base.clone(), 0);
                out.push(base);
            }
        }
    }

    out
}

/// [`dedupe_columns`] over labels that are always present.
pub fn normalize_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    dedupe_columns(labels.iter().map(Some))
}

// ── Placeholder detection ─────────────────────────────────────────────────────

/// Counts behind a placeholder-header verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderStats {
    pub total: usize,
    pub empty_like: usize,
    pub numeric_like: usize,
}

impl HeaderStats {
    /// Tally empty/`Unnamed*` and numeric labels after cleaning.
    pub fn from_labels<S: AsRef<str>>(labels: &[S]) -> Self {
        let mut stats = HeaderStats {
            total: labels.len(),
            ..Default::default()
        };
        for label in labels {
            let cleaned = clean_label(Some(label.as_ref()));
            if cleaned.is_empty() || cleaned.to_lowercase().starts_with("unnamed") {
                stats.empty_like += 1;
            } else if numeric_label_re().is_match(&cleaned) {
                stats.numeric_like += 1;
            }
        }
        stats
    }

    /// `true` when placeholder labels are a strict majority, or there are none.
    pub fn is_placeholder(&self) -> bool {
        if self.total == 0 {
            return true;
        }
        let share = (self.numeric_like + self.empty_like) as f64 / self.total as f64;
        share > PLACEHOLDER_SHARE
    }
}

/// Whether `labels` look like reader-synthesised defaults rather than a real
/// header row.
pub fn looks_like_placeholder_headers<S: AsRef<str>>(labels: &[S]) -> bool {
    HeaderStats::from_labels(labels).is_placeholder()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    // ── clean_label ───────────────────────────────────────────────────────────

    #[test]
    fn test_clean_label_collapses_whitespace() {
        assert_eq!(clean_label(Some("  Wind \t speed  ")), "Wind speed");
        assert_eq!(clean_label(Some("Air\u{a0}\u{a0}temp")), "Air temp");
        assert_eq!(clean_label(Some("a\nb")), "a b");
        assert_eq!(clean_label(None), "");
    }

    // ── dedupe_columns ────────────────────────────────────────────────────────

    #[test]
    fn test_dedupe_repeats() {
        assert_eq!(normalize_labels(&["A", "A", "A"]), vec!["A", "A__1", "A__2"]);
    }

    #[test]
    fn test_dedupe_missing_and_empty() {
        let out = dedupe_columns(vec![Some(""), None, Some("x")]);
        assert_eq!(out, vec!["Unnamed", "Unnamed__1", "x"]);
    }

    #[test]
    fn test_dedupe_cleans_before_comparing() {
        let out = normalize_labels(&["Temp", " Temp ", "Temp\u{a0}"]);
        assert_eq!(out, vec!["Temp", "Temp__1", "Temp__2"]);
    }

    #[test]
    fn test_dedupe_preserves_order_and_length() {
        let input = ["b", "a", "b", "", "a"];
        let out = normalize_labels(&input);
        assert_eq!(out.len(), input.len());
        assert_eq!(out, vec!["b", "a", "b__1", "Unnamed", "a__1"]);
    }

    #[test]
    fn test_dedupe_idempotent() {
        let inputs: Vec<Vec<&str>> = vec![
            vec!["A", "A", "A"],
            vec!["", " ", "x", "x"],
            vec!["Year", "Month", "Day", "Three-hourly  observation time(UTC)"],
        ];
        for input in inputs {
            let once = normalize_labels(&input);
            let twice = normalize_labels(&once);
            assert_eq!(once, twice, "input {:?}", input);
        }
    }

    // ── looks_like_placeholder_headers ────────────────────────────────────────

    #[test]
    fn test_placeholder_numeric_and_unnamed() {
        assert!(looks_like_placeholder_headers(&["0", "1", "2", "Unnamed: 3"]));
    }

    #[test]
    fn test_placeholder_semantic_headers() {
        assert!(!looks_like_placeholder_headers(&["Temp", "Pressure", "Wind"]));
    }

    #[test]
    fn test_placeholder_empty_table() {
        let empty: [&str; 0] = [];
        assert!(looks_like_placeholder_headers(&empty));
    }

    #[test]
    fn test_placeholder_tie_is_not_majority() {
        // 2 of 4 is exactly half.
        assert!(!looks_like_placeholder_headers(&["1", "", "Temp", "Wind"]));
        assert!(looks_like_placeholder_headers(&["1", "", "-2.5", "Wind"]));
    }

    #[test]
    fn test_placeholder_prefix_case_insensitive() {
        let stats = HeaderStats::from_labels(&["UNNAMED_a", "unnamed", "+3.25", "2005"]);
        assert_eq!(stats.empty_like, 2);
        assert_eq!(stats.numeric_like, 2);
        assert!(stats.is_placeholder());
    }

    #[test]
    fn test_placeholder_numeric_pattern_is_strict() {
        let stats = HeaderStats::from_labels(&["1e5", "3.", ".5", "12a"]);
        assert_eq!(stats.numeric_like, 0);
        assert!(!stats.is_placeholder());
    }
}
