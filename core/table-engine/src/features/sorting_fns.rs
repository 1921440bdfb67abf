//! FILENAME: core/table-engine/src/features/sorting_fns.rs
//! PURPOSE: Built-in row comparators.
//! CONTEXT: A sorting function compares two rows on one column and always
//! answers in ascending terms; the sorted stage flips the result for
//! descending entries and inverted columns.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::column::FnRef;
use crate::row::TableRow;
use crate::value::{Record, Value};

pub const ALPHANUMERIC: &str = "alphanumeric";
pub const ALPHANUMERIC_CASE_SENSITIVE: &str = "alphanumericCaseSensitive";
pub const TEXT: &str = "text";
pub const TEXT_CASE_SENSITIVE: &str = "textCaseSensitive";
pub const DATETIME: &str = "datetime";
pub const BASIC: &str = "basic";
pub const FUZZY: &str = "fuzzy";

/// Rows sampled when choosing a comparator for a column.
pub(crate) const AUTO_SAMPLE_ROWS: usize = 10;

static DIGIT_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new("[0-9]+").unwrap());

type CompareFn<T> = dyn Fn(&TableRow<'_, T>, &TableRow<'_, T>, &str) -> Ordering;

pub struct SortingFn<T> {
    compare: Rc<CompareFn<T>>,
}

impl<T: Record> SortingFn<T> {
    pub fn new(compare: impl Fn(&TableRow<'_, T>, &TableRow<'_, T>, &str) -> Ordering + 'static) -> Self {
        SortingFn {
            compare: Rc::new(compare),
        }
    }

    pub fn compare(&self, a: &TableRow<'_, T>, b: &TableRow<'_, T>, column_id: &str) -> Ordering {
        (self.compare)(a, b, column_id)
    }
}

impl<T> Clone for SortingFn<T> {
    fn clone(&self) -> Self {
        SortingFn {
            compare: Rc::clone(&self.compare),
        }
    }
}

impl<T> fmt::Debug for SortingFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SortingFn(..)")
    }
}

impl<T> From<SortingFn<T>> for FnRef<SortingFn<T>> {
    fn from(f: SortingFn<T>) -> Self {
        FnRef::Custom(f)
    }
}

// ============================================================================
// COMPARISONS
// ============================================================================

/// Sort text; non-finite numbers and empty values read as "".
fn sort_text(value: &Value) -> String {
    match value {
        Value::Number(n) if !n.is_finite() => String::new(),
        other => other.to_string(),
    }
}

/// Splits into alternating text and digit runs, dropping empty pieces.
fn chunks(s: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut last = 0;
    for m in DIGIT_RUNS.find_iter(s) {
        if m.start() > last {
            out.push(&s[last..m.start()]);
        }
        out.push(m.as_str());
        last = m.end();
    }
    if last < s.len() {
        out.push(&s[last..]);
    }
    out
}

/// Natural ordering: digit runs compare numerically, a text run sorts before a digit run.
pub fn compare_alphanumeric(a: &str, b: &str) -> Ordering {
    let a_chunks = chunks(a);
    let b_chunks = chunks(b);
    for (aa, bb) in a_chunks.iter().zip(b_chunks.iter()) {
        let an = aa.parse::<u128>().ok();
        let bn = bb.parse::<u128>().ok();
        let ord = match (an, bn) {
            (Some(x), Some(y)) => x.cmp(&y),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => aa.cmp(bb),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a_chunks.len().cmp(&b_chunks.len())
}

pub fn alphanumeric<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| {
        compare_alphanumeric(
            &sort_text(&a.get_value(column_id)).to_lowercase(),
            &sort_text(&b.get_value(column_id)).to_lowercase(),
        )
    })
}

pub fn alphanumeric_case_sensitive<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| {
        compare_alphanumeric(&sort_text(&a.get_value(column_id)), &sort_text(&b.get_value(column_id)))
    })
}

/// Plain string comparison, ignoring case. Faster than alphanumeric.
pub fn text<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| {
        sort_text(&a.get_value(column_id))
            .to_lowercase()
            .cmp(&sort_text(&b.get_value(column_id)).to_lowercase())
    })
}

pub fn text_case_sensitive<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| {
        sort_text(&a.get_value(column_id)).cmp(&sort_text(&b.get_value(column_id)))
    })
}

pub fn datetime<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| match (a.get_value(column_id), b.get_value(column_id)) {
        (Value::DateTime(x), Value::DateTime(y)) => x.cmp(&y),
        (x, y) => x.compare(&y),
    })
}

pub fn basic<T: Record>() -> SortingFn<T> {
    SortingFn::new(|a, b, column_id| a.get_value(column_id).compare(&b.get_value(column_id)))
}

/// Higher fuzzy rank first; equal ranks fall back to alphanumeric.
pub fn fuzzy<T: Record>() -> SortingFn<T> {
    let fallback = alphanumeric::<T>();
    SortingFn::new(move |a, b, column_id| {
        let rank = |row: &TableRow<'_, T>| row.column_filter_meta(column_id).as_f64();
        match (rank(a), rank(b)) {
            (Some(x), Some(y)) if x != y => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            _ => fallback.compare(a, b, column_id),
        }
    })
}

pub fn builtin<T: Record>(name: &str) -> Option<SortingFn<T>> {
    let f = match name {
        ALPHANUMERIC => alphanumeric(),
        ALPHANUMERIC_CASE_SENSITIVE => alphanumeric_case_sensitive(),
        TEXT => text(),
        TEXT_CASE_SENSITIVE => text_case_sensitive(),
        DATETIME => datetime(),
        BASIC => basic(),
        FUZZY => fuzzy(),
        _ => return None,
    };
    Some(f)
}

/// Built-in chosen from sample values: dates sort as dates, text containing
/// digits sorts naturally, other text sorts as text, everything else basic.
pub(crate) fn auto_name_for<'a>(samples: impl IntoIterator<Item = &'a Value>) -> &'static str {
    let mut is_text = false;
    for value in samples {
        match value {
            Value::DateTime(_) => return DATETIME,
            Value::Text(s) => {
                is_text = true;
                if DIGIT_RUNS.is_match(s) {
                    return ALPHANUMERIC;
                }
            }
            _ => {}
        }
    }
    if is_text {
        TEXT
    } else {
        BASIC
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alphanumeric_orders_digit_runs_numerically() {
        assert_eq!(compare_alphanumeric("item2", "item10"), Ordering::Less);
        assert_eq!(compare_alphanumeric("item10", "item2"), Ordering::Greater);
        assert_eq!(compare_alphanumeric("a1", "a1"), Ordering::Equal);
        assert_eq!(compare_alphanumeric("a1", "a1b"), Ordering::Less);
    }

    #[test]
    fn test_alphanumeric_puts_text_before_numbers() {
        assert_eq!(compare_alphanumeric("abc", "123"), Ordering::Less);
        assert_eq!(compare_alphanumeric("9", "x"), Ordering::Greater);
    }

    #[test]
    fn test_chunks() {
        assert_eq!(chunks("ab12cd3"), vec!["ab", "12", "cd", "3"]);
        assert_eq!(chunks("42"), vec!["42"]);
        assert!(chunks("").is_empty());
    }

    #[test]
    fn test_auto_sorting_choice() {
        let text = [Value::from("Alice"), Value::from("Bob")];
        assert_eq!(auto_name_for(&text), TEXT);
        let mixed = [Value::from("Alice"), Value::from("Room 12")];
        assert_eq!(auto_name_for(&mixed), ALPHANUMERIC);
        let numbers = [Value::from(1), Value::from(2)];
        assert_eq!(auto_name_for(&numbers), BASIC);
        assert!(builtin::<serde_json::Value>(DATETIME).is_some());
    }
}
