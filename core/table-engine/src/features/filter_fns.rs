//! FILENAME: core/table-engine/src/features/filter_fns.rs
//! PURPOSE: Built-in column and global filter functions.
//! CONTEXT: A filter function decides whether one row passes for one column.
//! It may normalize the filter value once per run (`resolve_filter_value`)
//! and may declare values that mean "no filter" (`auto_remove`), which makes
//! `set_filter_value` drop the entry instead of storing it.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use nucleo_matcher::pattern::{AtomKind, CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher, Utf32Str};

use crate::column::FnRef;
use crate::row::TableRow;
use crate::value::{Record, Value};

pub const INCLUDES_STRING: &str = "includesString";
pub const INCLUDES_STRING_SENSITIVE: &str = "includesStringSensitive";
pub const EQUALS_STRING: &str = "equalsString";
pub const ARR_INCLUDES: &str = "arrIncludes";
pub const ARR_INCLUDES_ALL: &str = "arrIncludesAll";
pub const ARR_INCLUDES_SOME: &str = "arrIncludesSome";
pub const EQUALS: &str = "equals";
pub const WEAK_EQUALS: &str = "weakEquals";
pub const IN_NUMBER_RANGE: &str = "inNumberRange";
pub const FUZZY: &str = "fuzzy";

type TestFn<T> = dyn Fn(&TableRow<'_, T>, &str, &Value, &mut Value) -> bool;

/// A row predicate for one column. The last argument is a metadata slot the
/// function may fill (stored on the row as filter meta).
pub struct FilterFn<T> {
    test: Rc<TestFn<T>>,
    resolve_filter_value: Option<Rc<dyn Fn(&Value) -> Value>>,
    auto_remove: Option<Rc<dyn Fn(&Value) -> bool>>,
}

impl<T: Record> FilterFn<T> {
    pub fn new(test: impl Fn(&TableRow<'_, T>, &str, &Value, &mut Value) -> bool + 'static) -> Self {
        FilterFn {
            test: Rc::new(test),
            resolve_filter_value: None,
            auto_remove: None,
        }
    }

    pub fn with_resolve_filter_value(mut self, f: impl Fn(&Value) -> Value + 'static) -> Self {
        self.resolve_filter_value = Some(Rc::new(f));
        self
    }

    pub fn with_auto_remove(mut self, f: impl Fn(&Value) -> bool + 'static) -> Self {
        self.auto_remove = Some(Rc::new(f));
        self
    }

    pub fn test(&self, row: &TableRow<'_, T>, column_id: &str, filter_value: &Value, meta: &mut Value) -> bool {
        (self.test)(row, column_id, filter_value, meta)
    }

    pub fn resolve_filter_value(&self, value: &Value) -> Value {
        match &self.resolve_filter_value {
            Some(resolve) => resolve(value),
            None => value.clone(),
        }
    }

    /// True when `value` should remove the filter rather than be stored.
    pub fn should_auto_remove(&self, value: &Value) -> bool {
        self.auto_remove.as_ref().map(|f| f(value)).unwrap_or(false)
    }
}

impl<T> Clone for FilterFn<T> {
    fn clone(&self) -> Self {
        FilterFn {
            test: Rc::clone(&self.test),
            resolve_filter_value: self.resolve_filter_value.clone(),
            auto_remove: self.auto_remove.clone(),
        }
    }
}

impl<T> fmt::Debug for FilterFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterFn")
            .field("resolves_value", &self.resolve_filter_value.is_some())
            .field("auto_removes", &self.auto_remove.is_some())
            .finish()
    }
}

impl<T> From<FilterFn<T>> for FnRef<FilterFn<T>> {
    fn from(f: FilterFn<T>) -> Self {
        FnRef::Custom(f)
    }
}

/// Empty and `""` mean "no filter".
pub fn test_falsey(value: &Value) -> bool {
    match value {
        Value::Empty => true,
        Value::Text(s) => s.is_empty(),
        _ => false,
    }
}

fn list_falsey(value: &Value) -> bool {
    test_falsey(value) || value.as_list().map(|items| items.is_empty()).unwrap_or(false)
}

/// Display text of a cell value; `None` for empty cells.
fn cell_text<T: Record>(row: &TableRow<'_, T>, column_id: &str) -> Option<String> {
    match row.get_value(column_id) {
        Value::Empty => None,
        value => Some(value.to_string()),
    }
}

fn row_list_contains<T: Record>(row: &TableRow<'_, T>, column_id: &str, needle: &Value) -> bool {
    match row.get_value(column_id) {
        Value::List(items) => items.contains(needle),
        _ => false,
    }
}

// ============================================================================
// BUILT-INS
// ============================================================================

pub fn includes_string<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| {
        let search = filter_value.to_string().to_lowercase();
        cell_text(row, column_id)
            .map(|text| text.to_lowercase().contains(&search))
            .unwrap_or(false)
    })
    .with_auto_remove(test_falsey)
}

pub fn includes_string_sensitive<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| {
        let search = filter_value.to_string();
        cell_text(row, column_id)
            .map(|text| text.contains(&search))
            .unwrap_or(false)
    })
    .with_auto_remove(test_falsey)
}

pub fn equals_string<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| {
        let expected = filter_value.to_string().to_lowercase();
        cell_text(row, column_id)
            .map(|text| text.to_lowercase() == expected)
            .unwrap_or(false)
    })
    .with_auto_remove(test_falsey)
}

pub fn arr_includes<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| row_list_contains(row, column_id, filter_value))
        .with_auto_remove(list_falsey)
}

pub fn arr_includes_all<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| match filter_value {
        Value::List(wanted) => wanted.iter().all(|w| row_list_contains(row, column_id, w)),
        single => row_list_contains(row, column_id, single),
    })
    .with_auto_remove(list_falsey)
}

pub fn arr_includes_some<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| match filter_value {
        Value::List(wanted) => wanted.iter().any(|w| row_list_contains(row, column_id, w)),
        single => row_list_contains(row, column_id, single),
    })
    .with_auto_remove(list_falsey)
}

pub fn equals<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| row.get_value(column_id) == *filter_value)
        .with_auto_remove(test_falsey)
}

pub fn weak_equals<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| row.get_value(column_id).weak_eq(filter_value))
        .with_auto_remove(test_falsey)
}

/// `[min, max]`, either end optional. Bounds are parsed once per run.
pub fn in_number_range<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, _| {
        let (min, max) = number_range(filter_value);
        match row.get_value(column_id).to_number() {
            Some(n) => n >= min && n <= max,
            None => false,
        }
    })
    .with_resolve_filter_value(|value| {
        let (min, max) = number_range(value);
        Value::List(vec![Value::Number(min), Value::Number(max)])
    })
    .with_auto_remove(|value| {
        test_falsey(value)
            || value
                .as_list()
                .map(|bounds| bounds.iter().take(2).all(test_falsey))
                .unwrap_or(false)
    })
}

fn number_range(value: &Value) -> (f64, f64) {
    let bounds = value.as_list().unwrap_or(&[]);
    let parse = |bound: Option<&Value>, fallback: f64| {
        bound
            .and_then(|b| b.to_number())
            .filter(|n| !n.is_nan())
            .unwrap_or(fallback)
    };
    let min = parse(bounds.first(), f64::NEG_INFINITY);
    let max = parse(bounds.get(1), f64::INFINITY);
    if min > max {
        (max, min)
    } else {
        (min, max)
    }
}

thread_local! {
    static FUZZY_MATCHER: RefCell<Matcher> = RefCell::new(Matcher::new(Config::DEFAULT));
}

/// Fuzzy score of `haystack` against `query`, `None` when it does not match.
pub fn fuzzy_score(query: &str, haystack: &str) -> Option<u32> {
    let pattern = Pattern::new(query, CaseMatching::Ignore, Normalization::Smart, AtomKind::Fuzzy);
    let mut buf = Vec::new();
    let haystack = Utf32Str::new(haystack, &mut buf);
    FUZZY_MATCHER.with(|matcher| pattern.score(haystack, &mut matcher.borrow_mut()))
}

/// Fuzzy match on the display text; the score is left in the row's filter meta.
pub fn fuzzy<T: Record>() -> FilterFn<T> {
    FilterFn::new(|row, column_id, filter_value, meta| {
        let Some(text) = cell_text(row, column_id) else {
            return false;
        };
        match fuzzy_score(&filter_value.to_string(), &text) {
            Some(score) => {
                *meta = Value::Number(score as f64);
                true
            }
            None => false,
        }
    })
    .with_auto_remove(test_falsey)
}

/// Looks up a built-in filter function by name.
pub fn builtin<T: Record>(name: &str) -> Option<FilterFn<T>> {
    let f = match name {
        INCLUDES_STRING => includes_string(),
        INCLUDES_STRING_SENSITIVE => includes_string_sensitive(),
        EQUALS_STRING => equals_string(),
        ARR_INCLUDES => arr_includes(),
        ARR_INCLUDES_ALL => arr_includes_all(),
        ARR_INCLUDES_SOME => arr_includes_some(),
        EQUALS => equals(),
        WEAK_EQUALS => weak_equals(),
        IN_NUMBER_RANGE => in_number_range(),
        FUZZY => fuzzy(),
        _ => return None,
    };
    Some(f)
}

/// Built-in chosen for a column from a sample value.
pub(crate) fn auto_name_for(sample: &Value) -> &'static str {
    match sample {
        Value::Text(_) => INCLUDES_STRING,
        Value::Number(_) => IN_NUMBER_RANGE,
        Value::Boolean(_) | Value::DateTime(_) => EQUALS,
        Value::List(_) => ARR_INCLUDES,
        Value::Empty => WEAK_EQUALS,
    }
}
