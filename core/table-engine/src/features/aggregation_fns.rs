//! FILENAME: core/table-engine/src/features/aggregation_fns.rs
//! PURPOSE: Built-in aggregations for grouped rows.
//! CONTEXT: An aggregation receives the group's data rows (`leaf_rows`) and
//! its direct children (`child_rows`, which are sub-group rows below the
//! innermost grouping level). The built-ins all read the data rows, so nested
//! group totals never depend on the shape of the levels beneath them.

use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::column::FnRef;
use crate::row::TableRow;
use crate::value::{Record, Value};

pub const SUM: &str = "sum";
pub const MIN: &str = "min";
pub const MAX: &str = "max";
pub const EXTENT: &str = "extent";
pub const MEAN: &str = "mean";
pub const MEDIAN: &str = "median";
pub const UNIQUE: &str = "unique";
pub const UNIQUE_COUNT: &str = "uniqueCount";
pub const COUNT: &str = "count";

type AggregateFn<T> = dyn Fn(&str, &[TableRow<'_, T>], &[TableRow<'_, T>]) -> Value;

pub struct AggregationFn<T> {
    aggregate: Rc<AggregateFn<T>>,
}

impl<T: Record> AggregationFn<T> {
    /// `f(column_id, leaf_rows, child_rows)`
    pub fn new(f: impl Fn(&str, &[TableRow<'_, T>], &[TableRow<'_, T>]) -> Value + 'static) -> Self {
        AggregationFn { aggregate: Rc::new(f) }
    }

    pub fn aggregate(&self, column_id: &str, leaf_rows: &[TableRow<'_, T>], child_rows: &[TableRow<'_, T>]) -> Value {
        (self.aggregate)(column_id, leaf_rows, child_rows)
    }
}

impl<T> Clone for AggregationFn<T> {
    fn clone(&self) -> Self {
        AggregationFn {
            aggregate: Rc::clone(&self.aggregate),
        }
    }
}

impl<T> fmt::Debug for AggregationFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AggregationFn(..)")
    }
}

impl<T> From<AggregationFn<T>> for FnRef<AggregationFn<T>> {
    fn from(f: AggregationFn<T>) -> Self {
        FnRef::Custom(f)
    }
}

fn values<T: Record>(rows: &[TableRow<'_, T>], column_id: &str) -> Vec<Value> {
    rows.iter().map(|row| row.get_value(column_id)).collect()
}

fn numbers<T: Record>(rows: &[TableRow<'_, T>], column_id: &str) -> Vec<f64> {
    rows.iter()
        .filter_map(|row| row.get_value(column_id).to_number())
        .filter(|n| !n.is_nan())
        .collect()
}

/// Smallest and largest non-empty value, in `Value::compare` order.
fn bounds<T: Record>(rows: &[TableRow<'_, T>], column_id: &str) -> Option<(Value, Value)> {
    let mut out: Option<(Value, Value)> = None;
    for value in values(rows, column_id) {
        if value.is_empty() || matches!(value, Value::Number(n) if n.is_nan()) {
            continue;
        }
        out = Some(match out {
            None => (value.clone(), value),
            Some((lo, hi)) => {
                let lo = if value.compare(&lo) == Ordering::Less { value.clone() } else { lo };
                let hi = if value.compare(&hi) == Ordering::Greater { value } else { hi };
                (lo, hi)
            }
        });
    }
    out
}

// ============================================================================
// BUILT-INS
// ============================================================================

/// Sum of numeric values; anything else counts as zero.
pub fn sum<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        let total: f64 = leaf_rows
            .iter()
            .map(|row| row.get_value(column_id).as_f64().unwrap_or(0.0))
            .sum();
        Value::Number(total)
    })
}

pub fn min<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        bounds(leaf_rows, column_id).map(|(lo, _)| lo).unwrap_or_default()
    })
}

pub fn max<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        bounds(leaf_rows, column_id).map(|(_, hi)| hi).unwrap_or_default()
    })
}

/// `[min, max]`
pub fn extent<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| match bounds(leaf_rows, column_id) {
        Some((lo, hi)) => Value::List(vec![lo, hi]),
        None => Value::Empty,
    })
}

pub fn mean<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        let nums = numbers(leaf_rows, column_id);
        if nums.is_empty() {
            return Value::Empty;
        }
        Value::Number(nums.iter().sum::<f64>() / nums.len() as f64)
    })
}

/// Median of the values; empty unless every value is a number.
pub fn median<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        let raw = values(leaf_rows, column_id);
        let mut nums: Vec<f64> = Vec::with_capacity(raw.len());
        for value in &raw {
            match value.as_f64() {
                Some(n) => nums.push(n),
                None => return Value::Empty,
            }
        }
        if nums.is_empty() {
            return Value::Empty;
        }
        nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = nums.len() / 2;
        let median = if nums.len() % 2 == 0 {
            (nums[mid - 1] + nums[mid]) / 2.0
        } else {
            nums[mid]
        };
        Value::Number(median)
    })
}

/// Distinct values in first-seen order.
pub fn unique<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        let mut seen = FxHashSet::default();
        let distinct = values(leaf_rows, column_id)
            .into_iter()
            .filter(|v| seen.insert(v.clone()))
            .collect();
        Value::List(distinct)
    })
}

pub fn unique_count<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|column_id, leaf_rows, _| {
        let distinct: FxHashSet<Value> = values(leaf_rows, column_id).into_iter().collect();
        Value::from(distinct.len())
    })
}

pub fn count<T: Record>() -> AggregationFn<T> {
    AggregationFn::new(|_, leaf_rows, _| Value::from(leaf_rows.len()))
}

pub fn builtin<T: Record>(name: &str) -> Option<AggregationFn<T>> {
    let f = match name {
        SUM => sum(),
        MIN => min(),
        MAX => max(),
        EXTENT => extent(),
        MEAN => mean(),
        MEDIAN => median(),
        UNIQUE => unique(),
        UNIQUE_COUNT => unique_count(),
        COUNT => count(),
        _ => return None,
    };
    Some(f)
}

/// Numbers sum and dates get their extent; other kinds are not aggregated.
pub(crate) fn auto_name_for(sample: &Value) -> Option<&'static str> {
    match sample {
        Value::Number(_) => Some(SUM),
        Value::DateTime(_) => Some(EXTENT),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_aggregation_by_sample() {
        assert_eq!(auto_name_for(&Value::from(3)), Some(SUM));
        assert_eq!(auto_name_for(&Value::from("x")), None);
        assert_eq!(auto_name_for(&Value::Empty), None);
    }

    #[test]
    fn test_builtin_names_resolve() {
        for name in [SUM, MIN, MAX, EXTENT, MEAN, MEDIAN, UNIQUE, UNIQUE_COUNT, COUNT] {
            assert!(builtin::<serde_json::Value>(name).is_some(), "{}", name);
        }
        assert!(builtin::<serde_json::Value>("total").is_none());
    }
}
