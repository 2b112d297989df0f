//! Named custom reductions
//!
//! A reduction is a pure function from a group's column values, in row
//! order, to one value. Cubes resolve custom measures against a registry
//! once, when they are built.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::schema::Value;

pub type Reduction = fn(&[Value]) -> Value;

#[derive(Clone, Default)]
pub struct ReductionRegistry {
    reductions: BTreeMap<String, Reduction>,
}

impl ReductionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `distinct_count`, `median` and `last`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("distinct_count", distinct_count);
        registry.register("median", median);
        registry.register("last", last);
        registry
    }

    /// Registers a reduction, replacing any previous one of that name
    pub fn register(&mut self, name: impl Into<String>, reduction: Reduction) {
        self.reductions.insert(name.into(), reduction);
    }

    pub fn get(&self, name: &str) -> Option<Reduction> {
        self.reductions.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.reductions.keys().map(String::as_str)
    }
}

impl fmt::Debug for ReductionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.reductions.keys()).finish()
    }
}

/// Number of distinct non-null values
fn distinct_count(values: &[Value]) -> Value {
    let distinct: BTreeSet<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    Value::Int(distinct.len() as i64)
}

/// Median of the numeric values, `Null` when there are none
fn median(values: &[Value]) -> Value {
    let mut numbers: Vec<f64> = values.iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return Value::Null;
    }
    numbers.sort_by(f64::total_cmp);
    let mid = numbers.len() / 2;
    if numbers.len() % 2 == 0 {
        Value::Double((numbers[mid - 1] + numbers[mid]) / 2.0)
    } else {
        Value::Double(numbers[mid])
    }
}

/// Last non-null value in row order
fn last(values: &[Value]) -> Value {
    values
        .iter()
        .rev()
        .find(|v| !v.is_null())
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins() {
        let registry = ReductionRegistry::with_builtins();
        let values = [Value::from("FR"), Value::from("ES"), Value::from("FR"), Value::Null];

        let distinct = registry.get("distinct_count").unwrap();
        assert_eq!(distinct(&values), Value::Int(2));

        let last = registry.get("last").unwrap();
        assert_eq!(last(&values), Value::from("FR"));
    }

    #[test]
    fn test_median() {
        let values = [Value::Double(3.0), Value::Int(1), Value::Double(10.0), Value::Int(2)];
        assert_eq!(median(&values), Value::Double(2.5));
        assert_eq!(median(&[]), Value::Null);
    }

    #[test]
    fn test_unknown_reduction() {
        assert!(ReductionRegistry::new().get("distinct_count").is_none());
    }
}
