//! Mergeable partial aggregates
//!
//! One accumulator per (group, measure). Accumulators of the same measure
//! merge, so a grand total is the merge of every group.

use crate::cube::{AggregationKind, Measure};
use crate::schema::{FieldType, Value};

use super::registry::Reduction;

#[derive(Debug, Clone)]
pub(crate) enum Accumulator {
    Count(u64),
    Sum {
        total: f64,
        /// Exact integer total; `None` once it overflows
        int_total: Option<i64>,
        integral: bool,
        nulls: u64,
    },
    Average {
        total: f64,
        count: u64,
        nulls: u64,
    },
    Min(Option<Value>),
    Max(Option<Value>),
    /// Values tagged with their row index, so merged groups keep row order
    Custom {
        reduction: Reduction,
        values: Vec<(usize, Value)>,
    },
}

impl Accumulator {
    pub(crate) fn new(measure: &Measure) -> Self {
        match measure.kind() {
            AggregationKind::Count => Accumulator::Count(0),
            AggregationKind::Sum { .. } => Accumulator::Sum {
                total: 0.0,
                int_total: Some(0),
                integral: measure.column_type() == Some(FieldType::Int),
                nulls: 0,
            },
            AggregationKind::Average { .. } => Accumulator::Average {
                total: 0.0,
                count: 0,
                nulls: 0,
            },
            AggregationKind::Min { .. } => Accumulator::Min(None),
            AggregationKind::Max { .. } => Accumulator::Max(None),
            AggregationKind::Custom { .. } => Accumulator::Custom {
                reduction: measure.reduction().unwrap_or(null_reduction),
                values: Vec::new(),
            },
        }
    }

    /// Folds in the measure's value for one fact row
    pub(crate) fn accumulate(&mut self, row_index: usize, value: Option<&Value>) {
        let value = value.unwrap_or(&Value::Null);
        match self {
            Accumulator::Count(count) => *count += 1,
            Accumulator::Sum {
                total,
                int_total,
                nulls,
                ..
            } => match value {
                Value::Int(i) => {
                    *total += *i as f64;
                    *int_total = int_total.and_then(|t| t.checked_add(*i));
                }
                Value::Double(d) => *total += d,
                _ => *nulls += 1,
            },
            Accumulator::Average {
                total,
                count,
                nulls,
            } => match value.as_f64() {
                Some(v) => {
                    *total += v;
                    *count += 1;
                }
                None => *nulls += 1,
            },
            Accumulator::Min(current) => {
                if !value.is_null() && current.as_ref().map_or(true, |c| value < c) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Max(current) => {
                if !value.is_null() && current.as_ref().map_or(true, |c| value > c) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Custom { values, .. } => values.push((row_index, value.clone())),
        }
    }

    /// Merges another accumulator of the same measure into this one
    pub(crate) fn merge(&mut self, other: &Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += b,
            (
                Accumulator::Sum {
                    total,
                    int_total,
                    nulls,
                    ..
                },
                Accumulator::Sum {
                    total: other_total,
                    int_total: other_int,
                    nulls: other_nulls,
                    ..
                },
            ) => {
                *total += other_total;
                *int_total = int_total.zip(*other_int).and_then(|(a, b)| a.checked_add(b));
                *nulls += other_nulls;
            }
            (
                Accumulator::Average {
                    total,
                    count,
                    nulls,
                },
                Accumulator::Average {
                    total: other_total,
                    count: other_count,
                    nulls: other_nulls,
                },
            ) => {
                *total += other_total;
                *count += other_count;
                *nulls += other_nulls;
            }
            (Accumulator::Min(a), Accumulator::Min(Some(b))) => {
                if a.as_ref().map_or(true, |a| b < a) {
                    *a = Some(b.clone());
                }
            }
            (Accumulator::Max(a), Accumulator::Max(Some(b))) => {
                if a.as_ref().map_or(true, |a| b > a) {
                    *a = Some(b.clone());
                }
            }
            (Accumulator::Custom { values, .. }, Accumulator::Custom { values: other, .. }) => {
                values.extend(other.iter().cloned());
            }
            _ => {}
        }
    }

    /// Null values met by sums and averages
    pub(crate) fn nulls(&self) -> u64 {
        match self {
            Accumulator::Sum { nulls, .. } | Accumulator::Average { nulls, .. } => *nulls,
            _ => 0,
        }
    }

    pub(crate) fn finish(&self) -> Value {
        match self {
            Accumulator::Count(count) => Value::Int(*count as i64),
            Accumulator::Sum {
                total,
                int_total,
                integral,
                ..
            } => match (integral, int_total) {
                (true, Some(exact)) => Value::Int(*exact),
                _ => Value::Double(*total),
            },
            Accumulator::Average { total, count, .. } => {
                if *count == 0 {
                    Value::Null
                } else {
                    Value::Double(total / *count as f64)
                }
            }
            Accumulator::Min(value) | Accumulator::Max(value) => {
                value.clone().unwrap_or(Value::Null)
            }
            Accumulator::Custom { reduction, values } => {
                let mut ordered = values.clone();
                ordered.sort_by_key(|(row, _)| *row);
                let values: Vec<Value> = ordered.into_iter().map(|(_, v)| v).collect();
                reduction(&values)
            }
        }
    }
}

fn null_reduction(_: &[Value]) -> Value {
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(integral: bool) -> Accumulator {
        Accumulator::Sum {
            total: 0.0,
            int_total: Some(0),
            integral,
            nulls: 0,
        }
    }

    #[test]
    fn test_sum_counts_nulls_as_zero() {
        let mut acc = sum(false);
        acc.accumulate(0, Some(&Value::Double(2790.0)));
        acc.accumulate(1, Some(&Value::Null));
        acc.accumulate(2, Some(&Value::Double(10.0)));
        assert_eq!(acc.finish(), Value::Double(2800.0));
        assert_eq!(acc.nulls(), 1);
    }

    #[test]
    fn test_integral_sum_stays_int() {
        let mut acc = sum(true);
        acc.accumulate(0, Some(&Value::Int(2)));
        acc.accumulate(1, Some(&Value::Int(3)));
        assert_eq!(acc.finish(), Value::Int(5));
    }

    #[test]
    fn test_empty_average_is_null() {
        let mut acc = Accumulator::Average {
            total: 0.0,
            count: 0,
            nulls: 0,
        };
        assert_eq!(acc.finish(), Value::Null);
        acc.accumulate(0, Some(&Value::Null));
        assert_eq!(acc.finish(), Value::Null);
        assert_eq!(acc.nulls(), 1);
    }

    #[test]
    fn test_merge_min_max() {
        let mut a = Accumulator::Min(None);
        a.accumulate(0, Some(&Value::Int(5)));
        let mut b = Accumulator::Min(None);
        b.accumulate(1, Some(&Value::Int(3)));
        b.accumulate(2, Some(&Value::Null));
        a.merge(&b);
        assert_eq!(a.finish(), Value::Int(3));

        let mut max = Accumulator::Max(None);
        max.merge(&Accumulator::Max(Some(Value::Double(1.5))));
        assert_eq!(max.finish(), Value::Double(1.5));
    }

    #[test]
    fn test_merged_custom_keeps_row_order() {
        fn first(values: &[Value]) -> Value {
            values.first().cloned().unwrap_or(Value::Null)
        }
        let mut late = Accumulator::Custom {
            reduction: first,
            values: Vec::new(),
        };
        late.accumulate(7, Some(&Value::from("late")));
        let mut early = Accumulator::Custom {
            reduction: first,
            values: Vec::new(),
        };
        early.accumulate(1, Some(&Value::from("early")));

        late.merge(&early);
        assert_eq!(late.finish(), Value::from("early"));
    }

    #[test]
    fn test_count_merge() {
        let mut a = Accumulator::Count(0);
        a.accumulate(0, None);
        a.accumulate(1, None);
        a.merge(&Accumulator::Count(3));
        assert_eq!(a.finish(), Value::Int(5));
    }
}
