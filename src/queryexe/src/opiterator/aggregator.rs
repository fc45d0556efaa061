use super::TupleIterator;
use common::{AggOp, CrustyError, DataType, Field, TableSchema, Tuple};
use std::collections::HashMap;

/// Accumulator chosen from the declared type of the aggregated field.
pub enum Aggregator {
    Integer(IntegerAggregator),
    String(StringAggregator),
}

impl Aggregator {
    /// Returns the aggregator able to compute `op` over a column of type `dtype`.
    ///
    /// # Arguments
    ///
    /// * `dtype` - Declared type of the aggregated field.
    /// * `agg_field` - Index of the field to aggregate.
    /// * `group_field` - Index of the field to group by, if any.
    /// * `op` - Aggregation to compute.
    /// * `schema` - Schema of the result tuples.
    pub fn for_field(
        dtype: &DataType,
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
        schema: TableSchema,
    ) -> Result<Self, CrustyError> {
        Self::check_op(dtype, op)?;
        Ok(match dtype {
            DataType::Int => {
                Aggregator::Integer(IntegerAggregator::new(agg_field, group_field, op, schema))
            }
            DataType::String => {
                Aggregator::String(StringAggregator::new(agg_field, group_field, op, schema)?)
            }
        })
    }

    /// Rejects ops the aggregator for `dtype` cannot compute.
    pub fn check_op(dtype: &DataType, op: AggOp) -> Result<(), CrustyError> {
        match (dtype, op) {
            (DataType::Int, _) | (DataType::String, AggOp::Count) => Ok(()),
            (DataType::String, op) => Err(CrustyError::ValidationError(format!(
                "{} is not supported over a string field",
                op
            ))),
        }
    }

    /// Merges a tuple into its group.
    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), CrustyError> {
        match self {
            Aggregator::Integer(agg) => agg.merge_tuple_into_group(tuple),
            Aggregator::String(agg) => agg.merge_tuple_into_group(tuple),
        }
    }

    /// Returns a fresh, unopened cursor over the results.
    pub fn iterator(&self) -> Result<TupleIterator, CrustyError> {
        match self {
            Aggregator::Integer(agg) => agg.iterator(),
            Aggregator::String(agg) => agg.iterator(),
        }
    }

    /// Number of groups merged so far.
    pub fn num_groups(&self) -> usize {
        match self {
            Aggregator::Integer(agg) => agg.groups.len(),
            Aggregator::String(agg) => agg.groups.len(),
        }
    }
}

/// Extracts the group key of `tuple`. Ungrouped aggregation uses the single key None.
fn group_key(tuple: &Tuple, group_field: Option<usize>) -> Result<Option<Field>, CrustyError> {
    match group_field {
        None => Ok(None),
        Some(i) => tuple.get_field(i).cloned().map(Some).ok_or_else(|| {
            CrustyError::ExecutionError(format!("tuple has no group field {}", i))
        }),
    }
}

/// Builds the result tuples from `(key, value)` pairs. Ungrouped aggregation over no
/// input still produces its single row.
fn result_tuples<I>(rows: I, grouped: bool) -> Vec<Tuple>
where
    I: Iterator<Item = (Option<Field>, Field)>,
{
    let mut tuples: Vec<Tuple> = rows
        .map(|(key, value)| match key {
            Some(key) => Tuple::new(vec![key, value]),
            None => Tuple::new(vec![value]),
        })
        .collect();
    if !grouped && tuples.is_empty() {
        tuples.push(Tuple::new(vec![Field::IntField(0)]));
    }
    tuples
}

fn to_int_field(value: i64, what: &str) -> Result<Field, CrustyError> {
    i32::try_from(value)
        .map(Field::IntField)
        .map_err(|_| CrustyError::ExecutionError(format!("{} {} overflows an int field", what, value)))
}

/// Running state of one integer group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct IntGroup {
    count: i64,
    sum: i64,
    min: i32,
    max: i32,
}

impl IntGroup {
    fn new(value: i32) -> Self {
        Self {
            count: 1,
            sum: i64::from(value),
            min: value,
            max: value,
        }
    }

    fn add(&mut self, value: i32) {
        self.count += 1;
        self.sum += i64::from(value);
        self.min = self.min.min(value);
        self.max = self.max.max(value);
    }

    fn result(&self, op: AggOp) -> Result<Field, CrustyError> {
        match op {
            AggOp::Count => to_int_field(self.count, "count"),
            AggOp::Sum => to_int_field(self.sum, "sum"),
            AggOp::Avg => to_int_field(self.sum / self.count, "average"),
            AggOp::Min => Ok(Field::IntField(self.min)),
            AggOp::Max => Ok(Field::IntField(self.max)),
        }
    }
}

/// Computes count, sum, average, min and max over an integer field.
pub struct IntegerAggregator {
    agg_field: usize,
    group_field: Option<usize>,
    op: AggOp,
    /// Schema of the output.
    schema: TableSchema,
    groups: HashMap<Option<Field>, IntGroup>,
}

impl IntegerAggregator {
    pub fn new(
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
        schema: TableSchema,
    ) -> Self {
        Self {
            agg_field,
            group_field,
            op,
            schema,
            groups: HashMap::new(),
        }
    }

    /// Handles the creation of groups for aggregation.
    ///
    /// If a group exists, then merge the tuple into the group's accumulated value.
    /// Otherwise, create a new group aggregate result.
    ///
    /// # Errors
    ///
    /// `ExecutionError` if the aggregated field is missing or not an int.
    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), CrustyError> {
        let value = match tuple.get_field(self.agg_field) {
            Some(Field::IntField(v)) => *v,
            Some(other) => {
                return Err(CrustyError::ExecutionError(format!(
                    "expected an int in field {}, found {}",
                    self.agg_field, other
                )))
            }
            None => {
                return Err(CrustyError::ExecutionError(format!(
                    "tuple has no aggregate field {}",
                    self.agg_field
                )))
            }
        };
        let key = group_key(tuple, self.group_field)?;
        self.groups
            .entry(key)
            .and_modify(|group| group.add(value))
            .or_insert_with(|| IntGroup::new(value));
        Ok(())
    }

    /// Returns a `TupleIterator` over the results.
    ///
    /// Resulting tuples are of the form (group by field, aggregate) or (aggregate).
    pub fn iterator(&self) -> Result<TupleIterator, CrustyError> {
        let rows = self
            .groups
            .iter()
            .map(|(key, group)| Ok((key.clone(), group.result(self.op)?)))
            .collect::<Result<Vec<_>, CrustyError>>()?;
        let tuples = result_tuples(rows.into_iter(), self.group_field.is_some());
        Ok(TupleIterator::new(tuples, self.schema.clone()))
    }
}

/// Counts the values of a string field.
pub struct StringAggregator {
    agg_field: usize,
    group_field: Option<usize>,
    /// Schema of the output.
    schema: TableSchema,
    groups: HashMap<Option<Field>, i64>,
}

impl StringAggregator {
    /// # Errors
    ///
    /// `ValidationError` for any op other than count.
    pub fn new(
        agg_field: usize,
        group_field: Option<usize>,
        op: AggOp,
        schema: TableSchema,
    ) -> Result<Self, CrustyError> {
        Aggregator::check_op(&DataType::String, op)?;
        Ok(Self {
            agg_field,
            group_field,
            schema,
            groups: HashMap::new(),
        })
    }

    /// Merges a tuple into its group.
    ///
    /// # Errors
    ///
    /// `ExecutionError` if the aggregated field is missing or not a string.
    pub fn merge_tuple_into_group(&mut self, tuple: &Tuple) -> Result<(), CrustyError> {
        match tuple.get_field(self.agg_field) {
            Some(Field::StringField(_)) => {}
            Some(other) => {
                return Err(CrustyError::ExecutionError(format!(
                    "expected a string in field {}, found {}",
                    self.agg_field, other
                )))
            }
            None => {
                return Err(CrustyError::ExecutionError(format!(
                    "tuple has no aggregate field {}",
                    self.agg_field
                )))
            }
        }
        let key = group_key(tuple, self.group_field)?;
        *self.groups.entry(key).or_insert(0) += 1;
        Ok(())
    }

    /// Returns a `TupleIterator` over the results.
    pub fn iterator(&self) -> Result<TupleIterator, CrustyError> {
        let rows = self
            .groups
            .iter()
            .map(|(key, count)| Ok((key.clone(), to_int_field(*count, "count")?)))
            .collect::<Result<Vec<_>, CrustyError>>()?;
        let tuples = result_tuples(rows.into_iter(), self.group_field.is_some());
        Ok(TupleIterator::new(tuples, self.schema.clone()))
    }
}

#[cfg(test)]
mod test {
    use super::super::testutil::*;
    use super::super::OpIterator;
    use super::*;
    use common::testutil::*;

    fn int_schema(width: usize) -> TableSchema {
        get_int_table_schema(width)
    }

    /// Set up testing aggregations without grouping.
    ///
    /// # Arguments
    ///
    /// * `op` - Aggregation Operation.
    /// * `field` - Field do aggregation operation over.
    /// * `expected` - The expected result.
    fn test_no_group(op: AggOp, field: usize, expected: i32) -> Result<(), CrustyError> {
        let dtype = aggregate_schema()
            .get_attribute(field)
            .map(|a| a.dtype().clone())
            .unwrap();
        let mut agg = Aggregator::for_field(&dtype, field, None, op, int_schema(1))?;
        for t in &aggregate_tuples() {
            agg.merge_tuple_into_group(t)?;
        }

        let mut ai = agg.iterator()?;
        ai.open()?;
        assert_eq!(
            Field::IntField(expected),
            *ai.next()?.unwrap().get_field(0).unwrap()
        );
        assert_eq!(None, ai.next()?);
        Ok(())
    }

    /// Aggregates `aggregate_tuples` grouped by `group`, sorted by group key.
    fn grouped(op: AggOp, field: usize, group: usize) -> Result<Vec<Vec<Field>>, CrustyError> {
        let dtype = aggregate_schema()
            .get_attribute(field)
            .map(|a| a.dtype().clone())
            .unwrap();
        let mut agg = Aggregator::for_field(&dtype, field, Some(group), op, int_schema(2))?;
        for t in &aggregate_tuples() {
            agg.merge_tuple_into_group(t)?;
        }
        let mut rows = iter_to_vec(&mut agg.iterator()?)?;
        rows.sort();
        Ok(rows)
    }

    #[test]
    fn test_merge_tuples_count() -> Result<(), CrustyError> {
        test_no_group(AggOp::Count, 0, 6)
    }

    #[test]
    fn test_merge_tuples_sum() -> Result<(), CrustyError> {
        test_no_group(AggOp::Sum, 1, 9)
    }

    #[test]
    fn test_merge_tuples_max() -> Result<(), CrustyError> {
        test_no_group(AggOp::Max, 0, 6)
    }

    #[test]
    fn test_merge_tuples_min() -> Result<(), CrustyError> {
        test_no_group(AggOp::Min, 0, 1)
    }

    #[test]
    fn test_merge_tuples_avg() -> Result<(), CrustyError> {
        test_no_group(AggOp::Avg, 0, 3)
    }

    #[test]
    fn test_merge_tuples_count_strings() -> Result<(), CrustyError> {
        test_no_group(AggOp::Count, 3, 6)
    }

    #[test]
    fn test_string_rejects_non_count() {
        for op in &[AggOp::Sum, AggOp::Avg, AggOp::Min, AggOp::Max] {
            let res = Aggregator::for_field(&DataType::String, 3, None, *op, int_schema(1));
            assert!(matches!(res, Err(CrustyError::ValidationError(_))));
        }
    }

    #[test]
    fn test_merge_tuples_not_int() -> Result<(), CrustyError> {
        let mut agg = Aggregator::for_field(&DataType::Int, 3, None, AggOp::Avg, int_schema(1))?;
        let res = agg.merge_tuple_into_group(&aggregate_tuples()[0]);
        assert!(matches!(res, Err(CrustyError::ExecutionError(_))));
        Ok(())
    }

    #[test]
    fn test_merge_tuples_not_string() -> Result<(), CrustyError> {
        let mut agg =
            Aggregator::for_field(&DataType::String, 0, None, AggOp::Count, int_schema(1))?;
        let res = agg.merge_tuple_into_group(&aggregate_tuples()[0]);
        assert!(matches!(res, Err(CrustyError::ExecutionError(_))));
        Ok(())
    }

    #[test]
    fn test_missing_fields() -> Result<(), CrustyError> {
        let short = int_vec_to_tuple(vec![1]);
        let mut agg = Aggregator::for_field(&DataType::Int, 2, None, AggOp::Sum, int_schema(1))?;
        assert!(agg.merge_tuple_into_group(&short).is_err());
        let mut agg =
            Aggregator::for_field(&DataType::Int, 0, Some(4), AggOp::Sum, int_schema(2))?;
        assert!(agg.merge_tuple_into_group(&short).is_err());
        assert_eq!(0, agg.num_groups());
        Ok(())
    }

    #[test]
    fn test_merge_tuples_one_group() -> Result<(), CrustyError> {
        let rows = grouped(AggOp::Sum, 0, 2)?;
        let expected = vec![
            vec![Field::IntField(3), Field::IntField(3)],
            vec![Field::IntField(4), Field::IntField(7)],
            vec![Field::IntField(5), Field::IntField(11)],
        ];
        assert_eq!(expected, rows);
        Ok(())
    }

    #[test]
    fn test_group_by_string() -> Result<(), CrustyError> {
        let rows = grouped(AggOp::Count, 0, 3)?;
        let expected = vec![
            vec![Field::StringField("A".to_string()), Field::IntField(1)],
            vec![Field::StringField("E".to_string()), Field::IntField(1)],
            vec![Field::StringField("G".to_string()), Field::IntField(4)],
        ];
        assert_eq!(expected, rows);
        Ok(())
    }

    #[test]
    fn test_count_strings_by_int() -> Result<(), CrustyError> {
        let rows = grouped(AggOp::Count, 3, 1)?;
        let expected = vec![
            vec![Field::IntField(1), Field::IntField(3)],
            vec![Field::IntField(2), Field::IntField(3)],
        ];
        assert_eq!(expected, rows);
        Ok(())
    }

    #[test]
    fn test_grouped_min_max_avg() -> Result<(), CrustyError> {
        let min = grouped(AggOp::Min, 0, 1)?;
        assert_eq!(vec![Field::IntField(1), Field::IntField(1)], min[0]);
        assert_eq!(vec![Field::IntField(2), Field::IntField(4)], min[1]);
        let max = grouped(AggOp::Max, 0, 1)?;
        assert_eq!(vec![Field::IntField(1), Field::IntField(3)], max[0]);
        assert_eq!(vec![Field::IntField(2), Field::IntField(6)], max[1]);
        let avg = grouped(AggOp::Avg, 2, 1)?;
        // (3 + 3 + 4) / 3 and (4 + 5 + 5) / 3, truncated.
        assert_eq!(vec![Field::IntField(1), Field::IntField(3)], avg[0]);
        assert_eq!(vec![Field::IntField(2), Field::IntField(4)], avg[1]);
        Ok(())
    }

    #[test]
    fn test_avg_truncates_toward_zero() -> Result<(), CrustyError> {
        let mut agg = Aggregator::for_field(&DataType::Int, 0, None, AggOp::Avg, int_schema(1))?;
        for v in &[-3, -4] {
            agg.merge_tuple_into_group(&int_vec_to_tuple(vec![*v]))?;
        }
        let rows = iter_to_vec(&mut agg.iterator()?)?;
        assert_eq!(vec![vec![Field::IntField(-3)]], rows);
        Ok(())
    }

    #[test]
    fn test_sum_overflow() -> Result<(), CrustyError> {
        let mut agg = Aggregator::for_field(&DataType::Int, 0, None, AggOp::Sum, int_schema(1))?;
        for _ in 0..2 {
            agg.merge_tuple_into_group(&int_vec_to_tuple(vec![i32::MAX]))?;
        }
        assert!(matches!(
            agg.iterator(),
            Err(CrustyError::ExecutionError(_))
        ));

        // The running sum is wide enough for the average to still fit.
        let mut agg = Aggregator::for_field(&DataType::Int, 0, None, AggOp::Avg, int_schema(1))?;
        for _ in 0..2 {
            agg.merge_tuple_into_group(&int_vec_to_tuple(vec![i32::MAX]))?;
        }
        let rows = iter_to_vec(&mut agg.iterator()?)?;
        assert_eq!(vec![vec![Field::IntField(i32::MAX)]], rows);
        Ok(())
    }

    #[test]
    fn test_empty_input() -> Result<(), CrustyError> {
        for op in &[AggOp::Count, AggOp::Sum, AggOp::Avg, AggOp::Min, AggOp::Max] {
            let agg = Aggregator::for_field(&DataType::Int, 0, None, *op, int_schema(1))?;
            let rows = iter_to_vec(&mut agg.iterator()?)?;
            assert_eq!(vec![vec![Field::IntField(0)]], rows);

            let agg = Aggregator::for_field(&DataType::Int, 0, Some(1), *op, int_schema(2))?;
            assert!(agg.iterator()?.is_empty());
        }
        let agg = Aggregator::for_field(&DataType::String, 0, None, AggOp::Count, int_schema(1))?;
        assert_eq!(vec![vec![Field::IntField(0)]], iter_to_vec(&mut agg.iterator()?)?);
        Ok(())
    }

    #[test]
    fn test_iterator_is_repeatable() -> Result<(), CrustyError> {
        let mut agg = Aggregator::for_field(&DataType::Int, 0, Some(1), AggOp::Sum, int_schema(2))?;
        for t in &aggregate_tuples() {
            agg.merge_tuple_into_group(t)?;
        }
        let mut first = iter_to_vec(&mut agg.iterator()?)?;
        let mut second = iter_to_vec(&mut agg.iterator()?)?;
        first.sort();
        second.sort();
        assert_eq!(first, second);
        assert_eq!(2, agg.num_groups());
        let mut it = agg.iterator()?;
        it.open()?;
        assert_eq!(2, num_tuples(&mut it)?);
        Ok(())
    }
}
