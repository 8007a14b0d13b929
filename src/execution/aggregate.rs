use std::{collections::HashMap, fmt};

use crate::{
    error::SmallError,
    execution::op_iterator::{BoxedOp, OpIterator},
    storage::{
        schema::{FieldItem, Schema, Type},
        tuple::{Cell, Tuple},
    },
    types::SmallResult,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AggregateOp {
    Min,
    Max,
    Sum,
    Avg,
    Count,
}

impl AggregateOp {
    /// Everything except COUNT needs an integer aggregate field.
    fn is_numeric(&self) -> bool {
        !matches!(self, AggregateOp::Count)
    }
}

impl fmt::Display for AggregateOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            AggregateOp::Min => "min",
            AggregateOp::Max => "max",
            AggregateOp::Sum => "sum",
            AggregateOp::Avg => "avg",
            AggregateOp::Count => "count",
        };
        write!(f, "{}", name)
    }
}

// Sum and count are tracked separately so that AVG is computed from the
// true accumulators at emission, never from a running average.
struct AggState {
    sum: i64,
    count: i64,
    min: i32,
    max: i32,
}

impl AggState {
    fn new() -> Self {
        Self {
            sum: 0,
            count: 0,
            min: i32::MAX,
            max: i32::MIN,
        }
    }

    fn merge_int(&mut self, v: i32) {
        self.sum += v as i64;
        self.count += 1;
        self.min = self.min.min(v);
        self.max = self.max.max(v);
    }

    fn merge_any(&mut self) {
        self.count += 1;
    }

    fn emit(&self, op: AggregateOp) -> i32 {
        match op {
            AggregateOp::Min => self.min,
            AggregateOp::Max => self.max,
            AggregateOp::Sum => self.sum as i32,
            // integer floor of sum / count
            AggregateOp::Avg => self.sum.div_euclid(self.count) as i32,
            AggregateOp::Count => self.count as i32,
        }
    }
}

/// Grouped aggregation state: feed tuples with `merge`, then read the
/// result rows back with `results`.
///
/// Without a group-by field every tuple lands in one synthetic group and
/// the output is a single `(aggregate_val)` row; with one, the output has
/// a `(group_val, aggregate_val)` row per group, in no particular order.
pub struct Aggregator {
    op: AggregateOp,
    group_by: Option<(usize, Type)>,
    agg_field: usize,
    agg_type: Type,
    groups: HashMap<Option<Cell>, AggState>,
}

impl Aggregator {
    pub fn new(
        op: AggregateOp,
        group_by: Option<(usize, Type)>,
        agg_field: usize,
        agg_type: Type,
    ) -> Result<Self, SmallError> {
        if op.is_numeric() && !matches!(agg_type, Type::Int32) {
            return Err(SmallError::UnsupportedOp(format!(
                "{} over a {:?} field",
                op, agg_type
            )));
        }

        Ok(Self {
            op,
            group_by,
            agg_field,
            agg_type,
            groups: HashMap::new(),
        })
    }

    pub fn merge(&mut self, tuple: &Tuple) -> SmallResult {
        let group_key = match self.group_by {
            Some((i, group_type)) => {
                let cell = tuple.get_cell(i);
                if !cell.matches_type(&group_type) {
                    return Err(SmallError::TypeMismatch(format!(
                        "group-by cell {:?} does not fit type {:?}",
                        cell, group_type
                    )));
                }
                Some(cell)
            }
            None => None,
        };

        let agg_cell = tuple.get_cell(self.agg_field);
        if !agg_cell.matches_type(&self.agg_type) {
            return Err(SmallError::TypeMismatch(format!(
                "aggregate cell {:?} does not fit type {:?}",
                agg_cell, self.agg_type
            )));
        }

        let state = self.groups.entry(group_key).or_insert_with(AggState::new);
        match agg_cell {
            Cell::Int32(v) => state.merge_int(v),
            _ => state.merge_any(),
        }
        Ok(())
    }

    pub fn result_schema(&self) -> Schema {
        match self.group_by {
            Some((_, group_type)) => Schema::new(vec![
                FieldItem::new("group_val", group_type),
                FieldItem::new("aggregate_val", Type::Int32),
            ]),
            None => Schema::new(vec![FieldItem::new("aggregate_val", Type::Int32)]),
        }
    }

    /// The result rows accumulated so far. Group order is unspecified.
    pub fn results(&self) -> Vec<Tuple> {
        self.groups
            .iter()
            .map(|(group_key, state)| {
                let value = Cell::Int32(state.emit(self.op));
                match group_key {
                    Some(group_cell) => Tuple::new_from_cells(&[group_cell.clone(), value]),
                    None => Tuple::new_from_cells(&[value]),
                }
            })
            .collect()
    }
}

/// The operator shell around `Aggregator`: drains its child on `open`,
/// then iterates the result rows.
pub struct Aggregate {
    child: BoxedOp,
    aggregator: Aggregator,
    schema: Schema,
    results: Vec<Tuple>,
    cursor: usize,
    opened: bool,
}

impl Aggregate {
    pub fn new(
        child: BoxedOp,
        op: AggregateOp,
        group_field: Option<usize>,
        agg_field: usize,
    ) -> Result<Self, SmallError> {
        let child_schema = child.get_schema();
        let group_by = group_field.map(|i| (i, child_schema.get_field_type(i)));
        let agg_type = child_schema.get_field_type(agg_field);

        let aggregator = Aggregator::new(op, group_by, agg_field, agg_type)?;
        let schema = aggregator.result_schema();

        Ok(Self {
            child,
            aggregator,
            schema,
            results: Vec::new(),
            cursor: 0,
            opened: false,
        })
    }
}

impl OpIterator for Aggregate {
    fn open(&mut self) -> SmallResult {
        self.child.open()?;

        while self.child.has_next()? {
            let tuple = self.child.next()?;
            self.aggregator.merge(&tuple)?;
        }

        self.results = self.aggregator.results();
        self.cursor = 0;
        self.opened = true;
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool, SmallError> {
        Ok(self.opened && self.cursor < self.results.len())
    }

    fn next(&mut self) -> Result<Tuple, SmallError> {
        if !self.has_next()? {
            panic!("next() called on an exhausted operator");
        }

        let tuple = self.results[self.cursor].clone();
        self.cursor += 1;
        Ok(tuple)
    }

    fn rewind(&mut self) -> SmallResult {
        self.cursor = 0;
        Ok(())
    }

    fn close(&mut self) {
        self.child.close();
        self.results.clear();
        self.cursor = 0;
        self.opened = false;
    }

    fn get_schema(&self) -> &Schema {
        &self.schema
    }

    fn children(&mut self) -> Vec<&mut BoxedOp> {
        vec![&mut self.child]
    }

    fn set_children(&mut self, mut children: Vec<BoxedOp>) {
        self.child = children.remove(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_tuple(values: &[i32]) -> Tuple {
        let cells: Vec<Cell> = values.iter().map(|v| Cell::Int32(*v)).collect();
        Tuple::new_from_cells(&cells)
    }

    #[test]
    fn test_ungrouped_semantics() {
        let values = [3, -1, 4, 1, 5, -9, 2, 6];

        for (op, expect) in [
            (AggregateOp::Sum, 11),
            (AggregateOp::Count, 8),
            (AggregateOp::Min, -9),
            (AggregateOp::Max, 6),
            // floor(11 / 8) = 1
            (AggregateOp::Avg, 1),
        ]
        .iter()
        {
            let mut aggregator = Aggregator::new(*op, None, 0, Type::Int32).unwrap();
            for v in values.iter() {
                aggregator.merge(&int_tuple(&[*v])).unwrap();
            }

            let results = aggregator.results();
            assert_eq!(results.len(), 1);
            assert_eq!(results[0].get_cell(0), Cell::Int32(*expect), "op: {}", op);
        }
    }

    #[test]
    fn test_avg_floors_negative() {
        let mut aggregator = Aggregator::new(AggregateOp::Avg, None, 0, Type::Int32).unwrap();
        aggregator.merge(&int_tuple(&[-3])).unwrap();
        aggregator.merge(&int_tuple(&[-4])).unwrap();

        // floor(-7 / 2) = -4
        let results = aggregator.results();
        assert_eq!(results[0].get_cell(0), Cell::Int32(-4));
    }

    #[test]
    fn test_grouped_sum_by_string() {
        let mut aggregator = Aggregator::new(
            AggregateOp::Sum,
            Some((0, Type::Char(8))),
            1,
            Type::Int32,
        )
        .unwrap();

        for (group, v) in [("a", 1), ("b", 2), ("a", 3)].iter() {
            let tuple = Tuple::new_from_cells(&[Cell::new_string(group), Cell::Int32(*v)]);
            aggregator.merge(&tuple).unwrap();
        }

        assert_eq!(
            aggregator.result_schema(),
            Schema::new(vec![
                FieldItem::new("group_val", Type::Char(8)),
                FieldItem::new("aggregate_val", Type::Int32),
            ])
        );

        let mut results: Vec<(String, i32)> = aggregator
            .results()
            .iter()
            .map(|tuple| {
                (
                    tuple.get_cell(0).get_string().unwrap().to_string(),
                    tuple.get_cell(1).get_int32().unwrap(),
                )
            })
            .collect();
        results.sort();
        assert_eq!(results, vec![("a".to_string(), 4), ("b".to_string(), 2)]);
    }

    #[test]
    fn test_count_over_strings() {
        let mut aggregator =
            Aggregator::new(AggregateOp::Count, None, 0, Type::Char(8)).unwrap();
        for s in ["x", "y", "z"].iter() {
            aggregator
                .merge(&Tuple::new_from_cells(&[Cell::new_string(s)]))
                .unwrap();
        }

        let results = aggregator.results();
        assert_eq!(results[0].get_cell(0), Cell::Int32(3));
    }

    #[test]
    fn test_numeric_op_over_string_rejected() {
        match Aggregator::new(AggregateOp::Sum, None, 0, Type::Char(8)) {
            Err(SmallError::UnsupportedOp(_)) => {}
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }

    #[test]
    fn test_group_type_mismatch_rejected() {
        let mut aggregator = Aggregator::new(
            AggregateOp::Sum,
            Some((0, Type::Char(8))),
            1,
            Type::Int32,
        )
        .unwrap();

        let tuple = int_tuple(&[7, 7]);
        match aggregator.merge(&tuple) {
            Err(SmallError::TypeMismatch(_)) => {}
            other => panic!("unexpected result: {:?}", other.err()),
        }
    }
}
