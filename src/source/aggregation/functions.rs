//! # Aggregator Functions
//!
//! | Function | Input | Value slots |
//! |----------|-------|-------------|
//! | `count` | none | LONG |
//! | `sum` | integral / DATE | LONG |
//! | `sum` | FLOAT / DOUBLE | DOUBLE |
//! | `avg` | numeric | `$sum` DOUBLE, `$count` LONG, then the visible DOUBLE |
//! | `first`, `last` | fixed-width, not SYMBOL | same type as input |
//! | `min`, `max` | numeric | same type as input |
//!
//! Slots start zeroed; functions that need another starting value check
//! [`MapValues::is_new`].

use eyre::{bail, ensure, Result};

use super::AggregatorFunction;
use crate::map::{MapRecordValueInterceptor, MapValues};
use crate::records::{Record, RecordMetadata};
use crate::types::{ColumnMetadata, ColumnType};

/// Input column binding shared by the unary aggregators.
#[derive(Debug, Clone)]
struct Target {
    column: String,
    alias: Option<String>,
    col: usize,
    column_type: ColumnType,
    index: usize,
}

impl Target {
    fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            alias: None,
            col: 0,
            column_type: ColumnType::Double,
            index: 0,
        }
    }

    fn resolve(&mut self, metadata: &RecordMetadata, index: usize) -> Result<()> {
        self.col = metadata.column_index(&self.column)?;
        self.column_type = metadata.column_type(self.col);
        self.index = index;
        Ok(())
    }

    fn name(&self, function: &str) -> String {
        self.alias.clone().unwrap_or_else(|| function.to_owned())
    }
}

fn read_long(record: &dyn Record, col: usize, column_type: ColumnType) -> i64 {
    match column_type {
        ColumnType::Byte => record.get_byte(col) as i64,
        ColumnType::Short => record.get_short(col) as i64,
        ColumnType::Int => record.get_int(col) as i64,
        ColumnType::Date => record.get_date(col),
        _ => record.get_long(col),
    }
}

fn read_double(record: &dyn Record, col: usize, column_type: ColumnType) -> f64 {
    match column_type {
        ColumnType::Float => record.get_float(col) as f64,
        ColumnType::Double => record.get_double(col),
        other => read_long(record, col, other) as f64,
    }
}

fn is_floating(column_type: ColumnType) -> bool {
    matches!(column_type, ColumnType::Float | ColumnType::Double)
}

/// Copies a fixed-width column into a slot of the same type.
fn copy_value(record: &dyn Record, col: usize, column_type: ColumnType, values: &mut MapValues<'_>, index: usize) {
    match column_type {
        ColumnType::Boolean => values.put_bool(index, record.get_bool(col)),
        ColumnType::Byte => values.put_byte(index, record.get_byte(col)),
        ColumnType::Short => values.put_short(index, record.get_short(col)),
        ColumnType::Int | ColumnType::Symbol => values.put_int(index, record.get_int(col)),
        ColumnType::Long => values.put_long(index, record.get_long(col)),
        ColumnType::Float => values.put_float(index, record.get_float(col)),
        ColumnType::Double => values.put_double(index, record.get_double(col)),
        ColumnType::Date => values.put_date(index, record.get_date(col)),
        ColumnType::String | ColumnType::Binary => {}
    }
}

fn slot_long(values: &MapValues<'_>, index: usize, column_type: ColumnType) -> i64 {
    match column_type {
        ColumnType::Byte => values.get_byte(index) as i64,
        ColumnType::Short => values.get_short(index) as i64,
        ColumnType::Int => values.get_int(index) as i64,
        ColumnType::Date => values.get_date(index),
        _ => values.get_long(index),
    }
}

fn slot_double(values: &MapValues<'_>, index: usize, column_type: ColumnType) -> f64 {
    match column_type {
        ColumnType::Float => values.get_float(index) as f64,
        _ => values.get_double(index),
    }
}

/// Number of rows per group.
#[derive(Debug, Clone, Default)]
pub struct CountAggregator {
    alias: Option<String>,
    index: usize,
}

impl CountAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl AggregatorFunction for CountAggregator {
    fn prepare(
        &mut self,
        _metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        self.index = first_value_index;
        let name = self.alias.clone().unwrap_or_else(|| "count".to_owned());
        columns.push(ColumnMetadata::new(name, ColumnType::Long));
        Ok(())
    }

    fn calculate(&mut self, _record: &dyn Record, values: &mut MapValues<'_>) {
        let count = values.get_long(self.index);
        values.put_long(self.index, count + 1);
    }
}

macro_rules! unary_aggregator {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone)]
        pub struct $name {
            target: Target,
        }

        impl $name {
            pub fn new(column: impl Into<String>) -> Self {
                Self {
                    target: Target::new(column),
                }
            }

            pub fn alias(mut self, alias: impl Into<String>) -> Self {
                self.target.alias = Some(alias.into());
                self
            }
        }
    };
}

unary_aggregator!(
    /// Sum per group; integral inputs fold into LONG, floating into DOUBLE.
    SumAggregator
);
unary_aggregator!(
    /// Arithmetic mean per group, finalized when the group is read.
    AvgAggregator
);
unary_aggregator!(
    /// Value of the first row seen per group.
    FirstAggregator
);
unary_aggregator!(
    /// Value of the last row seen per group.
    LastAggregator
);
unary_aggregator!(
    /// Smallest value per group.
    MinAggregator
);
unary_aggregator!(
    /// Largest value per group.
    MaxAggregator
);

impl AggregatorFunction for SumAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        self.target.resolve(metadata, first_value_index)?;
        let ty = self.target.column_type;
        ensure!(ty.is_numeric(), "sum() does not support {} column {}", ty, self.target.column);
        let slot = if is_floating(ty) { ColumnType::Double } else { ColumnType::Long };
        columns.push(ColumnMetadata::new(self.target.name("sum"), slot));
        Ok(())
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        let t = &self.target;
        if is_floating(t.column_type) {
            let sum = values.get_double(t.index) + read_double(record, t.col, t.column_type);
            values.put_double(t.index, sum);
        } else {
            let sum = values
                .get_long(t.index)
                .wrapping_add(read_long(record, t.col, t.column_type));
            values.put_long(t.index, sum);
        }
    }
}

impl AggregatorFunction for AvgAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        self.target.resolve(metadata, first_value_index)?;
        let ty = self.target.column_type;
        ensure!(ty.is_numeric(), "avg() does not support {} column {}", ty, self.target.column);
        let name = self.target.name("avg");
        columns.push(ColumnMetadata::new(format!("{}$sum", name), ColumnType::Double));
        columns.push(ColumnMetadata::new(format!("{}$count", name), ColumnType::Long));
        columns.push(ColumnMetadata::new(name, ColumnType::Double));
        Ok(())
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        let t = &self.target;
        let sum = values.get_double(t.index) + read_double(record, t.col, t.column_type);
        values.put_double(t.index, sum);
        let count = values.get_long(t.index + 1);
        values.put_long(t.index + 1, count + 1);
    }

    fn interceptor(&self) -> Option<Box<dyn MapRecordValueInterceptor>> {
        Some(Box::new(AvgFinalizer {
            index: self.target.index,
        }))
    }
}

struct AvgFinalizer {
    index: usize,
}

impl MapRecordValueInterceptor for AvgFinalizer {
    fn before_record(&self, values: &mut MapValues<'_>) {
        let count = values.get_long(self.index + 1);
        let avg = if count > 0 {
            values.get_double(self.index) / count as f64
        } else {
            f64::NAN
        };
        values.put_double(self.index + 2, avg);
    }
}

fn prepare_copying(
    target: &mut Target,
    function: &str,
    metadata: &RecordMetadata,
    columns: &mut Vec<ColumnMetadata>,
    first_value_index: usize,
) -> Result<()> {
    target.resolve(metadata, first_value_index)?;
    let ty = target.column_type;
    if !ty.is_fixed() || ty == ColumnType::Symbol {
        bail!("{}() does not support {} column {}", function, ty, target.column);
    }
    columns.push(ColumnMetadata::new(target.name(function), ty));
    Ok(())
}

impl AggregatorFunction for FirstAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        prepare_copying(&mut self.target, "first", metadata, columns, first_value_index)
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        if values.is_new() {
            let t = &self.target;
            copy_value(record, t.col, t.column_type, values, t.index);
        }
    }
}

impl AggregatorFunction for LastAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        prepare_copying(&mut self.target, "last", metadata, columns, first_value_index)
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        let t = &self.target;
        copy_value(record, t.col, t.column_type, values, t.index);
    }
}

fn prepare_extremum(
    target: &mut Target,
    function: &str,
    metadata: &RecordMetadata,
    columns: &mut Vec<ColumnMetadata>,
    first_value_index: usize,
) -> Result<()> {
    target.resolve(metadata, first_value_index)?;
    let ty = target.column_type;
    ensure!(ty.is_numeric(), "{}() does not support {} column {}", function, ty, target.column);
    columns.push(ColumnMetadata::new(target.name(function), ty));
    Ok(())
}

fn fold_extremum(target: &Target, record: &dyn Record, values: &mut MapValues<'_>, max: bool) {
    let (col, ty, index) = (target.col, target.column_type, target.index);
    let replace = values.is_new()
        || if is_floating(ty) {
            let candidate = read_double(record, col, ty);
            let current = slot_double(values, index, ty);
            if max {
                candidate > current
            } else {
                candidate < current
            }
        } else {
            let candidate = read_long(record, col, ty);
            let current = slot_long(values, index, ty);
            if max {
                candidate > current
            } else {
                candidate < current
            }
        };
    if replace {
        copy_value(record, col, ty, values, index);
    }
}

impl AggregatorFunction for MinAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        prepare_extremum(&mut self.target, "min", metadata, columns, first_value_index)
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        fold_extremum(&self.target, record, values, false);
    }
}

impl AggregatorFunction for MaxAggregator {
    fn prepare(
        &mut self,
        metadata: &RecordMetadata,
        columns: &mut Vec<ColumnMetadata>,
        first_value_index: usize,
    ) -> Result<()> {
        prepare_extremum(&mut self.target, "max", metadata, columns, first_value_index)
    }

    fn calculate(&mut self, record: &dyn Record, values: &mut MapValues<'_>) {
        fold_extremum(&self.target, record, values, true);
    }
}
