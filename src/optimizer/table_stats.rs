use std::{cmp, sync::Arc};

use log::debug;

use crate::{
    database::Database,
    error::SmallError,
    execution::{Op, OpIterator, SeqScan},
    optimizer::{int_histogram::IntHistogram, string_histogram::StringHistogram},
    storage::{schema::Type, tuple::Cell},
    transaction::Transaction,
    types::SmallResult,
    utils::HandyRwLock,
};

/// Buckets per histogram.
pub const NUM_HIST_BINS: usize = 100;

/// Disk cost per page charged to sequential scans.
pub const IO_COST_PER_PAGE: usize = 1000;

enum FieldHistogram {
    Int(IntHistogram),
    Str(StringHistogram),
}

/// Per-table statistics: tuple count, page count and one histogram per
/// field, built from two sequential scans through the operator layer.
pub struct TableStats {
    num_pages: usize,
    total_tuples: usize,
    io_cost_per_page: usize,
    histograms: Vec<FieldHistogram>,
}

impl TableStats {
    pub fn new(
        db: &Arc<Database>,
        table_id: u32,
        io_cost_per_page: usize,
    ) -> Result<Self, SmallError> {
        let table_rc = db
            .catalog()
            .get_table(&table_id)
            .expect(&format!("table {} not found", table_id));
        let schema = table_rc.rl().get_schema().clone();
        let num_pages = table_rc.rl().num_pages()?;

        let tx = Transaction::new();
        let mut scan = SeqScan::new(Arc::clone(db), &tx, table_id);

        // pass 1: tuple count and per-field bounds of the integer image
        let mut total_tuples = 0;
        let mut bounds: Vec<Option<(i32, i32)>> = vec![None; schema.field_count()];

        scan.open()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            total_tuples += 1;

            for (i, bound) in bounds.iter_mut().enumerate() {
                let v = match tuple.get_cell(i) {
                    Cell::Int32(v) => v,
                    // strings get a fixed-domain histogram, no bounds
                    // needed
                    Cell::String(_) => continue,
                };

                *bound = match bound {
                    Some((min, max)) => Some((cmp::min(*min, v), cmp::max(*max, v))),
                    None => Some((v, v)),
                };
            }
        }

        let mut histograms: Vec<FieldHistogram> = Vec::with_capacity(schema.field_count());
        for (i, field) in schema.fields.iter().enumerate() {
            let histogram = match field.field_type {
                Type::Int32 => {
                    let (min, max) = bounds[i].unwrap_or((0, 0));
                    FieldHistogram::Int(IntHistogram::new(NUM_HIST_BINS, min, max))
                }
                Type::Char(_) => FieldHistogram::Str(StringHistogram::new(NUM_HIST_BINS)),
            };
            histograms.push(histogram);
        }

        // pass 2: fill the histograms
        scan.rewind()?;
        while scan.has_next()? {
            let tuple = scan.next()?;
            for (i, histogram) in histograms.iter_mut().enumerate() {
                match (histogram, tuple.get_cell(i)) {
                    (FieldHistogram::Int(hist), Cell::Int32(v)) => hist.add_value(v),
                    (FieldHistogram::Str(hist), Cell::String(s)) => hist.add_value(&s),
                    _ => unreachable!("histogram kind diverged from schema"),
                }
            }
        }
        scan.close();
        tx.commit(db)?;

        debug!(
            "stats of table {}: {} tuples over {} pages",
            table_id, total_tuples, num_pages
        );

        Ok(Self {
            num_pages,
            total_tuples,
            io_cost_per_page,
            histograms,
        })
    }

    /// Cost of a full sequential scan.
    pub fn estimate_scan_cost(&self) -> f64 {
        (self.num_pages * self.io_cost_per_page) as f64
    }

    /// Expected number of tuples a predicate with the given selectivity
    /// keeps.
    pub fn estimate_table_cardinality(&self, selectivity: f64) -> usize {
        (self.total_tuples as f64 * selectivity).round() as usize
    }

    pub fn total_tuples(&self) -> usize {
        self.total_tuples
    }

    pub fn estimate_selectivity(
        &self,
        field: usize,
        op: Op,
        constant: &Cell,
    ) -> Result<f64, SmallError> {
        match (&self.histograms[field], constant) {
            (FieldHistogram::Int(hist), Cell::Int32(v)) => Ok(hist.estimate_selectivity(op, *v)),
            (FieldHistogram::Str(hist), Cell::String(s)) => Ok(hist.estimate_selectivity(op, s)),
            _ => Err(SmallError::TypeMismatch(format!(
                "constant {:?} does not fit the histogram of field {}",
                constant, field
            ))),
        }
    }

    pub fn avg_selectivity(&self, field: usize, _op: Op) -> f64 {
        match &self.histograms[field] {
            FieldHistogram::Int(hist) => hist.avg_selectivity(),
            FieldHistogram::Str(hist) => hist.avg_selectivity(),
        }
    }
}

/// Build statistics for every table in the catalog and fill the
/// database's `name -> stats` registry.
pub fn compute_statistics(db: &Arc<Database>) -> SmallResult {
    let table_ids = db.catalog().table_ids();

    for table_id in table_ids {
        let stats = TableStats::new(db, table_id, IO_COST_PER_PAGE)?;
        let name = {
            let catalog = db.catalog();
            catalog
                .get_table_name(&table_id)
                .expect(&format!("table {} not found", table_id))
                .to_string()
        };
        db.mut_table_stats().insert(name, stats);
    }

    Ok(())
}
