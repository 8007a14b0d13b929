use std::fmt;

use log::debug;

use crate::execution::Op;

/// An equi-width histogram over the inclusive integer range
/// `[min, max]`, used to estimate predicate selectivity.
///
/// Bucket `i` spans the integer range
/// `[ceil(min + i*w), ceil(min + (i+1)*w) - 1]` for the floating bucket
/// width `w = (max - min + 1) / buckets`, collapsed to a single point
/// when that range is empty.
pub struct IntHistogram {
    buckets: Vec<usize>,
    min: i32,
    max: i32,
    width: f64,
    ntup: usize,
}

impl IntHistogram {
    pub fn new(bucket_count: usize, min: i32, max: i32) -> Self {
        Self {
            buckets: vec![0; bucket_count],
            min,
            max,
            width: (max as f64 - min as f64 + 1.0) / bucket_count as f64,
            ntup: 0,
        }
    }

    fn index_of(&self, v: i32) -> usize {
        ((v as f64 - self.min as f64) / self.width).floor() as usize
    }

    fn bucket_left(&self, i: usize) -> i32 {
        (self.min as f64 + i as f64 * self.width).ceil() as i32
    }

    fn bucket_right(&self, i: usize) -> i32 {
        let right = (self.min as f64 + (i + 1) as f64 * self.width).ceil() as i32 - 1;
        // a bucket narrower than one integer collapses to its left point
        right.max(self.bucket_left(i))
    }

    fn bucket_width(&self, i: usize) -> f64 {
        (self.bucket_right(i) - self.bucket_left(i) + 1) as f64
    }

    pub fn add_value(&mut self, v: i32) {
        if v < self.min || v > self.max {
            debug!("value {} outside of [{}, {}], dropped", v, self.min, self.max);
            return;
        }

        let idx = self.index_of(v);
        self.buckets[idx] += 1;
        self.ntup += 1;
    }

    /// Estimated fraction of the recorded values satisfying
    /// `value <op> v`, in `[0, 1]`.
    pub fn estimate_selectivity(&self, op: Op, v: i32) -> f64 {
        if self.ntup == 0 {
            return 0.0;
        }

        let selectivity = match op {
            Op::Equals => self.estimate_equals(v),
            Op::NotEquals => 1.0 - self.estimate_equals(v),
            Op::GreaterThan => self.estimate_greater_than(v),
            Op::GreaterThanOrEq => self.estimate_greater_than(v - 1),
            Op::LessThan => self.estimate_less_than(v),
            Op::LessThanOrEq => self.estimate_less_than(v + 1),
        };

        selectivity.max(0.0).min(1.0)
    }

    fn estimate_equals(&self, v: i32) -> f64 {
        if v < self.min || v > self.max {
            return 0.0;
        }

        let i = self.index_of(v);
        (self.buckets[i] as f64 / self.bucket_width(i)) / self.ntup as f64
    }

    fn estimate_greater_than(&self, v: i32) -> f64 {
        if v < self.min {
            return 1.0;
        }
        if v > self.max {
            return 0.0;
        }

        let i = self.index_of(v);
        let mut qualified =
            self.buckets[i] as f64 * (self.bucket_right(i) - v) as f64 / self.bucket_width(i);
        for count in &self.buckets[i + 1..] {
            qualified += *count as f64;
        }
        qualified / self.ntup as f64
    }

    fn estimate_less_than(&self, v: i32) -> f64 {
        if v < self.min {
            return 0.0;
        }
        if v > self.max {
            return 1.0;
        }

        let i = self.index_of(v);
        let mut qualified =
            self.buckets[i] as f64 * (v - self.bucket_left(i)) as f64 / self.bucket_width(i);
        for count in &self.buckets[..i] {
            qualified += *count as f64;
        }
        qualified / self.ntup as f64
    }

    /// Average bucket fill, an unnormalized diagnostic for the planner.
    pub fn avg_selectivity(&self) -> f64 {
        let total: usize = self.buckets.iter().sum();
        total as f64 / self.buckets.len() as f64
    }
}

impl fmt::Display for IntHistogram {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "<IntHistogram, buckets: {}, range: [{}, {}], ntup: {}>",
            self.buckets.len(),
            self.min,
            self.max,
            self.ntup
        )
    }
}
