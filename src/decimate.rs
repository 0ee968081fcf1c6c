//! Shape-preserving point count reduction.
//!
//! An ordered row set is reduced to at most a target number of rows with a largest triangle
//! three buckets selection: the first and last rows are always kept, the interior is split into
//! contiguous buckets, and each bucket contributes the row forming the largest triangle with the
//! previously selected point and the centroid of the following bucket. The geometry is driven by
//! the first two fields of each row; remaining fields travel with whichever row is selected.

use crate::models::{DValue, Row};

/// Target value disabling decimation entirely.
pub const NO_DECIMATION: i64 = -1;

/// Reduce an ordered row set to at most `target` rows.
///
/// Returns the rows unchanged when the series already fits or decimation is disabled. A target
/// below three cannot hold any interior bucket; such requests degenerate to exactly the first
/// and last row. Runs in a single pass over the input.
pub fn reduce(rows: Vec<Row>, target: i64) -> Vec<Row> {
    if target == NO_DECIMATION || rows.len() as i64 <= target || rows.len() <= 2 {
        return rows;
    }
    if target <= 2 {
        let first = rows.first().cloned();
        let last = rows.last().cloned();
        return first.into_iter().chain(last).collect();
    }

    let target = target as usize;
    let n = rows.len();
    // Interior rows per bucket; > 1 because n > target here.
    let every = (n - 2) as f64 / (target - 2) as f64;

    let mut sampled = Vec::with_capacity(target);
    sampled.push(rows[0].clone());
    let mut selected = 0_usize;

    for bucket in 0..(target - 2) {
        // Centroid of the following bucket steers the triangle.
        let avg_start = ((bucket + 1) as f64 * every) as usize + 1;
        let avg_end = (((bucket + 2) as f64 * every) as usize + 1).min(n);
        let mut avg_x = 0.0_f64;
        let mut avg_y = 0.0_f64;
        for row in &rows[avg_start..avg_end] {
            let (x, y) = xy(row);
            avg_x += x;
            avg_y += y;
        }
        let count = (avg_end - avg_start) as f64;
        avg_x /= count;
        avg_y /= count;

        let range_start = (bucket as f64 * every) as usize + 1;
        let range_end = ((bucket + 1) as f64 * every) as usize + 1;
        let (ax, ay) = xy(&rows[selected]);

        let mut max_area = -1.0_f64;
        let mut max_index = range_start;
        for index in range_start..range_end {
            let (bx, by) = xy(&rows[index]);
            // Twice the triangle area; the factor is irrelevant for comparison. A strict
            // comparison keeps the first candidate on ties.
            let area = ((ax - avg_x) * (by - ay) - (ax - bx) * (avg_y - ay)).abs();
            if area > max_area {
                max_area = area;
                max_index = index;
            }
        }
        sampled.push(rows[max_index].clone());
        selected = max_index;
    }

    sampled.push(rows[n - 1].clone());
    sampled
}

fn xy(row: &Row) -> (f64, f64) {
    (
        row.first().and_then(DValue::as_f64).unwrap_or(0.0),
        row.get(1).and_then(DValue::as_f64).unwrap_or(0.0),
    )
}
