//! SciPy optimization functions port.
//!
//! Ported from scipy.optimize.linear_sum_assignment (shortest augmenting
//! path, Jonker-Volgenant family).
//! License: BSD 3-Clause (SciPy Developers)
#![allow(clippy::needless_range_loop)]

use nalgebra::DMatrix;

use crate::{Error, Result};

/// Represents a match between a row index and column index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub row_idx: usize,
    pub col_idx: usize,
}

/// Solve the linear sum assignment problem.
///
/// Finds `min(n, m)` (row, col) pairs, each row and column used at most once,
/// minimizing the summed cost. Results are sorted by row index. Identical
/// inputs always produce identical pairs.
///
/// # Errors
/// `Error::InvalidCostMatrix` if any entry is NaN, infinite or negative.
pub fn linear_sum_assignment(cost_matrix: &DMatrix<f64>) -> Result<Vec<Assignment>> {
    validate_cost_matrix(cost_matrix)?;

    let (num_rows, num_cols) = cost_matrix.shape();
    if num_rows == 0 || num_cols == 0 {
        return Ok(Vec::new());
    }

    // The solver needs rows <= cols, so wide-side-down matrices are transposed.
    let transposed = num_rows > num_cols;
    let cost = if transposed {
        cost_matrix.transpose()
    } else {
        cost_matrix.clone()
    };

    let row_to_col = shortest_augmenting_path(&cost);

    let mut assignments: Vec<Assignment> = row_to_col
        .into_iter()
        .enumerate()
        .map(|(row, col)| {
            if transposed {
                Assignment { row_idx: col, col_idx: row }
            } else {
                Assignment { row_idx: row, col_idx: col }
            }
        })
        .collect();
    assignments.sort_by_key(|a| a.row_idx);
    Ok(assignments)
}

/// Total cost of a set of assignments.
pub fn assignment_cost(cost_matrix: &DMatrix<f64>, assignments: &[Assignment]) -> f64 {
    assignments
        .iter()
        .map(|a| cost_matrix[(a.row_idx, a.col_idx)])
        .sum()
}

fn validate_cost_matrix(cost_matrix: &DMatrix<f64>) -> Result<()> {
    if let Some(bad) = cost_matrix.iter().find(|c| !c.is_finite() || **c < 0.0) {
        return Err(Error::InvalidCostMatrix(format!(
            "cost matrix entries must be finite and non-negative, found {}",
            bad
        )));
    }
    Ok(())
}

/// Shortest augmenting path with row/column potentials.
///
/// Requires `nrows <= ncols`. Returns the assigned column for every row.
fn shortest_augmenting_path(cost: &DMatrix<f64>) -> Vec<usize> {
    let (n, m) = cost.shape();
    debug_assert!(n <= m);

    // 1-based indexing; slot 0 is the virtual source column.
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut col_owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        col_owner[0] = row;
        let mut j0 = 0usize;
        let mut min_reduced = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = col_owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0usize;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                if reduced < min_reduced[j] {
                    min_reduced[j] = reduced;
                    way[j] = j0;
                }
                // strict `<` keeps the lowest column index on ties
                if min_reduced[j] < delta {
                    delta = min_reduced[j];
                    j1 = j;
                }
            }

            for j in 0..=m {
                if used[j] {
                    u[col_owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_reduced[j] -= delta;
                }
            }

            j0 = j1;
            if col_owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path back to the source.
        loop {
            let j1 = way[j0];
            col_owner[j0] = col_owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![0usize; n];
    for j in 1..=m {
        if col_owner[j] != 0 {
            row_to_col[col_owner[j] - 1] = j - 1;
        }
    }
    row_to_col
}
