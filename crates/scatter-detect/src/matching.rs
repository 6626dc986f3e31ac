//! Matching detected peaks against a simulated diffraction pattern.
//!
//! Grounded in `match_patterns.py::get_match_metrics`, which calls
//! `scipy.optimize.linear_sum_assignment` on an absolute-distance cost
//! matrix. No corpus crate wraps an assignment solver, so the
//! Kuhn-Munkres algorithm is implemented directly here; peak counts per
//! frame are small (tens), well within an O(n^3) algorithm's budget.

/// Solves the rectangular linear sum assignment problem, minimizing
/// total cost. Returns `(row, col)` pairs for every row that received
/// an assignment. Unassigned rows (when `cols < rows`) are omitted.
pub fn linear_sum_assignment(cost: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = cost.len();
    if rows == 0 {
        return Vec::new();
    }
    let cols = cost[0].len();
    if cols == 0 {
        return Vec::new();
    }

    let n = rows.max(cols);
    let big = cost
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0f64, |acc, &v| acc.max(v))
        * 2.0
        + 1.0;

    // Pad to a square matrix with a cost that never wins a real match.
    let mut padded = vec![vec![big; n]; n];
    for (r, row) in cost.iter().enumerate() {
        for (c, &v) in row.iter().enumerate() {
            padded[r][c] = v;
        }
    }

    let assignment = kuhn_munkres_square(&padded);

    assignment
        .into_iter()
        .enumerate()
        .filter(|&(r, c)| r < rows && c < cols)
        .collect()
}

/// Classic O(n^3) Hungarian algorithm (Jacobi/Munkres with potentials)
/// for a square cost matrix. Returns `assignment[row] = col`.
fn kuhn_munkres_square(cost: &[Vec<f64>]) -> Vec<usize> {
    let n = cost.len();
    const INF: f64 = f64::INFINITY;

    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1]; // p[j] = row assigned to column j (1-indexed, 0 = unassigned)
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; n + 1];
        let mut used = vec![false; n + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;

            for j in 1..=n {
                if !used[j] {
                    let cur = cost[i0 - 1][j - 1] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }

            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }

            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut assignment = vec![0usize; n];
    for j in 1..=n {
        if p[j] > 0 {
            assignment[p[j] - 1] = j - 1;
        }
    }
    assignment
}

/// The outcome of matching one simulated diffraction pattern against a
/// frame's experimental peaks.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchMetrics {
    /// Fraction of simulated structure-factor weight that found an
    /// experimental peak within `max_distance`.
    pub matched_fraction: f64,
    pub simulated_indices: Vec<usize>,
    pub experimental_indices: Vec<usize>,
}

/// Mirrors `get_match_metrics`: assigns simulated peaks to experimental
/// peaks by absolute q-distance, keeps only pairs closer than
/// `max_distance`, and reports the fraction of simulated intensity that
/// was matched.
pub fn match_peaks(
    simulated_q: &[f64],
    experimental_q: &[f64],
    simulated_intensity: &[f64],
    max_distance: f64,
) -> MatchMetrics {
    if simulated_q.is_empty() || experimental_q.is_empty() {
        return MatchMetrics {
            matched_fraction: 0.0,
            simulated_indices: Vec::new(),
            experimental_indices: Vec::new(),
        };
    }

    let cost: Vec<Vec<f64>> = simulated_q
        .iter()
        .map(|&sq| experimental_q.iter().map(|&eq| (eq - sq).abs()).collect())
        .collect();

    let assignment = linear_sum_assignment(&cost);

    let mut simulated_indices = Vec::new();
    let mut experimental_indices = Vec::new();
    for (sim_idx, exp_idx) in assignment {
        if (experimental_q[exp_idx] - simulated_q[sim_idx]).abs() < max_distance {
            simulated_indices.push(sim_idx);
            experimental_indices.push(exp_idx);
        }
    }

    let total: f64 = simulated_intensity.iter().sum();
    let matched: f64 = simulated_indices.iter().map(|&i| simulated_intensity[i]).sum();
    let matched_fraction = if total > 0.0 { matched / total } else { 0.0 };

    MatchMetrics {
        matched_fraction,
        simulated_indices,
        experimental_indices,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assignment_matches_closest_pairs() {
        let cost = vec![vec![1.0, 4.0], vec![3.0, 2.0]];
        let assignment = linear_sum_assignment(&cost);
        let mut sorted = assignment.clone();
        sorted.sort();
        assert_eq!(sorted, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn assignment_handles_more_rows_than_columns() {
        let cost = vec![vec![1.0], vec![5.0], vec![2.0]];
        let assignment = linear_sum_assignment(&cost);
        // Only one column exists; exactly one row gets matched to it.
        assert_eq!(assignment.len(), 1);
        assert_eq!(assignment[0].1, 0);
    }

    #[test]
    fn match_peaks_keeps_only_close_pairs() {
        let sim_q = vec![1.0, 2.0, 5.0];
        let exp_q = vec![1.01, 2.5];
        let intensity = vec![1.0, 1.0, 1.0];
        let metrics = match_peaks(&sim_q, &exp_q, &intensity, 0.1);
        assert_eq!(metrics.simulated_indices, vec![0]);
        assert!((metrics.matched_fraction - (1.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn match_peaks_with_no_experimental_peaks_is_zero() {
        let metrics = match_peaks(&[1.0], &[], &[1.0], 0.1);
        assert_eq!(metrics.matched_fraction, 0.0);
    }
}
