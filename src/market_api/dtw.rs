use serde::{Deserialize, Serialize};

/// Local step weights of the warping recursion.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPattern {
    /// g(i,j) = d + min(g(i-1,j), g(i,j-1), g(i-1,j-1))
    #[default]
    Symmetric1,
    /// Diagonal steps pay 2d; the usual default of DTW packages.
    Symmetric2,
}

/// Unconstrained dynamic time warping distance with absolute pointwise cost.
///
/// Returns `None` when either series is empty. Non-finite pointwise costs
/// count as infinitely far, so degenerate normalizations rank last.
/// Runs in O(len(a) * len(b)) time and O(len(b)) memory.
pub fn distance_with(a: &[f64], b: &[f64], pattern: StepPattern) -> Option<f64> {
    let n = a.len();
    let m = b.len();
    if n == 0 || m == 0 {
        return None;
    }

    let mut prev = vec![f64::INFINITY; m + 1];
    let mut curr = vec![f64::INFINITY; m + 1];
    prev[0] = 0.0;

    for i in 1..=n {
        curr[0] = f64::INFINITY;
        for j in 1..=m {
            let cost = pointwise_cost(a[i - 1], b[j - 1]);
            let diagonal_weight = match pattern {
                StepPattern::Symmetric1 => 1.0,
                StepPattern::Symmetric2 => 2.0,
            };
            // the first cell is counted once whatever the pattern
            let diagonal = if i == 1 && j == 1 {
                cost
            } else {
                prev[j - 1] + diagonal_weight * cost
            };
            let vertical = prev[j] + cost;
            let horizontal = curr[j - 1] + cost;
            curr[j] = diagonal.min(vertical).min(horizontal);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let dist = prev[m];
    if dist.is_nan() {
        Some(f64::INFINITY)
    } else {
        Some(dist)
    }
}

fn pointwise_cost(x: f64, y: f64) -> f64 {
    let d = (x - y).abs();
    if d.is_finite() {
        d
    } else {
        f64::INFINITY
    }
}
