//! Dense two-phase simplex for the small least-cost ration programs.
//!
//! Minimizes `c . x` over `x >= 0` subject to `<=` / `>=` rows. Entering
//! and leaving variables follow Bland's rule, so the solve is fully
//! deterministic and cannot cycle. Problem sizes here are a handful of
//! nutrient rows plus one limit row per feed.

const EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Relation {
    Le,
    Ge,
}

#[derive(Clone, Debug)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LpOutcome {
    Optimal { objective: f64, values: Vec<f64> },
    Infeasible,
    Unbounded,
}

struct Tableau {
    rows: Vec<Vec<f64>>,
    rhs: Vec<f64>,
    basis: Vec<usize>,
    cols: usize,
}

enum Phase {
    Finished,
    Unbounded,
}

impl Tableau {
    fn pivot(&mut self, pivot_row: usize, pivot_col: usize) {
        let factor = self.rows[pivot_row][pivot_col];
        for value in &mut self.rows[pivot_row] {
            *value /= factor;
        }
        self.rhs[pivot_row] /= factor;

        for row in 0..self.rows.len() {
            if row == pivot_row {
                continue;
            }
            let scale = self.rows[row][pivot_col];
            if scale.abs() <= EPS {
                continue;
            }
            for col in 0..self.cols {
                let delta = scale * self.rows[pivot_row][col];
                self.rows[row][col] -= delta;
            }
            self.rhs[row] -= scale * self.rhs[pivot_row];
        }
        self.basis[pivot_row] = pivot_col;
    }

    fn reduced_cost(&self, cost: &[f64], col: usize) -> f64 {
        let mut reduced = cost[col];
        for (row, &basic) in self.basis.iter().enumerate() {
            reduced -= cost[basic] * self.rows[row][col];
        }
        reduced
    }

    fn objective(&self, cost: &[f64]) -> f64 {
        self.basis
            .iter()
            .zip(&self.rhs)
            .map(|(&basic, &value)| cost[basic] * value)
            .sum()
    }

    /// Run simplex iterations until optimal or unbounded. Columns for
    /// which `allowed` is false never enter the basis.
    fn solve(&mut self, cost: &[f64], allowed: impl Fn(usize) -> bool) -> Phase {
        loop {
            // Bland: lowest-index column with negative reduced cost
            let entering = (0..self.cols)
                .filter(|&col| allowed(col))
                .find(|&col| self.reduced_cost(cost, col) < -EPS);
            let Some(col) = entering else {
                return Phase::Finished;
            };

            let mut leaving: Option<usize> = None;
            for row in 0..self.rows.len() {
                if self.rows[row][col] <= EPS {
                    continue;
                }
                let ratio = self.rhs[row] / self.rows[row][col];
                leaving = match leaving {
                    None => Some(row),
                    Some(best) => {
                        let best_ratio = self.rhs[best] / self.rows[best][col];
                        if ratio < best_ratio - EPS
                            || (ratio < best_ratio + EPS && self.basis[row] < self.basis[best])
                        {
                            Some(row)
                        } else {
                            Some(best)
                        }
                    }
                };
            }
            let Some(row) = leaving else {
                return Phase::Unbounded;
            };
            self.pivot(row, col);
        }
    }
}

/// Minimize `objective . x` subject to the constraints, `x >= 0`.
pub fn minimize(objective: &[f64], constraints: &[Constraint]) -> LpOutcome {
    let variables = objective.len();
    let row_count = constraints.len();

    // normalize to nonnegative right-hand sides
    let mut normalized: Vec<(Vec<f64>, Relation, f64)> = constraints
        .iter()
        .map(|constraint| {
            let mut coefficients = constraint.coefficients.clone();
            coefficients.resize(variables, 0.0);
            (coefficients, constraint.relation, constraint.rhs)
        })
        .collect();
    for (coefficients, relation, rhs) in &mut normalized {
        if *rhs < 0.0 {
            for value in coefficients.iter_mut() {
                *value = -*value;
            }
            *rhs = -*rhs;
            *relation = match *relation {
                Relation::Le => Relation::Ge,
                Relation::Ge => Relation::Le,
            };
        }
    }

    let artificial_count = normalized
        .iter()
        .filter(|(_, relation, _)| *relation == Relation::Ge)
        .count();
    let slack_start = variables;
    let artificial_start = variables + row_count;
    let cols = artificial_start + artificial_count;

    let mut tableau = Tableau {
        rows: Vec::with_capacity(row_count),
        rhs: Vec::with_capacity(row_count),
        basis: Vec::with_capacity(row_count),
        cols,
    };

    let mut next_artificial = artificial_start;
    for (index, (coefficients, relation, rhs)) in normalized.iter().enumerate() {
        let mut row = vec![0.0; cols];
        row[..variables].copy_from_slice(coefficients);
        match relation {
            Relation::Le => {
                row[slack_start + index] = 1.0;
                tableau.basis.push(slack_start + index);
            }
            Relation::Ge => {
                row[slack_start + index] = -1.0;
                row[next_artificial] = 1.0;
                tableau.basis.push(next_artificial);
                next_artificial += 1;
            }
        }
        tableau.rows.push(row);
        tableau.rhs.push(*rhs);
    }

    // phase 1: drive the artificials to zero
    if artificial_count > 0 {
        let mut phase_one = vec![0.0; cols];
        for cost in &mut phase_one[artificial_start..] {
            *cost = 1.0;
        }
        match tableau.solve(&phase_one, |_| true) {
            Phase::Finished => {}
            Phase::Unbounded => return LpOutcome::Infeasible,
        }
        if tableau.objective(&phase_one) > 1e-7 {
            return LpOutcome::Infeasible;
        }
        // pivot any degenerate artificial out of the basis
        for row in 0..tableau.rows.len() {
            if tableau.basis[row] >= artificial_start {
                if let Some(col) =
                    (0..artificial_start).find(|&col| tableau.rows[row][col].abs() > EPS)
                {
                    tableau.pivot(row, col);
                }
            }
        }
    }

    // phase 2: minimize the real objective with artificials locked out
    let mut phase_two = vec![0.0; cols];
    phase_two[..variables].copy_from_slice(objective);
    match tableau.solve(&phase_two, |col| col < artificial_start) {
        Phase::Finished => {}
        Phase::Unbounded => return LpOutcome::Unbounded,
    }

    let mut values = vec![0.0; variables];
    for (row, &basic) in tableau.basis.iter().enumerate() {
        if basic < variables {
            values[basic] = tableau.rhs[row];
        }
    }
    LpOutcome::Optimal {
        objective: tableau.objective(&phase_two),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn le(coefficients: &[f64], rhs: f64) -> Constraint {
        Constraint {
            coefficients: coefficients.to_vec(),
            relation: Relation::Le,
            rhs,
        }
    }

    fn ge(coefficients: &[f64], rhs: f64) -> Constraint {
        Constraint {
            coefficients: coefficients.to_vec(),
            relation: Relation::Ge,
            rhs,
        }
    }

    fn expect_optimal(outcome: LpOutcome) -> (f64, Vec<f64>) {
        match outcome {
            LpOutcome::Optimal { objective, values } => (objective, values),
            other => panic!("expected optimal, got {other:?}"),
        }
    }

    #[test]
    fn picks_the_cheap_variable_first() {
        // min x + 2y  s.t.  x + y >= 10,  x <= 4
        let outcome = minimize(&[1.0, 2.0], &[ge(&[1.0, 1.0], 10.0), le(&[1.0, 0.0], 4.0)]);
        let (objective, values) = expect_optimal(outcome);
        assert!((objective - 16.0).abs() < 1e-6);
        assert!((values[0] - 4.0).abs() < 1e-6);
        assert!((values[1] - 6.0).abs() < 1e-6);
    }

    #[test]
    fn conflicting_bounds_are_infeasible() {
        let outcome = minimize(&[1.0], &[le(&[1.0], 1.0), ge(&[1.0], 2.0)]);
        assert_eq!(outcome, LpOutcome::Infeasible);
    }

    #[test]
    fn missing_upper_bound_is_unbounded() {
        // min -x  s.t.  x >= 1
        let outcome = minimize(&[-1.0], &[ge(&[1.0], 1.0)]);
        assert_eq!(outcome, LpOutcome::Unbounded);
    }

    #[test]
    fn equality_expressed_as_opposing_rows() {
        // min 3x + y  s.t.  x + y >= 5,  x + y <= 5
        let outcome = minimize(&[3.0, 1.0], &[ge(&[1.0, 1.0], 5.0), le(&[1.0, 1.0], 5.0)]);
        let (objective, values) = expect_optimal(outcome);
        assert!((objective - 5.0).abs() < 1e-6);
        assert!(values[0].abs() < 1e-6);
        assert!((values[1] - 5.0).abs() < 1e-6);
    }

    #[test]
    fn unconstrained_nonnegative_problem_sits_at_origin() {
        let (objective, values) = expect_optimal(minimize(&[2.0, 3.0], &[]));
        assert_eq!(objective, 0.0);
        assert_eq!(values, vec![0.0, 0.0]);
    }

    #[test]
    fn negative_rhs_rows_are_normalized() {
        // -x <= -3  is  x >= 3
        let outcome = minimize(&[1.0], &[le(&[-1.0], -3.0)]);
        let (objective, values) = expect_optimal(outcome);
        assert!((objective - 3.0).abs() < 1e-6);
        assert!((values[0] - 3.0).abs() < 1e-6);
    }

    #[test]
    fn zero_rhs_ge_row_is_satisfied_at_origin() {
        let outcome = minimize(&[1.0, 1.0], &[ge(&[1.0, -1.0], 0.0)]);
        let (objective, _) = expect_optimal(outcome);
        assert!(objective.abs() < 1e-9);
    }
}
