//! Pairwise-deletion Pearson correlation engine.
//!
//! Rows missing a value on either side of a pair are dropped for that pair
//! only, never for other pairs. The signed coefficient is recorded exactly
//! as computed; ranking orders by absolute strength without touching the
//! stored sign.

use serde::{Deserialize, Serialize};

use crate::data::{Row, to_number};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Correlation {
    pub variable: String,
    pub correlation: f64,
    pub n_pairs: usize,
}

/// Correlates `target` against each candidate column. Returns an empty
/// vector when no usable signal exists; that is a valid outcome, not a
/// fault.
pub fn correlate(rows: &[Row], target: &str, candidates: &[String]) -> Vec<Correlation> {
    let target_values: Vec<f64> = rows
        .iter()
        .map(|row| row.get(target).map(to_number).unwrap_or(f64::NAN))
        .collect();
    if target_values.iter().all(|v| v.is_nan()) {
        return Vec::new();
    }

    let mut results = Vec::new();
    for candidate in candidates {
        if candidate == target {
            continue;
        }
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (row, &t) in rows.iter().zip(&target_values) {
            if t.is_nan() {
                continue;
            }
            let c = row.get(candidate).map(to_number).unwrap_or(f64::NAN);
            if c.is_nan() {
                continue;
            }
            xs.push(t);
            ys.push(c);
        }
        if xs.is_empty() {
            continue;
        }
        if let Some(r) = pearson(&xs, &ys) {
            results.push(Correlation {
                variable: candidate.clone(),
                correlation: r,
                n_pairs: xs.len(),
            });
        }
    }
    results
}

/// Pearson coefficient via the computational formula. `None` when the
/// denominator is zero (constant series).
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    debug_assert_eq!(xs.len(), ys.len());
    let n = xs.len() as f64;
    if xs.is_empty() {
        return None;
    }
    let sum_x: f64 = xs.iter().sum();
    let sum_y: f64 = ys.iter().sum();
    let sum_xy: f64 = xs.iter().zip(ys).map(|(x, y)| x * y).sum();
    let sum_x2: f64 = xs.iter().map(|x| x * x).sum();
    let sum_y2: f64 = ys.iter().map(|y| y * y).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x * sum_x) * (n * sum_y2 - sum_y * sum_y)).sqrt();
    if denominator == 0.0 || denominator.is_nan() {
        return None;
    }
    Some(numerator / denominator)
}

/// Orders results by descending absolute strength. The signed values inside
/// are returned untouched.
pub fn rank_by_strength(mut results: Vec<Correlation>) -> Vec<Correlation> {
    results.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::CellValue;

    fn rows(columns: &[&str], values: &[&[Option<f64>]]) -> Vec<Row> {
        values
            .iter()
            .map(|cells| {
                let mut row = Row::new();
                for (name, cell) in columns.iter().zip(cells.iter()) {
                    let value = match cell {
                        Some(v) => CellValue::Number(*v),
                        None => CellValue::Null,
                    };
                    row.insert(name.to_string(), value);
                }
                row
            })
            .collect()
    }

    #[test]
    fn correlate_finds_perfect_positive_and_negative() {
        let data = rows(
            &["t", "up", "down"],
            &[
                &[Some(1.0), Some(2.0), Some(9.0)],
                &[Some(2.0), Some(4.0), Some(7.0)],
                &[Some(3.0), Some(6.0), Some(5.0)],
            ],
        );
        let results = correlate(&data, "t", &["up".into(), "down".into()]);
        let up = results.iter().find(|r| r.variable == "up").unwrap();
        let down = results.iter().find(|r| r.variable == "down").unwrap();
        assert!((up.correlation - 1.0).abs() < 1e-12);
        assert!((down.correlation + 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlate_applies_pairwise_deletion_per_candidate() {
        let data = rows(
            &["t", "a", "b"],
            &[
                &[Some(1.0), Some(1.0), Some(3.0)],
                &[Some(2.0), None, Some(5.0)],
                &[Some(3.0), Some(3.0), Some(6.0)],
                &[None, Some(4.0), Some(7.0)],
            ],
        );
        let results = correlate(&data, "t", &["a".into(), "b".into()]);
        let a = results.iter().find(|r| r.variable == "a").unwrap();
        let b = results.iter().find(|r| r.variable == "b").unwrap();
        assert_eq!(a.n_pairs, 2);
        assert_eq!(b.n_pairs, 3);
    }

    #[test]
    fn correlate_skips_constant_candidates() {
        let data = rows(
            &["t", "flat"],
            &[
                &[Some(1.0), Some(5.0)],
                &[Some(2.0), Some(5.0)],
                &[Some(3.0), Some(5.0)],
            ],
        );
        let results = correlate(&data, "t", &["flat".into()]);
        assert!(results.is_empty());
    }

    #[test]
    fn correlate_returns_empty_for_all_nan_target() {
        let data = rows(&["t", "a"], &[&[None, Some(1.0)], &[None, Some(2.0)]]);
        assert!(correlate(&data, "t", &["a".into()]).is_empty());
    }

    #[test]
    fn correlate_excludes_target_from_candidates() {
        let data = rows(&["t"], &[&[Some(1.0)], &[Some(2.0)]]);
        assert!(correlate(&data, "t", &["t".into()]).is_empty());
    }

    #[test]
    fn rank_by_strength_orders_by_magnitude_without_sign_changes() {
        let ranked = rank_by_strength(vec![
            Correlation {
                variable: "weak".into(),
                correlation: 0.2,
                n_pairs: 10,
            },
            Correlation {
                variable: "strong_negative".into(),
                correlation: -0.9,
                n_pairs: 10,
            },
            Correlation {
                variable: "medium".into(),
                correlation: 0.5,
                n_pairs: 10,
            },
        ]);
        let order: Vec<&str> = ranked.iter().map(|r| r.variable.as_str()).collect();
        assert_eq!(order, vec!["strong_negative", "medium", "weak"]);
        assert_eq!(ranked[0].correlation, -0.9);
    }
}
