//! Error-matrix-based area estimation (Olofsson et al. 2013)
//!
//! Builds a confusion matrix between predicted and observed classes from the
//! reference dataset, bias-corrects the mapped areas per time step, and
//! derives an analytic confidence interval per class. Applies only when the
//! selected series stratum has reference `<key>_OBS` / `<key>_PRD` columns.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::debug;
use trend_common::model::{Record, Selection, SeriesAndErrorsModel, SeriesModel, StratumField};

const FALLBACK_COLOR: &str = "#000000";

/// Confusion matrix over the surviving classes: `data[i][j]` counts records
/// predicted class `i` and observed class `j`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorMatrix {
    pub data: Vec<Vec<u64>>,
    pub classes: Vec<String>,
    pub row_sums: Vec<u64>,
    pub col_sums: Vec<u64>,
}

/// Bias-corrected output: the pruned error matrix plus one corrected series
/// per surviving class
#[derive(Debug, Clone, Serialize)]
pub struct CorrectionOutput {
    pub error_matrix: ErrorMatrix,
    pub series_data: Vec<SeriesAndErrorsModel>,
}

/// Compute bias-corrected area estimates with confidence intervals.
///
/// Returns `None` when no correction is available: the series stratum has no
/// reference columns, the reference dataset is empty or filters down to
/// nothing, or there is no aggregated output to correct. Callers treat
/// `None` as "no correction", never as an error.
pub fn correct(
    reference: &[Record],
    olofsson_fields: &[String],
    series_stratum: &StratumField,
    selection: &Selection,
    mapped: &[SeriesModel],
) -> Option<CorrectionOutput> {
    let series_key = selection.series_field.key.as_str();
    if mapped.is_empty() || reference.is_empty() {
        return None;
    }
    if !olofsson_fields.iter().any(|f| f == series_key) {
        return None;
    }

    // Classes under assessment: the selected series categories expanded
    // through groups, in first-seen order
    let classes: Vec<String> = selection
        .stratum(series_key)?
        .expanded_keys()
        .into_iter()
        .map(str::to_string)
        .collect();
    if classes.is_empty() {
        return None;
    }

    let filtered = filter_reference(reference, olofsson_fields, selection, &classes);
    if filtered.is_empty() {
        return None;
    }

    // Confusion counts: rows predicted, columns observed
    let class_index: HashMap<&str, usize> = classes
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_str(), i))
        .collect();
    let obs_column = format!("{}_OBS", series_key);
    let prd_column = format!("{}_PRD", series_key);
    let mut matrix = vec![vec![0u64; classes.len()]; classes.len()];
    for record in &filtered {
        let obs = class_index[record.text(&obs_column)?.as_ref()];
        let prd = class_index[record.text(&prd_column)?.as_ref()];
        matrix[prd][obs] += 1;
    }

    // Drop classes with no observed examples, row and column together, in
    // descending index order so remaining indices stay valid
    let mut classes = classes;
    let col_sums = column_sums(&matrix);
    for j in (0..col_sums.len()).rev() {
        if col_sums[j] == 0 {
            debug!(class = %classes[j], "dropping class with no observed reference records");
            classes.remove(j);
            matrix.remove(j);
            for row in matrix.iter_mut() {
                row.remove(j);
            }
        }
    }
    if classes.is_empty() {
        return None;
    }

    let row_sums: Vec<u64> = matrix.iter().map(|row| row.iter().sum()).collect();
    let col_sums = column_sums(&matrix);

    // Predicted-class accuracy matrix: rows normalized by their totals
    let n_ij: Vec<Vec<f64>> = matrix
        .iter()
        .zip(&row_sums)
        .map(|(row, &total)| {
            row.iter()
                .map(|&v| if total > 0 { v as f64 / total as f64 } else { 0.0 })
                .collect()
        })
        .collect();

    // Mapped-area weight per class per time step over the full window;
    // absent class/time pairs weigh zero
    let start = selection.min_time as i64;
    let end = selection.max_time as i64;
    let times: Vec<f64> = (start..=end).map(|t| t as f64).collect();
    let weight_matrix: Vec<Vec<f64>> = classes
        .iter()
        .map(|class| {
            let series = mapped.iter().find(|s| &s.label == class);
            times
                .iter()
                .map(|&t| {
                    series
                        .and_then(|s| s.data.iter().find(|&&(st, _)| st == t))
                        .map(|&(_, v)| v)
                        .unwrap_or(0.0)
                })
                .collect()
        })
        .collect();

    // Row sums floored at two so the variance denominator stays positive
    let row_sums_min_2: Vec<f64> = row_sums.iter().map(|&r| (r.max(2)) as f64).collect();

    // Per time step: proportion weights, corrected areas, and confidence
    // half-widths
    let mut estimates: Vec<Vec<f64>> = Vec::with_capacity(times.len());
    let mut half_widths: Vec<Vec<f64>> = Vec::with_capacity(times.len());
    for t_index in 0..times.len() {
        let areas: Vec<f64> = weight_matrix.iter().map(|row| row[t_index]).collect();
        let total_area: f64 = areas.iter().sum();
        let w: Vec<f64> = areas.iter().map(|a| a / total_area).collect();

        // p_ij column totals are the corrected per-class proportions
        let mut corrected = vec![0.0; classes.len()];
        for (i, row) in n_ij.iter().enumerate() {
            for (j, &n) in row.iter().enumerate() {
                corrected[j] += n * w[i];
            }
        }
        estimates.push(corrected.iter().map(|p| p * total_area).collect());

        let mut ci = Vec::with_capacity(classes.len());
        for col in 0..classes.len() {
            let variance: f64 = n_ij
                .iter()
                .enumerate()
                .map(|(row, n_row)| {
                    let n = n_row[col];
                    n * (1.0 - n) / (row_sums_min_2[row] - 1.0) * w[row] * w[row]
                })
                .sum();
            ci.push(2.0 * variance.sqrt() * total_area);
        }
        half_widths.push(ci);
    }

    let series_data = classes
        .iter()
        .enumerate()
        .map(|(class_idx, class)| {
            let data: Vec<(f64, f64, f64, f64)> = times
                .iter()
                .enumerate()
                .map(|(t_index, &t)| {
                    let estimate = estimates[t_index][class_idx];
                    let ci = half_widths[t_index][class_idx];
                    (t, estimate, estimate - ci, estimate + ci)
                })
                .collect();
            let min_weight = data.iter().map(|d| d.1).fold(f64::NAN, f64::min);
            let color = series_stratum
                .entry(class)
                .map(|e| e.color().to_string())
                .unwrap_or_else(|| FALLBACK_COLOR.to_string());
            SeriesAndErrorsModel {
                label: format!("{}-EA", class),
                color,
                min_weight,
                data,
            }
        })
        .collect();

    Some(CorrectionOutput {
        error_matrix: ErrorMatrix {
            data: matrix,
            classes,
            row_sums,
            col_sums,
        },
        series_data,
    })
}

/// Filter the reference dataset by the current selection: the series
/// stratum constrains both its `_OBS` and `_PRD` columns; other strata with
/// reference columns constrain `_OBS` only; the rest filter on their raw key.
fn filter_reference<'a>(
    reference: &'a [Record],
    olofsson_fields: &[String],
    selection: &Selection,
    classes: &[String],
) -> Vec<&'a Record> {
    let series_key = selection.series_field.key.as_str();
    let class_set: HashSet<&str> = classes.iter().map(String::as_str).collect();

    let mut conditions: HashMap<String, HashSet<&str>> = HashMap::new();
    for stratum in &selection.strata {
        if stratum.key == series_key {
            conditions.insert(format!("{}_OBS", stratum.key), class_set.clone());
            conditions.insert(format!("{}_PRD", stratum.key), class_set.clone());
        } else if olofsson_fields.contains(&stratum.key) {
            conditions.insert(
                format!("{}_OBS", stratum.key),
                stratum.expanded_keys().into_iter().collect(),
            );
        } else {
            conditions.insert(
                stratum.key.clone(),
                stratum.expanded_keys().into_iter().collect(),
            );
        }
    }

    reference
        .iter()
        .filter(|record| {
            conditions.iter().all(|(column, allowed)| {
                record
                    .text(column)
                    .map(|value| allowed.contains(value.as_ref()))
                    .unwrap_or(false)
            })
        })
        .collect()
}

/// Column sums of a square count matrix
fn column_sums(matrix: &[Vec<u64>]) -> Vec<u64> {
    if matrix.is_empty() {
        return Vec::new();
    }
    let mut sums = vec![0u64; matrix[0].len()];
    for row in matrix {
        for (j, &v) in row.iter().enumerate() {
            sums[j] += v;
        }
    }
    sums
}
