//! CSV export of the current chart state
//!
//! Emits a sectioned text blob: the selection metadata (strata, series,
//! time range, variable), the mapped-area table, and, when a correction is
//! available, the corrected-area and standard-error tables. Time columns
//! cover the full integer window regardless of data sparsity.

use std::fmt::Write;

use trend_common::model::{Selection, SeriesAndErrorsModel, SeriesModel, StratumField};

/// Serialize the selection and series data to CSV text
pub fn to_csv_text(
    selection: &Selection,
    configured_strata: &[StratumField],
    mapped: &[SeriesModel],
    corrected: Option<&[SeriesAndErrorsModel]>,
) -> String {
    let mut out = String::new();

    // Selected categories per stratum; ALL when nothing is filtered out
    out.push_str("STRATA\n");
    for stratum in &selection.strata {
        let configured = configured_strata.iter().find(|s| s.key == stratum.key);
        let all_selected = configured
            .map(|c| c.categories.len() == stratum.categories.len())
            .unwrap_or(false);
        if all_selected {
            let _ = writeln!(out, "{}:ALL", stratum.alias);
        } else {
            let _ = writeln!(out, "{}:{}", stratum.alias, stratum.selected_keys().join(";"));
        }
    }

    let _ = writeln!(out, "\nSERIES\n{}", selection.series_field.alias);
    let _ = writeln!(
        out,
        "\nTIME_RANGE\n{}-{}",
        selection.min_time as i64, selection.max_time as i64
    );
    let _ = writeln!(
        out,
        "\nVARIABLE\n{} ({})",
        selection.variable_field.alias, selection.variable_field.units
    );

    let times: Vec<i64> = (selection.min_time as i64..=selection.max_time as i64).collect();

    out.push_str("\nMAPPED_AREAS\n");
    push_table(&mut out, &selection.series_field.alias, &times, mapped, |s, t| {
        s.data.iter().find(|&&(st, _)| st == t).map(|&(_, v)| v)
    });

    if let Some(corrected) = corrected.filter(|c| !c.is_empty()) {
        out.push_str("\nERROR_CORRECTED_AREA_ESTIMATES\n");
        push_table(&mut out, &selection.series_field.alias, &times, corrected, |s, t| {
            s.data.iter().find(|&&(st, ..)| st == t).map(|&(_, v, ..)| v)
        });

        // Standard error: estimate minus the lower confidence bound
        out.push_str("\nSE_AREA_ESTIMATES\n");
        push_table(&mut out, &selection.series_field.alias, &times, corrected, |s, t| {
            s.data
                .iter()
                .find(|&&(st, ..)| st == t)
                .map(|&(_, v, lower, _)| v - lower)
        });
    }

    out
}

/// One tabular section: header of time columns, one row per series, absent
/// time values rendered as empty cells
fn push_table<S>(
    out: &mut String,
    series_alias: &str,
    times: &[i64],
    series: &[S],
    value_at: impl Fn(&S, f64) -> Option<f64>,
) where
    S: Labeled,
{
    let mut header = vec![series_alias.to_string()];
    header.extend(times.iter().map(|t| t.to_string()));
    let _ = writeln!(out, "{}", header.join(","));

    for s in series {
        let mut row = vec![s.label().to_string()];
        for &t in times {
            row.push(
                value_at(s, t as f64)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            );
        }
        let _ = writeln!(out, "{}", row.join(","));
    }
}

trait Labeled {
    fn label(&self) -> &str;
}

impl Labeled for SeriesModel {
    fn label(&self) -> &str {
        &self.label
    }
}

impl Labeled for SeriesAndErrorsModel {
    fn label(&self) -> &str {
        &self.label
    }
}
