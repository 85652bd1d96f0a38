//! Selection-driven record filtering
//!
//! Builds one allowed-value set per stratum from the current selection and
//! keeps the records matching every set. The series stratum matches selected
//! keys verbatim so its synthesized group rows pass; every other stratum
//! expands groups to their leaf items, which keeps foreign synthesized rows
//! out because their group keys never appear in an expanded set.

use std::collections::{HashMap, HashSet};

use trend_common::model::{Record, SelectedStratum, Selection};

/// Allowed value set for one stratum under the current selection
pub fn allowed_keys(stratum: &SelectedStratum, is_series: bool) -> Vec<&str> {
    if is_series {
        stratum.selected_keys()
    } else {
        stratum.expanded_keys()
    }
}

/// Filter the record store to the active subset for this selection
pub fn filter<'a>(records: &'a [Record], selection: &Selection) -> Vec<&'a Record> {
    let conditions: HashMap<&str, HashSet<&str>> = selection
        .strata
        .iter()
        .map(|s| {
            let is_series = s.key == selection.series_field.key;
            (
                s.key.as_str(),
                allowed_keys(s, is_series).into_iter().collect(),
            )
        })
        .collect();

    records
        .iter()
        .filter(|record| {
            conditions.iter().all(|(key, allowed)| {
                record
                    .text(key)
                    .map(|value| allowed.contains(value.as_ref()))
                    .unwrap_or(false)
            })
        })
        .collect()
}
