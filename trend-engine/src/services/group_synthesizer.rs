//! Group record synthesis
//!
//! For every group declared on a stratum, synthesizes one pseudo-record per
//! distinct combination of all other non-variable fields, carrying the
//! summed weight and the weighted mean of every other variable. Computing
//! these upfront keeps the aggregator free of group arithmetic and makes
//! grouped rows distinguishable via the `grouped` flag.
//!
//! Synthesis runs once at initialization over the natural records only;
//! groups never compound onto other groups' synthesized rows.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use trend_common::model::{Record, StratumField, VariableField, WeightField};

/// Mark records as natural rows ahead of synthesis
pub fn mark_natural(records: &mut [Record]) {
    for record in records.iter_mut() {
        record.grouped = false;
    }
}

/// Synthesize grouped pseudo-records for every group of every stratum.
/// Returns the new records; the caller appends them to the store once.
pub fn synthesize(
    records: &[Record],
    strata: &[StratumField],
    variables: &[VariableField],
    weight: &WeightField,
) -> Vec<Record> {
    let variable_keys: BTreeSet<&str> = variables
        .iter()
        .map(|v| v.key.as_str())
        .chain([weight.key.as_str()])
        .collect();

    let mut synthesized = Vec::new();
    for stratum in strata {
        for group in stratum.groups() {
            let members: BTreeSet<&str> = group.expanded_keys().into_iter().collect();

            // Member leaf records of this group, stratum key stripped so
            // combinations distinguished only by it collapse together
            let filtered: Vec<&Record> = records
                .iter()
                .filter(|r| {
                    r.text(&stratum.key)
                        .map(|v| members.contains(v.as_ref()))
                        .unwrap_or(false)
                })
                .collect();

            // Partition by every remaining non-variable field (time and the
            // other strata included)
            let mut partitions: BTreeMap<Vec<(String, String)>, Vec<&Record>> = BTreeMap::new();
            for record in filtered {
                let mut key: Vec<(String, String)> = record
                    .values
                    .iter()
                    .filter(|(k, _)| k.as_str() != stratum.key && !variable_keys.contains(k.as_str()))
                    .map(|(k, v)| (k.clone(), v.render().into_owned()))
                    .collect();
                key.sort();
                partitions.entry(key).or_default().push(record);
            }

            let count = partitions.len();
            for group_records in partitions.into_values() {
                synthesized.push(synthesize_one(
                    &group_records,
                    stratum,
                    group.key(),
                    variables,
                    weight,
                    &variable_keys,
                ));
            }
            debug!(
                stratum = %stratum.key,
                group = %group.key(),
                records = count,
                "synthesized group records"
            );
        }
    }
    synthesized
}

/// Emit one synthesized record for a partition of member records
fn synthesize_one(
    group_records: &[&Record],
    stratum: &StratumField,
    group_key: &str,
    variables: &[VariableField],
    weight: &WeightField,
    variable_keys: &BTreeSet<&str>,
) -> Record {
    let mut out = Record::new();
    out.grouped = true;

    // Shared fields are identical across the partition; copy from the first
    let template = group_records[0];
    for (key, value) in &template.values {
        if key.as_str() != stratum.key && !variable_keys.contains(key.as_str()) {
            out.values.insert(key.clone(), value.clone());
        }
    }
    out.insert(stratum.key.clone(), group_key);

    // Weight is the sum over the partition; every other variable is the
    // weighted mean. Zero total weight yields NaN, left to propagate.
    let total_weight: f64 = group_records.iter().map(|r| r.number(&weight.key)).sum();
    out.insert(weight.key.clone(), total_weight);
    for variable in variables {
        if variable.key == weight.key {
            continue;
        }
        let weighted_sum: f64 = group_records
            .iter()
            .map(|r| r.number(&weight.key) * r.number(&variable.key))
            .sum();
        out.insert(variable.key.clone(), weighted_sum / total_weight);
    }
    out
}
