//! Grouped, weighted series aggregation
//!
//! Groups the filtered records by series label and time, then reduces each
//! time bucket to a scalar: the plain weight sum when the plotted variable
//! is the weight field itself, an unweighted sum for total-kind variables,
//! and the weighted mean otherwise. Each record lands in exactly one series
//! bucket so a group and its member categories never double count.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use trend_common::model::{Record, Selection, SeriesModel, StratumField, VariableKind};

const FALLBACK_COLOR: &str = "#000000";

/// Sum a field across records
fn sum(records: &[&Record], field: &str) -> f64 {
    records.iter().map(|r| r.number(field)).sum()
}

/// Sum the product of weight and value across records
fn weighted_sum(records: &[&Record], weight_field: &str, value_field: &str) -> f64 {
    records
        .iter()
        .map(|r| r.number(weight_field) * r.number(value_field))
        .sum()
}

/// Weighted mean across records; zero total weight yields NaN
fn weighted_mean(records: &[&Record], weight_field: &str, value_field: &str) -> f64 {
    weighted_sum(records, weight_field, value_field) / sum(records, weight_field)
}

/// Aggregate the filtered records into one `SeriesModel` per distinct
/// series label, in label order with points in ascending time order.
/// `series_stratum` is the configured stratum chosen as the series field;
/// its group keys drive bucket assignment and its colors label the output.
pub fn aggregate(
    filtered: &[&Record],
    series_stratum: &StratumField,
    selection: &Selection,
) -> Vec<SeriesModel> {
    let series_key = selection.series_field.key.as_str();
    let time_key = selection.time_field.key.as_str();
    let weight_key = selection.weight_field.key.as_str();
    let variable_key = selection.variable_field.key.as_str();

    // Distinct series labels present in the filtered set
    let mut labels: Vec<String> = filtered
        .iter()
        .filter_map(|r| r.text(series_key).map(|v| v.into_owned()))
        .collect();
    labels.sort_unstable();
    labels.dedup();

    let group_keys: HashSet<&str> = series_stratum.groups().map(|g| g.key()).collect();

    // Assign each in-window record to exactly one series bucket: group-key
    // rows to their group, natural rows to their own value. Synthesized
    // rows for other strata match neither arm.
    let mut buckets: HashMap<&str, Vec<&Record>> =
        labels.iter().map(|l| (l.as_str(), Vec::new())).collect();
    for &record in filtered {
        let t = record.number(time_key);
        if !(t >= selection.min_time && t <= selection.max_time) {
            continue;
        }
        let label = match record.text(series_key) {
            Some(v) => v,
            None => continue,
        };
        if group_keys.contains(label.as_ref()) {
            if let Some(bucket) = buckets.get_mut(label.as_ref()) {
                bucket.push(record);
            }
        } else if !record.grouped {
            if let Some(bucket) = buckets.get_mut(label.as_ref()) {
                bucket.push(record);
            }
        }
    }

    labels
        .iter()
        .map(|label| {
            let records = &buckets[label.as_str()];

            // Group this series' records into time buckets, ascending
            let mut time_buckets: Vec<(f64, Vec<&Record>)> = Vec::new();
            for &record in records.iter() {
                let t = record.number(time_key);
                match time_buckets.iter_mut().find(|(bt, _)| *bt == t) {
                    Some((_, bucket)) => bucket.push(record),
                    None => time_buckets.push((t, vec![record])),
                }
            }
            time_buckets.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            // Minimum total weight across buckets, for low-area warnings;
            // NaN when the series has no in-window buckets
            let min_weight = time_buckets
                .iter()
                .map(|(_, bucket)| sum(bucket, weight_key))
                .fold(f64::NAN, f64::min);

            let data = time_buckets
                .iter()
                .map(|(t, bucket)| {
                    let value = if variable_key == weight_key {
                        sum(bucket, weight_key)
                    } else if selection.variable_field.kind == VariableKind::Total {
                        sum(bucket, variable_key)
                    } else {
                        weighted_mean(bucket, weight_key, variable_key)
                    };
                    (*t, value)
                })
                .collect();

            let color = series_stratum
                .entry(label)
                .map(|e| e.color().to_string())
                .unwrap_or_else(|| FALLBACK_COLOR.to_string());

            SeriesModel {
                label: label.clone(),
                color,
                min_weight,
                data,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use trend_common::model::{
        Category, CategoryEntry, SelectedStratum, SeriesField, TimeField, VariableField,
        WeightField,
    };

    fn region_stratum() -> StratumField {
        StratumField {
            key: "REGION".to_string(),
            alias: "Region".to_string(),
            categories: vec![
                CategoryEntry::Item(Category {
                    key: "N".to_string(),
                    alias: "North".to_string(),
                    color: "#1f77b4".to_string(),
                }),
                CategoryEntry::Item(Category {
                    key: "S".to_string(),
                    alias: "South".to_string(),
                    color: "#aec7e8".to_string(),
                }),
                CategoryEntry::Group {
                    key: "ALL".to_string(),
                    alias: "All regions".to_string(),
                    color: "#ff7f0e".to_string(),
                    items: vec!["N".to_string(), "S".to_string()],
                },
            ],
        }
    }

    fn selection(variable_key: &str, kind: VariableKind, min_time: f64, max_time: f64) -> Selection {
        Selection {
            strata: vec![SelectedStratum {
                key: "REGION".to_string(),
                alias: "Region".to_string(),
                categories: region_stratum().categories,
            }],
            series_field: SeriesField {
                key: "REGION".to_string(),
                alias: "Region".to_string(),
            },
            variable_field: VariableField {
                key: variable_key.to_string(),
                alias: variable_key.to_string(),
                units: "ha".to_string(),
                kind,
            },
            time_field: TimeField {
                key: "YEAR".to_string(),
                alias: "Year".to_string(),
            },
            weight_field: WeightField {
                key: "AREA".to_string(),
                alias: "Area".to_string(),
                units: "ha".to_string(),
            },
            min_time,
            max_time,
        }
    }

    fn record(region: &str, year: f64, area: f64, ndvi: f64, grouped: bool) -> Record {
        let mut r = Record::new();
        r.insert("REGION", region);
        r.insert("YEAR", year);
        r.insert("AREA", area);
        r.insert("NDVI", ndvi);
        r.grouped = grouped;
        r
    }

    #[test]
    fn test_weighted_mean_reduction() {
        // 3 records, weight [10, 20, 30], value [1, 2, 3]
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("N", 2000.0, 20.0, 2.0, false),
            record("N", 2000.0, 30.0, 3.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("NDVI", VariableKind::Continuous, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "N");
        assert_eq!(out[0].color, "#1f77b4");
        assert_eq!(out[0].min_weight, 60.0);
        assert_eq!(out[0].data.len(), 1);
        assert!((out[0].data[0].1 - 140.0 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_uniform_weights_reduce_to_arithmetic_mean() {
        let records = vec![
            record("N", 2000.0, 5.0, 1.0, false),
            record("N", 2000.0, 5.0, 2.0, false),
            record("N", 2000.0, 5.0, 6.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("NDVI", VariableKind::Continuous, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);
        assert_eq!(out[0].data[0].1, 3.0);
    }

    #[test]
    fn test_weight_variable_reduces_to_weight_sum() {
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("N", 2000.0, 20.0, 2.0, false),
            record("N", 2001.0, 5.0, 3.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);
        assert_eq!(out[0].data, vec![(2000.0, 30.0), (2001.0, 5.0)]);
        assert_eq!(out[0].min_weight, 5.0);
    }

    #[test]
    fn test_total_variable_reduces_to_unweighted_sum() {
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("N", 2000.0, 20.0, 2.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("NDVI", VariableKind::Total, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);
        assert_eq!(out[0].data[0].1, 3.0);
    }

    #[test]
    fn test_group_series_sums_member_areas() {
        // ALL group rows were synthesized from N + S per year
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("S", 2000.0, 20.0, 2.0, false),
            record("ALL", 2000.0, 30.0, 5.0 / 3.0, true),
            record("N", 2001.0, 40.0, 1.0, false),
            record("S", 2001.0, 2.0, 2.0, false),
            record("ALL", 2001.0, 42.0, 1.0, true),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);

        let all = out.iter().find(|s| s.label == "ALL").unwrap();
        assert_eq!(all.data, vec![(2000.0, 30.0), (2001.0, 42.0)]);
        // Group value at each time equals the sum of its members
        let n = out.iter().find(|s| s.label == "N").unwrap();
        let s = out.iter().find(|s| s.label == "S").unwrap();
        assert_eq!(all.data[0].1, n.data[0].1 + s.data[0].1);
        assert_eq!(all.color, "#ff7f0e");
    }

    #[test]
    fn test_no_record_is_double_counted() {
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("S", 2000.0, 20.0, 2.0, false),
            record("ALL", 2000.0, 30.0, 1.0, true),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);

        // Every record appears in exactly one bucket: 3 labels, 1 point each
        assert_eq!(out.len(), 3);
        let total_points: usize = out.iter().map(|s| s.data.len()).sum();
        assert_eq!(total_points, 3);
        // Natural rows land on their own label, not inside the group bucket
        let all = out.iter().find(|s| s.label == "ALL").unwrap();
        assert_eq!(all.data[0].1, 30.0);
    }

    #[test]
    fn test_time_window_excludes_records() {
        let records = vec![
            record("N", 1999.0, 10.0, 1.0, false),
            record("N", 2000.0, 20.0, 2.0, false),
            record("N", 2006.0, 30.0, 3.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);
        assert_eq!(out[0].data, vec![(2000.0, 20.0)]);
    }

    #[test]
    fn test_empty_input_yields_empty_output() {
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        assert!(aggregate(&[], &region_stratum(), &sel).is_empty());
    }

    #[test]
    fn test_series_with_no_in_window_records_keeps_label() {
        let records = vec![
            record("N", 2000.0, 10.0, 1.0, false),
            record("S", 1999.0, 20.0, 2.0, false),
        ];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("AREA", VariableKind::Weight, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);

        let s = out.iter().find(|s| s.label == "S").unwrap();
        assert!(s.data.is_empty());
        assert!(s.min_weight.is_nan());
    }

    #[test]
    fn test_zero_weight_bucket_yields_nan_mean() {
        let records = vec![record("N", 2000.0, 0.0, 1.0, false)];
        let refs: Vec<&Record> = records.iter().collect();
        let sel = selection("NDVI", VariableKind::Continuous, 2000.0, 2005.0);
        let out = aggregate(&refs, &region_stratum(), &sel);
        assert!(out[0].data[0].1.is_nan());
    }
}
