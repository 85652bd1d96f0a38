//! Schema configuration
//!
//! Turns the raw schema JSON into typed field descriptors, validates it
//! against the loaded dataset, and resolves wire-level selection requests
//! into the typed `Selection` the pipeline services consume.

use std::collections::BTreeSet;

use tracing::debug;
use trend_common::model::{
    Category, CategoryEntry, RawSchema, Record, SelectedStratum, Selection, SelectionRequest,
    SeriesField, StratumField, TimeField, VariableField, VariableKind, WeightField,
};
use trend_common::{Error, Result};

/// Category colors, cycled per stratum across leaf categories then groups
/// in declaration order (the d3 category20 palette the front end was
/// designed around).
const CATEGORY_COLORS: [&str; 20] = [
    "#1f77b4", "#aec7e8", "#ff7f0e", "#ffbb78", "#2ca02c", "#98df8a", "#d62728", "#ff9896",
    "#9467bd", "#c5b0d5", "#8c564b", "#c49c94", "#e377c2", "#f7b6d2", "#7f7f7f", "#c7c7c7",
    "#bcbd22", "#dbdb8d", "#17becf", "#9edae5",
];

/// Typed view of the schema plus the observed time range of the dataset
#[derive(Debug, Clone)]
pub struct Configuration {
    pub strata: Vec<StratumField>,
    pub variables: Vec<VariableField>,
    pub time: TimeField,
    pub weight: WeightField,
    /// Series minimum weight below this raises a low-area warning
    pub warning_area_threshold: f64,
    /// Series minimum weight below this is hidden entirely
    pub minimum_area_threshold: f64,
    /// Stratum keys with accuracy-assessment reference columns
    pub olofsson_fields: Vec<String>,
    /// Observed `[min, max]` of the time field, set during initialization
    pub time_range: (f64, f64),
}

impl Configuration {
    /// Build typed field descriptors from the raw schema.
    ///
    /// Fatal configuration errors: anything other than exactly one time
    /// and one weight field, an unknown field type, no categorical or no
    /// plottable field, or a group referencing a non-sibling category.
    pub fn from_schema(schema: &RawSchema) -> Result<Self> {
        let mut strata = Vec::new();
        let mut variables = Vec::new();
        let mut time_fields = Vec::new();
        let mut weight_fields = Vec::new();

        for raw in &schema.variables {
            match raw.kind.as_str() {
                "categorical" => {
                    let mut color_index = 0;
                    let mut next_color = || {
                        let color = CATEGORY_COLORS[color_index % CATEGORY_COLORS.len()];
                        color_index += 1;
                        color.to_string()
                    };
                    let mut categories: Vec<CategoryEntry> = raw
                        .categories
                        .iter()
                        .map(|c| {
                            CategoryEntry::Item(Category {
                                key: c.key.clone(),
                                alias: c.alias.clone(),
                                color: next_color(),
                            })
                        })
                        .collect();
                    categories.extend(raw.groups.iter().map(|g| CategoryEntry::Group {
                        key: g.key.clone(),
                        alias: g.alias.clone(),
                        color: next_color(),
                        items: g.items.clone(),
                    }));
                    strata.push(StratumField {
                        key: raw.key.clone(),
                        alias: raw.alias.clone(),
                        categories,
                    });
                }
                kind @ ("continuous" | "weight" | "total") => {
                    let variable_kind = match kind {
                        "continuous" => VariableKind::Continuous,
                        "weight" => VariableKind::Weight,
                        _ => VariableKind::Total,
                    };
                    variables.push(VariableField {
                        key: raw.key.clone(),
                        alias: raw.alias.clone(),
                        units: raw.units.clone().unwrap_or_default(),
                        kind: variable_kind,
                    });
                    if kind == "weight" {
                        weight_fields.push(WeightField {
                            key: raw.key.clone(),
                            alias: raw.alias.clone(),
                            units: raw.units.clone().unwrap_or_default(),
                        });
                    }
                }
                "time" => time_fields.push(TimeField {
                    key: raw.key.clone(),
                    alias: raw.alias.clone(),
                }),
                other => {
                    return Err(Error::Config(format!(
                        "Unknown field type '{}' for field '{}'",
                        other, raw.key
                    )))
                }
            }
        }

        if time_fields.len() != 1 {
            return Err(Error::Config(
                "There must be exactly one time field".to_string(),
            ));
        }
        if weight_fields.len() != 1 {
            return Err(Error::Config(
                "There must be exactly one weight field".to_string(),
            ));
        }
        if strata.is_empty() {
            return Err(Error::Config(
                "There must be at least one categorical field".to_string(),
            ));
        }
        if variables.is_empty() {
            return Err(Error::Config(
                "There must be at least one plottable variable field".to_string(),
            ));
        }

        // Every group must be a union of sibling leaf categories
        for stratum in &strata {
            let leaves: BTreeSet<&str> = stratum.leaf_keys().into_iter().collect();
            for group in stratum.groups() {
                for item in group.expanded_keys() {
                    if !leaves.contains(item) {
                        return Err(Error::Config(format!(
                            "Group '{}' in stratum '{}' references unknown category '{}'",
                            group.key(),
                            stratum.key,
                            item
                        )));
                    }
                }
            }
        }

        Ok(Self {
            strata,
            variables,
            time: time_fields.remove(0),
            weight: weight_fields.remove(0),
            warning_area_threshold: schema.warning_area_threshold,
            minimum_area_threshold: schema.minimum_area_threshold,
            olofsson_fields: schema
                .olofsson
                .as_ref()
                .map(|o| o.fields.clone())
                .unwrap_or_default(),
            time_range: (0.0, 0.0),
        })
    }

    /// Every field key the schema declares, deduplicated
    pub fn field_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.strata.iter().map(|s| s.key.as_str()).collect();
        keys.extend(self.variables.iter().map(|v| v.key.as_str()));
        keys.push(self.time.key.as_str());
        keys.push(self.weight.key.as_str());
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Fields whose values are coerced to numbers at initialization:
    /// all variable fields plus the time field
    pub fn numeric_field_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.variables.iter().map(|v| v.key.clone()).collect();
        keys.push(self.time.key.clone());
        keys.sort_unstable();
        keys.dedup();
        keys
    }

    /// Ensure the schema's field keys exactly match the dataset's columns
    pub fn check_field_names(&self, records: &[Record]) -> Result<()> {
        let first = records
            .first()
            .ok_or_else(|| Error::Config("Dataset is empty".to_string()))?;
        let data_keys: BTreeSet<&str> = first.field_keys().collect();
        let schema_keys: BTreeSet<&str> = self.field_keys().into_iter().collect();
        if data_keys != schema_keys {
            return Err(Error::Config(
                "Fields from schema and dataset differ. Check both files".to_string(),
            ));
        }
        Ok(())
    }

    /// Drop categories and groups with no representation in the record
    /// store. Runs after group synthesis so group keys present as
    /// synthesized rows survive.
    pub fn prune_categories(&mut self, records: &[Record]) {
        for stratum in &mut self.strata {
            let observed: BTreeSet<String> = records
                .iter()
                .filter_map(|r| r.text(&stratum.key).map(|v| v.into_owned()))
                .collect();
            let before = stratum.categories.len();
            stratum.categories.retain(|c| observed.contains(c.key()));
            if stratum.categories.len() < before {
                debug!(
                    stratum = %stratum.key,
                    dropped = before - stratum.categories.len(),
                    "pruned categories without data representation"
                );
            }
        }
    }

    /// Record the observed time range of the dataset
    pub fn observe_time_range(&mut self, records: &[Record]) {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for record in records {
            let t = record.number(&self.time.key);
            min = min.min(t);
            max = max.max(t);
        }
        self.time_range = (min, max);
    }

    pub fn stratum(&self, key: &str) -> Option<&StratumField> {
        self.strata.iter().find(|s| s.key == key)
    }

    pub fn variable(&self, key: &str) -> Option<&VariableField> {
        self.variables.iter().find(|v| v.key == key)
    }

    /// Initial selection: first stratum as series, first variable, all
    /// categories of every stratum, full observed time range
    pub fn default_selection(&self) -> Selection {
        Selection {
            strata: self
                .strata
                .iter()
                .map(|s| SelectedStratum {
                    key: s.key.clone(),
                    alias: s.alias.clone(),
                    categories: s.categories.clone(),
                })
                .collect(),
            series_field: SeriesField {
                key: self.strata[0].key.clone(),
                alias: self.strata[0].alias.clone(),
            },
            variable_field: self.variables[0].clone(),
            time_field: self.time.clone(),
            weight_field: self.weight.clone(),
            min_time: self.time_range.0,
            max_time: self.time_range.1,
        }
    }

    /// Resolve a wire-level selection request into typed selection state
    pub fn resolve_selection(&self, request: &SelectionRequest) -> Result<Selection> {
        let series_stratum = self.stratum(&request.series_field).ok_or_else(|| {
            Error::InvalidInput(format!("Unknown series field '{}'", request.series_field))
        })?;
        let variable = self.variable(&request.variable_field).ok_or_else(|| {
            Error::InvalidInput(format!("Unknown variable field '{}'", request.variable_field))
        })?;

        for key in request.strata.keys() {
            if self.stratum(key).is_none() {
                return Err(Error::InvalidInput(format!("Unknown stratum '{}'", key)));
            }
        }

        let mut strata = Vec::with_capacity(self.strata.len());
        for stratum in &self.strata {
            let categories = match request.strata.get(&stratum.key) {
                // Explicit subset: resolve every key against the stratum
                Some(keys) => {
                    let mut selected = Vec::with_capacity(keys.len());
                    for key in keys {
                        let entry = stratum.entry(key).ok_or_else(|| {
                            Error::InvalidInput(format!(
                                "Unknown category '{}' in stratum '{}'",
                                key, stratum.key
                            ))
                        })?;
                        selected.push(entry.clone());
                    }
                    selected
                }
                // Absent: everything stays selected
                None => stratum.categories.clone(),
            };
            strata.push(SelectedStratum {
                key: stratum.key.clone(),
                alias: stratum.alias.clone(),
                categories,
            });
        }

        let min_time = request.min_time.unwrap_or(self.time_range.0);
        let max_time = request.max_time.unwrap_or(self.time_range.1);
        if min_time > max_time {
            return Err(Error::InvalidInput(format!(
                "Invalid time window: {} > {}",
                min_time, max_time
            )));
        }
        if min_time < self.time_range.0 || max_time > self.time_range.1 {
            return Err(Error::InvalidInput(format!(
                "Time window [{}, {}] outside observed range [{}, {}]",
                min_time, max_time, self.time_range.0, self.time_range.1
            )));
        }

        Ok(Selection {
            strata,
            series_field: SeriesField {
                key: series_stratum.key.clone(),
                alias: series_stratum.alias.clone(),
            },
            variable_field: variable.clone(),
            time_field: self.time.clone(),
            weight_field: self.weight.clone(),
            min_time,
            max_time,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema_json() -> serde_json::Value {
        serde_json::json!({
            "fn": "trajectory.json",
            "warningAreaThreshold": 100.0,
            "minimumAreaThreshold": 10.0,
            "variables": [
                {"key": "REGION", "alias": "Region", "type": "categorical",
                 "categories": [
                     {"key": "N", "alias": "North"},
                     {"key": "S", "alias": "South"}
                 ],
                 "groups": [
                     {"key": "ALL", "alias": "All regions", "items": ["N", "S"]}
                 ]},
                {"key": "COVER", "alias": "Cover", "type": "categorical",
                 "categories": [
                     {"key": "F", "alias": "Forest"},
                     {"key": "G", "alias": "Grass"}
                 ]},
                {"key": "YEAR", "alias": "Year", "type": "time"},
                {"key": "AREA", "alias": "Area", "type": "weight", "units": "ha"},
                {"key": "NDVI", "alias": "Greenness", "type": "continuous", "units": "index"}
            ]
        })
    }

    fn configuration() -> Configuration {
        let schema: RawSchema = serde_json::from_value(schema_json()).unwrap();
        Configuration::from_schema(&schema).unwrap()
    }

    fn record(fields: &[(&str, &str)]) -> Record {
        let mut r = Record::new();
        for (k, v) in fields {
            r.insert(*k, *v);
        }
        r
    }

    #[test]
    fn test_from_schema_builds_typed_fields() {
        let config = configuration();
        assert_eq!(config.strata.len(), 2);
        assert_eq!(config.variables.len(), 2);
        assert_eq!(config.time.key, "YEAR");
        assert_eq!(config.weight.key, "AREA");
        assert_eq!(config.weight.units, "ha");

        let region = config.stratum("REGION").unwrap();
        assert_eq!(region.leaf_keys(), vec!["N", "S"]);
        assert_eq!(region.groups().count(), 1);
        // Colors cycle within the stratum in declaration order
        assert_eq!(region.entry("N").unwrap().color(), "#1f77b4");
        assert_eq!(region.entry("S").unwrap().color(), "#aec7e8");
        assert_eq!(region.entry("ALL").unwrap().color(), "#ff7f0e");
        // The palette restarts for the next stratum
        let cover = config.stratum("COVER").unwrap();
        assert_eq!(cover.entry("F").unwrap().color(), "#1f77b4");
    }

    #[test]
    fn test_missing_time_field_is_fatal() {
        let mut raw = schema_json();
        raw["variables"]
            .as_array_mut()
            .unwrap()
            .retain(|v| v["type"] != "time");
        let schema: RawSchema = serde_json::from_value(raw).unwrap();
        let err = Configuration::from_schema(&schema).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("exactly one time field"));
    }

    #[test]
    fn test_duplicate_weight_field_is_fatal() {
        let mut raw = schema_json();
        raw["variables"].as_array_mut().unwrap().push(serde_json::json!(
            {"key": "AREA2", "alias": "Area 2", "type": "weight", "units": "ha"}
        ));
        let schema: RawSchema = serde_json::from_value(raw).unwrap();
        let err = Configuration::from_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("exactly one weight field"));
    }

    #[test]
    fn test_group_with_unknown_item_is_fatal() {
        let mut raw = schema_json();
        raw["variables"][0]["groups"][0]["items"] = serde_json::json!(["N", "X"]);
        let schema: RawSchema = serde_json::from_value(raw).unwrap();
        let err = Configuration::from_schema(&schema).unwrap_err();
        assert!(err.to_string().contains("unknown category 'X'"));
    }

    #[test]
    fn test_check_field_names_mismatch_is_fatal() {
        let config = configuration();
        let records = vec![record(&[
            ("REGION", "N"),
            ("COVER", "F"),
            ("YEAR", "2000"),
            ("AREA", "10"),
        ])];
        // NDVI column missing from the dataset
        assert!(config.check_field_names(&records).is_err());
        assert!(config.check_field_names(&[]).is_err());
    }

    #[test]
    fn test_prune_drops_unrepresented_categories() {
        let mut config = configuration();
        let records = vec![
            record(&[("REGION", "N"), ("COVER", "F"), ("YEAR", "2000"), ("AREA", "10"), ("NDVI", "1")]),
            record(&[("REGION", "ALL"), ("COVER", "F"), ("YEAR", "2000"), ("AREA", "10"), ("NDVI", "1")]),
        ];
        config.prune_categories(&records);
        let region = config.stratum("REGION").unwrap();
        // S never occurs; N and the synthesized ALL survive
        assert!(region.entry("S").is_none());
        assert!(region.entry("N").is_some());
        assert!(region.entry("ALL").is_some());
        // G never occurs in COVER
        assert!(config.stratum("COVER").unwrap().entry("G").is_none());
    }

    #[test]
    fn test_resolve_selection_defaults_and_subsets() {
        let mut config = configuration();
        config.time_range = (2000.0, 2005.0);

        let request = SelectionRequest {
            series_field: "REGION".to_string(),
            variable_field: "AREA".to_string(),
            strata: [("REGION".to_string(), vec!["ALL".to_string()])]
                .into_iter()
                .collect(),
            min_time: Some(2001.0),
            max_time: None,
        };
        let selection = config.resolve_selection(&request).unwrap();
        assert_eq!(selection.series_field.key, "REGION");
        assert_eq!(selection.variable_field.kind, VariableKind::Weight);
        assert_eq!(selection.min_time, 2001.0);
        assert_eq!(selection.max_time, 2005.0);
        // Explicit subset on REGION, everything on COVER
        assert_eq!(selection.stratum("REGION").unwrap().selected_keys(), vec!["ALL"]);
        assert_eq!(selection.stratum("COVER").unwrap().selected_keys(), vec!["F", "G"]);
    }

    #[test]
    fn test_resolve_selection_rejects_bad_input() {
        let mut config = configuration();
        config.time_range = (2000.0, 2005.0);

        let mut request = SelectionRequest {
            series_field: "NOPE".to_string(),
            variable_field: "AREA".to_string(),
            ..Default::default()
        };
        assert!(config.resolve_selection(&request).is_err());

        request.series_field = "REGION".to_string();
        request.variable_field = "NOPE".to_string();
        assert!(config.resolve_selection(&request).is_err());

        request.variable_field = "AREA".to_string();
        request.min_time = Some(2004.0);
        request.max_time = Some(2001.0);
        assert!(config.resolve_selection(&request).is_err());

        request.min_time = Some(1990.0);
        request.max_time = Some(2001.0);
        assert!(config.resolve_selection(&request).is_err());

        request.min_time = None;
        request.max_time = None;
        request
            .strata
            .insert("REGION".to_string(), vec!["X".to_string()]);
        assert!(config.resolve_selection(&request).is_err());
    }

    #[test]
    fn test_default_selection_covers_everything() {
        let mut config = configuration();
        config.time_range = (2000.0, 2005.0);
        let selection = config.default_selection();
        assert_eq!(selection.series_field.key, "REGION");
        assert_eq!(selection.variable_field.key, "AREA");
        assert_eq!(selection.min_time, 2000.0);
        assert_eq!(selection.max_time, 2005.0);
        assert_eq!(
            selection.stratum("REGION").unwrap().selected_keys(),
            vec!["N", "S", "ALL"]
        );
    }
}
