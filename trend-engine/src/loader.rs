//! One-shot engine initialization and query entry points
//!
//! Initialization loads the schema, the dataset, and the optional accuracy
//! reference dataset, then validates, coerces numeric fields, synthesizes
//! group records, and prunes unrepresented categories. The resulting engine
//! is immutable; every query runs the pure pipeline over the shared record
//! store.

use std::path::Path;

use serde::Serialize;
use tracing::info;
use trend_common::model::{RawSchema, Record, Selection, SelectionRequest, SeriesModel};
use trend_common::{Error, Result};

use crate::config::EngineSettings;
use crate::services::{
    accuracy, aggregator, exporter, group_synthesizer, record_filter, Configuration,
    CorrectionOutput,
};

/// The fully initialized, immutable data-exploration engine
#[derive(Debug)]
pub struct TrendEngine {
    pub configuration: Configuration,
    /// Natural records plus the synthesized group records, appended once
    pub records: Vec<Record>,
    /// Accuracy reference records; empty without an olofsson section
    pub reference: Vec<Record>,
}

/// Result of one aggregation pass over the current selection
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub series: Vec<SeriesModel>,
    /// Number of records matching the selection filters
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<CorrectionOutput>,
}

impl TrendEngine {
    /// Load schema → dataset → reference, then build the engine.
    /// Any configuration error aborts initialization entirely.
    pub async fn initialize(settings: &EngineSettings) -> Result<Self> {
        let schema_path = settings.schema_path();
        info!(path = %schema_path.display(), "loading schema");
        let schema_text = tokio::fs::read_to_string(&schema_path).await?;
        let schema: RawSchema = serde_json::from_str(&schema_text)?;

        let records = read_records(&settings.data_dir.join(&schema.dataset)).await?;
        let reference = match &schema.olofsson {
            Some(olofsson) => read_records(&settings.data_dir.join(&olofsson.dataset)).await?,
            None => Vec::new(),
        };

        Self::from_parts(schema, records, reference)
    }

    /// Build the engine from already-parsed inputs
    pub fn from_parts(
        schema: RawSchema,
        mut records: Vec<Record>,
        reference: Vec<Record>,
    ) -> Result<Self> {
        let mut configuration = Configuration::from_schema(&schema)?;
        configuration.check_field_names(&records)?;

        let numeric_fields = configuration.numeric_field_keys();
        for record in &mut records {
            record.coerce_numeric(&numeric_fields);
        }

        group_synthesizer::mark_natural(&mut records);
        let synthesized = group_synthesizer::synthesize(
            &records,
            &configuration.strata,
            &configuration.variables,
            &configuration.weight,
        );
        info!(
            natural = records.len(),
            synthesized = synthesized.len(),
            "record store initialized"
        );
        records.extend(synthesized);

        configuration.prune_categories(&records);
        configuration.observe_time_range(&records);

        Ok(Self {
            configuration,
            records,
            reference,
        })
    }

    pub fn default_selection(&self) -> Selection {
        self.configuration.default_selection()
    }

    pub fn resolve_selection(&self, request: &SelectionRequest) -> Result<Selection> {
        self.configuration.resolve_selection(request)
    }

    /// Filter, aggregate, and (when reference data covers the series
    /// stratum) correct. An empty filtered set yields an empty series list
    /// with `count = 0`, not an error.
    pub fn run(&self, selection: &Selection) -> Result<QueryOutput> {
        let series_stratum = self
            .configuration
            .stratum(&selection.series_field.key)
            .ok_or_else(|| {
                Error::NotFound(format!("Unknown stratum '{}'", selection.series_field.key))
            })?;

        let filtered = record_filter::filter(&self.records, selection);
        let series = aggregator::aggregate(&filtered, series_stratum, selection);
        let corrected = accuracy::correct(
            &self.reference,
            &self.configuration.olofsson_fields,
            series_stratum,
            selection,
            &series,
        );

        Ok(QueryOutput {
            count: filtered.len(),
            series,
            corrected,
        })
    }

    /// Run the pipeline and serialize the result as sectioned CSV text
    pub fn export(&self, selection: &Selection) -> Result<String> {
        let output = self.run(selection)?;
        Ok(exporter::to_csv_text(
            selection,
            &self.configuration.strata,
            &output.series,
            output
                .corrected
                .as_ref()
                .map(|c| c.series_data.as_slice()),
        ))
    }
}

/// Read a dataset file: a JSON array with one object per record
async fn read_records(path: &Path) -> Result<Vec<Record>> {
    info!(path = %path.display(), "loading records");
    let text = tokio::fs::read_to_string(path).await?;
    let records: Vec<Record> = serde_json::from_str(&text)?;
    Ok(records)
}
