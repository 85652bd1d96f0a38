//! Domain model for the trend data-exploration pipeline
//!
//! - Field descriptors: typed views of the schema (strata, variables, time, weight)
//! - Records: raw and synthesized tabular rows
//! - Series: aggregated output ready for the chart collaborator
//! - Selection: the user's current filter/series/variable/time choices

pub mod fields;
pub mod record;
pub mod schema;
pub mod selection;
pub mod series;

pub use fields::{
    Category, CategoryEntry, SeriesField, StratumField, TimeField, VariableField, VariableKind,
    WeightField,
};
pub use record::{FieldValue, Record};
pub use schema::{RawOlofsson, RawSchema, RawVariable};
pub use selection::{SelectedStratum, Selection, SelectionRequest};
pub use series::{SeriesAndErrorsModel, SeriesData, SeriesModel, ViewPoint};
